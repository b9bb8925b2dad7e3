// Copyright (C) 2025-2026 Michael Herstine <sp1ff@pobox.com>
//
// This file is part of tabs.
//
// tabs is free software: you can redistribute it and/or modify it under the terms of the GNU
// General Public License as published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// tabs is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without
// even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU
// General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with tabs.  If not,
// see <http://www.gnu.org/licenses/>.

//! # tabs application state
//!
//! The handful of things every request handler needs, shared behind an `Arc`.

use crate::storage::Backend;

use secrecy::SecretString;

use std::sync::Arc;

/// Application state: the storage backend & the HMAC salt
pub struct Tabs {
    pub storage: Arc<dyn Backend + Send + Sync>,
    pub salt: SecretString,
}

impl Tabs {
    pub fn new(storage: Arc<dyn Backend + Send + Sync>, salt: SecretString) -> Tabs {
        Tabs { storage, salt }
    }
}
