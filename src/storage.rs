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

//! # storage
//!
//! Abstractions for the tabs storage layer.
//!
//! The trait is deliberately thin: three operations, each scoped to a single user, with window
//! reads expressed as [Predicate] + [Window] so that the pagination logic upstairs never sees
//! SQL. Callers can't tell which backend they're talking to, and the [Error] type is accordingly
//! opaque (a boxed source)-- backends define their own rich error enums & wrap them at the
//! boundary.

use crate::{
    entities::{Tab, TabId, Username},
    query::{Predicate, Window},
};

use async_trait::async_trait;

#[derive(Debug)]
pub struct Error {
    source: Box<dyn std::error::Error + Send + Sync + 'static>,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.source)
    }
}

impl std::error::Error for Error {}

impl Error {
    pub fn new(err: impl std::error::Error + Send + Sync + 'static) -> Error {
        Error {
            source: Box::new(err),
        }
    }
}

#[async_trait]
pub trait Backend {
    /// Insert a new tab for `user`; return the number of rows inserted (zero if the insert
    /// affected nothing, one on success-- the distinction drives the endpoint's status code)
    async fn add_tab(
        &self,
        user: &Username,
        title: &str,
        url: &str,
        timestamp: i64,
    ) -> Result<u64, Error>;
    /// Delete the tab named by `id` if it exists *and* belongs to `user`; return the number of
    /// rows deleted. Deleting someone else's tab, or a non-existent one, is not an error-- it
    /// simply deletes zero rows.
    async fn delete_tab(&self, user: &Username, id: TabId) -> Result<u64, Error>;
    /// Read one window of tabs matching `predicate`, in the order the [Window] specifies
    async fn get_window(&self, predicate: &Predicate, window: &Window) -> Result<Vec<Tab>, Error>;
}
