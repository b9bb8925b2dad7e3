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

//! # tabs
//!
//! A personal tab store over HTTP: add, delete & page through saved links, scoped per user.
//!
//! The two pieces of this crate that repay study are [authn] (stateless, header-based HMAC
//! authentication-- no server-side sessions at all) and [pagination] (cursor-based, bidirectional
//! paging that doesn't skip or repeat rows when the underlying list mutates between requests).
//! Everything else is plumbing around a single SQLite table.

pub mod api;
pub mod authn;
pub mod entities;
pub mod pagination;
pub mod query;
pub mod sqlite;
pub mod storage;
pub mod tabs;
