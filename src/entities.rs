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

//! # tabs models
//!
//! I hate these sort of "catch-all" modules named "models" or "entities", but these types are
//! truly foundational. A few newtype structs to refine native types, and the [Tab] entity itself.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use snafu::{Backtrace, Snafu, ensure};

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("The empty string is not a valid username"))]
    EmptyUsername { backtrace: Backtrace },
}

type Result<T> = std::result::Result<T, Error>;

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                            Username                                            //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// A textual user identity
///
/// There is no users table; an identity is just a non-empty string attested to by the request's
/// `token` header (see [authn](crate::authn)). Every [Tab] belongs to exactly one [Username], and
/// every store operation is scoped to the caller's-- cross-user access is impossible by
/// construction.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(try_from = "String")]
pub struct Username(String);

impl Username {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for Username {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Username {
    type Err = Error;

    fn from_str(s: &str) -> Result<Username> {
        ensure!(!s.is_empty(), EmptyUsernameSnafu);
        Ok(Username(s.to_owned()))
    }
}

impl TryFrom<String> for Username {
    type Error = Error;

    fn try_from(value: String) -> Result<Username> {
        ensure!(!value.is_empty(), EmptyUsernameSnafu);
        Ok(Username(value))
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                             TabId                                              //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// A [Tab]'s identifier, and the pagination cursor
///
/// Ids are assigned by the store on insert, strictly increasing, never reused; that makes an
/// ordering by id equivalent to an ordering by insertion time, and makes an id a stable boundary
/// for paging-- even if the row it once named has since been deleted, comparisons against it
/// remain meaningful. Zero never names a row (SQLite's AUTOINCREMENT starts at one), so we use it
/// to denote "no cursor; first page."
#[derive(
    Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, sqlx::Type,
)]
#[sqlx(transparent)]
pub struct TabId(i64);

impl TabId {
    pub const FIRST_PAGE: TabId = TabId(0);

    /// True if this cursor denotes "no cursor-- first page"
    pub fn is_first_page(&self) -> bool {
        self.0 == 0
    }
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for TabId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Query parameters carry ids as unsigned integers; widening to i64 can't fail.
impl From<u32> for TabId {
    fn from(value: u32) -> Self {
        TabId(value as i64)
    }
}

impl From<i64> for TabId {
    fn from(value: i64) -> Self {
        TabId(value)
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                              Tab                                               //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// A saved link
///
/// This is the shape returned to callers of `/api/page`: the owning user is implicit (it's the
/// authenticated caller) & so doesn't appear here. `timestamp` is integer milliseconds since the
/// epoch, assigned by the server at insert time.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize, sqlx::FromRow)]
pub struct Tab {
    pub id: TabId,
    pub title: String,
    pub url: String,
    pub timestamp: i64,
}
