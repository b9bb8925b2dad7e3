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

//! # query
//!
//! The filter & window descriptions shared by every page read.
//!
//! Rather than conditionally concatenating WHERE-clause fragments at each call site, the optional
//! filters (time range, search term) are composed once into an immutable [Predicate] value which
//! the storage layer translates into SQL identically regardless of which [Window] is being
//! fetched. This is what keeps the first-page & cursor-page query variants provably consistent
//! with one another.

use crate::entities::{TabId, Username};

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                           Predicate                                            //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// The WHERE-clause semantics common to all page reads
///
/// Three filters, of which only the owner is mandatory:
///
/// - owner: every read is scoped to the authenticated caller
/// - time range: `timestamp >= from AND timestamp < to` (half-open), applied *only if both*
///   bounds were supplied-- one bound alone is silently treated as "no time filter", not an error
/// - search: substring match against title or url, under the store's default (BINARY, i.e.
///   case-sensitive) collation
///
/// The search term is wrapped as `%term%` for a LIKE-style match. Nb. LIKE metacharacters in the
/// raw term are *not* escaped-- they retain their special meaning. That's a known pass-through
/// inherited from the original service, not an oversight.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Predicate {
    user: Username,
    time_range: Option<(i64, i64)>,
    search: Option<String>,
}

impl Predicate {
    pub fn new(
        user: Username,
        from: Option<i64>,
        to: Option<i64>,
        search: Option<String>,
    ) -> Predicate {
        Predicate {
            user,
            // All-or-nothing: the range only takes effect when both bounds are present.
            time_range: from.zip(to),
            search: search
                .filter(|term| !term.is_empty())
                .map(|term| format!("%{}%", term)),
        }
    }
    pub fn user(&self) -> &Username {
        &self.user
    }
    pub fn time_range(&self) -> Option<(i64, i64)> {
        self.time_range
    }
    /// The search term, already wrapped in `%`s; None if no (non-empty) term was supplied
    pub fn search(&self) -> Option<&str> {
        self.search.as_deref()
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                             Window                                             //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// One windowed read against the store
///
/// A page response is assembled from one or two of these (see [pagination](crate::pagination)):
/// the first page is a single [Latest](Window::Latest) read; a cursor page is an
/// [Ahead](Window::Ahead) read followed by a [Behind](Window::Behind) read. The ordering baked
/// into each variant is part of the contract-- callers receive the rows in exactly the order the
/// window specifies.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Window {
    /// All matching rows, newest first: `ORDER BY id DESC LIMIT limit`
    Latest { limit: u32 },
    /// Rows newer than the cursor, oldest first: `id > cursor ORDER BY id ASC LIMIT limit`
    Ahead { cursor: TabId, limit: u32 },
    /// Rows at or older than the cursor, newest first: `id <= cursor ORDER BY id DESC LIMIT limit`
    Behind { cursor: TabId, limit: u32 },
}

impl Window {
    pub fn limit(&self) -> u32 {
        match self {
            Window::Latest { limit }
            | Window::Ahead { limit, .. }
            | Window::Behind { limit, .. } => *limit,
        }
    }
}

#[cfg(test)]
mod query_tests {
    use super::*;

    use std::str::FromStr;

    fn user() -> Username {
        Username::from_str("a").unwrap()
    }

    #[test]
    fn time_range_is_all_or_nothing() {
        // Supplying only one bound must behave identically to supplying neither.
        assert_eq!(
            Predicate::new(user(), Some(100), None, None).time_range(),
            None
        );
        assert_eq!(
            Predicate::new(user(), None, Some(200), None).time_range(),
            None
        );
        assert_eq!(
            Predicate::new(user(), Some(100), Some(200), None).time_range(),
            Some((100, 200))
        );
    }

    #[test]
    fn search_term_is_wrapped_not_escaped() {
        let pred = Predicate::new(user(), None, None, Some("rust".to_string()));
        assert_eq!(pred.search(), Some("%rust%"));
        // Metacharacters pass through with their LIKE meaning intact.
        let pred = Predicate::new(user(), None, None, Some("50%_off".to_string()));
        assert_eq!(pred.search(), Some("%50%_off%"));
        // The empty term means "no search filter."
        let pred = Predicate::new(user(), None, None, Some(String::new()));
        assert_eq!(pred.search(), None);
    }
}
