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

//! # pagination
//!
//! Cursor-based paging that stays coherent while the list is mutating.
//!
//! The usual offset/limit scheme breaks down when rows are inserted or deleted between page
//! fetches: entries shift under the offset & the caller sees duplicates or misses rows. Here a
//! page is instead anchored to an id (the *cursor*). With ids strictly increasing & never
//! reused, `id > cursor` and `id <= cursor` partition the list at a stable boundary no matter
//! what has happened to the rows around it since.
//!
//! A page is then two windows stitched together:
//!
//! - *ahead* of the cursor: up to `size` rows newer than it, oldest-first, so rows added since
//!   the cursor was handed out surface adjacent to the cursor row
//! - *behind* the cursor: up to `2 * size` rows at or older than it, newest-first
//!
//! The concatenation, ahead then behind, is the response-- de-duplicated by id (first occurrence
//! wins) but *never* re-sorted; the seam in the middle is part of the contract, and clients
//! locate their cursor row within the result to orient themselves. The first page (cursor zero)
//! is simpler: there's nothing to be ahead of, so it's a single newest-first window of
//! `2 * size` rows.

use crate::{
    entities::{Tab, TabId},
    query::{Predicate, Window},
    storage::{self, Backend},
};

use itertools::Itertools;

/// Fetch one page of tabs: `cursor` zero means the first page, anything else anchors the
/// two-window read described in the module docs
pub async fn page(
    storage: &(dyn Backend + Send + Sync),
    predicate: &Predicate,
    cursor: TabId,
    size: u32,
) -> Result<Vec<Tab>, storage::Error> {
    // `size` is caller-supplied; saturate rather than overflow on the doubling.
    let far_limit = size.saturating_mul(2);
    if cursor.is_first_page() {
        return storage
            .get_window(predicate, &Window::Latest { limit: far_limit })
            .await;
    }
    let ahead = storage
        .get_window(predicate, &Window::Ahead { cursor, limit: size })
        .await?;
    let behind = storage
        .get_window(
            predicate,
            &Window::Behind {
                cursor,
                limit: far_limit,
            },
        )
        .await?;
    // Concatenate & de-dup by id; do NOT re-sort.
    Ok(ahead
        .into_iter()
        .chain(behind)
        .unique_by(|tab| tab.id)
        .collect())
}
