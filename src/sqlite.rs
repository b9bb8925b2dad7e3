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

//! # sqlite
//!
//! The SQLite implementation of [Backend].
//!
//! A single table, `tabs`, bootstrapped at startup with `CREATE TABLE IF NOT EXISTS` (no
//! migration machinery for a one-table schema). The id column is `AUTOINCREMENT`, which is what
//! buys the pagination layer its strictly-increasing, never-reused ids. All text columns carry
//! `COLLATE BINARY`, so `LIKE` matches are case-sensitive.

use crate::{
    entities::{Tab, TabId, Username},
    query::{Predicate, Window},
    storage::{self, Backend},
};

use async_trait::async_trait;
use snafu::{Backtrace, ResultExt, Snafu};
use sqlx::{
    Pool, Sqlite,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
};

use std::{path::Path, str::FromStr, time::Duration};

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("While connecting to the database at {path}: {source}"))]
    Connect {
        path: String,
        source: sqlx::Error,
        backtrace: Backtrace,
    },
    #[snafu(display("While creating the tabs table: {source}"))]
    CreateTable {
        source: sqlx::Error,
        backtrace: Backtrace,
    },
    #[snafu(display("While inserting a tab: {source}"))]
    InsertTab {
        source: sqlx::Error,
        backtrace: Backtrace,
    },
    #[snafu(display("While deleting a tab: {source}"))]
    DeleteTab {
        source: sqlx::Error,
        backtrace: Backtrace,
    },
    #[snafu(display("While reading a window of tabs: {source}"))]
    ReadWindow {
        source: sqlx::Error,
        backtrace: Backtrace,
    },
}

type Result<T> = std::result::Result<T, Error>;

// The original schema, verbatim: BINARY collation on the text columns makes search
// case-sensitive, and AUTOINCREMENT guarantees ids are strictly increasing & never reused.
const CREATE_TABLE: &str = r#"CREATE TABLE IF NOT EXISTS "tabs" (
"id" integer NOT NULL COLLATE BINARY PRIMARY KEY AUTOINCREMENT,
"title" text NOT NULL DEFAULT '' COLLATE BINARY,
"url" text NOT NULL DEFAULT '' COLLATE BINARY,
"timestamp" integer NOT NULL COLLATE BINARY,
"user" text NOT NULL DEFAULT '' COLLATE BINARY)"#;

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                             Store                                              //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// SQLite-backed tab store
pub struct Store {
    pool: Pool<Sqlite>,
}

impl Store {
    /// Open (creating if need be) the database at `path` & bootstrap the schema
    pub async fn new(path: &Path) -> Result<Store> {
        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
            .with_context(|_| ConnectSnafu {
                path: path.display().to_string(),
            })?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .connect_with(opts)
            .await
            .with_context(|_| ConnectSnafu {
                path: path.display().to_string(),
            })?;
        Store::from_pool(pool).await
    }

    /// An in-memory store; used by the test suites
    pub async fn in_memory() -> Result<Store> {
        // A single connection: each in-memory SQLite database is private to its connection, so a
        // pool of them would see distinct, empty databases.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(
                SqliteConnectOptions::from_str("sqlite::memory:").with_context(|_| {
                    ConnectSnafu {
                        path: ":memory:".to_string(),
                    }
                })?,
            )
            .await
            .with_context(|_| ConnectSnafu {
                path: ":memory:".to_string(),
            })?;
        Store::from_pool(pool).await
    }

    async fn from_pool(pool: Pool<Sqlite>) -> Result<Store> {
        sqlx::query(CREATE_TABLE)
            .execute(&pool)
            .await
            .context(CreateTableSnafu)?;
        Ok(Store { pool })
    }

    /// Build the SELECT text for one window; the filters (owner, time range, search) are
    /// identical across windows-- only the id constraint, ordering & limit vary
    fn window_sql(predicate: &Predicate, window: &Window) -> String {
        let mut sql =
            String::from(r#"SELECT "id", "title", "url", "timestamp" FROM "tabs" WHERE "user" = ?"#);
        if predicate.time_range().is_some() {
            sql.push_str(r#" AND "timestamp" >= ? AND "timestamp" < ?"#);
        }
        if predicate.search().is_some() {
            sql.push_str(r#" AND ("title" LIKE ? OR "url" LIKE ?)"#);
        }
        match window {
            Window::Latest { .. } => sql.push_str(r#" ORDER BY "id" DESC LIMIT ?"#),
            Window::Ahead { .. } => sql.push_str(r#" AND "id" > ? ORDER BY "id" ASC LIMIT ?"#),
            Window::Behind { .. } => sql.push_str(r#" AND "id" <= ? ORDER BY "id" DESC LIMIT ?"#),
        }
        sql
    }
}

#[async_trait]
impl Backend for Store {
    async fn add_tab(
        &self,
        user: &Username,
        title: &str,
        url: &str,
        timestamp: i64,
    ) -> std::result::Result<u64, storage::Error> {
        sqlx::query(
            r#"INSERT INTO "tabs" ("title", "url", "user", "timestamp") VALUES (?, ?, ?, ?)"#,
        )
        .bind(title)
        .bind(url)
        .bind(user.as_str())
        .bind(timestamp)
        .execute(&self.pool)
        .await
        .context(InsertTabSnafu)
        .map(|done| done.rows_affected())
        .map_err(storage::Error::new)
    }

    async fn delete_tab(
        &self,
        user: &Username,
        id: TabId,
    ) -> std::result::Result<u64, storage::Error> {
        sqlx::query(r#"DELETE FROM "tabs" WHERE "id" = ? AND "user" = ?"#)
            .bind(id.as_i64())
            .bind(user.as_str())
            .execute(&self.pool)
            .await
            .context(DeleteTabSnafu)
            .map(|done| done.rows_affected())
            .map_err(storage::Error::new)
    }

    async fn get_window(
        &self,
        predicate: &Predicate,
        window: &Window,
    ) -> std::result::Result<Vec<Tab>, storage::Error> {
        let sql = Store::window_sql(predicate, window);
        let mut query = sqlx::query_as::<_, Tab>(&sql).bind(predicate.user().as_str());
        if let Some((from, to)) = predicate.time_range() {
            query = query.bind(from).bind(to);
        }
        if let Some(term) = predicate.search() {
            query = query.bind(term).bind(term);
        }
        query = match window {
            Window::Latest { limit } => query.bind(*limit as i64),
            Window::Ahead { cursor, limit } => query.bind(cursor.as_i64()).bind(*limit as i64),
            Window::Behind { cursor, limit } => query.bind(cursor.as_i64()).bind(*limit as i64),
        };
        query
            .fetch_all(&self.pool)
            .await
            .context(ReadWindowSnafu)
            .map_err(storage::Error::new)
    }
}
