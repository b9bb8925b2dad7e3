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

//! # api
//!
//! The `/api/*` HTTP surface: `/api/add`, `/api/del`, `/api/page`.
//!
//! All three endpoints are GETs taking query-string parameters, authenticated by the
//! [authn](crate::authn) middleware (which attaches the caller's [Username] to the request's
//! extensions). The handlers are deliberately thin: parse parameters, call into the store or
//! the [pagination](crate::pagination) layer, map the result to a status code.

use crate::{
    authn::authenticate,
    entities::{TabId, Username},
    pagination,
    query::Predicate,
    storage,
    tabs::Tabs,
};

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use snafu::{Backtrace, OptionExt, ResultExt, Snafu};
use tap::Pipe;
use tower_http::cors::CorsLayer;
use tracing::error;

use std::{collections::HashMap, sync::Arc};

/// Default number of tabs per page when the caller doesn't say
pub const DEFAULT_PAGE_SIZE: u32 = 10;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("While inserting a tab: {source}"))]
    AddTab {
        source: storage::Error,
        backtrace: Backtrace,
    },
    #[snafu(display("While deleting a tab: {source}"))]
    DeleteTab {
        source: storage::Error,
        backtrace: Backtrace,
    },
    #[snafu(display("The `id` parameter was missing or not an unsigned integer"))]
    MissingId { backtrace: Backtrace },
    #[snafu(display("The `url` parameter was missing or empty"))]
    MissingUrl { backtrace: Backtrace },
    #[snafu(display("While paging through tabs: {source}"))]
    Page {
        source: storage::Error,
        backtrace: Backtrace,
    },
    #[snafu(display("Un-authenticated request to {path}"))]
    Unauthorized { path: String, backtrace: Backtrace },
}

impl Error {
    /// Map this error to a response status & plain-text body. Three buckets:
    ///
    /// 1. the caller broke the contract: 400, name the offending field & nothing more
    /// 2. the caller failed to authenticate: 401, reveal *nothing* about why
    /// 3. we broke: 500, own up to it
    pub fn as_status_and_msg(&self) -> (StatusCode, String) {
        match self {
            Error::MissingUrl { .. } => (StatusCode::BAD_REQUEST, "url".to_string()),
            Error::MissingId { .. } => (StatusCode::BAD_REQUEST, "id".to_string()),
            Error::Unauthorized { .. } => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            Error::AddTab { .. } | Error::DeleteTab { .. } | Error::Page { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        error!("{}", self);
        self.as_status_and_msg().into_response()
    }
}

type Result<T> = std::result::Result<T, Error>;

/// Retrieve the authenticated [Username] from the current request
///
/// Every `/api/*` route is behind middleware that attaches a [Username] to the incoming request;
/// this retrieves it. I wish it were possible to write the handlers in such a way that an
/// unauthenticated request were unrepresentable, but the best axum offers is the route-layer
/// rejecting it before the handler runs-- this is belt & suspenders.
fn user_for_request<'a>(request: &'a axum::extract::Request, pth: &str) -> Result<&'a Username> {
    request
        .extensions()
        .get::<Username>()
        .context(UnauthorizedSnafu {
            path: pth.to_string(),
        })
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                            /api/add                                            //
////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Deserialize)]
struct AddParams {
    url: Option<String>,
    title: Option<String>,
}

/// Save a new tab: 400 "url" without a non-empty `url`; `title` defaults to the url. 201 on
/// insert (200 in the degenerate zero-rows-affected case).
async fn add(
    State(state): State<Arc<Tabs>>,
    Query(params): Query<AddParams>,
    request: axum::extract::Request,
) -> Response {
    async fn add1(state: &Tabs, params: AddParams, user: &Username) -> Result<StatusCode> {
        let url = params
            .url
            .filter(|url| !url.is_empty())
            .context(MissingUrlSnafu)?;
        let title = params.title.filter(|title| !title.is_empty());
        let timestamp = chrono::Utc::now().timestamp_millis();
        let rows = state
            .storage
            .add_tab(user, title.as_deref().unwrap_or(&url), &url, timestamp)
            .await
            .context(AddTabSnafu)?;
        if rows == 0 {
            Ok(StatusCode::OK)
        } else {
            Ok(StatusCode::CREATED)
        }
    }

    let user = match user_for_request(&request, "/api/add") {
        Ok(user) => user.clone(),
        Err(err) => return err.into_response(),
    };
    match add1(&state, params, &user).await {
        Ok(status) => status.into_response(),
        Err(err) => err.into_response(),
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                            /api/del                                            //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// Delete a tab by id: 400 "id" unless `id` parses as an unsigned integer; 204 if a row was
/// deleted, 200 if nothing was (not an error-- deletion is idempotent)
async fn del(
    State(state): State<Arc<Tabs>>,
    Query(params): Query<HashMap<String, String>>,
    request: axum::extract::Request,
) -> Response {
    async fn del1(
        state: &Tabs,
        params: HashMap<String, String>,
        user: &Username,
    ) -> Result<StatusCode> {
        let id = params
            .get("id")
            .and_then(|id| id.parse::<u32>().ok())
            .context(MissingIdSnafu)?;
        let rows = state
            .storage
            .delete_tab(user, TabId::from(id))
            .await
            .context(DeleteTabSnafu)?;
        if rows == 0 {
            Ok(StatusCode::OK)
        } else {
            Ok(StatusCode::NO_CONTENT)
        }
    }

    let user = match user_for_request(&request, "/api/del") {
        Ok(user) => user.clone(),
        Err(err) => return err.into_response(),
    };
    match del1(&state, params, &user).await {
        Ok(status) => status.into_response(),
        Err(err) => err.into_response(),
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                           /api/page                                            //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// Fetch a page of tabs
///
/// Parameters: `cursor` (default 0, the first page), `size` (default 10), `from`/`to`
/// (optional; the time filter applies only when both are present), `search` (optional
/// substring). Malformed numeric parameters fall back to their defaults rather than erroring.
async fn page(
    State(state): State<Arc<Tabs>>,
    Query(params): Query<HashMap<String, String>>,
    request: axum::extract::Request,
) -> Response {
    async fn page1(
        state: &Tabs,
        params: HashMap<String, String>,
        user: &Username,
    ) -> Result<Response> {
        let cursor = params
            .get("cursor")
            .and_then(|cursor| cursor.parse::<u32>().ok())
            .map(TabId::from)
            .unwrap_or(TabId::FIRST_PAGE);
        let size = params
            .get("size")
            .and_then(|size| size.parse::<u32>().ok())
            .unwrap_or(DEFAULT_PAGE_SIZE);
        let from = params.get("from").and_then(|from| from.parse::<i64>().ok());
        let to = params.get("to").and_then(|to| to.parse::<i64>().ok());
        let predicate = Predicate::new(user.clone(), from, to, params.get("search").cloned());
        pagination::page(state.storage.as_ref(), &predicate, cursor, size)
            .await
            .context(PageSnafu)?
            .pipe(Json)
            .pipe(|body| Ok(body.into_response()))
    }

    let user = match user_for_request(&request, "/api/page") {
        Ok(user) => user.clone(),
        Err(err) => return err.into_response(),
    };
    match page1(&state, params, &user).await {
        Ok(rsp) => rsp,
        Err(err) => err.into_response(),
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                             router                                             //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// Make the `/api` [Router]; every route is behind the authentication middleware
pub fn make_router(state: Arc<Tabs>) -> Router {
    Router::new()
        .route("/api/add", get(add))
        .route("/api/del", get(del))
        .route("/api/page", get(page))
        .route_layer(middleware::from_fn_with_state(state.clone(), authenticate))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
