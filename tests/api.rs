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

//! End-to-end tests: drive the real router against an in-memory SQLite store.

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use secrecy::SecretString;
use tower::ServiceExt;

use tabs::{
    api::make_router,
    authn::token_for,
    entities::{Tab, Username},
    sqlite::Store,
    tabs::Tabs,
};

use std::{str::FromStr, sync::Arc};

const SALT: &str = "tabs";

async fn make_app() -> Router {
    let store = Store::in_memory().await.unwrap();
    make_router(Arc::new(Tabs::new(
        Arc::new(store),
        SecretString::from(SALT),
    )))
}

fn token(user: &str) -> String {
    token_for(
        &SecretString::from(SALT),
        &Username::from_str(user).unwrap(),
    )
}

/// Issue an authenticated GET as `user`; returns the response
async fn get_as(app: &Router, user: &str, uri: &str) -> axum::response::Response {
    app.clone()
        .oneshot(
            Request::builder()
                .uri(uri)
                .header("user", user)
                .header("token", token(user))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn body_string(rsp: axum::response::Response) -> String {
    let bytes = rsp.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn page_ids(app: &Router, user: &str, uri: &str) -> Vec<i64> {
    let rsp = get_as(app, user, uri).await;
    assert_eq!(rsp.status(), StatusCode::OK);
    let tabs: Vec<Tab> = serde_json::from_str(&body_string(rsp).await).unwrap();
    tabs.iter().map(|tab| tab.id.as_i64()).collect()
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                         authentication                                         //
////////////////////////////////////////////////////////////////////////////////////////////////////

#[tokio::test]
async fn unauthenticated_requests_are_401() {
    let app = make_app().await;
    // No headers at all...
    let rsp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/page")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(rsp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_string(rsp).await, "Unauthorized");
    // ...a user but no token...
    let rsp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/page")
                .header("user", "a")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(rsp.status(), StatusCode::UNAUTHORIZED);
    // ...an empty user...
    let rsp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/page")
                .header("user", "")
                .header("token", token("a"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(rsp.status(), StatusCode::UNAUTHORIZED);
    // ...and a token minted for somebody else.
    let rsp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/page")
                .header("user", "a")
                .header("token", token("b"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(rsp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_string(rsp).await, "Unauthorized");
}

#[tokio::test]
async fn case_flipped_tokens_are_accepted() {
    let app = make_app().await;
    let rsp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/page")
                .header("user", "a")
                .header("token", token("a").to_uppercase())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(rsp.status(), StatusCode::OK);
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                          add & delete                                          //
////////////////////////////////////////////////////////////////////////////////////////////////////

#[tokio::test]
async fn add_without_url_is_400_naming_the_field() {
    let app = make_app().await;
    let rsp = get_as(&app, "a", "/api/add").await;
    assert_eq!(rsp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_string(rsp).await, "url");
    let rsp = get_as(&app, "a", "/api/add?url=").await;
    assert_eq!(rsp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn add_round_trip_defaults_title_to_url() {
    let app = make_app().await;
    let rsp = get_as(&app, "a", "/api/add?url=http://x&title=").await;
    assert_eq!(rsp.status(), StatusCode::CREATED);
    let rsp = get_as(&app, "a", "/api/page?cursor=0&size=10").await;
    assert_eq!(rsp.status(), StatusCode::OK);
    let tabs: Vec<Tab> = serde_json::from_str(&body_string(rsp).await).unwrap();
    assert_eq!(tabs.len(), 1);
    assert_eq!(tabs[0].title, "http://x");
    assert_eq!(tabs[0].url, "http://x");
}

#[tokio::test]
async fn del_requires_a_numeric_id() {
    let app = make_app().await;
    let rsp = get_as(&app, "a", "/api/del").await;
    assert_eq!(rsp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_string(rsp).await, "id");
    let rsp = get_as(&app, "a", "/api/del?id=bogus").await;
    assert_eq!(rsp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_string(rsp).await, "id");
}

#[tokio::test]
async fn delete_is_idempotent_and_scoped() {
    let app = make_app().await;
    assert_eq!(
        get_as(&app, "a", "/api/add?url=http://e1").await.status(),
        StatusCode::CREATED
    );
    // Somebody else can't delete it (but learns nothing from the attempt: same 200 as a no-op).
    assert_eq!(
        get_as(&app, "b", "/api/del?id=1").await.status(),
        StatusCode::OK
    );
    // The owner can, exactly once.
    assert_eq!(
        get_as(&app, "a", "/api/del?id=1").await.status(),
        StatusCode::NO_CONTENT
    );
    assert_eq!(
        get_as(&app, "a", "/api/del?id=1").await.status(),
        StatusCode::OK
    );
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                            paging                                              //
////////////////////////////////////////////////////////////////////////////////////////////////////

#[tokio::test]
async fn two_tabs_two_ways() {
    // user "a" adds two tabs (ids 1 & 2); both the first page & the cursor=1 page return [2, 1].
    let app = make_app().await;
    get_as(&app, "a", "/api/add?url=http://e1").await;
    get_as(&app, "a", "/api/add?url=http://e2").await;
    assert_eq!(
        page_ids(&app, "a", "/api/page?cursor=0&size=1").await,
        vec![2, 1]
    );
    assert_eq!(
        page_ids(&app, "a", "/api/page?cursor=1&size=1").await,
        vec![2, 1]
    );
}

#[tokio::test]
async fn new_rows_surface_in_the_ahead_window() {
    let app = make_app().await;
    get_as(&app, "a", "/api/add?url=http://e1").await;
    get_as(&app, "a", "/api/add?url=http://e2").await;
    // The client paged with cursor=1; a third tab arrives before the next fetch. It must appear
    // in the ahead sub-window (ascending), not be silently lost.
    get_as(&app, "a", "/api/add?url=http://e3").await;
    assert_eq!(
        page_ids(&app, "a", "/api/page?cursor=1&size=10").await,
        vec![2, 3, 1]
    );
}

#[tokio::test]
async fn pages_are_scoped_to_the_caller() {
    let app = make_app().await;
    get_as(&app, "a", "/api/add?url=http://mine").await;
    get_as(&app, "b", "/api/add?url=http://theirs").await;
    assert_eq!(page_ids(&app, "a", "/api/page").await, vec![1]);
    assert_eq!(page_ids(&app, "b", "/api/page").await, vec![2]);
}

#[tokio::test]
async fn time_filter_is_all_or_nothing() {
    let app = make_app().await;
    get_as(&app, "a", "/api/add?url=http://e1").await;
    // `from` alone excludes nothing, even a bound in the far future.
    assert_eq!(
        page_ids(&app, "a", "/api/page?from=99999999999999").await,
        vec![1]
    );
    // Both bounds together do filter.
    assert_eq!(
        page_ids(&app, "a", "/api/page?from=99999999999998&to=99999999999999").await,
        Vec::<i64>::new()
    );
}

#[tokio::test]
async fn maximal_size_parameter_is_served_not_panicked() {
    let app = make_app().await;
    get_as(&app, "a", "/api/add?url=http://e1").await;
    assert_eq!(
        page_ids(&app, "a", "/api/page?cursor=0&size=4294967295").await,
        vec![1]
    );
}

#[tokio::test]
async fn malformed_numeric_parameters_fall_back_to_defaults() {
    let app = make_app().await;
    get_as(&app, "a", "/api/add?url=http://e1").await;
    // cursor=bogus is treated as cursor=0, size=bogus as size=10: still a 200 with the row.
    assert_eq!(
        page_ids(&app, "a", "/api/page?cursor=bogus&size=bogus").await,
        vec![1]
    );
}

#[tokio::test]
async fn search_filters_by_substring() {
    let app = make_app().await;
    get_as(&app, "a", "/api/add?url=http://rust-lang.org&title=Rust").await;
    get_as(&app, "a", "/api/add?url=http://example.com&title=Other").await;
    assert_eq!(page_ids(&app, "a", "/api/page?search=rust").await, vec![1]);
    assert_eq!(
        page_ids(&app, "a", "/api/page?search=zebra").await,
        Vec::<i64>::new()
    );
}
