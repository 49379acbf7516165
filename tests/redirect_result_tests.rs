// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Redirect-result check tests.
//!
//! The frontend invokes `/auth/redirect-result` unconditionally on every
//! load. The check must be idempotent: a parked redirect sign-in is
//! claimable exactly once, and the no-result case is an empty 200, never
//! an error.

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use tower::ServiceExt;
use workout_tracker::models::Identity;
use workout_tracker::services::PendingLogin;

mod common;

async fn claim(app: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    (status, body)
}

#[tokio::test]
async fn test_no_pending_redirect_returns_empty() {
    let (app, _) = common::create_test_app();

    let (status, body) = claim(app, "/auth/redirect-result").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["identity"].is_null());
    assert!(body["token"].is_null());
}

#[tokio::test]
async fn test_unknown_nonce_returns_empty() {
    let (app, _) = common::create_test_app();

    let (status, body) = claim(app, "/auth/redirect-result?pending=never-stashed").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["identity"].is_null());
}

#[tokio::test]
async fn test_pending_redirect_is_claimed_exactly_once() {
    let (app, state) = common::create_test_app();

    state.identity.stash_pending(
        "nonce-1",
        PendingLogin::new(
            Identity {
                user_id: "github:42".to_string(),
                display_name: "octocat".to_string(),
                email: None,
            },
            "session-token".to_string(),
        ),
    );

    // First claim returns the parked identity and token
    let (status, body) = claim(app.clone(), "/auth/redirect-result?pending=nonce-1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["identity"]["user_id"], "github:42");
    assert_eq!(body["identity"]["display_name"], "octocat");
    assert_eq!(body["token"], "session-token");

    // Every later claim is empty - idempotent, never an error
    for _ in 0..3 {
        let (status, body) = claim(app.clone(), "/auth/redirect-result?pending=nonce-1").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["identity"].is_null());
        assert!(body["token"].is_null());
    }
}
