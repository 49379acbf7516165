// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use std::sync::Arc;
use workout_tracker::config::Config;
use workout_tracker::db::FirestoreDb;
use workout_tracker::routes::create_router;
use workout_tracker::services::{ChatService, GeminiClient, IdentityService, WorkoutFeed};
use workout_tracker::AppState;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a mock database connection (offline).
#[allow(dead_code)]
pub fn test_db_offline() -> FirestoreDb {
    FirestoreDb::new_mock()
}

/// Create a test app with offline mock dependencies.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    build_app(test_db_offline(), GeminiClient::new_mock())
}

/// Create a test app whose advice endpoint answers with a canned reply.
#[allow(dead_code)]
pub fn create_test_app_with_reply(reply: &str) -> (axum::Router, Arc<AppState>) {
    build_app(test_db_offline(), GeminiClient::new_mock_with_reply(reply))
}

/// Create a test app against the Firestore emulator.
#[allow(dead_code)]
pub async fn create_test_app_with_emulator() -> (axum::Router, Arc<AppState>) {
    build_app(test_db().await, GeminiClient::new_mock())
}

fn build_app(db: FirestoreDb, gemini: GeminiClient) -> (axum::Router, Arc<AppState>) {
    let config = Config::test_default();
    let identity = IdentityService::new(&config);
    let feed = WorkoutFeed::new(db.clone());
    let chat = ChatService::new(gemini);

    let state = Arc::new(AppState {
        config,
        db,
        identity,
        feed,
        chat,
    });

    (create_router(state.clone()), state)
}

/// Create a session JWT for a test user, signed with the test config key.
#[allow(dead_code)]
pub fn test_session_token(user_id: &str) -> String {
    use workout_tracker::middleware::auth::create_session_jwt;
    use workout_tracker::models::Identity;

    let identity = Identity {
        user_id: user_id.to_string(),
        display_name: "Test User".to_string(),
        email: Some("test@example.com".to_string()),
    };

    create_session_jwt(&identity, &Config::test_default().jwt_signing_key)
        .expect("JWT creation should succeed")
}
