// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore integration tests.
//!
//! These tests require the Firestore emulator to be running
//! (FIRESTORE_EMULATOR_HOST set). The emulator provides a clean state
//! for each test run.

use workout_tracker::models::{Workout, WorkoutInput};
use workout_tracker::services::{FeedUpdate, WorkoutFeed};

mod common;
use common::test_db;

/// Generate a unique user id for test isolation.
fn unique_user_id() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("google:test-{}", nanos)
}

fn input(exercise: &str, weight: Option<f64>) -> WorkoutInput {
    WorkoutInput {
        exercise: Some(exercise.to_string()),
        sets: Some(3),
        reps: Some(10),
        weight,
        notes: None,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// WORKOUT STORE TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_create_assigns_id_and_scopes_owner() {
    require_emulator!();

    let db = test_db().await;
    let user_id = unique_user_id();

    let workout = input("Bench Press", Some(60.0))
        .into_workout(&user_id)
        .unwrap();
    let stored = db.create_workout(&workout).await.unwrap();

    assert!(stored.id.is_some(), "Store should assign a document id");
    assert_eq!(stored.user_id, user_id);
    assert_eq!(stored.exercise, "Bench Press");
    assert_eq!(stored.sets, 3);
    assert_eq!(stored.reps, 10);
    assert_eq!(stored.weight, Some(60.0));

    let listed = db.workouts_for_user(&user_id).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].user_id, user_id);
}

#[tokio::test]
async fn test_history_is_newest_first() {
    require_emulator!();

    let db = test_db().await;
    let user_id = unique_user_id();

    for exercise in ["Squat", "Bench Press", "Deadlift"] {
        let workout = input(exercise, None).into_workout(&user_id).unwrap();
        db.create_workout(&workout).await.unwrap();
        // Distinct timestamps so the ordering is deterministic
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }

    let listed = db.workouts_for_user(&user_id).await.unwrap();
    assert_eq!(listed.len(), 3);

    let order: Vec<&str> = listed.iter().map(|w| w.exercise.as_str()).collect();
    assert_eq!(order, ["Deadlift", "Bench Press", "Squat"]);

    // Sorted descending at every position
    for pair in listed.windows(2) {
        assert!(pair[0].created_at >= pair[1].created_at);
    }
}

#[tokio::test]
async fn test_queries_are_scoped_by_owner() {
    require_emulator!();

    let db = test_db().await;
    let owner = unique_user_id();
    let other = unique_user_id();

    let workout = input("Overhead Press", None).into_workout(&owner).unwrap();
    db.create_workout(&workout).await.unwrap();

    let other_list = db.workouts_for_user(&other).await.unwrap();
    assert!(
        other_list.is_empty(),
        "Another identity must never see the owner's records"
    );
}

#[tokio::test]
async fn test_absent_weight_is_stored_as_absent() {
    require_emulator!();

    let db = test_db().await;
    let user_id = unique_user_id();

    let workout = input("Pull Up", None).into_workout(&user_id).unwrap();
    db.create_workout(&workout).await.unwrap();

    let listed = db.workouts_for_user(&user_id).await.unwrap();
    assert_eq!(listed[0].weight, None, "Absent weight must not become 0");
}

// ═══════════════════════════════════════════════════════════════════════════
// LIVE FEED TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_feed_delivers_new_record_first() {
    require_emulator!();

    let db = test_db().await;
    let user_id = unique_user_id();
    let feed = WorkoutFeed::new(db.clone());

    let earlier = input("Squat", None).into_workout(&user_id).unwrap();
    db.create_workout(&earlier).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;

    let mut subscription = feed.subscribe(&user_id).await.unwrap();

    // Initial snapshot holds what was already stored
    let first = subscription.next_update().await.unwrap();
    let FeedUpdate::Snapshot(records) = first else {
        panic!("expected a snapshot");
    };
    assert_eq!(records.len(), 1);

    // A new record arrives: the next snapshot has it as its first row
    let bench: Workout = input("Bench Press", Some(60.0))
        .into_workout(&user_id)
        .unwrap();
    db.create_workout(&bench).await.unwrap();
    feed.notify(&user_id).await;

    let second = subscription.next_update().await.unwrap();
    let FeedUpdate::Snapshot(records) = second else {
        panic!("expected a snapshot");
    };
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].exercise, "Bench Press");
    assert_eq!(records[0].weight, Some(60.0));
    assert_eq!(records[1].exercise, "Squat");
}

#[tokio::test]
async fn test_feed_snapshots_are_per_owner() {
    require_emulator!();

    let db = test_db().await;
    let owner = unique_user_id();
    let other = unique_user_id();
    let feed = WorkoutFeed::new(db.clone());

    let mut subscription = feed.subscribe(&other).await.unwrap();
    let FeedUpdate::Snapshot(records) = subscription.next_update().await.unwrap() else {
        panic!("expected a snapshot");
    };
    assert!(records.is_empty());

    let workout = input("Deadlift", None).into_workout(&owner).unwrap();
    db.create_workout(&workout).await.unwrap();
    feed.notify(&owner).await;

    // The other owner's channel saw no change; its snapshot stays empty
    let listed = db.workouts_for_user(&other).await.unwrap();
    assert!(listed.is_empty());
}
