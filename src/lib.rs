// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Workout Tracker: log strength-training sessions and get coaching advice
//!
//! This crate provides the backend API for the workout log: federated
//! sign-in, the per-user workout record store, the live history feed,
//! and the AI coaching chat.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::FirestoreDb;
use services::{ChatService, IdentityService, WorkoutFeed};

/// Shared application state, constructed once in `main` and threaded to
/// every handler. The auth middleware is the only component that turns a
/// request into an identity; nothing else writes session state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub identity: IdentityService,
    pub feed: WorkoutFeed,
    pub chat: ChatService,
}
