// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod advice;
pub mod chat;
pub mod feed;
pub mod identity;

pub use advice::GeminiClient;
pub use chat::ChatService;
pub use feed::{FeedUpdate, WorkoutFeed, WorkoutSubscription};
pub use identity::{IdentityService, PendingLogin};
