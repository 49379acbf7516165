// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod chat;
pub mod identity;
pub mod workout;

pub use chat::{ChatMessage, ChatRole};
pub use identity::Identity;
pub use workout::{Workout, WorkoutInput};
