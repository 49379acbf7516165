// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Workout record model for storage and API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::AppError;

/// Stored workout record in Firestore.
///
/// Created exactly once, immutable thereafter. `created_at` is the sole
/// ordering key for the history (descending).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Workout {
    /// Document id, assigned by the store on creation
    #[serde(alias = "_firestore_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Owning identity's id; every query and write is scoped by this field
    pub user_id: String,
    /// Exercise name (non-empty)
    pub exercise: String,
    /// Number of sets (positive)
    pub sets: u32,
    /// Reps per set (positive)
    pub reps: u32,
    /// Weight in kilograms; absent means "not recorded", distinct from 0
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    /// Free-text notes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Creation timestamp, assigned at write time. Stored as a native
    /// Firestore timestamp so descending order is exact at sub-second
    /// granularity.
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub created_at: DateTime<Utc>,
}

/// New-record input as submitted by the entry form.
///
/// All fields are optional at the wire level so that a missing required
/// field surfaces as a validation error, not a deserialization failure.
/// Non-numeric `sets`/`reps`/`weight` are rejected by typed
/// deserialization before this struct exists.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct WorkoutInput {
    #[validate(length(min = 1, message = "exercise must not be empty"))]
    pub exercise: Option<String>,
    #[validate(range(min = 1, message = "sets must be positive"))]
    pub sets: Option<u32>,
    #[validate(range(min = 1, message = "reps must be positive"))]
    pub reps: Option<u32>,
    #[validate(range(min = 0.0, message = "weight must not be negative"))]
    pub weight: Option<f64>,
    pub notes: Option<String>,
}

impl WorkoutInput {
    /// Check the input and build the record to store.
    ///
    /// Fails with `Validation` before any network call when `exercise`,
    /// `sets` or `reps` is missing, or a present field is out of range.
    /// An absent `weight` stays absent; it is never coerced to 0.
    pub fn into_workout(self, user_id: &str) -> Result<Workout, AppError> {
        self.validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let (Some(exercise), Some(sets), Some(reps)) = (self.exercise, self.sets, self.reps)
        else {
            return Err(AppError::Validation(
                "exercise, sets and reps are required".to_string(),
            ));
        };

        let notes = self.notes.filter(|n| !n.is_empty());

        Ok(Workout {
            id: None,
            user_id: user_id.to_string(),
            exercise,
            sets,
            reps,
            weight: self.weight,
            notes,
            created_at: Utc::now(),
        })
    }
}
