// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated users.

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::models::{ChatMessage, ChatRole, Identity, Workout, WorkoutInput};
use crate::services::FeedUpdate;
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Extension, Json, Router,
};
use futures_util::stream::Stream;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// API routes (require authentication via the session token).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(get_me))
        .route("/api/workouts", get(list_workouts).post(create_workout))
        .route("/api/workouts/stream", get(stream_workouts))
        .route("/api/chat", get(get_chat).post(post_chat))
}

// ─── Session ─────────────────────────────────────────────────

/// Current user response.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserResponse {
    pub user_id: String,
    pub display_name: String,
    pub email: Option<String>,
}

impl From<Identity> for UserResponse {
    fn from(identity: Identity) -> Self {
        Self {
            user_id: identity.user_id,
            display_name: identity.display_name,
            email: identity.email,
        }
    }
}

/// Get the current identity, straight from the session token.
async fn get_me(Extension(user): Extension<AuthUser>) -> Json<UserResponse> {
    Json(UserResponse::from(user.identity))
}

// ─── Workouts ────────────────────────────────────────────────

#[derive(Serialize, Clone, Debug)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct WorkoutSummary {
    pub id: String,
    pub exercise: String,
    pub sets: u32,
    pub reps: u32,
    /// Kilograms; None means the weight was not recorded
    pub weight: Option<f64>,
    pub notes: Option<String>,
    pub created_at: String,
}

impl From<&Workout> for WorkoutSummary {
    fn from(workout: &Workout) -> Self {
        Self {
            id: workout.id.clone().unwrap_or_default(),
            exercise: workout.exercise.clone(),
            sets: workout.sets,
            reps: workout.reps,
            weight: workout.weight,
            notes: workout.notes.clone(),
            created_at: format_utc_rfc3339(workout.created_at),
        }
    }
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct WorkoutsResponse {
    pub workouts: Vec<WorkoutSummary>,
    pub total: u32,
}

/// Get the user's full history, newest first.
async fn list_workouts(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<WorkoutsResponse>> {
    let records = state.db.workouts_for_user(&user.identity.user_id).await?;

    let workouts: Vec<WorkoutSummary> = records.iter().map(WorkoutSummary::from).collect();
    let total = workouts.len() as u32;

    Ok(Json(WorkoutsResponse { workouts, total }))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CreateWorkoutResponse {
    pub workout: WorkoutSummary,
}

/// Record a new workout.
///
/// Validation happens before the store is touched; a missing required
/// field never produces a write. A successful write triggers a fresh
/// snapshot on the owner's history stream.
async fn create_workout(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(input): Json<WorkoutInput>,
) -> Result<(StatusCode, Json<CreateWorkoutResponse>)> {
    let workout = input.into_workout(&user.identity.user_id)?;

    tracing::debug!(
        user_id = %user.identity.user_id,
        exercise = %workout.exercise,
        "Recording workout"
    );

    let stored = state.db.create_workout(&workout).await?;

    state.feed.notify(&user.identity.user_id).await;

    Ok((
        StatusCode::CREATED,
        Json(CreateWorkoutResponse {
            workout: WorkoutSummary::from(&stored),
        }),
    ))
}

/// Stream the user's history as Server-Sent Events.
///
/// Each `snapshot` event carries the complete record set, newest first.
/// The subscription is owned by this connection: client disconnect
/// drops the handle and unsubscribes.
async fn stream_workouts(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    let subscription = state.feed.subscribe(&user.identity.user_id).await?;

    let stream = futures_util::stream::unfold(
        (subscription, false),
        |(mut subscription, done)| async move {
            if done {
                return None;
            }

            match subscription.next_update().await? {
                FeedUpdate::Snapshot(records) => {
                    let rows: Vec<WorkoutSummary> = records.iter().map(WorkoutSummary::from).collect();
                    let event = match Event::default().event("snapshot").json_data(&rows) {
                        Ok(event) => event,
                        Err(e) => Event::default().event("error").data(e.to_string()),
                    };
                    Some((Ok::<_, Infallible>(event), (subscription, false)))
                }
                // Terminal: deliver the error state, then end the stream.
                FeedUpdate::Lost(msg) => {
                    let event = Event::default().event("error").data(msg);
                    Some((Ok(event), (subscription, true)))
                }
            }
        },
    );

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

// ─── Chat ────────────────────────────────────────────────────

#[derive(Serialize, Clone, Debug)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ChatMessageView {
    pub id: String,
    pub role: String,
    pub content: String,
    pub created_at: String,
}

impl From<&ChatMessage> for ChatMessageView {
    fn from(message: &ChatMessage) -> Self {
        Self {
            id: message.id.clone(),
            role: match message.role {
                ChatRole::User => "user".to_string(),
                ChatRole::Assistant => "assistant".to_string(),
            },
            content: message.content.clone(),
            created_at: format_utc_rfc3339(message.created_at),
        }
    }
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ChatResponse {
    pub messages: Vec<ChatMessageView>,
}

#[derive(Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

/// Get the in-memory transcript for this session.
async fn get_chat(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Json<ChatResponse> {
    let turns = state.chat.transcript(&user.identity.user_id).await;
    Json(ChatResponse {
        messages: turns.iter().map(ChatMessageView::from).collect(),
    })
}

/// Send one chat turn and wait for the coach's reply.
///
/// On generation failure the user's turn is kept in the transcript and
/// the error is surfaced; the next attempt is accepted as usual.
async fn post_chat(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>> {
    let turns = state
        .chat
        .send_message(&user.identity.user_id, &request.message)
        .await?;

    Ok(Json(ChatResponse {
        messages: turns.iter().map(ChatMessageView::from).collect(),
    }))
}
