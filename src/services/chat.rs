// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory coaching chat transcripts.
//!
//! Transcripts are per-user, append-only, and die with the process.
//! Each send holds the user's transcript lock across the generation
//! call, so at most one advice request per user is in flight.

use crate::error::AppError;
use crate::models::{ChatMessage, ChatRole};
use crate::services::GeminiClient;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Static history description embedded in every advice prompt. The model
/// gets no real transcript or record data.
const COACH_CONTEXT: &str = "ユーザーが定期的にワークアウトを記録しています。";

/// Coaching chat over the Gemini advice client.
#[derive(Clone)]
pub struct ChatService {
    gemini: GeminiClient,
    transcripts: Arc<DashMap<String, Arc<Mutex<Vec<ChatMessage>>>>>,
}

impl ChatService {
    pub fn new(gemini: GeminiClient) -> Self {
        Self {
            gemini,
            transcripts: Arc::new(DashMap::new()),
        }
    }

    /// Current transcript for one user, in arrival order.
    pub async fn transcript(&self, user_id: &str) -> Vec<ChatMessage> {
        let Some(transcript) = self.transcripts.get(user_id).map(|e| e.value().clone()) else {
            return Vec::new();
        };
        let messages = transcript.lock().await.clone();
        messages
    }

    /// Send one user turn and wait for the assistant's reply.
    ///
    /// The user turn is appended before the advice call and is kept even
    /// when the call fails; the caller surfaces the error and may simply
    /// try again. Returns the updated transcript.
    pub async fn send_message(
        &self,
        user_id: &str,
        message: &str,
    ) -> Result<Vec<ChatMessage>, AppError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(AppError::Validation("message must not be empty".to_string()));
        }

        let transcript = self
            .transcripts
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(Vec::new())))
            .value()
            .clone();

        // Holding the lock across the generation call serializes sends:
        // a second request for the same user waits here.
        let mut turns = transcript.lock().await;

        turns.push(ChatMessage::new(ChatRole::User, message));

        let reply = self.gemini.generate_advice(message, COACH_CONTEXT).await?;

        turns.push(ChatMessage::new(ChatRole::Assistant, reply));

        tracing::debug!(user_id, turns = turns.len(), "Chat turn completed");

        Ok(turns.clone())
    }
}
