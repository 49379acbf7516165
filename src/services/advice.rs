// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Gemini API client for generating coaching advice.
//!
//! Single request/response per call: no streaming, no retry, and no
//! conversation memory sent to the model. The chat transcript lives
//! entirely on our side.

use crate::error::AppError;
use serde::Deserialize;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const GEMINI_MODEL: &str = "gemini-1.5-flash";

/// Gemini advice client.
#[derive(Clone)]
pub struct GeminiClient {
    inner: Option<LiveClient>,
    /// Canned reply for offline tests; checked before `inner`.
    mock_reply: Option<String>,
}

#[derive(Clone)]
struct LiveClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl GeminiClient {
    /// Create a new Gemini client with an API key.
    pub fn new(api_key: String) -> Self {
        Self {
            inner: Some(LiveClient {
                http: reqwest::Client::new(),
                base_url: GEMINI_BASE_URL.to_string(),
                api_key,
            }),
            mock_reply: None,
        }
    }

    /// Create a mock client for testing (offline mode).
    ///
    /// Every call will fail with a generation error.
    pub fn new_mock() -> Self {
        Self {
            inner: None,
            mock_reply: None,
        }
    }

    /// Create a mock client that answers every call with `reply`.
    pub fn new_mock_with_reply(reply: &str) -> Self {
        Self {
            inner: None,
            mock_reply: Some(reply.to_string()),
        }
    }

    /// Generate coaching advice for one user question.
    ///
    /// `context` is a short description of the user's training history
    /// embedded into the fixed prompt template. Any upstream failure
    /// (network, quota, malformed response) is a `Generation` error,
    /// propagated unmodified.
    pub async fn generate_advice(
        &self,
        user_message: &str,
        context: &str,
    ) -> Result<String, AppError> {
        if let Some(reply) = &self.mock_reply {
            return Ok(reply.clone());
        }

        let live = self.inner.as_ref().ok_or_else(|| {
            AppError::Generation("Advice endpoint not configured (offline mode)".to_string())
        })?;

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            live.base_url, GEMINI_MODEL, live.api_key
        );

        let body = serde_json::json!({
            "contents": [{
                "parts": [{ "text": build_prompt(user_message, context) }]
            }]
        });

        let response = live
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Generation(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Generation(format!("HTTP {}: {}", status, body)));
        }

        let completion: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| AppError::Generation(format!("JSON parse error: {}", e)))?;

        let text = completion.text();
        if text.is_empty() {
            return Err(AppError::Generation(
                "Empty completion in Gemini response".to_string(),
            ));
        }

        Ok(text)
    }
}

/// Build the fixed coach prompt around the user's question.
fn build_prompt(user_message: &str, context: &str) -> String {
    format!(
        "\nあなたは筋トレのコーチです。ユーザーの筋トレについての質問や相談に答えてください。\n\n\
         ユーザーの最近のワークアウト履歴:\n{context}\n\n\
         ユーザーの質問: {user_message}\n\n\
         ユーザーの質問に対して、的確で励ましのあるアドバイスを日本語で提供してください。\n"
    )
}

/// Completion response from the generateContent endpoint.
#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate's parts.
    fn text(&self) -> String {
        self.candidates
            .first()
            .map(|c| {
                c.content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: CandidateContent,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct CandidateContent {
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_prompt_embeds_inputs() {
        let prompt = build_prompt("休息日は何日必要ですか？", "週3回の記録があります。");
        assert!(prompt.contains("休息日は何日必要ですか？"));
        assert!(prompt.contains("週3回の記録があります。"));
        assert!(prompt.contains("筋トレのコーチ"));
    }

    #[test]
    fn test_response_text_joins_parts() {
        let raw = serde_json::json!({
            "candidates": [{
                "content": {
                    "parts": [
                        { "text": "週に1〜2日の" },
                        { "text": "休息日を取りましょう。" }
                    ]
                }
            }]
        });

        let parsed: GenerateContentResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(parsed.text(), "週に1〜2日の休息日を取りましょう。");
    }

    #[test]
    fn test_response_without_candidates_is_empty() {
        let parsed: GenerateContentResponse = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(parsed.text(), "");
    }

    #[tokio::test]
    async fn test_mock_client_fails_offline() {
        let client = GeminiClient::new_mock();
        let err = client.generate_advice("question", "context").await;
        assert!(matches!(err, Err(AppError::Generation(_))));
    }

    #[tokio::test]
    async fn test_mock_client_with_reply() {
        let client = GeminiClient::new_mock_with_reply("週に1〜2日の休息日を取りましょう。");
        let reply = client.generate_advice("question", "context").await.unwrap();
        assert_eq!(reply, "週に1〜2日の休息日を取りましょう。");
    }
}
