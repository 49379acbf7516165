// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identity provider client for the two federated sign-in flows.
//!
//! Handles:
//! - Google sign-in (popup flow: the callback resolves the identity)
//! - GitHub sign-in (redirect flow: the identity is parked and picked up
//!   by the redirect-result check on the next frontend load)
//! - Authorization code exchange and profile fetch for both providers

use crate::config::Config;
use crate::error::AppError;
use crate::models::Identity;
use dashmap::DashMap;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";
const GITHUB_AUTH_URL: &str = "https://github.com/login/oauth/authorize";
const GITHUB_TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
const GITHUB_USER_URL: &str = "https://api.github.com/user";

// GitHub requires a User-Agent on API calls.
const USER_AGENT: &str = "workout-tracker";

/// How long a parked redirect login stays claimable.
const PENDING_LOGIN_TTL: Duration = Duration::from_secs(10 * 60);

/// A completed redirect-flow sign-in waiting for the frontend to claim it.
#[derive(Debug, Clone)]
pub struct PendingLogin {
    pub identity: Identity,
    pub token: String,
    created_at: Instant,
}

impl PendingLogin {
    pub fn new(identity: Identity, token: String) -> Self {
        Self {
            identity,
            token,
            created_at: Instant::now(),
        }
    }

    fn expired(&self) -> bool {
        self.created_at.elapsed() > PENDING_LOGIN_TTL
    }
}

/// Client for the external identity providers.
#[derive(Clone)]
pub struct IdentityService {
    http: reqwest::Client,
    google_client_id: String,
    google_client_secret: String,
    github_client_id: String,
    github_client_secret: String,
    /// Redirect-flow results parked until the redirect-result check
    /// claims them, keyed by the OAuth state nonce. One-shot.
    pending: Arc<DashMap<String, PendingLogin>>,
}

impl IdentityService {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            google_client_id: config.google_client_id.clone(),
            google_client_secret: config.google_client_secret.clone(),
            github_client_id: config.github_client_id.clone(),
            github_client_secret: config.github_client_secret.clone(),
            pending: Arc::new(DashMap::new()),
        }
    }

    // ─── Authorization URLs ──────────────────────────────────────

    /// Google authorization URL for the popup flow.
    pub fn google_authorize_url(&self, callback_url: &str, state: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope=openid%20profile%20email&state={}",
            GOOGLE_AUTH_URL,
            urlencoding::encode(&self.google_client_id),
            urlencoding::encode(callback_url),
            urlencoding::encode(state),
        )
    }

    /// GitHub authorization URL for the redirect flow.
    pub fn github_authorize_url(&self, callback_url: &str, state: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&scope=read:user%20user:email&state={}",
            GITHUB_AUTH_URL,
            urlencoding::encode(&self.github_client_id),
            urlencoding::encode(callback_url),
            urlencoding::encode(state),
        )
    }

    // ─── Code Exchange ───────────────────────────────────────────

    /// Exchange a Google authorization code and fetch the profile.
    pub async fn exchange_google_code(
        &self,
        code: &str,
        callback_url: &str,
    ) -> Result<Identity, AppError> {
        let response = self
            .http
            .post(GOOGLE_TOKEN_URL)
            .form(&[
                ("client_id", self.google_client_id.as_str()),
                ("client_secret", self.google_client_secret.as_str()),
                ("code", code),
                ("grant_type", "authorization_code"),
                ("redirect_uri", callback_url),
            ])
            .send()
            .await
            .map_err(|e| AppError::Auth(format!("Google token request failed: {}", e)))?;

        let tokens: ProviderTokenResponse = check_response_json(response).await?;

        let response = self
            .http
            .get(GOOGLE_USERINFO_URL)
            .bearer_auth(&tokens.access_token)
            .send()
            .await
            .map_err(|e| AppError::Auth(format!("Google userinfo request failed: {}", e)))?;

        let profile: GoogleProfile = check_response_json(response).await?;

        Ok(Identity {
            user_id: format!("google:{}", profile.sub),
            display_name: profile
                .name
                .unwrap_or_else(|| profile.email.clone().unwrap_or_default()),
            email: profile.email,
        })
    }

    /// Exchange a GitHub authorization code and fetch the profile.
    pub async fn exchange_github_code(&self, code: &str) -> Result<Identity, AppError> {
        let response = self
            .http
            .post(GITHUB_TOKEN_URL)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&[
                ("client_id", self.github_client_id.as_str()),
                ("client_secret", self.github_client_secret.as_str()),
                ("code", code),
            ])
            .send()
            .await
            .map_err(|e| AppError::Auth(format!("GitHub token request failed: {}", e)))?;

        let tokens: ProviderTokenResponse = check_response_json(response).await?;

        let response = self
            .http
            .get(GITHUB_USER_URL)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .bearer_auth(&tokens.access_token)
            .send()
            .await
            .map_err(|e| AppError::Auth(format!("GitHub user request failed: {}", e)))?;

        let profile: GithubProfile = check_response_json(response).await?;

        Ok(Identity {
            user_id: format!("github:{}", profile.id),
            display_name: profile.name.unwrap_or(profile.login),
            email: profile.email,
        })
    }

    // ─── Redirect Results ────────────────────────────────────────

    /// Park a completed redirect-flow sign-in under its state nonce.
    pub fn stash_pending(&self, nonce: &str, login: PendingLogin) {
        // Opportunistic cleanup; expired entries are also refused on take.
        self.pending.retain(|_, entry| !entry.expired());
        self.pending.insert(nonce.to_string(), login);
    }

    /// Claim a parked sign-in. One-shot: the first call consumes it,
    /// every later call (and any unknown nonce) returns None.
    pub fn take_pending(&self, nonce: &str) -> Option<PendingLogin> {
        let (_, login) = self.pending.remove(nonce)?;
        if login.expired() {
            return None;
        }
        Some(login)
    }
}

/// Check response status and parse JSON body, mapping failures to `Auth`.
async fn check_response_json<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, AppError> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(AppError::Auth(format!("HTTP {}: {}", status, body)));
    }

    response
        .json()
        .await
        .map_err(|e| AppError::Auth(format!("JSON parse error: {}", e)))
}

/// OAuth token response (both providers use the same field).
#[derive(Debug, Deserialize)]
struct ProviderTokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct GoogleProfile {
    sub: String,
    name: Option<String>,
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GithubProfile {
    id: u64,
    login: String,
    name: Option<String>,
    email: Option<String>,
}
