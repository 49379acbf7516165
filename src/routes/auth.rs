// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Federated sign-in routes.
//!
//! Google uses the popup flow: the callback resolves the identity and
//! establishes the session in one step. GitHub uses the redirect flow
//! (for environments where popups are unreliable): the callback parks
//! the result, and the frontend claims it on its next load via
//! `/auth/redirect-result`.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Redirect,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{AppError, Result};
use crate::middleware::auth::{create_session_jwt, SESSION_COOKIE};
use crate::routes::api::UserResponse;
use crate::services::PendingLogin;
use crate::AppState;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

// Type alias for HMAC-SHA256
type HmacSha256 = Hmac<Sha256>;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/google", get(google_start))
        .route("/auth/google/callback", get(google_callback))
        .route("/auth/github", get(github_start))
        .route("/auth/github/callback", get(github_callback))
        .route("/auth/redirect-result", get(redirect_result))
        .route("/auth/logout", post(logout))
}

/// Query parameters for starting a sign-in flow.
#[derive(Deserialize)]
pub struct AuthStartParams {
    /// Frontend URL to redirect back to after sign-in completes.
    /// If not provided, uses FRONTEND_URL env var.
    #[serde(default)]
    redirect_uri: Option<String>,
}

/// Start the Google popup flow - redirect to Google authorization.
async fn google_start(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AuthStartParams>,
    headers: axum::http::HeaderMap,
) -> Result<Redirect> {
    let frontend_url = params
        .redirect_uri
        .unwrap_or_else(|| state.config.frontend_url.clone());

    let oauth_state = sign_state(&frontend_url, &state.config.oauth_state_key)?;
    let callback = callback_url(&headers, "/auth/google/callback");
    let auth_url = state.identity.google_authorize_url(&callback, &oauth_state);

    tracing::info!(frontend_url = %frontend_url, "Starting Google sign-in");

    Ok(Redirect::temporary(&auth_url))
}

/// Start the GitHub redirect flow - redirect to GitHub authorization.
async fn github_start(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AuthStartParams>,
    headers: axum::http::HeaderMap,
) -> Result<Redirect> {
    let frontend_url = params
        .redirect_uri
        .unwrap_or_else(|| state.config.frontend_url.clone());

    let oauth_state = sign_state(&frontend_url, &state.config.oauth_state_key)?;
    let callback = callback_url(&headers, "/auth/github/callback");
    let auth_url = state.identity.github_authorize_url(&callback, &oauth_state);

    tracing::info!(frontend_url = %frontend_url, "Starting GitHub sign-in");

    Ok(Redirect::temporary(&auth_url))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    state: String,
    #[serde(default)]
    error: Option<String>,
}

/// Google callback - exchange the code and establish the session.
async fn google_callback(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: axum::http::HeaderMap,
    Query(params): Query<CallbackParams>,
) -> Result<(CookieJar, Redirect)> {
    let (frontend_url, _nonce) = verify_and_decode_state(
        &params.state,
        &state.config.oauth_state_key,
    )
    .unwrap_or_else(|| {
        tracing::warn!("Invalid or tampered state parameter, falling back to default frontend URL");
        (state.config.frontend_url.clone(), String::new())
    });

    // Provider-reported errors (user cancelled, access denied)
    if let Some(error) = params.error {
        tracing::warn!(error = %error, "Sign-in error from Google");
        let redirect = format!("{}/login?error={}", frontend_url, urlencoding::encode(&error));
        return Ok((jar, Redirect::temporary(&redirect)));
    }

    let code = params
        .code
        .ok_or_else(|| AppError::Auth("Missing authorization code".to_string()))?;

    let callback = callback_url(&headers, "/auth/google/callback");
    let identity = state.identity.exchange_google_code(&code, &callback).await?;

    tracing::info!(user_id = %identity.user_id, "Google sign-in successful");

    let jwt = create_session_jwt(&identity, &state.config.jwt_signing_key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))?;

    let redirect = format!("{}/dashboard", frontend_url);
    Ok((jar.add(session_cookie(jwt)), Redirect::temporary(&redirect)))
}

/// GitHub callback - exchange the code, park the result for the
/// redirect-result check, and send the browser back to the frontend.
async fn github_callback(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Result<(CookieJar, Redirect)> {
    let (frontend_url, nonce) = verify_and_decode_state(
        &params.state,
        &state.config.oauth_state_key,
    )
    .unwrap_or_else(|| {
        tracing::warn!("Invalid or tampered state parameter, falling back to default frontend URL");
        (state.config.frontend_url.clone(), String::new())
    });

    if let Some(error) = params.error {
        tracing::warn!(error = %error, "Sign-in error from GitHub");
        let redirect = format!("{}/login?error={}", frontend_url, urlencoding::encode(&error));
        return Ok((jar, Redirect::temporary(&redirect)));
    }

    let code = params
        .code
        .ok_or_else(|| AppError::Auth("Missing authorization code".to_string()))?;

    let identity = state.identity.exchange_github_code(&code).await?;

    tracing::info!(user_id = %identity.user_id, "GitHub sign-in successful");

    let jwt = create_session_jwt(&identity, &state.config.jwt_signing_key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))?;

    // The redirect flow does not resolve the identity in the opener:
    // park it under the state nonce for the next frontend load.
    state
        .identity
        .stash_pending(&nonce, PendingLogin::new(identity, jwt.clone()));

    let redirect = format!(
        "{}/login?pending={}",
        frontend_url,
        urlencoding::encode(&nonce)
    );
    Ok((jar.add(session_cookie(jwt)), Redirect::temporary(&redirect)))
}

#[derive(Deserialize)]
pub struct RedirectResultParams {
    #[serde(default)]
    pending: Option<String>,
}

/// Response for the redirect-result check.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RedirectResultResponse {
    pub identity: Option<UserResponse>,
    pub token: Option<String>,
}

/// Claim the result of a pending redirect sign-in.
///
/// Safe to call on every frontend load: with no pending redirect (or a
/// nonce that was already claimed) it returns an empty result, never an
/// error.
async fn redirect_result(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RedirectResultParams>,
) -> Json<RedirectResultResponse> {
    let login = params
        .pending
        .as_deref()
        .and_then(|nonce| state.identity.take_pending(nonce));

    match login {
        Some(login) => Json(RedirectResultResponse {
            identity: Some(UserResponse::from(login.identity)),
            token: Some(login.token),
        }),
        None => Json(RedirectResultResponse {
            identity: None,
            token: None,
        }),
    }
}

/// Logout - clear the session cookie.
///
/// Callers treat a failure here as "try again", not fatal; the handler
/// itself cannot fail.
async fn logout(jar: CookieJar) -> (CookieJar, StatusCode) {
    (jar.add(removal_cookie()), StatusCode::NO_CONTENT)
}

// ─── Cookies ─────────────────────────────────────────────────────

fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::days(30))
        .build()
}

fn removal_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::ZERO)
        .build()
}

// ─── OAuth State ─────────────────────────────────────────────────

/// Derive the absolute callback URL from the request host.
fn callback_url(headers: &axum::http::HeaderMap, path: &str) -> String {
    let host = headers
        .get(axum::http::header::HOST)
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| {
            std::env::var("API_HOST").unwrap_or_else(|_| "localhost:8080".to_string())
        });

    let scheme = if host.contains("localhost") || host.contains("127.0.0.1") {
        "http"
    } else {
        "https"
    };

    format!("{}://{}{}", scheme, host, path)
}

/// Build a signed OAuth state parameter carrying the frontend URL and a
/// fresh nonce: `frontend_url|nonce|timestamp_hex|signature_hex`,
/// base64url-encoded.
fn sign_state(frontend_url: &str, secret: &[u8]) -> Result<String> {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("System time error: {}", e)))?
        .as_millis();

    let nonce = uuid::Uuid::new_v4().to_string();
    let state_payload = format!("{}|{}|{:x}", frontend_url, nonce, timestamp);

    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
    mac.update(state_payload.as_bytes());
    let signature = mac.finalize().into_bytes();

    let signed_state = format!("{}|{}", state_payload, hex::encode(signature));

    Ok(URL_SAFE_NO_PAD.encode(signed_state.as_bytes()))
}

/// Verify the HMAC signature and decode the frontend URL and nonce from
/// the OAuth state parameter.
fn verify_and_decode_state(state: &str, secret: &[u8]) -> Option<(String, String)> {
    let bytes = URL_SAFE_NO_PAD.decode(state).ok()?;
    let state_str = String::from_utf8(bytes).ok()?;

    // Format is "frontend_url|nonce|timestamp_hex|signature_hex"
    let parts: Vec<&str> = state_str.splitn(4, '|').collect();
    if parts.len() != 4 {
        return None;
    }

    let frontend_url = parts[0];
    let nonce = parts[1];
    let timestamp_hex = parts[2];
    let signature_hex = parts[3];

    // Reconstruct payload and verify signature
    let payload = format!("{}|{}|{}", frontend_url, nonce, timestamp_hex);

    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(payload.as_bytes());

    let expected_signature = hex::encode(mac.finalize().into_bytes());

    if signature_hex != expected_signature {
        tracing::error!("OAuth state signature mismatch! Potential tampering.");
        return None;
    }

    Some((frontend_url.to_string(), nonce.to_string()))
}
