//! Login, logout and signup endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use axum_extra::extract::cookie::CookieJar;
use chrono::{DateTime, Utc};
use common::Role;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::middleware::session_token;
use crate::state::{AppState, CurrentUser};

// -- Request types --

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub password: String,
    pub role: Role,
    #[serde(default)]
    pub full_name: String,
}

// -- Response types --

#[derive(Serialize)]
pub struct SessionResponse {
    pub username: String,
    pub role: Role,
    pub expires_in_secs: i64,
}

#[derive(Serialize)]
pub struct CurrentSessionResponse {
    pub username: String,
    pub role: Role,
    pub expires_in_secs: i64,
    pub expires_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub status: &'static str,
}

// -- Handlers --

/// POST /login: check credentials and open a session.
#[tracing::instrument(skip(state, jar, req), fields(username = %req.username))]
pub async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<(CookieJar, Json<SessionResponse>), ApiError> {
    // Fire and forget; the login does not wait for the sweep.
    let _ = state.sessions.maybe_sweep().await;

    let role = state.users.verify(&req.username, &req.password).await?;
    let token = state.sessions.create_session(&req.username).await?;

    tracing::info!(%role, "user logged in");
    let response = SessionResponse {
        username: req.username,
        role,
        expires_in_secs: state.cookie.max_age_secs,
    };
    Ok((jar.add(state.cookie.session_cookie(token)), Json(response)))
}

/// POST /logout: close the session and clear the cookie.
#[tracing::instrument(skip(state, jar))]
pub async fn logout(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<MessageResponse>), ApiError> {
    let token = session_token(&state, &jar)
        .ok_or_else(|| ApiError::Unauthorized("login required".to_string()))?;

    if !state.sessions.destroy(token).await {
        tracing::debug!("logout for a session that was already gone");
    }

    Ok((
        jar.remove(state.cookie.removal_cookie()),
        Json(MessageResponse { status: "logged out" }),
    ))
}

/// POST /signup: register a buyer or seller.
#[tracing::instrument(skip(state, req), fields(username = %req.username, role = %req.role))]
pub async fn signup(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    state
        .users
        .register(&req.username, &req.password, req.role, &req.full_name)
        .await?;
    Ok((StatusCode::CREATED, Json(MessageResponse { status: "registered" })))
}

/// GET /session: describe the current session.
pub async fn current(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> Json<CurrentSessionResponse> {
    Json(CurrentSessionResponse {
        username: user.username,
        role: user.role,
        expires_in_secs: state.cookie.max_age_secs,
        expires_at: user.expires_at,
    })
}
