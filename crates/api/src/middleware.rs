//! Session authentication middleware.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::CookieJar;
use common::SessionToken;

use crate::error::ApiError;
use crate::state::{AppState, CurrentUser};

/// Reads the session token from the cookie jar, if well formed.
pub fn session_token(state: &AppState, jar: &CookieJar) -> Option<SessionToken> {
    jar.get(&state.cookie.name)
        .and_then(|cookie| cookie.value().parse().ok())
}

/// Resolves the session cookie and slides the session forward.
///
/// On success the request carries a [`CurrentUser`] extension and the
/// response refreshes the cookie's `Max-Age`. Otherwise the cookie is
/// cleared and the request is rejected with 401.
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let Some(token) = session_token(&state, &jar) else {
        return reject(&state, jar, ApiError::Unauthorized("login required".to_string()));
    };

    let session = match state.sessions.touch(token).await {
        Ok(session) => session,
        Err(err) => {
            tracing::debug!(error = %err, "session rejected");
            return reject(&state, jar, err.into());
        }
    };

    let Some(role) = state.users.role_of(&session.username).await else {
        state.sessions.destroy(token).await;
        return reject(&state, jar, ApiError::Unauthorized("unknown user".to_string()));
    };

    req.extensions_mut().insert(CurrentUser {
        token,
        expires_at: session.expires_at(state.sessions.expire_after()),
        username: session.username,
        role,
    });

    let response = next.run(req).await;
    (jar.add(state.cookie.session_cookie(token)), response).into_response()
}

fn reject(state: &AppState, jar: CookieJar, err: ApiError) -> Response {
    (jar.remove(state.cookie.removal_cookie()), err).into_response()
}
