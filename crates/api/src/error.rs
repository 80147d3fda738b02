//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use cart::CartError;
use checkout::{CheckoutError, InventoryError};
use serde_json::json;
use session::SessionError;

use crate::users::UserError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// No valid session.
    Unauthorized(String),
    /// Authenticated but not allowed.
    Forbidden(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Session table error.
    Session(SessionError),
    /// Cart error.
    Cart(CartError),
    /// Checkout error.
    Checkout(CheckoutError),
    /// Item store error outside checkout.
    Inventory(InventoryError),
    /// Account error.
    User(UserError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, json!({ "error": msg })),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, json!({ "error": msg })),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            ApiError::Session(err) => (session_status(&err), json!({ "error": err.to_string() })),
            ApiError::Cart(err) => (cart_status(&err), json!({ "error": err.to_string() })),
            ApiError::Checkout(err) => checkout_error_to_response(err),
            ApiError::Inventory(err) => {
                (inventory_status(&err), json!({ "error": err.to_string() }))
            }
            ApiError::User(err) => user_error_to_response(err),
        };

        (status, axum::Json(body)).into_response()
    }
}

fn session_status(err: &SessionError) -> StatusCode {
    match err {
        SessionError::NotFound | SessionError::Expired => StatusCode::UNAUTHORIZED,
        SessionError::ConcurrentLoginRejected { .. } => StatusCode::CONFLICT,
    }
}

fn cart_status(err: &CartError) -> StatusCode {
    match err {
        CartError::InvalidPosition { .. } | CartError::NotFound { .. } => StatusCode::NOT_FOUND,
        CartError::DuplicateLine { .. } => StatusCode::CONFLICT,
        CartError::InvalidLine(_) | CartError::InsufficientStock { .. } => StatusCode::BAD_REQUEST,
    }
}

fn inventory_status(err: &InventoryError) -> StatusCode {
    match err {
        InventoryError::NotFound(_) => StatusCode::NOT_FOUND,
        InventoryError::Conflict(_) => StatusCode::CONFLICT,
        InventoryError::Failed(e) => {
            tracing::warn!(error = %e, "item store call failed");
            StatusCode::BAD_GATEWAY
        }
    }
}

fn checkout_error_to_response(err: CheckoutError) -> (StatusCode, serde_json::Value) {
    let message = err.to_string();
    match err {
        CheckoutError::PartialFailure { applied, failures } => {
            let failed: Vec<_> = failures
                .iter()
                .map(|f| {
                    json!({
                        "item": f.line.item,
                        "seller": f.line.seller,
                        "quantity": f.line.quantity,
                        "action": f.action.as_str(),
                        "reason": f.reason.to_string(),
                    })
                })
                .collect();
            (
                StatusCode::CONFLICT,
                json!({ "error": message, "applied": applied, "failed": failed }),
            )
        }
        CheckoutError::InventoryCallFailed(_) => {
            (StatusCode::BAD_GATEWAY, json!({ "error": message }))
        }
        CheckoutError::CheckoutInProgress { .. } => {
            (StatusCode::CONFLICT, json!({ "error": message }))
        }
        CheckoutError::EmptyCart => (StatusCode::BAD_REQUEST, json!({ "error": message })),
    }
}

fn user_error_to_response(err: UserError) -> (StatusCode, serde_json::Value) {
    let status = match &err {
        UserError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        UserError::AlreadyExists(_) => StatusCode::CONFLICT,
        UserError::Invalid(_) => StatusCode::BAD_REQUEST,
        UserError::Hash(_) | UserError::Load(_) => {
            tracing::error!(error = %err, "account store failure");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, json!({ "error": err.to_string() }))
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        ApiError::Session(err)
    }
}

impl From<CartError> for ApiError {
    fn from(err: CartError) -> Self {
        ApiError::Cart(err)
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        ApiError::Checkout(err)
    }
}

impl From<InventoryError> for ApiError {
    fn from(err: InventoryError) -> Self {
        ApiError::Inventory(err)
    }
}

impl From<UserError> for ApiError {
    fn from(err: UserError) -> Self {
        ApiError::User(err)
    }
}

/// Errors that stop the server from starting.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Invalid INVENTORY_URL '{url}': {reason}")]
    InventoryUrl { url: String, reason: String },

    #[error(transparent)]
    Inventory(#[from] checkout::InventoryError),

    #[error(transparent)]
    Users(#[from] UserError),
}
