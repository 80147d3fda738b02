//! Session error types.

use thiserror::Error;

/// Errors returned by session table operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// No session exists for the presented token.
    #[error("Session not found")]
    NotFound,

    /// The session was idle for longer than the expiry window.
    #[error("Session expired")]
    Expired,

    /// The user already holds an active session.
    #[error("User '{username}' is already logged in on another session")]
    ConcurrentLoginRejected { username: String },
}

/// Convenience type alias for session results.
pub type Result<T> = std::result::Result<T, SessionError>;
