//! Cart error types.

use thiserror::Error;

/// Errors that can occur during cart operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CartError {
    /// Position is outside `1..=size`.
    #[error("Invalid position {position}: cart has {size} line(s)")]
    InvalidPosition { position: usize, size: usize },

    /// No line for the given item and seller.
    #[error("Line not found: {item} from {seller}")]
    NotFound { item: String, seller: String },

    /// Replacing a line would duplicate another line's key.
    #[error("Cart already holds {item} from {seller} at position {position}")]
    DuplicateLine {
        item: String,
        seller: String,
        position: usize,
    },

    /// Adding the line would take more than the seller has listed.
    #[error("Only {available} more of {item} from {seller} available")]
    InsufficientStock {
        item: String,
        seller: String,
        available: u32,
    },

    /// The line itself is malformed.
    #[error("Invalid line: {0}")]
    InvalidLine(String),
}

/// Convenience type alias for cart results.
pub type Result<T> = std::result::Result<T, CartError>;
