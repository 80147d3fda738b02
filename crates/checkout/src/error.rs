//! Checkout error types.

use cart::CartLine;
use thiserror::Error;

use crate::plan::LineAction;

/// Failure reported by the item store for a single call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InventoryError {
    /// The listing does not exist.
    #[error("Item not found: {0}")]
    NotFound(String),

    /// The store refused the update.
    #[error("Inventory conflict: {0}")]
    Conflict(String),

    /// Transport failure or unexpected response.
    #[error("Inventory call failed: {0}")]
    Failed(String),
}

/// Failure reported by the invoice notifier.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Invoice notification failed: {0}")]
pub struct NotificationError(pub String);

/// A cart line whose inventory call failed during checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineFailure {
    /// The line as it was in the cart.
    pub line: CartLine,
    /// What was attempted against the item store.
    pub action: LineAction,
    /// Why it failed.
    pub reason: InventoryError,
}

/// Errors that can occur during checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The inventory snapshot could not be fetched; nothing was applied.
    #[error("Inventory service error: {0}")]
    InventoryCallFailed(InventoryError),

    /// One or more lines failed; they remain in the cart for a retry.
    #[error("Checkout partially failed: {applied} line(s) applied, {} line(s) left in cart", .failures.len())]
    PartialFailure {
        applied: usize,
        failures: Vec<LineFailure>,
    },

    /// The buyer's cart holds no lines.
    #[error("Cart is empty")]
    EmptyCart,

    /// Another checkout for the same buyer is still running.
    #[error("A checkout for '{buyer}' is already in progress")]
    CheckoutInProgress { buyer: String },
}

/// Convenience type alias for checkout results.
pub type Result<T> = std::result::Result<T, CheckoutError>;
