//! Shopping carts for the marketplace.
//!
//! A [`Cart`] is an insertion-ordered set of [`CartLine`]s keyed by
//! `(item, seller)`; adding a line whose key is already present merges the
//! quantities. Lines are addressed by 1-based position for display-driven
//! edits. [`CartStore`] holds one cart per buyer behind a lock.

pub mod cart;
pub mod error;
pub mod store;
pub mod value_objects;

pub use cart::Cart;
pub use error::{CartError, Result};
pub use store::CartStore;
pub use value_objects::{CartLine, ItemName, LineKey, MAX_UNIT_COST_CENTS, Money, SellerName};
