//! Per-line reconciliation rules.

use std::collections::HashMap;

use cart::{CartLine, LineKey};
use serde::{Deserialize, Serialize};

use crate::services::InventoryLine;

/// What checkout does to the item store for one cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum LineAction {
    /// Overwrite the listing with the stock left after this purchase.
    Decrement { remaining: InventoryLine },
    /// Remove the listing; the cart takes all of it (or it is not listed).
    Delete,
}

impl LineAction {
    /// Returns the action name for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            LineAction::Decrement { .. } => "decrement",
            LineAction::Delete => "delete",
        }
    }
}

/// Decides the store call for `line` given its current listing.
///
/// Only stock strictly greater than the requested quantity is decremented;
/// anything else, including a missing listing, is a delete.
pub fn plan_line(line: &CartLine, listed: Option<&InventoryLine>) -> LineAction {
    match listed {
        Some(listing) if listing.quantity > line.quantity => LineAction::Decrement {
            remaining: InventoryLine {
                quantity: listing.quantity - line.quantity,
                ..listing.clone()
            },
        },
        _ => LineAction::Delete,
    }
}

/// Returns the listings still available to a buyer once their own cart is
/// taken into account.
///
/// Listings the cart fully consumes are dropped; the rest show the stock
/// left after the cart's quantity.
pub fn available_listing(inventory: Vec<InventoryLine>, cart: &[CartLine]) -> Vec<InventoryLine> {
    let wanted: HashMap<LineKey, u32> = cart.iter().map(|l| (l.key(), l.quantity)).collect();

    inventory
        .into_iter()
        .filter_map(|mut listing| match wanted.get(&listing.key()) {
            None => Some(listing),
            Some(&quantity) if listing.quantity > quantity => {
                listing.quantity -= quantity;
                Some(listing)
            }
            Some(_) => None,
        })
        .collect()
}
