//! Per-buyer cart storage.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::cart::Cart;
use crate::error::{CartError, Result};
use crate::value_objects::{CartLine, LineKey, Money};

/// Holds one cart per buyer.
///
/// Structural changes take the write lock, so a double-submitted form for
/// the same buyer is applied one request after the other. Reads return
/// snapshots. Clones share the same carts.
#[derive(Clone, Default)]
pub struct CartStore {
    carts: Arc<RwLock<HashMap<String, Cart>>>,
}

impl CartStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a line to the buyer's cart, merging with an existing line.
    ///
    /// Returns the 1-based position of the line.
    #[tracing::instrument(skip(self, line), fields(item = %line.item, seller = %line.seller))]
    pub async fn add_or_merge(&self, buyer: &str, line: CartLine) -> Result<usize> {
        let quantity = line.quantity;
        let mut carts = self.carts.write().await;
        let position = carts.entry(buyer.to_string()).or_default().add_or_merge(line)?;

        metrics::counter!("cart_lines_added_total").increment(1);
        tracing::debug!(position, quantity, "cart line added");
        Ok(position)
    }

    /// Adds a line unless the merged quantity would exceed `stock`.
    ///
    /// The check and the merge happen under one write lock, so concurrent
    /// adds for the same buyer cannot together overshoot `stock`. Returns
    /// the merged line and its 1-based position.
    #[tracing::instrument(skip(self, line), fields(item = %line.item, seller = %line.seller))]
    pub async fn add_within(
        &self,
        buyer: &str,
        line: CartLine,
        stock: u32,
    ) -> Result<(CartLine, usize)> {
        let quantity = line.quantity;
        let mut carts = self.carts.write().await;
        let cart = carts.entry(buyer.to_string()).or_default();
        let position = cart.add_within(line, stock)?;
        let merged = cart.get(position)?.clone();

        metrics::counter!("cart_lines_added_total").increment(1);
        tracing::debug!(position, quantity, "cart line added");
        Ok((merged, position))
    }

    /// Finds a line by key, returning a copy and its 1-based position.
    pub async fn find(&self, buyer: &str, key: &LineKey) -> Result<(CartLine, usize)> {
        let carts = self.carts.read().await;
        match carts.get(buyer) {
            Some(cart) => cart.find(key).map(|(line, pos)| (line.clone(), pos)),
            None => Err(CartError::NotFound {
                item: key.item.to_string(),
                seller: key.seller.to_string(),
            }),
        }
    }

    /// Overwrites the line at a 1-based position, returning the old line.
    #[tracing::instrument(skip(self, line))]
    pub async fn replace_at(&self, buyer: &str, position: usize, line: CartLine) -> Result<CartLine> {
        let mut carts = self.carts.write().await;
        match carts.get_mut(buyer) {
            Some(cart) => cart.replace_at(position, line),
            None => Err(CartError::InvalidPosition { position, size: 0 }),
        }
    }

    /// Changes the quantity of the line at a 1-based position, keeping its
    /// key and cost. Returns the updated line.
    #[tracing::instrument(skip(self))]
    pub async fn set_quantity(&self, buyer: &str, position: usize, quantity: u32) -> Result<CartLine> {
        let mut carts = self.carts.write().await;
        let cart = carts
            .get_mut(buyer)
            .ok_or(CartError::InvalidPosition { position, size: 0 })?;
        let updated = CartLine {
            quantity,
            ..cart.get(position)?.clone()
        };
        cart.replace_at(position, updated.clone())?;
        Ok(updated)
    }

    /// Removes the line at a 1-based position.
    #[tracing::instrument(skip(self))]
    pub async fn remove_at(&self, buyer: &str, position: usize) -> Result<CartLine> {
        let mut carts = self.carts.write().await;
        match carts.get_mut(buyer) {
            Some(cart) => cart.remove_at(position),
            None => Err(CartError::InvalidPosition { position, size: 0 }),
        }
    }

    /// Takes a line checkout applied out of the buyer's cart, keeping any
    /// quantity merged in since checkout read the cart. Returns the line
    /// left behind, if any.
    pub async fn settle(&self, buyer: &str, applied: &CartLine) -> Option<CartLine> {
        self.carts
            .write()
            .await
            .get_mut(buyer)
            .and_then(|cart| cart.settle(applied))
    }

    /// Returns a snapshot of the buyer's lines in order. Empty if the buyer
    /// has no cart.
    pub async fn all_lines(&self, buyer: &str) -> Vec<CartLine> {
        self.carts
            .read()
            .await
            .get(buyer)
            .map(Cart::lines)
            .unwrap_or_default()
    }

    /// Returns a snapshot of the buyer's whole cart.
    pub async fn snapshot(&self, buyer: &str) -> Cart {
        self.carts
            .read()
            .await
            .get(buyer)
            .cloned()
            .unwrap_or_default()
    }

    /// Returns the cost of the buyer's cart.
    pub async fn total(&self, buyer: &str) -> Money {
        self.carts
            .read()
            .await
            .get(buyer)
            .map(Cart::total)
            .unwrap_or_default()
    }

    /// Empties the buyer's cart.
    #[tracing::instrument(skip(self))]
    pub async fn clear(&self, buyer: &str) {
        self.carts.write().await.remove(buyer);
    }

    /// Returns the number of lines in the buyer's cart.
    pub async fn len(&self, buyer: &str) -> usize {
        self.carts.read().await.get(buyer).map_or(0, Cart::len)
    }
}
