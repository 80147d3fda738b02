//! Inventory service trait and in-memory implementation.

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use cart::{CartLine, LineKey, SellerName};
use common::Role;
use indexmap::IndexMap;

use crate::error::InventoryError;

/// A listing in the item store. Same shape as a cart line; the quantity is
/// the stock on offer.
pub type InventoryLine = CartLine;

/// A mutating call received by [`InMemoryInventoryService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InventoryCall {
    /// Listing overwritten with a lower quantity.
    Decrement { key: LineKey, quantity: u32 },
    /// Listing removed.
    Delete { key: LineKey },
    /// Listing created by its seller.
    Add { key: LineKey, quantity: u32 },
    /// Listing rewritten by its seller.
    Update { key: LineKey, quantity: u32 },
}

/// Access to the authoritative item store.
///
/// `role` selects which side of the store API the call goes through.
/// Listing management (`fetch_seller`, `add`, `update`) always goes
/// through the seller side.
#[async_trait]
pub trait InventoryService: Send + Sync {
    /// Fetches every listing currently on offer.
    async fn fetch_all(&self, role: Role) -> Result<Vec<InventoryLine>, InventoryError>;

    /// Fetches the listings of one seller. A seller with no listings gets
    /// an empty list.
    async fn fetch_seller(&self, seller: &SellerName)
    -> Result<Vec<InventoryLine>, InventoryError>;

    /// Creates a listing. Fails with `Conflict` if one already exists for
    /// the same item and seller.
    async fn add(&self, listing: &InventoryLine) -> Result<(), InventoryError>;

    /// Rewrites an existing listing. Fails with `NotFound` if there is none.
    async fn update(&self, listing: &InventoryLine) -> Result<(), InventoryError>;

    /// Overwrites the listing for `key` with `remaining`.
    async fn decrement(
        &self,
        role: Role,
        key: &LineKey,
        remaining: &InventoryLine,
    ) -> Result<(), InventoryError>;

    /// Removes the listing for `key`.
    async fn delete(&self, role: Role, key: &LineKey) -> Result<(), InventoryError>;
}

#[async_trait]
impl<T: InventoryService + ?Sized> InventoryService for Arc<T> {
    async fn fetch_all(&self, role: Role) -> Result<Vec<InventoryLine>, InventoryError> {
        (**self).fetch_all(role).await
    }

    async fn fetch_seller(
        &self,
        seller: &SellerName,
    ) -> Result<Vec<InventoryLine>, InventoryError> {
        (**self).fetch_seller(seller).await
    }

    async fn add(&self, listing: &InventoryLine) -> Result<(), InventoryError> {
        (**self).add(listing).await
    }

    async fn update(&self, listing: &InventoryLine) -> Result<(), InventoryError> {
        (**self).update(listing).await
    }

    async fn decrement(
        &self,
        role: Role,
        key: &LineKey,
        remaining: &InventoryLine,
    ) -> Result<(), InventoryError> {
        (**self).decrement(role, key, remaining).await
    }

    async fn delete(&self, role: Role, key: &LineKey) -> Result<(), InventoryError> {
        (**self).delete(role, key).await
    }
}

#[derive(Debug, Default)]
struct InMemoryInventoryState {
    listings: IndexMap<LineKey, InventoryLine>,
    calls: Vec<InventoryCall>,
    failing: HashSet<LineKey>,
    fail_on_fetch: bool,
}

/// In-memory item store, used when no remote store is configured and in
/// tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryInventoryService {
    state: Arc<RwLock<InMemoryInventoryState>>,
}

impl InMemoryInventoryService {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding `listings`.
    pub fn with_listings(listings: impl IntoIterator<Item = InventoryLine>) -> Self {
        let service = Self::new();
        for listing in listings {
            service.upsert(listing);
        }
        service
    }

    /// Adds or replaces a listing.
    pub fn upsert(&self, listing: InventoryLine) {
        self.write().listings.insert(listing.key(), listing);
    }

    /// Returns the listing for `key`, if any.
    pub fn listing(&self, key: &LineKey) -> Option<InventoryLine> {
        self.read().listings.get(key).cloned()
    }

    /// Returns the number of listings.
    pub fn listing_count(&self) -> usize {
        self.read().listings.len()
    }

    /// Makes every mutating call on `key` fail until cleared.
    pub fn set_fail_on(&self, key: LineKey, fail: bool) {
        let mut state = self.write();
        if fail {
            state.failing.insert(key);
        } else {
            state.failing.remove(&key);
        }
    }

    /// Makes `fetch_all` and `fetch_seller` fail until cleared.
    pub fn set_fail_on_fetch(&self, fail: bool) {
        self.write().fail_on_fetch = fail;
    }

    /// Returns every successful mutating call, in order.
    pub fn calls(&self) -> Vec<InventoryCall> {
        self.read().calls.clone()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, InMemoryInventoryState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, InMemoryInventoryState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl InventoryService for InMemoryInventoryService {
    async fn fetch_all(&self, _role: Role) -> Result<Vec<InventoryLine>, InventoryError> {
        let state = self.read();
        if state.fail_on_fetch {
            return Err(InventoryError::Failed("item store unavailable".to_string()));
        }
        Ok(state.listings.values().cloned().collect())
    }

    async fn fetch_seller(
        &self,
        seller: &SellerName,
    ) -> Result<Vec<InventoryLine>, InventoryError> {
        let state = self.read();
        if state.fail_on_fetch {
            return Err(InventoryError::Failed("item store unavailable".to_string()));
        }
        Ok(state
            .listings
            .values()
            .filter(|l| &l.seller == seller)
            .cloned()
            .collect())
    }

    async fn add(&self, listing: &InventoryLine) -> Result<(), InventoryError> {
        let key = listing.key();
        let mut state = self.write();
        if state.failing.contains(&key) {
            return Err(InventoryError::Failed(format!("add of {key} rejected")));
        }
        if state.listings.contains_key(&key) {
            return Err(InventoryError::Conflict(format!("{key} already listed")));
        }

        state.listings.insert(key.clone(), listing.clone());
        state.calls.push(InventoryCall::Add {
            key,
            quantity: listing.quantity,
        });
        Ok(())
    }

    async fn update(&self, listing: &InventoryLine) -> Result<(), InventoryError> {
        let key = listing.key();
        let mut state = self.write();
        if state.failing.contains(&key) {
            return Err(InventoryError::Failed(format!("update of {key} rejected")));
        }
        let Some(existing) = state.listings.get_mut(&key) else {
            return Err(InventoryError::NotFound(key.to_string()));
        };

        *existing = listing.clone();
        state.calls.push(InventoryCall::Update {
            key,
            quantity: listing.quantity,
        });
        Ok(())
    }

    async fn decrement(
        &self,
        _role: Role,
        key: &LineKey,
        remaining: &InventoryLine,
    ) -> Result<(), InventoryError> {
        let mut state = self.write();
        if state.failing.contains(key) {
            return Err(InventoryError::Failed(format!("update of {key} rejected")));
        }
        if !state.listings.contains_key(key) {
            return Err(InventoryError::NotFound(key.to_string()));
        }
        if remaining.key() != *key {
            return Err(InventoryError::Conflict(format!(
                "cannot rename {key} to {}",
                remaining.key()
            )));
        }

        state.listings.insert(key.clone(), remaining.clone());
        state.calls.push(InventoryCall::Decrement {
            key: key.clone(),
            quantity: remaining.quantity,
        });
        Ok(())
    }

    async fn delete(&self, _role: Role, key: &LineKey) -> Result<(), InventoryError> {
        let mut state = self.write();
        if state.failing.contains(key) {
            return Err(InventoryError::Failed(format!("delete of {key} rejected")));
        }
        if state.listings.shift_remove(key).is_none() {
            return Err(InventoryError::NotFound(key.to_string()));
        }

        state.calls.push(InventoryCall::Delete { key: key.clone() });
        Ok(())
    }
}
