//! Checkout coordinator reconciling carts against the item store.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use cart::{CartLine, CartStore, LineKey, Money};
use common::{Clock, Role, SystemClock};
use serde::Serialize;

use crate::error::{CheckoutError, InventoryError, LineFailure, Result};
use crate::invoice::Invoice;
use crate::plan::{LineAction, available_listing, plan_line};
use crate::services::{InventoryLine, InventoryService, NotificationService};

/// Outcome of a checkout where every line was applied.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutReceipt {
    pub buyer: String,
    /// Lines applied against the item store, in cart order.
    pub lines: Vec<CartLine>,
    pub total: Money,
    pub invoice: Invoice,
    /// False if the notifier failed. Inventory changes stand regardless.
    pub invoice_sent: bool,
}

/// Marks a buyer as checking out until dropped.
struct InFlight {
    buyers: Arc<Mutex<HashSet<String>>>,
    buyer: String,
}

impl InFlight {
    fn acquire(buyers: &Arc<Mutex<HashSet<String>>>, buyer: &str) -> Option<Self> {
        let inserted = buyers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(buyer.to_string());
        inserted.then(|| Self {
            buyers: Arc::clone(buyers),
            buyer: buyer.to_string(),
        })
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.buyers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.buyer);
    }
}

/// Applies buyer carts against the authoritative item store.
///
/// Each line is applied on its own and its applied quantity is taken out
/// of the cart as soon as its store call succeeds; quantity merged into
/// the line while checkout runs stays behind for the next checkout. A failed line stays in the cart and the checkout
/// reports a partial failure, so calling `checkout` again only retries the
/// lines that are still outstanding.
pub struct CheckoutCoordinator<I, N>
where
    I: InventoryService,
    N: NotificationService,
{
    carts: CartStore,
    inventory: I,
    notifier: N,
    clock: Arc<dyn Clock>,
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl<I, N> CheckoutCoordinator<I, N>
where
    I: InventoryService,
    N: NotificationService,
{
    /// Creates a coordinator over `carts`.
    pub fn new(carts: CartStore, inventory: I, notifier: N) -> Self {
        Self::with_clock(carts, inventory, notifier, Arc::new(SystemClock))
    }

    /// Creates a coordinator that stamps invoices with `clock`.
    pub fn with_clock(carts: CartStore, inventory: I, notifier: N, clock: Arc<dyn Clock>) -> Self {
        Self {
            carts,
            inventory,
            notifier,
            clock,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Returns the cart store this coordinator drains.
    pub fn carts(&self) -> &CartStore {
        &self.carts
    }

    /// Returns the item store.
    pub fn inventory(&self) -> &I {
        &self.inventory
    }

    /// Returns the invoice notifier.
    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Checks out `buyer`'s cart.
    ///
    /// Fails with `EmptyCart` if there is nothing to buy, with
    /// `InventoryCallFailed` if the listing could not be fetched (the cart
    /// is untouched), and with `PartialFailure` if any line's store call
    /// failed (the cart then holds exactly those lines).
    #[tracing::instrument(skip(self, role), fields(role = %role))]
    pub async fn checkout(&self, buyer: &str, role: Role) -> Result<CheckoutReceipt> {
        let _guard = InFlight::acquire(&self.in_flight, buyer).ok_or_else(|| {
            CheckoutError::CheckoutInProgress {
                buyer: buyer.to_string(),
            }
        })?;

        let lines = self.carts.all_lines(buyer).await;
        if lines.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        metrics::counter!("checkout_executions_total").increment(1);
        let started = std::time::Instant::now();

        let listings = match self.inventory.fetch_all(role).await {
            Ok(listings) => listings,
            Err(e) => {
                metrics::counter!("checkout_failed").increment(1);
                tracing::warn!(error = %e, "inventory fetch failed, cart untouched");
                return Err(CheckoutError::InventoryCallFailed(e));
            }
        };
        let listed: HashMap<LineKey, InventoryLine> =
            listings.into_iter().map(|l| (l.key(), l)).collect();

        let mut applied = Vec::with_capacity(lines.len());
        let mut failures = Vec::new();

        for line in lines {
            let key = line.key();
            let action = plan_line(&line, listed.get(&key));
            tracing::info!(line = %key, action = action.as_str(), "applying cart line");

            match self.apply(role, &key, &action).await {
                Ok(()) => {
                    if let Some(left) = self.carts.settle(buyer, &line).await {
                        tracing::info!(
                            line = %key,
                            left = left.quantity,
                            "quantity added during checkout stays in cart"
                        );
                    }
                    applied.push(line);
                }
                Err(reason) => {
                    metrics::counter!("checkout_line_failures_total").increment(1);
                    tracing::warn!(line = %key, error = %reason, "cart line not applied");
                    failures.push(LineFailure {
                        line,
                        action,
                        reason,
                    });
                }
            }
        }

        let duration = started.elapsed().as_secs_f64();
        metrics::histogram!("checkout_duration_seconds").record(duration);

        if !failures.is_empty() {
            metrics::counter!("checkout_failed").increment(1);
            tracing::warn!(
                applied = applied.len(),
                failed = failures.len(),
                "checkout partially failed"
            );
            return Err(CheckoutError::PartialFailure {
                applied: applied.len(),
                failures,
            });
        }

        let invoice = Invoice::new(buyer, &applied, self.clock.now());
        let invoice_sent = match self.notifier.send_invoice(&invoice).await {
            Ok(()) => true,
            Err(e) => {
                metrics::counter!("invoice_failures_total").increment(1);
                tracing::error!(error = %e, "invoice not sent; inventory changes kept");
                false
            }
        };

        metrics::counter!("checkout_completed").increment(1);
        tracing::info!(lines = applied.len(), total = %invoice.total, duration, "checkout completed");

        Ok(CheckoutReceipt {
            buyer: buyer.to_string(),
            total: invoice.total,
            lines: applied,
            invoice,
            invoice_sent,
        })
    }

    /// Returns the listings `buyer` can still add, net of their own cart.
    #[tracing::instrument(skip(self, role), fields(role = %role))]
    pub async fn storefront(&self, buyer: &str, role: Role) -> Result<Vec<InventoryLine>> {
        let listings = self
            .inventory
            .fetch_all(role)
            .await
            .map_err(CheckoutError::InventoryCallFailed)?;
        let cart = self.carts.all_lines(buyer).await;
        Ok(available_listing(listings, &cart))
    }

    async fn apply(
        &self,
        role: Role,
        key: &LineKey,
        action: &LineAction,
    ) -> std::result::Result<(), InventoryError> {
        match action {
            LineAction::Decrement { remaining } => {
                self.inventory.decrement(role, key, remaining).await
            }
            LineAction::Delete => self.inventory.delete(role, key).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{InMemoryInventoryService, InMemoryNotificationService, InventoryCall};

    fn line(item: &str, seller: &str, quantity: u32, cents: i64) -> CartLine {
        CartLine::new(item, seller, quantity, Money::from_cents(cents))
    }

    fn coordinator(
        listings: Vec<InventoryLine>,
    ) -> CheckoutCoordinator<InMemoryInventoryService, InMemoryNotificationService> {
        CheckoutCoordinator::new(
            CartStore::new(),
            InMemoryInventoryService::with_listings(listings),
            InMemoryNotificationService::new(),
        )
    }

    #[tokio::test]
    async fn test_full_checkout_clears_cart_and_sends_invoice() {
        let coordinator = coordinator(vec![line("Pear", "S2", 10, 150)]);
        coordinator
            .carts()
            .add_or_merge("buyer1", line("Pear", "S2", 2, 150))
            .await
            .unwrap();

        let receipt = coordinator.checkout("buyer1", Role::Buyer).await.unwrap();

        assert_eq!(receipt.lines.len(), 1);
        assert_eq!(receipt.total, Money::from_cents(300));
        assert!(receipt.invoice_sent);
        assert!(coordinator.carts().all_lines("buyer1").await.is_empty());
        assert_eq!(coordinator.notifier().sent().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_cart() {
        let coordinator = coordinator(vec![]);
        let result = coordinator.checkout("buyer1", Role::Buyer).await;
        assert!(matches!(result, Err(CheckoutError::EmptyCart)));
        assert!(coordinator.inventory().calls().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_failure_leaves_cart_untouched() {
        let coordinator = coordinator(vec![line("Pear", "S2", 10, 150)]);
        coordinator
            .carts()
            .add_or_merge("buyer1", line("Pear", "S2", 2, 150))
            .await
            .unwrap();
        coordinator.inventory().set_fail_on_fetch(true);

        let result = coordinator.checkout("buyer1", Role::Buyer).await;

        assert!(matches!(result, Err(CheckoutError::InventoryCallFailed(_))));
        assert_eq!(coordinator.carts().len("buyer1").await, 1);
        assert!(coordinator.inventory().calls().is_empty());
    }

    #[tokio::test]
    async fn test_notifier_failure_does_not_undo_checkout() {
        let coordinator = coordinator(vec![line("Apple", "S1", 3, 200)]);
        coordinator
            .carts()
            .add_or_merge("buyer1", line("Apple", "S1", 3, 200))
            .await
            .unwrap();
        coordinator.notifier().set_fail_on_send(true);

        let receipt = coordinator.checkout("buyer1", Role::Buyer).await.unwrap();

        assert!(!receipt.invoice_sent);
        assert_eq!(
            coordinator.inventory().calls(),
            vec![InventoryCall::Delete {
                key: LineKey::new("Apple", "S1")
            }]
        );
        assert!(coordinator.carts().all_lines("buyer1").await.is_empty());
    }

    #[tokio::test]
    async fn test_in_flight_guard_rejects_second_checkout() {
        let coordinator = coordinator(vec![]);
        let held = InFlight::acquire(&coordinator.in_flight, "buyer1").unwrap();

        let result = coordinator.checkout("buyer1", Role::Buyer).await;
        assert!(matches!(
            result,
            Err(CheckoutError::CheckoutInProgress { ref buyer }) if buyer == "buyer1"
        ));

        drop(held);
        let result = coordinator.checkout("buyer1", Role::Buyer).await;
        assert!(matches!(result, Err(CheckoutError::EmptyCart)));
    }

    #[tokio::test]
    async fn test_storefront_hides_what_cart_takes() {
        let coordinator = coordinator(vec![
            line("Apple", "S1", 3, 200),
            line("Pear", "S2", 10, 150),
        ]);
        coordinator
            .carts()
            .add_or_merge("buyer1", line("Apple", "S1", 3, 200))
            .await
            .unwrap();
        coordinator
            .carts()
            .add_or_merge("buyer1", line("Pear", "S2", 4, 150))
            .await
            .unwrap();

        let listing = coordinator.storefront("buyer1", Role::Buyer).await.unwrap();

        assert_eq!(listing, vec![line("Pear", "S2", 6, 150)]);
        let other = coordinator.storefront("buyer2", Role::Buyer).await.unwrap();
        assert_eq!(other.len(), 2);
    }
}
