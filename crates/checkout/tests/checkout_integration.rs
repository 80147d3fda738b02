//! Integration tests for cart checkout reconciliation.

use std::sync::Arc;

use async_trait::async_trait;
use cart::{CartLine, CartStore, LineKey, Money, SellerName};
use checkout::{
    CheckoutCoordinator, CheckoutError, InMemoryInventoryService, InMemoryNotificationService,
    InventoryCall, InventoryError, InventoryLine, InventoryService, LineAction,
};
use common::Role;
use tokio::sync::Notify;

type TestCoordinator = CheckoutCoordinator<InMemoryInventoryService, InMemoryNotificationService>;

struct TestHarness {
    coordinator: Arc<TestCoordinator>,
    carts: CartStore,
    inventory: InMemoryInventoryService,
    notifier: InMemoryNotificationService,
}

impl TestHarness {
    fn new(listings: Vec<CartLine>) -> Self {
        let carts = CartStore::new();
        let inventory = InMemoryInventoryService::with_listings(listings);
        let notifier = InMemoryNotificationService::new();

        let coordinator = Arc::new(CheckoutCoordinator::new(
            carts.clone(),
            inventory.clone(),
            notifier.clone(),
        ));

        Self {
            coordinator,
            carts,
            inventory,
            notifier,
        }
    }

    async fn add(&self, buyer: &str, line: CartLine) {
        self.carts.add_or_merge(buyer, line).await.unwrap();
    }
}

fn line(item: &str, seller: &str, quantity: u32, cents: i64) -> CartLine {
    CartLine::new(item, seller, quantity, Money::from_cents(cents))
}

#[tokio::test]
async fn test_requesting_more_than_stock_deletes_listing() {
    let h = TestHarness::new(vec![line("Apple", "S1", 3, 200)]);
    h.add("buyer1", line("Apple", "S1", 5, 200)).await;

    let receipt = h.coordinator.checkout("buyer1", Role::Buyer).await.unwrap();

    assert_eq!(
        h.inventory.calls(),
        vec![InventoryCall::Delete {
            key: LineKey::new("Apple", "S1")
        }]
    );
    assert_eq!(receipt.total, Money::from_cents(1000));
    assert!(h.carts.all_lines("buyer1").await.is_empty());
}

#[tokio::test]
async fn test_requesting_less_than_stock_decrements_listing() {
    let h = TestHarness::new(vec![line("Pear", "S2", 10, 150)]);
    h.add("buyer1", line("Pear", "S2", 2, 150)).await;

    h.coordinator.checkout("buyer1", Role::Buyer).await.unwrap();

    let pear = LineKey::new("Pear", "S2");
    assert_eq!(
        h.inventory.calls(),
        vec![InventoryCall::Decrement {
            key: pear.clone(),
            quantity: 8
        }]
    );
    assert_eq!(h.inventory.listing(&pear).map(|l| l.quantity), Some(8));
}

#[tokio::test]
async fn test_failed_line_is_kept_for_retry() {
    let h = TestHarness::new(vec![line("Apple", "S1", 3, 200), line("Pear", "S2", 10, 150)]);
    h.add("buyer1", line("Apple", "S1", 3, 200)).await;
    h.add("buyer1", line("Pear", "S2", 2, 150)).await;
    h.inventory.set_fail_on(LineKey::new("Pear", "S2"), true);

    let err = h
        .coordinator
        .checkout("buyer1", Role::Buyer)
        .await
        .unwrap_err();

    match err {
        CheckoutError::PartialFailure { applied, failures } => {
            assert_eq!(applied, 1);
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].line, line("Pear", "S2", 2, 150));
            assert!(matches!(failures[0].action, LineAction::Decrement { .. }));
            assert!(matches!(failures[0].reason, InventoryError::Failed(_)));
        }
        other => panic!("expected partial failure, got {other}"),
    }
    assert_eq!(
        h.carts.all_lines("buyer1").await,
        vec![line("Pear", "S2", 2, 150)]
    );
    assert!(h.notifier.sent().is_empty());
}

#[tokio::test]
async fn test_retry_after_partial_failure_does_not_reapply() {
    let h = TestHarness::new(vec![line("Apple", "S1", 3, 200), line("Pear", "S2", 10, 150)]);
    h.add("buyer1", line("Apple", "S1", 1, 200)).await;
    h.add("buyer1", line("Pear", "S2", 2, 150)).await;
    let pear = LineKey::new("Pear", "S2");
    h.inventory.set_fail_on(pear.clone(), true);

    assert!(h.coordinator.checkout("buyer1", Role::Buyer).await.is_err());

    h.inventory.set_fail_on(pear.clone(), false);
    let receipt = h.coordinator.checkout("buyer1", Role::Buyer).await.unwrap();

    let apple = LineKey::new("Apple", "S1");
    assert_eq!(
        h.inventory.calls(),
        vec![
            InventoryCall::Decrement {
                key: apple.clone(),
                quantity: 2
            },
            InventoryCall::Decrement {
                key: pear.clone(),
                quantity: 8
            },
        ]
    );
    assert_eq!(h.inventory.listing(&apple).map(|l| l.quantity), Some(2));
    assert_eq!(receipt.lines, vec![line("Pear", "S2", 2, 150)]);
    assert_eq!(h.notifier.sent().len(), 1);
}

#[tokio::test]
async fn test_unlisted_line_fails_as_not_found() {
    let h = TestHarness::new(vec![]);
    h.add("buyer1", line("Fig", "S9", 1, 50)).await;

    let err = h
        .coordinator
        .checkout("buyer1", Role::Buyer)
        .await
        .unwrap_err();

    match err {
        CheckoutError::PartialFailure { failures, .. } => {
            assert_eq!(failures[0].action, LineAction::Delete);
            assert!(matches!(failures[0].reason, InventoryError::NotFound(_)));
        }
        other => panic!("expected partial failure, got {other}"),
    }
    assert_eq!(h.carts.len("buyer1").await, 1);
}

#[tokio::test]
async fn test_invoice_goes_to_buyer_and_each_seller() {
    let h = TestHarness::new(vec![
        line("Apple", "S1", 10, 200),
        line("Pear", "S2", 10, 150),
        line("Plum", "S1", 10, 90),
    ]);
    h.add("buyer1", line("Apple", "S1", 1, 200)).await;
    h.add("buyer1", line("Pear", "S2", 1, 150)).await;
    h.add("buyer1", line("Plum", "S1", 1, 90)).await;

    let receipt = h.coordinator.checkout("buyer1", Role::Buyer).await.unwrap();

    assert!(receipt.invoice_sent);
    let sent = h.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].recipients(), ["buyer1", "S1", "S2"]);
    assert_eq!(sent[0].total, Money::from_cents(440));
}

#[tokio::test]
async fn test_checkout_only_touches_own_cart() {
    let h = TestHarness::new(vec![line("Pear", "S2", 10, 150)]);
    h.add("buyer1", line("Pear", "S2", 2, 150)).await;
    h.add("buyer2", line("Pear", "S2", 3, 150)).await;

    h.coordinator.checkout("buyer1", Role::Buyer).await.unwrap();

    assert!(h.carts.all_lines("buyer1").await.is_empty());
    assert_eq!(h.carts.all_lines("buyer2").await.len(), 1);
}

#[tokio::test]
async fn test_concurrent_checkouts_apply_once() {
    let h = TestHarness::new(vec![line("Pear", "S2", 10, 150)]);
    h.add("buyer1", line("Pear", "S2", 2, 150)).await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let coordinator = Arc::clone(&h.coordinator);
        handles.push(tokio::spawn(async move {
            coordinator.checkout("buyer1", Role::Buyer).await
        }));
    }

    let mut completed = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => completed += 1,
            Err(CheckoutError::CheckoutInProgress { .. }) | Err(CheckoutError::EmptyCart) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(completed, 1);
    assert_eq!(h.inventory.calls().len(), 1);
    assert_eq!(
        h.inventory
            .listing(&LineKey::new("Pear", "S2"))
            .map(|l| l.quantity),
        Some(8)
    );
}

/// Item store that holds every decrement until the test releases it.
struct GatedInventory {
    inner: InMemoryInventoryService,
    entered: Notify,
    release: Notify,
}

impl GatedInventory {
    fn new(listings: Vec<CartLine>) -> Self {
        Self {
            inner: InMemoryInventoryService::with_listings(listings),
            entered: Notify::new(),
            release: Notify::new(),
        }
    }
}

#[async_trait]
impl InventoryService for GatedInventory {
    async fn fetch_all(&self, role: Role) -> Result<Vec<InventoryLine>, InventoryError> {
        self.inner.fetch_all(role).await
    }

    async fn fetch_seller(
        &self,
        seller: &SellerName,
    ) -> Result<Vec<InventoryLine>, InventoryError> {
        self.inner.fetch_seller(seller).await
    }

    async fn add(&self, listing: &InventoryLine) -> Result<(), InventoryError> {
        self.inner.add(listing).await
    }

    async fn update(&self, listing: &InventoryLine) -> Result<(), InventoryError> {
        self.inner.update(listing).await
    }

    async fn decrement(
        &self,
        role: Role,
        key: &LineKey,
        remaining: &InventoryLine,
    ) -> Result<(), InventoryError> {
        self.entered.notify_one();
        self.release.notified().await;
        self.inner.decrement(role, key, remaining).await
    }

    async fn delete(&self, role: Role, key: &LineKey) -> Result<(), InventoryError> {
        self.inner.delete(role, key).await
    }
}

#[tokio::test]
async fn test_quantity_merged_during_checkout_stays_in_cart() {
    let carts = CartStore::new();
    let inventory = Arc::new(GatedInventory::new(vec![line("Pear", "S2", 10, 150)]));
    let coordinator = Arc::new(CheckoutCoordinator::new(
        carts.clone(),
        inventory.clone(),
        InMemoryNotificationService::new(),
    ));
    carts.add_or_merge("buyer1", line("Pear", "S2", 2, 150)).await.unwrap();

    let running = tokio::spawn({
        let coordinator = coordinator.clone();
        async move { coordinator.checkout("buyer1", Role::Buyer).await }
    });

    // The decrement for 2 is in flight; the buyer adds 3 more meanwhile.
    inventory.entered.notified().await;
    carts.add_or_merge("buyer1", line("Pear", "S2", 3, 150)).await.unwrap();
    inventory.release.notify_one();

    let receipt = running.await.unwrap().unwrap();
    let pear = LineKey::new("Pear", "S2");

    assert_eq!(receipt.lines, vec![line("Pear", "S2", 2, 150)]);
    assert_eq!(carts.all_lines("buyer1").await, vec![line("Pear", "S2", 3, 150)]);
    assert_eq!(inventory.inner.listing(&pear).unwrap().quantity, 8);

    // The next checkout applies the 3 that were left behind.
    inventory.release.notify_one();
    let receipt = coordinator.checkout("buyer1", Role::Buyer).await.unwrap();

    assert_eq!(receipt.lines, vec![line("Pear", "S2", 3, 150)]);
    assert!(carts.all_lines("buyer1").await.is_empty());
    assert_eq!(inventory.inner.listing(&pear).unwrap().quantity, 5);
}
