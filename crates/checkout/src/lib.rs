//! Checkout reconciliation for buyer carts.
//!
//! Checkout applies every cart line against the authoritative item store,
//! one line at a time:
//! 1. Fetch a fresh inventory snapshot
//! 2. Per line, decrement the listing or delete it when the cart takes
//!    everything that is left
//! 3. Evict each applied line from the cart as soon as its call succeeds
//!
//! Lines whose call failed stay in the cart, so re-running checkout only
//! retries what is still outstanding. The invoice goes out only when every
//! line was applied.

pub mod coordinator;
pub mod error;
pub mod invoice;
pub mod plan;
pub mod services;

pub use coordinator::{CheckoutCoordinator, CheckoutReceipt};
pub use error::{CheckoutError, InventoryError, LineFailure, NotificationError, Result};
pub use invoice::{Invoice, SellerSection};
pub use plan::{LineAction, available_listing, plan_line};
pub use services::{
    HttpInventoryConfig, HttpInventoryService, InMemoryInventoryService,
    InMemoryNotificationService, InventoryCall, InventoryLine, InventoryService,
    LoggingNotificationService, NotificationService,
};
