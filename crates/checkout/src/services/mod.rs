//! Item store and notification collaborators for checkout.

pub mod http;
pub mod inventory;
pub mod notification;

pub use http::{HttpInventoryConfig, HttpInventoryService};
pub use inventory::{InMemoryInventoryService, InventoryCall, InventoryLine, InventoryService};
pub use notification::{
    InMemoryNotificationService, LoggingNotificationService, NotificationService,
};
