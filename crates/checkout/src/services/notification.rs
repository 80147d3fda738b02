//! Invoice notification trait and implementations.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::error::NotificationError;
use crate::invoice::Invoice;

/// Delivers invoices after a completed checkout.
#[async_trait]
pub trait NotificationService: Send + Sync {
    /// Sends `invoice` to the buyer and to every seller on it.
    async fn send_invoice(&self, invoice: &Invoice) -> Result<(), NotificationError>;
}

#[async_trait]
impl<T: NotificationService + ?Sized> NotificationService for Arc<T> {
    async fn send_invoice(&self, invoice: &Invoice) -> Result<(), NotificationError> {
        (**self).send_invoice(invoice).await
    }
}

#[derive(Debug, Default)]
struct InMemoryNotificationState {
    sent: Vec<Invoice>,
    fail_on_send: bool,
}

/// Records invoices instead of sending them.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotificationService {
    state: Arc<RwLock<InMemoryNotificationState>>,
}

impl InMemoryNotificationService {
    /// Creates a new in-memory notifier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the notifier to fail every send.
    pub fn set_fail_on_send(&self, fail: bool) {
        self.state
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .fail_on_send = fail;
    }

    /// Returns every invoice sent so far.
    pub fn sent(&self) -> Vec<Invoice> {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .sent
            .clone()
    }
}

#[async_trait]
impl NotificationService for InMemoryNotificationService {
    async fn send_invoice(&self, invoice: &Invoice) -> Result<(), NotificationError> {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        if state.fail_on_send {
            return Err(NotificationError("mail relay unavailable".to_string()));
        }
        state.sent.push(invoice.clone());
        Ok(())
    }
}

/// Writes each invoice copy to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingNotificationService;

#[async_trait]
impl NotificationService for LoggingNotificationService {
    async fn send_invoice(&self, invoice: &Invoice) -> Result<(), NotificationError> {
        for recipient in invoice.recipients() {
            tracing::info!(
                recipient = %recipient,
                buyer = %invoice.buyer,
                sellers = invoice.sections.len(),
                total = %invoice.total,
                issued_at = %invoice.issued_at,
                "invoice sent"
            );
        }
        for section in &invoice.sections {
            tracing::debug!(
                seller = %section.seller,
                lines = section.lines.len(),
                subtotal = %section.subtotal,
                "invoice section"
            );
        }
        Ok(())
    }
}
