//! Shared application state.

use std::sync::Arc;

use axum_extra::extract::cookie::{Cookie, SameSite};
use cart::CartStore;
use chrono::{DateTime, Utc};
use checkout::{CheckoutCoordinator, InventoryService, NotificationService};
use common::{Role, SessionToken};
use session::SessionTable;

use crate::error::ApiError;
use crate::users::UserDirectory;

/// Coordinator with the item store and notifier chosen at startup.
pub type Checkout = CheckoutCoordinator<Arc<dyn InventoryService>, Arc<dyn NotificationService>>;

/// Session cookie attributes.
#[derive(Debug, Clone)]
pub struct CookieSettings {
    pub name: String,
    pub secure: bool,
    /// Seconds; matches the session expiry window.
    pub max_age_secs: i64,
}

impl CookieSettings {
    /// Builds the cookie carrying `token`.
    pub fn session_cookie(&self, token: SessionToken) -> Cookie<'static> {
        Cookie::build((self.name.clone(), token.to_string()))
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .max_age(time::Duration::seconds(self.max_age_secs))
            .build()
    }

    /// Builds the cookie used to clear the session cookie.
    pub fn removal_cookie(&self) -> Cookie<'static> {
        Cookie::build(self.name.clone()).path("/").build()
    }
}

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub sessions: SessionTable,
    pub carts: CartStore,
    pub checkout: Checkout,
    pub users: UserDirectory,
    pub cookie: CookieSettings,
}

/// The user behind an authenticated request.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub token: SessionToken,
    pub username: String,
    pub role: Role,
    /// When the session lapses if left idle from this request on.
    pub expires_at: DateTime<Utc>,
}

impl CurrentUser {
    /// Fails with 403 unless the user acts under `role`.
    pub fn require(&self, role: Role) -> Result<(), ApiError> {
        if self.role == role {
            Ok(())
        } else {
            Err(ApiError::Forbidden(format!(
                "this action requires the {role} role"
            )))
        }
    }
}
