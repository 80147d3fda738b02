//! HTTP front door for the marketplace.
//!
//! Provides login/logout/signup, buyer cart routes, checkout, the
//! storefront and seller listing management, with structured logging
//! (tracing) and Prometheus metrics. Every route except health, metrics and the auth endpoints goes
//! through the session middleware.

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod users;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use cart::CartStore;
use checkout::{
    CheckoutCoordinator, HttpInventoryConfig, HttpInventoryService, InMemoryInventoryService,
    InventoryService, LoggingNotificationService, NotificationService,
};
use metrics_exporter_prometheus::PrometheusHandle;
use session::SessionTable;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use error::StartupError;
use state::{AppState, CookieSettings};
use users::UserDirectory;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(routes::metrics::MetricsState {
            handle: metrics_handle,
            sessions: state.sessions.clone(),
        });

    let protected = Router::new()
        .route("/session", get(routes::auth::current))
        .route("/items", get(routes::items::list))
        .route("/cart", get(routes::cart::view).delete(routes::cart::clear))
        .route("/cart/items", post(routes::cart::add))
        .route(
            "/cart/items/{position}",
            put(routes::cart::update).delete(routes::cart::remove),
        )
        .route("/cart/checkout", post(routes::cart::checkout))
        .route(
            "/listings",
            get(routes::listings::list).post(routes::listings::create),
        )
        .route(
            "/listings/{item}",
            put(routes::listings::update).delete(routes::listings::remove),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_session,
        ));

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/login", post(routes::auth::login))
        .route("/logout", post(routes::auth::logout))
        .route("/signup", post(routes::auth::signup))
        .merge(protected)
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Assembles application state from its parts.
///
/// The cart store handed to checkout is the one the cart routes use.
pub fn create_state(
    config: &Config,
    sessions: SessionTable,
    inventory: Arc<dyn InventoryService>,
    notifier: Arc<dyn NotificationService>,
    users: UserDirectory,
) -> Arc<AppState> {
    let carts = CartStore::new();
    let checkout = CheckoutCoordinator::new(carts.clone(), inventory, notifier);

    Arc::new(AppState {
        cookie: CookieSettings {
            name: config.cookie_name.clone(),
            secure: config.cookie_secure,
            max_age_secs: sessions.expire_after().num_seconds(),
        },
        sessions,
        carts,
        checkout,
        users,
    })
}

/// Creates the production state described by `config`.
///
/// Uses the remote item store when `INVENTORY_URL` is set and an empty
/// in-memory one otherwise. Loads the users file and the admin account.
pub async fn create_default_state(config: &Config) -> Result<Arc<AppState>, StartupError> {
    let inventory: Arc<dyn InventoryService> = match &config.inventory_url {
        Some(url) => {
            let base_url = reqwest::Url::parse(url).map_err(|e| StartupError::InventoryUrl {
                url: url.clone(),
                reason: e.to_string(),
            })?;
            let mut http_config = HttpInventoryConfig::new(base_url)
                .with_keys(config.buyer_api_key.clone(), config.seller_api_key.clone());
            http_config.accept_invalid_certs = config.inventory_accept_invalid_certs;
            tracing::info!(%url, "using remote item store");
            Arc::new(HttpInventoryService::new(http_config)?)
        }
        None => {
            tracing::warn!("INVENTORY_URL not set, using an empty in-memory item store");
            Arc::new(InMemoryInventoryService::new())
        }
    };

    let users = UserDirectory::new();
    if let Some(path) = &config.users_file {
        let loaded = users.load(users::read_users_file(path)?).await;
        tracing::info!(path = %path.display(), loaded, "users loaded");
    }
    if let (Some(name), Some(password)) = (&config.admin_name, &config.admin_password) {
        users.set_admin(name, password).await?;
    }

    Ok(create_state(
        config,
        SessionTable::new(config.session_config()),
        inventory,
        Arc::new(LoggingNotificationService),
        users,
    ))
}
