//! Item store client over the REST API.
//!
//! Listings live under `/api/v1/{buyer|seller}`; one seller's listings
//! under `/api/v1/seller/{seller}`, and a single listing is addressed as
//! `/api/v1/{scope}/{seller}/{item}`. Every request carries the scope's API
//! key as a `key` query parameter.

use std::time::Duration;

use async_trait::async_trait;
use cart::{CartLine, LineKey, Money, SellerName};
use common::Role;
use reqwest::{Client, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};

use super::inventory::{InventoryLine, InventoryService};
use crate::error::InventoryError;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection settings for [`HttpInventoryService`].
#[derive(Debug, Clone)]
pub struct HttpInventoryConfig {
    /// Root of the item store, e.g. `https://localhost:5000`.
    pub base_url: Url,
    /// Key sent on buyer-scoped calls.
    pub buyer_key: String,
    /// Key sent on seller-scoped calls.
    pub seller_key: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Accept self-signed certificates.
    pub accept_invalid_certs: bool,
}

impl HttpInventoryConfig {
    /// Creates a config with empty keys and the default timeout.
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            buyer_key: String::new(),
            seller_key: String::new(),
            timeout: DEFAULT_TIMEOUT,
            accept_invalid_certs: false,
        }
    }

    /// Sets the API keys.
    pub fn with_keys(mut self, buyer_key: impl Into<String>, seller_key: impl Into<String>) -> Self {
        self.buyer_key = buyer_key.into();
        self.seller_key = seller_key.into();
        self
    }
}

/// Listing as it appears on the wire.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireItem {
    item: String,
    quantity: u32,
    cost: f64,
    username: String,
}

impl From<WireItem> for InventoryLine {
    fn from(wire: WireItem) -> Self {
        CartLine::new(
            wire.item,
            wire.username,
            wire.quantity,
            Money::from_decimal(wire.cost),
        )
    }
}

/// Converts a listing body, dropping listings that are not valid cart
/// lines (blank names, negative or out-of-range cost).
fn decode_listings(items: Option<Vec<WireItem>>) -> Vec<InventoryLine> {
    items
        .unwrap_or_default()
        .into_iter()
        .map(InventoryLine::from)
        .filter(|line| match line.validate() {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(listing = %line.key(), error = %e, "skipping malformed listing");
                false
            }
        })
        .collect()
}

impl From<&InventoryLine> for WireItem {
    fn from(line: &InventoryLine) -> Self {
        Self {
            item: line.item.to_string(),
            quantity: line.quantity,
            cost: line.unit_cost.as_decimal(),
            username: line.seller.to_string(),
        }
    }
}

/// [`InventoryService`] backed by the remote item store.
#[derive(Debug, Clone)]
pub struct HttpInventoryService {
    client: Client,
    config: HttpInventoryConfig,
}

impl HttpInventoryService {
    /// Builds the HTTP client for `config`.
    pub fn new(config: HttpInventoryConfig) -> Result<Self, InventoryError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|e| InventoryError::Failed(format!("failed to build client: {e}")))?;
        Ok(Self { client, config })
    }

    fn scope(role: Role) -> &'static str {
        match role {
            Role::Buyer => "buyer",
            Role::Seller | Role::Admin => "seller",
        }
    }

    fn api_key(&self, role: Role) -> &str {
        match role {
            Role::Buyer => &self.config.buyer_key,
            Role::Seller | Role::Admin => &self.config.seller_key,
        }
    }

    /// Builds `/api/v1/{scope}/{path..}?key=` under the base url.
    fn endpoint(&self, role: Role, path: &[&str]) -> Result<Url, InventoryError> {
        let mut url = self.config.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                InventoryError::Failed(format!("invalid base url {}", self.config.base_url))
            })?;
            segments
                .pop_if_empty()
                .extend(["api", "v1", Self::scope(role)])
                .extend(path);
        }
        url.query_pairs_mut().append_pair("key", self.api_key(role));
        Ok(url)
    }

    fn listing_endpoint(&self, role: Role, key: &LineKey) -> Result<Url, InventoryError> {
        self.endpoint(role, &[key.seller.as_str(), key.item.as_str()])
    }

    async fn get_listings(&self, url: Url) -> Result<Vec<InventoryLine>, InventoryError> {
        let response = self.client.get(url).send().await.map_err(transport_error)?;
        let response = check_status(response).await?;

        // An empty store answers with `null`.
        let items: Option<Vec<WireItem>> = response.json().await.map_err(transport_error)?;
        Ok(decode_listings(items))
    }

    async fn put_listing(
        &self,
        role: Role,
        key: &LineKey,
        listing: &InventoryLine,
    ) -> Result<(), InventoryError> {
        let url = self.listing_endpoint(role, key)?;
        let response = self
            .client
            .put(url)
            .json(&WireItem::from(listing))
            .send()
            .await
            .map_err(transport_error)?;
        check_status(response).await?;
        Ok(())
    }
}

fn transport_error(e: reqwest::Error) -> InventoryError {
    InventoryError::Failed(e.to_string())
}

async fn check_status(response: Response) -> Result<Response, InventoryError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(match status {
        StatusCode::NOT_FOUND => InventoryError::NotFound(body),
        StatusCode::CONFLICT | StatusCode::METHOD_NOT_ALLOWED | StatusCode::UNPROCESSABLE_ENTITY => {
            InventoryError::Conflict(format!("{status}: {body}"))
        }
        _ => InventoryError::Failed(format!("{status}: {body}")),
    })
}

#[async_trait]
impl InventoryService for HttpInventoryService {
    #[tracing::instrument(skip(self))]
    async fn fetch_all(&self, role: Role) -> Result<Vec<InventoryLine>, InventoryError> {
        let lines = self.get_listings(self.endpoint(role, &[])?).await?;
        tracing::debug!(listings = lines.len(), "inventory fetched");
        Ok(lines)
    }

    #[tracing::instrument(skip(self), fields(seller = %seller))]
    async fn fetch_seller(
        &self,
        seller: &SellerName,
    ) -> Result<Vec<InventoryLine>, InventoryError> {
        let url = self.endpoint(Role::Seller, &[seller.as_str()])?;
        match self.get_listings(url).await {
            Ok(lines) => Ok(lines),
            // The store answers 404 for a seller with nothing listed.
            Err(InventoryError::NotFound(_)) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    #[tracing::instrument(skip(self, listing), fields(key = %listing.key(), quantity = listing.quantity))]
    async fn add(&self, listing: &InventoryLine) -> Result<(), InventoryError> {
        let url = self.listing_endpoint(Role::Seller, &listing.key())?;
        let response = self
            .client
            .post(url)
            .json(&WireItem::from(listing))
            .send()
            .await
            .map_err(transport_error)?;
        check_status(response).await?;
        Ok(())
    }

    #[tracing::instrument(skip(self, listing), fields(key = %listing.key(), quantity = listing.quantity))]
    async fn update(&self, listing: &InventoryLine) -> Result<(), InventoryError> {
        self.put_listing(Role::Seller, &listing.key(), listing).await
    }

    #[tracing::instrument(skip(self, remaining), fields(key = %key, quantity = remaining.quantity))]
    async fn decrement(
        &self,
        role: Role,
        key: &LineKey,
        remaining: &InventoryLine,
    ) -> Result<(), InventoryError> {
        self.put_listing(role, key, remaining).await
    }

    #[tracing::instrument(skip(self), fields(key = %key))]
    async fn delete(&self, role: Role, key: &LineKey) -> Result<(), InventoryError> {
        let url = self.listing_endpoint(role, key)?;
        let response = self.client.delete(url).send().await.map_err(transport_error)?;
        check_status(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use axum::Json;
    use axum::Router;
    use axum::extract::{Path, Query, State};
    use axum::http::StatusCode as AxumStatus;
    use axum::routing::{get, post, put};

    use super::*;

    #[derive(Clone, Default)]
    struct FakeStore {
        items: Arc<Mutex<Vec<WireItem>>>,
        keys: Arc<Mutex<Vec<String>>>,
    }

    impl FakeStore {
        fn record_key(&self, query: &HashMap<String, String>) {
            let key = query.get("key").cloned().unwrap_or_default();
            self.keys.lock().unwrap().push(key);
        }
    }

    async fn list(
        State(store): State<FakeStore>,
        Query(query): Query<HashMap<String, String>>,
    ) -> Json<Vec<serde_json::Value>> {
        store.record_key(&query);
        let items = store.items.lock().unwrap();
        Json(
            items
                .iter()
                .map(|i| serde_json::to_value(i).unwrap())
                .collect(),
        )
    }

    async fn list_seller(
        State(store): State<FakeStore>,
        Path(seller): Path<String>,
        Query(query): Query<HashMap<String, String>>,
    ) -> Result<Json<Vec<serde_json::Value>>, AxumStatus> {
        store.record_key(&query);
        let items = store.items.lock().unwrap();
        let own: Vec<_> = items
            .iter()
            .filter(|i| i.username == seller)
            .map(|i| serde_json::to_value(i).unwrap())
            .collect();
        if own.is_empty() {
            Err(AxumStatus::NOT_FOUND)
        } else {
            Ok(Json(own))
        }
    }

    async fn create(
        State(store): State<FakeStore>,
        Path((seller, item)): Path<(String, String)>,
        Query(query): Query<HashMap<String, String>>,
        Json(body): Json<WireItem>,
    ) -> AxumStatus {
        store.record_key(&query);
        let mut items = store.items.lock().unwrap();
        if items.iter().any(|i| i.item == item && i.username == seller) {
            return AxumStatus::CONFLICT;
        }
        items.push(body);
        AxumStatus::CREATED
    }

    async fn update(
        State(store): State<FakeStore>,
        Path((seller, item)): Path<(String, String)>,
        Query(query): Query<HashMap<String, String>>,
        Json(body): Json<WireItem>,
    ) -> AxumStatus {
        store.record_key(&query);
        let mut items = store.items.lock().unwrap();
        match items
            .iter_mut()
            .find(|i| i.item == item && i.username == seller)
        {
            Some(existing) => {
                *existing = body;
                AxumStatus::ACCEPTED
            }
            None => AxumStatus::METHOD_NOT_ALLOWED,
        }
    }

    async fn remove(
        State(store): State<FakeStore>,
        Path((seller, item)): Path<(String, String)>,
        Query(query): Query<HashMap<String, String>>,
    ) -> AxumStatus {
        store.record_key(&query);
        let mut items = store.items.lock().unwrap();
        let before = items.len();
        items.retain(|i| !(i.item == item && i.username == seller));
        if items.len() == before {
            AxumStatus::NOT_FOUND
        } else {
            AxumStatus::ACCEPTED
        }
    }

    async fn spawn_store(items: Vec<WireItem>) -> (HttpInventoryService, FakeStore) {
        let store = FakeStore {
            items: Arc::new(Mutex::new(items)),
            ..FakeStore::default()
        };
        let app = Router::new()
            .route("/api/v1/buyer", get(list))
            .route("/api/v1/buyer/{seller}/{item}", put(update).delete(remove))
            .route("/api/v1/seller/{seller}", get(list_seller))
            .route(
                "/api/v1/seller/{seller}/{item}",
                post(create).put(update).delete(remove),
            )
            .with_state(store.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let base_url = Url::parse(&format!("http://{addr}")).unwrap();
        let config = HttpInventoryConfig::new(base_url).with_keys("buyer-key", "seller-key");
        (HttpInventoryService::new(config).unwrap(), store)
    }

    fn wire(item: &str, seller: &str, quantity: u32, cost: f64) -> WireItem {
        WireItem {
            item: item.to_string(),
            quantity,
            cost,
            username: seller.to_string(),
        }
    }

    #[test]
    fn test_endpoint_encodes_names() {
        let config = HttpInventoryConfig::new(Url::parse("https://store.local/").unwrap())
            .with_keys("b", "s");
        let service = HttpInventoryService::new(config).unwrap();

        let url = service
            .listing_endpoint(Role::Buyer, &LineKey::new("Green Apple", "S1"))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://store.local/api/v1/buyer/S1/Green%20Apple?key=b"
        );

        let url = service.endpoint(Role::Seller, &[]).unwrap();
        assert_eq!(url.as_str(), "https://store.local/api/v1/seller?key=s");

        let url = service.endpoint(Role::Seller, &["S1"]).unwrap();
        assert_eq!(url.as_str(), "https://store.local/api/v1/seller/S1?key=s");
    }

    #[test]
    fn test_wire_format_uses_pascal_case() {
        let line = CartLine::new("Pear", "S2", 8, Money::from_cents(150));
        let json = serde_json::to_value(WireItem::from(&line)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"Item": "Pear", "Quantity": 8, "Cost": 1.5, "Username": "S2"})
        );
    }

    #[tokio::test]
    async fn test_fetch_decrement_delete_against_server() {
        let (service, store) = spawn_store(vec![
            wire("Apple", "S1", 3, 2.0),
            wire("Pear", "S2", 10, 1.5),
        ])
        .await;

        let listings = service.fetch_all(Role::Buyer).await.unwrap();
        assert_eq!(listings.len(), 2);
        assert_eq!(listings[1].unit_cost, Money::from_cents(150));

        let pear = LineKey::new("Pear", "S2");
        let remaining = CartLine::new("Pear", "S2", 8, Money::from_cents(150));
        service
            .decrement(Role::Buyer, &pear, &remaining)
            .await
            .unwrap();
        service
            .delete(Role::Buyer, &LineKey::new("Apple", "S1"))
            .await
            .unwrap();

        let items = store.items.lock().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 8);
        assert!(store.keys.lock().unwrap().iter().all(|k| k == "buyer-key"));
    }

    #[tokio::test]
    async fn test_malformed_listings_are_skipped() {
        let (service, _) = spawn_store(vec![
            wire("Apple", "S1", 3, 2.0),
            wire("Gold", "S1", 3, 1e17),
            wire("Pear", "S2", 1, -1.0),
            wire("", "S2", 1, 1.0),
        ])
        .await;

        let listings = service.fetch_all(Role::Buyer).await.unwrap();
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].item.as_str(), "Apple");
    }

    #[tokio::test]
    async fn test_seller_listing_management_against_server() {
        let (service, store) = spawn_store(vec![wire("Pear", "S2", 10, 1.5)]).await;
        let s2 = SellerName::new("S2");

        assert!(service.fetch_seller(&SellerName::new("S9")).await.unwrap().is_empty());

        let plum = CartLine::new("Plum", "S2", 4, Money::from_cents(80));
        service.add(&plum).await.unwrap();
        let again = service.add(&plum).await;
        assert!(matches!(again, Err(InventoryError::Conflict(_))));

        service
            .update(&CartLine::new("Pear", "S2", 12, Money::from_cents(175)))
            .await
            .unwrap();

        let own = service.fetch_seller(&s2).await.unwrap();
        assert_eq!(own.len(), 2);
        assert_eq!(own[0].quantity, 12);
        assert_eq!(own[0].unit_cost, Money::from_cents(175));
        assert_eq!(own[1], plum);

        service
            .delete(Role::Seller, &LineKey::new("Plum", "S2"))
            .await
            .unwrap();
        assert_eq!(store.items.lock().unwrap().len(), 1);
        assert!(store.keys.lock().unwrap().iter().all(|k| k == "seller-key"));
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let (service, _) = spawn_store(vec![]).await;

        let missing = LineKey::new("Fig", "S9");
        let deleted = service.delete(Role::Buyer, &missing).await;
        assert!(matches!(deleted, Err(InventoryError::NotFound(_))));

        let line = CartLine::new("Fig", "S9", 1, Money::from_cents(10));
        let updated = service.decrement(Role::Buyer, &missing, &line).await;
        assert!(matches!(updated, Err(InventoryError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_unreachable_store_is_failed() {
        let config = HttpInventoryConfig::new(Url::parse("http://127.0.0.1:1").unwrap());
        let service = HttpInventoryService::new(config).unwrap();

        let result = service.fetch_all(Role::Buyer).await;
        assert!(matches!(result, Err(InventoryError::Failed(_))));
    }
}
