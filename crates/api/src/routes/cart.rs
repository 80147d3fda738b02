//! Buyer cart and checkout endpoints.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use cart::{Cart, CartLine, LineKey};
use checkout::{CheckoutReceipt, InventoryService};
use common::Role;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::{AppState, CurrentUser};

// -- Request types --

#[derive(Deserialize)]
pub struct AddLineRequest {
    pub item: String,
    pub seller: String,
    pub quantity: u32,
}

#[derive(Deserialize)]
pub struct UpdateLineRequest {
    pub quantity: u32,
}

// -- Response types --

#[derive(Serialize)]
pub struct CartLineResponse {
    pub position: usize,
    pub item: String,
    pub seller: String,
    pub quantity: u32,
    pub unit_cost_cents: i64,
    pub subtotal_cents: i64,
}

#[derive(Serialize)]
pub struct CartResponse {
    pub lines: Vec<CartLineResponse>,
    pub total_cents: i64,
}

impl From<&Cart> for CartResponse {
    fn from(cart: &Cart) -> Self {
        Self {
            lines: cart
                .iter()
                .enumerate()
                .map(|(index, line)| CartLineResponse::new(index + 1, line))
                .collect(),
            total_cents: cart.total().cents(),
        }
    }
}

impl CartLineResponse {
    fn new(position: usize, line: &CartLine) -> Self {
        Self {
            position,
            item: line.item.to_string(),
            seller: line.seller.to_string(),
            quantity: line.quantity,
            unit_cost_cents: line.unit_cost.cents(),
            subtotal_cents: line.total_cost().cents(),
        }
    }
}

#[derive(Serialize)]
pub struct CheckoutResponse {
    pub lines: Vec<CartLineResponse>,
    pub total_cents: i64,
    pub recipients: Vec<String>,
    pub invoice_sent: bool,
}

impl From<CheckoutReceipt> for CheckoutResponse {
    fn from(receipt: CheckoutReceipt) -> Self {
        Self {
            lines: receipt
                .lines
                .iter()
                .enumerate()
                .map(|(index, line)| CartLineResponse::new(index + 1, line))
                .collect(),
            total_cents: receipt.total.cents(),
            recipients: receipt.invoice.recipients(),
            invoice_sent: receipt.invoice_sent,
        }
    }
}

// -- Handlers --

/// GET /cart: the buyer's cart with subtotals and total.
#[tracing::instrument(skip(state, user), fields(username = %user.username))]
pub async fn view(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<CartResponse>, ApiError> {
    user.require(Role::Buyer)?;
    let cart = state.carts.snapshot(&user.username).await;
    Ok(Json(CartResponse::from(&cart)))
}

/// POST /cart/items: add a listed item, merging with an existing line.
///
/// The price comes from the live listing. The stock check and the merge
/// happen under one cart lock, so concurrent adds cannot overshoot stock.
#[tracing::instrument(skip(state, user, req), fields(username = %user.username, item = %req.item, seller = %req.seller))]
pub async fn add(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<AddLineRequest>,
) -> Result<(StatusCode, Json<CartLineResponse>), ApiError> {
    user.require(Role::Buyer)?;
    if req.quantity == 0 {
        return Err(ApiError::BadRequest("quantity must be at least 1".to_string()));
    }

    let key = LineKey::new(req.item.as_str(), req.seller.as_str());
    let listing = state
        .checkout
        .inventory()
        .fetch_all(user.role)
        .await?
        .into_iter()
        .find(|l| l.has_key(&key))
        .ok_or_else(|| ApiError::BadRequest(format!("{key} is not available")))?;

    let line = CartLine::new(
        req.item.as_str(),
        req.seller.as_str(),
        req.quantity,
        listing.unit_cost,
    );
    let (merged, position) = state
        .carts
        .add_within(&user.username, line, listing.quantity)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CartLineResponse::new(position, &merged)),
    ))
}

/// PUT /cart/items/{position}: change a line's quantity.
#[tracing::instrument(skip(state, user, req), fields(username = %user.username))]
pub async fn update(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(position): Path<usize>,
    Json(req): Json<UpdateLineRequest>,
) -> Result<Json<CartLineResponse>, ApiError> {
    user.require(Role::Buyer)?;
    if req.quantity == 0 {
        return Err(ApiError::BadRequest(
            "quantity must be at least 1; remove the line instead".to_string(),
        ));
    }

    let line = state
        .carts
        .set_quantity(&user.username, position, req.quantity)
        .await?;
    Ok(Json(CartLineResponse::new(position, &line)))
}

/// DELETE /cart/items/{position}: remove a line.
#[tracing::instrument(skip(state, user), fields(username = %user.username))]
pub async fn remove(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(position): Path<usize>,
) -> Result<Json<CartLineResponse>, ApiError> {
    user.require(Role::Buyer)?;
    let line = state.carts.remove_at(&user.username, position).await?;
    Ok(Json(CartLineResponse::new(position, &line)))
}

/// DELETE /cart: empty the cart.
#[tracing::instrument(skip(state, user), fields(username = %user.username))]
pub async fn clear(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<StatusCode, ApiError> {
    user.require(Role::Buyer)?;
    state.carts.clear(&user.username).await;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /cart/checkout: apply the cart against the item store.
#[tracing::instrument(skip(state, user), fields(username = %user.username))]
pub async fn checkout(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<CheckoutResponse>, ApiError> {
    user.require(Role::Buyer)?;
    let receipt = state.checkout.checkout(&user.username, user.role).await?;
    Ok(Json(CheckoutResponse::from(receipt)))
}
