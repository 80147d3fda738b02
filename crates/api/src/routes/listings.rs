//! Seller listing management.
//!
//! A seller sees and edits only their own listings; the seller name is
//! always the session's username.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use cart::{CartLine, LineKey, Money, SellerName};
use checkout::{InventoryLine, InventoryService};
use common::Role;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::{AppState, CurrentUser};

// -- Request types --

#[derive(Deserialize)]
pub struct CreateListingRequest {
    pub item: String,
    pub quantity: u32,
    pub unit_cost_cents: i64,
}

#[derive(Deserialize)]
pub struct UpdateListingRequest {
    pub quantity: u32,
    pub unit_cost_cents: i64,
}

// -- Response types --

#[derive(Serialize)]
pub struct ListingResponse {
    pub item: String,
    pub quantity: u32,
    pub unit_cost_cents: i64,
}

impl From<&InventoryLine> for ListingResponse {
    fn from(listing: &InventoryLine) -> Self {
        Self {
            item: listing.item.to_string(),
            quantity: listing.quantity,
            unit_cost_cents: listing.unit_cost.cents(),
        }
    }
}

fn listing_for(
    user: &CurrentUser,
    item: &str,
    quantity: u32,
    unit_cost_cents: i64,
) -> Result<InventoryLine, ApiError> {
    if quantity == 0 {
        return Err(ApiError::BadRequest("quantity must be at least 1".to_string()));
    }
    let listing = CartLine::new(
        item,
        user.username.as_str(),
        quantity,
        Money::from_cents(unit_cost_cents),
    );
    listing.validate()?;
    Ok(listing)
}

// -- Handlers --

/// GET /listings: the seller's own listings.
#[tracing::instrument(skip(state, user), fields(username = %user.username))]
pub async fn list(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<Vec<ListingResponse>>, ApiError> {
    user.require(Role::Seller)?;
    let listings = state
        .checkout
        .inventory()
        .fetch_seller(&SellerName::new(user.username.as_str()))
        .await?;
    Ok(Json(listings.iter().map(ListingResponse::from).collect()))
}

/// POST /listings: put a new item on offer.
#[tracing::instrument(skip(state, user, req), fields(username = %user.username, item = %req.item))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<CreateListingRequest>,
) -> Result<(StatusCode, Json<ListingResponse>), ApiError> {
    user.require(Role::Seller)?;
    let listing = listing_for(&user, &req.item, req.quantity, req.unit_cost_cents)?;
    state.checkout.inventory().add(&listing).await?;

    tracing::info!(quantity = listing.quantity, "listing created");
    Ok((StatusCode::CREATED, Json(ListingResponse::from(&listing))))
}

/// PUT /listings/{item}: change the stock or price of a listing.
#[tracing::instrument(skip(state, user, req), fields(username = %user.username))]
pub async fn update(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(item): Path<String>,
    Json(req): Json<UpdateListingRequest>,
) -> Result<Json<ListingResponse>, ApiError> {
    user.require(Role::Seller)?;
    let listing = listing_for(&user, &item, req.quantity, req.unit_cost_cents)?;
    state.checkout.inventory().update(&listing).await?;
    Ok(Json(ListingResponse::from(&listing)))
}

/// DELETE /listings/{item}: take a listing off offer.
#[tracing::instrument(skip(state, user), fields(username = %user.username))]
pub async fn remove(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(item): Path<String>,
) -> Result<StatusCode, ApiError> {
    user.require(Role::Seller)?;
    let key = LineKey::new(item.as_str(), user.username.as_str());
    state.checkout.inventory().delete(Role::Seller, &key).await?;
    Ok(StatusCode::NO_CONTENT)
}
