//! Storefront listing.

use std::sync::Arc;

use axum::extract::State;
use axum::{Extension, Json};
use common::Role;
use serde::Serialize;

use crate::error::ApiError;
use crate::state::{AppState, CurrentUser};

#[derive(Serialize)]
pub struct ItemResponse {
    pub item: String,
    pub seller: String,
    pub quantity: u32,
    pub unit_cost_cents: i64,
}

/// GET /items: what the buyer can still add, net of their cart.
#[tracing::instrument(skip(state, user), fields(username = %user.username))]
pub async fn list(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<Vec<ItemResponse>>, ApiError> {
    user.require(Role::Buyer)?;
    let listings = state
        .checkout
        .storefront(&user.username, user.role)
        .await?;

    Ok(Json(
        listings
            .into_iter()
            .map(|l| ItemResponse {
                item: l.item.to_string(),
                seller: l.seller.to_string(),
                quantity: l.quantity,
                unit_cost_cents: l.unit_cost.cents(),
            })
            .collect(),
    ))
}
