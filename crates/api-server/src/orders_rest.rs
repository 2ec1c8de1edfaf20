//! Cart and checkout endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use freshmart_core::orders::{
    AddCartItemRequest, CartView, CheckoutRequest, CheckoutResponse, Purchase, PurchaseItem,
    UpdateCartItemRequest,
};
use freshmart_core::FreshmartError;

use crate::auth::AuthedCustomer;
use crate::error::ApiResult;
use crate::state::AppState;

/// GET /api/v1/cart
pub async fn get_cart(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthedCustomer>,
) -> Json<CartView> {
    Json(state.orders.cart_view(&state.catalog, auth.id))
}

/// DELETE /api/v1/cart
pub async fn clear_cart(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthedCustomer>,
) -> StatusCode {
    state.orders.clear_cart(auth.id);
    StatusCode::NO_CONTENT
}

/// POST /api/v1/cart/items
pub async fn add_cart_item(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthedCustomer>,
    Json(req): Json<AddCartItemRequest>,
) -> ApiResult<Json<CartView>> {
    let cart = state.orders.add_item(&state.catalog, auth.id, req)?;
    Ok(Json(cart))
}

/// PUT /api/v1/cart/items/:id — quantity 0 removes the line.
pub async fn update_cart_item(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthedCustomer>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateCartItemRequest>,
) -> ApiResult<Json<CartView>> {
    let cart = state.orders.update_item(&state.catalog, auth.id, id, req)?;
    Ok(Json(cart))
}

/// DELETE /api/v1/cart/items/:id
pub async fn remove_cart_item(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthedCustomer>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<CartView>> {
    let cart = state.orders.remove_item(&state.catalog, auth.id, id)?;
    Ok(Json(cart))
}

/// POST /api/v1/checkout
///
/// On success the shopper's recommendations are refreshed in line with
/// their new purchase history. A refresh failure is logged, never a
/// checkout failure.
pub async fn checkout(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthedCustomer>,
    Json(req): Json<CheckoutRequest>,
) -> ApiResult<Json<CheckoutResponse>> {
    let response = state.orders.checkout(
        &state.catalog,
        &state.customers,
        &state.rewards,
        auth.id,
        req,
    )?;
    if state.config.recommendations.refresh_on_checkout {
        if let Err(err) = state.recommendations.generate_for(auth.id, None) {
            warn!(
                customer_id = %auth.id,
                error = %err,
                "Post-checkout recommendation refresh failed"
            );
        }
    }
    Ok(Json(response))
}

/// GET /api/v1/purchases — own purchase history, newest first.
pub async fn list_purchases(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthedCustomer>,
) -> Json<Vec<PurchaseView>> {
    let purchases = state
        .orders
        .purchases_for(auth.id)
        .into_iter()
        .map(|purchase| {
            let items = state.orders.purchase_items(purchase.id);
            PurchaseView { purchase, items }
        })
        .collect();
    Json(purchases)
}

/// GET /api/v1/purchases/:id
pub async fn get_purchase(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthedCustomer>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<PurchaseView>> {
    let (purchase, items) = state
        .orders
        .purchase(auth.id, id)
        .ok_or_else(|| FreshmartError::NotFound("purchase".to_string()))?;
    Ok(Json(PurchaseView { purchase, items }))
}

#[derive(Debug, Serialize)]
pub struct PurchaseView {
    pub purchase: Purchase,
    pub items: Vec<PurchaseItem>,
}
