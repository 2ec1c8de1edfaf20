//! In-store kiosk endpoints: OTP login, session-scoped browsing, logout.
//!
//! Session routes take the opaque `ks_` session id as a path segment; every
//! hit is validated against the session TTL and logged as an interaction.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use freshmart_core::catalog::{ProductQuery, ProductSummary};
use freshmart_core::kiosk::{
    InteractionRequest, KioskInteractionKind, KioskLoginRequest, KioskSessionView, OtpChallenge,
    RequestOtpRequest, VerifyOtpRequest,
};
use freshmart_core::FreshmartError;

use crate::error::ApiResult;
use crate::recs_rest::{sellable_recommendations, RecommendationView};
use crate::state::AppState;

/// Kiosk search result page size.
const SEARCH_LIMIT: usize = 20;

/// POST /api/v1/kiosk/request-otp
pub async fn request_otp(
    State(state): State<AppState>,
    Json(req): Json<RequestOtpRequest>,
) -> ApiResult<Json<OtpChallenge>> {
    Ok(Json(state.kiosk.request_otp(req)?))
}

/// POST /api/v1/kiosk/verify-otp
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(req): Json<VerifyOtpRequest>,
) -> ApiResult<Json<KioskSessionView>> {
    Ok(Json(state.kiosk.verify_otp(req)?))
}

/// POST /api/v1/kiosk/login — direct card or email login, no OTP.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<KioskLoginRequest>,
) -> ApiResult<Json<KioskSessionView>> {
    Ok(Json(state.kiosk.login(req)?))
}

/// GET /api/v1/kiosk/:session_id/recommendations
pub async fn recommendations(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<Vec<RecommendationView>>> {
    let customer = state.kiosk.session_customer(&session_id)?;
    let rows = sellable_recommendations(
        &state,
        customer.id,
        state.config.recommendations.default_limit,
    );
    state.kiosk.record_interaction(
        &session_id,
        InteractionRequest {
            kind: KioskInteractionKind::RecommendationView,
            product_id: None,
            search_query: None,
        },
    )?;
    Ok(Json(rows))
}

/// GET /api/v1/kiosk/:session_id/search?q=
pub async fn search_products(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Query(query): Query<KioskSearchQuery>,
) -> ApiResult<Json<Vec<ProductSummary>>> {
    state.kiosk.session_customer(&session_id)?;
    let term = query.q.trim().to_string();
    if term.chars().count() < 2 {
        return Err(FreshmartError::Validation(
            "search query must be at least 2 characters".to_string(),
        )
        .into());
    }
    let mut products = state.catalog.list_products(&ProductQuery {
        search: Some(term.clone()),
        ..Default::default()
    });
    products.truncate(SEARCH_LIMIT);
    state.kiosk.record_interaction(
        &session_id,
        InteractionRequest {
            kind: KioskInteractionKind::ProductSearch,
            product_id: None,
            search_query: Some(term),
        },
    )?;
    Ok(Json(products))
}

/// GET /api/v1/kiosk/:session_id/products/:id
pub async fn product_detail(
    State(state): State<AppState>,
    Path((session_id, id)): Path<(String, Uuid)>,
) -> ApiResult<Json<ProductSummary>> {
    state.kiosk.session_customer(&session_id)?;
    let product = state
        .catalog
        .get_product_summary(id)
        .filter(|p| p.is_active)
        .ok_or_else(|| FreshmartError::NotFound("product".to_string()))?;
    state.kiosk.record_interaction(
        &session_id,
        InteractionRequest {
            kind: KioskInteractionKind::ProductView,
            product_id: Some(id),
            search_query: None,
        },
    )?;
    Ok(Json(product))
}

/// GET /api/v1/kiosk/:session_id/products/:id/location — aisle finder.
pub async fn product_location(
    State(state): State<AppState>,
    Path((session_id, id)): Path<(String, Uuid)>,
) -> ApiResult<Json<ProductLocation>> {
    state.kiosk.session_customer(&session_id)?;
    let product = state
        .catalog
        .get_product(id)
        .filter(|p| p.is_active)
        .ok_or_else(|| FreshmartError::NotFound("product".to_string()))?;
    state.kiosk.record_interaction(
        &session_id,
        InteractionRequest {
            kind: KioskInteractionKind::LocationLookup,
            product_id: Some(id),
            search_query: None,
        },
    )?;
    Ok(Json(ProductLocation {
        product_name: product.name.clone(),
        aisle_location: product
            .aisle_location
            .clone()
            .unwrap_or_else(|| "Location not available".to_string()),
        in_stock: product.in_stock(),
        stock_quantity: product.stock_quantity,
    }))
}

/// POST /api/v1/kiosk/:session_id/logout
pub async fn logout(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<KioskLogoutResponse>> {
    let duration_seconds = state.kiosk.end_session(&session_id)?;
    Ok(Json(KioskLogoutResponse {
        message: "Session ended".to_string(),
        duration_seconds,
    }))
}

#[derive(Debug, Deserialize)]
pub struct KioskSearchQuery {
    pub q: String,
}

#[derive(Debug, Serialize)]
pub struct ProductLocation {
    pub product_name: String,
    pub aisle_location: String,
    pub in_stock: bool,
    pub stock_quantity: u32,
}

#[derive(Debug, Serialize)]
pub struct KioskLogoutResponse {
    pub message: String,
    pub duration_seconds: i64,
}
