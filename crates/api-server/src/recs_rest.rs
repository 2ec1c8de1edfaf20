//! Personalized recommendation endpoints.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use freshmart_core::catalog::ProductSummary;
use freshmart_core::recommendations::RecommendationClick;
use freshmart_core::FreshmartError;

use crate::auth::AuthedCustomer;
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct RecommendationQuery {
    pub limit: Option<usize>,
}

/// A persisted recommendation joined with the product card to render.
#[derive(Debug, Serialize)]
pub struct RecommendationView {
    pub id: Uuid,
    pub product: ProductSummary,
    pub score: f64,
    pub reason: String,
    pub updated_at: DateTime<Utc>,
}

/// Active rows for the customer whose product is still on the shelf,
/// best score first, capped at `limit`.
pub fn sellable_recommendations(
    state: &AppState,
    customer_id: Uuid,
    limit: usize,
) -> Vec<RecommendationView> {
    state
        .recommendation_store
        .active_for(customer_id)
        .into_iter()
        .filter_map(|rec| {
            let product = state.catalog.get_product_summary(rec.product_id)?;
            if !(product.is_active && product.in_stock) {
                return None;
            }
            Some(RecommendationView {
                id: rec.id,
                product,
                score: rec.score,
                reason: rec.reason,
                updated_at: rec.updated_at,
            })
        })
        .take(limit)
        .collect()
}

/// GET /api/v1/recommendations
///
/// Serves the persisted rows. A customer with nothing servable (first
/// visit, or every row went stale) gets a generation pass inline.
pub async fn list_recommendations(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthedCustomer>,
    Query(query): Query<RecommendationQuery>,
) -> ApiResult<Json<Vec<RecommendationView>>> {
    let limit = query
        .limit
        .unwrap_or(state.config.recommendations.default_limit);
    let mut rows = sellable_recommendations(&state, auth.id, limit);
    if rows.is_empty() {
        state.recommendations.generate_for(auth.id, None)?;
        rows = sellable_recommendations(&state, auth.id, limit);
    }
    Ok(Json(rows))
}

/// POST /api/v1/recommendations/refresh — recompute on demand.
pub async fn refresh_recommendations(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthedCustomer>,
) -> ApiResult<Json<Vec<RecommendationView>>> {
    state.recommendations.generate_for(auth.id, None)?;
    let rows = sellable_recommendations(
        &state,
        auth.id,
        state.config.recommendations.default_limit,
    );
    Ok(Json(rows))
}

/// POST /api/v1/recommendations/:id/click
pub async fn track_click(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthedCustomer>,
    Path(id): Path<Uuid>,
) -> ApiResult<(StatusCode, Json<RecommendationClick>)> {
    let recommendation = state
        .recommendation_store
        .get(id)
        .filter(|rec| rec.customer_id == auth.id)
        .ok_or_else(|| FreshmartError::NotFound("recommendation".to_string()))?;
    let click = state.recommendation_store.record_click(recommendation.id)?;
    Ok((StatusCode::CREATED, Json(click)))
}
