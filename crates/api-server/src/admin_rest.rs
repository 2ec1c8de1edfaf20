//! Admin endpoints: customer roster, catalog management views, purchase
//! oversight, and the operations dashboards.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use freshmart_core::catalog::{BulkProductUpdate, ProductSummary, Promotion};
use freshmart_core::customer::{Customer, CustomerPreference};
use freshmart_core::kiosk::KioskSession;
use freshmart_core::orders::{Purchase, PurchaseStatus};
use freshmart_core::FreshmartError;
use freshmart_kiosk::KioskStats;
use freshmart_loyalty::customers::MonthlyCount;
use freshmart_orders::SalesStats;
use freshmart_recommendations::{BatchOutcome, RecommendationStats};

use crate::error::ApiResult;
use crate::orders_rest::PurchaseView;
use crate::state::AppState;

/// Months of signup history shown on the sales dashboard.
const SIGNUP_MONTHS: u32 = 6;

// ─── Customers ──────────────────────────────────────────────────────────────

/// GET /api/v1/admin/customers — every account, including deactivated.
pub async fn list_customers(State(state): State<AppState>) -> Json<Vec<Customer>> {
    Json(state.customers.list_all())
}

/// GET /api/v1/admin/customers/:id — account with its shopping context.
pub async fn get_customer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<CustomerDetail>> {
    let customer = state
        .customers
        .get(id)
        .ok_or_else(|| FreshmartError::NotFound("customer".to_string()))?;
    let preferences = state.customers.preferences_for(id);
    let purchases = state.orders.purchases_for(id);
    Ok(Json(CustomerDetail {
        customer,
        preferences,
        purchases,
    }))
}

// ─── Catalog ────────────────────────────────────────────────────────────────

/// GET /api/v1/admin/products — includes retired products.
pub async fn list_products(State(state): State<AppState>) -> Json<Vec<ProductSummary>> {
    Json(state.catalog.list_all_products())
}

/// POST /api/v1/admin/products/bulk — apply one edit to many products.
pub async fn bulk_update_products(
    State(state): State<AppState>,
    Json(req): Json<BulkProductUpdate>,
) -> Json<BulkUpdateResponse> {
    let updated = state.catalog.bulk_update_products(&req);
    info!(updated = updated, "Bulk product update applied");
    Json(BulkUpdateResponse { updated })
}

/// GET /api/v1/admin/promotions — full promotion history.
pub async fn list_promotions(State(state): State<AppState>) -> Json<Vec<Promotion>> {
    Json(state.catalog.list_promotions())
}

// ─── Purchases ──────────────────────────────────────────────────────────────

/// GET /api/v1/admin/purchases?status=
pub async fn list_purchases(
    State(state): State<AppState>,
    Query(filter): Query<PurchaseFilter>,
) -> Json<Vec<Purchase>> {
    Json(state.orders.list_all(filter.status))
}

/// GET /api/v1/admin/purchases/:id
pub async fn get_purchase(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<PurchaseView>> {
    let (purchase, items) = state
        .orders
        .get_purchase(id)
        .ok_or_else(|| FreshmartError::NotFound("purchase".to_string()))?;
    Ok(Json(PurchaseView { purchase, items }))
}

/// PUT /api/v1/admin/purchases/:id/status
pub async fn update_purchase_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateStatusRequest>,
) -> ApiResult<Json<Purchase>> {
    let purchase = state
        .orders
        .update_status(id, req.status)
        .ok_or_else(|| FreshmartError::NotFound("purchase".to_string()))?;
    info!(purchase_id = %id, status = ?req.status, "Purchase status updated");
    Ok(Json(purchase))
}

// ─── Dashboards ─────────────────────────────────────────────────────────────

/// GET /api/v1/admin/stats/sales — revenue, trends, and signup growth.
pub async fn sales_stats(State(state): State<AppState>) -> Json<AdminSalesStats> {
    Json(AdminSalesStats {
        sales: state.orders.sales_stats(&state.catalog),
        customer_growth: state.customers.monthly_signups(SIGNUP_MONTHS),
    })
}

/// GET /api/v1/admin/stats/recommendations
pub async fn recommendation_stats(State(state): State<AppState>) -> Json<RecommendationStats> {
    Json(state.recommendation_store.stats())
}

/// GET /api/v1/admin/stats/kiosk
pub async fn kiosk_stats(State(state): State<AppState>) -> Json<KioskStats> {
    Json(state.kiosk.stats())
}

/// GET /api/v1/admin/kiosk/sessions — newest first.
pub async fn kiosk_sessions(State(state): State<AppState>) -> Json<Vec<KioskSession>> {
    Json(state.kiosk.list_sessions())
}

/// POST /api/v1/admin/recommendations/refresh-all — recompute every active
/// customer's rows in one pass.
pub async fn refresh_all_recommendations(State(state): State<AppState>) -> Json<BatchOutcome> {
    let outcome = state.recommendations.refresh_all_active();
    info!(
        refreshed = outcome.refreshed,
        failed = outcome.failed,
        "Batch recommendation refresh finished"
    );
    Json(outcome)
}

#[derive(Debug, Serialize)]
pub struct CustomerDetail {
    pub customer: Customer,
    pub preferences: Vec<CustomerPreference>,
    pub purchases: Vec<Purchase>,
}

#[derive(Debug, Serialize)]
pub struct BulkUpdateResponse {
    pub updated: usize,
}

#[derive(Debug, Default, Deserialize)]
pub struct PurchaseFilter {
    pub status: Option<PurchaseStatus>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: PurchaseStatus,
}

#[derive(Debug, Serialize)]
pub struct AdminSalesStats {
    pub sales: SalesStats,
    pub customer_growth: Vec<MonthlyCount>,
}
