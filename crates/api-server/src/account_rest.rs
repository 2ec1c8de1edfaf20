//! Account endpoints: registration, login, profile, shopping preferences,
//! and loyalty balances.

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use freshmart_core::customer::{
    Customer, CustomerPreference, LoginRequest, LoginResponse, PreferenceRequest, RegisterRequest,
    UpdateProfileRequest,
};
use freshmart_core::FreshmartError;

use crate::auth::AuthedCustomer;
use crate::error::ApiResult;
use crate::state::AppState;

/// POST /api/v1/auth/register — create an account and log it straight in.
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<LoginResponse>)> {
    let customer = state.customers.register(req)?;
    let (token, expires_at) = state.tokens.issue(customer.id);
    metrics::counter!("api.customers_registered").increment(1);
    info!(customer_id = %customer.id, username = %customer.username, "Customer registered");
    Ok((
        StatusCode::CREATED,
        Json(LoginResponse {
            token,
            expires_at,
            customer,
        }),
    ))
}

/// POST /api/v1/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let customer = state
        .customers
        .authenticate(&req.username, &req.password)
        .ok_or_else(|| FreshmartError::Unauthorized("Invalid credentials".to_string()))?;
    let (token, expires_at) = state.tokens.issue(customer.id);
    metrics::counter!("api.logins").increment(1);
    info!(customer_id = %customer.id, "Customer logged in");
    Ok(Json(LoginResponse {
        token,
        expires_at,
        customer,
    }))
}

/// POST /api/v1/auth/logout — revoke the presented token.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> StatusCode {
    if let Some(token) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
    {
        state.tokens.revoke(token);
    }
    StatusCode::NO_CONTENT
}

/// GET /api/v1/profile
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthedCustomer>,
) -> ApiResult<Json<Customer>> {
    let customer = state
        .customers
        .get(auth.id)
        .ok_or_else(|| FreshmartError::NotFound("customer".to_string()))?;
    Ok(Json(customer))
}

/// PUT /api/v1/profile
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthedCustomer>,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<Json<Customer>> {
    let customer = state
        .customers
        .update_profile(auth.id, req)
        .ok_or_else(|| FreshmartError::NotFound("customer".to_string()))?;
    Ok(Json(customer))
}

/// DELETE /api/v1/profile — soft delete, keeps purchase history intact.
pub async fn deactivate_account(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthedCustomer>,
) -> StatusCode {
    if state.customers.deactivate(auth.id) {
        info!(customer_id = %auth.id, "Account deactivated");
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

/// GET /api/v1/preferences
pub async fn list_preferences(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthedCustomer>,
) -> Json<Vec<CustomerPreference>> {
    Json(state.customers.preferences_for(auth.id))
}

/// POST /api/v1/preferences — create or rescore a preference row.
pub async fn upsert_preference(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthedCustomer>,
    Json(req): Json<PreferenceRequest>,
) -> ApiResult<(StatusCode, Json<CustomerPreference>)> {
    let preference = state.customers.upsert_preference(auth.id, req)?;
    Ok((StatusCode::CREATED, Json(preference)))
}

/// DELETE /api/v1/preferences/:id
pub async fn delete_preference(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthedCustomer>,
    Path(id): Path<Uuid>,
) -> StatusCode {
    if state.customers.delete_preference(auth.id, id) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

/// POST /api/v1/loyalty/lookup — public card-or-email lookup used by the
/// in-store kiosk greeter screen. Returns name and points only.
pub async fn loyalty_lookup(
    State(state): State<AppState>,
    Json(req): Json<LoyaltyLookupRequest>,
) -> ApiResult<Json<LoyaltyLookupResponse>> {
    let customer = match (&req.loyalty_card, &req.email) {
        (Some(card), _) if !card.trim().is_empty() => state.customers.by_loyalty_card(card.trim()),
        (_, Some(email)) if !email.trim().is_empty() => state.customers.by_email(email.trim()),
        _ => {
            return Err(
                FreshmartError::Validation("loyalty_card or email is required".to_string()).into(),
            )
        }
    };
    let customer = customer
        .filter(|c| c.is_active)
        .ok_or_else(|| FreshmartError::NotFound("customer".to_string()))?;
    Ok(Json(LoyaltyLookupResponse {
        id: customer.id,
        first_name: customer.first_name,
        last_name: customer.last_name,
        loyalty_points: customer.loyalty_points,
    }))
}

/// GET /api/v1/rewards/balance
pub async fn rewards_balance(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthedCustomer>,
) -> ApiResult<Json<RewardsBalance>> {
    let customer = state
        .customers
        .get(auth.id)
        .ok_or_else(|| FreshmartError::NotFound("customer".to_string()))?;
    Ok(Json(RewardsBalance {
        loyalty_points: customer.loyalty_points,
        cashback_balance: customer.cashback_balance,
        total_cashback_earned: customer.total_cashback_earned,
        orders_over_minimum: customer.orders_over_minimum,
        free_delivery_minimum: state.config.rewards.minimum_basket,
    }))
}

#[derive(Debug, Deserialize)]
pub struct LoyaltyLookupRequest {
    pub loyalty_card: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoyaltyLookupResponse {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub loyalty_points: u64,
}

#[derive(Debug, Serialize)]
pub struct RewardsBalance {
    pub loyalty_points: u64,
    pub cashback_balance: f64,
    pub total_cashback_earned: f64,
    pub orders_over_minimum: u32,
    pub free_delivery_minimum: f64,
}
