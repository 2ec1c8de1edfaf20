//! Cart and purchase domain types.
//!
//! A purchase only counts toward history, exclusions, and recommendation
//! signals once its status is `Completed`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Purchases ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseStatus {
    Pending,
    Processing,
    Completed,
    Cancelled,
}

impl PurchaseStatus {
    pub fn is_completed(&self) -> bool {
        matches!(self, PurchaseStatus::Completed)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Card,
    Cash,
    MobileWallet,
}

impl Default for PaymentMethod {
    fn default() -> Self {
        PaymentMethod::Card
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Purchase {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub total_amount: f64,
    pub status: PurchaseStatus,
    pub payment_method: PaymentMethod,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseItem {
    pub id: Uuid,
    pub purchase_id: Uuid,
    pub product_id: Uuid,
    pub quantity: u32,
    /// Unit price captured at checkout time; later price edits never
    /// rewrite history.
    pub price_at_purchase: f64,
}

/// A completed purchase line joined with its catalog context, the shape the
/// recommendation signals consume.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchasedItem {
    pub product_id: Uuid,
    pub category: String,
    pub brand: Option<String>,
    pub quantity: u32,
}

// ─── Carts ──────────────────────────────────────────────────────────────────

/// One open cart per customer, created lazily on first touch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cart {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItem {
    pub id: Uuid,
    pub cart_id: Uuid,
    pub product_id: Uuid,
    pub quantity: u32,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CartItemView {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub unit_price: f64,
    pub quantity: u32,
    pub line_total: f64,
    pub in_stock: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub items: Vec<CartItemView>,
    pub total: f64,
    pub item_count: u32,
}

// ─── API Payloads ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct AddCartItemRequest {
    pub product_id: Uuid,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateCartItemRequest {
    /// Zero removes the line.
    pub quantity: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutRequest {
    #[serde(default)]
    pub payment_method: PaymentMethod,
}

/// Rewards granted by a single checkout, plus the resulting balances.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRewards {
    pub points_earned: u64,
    pub cashback_earned: f64,
    pub free_delivery: bool,
    pub total_points: u64,
    pub total_cashback: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutResponse {
    pub purchase: Purchase,
    pub items: Vec<PurchaseItem>,
    pub rewards: CheckoutRewards,
}
