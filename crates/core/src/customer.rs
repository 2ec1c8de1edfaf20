//! Customer account domain types.
//!
//! A customer is identified online by username/email and in-store by the
//! loyalty card printed on their key fob. Loyalty balances live directly on
//! the account record so kiosk lookups stay a single fetch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Roles ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CustomerRole {
    Customer,
    Admin,
}

impl CustomerRole {
    pub fn is_admin(&self) -> bool {
        matches!(self, CustomerRole::Admin)
    }
}

impl Default for CustomerRole {
    fn default() -> Self {
        CustomerRole::Customer
    }
}

// ─── Customer ───────────────────────────────────────────────────────────────

/// A registered shopper or staff account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    /// Dev-mode credential, compared in plaintext. Production: delegate to
    /// an identity provider and store a hash.
    #[serde(skip_serializing, default)]
    pub password: String,
    #[serde(default)]
    pub role: CustomerRole,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub store_branch: Option<String>,
    /// In-store identity. Unique across accounts when present.
    pub loyalty_card: Option<String>,
    pub loyalty_points: u64,
    pub cashback_balance: f64,
    pub total_cashback_earned: f64,
    /// Count of orders at or above the free-delivery minimum.
    pub orders_over_minimum: u32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// Email with the local part masked for display on shared screens,
    /// e.g. `ali***@example.com`.
    pub fn masked_email(&self) -> String {
        match self.email.split_once('@') {
            Some((local, domain)) => {
                let visible: String = local.chars().take(3).collect();
                format!("{visible}***@{domain}")
            }
            None => "***".to_string(),
        }
    }
}

// ─── Preferences ────────────────────────────────────────────────────────────

/// A declared shopping preference. Category and brand are stored by name,
/// matching how shoppers pick them in the preferences screen; one row per
/// (customer, category, brand) combination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerPreference {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub category: String,
    pub brand: Option<String>,
    /// Relative strength of the preference. Non-negative, uncapped.
    pub preference_score: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ─── API Payloads ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub store_branch: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub customer: Customer,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateProfileRequest {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub store_branch: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PreferenceRequest {
    pub category: String,
    pub brand: Option<String>,
    pub preference_score: f64,
}
