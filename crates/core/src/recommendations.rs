//! Persisted recommendation rows and their click log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A scored product suggestion for one customer. Unique per
/// (customer, product): recomputation overwrites score, reason, and active
/// flag in place rather than appending rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub product_id: Uuid,
    /// Weighted blend across signals, rounded to two decimals when stored.
    pub score: f64,
    /// Short shopper-facing explanation, e.g. "Matches your interest in Dairy".
    pub reason: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Append-only engagement record. Feeds reporting dashboards only; scores
/// never read from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationClick {
    pub id: Uuid,
    pub recommendation_id: Uuid,
    pub clicked_at: DateTime<Utc>,
}
