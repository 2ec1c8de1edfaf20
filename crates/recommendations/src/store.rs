//! In-memory recommendation store backed by DashMap.
//!
//! Production: replace with PostgreSQL (sqlx) or similar ACID store.
//! Rows are keyed by (customer, product), which is what makes refresh an
//! overwrite instead of an append: the map entry is the uniqueness
//! constraint.

use chrono::{Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use freshmart_core::recommendations::{Recommendation, RecommendationClick};
use freshmart_core::{FreshmartError, FreshmartResult};

#[derive(Debug, Clone, Serialize)]
pub struct TopClickedProduct {
    pub product_id: Uuid,
    pub clicks: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecommendationStats {
    pub total_active: u64,
    pub total_clicks: u64,
    pub clicks_last_30_days: u64,
    /// Mean active rows per customer that has any.
    pub avg_active_per_customer: f64,
    /// Ten most-clicked products, descending.
    pub top_clicked: Vec<TopClickedProduct>,
}

pub struct RecommendationStore {
    rows: DashMap<(Uuid, Uuid), Recommendation>,
    clicks: DashMap<Uuid, RecommendationClick>,
}

impl RecommendationStore {
    pub fn new() -> Self {
        info!("Recommendation store initialized (in-memory, development mode)");
        Self {
            rows: DashMap::new(),
            clicks: DashMap::new(),
        }
    }

    /// Create or overwrite the row for (customer, product). Updates keep the
    /// original row id and created_at, so click history stays attached
    /// across refreshes.
    pub fn upsert(
        &self,
        customer_id: Uuid,
        product_id: Uuid,
        score: f64,
        reason: String,
    ) -> Recommendation {
        let now = Utc::now();
        match self.rows.entry((customer_id, product_id)) {
            Entry::Occupied(mut occupied) => {
                let rec = occupied.get_mut();
                rec.score = score;
                rec.reason = reason;
                rec.is_active = true;
                rec.updated_at = now;
                rec.clone()
            }
            Entry::Vacant(vacant) => {
                let rec = Recommendation {
                    id: Uuid::new_v4(),
                    customer_id,
                    product_id,
                    score,
                    reason,
                    is_active: true,
                    created_at: now,
                    updated_at: now,
                };
                vacant.insert(rec.clone());
                rec
            }
        }
    }

    /// Active rows for one customer, best score first.
    pub fn active_for(&self, customer_id: Uuid) -> Vec<Recommendation> {
        let mut rows: Vec<Recommendation> = self
            .rows
            .iter()
            .filter(|r| r.value().customer_id == customer_id && r.value().is_active)
            .map(|r| r.value().clone())
            .collect();
        rows.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.created_at.cmp(&b.created_at))
                .then_with(|| a.id.cmp(&b.id))
        });
        rows
    }

    pub fn count_active_for(&self, customer_id: Uuid) -> usize {
        self.rows
            .iter()
            .filter(|r| r.value().customer_id == customer_id && r.value().is_active)
            .count()
    }

    pub fn get(&self, recommendation_id: Uuid) -> Option<Recommendation> {
        self.rows
            .iter()
            .find(|r| r.value().id == recommendation_id)
            .map(|r| r.value().clone())
    }

    /// Log a shopper tapping a recommendation. Append-only; nothing reads
    /// this back into scoring.
    pub fn record_click(&self, recommendation_id: Uuid) -> FreshmartResult<RecommendationClick> {
        if self.get(recommendation_id).is_none() {
            return Err(FreshmartError::NotFound("recommendation".to_string()));
        }
        let click = RecommendationClick {
            id: Uuid::new_v4(),
            recommendation_id,
            clicked_at: Utc::now(),
        };
        self.clicks.insert(click.id, click.clone());
        metrics::counter!("recommendations.clicks").increment(1);
        Ok(click)
    }

    pub fn stats(&self) -> RecommendationStats {
        let mut total_active = 0u64;
        let mut customers = std::collections::HashSet::new();
        for r in self.rows.iter() {
            if r.value().is_active {
                total_active += 1;
                customers.insert(r.value().customer_id);
            }
        }
        let avg_active_per_customer = if customers.is_empty() {
            0.0
        } else {
            total_active as f64 / customers.len() as f64
        };

        let cutoff = Utc::now() - Duration::days(30);
        let total_clicks = self.clicks.len() as u64;
        let clicks_last_30_days = self
            .clicks
            .iter()
            .filter(|c| c.value().clicked_at >= cutoff)
            .count() as u64;

        // Map clicks back to products through their recommendation rows.
        let mut by_product: std::collections::HashMap<Uuid, u64> = std::collections::HashMap::new();
        for click in self.clicks.iter() {
            if let Some(rec) = self.get(click.value().recommendation_id) {
                *by_product.entry(rec.product_id).or_insert(0) += 1;
            }
        }
        let mut top_clicked: Vec<TopClickedProduct> = by_product
            .into_iter()
            .map(|(product_id, clicks)| TopClickedProduct { product_id, clicks })
            .collect();
        top_clicked.sort_by(|a, b| b.clicks.cmp(&a.clicks).then_with(|| a.product_id.cmp(&b.product_id)));
        top_clicked.truncate(10);

        RecommendationStats {
            total_active,
            total_clicks,
            clicks_last_30_days,
            avg_active_per_customer,
            top_clicked,
        }
    }
}

impl Default for RecommendationStore {
    fn default() -> Self {
        Self::new()
    }
}
