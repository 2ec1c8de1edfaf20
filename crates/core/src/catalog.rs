//! Catalog domain types: categories, brands, products, reviews, promotions,
//! and pre-designed grocery packages.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Taxonomy ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    /// Unique display name, e.g. "Dairy".
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Brand {
    pub id: Uuid,
    /// Unique display name, e.g. "Tillamook".
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

// ─── Products ───────────────────────────────────────────────────────────────

/// A stocked item. Rating and popularity are derived at read time from
/// reviews and recorded purchases, never stored here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub category_id: Uuid,
    pub brand_id: Option<Uuid>,
    pub price: f64,
    pub stock_quantity: u32,
    pub image_url: Option<String>,
    /// Payload encoded into the shelf-label QR code, `product_<id>`.
    /// Rendering the code image is the label printer's job.
    pub qr_payload: String,
    /// Shelf location shown on kiosk lookups, e.g. "Aisle 4, Shelf B".
    pub aisle_location: Option<String>,
    pub is_active: bool,
    pub featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn in_stock(&self) -> bool {
        self.stock_quantity > 0
    }

    /// Whether the product may be shown to shoppers at all.
    pub fn is_sellable(&self) -> bool {
        self.is_active && self.in_stock()
    }

    pub fn qr_payload_for(id: Uuid) -> String {
        format!("product_{id}")
    }
}

/// Product enriched with display fields the storefront needs in one payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductSummary {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub category_id: Uuid,
    pub category_name: String,
    pub brand_id: Option<Uuid>,
    pub brand_name: Option<String>,
    pub price: f64,
    pub stock_quantity: u32,
    pub in_stock: bool,
    pub image_url: Option<String>,
    pub qr_payload: String,
    pub aisle_location: Option<String>,
    pub is_active: bool,
    pub featured: bool,
    pub average_rating: f64,
    pub review_count: usize,
    pub purchase_count: u64,
    pub created_at: DateTime<Utc>,
}

// ─── Reviews ────────────────────────────────────────────────────────────────

/// One review per (product, customer); only verified purchasers may post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductReview {
    pub id: Uuid,
    pub product_id: Uuid,
    pub customer_id: Uuid,
    /// 1..=5 stars.
    pub rating: u8,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

// ─── Promotions ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Promotion {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub discount_percentage: f64,
    pub product_ids: Vec<Uuid>,
    pub category_ids: Vec<Uuid>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Promotion {
    /// Active flag and date window both hold.
    pub fn is_current(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.starts_at <= now && now <= self.ends_at
    }
}

// ─── Packages ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PackageType {
    Family,
    Solo,
    Duo,
    Healthy,
    Budget,
    Premium,
}

/// A curated grocery bundle shoppers can add to the cart in one tap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Package {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub package_type: PackageType,
    /// How many people the bundle is sized for.
    pub people_count: u32,
    /// How many days of groceries it covers.
    pub duration_days: u32,
    pub total_price: f64,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageItem {
    pub id: Uuid,
    pub package_id: Uuid,
    pub product_id: Uuid,
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageOrder {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub package_id: Uuid,
    pub total_price: f64,
    pub created_at: DateTime<Utc>,
}

// ─── API Payloads ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category_id: Uuid,
    pub brand_id: Option<Uuid>,
    pub price: f64,
    pub stock_quantity: u32,
    pub image_url: Option<String>,
    pub aisle_location: Option<String>,
    #[serde(default)]
    pub featured: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    pub brand_id: Option<Uuid>,
    pub price: Option<f64>,
    pub stock_quantity: Option<u32>,
    pub image_url: Option<String>,
    pub aisle_location: Option<String>,
    pub is_active: Option<bool>,
    pub featured: Option<bool>,
}

/// Admin bulk edit applied to every listed product.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkProductUpdate {
    pub product_ids: Vec<Uuid>,
    pub price: Option<f64>,
    pub stock_quantity: Option<u32>,
    pub is_active: Option<bool>,
    pub featured: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewRequest {
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePromotionRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub discount_percentage: f64,
    #[serde(default)]
    pub product_ids: Vec<Uuid>,
    #[serde(default)]
    pub category_ids: Vec<Uuid>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PackageItemSpec {
    pub product_id: Uuid,
    pub quantity: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePackageRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub package_type: PackageType,
    pub people_count: u32,
    pub duration_days: u32,
    pub total_price: f64,
    pub image_url: Option<String>,
    pub items: Vec<PackageItemSpec>,
}

/// Package browsing filters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageQuery {
    pub package_type: Option<PackageType>,
    pub people_count: Option<u32>,
    pub max_price: Option<f64>,
}

/// Storefront product listing filters. All optional, combined with AND.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductQuery {
    pub category: Option<String>,
    pub brand: Option<String>,
    /// Case-insensitive match across name, category, and brand.
    pub search: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub featured: Option<bool>,
    pub in_stock: Option<bool>,
}

// ─── Candidate Queries ──────────────────────────────────────────────────────

/// Ordering applied when selecting recommendation candidates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CandidateOrdering {
    /// Catalog insertion order, oldest first.
    CreatedAsc,
    /// Average review rating, best first.
    RatingDesc,
    /// Recorded purchase count, then rating, highest first.
    PopularityDesc,
}

/// Parameters for a single candidate selection pass. Only sellable products
/// (active and in stock) are ever returned.
#[derive(Debug, Clone)]
pub struct CandidateQuery {
    /// Category name filter.
    pub category: Option<String>,
    /// Brand name filter.
    pub brand: Option<String>,
    /// Restrict to featured products.
    pub featured_only: bool,
    /// Product ids never to return, typically the customer's purchase set.
    pub exclude: HashSet<Uuid>,
    pub ordering: CandidateOrdering,
    pub limit: usize,
}

impl CandidateQuery {
    pub fn in_category(category: impl Into<String>, limit: usize) -> Self {
        Self {
            category: Some(category.into()),
            brand: None,
            featured_only: false,
            exclude: HashSet::new(),
            ordering: CandidateOrdering::CreatedAsc,
            limit,
        }
    }

    pub fn featured(limit: usize) -> Self {
        Self {
            category: None,
            brand: None,
            featured_only: true,
            exclude: HashSet::new(),
            ordering: CandidateOrdering::CreatedAsc,
            limit,
        }
    }

    pub fn with_brand(mut self, brand: Option<String>) -> Self {
        self.brand = brand;
        self
    }

    pub fn excluding(mut self, exclude: HashSet<Uuid>) -> Self {
        self.exclude = exclude;
        self
    }

    pub fn ordered_by(mut self, ordering: CandidateOrdering) -> Self {
        self.ordering = ordering;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qr_payload_format() {
        let id = Uuid::new_v4();
        assert_eq!(Product::qr_payload_for(id), format!("product_{id}"));
    }

    #[test]
    fn test_promotion_window() {
        let now = Utc::now();
        let promo = Promotion {
            id: Uuid::new_v4(),
            title: "Summer Dairy".to_string(),
            description: String::new(),
            discount_percentage: 10.0,
            product_ids: vec![],
            category_ids: vec![],
            starts_at: now - chrono::Duration::days(1),
            ends_at: now + chrono::Duration::days(1),
            is_active: true,
            created_at: now,
        };
        assert!(promo.is_current(now));
        assert!(!promo.is_current(now + chrono::Duration::days(2)));

        let mut disabled = promo.clone();
        disabled.is_active = false;
        assert!(!disabled.is_current(now));
    }

    #[test]
    fn test_candidate_query_builder() {
        let query = CandidateQuery::in_category("Dairy", 5)
            .with_brand(Some("Tillamook".to_string()))
            .ordered_by(CandidateOrdering::RatingDesc);
        assert_eq!(query.category.as_deref(), Some("Dairy"));
        assert_eq!(query.brand.as_deref(), Some("Tillamook"));
        assert_eq!(query.ordering, CandidateOrdering::RatingDesc);
        assert_eq!(query.limit, 5);
        assert!(!query.featured_only);
    }
}
