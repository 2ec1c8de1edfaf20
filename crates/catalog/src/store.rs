//! In-memory catalog store backed by DashMap.
//!
//! Production: replace with PostgreSQL (sqlx) or similar ACID store.
//! This provides the same API surface for development and testing.

use std::cmp::Ordering;

use chrono::Utc;
use dashmap::DashMap;
use tracing::{debug, info};
use uuid::Uuid;

use freshmart_core::catalog::*;
use freshmart_core::{FreshmartError, FreshmartResult};

/// Thread-safe in-memory store for the product catalog: taxonomy, products,
/// reviews, promotions, packages, and per-product purchase counters.
pub struct CatalogStore {
    categories: DashMap<Uuid, Category>,
    brands: DashMap<Uuid, Brand>,
    products: DashMap<Uuid, Product>,
    reviews: DashMap<Uuid, ProductReview>,
    promotions: DashMap<Uuid, Promotion>,
    packages: DashMap<Uuid, Package>,
    package_items: DashMap<Uuid, PackageItem>,
    package_orders: DashMap<Uuid, PackageOrder>,
    /// Completed checkout line counts per product. Quantity-insensitive:
    /// one line, one increment.
    purchase_counts: DashMap<Uuid, u64>,
}

impl CatalogStore {
    pub fn new() -> Self {
        info!("Catalog store initialized (in-memory, development mode)");
        Self {
            categories: DashMap::new(),
            brands: DashMap::new(),
            products: DashMap::new(),
            reviews: DashMap::new(),
            promotions: DashMap::new(),
            packages: DashMap::new(),
            package_items: DashMap::new(),
            package_orders: DashMap::new(),
            purchase_counts: DashMap::new(),
        }
    }

    // ─── Categories ────────────────────────────────────────────────────────

    pub fn list_categories(&self) -> Vec<Category> {
        let mut categories: Vec<Category> =
            self.categories.iter().map(|r| r.value().clone()).collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        categories
    }

    pub fn get_category(&self, id: Uuid) -> Option<Category> {
        self.categories.get(&id).map(|r| r.value().clone())
    }

    pub fn category_by_name(&self, name: &str) -> Option<Category> {
        self.categories
            .iter()
            .find(|r| r.value().name == name)
            .map(|r| r.value().clone())
    }

    pub fn create_category(&self, req: CreateCategoryRequest) -> FreshmartResult<Category> {
        if self.category_by_name(&req.name).is_some() {
            return Err(FreshmartError::Conflict(format!(
                "category '{}' already exists",
                req.name
            )));
        }
        let category = Category {
            id: Uuid::new_v4(),
            name: req.name,
            description: req.description,
            created_at: Utc::now(),
        };
        self.categories.insert(category.id, category.clone());
        debug!(category = %category.name, "Category created");
        Ok(category)
    }

    pub fn update_category(&self, id: Uuid, req: CreateCategoryRequest) -> Option<Category> {
        self.categories.get_mut(&id).map(|mut entry| {
            let c = entry.value_mut();
            c.name = req.name;
            c.description = req.description;
            c.clone()
        })
    }

    pub fn delete_category(&self, id: Uuid) -> FreshmartResult<()> {
        let in_use = self.products.iter().any(|r| r.value().category_id == id);
        if in_use {
            return Err(FreshmartError::Conflict(
                "category still has products".to_string(),
            ));
        }
        self.categories
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| FreshmartError::NotFound("category".to_string()))
    }

    // ─── Brands ────────────────────────────────────────────────────────────

    pub fn list_brands(&self) -> Vec<Brand> {
        let mut brands: Vec<Brand> = self.brands.iter().map(|r| r.value().clone()).collect();
        brands.sort_by(|a, b| a.name.cmp(&b.name));
        brands
    }

    pub fn get_brand(&self, id: Uuid) -> Option<Brand> {
        self.brands.get(&id).map(|r| r.value().clone())
    }

    pub fn brand_by_name(&self, name: &str) -> Option<Brand> {
        self.brands
            .iter()
            .find(|r| r.value().name == name)
            .map(|r| r.value().clone())
    }

    pub fn create_brand(&self, req: CreateCategoryRequest) -> FreshmartResult<Brand> {
        if self.brand_by_name(&req.name).is_some() {
            return Err(FreshmartError::Conflict(format!(
                "brand '{}' already exists",
                req.name
            )));
        }
        let brand = Brand {
            id: Uuid::new_v4(),
            name: req.name,
            description: req.description,
            created_at: Utc::now(),
        };
        self.brands.insert(brand.id, brand.clone());
        Ok(brand)
    }

    pub fn update_brand(&self, id: Uuid, req: CreateCategoryRequest) -> Option<Brand> {
        self.brands.get_mut(&id).map(|mut entry| {
            let b = entry.value_mut();
            b.name = req.name;
            b.description = req.description;
            b.clone()
        })
    }

    pub fn delete_brand(&self, id: Uuid) -> FreshmartResult<()> {
        let in_use = self
            .products
            .iter()
            .any(|r| r.value().brand_id == Some(id));
        if in_use {
            return Err(FreshmartError::Conflict(
                "brand still has products".to_string(),
            ));
        }
        self.brands
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| FreshmartError::NotFound("brand".to_string()))
    }

    // ─── Products ──────────────────────────────────────────────────────────

    pub fn get_product(&self, id: Uuid) -> Option<Product> {
        self.products.get(&id).map(|r| r.value().clone())
    }

    /// Resolve a scanned QR payload to its product. Accepts the exact stored
    /// payload or anything of the form `product_<uuid>[_suffix]`.
    pub fn product_by_qr(&self, payload: &str) -> Option<Product> {
        if let Some(product) = self
            .products
            .iter()
            .find(|r| r.value().qr_payload == payload)
        {
            return Some(product.value().clone());
        }
        let raw = payload.strip_prefix("product_")?;
        let id_part = raw.split('_').next()?;
        let id = id_part.parse::<Uuid>().ok()?;
        self.get_product(id)
    }

    pub fn create_product(&self, req: CreateProductRequest) -> FreshmartResult<Product> {
        if req.price < 0.0 {
            return Err(FreshmartError::Validation(
                "price must be non-negative".to_string(),
            ));
        }
        if self.get_category(req.category_id).is_none() {
            return Err(FreshmartError::NotFound("category".to_string()));
        }
        if let Some(brand_id) = req.brand_id {
            if self.get_brand(brand_id).is_none() {
                return Err(FreshmartError::NotFound("brand".to_string()));
            }
        }
        let now = Utc::now();
        let id = Uuid::new_v4();
        let product = Product {
            id,
            name: req.name,
            description: req.description,
            category_id: req.category_id,
            brand_id: req.brand_id,
            price: req.price,
            stock_quantity: req.stock_quantity,
            image_url: req.image_url,
            qr_payload: Product::qr_payload_for(id),
            aisle_location: req.aisle_location,
            is_active: true,
            featured: req.featured,
            created_at: now,
            updated_at: now,
        };
        self.products.insert(id, product.clone());
        debug!(product = %product.name, %id, "Product created");
        Ok(product)
    }

    pub fn update_product(&self, id: Uuid, req: UpdateProductRequest) -> Option<Product> {
        self.products.get_mut(&id).map(|mut entry| {
            let p = entry.value_mut();
            if let Some(name) = req.name { p.name = name; }
            if let Some(description) = req.description { p.description = description; }
            if let Some(category_id) = req.category_id { p.category_id = category_id; }
            if let Some(brand_id) = req.brand_id { p.brand_id = Some(brand_id); }
            if let Some(price) = req.price { p.price = price; }
            if let Some(stock) = req.stock_quantity { p.stock_quantity = stock; }
            if let Some(image_url) = req.image_url { p.image_url = Some(image_url); }
            if let Some(aisle) = req.aisle_location { p.aisle_location = Some(aisle); }
            if let Some(is_active) = req.is_active { p.is_active = is_active; }
            if let Some(featured) = req.featured { p.featured = featured; }
            p.updated_at = Utc::now();
            p.clone()
        })
    }

    pub fn delete_product(&self, id: Uuid) -> bool {
        self.products.remove(&id).is_some()
    }

    /// Apply one admin edit to every listed product. Returns how many
    /// products were touched.
    pub fn bulk_update_products(&self, req: &BulkProductUpdate) -> usize {
        let mut updated = 0;
        for id in &req.product_ids {
            if let Some(mut entry) = self.products.get_mut(id) {
                let p = entry.value_mut();
                if let Some(price) = req.price { p.price = price; }
                if let Some(stock) = req.stock_quantity { p.stock_quantity = stock; }
                if let Some(is_active) = req.is_active { p.is_active = is_active; }
                if let Some(featured) = req.featured { p.featured = featured; }
                p.updated_at = Utc::now();
                updated += 1;
            }
        }
        updated
    }

    /// Storefront listing with display fields resolved.
    pub fn list_products(&self, query: &ProductQuery) -> Vec<ProductSummary> {
        let mut products: Vec<Product> = self
            .products
            .iter()
            .map(|r| r.value().clone())
            .filter(|p| self.matches_query(p, query))
            .collect();
        products.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.name.cmp(&b.name)));
        products.iter().map(|p| self.product_summary(p)).collect()
    }

    /// Every product including retired ones, newest first. Admin listing.
    /// Count of products currently visible to shoppers.
    pub fn product_count(&self) -> usize {
        self.products.iter().filter(|r| r.value().is_active).count()
    }

    pub fn list_all_products(&self) -> Vec<ProductSummary> {
        let mut products: Vec<Product> = self.products.iter().map(|r| r.value().clone()).collect();
        products.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.name.cmp(&b.name)));
        products.iter().map(|p| self.product_summary(p)).collect()
    }

    fn matches_query(&self, product: &Product, query: &ProductQuery) -> bool {
        if !product.is_active {
            return false;
        }
        let category_name = self
            .get_category(product.category_id)
            .map(|c| c.name)
            .unwrap_or_default();
        let brand_name = product.brand_id.and_then(|b| self.get_brand(b)).map(|b| b.name);

        if let Some(category) = &query.category {
            if !category_name.eq_ignore_ascii_case(category) {
                return false;
            }
        }
        if let Some(brand) = &query.brand {
            match &brand_name {
                Some(name) if name.eq_ignore_ascii_case(brand) => {}
                _ => return false,
            }
        }
        if let Some(search) = &query.search {
            let needle = search.to_lowercase();
            let haystack = format!(
                "{} {} {}",
                product.name.to_lowercase(),
                category_name.to_lowercase(),
                brand_name.as_deref().unwrap_or("").to_lowercase()
            );
            if !haystack.contains(&needle) {
                return false;
            }
        }
        if let Some(min) = query.min_price {
            if product.price < min {
                return false;
            }
        }
        if let Some(max) = query.max_price {
            if product.price > max {
                return false;
            }
        }
        if let Some(featured) = query.featured {
            if product.featured != featured {
                return false;
            }
        }
        if let Some(in_stock) = query.in_stock {
            if product.in_stock() != in_stock {
                return false;
            }
        }
        true
    }

    pub fn product_summary(&self, product: &Product) -> ProductSummary {
        ProductSummary {
            id: product.id,
            name: product.name.clone(),
            description: product.description.clone(),
            category_id: product.category_id,
            category_name: self
                .get_category(product.category_id)
                .map(|c| c.name)
                .unwrap_or_default(),
            brand_id: product.brand_id,
            brand_name: product.brand_id.and_then(|b| self.get_brand(b)).map(|b| b.name),
            price: product.price,
            stock_quantity: product.stock_quantity,
            in_stock: product.in_stock(),
            image_url: product.image_url.clone(),
            qr_payload: product.qr_payload.clone(),
            aisle_location: product.aisle_location.clone(),
            is_active: product.is_active,
            featured: product.featured,
            average_rating: self.average_rating(product.id),
            review_count: self.review_count(product.id),
            purchase_count: self.purchase_count(product.id),
            created_at: product.created_at,
        }
    }

    pub fn get_product_summary(&self, id: Uuid) -> Option<ProductSummary> {
        self.get_product(id).map(|p| self.product_summary(&p))
    }

    /// Take `qty` units off the shelf. Fails without mutating when the
    /// product is unknown or under-stocked.
    pub fn decrement_stock(&self, product_id: Uuid, qty: u32) -> FreshmartResult<()> {
        let mut entry = self
            .products
            .get_mut(&product_id)
            .ok_or_else(|| FreshmartError::NotFound("product".to_string()))?;
        let p = entry.value_mut();
        if p.stock_quantity < qty {
            return Err(FreshmartError::InsufficientStock(format!(
                "{} has {} units, {} requested",
                p.name, p.stock_quantity, qty
            )));
        }
        p.stock_quantity -= qty;
        p.updated_at = Utc::now();
        Ok(())
    }

    /// Put units back on the shelf, used when a multi-line checkout fails
    /// partway and already-taken stock must be returned.
    pub fn restock(&self, product_id: Uuid, qty: u32) {
        if let Some(mut entry) = self.products.get_mut(&product_id) {
            let p = entry.value_mut();
            p.stock_quantity += qty;
            p.updated_at = Utc::now();
        }
    }

    pub fn record_product_purchased(&self, product_id: Uuid) {
        *self.purchase_counts.entry(product_id).or_insert(0) += 1;
    }

    pub fn purchase_count(&self, product_id: Uuid) -> u64 {
        self.purchase_counts.get(&product_id).map(|r| *r.value()).unwrap_or(0)
    }

    // ─── Candidate Selection ───────────────────────────────────────────────

    /// Select sellable products for one recommendation signal. Ordering is
    /// fully deterministic: every branch falls back to insertion order so
    /// identical store contents always yield identical candidate lists.
    pub fn eligible_products(&self, query: &CandidateQuery) -> Vec<Product> {
        let category_id = match &query.category {
            Some(name) => match self.category_by_name(name) {
                Some(category) => Some(category.id),
                // Unknown category names select nothing at all.
                None => return Vec::new(),
            },
            None => None,
        };
        let brand_id = match &query.brand {
            Some(name) => match self.brand_by_name(name) {
                Some(brand) => Some(brand.id),
                None => return Vec::new(),
            },
            None => None,
        };

        let mut candidates: Vec<(Product, f64, u64)> = self
            .products
            .iter()
            .map(|r| r.value().clone())
            .filter(|p| p.is_sellable())
            .filter(|p| category_id.map_or(true, |c| p.category_id == c))
            .filter(|p| brand_id.map_or(true, |b| p.brand_id == Some(b)))
            .filter(|p| !query.featured_only || p.featured)
            .filter(|p| !query.exclude.contains(&p.id))
            .map(|p| {
                let rating = self.average_rating(p.id);
                let purchases = self.purchase_count(p.id);
                (p, rating, purchases)
            })
            .collect();

        match query.ordering {
            CandidateOrdering::CreatedAsc => {
                candidates.sort_by(|a, b| {
                    a.0.created_at.cmp(&b.0.created_at).then_with(|| a.0.id.cmp(&b.0.id))
                });
            }
            CandidateOrdering::RatingDesc => {
                candidates.sort_by(|a, b| {
                    b.1.partial_cmp(&a.1)
                        .unwrap_or(Ordering::Equal)
                        .then_with(|| a.0.created_at.cmp(&b.0.created_at))
                        .then_with(|| a.0.id.cmp(&b.0.id))
                });
            }
            CandidateOrdering::PopularityDesc => {
                candidates.sort_by(|a, b| {
                    b.2.cmp(&a.2)
                        .then_with(|| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal))
                        .then_with(|| a.0.created_at.cmp(&b.0.created_at))
                        .then_with(|| a.0.id.cmp(&b.0.id))
                });
            }
        }

        candidates.truncate(query.limit);
        candidates.into_iter().map(|(p, _, _)| p).collect()
    }

    // ─── Reviews ───────────────────────────────────────────────────────────

    pub fn add_review(
        &self,
        product_id: Uuid,
        customer_id: Uuid,
        req: ReviewRequest,
    ) -> FreshmartResult<ProductReview> {
        if !(1..=5).contains(&req.rating) {
            return Err(FreshmartError::Validation(
                "rating must be between 1 and 5".to_string(),
            ));
        }
        if self.get_product(product_id).is_none() {
            return Err(FreshmartError::NotFound("product".to_string()));
        }
        let duplicate = self.reviews.iter().any(|r| {
            r.value().product_id == product_id && r.value().customer_id == customer_id
        });
        if duplicate {
            return Err(FreshmartError::Conflict(
                "customer already reviewed this product".to_string(),
            ));
        }
        let review = ProductReview {
            id: Uuid::new_v4(),
            product_id,
            customer_id,
            rating: req.rating,
            comment: req.comment,
            created_at: Utc::now(),
        };
        self.reviews.insert(review.id, review.clone());
        Ok(review)
    }

    pub fn reviews_for_product(&self, product_id: Uuid) -> Vec<ProductReview> {
        let mut reviews: Vec<ProductReview> = self
            .reviews
            .iter()
            .filter(|r| r.value().product_id == product_id)
            .map(|r| r.value().clone())
            .collect();
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        reviews
    }

    pub fn average_rating(&self, product_id: Uuid) -> f64 {
        let ratings: Vec<u8> = self
            .reviews
            .iter()
            .filter(|r| r.value().product_id == product_id)
            .map(|r| r.value().rating)
            .collect();
        if ratings.is_empty() {
            return 0.0;
        }
        ratings.iter().map(|&r| r as f64).sum::<f64>() / ratings.len() as f64
    }

    pub fn review_count(&self, product_id: Uuid) -> usize {
        self.reviews
            .iter()
            .filter(|r| r.value().product_id == product_id)
            .count()
    }

    // ─── Promotions ────────────────────────────────────────────────────────

    pub fn active_promotions(&self) -> Vec<Promotion> {
        let now = Utc::now();
        let mut promotions: Vec<Promotion> = self
            .promotions
            .iter()
            .filter(|r| r.value().is_current(now))
            .map(|r| r.value().clone())
            .collect();
        promotions.sort_by(|a, b| a.ends_at.cmp(&b.ends_at));
        promotions
    }

    pub fn list_promotions(&self) -> Vec<Promotion> {
        let mut promotions: Vec<Promotion> =
            self.promotions.iter().map(|r| r.value().clone()).collect();
        promotions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        promotions
    }

    pub fn create_promotion(&self, req: CreatePromotionRequest) -> FreshmartResult<Promotion> {
        if !(0.0..=100.0).contains(&req.discount_percentage) {
            return Err(FreshmartError::Validation(
                "discount percentage must be between 0 and 100".to_string(),
            ));
        }
        if req.ends_at <= req.starts_at {
            return Err(FreshmartError::Validation(
                "promotion must end after it starts".to_string(),
            ));
        }
        let promotion = Promotion {
            id: Uuid::new_v4(),
            title: req.title,
            description: req.description,
            discount_percentage: req.discount_percentage,
            product_ids: req.product_ids,
            category_ids: req.category_ids,
            starts_at: req.starts_at,
            ends_at: req.ends_at,
            is_active: true,
            created_at: Utc::now(),
        };
        self.promotions.insert(promotion.id, promotion.clone());
        Ok(promotion)
    }

    pub fn set_promotion_active(&self, id: Uuid, is_active: bool) -> Option<Promotion> {
        self.promotions.get_mut(&id).map(|mut entry| {
            entry.value_mut().is_active = is_active;
            entry.value().clone()
        })
    }

    pub fn delete_promotion(&self, id: Uuid) -> bool {
        self.promotions.remove(&id).is_some()
    }

    // ─── Packages ──────────────────────────────────────────────────────────

    pub fn list_packages(&self, query: &PackageQuery) -> Vec<Package> {
        let mut packages: Vec<Package> = self
            .packages
            .iter()
            .map(|r| r.value().clone())
            .filter(|p| p.is_active)
            .filter(|p| query.package_type.map_or(true, |t| p.package_type == t))
            .filter(|p| query.people_count.map_or(true, |n| p.people_count == n))
            .filter(|p| query.max_price.map_or(true, |max| p.total_price <= max))
            .collect();
        packages.sort_by(|a, b| {
            a.total_price
                .partial_cmp(&b.total_price)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.name.cmp(&b.name))
        });
        packages
    }

    pub fn get_package(&self, id: Uuid) -> Option<Package> {
        self.packages.get(&id).map(|r| r.value().clone())
    }

    pub fn package_items(&self, package_id: Uuid) -> Vec<PackageItem> {
        self.package_items
            .iter()
            .filter(|r| r.value().package_id == package_id)
            .map(|r| r.value().clone())
            .collect()
    }

    pub fn create_package(&self, req: CreatePackageRequest) -> FreshmartResult<Package> {
        for item in &req.items {
            if self.get_product(item.product_id).is_none() {
                return Err(FreshmartError::NotFound(format!(
                    "product {} in package",
                    item.product_id
                )));
            }
        }
        let package = Package {
            id: Uuid::new_v4(),
            name: req.name,
            description: req.description,
            package_type: req.package_type,
            people_count: req.people_count,
            duration_days: req.duration_days,
            total_price: req.total_price,
            image_url: req.image_url,
            is_active: true,
            created_at: Utc::now(),
        };
        self.packages.insert(package.id, package.clone());
        for item in req.items {
            let package_item = PackageItem {
                id: Uuid::new_v4(),
                package_id: package.id,
                product_id: item.product_id,
                quantity: item.quantity,
            };
            self.package_items.insert(package_item.id, package_item);
        }
        Ok(package)
    }

    pub fn record_package_order(&self, customer_id: Uuid, package: &Package) -> PackageOrder {
        let order = PackageOrder {
            id: Uuid::new_v4(),
            customer_id,
            package_id: package.id,
            total_price: package.total_price,
            created_at: Utc::now(),
        };
        self.package_orders.insert(order.id, order.clone());
        order
    }

    pub fn package_orders_for(&self, customer_id: Uuid) -> Vec<PackageOrder> {
        let mut orders: Vec<PackageOrder> = self
            .package_orders
            .iter()
            .filter(|r| r.value().customer_id == customer_id)
            .map(|r| r.value().clone())
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        orders
    }
}

impl Default for CatalogStore {
    fn default() -> Self {
        Self::new()
    }
}
