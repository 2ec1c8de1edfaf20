//! In-memory cart and purchase store backed by DashMap.
//!
//! Production: replace with PostgreSQL (sqlx) or similar ACID store.
//! Checkout coordinates the catalog (stock, popularity counters), the
//! customer store (reward balances), and this store's own purchase log.

use std::collections::{HashMap, HashSet};

use chrono::{Duration, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use freshmart_catalog::CatalogStore;
use freshmart_core::catalog::Product;
use freshmart_core::orders::*;
use freshmart_core::{FreshmartError, FreshmartResult};
use freshmart_loyalty::{CustomerStore, RewardsEngine};

// ─── Admin Stats ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct DailySales {
    /// `YYYY-MM-DD`.
    pub date: String,
    pub revenue: f64,
    pub orders: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategorySales {
    pub category: String,
    pub revenue: f64,
    pub items_sold: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SalesStats {
    pub total_revenue: f64,
    pub total_orders: u64,
    /// Trailing seven days, oldest first.
    pub daily: Vec<DailySales>,
    /// Top five categories by revenue over the trailing six months.
    pub top_categories: Vec<CategorySales>,
}

// ─── Store ──────────────────────────────────────────────────────────────────

/// Thread-safe in-memory store for carts and purchases. Carts are keyed by
/// customer, one open cart each, created lazily.
pub struct OrderStore {
    carts: DashMap<Uuid, Cart>,
    cart_items: DashMap<Uuid, CartItem>,
    purchases: DashMap<Uuid, Purchase>,
    purchase_items: DashMap<Uuid, PurchaseItem>,
}

impl OrderStore {
    pub fn new() -> Self {
        info!("Order store initialized (in-memory, development mode)");
        Self {
            carts: DashMap::new(),
            cart_items: DashMap::new(),
            purchases: DashMap::new(),
            purchase_items: DashMap::new(),
        }
    }

    // ─── Carts ─────────────────────────────────────────────────────────────

    fn cart_for(&self, customer_id: Uuid) -> Cart {
        let now = Utc::now();
        self.carts
            .entry(customer_id)
            .or_insert_with(|| Cart {
                id: Uuid::new_v4(),
                customer_id,
                created_at: now,
                updated_at: now,
            })
            .value()
            .clone()
    }

    fn items_in_cart(&self, cart_id: Uuid) -> Vec<CartItem> {
        let mut items: Vec<CartItem> = self
            .cart_items
            .iter()
            .filter(|r| r.value().cart_id == cart_id)
            .map(|r| r.value().clone())
            .collect();
        items.sort_by(|a, b| a.added_at.cmp(&b.added_at).then_with(|| a.id.cmp(&b.id)));
        items
    }

    pub fn cart_view(&self, catalog: &CatalogStore, customer_id: Uuid) -> CartView {
        let cart = self.cart_for(customer_id);
        let mut views = Vec::new();
        let mut total = 0.0;
        let mut item_count = 0;
        for item in self.items_in_cart(cart.id) {
            let Some(product) = catalog.get_product(item.product_id) else {
                // Product removed from the catalog since it was added.
                self.cart_items.remove(&item.id);
                continue;
            };
            let line_total = round_cents(product.price * item.quantity as f64);
            total += line_total;
            item_count += item.quantity;
            views.push(CartItemView {
                id: item.id,
                product_id: product.id,
                product_name: product.name.clone(),
                unit_price: product.price,
                quantity: item.quantity,
                line_total,
                in_stock: product.stock_quantity >= item.quantity,
            });
        }
        CartView {
            id: cart.id,
            customer_id,
            items: views,
            total: round_cents(total),
            item_count,
        }
    }

    pub fn add_item(
        &self,
        catalog: &CatalogStore,
        customer_id: Uuid,
        req: AddCartItemRequest,
    ) -> FreshmartResult<CartView> {
        if req.quantity == 0 {
            return Err(FreshmartError::Validation(
                "quantity must be at least 1".to_string(),
            ));
        }
        let product = catalog
            .get_product(req.product_id)
            .filter(|p| p.is_active)
            .ok_or_else(|| FreshmartError::NotFound("product".to_string()))?;

        let cart = self.cart_for(customer_id);
        let existing = self
            .items_in_cart(cart.id)
            .into_iter()
            .find(|i| i.product_id == req.product_id);
        let requested = existing.as_ref().map(|i| i.quantity).unwrap_or(0) + req.quantity;
        if product.stock_quantity < requested {
            return Err(FreshmartError::InsufficientStock(format!(
                "{} has {} units, {} requested",
                product.name, product.stock_quantity, requested
            )));
        }

        match existing {
            Some(item) => {
                if let Some(mut entry) = self.cart_items.get_mut(&item.id) {
                    entry.value_mut().quantity = requested;
                }
            }
            None => {
                let item = CartItem {
                    id: Uuid::new_v4(),
                    cart_id: cart.id,
                    product_id: req.product_id,
                    quantity: req.quantity,
                    added_at: Utc::now(),
                };
                self.cart_items.insert(item.id, item);
            }
        }
        self.touch_cart(customer_id);
        Ok(self.cart_view(catalog, customer_id))
    }

    pub fn update_item(
        &self,
        catalog: &CatalogStore,
        customer_id: Uuid,
        item_id: Uuid,
        req: UpdateCartItemRequest,
    ) -> FreshmartResult<CartView> {
        let cart = self.cart_for(customer_id);
        let item = self
            .cart_items
            .get(&item_id)
            .map(|r| r.value().clone())
            .filter(|i| i.cart_id == cart.id)
            .ok_or_else(|| FreshmartError::NotFound("cart item".to_string()))?;

        if req.quantity == 0 {
            self.cart_items.remove(&item.id);
        } else {
            let product = catalog
                .get_product(item.product_id)
                .ok_or_else(|| FreshmartError::NotFound("product".to_string()))?;
            if product.stock_quantity < req.quantity {
                return Err(FreshmartError::InsufficientStock(format!(
                    "{} has {} units, {} requested",
                    product.name, product.stock_quantity, req.quantity
                )));
            }
            if let Some(mut entry) = self.cart_items.get_mut(&item.id) {
                entry.value_mut().quantity = req.quantity;
            }
        }
        self.touch_cart(customer_id);
        Ok(self.cart_view(catalog, customer_id))
    }

    pub fn remove_item(
        &self,
        catalog: &CatalogStore,
        customer_id: Uuid,
        item_id: Uuid,
    ) -> FreshmartResult<CartView> {
        let cart = self.cart_for(customer_id);
        let owned = self
            .cart_items
            .get(&item_id)
            .map(|r| r.value().cart_id == cart.id)
            .unwrap_or(false);
        if !owned {
            return Err(FreshmartError::NotFound("cart item".to_string()));
        }
        self.cart_items.remove(&item_id);
        self.touch_cart(customer_id);
        Ok(self.cart_view(catalog, customer_id))
    }

    pub fn clear_cart(&self, customer_id: Uuid) {
        let cart = self.cart_for(customer_id);
        let ids: Vec<Uuid> = self
            .cart_items
            .iter()
            .filter(|r| r.value().cart_id == cart.id)
            .map(|r| *r.key())
            .collect();
        for id in ids {
            self.cart_items.remove(&id);
        }
        self.touch_cart(customer_id);
    }

    /// Add every line of a pre-designed package to the cart. Fails fast on
    /// the first under-stocked line, leaving earlier lines in the cart.
    pub fn add_package_to_cart(
        &self,
        catalog: &CatalogStore,
        customer_id: Uuid,
        package_id: Uuid,
    ) -> FreshmartResult<CartView> {
        let package = catalog
            .get_package(package_id)
            .filter(|p| p.is_active)
            .ok_or_else(|| FreshmartError::NotFound("package".to_string()))?;
        for item in catalog.package_items(package.id) {
            self.add_item(
                catalog,
                customer_id,
                AddCartItemRequest {
                    product_id: item.product_id,
                    quantity: item.quantity,
                },
            )?;
        }
        catalog.record_package_order(customer_id, &package);
        Ok(self.cart_view(catalog, customer_id))
    }

    fn touch_cart(&self, customer_id: Uuid) {
        if let Some(mut entry) = self.carts.get_mut(&customer_id) {
            entry.value_mut().updated_at = Utc::now();
        }
    }

    // ─── Checkout ──────────────────────────────────────────────────────────

    /// Convert the cart into a completed purchase: validate every line
    /// against live stock, capture prices, decrement shelves, bump
    /// popularity counters, accrue rewards, and clear the cart.
    pub fn checkout(
        &self,
        catalog: &CatalogStore,
        customers: &CustomerStore,
        rewards_engine: &RewardsEngine,
        customer_id: Uuid,
        req: CheckoutRequest,
    ) -> FreshmartResult<CheckoutResponse> {
        if customers.get(customer_id).is_none() {
            return Err(FreshmartError::NotFound("customer".to_string()));
        }
        let cart = self.cart_for(customer_id);
        let cart_items = self.items_in_cart(cart.id);
        if cart_items.is_empty() {
            return Err(FreshmartError::Validation("cart is empty".to_string()));
        }

        let mut lines: Vec<(CartItem, Product)> = Vec::with_capacity(cart_items.len());
        for item in cart_items {
            let product = catalog
                .get_product(item.product_id)
                .filter(|p| p.is_active)
                .ok_or_else(|| {
                    FreshmartError::Checkout(format!(
                        "product {} is no longer available",
                        item.product_id
                    ))
                })?;
            lines.push((item, product));
        }

        // Take stock line by line; on failure return what was already taken.
        let mut taken: Vec<(Uuid, u32)> = Vec::new();
        for (item, product) in &lines {
            if let Err(err) = catalog.decrement_stock(product.id, item.quantity) {
                for (product_id, qty) in taken {
                    catalog.restock(product_id, qty);
                }
                return Err(err);
            }
            taken.push((product.id, item.quantity));
        }

        let total = round_cents(
            lines
                .iter()
                .map(|(item, product)| item.quantity as f64 * product.price)
                .sum(),
        );
        let now = Utc::now();
        let purchase = Purchase {
            id: Uuid::new_v4(),
            customer_id,
            total_amount: total,
            status: PurchaseStatus::Completed,
            payment_method: req.payment_method,
            created_at: now,
            updated_at: now,
        };
        self.purchases.insert(purchase.id, purchase.clone());

        let mut items = Vec::with_capacity(lines.len());
        for (cart_item, product) in &lines {
            let item = PurchaseItem {
                id: Uuid::new_v4(),
                purchase_id: purchase.id,
                product_id: product.id,
                quantity: cart_item.quantity,
                price_at_purchase: product.price,
            };
            self.purchase_items.insert(item.id, item.clone());
            items.push(item);
            catalog.record_product_purchased(product.id);
        }

        let rewards = customers.apply_checkout_rewards(rewards_engine, customer_id, total)?;
        self.clear_cart(customer_id);

        metrics::counter!("checkout.completed").increment(1);
        metrics::counter!("checkout.revenue_cents").increment((total * 100.0).round() as u64);
        info!(
            customer_id = %customer_id,
            purchase_id = %purchase.id,
            total = total,
            lines = items.len(),
            "Checkout completed"
        );

        Ok(CheckoutResponse {
            purchase,
            items,
            rewards,
        })
    }

    // ─── Purchase History ──────────────────────────────────────────────────

    pub fn purchases_for(&self, customer_id: Uuid) -> Vec<Purchase> {
        let mut purchases: Vec<Purchase> = self
            .purchases
            .iter()
            .filter(|r| r.value().customer_id == customer_id)
            .map(|r| r.value().clone())
            .collect();
        purchases.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        purchases
    }

    pub fn purchase(&self, customer_id: Uuid, purchase_id: Uuid) -> Option<(Purchase, Vec<PurchaseItem>)> {
        let purchase = self
            .purchases
            .get(&purchase_id)
            .map(|r| r.value().clone())
            .filter(|p| p.customer_id == customer_id)?;
        let items = self.purchase_items(purchase_id);
        Some((purchase, items))
    }

    /// Purchase lookup without the ownership filter. Admin views only.
    pub fn get_purchase(&self, purchase_id: Uuid) -> Option<(Purchase, Vec<PurchaseItem>)> {
        let purchase = self.purchases.get(&purchase_id).map(|r| r.value().clone())?;
        let items = self.purchase_items(purchase_id);
        Some((purchase, items))
    }

    pub fn purchase_items(&self, purchase_id: Uuid) -> Vec<PurchaseItem> {
        let mut items: Vec<PurchaseItem> = self
            .purchase_items
            .iter()
            .filter(|r| r.value().purchase_id == purchase_id)
            .map(|r| r.value().clone())
            .collect();
        items.sort_by(|a, b| a.id.cmp(&b.id));
        items
    }

    pub fn list_all(&self, status: Option<PurchaseStatus>) -> Vec<Purchase> {
        let mut purchases: Vec<Purchase> = self
            .purchases
            .iter()
            .map(|r| r.value().clone())
            .filter(|p| status.map_or(true, |s| p.status == s))
            .collect();
        purchases.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        purchases
    }

    pub fn update_status(&self, purchase_id: Uuid, status: PurchaseStatus) -> Option<Purchase> {
        self.purchases.get_mut(&purchase_id).map(|mut entry| {
            entry.value_mut().status = status;
            entry.value_mut().updated_at = Utc::now();
            entry.value().clone()
        })
    }

    fn completed_purchases_for(&self, customer_id: Uuid) -> Vec<Purchase> {
        let mut purchases: Vec<Purchase> = self
            .purchases
            .iter()
            .filter(|r| {
                r.value().customer_id == customer_id && r.value().status.is_completed()
            })
            .map(|r| r.value().clone())
            .collect();
        purchases.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        purchases
    }

    /// Completed purchase lines joined with catalog context, in purchase
    /// order. Lines whose product has since left the catalog are skipped.
    pub fn completed_items(&self, catalog: &CatalogStore, customer_id: Uuid) -> Vec<PurchasedItem> {
        let mut out = Vec::new();
        for purchase in self.completed_purchases_for(customer_id) {
            for item in self.purchase_items(purchase.id) {
                let Some(product) = catalog.get_product(item.product_id) else {
                    continue;
                };
                let category = catalog
                    .get_category(product.category_id)
                    .map(|c| c.name)
                    .unwrap_or_default();
                let brand = product.brand_id.and_then(|b| catalog.get_brand(b)).map(|b| b.name);
                out.push(PurchasedItem {
                    product_id: product.id,
                    category,
                    brand,
                    quantity: item.quantity,
                });
            }
        }
        out
    }

    /// Every product the customer has ever completed a purchase of. The
    /// universal exclusion set for recommendation signals.
    pub fn purchased_product_ids(&self, customer_id: Uuid) -> HashSet<Uuid> {
        let mut ids = HashSet::new();
        for purchase in self.completed_purchases_for(customer_id) {
            for item in self.purchase_items(purchase.id) {
                ids.insert(item.product_id);
            }
        }
        ids
    }

    /// Review gate: has this customer completed a purchase containing the
    /// product?
    pub fn has_purchased(&self, customer_id: Uuid, product_id: Uuid) -> bool {
        self.purchased_product_ids(customer_id).contains(&product_id)
    }

    /// Customers ranked by how many completed-purchase products they share
    /// with this one. Ties break by customer id so repeated runs agree.
    pub fn similar_customers(&self, customer_id: Uuid, top_n: usize) -> Vec<(Uuid, usize)> {
        let own = self.purchased_product_ids(customer_id);
        if own.is_empty() {
            return Vec::new();
        }
        let other_ids: HashSet<Uuid> = self
            .purchases
            .iter()
            .filter(|r| r.value().status.is_completed() && r.value().customer_id != customer_id)
            .map(|r| r.value().customer_id)
            .collect();

        let mut ranked: Vec<(Uuid, usize)> = other_ids
            .into_iter()
            .filter_map(|other| {
                let overlap = self
                    .purchased_product_ids(other)
                    .intersection(&own)
                    .count();
                (overlap > 0).then_some((other, overlap))
            })
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(top_n);
        ranked
    }

    /// Product ids bought by the given customers, ranked by how many of
    /// their completed purchase lines contain each product.
    pub fn products_purchased_by(
        &self,
        customer_ids: &[Uuid],
        exclude: &HashSet<Uuid>,
        limit: usize,
    ) -> Vec<Uuid> {
        let customers: HashSet<Uuid> = customer_ids.iter().copied().collect();
        let mut counts: HashMap<Uuid, usize> = HashMap::new();
        for purchase in self.purchases.iter() {
            let p = purchase.value();
            if !p.status.is_completed() || !customers.contains(&p.customer_id) {
                continue;
            }
            for item in self.purchase_items(p.id) {
                if !exclude.contains(&item.product_id) {
                    *counts.entry(item.product_id).or_insert(0) += 1;
                }
            }
        }
        let mut ranked: Vec<(Uuid, usize)> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(limit);
        ranked.into_iter().map(|(id, _)| id).collect()
    }

    /// Co-purchase counts for one product across all completed purchases,
    /// most frequent companions first.
    pub fn products_bought_with(&self, product_id: Uuid, limit: usize) -> Vec<(Uuid, usize)> {
        let mut counts: HashMap<Uuid, usize> = HashMap::new();
        let containing: Vec<Uuid> = self
            .purchase_items
            .iter()
            .filter(|r| r.value().product_id == product_id)
            .map(|r| r.value().purchase_id)
            .collect();
        for purchase_id in containing {
            let completed = self
                .purchases
                .get(&purchase_id)
                .map(|r| r.value().status.is_completed())
                .unwrap_or(false);
            if !completed {
                continue;
            }
            for item in self.purchase_items(purchase_id) {
                if item.product_id != product_id {
                    *counts.entry(item.product_id).or_insert(0) += 1;
                }
            }
        }
        let mut ranked: Vec<(Uuid, usize)> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(limit);
        ranked
    }

    // ─── Admin Stats ───────────────────────────────────────────────────────

    pub fn sales_stats(&self, catalog: &CatalogStore) -> SalesStats {
        let now = Utc::now();
        let completed: Vec<Purchase> = self
            .purchases
            .iter()
            .filter(|r| r.value().status.is_completed())
            .map(|r| r.value().clone())
            .collect();

        let total_revenue = round_cents(completed.iter().map(|p| p.total_amount).sum());
        let total_orders = completed.len() as u64;

        let mut daily: Vec<DailySales> = (0..7)
            .rev()
            .map(|back| DailySales {
                date: (now - Duration::days(back)).format("%Y-%m-%d").to_string(),
                revenue: 0.0,
                orders: 0,
            })
            .collect();
        for purchase in &completed {
            let key = purchase.created_at.format("%Y-%m-%d").to_string();
            if let Some(bucket) = daily.iter_mut().find(|d| d.date == key) {
                bucket.revenue = round_cents(bucket.revenue + purchase.total_amount);
                bucket.orders += 1;
            }
        }

        let window_start = now - Duration::days(183);
        let mut by_category: HashMap<String, (f64, u64)> = HashMap::new();
        for purchase in &completed {
            if purchase.created_at < window_start {
                continue;
            }
            for item in self.purchase_items(purchase.id) {
                let Some(product) = catalog.get_product(item.product_id) else {
                    continue;
                };
                let category = catalog
                    .get_category(product.category_id)
                    .map(|c| c.name)
                    .unwrap_or_else(|| "Uncategorized".to_string());
                let entry = by_category.entry(category).or_insert((0.0, 0));
                entry.0 += item.price_at_purchase * item.quantity as f64;
                entry.1 += 1;
            }
        }
        let mut top_categories: Vec<CategorySales> = by_category
            .into_iter()
            .map(|(category, (revenue, items_sold))| CategorySales {
                category,
                revenue: round_cents(revenue),
                items_sold,
            })
            .collect();
        top_categories.sort_by(|a, b| {
            b.revenue
                .partial_cmp(&a.revenue)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.category.cmp(&b.category))
        });
        top_categories.truncate(5);

        SalesStats {
            total_revenue,
            total_orders,
            daily,
            top_categories,
        }
    }
}

impl Default for OrderStore {
    fn default() -> Self {
        Self::new()
    }
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use freshmart_core::catalog::{CreateCategoryRequest, CreateProductRequest};
    use freshmart_core::config::RewardsConfig;
    use freshmart_core::customer::RegisterRequest;

    struct Fixture {
        catalog: CatalogStore,
        customers: CustomerStore,
        rewards: RewardsEngine,
        orders: OrderStore,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                catalog: CatalogStore::new(),
                customers: CustomerStore::new(),
                rewards: RewardsEngine::new(&RewardsConfig::default()),
                orders: OrderStore::new(),
            }
        }

        fn customer(&self, username: &str) -> Uuid {
            self.customers
                .register(RegisterRequest {
                    username: username.to_string(),
                    email: format!("{username}@example.com"),
                    password: "pw".to_string(),
                    first_name: String::new(),
                    last_name: String::new(),
                    phone: None,
                    city: None,
                    store_branch: None,
                })
                .unwrap()
                .id
        }

        fn product(&self, name: &str, price: f64, stock: u32) -> Uuid {
            let category = match self.catalog.category_by_name("Grocery") {
                Some(c) => c,
                None => self
                    .catalog
                    .create_category(CreateCategoryRequest {
                        name: "Grocery".to_string(),
                        description: String::new(),
                    })
                    .unwrap(),
            };
            self.catalog
                .create_product(CreateProductRequest {
                    name: name.to_string(),
                    description: String::new(),
                    category_id: category.id,
                    brand_id: None,
                    price,
                    stock_quantity: stock,
                    image_url: None,
                    aisle_location: None,
                    featured: false,
                })
                .unwrap()
                .id
        }

        fn add(&self, customer: Uuid, product: Uuid, qty: u32) {
            self.orders
                .add_item(
                    &self.catalog,
                    customer,
                    AddCartItemRequest {
                        product_id: product,
                        quantity: qty,
                    },
                )
                .unwrap();
        }

        fn checkout(&self, customer: Uuid) -> CheckoutResponse {
            self.orders
                .checkout(
                    &self.catalog,
                    &self.customers,
                    &self.rewards,
                    customer,
                    CheckoutRequest {
                        payment_method: PaymentMethod::Card,
                    },
                )
                .unwrap()
        }
    }

    #[test]
    fn test_add_item_merges_quantities() {
        let fx = Fixture::new();
        let customer = fx.customer("alice");
        let product = fx.product("Milk", 3.50, 10);
        fx.add(customer, product, 2);
        let view = fx
            .orders
            .add_item(
                &fx.catalog,
                customer,
                AddCartItemRequest { product_id: product, quantity: 3 },
            )
            .unwrap();
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.items[0].quantity, 5);
        assert!((view.total - 17.50).abs() < 1e-9);
    }

    #[test]
    fn test_add_item_respects_stock() {
        let fx = Fixture::new();
        let customer = fx.customer("alice");
        let product = fx.product("Milk", 3.50, 4);
        fx.add(customer, product, 3);
        let result = fx.orders.add_item(
            &fx.catalog,
            customer,
            AddCartItemRequest { product_id: product, quantity: 2 },
        );
        assert!(matches!(result, Err(FreshmartError::InsufficientStock(_))));
    }

    #[test]
    fn test_update_item_zero_removes_line() {
        let fx = Fixture::new();
        let customer = fx.customer("alice");
        let product = fx.product("Milk", 3.50, 10);
        fx.add(customer, product, 2);
        let view = fx.orders.cart_view(&fx.catalog, customer);
        let item_id = view.items[0].id;
        let view = fx
            .orders
            .update_item(&fx.catalog, customer, item_id, UpdateCartItemRequest { quantity: 0 })
            .unwrap();
        assert!(view.items.is_empty());
    }

    #[test]
    fn test_checkout_completes_and_clears() {
        let fx = Fixture::new();
        let customer = fx.customer("alice");
        let milk = fx.product("Milk", 30.0, 10);
        let bread = fx.product("Bread", 15.0, 10);
        fx.add(customer, milk, 1);
        fx.add(customer, bread, 2);

        let response = fx.checkout(customer);
        assert_eq!(response.purchase.status, PurchaseStatus::Completed);
        assert!((response.purchase.total_amount - 60.0).abs() < 1e-9);
        assert_eq!(response.items.len(), 2);
        assert_eq!(response.rewards.points_earned, 120);
        assert!((response.rewards.cashback_earned - 3.0).abs() < 1e-9);
        assert!(response.rewards.free_delivery);

        assert_eq!(fx.catalog.get_product(milk).unwrap().stock_quantity, 9);
        assert_eq!(fx.catalog.get_product(bread).unwrap().stock_quantity, 8);
        assert_eq!(fx.catalog.purchase_count(milk), 1);
        assert!(fx.orders.cart_view(&fx.catalog, customer).items.is_empty());
    }

    #[test]
    fn test_checkout_empty_cart_rejected() {
        let fx = Fixture::new();
        let customer = fx.customer("alice");
        let result = fx.orders.checkout(
            &fx.catalog,
            &fx.customers,
            &fx.rewards,
            customer,
            CheckoutRequest { payment_method: PaymentMethod::Card },
        );
        assert!(matches!(result, Err(FreshmartError::Validation(_))));
    }

    #[test]
    fn test_checkout_restocks_on_partial_failure() {
        let fx = Fixture::new();
        let alice = fx.customer("alice");
        let bob = fx.customer("bob");
        let milk = fx.product("Milk", 3.0, 10);
        let eggs = fx.product("Eggs", 5.0, 2);
        fx.add(alice, milk, 2);
        fx.add(alice, eggs, 2);

        // Bob buys the eggs out from under Alice's cart.
        fx.add(bob, eggs, 2);
        fx.checkout(bob);

        let result = fx.orders.checkout(
            &fx.catalog,
            &fx.customers,
            &fx.rewards,
            alice,
            CheckoutRequest { payment_method: PaymentMethod::Card },
        );
        assert!(matches!(result, Err(FreshmartError::InsufficientStock(_))));
        // Milk taken for the failed checkout went back on the shelf.
        assert_eq!(fx.catalog.get_product(milk).unwrap().stock_quantity, 10);
        assert_eq!(fx.orders.cart_view(&fx.catalog, alice).items.len(), 2);
    }

    #[test]
    fn test_purchased_ids_count_completed_only() {
        let fx = Fixture::new();
        let customer = fx.customer("alice");
        let milk = fx.product("Milk", 3.0, 10);
        fx.add(customer, milk, 1);
        // A cart line is not a purchase.
        assert!(!fx.orders.has_purchased(customer, milk));
        let response = fx.checkout(customer);

        assert!(fx.orders.purchased_product_ids(customer).contains(&milk));
        assert!(fx.orders.has_purchased(customer, milk));
        fx.orders
            .update_status(response.purchase.id, PurchaseStatus::Cancelled);
        assert!(fx.orders.purchased_product_ids(customer).is_empty());
        assert!(!fx.orders.has_purchased(customer, milk));
    }

    #[test]
    fn test_similar_customers_ranked_by_overlap() {
        let fx = Fixture::new();
        let alice = fx.customer("alice");
        let bob = fx.customer("bob");
        let carol = fx.customer("carol");
        let milk = fx.product("Milk", 3.0, 50);
        let eggs = fx.product("Eggs", 5.0, 50);
        let bread = fx.product("Bread", 4.0, 50);

        for &p in &[milk, eggs] {
            fx.add(alice, p, 1);
        }
        fx.checkout(alice);

        // Bob shares two products, Carol one.
        for &p in &[milk, eggs, bread] {
            fx.add(bob, p, 1);
        }
        fx.checkout(bob);
        fx.add(carol, milk, 1);
        fx.checkout(carol);

        let similar = fx.orders.similar_customers(alice, 5);
        assert_eq!(similar.len(), 2);
        assert_eq!(similar[0], (bob, 2));
        assert_eq!(similar[1], (carol, 1));
    }

    #[test]
    fn test_similar_customers_tie_breaks_by_id() {
        let fx = Fixture::new();
        let alice = fx.customer("alice");
        let bob = fx.customer("bob");
        let carol = fx.customer("carol");
        let milk = fx.product("Milk", 3.0, 50);

        for &c in &[alice, bob, carol] {
            fx.add(c, milk, 1);
            fx.checkout(c);
        }

        // Bob and carol overlap equally; the smaller id surfaces first.
        let similar = fx.orders.similar_customers(alice, 5);
        assert_eq!(similar.len(), 2);
        assert_eq!(similar[0].1, 1);
        assert_eq!(similar[1].1, 1);
        assert!(similar[0].0 < similar[1].0);
    }

    #[test]
    fn test_products_purchased_by_excludes_owned() {
        let fx = Fixture::new();
        let alice = fx.customer("alice");
        let bob = fx.customer("bob");
        let milk = fx.product("Milk", 3.0, 50);
        let bread = fx.product("Bread", 4.0, 50);

        fx.add(alice, milk, 1);
        fx.checkout(alice);
        for &p in &[milk, bread] {
            fx.add(bob, p, 1);
        }
        fx.checkout(bob);

        let owned = fx.orders.purchased_product_ids(alice);
        let suggestions = fx.orders.products_purchased_by(&[bob], &owned, 5);
        assert_eq!(suggestions, vec![bread]);
    }

    #[test]
    fn test_products_bought_with_counts_companions() {
        let fx = Fixture::new();
        let alice = fx.customer("alice");
        let bob = fx.customer("bob");
        let milk = fx.product("Milk", 3.0, 50);
        let eggs = fx.product("Eggs", 5.0, 50);
        let bread = fx.product("Bread", 4.0, 50);

        for &p in &[milk, eggs, bread] {
            fx.add(alice, p, 1);
        }
        fx.checkout(alice);
        for &p in &[milk, eggs] {
            fx.add(bob, p, 1);
        }
        fx.checkout(bob);

        let companions = fx.orders.products_bought_with(milk, 6);
        assert_eq!(companions[0], (eggs, 2));
        assert!(companions.contains(&(bread, 1)));
    }

    #[test]
    fn test_package_add_to_cart() {
        let fx = Fixture::new();
        let customer = fx.customer("alice");
        let milk = fx.product("Milk", 3.0, 50);
        let bread = fx.product("Bread", 4.0, 50);
        let package = fx
            .catalog
            .create_package(freshmart_core::catalog::CreatePackageRequest {
                name: "Breakfast Basics".to_string(),
                description: String::new(),
                package_type: freshmart_core::catalog::PackageType::Duo,
                people_count: 2,
                duration_days: 7,
                total_price: 11.0,
                image_url: None,
                items: vec![
                    freshmart_core::catalog::PackageItemSpec { product_id: milk, quantity: 2 },
                    freshmart_core::catalog::PackageItemSpec { product_id: bread, quantity: 1 },
                ],
            })
            .unwrap();

        let view = fx
            .orders
            .add_package_to_cart(&fx.catalog, customer, package.id)
            .unwrap();
        assert_eq!(view.items.len(), 2);
        assert_eq!(view.item_count, 3);
        assert_eq!(fx.catalog.package_orders_for(customer).len(), 1);
    }

    #[test]
    fn test_sales_stats_totals() {
        let fx = Fixture::new();
        let customer = fx.customer("alice");
        let milk = fx.product("Milk", 30.0, 50);
        fx.add(customer, milk, 2);
        fx.checkout(customer);

        let stats = fx.orders.sales_stats(&fx.catalog);
        assert_eq!(stats.total_orders, 1);
        assert!((stats.total_revenue - 60.0).abs() < 1e-9);
        assert_eq!(stats.daily.len(), 7);
        assert_eq!(stats.daily.last().unwrap().orders, 1);
        assert_eq!(stats.top_categories.len(), 1);
        assert_eq!(stats.top_categories[0].category, "Grocery");
    }
}
