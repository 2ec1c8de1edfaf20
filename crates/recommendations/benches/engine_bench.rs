//! Benchmarks for the recommendation engine.
//! Run with: cargo bench

#![allow(unused)]

use std::sync::Arc;

use freshmart_catalog::CatalogStore;
use freshmart_core::catalog::{CreateCategoryRequest, CreateProductRequest};
use freshmart_core::config::{RecommendationsConfig, RewardsConfig};
use freshmart_core::customer::{PreferenceRequest, RegisterRequest};
use freshmart_core::orders::{AddCartItemRequest, CheckoutRequest, PaymentMethod};
use freshmart_loyalty::{CustomerStore, RewardsEngine};
use freshmart_orders::OrderStore;
use freshmart_recommendations::{RecommendationEngine, RecommendationStore};
use uuid::Uuid;

const CATEGORIES: usize = 8;
const PRODUCTS_PER_CATEGORY: usize = 40;
const SHOPPERS: usize = 50;

fn main() {
    let catalog = Arc::new(CatalogStore::new());
    let orders = Arc::new(OrderStore::new());
    let customers = Arc::new(CustomerStore::new());
    let store = Arc::new(RecommendationStore::new());
    let rewards = RewardsEngine::new(&RewardsConfig::default());
    let engine = RecommendationEngine::new(
        catalog.clone(),
        orders.clone(),
        customers.clone(),
        store.clone(),
        &RecommendationsConfig::default(),
    );

    let mut products: Vec<Uuid> = Vec::new();
    for c in 0..CATEGORIES {
        let category = catalog
            .create_category(CreateCategoryRequest {
                name: format!("Category {c}"),
                description: String::new(),
            })
            .unwrap();
        for p in 0..PRODUCTS_PER_CATEGORY {
            let product = catalog
                .create_product(CreateProductRequest {
                    name: format!("Product {c}-{p}"),
                    description: String::new(),
                    category_id: category.id,
                    brand_id: None,
                    price: 3.50,
                    stock_quantity: 1_000_000,
                    image_url: None,
                    aisle_location: None,
                    featured: p == 0,
                })
                .unwrap();
            products.push(product.id);
        }
    }

    // Shoppers with preferences and one purchase each, so every signal has
    // material to work with.
    let mut shopper_ids = Vec::new();
    for s in 0..SHOPPERS {
        let shopper = customers
            .register(RegisterRequest {
                username: format!("bench-shopper-{s}"),
                email: format!("bench-{s}@example.com"),
                password: "bench".to_string(),
                first_name: String::new(),
                last_name: String::new(),
                phone: None,
                city: None,
                store_branch: None,
            })
            .unwrap();
        customers
            .upsert_preference(
                shopper.id,
                PreferenceRequest {
                    category: format!("Category {}", s % CATEGORIES),
                    brand: None,
                    preference_score: 0.8,
                },
            )
            .unwrap();
        for i in 0..4 {
            let product = products[(s * 7 + i * 13) % products.len()];
            orders
                .add_item(
                    &catalog,
                    shopper.id,
                    AddCartItemRequest { product_id: product, quantity: 1 },
                )
                .unwrap();
        }
        orders
            .checkout(
                &catalog,
                &customers,
                &rewards,
                shopper.id,
                CheckoutRequest { payment_method: PaymentMethod::Card },
            )
            .unwrap();
        shopper_ids.push(shopper.id);
    }

    let subject = shopper_ids[0];

    // Warmup
    for _ in 0..10 {
        engine.generate_for(subject, None).unwrap();
    }

    // Benchmark
    let iterations = 1_000;
    let start = std::time::Instant::now();

    for i in 0..iterations {
        let customer = shopper_ids[(i as usize) % shopper_ids.len()];
        let _ = engine.generate_for(customer, None).unwrap();
    }

    let elapsed = start.elapsed();
    let per_iter = elapsed / iterations;

    println!("=== Recommendation Benchmark ===");
    println!("Iterations:  {}", iterations);
    println!("Total time:  {:?}", elapsed);
    println!("Per refresh: {:?}", per_iter);
    println!("Throughput:  {:.0} refreshes/sec", iterations as f64 / elapsed.as_secs_f64());
    println!("Catalog:     {} products", products.len());
}
