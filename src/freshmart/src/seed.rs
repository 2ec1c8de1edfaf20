//! Demo data loader for development stands and demos.
//!
//! Ten departments, the house-brand lineup, a handful of regular shoppers
//! with purchase history, curated bundles, and two running promotions.
//! Purchases go through the real checkout path so loyalty balances, stock
//! levels, and sales stats all line up.

use std::collections::HashMap;

use anyhow::Context;
use chrono::{Duration, Utc};
use freshmart_api::AppState;
use freshmart_core::catalog::{
    CreateCategoryRequest, CreatePackageRequest, CreateProductRequest, CreatePromotionRequest,
    PackageItemSpec, PackageType, ReviewRequest,
};
use freshmart_core::customer::{CustomerRole, PreferenceRequest, RegisterRequest};
use freshmart_core::orders::{AddCartItemRequest, CheckoutRequest, PaymentMethod};
use tracing::info;
use uuid::Uuid;

const DEMO_PASSWORD: &str = "password123";

// (name, description)
const CATEGORY_ROWS: &[(&str, &str)] = &[
    ("Fresh Produce", "Fresh fruits and vegetables"),
    ("Dairy & Eggs", "Milk, cheese, yogurt, and eggs"),
    ("Meat & Seafood", "Fresh meat and seafood"),
    ("Bakery", "Fresh bread and baked goods"),
    ("Beverages", "Drinks and beverages"),
    ("Snacks", "Chips, cookies, and snacks"),
    ("Frozen Foods", "Frozen meals and ice cream"),
    ("Pantry Staples", "Rice, pasta, and canned goods"),
    ("Health & Beauty", "Personal care products"),
    ("Household", "Cleaning and household items"),
];

// (name, description)
const BRAND_ROWS: &[(&str, &str)] = &[
    ("FreshMart Organic", "Our organic product line"),
    ("Daily Fresh", "Fresh daily products"),
    ("Green Valley", "Natural and healthy products"),
    ("Ocean Catch", "Premium seafood"),
    ("Baker's Choice", "Quality baked goods"),
    ("Pure Dairy", "Farm fresh dairy"),
    ("Snack Time", "Delicious snacks"),
    ("Healthy Choice", "Health-conscious products"),
];

// (name, category, brand, price, stock, aisle, featured)
const PRODUCT_ROWS: &[(&str, &str, &str, f64, u32, &str, bool)] = &[
    ("Organic Apples", "Fresh Produce", "FreshMart Organic", 3.99, 100, "A-1", true),
    ("Fresh Bananas", "Fresh Produce", "Daily Fresh", 2.49, 150, "A-1", false),
    ("Organic Carrots", "Fresh Produce", "FreshMart Organic", 2.99, 80, "A-2", false),
    ("Fresh Tomatoes", "Fresh Produce", "Daily Fresh", 3.49, 90, "A-2", false),
    ("Whole Milk", "Dairy & Eggs", "Pure Dairy", 4.99, 60, "B-1", false),
    ("Greek Yogurt", "Dairy & Eggs", "Pure Dairy", 5.99, 50, "B-1", true),
    ("Cheddar Cheese", "Dairy & Eggs", "Pure Dairy", 6.99, 40, "B-2", false),
    ("Free Range Eggs", "Dairy & Eggs", "Daily Fresh", 4.49, 70, "B-2", false),
    ("Chicken Breast", "Meat & Seafood", "Daily Fresh", 8.99, 45, "C-1", false),
    ("Atlantic Salmon", "Meat & Seafood", "Ocean Catch", 12.99, 30, "C-2", true),
    ("Whole Wheat Bread", "Bakery", "Baker's Choice", 3.99, 80, "D-1", false),
    ("Croissants", "Bakery", "Baker's Choice", 5.49, 40, "D-1", true),
    ("Orange Juice", "Beverages", "Daily Fresh", 4.99, 60, "E-1", false),
    ("Green Tea", "Beverages", "Healthy Choice", 6.99, 50, "E-2", true),
    ("Sparkling Water", "Beverages", "Daily Fresh", 3.99, 100, "E-1", false),
    ("Potato Chips", "Snacks", "Snack Time", 3.49, 120, "F-1", false),
    ("Chocolate Cookies", "Snacks", "Snack Time", 4.99, 90, "F-2", false),
    ("Trail Mix", "Snacks", "Healthy Choice", 5.99, 70, "F-1", true),
    ("Frozen Pizza", "Frozen Foods", "Daily Fresh", 7.99, 50, "G-1", false),
    ("Ice Cream", "Frozen Foods", "Daily Fresh", 5.99, 60, "G-2", false),
];

// (username, first, last, city, store branch)
const SHOPPER_ROWS: &[(&str, &str, &str, &str, &str)] = &[
    ("john_doe", "John", "Doe", "New York", "Manhattan"),
    ("jane_smith", "Jane", "Smith", "New York", "Brooklyn"),
    ("bob_wilson", "Bob", "Wilson", "Los Angeles", "Downtown LA"),
    ("alice_brown", "Alice", "Brown", "Chicago", "North Chicago"),
    ("charlie_davis", "Charlie", "Davis", "San Francisco", "Downtown SF"),
];

// (username, category, brand, score)
const PREFERENCE_ROWS: &[(&str, &str, &str, f64)] = &[
    ("john_doe", "Fresh Produce", "FreshMart Organic", 0.9),
    ("john_doe", "Dairy & Eggs", "Pure Dairy", 0.8),
    ("jane_smith", "Health & Beauty", "Healthy Choice", 0.9),
    ("jane_smith", "Snacks", "Snack Time", 0.75),
    ("bob_wilson", "Meat & Seafood", "Ocean Catch", 0.95),
    ("bob_wilson", "Beverages", "Daily Fresh", 0.7),
    ("alice_brown", "Bakery", "Baker's Choice", 0.85),
    ("alice_brown", "Frozen Foods", "Daily Fresh", 0.8),
    ("charlie_davis", "Snacks", "Healthy Choice", 0.8),
    ("charlie_davis", "Beverages", "Healthy Choice", 0.9),
];

// (username, basket of (product, quantity))
const PURCHASE_ROWS: &[(&str, &[(&str, u32)])] = &[
    ("john_doe", &[("Organic Apples", 3), ("Whole Milk", 2), ("Greek Yogurt", 1)]),
    ("john_doe", &[("Fresh Bananas", 2), ("Free Range Eggs", 1), ("Whole Wheat Bread", 1)]),
    ("jane_smith", &[("Potato Chips", 2), ("Chocolate Cookies", 1), ("Sparkling Water", 3)]),
    ("jane_smith", &[("Trail Mix", 2), ("Green Tea", 1)]),
    ("bob_wilson", &[("Atlantic Salmon", 2), ("Chicken Breast", 1)]),
    ("bob_wilson", &[("Orange Juice", 2), ("Sparkling Water", 2), ("Frozen Pizza", 1)]),
    ("alice_brown", &[("Croissants", 2), ("Whole Wheat Bread", 1), ("Ice Cream", 1)]),
    ("alice_brown", &[("Frozen Pizza", 2), ("Cheddar Cheese", 1)]),
    ("charlie_davis", &[("Trail Mix", 1), ("Green Tea", 2), ("Sparkling Water", 2)]),
    ("charlie_davis", &[("Chocolate Cookies", 2), ("Fresh Bananas", 1)]),
];

// (username, product, rating, comment)
const REVIEW_ROWS: &[(&str, &str, u8, &str)] = &[
    ("john_doe", "Organic Apples", 5, "Crisp and sweet, the kids love them."),
    ("john_doe", "Whole Milk", 4, "Always fresh at my branch."),
    ("jane_smith", "Potato Chips", 4, "Great crunch, a bit salty."),
    ("bob_wilson", "Atlantic Salmon", 5, "Restaurant quality, would buy again."),
    ("alice_brown", "Croissants", 5, "Best in the neighborhood."),
    ("charlie_davis", "Green Tea", 4, "Nice flavor, steeps quickly."),
];

/// Load the whole demo fixture set. Idempotency is not a goal, this runs
/// against a fresh in-memory state at process start.
pub fn populate_demo_data(state: &AppState) -> anyhow::Result<()> {
    info!("Populating demo data");

    let categories = seed_categories(state)?;
    let brands = seed_brands(state)?;
    let products = seed_products(state, &categories, &brands)?;
    let shoppers = seed_shoppers(state)?;
    seed_admin(state)?;
    seed_preferences(state, &shoppers)?;
    seed_purchases(state, &shoppers, &products)?;
    seed_reviews(state, &shoppers, &products)?;
    seed_promotions(state, &categories)?;
    seed_packages(state, &products)?;

    let outcome = state.recommendations.refresh_all_active();
    info!(
        categories = CATEGORY_ROWS.len(),
        brands = BRAND_ROWS.len(),
        products = PRODUCT_ROWS.len(),
        shoppers = SHOPPER_ROWS.len(),
        refreshed = outcome.refreshed,
        "Demo data loaded"
    );
    Ok(())
}

fn lookup(map: &HashMap<String, Uuid>, name: &str) -> anyhow::Result<Uuid> {
    map.get(name)
        .copied()
        .with_context(|| format!("demo fixture references unknown name: {name}"))
}

fn seed_categories(state: &AppState) -> anyhow::Result<HashMap<String, Uuid>> {
    let mut out = HashMap::new();
    for (name, description) in CATEGORY_ROWS {
        let category = state.catalog.create_category(CreateCategoryRequest {
            name: name.to_string(),
            description: description.to_string(),
        })?;
        out.insert(category.name, category.id);
    }
    Ok(out)
}

fn seed_brands(state: &AppState) -> anyhow::Result<HashMap<String, Uuid>> {
    let mut out = HashMap::new();
    for (name, description) in BRAND_ROWS {
        let brand = state.catalog.create_brand(CreateCategoryRequest {
            name: name.to_string(),
            description: description.to_string(),
        })?;
        out.insert(brand.name, brand.id);
    }
    Ok(out)
}

fn seed_products(
    state: &AppState,
    categories: &HashMap<String, Uuid>,
    brands: &HashMap<String, Uuid>,
) -> anyhow::Result<HashMap<String, Uuid>> {
    let mut out = HashMap::new();
    for (name, category, brand, price, stock, aisle, featured) in PRODUCT_ROWS {
        let product = state.catalog.create_product(CreateProductRequest {
            name: name.to_string(),
            description: format!("High quality {}", name.to_lowercase()),
            category_id: lookup(categories, category)?,
            brand_id: Some(lookup(brands, brand)?),
            price: *price,
            stock_quantity: *stock,
            image_url: None,
            aisle_location: Some(aisle.to_string()),
            featured: *featured,
        })?;
        out.insert(product.name, product.id);
    }
    Ok(out)
}

fn seed_shoppers(state: &AppState) -> anyhow::Result<HashMap<String, Uuid>> {
    let mut out = HashMap::new();
    for (username, first, last, city, branch) in SHOPPER_ROWS {
        let customer = state.customers.register(RegisterRequest {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password: DEMO_PASSWORD.to_string(),
            first_name: first.to_string(),
            last_name: last.to_string(),
            phone: None,
            city: Some(city.to_string()),
            store_branch: Some(branch.to_string()),
        })?;
        out.insert(customer.username, customer.id);
    }
    Ok(out)
}

fn seed_admin(state: &AppState) -> anyhow::Result<()> {
    let admin = state.customers.register(RegisterRequest {
        username: "admin".to_string(),
        email: "admin@freshmart.example".to_string(),
        password: DEMO_PASSWORD.to_string(),
        first_name: "Store".to_string(),
        last_name: "Manager".to_string(),
        phone: None,
        city: None,
        store_branch: None,
    })?;
    state
        .customers
        .set_role(admin.id, CustomerRole::Admin)
        .context("admin account disappeared during seeding")?;
    Ok(())
}

fn seed_preferences(state: &AppState, shoppers: &HashMap<String, Uuid>) -> anyhow::Result<()> {
    for (username, category, brand, score) in PREFERENCE_ROWS {
        state.customers.upsert_preference(
            lookup(shoppers, username)?,
            PreferenceRequest {
                category: category.to_string(),
                brand: Some(brand.to_string()),
                preference_score: *score,
            },
        )?;
    }
    Ok(())
}

fn seed_purchases(
    state: &AppState,
    shoppers: &HashMap<String, Uuid>,
    products: &HashMap<String, Uuid>,
) -> anyhow::Result<()> {
    for (username, basket) in PURCHASE_ROWS {
        let customer_id = lookup(shoppers, username)?;
        for (product, quantity) in *basket {
            state.orders.add_item(
                &state.catalog,
                customer_id,
                AddCartItemRequest {
                    product_id: lookup(products, product)?,
                    quantity: *quantity,
                },
            )?;
        }
        state.orders.checkout(
            &state.catalog,
            &state.customers,
            &state.rewards,
            customer_id,
            CheckoutRequest {
                payment_method: PaymentMethod::Card,
            },
        )?;
    }
    Ok(())
}

fn seed_reviews(
    state: &AppState,
    shoppers: &HashMap<String, Uuid>,
    products: &HashMap<String, Uuid>,
) -> anyhow::Result<()> {
    for (username, product, rating, comment) in REVIEW_ROWS {
        state.catalog.add_review(
            lookup(products, product)?,
            lookup(shoppers, username)?,
            ReviewRequest {
                rating: *rating,
                comment: comment.to_string(),
            },
        )?;
    }
    Ok(())
}

fn seed_promotions(state: &AppState, categories: &HashMap<String, Uuid>) -> anyhow::Result<()> {
    let now = Utc::now();
    state.catalog.create_promotion(CreatePromotionRequest {
        title: "Fresh Produce Sale".to_string(),
        description: "20% off all fresh fruits and vegetables".to_string(),
        discount_percentage: 20.0,
        product_ids: vec![],
        category_ids: vec![lookup(categories, "Fresh Produce")?],
        starts_at: now,
        ends_at: now + Duration::days(7),
    })?;
    state.catalog.create_promotion(CreatePromotionRequest {
        title: "Dairy Week Special".to_string(),
        description: "15% off all dairy products".to_string(),
        discount_percentage: 15.0,
        product_ids: vec![],
        category_ids: vec![lookup(categories, "Dairy & Eggs")?],
        starts_at: now,
        ends_at: now + Duration::days(7),
    })?;
    state.catalog.create_promotion(CreatePromotionRequest {
        title: "Mega Family Value Pack".to_string(),
        description: "The ultimate weekly supply: milk, bread, eggs, and fresh produce"
            .to_string(),
        discount_percentage: 25.0,
        product_ids: vec![],
        category_ids: vec![
            lookup(categories, "Dairy & Eggs")?,
            lookup(categories, "Bakery")?,
            lookup(categories, "Fresh Produce")?,
        ],
        starts_at: now,
        ends_at: now + Duration::days(30),
    })?;
    Ok(())
}

fn seed_packages(state: &AppState, products: &HashMap<String, Uuid>) -> anyhow::Result<()> {
    // (name, type, people, days, price, description, items)
    let packages: &[(&str, PackageType, u32, u32, f64, &str, &[(&str, u32)])] = &[
        (
            "Family Essentials Package",
            PackageType::Family,
            4,
            7,
            299.99,
            "Complete grocery package for a family of 4 for one week.",
            &[
                ("Fresh Bananas", 4),
                ("Organic Apples", 3),
                ("Greek Yogurt", 4),
                ("Whole Wheat Bread", 2),
                ("Atlantic Salmon", 2),
                ("Whole Milk", 3),
                ("Cheddar Cheese", 2),
                ("Chicken Breast", 2),
            ],
        ),
        (
            "Solo Living Essentials",
            PackageType::Solo,
            1,
            7,
            89.99,
            "Balanced nutrition for one person for a full week.",
            &[
                ("Fresh Bananas", 1),
                ("Organic Apples", 1),
                ("Greek Yogurt", 2),
                ("Whole Wheat Bread", 1),
                ("Atlantic Salmon", 1),
                ("Whole Milk", 1),
            ],
        ),
        (
            "Duo Delight Package",
            PackageType::Duo,
            2,
            7,
            149.99,
            "Fresh ingredients and essentials for two people for one week.",
            &[
                ("Fresh Bananas", 2),
                ("Organic Apples", 2),
                ("Greek Yogurt", 3),
                ("Whole Wheat Bread", 1),
                ("Atlantic Salmon", 1),
                ("Whole Milk", 2),
                ("Cheddar Cheese", 1),
                ("Chicken Breast", 1),
            ],
        ),
        (
            "Healthy Living Package",
            PackageType::Healthy,
            2,
            7,
            179.99,
            "Organic and nutritious selections, high protein, low processed foods.",
            &[
                ("Fresh Bananas", 2),
                ("Organic Apples", 2),
                ("Greek Yogurt", 4),
                ("Atlantic Salmon", 2),
                ("Chicken Breast", 2),
            ],
        ),
        (
            "Budget Friendly Package",
            PackageType::Budget,
            2,
            7,
            99.99,
            "Affordable essentials for students and budget-conscious shoppers.",
            &[
                ("Fresh Bananas", 2),
                ("Organic Apples", 2),
                ("Whole Wheat Bread", 2),
                ("Whole Milk", 2),
                ("Cheddar Cheese", 1),
            ],
        ),
        (
            "Premium Gourmet Package",
            PackageType::Premium,
            2,
            7,
            349.99,
            "The finest selection of premium organic products.",
            &[
                ("Atlantic Salmon", 3),
                ("Chicken Breast", 2),
                ("Greek Yogurt", 4),
                ("Cheddar Cheese", 3),
                ("Organic Apples", 3),
                ("Fresh Bananas", 2),
            ],
        ),
    ];

    for (name, package_type, people, days, price, description, items) in packages {
        let items = items
            .iter()
            .map(|(product, quantity)| {
                Ok(PackageItemSpec {
                    product_id: lookup(products, product)?,
                    quantity: *quantity,
                })
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        state.catalog.create_package(CreatePackageRequest {
            name: name.to_string(),
            description: description.to_string(),
            package_type: *package_type,
            people_count: *people,
            duration_days: *days,
            total_price: *price,
            image_url: None,
            items,
        })?;
    }
    Ok(())
}
