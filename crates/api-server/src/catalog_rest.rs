//! Catalog endpoints: categories, brands, products, reviews, promotions,
//! and pre-designed grocery packages.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use freshmart_core::catalog::{
    Brand, Category, CreateCategoryRequest, CreateProductRequest, CreatePromotionRequest, Package,
    PackageItem, PackageOrder, PackageQuery, Product, ProductQuery, ProductReview, ProductSummary,
    Promotion, ReviewRequest, UpdateProductRequest,
};
use freshmart_core::orders::CartView;
use freshmart_core::FreshmartError;

use crate::auth::AuthedCustomer;
use crate::error::ApiResult;
use crate::state::AppState;

/// How many products the frequently-bought-together shelf shows.
const FREQUENTLY_BOUGHT_LIMIT: usize = 6;

// ─── Categories ─────────────────────────────────────────────────────────────

/// GET /api/v1/catalog/categories
pub async fn list_categories(State(state): State<AppState>) -> Json<Vec<Category>> {
    Json(state.catalog.list_categories())
}

/// GET /api/v1/catalog/categories/:id
pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Category>, StatusCode> {
    state
        .catalog
        .get_category(id)
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

/// POST /api/v1/catalog/categories — admin.
pub async fn create_category(
    State(state): State<AppState>,
    Json(req): Json<CreateCategoryRequest>,
) -> ApiResult<(StatusCode, Json<Category>)> {
    let category = state.catalog.create_category(req)?;
    metrics::counter!("api.categories_created").increment(1);
    Ok((StatusCode::CREATED, Json(category)))
}

/// PUT /api/v1/catalog/categories/:id — admin.
pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<CreateCategoryRequest>,
) -> ApiResult<Json<Category>> {
    let category = state
        .catalog
        .update_category(id, req)
        .ok_or_else(|| FreshmartError::NotFound("category".to_string()))?;
    Ok(Json(category))
}

/// DELETE /api/v1/catalog/categories/:id — admin. Refuses while products
/// still reference the category.
pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.catalog.delete_category(id)?;
    Ok(StatusCode::NO_CONTENT)
}

// ─── Brands ─────────────────────────────────────────────────────────────────

/// GET /api/v1/catalog/brands
pub async fn list_brands(State(state): State<AppState>) -> Json<Vec<Brand>> {
    Json(state.catalog.list_brands())
}

/// GET /api/v1/catalog/brands/:id
pub async fn get_brand(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Brand>, StatusCode> {
    state
        .catalog
        .get_brand(id)
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

/// POST /api/v1/catalog/brands — admin.
pub async fn create_brand(
    State(state): State<AppState>,
    Json(req): Json<CreateCategoryRequest>,
) -> ApiResult<(StatusCode, Json<Brand>)> {
    let brand = state.catalog.create_brand(req)?;
    Ok((StatusCode::CREATED, Json(brand)))
}

/// PUT /api/v1/catalog/brands/:id — admin.
pub async fn update_brand(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<CreateCategoryRequest>,
) -> ApiResult<Json<Brand>> {
    let brand = state
        .catalog
        .update_brand(id, req)
        .ok_or_else(|| FreshmartError::NotFound("brand".to_string()))?;
    Ok(Json(brand))
}

/// DELETE /api/v1/catalog/brands/:id — admin.
pub async fn delete_brand(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.catalog.delete_brand(id)?;
    Ok(StatusCode::NO_CONTENT)
}

// ─── Products ───────────────────────────────────────────────────────────────

/// GET /api/v1/catalog/products — storefront listing with filters.
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Json<Vec<ProductSummary>> {
    Json(state.catalog.list_products(&query))
}

/// GET /api/v1/catalog/products/:id
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProductSummary>, StatusCode> {
    state
        .catalog
        .get_product_summary(id)
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

/// GET /api/v1/catalog/products/qr/:payload — shelf-label QR scan.
pub async fn product_by_qr(
    State(state): State<AppState>,
    Path(payload): Path<String>,
) -> Result<Json<ProductSummary>, StatusCode> {
    state
        .catalog
        .product_by_qr(&payload)
        .map(|p| state.catalog.product_summary(&p))
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

/// GET /api/v1/catalog/featured
pub async fn featured_products(State(state): State<AppState>) -> Json<Vec<ProductSummary>> {
    Json(state.catalog.list_products(&ProductQuery {
        featured: Some(true),
        ..Default::default()
    }))
}

/// GET /api/v1/catalog/products/:id/frequently-bought-together
///
/// Co-purchase neighbors first; when fewer than the shelf size exist the
/// rest is filled from the same category.
pub async fn frequently_bought_together(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<ProductSummary>>> {
    let product = state
        .catalog
        .get_product(id)
        .filter(|p| p.is_active)
        .ok_or_else(|| FreshmartError::NotFound("product".to_string()))?;

    let mut shelf: Vec<ProductSummary> = state
        .orders
        .products_bought_with(id, FREQUENTLY_BOUGHT_LIMIT)
        .into_iter()
        .filter_map(|(product_id, _)| state.catalog.get_product_summary(product_id))
        .filter(|s| s.is_active && s.in_stock)
        .collect();

    if shelf.len() < FREQUENTLY_BOUGHT_LIMIT {
        let category_name = state
            .catalog
            .get_category(product.category_id)
            .map(|c| c.name)
            .unwrap_or_default();
        let fill = state.catalog.list_products(&ProductQuery {
            category: Some(category_name),
            in_stock: Some(true),
            ..Default::default()
        });
        for candidate in fill {
            if shelf.len() >= FREQUENTLY_BOUGHT_LIMIT {
                break;
            }
            if candidate.id != id && !shelf.iter().any(|s| s.id == candidate.id) {
                shelf.push(candidate);
            }
        }
    }

    Ok(Json(shelf))
}

/// POST /api/v1/catalog/products — admin.
pub async fn create_product(
    State(state): State<AppState>,
    Json(req): Json<CreateProductRequest>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    let product = state.catalog.create_product(req)?;
    metrics::counter!("api.products_created").increment(1);
    info!(product_id = %product.id, name = %product.name, "Product created");
    Ok((StatusCode::CREATED, Json(product)))
}

/// PUT /api/v1/catalog/products/:id — admin.
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateProductRequest>,
) -> ApiResult<Json<Product>> {
    let product = state
        .catalog
        .update_product(id, req)
        .ok_or_else(|| FreshmartError::NotFound("product".to_string()))?;
    Ok(Json(product))
}

/// DELETE /api/v1/catalog/products/:id — admin. Retires the product rather
/// than erasing purchase history.
pub async fn delete_product(State(state): State<AppState>, Path(id): Path<Uuid>) -> StatusCode {
    if state.catalog.delete_product(id) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

// ─── Reviews ────────────────────────────────────────────────────────────────

/// GET /api/v1/catalog/products/:id/reviews
pub async fn list_reviews(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<ProductReview>>> {
    if state.catalog.get_product(id).is_none() {
        return Err(FreshmartError::NotFound("product".to_string()).into());
    }
    Ok(Json(state.catalog.reviews_for_product(id)))
}

/// POST /api/v1/catalog/products/:id/reviews — verified purchasers only.
pub async fn create_review(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthedCustomer>,
    Path(id): Path<Uuid>,
    Json(req): Json<ReviewRequest>,
) -> ApiResult<(StatusCode, Json<ProductReview>)> {
    if !state.orders.has_purchased(auth.id, id) {
        return Err(FreshmartError::Validation(
            "you can only review products you have purchased".to_string(),
        )
        .into());
    }
    let review = state.catalog.add_review(id, auth.id, req)?;
    metrics::counter!("api.reviews_created").increment(1);
    Ok((StatusCode::CREATED, Json(review)))
}

// ─── Promotions ─────────────────────────────────────────────────────────────

/// GET /api/v1/catalog/promotions — currently running promotions.
pub async fn active_promotions(State(state): State<AppState>) -> Json<Vec<Promotion>> {
    Json(state.catalog.active_promotions())
}

/// POST /api/v1/catalog/promotions — admin.
pub async fn create_promotion(
    State(state): State<AppState>,
    Json(req): Json<CreatePromotionRequest>,
) -> ApiResult<(StatusCode, Json<Promotion>)> {
    let promotion = state.catalog.create_promotion(req)?;
    Ok((StatusCode::CREATED, Json(promotion)))
}

/// PUT /api/v1/catalog/promotions/:id — admin, toggles the active flag.
pub async fn update_promotion(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdatePromotionRequest>,
) -> ApiResult<Json<Promotion>> {
    let promotion = state
        .catalog
        .set_promotion_active(id, req.is_active)
        .ok_or_else(|| FreshmartError::NotFound("promotion".to_string()))?;
    Ok(Json(promotion))
}

/// DELETE /api/v1/catalog/promotions/:id — admin.
pub async fn delete_promotion(State(state): State<AppState>, Path(id): Path<Uuid>) -> StatusCode {
    if state.catalog.delete_promotion(id) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

// ─── Packages ───────────────────────────────────────────────────────────────

/// GET /api/v1/catalog/packages
pub async fn list_packages(
    State(state): State<AppState>,
    Query(query): Query<PackageQuery>,
) -> Json<Vec<Package>> {
    Json(state.catalog.list_packages(&query))
}

/// GET /api/v1/catalog/packages/:id
pub async fn get_package(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<PackageView>> {
    let package = state
        .catalog
        .get_package(id)
        .ok_or_else(|| FreshmartError::NotFound("package".to_string()))?;
    let items = state
        .catalog
        .package_items(package.id)
        .into_iter()
        .map(|item| package_item_view(&state, item))
        .collect();
    Ok(Json(PackageView { package, items }))
}

/// POST /api/v1/catalog/packages/:id/add-to-cart
pub async fn add_package_to_cart(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthedCustomer>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<CartView>> {
    let cart = state
        .orders
        .add_package_to_cart(&state.catalog, auth.id, id)?;
    metrics::counter!("api.packages_added_to_cart").increment(1);
    Ok(Json(cart))
}

/// GET /api/v1/catalog/packages/orders/mine
pub async fn my_package_orders(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthedCustomer>,
) -> Json<Vec<PackageOrder>> {
    Json(state.catalog.package_orders_for(auth.id))
}

fn package_item_view(state: &AppState, item: PackageItem) -> PackageItemView {
    let product = state.catalog.get_product(item.product_id);
    PackageItemView {
        product_id: item.product_id,
        product_name: product.as_ref().map(|p| p.name.clone()).unwrap_or_default(),
        price: product.map(|p| p.price).unwrap_or(0.0),
        quantity: item.quantity,
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdatePromotionRequest {
    pub is_active: bool,
}

#[derive(Debug, Serialize)]
pub struct PackageItemView {
    pub product_id: Uuid,
    pub product_name: String,
    pub price: f64,
    pub quantity: u32,
}

#[derive(Debug, Serialize)]
pub struct PackageView {
    pub package: Package,
    pub items: Vec<PackageItemView>,
}
