//! REST router — public storefront, authenticated shopper, and admin tiers.
//!
//! Write methods on catalog paths sit in the admin tier while reads stay
//! public, so one path can appear in two groups with different methods.

use axum::middleware;
use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{account_rest, admin_rest, auth, catalog_rest, kiosk_rest, orders_rest, recs_rest, rest};

/// Build the whole API surface against one shared state.
pub fn api_router(state: AppState) -> Router {
    let public = Router::new()
        // Operational
        .route("/health", get(rest::health_check))
        .route("/ready", get(rest::readiness))
        .route("/live", get(rest::liveness))
        // Accounts
        .route("/api/v1/auth/register", post(account_rest::register))
        .route("/api/v1/auth/login", post(account_rest::login))
        .route("/api/v1/loyalty/lookup", post(account_rest::loyalty_lookup))
        // Catalog browsing
        .route("/api/v1/catalog/categories", get(catalog_rest::list_categories))
        .route("/api/v1/catalog/categories/:id", get(catalog_rest::get_category))
        .route("/api/v1/catalog/brands", get(catalog_rest::list_brands))
        .route("/api/v1/catalog/brands/:id", get(catalog_rest::get_brand))
        .route("/api/v1/catalog/products", get(catalog_rest::list_products))
        .route("/api/v1/catalog/products/:id", get(catalog_rest::get_product))
        .route("/api/v1/catalog/products/qr/:payload", get(catalog_rest::product_by_qr))
        .route("/api/v1/catalog/products/:id/reviews", get(catalog_rest::list_reviews))
        .route(
            "/api/v1/catalog/products/:id/frequently-bought-together",
            get(catalog_rest::frequently_bought_together),
        )
        .route("/api/v1/catalog/featured", get(catalog_rest::featured_products))
        .route("/api/v1/catalog/promotions", get(catalog_rest::active_promotions))
        .route("/api/v1/catalog/packages", get(catalog_rest::list_packages))
        .route("/api/v1/catalog/packages/:id", get(catalog_rest::get_package))
        // Kiosk: the session id in the path is the credential
        .route("/api/v1/kiosk/request-otp", post(kiosk_rest::request_otp))
        .route("/api/v1/kiosk/verify-otp", post(kiosk_rest::verify_otp))
        .route("/api/v1/kiosk/login", post(kiosk_rest::login))
        .route(
            "/api/v1/kiosk/:session_id/recommendations",
            get(kiosk_rest::recommendations),
        )
        .route("/api/v1/kiosk/:session_id/search", get(kiosk_rest::search_products))
        .route(
            "/api/v1/kiosk/:session_id/products/:id",
            get(kiosk_rest::product_detail),
        )
        .route(
            "/api/v1/kiosk/:session_id/products/:id/location",
            get(kiosk_rest::product_location),
        )
        .route("/api/v1/kiosk/:session_id/logout", post(kiosk_rest::logout));

    let authed = Router::new()
        .route("/api/v1/auth/logout", post(account_rest::logout))
        .route(
            "/api/v1/profile",
            get(account_rest::get_profile)
                .put(account_rest::update_profile)
                .delete(account_rest::deactivate_account),
        )
        .route(
            "/api/v1/preferences",
            get(account_rest::list_preferences).post(account_rest::upsert_preference),
        )
        .route("/api/v1/preferences/:id", delete(account_rest::delete_preference))
        .route("/api/v1/rewards/balance", get(account_rest::rewards_balance))
        // Reviews and packages
        .route("/api/v1/catalog/products/:id/reviews", post(catalog_rest::create_review))
        .route(
            "/api/v1/catalog/packages/:id/add-to-cart",
            post(catalog_rest::add_package_to_cart),
        )
        .route(
            "/api/v1/catalog/packages/orders/mine",
            get(catalog_rest::my_package_orders),
        )
        // Cart and checkout
        .route(
            "/api/v1/cart",
            get(orders_rest::get_cart).delete(orders_rest::clear_cart),
        )
        .route("/api/v1/cart/items", post(orders_rest::add_cart_item))
        .route(
            "/api/v1/cart/items/:id",
            put(orders_rest::update_cart_item).delete(orders_rest::remove_cart_item),
        )
        .route("/api/v1/checkout", post(orders_rest::checkout))
        .route("/api/v1/purchases", get(orders_rest::list_purchases))
        .route("/api/v1/purchases/:id", get(orders_rest::get_purchase))
        // Recommendations
        .route(
            "/api/v1/recommendations",
            get(recs_rest::list_recommendations),
        )
        .route(
            "/api/v1/recommendations/refresh",
            post(recs_rest::refresh_recommendations),
        )
        .route(
            "/api/v1/recommendations/:id/click",
            post(recs_rest::track_click),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_customer,
        ));

    let admin = Router::new()
        // Catalog management
        .route("/api/v1/catalog/categories", post(catalog_rest::create_category))
        .route(
            "/api/v1/catalog/categories/:id",
            put(catalog_rest::update_category).delete(catalog_rest::delete_category),
        )
        .route("/api/v1/catalog/brands", post(catalog_rest::create_brand))
        .route(
            "/api/v1/catalog/brands/:id",
            put(catalog_rest::update_brand).delete(catalog_rest::delete_brand),
        )
        .route("/api/v1/catalog/products", post(catalog_rest::create_product))
        .route(
            "/api/v1/catalog/products/:id",
            put(catalog_rest::update_product).delete(catalog_rest::delete_product),
        )
        .route("/api/v1/catalog/promotions", post(catalog_rest::create_promotion))
        .route(
            "/api/v1/catalog/promotions/:id",
            put(catalog_rest::update_promotion).delete(catalog_rest::delete_promotion),
        )
        // Oversight
        .route("/api/v1/admin/customers", get(admin_rest::list_customers))
        .route("/api/v1/admin/customers/:id", get(admin_rest::get_customer))
        .route("/api/v1/admin/products", get(admin_rest::list_products))
        .route("/api/v1/admin/products/bulk", post(admin_rest::bulk_update_products))
        .route("/api/v1/admin/promotions", get(admin_rest::list_promotions))
        .route("/api/v1/admin/purchases", get(admin_rest::list_purchases))
        .route("/api/v1/admin/purchases/:id", get(admin_rest::get_purchase))
        .route(
            "/api/v1/admin/purchases/:id/status",
            put(admin_rest::update_purchase_status),
        )
        .route("/api/v1/admin/stats/sales", get(admin_rest::sales_stats))
        .route(
            "/api/v1/admin/stats/recommendations",
            get(admin_rest::recommendation_stats),
        )
        .route("/api/v1/admin/stats/kiosk", get(admin_rest::kiosk_stats))
        .route("/api/v1/admin/kiosk/sessions", get(admin_rest::kiosk_sessions))
        .route(
            "/api/v1/admin/recommendations/refresh-all",
            post(admin_rest::refresh_all_recommendations),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_admin,
        ));

    Router::new()
        .merge(public)
        .merge(authed)
        .merge(admin)
        // Middleware
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
