//! Shared application state handed to every REST handler.

use std::sync::Arc;
use std::time::Instant;

use freshmart_catalog::CatalogStore;
use freshmart_core::AppConfig;
use freshmart_kiosk::KioskEngine;
use freshmart_loyalty::{CustomerStore, RewardsEngine};
use freshmart_orders::OrderStore;
use freshmart_recommendations::{RecommendationEngine, RecommendationStore};

use crate::auth::AuthTokens;

/// One handle per store and engine, cloned into each handler invocation.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<CatalogStore>,
    pub orders: Arc<OrderStore>,
    pub customers: Arc<CustomerStore>,
    pub rewards: Arc<RewardsEngine>,
    pub recommendations: Arc<RecommendationEngine>,
    pub recommendation_store: Arc<RecommendationStore>,
    pub kiosk: Arc<KioskEngine>,
    pub tokens: Arc<AuthTokens>,
    pub config: Arc<AppConfig>,
    pub start_time: Instant,
}

impl AppState {
    /// Wire up every store and engine from one config.
    pub fn new(config: AppConfig) -> Self {
        let catalog = Arc::new(CatalogStore::new());
        let orders = Arc::new(OrderStore::new());
        let customers = Arc::new(CustomerStore::new());
        let rewards = Arc::new(RewardsEngine::new(&config.rewards));
        let recommendation_store = Arc::new(RecommendationStore::new());
        let recommendations = Arc::new(RecommendationEngine::new(
            catalog.clone(),
            orders.clone(),
            customers.clone(),
            recommendation_store.clone(),
            &config.recommendations,
        ));
        let kiosk = Arc::new(KioskEngine::new(customers.clone(), &config.kiosk));

        Self {
            catalog,
            orders,
            customers,
            rewards,
            recommendations,
            recommendation_store,
            kiosk,
            tokens: Arc::new(AuthTokens::new()),
            config: Arc::new(config),
            start_time: Instant::now(),
        }
    }
}
