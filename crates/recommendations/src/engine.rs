//! Rule-based recommendation engine.
//!
//! Five weighted signals each nominate candidates; a pure blend folds them
//! into one ranked list, and the top entries are persisted per customer.
//! No randomness anywhere: identical store contents always produce
//! identical output.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use freshmart_catalog::CatalogStore;
use freshmart_core::catalog::{CandidateOrdering, CandidateQuery, Product};
use freshmart_core::config::RecommendationsConfig;
use freshmart_core::customer::CustomerPreference;
use freshmart_core::recommendations::Recommendation;
use freshmart_core::{FreshmartError, FreshmartResult};
use freshmart_loyalty::CustomerStore;
use freshmart_orders::OrderStore;

use crate::store::RecommendationStore;

// Signal weights, strongest intent first.
const PREFERENCE_WEIGHT: f64 = 3.0;
const HISTORY_WEIGHT: f64 = 2.0;
const POPULARITY_WEIGHT: f64 = 1.5;
const COLLABORATIVE_WEIGHT: f64 = 1.0;
const FEATURED_WEIGHT: f64 = 0.5;

// Candidate caps.
const PREFERENCE_CAP: usize = 5; // per stated preference
const HISTORY_CAP: usize = 3; // per purchased category
const POPULARITY_CAP: usize = 5; // across all preferred categories
const SIMILAR_CUSTOMER_CAP: usize = 5;
const COLLABORATIVE_CAP: usize = 5;
const FEATURED_CAP: usize = 3;

/// Extra history score when the candidate's brand appears in past purchases.
const HISTORY_BRAND_BONUS: f64 = 0.5;

const HISTORY_REASON: &str = "Based on your purchase history";
const POPULARITY_REASON: &str = "Popular in your favorite categories";
const COLLABORATIVE_REASON: &str = "Customers like you also bought this";
const FEATURED_REASON: &str = "Featured product";
const DEFAULT_REASON: &str = "Recommended for you";

fn preference_reason(category: &str) -> String {
    format!("Matches your interest in {category}")
}

// ─── Blend ──────────────────────────────────────────────────────────────────

/// One candidate nominated by a signal, scored in that signal's own terms.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub product_id: Uuid,
    pub local_score: f64,
    pub reason: String,
}

/// A signal's complete output: its weight and its candidate list.
#[derive(Debug, Clone)]
pub struct Signal {
    pub weight: f64,
    pub candidates: Vec<Candidate>,
}

/// A blended, ranked entry ready to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedCandidate {
    pub product_id: Uuid,
    pub score: f64,
    pub reason: String,
}

/// Fold signals into a single ranking.
///
/// Each candidate entry contributes `local_score * weight` to its product's
/// accumulated score; a product nominated twice accumulates twice. The
/// reason comes from whichever entry touched the product first, walking
/// signals in the given order. Ties in the final score keep first-touch
/// order, so earlier signals win them.
pub fn blend(signals: &[Signal], limit: usize) -> Vec<RankedCandidate> {
    struct Acc {
        score: f64,
        reason: String,
        first_touch: usize,
    }

    let mut acc: std::collections::HashMap<Uuid, Acc> = std::collections::HashMap::new();
    let mut next_touch = 0usize;
    for signal in signals {
        for candidate in &signal.candidates {
            let contribution = candidate.local_score * signal.weight;
            match acc.entry(candidate.product_id) {
                std::collections::hash_map::Entry::Occupied(mut occupied) => {
                    occupied.get_mut().score += contribution;
                }
                std::collections::hash_map::Entry::Vacant(vacant) => {
                    vacant.insert(Acc {
                        score: contribution,
                        reason: candidate.reason.clone(),
                        first_touch: next_touch,
                    });
                    next_touch += 1;
                }
            }
        }
    }

    let mut ranked: Vec<(Uuid, Acc)> = acc.into_iter().collect();
    ranked.sort_by(|a, b| {
        b.1.score
            .partial_cmp(&a.1.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.1.first_touch.cmp(&b.1.first_touch))
    });
    ranked.truncate(limit);
    ranked
        .into_iter()
        .map(|(product_id, acc)| RankedCandidate {
            product_id,
            score: acc.score,
            reason: if acc.reason.is_empty() {
                DEFAULT_REASON.to_string()
            } else {
                acc.reason
            },
        })
        .collect()
}

// ─── Engine ─────────────────────────────────────────────────────────────────

/// Outcome of a batch refresh across many customers.
#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome {
    pub refreshed: usize,
    pub failed: usize,
}

pub struct RecommendationEngine {
    catalog: Arc<CatalogStore>,
    orders: Arc<OrderStore>,
    customers: Arc<CustomerStore>,
    store: Arc<RecommendationStore>,
    config: RecommendationsConfig,
}

impl RecommendationEngine {
    pub fn new(
        catalog: Arc<CatalogStore>,
        orders: Arc<OrderStore>,
        customers: Arc<CustomerStore>,
        store: Arc<RecommendationStore>,
        config: &RecommendationsConfig,
    ) -> Self {
        info!(
            default_limit = config.default_limit,
            refresh_on_checkout = config.refresh_on_checkout,
            "Recommendation engine initialized"
        );
        Self {
            catalog,
            orders,
            customers,
            store,
            config: config.clone(),
        }
    }

    /// Recompute and persist recommendations for one customer. Returns the
    /// persisted rows, best score first.
    ///
    /// Products that stopped being sellable between candidate selection and
    /// persistence are skipped silently; rows from earlier runs that fall
    /// outside the new ranking are left untouched.
    pub fn generate_for(
        &self,
        customer_id: Uuid,
        limit: Option<usize>,
    ) -> FreshmartResult<Vec<Recommendation>> {
        if self.customers.get(customer_id).is_none() {
            return Err(FreshmartError::NotFound("customer".to_string()));
        }
        let limit = limit.unwrap_or(self.config.default_limit);
        let owned = self.orders.purchased_product_ids(customer_id);
        let preferences = self.customers.preferences_for(customer_id);

        let signals = [
            Signal {
                weight: PREFERENCE_WEIGHT,
                candidates: self.preference_candidates(&preferences, &owned),
            },
            Signal {
                weight: HISTORY_WEIGHT,
                candidates: self.history_candidates(customer_id, &owned),
            },
            Signal {
                weight: POPULARITY_WEIGHT,
                candidates: self.popularity_candidates(&preferences, &owned),
            },
            Signal {
                weight: COLLABORATIVE_WEIGHT,
                candidates: self.collaborative_candidates(customer_id, &owned),
            },
            Signal {
                weight: FEATURED_WEIGHT,
                candidates: self.featured_candidates(&owned),
            },
        ];

        let ranked = blend(&signals, limit);

        let mut persisted = Vec::with_capacity(ranked.len());
        for entry in ranked {
            // Stock or status may have moved since the candidate was picked.
            let still_sellable = self
                .catalog
                .get_product(entry.product_id)
                .map(|p| p.is_sellable())
                .unwrap_or(false);
            if !still_sellable {
                debug!(
                    customer_id = %customer_id,
                    product_id = %entry.product_id,
                    "Skipping candidate that became unavailable"
                );
                continue;
            }
            persisted.push(self.store.upsert(
                customer_id,
                entry.product_id,
                round_score(entry.score),
                entry.reason,
            ));
        }

        metrics::counter!("recommendations.generated").increment(persisted.len() as u64);
        info!(
            customer_id = %customer_id,
            count = persisted.len(),
            "Recommendations refreshed"
        );
        Ok(persisted)
    }

    /// Refresh a specific set of customers. One bad customer never aborts
    /// the rest.
    pub fn refresh_customers(&self, customer_ids: &[Uuid]) -> BatchOutcome {
        let mut outcome = BatchOutcome {
            refreshed: 0,
            failed: 0,
        };
        for &customer_id in customer_ids {
            match self.generate_for(customer_id, None) {
                Ok(_) => outcome.refreshed += 1,
                Err(err) => {
                    warn!(customer_id = %customer_id, error = %err, "Recommendation refresh failed");
                    outcome.failed += 1;
                }
            }
        }
        outcome
    }

    /// Refresh every active customer, the admin batch entry point.
    pub fn refresh_all_active(&self) -> BatchOutcome {
        let ids: Vec<Uuid> = self.customers.list_active().iter().map(|c| c.id).collect();
        let outcome = self.refresh_customers(&ids);
        info!(
            refreshed = outcome.refreshed,
            failed = outcome.failed,
            "Batch recommendation refresh finished"
        );
        metrics::counter!("recommendations.batch_refreshes").increment(1);
        outcome
    }

    // ─── Signals ───────────────────────────────────────────────────────────

    /// Up to five never-purchased products per stated preference, in the
    /// preference's category (narrowed to its brand when given), each scored
    /// by the preference's own strength.
    fn preference_candidates(
        &self,
        preferences: &[CustomerPreference],
        owned: &HashSet<Uuid>,
    ) -> Vec<Candidate> {
        let mut out = Vec::new();
        for pref in preferences {
            let query = CandidateQuery::in_category(pref.category.clone(), PREFERENCE_CAP)
                .with_brand(pref.brand.clone())
                .excluding(owned.clone());
            for product in self.catalog.eligible_products(&query) {
                out.push(Candidate {
                    product_id: product.id,
                    local_score: pref.preference_score,
                    reason: preference_reason(&pref.category),
                });
            }
        }
        out
    }

    /// Top-rated never-purchased products from each category the customer
    /// has bought in, three per category, with a bonus for familiar brands.
    fn history_candidates(&self, customer_id: Uuid, owned: &HashSet<Uuid>) -> Vec<Candidate> {
        let items = self.orders.completed_items(&self.catalog, customer_id);
        if items.is_empty() {
            return Vec::new();
        }

        let mut categories: Vec<String> = Vec::new();
        let mut known_brands: HashSet<String> = HashSet::new();
        for item in &items {
            if !categories.contains(&item.category) {
                categories.push(item.category.clone());
            }
            if let Some(brand) = &item.brand {
                known_brands.insert(brand.clone());
            }
        }

        let mut out = Vec::new();
        for category in categories {
            let query = CandidateQuery::in_category(category, HISTORY_CAP)
                .excluding(owned.clone())
                .ordered_by(CandidateOrdering::RatingDesc);
            for product in self.catalog.eligible_products(&query) {
                let brand_name = product
                    .brand_id
                    .and_then(|b| self.catalog.get_brand(b))
                    .map(|b| b.name);
                let bonus = match brand_name {
                    Some(name) if known_brands.contains(&name) => HISTORY_BRAND_BONUS,
                    _ => 0.0,
                };
                out.push(Candidate {
                    product_id: product.id,
                    local_score: 1.0 + bonus,
                    reason: HISTORY_REASON.to_string(),
                });
            }
        }
        out
    }

    /// The five most-purchased never-purchased products across every
    /// preferred category, flat score. Products nobody has bought yet are
    /// not popular and stay out.
    fn popularity_candidates(
        &self,
        preferences: &[CustomerPreference],
        owned: &HashSet<Uuid>,
    ) -> Vec<Candidate> {
        let mut categories: Vec<String> = Vec::new();
        for pref in preferences {
            if !categories.contains(&pref.category) {
                categories.push(pref.category.clone());
            }
        }
        if categories.is_empty() {
            return Vec::new();
        }

        // Per-category top lists are a superset of the cross-category top,
        // so take each category's best and re-rank the union.
        let mut pool: Vec<Product> = Vec::new();
        for category in categories {
            let query = CandidateQuery::in_category(category, POPULARITY_CAP)
                .excluding(owned.clone())
                .ordered_by(CandidateOrdering::PopularityDesc);
            pool.extend(self.catalog.eligible_products(&query));
        }
        pool.retain(|p| self.catalog.purchase_count(p.id) > 0);
        pool.sort_by(|a, b| {
            let a_count = self.catalog.purchase_count(a.id);
            let b_count = self.catalog.purchase_count(b.id);
            b_count
                .cmp(&a_count)
                .then_with(|| {
                    self.catalog
                        .average_rating(b.id)
                        .partial_cmp(&self.catalog.average_rating(a.id))
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .then_with(|| a.created_at.cmp(&b.created_at))
                .then_with(|| a.id.cmp(&b.id))
        });
        pool.truncate(POPULARITY_CAP);

        pool.into_iter()
            .map(|product| Candidate {
                product_id: product.id,
                local_score: 1.0,
                reason: POPULARITY_REASON.to_string(),
            })
            .collect()
    }

    /// What the five most-overlapping customers bought that this one
    /// hasn't. Empty without purchase history: overlap means nothing yet.
    fn collaborative_candidates(&self, customer_id: Uuid, owned: &HashSet<Uuid>) -> Vec<Candidate> {
        if owned.is_empty() {
            return Vec::new();
        }
        let similar = self.orders.similar_customers(customer_id, SIMILAR_CUSTOMER_CAP);
        if similar.is_empty() {
            return Vec::new();
        }
        let neighbor_ids: Vec<Uuid> = similar.into_iter().map(|(id, _)| id).collect();
        let product_ids = self
            .orders
            .products_purchased_by(&neighbor_ids, owned, usize::MAX);

        let mut out = Vec::new();
        for product_id in product_ids {
            let sellable = self
                .catalog
                .get_product(product_id)
                .map(|p| p.is_sellable())
                .unwrap_or(false);
            if !sellable {
                continue;
            }
            out.push(Candidate {
                product_id,
                local_score: 1.0,
                reason: COLLABORATIVE_REASON.to_string(),
            });
            if out.len() == COLLABORATIVE_CAP {
                break;
            }
        }
        out
    }

    /// Storewide featured fallback, guaranteeing new accounts see something.
    fn featured_candidates(&self, owned: &HashSet<Uuid>) -> Vec<Candidate> {
        let query = CandidateQuery::featured(FEATURED_CAP).excluding(owned.clone());
        self.catalog
            .eligible_products(&query)
            .into_iter()
            .map(|product| Candidate {
                product_id: product.id,
                local_score: 1.0,
                reason: FEATURED_REASON.to_string(),
            })
            .collect()
    }
}

/// Scores persist at two decimals.
fn round_score(score: f64) -> f64 {
    (score * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use freshmart_core::catalog::{CreateCategoryRequest, CreateProductRequest, ReviewRequest};
    use freshmart_core::config::RewardsConfig;
    use freshmart_core::customer::{PreferenceRequest, RegisterRequest};
    use freshmart_core::orders::{AddCartItemRequest, CheckoutRequest, PaymentMethod};
    use freshmart_loyalty::RewardsEngine;

    struct Fixture {
        catalog: Arc<CatalogStore>,
        orders: Arc<OrderStore>,
        customers: Arc<CustomerStore>,
        store: Arc<RecommendationStore>,
        rewards: RewardsEngine,
        engine: RecommendationEngine,
    }

    impl Fixture {
        fn new() -> Self {
            let catalog = Arc::new(CatalogStore::new());
            let orders = Arc::new(OrderStore::new());
            let customers = Arc::new(CustomerStore::new());
            let store = Arc::new(RecommendationStore::new());
            let engine = RecommendationEngine::new(
                catalog.clone(),
                orders.clone(),
                customers.clone(),
                store.clone(),
                &RecommendationsConfig::default(),
            );
            Self {
                catalog,
                orders,
                customers,
                store,
                rewards: RewardsEngine::new(&RewardsConfig::default()),
                engine,
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

        fn category(&self, name: &str) -> Uuid {
            match self.catalog.category_by_name(name) {
                Some(c) => c.id,
                None => {
                    self.catalog
                        .create_category(CreateCategoryRequest {
                            name: name.to_string(),
                            description: String::new(),
                        })
                        .unwrap()
                        .id
                }
            }
        }

        fn brand(&self, name: &str) -> Uuid {
            match self.catalog.brand_by_name(name) {
                Some(b) => b.id,
                None => {
                    self.catalog
                        .create_brand(CreateCategoryRequest {
                            name: name.to_string(),
                            description: String::new(),
                        })
                        .unwrap()
                        .id
                }
            }
        }

        fn product(&self, name: &str, category: &str, brand: Option<&str>, featured: bool) -> Uuid {
            self.catalog
                .create_product(CreateProductRequest {
                    name: name.to_string(),
                    description: String::new(),
                    category_id: self.category(category),
                    brand_id: brand.map(|b| self.brand(b)),
                    price: 5.0,
                    stock_quantity: 100,
                    image_url: None,
                    aisle_location: None,
                    featured,
                })
                .unwrap()
                .id
        }

        fn prefer(&self, customer: Uuid, category: &str, brand: Option<&str>, score: f64) {
            self.customers
                .upsert_preference(
                    customer,
                    PreferenceRequest {
                        category: category.to_string(),
                        brand: brand.map(|b| b.to_string()),
                        preference_score: score,
                    },
                )
                .unwrap();
        }

        fn buy(&self, customer: Uuid, products: &[Uuid]) {
            for &product in products {
                self.orders
                    .add_item(
                        &self.catalog,
                        customer,
                        AddCartItemRequest {
                            product_id: product,
                            quantity: 1,
                        },
                    )
                    .unwrap();
            }
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
                .unwrap();
        }
    }

    // ── blend ──

    fn candidate(id: Uuid, score: f64, reason: &str) -> Candidate {
        Candidate {
            product_id: id,
            local_score: score,
            reason: reason.to_string(),
        }
    }

    #[test]
    fn test_blend_weights_and_accumulation() {
        let shared = Uuid::new_v4();
        let solo = Uuid::new_v4();
        let signals = [
            Signal {
                weight: 3.0,
                candidates: vec![candidate(shared, 0.8, "interest")],
            },
            Signal {
                weight: 2.0,
                candidates: vec![candidate(shared, 1.0, "history"), candidate(solo, 1.0, "history")],
            },
        ];
        let ranked = blend(&signals, 10);
        assert_eq!(ranked.len(), 2);
        // 0.8*3.0 + 1.0*2.0 = 4.4
        assert_eq!(ranked[0].product_id, shared);
        assert!((ranked[0].score - 4.4).abs() < 1e-9);
        assert_eq!(ranked[0].reason, "interest");
        assert!((ranked[1].score - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_blend_tie_keeps_first_touch_order() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let signals = [Signal {
            weight: 1.0,
            candidates: vec![candidate(a, 1.0, "first"), candidate(b, 1.0, "second")],
        }];
        let ranked = blend(&signals, 10);
        assert_eq!(ranked[0].product_id, a);
        assert_eq!(ranked[1].product_id, b);
    }

    #[test]
    fn test_blend_respects_limit() {
        let signals = [Signal {
            weight: 1.0,
            candidates: (0..25)
                .map(|i| candidate(Uuid::new_v4(), 25.0 - i as f64, "x"))
                .collect(),
        }];
        let ranked = blend(&signals, 10);
        assert_eq!(ranked.len(), 10);
        assert!((ranked[0].score - 25.0).abs() < 1e-9);
        assert!((ranked[9].score - 16.0).abs() < 1e-9);
    }

    #[test]
    fn test_blend_empty_reason_falls_back() {
        let ranked = blend(
            &[Signal {
                weight: 1.0,
                candidates: vec![candidate(Uuid::new_v4(), 1.0, "")],
            }],
            10,
        );
        assert_eq!(ranked[0].reason, "Recommended for you");
    }

    // ── engine ──

    #[test]
    fn test_unknown_customer_is_not_found() {
        let fx = Fixture::new();
        let result = fx.engine.generate_for(Uuid::new_v4(), None);
        assert!(matches!(result, Err(FreshmartError::NotFound(_))));
    }

    #[test]
    fn test_new_customer_gets_featured_only() {
        let fx = Fixture::new();
        let alice = fx.customer("alice");
        fx.product("Milk", "Dairy", None, false);
        let featured = fx.product("Granola", "Breakfast", None, true);

        let recs = fx.engine.generate_for(alice, None).unwrap();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].product_id, featured);
        assert_eq!(recs[0].reason, "Featured product");
        assert!((recs[0].score - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_no_signals_yields_empty() {
        let fx = Fixture::new();
        let alice = fx.customer("alice");
        fx.product("Milk", "Dairy", None, false);
        let recs = fx.engine.generate_for(alice, None).unwrap();
        assert!(recs.is_empty());
    }

    #[test]
    fn test_preference_outscores_featured() {
        let fx = Fixture::new();
        let alice = fx.customer("alice");
        let yogurt = fx.product("Yogurt", "Dairy", None, false);
        let gadget = fx.product("Bottle Opener", "Homeware", None, true);
        fx.prefer(alice, "Dairy", None, 0.8);

        let recs = fx.engine.generate_for(alice, None).unwrap();
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].product_id, yogurt);
        // Preference 0.8*3.0; nothing has been bought, so no popularity.
        assert!((recs[0].score - 2.4).abs() < 1e-9);
        assert_eq!(recs[0].reason, "Matches your interest in Dairy");
        assert_eq!(recs[1].product_id, gadget);
        assert!((recs[1].score - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_category_preference_covers_every_eligible_product() {
        let fx = Fixture::new();
        let alice = fx.customer("alice");
        let milk = fx.product("Milk", "Dairy", None, false);
        let cheese = fx.product("Cheese", "Dairy", None, false);
        let yogurt = fx.product("Yogurt", "Dairy", None, false);
        fx.prefer(alice, "Dairy", None, 0.8);

        let recs = fx.engine.generate_for(alice, None).unwrap();
        assert_eq!(recs.len(), 3);
        let ids: HashSet<Uuid> = recs.iter().map(|r| r.product_id).collect();
        assert_eq!(ids, HashSet::from([milk, cheese, yogurt]));
        for rec in &recs {
            assert!((rec.score - 2.4).abs() < 1e-9);
            assert_eq!(rec.reason, "Matches your interest in Dairy");
        }
    }

    #[test]
    fn test_purchased_products_never_recommended() {
        let fx = Fixture::new();
        let alice = fx.customer("alice");
        let milk = fx.product("Milk", "Dairy", None, false);
        let cheese = fx.product("Cheese", "Dairy", None, false);
        fx.prefer(alice, "Dairy", None, 1.0);
        fx.buy(alice, &[milk]);

        let recs = fx.engine.generate_for(alice, None).unwrap();
        let ids: Vec<Uuid> = recs.iter().map(|r| r.product_id).collect();
        assert!(ids.contains(&cheese));
        assert!(!ids.contains(&milk));
    }

    #[test]
    fn test_preference_reason_wins_over_history() {
        let fx = Fixture::new();
        let alice = fx.customer("alice");
        let cheese = fx.product("Cheese", "Dairy", None, false);
        let milk = fx.product("Milk", "Dairy", None, false);
        fx.buy(alice, &[cheese]);
        fx.prefer(alice, "Dairy", None, 0.5);

        let recs = fx.engine.generate_for(alice, None).unwrap();
        let milk_rec = recs.iter().find(|r| r.product_id == milk).unwrap();
        // Preference touched it first even though history also nominated it:
        // 0.5*3.0 + 1.0*2.0 = 3.5 (milk itself has never been bought).
        assert_eq!(milk_rec.reason, "Matches your interest in Dairy");
        assert!((milk_rec.score - 3.5).abs() < 1e-9);
    }

    #[test]
    fn test_history_brand_bonus() {
        let fx = Fixture::new();
        let alice = fx.customer("alice");
        let known_cheese = fx.product("Cheddar", "Dairy", Some("Tillamook"), false);
        let same_brand = fx.product("Tillamook Milk", "Dairy", Some("Tillamook"), false);
        let other_brand = fx.product("Plain Milk", "Dairy", Some("NoName"), false);
        fx.buy(alice, &[known_cheese]);

        let recs = fx.engine.generate_for(alice, None).unwrap();
        let familiar = recs.iter().find(|r| r.product_id == same_brand).unwrap();
        let unfamiliar = recs.iter().find(|r| r.product_id == other_brand).unwrap();
        // (1.0 + 0.5) * 2.0 vs 1.0 * 2.0
        assert!((familiar.score - 3.0).abs() < 1e-9);
        assert!((unfamiliar.score - 2.0).abs() < 1e-9);
        assert_eq!(familiar.reason, "Based on your purchase history");
    }

    #[test]
    fn test_history_caps_per_category_by_rating() {
        let fx = Fixture::new();
        let alice = fx.customer("alice");
        let reviewer = fx.customer("bob");
        let bought = fx.product("Starter", "Dairy", None, false);
        fx.buy(alice, &[bought]);

        let mut rated = Vec::new();
        for (name, rating) in [("A", 5), ("B", 4), ("C", 3), ("D", 2)] {
            let id = fx.product(name, "Dairy", None, false);
            fx.catalog
                .add_review(id, reviewer, ReviewRequest { rating, comment: String::new() })
                .unwrap();
            rated.push(id);
        }

        let recs = fx.engine.generate_for(alice, None).unwrap();
        let ids: Vec<Uuid> = recs.iter().map(|r| r.product_id).collect();
        // Three per purchased category, best rated first.
        assert_eq!(ids, vec![rated[0], rated[1], rated[2]]);
    }

    #[test]
    fn test_popularity_tops_out_at_five_per_union() {
        let fx = Fixture::new();
        let alice = fx.customer("alice");
        // Six Pantry products, all bought at least once: purchase counts
        // 3, 2, 2, 2, 2, 1 in creation order.
        let mut staples = Vec::new();
        for i in 0..6 {
            staples.push(fx.product(&format!("Staple {i}"), "Pantry", None, false));
        }
        let c1 = fx.customer("crowd1");
        let c2 = fx.customer("crowd2");
        let c3 = fx.customer("crowd3");
        fx.buy(c1, &staples);
        fx.buy(c2, &staples[..5]);
        fx.buy(c3, &staples[..1]);
        // Brand-narrowed preference matches nothing, so only the popularity
        // signal runs for Pantry.
        fx.prefer(alice, "Pantry", Some("Ghost Brand"), 0.4);

        let recs = fx.engine.generate_for(alice, None).unwrap();
        assert_eq!(recs.len(), 5);
        let ids: Vec<Uuid> = recs.iter().map(|r| r.product_id).collect();
        assert_eq!(ids, staples[..5].to_vec());
        for rec in &recs {
            assert!((rec.score - 1.5).abs() < 1e-9);
            assert_eq!(rec.reason, "Popular in your favorite categories");
        }
        // The once-bought sixth staple misses the cut.
        assert!(!ids.contains(&staples[5]));
    }

    #[test]
    fn test_collaborative_requires_history() {
        let fx = Fixture::new();
        let alice = fx.customer("alice");
        let bob = fx.customer("bob");
        let milk = fx.product("Milk", "Dairy", None, false);
        let bread = fx.product("Bread", "Bakery", None, false);
        fx.buy(bob, &[milk, bread]);

        // Alice has no history: nothing collaborative, nothing at all here.
        let recs = fx.engine.generate_for(alice, None).unwrap();
        assert!(recs.is_empty());
    }

    #[test]
    fn test_collaborative_suggests_neighbor_products() {
        let fx = Fixture::new();
        let alice = fx.customer("alice");
        let bob = fx.customer("bob");
        let milk = fx.product("Milk", "Dairy", None, false);
        let eggs = fx.product("Eggs", "Dairy", None, false);
        let bread = fx.product("Bread", "Bakery", None, false);
        fx.buy(alice, &[milk, eggs]);
        fx.buy(bob, &[milk, eggs]);
        fx.buy(bob, &[bread]);

        let recs = fx.engine.generate_for(alice, None).unwrap();
        let bread_rec = recs.iter().find(|r| r.product_id == bread).unwrap();
        assert_eq!(bread_rec.reason, "Customers like you also bought this");
        assert!((bread_rec.score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_limit_caps_persisted_rows() {
        let fx = Fixture::new();
        let alice = fx.customer("alice");
        for i in 0..25 {
            fx.product(&format!("Item {i}"), "Pantry", None, false);
        }
        fx.prefer(alice, "Pantry", None, 1.0);
        // Preference caps at 5 per preference; widen the pool with more
        // preferences to exceed the limit.
        for (i, category) in ["Dairy", "Bakery", "Frozen", "Produce"].iter().enumerate() {
            for j in 0..5 {
                fx.product(&format!("{category} {j}"), category, None, false);
            }
            fx.prefer(alice, category, None, 0.9 - i as f64 * 0.1);
        }

        let recs = fx.engine.generate_for(alice, None).unwrap();
        assert_eq!(recs.len(), 10);
        for pair in recs.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        assert_eq!(fx.store.count_active_for(alice), 10);
    }

    #[test]
    fn test_refresh_overwrites_not_duplicates() {
        let fx = Fixture::new();
        let alice = fx.customer("alice");
        fx.product("Yogurt", "Dairy", None, false);
        fx.prefer(alice, "Dairy", None, 0.8);

        let first = fx.engine.generate_for(alice, None).unwrap();
        let second = fx.engine.generate_for(alice, None).unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
        assert_eq!(first[0].id, second[0].id);
        assert_eq!(fx.store.count_active_for(alice), 1);
    }

    #[test]
    fn test_unrefreshed_rows_keep_last_score() {
        let fx = Fixture::new();
        let alice = fx.customer("alice");
        let yogurt = fx.product("Yogurt", "Dairy", None, false);
        fx.prefer(alice, "Dairy", None, 0.8);
        fx.engine.generate_for(alice, None).unwrap();

        // Yogurt leaves the catalog; the next refresh can't nominate it.
        fx.catalog.update_product(
            yogurt,
            freshmart_core::catalog::UpdateProductRequest {
                is_active: Some(false),
                ..Default::default()
            },
        );
        let fresh = fx.engine.generate_for(alice, None).unwrap();
        assert!(fresh.is_empty());

        // The old row stays active with its old score until a refresh
        // touches that (customer, product) pair again.
        let rows = fx.store.active_for(alice);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].product_id, yogurt);
        assert!((rows[0].score - 2.4).abs() < 1e-9);
    }

    #[test]
    fn test_out_of_stock_product_never_recommended() {
        let fx = Fixture::new();
        let alice = fx.customer("alice");
        let featured = fx.product("Granola", "Breakfast", None, true);
        fx.catalog.update_product(
            featured,
            freshmart_core::catalog::UpdateProductRequest {
                stock_quantity: Some(0),
                ..Default::default()
            },
        );
        let recs = fx.engine.generate_for(alice, None).unwrap();
        assert!(recs.is_empty());
        assert_eq!(fx.store.count_active_for(alice), 0);
    }

    #[test]
    fn test_scores_round_to_two_decimals() {
        let fx = Fixture::new();
        let alice = fx.customer("alice");
        let yogurt = fx.product("Yogurt", "Dairy", None, false);
        fx.prefer(alice, "Dairy", None, 0.333);
        let bob = fx.customer("bob");
        fx.buy(bob, &[yogurt]);

        let recs = fx.engine.generate_for(alice, None).unwrap();
        // Preference 0.333*3.0 plus popularity 1.5 is 2.499, stored as 2.5.
        assert!((recs[0].score - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_batch_isolates_failures() {
        let fx = Fixture::new();
        let alice = fx.customer("alice");
        let bob = fx.customer("bob");
        fx.product("Granola", "Breakfast", None, true);

        let outcome = fx
            .engine
            .refresh_customers(&[alice, Uuid::new_v4(), bob]);
        assert_eq!(outcome.refreshed, 2);
        assert_eq!(outcome.failed, 1);
        assert_eq!(fx.store.count_active_for(alice), 1);
        assert_eq!(fx.store.count_active_for(bob), 1);
    }

    #[test]
    fn test_refresh_all_active_skips_deactivated() {
        let fx = Fixture::new();
        let alice = fx.customer("alice");
        let bob = fx.customer("bob");
        fx.product("Granola", "Breakfast", None, true);
        fx.customers.deactivate(bob);

        let outcome = fx.engine.refresh_all_active();
        assert_eq!(outcome.refreshed, 1);
        assert_eq!(outcome.failed, 0);
        assert_eq!(fx.store.count_active_for(alice), 1);
        assert_eq!(fx.store.count_active_for(bob), 0);
    }

    #[test]
    fn test_generation_is_deterministic() {
        let fx = Fixture::new();
        let alice = fx.customer("alice");
        let bob = fx.customer("bob");
        let milk = fx.product("Milk", "Dairy", None, false);
        let eggs = fx.product("Eggs", "Dairy", None, false);
        fx.product("Bread", "Bakery", None, true);
        fx.prefer(alice, "Dairy", None, 0.7);
        fx.buy(bob, &[milk, eggs]);

        let first = fx.engine.generate_for(alice, None).unwrap();
        let second = fx.engine.generate_for(alice, None).unwrap();
        let firsts: Vec<(Uuid, String)> = first
            .iter()
            .map(|r| (r.product_id, format!("{:.2}|{}", r.score, r.reason)))
            .collect();
        let seconds: Vec<(Uuid, String)> = second
            .iter()
            .map(|r| (r.product_id, format!("{:.2}|{}", r.score, r.reason)))
            .collect();
        assert_eq!(firsts, seconds);
    }
}
