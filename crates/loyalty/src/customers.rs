//! In-memory customer account store backed by DashMap.
//!
//! Production: replace with PostgreSQL (sqlx) or similar ACID store.
//! Loyalty balances live on the account record, so kiosk card lookups and
//! reward accruals are single-row operations.

use chrono::{Datelike, Duration, Utc};
use dashmap::DashMap;
use rand::Rng;
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use freshmart_core::customer::*;
use freshmart_core::orders::CheckoutRewards;
use freshmart_core::{FreshmartError, FreshmartResult};

use crate::engine::RewardsEngine;

/// New-signup count for one calendar month, admin dashboard material.
#[derive(Debug, Clone, Serialize)]
pub struct MonthlyCount {
    /// `YYYY-MM`.
    pub month: String,
    pub count: u64,
}

pub struct CustomerStore {
    customers: DashMap<Uuid, Customer>,
    preferences: DashMap<Uuid, CustomerPreference>,
}

impl CustomerStore {
    pub fn new() -> Self {
        info!("Customer store initialized (in-memory, development mode)");
        Self {
            customers: DashMap::new(),
            preferences: DashMap::new(),
        }
    }

    // ─── Accounts ──────────────────────────────────────────────────────────

    pub fn register(&self, req: RegisterRequest) -> FreshmartResult<Customer> {
        if req.username.trim().is_empty() || req.password.is_empty() {
            return Err(FreshmartError::Validation(
                "username and password are required".to_string(),
            ));
        }
        if self.by_username(&req.username).is_some() {
            return Err(FreshmartError::Conflict(format!(
                "username '{}' is taken",
                req.username
            )));
        }
        if self.by_email(&req.email).is_some() {
            return Err(FreshmartError::Conflict(format!(
                "email '{}' is already registered",
                req.email
            )));
        }
        let now = Utc::now();
        let customer = Customer {
            id: Uuid::new_v4(),
            username: req.username,
            email: req.email,
            password: req.password,
            role: CustomerRole::Customer,
            first_name: req.first_name,
            last_name: req.last_name,
            phone: req.phone,
            city: req.city,
            store_branch: req.store_branch,
            loyalty_card: Some(self.fresh_loyalty_card()),
            loyalty_points: 0,
            cashback_balance: 0.0,
            total_cashback_earned: 0.0,
            orders_over_minimum: 0,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.customers.insert(customer.id, customer.clone());
        debug!(customer_id = %customer.id, username = %customer.username, "Customer registered");
        Ok(customer)
    }

    /// Mint an unused loyalty card number, `FM-` plus six digits.
    fn fresh_loyalty_card(&self) -> String {
        let mut rng = rand::thread_rng();
        loop {
            let card = format!("FM-{:06}", rng.gen_range(0..1_000_000u32));
            if self.by_loyalty_card(&card).is_none() {
                return card;
            }
        }
    }

    /// Dev-mode credential check. Accepts username or email.
    pub fn authenticate(&self, username: &str, password: &str) -> Option<Customer> {
        let customer = self
            .by_username(username)
            .or_else(|| self.by_email(username))?;
        if customer.is_active && customer.password == password {
            Some(customer)
        } else {
            None
        }
    }

    pub fn get(&self, id: Uuid) -> Option<Customer> {
        self.customers.get(&id).map(|r| r.value().clone())
    }

    pub fn by_username(&self, username: &str) -> Option<Customer> {
        self.customers
            .iter()
            .find(|r| r.value().username == username)
            .map(|r| r.value().clone())
    }

    pub fn by_email(&self, email: &str) -> Option<Customer> {
        self.customers
            .iter()
            .find(|r| r.value().email.eq_ignore_ascii_case(email))
            .map(|r| r.value().clone())
    }

    pub fn by_loyalty_card(&self, card: &str) -> Option<Customer> {
        self.customers
            .iter()
            .find(|r| r.value().loyalty_card.as_deref() == Some(card))
            .map(|r| r.value().clone())
    }

    pub fn update_profile(&self, id: Uuid, req: UpdateProfileRequest) -> Option<Customer> {
        self.customers.get_mut(&id).map(|mut entry| {
            let c = entry.value_mut();
            if let Some(email) = req.email { c.email = email; }
            if let Some(first_name) = req.first_name { c.first_name = first_name; }
            if let Some(last_name) = req.last_name { c.last_name = last_name; }
            if let Some(phone) = req.phone { c.phone = Some(phone); }
            if let Some(city) = req.city { c.city = Some(city); }
            if let Some(branch) = req.store_branch { c.store_branch = Some(branch); }
            c.updated_at = Utc::now();
            c.clone()
        })
    }

    /// Grant or revoke a role. Operator action, deliberately not exposed
    /// over HTTP; the seed and future CLI tooling go through here.
    pub fn set_role(&self, id: Uuid, role: CustomerRole) -> Option<Customer> {
        self.customers.get_mut(&id).map(|mut entry| {
            let c = entry.value_mut();
            c.role = role;
            c.updated_at = Utc::now();
            c.clone()
        })
    }

    /// Account deletion keeps the row for purchase history integrity and
    /// flips it inactive.
    pub fn deactivate(&self, id: Uuid) -> bool {
        self.customers
            .get_mut(&id)
            .map(|mut entry| {
                entry.value_mut().is_active = false;
                entry.value_mut().updated_at = Utc::now();
            })
            .is_some()
    }

    /// Active customers in signup order. Batch refresh walks this list, so
    /// the order is kept deterministic.
    pub fn list_active(&self) -> Vec<Customer> {
        let mut customers: Vec<Customer> = self
            .customers
            .iter()
            .filter(|r| r.value().is_active)
            .map(|r| r.value().clone())
            .collect();
        customers.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        customers
    }

    pub fn list_all(&self) -> Vec<Customer> {
        let mut customers: Vec<Customer> =
            self.customers.iter().map(|r| r.value().clone()).collect();
        customers.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        customers
    }

    /// Apply checkout rewards to the account under its row lock.
    pub fn apply_checkout_rewards(
        &self,
        engine: &RewardsEngine,
        customer_id: Uuid,
        total: f64,
    ) -> FreshmartResult<CheckoutRewards> {
        let mut entry = self
            .customers
            .get_mut(&customer_id)
            .ok_or_else(|| FreshmartError::NotFound("customer".to_string()))?;
        Ok(engine.apply_checkout(entry.value_mut(), total))
    }

    /// New signups per calendar month for the trailing `months` months,
    /// oldest first.
    pub fn monthly_signups(&self, months: u32) -> Vec<MonthlyCount> {
        let now = Utc::now();
        let mut buckets: Vec<MonthlyCount> = (0..months)
            .rev()
            .map(|back| {
                let mut year = now.year();
                let mut month = now.month() as i32 - back as i32;
                while month <= 0 {
                    month += 12;
                    year -= 1;
                }
                MonthlyCount {
                    month: format!("{year:04}-{month:02}"),
                    count: 0,
                }
            })
            .collect();
        let window_start = now - Duration::days(31 * months as i64);
        for r in self.customers.iter() {
            let created = r.value().created_at;
            if created < window_start {
                continue;
            }
            let key = format!("{:04}-{:02}", created.year(), created.month());
            if let Some(bucket) = buckets.iter_mut().find(|b| b.month == key) {
                bucket.count += 1;
            }
        }
        buckets
    }

    // ─── Preferences ───────────────────────────────────────────────────────

    /// A customer's stated preferences, strongest first. Recommendation
    /// passes iterate in this order, so ties later resolve toward the
    /// stronger preference.
    pub fn preferences_for(&self, customer_id: Uuid) -> Vec<CustomerPreference> {
        let mut prefs: Vec<CustomerPreference> = self
            .preferences
            .iter()
            .filter(|r| r.value().customer_id == customer_id)
            .map(|r| r.value().clone())
            .collect();
        prefs.sort_by(|a, b| {
            b.preference_score
                .partial_cmp(&a.preference_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.created_at.cmp(&b.created_at))
                .then_with(|| a.id.cmp(&b.id))
        });
        prefs
    }

    /// Create or update the row for (customer, category, brand).
    pub fn upsert_preference(
        &self,
        customer_id: Uuid,
        req: PreferenceRequest,
    ) -> FreshmartResult<CustomerPreference> {
        if req.preference_score < 0.0 {
            return Err(FreshmartError::Validation(
                "preference score must be non-negative".to_string(),
            ));
        }
        if req.category.trim().is_empty() {
            return Err(FreshmartError::Validation(
                "preference category is required".to_string(),
            ));
        }
        if self.get(customer_id).is_none() {
            return Err(FreshmartError::NotFound("customer".to_string()));
        }

        let existing = self.preferences.iter().find_map(|r| {
            let p = r.value();
            (p.customer_id == customer_id && p.category == req.category && p.brand == req.brand)
                .then(|| p.id)
        });
        if let Some(id) = existing {
            let mut entry = self
                .preferences
                .get_mut(&id)
                .ok_or_else(|| FreshmartError::NotFound("preference".to_string()))?;
            let p = entry.value_mut();
            p.preference_score = req.preference_score;
            p.updated_at = Utc::now();
            return Ok(p.clone());
        }

        let now = Utc::now();
        let preference = CustomerPreference {
            id: Uuid::new_v4(),
            customer_id,
            category: req.category,
            brand: req.brand,
            preference_score: req.preference_score,
            created_at: now,
            updated_at: now,
        };
        self.preferences.insert(preference.id, preference.clone());
        Ok(preference)
    }

    pub fn delete_preference(&self, customer_id: Uuid, preference_id: Uuid) -> bool {
        let owned = self
            .preferences
            .get(&preference_id)
            .map(|r| r.value().customer_id == customer_id)
            .unwrap_or(false);
        owned && self.preferences.remove(&preference_id).is_some()
    }
}

impl Default for CustomerStore {
    fn default() -> Self {
        Self::new()
    }
}
