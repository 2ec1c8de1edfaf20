//! Checkout rewards engine: loyalty points, cashback, and the free-delivery
//! threshold.

use tracing::{debug, info};

use freshmart_core::config::RewardsConfig;
use freshmart_core::customer::Customer;
use freshmart_core::orders::CheckoutRewards;

/// Rewards engine — stateless computation applied to a customer account at
/// checkout time.
pub struct RewardsEngine {
    config: RewardsConfig,
}

impl RewardsEngine {
    pub fn new(config: &RewardsConfig) -> Self {
        info!(
            points_per_dollar = config.points_per_dollar,
            cashback_rate = config.cashback_rate,
            minimum_basket = config.minimum_basket,
            "Rewards engine initialized"
        );
        Self {
            config: config.clone(),
        }
    }

    /// Accrue rewards for one completed checkout and mutate the account
    /// balances in place.
    ///
    /// Points truncate (a $10.99 basket at 2 pts/$ earns 21 points).
    /// Cashback applies only at or above the minimum basket and rounds to
    /// cents. The same threshold flips free delivery and counts toward the
    /// shopper's qualifying-order tally.
    pub fn apply_checkout(&self, customer: &mut Customer, total: f64) -> CheckoutRewards {
        let points_earned = (total * self.config.points_per_dollar as f64) as u64;
        let over_minimum = total >= self.config.minimum_basket;
        let cashback_earned = if over_minimum {
            round_cents(total * self.config.cashback_rate)
        } else {
            0.0
        };

        customer.loyalty_points += points_earned;
        customer.cashback_balance = round_cents(customer.cashback_balance + cashback_earned);
        customer.total_cashback_earned =
            round_cents(customer.total_cashback_earned + cashback_earned);
        if over_minimum {
            customer.orders_over_minimum += 1;
        }
        customer.updated_at = chrono::Utc::now();

        metrics::counter!("rewards.points_earned").increment(points_earned);
        if cashback_earned > 0.0 {
            metrics::counter!("rewards.cashback_cents")
                .increment((cashback_earned * 100.0).round() as u64);
        }

        debug!(
            customer_id = %customer.id,
            total = total,
            points_earned = points_earned,
            cashback_earned = cashback_earned,
            free_delivery = over_minimum,
            "Checkout rewards applied"
        );

        CheckoutRewards {
            points_earned,
            cashback_earned,
            free_delivery: over_minimum,
            total_points: customer.loyalty_points,
            total_cashback: customer.cashback_balance,
        }
    }
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use freshmart_core::customer::CustomerRole;
    use uuid::Uuid;

    fn customer() -> Customer {
        Customer {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password: "pw".to_string(),
            role: CustomerRole::Customer,
            first_name: String::new(),
            last_name: String::new(),
            phone: None,
            city: None,
            store_branch: None,
            loyalty_card: None,
            loyalty_points: 0,
            cashback_balance: 0.0,
            total_cashback_earned: 0.0,
            orders_over_minimum: 0,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn engine() -> RewardsEngine {
        RewardsEngine::new(&RewardsConfig::default())
    }

    #[test]
    fn test_points_truncate() {
        let mut c = customer();
        let rewards = engine().apply_checkout(&mut c, 10.99);
        assert_eq!(rewards.points_earned, 21);
        assert_eq!(c.loyalty_points, 21);
    }

    #[test]
    fn test_no_cashback_below_minimum() {
        let mut c = customer();
        let rewards = engine().apply_checkout(&mut c, 59.99);
        assert_eq!(rewards.cashback_earned, 0.0);
        assert!(!rewards.free_delivery);
        assert_eq!(c.orders_over_minimum, 0);
        assert_eq!(rewards.points_earned, 119);
    }

    #[test]
    fn test_cashback_at_minimum() {
        let mut c = customer();
        let rewards = engine().apply_checkout(&mut c, 60.0);
        assert!((rewards.cashback_earned - 3.0).abs() < 1e-9);
        assert!(rewards.free_delivery);
        assert_eq!(c.orders_over_minimum, 1);
        assert_eq!(rewards.points_earned, 120);
    }

    #[test]
    fn test_cashback_rounds_to_cents() {
        let mut c = customer();
        let rewards = engine().apply_checkout(&mut c, 61.11);
        // 61.11 * 0.05 = 3.0555
        assert!((rewards.cashback_earned - 3.06).abs() < 1e-9);
    }

    #[test]
    fn test_balances_accumulate_across_checkouts() {
        let mut c = customer();
        let e = engine();
        e.apply_checkout(&mut c, 60.0);
        let rewards = e.apply_checkout(&mut c, 80.0);
        assert_eq!(c.orders_over_minimum, 2);
        assert!((rewards.total_cashback - 7.0).abs() < 1e-9);
        assert_eq!(rewards.total_points, 280);
    }
}
