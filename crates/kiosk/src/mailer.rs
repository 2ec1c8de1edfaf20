//! OTP email delivery with per-recipient send tracking.
//!
//! Builds and logs the message; production swaps the logging for an SMTP
//! or transactional-mail API handoff behind the same method.

use dashmap::DashMap;
use tracing::{debug, info};
use uuid::Uuid;

use freshmart_core::customer::Customer;

pub struct OtpMailer {
    sender: String,
    /// Messages sent per recipient address.
    sent: DashMap<String, u64>,
}

impl OtpMailer {
    pub fn new(sender: impl Into<String>) -> Self {
        let sender = sender.into();
        info!(from = %sender, "OTP mailer initialized");
        Self {
            sender,
            sent: DashMap::new(),
        }
    }

    /// Mail a login code to the customer. Returns the provider message id.
    pub fn send_otp(&self, customer: &Customer, code: &str, expires_in_minutes: i64) -> String {
        let greeting = if customer.first_name.is_empty() {
            customer.username.clone()
        } else {
            customer.first_name.clone()
        };
        let subject = format!("FreshMart Kiosk Login - Your OTP: {code}");
        let _body = format!(
            "Hello {greeting},\n\n\
             Your OTP code: {code}\n\
             Loyalty card: {}\n\n\
             This code is valid for {expires_in_minutes} minutes.\n\
             Do not share it with anyone.\n\n\
             - FreshMart Team",
            customer.loyalty_card.as_deref().unwrap_or("-"),
        );

        debug!(
            from = %self.sender,
            to = %customer.email,
            subject = %subject,
            "Sending OTP email"
        );
        metrics::counter!("kiosk.otp_emails_sent").increment(1);
        *self.sent.entry(customer.email.clone()).or_insert(0) += 1;

        format!("mail-{}", Uuid::new_v4())
    }

    /// How many messages have gone to one address.
    pub fn sent_to(&self, email: &str) -> u64 {
        self.sent.get(email).map(|r| *r.value()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use freshmart_core::customer::CustomerRole;

    fn sample_customer() -> Customer {
        Customer {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password: String::new(),
            role: CustomerRole::Customer,
            first_name: String::new(),
            last_name: String::new(),
            phone: None,
            city: None,
            store_branch: None,
            loyalty_card: Some("FM-000001".to_string()),
            loyalty_points: 0,
            cashback_balance: 0.0,
            total_cashback_earned: 0.0,
            orders_over_minimum: 0,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_send_counts_per_recipient() {
        let mailer = OtpMailer::new("kiosk@freshmart.example");
        let customer = sample_customer();
        let first = mailer.send_otp(&customer, "123456", 10);
        let second = mailer.send_otp(&customer, "654321", 10);
        assert_ne!(first, second);
        assert_eq!(mailer.sent_to("alice@example.com"), 2);
        assert_eq!(mailer.sent_to("nobody@example.com"), 0);
    }
}
