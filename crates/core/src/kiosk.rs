//! In-store kiosk domain types: OTP challenges, sessions, and the
//! interaction log behind the kiosk usage dashboard.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── OTP ────────────────────────────────────────────────────────────────────

/// A one-time code mailed to a shopper who typed their loyalty card at a
/// kiosk. Single-use: verification or expiry both burn it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpVerification {
    pub id: Uuid,
    pub customer_id: Uuid,
    /// Six decimal digits.
    pub code: String,
    /// Address the code was mailed to, captured at issue time.
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub is_used: bool,
    pub is_verified: bool,
}

impl OtpVerification {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        !self.is_used && !self.is_expired(now)
    }
}

// ─── Sessions ───────────────────────────────────────────────────────────────

/// One shopper's stretch of time at a kiosk screen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KioskSession {
    pub id: Uuid,
    /// Opaque bearer handle the kiosk presents on every call.
    pub session_id: String,
    pub customer_id: Uuid,
    pub loyalty_card: Option<String>,
    pub email: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_seconds: Option<i64>,
}

impl KioskSession {
    /// Active means not explicitly ended and still inside the idle window.
    pub fn is_active(&self, now: DateTime<Utc>, ttl_minutes: i64) -> bool {
        self.ended_at.is_none() && now - self.started_at <= Duration::minutes(ttl_minutes)
    }
}

// ─── Interactions ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum KioskInteractionKind {
    ProductView,
    ProductSearch,
    RecommendationView,
    LocationLookup,
    PromotionView,
}

impl KioskInteractionKind {
    pub const ALL: [KioskInteractionKind; 5] = [
        KioskInteractionKind::ProductView,
        KioskInteractionKind::ProductSearch,
        KioskInteractionKind::RecommendationView,
        KioskInteractionKind::LocationLookup,
        KioskInteractionKind::PromotionView,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            KioskInteractionKind::ProductView => "product_view",
            KioskInteractionKind::ProductSearch => "product_search",
            KioskInteractionKind::RecommendationView => "recommendation_view",
            KioskInteractionKind::LocationLookup => "location_lookup",
            KioskInteractionKind::PromotionView => "promotion_view",
        }
    }
}

/// One logged touch within a session. Search interactions carry the query,
/// product-centric ones the product id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KioskInteraction {
    pub id: Uuid,
    pub session_id: Uuid,
    pub kind: KioskInteractionKind,
    pub product_id: Option<Uuid>,
    pub search_query: Option<String>,
    pub created_at: DateTime<Utc>,
}

// ─── API Payloads ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct RequestOtpRequest {
    pub loyalty_card: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerifyOtpRequest {
    pub loyalty_card: String,
    pub otp_code: String,
}

/// Direct kiosk login by loyalty card or email, skipping the OTP challenge.
/// Exactly one of the two fields is expected.
#[derive(Debug, Clone, Deserialize)]
pub struct KioskLoginRequest {
    pub loyalty_card: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InteractionRequest {
    pub kind: KioskInteractionKind,
    pub product_id: Option<Uuid>,
    pub search_query: Option<String>,
}

/// Confirmation returned after an OTP was issued. The email is masked for
/// display on the shared kiosk screen.
#[derive(Debug, Clone, Serialize)]
pub struct OtpChallenge {
    pub message: String,
    pub expires_in_minutes: i64,
    pub customer_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct KioskCustomerView {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub loyalty_card: Option<String>,
    pub loyalty_points: u64,
    pub cashback_balance: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct KioskSessionView {
    pub session_id: String,
    pub expires_in_seconds: i64,
    pub customer: KioskCustomerView,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_session() -> KioskSession {
        KioskSession {
            id: Uuid::new_v4(),
            session_id: "ks_test".to_string(),
            customer_id: Uuid::new_v4(),
            loyalty_card: Some("FM-000001".to_string()),
            email: None,
            started_at: Utc::now(),
            ended_at: None,
            duration_seconds: None,
        }
    }

    #[test]
    fn test_session_active_within_ttl() {
        let session = sample_session();
        let now = session.started_at + Duration::minutes(29);
        assert!(session.is_active(now, 30));
        let later = session.started_at + Duration::minutes(31);
        assert!(!session.is_active(later, 30));
    }

    #[test]
    fn test_ended_session_is_inactive() {
        let mut session = sample_session();
        session.ended_at = Some(session.started_at + Duration::minutes(5));
        assert!(!session.is_active(session.started_at + Duration::minutes(6), 30));
    }

    #[test]
    fn test_otp_validity_window() {
        let now = Utc::now();
        let otp = OtpVerification {
            id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            code: "123456".to_string(),
            email: "alice@example.com".to_string(),
            created_at: now,
            expires_at: now + Duration::minutes(10),
            is_used: false,
            is_verified: false,
        };
        assert!(otp.is_valid(now + Duration::minutes(9)));
        assert!(!otp.is_valid(now + Duration::minutes(11)));

        let used = OtpVerification { is_used: true, ..otp };
        assert!(!used.is_valid(now));
    }
}
