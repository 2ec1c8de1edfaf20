//! Kiosk login flows and session tracking.
//!
//! Shoppers authenticate at in-store kiosks either with a mailed one-time
//! code or directly by loyalty card / email. Sessions are short-lived
//! bearer handles; every screen touch is logged for the usage dashboard.

use std::sync::Arc;

use chrono::{Duration, Utc};
use dashmap::DashMap;
use rand::Rng;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use freshmart_core::config::KioskConfig;
use freshmart_core::customer::Customer;
use freshmart_core::kiosk::*;
use freshmart_core::{FreshmartError, FreshmartResult};
use freshmart_loyalty::CustomerStore;

use crate::mailer::OtpMailer;

const SESSION_ID_PREFIX: &str = "ks_";

/// Kiosk usage rollup for the admin dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct KioskStats {
    pub total_sessions: usize,
    pub completed_sessions: usize,
    pub sessions_last_30_days: usize,
    pub avg_duration_seconds: f64,
    pub interaction_breakdown: Vec<InteractionCount>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InteractionCount {
    pub kind: KioskInteractionKind,
    pub count: usize,
}

pub struct KioskEngine {
    customers: Arc<CustomerStore>,
    mailer: OtpMailer,
    otps: DashMap<Uuid, OtpVerification>,
    /// Keyed by the public session handle.
    sessions: DashMap<String, KioskSession>,
    interactions: DashMap<Uuid, KioskInteraction>,
    config: KioskConfig,
}

impl KioskEngine {
    pub fn new(customers: Arc<CustomerStore>, config: &KioskConfig) -> Self {
        info!(
            otp_ttl_minutes = config.otp_ttl_minutes,
            session_ttl_minutes = config.session_ttl_minutes,
            "Kiosk engine initialized"
        );
        Self {
            customers,
            mailer: OtpMailer::new(config.otp_sender.clone()),
            otps: DashMap::new(),
            sessions: DashMap::new(),
            interactions: DashMap::new(),
            config: config.clone(),
        }
    }

    // ─── OTP Flow ──────────────────────────────────────────────────────────

    /// Issue a fresh login code for the carded customer and mail it out.
    /// Any outstanding unused codes for the same customer are burned first,
    /// so only the latest mail can ever log in.
    pub fn request_otp(&self, req: RequestOtpRequest) -> FreshmartResult<OtpChallenge> {
        let card = req.loyalty_card.trim();
        if card.is_empty() {
            return Err(FreshmartError::Validation(
                "loyalty card number is required".to_string(),
            ));
        }
        let customer = self
            .customers
            .by_loyalty_card(card)
            .ok_or_else(|| FreshmartError::NotFound("loyalty card".to_string()))?;

        for mut otp in self.otps.iter_mut() {
            if otp.customer_id == customer.id && !otp.is_used {
                otp.is_used = true;
            }
        }

        let now = Utc::now();
        let otp = OtpVerification {
            id: Uuid::new_v4(),
            customer_id: customer.id,
            code: generate_code(),
            email: customer.email.clone(),
            created_at: now,
            expires_at: now + Duration::minutes(self.config.otp_ttl_minutes),
            is_used: false,
            is_verified: false,
        };
        self.mailer
            .send_otp(&customer, &otp.code, self.config.otp_ttl_minutes);
        self.otps.insert(otp.id, otp);

        metrics::counter!("kiosk.otp_requested").increment(1);
        info!(customer_id = %customer.id, "Kiosk OTP issued");

        Ok(OtpChallenge {
            message: format!("OTP sent to {}", customer.masked_email()),
            expires_in_minutes: self.config.otp_ttl_minutes,
            customer_name: if customer.first_name.is_empty() {
                customer.username.clone()
            } else {
                customer.first_name.clone()
            },
        })
    }

    /// Check a typed code against the customer's most recent unused OTP and
    /// open a session on success. Expired codes are burned on sight.
    pub fn verify_otp(&self, req: VerifyOtpRequest) -> FreshmartResult<KioskSessionView> {
        let card = req.loyalty_card.trim();
        let code = req.otp_code.trim();
        if card.is_empty() || code.is_empty() {
            return Err(FreshmartError::Validation(
                "loyalty card and OTP code are required".to_string(),
            ));
        }
        let customer = self
            .customers
            .by_loyalty_card(card)
            .ok_or_else(|| FreshmartError::NotFound("loyalty card".to_string()))?;

        let candidate = self
            .otps
            .iter()
            .filter(|r| {
                r.value().customer_id == customer.id
                    && r.value().code == code
                    && !r.value().is_used
            })
            .max_by_key(|r| r.value().created_at)
            .map(|r| r.value().id);
        let otp_id = candidate.ok_or_else(|| {
            warn!(customer_id = %customer.id, "Kiosk OTP rejected");
            FreshmartError::Unauthorized("invalid or expired OTP".to_string())
        })?;

        let now = Utc::now();
        let mut entry = self
            .otps
            .get_mut(&otp_id)
            .ok_or_else(|| FreshmartError::Unauthorized("invalid or expired OTP".to_string()))?;
        if entry.is_expired(now) {
            entry.is_used = true;
            return Err(FreshmartError::Unauthorized(
                "OTP has expired, request a new one".to_string(),
            ));
        }
        entry.is_used = true;
        entry.is_verified = true;
        drop(entry);

        metrics::counter!("kiosk.otp_verified").increment(1);
        Ok(self.open_session(&customer, Some(card.to_string()), None))
    }

    /// Drop burned and expired OTP rows. Sessions stay, the usage dashboard
    /// is built from them. Called from the periodic maintenance task.
    pub fn sweep_expired_otps(&self) -> usize {
        let now = Utc::now();
        let before = self.otps.len();
        self.otps.retain(|_, otp| !otp.is_used && !otp.is_expired(now));
        let removed = before - self.otps.len();
        if removed > 0 {
            debug!(removed, "Swept stale kiosk OTPs");
        }
        removed
    }

    // ─── Sessions ──────────────────────────────────────────────────────────

    /// Direct session open by loyalty card or email, no OTP challenge.
    pub fn login(&self, req: KioskLoginRequest) -> FreshmartResult<KioskSessionView> {
        let customer = match (&req.loyalty_card, &req.email) {
            (Some(card), _) if !card.trim().is_empty() => {
                self.customers.by_loyalty_card(card.trim())
            }
            (_, Some(email)) if !email.trim().is_empty() => self.customers.by_email(email.trim()),
            _ => {
                return Err(FreshmartError::Validation(
                    "provide a loyalty card or an email".to_string(),
                ))
            }
        }
        .ok_or_else(|| FreshmartError::NotFound("customer".to_string()))?;

        Ok(self.open_session(&customer, req.loyalty_card, req.email))
    }

    fn open_session(
        &self,
        customer: &Customer,
        loyalty_card: Option<String>,
        email: Option<String>,
    ) -> KioskSessionView {
        let session = KioskSession {
            id: Uuid::new_v4(),
            session_id: mint_session_id(),
            customer_id: customer.id,
            loyalty_card,
            email,
            started_at: Utc::now(),
            ended_at: None,
            duration_seconds: None,
        };
        let view = KioskSessionView {
            session_id: session.session_id.clone(),
            expires_in_seconds: self.config.session_ttl_minutes * 60,
            customer: KioskCustomerView {
                id: customer.id,
                name: {
                    let full = customer.full_name();
                    if full.is_empty() {
                        customer.username.clone()
                    } else {
                        full
                    }
                },
                email: customer.email.clone(),
                loyalty_card: customer.loyalty_card.clone(),
                loyalty_points: customer.loyalty_points,
                cashback_balance: customer.cashback_balance,
            },
        };
        self.sessions
            .insert(session.session_id.clone(), session.clone());
        metrics::counter!("kiosk.sessions_started").increment(1);
        info!(customer_id = %customer.id, session = %session.session_id, "Kiosk session started");
        view
    }

    /// Look up a session that is still usable: not ended, inside the TTL.
    pub fn validate_session(&self, session_id: &str) -> Option<KioskSession> {
        let session = self.sessions.get(session_id)?.value().clone();
        if session.is_active(Utc::now(), self.config.session_ttl_minutes) {
            Some(session)
        } else {
            None
        }
    }

    /// Resolve a valid session straight to its customer, for handlers that
    /// act on the shopper's behalf.
    pub fn session_customer(&self, session_id: &str) -> FreshmartResult<Customer> {
        let session = self
            .validate_session(session_id)
            .ok_or_else(|| FreshmartError::Unauthorized("invalid kiosk session".to_string()))?;
        self.customers
            .get(session.customer_id)
            .ok_or_else(|| FreshmartError::NotFound("customer".to_string()))
    }

    pub fn record_interaction(
        &self,
        session_id: &str,
        req: InteractionRequest,
    ) -> FreshmartResult<KioskInteraction> {
        let session = self
            .validate_session(session_id)
            .ok_or_else(|| FreshmartError::Unauthorized("invalid kiosk session".to_string()))?;
        let interaction = KioskInteraction {
            id: Uuid::new_v4(),
            session_id: session.id,
            kind: req.kind,
            product_id: req.product_id,
            search_query: req.search_query,
            created_at: Utc::now(),
        };
        self.interactions.insert(interaction.id, interaction.clone());
        metrics::counter!("kiosk.interactions", "kind" => interaction.kind.as_str()).increment(1);
        debug!(session = %session_id, kind = interaction.kind.as_str(), "Kiosk interaction");
        Ok(interaction)
    }

    /// Close a session and report how long the shopper spent at the screen.
    pub fn end_session(&self, session_id: &str) -> FreshmartResult<i64> {
        let mut entry = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| FreshmartError::NotFound("kiosk session".to_string()))?;
        let session = entry.value_mut();
        if session.ended_at.is_some() {
            return Err(FreshmartError::Validation(
                "session already ended".to_string(),
            ));
        }
        let now = Utc::now();
        let duration = (now - session.started_at).num_seconds();
        session.ended_at = Some(now);
        session.duration_seconds = Some(duration);
        metrics::counter!("kiosk.sessions_ended").increment(1);
        Ok(duration)
    }

    /// Sessions started but not yet logged out.
    pub fn open_session_count(&self) -> usize {
        self.sessions
            .iter()
            .filter(|r| r.value().ended_at.is_none())
            .count()
    }

    pub fn list_sessions(&self) -> Vec<KioskSession> {
        let mut sessions: Vec<KioskSession> =
            self.sessions.iter().map(|r| r.value().clone()).collect();
        sessions.sort_by(|a, b| b.started_at.cmp(&a.started_at).then_with(|| a.id.cmp(&b.id)));
        sessions
    }

    // ─── Stats ─────────────────────────────────────────────────────────────

    pub fn stats(&self) -> KioskStats {
        let cutoff = Utc::now() - Duration::days(30);
        let total_sessions = self.sessions.len();
        let mut completed_sessions = 0;
        let mut sessions_last_30_days = 0;
        let mut durations: Vec<i64> = Vec::new();
        for session in self.sessions.iter() {
            let s = session.value();
            if s.ended_at.is_some() {
                completed_sessions += 1;
            }
            if s.started_at >= cutoff {
                sessions_last_30_days += 1;
            }
            if let Some(d) = s.duration_seconds {
                durations.push(d);
            }
        }
        let avg_duration_seconds = if durations.is_empty() {
            0.0
        } else {
            durations.iter().sum::<i64>() as f64 / durations.len() as f64
        };

        let interaction_breakdown = KioskInteractionKind::ALL
            .iter()
            .map(|&kind| InteractionCount {
                kind,
                count: self
                    .interactions
                    .iter()
                    .filter(|r| r.value().kind == kind)
                    .count(),
            })
            .collect();

        KioskStats {
            total_sessions,
            completed_sessions,
            sessions_last_30_days,
            avg_duration_seconds,
            interaction_breakdown,
        }
    }
}

/// Six decimal digits, zero-padded.
fn generate_code() -> String {
    format!("{:06}", rand::thread_rng().gen_range(0..1_000_000))
}

/// Opaque url-safe session handle.
fn mint_session_id() -> String {
    let mut rng = rand::thread_rng();
    let bytes: Vec<u8> = (0..24).map(|_| rng.gen()).collect();
    format!(
        "{}{}",
        SESSION_ID_PREFIX,
        bytes.iter().map(|b| format!("{:02x}", b)).collect::<String>()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use freshmart_core::customer::RegisterRequest;

    fn engine_with_config(config: KioskConfig) -> (KioskEngine, Customer) {
        let customers = Arc::new(CustomerStore::new());
        let customer = customers
            .register(RegisterRequest {
                username: "alice".to_string(),
                email: "alice@example.com".to_string(),
                password: "pw".to_string(),
                first_name: "Alice".to_string(),
                last_name: "Nguyen".to_string(),
                phone: None,
                city: None,
                store_branch: None,
            })
            .unwrap();
        (KioskEngine::new(customers, &config), customer)
    }

    fn engine() -> (KioskEngine, Customer) {
        engine_with_config(KioskConfig::default())
    }

    fn card(customer: &Customer) -> String {
        customer.loyalty_card.clone().unwrap()
    }

    fn issued_code(engine: &KioskEngine, customer: &Customer) -> String {
        engine
            .otps
            .iter()
            .filter(|r| r.value().customer_id == customer.id && !r.value().is_used)
            .max_by_key(|r| r.value().created_at)
            .map(|r| r.value().code.clone())
            .unwrap()
    }

    #[test]
    fn test_request_otp_unknown_card() {
        let (engine, _) = engine();
        let result = engine.request_otp(RequestOtpRequest {
            loyalty_card: "FM-999999".to_string(),
        });
        assert!(matches!(result, Err(FreshmartError::NotFound(_))));
    }

    #[test]
    fn test_request_otp_masks_email() {
        let (engine, customer) = engine();
        let challenge = engine
            .request_otp(RequestOtpRequest { loyalty_card: card(&customer) })
            .unwrap();
        assert_eq!(challenge.message, "OTP sent to ali***@example.com");
        assert_eq!(challenge.expires_in_minutes, 10);
        assert_eq!(challenge.customer_name, "Alice");
        assert_eq!(engine.mailer.sent_to("alice@example.com"), 1);
    }

    #[test]
    fn test_new_otp_invalidates_previous() {
        let (engine, customer) = engine();
        engine
            .request_otp(RequestOtpRequest { loyalty_card: card(&customer) })
            .unwrap();
        let old_code = issued_code(&engine, &customer);
        engine
            .request_otp(RequestOtpRequest { loyalty_card: card(&customer) })
            .unwrap();

        let stale = engine.verify_otp(VerifyOtpRequest {
            loyalty_card: card(&customer),
            otp_code: old_code.clone(),
        });
        // The fresh code may collide with the old one; only distinct codes
        // prove invalidation.
        let fresh_code = issued_code(&engine, &customer);
        if old_code != fresh_code {
            assert!(matches!(stale, Err(FreshmartError::Unauthorized(_))));
        }
        let session = engine
            .verify_otp(VerifyOtpRequest {
                loyalty_card: card(&customer),
                otp_code: fresh_code,
            })
            .unwrap();
        assert!(session.session_id.starts_with("ks_"));
    }

    #[test]
    fn test_sweep_drops_burned_otps_and_keeps_fresh_one() {
        let (engine, customer) = engine();
        engine
            .request_otp(RequestOtpRequest { loyalty_card: card(&customer) })
            .unwrap();
        engine
            .request_otp(RequestOtpRequest { loyalty_card: card(&customer) })
            .unwrap();

        // The first code was burned when the second was issued.
        assert_eq!(engine.sweep_expired_otps(), 1);
        assert_eq!(engine.otps.len(), 1);

        let code = issued_code(&engine, &customer);
        engine
            .verify_otp(VerifyOtpRequest {
                loyalty_card: card(&customer),
                otp_code: code,
            })
            .unwrap();
        assert_eq!(engine.sweep_expired_otps(), 1);
        assert!(engine.otps.is_empty());
    }

    #[test]
    fn test_verify_otp_wrong_code() {
        let (engine, customer) = engine();
        engine
            .request_otp(RequestOtpRequest { loyalty_card: card(&customer) })
            .unwrap();
        let issued = issued_code(&engine, &customer);
        let wrong = if issued == "000000" { "000001" } else { "000000" };
        let result = engine.verify_otp(VerifyOtpRequest {
            loyalty_card: card(&customer),
            otp_code: wrong.to_string(),
        });
        assert!(matches!(result, Err(FreshmartError::Unauthorized(_))));
    }

    #[test]
    fn test_otp_is_single_use() {
        let (engine, customer) = engine();
        engine
            .request_otp(RequestOtpRequest { loyalty_card: card(&customer) })
            .unwrap();
        let code = issued_code(&engine, &customer);
        engine
            .verify_otp(VerifyOtpRequest {
                loyalty_card: card(&customer),
                otp_code: code.clone(),
            })
            .unwrap();
        let again = engine.verify_otp(VerifyOtpRequest {
            loyalty_card: card(&customer),
            otp_code: code,
        });
        assert!(matches!(again, Err(FreshmartError::Unauthorized(_))));
    }

    #[test]
    fn test_expired_otp_rejected_and_burned() {
        let config = KioskConfig { otp_ttl_minutes: 0, ..KioskConfig::default() };
        let (engine, customer) = engine_with_config(config);
        engine
            .request_otp(RequestOtpRequest { loyalty_card: card(&customer) })
            .unwrap();
        let code = issued_code(&engine, &customer);

        std::thread::sleep(std::time::Duration::from_millis(5));
        let expired = engine.verify_otp(VerifyOtpRequest {
            loyalty_card: card(&customer),
            otp_code: code.clone(),
        });
        match expired {
            Err(FreshmartError::Unauthorized(message)) => assert!(message.contains("expired")),
            other => panic!("expected unauthorized, got {other:?}"),
        }
        // Burned: even the "expired" path marks it used.
        let retry = engine.verify_otp(VerifyOtpRequest {
            loyalty_card: card(&customer),
            otp_code: code,
        });
        assert!(matches!(retry, Err(FreshmartError::Unauthorized(_))));
    }

    #[test]
    fn test_login_by_card_and_email() {
        let (engine, customer) = engine();
        let by_card = engine
            .login(KioskLoginRequest {
                loyalty_card: Some(card(&customer)),
                email: None,
            })
            .unwrap();
        assert_eq!(by_card.customer.name, "Alice Nguyen");
        assert_eq!(by_card.expires_in_seconds, 1800);

        let by_email = engine
            .login(KioskLoginRequest {
                loyalty_card: None,
                email: Some("alice@example.com".to_string()),
            })
            .unwrap();
        assert_ne!(by_card.session_id, by_email.session_id);

        let neither = engine.login(KioskLoginRequest { loyalty_card: None, email: None });
        assert!(matches!(neither, Err(FreshmartError::Validation(_))));
    }

    #[test]
    fn test_session_expires_after_ttl() {
        let config = KioskConfig { session_ttl_minutes: 0, ..KioskConfig::default() };
        let (engine, customer) = engine_with_config(config);
        let session = engine
            .login(KioskLoginRequest {
                loyalty_card: Some(card(&customer)),
                email: None,
            })
            .unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(engine.validate_session(&session.session_id).is_none());
        let result = engine.session_customer(&session.session_id);
        assert!(matches!(result, Err(FreshmartError::Unauthorized(_))));
    }

    #[test]
    fn test_record_interaction_requires_valid_session() {
        let (engine, customer) = engine();
        let invalid = engine.record_interaction(
            "ks_bogus",
            InteractionRequest {
                kind: KioskInteractionKind::ProductSearch,
                product_id: None,
                search_query: Some("milk".to_string()),
            },
        );
        assert!(matches!(invalid, Err(FreshmartError::Unauthorized(_))));

        let session = engine
            .login(KioskLoginRequest {
                loyalty_card: Some(card(&customer)),
                email: None,
            })
            .unwrap();
        let interaction = engine
            .record_interaction(
                &session.session_id,
                InteractionRequest {
                    kind: KioskInteractionKind::ProductSearch,
                    product_id: None,
                    search_query: Some("milk".to_string()),
                },
            )
            .unwrap();
        assert_eq!(interaction.search_query.as_deref(), Some("milk"));
    }

    #[test]
    fn test_end_session_reports_duration_once() {
        let (engine, customer) = engine();
        let session = engine
            .login(KioskLoginRequest {
                loyalty_card: Some(card(&customer)),
                email: None,
            })
            .unwrap();
        let duration = engine.end_session(&session.session_id).unwrap();
        assert!(duration >= 0);

        let again = engine.end_session(&session.session_id);
        assert!(matches!(again, Err(FreshmartError::Validation(_))));
        assert!(engine.validate_session(&session.session_id).is_none());
    }

    #[test]
    fn test_stats_counts_sessions_and_interactions() {
        let (engine, customer) = engine();
        let first = engine
            .login(KioskLoginRequest {
                loyalty_card: Some(card(&customer)),
                email: None,
            })
            .unwrap();
        engine
            .login(KioskLoginRequest {
                loyalty_card: Some(card(&customer)),
                email: None,
            })
            .unwrap();
        engine
            .record_interaction(
                &first.session_id,
                InteractionRequest {
                    kind: KioskInteractionKind::ProductView,
                    product_id: Some(Uuid::new_v4()),
                    search_query: None,
                },
            )
            .unwrap();
        engine
            .record_interaction(
                &first.session_id,
                InteractionRequest {
                    kind: KioskInteractionKind::ProductView,
                    product_id: Some(Uuid::new_v4()),
                    search_query: None,
                },
            )
            .unwrap();
        engine.end_session(&first.session_id).unwrap();

        let stats = engine.stats();
        assert_eq!(stats.total_sessions, 2);
        assert_eq!(stats.completed_sessions, 1);
        assert_eq!(stats.sessions_last_30_days, 2);
        let views = stats
            .interaction_breakdown
            .iter()
            .find(|c| c.kind == KioskInteractionKind::ProductView)
            .unwrap();
        assert_eq!(views.count, 2);
        let searches = stats
            .interaction_breakdown
            .iter()
            .find(|c| c.kind == KioskInteractionKind::ProductSearch)
            .unwrap();
        assert_eq!(searches.count, 0);
    }
}
