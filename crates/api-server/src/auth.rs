//! Bearer token authentication for the REST surface.
//!
//! Development: tokens are minted at login and held in memory with a 24 hour
//! expiry. Production: replace with JWT + OAuth2 (jsonwebtoken crate +
//! Auth0/Ory).

use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use rand::Rng;
use uuid::Uuid;

use freshmart_core::customer::Customer;
use freshmart_core::{FreshmartError, FreshmartResult};

use crate::error::ApiError;
use crate::state::AppState;

const TOKEN_PREFIX: &str = "fm_";
const TOKEN_TTL_HOURS: i64 = 24;

struct TokenEntry {
    customer_id: Uuid,
    expires_at: DateTime<Utc>,
}

/// In-memory token registry. Production: replace with Redis so tokens
/// survive restarts and revocation propagates across nodes.
pub struct AuthTokens {
    tokens: DashMap<String, TokenEntry>,
}

impl AuthTokens {
    pub fn new() -> Self {
        Self {
            tokens: DashMap::new(),
        }
    }

    /// Mint a bearer token for the customer.
    pub fn issue(&self, customer_id: Uuid) -> (String, DateTime<Utc>) {
        let token = generate_token();
        let expires_at = Utc::now() + Duration::hours(TOKEN_TTL_HOURS);
        self.tokens.insert(
            token.clone(),
            TokenEntry {
                customer_id,
                expires_at,
            },
        );
        (token, expires_at)
    }

    pub fn revoke(&self, token: &str) -> bool {
        self.tokens.remove(token).is_some()
    }

    /// Look up the customer behind a token. Expired entries are dropped on
    /// the way out.
    pub fn resolve(&self, token: &str) -> Option<Uuid> {
        let customer_id = {
            let entry = self.tokens.get(token)?;
            if entry.expires_at <= Utc::now() {
                None
            } else {
                Some(entry.customer_id)
            }
        };
        if customer_id.is_none() {
            self.tokens.remove(token);
        }
        customer_id
    }

    /// Drop tokens past their expiry. `resolve` only evicts the token it is
    /// handed, abandoned ones wait for this periodic sweep.
    pub fn sweep_expired(&self) -> usize {
        let now = Utc::now();
        let before = self.tokens.len();
        self.tokens.retain(|_, entry| entry.expires_at > now);
        before - self.tokens.len()
    }
}

impl Default for AuthTokens {
    fn default() -> Self {
        Self::new()
    }
}

/// Generate a random bearer token.
fn generate_token() -> String {
    let mut rng = rand::thread_rng();
    let bytes: Vec<u8> = (0..32).map(|_| rng.gen()).collect();
    format!(
        "{}{}",
        TOKEN_PREFIX,
        bytes
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect::<String>()
    )
}

/// Identity inserted into request extensions by the auth middleware.
#[derive(Debug, Clone, Copy)]
pub struct AuthedCustomer {
    pub id: Uuid,
}

/// Resolve the bearer token on a request to an active customer account.
fn authenticate(state: &AppState, req: &Request) -> FreshmartResult<Customer> {
    let header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    let token = match header {
        Some(value) if value.starts_with("Bearer ") => &value[7..],
        _ => {
            return Err(FreshmartError::Unauthorized(
                "Authorization header with Bearer token required".to_string(),
            ))
        }
    };
    let customer_id = state.tokens.resolve(token).ok_or_else(|| {
        FreshmartError::Unauthorized("Invalid or expired bearer token".to_string())
    })?;
    state
        .customers
        .get(customer_id)
        .filter(|c| c.is_active)
        .ok_or_else(|| FreshmartError::Unauthorized("Account is deactivated".to_string()))
}

/// Middleware guarding customer endpoints. On success the resolved identity
/// is available to handlers as `Extension<AuthedCustomer>`.
pub async fn require_customer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    match authenticate(&state, &req) {
        Ok(customer) => {
            req.extensions_mut().insert(AuthedCustomer { id: customer.id });
            next.run(req).await
        }
        Err(err) => ApiError(err).into_response(),
    }
}

/// Middleware guarding admin endpoints. Authenticated non-staff accounts
/// get 403, everything else falls through like [`require_customer`].
pub async fn require_admin(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    match authenticate(&state, &req) {
        Ok(customer) if customer.role.is_admin() => {
            req.extensions_mut().insert(AuthedCustomer { id: customer.id });
            next.run(req).await
        }
        Ok(_) => ApiError(FreshmartError::Forbidden(
            "Admin access required".to_string(),
        ))
        .into_response(),
        Err(err) => ApiError(err).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_and_resolve() {
        let tokens = AuthTokens::new();
        let customer_id = Uuid::new_v4();
        let (token, expires_at) = tokens.issue(customer_id);
        assert!(token.starts_with("fm_"));
        assert!(expires_at > Utc::now());
        assert_eq!(tokens.resolve(&token), Some(customer_id));
    }

    #[test]
    fn test_revoked_token_stops_resolving() {
        let tokens = AuthTokens::new();
        let (token, _) = tokens.issue(Uuid::new_v4());
        assert!(tokens.revoke(&token));
        assert_eq!(tokens.resolve(&token), None);
        assert!(!tokens.revoke(&token));
    }

    #[test]
    fn test_unknown_token_does_not_resolve() {
        let tokens = AuthTokens::new();
        assert_eq!(tokens.resolve("fm_deadbeef"), None);
    }

    #[test]
    fn test_tokens_are_unique() {
        let tokens = AuthTokens::new();
        let (a, _) = tokens.issue(Uuid::new_v4());
        let (b, _) = tokens.issue(Uuid::new_v4());
        assert_ne!(a, b);
    }

    #[test]
    fn test_sweep_evicts_only_expired_tokens() {
        let tokens = AuthTokens::new();
        let (live, _) = tokens.issue(Uuid::new_v4());
        tokens.tokens.insert(
            "fm_stale".to_string(),
            TokenEntry {
                customer_id: Uuid::new_v4(),
                expires_at: Utc::now() - Duration::hours(1),
            },
        );

        assert_eq!(tokens.sweep_expired(), 1);
        assert_eq!(tokens.sweep_expired(), 0);
        assert!(tokens.resolve(&live).is_some());
    }
}
