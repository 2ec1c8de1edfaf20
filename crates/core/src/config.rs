use serde::Deserialize;

/// Root application configuration. Loaded from environment variables
/// with the prefix `FRESHMART__` and TOML config files.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_environment")]
    pub environment: String,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub rewards: RewardsConfig,
    #[serde(default)]
    pub recommendations: RecommendationsConfig,
    #[serde(default)]
    pub kiosk: KioskConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

// Default functions
fn default_environment() -> String {
    "development".to_string()
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_http_port() -> u16 {
    8080
}
fn default_metrics_port() -> u16 {
    9091
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            port: default_metrics_port(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            api: ApiConfig::default(),
            metrics: MetricsConfig::default(),
            rewards: RewardsConfig::default(),
            recommendations: RecommendationsConfig::default(),
            kiosk: KioskConfig::default(),
        }
    }
}

// ─── Rewards Config ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct RewardsConfig {
    /// Loyalty points earned per dollar spent, truncated per order.
    #[serde(default = "default_points_per_dollar")]
    pub points_per_dollar: u32,
    /// Fraction of the order total credited as cashback.
    #[serde(default = "default_cashback_rate")]
    pub cashback_rate: f64,
    /// Order total that unlocks cashback and free delivery.
    #[serde(default = "default_minimum_basket")]
    pub minimum_basket: f64,
}

fn default_points_per_dollar() -> u32 { 2 }
fn default_cashback_rate() -> f64 { 0.05 }
fn default_minimum_basket() -> f64 { 60.0 }

impl Default for RewardsConfig {
    fn default() -> Self {
        Self {
            points_per_dollar: default_points_per_dollar(),
            cashback_rate: default_cashback_rate(),
            minimum_basket: default_minimum_basket(),
        }
    }
}

// ─── Recommendations Config ─────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct RecommendationsConfig {
    /// How many recommendations a refresh persists per customer.
    #[serde(default = "default_rec_limit")]
    pub default_limit: usize,
    /// Refresh the purchaser's recommendations as part of checkout.
    #[serde(default = "default_refresh_on_checkout")]
    pub refresh_on_checkout: bool,
}

fn default_rec_limit() -> usize { 10 }
fn default_refresh_on_checkout() -> bool { true }

impl Default for RecommendationsConfig {
    fn default() -> Self {
        Self {
            default_limit: default_rec_limit(),
            refresh_on_checkout: default_refresh_on_checkout(),
        }
    }
}

// ─── Kiosk Config ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct KioskConfig {
    #[serde(default = "default_otp_ttl_minutes")]
    pub otp_ttl_minutes: i64,
    #[serde(default = "default_session_ttl_minutes")]
    pub session_ttl_minutes: i64,
    #[serde(default = "default_otp_sender")]
    pub otp_sender: String,
}

fn default_otp_ttl_minutes() -> i64 { 10 }
fn default_session_ttl_minutes() -> i64 { 30 }
fn default_otp_sender() -> String { "kiosk@freshmart.example".to_string() }

impl Default for KioskConfig {
    fn default() -> Self {
        Self {
            otp_ttl_minutes: default_otp_ttl_minutes(),
            session_ttl_minutes: default_session_ttl_minutes(),
            otp_sender: default_otp_sender(),
        }
    }
}

impl AppConfig {
    /// Load configuration from an optional `freshmart.toml` in the working
    /// directory, overridden by environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name("freshmart").required(false))
            .add_source(
                config::Environment::with_prefix("FRESHMART")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(","),
            );

        let config = builder.build()?;
        config.try_deserialize()
    }
}
