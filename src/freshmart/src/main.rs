//! FreshMart Express — Grocery e-commerce backend with loyalty rewards,
//! personalized recommendations, and in-store kiosk support.

mod seed;

use clap::Parser;
use freshmart_api::{ApiServer, AppState};
use freshmart_core::AppConfig;
use tracing::{debug, error, info};

#[derive(Parser, Debug)]
#[command(name = "freshmart")]
#[command(about = "Grocery e-commerce backend with loyalty rewards and in-store kiosks")]
#[command(version)]
struct Cli {
    /// HTTP port override
    #[arg(long, env = "FRESHMART__API__HTTP_PORT")]
    http_port: Option<u16>,

    /// Prometheus exporter port override
    #[arg(long, env = "FRESHMART__METRICS__PORT")]
    metrics_port: Option<u16>,

    /// Load the demo catalog, shoppers, and purchase history on startup
    #[arg(long, default_value_t = false)]
    seed_demo_data: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "freshmart=info,tower_http=info".into()),
        )
        .json()
        .init();

    let cli = Cli::parse();

    info!("FreshMart Express starting up");

    let mut config = AppConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Config load failed, falling back to defaults");
        AppConfig::default()
    });

    // CLI flags win over file and environment
    if let Some(port) = cli.http_port {
        config.api.http_port = port;
    }
    if let Some(port) = cli.metrics_port {
        config.metrics.port = port;
    }

    info!(
        environment = %config.environment,
        http_port = config.api.http_port,
        metrics_port = config.metrics.port,
        "Configuration loaded"
    );

    // Wire up all stores and engines
    let state = AppState::new(config);

    if cli.seed_demo_data {
        seed::populate_demo_data(&state)?;
    }

    let api_server = ApiServer::new(state.clone());

    // Exporter failure is non-fatal
    if let Err(e) = api_server.start_metrics().await {
        error!(error = %e, "Metrics exporter failed to start");
    }

    // Sweep abandoned kiosk OTPs and expired bearer tokens in the background
    let state_for_maintenance = state;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(300));
        loop {
            interval.tick().await;
            state_for_maintenance.kiosk.sweep_expired_otps();
            let removed = state_for_maintenance.tokens.sweep_expired();
            if removed > 0 {
                debug!(removed, "Swept expired bearer tokens");
            }
        }
    });

    info!("FreshMart Express is ready to serve traffic");

    // Serves until the process is stopped
    api_server.start_http().await?;

    Ok(())
}
