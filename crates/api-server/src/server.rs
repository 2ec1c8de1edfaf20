//! API server — binds the REST listener and the Prometheus exporter.

use std::net::SocketAddr;

use tracing::info;

use crate::router::api_router;
use crate::state::AppState;

/// Main API server for the storefront, kiosk, and admin surfaces.
pub struct ApiServer {
    state: AppState,
}

impl ApiServer {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Start the HTTP REST server. Runs until the process exits.
    pub async fn start_http(&self) -> anyhow::Result<()> {
        let app = api_router(self.state.clone());

        let addr = SocketAddr::new(
            self.state.config.api.host.parse()?,
            self.state.config.api.http_port,
        );

        info!(addr = %addr, "Binding HTTP listener");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }

    /// Start the metrics exporter on its own port.
    pub async fn start_metrics(&self) -> anyhow::Result<()> {
        let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
        builder
            .with_http_listener(SocketAddr::new(
                self.state.config.api.host.parse()?,
                self.state.config.metrics.port,
            ))
            .install()?;

        info!(port = self.state.config.metrics.port, "Metrics exporter started");

        Ok(())
    }
}
