//! Prometheus exporter installation

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Errors installing the metrics exporter
#[derive(Debug, thiserror::Error)]
pub enum MetricsExporterError {
    #[error("Invalid metrics bind address '{0}'")]
    InvalidAddress(String),

    #[error("Failed to install Prometheus exporter: {0}")]
    Install(String),
}

/// Install the global Prometheus recorder with an HTTP scrape listener.
///
/// Must be called from within a Tokio runtime.
pub fn install_prometheus_exporter(bind_address: &str) -> Result<(), MetricsExporterError> {
    let addr: SocketAddr = bind_address
        .parse()
        .map_err(|_| MetricsExporterError::InvalidAddress(bind_address.to_string()))?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| MetricsExporterError::Install(e.to_string()))?;

    super::init_metrics();
    tracing::info!(%addr, "Prometheus exporter listening");

    Ok(())
}
