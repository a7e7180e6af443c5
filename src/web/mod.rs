//! HTTP API for the thermostat.
//!
//! Thin plumbing over [`Thermostat`]: every handler reads a state snapshot or
//! calls one of its operations. Nothing in here touches the hardware or the
//! history file directly.

pub mod chart;
pub mod config;
pub mod error;
pub mod handlers;
pub mod router;

// Re-export commonly used items
pub use config::WebConfig;
pub use error::ApiError;
pub use router::create_app;

use crate::control::{shutdown_signal, Thermostat};
use crate::error::{Result, ThermoError};
use std::sync::Arc;
use tracing::info;

/// Serve the API until a termination signal or `POST /shutdown`.
///
/// The thermostat's shutdown sequence has completed by the time this
/// returns `Ok`.
pub async fn start_web_server(config: WebConfig, thermostat: Arc<Thermostat>) -> Result<()> {
    let app = create_app(&config, Arc::clone(&thermostat));

    let addr = config.socket_addr()?;

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ThermoError::web_server_error(format!("Failed to bind to address: {}", e)))?;

    info!("Thermostat API listening on http://{}", addr);
    info!("Status: http://{}/status", addr);
    info!("History chart: http://{}/history", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(thermostat))
        .await
        .map_err(|e| ThermoError::web_server_error(format!("Server error: {}", e)))?;

    Ok(())
}
