//! Room client connectivity check.
//!
//! Verifies that the configured token broker is reachable and accepts our
//! credentials. With `ROOM_PROBE_SESSION` set it also requests an admission
//! token for that room, proving the full create-room and issue-token path.
//!
//! # Flow
//!
//! 1. Initialize tracing (`ROOM_LOG_FORMAT=json` for JSON lines)
//! 2. Load configuration from environment
//! 3. Probe the broker's configuration endpoint
//! 4. Optionally request an admission token

#![warn(clippy::pedantic)]

use anyhow::{bail, Context};
use common::logging::{init_tracing, LogFormat};
use common::types::SessionId;
use room_client::broker::{AdmissionBroker, BrokerClient};
use room_client::config::Config;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let format = std::env::var("ROOM_LOG_FORMAT")
        .map(|name| LogFormat::from_name(&name))
        .unwrap_or_default();
    init_tracing("room_client=debug", format).map_err(anyhow::Error::msg)?;

    info!("Starting room client connectivity check");

    let config = Config::from_env()
        .map_err(|e| {
            error!("Failed to load configuration: {}", e);
            e
        })
        .context("loading configuration")?;

    info!(
        broker_url = %config.broker_url,
        broker_api_path = %config.broker_api_path,
        application = %config.broker_application_name,
        timeout_seconds = config.broker_request_timeout_seconds,
        "Configuration loaded successfully"
    );

    let broker = BrokerClient::new(&config).context("building broker client")?;

    if let Err(e) = broker.test_connection().await {
        error!(error = %e, "Broker probe failed");
        bail!("broker at {} is not usable: {e}", config.broker_url);
    }
    info!("Broker reachable");

    if let Ok(session) = std::env::var("ROOM_PROBE_SESSION") {
        let session_id = SessionId::new(session.trim());
        broker
            .request_admission(&session_id)
            .await
            .with_context(|| format!("requesting admission to {session_id}"))?;
        info!(session_id = %session_id, "Admission token issued");
    }

    info!("Connectivity check passed");
    Ok(())
}
