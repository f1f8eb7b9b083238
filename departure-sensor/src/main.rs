use std::process::ExitCode;

use futures::future::join_all;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use departure_sensor::config::{ConfigError, Credentials, HostConfig};
use departure_sensor::monitor::MonitorHandle;
use departure_sensor::source::SourceError;
use departure_sensor::web::{AppState, create_router};

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("cannot create source: {0}")]
    Source(#[from] SourceError),

    #[error("no monitor could be started")]
    NoMonitors,

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "departure-sensor failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), StartupError> {
    let config = HostConfig::load_from_env()?;
    info!(sensors = config.sensors.len(), "loaded configuration");

    let credentials = Credentials::from_env();
    let source = config.build_source(credentials)?;
    info!(backend = source.kind(), "created source");

    // Setup-fatal failures only disable the affected pair
    let options = config.monitor_options();
    let started = join_all(
        config
            .sensors
            .iter()
            .map(|sensor| MonitorHandle::start(source.clone(), sensor.clone(), options)),
    )
    .await;

    let mut monitors = Vec::with_capacity(started.len());
    for (sensor, result) in config.sensors.iter().zip(started) {
        match result {
            Ok(handle) => monitors.push(handle),
            Err(e) => warn!(pair = %sensor.unique_id(), error = %e, "monitor disabled"),
        }
    }
    if monitors.is_empty() {
        return Err(StartupError::NoMonitors);
    }

    let app = create_router(AppState::new(monitors));

    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    info!(addr = %config.bind, "listening");
    info!("  GET  /health       - Health check");
    info!("  GET  /sensors      - All sensors");
    info!("  GET  /sensors/:id  - One sensor");
    info!("  PUT  /sensors/:id/options - Replace a sensor's query options");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for ctrl-c");
    }
}
