use std::sync::Arc;

use anyhow::{Context, Result};
use compass_app::{fusion_from_config, Orchestrator, SimulatedPlatform};
use compass_core::{AppError, Config};
use compass_location::LocationRequest;
use compass_weather::WeatherClient;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<()> {
    compass_core::init()?;

    let (config, _warnings) = match Config::load_validated() {
        Ok(loaded) => loaded,
        Err(e) => {
            let err = AppError::from(e);
            tracing::error!(error = %err, "{}", err.user_message());
            return Err(err.into());
        }
    };

    let weather =
        WeatherClient::new(&config.weather).context("Failed to create weather client")?;
    let platform = Arc::new(SimulatedPlatform::new(config.simulation.clone()));

    let (orchestrator, handle) = Orchestrator::new(
        platform,
        Arc::new(weather),
        fusion_from_config(&config.heading),
        LocationRequest::from(&config.location),
    );

    let shutdown = CancellationToken::new();
    let runner = tokio::spawn(orchestrator.run(shutdown.clone()));

    // Render every published state as log lines
    let mut states = handle.subscribe();
    let printer = tokio::spawn(async move {
        while states.changed().await.is_ok() {
            let labels = states.borrow_and_update().labels();
            tracing::info!(target: "compass::display", "{}", labels.join(" | "));
        }
    });

    tracing::info!(config_dir = %config.config_dir.display(), "Compass started");
    handle.foreground();

    let signal = tokio::signal::ctrl_c().await.map_err(AppError::from);

    tracing::info!("Shutting down");
    shutdown.cancel();
    runner.await.context("Orchestrator task panicked")?;
    printer.abort();

    if let Err(err) = signal {
        tracing::error!(error = %err, "{}", err.user_message());
        return Err(err.into());
    }
    Ok(())
}
