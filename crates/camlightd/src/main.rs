use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::filter::LevelFilter;

use camlightd::Config;
use camlightd::Engine;
use camlightd::LogLevel;
use camlightd::api;

#[derive(Parser)]
#[command(name = "camlightd", version, about = "Camera-triggered lighting automation daemon")]
struct Cli {
    /// Path to the configuration file
    #[arg(default_value = "camlightd.toml")]
    config: PathBuf,

    /// Override the configured log level
    #[arg(long, value_enum)]
    log_level: Option<LogLevel>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = Config::from_file(&cli.config)?;

    let level = cli.log_level.unwrap_or(config.logging.level);
    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::from(level))
        .init();

    tracing::info!("camlightd starting");
    tracing::info!("Loaded config from: {}", cli.config.display());

    let mut engine = Engine::new(config.automation);
    engine.register_integrations_from_config(&config);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let api_handle = tokio::spawn(api::serve(
        config.api.listen.clone(),
        config.api.port,
        engine.state_handle(),
        engine.settings_store(),
        shutdown_rx,
    ));

    // The engine loop only ends when every sender is gone, so ctrl_c is the
    // expected exit path.
    tokio::select! {
        _ = engine.run() => {}
        result = tokio::signal::ctrl_c() => match result {
            Ok(()) => tracing::info!("Received shutdown signal"),
            Err(e) => tracing::error!("Failed to listen for shutdown signal: {}", e),
        },
    }

    let _ = shutdown_tx.send(());
    if let Err(e) = api_handle.await? {
        tracing::error!("HTTP API server error: {}", e);
    }

    tracing::info!("camlightd shutdown complete");

    Ok(())
}
