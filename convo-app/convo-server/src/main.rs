use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info};

use convo_api::RouterOptions;
use convo_infrastructure::{build_model_catalogue, build_session_store};
use convo_server::{shutdown_signal, Lifecycle};
use convo_shared::{telemetry::init_telemetry, Settings};

#[derive(Parser, Debug)]
#[command(name = "convo-server", version, about = "LLM conversation session backend")]
struct Cli {
    /// Path to the settings file (toml, yaml or json)
    #[arg(short, long, env = "APP_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Load configuration
    let settings = match Settings::load(cli.config.as_deref()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Initialize telemetry
    if let Err(e) = init_telemetry(&settings.log) {
        eprintln!("Failed to initialize telemetry: {}", e);
        return ExitCode::FAILURE;
    }

    match run(settings).await {
        Ok(()) => {
            info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Unable to shut down gracefully: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(settings: Settings) -> Result<()> {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        env = ?settings.server.env,
        store = ?settings.store.backend,
        "🚀 Starting convo server..."
    );

    let addr = settings.socket_addr()?;
    let options = RouterOptions {
        request_timeout: Duration::from_secs(settings.server.request_timeout_seconds),
        production: settings.server.env.is_production(),
    };

    let catalogue = build_model_catalogue(&settings).context("failed to build model catalogue")?;
    let store = build_session_store(&settings).context("failed to build session store")?;

    Lifecycle::from_settings(&settings.lifecycle)
        .run(addr, options, catalogue, store, shutdown_signal())
        .await?;

    Ok(())
}
