use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use lookout_config::{LookoutConfig, ProtocolMode};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lookout-relay", version, about = "WebRTC signaling relay")]
struct Args {
    /// Config file path (defaults to the platform config directory).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Signaling WebSocket port.
    #[arg(short, long)]
    port: Option<u16>,

    /// Webhook HTTP port.
    #[arg(long)]
    webhook_port: Option<u16>,

    /// Protocol mode: fan-out or shared-offer.
    #[arg(long)]
    mode: Option<ProtocolMode>,

    /// Disable the HTTP webhook bridge.
    #[arg(long)]
    no_webhook: bool,

    /// Log filter override, e.g. `lookout=debug`.
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let filter = match &args.log_level {
        Some(directive) => EnvFilter::try_new(directive).ok(),
        None => EnvFilter::try_from_default_env().ok(),
    }
    .unwrap_or_else(|| {
        let level = lookout_config::peek_log_level(args.config.as_deref());
        EnvFilter::new(level.directive())
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("lookout-relay v{} starting", env!("CARGO_PKG_VERSION"));

    let mut config = match lookout_config::load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) if args.config.is_some() => {
            tracing::error!("Failed to load config: {e}");
            return ExitCode::FAILURE;
        }
        Err(e) => {
            tracing::warn!("Config load failed, using defaults: {e}");
            LookoutConfig::default()
        }
    };

    if let Some(port) = args.port {
        config.relay.port = port;
    }
    if let Some(port) = args.webhook_port {
        config.webhook.port = port;
    }
    if let Some(mode) = args.mode {
        config.relay.mode = mode;
    }
    if args.no_webhook {
        config.webhook.enabled = false;
    }

    if let Err(e) = lookout_config::validation::validate(&config) {
        tracing::error!("Invalid configuration: {e}");
        return ExitCode::FAILURE;
    }

    let handle = match lookout_relay::start(&config).await {
        Ok(handle) => handle,
        Err(e) => {
            tracing::error!("Failed to start server: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
    }
    tracing::info!("Shutting down");
    handle.shutdown();
    ExitCode::SUCCESS
}
