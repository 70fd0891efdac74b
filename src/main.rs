use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};

use eq_coach_server::{serve, AppState, Config};

/// Emotion inference server for live meeting coaching
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides server_port)
    #[arg(short, long)]
    port: Option<u16>,

    /// Include per-modality diagnostics in /analyze responses
    #[arg(long)]
    diagnostics: bool,

    /// Write the effective config to the config path and exit
    #[arg(long)]
    write_config: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args.config.clone().unwrap_or_else(Config::default_path);
    let (mut config, load_error) = match &args.config {
        // An explicit path must load
        Some(path) if !args.write_config => (Config::load(path)?, None),
        _ => Config::load_with_fallback(&config_path),
    };

    // Initialize logging
    let log_level = if args.verbose {
        "debug".to_string()
    } else {
        config.log_filter()
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    if let Some(e) = load_error {
        warn!("Failed to load config, using default: {:#}", e);
    }

    if let Some(port) = args.port {
        config.server_port = port;
    }
    if args.diagnostics {
        config.diagnostics = true;
    }

    if args.write_config {
        config.save(&config_path)?;
        info!("Config written to {:?}", config_path);
        return Ok(());
    }

    for warning in config.validate() {
        warn!("Config: {}", warning);
    }

    info!("EQ coach inference server starting...");
    info!(
        "Facial backend: {} (threshold {:.2})",
        config.facial.backend, config.facial.concerning_threshold
    );
    info!(
        "Speech backend: {} (threshold {:.2}, {} Hz)",
        config.speech.backend, config.speech.concerning_threshold, config.speech.sample_rate
    );
    info!(
        "Fusion: weights {:.2}/{:.2}, thresholds {:.2}/{:.2}",
        config.fusion.facial_weight,
        config.fusion.speech_weight,
        config.fusion.green_threshold,
        config.fusion.red_threshold
    );

    let state = AppState::from_config(&config);
    serve(state, config.server_port).await
}
