use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use weather_agent::{AppState, VERSION, WeatherAgentConfig, logging, web};

/// Natural-language weather agent HTTP service
#[derive(Debug, Parser)]
#[command(name = "weather-agent", version, about)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long, env = "WEATHER_AGENT_CONFIG")]
    config: Option<PathBuf>,

    /// Bind address, overrides the configuration
    #[arg(long)]
    host: Option<String>,

    /// Bind port, overrides the configuration
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    let mut config =
        WeatherAgentConfig::load_from_path(args.config).context("Failed to load configuration")?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    config.validate()?;

    logging::init(&config.logging)?;
    info!(
        "Starting weather agent v{} ({})",
        VERSION, config.server.environment
    );

    if config.llm_configured() {
        info!("Language model: {}", config.llm.model);
    } else {
        warn!("OPENAI_API_KEY not set, falling back to rule-based query parsing");
    }
    if !config.weather_configured() {
        warn!("OPENWEATHER_API_KEY not set, weather endpoints will answer 503");
    }

    let state = AppState::from_config(config)?;
    web::serve(state).await
}
