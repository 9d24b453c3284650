use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use reqwest::Client;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use valet::assistant::AssistantAgent;
use valet::email::InMemoryMailStore;
use valet::providers::ollama::{OllamaConfig, OllamaProvider, OLLAMA_HOST, OLLAMA_MODEL};
use valet::weather::{geolocate, WeatherConfig};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Ollama server to generate with
    #[arg(long, default_value = OLLAMA_HOST)]
    host: String,

    /// Model to use
    #[arg(short, long, default_value = OLLAMA_MODEL)]
    model: String,

    /// Seconds to wait between assistant cycles
    #[arg(short, long, default_value_t = 60)]
    interval: u64,

    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    let provider = Arc::new(OllamaProvider::new(OllamaConfig {
        host: cli.host,
        model: cli.model,
    })?);

    let home = geolocate(&Client::new())
        .await
        .context("Failed to resolve location from IP")?;
    info!(location = %home.describe(), "resolved home location");

    let weather_config = WeatherConfig::from_env()?;
    let mail = Arc::new(InMemoryMailStore::default());

    let mut assistant = AssistantAgent::new(provider, home, weather_config, mail)?;

    println!("{}", style("valet is on duty").green().bold());

    loop {
        if let Err(err) = assistant.cycle_step().await {
            // a failed cycle leaves its task on the list for the next one
            error!(%err, "cycle failed");
        }
        if cli.once {
            break;
        }
        tokio::time::sleep(Duration::from_secs(cli.interval)).await;
    }

    Ok(())
}
