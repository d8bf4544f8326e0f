//! Telemetry consumer
//!
//! Subscribes to the configured topic, polls the latest frame once per
//! interval and prints the configured field.

use clap::{Parser, Subcommand};
use pubsub_link::config::LinkConfig;
use pubsub_link::error::{LinkError, LinkResult};
use pubsub_link::observability::init_default_logging;
use pubsub_link::telemetry::read_field;
use pubsub_link::{link_span, PubSubClient, SyncSlot};
use std::path::PathBuf;
use std::process;
use tokio::signal;
use tracing::{error, info, warn, Instrument};

/// Broker-backed telemetry link
#[derive(Parser)]
#[command(name = "pubsub-link")]
#[command(about = "Subscribe to a telemetry topic and print one field of each frame")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Broker address, overriding the configuration
    #[arg(long, env = "PUBSUB_LINK_ADDRESS")]
    address: Option<String>,

    /// Topic, overriding the configuration
    #[arg(long, env = "PUBSUB_LINK_TOPIC")]
    topic: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Consume frames until interrupted (default)
    Run,
    /// Validate configuration
    Config {
        /// Show the effective configuration
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_default_logging();

    let config = match load_configuration(&cli) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    let result = match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_consumer(config).await,
        Commands::Config { show } => handle_config_command(&config, show),
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        process::exit(1);
    }
}

fn load_configuration(cli: &Cli) -> LinkResult<LinkConfig> {
    if let Some(path) = &cli.config {
        info!("Loading configuration from: {}", path.display());
    }
    let mut config = LinkConfig::load(cli.config.as_deref())?;

    if let Some(address) = &cli.address {
        config.broker.address = address.clone();
    }
    if let Some(topic) = &cli.topic {
        config.broker.topic = topic.clone();
    }
    config.validate()?;
    Ok(config)
}

async fn run_consumer(config: LinkConfig) -> LinkResult<()> {
    let endpoint = config.endpoint()?;
    let span = link_span!(topic = %endpoint.topic, role = "subscriber");
    let slot = SyncSlot::shared();

    let settings = config.client_settings()?;
    let client = PubSubClient::subscriber_from_settings(endpoint, settings, slot.clone())
        .instrument(span.clone())
        .await?;

    let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())
        .map_err(|e| LinkError::internal(e.to_string()))?;
    let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
        .map_err(|e| LinkError::internal(e.to_string()))?;
    let mut ticker = tokio::time::interval(config.poll_interval());
    let field = config.consumer.field.as_str();

    info!("Consuming '{}' frames; Ctrl-C to stop", field);
    loop {
        tokio::select! {
            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down");
                break;
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
                break;
            }
            _ = ticker.tick() => {
                let frame = slot.take();
                if frame.is_empty() {
                    continue;
                }
                match read_field(&frame, field) {
                    Ok(value) => println!("{field}: {value}"),
                    Err(e) => warn!("Skipping frame: {}", e),
                }
            }
        }
    }

    if let Some(health) = client.health() {
        info!(
            messages = health.messages_received,
            connects = health.connect_requests,
            "Final link state: {}",
            health.state
        );
    }
    client.shutdown().instrument(span).await;
    Ok(())
}

fn handle_config_command(config: &LinkConfig, show: bool) -> LinkResult<()> {
    if show {
        let rendered = toml::to_string_pretty(config)
            .map_err(|e| LinkError::internal(e.to_string()))?;
        println!("{rendered}");
    }
    info!("Configuration validation complete");
    Ok(())
}
