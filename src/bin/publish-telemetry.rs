//! Synthetic telemetry publisher
//!
//! Publishes FlexBuffers flight samples on the link topic so a consumer can
//! be exercised without a simulator.
//!
//! ## Usage
//!
//! ```bash
//! # Ten frames, half a second apart, on the default topic
//! publish-telemetry --count 10 --interval-ms 500
//!
//! # Forever, against another broker
//! publish-telemetry --address tcp://10.0.0.5:1883 --topic sim/telemetry
//! ```

use clap::Parser;
use pubsub_link::config::LinkConfig;
use pubsub_link::error::LinkResult;
use pubsub_link::observability::init_default_logging;
use pubsub_link::telemetry::{encode_frame, FlightSample};
use pubsub_link::PubSubClient;
use std::path::PathBuf;
use std::process;
use tokio::time::{interval, Duration};
use tracing::{error, info};

#[derive(Parser)]
#[command(
    name = "publish-telemetry",
    about = "Publish synthetic flight samples for testing a telemetry consumer"
)]
struct Args {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Broker address, overriding the configuration
    #[arg(long)]
    address: Option<String>,

    /// Topic, overriding the configuration
    #[arg(long)]
    topic: Option<String>,

    /// Delay between frames
    #[arg(long, default_value = "1000", value_parser = clap::value_parser!(u64).range(1..))]
    interval_ms: u64,

    /// Frames to send; 0 sends until interrupted
    #[arg(long, default_value = "0")]
    count: u64,
}

/// Climb then descend in a sawtooth between 1000 and 2000
fn sample_at(tick: u64) -> FlightSample {
    let phase = (tick % 200) as f64;
    let climb = if phase < 100.0 { phase } else { 200.0 - phase };
    FlightSample {
        altitude_pilot: 1000.0 + climb * 10.0,
        airspeed_kts: 90.0 + climb * 0.2,
        heading_deg: (tick * 3 % 360) as f64,
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_default_logging();

    if let Err(e) = run(args).await {
        error!("publish-telemetry failed: {}", e);
        process::exit(1);
    }
}

async fn run(args: Args) -> LinkResult<()> {
    let mut config = LinkConfig::load(args.config.as_deref())?;
    if let Some(address) = args.address {
        config.broker.address = address;
    }
    if let Some(topic) = args.topic {
        config.broker.topic = topic;
    }
    config.validate()?;

    let publisher =
        PubSubClient::publisher_from_settings(config.endpoint()?, config.client_settings()?)
            .await?;

    let mut ticker = interval(Duration::from_millis(args.interval_ms));
    let mut tick = 0u64;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted after {} frames", tick);
                break;
            }
            _ = ticker.tick() => {
                let frame = encode_frame(&sample_at(tick))?;
                publisher.send(&frame);
                tick += 1;
                if args.count != 0 && tick >= args.count {
                    info!("Sent {} frames", tick);
                    break;
                }
            }
        }
    }

    publisher.shutdown().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_stays_in_envelope() {
        for tick in 0..400 {
            let sample = sample_at(tick);
            assert!((1000.0..=2000.0).contains(&sample.altitude_pilot));
            assert!(sample.heading_deg < 360.0);
        }
        assert_eq!(sample_at(100).altitude_pilot, 2000.0);
    }

    #[test]
    fn test_zero_interval_rejected() {
        assert!(Args::try_parse_from(["publish-telemetry", "--interval-ms", "0"]).is_err());
        let args = Args::try_parse_from(["publish-telemetry", "--interval-ms", "250"]).unwrap();
        assert_eq!(args.interval_ms, 250);
    }
}
