//! pubsub-link
//!
//! A self-healing MQTT publish/subscribe link for telemetry. Each
//! [`PubSubClient`] owns one broker connection in a fixed role:
//!
//! - a **publisher** sends payloads on its topic while connected and drops
//!   them otherwise;
//! - a **subscriber** writes every inbound payload into a [`SyncSlot`], a
//!   single-value mailbox where the latest frame wins.
//!
//! Lost or refused connections are retried without bound, and a
//! subscriber re-subscribes after every successful connect.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use pubsub_link::telemetry::{encode_frame, read_field, FlightSample};
//! use pubsub_link::{PubSubClient, QoS, SyncSlot};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let publisher = PubSubClient::publisher("tcp://127.0.0.1:1883", "XP-S76-Debug", QoS::AtMostOnce).await?;
//! let slot = SyncSlot::shared();
//! let subscriber = PubSubClient::subscriber("tcp://127.0.0.1:1883", "XP-S76-Debug", QoS::AtMostOnce, slot.clone()).await?;
//!
//! let sample = FlightSample { altitude_pilot: 1500.0, airspeed_kts: 100.0, heading_deg: 90.0 };
//! publisher.send(encode_frame(&sample)?);
//!
//! let frame = slot.take();
//! if !frame.is_empty() {
//!     println!("Altitude: {}", read_field(&frame, "altitude_pilot")?);
//! }
//! # drop(subscriber);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod observability;
pub mod session;
pub mod slot;
pub mod telemetry;
pub mod testing;
pub mod transport;

pub use client::{ClientSettings, Endpoint, PubSubClient};
pub use config::{ConfigError, LinkConfig};
pub use error::{LinkError, LinkResult};
pub use session::{LinkHealth, ReconnectPolicy, Role, SessionState};
pub use slot::{SharedSlot, SyncSlot};
pub use transport::mqtt::MqttTransport;
pub use transport::{QoS, Transport, TransportError};
