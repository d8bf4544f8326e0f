//! rumqttc-backed [`Transport`](crate::transport::Transport)
//!
//! Pure functions are kept apart from I/O:
//!
//! - [`connection`] - address parsing and `MqttOptions` construction
//! - [`message_handler`] - event classification
//! - [`client`] - the driver task and the transport handle
//!
//! ```rust,no_run
//! use pubsub_link::transport::mqtt::MqttTransport;
//! use pubsub_link::transport::{ConnectOptions, Transport};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = MqttTransport::with_random_id("tcp://127.0.0.1:1883")?;
//! transport.connect(&ConnectOptions::default())?.wait().await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod connection;
pub mod message_handler;

pub use client::MqttTransport;
pub use connection::{configure_mqtt_options, wire_qos, BrokerAddress};
pub use message_handler::{EventRoute, MessageHandler};
