//! Transport collaborator contract
//!
//! The session and client layers only ever talk to a broker through the
//! [`Transport`] trait and only ever hear back through [`SessionEvents`] and
//! [`ActionListener`]. This keeps wire-level detail in [`mqtt`] and lets the
//! tests drive every notification by hand through
//! [`crate::testing::MockTransport`].
//!
//! # Threading
//!
//! Transport operations never block: they queue a request and hand back a
//! [`Token`]. Notifications are delivered on the transport's own task(s), so
//! implementations of the callback traits must return quickly and must not
//! wait on tokens.

use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;

pub mod message;
pub mod mqtt;
pub mod token;

pub use message::{Ack, ConnectOptions, Credentials, Message, QoS};
pub use token::{Token, TokenCompleter};

/// Broker-facing operations a client needs
pub trait Transport: Send + Sync + 'static {
    /// Register the receiver of connection lifecycle and message events
    fn set_callback(&self, callback: Arc<dyn SessionEvents>);

    /// Start a connect attempt; the token resolves on ConnAck or failure
    fn connect(&self, options: &ConnectOptions) -> Result<Token, TransportError>;

    /// Subscribe to a topic; the outcome is reported to `listener`
    fn subscribe(
        &self,
        topic: &str,
        qos: QoS,
        listener: Arc<dyn ActionListener>,
    ) -> Result<Token, TransportError>;

    fn unsubscribe(&self, topic: &str) -> Result<Token, TransportError>;

    /// Queue a message for publishing; acknowledgements go to `listener`
    fn publish(
        &self,
        message: Message,
        listener: Arc<dyn ActionListener>,
    ) -> Result<Token, TransportError>;

    fn disconnect(&self) -> Result<Token, TransportError>;

    /// Stop delivering inbound events to the registered callback
    fn stop_consuming(&self);

    fn is_connected(&self) -> bool;
}

/// Connection lifecycle notifications raised by a transport
pub trait SessionEvents: Send + Sync {
    fn on_connect_success(&self);

    fn on_connect_failure(&self, cause: &str);

    /// The established session dropped; `cause` is `None` when no reason was given
    fn on_connection_lost(&self, cause: Option<&str>);

    fn on_message(&self, topic: &str, payload: Bytes);

    fn on_delivery_complete(&self, packet_id: u16);
}

/// Result reporting for one kind of asynchronous request
pub trait ActionListener: Send + Sync {
    fn on_ack_success(&self, ack: &Ack);

    fn on_ack_failure(&self, ack: &Ack);
}

/// Transport-level errors
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Invalid broker address: {0}")]
    InvalidAddress(String),
    #[error("Connection failed: {0}")]
    ConnectFailed(String),
    #[error("Not connected")]
    NotConnected,
    #[error("Request rejected by client: {0}")]
    RequestFailed(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("Connect attempt superseded by a newer attempt")]
    Superseded,
    #[error("Transport stopped before the request completed")]
    Abandoned,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_display() {
        let errors = vec![
            TransportError::InvalidAddress("nope".to_string()),
            TransportError::ConnectFailed("refused".to_string()),
            TransportError::NotConnected,
            TransportError::RequestFailed("queue full".to_string().into()),
            TransportError::Superseded,
            TransportError::Abandoned,
        ];

        for error in errors {
            assert!(!error.to_string().is_empty());
        }
    }
}
