//! Acknowledgement reporting for subscribe and publish requests

use std::fmt;

use tracing::{info, warn};

use crate::transport::{Ack, ActionListener};

/// Request kind an [`AckListener`] reports on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckKind {
    Subscribe,
    Publish,
}

impl fmt::Display for AckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AckKind::Subscribe => f.write_str("Subscribe"),
            AckKind::Publish => f.write_str("Publish"),
        }
    }
}

/// Stateless listener that logs the outcome of one kind of request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckListener {
    kind: AckKind,
}

impl AckListener {
    pub fn subscribe() -> Self {
        Self {
            kind: AckKind::Subscribe,
        }
    }

    pub fn publish() -> Self {
        Self {
            kind: AckKind::Publish,
        }
    }

    pub fn kind(&self) -> AckKind {
        self.kind
    }
}

impl ActionListener for AckListener {
    fn on_ack_success(&self, ack: &Ack) {
        info!(
            kind = %self.kind,
            packet_id = ack.packet_id,
            topic = ack.topic.as_deref().unwrap_or(""),
            "{} success",
            self.kind
        );
    }

    fn on_ack_failure(&self, ack: &Ack) {
        warn!(
            kind = %self.kind,
            packet_id = ack.packet_id,
            topic = ack.topic.as_deref().unwrap_or(""),
            "{} failure",
            self.kind
        );
    }
}
