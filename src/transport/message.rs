//! Plain data passed across the transport boundary

use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use serde::Deserialize;

/// Delivery-guarantee tier, passed through to the broker untouched
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "u8")]
pub enum QoS {
    #[default]
    AtMostOnce,
    AtLeastOnce,
    ExactlyOnce,
}

impl QoS {
    pub fn level(self) -> u8 {
        match self {
            QoS::AtMostOnce => 0,
            QoS::AtLeastOnce => 1,
            QoS::ExactlyOnce => 2,
        }
    }
}

impl TryFrom<u8> for QoS {
    type Error = String;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        match level {
            0 => Ok(QoS::AtMostOnce),
            1 => Ok(QoS::AtLeastOnce),
            2 => Ok(QoS::ExactlyOnce),
            other => Err(format!("QoS level must be 0, 1 or 2, got {other}")),
        }
    }
}

impl fmt::Display for QoS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.level())
    }
}

/// Outbound application message
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub topic: String,
    pub payload: Bytes,
    pub qos: QoS,
    pub retain: bool,
}

impl Message {
    /// Non-retained message, which is all a link ever publishes
    pub fn new(topic: impl Into<String>, payload: Bytes, qos: QoS) -> Self {
        Self {
            topic: topic.into(),
            payload,
            qos,
            retain: false,
        }
    }
}

/// Identity of a completed request handed to an [`super::ActionListener`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ack {
    /// Packet id assigned by the transport; 0 when the request has none
    pub packet_id: u16,
    pub topic: Option<String>,
}

impl Ack {
    pub fn new(packet_id: u16, topic: Option<String>) -> Self {
        Self { packet_id, topic }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Settings applied to every connect attempt, including reconnects
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectOptions {
    pub clean_session: bool,
    pub keep_alive: Duration,
    pub credentials: Option<Credentials>,
    pub max_packet_size: Option<u32>,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            clean_session: false,
            keep_alive: Duration::from_secs(60),
            credentials: None,
            max_packet_size: Some(256 * 1024),
        }
    }
}
