//! Publish/subscribe client façade
//!
//! A [`PubSubClient`] exclusively owns one live broker connection together
//! with its callback, its role resources and its connect options. It is
//! move-only: plain assignment drops (and therefore tears down) whatever the
//! destination held before taking over the source, and
//! [`std::mem::take`] leaves an empty client behind.
//!
//! ```rust,no_run
//! use pubsub_link::{PubSubClient, QoS, SyncSlot};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let slot = SyncSlot::shared();
//! let subscriber = PubSubClient::subscriber("tcp://127.0.0.1:1883", "XP-S76-Debug", QoS::AtMostOnce, slot.clone())
//!     .await
//!     .expect("valid address");
//!
//! let latest = slot.take();
//! if !latest.is_empty() {
//!     println!("{} bytes", latest.len());
//! }
//! subscriber.shutdown().await;
//! # }
//! ```

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, error, info, warn};

use crate::session::{LinkHealth, ReconnectPolicy, Role, SessionCallback};
use crate::slot::SharedSlot;
use crate::transport::mqtt::MqttTransport;
use crate::transport::{ConnectOptions, Message, QoS, Token, Transport, TransportError};

/// Broker address, topic and QoS of one client; fixed at construction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Endpoint {
    pub address: String,
    pub topic: String,
    pub qos: QoS,
}

impl Endpoint {
    pub fn new(address: impl Into<String>, topic: impl Into<String>, qos: QoS) -> Self {
        Self {
            address: address.into(),
            topic: topic.into(),
            qos,
        }
    }
}

/// Connection settings shared by both roles
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientSettings {
    pub connect: ConnectOptions,
    pub reconnect: ReconnectPolicy,
}

/// Move-only owner of a live publish or subscribe session
pub struct PubSubClient<T: Transport = MqttTransport> {
    endpoint: Endpoint,
    transport: Option<Arc<T>>,
    options: ConnectOptions,
    callback: Option<Arc<SessionCallback<T>>>,
    role: Option<Role>,
}

impl PubSubClient<MqttTransport> {
    /// Connect a publisher with a random client identity
    pub async fn publisher(address: &str, topic: &str, qos: QoS) -> Result<Self, TransportError> {
        Self::publisher_from_settings(Endpoint::new(address, topic, qos), ClientSettings::default())
            .await
    }

    /// Connect a subscriber that writes every inbound payload into `slot`
    pub async fn subscriber(
        address: &str,
        topic: &str,
        qos: QoS,
        slot: SharedSlot,
    ) -> Result<Self, TransportError> {
        Self::subscriber_from_settings(
            Endpoint::new(address, topic, qos),
            ClientSettings::default(),
            slot,
        )
        .await
    }

    pub async fn publisher_from_settings(
        endpoint: Endpoint,
        settings: ClientSettings,
    ) -> Result<Self, TransportError> {
        let transport = Arc::new(MqttTransport::with_random_id(&endpoint.address)?);
        Ok(Self::start(transport, endpoint, settings, Role::publisher()).await)
    }

    pub async fn subscriber_from_settings(
        endpoint: Endpoint,
        settings: ClientSettings,
        slot: SharedSlot,
    ) -> Result<Self, TransportError> {
        let transport = Arc::new(MqttTransport::with_random_id(&endpoint.address)?);
        Ok(Self::start(transport, endpoint, settings, Role::subscriber(slot)).await)
    }
}

impl<T: Transport> PubSubClient<T> {
    /// Publisher over an already-built transport
    pub async fn start_publisher(
        transport: Arc<T>,
        endpoint: Endpoint,
        settings: ClientSettings,
    ) -> Self {
        Self::start(transport, endpoint, settings, Role::publisher()).await
    }

    /// Subscriber over an already-built transport
    pub async fn start_subscriber(
        transport: Arc<T>,
        endpoint: Endpoint,
        settings: ClientSettings,
        slot: SharedSlot,
    ) -> Self {
        Self::start(transport, endpoint, settings, Role::subscriber(slot)).await
    }

    /// Register the callback and wait for the first connect attempt
    ///
    /// A failed first attempt is logged; the callback keeps retrying in the
    /// background.
    async fn start(transport: Arc<T>, endpoint: Endpoint, settings: ClientSettings, role: Role) -> Self {
        let mut options = settings.connect;
        options.clean_session = true;

        let callback = SessionCallback::new(
            &transport,
            endpoint.topic.clone(),
            endpoint.qos,
            options.clone(),
            role.clone(),
            settings.reconnect,
        );
        transport.set_callback(callback.clone());

        info!(
            address = %endpoint.address,
            topic = %endpoint.topic,
            qos = %endpoint.qos,
            role = ?role.kind(),
            "Connecting to broker"
        );
        if let Some(token) = callback.connect() {
            if let Err(e) = token.wait().await {
                error!("{}", e);
            }
        }

        Self {
            endpoint,
            transport: Some(transport),
            options,
            callback: Some(callback),
            role: Some(role),
        }
    }

    /// Publish `payload` on the client's topic if currently connected
    ///
    /// Nothing is queued while disconnected: the payload is dropped.
    pub fn send(&self, payload: impl AsRef<[u8]>) {
        let Some(transport) = &self.transport else {
            return;
        };
        let Some(Role::Publisher { publish_acks }) = &self.role else {
            warn!(topic = %self.endpoint.topic, "send called on a subscriber; message dropped");
            return;
        };
        if !transport.is_connected() {
            debug!(topic = %self.endpoint.topic, "Not connected; message dropped");
            return;
        }

        let message = Message::new(
            self.endpoint.topic.clone(),
            Bytes::copy_from_slice(payload.as_ref()),
            self.endpoint.qos,
        );
        if let Err(e) = transport.publish(message, publish_acks.clone()) {
            error!("Failed to publish to {}: {}", self.endpoint.topic, e);
        }
    }

    /// Issue a connect request now instead of waiting for the automatic retry
    pub fn reconnect(&self) {
        if let Some(callback) = &self.callback {
            // Outcome arrives through the callback
            let _ = callback.connect();
        }
    }

    pub fn is_connected(&self) -> bool {
        self.transport.as_ref().is_some_and(|t| t.is_connected())
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn options(&self) -> &ConnectOptions {
        &self.options
    }

    /// `None` for an empty (moved-from or default) client
    pub fn role(&self) -> Option<&Role> {
        self.role.as_ref()
    }

    pub fn slot(&self) -> Option<&SharedSlot> {
        self.role.as_ref().and_then(Role::slot)
    }

    pub fn transport(&self) -> Option<&Arc<T>> {
        self.transport.as_ref()
    }

    pub fn health(&self) -> Option<LinkHealth> {
        self.callback.as_ref().map(|c| c.health())
    }

    /// Explicit move-assignment: release what `self` holds, then take `other`
    pub fn adopt(&mut self, other: &mut Self) {
        *self = std::mem::take(other);
    }

    /// Orderly teardown, waiting for each step to finish
    ///
    /// The unsubscribe completes before consuming stops and the disconnect
    /// is issued.
    pub async fn shutdown(mut self) {
        if let Some((transport, unsubscribed)) = self.begin_teardown() {
            if let Some(token) = unsubscribed {
                if let Err(e) = token.wait().await {
                    warn!("Unsubscribe failed during shutdown: {}", e);
                }
            }
            if let Some(token) = self.finish_teardown(&transport) {
                if let Err(e) = token.wait().await {
                    warn!("Disconnect failed during shutdown: {}", e);
                }
            }
        }
        self.release();
    }

    /// Close the session and issue the unsubscribe
    ///
    /// Runs at most once per connection because the transport handle is taken.
    fn begin_teardown(&mut self) -> Option<(Arc<T>, Option<Token>)> {
        let transport = self.transport.take()?;
        if let Some(callback) = &self.callback {
            callback.close();
        }

        let unsubscribed = match transport.unsubscribe(&self.endpoint.topic) {
            Ok(token) => Some(token),
            Err(e) => {
                warn!("Unsubscribe from {} failed: {}", self.endpoint.topic, e);
                None
            }
        };
        Some((transport, unsubscribed))
    }

    /// Stop consuming and disconnect
    fn finish_teardown(&self, transport: &Arc<T>) -> Option<Token> {
        transport.stop_consuming();
        let disconnected = match transport.disconnect() {
            Ok(token) => Some(token),
            Err(e) => {
                warn!("Disconnect failed: {}", e);
                None
            }
        };
        info!(topic = %self.endpoint.topic, "Client torn down");
        disconnected
    }

    fn release(&mut self) {
        self.callback = None;
        self.role = None;
    }
}

impl<T: Transport> Default for PubSubClient<T> {
    /// Empty client: no connection, empty address and topic, QoS 0
    fn default() -> Self {
        Self {
            endpoint: Endpoint::default(),
            transport: None,
            options: ConnectOptions::default(),
            callback: None,
            role: None,
        }
    }
}

impl<T: Transport> Drop for PubSubClient<T> {
    fn drop(&mut self) {
        // Tokens are dropped unawaited; use shutdown() to wait.
        // Requests are queued in order, so the unsubscribe still goes first.
        if let Some((transport, _unsubscribed)) = self.begin_teardown() {
            let _disconnected = self.finish_teardown(&transport);
        }
        self.release();
    }
}

impl<T: Transport> fmt::Debug for PubSubClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PubSubClient")
            .field("endpoint", &self.endpoint)
            .field("role", &self.role.as_ref().map(Role::kind))
            .field("live", &self.transport.is_some())
            .finish()
    }
}
