//! Impure I/O for the rumqttc transport
//!
//! [`MqttTransport`] owns a driver task that polls the rumqttc event loop and
//! turns its output into [`SessionEvents`] and [`ActionListener`] calls. The
//! driver never reconnects on its own: after a session ends it idles until
//! the next [`Transport::connect`], which leaves retry policy to the session
//! layer.

use super::connection::{configure_mqtt_options, wire_qos, BrokerAddress};
use super::message_handler::{EventRoute, MessageHandler};
use crate::transport::{
    Ack, ActionListener, ConnectOptions, Message, QoS, SessionEvents, Token, TokenCompleter,
    Transport, TransportError,
};
use rumqttc::v5::{AsyncClient, ConnectionError, Event, EventLoop};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Capacity of the rumqttc request queue
const REQUEST_CAPACITY: usize = 10;

/// How long a dropped transport keeps polling to flush a DISCONNECT
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// rumqttc-backed implementation of [`Transport`]
pub struct MqttTransport {
    address: BrokerAddress,
    client_id: String,
    client: Mutex<Option<AsyncClient>>,
    commands: mpsc::UnboundedSender<DriverCommand>,
    shared: Arc<DriverShared>,
    driver: Option<JoinHandle<()>>,
}

enum DriverCommand {
    Connect {
        event_loop: EventLoop,
        done: TokenCompleter,
    },
    Shutdown,
}

/// State shared between the transport handle and its driver task
#[derive(Default)]
struct DriverShared {
    connected: AtomicBool,
    closing: AtomicBool,
    callback: Mutex<Option<Arc<dyn SessionEvents>>>,
    subscribe_listener: Mutex<Option<(String, Arc<dyn ActionListener>)>>,
    publish_listener: Mutex<Option<Arc<dyn ActionListener>>>,
    pending_disconnect: Mutex<Option<TokenCompleter>>,
}

/// One connect attempt and the session it may turn into
struct ActiveSession {
    event_loop: EventLoop,
    pending_connect: Option<TokenCompleter>,
}

enum Step {
    Command(Option<DriverCommand>),
    Event(Result<Event, ConnectionError>),
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MqttTransport {
    /// Create a transport for `address` and start its driver task
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(address: &str, client_id: impl Into<String>) -> Result<Self, TransportError> {
        let address = BrokerAddress::parse(address)?;
        let (commands, command_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(DriverShared::default());
        let driver = tokio::spawn(run_driver(command_rx, shared.clone()));

        Ok(Self {
            address,
            client_id: client_id.into(),
            client: Mutex::new(None),
            commands,
            shared,
            driver: Some(driver),
        })
    }

    /// Transport with a freshly generated random client identity
    pub fn with_random_id(address: &str) -> Result<Self, TransportError> {
        Self::new(address, format!("pubsub-link-{}", uuid::Uuid::new_v4()))
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn address(&self) -> &BrokerAddress {
        &self.address
    }

    fn current_client(&self) -> Result<AsyncClient, TransportError> {
        lock(&self.client).clone().ok_or(TransportError::NotConnected)
    }
}

impl Transport for MqttTransport {
    fn set_callback(&self, callback: Arc<dyn SessionEvents>) {
        *lock(&self.shared.callback) = Some(callback);
    }

    fn connect(&self, options: &ConnectOptions) -> Result<Token, TransportError> {
        let mqtt_options = configure_mqtt_options(&self.address, &self.client_id, options);
        let (client, event_loop) = AsyncClient::new(mqtt_options, REQUEST_CAPACITY);
        let (done, token) = Token::pending();

        self.shared.closing.store(false, Ordering::SeqCst);
        *lock(&self.client) = Some(client);
        self.commands
            .send(DriverCommand::Connect { event_loop, done })
            .map_err(|_| TransportError::Abandoned)?;

        debug!(target: "mqtt_transport", client_id = %self.client_id, "Connect attempt queued");
        Ok(token)
    }

    fn subscribe(
        &self,
        topic: &str,
        qos: QoS,
        listener: Arc<dyn ActionListener>,
    ) -> Result<Token, TransportError> {
        let client = self.current_client()?;
        *lock(&self.shared.subscribe_listener) = Some((topic.to_string(), listener.clone()));

        match client.try_subscribe(topic, wire_qos(qos)) {
            Ok(()) => Ok(Token::ready(Ok(()))),
            Err(e) => {
                listener.on_ack_failure(&Ack::new(0, Some(topic.to_string())));
                Err(TransportError::RequestFailed(Box::new(e)))
            }
        }
    }

    fn unsubscribe(&self, topic: &str) -> Result<Token, TransportError> {
        let client = self.current_client()?;
        client
            .try_unsubscribe(topic)
            .map_err(|e| TransportError::RequestFailed(Box::new(e)))?;
        Ok(Token::ready(Ok(())))
    }

    fn publish(
        &self,
        message: Message,
        listener: Arc<dyn ActionListener>,
    ) -> Result<Token, TransportError> {
        let client = self.current_client()?;
        let ack = Ack::new(0, Some(message.topic.clone()));
        *lock(&self.shared.publish_listener) = Some(listener.clone());

        match client.try_publish(
            message.topic,
            wire_qos(message.qos),
            message.retain,
            message.payload,
        ) {
            Ok(()) => {
                // No broker acknowledgement exists for QoS 0
                if message.qos == QoS::AtMostOnce {
                    listener.on_ack_success(&ack);
                }
                Ok(Token::ready(Ok(())))
            }
            Err(e) => {
                listener.on_ack_failure(&ack);
                Err(TransportError::RequestFailed(Box::new(e)))
            }
        }
    }

    fn disconnect(&self) -> Result<Token, TransportError> {
        self.shared.closing.store(true, Ordering::SeqCst);

        let Some(client) = lock(&self.client).take() else {
            return Ok(Token::ready(Ok(())));
        };
        if !self.shared.connected.load(Ordering::SeqCst) {
            // Nothing to flush; ending the attempt is enough
            let _ = client.try_disconnect();
            return Ok(Token::ready(Ok(())));
        }

        let (done, token) = Token::pending();
        *lock(&self.shared.pending_disconnect) = Some(done);
        client
            .try_disconnect()
            .map_err(|e| TransportError::RequestFailed(Box::new(e)))?;
        Ok(token)
    }

    fn stop_consuming(&self) {
        lock(&self.shared.callback).take();
    }

    fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }
}

impl Drop for MqttTransport {
    fn drop(&mut self) {
        let _ = self.commands.send(DriverCommand::Shutdown);
        // The driver winds down on its own, bounded by DRAIN_TIMEOUT
        self.driver.take();
    }
}

async fn run_driver(mut commands: mpsc::UnboundedReceiver<DriverCommand>, shared: Arc<DriverShared>) {
    let mut active: Option<ActiveSession> = None;
    let mut drain_deadline: Option<Instant> = None;

    loop {
        let Some(session) = active.as_mut() else {
            if drain_deadline.is_some() {
                break;
            }
            match commands.recv().await {
                Some(DriverCommand::Connect { event_loop, done }) => {
                    active = Some(ActiveSession {
                        event_loop,
                        pending_connect: Some(done),
                    });
                    continue;
                }
                Some(DriverCommand::Shutdown) | None => break,
            }
        };

        let step = match drain_deadline {
            Some(deadline) => {
                match tokio::time::timeout_at(deadline, session.event_loop.poll()).await {
                    Ok(event) => Step::Event(event),
                    Err(_) => {
                        warn!(target: "mqtt_transport", "Gave up flushing DISCONNECT before shutdown");
                        break;
                    }
                }
            }
            None => tokio::select! {
                command = commands.recv() => Step::Command(command),
                event = session.event_loop.poll() => Step::Event(event),
            },
        };

        match step {
            Step::Command(Some(DriverCommand::Connect { event_loop, done })) => {
                if let Some(previous) = active.take().and_then(|s| s.pending_connect) {
                    previous.complete(Err(TransportError::Superseded));
                }
                shared.connected.store(false, Ordering::SeqCst);
                active = Some(ActiveSession {
                    event_loop,
                    pending_connect: Some(done),
                });
            }
            Step::Command(Some(DriverCommand::Shutdown)) | Step::Command(None) => {
                if shared.closing.load(Ordering::SeqCst) && shared.connected.load(Ordering::SeqCst) {
                    drain_deadline = Some(Instant::now() + DRAIN_TIMEOUT);
                } else {
                    break;
                }
            }
            Step::Event(result) => {
                let keep_session = match active.as_mut() {
                    Some(session) => shared.dispatch(result, &mut session.pending_connect),
                    None => false,
                };
                if !keep_session {
                    active = None;
                }
            }
        }
    }

    shared.connected.store(false, Ordering::SeqCst);
    if let Some(done) = lock(&shared.pending_disconnect).take() {
        done.complete(Err(TransportError::Abandoned));
    }
    debug!(target: "mqtt_transport", "MQTT driver stopped");
}

impl DriverShared {
    fn events(&self) -> Option<Arc<dyn SessionEvents>> {
        lock(&self.callback).clone()
    }

    /// Act on one event-loop result; false ends the session
    fn dispatch(
        &self,
        result: Result<Event, ConnectionError>,
        pending_connect: &mut Option<TokenCompleter>,
    ) -> bool {
        let event = match result {
            Ok(event) => event,
            Err(e) => {
                self.end_session(e.to_string(), pending_connect);
                return false;
            }
        };

        match MessageHandler::route_mqtt_event(&event) {
            EventRoute::ConnectionAcknowledged => {
                self.connected.store(true, Ordering::SeqCst);
                if let Some(done) = pending_connect.take() {
                    done.complete(Ok(()));
                }
                info!(target: "mqtt_transport", "MQTT connection acknowledged");
                if let Some(events) = self.events() {
                    events.on_connect_success();
                }
                true
            }
            EventRoute::ConnectionRefused(code) => {
                self.end_session(format!("Connection refused: {code}"), pending_connect);
                false
            }
            EventRoute::MessageReceived { topic, payload } => {
                debug!(target: "mqtt_transport", "Received MQTT message on topic: {}", topic);
                if let Some(events) = self.events() {
                    events.on_message(&topic, payload);
                }
                true
            }
            EventRoute::SubscriptionAcknowledged { packet_id, granted } => {
                if let Some((topic, listener)) = lock(&self.subscribe_listener).clone() {
                    let ack = Ack::new(packet_id, Some(topic));
                    if granted {
                        listener.on_ack_success(&ack);
                    } else {
                        listener.on_ack_failure(&ack);
                    }
                }
                true
            }
            EventRoute::PublishCompleted { packet_id } => {
                if let Some(listener) = lock(&self.publish_listener).clone() {
                    listener.on_ack_success(&Ack::new(packet_id, None));
                }
                if let Some(events) = self.events() {
                    events.on_delivery_complete(packet_id);
                }
                true
            }
            EventRoute::PublishRejected { packet_id, reason } => {
                warn!(target: "mqtt_transport", "Broker rejected publish {}: {}", packet_id, reason);
                if let Some(listener) = lock(&self.publish_listener).clone() {
                    listener.on_ack_failure(&Ack::new(packet_id, None));
                }
                true
            }
            EventRoute::Disconnected(reason) => {
                self.connected.store(false, Ordering::SeqCst);
                if !self.closing.load(Ordering::SeqCst) {
                    if let Some(events) = self.events() {
                        events.on_connection_lost(Some(&reason));
                    }
                }
                false
            }
            EventRoute::DisconnectSent => {
                self.connected.store(false, Ordering::SeqCst);
                if let Some(done) = lock(&self.pending_disconnect).take() {
                    done.complete(Ok(()));
                }
                info!(target: "mqtt_transport", "MQTT client disconnected");
                false
            }
            EventRoute::InfrastructureEvent(event) => {
                debug!(target: "mqtt_transport", "MQTT event: {}", event);
                true
            }
            EventRoute::OutgoingEvent => true,
        }
    }

    /// Report the end of a connect attempt or of an established session
    fn end_session(&self, cause: String, pending_connect: &mut Option<TokenCompleter>) {
        let was_connected = self.connected.swap(false, Ordering::SeqCst);
        if let Some(done) = pending_connect.take() {
            done.complete(Err(TransportError::ConnectFailed(cause.clone())));
        }
        if self.closing.load(Ordering::SeqCst) {
            if let Some(done) = lock(&self.pending_disconnect).take() {
                done.complete(Ok(()));
            }
            return;
        }

        let Some(events) = self.events() else { return };
        if was_connected {
            events.on_connection_lost(Some(&cause));
        } else {
            events.on_connect_failure(&cause);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_new_rejects_invalid_address() {
        let result = MqttTransport::with_random_id("invalid-url");
        assert!(matches!(result, Err(TransportError::InvalidAddress(_))));
    }

    #[tokio::test]
    async fn test_random_ids_are_unique() {
        let a = MqttTransport::with_random_id("tcp://127.0.0.1:1883").unwrap();
        let b = MqttTransport::with_random_id("tcp://127.0.0.1:1883").unwrap();
        assert_ne!(a.client_id(), b.client_id());
        assert!(a.client_id().starts_with("pubsub-link-"));
    }

    #[tokio::test]
    async fn test_operations_before_connect_report_not_connected() {
        let transport = MqttTransport::with_random_id("tcp://127.0.0.1:1883").unwrap();
        assert!(!transport.is_connected());
        assert!(matches!(
            transport.unsubscribe("T"),
            Err(TransportError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_disconnect_without_session_resolves_immediately() {
        let transport = MqttTransport::with_random_id("tcp://127.0.0.1:1883").unwrap();
        let token = transport.disconnect().unwrap();
        assert!(token.wait().await.is_ok());
    }
}
