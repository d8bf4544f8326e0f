//! Connection lifecycle handling and inbound message routing
//!
//! [`SessionCallback`] is registered with the transport and runs on the
//! transport's task. It keeps the client's logical state in step with the
//! connection: every failure or loss issues a new connect request, every
//! successful connect of a subscriber issues the subscribe request again,
//! and every inbound payload lands in the shared slot. None of its methods
//! block and none of them let an error escape.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::{Duration, Instant};

use bytes::Bytes;
use tracing::{debug, error, info, warn};

use super::reconnect::ReconnectPolicy;
use super::role::Role;
use super::state::{SessionAction, SessionEvent, SessionState};
use crate::transport::{ConnectOptions, QoS, SessionEvents, Token, Transport};

/// Point-in-time view of a session's health
#[derive(Debug, Clone, PartialEq)]
pub struct LinkHealth {
    pub state: SessionState,
    /// Connect requests issued, the initial one included
    pub connect_requests: u64,
    /// Failures since the last successful connect
    pub consecutive_failures: u32,
    pub messages_received: u64,
    /// Time since the current session was established
    pub uptime: Option<Duration>,
}

#[derive(Debug, Default)]
struct SessionInner {
    state: SessionState,
    closed: bool,
    connected_since: Option<Instant>,
}

pub struct SessionCallback<T: Transport> {
    // Weak: the transport holds this callback, the client holds the transport
    transport: Weak<T>,
    options: ConnectOptions,
    topic: String,
    qos: QoS,
    role: Role,
    policy: ReconnectPolicy,
    inner: Mutex<SessionInner>,
    connect_requests: AtomicU64,
    consecutive_failures: AtomicU32,
    messages_received: AtomicU64,
    self_ref: Weak<Self>,
}

impl<T: Transport> SessionCallback<T> {
    pub fn new(
        transport: &Arc<T>,
        topic: impl Into<String>,
        qos: QoS,
        options: ConnectOptions,
        role: Role,
        policy: ReconnectPolicy,
    ) -> Arc<Self> {
        let topic = topic.into();
        Arc::new_cyclic(|self_ref| Self {
            transport: Arc::downgrade(transport),
            options,
            topic,
            qos,
            role,
            policy,
            inner: Mutex::new(SessionInner::default()),
            connect_requests: AtomicU64::new(0),
            consecutive_failures: AtomicU32::new(0),
            messages_received: AtomicU64::new(0),
            self_ref: self_ref.clone(),
        })
    }

    pub fn role(&self) -> &Role {
        &self.role
    }

    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn health(&self) -> LinkHealth {
        let inner = self.lock();
        LinkHealth {
            state: inner.state,
            connect_requests: self.connect_requests.load(Ordering::SeqCst),
            consecutive_failures: self.consecutive_failures.load(Ordering::SeqCst),
            messages_received: self.messages_received.load(Ordering::SeqCst),
            uptime: inner.connected_since.map(|since| since.elapsed()),
        }
    }

    /// Issue a connect request
    ///
    /// Returns the transport's token, or `None` if the session is closed,
    /// the transport is gone, or the request could not be issued (already
    /// reported).
    pub fn connect(&self) -> Option<Token> {
        self.apply(SessionEvent::ConnectIssued)?;
        let transport = self.transport.upgrade()?;
        self.connect_requests.fetch_add(1, Ordering::SeqCst);

        match transport.connect(&self.options) {
            Ok(token) => Some(token),
            Err(e) => {
                error!("Error: {}", e);
                // Stay in ConnectionLost until a later retry gets through
                let mut inner = self.lock();
                if !inner.closed {
                    inner.state = SessionState::ConnectionLost;
                }
                None
            }
        }
    }

    /// Enter the terminal state; later notifications are ignored
    pub fn close(&self) {
        let mut inner = self.lock();
        let transition = inner.state.apply(SessionEvent::TornDown, self.role.kind());
        inner.state = transition.next;
        inner.connected_since = None;
        inner.closed = true;
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `event` unless closed; returns the follow-up action
    fn apply(&self, event: SessionEvent) -> Option<SessionAction> {
        let mut inner = self.lock();
        if inner.closed {
            return None;
        }
        let transition = inner.state.apply(event, self.role.kind());
        debug!(from = %inner.state, to = %transition.next, ?event, "Session transition");

        if transition.next.is_connected() && !inner.state.is_connected() {
            inner.connected_since = Some(Instant::now());
        } else if !transition.next.is_connected() {
            inner.connected_since = None;
        }
        inner.state = transition.next;
        Some(transition.action)
    }

    fn perform(&self, action: Option<SessionAction>) {
        match action {
            Some(SessionAction::Subscribe) => self.subscribe(),
            Some(SessionAction::Reconnect) => self.reconnect(),
            Some(SessionAction::None) | None => {}
        }
    }

    fn subscribe(&self) {
        let (Some(listener), Some(transport)) =
            (self.role.subscribe_listener(), self.transport.upgrade())
        else {
            return;
        };

        info!("Subscribing to: {}", self.topic);
        // Fire-and-forget: the listener reports the SUBACK
        if let Err(e) = transport.subscribe(&self.topic, self.qos, listener.clone()) {
            error!("Failed to subscribe to {}: {}", self.topic, e);
        }
    }

    fn reconnect(&self) {
        let attempt = self.consecutive_failures.load(Ordering::SeqCst);
        let delay = self.policy.delay_for(attempt);

        if delay.is_zero() {
            info!("Reconnecting");
            self.connect();
            return;
        }

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                info!("Reconnecting in {}ms (attempt {})", delay.as_millis(), attempt);
                let session = self.self_ref.clone();
                handle.spawn(async move {
                    tokio::time::sleep(delay).await;
                    if let Some(session) = session.upgrade() {
                        session.connect();
                    }
                });
            }
            Err(_) => {
                warn!("No runtime available to delay reconnection, reconnecting now");
                self.connect();
            }
        }
    }
}

impl<T: Transport> SessionEvents for SessionCallback<T> {
    fn on_connect_success(&self) {
        info!("Connection success");
        self.consecutive_failures.store(0, Ordering::SeqCst);
        let action = self.apply(SessionEvent::ConnectSucceeded);
        if matches!(action, Some(SessionAction::None)) {
            info!("Publishing to: {}", self.topic);
        }
        self.perform(action);
    }

    fn on_connect_failure(&self, cause: &str) {
        warn!(cause, "Connection attempt failed");
        self.consecutive_failures.fetch_add(1, Ordering::SeqCst);
        let action = self.apply(SessionEvent::ConnectFailed);
        self.perform(action);
    }

    fn on_connection_lost(&self, cause: Option<&str>) {
        match cause.filter(|c| !c.is_empty()) {
            Some(cause) => warn!(cause, "Connection lost"),
            None => warn!("Connection lost"),
        }
        self.consecutive_failures.fetch_add(1, Ordering::SeqCst);
        let action = self.apply(SessionEvent::ConnectionLost);
        self.perform(action);
    }

    fn on_message(&self, topic: &str, payload: Bytes) {
        if self.is_closed() {
            return;
        }
        match self.role.slot() {
            Some(slot) => {
                slot.write(payload);
                self.messages_received.fetch_add(1, Ordering::SeqCst);
            }
            None => debug!("Publisher ignoring message on {}", topic),
        }
    }

    fn on_delivery_complete(&self, packet_id: u16) {
        info!(packet_id, "Message delivered");
    }
}
