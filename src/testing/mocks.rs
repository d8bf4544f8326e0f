//! Mock implementations for testing
//!
//! [`MockTransport`] records every request it receives and lets a test play
//! the broker's part by firing connection and message events at whatever
//! callback is registered.

use crate::transport::{
    Ack, ActionListener, ConnectOptions, Message, QoS, SessionEvents, Token, TokenCompleter,
    Transport, TransportError,
};
use bytes::Bytes;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// One request received by a [`MockTransport`]
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    SetCallback,
    Connect { clean_session: bool },
    Subscribe { topic: String, qos: QoS },
    Unsubscribe { topic: String },
    Publish(Message),
    Disconnect,
    StopConsuming,
}

/// Mock transport for testing
#[derive(Default)]
pub struct MockTransport {
    calls: Mutex<Vec<MockCall>>,
    callback: Mutex<Option<Arc<dyn SessionEvents>>>,
    connected: AtomicBool,
    /// Reject connect requests outright instead of handing out a token
    pub should_fail: AtomicBool,
    /// Leave unsubscribe tokens pending until [`MockTransport::complete_unsubscribe`]
    pub hold_unsubscribe: AtomicBool,
    pending_unsubscribe: Mutex<Option<TokenCompleter>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn with_failure() -> Self {
        let transport = Self::default();
        transport.should_fail.store(true, Ordering::SeqCst);
        transport
    }

    /// Resolve a held unsubscribe; returns false if none was pending
    pub fn complete_unsubscribe(&self) -> bool {
        match lock(&self.pending_unsubscribe).take() {
            Some(done) => {
                done.complete(Ok(()));
                true
            }
            None => false,
        }
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    pub fn has_callback(&self) -> bool {
        lock(&self.callback).is_some()
    }

    pub fn calls(&self) -> Vec<MockCall> {
        lock(&self.calls).clone()
    }

    pub fn clear_history(&self) {
        lock(&self.calls).clear();
    }

    pub fn connect_count(&self) -> usize {
        self.count(|call| matches!(call, MockCall::Connect { .. }))
    }

    pub fn disconnect_count(&self) -> usize {
        self.count(|call| matches!(call, MockCall::Disconnect))
    }

    pub fn subscriptions(&self) -> Vec<(String, QoS)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                MockCall::Subscribe { topic, qos } => Some((topic, qos)),
                _ => None,
            })
            .collect()
    }

    pub fn published(&self) -> Vec<Message> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                MockCall::Publish(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    fn count(&self, pred: impl Fn(&MockCall) -> bool) -> usize {
        lock(&self.calls).iter().filter(|call| pred(call)).count()
    }

    fn record(&self, call: MockCall) {
        lock(&self.calls).push(call);
    }

    fn events(&self) -> Option<Arc<dyn SessionEvents>> {
        lock(&self.callback).clone()
    }

    /// Broker accepted the pending connect
    pub fn fire_connect_success(&self) {
        self.set_connected(true);
        if let Some(events) = self.events() {
            events.on_connect_success();
        }
    }

    pub fn fire_connect_failure(&self, cause: &str) {
        self.set_connected(false);
        if let Some(events) = self.events() {
            events.on_connect_failure(cause);
        }
    }

    pub fn fire_connection_lost(&self, cause: Option<&str>) {
        self.set_connected(false);
        if let Some(events) = self.events() {
            events.on_connection_lost(cause);
        }
    }

    pub fn fire_message(&self, topic: &str, payload: impl Into<Bytes>) {
        if let Some(events) = self.events() {
            events.on_message(topic, payload.into());
        }
    }
}

impl Transport for MockTransport {
    fn set_callback(&self, callback: Arc<dyn SessionEvents>) {
        self.record(MockCall::SetCallback);
        *lock(&self.callback) = Some(callback);
    }

    fn connect(&self, options: &ConnectOptions) -> Result<Token, TransportError> {
        self.record(MockCall::Connect {
            clean_session: options.clean_session,
        });
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(TransportError::ConnectFailed("Mock connection failure".into()));
        }
        Ok(Token::ready(Ok(())))
    }

    fn subscribe(
        &self,
        topic: &str,
        qos: QoS,
        listener: Arc<dyn ActionListener>,
    ) -> Result<Token, TransportError> {
        self.record(MockCall::Subscribe {
            topic: topic.to_string(),
            qos,
        });
        listener.on_ack_success(&Ack::new(1, Some(topic.to_string())));
        Ok(Token::ready(Ok(())))
    }

    fn unsubscribe(&self, topic: &str) -> Result<Token, TransportError> {
        self.record(MockCall::Unsubscribe {
            topic: topic.to_string(),
        });
        if self.hold_unsubscribe.load(Ordering::SeqCst) {
            let (done, token) = Token::pending();
            *lock(&self.pending_unsubscribe) = Some(done);
            return Ok(token);
        }
        Ok(Token::ready(Ok(())))
    }

    fn publish(
        &self,
        message: Message,
        listener: Arc<dyn ActionListener>,
    ) -> Result<Token, TransportError> {
        let ack = Ack::new(0, Some(message.topic.clone()));
        self.record(MockCall::Publish(message));
        listener.on_ack_success(&ack);
        Ok(Token::ready(Ok(())))
    }

    fn disconnect(&self) -> Result<Token, TransportError> {
        self.record(MockCall::Disconnect);
        self.set_connected(false);
        Ok(Token::ready(Ok(())))
    }

    fn stop_consuming(&self) {
        self.record(MockCall::StopConsuming);
        lock(&self.callback).take();
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::AckListener;

    #[tokio::test]
    async fn test_mock_records_requests_in_order() {
        let transport = MockTransport::new();
        let listener = Arc::new(AckListener::publish());

        transport
            .connect(&ConnectOptions::default())
            .unwrap()
            .wait()
            .await
            .unwrap();
        transport
            .publish(
                Message::new("T", Bytes::from_static(b"hi"), QoS::AtMostOnce),
                listener,
            )
            .unwrap();
        transport.disconnect().unwrap();

        let calls = transport.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(
            calls[0],
            MockCall::Connect {
                clean_session: false
            }
        );
        assert!(matches!(calls[1], MockCall::Publish(_)));
        assert_eq!(calls[2], MockCall::Disconnect);
    }

    #[test]
    fn test_mock_failure_rejects_connect() {
        let transport = MockTransport::with_failure();
        let result = transport.connect(&ConnectOptions::default());
        assert!(matches!(result, Err(TransportError::ConnectFailed(_))));
        assert_eq!(transport.connect_count(), 1);
    }
}
