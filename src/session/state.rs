//! Pure session state machine
//!
//! [`SessionState::apply`] decides the next state and the follow-up action
//! for every lifecycle event. It performs no I/O; the callback carries out
//! the returned [`SessionAction`] after releasing its lock.

use std::fmt;

/// Which side of the link a session serves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleKind {
    Publisher,
    Subscriber,
}

/// Connection lifecycle state of one client
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Disconnected,
    Connecting,
    /// Publisher with a live session
    ConnectedIdle,
    /// Subscriber with a live session and a subscribe request issued
    ConnectedSubscribed,
    ConnectionLost,
}

/// Lifecycle inputs driving [`SessionState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// A connect request was handed to the transport
    ConnectIssued,
    ConnectSucceeded,
    ConnectFailed,
    ConnectionLost,
    /// Client teardown; terminal
    TornDown,
}

/// Work the caller must do after a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionAction {
    None,
    Subscribe,
    Reconnect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub next: SessionState,
    pub action: SessionAction,
}

impl SessionState {
    /// Compute the transition for `event` (pure function)
    pub fn apply(self, event: SessionEvent, role: RoleKind) -> Transition {
        use SessionAction as A;
        use SessionState as S;

        let (next, action) = match event {
            SessionEvent::TornDown => (S::Disconnected, A::None),
            SessionEvent::ConnectIssued => (S::Connecting, A::None),
            SessionEvent::ConnectSucceeded => match role {
                RoleKind::Subscriber => (S::ConnectedSubscribed, A::Subscribe),
                RoleKind::Publisher => (S::ConnectedIdle, A::None),
            },
            SessionEvent::ConnectFailed | SessionEvent::ConnectionLost => {
                (S::ConnectionLost, A::Reconnect)
            }
        };

        Transition { next, action }
    }

    pub fn is_connected(self) -> bool {
        matches!(self, SessionState::ConnectedIdle | SessionState::ConnectedSubscribed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connecting => "connecting",
            SessionState::ConnectedIdle => "connected-idle",
            SessionState::ConnectedSubscribed => "connected-subscribed",
            SessionState::ConnectionLost => "connection-lost",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_success_depends_on_role() {
        let sub = SessionState::Connecting.apply(SessionEvent::ConnectSucceeded, RoleKind::Subscriber);
        assert_eq!(sub.next, SessionState::ConnectedSubscribed);
        assert_eq!(sub.action, SessionAction::Subscribe);

        let publ = SessionState::Connecting.apply(SessionEvent::ConnectSucceeded, RoleKind::Publisher);
        assert_eq!(publ.next, SessionState::ConnectedIdle);
        assert_eq!(publ.action, SessionAction::None);
    }

    #[test]
    fn test_failures_always_reconnect() {
        for role in [RoleKind::Publisher, RoleKind::Subscriber] {
            let failed = SessionState::Connecting.apply(SessionEvent::ConnectFailed, role);
            assert_eq!(failed.next, SessionState::ConnectionLost);
            assert_eq!(failed.action, SessionAction::Reconnect);

            for connected in [SessionState::ConnectedIdle, SessionState::ConnectedSubscribed] {
                let lost = connected.apply(SessionEvent::ConnectionLost, role);
                assert_eq!(lost.next, SessionState::ConnectionLost);
                assert_eq!(lost.action, SessionAction::Reconnect);
            }
        }
    }

    #[test]
    fn test_connect_issued_moves_to_connecting() {
        let t = SessionState::ConnectionLost.apply(SessionEvent::ConnectIssued, RoleKind::Publisher);
        assert_eq!(t.next, SessionState::Connecting);
        assert_eq!(t.action, SessionAction::None);
    }

    #[test]
    fn test_teardown_from_any_state() {
        let states = [
            SessionState::Disconnected,
            SessionState::Connecting,
            SessionState::ConnectedIdle,
            SessionState::ConnectedSubscribed,
            SessionState::ConnectionLost,
        ];
        for state in states {
            let t = state.apply(SessionEvent::TornDown, RoleKind::Subscriber);
            assert_eq!(t.next, SessionState::Disconnected);
            assert_eq!(t.action, SessionAction::None);
        }
    }

    #[test]
    fn test_is_connected() {
        assert!(SessionState::ConnectedIdle.is_connected());
        assert!(SessionState::ConnectedSubscribed.is_connected());
        assert!(!SessionState::ConnectionLost.is_connected());
        assert_eq!(SessionState::ConnectionLost.to_string(), "connection-lost");
    }
}
