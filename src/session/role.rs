//! Publisher/subscriber role, fixed when a client is built

use std::sync::Arc;

use super::listener::AckListener;
use super::state::RoleKind;
use crate::slot::SharedSlot;

/// Resources that come with each role
///
/// A publisher never holds a slot and a subscriber never holds a publish
/// listener; the variants make any other combination unrepresentable.
#[derive(Debug, Clone)]
pub enum Role {
    Publisher {
        publish_acks: Arc<AckListener>,
    },
    Subscriber {
        slot: SharedSlot,
        subscribe_acks: Arc<AckListener>,
    },
}

impl Role {
    pub fn publisher() -> Self {
        Role::Publisher {
            publish_acks: Arc::new(AckListener::publish()),
        }
    }

    pub fn subscriber(slot: SharedSlot) -> Self {
        Role::Subscriber {
            slot,
            subscribe_acks: Arc::new(AckListener::subscribe()),
        }
    }

    pub fn kind(&self) -> RoleKind {
        match self {
            Role::Publisher { .. } => RoleKind::Publisher,
            Role::Subscriber { .. } => RoleKind::Subscriber,
        }
    }

    pub fn slot(&self) -> Option<&SharedSlot> {
        match self {
            Role::Subscriber { slot, .. } => Some(slot),
            Role::Publisher { .. } => None,
        }
    }

    pub fn publish_listener(&self) -> Option<&Arc<AckListener>> {
        match self {
            Role::Publisher { publish_acks } => Some(publish_acks),
            Role::Subscriber { .. } => None,
        }
    }

    pub fn subscribe_listener(&self) -> Option<&Arc<AckListener>> {
        match self {
            Role::Subscriber { subscribe_acks, .. } => Some(subscribe_acks),
            Role::Publisher { .. } => None,
        }
    }
}
