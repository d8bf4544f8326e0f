//! Session lifecycle: state machine, retry pacing, role resources and the
//! callback that ties them to a transport
//!
//! - [`state`] - pure transition function over [`SessionState`]
//! - [`reconnect`] - delay schedule between connect attempts
//! - [`role`] - publisher/subscriber resources
//! - [`listener`] - subscribe/publish acknowledgement logging
//! - [`callback`] - transport-facing event handler

pub mod callback;
pub mod listener;
pub mod reconnect;
pub mod role;
pub mod state;

pub use callback::{LinkHealth, SessionCallback};
pub use listener::{AckKind, AckListener};
pub use reconnect::ReconnectPolicy;
pub use role::Role;
pub use state::{RoleKind, SessionAction, SessionEvent, SessionState, Transition};
