//! Observability: structured logging setup
//!
//! Link health counters live on the session itself, see
//! [`crate::session::LinkHealth`].

pub mod logging;

pub use logging::{init_default_logging, init_logging, LogFormat};

pub use logging::link_span;
