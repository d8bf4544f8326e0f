//! Crate-level error type
//!
//! Each layer has its own error enum; [`LinkError`] gathers them for the
//! binaries and for callers that do not care which layer failed.

use thiserror::Error;

use crate::config::ConfigError;
use crate::telemetry::DecodeError;
use crate::transport::TransportError;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Encode error: {0}")]
    Encode(#[from] flexbuffers::SerializationError),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl LinkError {
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Broker unreachable or address unusable, as opposed to bad input
    pub fn is_transport(&self) -> bool {
        matches!(self, LinkError::Transport(_))
    }
}

/// Result type for link operations
pub type LinkResult<T> = Result<T, LinkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let error: LinkError = TransportError::InvalidAddress("nope".to_string()).into();
        assert!(error.is_transport());
        assert_eq!(
            error.to_string(),
            "Transport error: Invalid broker address: nope"
        );
    }

    #[test]
    fn test_from_config_error() {
        let error: LinkError = ConfigError::InvalidConfig("empty topic".to_string()).into();
        assert!(!error.is_transport());
        assert!(error.to_string().starts_with("Configuration error"));
    }

    #[test]
    fn test_from_decode_error() {
        let error: LinkError = DecodeError::MissingField("altitude_pilot".to_string()).into();
        assert!(error.to_string().contains("altitude_pilot"));
    }

    #[test]
    fn test_internal_constructor() {
        let error = LinkError::internal("unexpected state");
        assert!(matches!(error, LinkError::Internal { .. }));
        assert_eq!(error.to_string(), "Internal error: unexpected state");
    }
}
