//! Telemetry frames exchanged over the link
//!
//! Frames are FlexBuffers maps: schema-less, so a consumer reads only the
//! fields it cares about and ignores the rest.

use flexbuffers::{FlexBufferType, Reader, ReaderError, SerializationError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Field the consumer reads unless configured otherwise
pub const DEFAULT_FIELD: &str = "altitude_pilot";

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Empty payload")]
    Empty,

    #[error("Malformed frame: {0}")]
    Malformed(#[from] ReaderError),

    #[error("Frame root is {0:?}, expected a map")]
    NotAMap(FlexBufferType),

    #[error("Field '{0}' missing from frame")]
    MissingField(String),

    #[error("Field '{field}' is {found:?}, expected a number")]
    NotNumeric {
        field: String,
        found: FlexBufferType,
    },
}

/// Flight state sample as produced by the simulator bridge
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlightSample {
    pub altitude_pilot: f64,
    pub airspeed_kts: f64,
    pub heading_deg: f64,
}

/// Serialize `value` (a struct or map) into a FlexBuffers frame
pub fn encode_frame<T: Serialize>(value: &T) -> Result<Vec<u8>, SerializationError> {
    flexbuffers::to_vec(value)
}

/// Read one numeric field from a frame
///
/// Integer fields are widened to `f64`.
pub fn read_field(payload: &[u8], field: &str) -> Result<f64, DecodeError> {
    if payload.is_empty() {
        return Err(DecodeError::Empty);
    }

    let root = Reader::get_root(payload)?;
    if root.flexbuffer_type() != FlexBufferType::Map {
        return Err(DecodeError::NotAMap(root.flexbuffer_type()));
    }
    let map = root.get_map()?;

    let value = match map.index(field) {
        Ok(value) => value,
        Err(ReaderError::KeyNotFound) => return Err(DecodeError::MissingField(field.to_string())),
        Err(e) => return Err(e.into()),
    };

    let found = value.flexbuffer_type();
    value
        .get_f64()
        .or_else(|_| value.get_i64().map(|v| v as f64))
        .or_else(|_| value.get_u64().map(|v| v as f64))
        .map_err(|_| DecodeError::NotNumeric {
            field: field.to_string(),
            found,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn sample() -> FlightSample {
        FlightSample {
            altitude_pilot: 1523.5,
            airspeed_kts: 110.0,
            heading_deg: 274.0,
        }
    }

    #[test]
    fn test_read_altitude_from_sample() {
        let frame = encode_frame(&sample()).unwrap();
        let altitude = read_field(&frame, DEFAULT_FIELD).unwrap();
        assert_eq!(altitude, 1523.5);
    }

    #[test]
    fn test_integer_field_is_widened() {
        let mut map = BTreeMap::new();
        map.insert("altitude_pilot", 900i64);
        let frame = encode_frame(&map).unwrap();
        assert_eq!(read_field(&frame, "altitude_pilot").unwrap(), 900.0);
    }

    #[test]
    fn test_missing_field() {
        let frame = encode_frame(&sample()).unwrap();
        let err = read_field(&frame, "rotor_rpm").unwrap_err();
        assert!(matches!(err, DecodeError::MissingField(ref f) if f == "rotor_rpm"));
    }

    #[test]
    fn test_non_numeric_field() {
        let mut map = BTreeMap::new();
        map.insert("altitude_pilot", "high");
        let frame = encode_frame(&map).unwrap();
        assert!(matches!(
            read_field(&frame, "altitude_pilot"),
            Err(DecodeError::NotNumeric { .. })
        ));
    }

    #[test]
    fn test_root_must_be_a_map() {
        let frame = encode_frame(&42.0f64).unwrap();
        assert!(matches!(
            read_field(&frame, DEFAULT_FIELD),
            Err(DecodeError::NotAMap(_))
        ));
    }

    #[test]
    fn test_empty_payload() {
        assert!(matches!(read_field(&[], DEFAULT_FIELD), Err(DecodeError::Empty)));
    }
}
