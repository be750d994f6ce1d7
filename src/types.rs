//! Core wire types for broadcast sessions
//!
//! All types use camelCase JSON serialization. Byte fields are carried as
//! standard base64 strings.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// A client-submitted message
///
/// The handler never inspects an envelope beyond handing it to the filter
/// chain; cloning is cheap because both fields are reference-counted.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// Marshalled payload
    #[serde(with = "base64_bytes")]
    pub payload: Bytes,

    /// Signature over the payload by the submitting client
    #[serde(default, with = "base64_bytes")]
    pub signature: Bytes,
}

impl Envelope {
    /// Create an unsigned envelope
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
            signature: Bytes::new(),
        }
    }

    /// Attach a signature
    pub fn with_signature(mut self, signature: impl Into<Bytes>) -> Self {
        self.signature = signature.into();
        self
    }

    /// True if the payload carries no bytes
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// Disposition of a single received envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    /// Accepted into the session queue (not yet delivered to the target)
    Success,
    /// Refused by the filter chain
    BadRequest,
    /// Session queue full; the envelope was dropped
    ServiceUnavailable,
}

impl Status {
    /// Numeric status code as used on the ordering service wire
    pub fn code(self) -> u16 {
        match self {
            Status::Success => 200,
            Status::BadRequest => 400,
            Status::ServiceUnavailable => 503,
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Status::Success => "SUCCESS",
            Status::BadRequest => "BAD_REQUEST",
            Status::ServiceUnavailable => "SERVICE_UNAVAILABLE",
        };
        write!(f, "{} ({})", name, self.code())
    }
}

/// Acknowledgment sent back to the client for each envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastResponse {
    pub status: Status,
}

impl BroadcastResponse {
    pub fn new(status: Status) -> Self {
        Self { status }
    }
}

impl From<Status> for BroadcastResponse {
    fn from(status: Status) -> Self {
        Self::new(status)
    }
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine;
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        BASE64
            .decode(encoded.as_bytes())
            .map(Bytes::from)
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_json_uses_base64() {
        let env = Envelope::new(&b"hello"[..]).with_signature(&b"sig"[..]);
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["payload"], "aGVsbG8=");
        assert_eq!(json["signature"], "c2ln");

        let parsed: Envelope = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, env);
    }

    #[test]
    fn test_envelope_signature_defaults_to_empty() {
        let parsed: Envelope = serde_json::from_str(r#"{"payload":"AQI="}"#).unwrap();
        assert_eq!(parsed.payload.as_ref(), &[1u8, 2]);
        assert!(parsed.signature.is_empty());
    }

    #[test]
    fn test_envelope_rejects_invalid_base64() {
        let result: std::result::Result<Envelope, _> =
            serde_json::from_str(r#"{"payload":"not base64!"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_envelope() {
        assert!(Envelope::default().is_empty());
        assert!(!Envelope::new(vec![0u8]).is_empty());
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(Status::Success.code(), 200);
        assert_eq!(Status::BadRequest.code(), 400);
        assert_eq!(Status::ServiceUnavailable.code(), 503);
        assert_eq!(
            Status::ServiceUnavailable.to_string(),
            "SERVICE_UNAVAILABLE (503)"
        );
    }

    #[test]
    fn test_response_serialization() {
        let resp = BroadcastResponse::from(Status::BadRequest);
        let json = serde_json::to_string(&resp).unwrap();
        assert_eq!(json, r#"{"status":"BAD_REQUEST"}"#);
    }
}
