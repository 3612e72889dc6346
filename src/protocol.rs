//! Signaling wire protocol
//!
//! JSON envelopes of the form `{"event": "offer"|"answer", "data": "<serialized
//! session description>"}` exchanged over the WebSocket signaling channel.
//! No versioning, no sequence numbers, no acknowledgement.

use serde::{Deserialize, Serialize};

use crate::error::SignalError;

/// Signaling event discriminator.
///
/// Events the peer does not recognize deserialize as [`SignalEvent::Unknown`]
/// so a single unexpected message never poisons the channel; the dispatcher
/// logs and ignores them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalEvent {
    Offer,
    Answer,
    Unknown,
}

impl<'de> Deserialize<'de> for SignalEvent {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let tag = String::deserialize(deserializer)?;
        Ok(match tag.as_str() {
            "offer" => SignalEvent::Offer,
            "answer" => SignalEvent::Answer,
            _ => SignalEvent::Unknown,
        })
    }
}

impl std::fmt::Display for SignalEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignalEvent::Offer => write!(f, "offer"),
            SignalEvent::Answer => write!(f, "answer"),
            SignalEvent::Unknown => write!(f, "unknown"),
        }
    }
}

/// One signaling message: an event tag plus an opaque serialized
/// session description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalingEnvelope {
    pub event: SignalEvent,
    pub data: String,
}

impl SignalingEnvelope {
    pub fn new(event: SignalEvent, data: String) -> Self {
        Self { event, data }
    }

    /// Decode an envelope from the raw text of a signaling message
    pub fn decode(text: &str) -> Result<Self, SignalError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Encode the envelope for transmission
    pub fn encode(&self) -> Result<String, SignalError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Dispatch table selector for inbound signaling messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalingMode {
    /// Only `answer` events are applied; everything else is ignored.
    /// Used when this side is the sole offerer (file playback demo).
    OneWay,
    /// Both `offer` and `answer` are applied, and each is reciprocated:
    /// an inbound offer gets an answer, an inbound answer triggers a fresh
    /// offer. Either side can propose track changes this way without the
    /// peers having to agree on roles.
    Bidirectional,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_envelope_wire_names() {
        let envelope = SignalingEnvelope::new(SignalEvent::Offer, "sdp".into());
        let text = envelope.encode().unwrap();
        assert!(text.contains(r#""event":"offer""#));

        let envelope = SignalingEnvelope::new(SignalEvent::Answer, "sdp".into());
        let text = envelope.encode().unwrap();
        assert!(text.contains(r#""event":"answer""#));
    }

    #[test]
    fn test_envelope_round_trip() {
        let envelope = SignalingEnvelope::new(SignalEvent::Answer, "payload".into());
        let decoded = SignalingEnvelope::decode(&envelope.encode().unwrap()).unwrap();
        assert_eq!(decoded.event, SignalEvent::Answer);
        assert_eq!(decoded.data, "payload");
    }

    #[test]
    fn test_unknown_event_tolerated() {
        let decoded =
            SignalingEnvelope::decode(r#"{"event":"candidate","data":"x"}"#).unwrap();
        assert_eq!(decoded.event, SignalEvent::Unknown);
    }

    #[test]
    fn test_malformed_envelope_rejected() {
        assert!(SignalingEnvelope::decode("not json at all").is_err());
        assert!(SignalingEnvelope::decode(r#"{"event":"offer"}"#).is_err());
    }

    proptest! {
        #[test]
        fn test_decode_never_panics(text in ".*") {
            let _ = SignalingEnvelope::decode(&text);
        }
    }
}
