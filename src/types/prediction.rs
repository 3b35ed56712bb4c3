//! Wire message types: inbound predictions and outbound frames
//!
//! The predictor's reply schema is open-ended; the client only interprets
//! the numeric distance field and passes everything else through untouched.
//! Field extraction is explicit and fallible so the classifier is never fed
//! an untyped blob.

use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One decoded message from the remote predictor.
///
/// A thin container over the raw field mapping. Created on arrival,
/// consumed once by the pipeline, never retained.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionMessage {
    fields: Map<String, Value>,
}

impl PredictionMessage {
    /// Parse a text payload into a prediction message.
    ///
    /// Returns `None` for anything that is not a JSON object. Callers drop
    /// such payloads; a bad frame never terminates the stream.
    #[must_use]
    pub fn parse(payload: &str) -> Option<Self> {
        match serde_json::from_str::<Value>(payload) {
            Ok(Value::Object(fields)) => Some(Self { fields }),
            Ok(other) => {
                tracing::debug!(kind = %value_kind(&other), "Dropping non-object prediction payload");
                None
            }
            Err(e) => {
                tracing::debug!(error = %e, "Dropping undecodable prediction payload");
                None
            }
        }
    }

    /// Obstacle distance in meters, if the message carries one.
    ///
    /// Accepts `distance_m`, falling back to a numeric `distance` field.
    #[must_use]
    pub fn distance_m(&self) -> Option<f64> {
        self.fields
            .get("distance_m")
            .or_else(|| self.fields.get("distance"))
            .and_then(Value::as_f64)
    }

    /// Raw access to any pass-through field (labels, text feedback, latency).
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Number of fields in the message
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the message carries no fields at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

fn value_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// One outbound frame for the predictor: `{"frame": "<base64-jpeg>"}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameMessage {
    /// Base64-encoded JPEG bytes
    pub frame: String,
}

impl FrameMessage {
    /// Build a frame message from raw JPEG bytes.
    #[must_use]
    pub fn from_jpeg(bytes: &[u8]) -> Self {
        Self {
            frame: base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }

    /// Serialize to the wire text representation.
    ///
    /// Infallible in practice (a single string field), but kept fallible
    /// to match the serde boundary.
    pub fn to_wire(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_extracts_distance_m() {
        let msg = PredictionMessage::parse(r#"{"distance_m": 2.5, "labels": ["vehicles"]}"#)
            .expect("valid payload");
        assert_eq!(msg.distance_m(), Some(2.5));
        assert!(msg.field("labels").is_some());
    }

    #[test]
    fn parse_falls_back_to_distance_field() {
        let msg = PredictionMessage::parse(r#"{"distance": 0.9}"#).expect("valid payload");
        assert_eq!(msg.distance_m(), Some(0.9));
    }

    #[test]
    fn distance_missing_or_non_numeric_is_none() {
        let msg = PredictionMessage::parse(r#"{"text_feedback": "clear"}"#).expect("valid");
        assert_eq!(msg.distance_m(), None);

        let msg = PredictionMessage::parse(r#"{"distance": "close"}"#).expect("valid");
        assert_eq!(msg.distance_m(), None);
    }

    #[test]
    fn malformed_payloads_are_dropped() {
        assert!(PredictionMessage::parse("{truncated").is_none());
        assert!(PredictionMessage::parse("not json at all").is_none());
        assert!(PredictionMessage::parse("[1, 2, 3]").is_none());
        assert!(PredictionMessage::parse("42").is_none());
    }

    #[test]
    fn frame_message_wire_format() {
        let msg = FrameMessage::from_jpeg(&[0xFF, 0xD8, 0xFF]);
        let wire = msg.to_wire().expect("serializable");
        assert!(wire.starts_with(r#"{"frame":""#));

        let parsed: FrameMessage = serde_json::from_str(&wire).expect("round trip");
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(parsed.frame)
            .expect("valid base64");
        assert_eq!(decoded, vec![0xFF, 0xD8, 0xFF]);
    }
}
