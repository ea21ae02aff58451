//! Uniform outbound notification shape.
//!
//! Every notification pushed to a client is an [`EventEnvelope`]
//! tagged with the resource it originated from. Event payloads ride in
//! `message`, stream failures in `error_message`; completion carries
//! neither.

use serde::{Deserialize, Serialize};

/// Discriminator for the three notification kinds a feed can emit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EnvelopeKind {
    /// A matching event from the feed.
    Message,
    /// The feed finished normally; no further notifications follow.
    Completed,
    /// The feed failed; no further notifications follow.
    Error,
}

/// One outbound notification for one subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Name of the resource this notification belongs to.
    pub resource: String,
    /// Notification kind discriminator.
    #[serde(rename = "type")]
    pub kind: EnvelopeKind,
    /// Event payload; present only when `kind` is `Message`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<serde_json::Value>,
    /// Failure description; present only when `kind` is `Error`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl EventEnvelope {
    /// Wraps an event payload for delivery.
    #[must_use]
    pub fn message(resource: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            resource: resource.into(),
            kind: EnvelopeKind::Message,
            message: Some(payload),
            error_message: None,
        }
    }

    /// Signals normal completion of the feed.
    #[must_use]
    pub fn completed(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            kind: EnvelopeKind::Completed,
            message: None,
            error_message: None,
        }
    }

    /// Signals a feed failure with a human-readable description.
    #[must_use]
    pub fn error(resource: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            kind: EnvelopeKind::Error,
            message: None,
            error_message: Some(description.into()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn message_envelope_carries_payload_only() {
        let envelope = EventEnvelope::message("Orders", serde_json::json!({"price": 42}));
        let json = serde_json::to_value(&envelope).ok();
        let Some(json) = json else {
            panic!("serialization failed");
        };
        assert_eq!(json["resource"], "Orders");
        assert_eq!(json["type"], "message");
        assert_eq!(json["message"]["price"], 42);
        assert!(json.get("error_message").is_none());
    }

    #[test]
    fn completed_envelope_has_no_body() {
        let envelope = EventEnvelope::completed("Orders");
        let json = serde_json::to_value(&envelope).ok();
        let Some(json) = json else {
            panic!("serialization failed");
        };
        assert_eq!(json["type"], "completed");
        assert!(json.get("message").is_none());
        assert!(json.get("error_message").is_none());
    }

    #[test]
    fn error_envelope_carries_description_only() {
        let envelope = EventEnvelope::error("Orders", "feed exploded");
        let json = serde_json::to_value(&envelope).ok();
        let Some(json) = json else {
            panic!("serialization failed");
        };
        assert_eq!(json["type"], "error");
        assert_eq!(json["error_message"], "feed exploded");
        assert!(json.get("message").is_none());
    }
}
