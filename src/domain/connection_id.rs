//! Type-safe connection identifier.
//!
//! [`ConnectionId`] wraps the opaque identifier the transport assigns to
//! each WebSocket connection. The gateway generates one (UUID v4) at
//! upgrade time; clients never choose their own.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique identifier for one live WebSocket connection.
///
/// Generated once at upgrade time and immutable for the life of the
/// connection. Used as the connection half of
/// [`super::SubscriptionKey`] and as the routing key in the outbound
/// transport table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Creates a new random `ConnectionId` (UUID v4).
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Wraps an externally supplied identifier.
    ///
    /// Intended for tests and for transports that carry their own
    /// connection identity.
    #[must_use]
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
