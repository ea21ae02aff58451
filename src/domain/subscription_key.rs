//! Composite key identifying one subscription.
//!
//! A [`SubscriptionKey`] joins a connection identifier and a resource
//! name with the reserved [`KEY_SEPARATOR`]. Connection identifiers are
//! server-generated UUIDs and the catalog rejects resource names
//! containing the separator, so the mapping from (connection, resource)
//! to key is injective.

use std::fmt;

use super::ConnectionId;

/// Separator between the connection and resource halves of a key.
///
/// Must not occur in either component; `:` is not a valid UUID
/// character and the catalog refuses resource names containing it.
pub const KEY_SEPARATOR: char = ':';

/// Unique identity of one (connection, resource) subscription.
///
/// The registry stores at most one live subscription per key; a second
/// request for the same key replaces the first.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionKey(String);

impl SubscriptionKey {
    /// Derives the key for a connection/resource pair.
    #[must_use]
    pub fn new(connection: &ConnectionId, resource: &str) -> Self {
        Self(format!("{connection}{KEY_SEPARATOR}{resource}"))
    }

    /// Returns `true` if this key belongs to the given connection.
    #[must_use]
    pub fn belongs_to(&self, connection: &ConnectionId) -> bool {
        let conn = connection.as_str();
        self.0.len() > conn.len()
            && self.0.starts_with(conn)
            && self.0.as_bytes().get(conn.len()) == Some(&(KEY_SEPARATOR as u8))
    }

    /// Returns the resource half of the key.
    #[must_use]
    pub fn resource(&self) -> &str {
        self.0
            .split_once(KEY_SEPARATOR)
            .map_or("", |(_, resource)| resource)
    }
}

impl fmt::Display for SubscriptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
