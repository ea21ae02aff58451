//! Per-subscription notification sink.
//!
//! A [`NotificationSink`] is bound to one (connection, resource) pair.
//! It wraps each signal of the underlying feed in an
//! [`EventEnvelope`] and pushes it through the transport's send
//! primitive. Every transport failure is logged and swallowed: a
//! poison message must never propagate back into the feed, tear the
//! subscription down, or corrupt registry state. Only an explicit
//! unsubscribe or disconnect removes a subscription.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::domain::{ConnectionId, EventEnvelope};
use crate::error::TransportError;

/// Send primitive of the underlying transport.
///
/// Implementations serialize the envelope and enqueue it for the given
/// connection. Failures (serialization, connection gone, backpressure)
/// are reported to the caller, which must treat them as non-fatal.
pub trait EnvelopeTransport: Send + Sync {
    /// Delivers one envelope to one connection, best-effort.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] when the envelope cannot be
    /// serialized or the connection cannot accept it.
    fn send(&self, connection: &ConnectionId, envelope: &EventEnvelope) -> Result<(), TransportError>;
}

/// Callback set bridging one feed subscription to the transport.
pub struct NotificationSink {
    transport: Arc<dyn EnvelopeTransport>,
    connection: ConnectionId,
    resource: String,
}

impl NotificationSink {
    /// Binds a sink to a connection/resource pair.
    #[must_use]
    pub fn new(
        transport: Arc<dyn EnvelopeTransport>,
        connection: ConnectionId,
        resource: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            connection,
            resource: resource.into(),
        }
    }

    /// Delivers one event from the feed.
    pub fn notify<T: Serialize>(&self, event: &T) {
        match serde_json::to_value(event) {
            Ok(payload) => {
                self.push(EventEnvelope::message(self.resource.clone(), payload));
            }
            Err(error) => {
                tracing::error!(
                    connection = %self.connection,
                    resource = %self.resource,
                    %error,
                    "error serializing event payload"
                );
            }
        }
    }

    /// Signals that the feed completed normally.
    pub fn completed(&self) {
        self.push(EventEnvelope::completed(self.resource.clone()));
    }

    /// Signals that the feed failed.
    pub fn failed(&self, description: &str) {
        self.push(EventEnvelope::error(self.resource.clone(), description));
    }

    fn push(&self, envelope: EventEnvelope) {
        if let Err(error) = self.transport.send(&self.connection, &envelope) {
            tracing::error!(
                connection = %self.connection,
                resource = %self.resource,
                %error,
                "error sending message"
            );
        }
    }
}

impl fmt::Debug for NotificationSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationSink")
            .field("connection", &self.connection)
            .field("resource", &self.resource)
            .finish_non_exhaustive()
    }
}
