//! Outbound delivery table for WebSocket connections.
//!
//! [`ChannelTransport`] maps each live [`ConnectionId`] to the sending
//! half of its outbound queue. Subscription pumps call
//! [`EnvelopeTransport::send`] from whatever task the feed delivers
//! on; the connection's write loop drains the queue onto the socket.

use dashmap::DashMap;
use tokio::sync::mpsc;

use crate::domain::{ConnectionId, EventEnvelope};
use crate::error::TransportError;
use crate::service::EnvelopeTransport;

/// Channel-backed [`EnvelopeTransport`] implementation.
#[derive(Debug)]
pub struct ChannelTransport {
    connections: DashMap<ConnectionId, mpsc::Sender<String>>,
    queue_capacity: usize,
}

impl ChannelTransport {
    /// Creates a transport whose per-connection outbound queues hold
    /// up to `queue_capacity` serialized envelopes.
    #[must_use]
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            connections: DashMap::new(),
            queue_capacity,
        }
    }

    /// Registers a connection and returns the receiving half of its
    /// outbound queue for the write loop to drain.
    #[must_use]
    pub fn register(&self, connection: ConnectionId) -> mpsc::Receiver<String> {
        let (sender, receiver) = mpsc::channel(self.queue_capacity);
        self.connections.insert(connection, sender);
        receiver
    }

    /// Drops a connection's outbound queue. Subsequent sends to it
    /// fail with [`TransportError::ConnectionGone`].
    pub fn unregister(&self, connection: &ConnectionId) {
        self.connections.remove(connection);
    }

    /// Returns the number of currently registered connections.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}

impl EnvelopeTransport for ChannelTransport {
    fn send(
        &self,
        connection: &ConnectionId,
        envelope: &EventEnvelope,
    ) -> Result<(), TransportError> {
        let Some(sender) = self
            .connections
            .get(connection)
            .map(|entry| entry.value().clone())
        else {
            return Err(TransportError::ConnectionGone(connection.clone()));
        };

        let json = serde_json::to_string(envelope)?;

        sender.try_send(json).map_err(|error| match error {
            mpsc::error::TrySendError::Full(_) => TransportError::QueueFull(connection.clone()),
            mpsc::error::TrySendError::Closed(_) => {
                TransportError::ConnectionGone(connection.clone())
            }
        })
    }
}
