//! WebSocket layer: upgrade handling, the per-connection loop, and the
//! outbound transport table.
//!
//! The WebSocket endpoint at `/ws` is the push channel: clients send
//! plain-text subscribe requests and receive envelope frames until
//! they unsubscribe or disconnect.

pub mod connection;
pub mod handler;
pub mod transport;

pub use transport::ChannelTransport;
