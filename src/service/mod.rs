//! Service layer: subscription dispatch and notification delivery.
//!
//! [`SubscriptionDispatcher`] orchestrates the lifecycle of every
//! subscription; [`NotificationSink`] carries feed signals to the
//! transport while isolating delivery failures from subscription
//! state.

pub mod dispatcher;
pub mod sink;

pub use dispatcher::{SUBSCRIBE_MARKER, SubscribeRequest, SubscriptionDispatcher};
pub use sink::{EnvelopeTransport, NotificationSink};
