//! Broadcast-backed resource feeds.
//!
//! A [`TypedFeed`] wraps a [`tokio::sync::broadcast`] channel carrying
//! [`FeedSignal`]s for one element type. Binding a sink spawns a pump
//! task that receives signals in order, applies the compiled filter,
//! and forwards matching events through the sink. Disposing the
//! returned handle aborts the pump, which synchronously detaches the
//! subscription from the feed.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::domain::SubscriptionHandle;
use crate::error::GatewayError;
use crate::service::NotificationSink;

use super::ResourceBinding;
use super::filter::{FilterCompiler, FilterPredicate};
use super::query::ResourceQuery;

/// One signal on a feed, mirroring the three notification kinds.
#[derive(Debug, Clone)]
pub enum FeedSignal<T> {
    /// A new event.
    Item(T),
    /// The feed failed; subscribers are notified and their pumps end.
    Error(String),
    /// The feed finished normally; subscribers are notified and their
    /// pumps end.
    Complete,
}

/// A named, typed event feed exposed to clients.
///
/// Producers keep the typed handle and publish through it; the catalog
/// stores it as a [`ResourceBinding`] trait object, which is what lets
/// the dispatcher stay generic over element types resolved only at
/// request time.
pub struct TypedFeed<T> {
    name: String,
    sender: broadcast::Sender<FeedSignal<T>>,
    compiler: Option<Arc<dyn FilterCompiler<T>>>,
}

impl<T> std::fmt::Debug for TypedFeed<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypedFeed")
            .field("name", &self.name)
            .field("accepts_filters", &self.compiler.is_some())
            .finish_non_exhaustive()
    }
}

impl<T: Clone> TypedFeed<T> {
    /// Creates a feed with the given broadcast ring capacity.
    ///
    /// Subscribers that fall more than `capacity` signals behind lose
    /// the oldest ones (logged, not fatal).
    #[must_use]
    pub fn new(name: impl Into<String>, capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            name: name.into(),
            sender,
            compiler: None,
        }
    }

    /// Attaches the filter compiler for this feed's element type.
    ///
    /// Feeds without a compiler reject filtered subscribe requests.
    #[must_use]
    pub fn with_compiler(mut self, compiler: Arc<dyn FilterCompiler<T>>) -> Self {
        self.compiler = Some(compiler);
        self
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received it; with no
    /// active subscribers the event is silently dropped.
    pub fn publish(&self, event: T) -> usize {
        self.sender.send(FeedSignal::Item(event)).unwrap_or(0)
    }

    /// Signals that the feed failed. Each subscriber receives an error
    /// envelope and its pump terminates.
    pub fn fail(&self, description: impl Into<String>) {
        let _ = self.sender.send(FeedSignal::Error(description.into()));
    }

    /// Signals normal completion. Each subscriber receives a completed
    /// envelope and its pump terminates.
    pub fn complete(&self) {
        let _ = self.sender.send(FeedSignal::Complete);
    }

    /// Returns the current number of attached subscription pumps.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl<T> ResourceBinding for TypedFeed<T>
where
    T: Clone + serde::Serialize + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn accepts_filters(&self) -> bool {
        self.compiler.is_some()
    }

    fn bind(
        &self,
        query: &ResourceQuery,
        sink: NotificationSink,
    ) -> Result<SubscriptionHandle, GatewayError> {
        let predicate: Option<FilterPredicate<T>> = match query.filter_expression() {
            Some(expression) => {
                let Some(compiler) = &self.compiler else {
                    return Err(GatewayError::FilterRejected {
                        resource: self.name.clone(),
                        reason: "resource does not accept filters".to_string(),
                    });
                };
                let predicate =
                    compiler
                        .compile(&expression)
                        .map_err(|error| GatewayError::FilterRejected {
                            resource: self.name.clone(),
                            reason: error.to_string(),
                        })?;
                Some(predicate)
            }
            None => None,
        };

        let receiver = self.sender.subscribe();
        let resource = self.name.clone();
        let task = tokio::spawn(pump(receiver, predicate, sink, resource));
        Ok(SubscriptionHandle::from_task(task))
    }
}

/// Forwards feed signals through the sink until the feed terminates.
///
/// Signals for one subscription arrive strictly in publish order;
/// ordering across subscriptions is unspecified.
async fn pump<T: Clone + serde::Serialize>(
    mut receiver: broadcast::Receiver<FeedSignal<T>>,
    predicate: Option<FilterPredicate<T>>,
    sink: NotificationSink,
    resource: String,
) {
    loop {
        match receiver.recv().await {
            Ok(FeedSignal::Item(event)) => {
                if predicate.as_ref().is_none_or(|matches| matches(&event)) {
                    sink.notify(&event);
                }
            }
            Ok(FeedSignal::Error(description)) => {
                sink.failed(&description);
                break;
            }
            Ok(FeedSignal::Complete) => {
                sink.completed();
                break;
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(resource = %resource, skipped, "subscription lagged behind feed");
            }
            Err(broadcast::error::RecvError::Closed) => {
                // All producers dropped the feed: same as completion.
                sink.completed();
                break;
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::indexing_slicing)]
mod tests {
    use std::time::Duration;

    use serde::Serialize;

    use crate::domain::{ConnectionId, EnvelopeKind};
    use crate::service::EnvelopeTransport;
    use crate::service::sink::tests::RecordingTransport;

    use super::super::filter::{FilterError, FnFilterCompiler};
    use super::*;

    #[derive(Debug, Clone, Serialize)]
    struct Order {
        price: u64,
    }

    fn price_compiler() -> Arc<dyn FilterCompiler<Order>> {
        Arc::new(FnFilterCompiler::new(|expression| {
            let threshold: u64 = expression
                .trim()
                .strip_prefix("Price gt ")
                .and_then(|rest| rest.parse().ok())
                .ok_or_else(|| FilterError::new(format!("unsupported filter: {expression}")))?;
            Ok(Box::new(move |order: &Order| order.price > threshold) as FilterPredicate<Order>)
        }))
    }

    fn sink_for(transport: &Arc<RecordingTransport>, conn: &ConnectionId) -> NotificationSink {
        NotificationSink::new(
            Arc::clone(transport) as Arc<dyn EnvelopeTransport>,
            conn.clone(),
            "Orders",
        )
    }

    async fn drain(transport: &RecordingTransport, conn: &ConnectionId, expected: usize) -> Vec<EnvelopeKind> {
        for _ in 0..50 {
            if transport.envelopes_for(conn).len() >= expected {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        transport
            .envelopes_for(conn)
            .iter()
            .map(|envelope| envelope.kind)
            .collect()
    }

    #[tokio::test]
    async fn unfiltered_subscription_receives_every_event() {
        let feed = TypedFeed::new("Orders", 16);
        let transport = Arc::new(RecordingTransport::default());
        let conn = ConnectionId::from_string("c1");

        let handle = feed.bind(&ResourceQuery::new(), sink_for(&transport, &conn));
        let Ok(handle) = handle else {
            panic!("bind failed");
        };

        feed.publish(Order { price: 50 });
        feed.publish(Order { price: 150 });

        let kinds = drain(&transport, &conn, 2).await;
        assert_eq!(kinds, vec![EnvelopeKind::Message, EnvelopeKind::Message]);
        handle.dispose();
    }

    #[tokio::test]
    async fn filtered_subscription_receives_matches_only() {
        let feed = TypedFeed::new("Orders", 16).with_compiler(price_compiler());
        let transport = Arc::new(RecordingTransport::default());
        let conn = ConnectionId::from_string("c1");

        let query = ResourceQuery::new().with_filter("Price gt 100");
        let handle = feed.bind(&query, sink_for(&transport, &conn));
        let Ok(handle) = handle else {
            panic!("bind failed");
        };

        feed.publish(Order { price: 50 });
        feed.publish(Order { price: 150 });

        let kinds = drain(&transport, &conn, 1).await;
        assert_eq!(kinds, vec![EnvelopeKind::Message]);
        let envelopes = transport.envelopes_for(&conn);
        let payload = envelopes
            .first()
            .and_then(|envelope| envelope.message.clone());
        assert_eq!(payload.map(|message| message["price"].clone()), Some(serde_json::json!(150)));
        handle.dispose();
    }

    #[tokio::test]
    async fn bad_filter_is_rejected_at_bind_time() {
        let feed = TypedFeed::new("Orders", 16).with_compiler(price_compiler());
        let transport = Arc::new(RecordingTransport::default());
        let conn = ConnectionId::from_string("c1");

        let query = ResourceQuery::new().with_filter("nonsense");
        let result = feed.bind(&query, sink_for(&transport, &conn));
        assert!(matches!(result, Err(GatewayError::FilterRejected { .. })));
    }

    #[tokio::test]
    async fn filter_on_filterless_feed_is_rejected() {
        let feed: TypedFeed<Order> = TypedFeed::new("Orders", 16);
        let transport = Arc::new(RecordingTransport::default());
        let conn = ConnectionId::from_string("c1");

        let query = ResourceQuery::new().with_filter("Price gt 100");
        let result = feed.bind(&query, sink_for(&transport, &conn));
        assert!(matches!(result, Err(GatewayError::FilterRejected { .. })));
    }

    #[tokio::test]
    async fn completion_reaches_the_subscriber() {
        let feed: TypedFeed<Order> = TypedFeed::new("Orders", 16);
        let transport = Arc::new(RecordingTransport::default());
        let conn = ConnectionId::from_string("c1");

        let handle = feed.bind(&ResourceQuery::new(), sink_for(&transport, &conn));
        assert!(handle.is_ok());

        feed.complete();

        let kinds = drain(&transport, &conn, 1).await;
        assert_eq!(kinds, vec![EnvelopeKind::Completed]);
    }

    #[tokio::test]
    async fn feed_error_reaches_the_subscriber() {
        let feed: TypedFeed<Order> = TypedFeed::new("Orders", 16);
        let transport = Arc::new(RecordingTransport::default());
        let conn = ConnectionId::from_string("c1");

        let handle = feed.bind(&ResourceQuery::new(), sink_for(&transport, &conn));
        assert!(handle.is_ok());

        feed.fail("upstream gone");

        let kinds = drain(&transport, &conn, 1).await;
        assert_eq!(kinds, vec![EnvelopeKind::Error]);
    }

    #[tokio::test]
    async fn subscriber_count_tracks_pumps() {
        let feed: TypedFeed<Order> = TypedFeed::new("Orders", 16);
        let transport = Arc::new(RecordingTransport::default());
        assert_eq!(feed.subscriber_count(), 0);

        let first = feed.bind(
            &ResourceQuery::new(),
            sink_for(&transport, &ConnectionId::from_string("c1")),
        );
        let second = feed.bind(
            &ResourceQuery::new(),
            sink_for(&transport, &ConnectionId::from_string("c2")),
        );
        assert!(first.is_ok() && second.is_ok());
        assert_eq!(feed.subscriber_count(), 2);

        if let Ok(handle) = first {
            handle.dispose();
        }
        // The aborted pump drops its receiver once the runtime reaps it.
        for _ in 0..50 {
            if feed.subscriber_count() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(feed.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn disposed_subscription_stops_receiving() {
        let feed: TypedFeed<Order> = TypedFeed::new("Orders", 16);
        let transport = Arc::new(RecordingTransport::default());
        let conn = ConnectionId::from_string("c1");

        let handle = feed.bind(&ResourceQuery::new(), sink_for(&transport, &conn));
        let Ok(handle) = handle else {
            panic!("bind failed");
        };

        feed.publish(Order { price: 1 });
        let _ = drain(&transport, &conn, 1).await;

        handle.dispose();
        tokio::time::sleep(Duration::from_millis(20)).await;

        feed.publish(Order { price: 2 });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(transport.envelopes_for(&conn).len(), 1);
    }
}
