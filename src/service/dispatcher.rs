//! Subscription dispatcher: turns inbound filter requests into live,
//! registered subscriptions and tears them down on disconnect.
//!
//! Request lifecycle: decode the raw message, resolve the resource
//! against the catalog, merge the filter into the session query, bind a
//! notification sink to the feed, and register the resulting handle.
//! Re-sending a request for the same resource atomically replaces the
//! previous subscription. The caller runs [`SubscriptionDispatcher::handle_request`]
//! off the connection's inbound loop (a spawned task), so a slow bind
//! never stalls other inbound messages.

use std::fmt;
use std::sync::Arc;

use crate::catalog::{ResourceBinding, ResourceCatalog, ResourceQuery};
use crate::domain::{ConnectionId, SubscriptionRegistry};
use crate::error::GatewayError;

use super::sink::{EnvelopeTransport, NotificationSink};

/// Marker separating the resource name from the filter body in an
/// inbound subscribe message. Guaranteed absent from well-formed
/// resource names (the catalog enforces this) and filter bodies.
pub const SUBSCRIBE_MARKER: &str = ";;;";

/// A decoded inbound subscribe message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscribeRequest {
    /// Resource the client wants events from.
    pub resource: String,
    /// Optional filter body restricting which events are delivered.
    pub filter: Option<String>,
}

impl SubscribeRequest {
    /// Decodes a raw inbound message.
    ///
    /// Accepted shapes are `resourceName` and
    /// `resourceName;;;filterExpression`. Anything else — an empty
    /// message, an empty resource name, or the wrong number of parts
    /// after splitting on the marker — yields `None` and is discarded
    /// without error (availability over strictness).
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.is_empty() {
            return None;
        }
        if !raw.contains(SUBSCRIBE_MARKER) {
            return Some(Self {
                resource: raw.to_string(),
                filter: None,
            });
        }
        let parts: Vec<&str> = raw.split(SUBSCRIBE_MARKER).collect();
        match parts.as_slice() {
            [resource, filter] if !resource.is_empty() => Some(Self {
                resource: (*resource).to_string(),
                filter: Some((*filter).to_string()),
            }),
            _ => None,
        }
    }
}

/// Orchestrates the subscription lifecycle for every connection.
///
/// Stateless coordinator: owns references to the [`ResourceCatalog`]
/// for resolution, the [`SubscriptionRegistry`] for state, and the
/// transport for sink construction.
#[derive(Clone)]
pub struct SubscriptionDispatcher {
    catalog: Arc<ResourceCatalog>,
    registry: Arc<SubscriptionRegistry>,
    transport: Arc<dyn EnvelopeTransport>,
}

impl SubscriptionDispatcher {
    /// Creates a new `SubscriptionDispatcher`.
    #[must_use]
    pub fn new(
        catalog: Arc<ResourceCatalog>,
        registry: Arc<SubscriptionRegistry>,
        transport: Arc<dyn EnvelopeTransport>,
    ) -> Self {
        Self {
            catalog,
            registry,
            transport,
        }
    }

    /// Returns a reference to the inner [`SubscriptionRegistry`].
    #[must_use]
    pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
        &self.registry
    }

    /// Returns a reference to the inner [`ResourceCatalog`].
    #[must_use]
    pub fn catalog(&self) -> &Arc<ResourceCatalog> {
        &self.catalog
    }

    /// Processes one inbound subscribe message for `connection`.
    ///
    /// `session` carries the decoded query parameters of the
    /// connection's upgrade request; a filter body in the message is
    /// merged over them. Returns `true` if a subscription was
    /// installed or replaced, `false` if the message was malformed and
    /// discarded.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::UnknownResource`] if the resource is
    /// not in the catalog and [`GatewayError::FilterRejected`] if the
    /// filter fails to compile. Either way no subscription is created
    /// or modified.
    pub fn handle_request(
        &self,
        connection: &ConnectionId,
        raw: &str,
        session: &ResourceQuery,
    ) -> Result<bool, GatewayError> {
        let Some(request) = SubscribeRequest::parse(raw) else {
            tracing::debug!(connection = %connection, "discarding malformed subscribe message");
            return Ok(false);
        };

        let binding = self
            .catalog
            .resolve(&request.resource)
            .ok_or_else(|| GatewayError::UnknownResource(request.resource.clone()))?;

        let query = match request.filter.as_deref() {
            Some(filter) => session.clone().with_filter(filter),
            None => session.clone(),
        };

        tracing::debug!(
            connection = %connection,
            resource = %request.resource,
            filter = query.filter().unwrap_or("Unfiltered"),
            "binding subscription"
        );

        let sink = NotificationSink::new(
            Arc::clone(&self.transport),
            connection.clone(),
            request.resource.clone(),
        );
        let handle = binding.bind(&query, sink)?;

        let inserted = self
            .registry
            .add_or_update(connection, &request.resource, handle);

        tracing::debug!(
            connection = %connection,
            resource = %request.resource,
            inserted,
            total = self.registry.count(),
            "subscription registered"
        );
        Ok(true)
    }

    /// Removes one subscription explicitly.
    ///
    /// Returns `true` if a subscription existed and was disposed.
    pub fn unsubscribe(&self, connection: &ConnectionId, resource: &str) -> bool {
        let removed = self.registry.try_remove(connection, resource);
        if removed {
            tracing::debug!(
                connection = %connection,
                resource = %resource,
                total = self.registry.count(),
                "subscription removed"
            );
        }
        removed
    }

    /// Tears down every subscription owned by a closed connection.
    ///
    /// Returns the number of subscriptions removed.
    pub fn connection_closed(&self, connection: &ConnectionId) -> usize {
        let removed = self.registry.remove_all(connection);
        tracing::debug!(
            connection = %connection,
            removed,
            remaining = self.registry.count(),
            "connection closed, subscriptions torn down"
        );
        removed
    }
}

impl fmt::Debug for SubscriptionDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionDispatcher")
            .field("catalog", &self.catalog)
            .field("subscriptions", &self.registry.count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use serde::Serialize;

    use crate::catalog::{FilterError, FnFilterCompiler, TypedFeed};
    use crate::domain::EnvelopeKind;
    use crate::service::sink::tests::RecordingTransport;

    use super::*;

    #[derive(Debug, Clone, Serialize)]
    struct Order {
        price: u64,
    }

    fn orders_feed() -> Arc<TypedFeed<Order>> {
        Arc::new(
            TypedFeed::new("Orders", 64).with_compiler(Arc::new(FnFilterCompiler::new(
                |expression: &str| {
                    let threshold: u64 = expression
                        .trim()
                        .strip_prefix("Price gt ")
                        .and_then(|rest| rest.parse().ok())
                        .ok_or_else(|| FilterError::new(format!("unsupported: {expression}")))?;
                    Ok(Box::new(move |order: &Order| order.price > threshold)
                        as crate::catalog::FilterPredicate<Order>)
                },
            ))),
        )
    }

    struct Fixture {
        dispatcher: SubscriptionDispatcher,
        transport: Arc<RecordingTransport>,
        feed: Arc<TypedFeed<Order>>,
    }

    fn fixture() -> Fixture {
        let feed = orders_feed();
        let mut catalog = ResourceCatalog::new();
        let registered = catalog.register(Arc::clone(&feed) as Arc<dyn crate::catalog::ResourceBinding>);
        assert!(registered.is_ok());

        let transport = Arc::new(RecordingTransport::default());
        let dispatcher = SubscriptionDispatcher::new(
            Arc::new(catalog),
            Arc::new(SubscriptionRegistry::new()),
            Arc::clone(&transport) as Arc<dyn EnvelopeTransport>,
        );
        Fixture {
            dispatcher,
            transport,
            feed,
        }
    }

    #[test]
    fn parse_bare_resource() {
        assert_eq!(
            SubscribeRequest::parse("Orders"),
            Some(SubscribeRequest {
                resource: "Orders".to_string(),
                filter: None,
            })
        );
    }

    #[test]
    fn parse_resource_with_filter() {
        assert_eq!(
            SubscribeRequest::parse("Orders;;;Price gt 100"),
            Some(SubscribeRequest {
                resource: "Orders".to_string(),
                filter: Some("Price gt 100".to_string()),
            })
        );
    }

    #[test]
    fn parse_rejects_malformed_messages() {
        assert_eq!(SubscribeRequest::parse(""), None);
        assert_eq!(SubscribeRequest::parse(";;;Price gt 100"), None);
        assert_eq!(SubscribeRequest::parse("a;;;b;;;c"), None);
    }

    #[test]
    fn parse_keeps_empty_filter_body() {
        // "Orders;;;" decodes to an empty filter body; whether that is
        // acceptable is the compiler's call.
        assert_eq!(
            SubscribeRequest::parse("Orders;;;"),
            Some(SubscribeRequest {
                resource: "Orders".to_string(),
                filter: Some(String::new()),
            })
        );
    }

    #[tokio::test]
    async fn subscribe_registers_one_subscription() {
        let fx = fixture();
        let conn = ConnectionId::from_string("c1");

        let result = fx
            .dispatcher
            .handle_request(&conn, "Orders", &ResourceQuery::new());
        assert_eq!(result.ok(), Some(true));
        assert_eq!(fx.dispatcher.registry().count(), 1);
        assert!(fx.dispatcher.registry().try_get(&conn, "Orders").is_some());
    }

    #[tokio::test]
    async fn refilter_replaces_instead_of_duplicating() {
        let fx = fixture();
        let conn = ConnectionId::from_string("c1");

        let first = fx
            .dispatcher
            .handle_request(&conn, "Orders", &ResourceQuery::new());
        assert!(first.is_ok());
        let original = fx.dispatcher.registry().try_get(&conn, "Orders");
        let Some(original) = original else {
            panic!("expected a live subscription");
        };

        let second =
            fx.dispatcher
                .handle_request(&conn, "Orders;;;Price gt 100", &ResourceQuery::new());
        assert!(second.is_ok());

        // Still exactly one subscription; the first handle was disposed.
        assert_eq!(fx.dispatcher.registry().count(), 1);
        assert!(original.is_disposed());
        let replacement = fx.dispatcher.registry().try_get(&conn, "Orders");
        assert!(replacement.is_some_and(|handle| !handle.is_disposed()));
    }

    #[tokio::test]
    async fn filtered_subscription_delivers_matches_only() {
        let fx = fixture();
        let conn = ConnectionId::from_string("c1");

        let result =
            fx.dispatcher
                .handle_request(&conn, "Orders;;;Price gt 100", &ResourceQuery::new());
        assert!(result.is_ok());

        fx.feed.publish(Order { price: 99 });
        fx.feed.publish(Order { price: 101 });

        for _ in 0..50 {
            if !fx.transport.envelopes_for(&conn).is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        let envelopes = fx.transport.envelopes_for(&conn);
        assert_eq!(envelopes.len(), 1);
        assert_eq!(
            envelopes.first().map(|envelope| envelope.kind),
            Some(EnvelopeKind::Message)
        );
    }

    #[tokio::test]
    async fn unknown_resource_is_a_distinct_error_and_mutates_nothing() {
        let fx = fixture();
        let conn = ConnectionId::from_string("c1");

        let result = fx
            .dispatcher
            .handle_request(&conn, "Bogus", &ResourceQuery::new());
        assert!(matches!(result, Err(GatewayError::UnknownResource(name)) if name == "Bogus"));
        assert_eq!(fx.dispatcher.registry().count(), 0);
    }

    #[tokio::test]
    async fn rejected_filter_mutates_nothing() {
        let fx = fixture();
        let conn = ConnectionId::from_string("c1");

        let result =
            fx.dispatcher
                .handle_request(&conn, "Orders;;;garbage", &ResourceQuery::new());
        assert!(matches!(result, Err(GatewayError::FilterRejected { .. })));
        assert_eq!(fx.dispatcher.registry().count(), 0);
    }

    #[tokio::test]
    async fn rejected_filter_keeps_existing_subscription() {
        let fx = fixture();
        let conn = ConnectionId::from_string("c1");

        let first = fx
            .dispatcher
            .handle_request(&conn, "Orders", &ResourceQuery::new());
        assert!(first.is_ok());

        let second = fx
            .dispatcher
            .handle_request(&conn, "Orders;;;garbage", &ResourceQuery::new());
        assert!(second.is_err());

        assert_eq!(fx.dispatcher.registry().count(), 1);
        let live = fx.dispatcher.registry().try_get(&conn, "Orders");
        assert!(live.is_some_and(|handle| !handle.is_disposed()));
    }

    #[tokio::test]
    async fn malformed_message_is_discarded_silently() {
        let fx = fixture();
        let conn = ConnectionId::from_string("c1");

        for raw in ["", ";;;x", "a;;;b;;;c"] {
            let result = fx.dispatcher.handle_request(&conn, raw, &ResourceQuery::new());
            assert_eq!(result.ok(), Some(false), "expected silent discard for {raw:?}");
        }
        assert_eq!(fx.dispatcher.registry().count(), 0);
    }

    #[tokio::test]
    async fn disconnect_tears_down_only_that_connection() {
        let fx = fixture();
        let c1 = ConnectionId::from_string("c1");
        let c2 = ConnectionId::from_string("c2");

        let first = fx.dispatcher.handle_request(&c1, "Orders", &ResourceQuery::new());
        let second = fx.dispatcher.handle_request(&c2, "Orders", &ResourceQuery::new());
        assert!(first.is_ok() && second.is_ok());
        assert_eq!(fx.dispatcher.registry().count(), 2);

        assert_eq!(fx.dispatcher.connection_closed(&c1), 1);
        assert_eq!(fx.dispatcher.registry().count(), 1);
        assert!(fx.dispatcher.registry().try_get(&c2, "Orders").is_some());
    }

    #[tokio::test]
    async fn unsubscribe_removes_one_subscription() {
        let fx = fixture();
        let conn = ConnectionId::from_string("c1");

        let result = fx
            .dispatcher
            .handle_request(&conn, "Orders", &ResourceQuery::new());
        assert!(result.is_ok());

        assert!(fx.dispatcher.unsubscribe(&conn, "Orders"));
        assert!(!fx.dispatcher.unsubscribe(&conn, "Orders"));
        assert_eq!(fx.dispatcher.registry().count(), 0);
    }

    #[tokio::test]
    async fn session_query_filter_applies_to_bare_subscribe() {
        // A $filter carried by the upgrade request's query string
        // filters even a bare subscribe message.
        let fx = fixture();
        let conn = ConnectionId::from_string("c1");
        let session = ResourceQuery::new().with_filter("Price gt 100");

        let result = fx.dispatcher.handle_request(&conn, "Orders", &session);
        assert!(result.is_ok());

        fx.feed.publish(Order { price: 50 });
        fx.feed.publish(Order { price: 150 });

        for _ in 0..50 {
            if !fx.transport.envelopes_for(&conn).is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(fx.transport.envelopes_for(&conn).len(), 1);
    }
}
