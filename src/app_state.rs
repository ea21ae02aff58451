//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::catalog::ResourceCatalog;
use crate::domain::SubscriptionRegistry;
use crate::service::SubscriptionDispatcher;
use crate::ws::ChannelTransport;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Catalog of the resources this gateway serves.
    pub catalog: Arc<ResourceCatalog>,
    /// Store of all live subscriptions.
    pub registry: Arc<SubscriptionRegistry>,
    /// Subscription lifecycle orchestrator.
    pub dispatcher: Arc<SubscriptionDispatcher>,
    /// Outbound delivery table for WebSocket connections.
    pub transport: Arc<ChannelTransport>,
}
