//! pulse-gateway server entry point.
//!
//! Starts the Axum HTTP server with the WebSocket push endpoint and
//! the REST observability endpoints, and (unless disabled) registers
//! the built-in demo feeds so the gateway serves events out of the
//! box.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::get;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use pulse_gateway::api;
use pulse_gateway::app_state::AppState;
use pulse_gateway::catalog::{
    FilterError, FilterPredicate, FnFilterCompiler, ResourceBinding, ResourceCatalog, TypedFeed,
};
use pulse_gateway::config::GatewayConfig;
use pulse_gateway::domain::SubscriptionRegistry;
use pulse_gateway::service::{EnvelopeTransport, SubscriptionDispatcher};
use pulse_gateway::ws::ChannelTransport;
use pulse_gateway::ws::handler::ws_handler;

/// Event published by the built-in demo tick feed.
#[derive(Debug, Clone, Serialize)]
struct TickEvent {
    /// Monotonically increasing tick number.
    sequence: u64,
    /// Publish time.
    timestamp: DateTime<Utc>,
}

/// Filter compiler for the tick feed: the expression is a minimum
/// sequence number.
fn tick_compiler() -> FnFilterCompiler<TickEvent> {
    FnFilterCompiler::new(|expression| {
        let min_sequence: u64 = expression.trim().parse().map_err(|_| {
            FilterError::new(format!("expected a minimum sequence number, got {expression:?}"))
        })?;
        Ok(Box::new(move |tick: &TickEvent| tick.sequence >= min_sequence)
            as FilterPredicate<TickEvent>)
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = GatewayConfig::from_env()?;
    tracing::info!(addr = %config.listen_addr, "starting pulse-gateway");

    // Build the resource catalog
    let mut catalog = ResourceCatalog::new();
    let mut tick_feed = None;
    if config.demo_feeds_enabled {
        let feed = Arc::new(
            TypedFeed::new("ServerTicks", config.feed_capacity)
                .with_compiler(Arc::new(tick_compiler())),
        );
        catalog.register(Arc::clone(&feed) as Arc<dyn ResourceBinding>)?;
        tick_feed = Some(feed);
    }
    let catalog = Arc::new(catalog);
    tracing::info!(resources = ?catalog.names(), "resource catalog ready");

    // Build domain and service layers
    let registry = Arc::new(SubscriptionRegistry::new());
    let transport = Arc::new(ChannelTransport::new(config.outbound_queue_capacity));
    let dispatcher = Arc::new(SubscriptionDispatcher::new(
        Arc::clone(&catalog),
        Arc::clone(&registry),
        Arc::clone(&transport) as Arc<dyn EnvelopeTransport>,
    ));

    // Start the demo producer
    if let Some(feed) = tick_feed {
        let interval_ms = config.tick_interval_ms;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_millis(interval_ms.max(1)));
            let mut sequence: u64 = 0;
            loop {
                interval.tick().await;
                sequence = sequence.wrapping_add(1);
                feed.publish(TickEvent {
                    sequence,
                    timestamp: Utc::now(),
                });
            }
        });
    }

    // Build application state
    let app_state = AppState {
        catalog,
        registry,
        dispatcher,
        transport,
    };

    // Build router
    let app = Router::new()
        .merge(api::build_router())
        .route("/ws", get(ws_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(TimeoutLayer::new(Duration::from_secs(30))),
        )
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
