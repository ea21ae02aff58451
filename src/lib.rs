//! # pulse-gateway
//!
//! WebSocket push gateway for live, filtered server-side event feeds.
//!
//! Clients connect over WebSocket, send plain-text subscribe requests
//! of the form `resourceName` or `resourceName;;;filterExpression`,
//! and receive an ordered stream of envelope frames — events,
//! completion, or error — for each resource until they unsubscribe or
//! disconnect. Re-sending a request for the same resource atomically
//! replaces the previous subscription.
//!
//! ## Architecture
//!
//! ```text
//! Clients (WebSocket, REST)
//!     │
//!     ├── WS Handler + Connection Loop (ws/)
//!     ├── REST Handlers (api/)
//!     │
//!     ├── SubscriptionDispatcher (service/)
//!     ├── NotificationSink (service/)
//!     │
//!     ├── SubscriptionRegistry (domain/)
//!     └── ResourceCatalog + TypedFeeds (catalog/)
//! ```

pub mod api;
pub mod app_state;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod error;
pub mod service;
pub mod ws;
