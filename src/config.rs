//! Gateway configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment
//! variables (or a `.env` file via `dotenvy`), with sensible defaults
//! when unset.

use std::net::SocketAddr;

/// Top-level gateway configuration.
///
/// Loaded once at startup via [`GatewayConfig::from_env`].
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:3000`).
    pub listen_addr: SocketAddr,

    /// Ring capacity of each resource feed's broadcast channel.
    /// Subscribers that lag further than this lose the oldest events.
    pub feed_capacity: usize,

    /// Capacity of each connection's outbound envelope queue.
    pub outbound_queue_capacity: usize,

    /// Whether to register the built-in demo feeds at startup.
    pub demo_feeds_enabled: bool,

    /// Interval between demo tick events, in milliseconds.
    pub tick_interval_ms: u64,
}

impl GatewayConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to sensible defaults when a variable is not set.
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns an error if `LISTEN_ADDR` is set but cannot be parsed
    /// as a [`SocketAddr`].
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();

        let listen_addr: SocketAddr = std::env::var("LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
            .parse()?;

        let feed_capacity = parse_env("FEED_CAPACITY", 1024);
        let outbound_queue_capacity = parse_env("OUTBOUND_QUEUE_CAPACITY", 256);
        let demo_feeds_enabled = parse_env_bool("DEMO_FEEDS_ENABLED", true);
        let tick_interval_ms = parse_env("TICK_INTERVAL_MS", 1000);

        Ok(Self {
            listen_addr,
            feed_capacity,
            outbound_queue_capacity,
            demo_feeds_enabled,
            tick_interval_ms,
        })
    }
}

/// Parses an environment variable as `T`, returning `default` on
/// missing or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Parses an environment variable as a boolean. Accepts `"true"`,
/// `"1"`, `"false"`, `"0"` (case-insensitive). Returns `default`
/// otherwise.
fn parse_env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key).ok().as_deref() {
        Some("true") | Some("TRUE") | Some("1") => true,
        Some("false") | Some("FALSE") | Some("0") => false,
        _ => default,
    }
}
