//! Resource catalog and subscription statistics endpoints.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use utoipa::ToSchema;

use crate::app_state::AppState;
use crate::catalog::ResourceBinding;
use crate::error::GatewayError;

/// Metadata for one registered resource.
#[derive(Debug, Serialize, ToSchema)]
pub struct ResourceInfo {
    /// Catalog name clients subscribe with.
    name: String,
    /// Whether the resource accepts filtered subscriptions.
    accepts_filters: bool,
}

/// Live gateway statistics.
#[derive(Debug, Serialize, ToSchema)]
pub struct StatsResponse {
    /// Currently open WebSocket connections.
    connections: usize,
    /// Live subscriptions across all connections.
    subscriptions: usize,
    /// Registered resources.
    resources: usize,
}

/// `GET /api/v1/resources` — List all registered resources.
#[utoipa::path(
    get,
    path = "/api/v1/resources",
    tag = "Resources",
    summary = "List resources",
    description = "Returns the name and filter capability of every resource in the catalog.",
    responses(
        (status = 200, description = "Resource catalog", body = Vec<ResourceInfo>),
    )
)]
pub async fn list_resources_handler(State(state): State<AppState>) -> Json<Vec<ResourceInfo>> {
    let resources = state
        .catalog
        .names()
        .into_iter()
        .filter_map(|name| state.catalog.resolve(name))
        .map(|binding| ResourceInfo {
            name: binding.name().to_string(),
            accepts_filters: binding.accepts_filters(),
        })
        .collect();
    Json(resources)
}

/// `GET /api/v1/resources/{name}` — Look up one resource.
///
/// # Errors
///
/// Returns [`GatewayError::UnknownResource`] (HTTP 404) if no resource
/// with the given name is registered.
#[utoipa::path(
    get,
    path = "/api/v1/resources/{name}",
    tag = "Resources",
    summary = "Get one resource",
    description = "Returns metadata for a single resource, or 404 if the name is unknown.",
    params(
        ("name" = String, Path, description = "Resource name"),
    ),
    responses(
        (status = 200, description = "Resource metadata", body = ResourceInfo),
        (status = 404, description = "Unknown resource"),
    )
)]
pub async fn get_resource_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ResourceInfo>, GatewayError> {
    let binding = state
        .catalog
        .resolve(&name)
        .ok_or(GatewayError::UnknownResource(name))?;
    Ok(Json(ResourceInfo {
        name: binding.name().to_string(),
        accepts_filters: binding.accepts_filters(),
    }))
}

/// `GET /api/v1/stats` — Live connection and subscription counts.
#[utoipa::path(
    get,
    path = "/api/v1/stats",
    tag = "Resources",
    summary = "Gateway statistics",
    description = "Returns live counts of connections, subscriptions, and resources.",
    responses(
        (status = 200, description = "Current statistics", body = StatsResponse),
    )
)]
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        connections: state.transport.connection_count(),
        subscriptions: state.registry.count(),
        resources: state.catalog.len(),
    })
}

/// Builds the resource routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/resources", get(list_resources_handler))
        .route("/resources/{name}", get(get_resource_handler))
        .route("/stats", get(stats_handler))
}
