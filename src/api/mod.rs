//! REST API layer: route handlers and router composition.
//!
//! Observability endpoints live under `/api/v1`; the health check is
//! mounted at the root. The push channel itself is the WebSocket
//! endpoint (see [`crate::ws`]).

pub mod handlers;

use axum::Router;
use utoipa::OpenApi;

use crate::app_state::AppState;

/// OpenAPI document for the REST surface.
#[derive(Debug, OpenApi)]
#[openapi(
    paths(
        handlers::system::health_handler,
        handlers::resources::list_resources_handler,
        handlers::resources::get_resource_handler,
        handlers::resources::stats_handler,
    ),
    tags(
        (name = "System", description = "Health and service metadata"),
        (name = "Resources", description = "Resource catalog and live statistics"),
    )
)]
pub struct ApiDoc;

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    let router = Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::system::routes());

    #[cfg(feature = "swagger-ui")]
    let router = router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .url("/api-docs/openapi.json", ApiDoc::openapi()),
    );

    router
}
