//! Axum Router Configuration
//!
//! This module defines the complete HTTP routing for the application,
//! including the REST API, the transport bridge, and OpenAPI documentation.

use crate::{
    handlers,
    models::{
        CreateRoomPayload, CreateRoomResponse, ErrorResponse, GenerateTokenPayload,
        HealthResponse, TokenResponse,
    },
    state::AppState,
    ws::ws_handler,
};

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::generate_token,
        handlers::create_room,
    ),
    components(
        schemas(GenerateTokenPayload, TokenResponse, CreateRoomPayload, CreateRoomResponse, HealthResponse, ErrorResponse)
    ),
    tags(
        (name = "Room Agent API", description = "Room access tokens for the real-time agent")
    )
)]
pub struct ApiDoc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    let api_router = Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/generate-token", post(handlers::generate_token))
        .route("/api/create-room", post(handlers::create_room))
        .route("/agent/ws", get(ws_handler))
        .with_state(app_state);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_router)
}
