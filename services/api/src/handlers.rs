//! Axum Handlers for the REST API
//!
//! This module contains the logic for handling HTTP requests for room access.
//! It uses `utoipa` doc comments to generate OpenAPI documentation.

use axum::{
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use roomagent_core::{TokenError, TokenIssuer};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::{
    models::{
        CreateRoomPayload, CreateRoomResponse, ErrorResponse, GenerateTokenPayload,
        HealthResponse, TokenResponse,
    },
    state::AppState,
};

pub const LIVEKIT_NOT_CONFIGURED: &str = "LiveKit environment variables not set";

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Configuration(String),
    InternalServerError {
        message: String,
        details: Option<String>,
    },
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(error) => (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error,
                    details: None,
                }),
            )
                .into_response(),
            ApiError::Configuration(error) => {
                error!("Configuration error: {}", error);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse {
                        error,
                        details: None,
                    }),
                )
                    .into_response()
            }
            ApiError::InternalServerError { message, details } => {
                error!(details = ?details, "Internal Server Error: {}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse {
                        error: message,
                        details,
                    }),
                )
                    .into_response()
            }
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Validation(message) => ApiError::BadRequest(message),
            TokenError::Configuration(message) => ApiError::Configuration(message),
            other => ApiError::InternalServerError {
                message: "Failed to generate token".to_string(),
                details: Some(other.to_string()),
            },
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        warn!(status = %rejection.status(), "Rejected request body: {}", rejection.body_text());
        ApiError::BadRequest(rejection.body_text())
    }
}

fn configured_issuer(state: &AppState) -> Result<&TokenIssuer, ApiError> {
    state
        .token_issuer
        .as_ref()
        .ok_or_else(|| ApiError::Configuration(LIVEKIT_NOT_CONFIGURED.to_string()))
}

/// Liveness check.
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is alive", body = HealthResponse)
    )
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Issue a join token for a room.
#[utoipa::path(
    post,
    path = "/api/generate-token",
    request_body = GenerateTokenPayload,
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 400, description = "The body is malformed or a required field is missing", body = ErrorResponse),
        (status = 500, description = "LiveKit is not configured or signing failed", body = ErrorResponse)
    )
)]
pub async fn generate_token(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<GenerateTokenPayload>, JsonRejection>,
) -> Result<Json<TokenResponse>, ApiError> {
    let issuer = configured_issuer(&state)?;
    let Json(payload) = payload?;

    let (room_name, participant_name, participant_identity) =
        payload.required_fields().map_err(|missing| {
            warn!(missing = ?missing, "Missing required fields for token generation");
            ApiError::BadRequest(
                "Room name, participant name, and participant identity are required".to_string(),
            )
        })?;

    info!(
        room = room_name,
        participant = participant_identity,
        livekit_url = state.config.livekit_url.as_deref(),
        "Generating token"
    );
    let token = issuer.issue(room_name, participant_name, participant_identity)?;
    info!(room = room_name, "Token generated successfully");

    Ok(Json(TokenResponse { token }))
}

/// Register a room.
///
/// The media provider creates rooms lazily on first join, so this only
/// validates the name.
#[utoipa::path(
    post,
    path = "/api/create-room",
    request_body = CreateRoomPayload,
    responses(
        (status = 200, description = "Room accepted", body = CreateRoomResponse),
        (status = 400, description = "The body is malformed or the room name is missing", body = ErrorResponse),
        (status = 500, description = "LiveKit is not configured", body = ErrorResponse)
    )
)]
pub async fn create_room(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateRoomPayload>, JsonRejection>,
) -> Result<Json<CreateRoomResponse>, ApiError> {
    configured_issuer(&state)?;
    let Json(payload) = payload?;

    let room_name = payload
        .room_name
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Room name is required".to_string()))?;

    info!(room = %room_name, "Room created");
    Ok(Json(CreateRoomResponse { room_name }))
}
