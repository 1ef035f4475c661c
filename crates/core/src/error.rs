//! Error taxonomy for token issuance and session orchestration.

use thiserror::Error;
use uuid::Uuid;

/// Errors raised while issuing or verifying room access tokens.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Caller input was rejected (empty identity, room, or name).
    #[error("Validation error: {0}")]
    Validation(String),
    /// The issuer is missing its shared key or secret.
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// The claims could not be signed.
    #[error("Failed to sign access token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
    /// A token failed signature, issuer, or lifetime checks.
    #[error("Invalid access token: {0}")]
    InvalidToken(#[source] jsonwebtoken::errors::Error),
}

/// Errors raised during a session's lifecycle.
///
/// Only `ParticipantNotFound` ends a session. The other two variants are
/// logged where they occur and the session continues with reduced capability.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("No participant could be resolved for session {session_id}")]
    ParticipantNotFound { session_id: Uuid },
    #[error("Subscription to track '{track_sid}' failed: {reason}")]
    SubscriptionFailure { track_sid: String, reason: String },
    #[error("Language model plugin failed to initialize: {0}")]
    PluginInitFailure(String),
}

impl SessionError {
    /// Whether this error ends the session rather than degrading it.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SessionError::ParticipantNotFound { .. })
    }
}
