//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds the shared,
//! read-only resources every handler needs.

use crate::config::Config;
use roomagent_core::{SessionSupervisor, TokenIssuer};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// `None` when the LiveKit settings are incomplete; token routes then answer 500.
    pub token_issuer: Option<TokenIssuer>,
    pub supervisor: Arc<SessionSupervisor>,
}
