//! Session access and lifecycle orchestration for real-time room agents.
//!
//! Two concerns live here: issuing signed, capability-scoped join tokens for a
//! media room, and bringing an automated agent online for a participant's
//! session (plugin initialization, track negotiation, and teardown).

pub mod error;
pub mod lifecycle;
pub mod llm_client;
pub mod negotiator;
pub mod plugin;
pub mod supervisor;
pub mod token;
pub mod transport;

#[cfg(test)]
mod test_support;

pub use error::{SessionError, TokenError};
pub use lifecycle::{CloseReason, SessionController, SessionReport, SessionState};
pub use plugin::{AgentHandle, AgentSettings, PluginInitializer};
pub use supervisor::{SessionSupervisor, SpawnedSession};
pub use token::{AccessGrant, Capability, TokenIssuer};
pub use transport::{ParticipantRef, SessionHandle, TrackKind, TrackRef};
