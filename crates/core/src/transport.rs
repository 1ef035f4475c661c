//! Media Transport Abstractions
//!
//! The orchestrator never talks to the media provider directly. A transport
//! adapter hands it a [`SessionHandle`] when a participant joins a room, and
//! the orchestrator works only through the two traits defined here. This keeps
//! the session logic testable with in-memory doubles.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// The kind of media carried by a published track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Audio,
    Video,
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackKind::Audio => write!(f, "audio"),
            TrackKind::Video => write!(f, "video"),
        }
    }
}

/// A reference to a track published by a remote participant.
///
/// Track data stays in the transport layer; this only names it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackRef {
    pub sid: String,
    pub kind: TrackKind,
    pub participant_identity: String,
}

/// A participant as seen through the transport layer.
#[async_trait]
pub trait ParticipantRef: Send + Sync {
    fn identity(&self) -> &str;

    /// Lists the tracks this participant currently publishes.
    async fn published_tracks(&self) -> Vec<TrackRef>;

    /// Requests a subscription to `track` and resolves once the transport
    /// confirms or rejects it.
    async fn subscribe(&self, track: &TrackRef) -> Result<()>;
}

/// The transport's handle for one participant session.
#[async_trait]
pub trait SessionHandle: Send + Sync {
    /// Resolves the participant this session belongs to, if any.
    async fn participant(&self) -> Option<Arc<dyn ParticipantRef>>;

    /// Completes once the transport reports the session closed. Awaiting it
    /// again after closure returns immediately.
    async fn closed(&self);
}
