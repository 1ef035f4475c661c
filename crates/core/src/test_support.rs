//! In-memory transport doubles for session tests.

use crate::transport::{ParticipantRef, SessionHandle, TrackKind, TrackRef};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

pub(crate) struct FakeParticipant {
    identity: String,
    tracks: Vec<TrackRef>,
    fail_subscribe: bool,
    subscribe_calls: AtomicUsize,
}

impl FakeParticipant {
    pub(crate) fn new(identity: &str) -> Self {
        Self {
            identity: identity.to_string(),
            tracks: vec![],
            fail_subscribe: false,
            subscribe_calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with_track(mut self, sid: &str, kind: TrackKind) -> Self {
        self.tracks.push(TrackRef {
            sid: sid.to_string(),
            kind,
            participant_identity: self.identity.clone(),
        });
        self
    }

    pub(crate) fn failing_subscribe(mut self) -> Self {
        self.fail_subscribe = true;
        self
    }

    pub(crate) fn subscribe_count(&self) -> usize {
        self.subscribe_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ParticipantRef for FakeParticipant {
    fn identity(&self) -> &str {
        &self.identity
    }

    async fn published_tracks(&self) -> Vec<TrackRef> {
        self.tracks.clone()
    }

    async fn subscribe(&self, track: &TrackRef) -> Result<()> {
        self.subscribe_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_subscribe {
            return Err(anyhow!("transport dropped subscription for {}", track.sid));
        }
        Ok(())
    }
}

/// A session whose participant lookup can be held open until released.
pub(crate) struct FakeSession {
    participant: Option<Arc<FakeParticipant>>,
    gate: Option<Arc<Notify>>,
    closed: CancellationToken,
}

impl FakeSession {
    pub(crate) fn new(participant: Option<FakeParticipant>) -> Self {
        Self {
            participant: participant.map(Arc::new),
            gate: None,
            closed: CancellationToken::new(),
        }
    }

    /// Makes `participant()` wait until `gate` is notified.
    pub(crate) fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub(crate) fn participant_ref(&self) -> Option<Arc<FakeParticipant>> {
        self.participant.clone()
    }

    pub(crate) fn close(&self) {
        self.closed.cancel();
    }
}

#[async_trait]
impl SessionHandle for FakeSession {
    async fn participant(&self) -> Option<Arc<dyn ParticipantRef>> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.participant
            .clone()
            .map(|p| p as Arc<dyn ParticipantRef>)
    }

    async fn closed(&self) {
        self.closed.cancelled().await;
    }
}
