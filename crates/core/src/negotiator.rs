//! Capability Negotiation
//!
//! Finds the counterpart's audio track for a session and subscribes to it.
//! A missing track or a failed subscription leaves the session running
//! without audio; only an unresolvable participant is fatal.

use crate::{
    error::SessionError,
    transport::{ParticipantRef, SessionHandle, TrackKind, TrackRef},
};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// What negotiation settled for a session.
pub struct Negotiated {
    pub participant: Arc<dyn ParticipantRef>,
    pub audio_track: Option<TrackRef>,
}

/// Resolves the session's participant and subscribes to its audio track.
///
/// Returns the subscribed track, or `None` when the participant publishes no
/// audio or the subscription could not be completed.
pub async fn negotiate(
    session_id: Uuid,
    handle: &dyn SessionHandle,
) -> Result<Option<TrackRef>, SessionError> {
    negotiate_session(session_id, handle)
        .await
        .map(|negotiated| negotiated.audio_track)
}

/// Like [`negotiate`], also returning the resolved participant.
pub async fn negotiate_session(
    session_id: Uuid,
    handle: &dyn SessionHandle,
) -> Result<Negotiated, SessionError> {
    info!("Resolving participant from session");
    let Some(participant) = handle.participant().await else {
        error!("No user participant found");
        return Err(SessionError::ParticipantNotFound { session_id });
    };
    info!(participant = %participant.identity(), "Found participant");

    let audio_track = subscribe_audio(participant.as_ref()).await;
    Ok(Negotiated {
        participant,
        audio_track,
    })
}

async fn subscribe_audio(participant: &dyn ParticipantRef) -> Option<TrackRef> {
    let audio = participant
        .published_tracks()
        .await
        .into_iter()
        .find(|track| track.kind == TrackKind::Audio);

    let Some(track) = audio else {
        warn!(participant = %participant.identity(), "No audio track found for participant");
        return None;
    };

    info!(track_sid = %track.sid, "Found audio track, subscribing");
    match participant.subscribe(&track).await {
        Ok(()) => {
            info!(track_sid = %track.sid, "Subscribed to participant audio track");
            Some(track)
        }
        Err(e) => {
            let failure = SessionError::SubscriptionFailure {
                track_sid: track.sid.clone(),
                reason: e.to_string(),
            };
            warn!(error = %failure, "Continuing without audio");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeParticipant, FakeSession};

    #[tokio::test]
    async fn test_missing_participant_is_fatal() {
        let session = FakeSession::new(None);
        let id = Uuid::new_v4();

        let err = negotiate(id, &session).await.unwrap_err();
        assert!(matches!(err, SessionError::ParticipantNotFound { session_id } if session_id == id));
    }

    #[tokio::test]
    async fn test_subscribes_to_audio_track() {
        let session = FakeSession::new(Some(
            FakeParticipant::new("alice-123")
                .with_track("TR_video", TrackKind::Video)
                .with_track("TR_audio", TrackKind::Audio),
        ));

        let track = negotiate(Uuid::new_v4(), &session).await.unwrap().unwrap();
        assert_eq!(track.sid, "TR_audio");
        assert_eq!(track.participant_identity, "alice-123");
        assert_eq!(session.participant_ref().unwrap().subscribe_count(), 1);
    }

    #[tokio::test]
    async fn test_no_audio_track_returns_none() {
        let session = FakeSession::new(Some(
            FakeParticipant::new("alice-123").with_track("TR_video", TrackKind::Video),
        ));

        assert!(negotiate(Uuid::new_v4(), &session).await.unwrap().is_none());
        assert_eq!(session.participant_ref().unwrap().subscribe_count(), 0);
    }

    #[tokio::test]
    async fn test_subscription_failure_degrades_to_none() {
        let session = FakeSession::new(Some(
            FakeParticipant::new("alice-123")
                .with_track("TR_audio", TrackKind::Audio)
                .failing_subscribe(),
        ));

        assert!(negotiate(Uuid::new_v4(), &session).await.unwrap().is_none());
        assert_eq!(session.participant_ref().unwrap().subscribe_count(), 1);
    }

    #[tokio::test]
    async fn test_negotiated_session_keeps_participant_without_audio() {
        let session = FakeSession::new(Some(
            FakeParticipant::new("alice-123").with_track("TR_video", TrackKind::Video),
        ));

        let negotiated = negotiate_session(Uuid::new_v4(), &session).await.unwrap();
        assert_eq!(negotiated.participant.identity(), "alice-123");
        assert!(negotiated.audio_track.is_none());
    }
}
