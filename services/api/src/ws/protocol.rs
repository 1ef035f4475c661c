//! Defines the WebSocket message protocol between the media transport adapter
//! and the orchestrator.

use roomagent_core::{SessionState, TrackKind, TrackRef};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A track as announced by the transport adapter.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct TrackInfo {
    pub sid: String,
    pub kind: TrackKind,
}

/// The remote participant a session belongs to.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ParticipantInfo {
    pub identity: String,
    #[serde(default)]
    pub tracks: Vec<TrackInfo>,
}

impl ParticipantInfo {
    pub fn track_refs(&self) -> Vec<TrackRef> {
        self.tracks
            .iter()
            .map(|track| TrackRef {
                sid: track.sid.clone(),
                kind: track.kind,
                participant_identity: self.identity.clone(),
            })
            .collect()
    }
}

/// Messages sent from the transport adapter to the orchestrator.
#[derive(Deserialize, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransportMessage {
    /// Hands a joined participant's session to the orchestrator. This must be
    /// the first message.
    SessionStart {
        room: String,
        #[serde(default)]
        participant: Option<ParticipantInfo>,
    },
    /// The subscription requested for `track_sid` is live.
    SubscriptionConfirmed { track_sid: String },
    /// The subscription requested for `track_sid` could not be made.
    SubscriptionFailed { track_sid: String, reason: String },
    /// The room session has ended.
    Close,
}

/// Messages sent from the orchestrator to the transport adapter.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlMessage {
    /// Confirms the session was accepted.
    Started { session_id: Uuid },
    /// Asks the transport to subscribe the agent to a track.
    Subscribe { track_sid: String },
    /// Reports a session state change.
    State { state: SessionState },
    /// Reports a fatal error to the transport.
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_session_start_parses_participant_tracks() {
        let msg: TransportMessage = serde_json::from_value(json!({
            "type": "session_start",
            "room": "room1",
            "participant": {
                "identity": "alice-123",
                "tracks": [
                    { "sid": "TR_video", "kind": "video" },
                    { "sid": "TR_audio", "kind": "audio" }
                ]
            }
        }))
        .unwrap();

        let TransportMessage::SessionStart { room, participant } = msg else {
            panic!("expected session_start");
        };
        assert_eq!(room, "room1");
        let refs = participant.unwrap().track_refs();
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[1].kind, TrackKind::Audio);
        assert_eq!(refs[1].participant_identity, "alice-123");
    }

    #[test]
    fn test_session_start_without_participant() {
        let msg: TransportMessage =
            serde_json::from_str(r#"{"type":"session_start","room":"room1"}"#).unwrap();
        assert_eq!(
            msg,
            TransportMessage::SessionStart {
                room: "room1".to_string(),
                participant: None
            }
        );
    }

    #[test]
    fn test_subscription_and_close_messages() {
        let confirmed: TransportMessage =
            serde_json::from_str(r#"{"type":"subscription_confirmed","track_sid":"TR_1"}"#)
                .unwrap();
        assert_eq!(
            confirmed,
            TransportMessage::SubscriptionConfirmed {
                track_sid: "TR_1".to_string()
            }
        );

        let failed: TransportMessage = serde_json::from_str(
            r#"{"type":"subscription_failed","track_sid":"TR_1","reason":"gone"}"#,
        )
        .unwrap();
        assert!(matches!(failed, TransportMessage::SubscriptionFailed { .. }));

        let close: TransportMessage = serde_json::from_str(r#"{"type":"close"}"#).unwrap();
        assert_eq!(close, TransportMessage::Close);
    }

    #[test]
    fn test_control_message_serialization() {
        let subscribe = ControlMessage::Subscribe {
            track_sid: "TR_audio".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&subscribe).unwrap(),
            json!({ "type": "subscribe", "track_sid": "TR_audio" })
        );

        let state = ControlMessage::State {
            state: SessionState::Active,
        };
        assert_eq!(
            serde_json::to_value(&state).unwrap(),
            json!({ "type": "state", "state": "active" })
        );
    }
}
