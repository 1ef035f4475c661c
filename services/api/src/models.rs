//! HTTP Request and Response Models
//!
//! Payloads exchanged with the browser client. Field names are camelCase on
//! the wire; `utoipa` derives their OpenAPI schemas.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GenerateTokenPayload {
    #[schema(example = "room1")]
    pub room_name: Option<String>,
    #[schema(example = "alice")]
    pub participant_name: Option<String>,
    #[schema(example = "alice-123")]
    pub participant_identity: Option<String>,
}

impl GenerateTokenPayload {
    /// Returns the three required fields, or the names of those missing.
    pub fn required_fields(&self) -> Result<(&str, &str, &str), Vec<&'static str>> {
        fn field(value: &Option<String>) -> Option<&str> {
            value.as_deref().filter(|v| !v.trim().is_empty())
        }
        match (
            field(&self.room_name),
            field(&self.participant_name),
            field(&self.participant_identity),
        ) {
            (Some(room), Some(name), Some(identity)) => Ok((room, name, identity)),
            (room, name, identity) => {
                let mut missing = vec![];
                if room.is_none() {
                    missing.push("roomName");
                }
                if name.is_none() {
                    missing.push("participantName");
                }
                if identity.is_none() {
                    missing.push("participantIdentity");
                }
                Err(missing)
            }
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Deserialize, ToSchema, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomPayload {
    #[schema(example = "room1")]
    pub room_name: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomResponse {
    pub room_name: String,
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: String,
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_generate_token_payload_camel_case() {
        let payload: GenerateTokenPayload = serde_json::from_value(json!({
            "roomName": "room1",
            "participantName": "alice",
            "participantIdentity": "alice-123"
        }))
        .unwrap();

        assert_eq!(
            payload.required_fields().unwrap(),
            ("room1", "alice", "alice-123")
        );
    }

    #[test]
    fn test_generate_token_payload_reports_missing_fields() {
        let payload: GenerateTokenPayload = serde_json::from_value(json!({
            "roomName": "room1",
            "participantName": "   "
        }))
        .unwrap();

        assert_eq!(
            payload.required_fields().unwrap_err(),
            vec!["participantName", "participantIdentity"]
        );
    }

    #[test]
    fn test_required_fields_are_passed_through_untrimmed() {
        let payload: GenerateTokenPayload = serde_json::from_value(json!({
            "roomName": " room1 ",
            "participantName": "alice",
            "participantIdentity": "alice-123"
        }))
        .unwrap();

        assert_eq!(payload.required_fields().unwrap().0, " room1 ");
    }

    #[test]
    fn test_error_response_omits_empty_details() {
        let body = ErrorResponse {
            error: "Missing required fields".to_string(),
            details: None,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({ "error": "Missing required fields" })
        );

        let body = ErrorResponse {
            error: "Failed to generate token".to_string(),
            details: Some("signing failed".to_string()),
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({ "error": "Failed to generate token", "details": "signing failed" })
        );
    }

    #[test]
    fn test_create_room_response_serialization() {
        let body = CreateRoomResponse {
            room_name: "room1".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({ "roomName": "room1" })
        );
    }
}
