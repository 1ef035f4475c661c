//! Room Access Token Issuer
//!
//! This module builds capability-scoped join tokens for the media provider.
//! A token is an HS256 JWT carrying the claims a LiveKit-compatible verifier
//! expects: the API key as issuer, the participant identity as subject, and a
//! `video` grant naming the room and what the holder may do in it.

use crate::error::TokenError;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Default token lifetime in seconds, matching the media provider's SDK default.
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 6 * 60 * 60;

/// A single permission carried by an access grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Join,
    Publish,
    Subscribe,
}

impl Capability {
    /// The capability set granted unless a caller restricts it.
    pub fn defaults() -> BTreeSet<Capability> {
        BTreeSet::from([Capability::Join, Capability::Publish, Capability::Subscribe])
    }
}

/// The permissions a participant holds for one room.
///
/// A grant is immutable once built; narrowing it with [`AccessGrant::restrict`]
/// produces a new value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessGrant {
    subject_identity: String,
    display_name: String,
    room_name: String,
    capabilities: BTreeSet<Capability>,
    issued_at: DateTime<Utc>,
    expiry: DateTime<Utc>,
}

impl AccessGrant {
    /// Builds a grant with the default capability set, valid for `ttl` from now.
    pub fn new(
        room_name: &str,
        display_name: &str,
        subject_identity: &str,
        ttl: Duration,
    ) -> Result<Self, TokenError> {
        require_non_empty("roomName", room_name)?;
        require_non_empty("participantName", display_name)?;
        require_non_empty("participantIdentity", subject_identity)?;

        let issued_at = Utc::now();
        Ok(Self {
            subject_identity: subject_identity.to_string(),
            display_name: display_name.to_string(),
            room_name: room_name.to_string(),
            capabilities: Capability::defaults(),
            issued_at,
            expiry: issued_at + ttl,
        })
    }

    /// Returns a copy of this grant limited to `capabilities`.
    pub fn restrict(mut self, capabilities: impl IntoIterator<Item = Capability>) -> Self {
        self.capabilities = capabilities.into_iter().collect();
        self
    }

    pub fn subject_identity(&self) -> &str {
        &self.subject_identity
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn room_name(&self) -> &str {
        &self.room_name
    }

    pub fn capabilities(&self) -> &BTreeSet<Capability> {
        &self.capabilities
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn expiry(&self) -> DateTime<Utc> {
        self.expiry
    }

    pub fn allows(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    /// Compares everything but the timestamps.
    pub fn is_equivalent_to(&self, other: &AccessGrant) -> bool {
        self.subject_identity == other.subject_identity
            && self.display_name == other.display_name
            && self.room_name == other.room_name
            && self.capabilities == other.capabilities
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<(), TokenError> {
    if value.trim().is_empty() {
        return Err(TokenError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}

/// The room permission block of the token, in the provider's field names.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VideoGrant {
    pub room_join: bool,
    pub room: String,
    pub can_publish: bool,
    pub can_subscribe: bool,
}

/// JWT claims as signed onto the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    pub iss: String,
    pub sub: String,
    pub name: String,
    pub nbf: i64,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
    pub video: VideoGrant,
}

impl AccessClaims {
    fn from_grant(grant: &AccessGrant, api_key: &str) -> Self {
        Self {
            iss: api_key.to_string(),
            sub: grant.subject_identity.clone(),
            name: grant.display_name.clone(),
            nbf: grant.issued_at.timestamp(),
            iat: grant.issued_at.timestamp(),
            exp: grant.expiry.timestamp(),
            // A fresh id per issuance keeps repeated tokens for one grant distinct.
            jti: Uuid::new_v4().to_string(),
            video: VideoGrant {
                room_join: grant.allows(Capability::Join),
                room: grant.room_name.clone(),
                can_publish: grant.allows(Capability::Publish),
                can_subscribe: grant.allows(Capability::Subscribe),
            },
        }
    }

    fn into_grant(self) -> Result<AccessGrant, TokenError> {
        let mut capabilities = BTreeSet::new();
        if self.video.room_join {
            capabilities.insert(Capability::Join);
        }
        if self.video.can_publish {
            capabilities.insert(Capability::Publish);
        }
        if self.video.can_subscribe {
            capabilities.insert(Capability::Subscribe);
        }

        let issued_at = timestamp(self.iat)?;
        let expiry = timestamp(self.exp)?;
        Ok(AccessGrant {
            subject_identity: self.sub,
            display_name: self.name,
            room_name: self.video.room,
            capabilities,
            issued_at,
            expiry,
        })
    }
}

fn timestamp(secs: i64) -> Result<DateTime<Utc>, TokenError> {
    DateTime::from_timestamp(secs, 0).ok_or_else(|| {
        TokenError::InvalidToken(jsonwebtoken::errors::ErrorKind::InvalidToken.into())
    })
}

/// Signs and verifies access tokens with the process-wide API key and secret.
///
/// The issuer holds no mutable state, so a single instance can be shared
/// across request handlers without locking.
#[derive(Clone)]
pub struct TokenIssuer {
    api_key: String,
    api_secret: SecretString,
    ttl: Duration,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl TokenIssuer {
    /// Creates an issuer, rejecting an empty key or secret.
    pub fn new(api_key: impl Into<String>, api_secret: SecretString) -> Result<Self, TokenError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(TokenError::Configuration("API key is not set".to_string()));
        }
        if api_secret.expose_secret().is_empty() {
            return Err(TokenError::Configuration(
                "API secret is not set".to_string(),
            ));
        }
        Ok(Self {
            api_key,
            api_secret,
            ttl: Duration::seconds(DEFAULT_TOKEN_TTL_SECS),
        })
    }

    /// Overrides the lifetime of issued tokens.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Issues a join token carrying the default capability set.
    pub fn issue(
        &self,
        room_name: &str,
        participant_name: &str,
        participant_identity: &str,
    ) -> Result<String, TokenError> {
        let grant = AccessGrant::new(room_name, participant_name, participant_identity, self.ttl)?;
        self.issue_grant(&grant)
    }

    /// Signs an already-built grant.
    pub fn issue_grant(&self, grant: &AccessGrant) -> Result<String, TokenError> {
        let claims = AccessClaims::from_grant(grant, &self.api_key);
        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.api_secret.expose_secret().as_bytes()),
        )
        .map_err(TokenError::Signing)
    }

    /// Verifies a token signed by this issuer and rebuilds its grant.
    pub fn verify(&self, token: &str) -> Result<AccessGrant, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.api_key]);
        validation.set_required_spec_claims(&["exp", "iss", "sub", "nbf"]);
        validation.validate_nbf = true;

        let data = jsonwebtoken::decode::<AccessClaims>(
            token,
            &DecodingKey::from_secret(self.api_secret.expose_secret().as_bytes()),
            &validation,
        )
        .map_err(TokenError::InvalidToken)?;
        data.claims.into_grant()
    }
}

/// Issues a join token in one call from raw configuration values.
///
/// Prefer building a [`TokenIssuer`] once at startup; this exists for callers
/// that hold the key and secret directly.
pub fn issue(
    room_name: &str,
    participant_name: &str,
    participant_identity: &str,
    secret: SecretString,
    api_key: &str,
) -> Result<String, TokenError> {
    TokenIssuer::new(api_key, secret)?.issue(room_name, participant_name, participant_identity)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret(value: &str) -> SecretString {
        SecretString::from(value.to_string())
    }

    fn issuer() -> TokenIssuer {
        TokenIssuer::new("APIkey123", secret("super-secret-value")).unwrap()
    }

    #[test]
    fn test_issue_and_verify_end_to_end() {
        let issuer = issuer();
        let token = issuer.issue("room1", "alice", "alice-123").unwrap();

        let grant = issuer.verify(&token).unwrap();
        assert_eq!(grant.room_name(), "room1");
        assert_eq!(grant.subject_identity(), "alice-123");
        assert_eq!(grant.display_name(), "alice");
        assert_eq!(grant.capabilities(), &Capability::defaults());
        assert!(grant.expiry() > grant.issued_at());
    }

    #[test]
    fn test_claims_match_provider_format() {
        let issuer = issuer();
        let token = issuer.issue("room1", "alice", "alice-123").unwrap();

        let claims = jsonwebtoken::decode::<serde_json::Value>(
            &token,
            &DecodingKey::from_secret(b"super-secret-value"),
            &Validation::new(Algorithm::HS256),
        )
        .unwrap()
        .claims;

        assert_eq!(claims["iss"], "APIkey123");
        assert_eq!(claims["sub"], "alice-123");
        assert_eq!(claims["name"], "alice");
        assert_eq!(claims["video"]["room"], "room1");
        assert_eq!(claims["video"]["roomJoin"], true);
        assert_eq!(claims["video"]["canPublish"], true);
        assert_eq!(claims["video"]["canSubscribe"], true);
        assert_eq!(
            claims["exp"].as_i64().unwrap() - claims["nbf"].as_i64().unwrap(),
            DEFAULT_TOKEN_TTL_SECS
        );
    }

    #[test]
    fn test_empty_fields_are_rejected() {
        let issuer = issuer();
        let cases = [
            ("", "alice", "alice-123"),
            ("room1", "", "alice-123"),
            ("room1", "alice", ""),
            ("   ", "alice", "alice-123"),
            ("", "", ""),
        ];

        for (room, name, identity) in cases {
            let result = issuer.issue(room, name, identity);
            assert!(
                matches!(result, Err(TokenError::Validation(_))),
                "expected validation error for ({room:?}, {name:?}, {identity:?})"
            );
        }
    }

    #[test]
    fn test_repeated_issue_yields_distinct_equivalent_tokens() {
        let issuer = issuer();
        let first = issuer.issue("room1", "alice", "alice-123").unwrap();
        let second = issuer.issue("room1", "alice", "alice-123").unwrap();

        assert_ne!(first, second);
        let first_grant = issuer.verify(&first).unwrap();
        let second_grant = issuer.verify(&second).unwrap();
        assert!(first_grant.is_equivalent_to(&second_grant));
    }

    #[test]
    fn test_verify_rejects_wrong_secret() {
        let token = issuer().issue("room1", "alice", "alice-123").unwrap();
        let other = TokenIssuer::new("APIkey123", secret("another-secret")).unwrap();

        assert!(matches!(
            other.verify(&token),
            Err(TokenError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_verify_rejects_foreign_issuer() {
        let token = issuer().issue("room1", "alice", "alice-123").unwrap();
        let other = TokenIssuer::new("OtherKey", secret("super-secret-value")).unwrap();

        assert!(other.verify(&token).is_err());
    }

    #[test]
    fn test_restricted_grant_round_trips() {
        let issuer = issuer();
        let grant = AccessGrant::new("room1", "viewer", "viewer-1", Duration::minutes(10))
            .unwrap()
            .restrict([Capability::Join, Capability::Subscribe]);

        let token = issuer.issue_grant(&grant).unwrap();
        let decoded = issuer.verify(&token).unwrap();

        assert!(decoded.is_equivalent_to(&grant));
        assert!(!decoded.allows(Capability::Publish));
        assert!(decoded.allows(Capability::Subscribe));
    }

    #[test]
    fn test_new_rejects_missing_configuration() {
        assert!(matches!(
            TokenIssuer::new("", secret("secret")),
            Err(TokenError::Configuration(_))
        ));
        assert!(matches!(
            TokenIssuer::new("key", secret("")),
            Err(TokenError::Configuration(_))
        ));
    }

    #[test]
    fn test_free_issue_function() {
        let token = issue(
            "room1",
            "alice",
            "alice-123",
            secret("super-secret-value"),
            "APIkey123",
        )
        .unwrap();
        let grant = issuer().verify(&token).unwrap();
        assert_eq!(grant.room_name(), "room1");

        assert!(matches!(
            issue("room1", "alice", "alice-123", secret(""), "APIkey123"),
            Err(TokenError::Configuration(_))
        ));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let debug = format!("{:?}", issuer());
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("super-secret-value"));
    }
}
