//! Hosted media service boundary
//!
//! Room access tokens are HS256 JWTs signed with the project's API key and
//! secret; server APIs (egress, room service) are Twirp JSON endpoints
//! authorized with the same kind of token.
//!
//! The `conversation_id` travels from token issuance to the agent session
//! inside the agent dispatch metadata, see [`DispatchMetadata`].

mod egress;
mod room;
mod token;
mod twirp;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

pub use egress::{
    DEFAULT_RECORDINGS_DIR, EgressClient, EgressInfo, RecordingLayout, StartedRecording,
    default_output_path,
};
pub use room::{Room, RoomServiceClient};
pub use token::{
    AccessToken, Claims, DEFAULT_MAX_PARTICIPANTS, DEFAULT_TTL, IssuedToken, ParticipantPermissions, RoomAgentDispatch,
    RoomConfiguration, TokenIssuer, TokenRequest, VideoGrants,
};

use crate::{Error, Result};

/// API key/secret pair for signing tokens
pub struct ApiCredentials {
    api_key: String,
    api_secret: SecretString,
}

impl ApiCredentials {
    /// Credentials from a key and secret
    ///
    /// # Errors
    ///
    /// Returns error if either value is blank
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        let api_secret: String = api_secret.into();

        if api_key.trim().is_empty() || api_secret.trim().is_empty() {
            return Err(Error::Config(
                "LIVEKIT_API_KEY and LIVEKIT_API_SECRET must be set".to_string(),
            ));
        }

        Ok(Self {
            api_key,
            api_secret: SecretString::from(api_secret),
        })
    }

    /// Public API key (the token issuer)
    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub(crate) fn secret_bytes(&self) -> &[u8] {
        self.api_secret.expose_secret().as_bytes()
    }
}

impl Clone for ApiCredentials {
    fn clone(&self) -> Self {
        Self {
            api_key: self.api_key.clone(),
            api_secret: SecretString::from(self.api_secret.expose_secret().to_owned()),
        }
    }
}

impl std::fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .finish()
    }
}

/// JSON carried in agent dispatch metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

impl DispatchMetadata {
    #[must_use]
    pub fn for_conversation(conversation_id: impl Into<String>) -> Self {
        Self {
            conversation_id: Some(conversation_id.into()),
        }
    }

    /// Parse dispatch metadata; a blank `conversation_id` counts as absent
    ///
    /// # Errors
    ///
    /// Returns error if `metadata` is not a JSON object
    pub fn parse(metadata: &str) -> Result<Self> {
        let mut parsed: Self = serde_json::from_str(metadata)?;
        parsed.conversation_id = parsed.conversation_id.filter(|id| !id.trim().is_empty());
        Ok(parsed)
    }

    /// Encode as the metadata string
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Map a `ws(s)://` project URL to the `http(s)://` base of its server APIs
///
/// # Errors
///
/// Returns error if `url` is blank
pub fn http_base_url(url: &str) -> Result<String> {
    let url = url.trim();
    if url.is_empty() {
        return Err(Error::Config("LIVEKIT_URL must be set".to_string()));
    }

    let mapped = if let Some(rest) = url.strip_prefix("wss://") {
        format!("https://{rest}")
    } else if let Some(rest) = url.strip_prefix("ws://") {
        format!("http://{rest}")
    } else {
        url.to_string()
    };

    Ok(mapped.trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_credentials_rejected() {
        let err = ApiCredentials::new("key", " ").unwrap_err();
        assert!(err.to_string().contains("LIVEKIT_API_SECRET"));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let creds = ApiCredentials::new("APIkey", "super-secret").unwrap();
        let debug = format!("{creds:?}");
        assert!(debug.contains("APIkey"));
        assert!(!debug.contains("super-secret"));
    }

    #[test]
    fn test_metadata_round_trip() {
        let json = DispatchMetadata::for_conversation("abc-123").to_json().unwrap();
        assert_eq!(json, r#"{"conversation_id":"abc-123"}"#);
        assert_eq!(
            DispatchMetadata::parse(&json).unwrap().conversation_id.as_deref(),
            Some("abc-123")
        );
    }

    #[test]
    fn test_metadata_blank_id_absent() {
        let parsed = DispatchMetadata::parse(r#"{"conversation_id": ""}"#).unwrap();
        assert_eq!(parsed.conversation_id, None);
        assert_eq!(DispatchMetadata::parse("{}").unwrap(), DispatchMetadata::default());
        assert!(DispatchMetadata::parse("not json").is_err());
    }

    #[test]
    fn test_http_base_url() {
        assert_eq!(
            http_base_url("wss://demo.livekit.cloud/").unwrap(),
            "https://demo.livekit.cloud"
        );
        assert_eq!(http_base_url("ws://localhost:7880").unwrap(), "http://localhost:7880");
        assert_eq!(http_base_url("http://127.0.0.1:9000").unwrap(), "http://127.0.0.1:9000");
        assert!(http_base_url("").is_err());
    }
}
