//! Room access token construction

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ApiCredentials, DispatchMetadata};
use crate::{Error, Result};

/// Default token lifetime
pub const DEFAULT_TTL: Duration = Duration::from_secs(6 * 60 * 60);

/// Default participant cap for a sales call (parent + agent)
pub const DEFAULT_MAX_PARTICIPANTS: u32 = 2;

/// Identity and display name used for agent tokens
const AGENT_IDENTITY: &str = "agent";
const AGENT_NAME: &str = "Voice Agent";

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_false(b: &bool) -> bool {
    !*b
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_zero(n: &u32) -> bool {
    *n == 0
}

/// Video permission grants embedded in a token
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoGrants {
    #[serde(default, skip_serializing_if = "is_false")]
    pub room_create: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub room_list: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub room_record: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub room_admin: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub room_join: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub room: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_publish: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_subscribe: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_publish_data: Option<bool>,
}

/// Agent dispatched into the room when the participant joins
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomAgentDispatch {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub agent_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub metadata: String,
}

/// Room settings applied when a token creates the room
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomConfiguration {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub agents: Vec<RoomAgentDispatch>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub max_participants: u32,
}

impl RoomConfiguration {
    /// Dispatch metadata carried by the first agent, if any
    #[must_use]
    pub fn dispatch_metadata(&self) -> Option<&str> {
        self.agents
            .first()
            .map(|a| a.metadata.as_str())
            .filter(|m| !m.is_empty())
    }
}

/// JWT claim set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub iss: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sub: String,
    pub nbf: i64,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub video: VideoGrants,
    #[serde(rename = "roomConfig", default, skip_serializing_if = "Option::is_none")]
    pub room_config: Option<RoomConfiguration>,
}

/// Builder for a signed access token
#[derive(Debug, Clone)]
pub struct AccessToken<'a> {
    credentials: &'a ApiCredentials,
    identity: String,
    name: Option<String>,
    grants: VideoGrants,
    room_config: Option<RoomConfiguration>,
    ttl: Duration,
}

impl<'a> AccessToken<'a> {
    #[must_use]
    pub fn new(credentials: &'a ApiCredentials) -> Self {
        Self {
            credentials,
            identity: String::new(),
            name: None,
            grants: VideoGrants::default(),
            room_config: None,
            ttl: DEFAULT_TTL,
        }
    }

    #[must_use]
    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = identity.into();
        self
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_grants(mut self, grants: VideoGrants) -> Self {
        self.grants = grants;
        self
    }

    #[must_use]
    pub fn with_room_config(mut self, config: RoomConfiguration) -> Self {
        self.room_config = Some(config);
        self
    }

    #[must_use]
    pub const fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Sign the token
    ///
    /// # Errors
    ///
    /// Returns error if encoding fails
    pub fn to_jwt(&self) -> Result<String> {
        let now = Utc::now().timestamp();
        let ttl = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX / 2);

        let claims = Claims {
            iss: self.credentials.api_key().to_string(),
            sub: self.identity.clone(),
            nbf: now,
            exp: now.saturating_add(ttl),
            name: self.name.clone(),
            video: self.grants.clone(),
            room_config: self.room_config.clone(),
        };

        let key = EncodingKey::from_secret(self.credentials.secret_bytes());
        Ok(jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &key)?)
    }
}

/// What a participant may do in the room
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParticipantPermissions {
    pub can_publish: bool,
    pub can_subscribe: bool,
    pub can_publish_data: bool,
}

impl ParticipantPermissions {
    /// Everything allowed (agents)
    #[must_use]
    pub const fn full() -> Self {
        Self {
            can_publish: true,
            can_subscribe: true,
            can_publish_data: true,
        }
    }

    /// Publish audio and hear the agent, no data messages (parents)
    #[must_use]
    pub const fn client() -> Self {
        Self {
            can_publish: true,
            can_subscribe: true,
            can_publish_data: false,
        }
    }
}

impl Default for ParticipantPermissions {
    fn default() -> Self {
        Self::full()
    }
}

/// Parameters for issuing a room-join token
#[derive(Debug, Clone)]
pub struct TokenRequest {
    pub room: String,
    pub identity: String,
    /// Display name; defaults to the identity
    pub name: Option<String>,
    pub permissions: ParticipantPermissions,
    /// Tracking id to embed; generated when absent, never replaced when given
    pub conversation_id: Option<String>,
}

/// A signed token plus the tracking id embedded in it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub conversation_id: String,
    pub room: String,
    pub identity: String,
    pub name: String,
}

/// Issues room-join and server API tokens
#[derive(Debug, Clone)]
pub struct TokenIssuer {
    credentials: ApiCredentials,
    ttl: Duration,
    max_participants: u32,
}

impl TokenIssuer {
    #[must_use]
    pub const fn new(credentials: ApiCredentials) -> Self {
        Self {
            credentials,
            ttl: DEFAULT_TTL,
            max_participants: DEFAULT_MAX_PARTICIPANTS,
        }
    }

    #[must_use]
    pub const fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    #[must_use]
    pub const fn with_max_participants(mut self, max_participants: u32) -> Self {
        self.max_participants = max_participants;
        self
    }

    #[must_use]
    pub const fn credentials(&self) -> &ApiCredentials {
        &self.credentials
    }

    /// Issue a room-join token carrying the conversation's tracking id
    ///
    /// # Errors
    ///
    /// Returns error if the room or identity is blank, a supplied
    /// `conversation_id` is blank, or signing fails
    pub fn issue(&self, request: TokenRequest) -> Result<IssuedToken> {
        if request.room.trim().is_empty() {
            return Err(Error::InvalidInput("room name must not be empty".to_string()));
        }
        if request.identity.trim().is_empty() {
            return Err(Error::InvalidInput(
                "participant identity must not be empty".to_string(),
            ));
        }

        let conversation_id = match request.conversation_id {
            Some(id) if id.trim().is_empty() => {
                return Err(Error::InvalidInput(
                    "conversation_id must not be empty".to_string(),
                ));
            }
            Some(id) => id,
            None => Uuid::new_v4().to_string(),
        };

        let name = request.name.unwrap_or_else(|| request.identity.clone());
        let permissions = request.permissions;

        let token = AccessToken::new(&self.credentials)
            .with_identity(&request.identity)
            .with_name(&name)
            .with_grants(VideoGrants {
                room_join: true,
                room: request.room.clone(),
                can_publish: Some(permissions.can_publish),
                can_subscribe: Some(permissions.can_subscribe),
                can_publish_data: Some(permissions.can_publish_data),
                ..VideoGrants::default()
            })
            .with_room_config(RoomConfiguration {
                agents: vec![RoomAgentDispatch {
                    metadata: DispatchMetadata::for_conversation(&conversation_id).to_json()?,
                    ..RoomAgentDispatch::default()
                }],
                max_participants: self.max_participants,
            })
            .with_ttl(self.ttl)
            .to_jwt()?;

        tracing::debug!(
            room = %request.room,
            identity = %request.identity,
            conversation_id = %conversation_id,
            "issued room token"
        );

        Ok(IssuedToken {
            token,
            conversation_id,
            room: request.room,
            identity: request.identity,
            name,
        })
    }

    /// Token for a parent joining the call
    ///
    /// # Errors
    ///
    /// See [`TokenIssuer::issue`]
    pub fn client_token(
        &self,
        room: &str,
        identity: &str,
        name: Option<&str>,
        conversation_id: Option<String>,
    ) -> Result<IssuedToken> {
        self.issue(TokenRequest {
            room: room.to_string(),
            identity: identity.to_string(),
            name: name.map(ToString::to_string),
            permissions: ParticipantPermissions::client(),
            conversation_id,
        })
    }

    /// Token for the voice agent
    ///
    /// # Errors
    ///
    /// See [`TokenIssuer::issue`]
    pub fn agent_token(&self, room: &str, conversation_id: Option<String>) -> Result<IssuedToken> {
        self.issue(TokenRequest {
            room: room.to_string(),
            identity: AGENT_IDENTITY.to_string(),
            name: Some(AGENT_NAME.to_string()),
            permissions: ParticipantPermissions::full(),
            conversation_id,
        })
    }

    /// Short-lived token for server API calls with `grants`
    ///
    /// # Errors
    ///
    /// Returns error if signing fails
    pub fn server_token(&self, grants: VideoGrants) -> Result<String> {
        AccessToken::new(&self.credentials)
            .with_grants(grants)
            .with_ttl(Duration::from_secs(10 * 60))
            .to_jwt()
    }

    /// Verify a token signed with these credentials and return its claims
    ///
    /// # Errors
    ///
    /// Returns error if the signature, issuer or expiry is invalid
    pub fn verify(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.credentials.api_key()]);
        validation.validate_nbf = true;

        let key = DecodingKey::from_secret(self.credentials.secret_bytes());
        Ok(jsonwebtoken::decode::<Claims>(token, &key, &validation)?.claims)
    }
}
