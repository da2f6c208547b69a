//! Room creation via the room service

use serde::{Deserialize, Deserializer, Serialize};

use super::twirp::TwirpClient;
use super::{ApiCredentials, DispatchMetadata, RoomAgentDispatch, VideoGrants};
use crate::{Error, Result};

const SERVICE: &str = "RoomService";

/// Room as reported by the service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Room {
    pub sid: String,
    pub name: String,
    #[serde(alias = "emptyTimeout")]
    pub empty_timeout: u32,
    #[serde(alias = "maxParticipants")]
    pub max_participants: u32,
    #[serde(alias = "creationTime", deserialize_with = "int64")]
    pub creation_time: i64,
    pub metadata: String,
}

/// int64 arrives as a JSON string under protojson
fn int64<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<i64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Int64 {
        Number(i64),
        Text(String),
    }

    match Int64::deserialize(deserializer)? {
        Int64::Number(n) => Ok(n),
        Int64::Text(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

#[derive(Serialize)]
struct CreateRoomRequest<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "is_zero")]
    max_participants: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    agents: Vec<RoomAgentDispatch>,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_zero(n: &u32) -> bool {
    *n == 0
}

/// Client for the room service
#[derive(Debug, Clone)]
pub struct RoomServiceClient {
    twirp: TwirpClient,
}

impl RoomServiceClient {
    /// Client for the project at `url`
    ///
    /// # Errors
    ///
    /// Returns error if `url` is blank
    pub fn new(url: &str, credentials: ApiCredentials) -> Result<Self> {
        Ok(Self {
            twirp: TwirpClient::new(url, credentials)?,
        })
    }

    /// Create `name` ahead of time with the agent dispatch carrying
    /// `conversation_id`
    ///
    /// # Errors
    ///
    /// Returns error if the name or a supplied id is blank, or the service
    /// rejects the request
    pub async fn create_room(
        &self,
        name: &str,
        conversation_id: Option<&str>,
        max_participants: u32,
    ) -> Result<Room> {
        if name.trim().is_empty() {
            return Err(Error::InvalidInput("room name must not be empty".to_string()));
        }

        let agents = match conversation_id {
            Some(id) if id.trim().is_empty() => {
                return Err(Error::InvalidInput(
                    "conversation_id must not be empty".to_string(),
                ));
            }
            Some(id) => vec![RoomAgentDispatch {
                metadata: DispatchMetadata::for_conversation(id).to_json()?,
                ..RoomAgentDispatch::default()
            }],
            None => Vec::new(),
        };

        let request = CreateRoomRequest {
            name,
            max_participants,
            agents,
        };
        let grants = VideoGrants {
            room_create: true,
            ..VideoGrants::default()
        };

        let room: Room = self.twirp.call(SERVICE, "CreateRoom", grants, &request).await?;

        tracing::info!(
            room = %room.name,
            sid = %room.sid,
            conversation_id = conversation_id.unwrap_or_default(),
            "room created"
        );
        Ok(room)
    }
}
