//! Room composite recording via the egress service

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Local};
use serde::{Deserialize, Deserializer, Serialize};

use super::twirp::TwirpClient;
use super::{ApiCredentials, VideoGrants};
use crate::{Error, Result};

const SERVICE: &str = "Egress";

/// Directory used when no recordings directory is configured
pub const DEFAULT_RECORDINGS_DIR: &str = "recordings";

/// Egress status names indexed by their protobuf number
const STATUS_NAMES: [&str; 7] = [
    "EGRESS_STARTING",
    "EGRESS_ACTIVE",
    "EGRESS_ENDING",
    "EGRESS_COMPLETE",
    "EGRESS_FAILED",
    "EGRESS_ABORTED",
    "EGRESS_LIMIT_REACHED",
];

/// Composite layout of the recorded room
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RecordingLayout {
    #[default]
    Speaker,
    Grid,
}

impl RecordingLayout {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Speaker => "speaker",
            Self::Grid => "grid",
        }
    }
}

impl fmt::Display for RecordingLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordingLayout {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "speaker" => Ok(Self::Speaker),
            "grid" => Ok(Self::Grid),
            other => Err(Error::InvalidInput(format!(
                "unknown recording layout '{other}' (expected speaker or grid)"
            ))),
        }
    }
}

/// State of one egress as reported by the service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EgressInfo {
    #[serde(alias = "egressId")]
    pub egress_id: String,
    #[serde(default, alias = "roomName")]
    pub room_name: String,
    #[serde(default = "starting_status", deserialize_with = "status_name")]
    pub status: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
}

fn starting_status() -> String {
    STATUS_NAMES[0].to_string()
}

/// Accept the status as its enum name or its protobuf number
fn status_name<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Status {
        Name(String),
        Number(usize),
    }

    Ok(match Status::deserialize(deserializer)? {
        Status::Name(name) => name,
        Status::Number(n) => STATUS_NAMES
            .get(n)
            .map_or_else(|| n.to_string(), |name| (*name).to_string()),
    })
}

/// A started recording and where the file will be written
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StartedRecording {
    #[serde(flatten)]
    pub info: EgressInfo,
    pub filepath: PathBuf,
}

#[derive(Serialize)]
struct EncodedFileOutput<'a> {
    file_type: &'static str,
    filepath: &'a str,
}

#[derive(Serialize)]
struct RoomCompositeEgressRequest<'a> {
    room_name: &'a str,
    layout: &'static str,
    file_outputs: Vec<EncodedFileOutput<'a>>,
}

#[derive(Serialize)]
struct StopEgressRequest<'a> {
    egress_id: &'a str,
}

#[derive(Serialize)]
struct ListEgressRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    room_name: Option<&'a str>,
}

#[derive(Deserialize)]
struct ListEgressResponse {
    #[serde(default)]
    items: Vec<EgressInfo>,
}

/// Client for the egress service
#[derive(Debug, Clone)]
pub struct EgressClient {
    twirp: TwirpClient,
    recordings_dir: PathBuf,
}

impl EgressClient {
    /// Client for the project at `url`
    ///
    /// # Errors
    ///
    /// Returns error if `url` is blank
    pub fn new(url: &str, credentials: ApiCredentials) -> Result<Self> {
        Ok(Self {
            twirp: TwirpClient::new(url, credentials)?,
            recordings_dir: PathBuf::from(DEFAULT_RECORDINGS_DIR),
        })
    }

    /// Directory for recordings started without an explicit output
    #[must_use]
    pub fn with_recordings_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.recordings_dir = dir.into();
        self
    }

    fn grants() -> VideoGrants {
        VideoGrants {
            room_record: true,
            ..VideoGrants::default()
        }
    }

    /// Record every participant of `room` into an MP4 file
    ///
    /// Without `output` the file goes to
    /// `<recordings_dir>/<room>_<YYYYmmdd_HHMMSS>.mp4`. Local parent
    /// directories are created; remote (`scheme://`) outputs are passed
    /// through untouched.
    ///
    /// # Errors
    ///
    /// Returns error if the room is blank, the directory cannot be created,
    /// or the service rejects the request
    pub async fn start_room_composite(
        &self,
        room: &str,
        output: Option<&Path>,
        layout: RecordingLayout,
    ) -> Result<StartedRecording> {
        if room.trim().is_empty() {
            return Err(Error::InvalidInput("room name must not be empty".to_string()));
        }

        let filepath = output.map_or_else(
            || default_output_path(&self.recordings_dir, room, Local::now()),
            Path::to_path_buf,
        );
        let filepath_str = filepath.to_string_lossy().into_owned();

        if !filepath_str.contains("://")
            && let Some(parent) = filepath.parent().filter(|p| !p.as_os_str().is_empty())
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        tracing::info!(
            room = %room,
            layout = %layout,
            filepath = %filepath.display(),
            endpoint = %self.twirp.base_url(),
            "starting room recording"
        );

        let request = RoomCompositeEgressRequest {
            room_name: room,
            layout: layout.as_str(),
            file_outputs: vec![EncodedFileOutput {
                file_type: "MP4",
                filepath: &filepath_str,
            }],
        };

        let info: EgressInfo = self
            .twirp
            .call(SERVICE, "StartRoomCompositeEgress", Self::grants(), &request)
            .await?;

        tracing::info!(egress_id = %info.egress_id, status = %info.status, "recording started");

        Ok(StartedRecording { info, filepath })
    }

    /// Stop an active recording
    ///
    /// # Errors
    ///
    /// Returns error if the id is blank or the service rejects the request
    pub async fn stop(&self, egress_id: &str) -> Result<EgressInfo> {
        if egress_id.trim().is_empty() {
            return Err(Error::InvalidInput("egress id must not be empty".to_string()));
        }

        let info: EgressInfo = self
            .twirp
            .call(SERVICE, "StopEgress", Self::grants(), &StopEgressRequest { egress_id })
            .await?;

        tracing::info!(egress_id = %info.egress_id, status = %info.status, "recording stopped");
        Ok(info)
    }

    /// List recordings, optionally only those of `room`
    ///
    /// # Errors
    ///
    /// Returns error if the service rejects the request
    pub async fn list(&self, room: Option<&str>) -> Result<Vec<EgressInfo>> {
        let request = ListEgressRequest {
            room_name: room.filter(|r| !r.trim().is_empty()),
        };

        let response: ListEgressResponse = self
            .twirp
            .call(SERVICE, "ListEgress", Self::grants(), &request)
            .await?;

        tracing::debug!(count = response.items.len(), "listed recordings");
        Ok(response.items)
    }
}

/// `<dir>/<room>_<YYYYmmdd_HHMMSS>.mp4`
#[must_use]
pub fn default_output_path(dir: &Path, room: &str, now: DateTime<Local>) -> PathBuf {
    dir.join(format!("{room}_{}.mp4", now.format("%Y%m%d_%H%M%S")))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_default_output_path() {
        let now = Local.with_ymd_and_hms(2025, 3, 7, 14, 5, 9).unwrap();
        let path = default_output_path(Path::new("recordings"), "sales-room-1", now);
        assert_eq!(path, PathBuf::from("recordings/sales-room-1_20250307_140509.mp4"));
    }

    #[test]
    fn test_layout_parse() {
        assert_eq!("speaker".parse::<RecordingLayout>().unwrap(), RecordingLayout::Speaker);
        assert_eq!("GRID".parse::<RecordingLayout>().unwrap(), RecordingLayout::Grid);
        assert!("custom".parse::<RecordingLayout>().is_err());
    }

    #[test]
    fn test_egress_info_status_forms() {
        let named: EgressInfo = serde_json::from_str(
            r#"{"egress_id":"EG_1","room_name":"r","status":"EGRESS_ACTIVE"}"#,
        )
        .unwrap();
        assert_eq!(named.status, "EGRESS_ACTIVE");

        let numbered: EgressInfo =
            serde_json::from_str(r#"{"egressId":"EG_2","roomName":"r","status":3}"#).unwrap();
        assert_eq!(numbered.egress_id, "EG_2");
        assert_eq!(numbered.status, "EGRESS_COMPLETE");

        let missing: EgressInfo = serde_json::from_str(r#"{"egress_id":"EG_3"}"#).unwrap();
        assert_eq!(missing.status, "EGRESS_STARTING");
        assert!(missing.room_name.is_empty());
    }

    #[test]
    fn test_start_request_shape() {
        let request = RoomCompositeEgressRequest {
            room_name: "r",
            layout: RecordingLayout::Grid.as_str(),
            file_outputs: vec![EncodedFileOutput {
                file_type: "MP4",
                filepath: "recordings/r.mp4",
            }],
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({
                "room_name": "r",
                "layout": "grid",
                "file_outputs": [{"file_type": "MP4", "filepath": "recordings/r.mp4"}]
            })
        );
    }

    #[test]
    fn test_list_request_omits_missing_room() {
        let json = serde_json::to_string(&ListEgressRequest { room_name: None }).unwrap();
        assert_eq!(json, "{}");
    }
}
