//! TOML configuration file loading
//!
//! Supports `~/.config/bant-agent/config.toml` (or `$BANT_CONFIG`) as a
//! persistent config source. All fields are optional; the file is a partial
//! overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{Error, Result};

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct BantConfigFile {
    /// Media server project and credentials
    #[serde(default)]
    pub livekit: LiveKitFileConfig,

    /// Room token issuance
    #[serde(default)]
    pub tokens: TokensFileConfig,

    /// Recording output
    #[serde(default)]
    pub recording: RecordingFileConfig,

    /// Lead validation and storage
    #[serde(default)]
    pub leads: LeadsFileConfig,

    /// Realtime speech-to-speech model settings handed to the session host
    #[serde(default)]
    pub realtime: RealtimeFileConfig,
}

#[derive(Debug, Default, Deserialize)]
pub struct LiveKitFileConfig {
    /// Project URL (e.g. "wss://demo.livekit.cloud")
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TokensFileConfig {
    pub ttl_secs: Option<u64>,
    pub max_participants: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RecordingFileConfig {
    pub dir: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LeadsFileConfig {
    /// "standard", "strict", or a comma-separated field list
    pub policy: Option<String>,
    /// `SQLite` database path
    pub db_path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RealtimeFileConfig {
    pub voice: Option<String>,
    pub model: Option<String>,
}

/// Read and parse the TOML config file at `path`
///
/// Blank strings count as unset, the same as blank environment variables.
///
/// # Errors
///
/// Returns error if the file cannot be read or is not valid TOML
pub fn read_config_file(path: &Path) -> Result<BantConfigFile> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("cannot read config file {}: {e}", path.display()))
    })?;

    let mut config: BantConfigFile = toml::from_str(&content)?;
    config.clear_blank_values();

    tracing::info!(path = %path.display(), "loaded config file");
    Ok(config)
}

/// Load the config file at the default location, if there is a usable one
///
/// A missing file is normal. An unreadable or invalid file is logged and
/// ignored so token commands keep working from the environment alone.
pub fn load_config_file(path: &Path) -> BantConfigFile {
    if !path.exists() {
        return BantConfigFile::default();
    }

    read_config_file(path).unwrap_or_else(|e| {
        tracing::warn!(path = %path.display(), error = %e, "ignoring config file");
        BantConfigFile::default()
    })
}

impl BantConfigFile {
    fn clear_blank_values(&mut self) {
        for value in [
            &mut self.livekit.url,
            &mut self.livekit.api_key,
            &mut self.livekit.api_secret,
            &mut self.recording.dir,
            &mut self.leads.policy,
            &mut self.leads.db_path,
            &mut self.realtime.voice,
            &mut self.realtime.model,
        ] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                *value = None;
            }
        }
    }
}

/// Return the default config file path: `~/.config/bant-agent/config.toml`
#[must_use]
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("bant-agent").join("config.toml"))
}
