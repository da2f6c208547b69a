//! Configuration management for the BANT agent
//!
//! Values resolve as environment > TOML file > defaults. The environment is
//! read through a lookup function so callers (and tests) can supply their own.

pub mod file;

use std::path::PathBuf;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use crate::lead::ValidationPolicy;
use crate::livekit::{
    ApiCredentials, DEFAULT_MAX_PARTICIPANTS, DEFAULT_RECORDINGS_DIR, DEFAULT_TTL, EgressClient,
    RoomServiceClient, TokenIssuer,
};
use crate::{Error, Result};

pub use file::{BantConfigFile, config_file_path, load_config_file, read_config_file};

const DEFAULT_REALTIME_VOICE: &str = "alloy";
const DEFAULT_REALTIME_MODEL: &str = "gpt-realtime";

/// BANT agent configuration
#[derive(Debug)]
pub struct Config {
    /// Media server project and credentials
    pub livekit: LiveKitConfig,

    /// Room token lifetime
    pub token_ttl: Duration,

    /// Participant cap embedded in room tokens
    pub max_participants: u32,

    /// Directory for recordings started without an explicit output
    pub recordings_dir: PathBuf,

    /// Required-field policy for `submit_lead`
    pub lead_policy: ValidationPolicy,

    /// `SQLite` lead store (`~/.local/share/bant-agent/leads.db` on Linux)
    pub lead_db: PathBuf,

    /// Realtime model settings handed to the session host
    pub realtime: RealtimeConfig,
}

/// Media server project settings
#[derive(Default)]
pub struct LiveKitConfig {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub api_secret: Option<SecretString>,
}

impl std::fmt::Debug for LiveKitConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveKitConfig")
            .field("url", &self.url)
            .field("api_key", &self.api_key)
            .field("api_secret", &self.api_secret.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl LiveKitConfig {
    /// Signing credentials
    ///
    /// # Errors
    ///
    /// Returns a config error naming every missing variable
    pub fn credentials(&self) -> Result<ApiCredentials> {
        let (key, secret) = (self.api_key.as_deref(), self.secret());
        match (key, secret) {
            (Some(key), Some(secret)) => ApiCredentials::new(key, secret),
            _ => Err(missing(&[
                ("LIVEKIT_API_KEY", key.is_none()),
                ("LIVEKIT_API_SECRET", secret.is_none()),
            ])),
        }
    }

    /// Project URL plus signing credentials, for server API calls
    ///
    /// # Errors
    ///
    /// Returns a config error naming every missing variable
    pub fn server(&self) -> Result<(&str, ApiCredentials)> {
        let url = self.url.as_deref();
        let (key, secret) = (self.api_key.as_deref(), self.secret());
        match (url, key, secret) {
            (Some(url), Some(key), Some(secret)) => Ok((url, ApiCredentials::new(key, secret)?)),
            _ => Err(missing(&[
                ("LIVEKIT_URL", url.is_none()),
                ("LIVEKIT_API_KEY", key.is_none()),
                ("LIVEKIT_API_SECRET", secret.is_none()),
            ])),
        }
    }

    fn secret(&self) -> Option<&str> {
        self.api_secret.as_ref().map(ExposeSecret::expose_secret)
    }
}

fn missing(vars: &[(&str, bool)]) -> Error {
    let names: Vec<&str> = vars
        .iter()
        .filter(|(_, absent)| *absent)
        .map(|(name, _)| *name)
        .collect();
    Error::Config(format!("{} must be set", names.join(", ")))
}

/// Realtime speech-to-speech model settings
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct RealtimeConfig {
    pub voice: String,
    pub model: String,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            voice: DEFAULT_REALTIME_VOICE.to_string(),
            model: DEFAULT_REALTIME_MODEL.to_string(),
        }
    }
}

/// Default lead database path
#[must_use]
pub fn default_lead_db() -> PathBuf {
    directories::BaseDirs::new().map_or_else(
        || PathBuf::from("leads.db"),
        |d| d.data_dir().join("bant-agent").join("leads.db"),
    )
}

impl Config {
    /// Load configuration from the process environment and config file
    ///
    /// # Errors
    ///
    /// Returns error if a variable is set to an unparseable value, or if
    /// `BANT_CONFIG` names a file that cannot be read or parsed
    pub fn load() -> Result<Self> {
        let env = |name: &str| std::env::var(name).ok();

        // A file named explicitly must be usable; the default one is optional
        let fc = match env("BANT_CONFIG").filter(|p| !p.trim().is_empty()) {
            Some(path) => read_config_file(&PathBuf::from(path))?,
            None => config_file_path()
                .map(|path| load_config_file(&path))
                .unwrap_or_default(),
        };

        Self::from_sources(env, fc)
    }

    /// Resolve configuration from an environment lookup and a parsed file
    ///
    /// Blank environment values count as unset.
    ///
    /// # Errors
    ///
    /// Returns error if a numeric value or the lead policy cannot be parsed
    pub fn from_sources<F>(env: F, fc: BantConfigFile) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| env(name).filter(|v| !v.trim().is_empty());

        let livekit = LiveKitConfig {
            url: var("LIVEKIT_URL").or(fc.livekit.url),
            api_key: var("LIVEKIT_API_KEY").or(fc.livekit.api_key),
            api_secret: var("LIVEKIT_API_SECRET")
                .or(fc.livekit.api_secret)
                .map(SecretString::from),
        };

        let token_ttl = match var("BANT_TOKEN_TTL_SECS") {
            Some(v) => Duration::from_secs(parse_number("BANT_TOKEN_TTL_SECS", &v)?),
            None => fc.tokens.ttl_secs.map_or(DEFAULT_TTL, Duration::from_secs),
        };
        if token_ttl.is_zero() {
            return Err(Error::Config("token TTL must be positive".to_string()));
        }

        let max_participants = match var("BANT_MAX_PARTICIPANTS") {
            Some(v) => parse_number("BANT_MAX_PARTICIPANTS", &v)?,
            None => fc.tokens.max_participants.unwrap_or(DEFAULT_MAX_PARTICIPANTS),
        };

        let recordings_dir = var("BANT_RECORDINGS_DIR")
            .or(fc.recording.dir)
            .map_or_else(|| PathBuf::from(DEFAULT_RECORDINGS_DIR), PathBuf::from);

        let lead_policy = match var("BANT_LEAD_POLICY").or(fc.leads.policy) {
            Some(v) => v
                .parse()
                .map_err(|e| Error::Config(format!("BANT_LEAD_POLICY: {e}")))?,
            None => ValidationPolicy::standard(),
        };

        let lead_db = var("BANT_LEAD_DB")
            .or(fc.leads.db_path)
            .map_or_else(default_lead_db, PathBuf::from);

        let defaults = RealtimeConfig::default();
        let realtime = RealtimeConfig {
            voice: var("BANT_REALTIME_VOICE")
                .or(fc.realtime.voice)
                .unwrap_or(defaults.voice),
            model: var("BANT_REALTIME_MODEL")
                .or(fc.realtime.model)
                .unwrap_or(defaults.model),
        };

        Ok(Self {
            livekit,
            token_ttl,
            max_participants,
            recordings_dir,
            lead_policy,
            lead_db,
            realtime,
        })
    }

    /// Token issuer for the configured project
    ///
    /// # Errors
    ///
    /// Returns error if the API key or secret is missing
    pub fn token_issuer(&self) -> Result<TokenIssuer> {
        Ok(TokenIssuer::new(self.livekit.credentials()?)
            .with_ttl(self.token_ttl)
            .with_max_participants(self.max_participants))
    }

    /// Egress client for the configured project
    ///
    /// # Errors
    ///
    /// Returns error if the URL, API key or secret is missing
    pub fn egress_client(&self) -> Result<EgressClient> {
        let (url, credentials) = self.livekit.server()?;
        Ok(EgressClient::new(url, credentials)?.with_recordings_dir(&self.recordings_dir))
    }

    /// Room service client for the configured project
    ///
    /// # Errors
    ///
    /// Returns error if the URL, API key or secret is missing
    pub fn room_client(&self) -> Result<RoomServiceClient> {
        let (url, credentials) = self.livekit.server()?;
        RoomServiceClient::new(url, credentials)
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("{name} must be a non-negative integer, got '{value}'")))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::lead::LeadField;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_sources(env_of(&[]), BantConfigFile::default()).unwrap();

        assert_eq!(config.token_ttl, DEFAULT_TTL);
        assert_eq!(config.max_participants, 2);
        assert_eq!(config.recordings_dir, PathBuf::from("recordings"));
        assert_eq!(config.lead_policy, ValidationPolicy::standard());
        assert_eq!(config.realtime.voice, "alloy");
        assert!(config.livekit.url.is_none());
    }

    #[test]
    fn test_env_overrides_file() {
        let mut fc = BantConfigFile::default();
        fc.livekit.url = Some("wss://from-file".to_string());
        fc.tokens.ttl_secs = Some(120);
        fc.leads.policy = Some("strict".to_string());

        let config = Config::from_sources(
            env_of(&[("LIVEKIT_URL", "wss://from-env"), ("BANT_TOKEN_TTL_SECS", "")]),
            fc,
        )
        .unwrap();

        assert_eq!(config.livekit.url.as_deref(), Some("wss://from-env"));
        assert_eq!(config.token_ttl, Duration::from_secs(120));
        assert!(config.lead_policy.is_required(LeadField::BudgetRange));
    }

    #[test]
    fn test_missing_credentials_named() {
        let config = Config::from_sources(
            env_of(&[("LIVEKIT_API_KEY", "key")]),
            BantConfigFile::default(),
        )
        .unwrap();

        let err = config.token_issuer().unwrap_err().to_string();
        assert!(err.contains("LIVEKIT_API_SECRET"));
        assert!(!err.contains("LIVEKIT_API_KEY"));

        let err = config.egress_client().unwrap_err().to_string();
        assert!(err.contains("LIVEKIT_URL"));
        assert!(err.contains("LIVEKIT_API_SECRET"));
    }

    #[test]
    fn test_complete_credentials() {
        let config = Config::from_sources(
            env_of(&[
                ("LIVEKIT_URL", "ws://localhost:7880"),
                ("LIVEKIT_API_KEY", "devkey"),
                ("LIVEKIT_API_SECRET", "secret"),
            ]),
            BantConfigFile::default(),
        )
        .unwrap();

        assert!(config.token_issuer().is_ok());
        assert!(config.egress_client().is_ok());
        assert!(config.room_client().is_ok());
        assert!(!format!("{config:?}").contains("\"secret\""));
    }

    #[test]
    fn test_bad_values_rejected() {
        assert!(
            Config::from_sources(
                env_of(&[("BANT_MAX_PARTICIPANTS", "two")]),
                BantConfigFile::default()
            )
            .is_err()
        );
        assert!(
            Config::from_sources(
                env_of(&[("BANT_TOKEN_TTL_SECS", "0")]),
                BantConfigFile::default()
            )
            .is_err()
        );
        assert!(
            Config::from_sources(
                env_of(&[("BANT_LEAD_POLICY", "email")]),
                BantConfigFile::default()
            )
            .is_err()
        );
    }
}
