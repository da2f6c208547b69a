//! Error types for the BANT agent

use thiserror::Error;

use crate::lead::ValidationError;

/// Result type alias for BANT agent operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the BANT agent
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error (missing credentials, bad endpoint, unreadable config)
    #[error("configuration error: {0}")]
    Config(String),

    /// Required lead fields missing or empty
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// `submit_lead` called again after the conversation already produced a lead
    #[error("lead already submitted for conversation {}", .conversation_id.as_deref().unwrap_or("<untracked>"))]
    DuplicateSubmission { conversation_id: Option<String> },

    /// `submit_lead` called before the conversation began collecting
    #[error("conversation has not started")]
    SessionNotStarted,

    /// Tool call for a function this agent does not expose
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// Caller-supplied argument rejected
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Access token could not be signed
    #[error("token error: {0}")]
    Token(String),

    /// A media server API rejected a request
    #[error("{service} rejected request ({code}): {message}")]
    ExternalService {
        service: String,
        code: String,
        message: String,
    },

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Config file parse error
    #[error("config file error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Database error
    #[error("database error: {0}")]
    Database(String),

    /// `SQLite` error
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl From<jsonwebtoken::errors::Error> for Error {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        Self::Token(e.to_string())
    }
}
