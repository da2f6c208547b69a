//! BANT agent - lead capture for an EdTech qualification voice agent
//!
//! This library provides the pieces around the realtime voice session:
//! - The lead capture contract (`submit_lead` validation, tracking, emission)
//! - Persona instructions and tool definitions for the session host
//! - Room access tokens carrying the conversation's tracking id
//! - Recording (egress) and room service clients
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │        bant CLI  (token │ record │ room │ leads)      │
//! └───────────┬──────────────────────────────┬───────────┘
//!             │ conversation_id in JWT        │ Twirp JSON
//! ┌───────────▼───────────┐       ┌──────────▼───────────┐
//! │  Media server (rooms) │──────▶│ Egress / RoomService │
//! └───────────┬───────────┘       └──────────────────────┘
//!             │ dispatch metadata
//! ┌───────────▼──────────────────────────────────────────┐
//! │  AgentSession ─▶ LeadCapture ─▶ Console │ SQLite     │
//! └──────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod db;
pub mod error;
pub mod lead;
pub mod livekit;
pub mod prompt;
pub mod session;
pub mod tools;

pub use config::Config;
pub use db::{DbConn, DbPool, LeadRepo, StoredLead};
pub use error::{Error, Result};
pub use lead::{
    CaptureState, ConsoleSink, ConversationContext, Lead, LeadCapture, LeadField, LeadFields,
    LeadSink, MemorySink, SubmissionAck, Tracking, ValidationError, ValidationPolicy,
};
pub use livekit::{
    ApiCredentials, DispatchMetadata, EgressClient, EgressInfo, IssuedToken, RecordingLayout,
    RoomServiceClient, TokenIssuer,
};
pub use session::{AgentSession, Role, SessionSummary, TokenUsage};
pub use tools::ToolDefinition;
