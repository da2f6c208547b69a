//! Agent session bootstrap and tool-call routing
//!
//! One [`AgentSession`] per dispatched job. It recovers the tracking id from
//! the dispatch metadata, hands the session host its instructions and tool
//! definitions, and routes function calls into [`LeadCapture`].

use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use crate::lead::{CaptureState, ConversationContext, LeadCapture, SubmissionAck};
use crate::livekit::DispatchMetadata;
use crate::prompt::{self, GREETING_INSTRUCTIONS};
use crate::tools::{self, SUBMIT_LEAD, ToolDefinition};
use crate::{Error, Result};

/// Speaker of a transcript turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            other => Err(Error::InvalidInput(format!("unknown role: {other}"))),
        }
    }
}

/// Model usage reported by the session host
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub input_audio_tokens: u64,
    pub output_audio_tokens: u64,
}

impl TokenUsage {
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

impl std::ops::AddAssign for TokenUsage {
    fn add_assign(&mut self, rhs: Self) {
        self.input_tokens += rhs.input_tokens;
        self.output_tokens += rhs.output_tokens;
        self.input_audio_tokens += rhs.input_audio_tokens;
        self.output_audio_tokens += rhs.output_audio_tokens;
    }
}

/// What a session did, reported at shutdown
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub conversation_id: Option<String>,
    pub user_turns: usize,
    pub assistant_turns: usize,
    pub lead_captured: bool,
    pub usage: TokenUsage,
    pub duration_secs: u64,
}

/// A running voice-agent session
#[derive(Debug)]
pub struct AgentSession {
    capture: LeadCapture,
    ctx: ConversationContext,
    usage: TokenUsage,
    user_turns: usize,
    assistant_turns: usize,
    started: Instant,
}

impl AgentSession {
    /// Start a session from the job's dispatch metadata
    ///
    /// Unparseable metadata or a missing/blank `conversation_id` is logged
    /// and replaced with a fresh id, so every session is tracked.
    #[must_use]
    pub fn start(job_metadata: Option<&str>, capture: LeadCapture) -> Self {
        let supplied = match job_metadata.filter(|m| !m.trim().is_empty()) {
            Some(raw) => match DispatchMetadata::parse(raw) {
                Ok(meta) => meta.conversation_id,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to parse job metadata");
                    None
                }
            },
            None => None,
        };

        let conversation_id = supplied.unwrap_or_else(|| {
            let id = Uuid::new_v4().to_string();
            tracing::warn!(conversation_id = %id, "no conversation_id in job metadata; generated one");
            id
        });

        let mut ctx = ConversationContext::new(Some(conversation_id));
        ctx.begin();

        tracing::info!(conversation_id = ?ctx.conversation_id(), "agent session started");

        Self {
            capture,
            ctx,
            usage: TokenUsage::default(),
            user_turns: 0,
            assistant_turns: 0,
            started: Instant::now(),
        }
    }

    #[must_use]
    pub fn conversation_id(&self) -> Option<&str> {
        self.ctx.conversation_id()
    }

    #[must_use]
    pub const fn context(&self) -> &ConversationContext {
        &self.ctx
    }

    /// System prompt for the realtime model
    #[must_use]
    pub fn instructions(&self) -> String {
        prompt::build_instructions(self.capture.policy())
    }

    /// Instruction for the agent's opening turn
    #[must_use]
    pub const fn greeting(&self) -> &'static str {
        GREETING_INSTRUCTIONS
    }

    /// Function tools to register with the session host
    #[must_use]
    pub fn tools(&self) -> Vec<ToolDefinition> {
        vec![tools::submit_lead::definition(self.capture.policy())]
    }

    /// Route a function call from the model
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownTool`] for anything but `submit_lead`,
    /// otherwise whatever [`LeadCapture::submit`] returns
    pub fn handle_tool_call(&mut self, name: &str, arguments: &str) -> Result<SubmissionAck> {
        if name != SUBMIT_LEAD {
            tracing::warn!(conversation_id = ?self.ctx.conversation_id(), tool = %name, "unknown tool call");
            return Err(Error::UnknownTool(name.to_string()));
        }

        let fields = tools::submit_lead::parse_arguments(arguments)?;
        self.capture.submit(&mut self.ctx, fields)
    }

    /// Route a function call and render the result for the model
    ///
    /// Failures become `{"status": "error", "message": ...}` so the dialogue
    /// can recover (for example by asking for a missing field).
    #[must_use]
    pub fn tool_output(&mut self, name: &str, arguments: &str) -> String {
        let value = match self.handle_tool_call(name, arguments) {
            Ok(ack) => json!({ "status": ack.status, "message": ack.message }),
            Err(e) => json!({ "status": "error", "message": e.to_string() }),
        };
        value.to_string()
    }

    /// Log a transcript turn
    pub fn record_item(&mut self, role: Role, text: &str) {
        match role {
            Role::User => self.user_turns += 1,
            Role::Assistant => self.assistant_turns += 1,
        }
        tracing::info!(
            conversation_id = ?self.ctx.conversation_id(),
            role = %role,
            text = %text,
            "conversation item"
        );
    }

    /// Accumulate usage reported by the host
    pub fn record_usage(&mut self, usage: TokenUsage) {
        self.usage += usage;
        tracing::debug!(
            conversation_id = ?self.ctx.conversation_id(),
            total_tokens = self.usage.total(),
            "usage updated"
        );
    }

    /// End the session and report what happened
    #[must_use]
    pub fn close(self) -> SessionSummary {
        let summary = SessionSummary {
            conversation_id: self.ctx.conversation_id().map(ToString::to_string),
            user_turns: self.user_turns,
            assistant_turns: self.assistant_turns,
            lead_captured: self.ctx.state() == CaptureState::Submitted,
            usage: self.usage,
            duration_secs: self.started.elapsed().as_secs(),
        };

        tracing::info!(
            conversation_id = ?summary.conversation_id,
            user_turns = summary.user_turns,
            assistant_turns = summary.assistant_turns,
            lead_captured = summary.lead_captured,
            input_tokens = summary.usage.input_tokens,
            output_tokens = summary.usage.output_tokens,
            "agent session closed"
        );

        summary
    }
}
