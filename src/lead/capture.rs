//! `submit_lead` enforcement: state guard, validation, tracking, emission

use std::sync::Arc;

use serde::Serialize;

use super::{CaptureState, ConversationContext, Lead, LeadFields, LeadSink, ValidationPolicy};
use crate::{Error, Result};

/// Acknowledgment returned to the dialogue policy
const ACK_MESSAGE: &str = "Lead captured. A counselor will follow up soon.";

/// How the tracking id of a submitted lead was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tracking {
    /// Already bound to the conversation
    Bound,
    /// Generated at submission time
    Generated,
    /// Nothing bound and generation disabled; lead emitted with a null id
    Unavailable,
}

/// Result of a successful `submit_lead` call
///
/// Serializes to `{"status": "ok", "message": ...}`; no lead fields are
/// echoed back to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionAck {
    pub status: &'static str,
    pub message: &'static str,
    #[serde(skip)]
    pub tracking: Tracking,
}

/// Enforces the lead capture contract
///
/// Cheap to clone and shared across conversations; per-conversation state
/// lives in [`ConversationContext`].
#[derive(Clone, Default)]
pub struct LeadCapture {
    policy: Arc<ValidationPolicy>,
    sinks: Vec<Arc<dyn LeadSink>>,
}

impl LeadCapture {
    /// Capture with `policy` and no sinks
    #[must_use]
    pub fn new(policy: ValidationPolicy) -> Self {
        Self {
            policy: Arc::new(policy),
            sinks: Vec::new(),
        }
    }

    /// Add an emission sink; sinks are written in insertion order
    ///
    /// The first sink decides whether a lead was captured: if it fails the
    /// conversation stays open, and if it accepts the lead is sealed even
    /// when a later sink fails. Register the durable store first.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn LeadSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Active validation policy
    #[must_use]
    pub fn policy(&self) -> &ValidationPolicy {
        &self.policy
    }

    /// Validate, resolve tracking, emit and seal the conversation's lead
    ///
    /// # Errors
    ///
    /// - [`Error::SessionNotStarted`] if the conversation never began
    /// - [`Error::DuplicateSubmission`] if a lead was already submitted
    /// - [`Error::Validation`] if a required field is missing or blank;
    ///   nothing is emitted and the dialogue may ask again
    /// - any error of the first sink; nothing was emitted and the
    ///   conversation stays in `Collecting`
    pub fn submit(&self, ctx: &mut ConversationContext, fields: LeadFields) -> Result<SubmissionAck> {
        match ctx.state() {
            CaptureState::NotStarted => return Err(Error::SessionNotStarted),
            CaptureState::Submitted => {
                tracing::warn!(
                    conversation_id = ?ctx.conversation_id(),
                    "rejected duplicate lead submission"
                );
                return Err(Error::DuplicateSubmission {
                    conversation_id: ctx.conversation_id().map(ToString::to_string),
                });
            }
            CaptureState::Collecting => {}
        }

        let missing = self.policy.missing(&fields);
        if !missing.is_empty() {
            tracing::info!(
                conversation_id = ?ctx.conversation_id(),
                missing = ?missing,
                "lead submission incomplete"
            );
        }

        // Validate before resolving so a rejected call never binds a fresh id
        let mut lead = Lead::from_fields(fields, &self.policy, None)?;

        let (conversation_id, tracking) = ctx.resolve_tracking();
        if tracking == Tracking::Unavailable {
            tracing::warn!("no conversation id available; emitting lead without tracking");
        }
        lead.conversation_id = conversation_id;

        // The first sink is the record of truth; once it accepts, the lead
        // counts as emitted and the conversation is sealed
        let Some((primary, rest)) = self.sinks.split_first() else {
            tracing::warn!(conversation_id = ?lead.conversation_id, "no lead sinks configured");
            ctx.mark_submitted(lead);
            return Ok(Self::ack(tracking));
        };

        primary.emit(&lead).inspect_err(|e| {
            tracing::error!(
                conversation_id = ?lead.conversation_id,
                sink = primary.name(),
                error = %e,
                "failed to emit lead"
            );
        })?;

        let mut delivered = 1;
        for sink in rest {
            match sink.emit(&lead) {
                Ok(()) => delivered += 1,
                Err(e) => tracing::warn!(
                    conversation_id = ?lead.conversation_id,
                    sink = sink.name(),
                    error = %e,
                    "secondary sink failed; lead already recorded"
                ),
            }
        }

        tracing::info!(
            conversation_id = ?lead.conversation_id,
            tracking = ?tracking,
            sinks = self.sinks.len(),
            delivered,
            "lead captured"
        );

        ctx.mark_submitted(lead);

        Ok(Self::ack(tracking))
    }

    const fn ack(tracking: Tracking) -> SubmissionAck {
        SubmissionAck {
            status: "ok",
            message: ACK_MESSAGE,
            tracking,
        }
    }
}

impl std::fmt::Debug for LeadCapture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LeadCapture")
            .field("policy", &self.policy)
            .field(
                "sinks",
                &self.sinks.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
