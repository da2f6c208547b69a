//! Per-conversation context threaded through lead capture

use uuid::Uuid;

use super::{Lead, Tracking};

/// Lead capture progress for one conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    /// Session created but not yet talking to the parent
    NotStarted,
    /// Conversation in progress; `submit_lead` is allowed once
    Collecting,
    /// Lead captured; terminal
    Submitted,
}

/// Tracking id, capture state and captured lead for one conversation
///
/// Owned by the session that drives the conversation and passed explicitly
/// into [`LeadCapture::submit`](super::LeadCapture::submit).
#[derive(Debug, Clone)]
pub struct ConversationContext {
    conversation_id: Option<String>,
    generate_ids: bool,
    state: CaptureState,
    lead: Option<Lead>,
}

impl ConversationContext {
    /// Create a context, optionally pre-bound to a tracking id
    ///
    /// A blank id counts as unbound.
    #[must_use]
    pub fn new(conversation_id: Option<String>) -> Self {
        Self {
            conversation_id: conversation_id.filter(|id| !id.trim().is_empty()),
            generate_ids: true,
            state: CaptureState::NotStarted,
            lead: None,
        }
    }

    /// Forbid generating a tracking id at submission time
    #[must_use]
    pub const fn without_id_generation(mut self) -> Self {
        self.generate_ids = false;
        self
    }

    /// Enter `Collecting`; no-op once the conversation has started
    pub fn begin(&mut self) {
        if self.state == CaptureState::NotStarted {
            self.state = CaptureState::Collecting;
        }
    }

    /// Bound tracking id, if any
    #[must_use]
    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    /// Current capture state
    #[must_use]
    pub const fn state(&self) -> CaptureState {
        self.state
    }

    /// The lead captured in this conversation, once submitted
    #[must_use]
    pub const fn captured_lead(&self) -> Option<&Lead> {
        self.lead.as_ref()
    }

    /// Resolve the tracking id: bound first, then freshly generated
    ///
    /// A generated id is bound so later lookups agree with the emitted lead.
    pub(crate) fn resolve_tracking(&mut self) -> (Option<String>, Tracking) {
        if let Some(id) = &self.conversation_id {
            return (Some(id.clone()), Tracking::Bound);
        }

        if self.generate_ids {
            let id = Uuid::new_v4().to_string();
            self.conversation_id = Some(id.clone());
            return (Some(id), Tracking::Generated);
        }

        (None, Tracking::Unavailable)
    }

    pub(crate) fn mark_submitted(&mut self, lead: Lead) {
        self.state = CaptureState::Submitted;
        self.lead = Some(lead);
    }
}
