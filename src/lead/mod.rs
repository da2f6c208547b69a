//! Lead capture contract
//!
//! A conversation may produce exactly one [`Lead`]: the structured summary
//! of a qualified parent, captured through the `submit_lead` function call.
//!
//! - [`LeadFields`] is the raw argument record supplied by the dialogue policy
//! - [`ValidationPolicy`] decides which fields must be present
//! - [`LeadCapture`] enforces the contract and emits to [`LeadSink`]s
//! - [`ConversationContext`] carries the tracking id and capture state for
//!   one conversation

mod capture;
mod context;
mod policy;
mod sink;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use capture::{LeadCapture, SubmissionAck, Tracking};
pub use context::{CaptureState, ConversationContext};
pub use policy::ValidationPolicy;
pub use sink::{
    ConsoleSink, LeadSink, MemorySink, RECORD_FOOTER, RECORD_HEADER, format_record, parse_record,
    parse_records,
};

/// A recognized lead field
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadField {
    ChildName,
    ChildClass,
    Subjects,
    ExamInfo,
    BudgetRange,
    DecisionMaker,
    Timeline,
    Urgency,
    ContactPhone,
}

impl LeadField {
    /// Every field, in record order
    pub const ALL: [Self; 9] = [
        Self::ChildName,
        Self::ChildClass,
        Self::Subjects,
        Self::ExamInfo,
        Self::BudgetRange,
        Self::DecisionMaker,
        Self::Timeline,
        Self::Urgency,
        Self::ContactPhone,
    ];

    /// Fields every policy requires
    pub const CORE: [Self; 3] = [Self::ChildClass, Self::Subjects, Self::ContactPhone];

    /// Wire name used in the tool schema and the emitted record
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ChildName => "child_name",
            Self::ChildClass => "child_class",
            Self::Subjects => "subjects",
            Self::ExamInfo => "exam_info",
            Self::BudgetRange => "budget_range",
            Self::DecisionMaker => "decision_maker",
            Self::Timeline => "timeline",
            Self::Urgency => "urgency",
            Self::ContactPhone => "contact_phone",
        }
    }

    /// Short guidance for the model, used in the tool schema and prompt
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::ChildName => "Child's first name, if the parent shares it",
            Self::ChildClass => "Class or grade the child is studying in (e.g. \"10th\", \"Class 5\")",
            Self::Subjects => "Subjects the child needs help with (e.g. \"Physics, Chemistry\")",
            Self::ExamInfo => "Upcoming exams or test preparation needs (e.g. \"NEET next year\")",
            Self::BudgetRange => "Comfortable fee range in Indian Rupees (e.g. \"Under ₹10,000/month\")",
            Self::DecisionMaker => "Who decides about the child's education (e.g. \"Both parents\")",
            Self::Timeline => "When they want to start (e.g. \"this week\", \"next term\")",
            Self::Urgency => "How urgent the need is (e.g. \"Immediate\", \"Planning ahead\")",
            Self::ContactPhone => "Parent's phone number for counselor follow-up",
        }
    }

    /// Whether every policy requires this field
    #[must_use]
    pub fn is_core(self) -> bool {
        Self::CORE.contains(&self)
    }
}

impl fmt::Display for LeadField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeadField {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == s.trim())
            .ok_or_else(|| crate::Error::InvalidInput(format!("unknown lead field: {s}")))
    }
}

/// Raw `submit_lead` arguments as supplied by the dialogue policy
///
/// Every field is optional here; [`ValidationPolicy`] decides which must be
/// present. Unknown keys (including any `conversation_id` the model invents)
/// are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LeadFields {
    pub child_name: Option<String>,
    pub child_class: Option<String>,
    pub subjects: Option<String>,
    pub exam_info: Option<String>,
    pub budget_range: Option<String>,
    pub decision_maker: Option<String>,
    pub timeline: Option<String>,
    pub urgency: Option<String>,
    pub contact_phone: Option<String>,
}

impl LeadFields {
    /// Value supplied for a field, if any
    #[must_use]
    pub fn get(&self, field: LeadField) -> Option<&str> {
        let value = match field {
            LeadField::ChildName => &self.child_name,
            LeadField::ChildClass => &self.child_class,
            LeadField::Subjects => &self.subjects,
            LeadField::ExamInfo => &self.exam_info,
            LeadField::BudgetRange => &self.budget_range,
            LeadField::DecisionMaker => &self.decision_maker,
            LeadField::Timeline => &self.timeline,
            LeadField::Urgency => &self.urgency,
            LeadField::ContactPhone => &self.contact_phone,
        };
        value.as_deref()
    }

    /// Whether a field holds a non-blank value
    #[must_use]
    pub fn is_filled(&self, field: LeadField) -> bool {
        self.get(field).is_some_and(|v| !v.trim().is_empty())
    }
}

/// The structured record produced once per conversation
///
/// Field order is the emitted key order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lead {
    pub conversation_id: Option<String>,
    pub child_name: Option<String>,
    pub child_class: String,
    pub subjects: String,
    pub exam_info: Option<String>,
    pub budget_range: Option<String>,
    pub decision_maker: Option<String>,
    pub timeline: Option<String>,
    pub urgency: Option<String>,
    pub contact_phone: String,
}

impl Lead {
    /// Validate `fields` against `policy` and build the lead
    ///
    /// Values are kept verbatim; only the emptiness check trims.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] listing every required field that is
    /// missing or blank
    pub fn from_fields(
        fields: LeadFields,
        policy: &ValidationPolicy,
        conversation_id: Option<String>,
    ) -> Result<Self, ValidationError> {
        let missing = policy.missing(&fields);
        if !missing.is_empty() {
            return Err(ValidationError { missing });
        }

        let LeadFields {
            child_name,
            child_class: Some(child_class),
            subjects: Some(subjects),
            exam_info,
            budget_range,
            decision_maker,
            timeline,
            urgency,
            contact_phone: Some(contact_phone),
        } = fields
        else {
            return Err(ValidationError {
                missing: LeadField::CORE.to_vec(),
            });
        };

        Ok(Self {
            conversation_id,
            child_name,
            child_class,
            subjects,
            exam_info,
            budget_range,
            decision_maker,
            timeline,
            urgency,
            contact_phone,
        })
    }

    /// The supplied field values, without the tracking id
    #[must_use]
    pub fn fields(&self) -> LeadFields {
        LeadFields {
            child_name: self.child_name.clone(),
            child_class: Some(self.child_class.clone()),
            subjects: Some(self.subjects.clone()),
            exam_info: self.exam_info.clone(),
            budget_range: self.budget_range.clone(),
            decision_maker: self.decision_maker.clone(),
            timeline: self.timeline.clone(),
            urgency: self.urgency.clone(),
            contact_phone: Some(self.contact_phone.clone()),
        }
    }
}

/// Required lead fields missing or blank at submission time
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("missing required lead fields: {}", display_fields(.missing))]
pub struct ValidationError {
    /// Every required field that failed, in record order
    pub missing: Vec<LeadField>,
}

fn display_fields(fields: &[LeadField]) -> String {
    fields
        .iter()
        .map(|f| f.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
