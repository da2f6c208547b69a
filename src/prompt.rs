//! Persona instructions for the BANT qualification call
//!
//! The required/optional field lists are rendered from the active
//! [`ValidationPolicy`] so the prompt never asks for less than the
//! validator demands.

use std::fmt::Write as _;

use crate::lead::{LeadField, ValidationPolicy};
use crate::tools::SUBMIT_LEAD;

/// Persona name spoken in the introduction
pub const AGENT_NAME: &str = "Alex";

/// Company name spoken in the introduction
pub const COMPANY_NAME: &str = "XYZ Edtech";

/// Instruction for the agent's first turn
pub const GREETING_INSTRUCTIONS: &str = "Greet the parent warmly, introduce yourself as a friendly \
     assistant from the EdTech company, say you would like to know a little about the student, \
     and ask which class their child is studying in.";

const PERSONA: &str = "\
You are {agent}, a friendly voice assistant from {company}, speaking with a parent.
Speak ONLY in English. Introduce yourself at the start and explain that you are calling to help \
find the right learning support for their child. Never describe yourself as a sales agent.

## Tone
Warm, encouraging, informal and patient. Sound like a helpful mentor, not a salesperson. \
Keep every reply short, ask ONE question at a time, and use polite phrasing \
(\"May I\", \"Could you please\", \"Thank you\").

## What to learn (BANT)
- BUDGET: the fee range they are comfortable with, always asked in Indian Rupees (₹).
- AUTHORITY: who decides about the child's education.
- NEED: the child's class, subjects, academic goals and weak areas.
- TIMELINE: when they want to start, upcoming exams, and how urgent it is.

## Contact details
The parent's phone number is MANDATORY; ask for it politely as your last question. \
Never ask for an email address.

## Calling {tool}
Once you have the required details, call `{tool}` exactly ONCE per conversation.

Required fields:
{required}
Optional fields (include them when the parent shared them):
{optional}
After `{tool}` succeeds, thank the parent, tell them a counselor will reach out soon, \
and wrap up politely. If it fails because details are missing, ask for them and try again.
";

/// Render the system prompt for `policy`
#[must_use]
pub fn build_instructions(policy: &ValidationPolicy) -> String {
    PERSONA
        .replace("{agent}", AGENT_NAME)
        .replace("{company}", COMPANY_NAME)
        .replace("{tool}", SUBMIT_LEAD)
        .replace("{required}", &field_list(policy.required().iter().copied()))
        .replace("{optional}", &field_list(policy.optional()))
}

fn field_list(fields: impl Iterator<Item = LeadField>) -> String {
    let mut out = String::new();
    for field in fields {
        let _ = writeln!(out, "- `{}`: {}", field.as_str(), field.description());
    }
    if out.is_empty() {
        out.push_str("- (none)\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders_all_replaced() {
        let prompt = build_instructions(&ValidationPolicy::standard());
        for placeholder in ["{agent}", "{company}", "{tool}", "{required}", "{optional}"] {
            assert!(!prompt.contains(placeholder), "{placeholder} left in prompt");
        }
        assert!(prompt.contains("Alex"));
    }

    #[test]
    fn test_standard_sections() {
        let prompt = build_instructions(&ValidationPolicy::standard());
        let (required, optional) = prompt.split_once("Optional fields").unwrap();

        assert!(required.contains("`contact_phone`"));
        assert!(!required.contains("`budget_range`"));
        assert!(optional.contains("`budget_range`"));
        assert!(optional.contains("`child_name`"));
    }

    #[test]
    fn test_strict_moves_bant_fields_to_required() {
        let prompt = build_instructions(&ValidationPolicy::strict());
        let (required, optional) = prompt.split_once("Optional fields").unwrap();

        assert!(required.contains("`budget_range`"));
        assert!(required.contains("`decision_maker`"));
        assert!(!optional.contains("`urgency`"));
    }

    #[test]
    fn test_prompt_forbids_email_and_uses_rupees() {
        let prompt = build_instructions(&ValidationPolicy::standard());
        assert!(prompt.contains("Never ask for an email"));
        assert!(prompt.contains('₹'));
        assert!(prompt.contains("exactly ONCE"));
    }
}
