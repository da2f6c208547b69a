//! `submit_lead` function-call definition and argument decoding

use serde_json::{Map, Value, json};

use super::ToolDefinition;
use crate::Result;
use crate::lead::{LeadField, LeadFields, ValidationPolicy};

/// Function name the session host exposes to the model
pub const SUBMIT_LEAD: &str = "submit_lead";

const DESCRIPTION: &str = "Submit captured EdTech lead details. Call once per conversation, \
     after the parent's phone number has been collected.";

/// Build the `submit_lead` definition for `policy`
///
/// The schema's `required` list mirrors the policy so the model and the
/// validator agree on what must be collected. `conversation_id` is not a
/// parameter; it is resolved from the conversation context.
#[must_use]
pub fn definition(policy: &ValidationPolicy) -> ToolDefinition {
    let properties: Map<String, Value> = LeadField::ALL
        .into_iter()
        .map(|field| {
            (
                field.as_str().to_string(),
                json!({ "type": "string", "description": field.description() }),
            )
        })
        .collect();

    let required: Vec<&str> = policy.required().iter().map(|f| f.as_str()).collect();

    ToolDefinition::function(
        SUBMIT_LEAD,
        DESCRIPTION,
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        }),
    )
}

/// Decode the JSON argument string of a `submit_lead` call
///
/// An empty string decodes to no fields, which validation then rejects.
///
/// # Errors
///
/// Returns error if `arguments` is not a JSON object of string/null values
pub fn parse_arguments(arguments: &str) -> Result<LeadFields> {
    if arguments.trim().is_empty() {
        return Ok(LeadFields::default());
    }
    Ok(serde_json::from_str(arguments)?)
}
