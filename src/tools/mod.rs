//! Function tools exposed to the real-time session host

pub mod submit_lead;

use serde::{Deserialize, Serialize};

pub use submit_lead::SUBMIT_LEAD;

/// A function-call definition in the realtime session format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Always `"function"`
    #[serde(rename = "type")]
    pub tool_type: String,
    pub name: String,
    pub description: String,
    /// JSON schema of the arguments object
    pub parameters: serde_json::Value,
}

impl ToolDefinition {
    /// A function tool
    #[must_use]
    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            tool_type: "function".to_owned(),
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}
