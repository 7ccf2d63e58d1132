//! Experiment results

use serde::Serialize;
use serde_json::Value;

use crate::mcp::Endpoint;

/// A tool call the model made, with the server that owns the tool
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolCallRecord {
    pub tool_name: String,
    pub arguments: Value,
    /// `None` when the model named a tool no endpoint offered
    pub server: Option<Endpoint>,
}

/// Outcome of one tool-selection experiment
///
/// Tools are never executed; the record only captures what was offered and
/// what the model picked.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExperimentRecord {
    pub user_query: String,
    pub available_tools: Vec<String>,
    /// Endpoints that contributed tools, comma separated, or "unknown"
    pub selected_server: String,
    /// Name from the last tool call
    pub selected_tool: Option<String>,
    pub tool_arguments: Option<Value>,
    pub llm_response: Option<String>,
    pub tool_calls: Vec<ToolCallRecord>,
}

impl ExperimentRecord {
    /// Server of the first call to the selected tool
    pub fn selected_tool_server(&self) -> Option<&Endpoint> {
        let selected = self.selected_tool.as_deref()?;
        self.tool_calls
            .iter()
            .find(|call| call.tool_name == selected)
            .and_then(|call| call.server.as_ref())
    }

    pub fn chose_tool(&self) -> bool {
        self.selected_tool.is_some()
    }
}
