//! Tool server whose tools are distinguishable only by their schemas

use mcp_common::{text_success, McpError};
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Implementation, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Description shared by every tool on this server
pub const COMMON_DESCRIPTION: &str =
    "This is a general-purpose data processing tool that can handle various types of input data";

#[derive(Clone)]
pub struct ExperimentMcpServer {
    tool_router: ToolRouter<Self>,
}

// ============================================================================
// Parameter Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct OneParam {
    pub data_input: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct TwoParams {
    pub content: String,
    pub mode: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ThreeParams {
    pub text: String,
    pub count: i64,
    pub format_type: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct FourParams {
    pub value: String,
    pub threshold: i64,
    pub category: String,
    pub enable_cache: bool,
}

// ============================================================================
// Tool Router Implementation
// ============================================================================

#[tool_router]
impl ExperimentMcpServer {
    pub fn new() -> Self {
        Self {
            tool_router: Self::tool_router(),
        }
    }

    #[tool(description = "This is a general-purpose data processing tool that can handle various types of input data")]
    async fn tool_xy87(
        &self,
        Parameters(p): Parameters<OneParam>,
    ) -> Result<CallToolResult, McpError> {
        Ok(text_success(format!("Processed data: {}", p.data_input)))
    }

    #[tool(description = "This is a general-purpose data processing tool that can handle various types of input data")]
    async fn tool_ty32(
        &self,
        Parameters(p): Parameters<TwoParams>,
    ) -> Result<CallToolResult, McpError> {
        Ok(text_success(format!(
            "Processed content: {}, mode: {}",
            p.content, p.mode
        )))
    }

    #[tool(description = "This is a general-purpose data processing tool that can handle various types of input data")]
    async fn tool_nt68(
        &self,
        Parameters(p): Parameters<ThreeParams>,
    ) -> Result<CallToolResult, McpError> {
        Ok(text_success(format!(
            "Executed text: {}, count: {}, format: {}",
            p.text, p.count, p.format_type
        )))
    }

    #[tool(description = "This is a general-purpose data processing tool that can handle various types of input data")]
    async fn tool_lk72(
        &self,
        Parameters(p): Parameters<FourParams>,
    ) -> Result<CallToolResult, McpError> {
        Ok(text_success(format!(
            "Operated value: {}, threshold: {}, category: {}, cache: {}",
            p.value, p.threshold, p.category, p.enable_cache
        )))
    }
}

// ============================================================================
// Server Handler Implementation
// ============================================================================

#[tool_handler]
impl rmcp::ServerHandler for ExperimentMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Experiment Server - opaque tools sharing one description, differing \
                 only in parameter count."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "Experiment Server".into(),
                ..Implementation::from_build_env()
            },
            ..Default::default()
        }
    }
}

impl Default for ExperimentMcpServer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmcp::ServerHandler;

    #[test]
    fn test_advertises_server_name() {
        let info = ExperimentMcpServer::new().get_info();
        assert_eq!(info.server_info.name, "Experiment Server");
        assert!(info.capabilities.tools.is_some());
    }

    #[test]
    fn test_all_tools_share_description() {
        let server = ExperimentMcpServer::new();
        let tools = server.tool_router.list_all();
        assert_eq!(tools.len(), 4);
        for tool in &tools {
            assert_eq!(tool.description.as_deref(), Some(COMMON_DESCRIPTION));
        }
    }

    #[test]
    fn test_parameter_counts_grow_by_one() {
        let server = ExperimentMcpServer::new();
        let tools = server.tool_router.list_all();
        let count = |name: &str| {
            tools
                .iter()
                .find(|t| t.name == name)
                .and_then(|t| t.input_schema.get("properties"))
                .and_then(|p| p.as_object())
                .map(|p| p.len())
        };
        assert_eq!(count("tool_xy87"), Some(1));
        assert_eq!(count("tool_ty32"), Some(2));
        assert_eq!(count("tool_nt68"), Some(3));
        assert_eq!(count("tool_lk72"), Some(4));
    }
}
