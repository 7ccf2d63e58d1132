//! Tool server with schemas of increasing complexity

use std::collections::HashMap;

use mcp_common::{text_success, tool_error, McpError};
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Implementation, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Baseline tool server ("Test Server")
#[derive(Clone)]
pub struct ProbeMcpServer {
    tool_router: ToolRouter<Self>,
}

// ============================================================================
// Parameter Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SimpleQueryParams {
    pub query: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SearchWithFiltersParams {
    pub query: String,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default = "default_sort_by")]
    pub sort_by: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct AdvancedSearchParams {
    pub query: String,
    pub filters: HashMap<String, Value>,
    pub options: Vec<String>,
    #[serde(default = "default_max_results")]
    pub max_results: i64,
}

fn default_limit() -> i64 {
    10
}

fn default_sort_by() -> String {
    "relevance".to_string()
}

fn default_max_results() -> i64 {
    20
}

// ============================================================================
// Tool Router Implementation
// ============================================================================

#[tool_router]
impl ProbeMcpServer {
    pub fn new() -> Self {
        Self {
            tool_router: Self::tool_router(),
        }
    }

    #[tool(description = "Simple query tool that only requires a query string")]
    async fn simple_query(
        &self,
        Parameters(params): Parameters<SimpleQueryParams>,
    ) -> Result<CallToolResult, McpError> {
        tracing::debug!(query = %params.query, "simple_query");
        Ok(text_success(format!("Processed query: {}", params.query)))
    }

    #[tool(
        description = "Search tool with filter parameters including query, limit, and sort options"
    )]
    async fn search_with_filters(
        &self,
        Parameters(params): Parameters<SearchWithFiltersParams>,
    ) -> Result<CallToolResult, McpError> {
        Ok(text_success(format!(
            "Searched '{}', limit {} results, sorted by: {}",
            params.query, params.limit, params.sort_by
        )))
    }

    #[tool(
        description = "Advanced search tool with complex parameter structure including nested objects and arrays"
    )]
    async fn advanced_search(
        &self,
        Parameters(params): Parameters<AdvancedSearchParams>,
    ) -> Result<CallToolResult, McpError> {
        let filters = match serde_json::to_string(&params.filters) {
            Ok(filters) => filters,
            Err(e) => return Ok(tool_error(format!("Invalid filters: {}", e))),
        };
        Ok(text_success(format!(
            "Advanced search '{}', filters: {}, options: {:?}, max results: {}",
            params.query, filters, params.options, params.max_results
        )))
    }

    #[tool(description = "Get system status, requires no parameters")]
    async fn get_status(&self) -> Result<CallToolResult, McpError> {
        Ok(text_success("System status normal"))
    }
}

// ============================================================================
// Server Handler Implementation
// ============================================================================

#[tool_handler]
impl rmcp::ServerHandler for ProbeMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Test Server - baseline tools whose input schemas range from no \
                 parameters to nested objects and arrays."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "Test Server".into(),
                ..Implementation::from_build_env()
            },
            ..Default::default()
        }
    }
}

impl Default for ProbeMcpServer {
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
        let info = ProbeMcpServer::new().get_info();
        assert_eq!(info.server_info.name, "Test Server");
        assert!(info.capabilities.tools.is_some());
    }

    #[test]
    fn test_advertises_all_tools() {
        let server = ProbeMcpServer::new();
        let mut names: Vec<String> = server
            .tool_router
            .list_all()
            .into_iter()
            .map(|t| t.name.to_string())
            .collect();
        names.sort();
        assert_eq!(
            names,
            vec!["advanced_search", "get_status", "search_with_filters", "simple_query"]
        );
    }

    #[test]
    fn test_simple_query_schema_requires_query() {
        let server = ProbeMcpServer::new();
        let tool = server
            .tool_router
            .list_all()
            .into_iter()
            .find(|t| t.name == "simple_query")
            .expect("simple_query should be registered");
        let schema = serde_json::Value::Object(tool.input_schema.as_ref().clone());
        assert_eq!(schema["properties"]["query"]["type"], "string");
        assert_eq!(schema["required"], serde_json::json!(["query"]));
    }

    #[test]
    fn test_search_defaults() {
        let params: SearchWithFiltersParams =
            serde_json::from_value(serde_json::json!({"query": "news"})).unwrap();
        assert_eq!(params.limit, 10);
        assert_eq!(params.sort_by, "relevance");
    }
}
