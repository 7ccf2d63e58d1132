//! MCP Common - startup and result helpers shared by the harness tool servers
//!
//! - **Initialization**: [`init_tracing`] and the `serve_stdio!` macro
//! - **Results**: helpers for building `CallToolResult` responses
//!
//! # Example
//!
//! ```rust,ignore
//! use mcp_common::{serve_stdio, text_success};
//!
//! serve_stdio!(ProbeMcpServer, "probe_mcp");
//!
//! async fn get_status(&self) -> Result<CallToolResult, McpError> {
//!     Ok(text_success("System status normal"))
//! }
//! ```

pub mod init;
pub mod result;

pub use init::init_tracing;
pub use result::{text_success, tool_error};

// Re-export rmcp types every tool server needs
pub use rmcp::{
    model::{CallToolResult, Content},
    ErrorData as McpError,
};
