//! Tool-selection research harness
//!
//! Connects to MCP tool servers, offers their tools to a chat model and
//! records which tool the model picks for a query. Tools are listed and
//! resolved but never executed during experiments.

pub mod config;
pub mod host;
pub mod llm;
pub mod mcp;
pub mod output;
