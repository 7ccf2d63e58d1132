//! Experiment MCP Server
//!
//! Four tools with opaque names and one shared description. They differ only
//! in how many parameters their input schemas declare.

use experiment_mcp::ExperimentMcpServer;

mcp_common::serve_stdio!(ExperimentMcpServer, "experiment_mcp");
