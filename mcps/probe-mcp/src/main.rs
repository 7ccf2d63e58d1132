//! Probe MCP Server
//!
//! Baseline tools whose input schemas grow from no parameters to nested
//! objects and arrays. The harness launches this binary as its default
//! endpoint.

use probe_mcp::ProbeMcpServer;

mcp_common::serve_stdio!(ProbeMcpServer, "probe_mcp");
