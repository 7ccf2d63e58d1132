//! Probe MCP Library
//!
//! Exposes [`ProbeMcpServer`] so it can be served in-process (for example
//! over `tokio::io::duplex` in tests) as well as through the `probe-mcp`
//! binary.

pub mod server;

pub use server::{AdvancedSearchParams, ProbeMcpServer, SearchWithFiltersParams, SimpleQueryParams};
