//! Experiment MCP Library

pub mod server;

pub use server::{ExperimentMcpServer, COMMON_DESCRIPTION};
