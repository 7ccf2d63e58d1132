//! Session-layer errors

use std::fmt;

use thiserror::Error;

use super::types::Endpoint;

/// Which step of bringing up a connection failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectPhase {
    /// Launching the server process
    Spawn,
    /// The MCP initialize handshake
    Handshake,
}

impl fmt::Display for ConnectPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectPhase::Spawn => f.write_str("spawn"),
            ConnectPhase::Handshake => f.write_str("handshake"),
        }
    }
}

/// Errors raised by transport sessions, capability clients and the registry
#[derive(Debug, Error)]
pub enum SessionError {
    /// The server could not be launched or did not complete the handshake
    #[error("failed to connect to MCP server '{endpoint}' ({phase}): {source:#}")]
    Connection {
        endpoint: Endpoint,
        phase: ConnectPhase,
        #[source]
        source: anyhow::Error,
    },

    /// An operation needed a ready session
    #[error("client for '{endpoint}' is not connected; call connect() first")]
    NotConnected { endpoint: Endpoint },

    /// Listing tools failed; the connection stays open
    #[error("failed to list tools from '{endpoint}': {source:#}")]
    CapabilityFetch {
        endpoint: Endpoint,
        #[source]
        source: anyhow::Error,
    },

    /// Calling a tool failed; the connection stays open
    #[error("failed to call tool '{tool}' on '{endpoint}': {source:#}")]
    Invocation {
        endpoint: Endpoint,
        tool: String,
        #[source]
        source: anyhow::Error,
    },

    /// A transport session was driven out of order
    #[error("transport for '{endpoint}' cannot {operation} while {state}")]
    InvalidState {
        endpoint: Endpoint,
        operation: &'static str,
        state: &'static str,
    },
}

impl SessionError {
    /// Endpoint the failure belongs to
    pub fn endpoint(&self) -> &Endpoint {
        match self {
            SessionError::Connection { endpoint, .. }
            | SessionError::NotConnected { endpoint }
            | SessionError::CapabilityFetch { endpoint, .. }
            | SessionError::Invocation { endpoint, .. }
            | SessionError::InvalidState { endpoint, .. } => endpoint,
        }
    }

    pub fn is_connection(&self) -> bool {
        matches!(self, SessionError::Connection { .. })
    }

    pub fn is_not_connected(&self) -> bool {
        matches!(self, SessionError::NotConnected { .. })
    }
}
