//! MCP client lifecycle: transport sessions, capability clients, and the
//! per-endpoint session registry.
//!
//! Layering, leaves first:
//! - [`TransportSession`] owns a spawned server process and the protocol
//!   session running over its stdio, and tears both down in order.
//! - [`CapabilityClient`] wraps one transport session per endpoint and caches
//!   the endpoint's tool catalog.
//! - [`SessionRegistry`] keeps at most one client per endpoint and merges
//!   catalogs for the host.

mod client;
mod error;
mod registry;
mod stdio;
mod transport;
mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{CapabilityClient, ClientState};
pub use error::{ConnectPhase, SessionError};
pub use registry::{Catalog, SessionRegistry};
pub use stdio::{ChildTransport, RmcpSession, StdioConnector};
pub use transport::{
    Connector, Duplex, SessionHandle, Timeouts, TransportHandle, TransportSession, TransportState,
};
pub use types::{
    Capability, ContentPart, Endpoint, FunctionDefinition, Invocation, JsonObject, RemoteSchema,
    RemoteTool, ToolDefinition,
};
