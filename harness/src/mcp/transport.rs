//! Transport session: one server process plus the MCP session on its stdio
//!
//! The two resources are held separately so teardown can release them in a
//! fixed order: the session first, then the transport it runs on.
//! Teardown never fails. Every release step is bounded by a timeout and
//! isolated from panics, and a failed step does not stop the next one.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::FutureExt;
use rmcp::model::CallToolResult;
use tokio::io::{AsyncRead, AsyncWrite};

use super::error::{ConnectPhase, SessionError};
use super::types::{Endpoint, JsonObject, RemoteTool};

/// Default startup timeout for spawning and initializing an MCP server
const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(30);

/// Default tool call timeout
const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(60);

/// Default budget for each teardown step
const DEFAULT_TEARDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Time limits applied by the session layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Bound on the initialize handshake
    pub startup: Duration,
    /// Bound on a single tool call
    pub tool: Duration,
    /// Bound on each teardown step
    pub teardown: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            startup: DEFAULT_STARTUP_TIMEOUT,
            tool: DEFAULT_TOOL_TIMEOUT,
            teardown: DEFAULT_TEARDOWN_TIMEOUT,
        }
    }
}

// =============================================================================
// Resource seams
// =============================================================================

/// Read and write halves of the byte channel to a server
pub struct Duplex {
    pub reader: Box<dyn AsyncRead + Send + Unpin>,
    pub writer: Box<dyn AsyncWrite + Send + Unpin>,
}

impl Duplex {
    pub fn new(
        reader: impl AsyncRead + Send + Unpin + 'static,
        writer: impl AsyncWrite + Send + Unpin + 'static,
    ) -> Self {
        Self {
            reader: Box::new(reader),
            writer: Box::new(writer),
        }
    }
}

/// The outer resource: whatever keeps the byte channel alive (a child process)
#[async_trait]
pub trait TransportHandle: Send {
    /// Release the transport. Called at most once.
    async fn close(&mut self) -> anyhow::Result<()>;
}

/// The inner resource: an initialized protocol session
#[async_trait]
pub trait SessionHandle: Send {
    async fn list_tools(&mut self) -> anyhow::Result<Vec<RemoteTool>>;

    async fn call_tool(&mut self, name: &str, arguments: JsonObject)
        -> anyhow::Result<CallToolResult>;

    /// Release the session. Called at most once.
    async fn close(&mut self) -> anyhow::Result<()>;
}

/// Opens transports and sessions for endpoints
#[async_trait]
pub trait Connector: Send + Sync {
    /// Launch the server behind `endpoint` and hand back its byte channel
    async fn connect(
        &self,
        endpoint: &Endpoint,
    ) -> anyhow::Result<(Box<dyn TransportHandle>, Duplex)>;

    /// Run the protocol handshake over a channel returned by [`Connector::connect`]
    async fn initialize(
        &self,
        endpoint: &Endpoint,
        channel: Duplex,
    ) -> anyhow::Result<Box<dyn SessionHandle>>;
}

// =============================================================================
// Transport session
// =============================================================================

/// Lifecycle of a [`TransportSession`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Unconnected,
    Connected,
    Initialized,
    TornDown,
}

impl TransportState {
    fn as_str(self) -> &'static str {
        match self {
            TransportState::Unconnected => "unconnected",
            TransportState::Connected => "connected",
            TransportState::Initialized => "initialized",
            TransportState::TornDown => "torn down",
        }
    }
}

/// Owns the transport and session for one endpoint
///
/// `Unconnected -> Connected -> Initialized -> TornDown`; no state is
/// skipped and `TornDown` is terminal. A dropped session relies on the
/// handles' own drop behavior (child processes are spawned kill-on-drop).
pub struct TransportSession {
    endpoint: Endpoint,
    connector: Arc<dyn Connector>,
    timeouts: Timeouts,
    state: TransportState,
    transport: Option<Box<dyn TransportHandle>>,
    session: Option<Box<dyn SessionHandle>>,
}

impl TransportSession {
    pub fn new(endpoint: Endpoint, connector: Arc<dyn Connector>, timeouts: Timeouts) -> Self {
        Self {
            endpoint,
            connector,
            timeouts,
            state: TransportState::Unconnected,
            transport: None,
            session: None,
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    /// Spawn the server and return its channel
    pub async fn connect(&mut self) -> Result<Duplex, SessionError> {
        self.expect_state(TransportState::Unconnected, "connect")?;

        tracing::debug!(endpoint = %self.endpoint, "Spawning MCP server");
        let (transport, channel) = self
            .connector
            .connect(&self.endpoint)
            .await
            .map_err(|source| SessionError::Connection {
                endpoint: self.endpoint.clone(),
                phase: ConnectPhase::Spawn,
                source,
            })?;

        self.transport = Some(transport);
        self.state = TransportState::Connected;
        Ok(channel)
    }

    /// Perform the handshake over `channel`, bounded by the startup timeout
    pub async fn initialize(&mut self, channel: Duplex) -> Result<(), SessionError> {
        self.expect_state(TransportState::Connected, "initialize")?;

        let startup = self.timeouts.startup;
        let handshake = self.connector.initialize(&self.endpoint, channel);
        let session = match tokio::time::timeout(startup, handshake).await {
            Ok(result) => result,
            Err(_) => Err(anyhow::anyhow!("handshake timed out after {:?}", startup)),
        }
        .map_err(|source| SessionError::Connection {
            endpoint: self.endpoint.clone(),
            phase: ConnectPhase::Handshake,
            source,
        })?;

        self.session = Some(session);
        self.state = TransportState::Initialized;
        tracing::debug!(endpoint = %self.endpoint, "MCP session initialized");
        Ok(())
    }

    /// The live session, if initialized
    pub fn session_mut(&mut self) -> Option<&mut (dyn SessionHandle + 'static)> {
        if self.state != TransportState::Initialized {
            return None;
        }
        self.session.as_deref_mut()
    }

    /// Release the session, then the transport. Never fails; idempotent.
    pub async fn teardown(&mut self) {
        let limit = self.timeouts.teardown;

        if let Some(mut session) = self.session.take() {
            release_step(&self.endpoint, "session", limit, session.close()).await;
        }

        if let Some(mut transport) = self.transport.take() {
            release_step(&self.endpoint, "transport", limit, transport.close()).await;
        }

        if self.state != TransportState::TornDown {
            tracing::debug!(endpoint = %self.endpoint, from = self.state.as_str(), "Transport torn down");
        }
        self.state = TransportState::TornDown;
    }

    fn expect_state(
        &self,
        expected: TransportState,
        operation: &'static str,
    ) -> Result<(), SessionError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(SessionError::InvalidState {
                endpoint: self.endpoint.clone(),
                operation,
                state: self.state.as_str(),
            })
        }
    }
}

/// Run one release step, discarding errors, panics and timeouts
async fn release_step<F>(endpoint: &Endpoint, resource: &'static str, limit: Duration, step: F)
where
    F: Future<Output = anyhow::Result<()>>,
{
    match tokio::time::timeout(limit, AssertUnwindSafe(step).catch_unwind()).await {
        Ok(Ok(Ok(()))) => {
            tracing::debug!(%endpoint, resource, "Released");
        }
        Ok(Ok(Err(e))) => {
            tracing::warn!(%endpoint, resource, "Ignoring error during release: {:#}", e);
        }
        Ok(Err(_)) => {
            tracing::warn!(%endpoint, resource, "Ignoring panic during release");
        }
        Err(_) => {
            tracing::warn!(%endpoint, resource, "Release timed out after {:?}", limit);
        }
    }
}
