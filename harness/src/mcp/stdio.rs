//! Child-process transport and `rmcp` session
//!
//! [`StdioConnector`] launches an endpoint as a subprocess with piped
//! stdin/stdout and runs the MCP client handshake over those pipes.

use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use rmcp::{
    model::{CallToolRequestParam, CallToolResult},
    service::RunningService,
    RoleClient, ServiceExt,
};
use tokio::process::{Child, Command};

use super::transport::{Connector, Duplex, SessionHandle, TransportHandle};
use super::types::{Endpoint, JsonObject, RemoteTool};

/// How long a server may take to exit on its own once its stdin is closed
const EXIT_GRACE: Duration = Duration::from_secs(2);

/// Launches endpoints as local subprocesses speaking MCP over stdio
#[derive(Debug, Default, Clone, Copy)]
pub struct StdioConnector;

impl StdioConnector {
    pub fn new() -> Self {
        Self
    }

    /// Build the command for an endpoint launch string
    ///
    /// `~` and `$VARS` are expanded, then the string is split on whitespace
    /// into program and arguments.
    pub fn command_for(endpoint: &Endpoint) -> Result<Command> {
        let expanded = shellexpand::full(endpoint.as_str())
            .with_context(|| format!("Failed to expand endpoint '{}'", endpoint))?;

        let mut parts = expanded.split_whitespace();
        let program = parts.next().context("Endpoint is empty")?;

        let mut cmd = Command::new(program);
        cmd.args(parts)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        Ok(cmd)
    }
}

#[async_trait]
impl Connector for StdioConnector {
    async fn connect(&self, endpoint: &Endpoint) -> Result<(Box<dyn TransportHandle>, Duplex)> {
        let mut child = Self::command_for(endpoint)?
            .spawn()
            .with_context(|| format!("Failed to spawn MCP server '{}'", endpoint))?;

        let stdout = child.stdout.take().context("Child stdout was not piped")?;
        let stdin = child.stdin.take().context("Child stdin was not piped")?;

        tracing::debug!(%endpoint, pid = ?child.id(), "Spawned MCP server");
        Ok((
            Box::new(ChildTransport::new(child)),
            Duplex::new(stdout, stdin),
        ))
    }

    async fn initialize(
        &self,
        _endpoint: &Endpoint,
        channel: Duplex,
    ) -> Result<Box<dyn SessionHandle>> {
        let session = RmcpSession::handshake(channel).await?;
        Ok(Box::new(session))
    }
}

// =============================================================================
// Transport
// =============================================================================

/// A spawned server process
pub struct ChildTransport {
    child: Child,
}

impl ChildTransport {
    pub fn new(child: Child) -> Self {
        Self { child }
    }
}

#[async_trait]
impl TransportHandle for ChildTransport {
    async fn close(&mut self) -> Result<()> {
        // The session has closed stdin by now; give the server a moment to exit
        match tokio::time::timeout(EXIT_GRACE, self.child.wait()).await {
            Ok(status) => {
                let status = status.context("Failed to wait for MCP server")?;
                tracing::debug!(%status, "MCP server exited");
            }
            Err(_) => {
                tracing::debug!("MCP server still running after {:?}, killing", EXIT_GRACE);
                self.child.kill().await.context("Failed to kill MCP server")?;
            }
        }
        Ok(())
    }
}

// =============================================================================
// Session
// =============================================================================

/// MCP client session driven by `rmcp`
pub struct RmcpSession {
    service: Option<RunningService<RoleClient, ()>>,
}

impl RmcpSession {
    /// Run the initialize handshake over any byte channel
    pub async fn handshake(channel: Duplex) -> Result<Self> {
        let service = ()
            .serve((channel.reader, channel.writer))
            .await
            .context("MCP initialize handshake failed")?;

        if let Some(info) = service.peer_info() {
            tracing::debug!(
                server = %info.server_info.name,
                version = %info.server_info.version,
                "Handshake complete"
            );
        }

        Ok(Self {
            service: Some(service),
        })
    }

    fn service(&self) -> Result<&RunningService<RoleClient, ()>> {
        self.service.as_ref().context("MCP session already closed")
    }
}

#[async_trait]
impl SessionHandle for RmcpSession {
    async fn list_tools(&mut self) -> Result<Vec<RemoteTool>> {
        // Follows pagination cursors until the server has no more pages
        let tools = self
            .service()?
            .list_all_tools()
            .await
            .context("Failed to list tools")?;

        Ok(tools.into_iter().map(RemoteTool::from).collect())
    }

    async fn call_tool(&mut self, name: &str, arguments: JsonObject) -> Result<CallToolResult> {
        let result = self
            .service()?
            .call_tool(CallToolRequestParam {
                name: name.to_string().into(),
                arguments: Some(arguments),
                task: None,
            })
            .await
            .context("Failed to call tool")?;
        Ok(result)
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(service) = self.service.take() {
            let reason = service
                .cancel()
                .await
                .context("MCP service task failed while stopping")?;
            tracing::debug!(?reason, "MCP session closed");
        }
        Ok(())
    }
}
