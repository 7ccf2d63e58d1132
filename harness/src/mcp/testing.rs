//! Instrumented in-memory connector for lifecycle tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rmcp::model::CallToolResult;
use serde_json::json;

use super::transport::{Connector, Duplex, SessionHandle, TransportHandle};
use super::types::{Endpoint, JsonObject, RemoteSchema, RemoteTool};

/// How an injected fault behaves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    Error,
    Panic,
    Hang,
}

impl Fault {
    async fn trigger(self, what: &str) -> anyhow::Result<()> {
        match self {
            Fault::Error => Err(anyhow::anyhow!("injected {} failure", what)),
            Fault::Panic => panic!("injected {} panic", what),
            Fault::Hang => {
                std::future::pending::<()>().await;
                Ok(())
            }
        }
    }
}

#[derive(Default)]
struct Shared {
    spawns: AtomicUsize,
    fetches: AtomicUsize,
    calls: AtomicUsize,
    releases: Mutex<Vec<&'static str>>,
}

/// Connector whose sessions serve a fixed catalog per endpoint
#[derive(Default)]
pub struct MockConnector {
    shared: Arc<Shared>,
    catalogs: HashMap<Endpoint, Vec<RemoteTool>>,
    spawn_fault: Option<Fault>,
    handshake_fault: Option<Fault>,
    session_close_fault: Option<Fault>,
    fetch_fault: Option<Fault>,
    call_fault: Option<Fault>,
    failing_endpoints: Vec<Endpoint>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tools(mut self, endpoint: &str, names: &[&str]) -> Self {
        let tools = names
            .iter()
            .map(|name| RemoteTool {
                name: name.to_string(),
                description: Some(format!("{} tool", name)),
                input_schema: RemoteSchema::from(json!({
                    "type": "object",
                    "properties": {"query": {"type": "string"}}
                })),
            })
            .collect();
        self.catalogs.insert(Endpoint::from(endpoint), tools);
        self
    }

    pub fn with_remote_tools(mut self, endpoint: &str, tools: Vec<RemoteTool>) -> Self {
        self.catalogs.insert(Endpoint::from(endpoint), tools);
        self
    }

    pub fn with_spawn_fault(mut self, fault: Fault) -> Self {
        self.spawn_fault = Some(fault);
        self
    }

    pub fn with_handshake_fault(mut self, fault: Fault) -> Self {
        self.handshake_fault = Some(fault);
        self
    }

    pub fn with_session_close_fault(mut self, fault: Fault) -> Self {
        self.session_close_fault = Some(fault);
        self
    }

    pub fn with_fetch_fault(mut self, fault: Fault) -> Self {
        self.fetch_fault = Some(fault);
        self
    }

    pub fn with_call_fault(mut self, fault: Fault) -> Self {
        self.call_fault = Some(fault);
        self
    }

    /// Spawning this endpoint always fails
    pub fn with_unreachable(mut self, endpoint: &str) -> Self {
        self.failing_endpoints.push(Endpoint::from(endpoint));
        self
    }

    pub fn spawn_count(&self) -> usize {
        self.shared.spawns.load(Ordering::SeqCst)
    }

    pub fn fetch_count(&self) -> usize {
        self.shared.fetches.load(Ordering::SeqCst)
    }

    pub fn call_count(&self) -> usize {
        self.shared.calls.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> Vec<&'static str> {
        self.shared
            .releases
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(
        &self,
        endpoint: &Endpoint,
    ) -> anyhow::Result<(Box<dyn TransportHandle>, Duplex)> {
        if self.failing_endpoints.contains(endpoint) {
            anyhow::bail!("no such server: {}", endpoint);
        }
        if let Some(fault) = self.spawn_fault {
            fault.trigger("spawn").await?;
        }
        self.shared.spawns.fetch_add(1, Ordering::SeqCst);
        let transport = MockTransport {
            shared: self.shared.clone(),
        };
        Ok((
            Box::new(transport),
            Duplex::new(tokio::io::empty(), tokio::io::sink()),
        ))
    }

    async fn initialize(
        &self,
        endpoint: &Endpoint,
        _channel: Duplex,
    ) -> anyhow::Result<Box<dyn SessionHandle>> {
        if let Some(fault) = self.handshake_fault {
            fault.trigger("handshake").await?;
        }
        Ok(Box::new(MockSession {
            shared: self.shared.clone(),
            tools: self.catalogs.get(endpoint).cloned().unwrap_or_default(),
            close_fault: self.session_close_fault,
            fetch_fault: self.fetch_fault,
            call_fault: self.call_fault,
        }))
    }
}

struct MockTransport {
    shared: Arc<Shared>,
}

#[async_trait]
impl TransportHandle for MockTransport {
    async fn close(&mut self) -> anyhow::Result<()> {
        if let Ok(mut releases) = self.shared.releases.lock() {
            releases.push("transport");
        }
        Ok(())
    }
}

struct MockSession {
    shared: Arc<Shared>,
    tools: Vec<RemoteTool>,
    close_fault: Option<Fault>,
    fetch_fault: Option<Fault>,
    call_fault: Option<Fault>,
}

#[async_trait]
impl SessionHandle for MockSession {
    async fn list_tools(&mut self) -> anyhow::Result<Vec<RemoteTool>> {
        self.shared.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(fault) = self.fetch_fault {
            fault.trigger("fetch").await?;
        }
        Ok(self.tools.clone())
    }

    async fn call_tool(
        &mut self,
        name: &str,
        arguments: JsonObject,
    ) -> anyhow::Result<CallToolResult> {
        self.shared.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(fault) = self.call_fault {
            fault.trigger("call").await?;
        }
        let result = serde_json::from_value(json!({
            "content": [{"type": "text", "text": format!("{} {}", name, serde_json::Value::Object(arguments))}]
        }))?;
        Ok(result)
    }

    async fn close(&mut self) -> anyhow::Result<()> {
        if let Ok(mut releases) = self.shared.releases.lock() {
            releases.push("session");
        }
        if let Some(fault) = self.close_fault {
            fault.trigger("session close").await?;
        }
        Ok(())
    }
}
