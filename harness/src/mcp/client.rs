//! Capability client: one logical connection to one endpoint
//!
//! Connect failures leave the client disconnected, never half-open, so a
//! later `connect()` can retry. Fetch and call failures are returned to the
//! caller and leave the connection up for other calls.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::error::SessionError;
use super::transport::{Connector, SessionHandle, Timeouts, TransportSession, TransportState};
use super::types::{Capability, Endpoint, Invocation, JsonObject};

static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(1);

/// Client lifecycle as seen by callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Disconnected,
    Connecting,
    Ready,
}

/// Connection to one MCP endpoint with a cached tool catalog
pub struct CapabilityClient {
    endpoint: Endpoint,
    connector: Arc<dyn Connector>,
    timeouts: Timeouts,
    instance: u64,
    transport: Option<TransportSession>,
    /// `None` until the first successful fetch
    catalog: Option<Arc<[Capability]>>,
}

impl CapabilityClient {
    pub fn new(endpoint: Endpoint, connector: Arc<dyn Connector>, timeouts: Timeouts) -> Self {
        Self {
            endpoint,
            connector,
            timeouts,
            instance: NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed),
            transport: None,
            catalog: None,
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Process-unique id, stable for the client's lifetime
    pub fn instance(&self) -> u64 {
        self.instance
    }

    pub fn state(&self) -> ClientState {
        match self.transport.as_ref().map(TransportSession::state) {
            Some(TransportState::Initialized) => ClientState::Ready,
            Some(TransportState::Unconnected | TransportState::Connected) => ClientState::Connecting,
            Some(TransportState::TornDown) | None => ClientState::Disconnected,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ClientState::Ready
    }

    pub fn has_cached_catalog(&self) -> bool {
        self.catalog.is_some()
    }

    /// Spawn the server and initialize the session. No-op when already ready.
    pub async fn connect(&mut self) -> Result<(), SessionError> {
        if self.is_connected() {
            return Ok(());
        }

        // Leftovers from an earlier failed or closed attempt
        self.disconnect().await;

        let transport = self.transport.insert(TransportSession::new(
            self.endpoint.clone(),
            self.connector.clone(),
            self.timeouts,
        ));

        let outcome = match transport.connect().await {
            Ok(channel) => transport.initialize(channel).await,
            Err(e) => Err(e),
        };

        if let Err(e) = outcome {
            tracing::debug!(endpoint = %self.endpoint, "Connect failed, cleaning up: {}", e);
            self.disconnect().await;
            return Err(e);
        }

        tracing::info!(endpoint = %self.endpoint, instance = self.instance, "Connected to MCP server");
        Ok(())
    }

    /// The endpoint's tools; fetched once, then served from cache
    pub async fn list_capabilities(&mut self) -> Result<Arc<[Capability]>, SessionError> {
        let session = ready_session(&mut self.transport, &self.endpoint)?;

        if let Some(cached) = &self.catalog {
            return Ok(Arc::clone(cached));
        }

        let remote = session
            .list_tools()
            .await
            .map_err(|source| SessionError::CapabilityFetch {
                endpoint: self.endpoint.clone(),
                source,
            })?;

        let catalog: Arc<[Capability]> = remote
            .into_iter()
            .map(|tool| Capability::from_remote(tool, &self.endpoint))
            .collect();

        tracing::info!(endpoint = %self.endpoint, "{} tools (cached)", catalog.len());
        self.catalog = Some(Arc::clone(&catalog));
        Ok(catalog)
    }

    /// Call a tool and normalize its result
    pub async fn invoke(
        &mut self,
        name: &str,
        arguments: JsonObject,
    ) -> Result<Invocation, SessionError> {
        let limit = self.timeouts.tool;
        let session = ready_session(&mut self.transport, &self.endpoint)?;

        tracing::debug!(endpoint = %self.endpoint, tool = name, "Calling tool");
        let result = match tokio::time::timeout(limit, session.call_tool(name, arguments)).await {
            Ok(result) => result,
            Err(_) => Err(anyhow::anyhow!("timed out after {:?}", limit)),
        }
        .map_err(|source| SessionError::Invocation {
            endpoint: self.endpoint.clone(),
            tool: name.to_string(),
            source,
        })?;

        Ok(Invocation::from(result))
    }

    /// Tear down the session and transport and forget the catalog. Idempotent.
    pub async fn disconnect(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            transport.teardown().await;
        }
        self.catalog = None;
    }
}

fn ready_session<'a>(
    transport: &'a mut Option<TransportSession>,
    endpoint: &Endpoint,
) -> Result<&'a mut (dyn SessionHandle + 'static), SessionError> {
    transport
        .as_mut()
        .and_then(TransportSession::session_mut)
        .ok_or_else(|| SessionError::NotConnected {
            endpoint: endpoint.clone(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::testing::{Fault, MockConnector};
    use crate::mcp::types::{RemoteSchema, RemoteTool};
    use serde_json::json;
    use std::time::Duration;

    fn client_for(connector: &Arc<MockConnector>, endpoint: &str) -> CapabilityClient {
        CapabilityClient::new(
            Endpoint::from(endpoint),
            connector.clone(),
            Timeouts {
                startup: Duration::from_millis(200),
                tool: Duration::from_millis(200),
                teardown: Duration::from_millis(200),
            },
        )
    }

    #[tokio::test]
    async fn test_connect_is_idempotent() {
        let connector = Arc::new(MockConnector::new().with_tools("probe", &["simple_query"]));
        let mut client = client_for(&connector, "probe");

        client.connect().await.unwrap();
        client.connect().await.unwrap();

        assert_eq!(connector.spawn_count(), 1);
        assert_eq!(client.state(), ClientState::Ready);
    }

    #[tokio::test]
    async fn test_catalog_fetched_once() {
        let connector = Arc::new(MockConnector::new().with_tools("probe", &["simple_query", "get_status"]));
        let mut client = client_for(&connector, "probe");
        client.connect().await.unwrap();
        assert!(!client.has_cached_catalog());

        let first = client.list_capabilities().await.unwrap();
        let second = client.list_capabilities().await.unwrap();
        let third = client.list_capabilities().await.unwrap();

        assert_eq!(connector.fetch_count(), 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&second, &third));
        assert_eq!(first, second);
        assert!(client.has_cached_catalog());

        let names: Vec<_> = first.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["simple_query", "get_status"]);
        assert!(first.iter().all(|c| c.origin.as_str() == "probe"));
    }

    #[tokio::test]
    async fn test_empty_catalog_is_cached() {
        let connector = Arc::new(MockConnector::new());
        let mut client = client_for(&connector, "empty");
        client.connect().await.unwrap();

        assert!(client.list_capabilities().await.unwrap().is_empty());
        assert!(client.list_capabilities().await.unwrap().is_empty());
        assert_eq!(connector.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_list_requires_connect() {
        let connector = Arc::new(MockConnector::new());
        let mut client = client_for(&connector, "probe");
        let err = client.list_capabilities().await.unwrap_err();
        assert!(err.is_not_connected());
    }

    #[tokio::test]
    async fn test_list_after_disconnect_fails() {
        let connector = Arc::new(MockConnector::new().with_tools("probe", &["simple_query"]));
        let mut client = client_for(&connector, "probe");
        client.connect().await.unwrap();
        client.list_capabilities().await.unwrap();

        client.disconnect().await;
        assert_eq!(client.state(), ClientState::Disconnected);
        assert!(!client.has_cached_catalog());
        assert!(client.list_capabilities().await.unwrap_err().is_not_connected());
        assert!(client.invoke("simple_query", JsonObject::new()).await.unwrap_err().is_not_connected());
    }

    #[tokio::test]
    async fn test_disconnect_when_never_connected() {
        let connector = Arc::new(MockConnector::new());
        let mut client = client_for(&connector, "probe");
        client.disconnect().await;
        client.disconnect().await;
        assert!(connector.releases().is_empty());
        assert_eq!(client.state(), ClientState::Disconnected);
    }

    #[tokio::test]
    async fn test_reconnect_refetches_catalog() {
        let connector = Arc::new(MockConnector::new().with_tools("probe", &["simple_query"]));
        let mut client = client_for(&connector, "probe");
        client.connect().await.unwrap();
        client.list_capabilities().await.unwrap();
        client.disconnect().await;

        client.connect().await.unwrap();
        client.list_capabilities().await.unwrap();

        assert_eq!(connector.spawn_count(), 2);
        assert_eq!(connector.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_failed_handshake_cleans_up_and_allows_retry() {
        let connector = Arc::new(MockConnector::new().with_handshake_fault(Fault::Error));
        let mut client = client_for(&connector, "probe");

        let err = client.connect().await.unwrap_err();
        assert!(err.is_connection());
        assert!(format!("{:#}", anyhow::Error::new(err)).contains("injected handshake failure"));

        // The spawned transport was released, nothing left open
        assert_eq!(connector.releases(), vec!["transport"]);
        assert_eq!(client.state(), ClientState::Disconnected);

        // Retrying is allowed and spawns again
        assert!(client.connect().await.is_err());
        assert_eq!(connector.spawn_count(), 2);
    }

    #[tokio::test]
    async fn test_fetch_failure_keeps_connection() {
        let connector = Arc::new(MockConnector::new().with_fetch_fault(Fault::Error));
        let mut client = client_for(&connector, "probe");
        client.connect().await.unwrap();

        let err = client.list_capabilities().await.unwrap_err();
        assert!(matches!(err, SessionError::CapabilityFetch { .. }));
        assert!(client.is_connected());
        assert!(!client.has_cached_catalog());
        assert!(connector.releases().is_empty());
    }

    #[tokio::test]
    async fn test_invoke_normalizes_result() {
        let connector = Arc::new(MockConnector::new());
        let mut client = client_for(&connector, "probe");
        client.connect().await.unwrap();

        let args = json!({"query": "USDT"}).as_object().cloned().unwrap();
        let invocation = client.invoke("simple_query", args).await.unwrap();

        assert!(!invocation.is_error);
        assert_eq!(invocation.text(), r#"simple_query {"query":"USDT"}"#);
        assert_eq!(connector.call_count(), 1);
    }

    #[tokio::test]
    async fn test_invoke_failure_names_tool_and_keeps_connection() {
        for fault in [Fault::Error, Fault::Hang] {
            let connector = Arc::new(MockConnector::new().with_call_fault(fault));
            let mut client = client_for(&connector, "probe");
            client.connect().await.unwrap();

            let err = client.invoke("advanced_search", JsonObject::new()).await.unwrap_err();
            match &err {
                SessionError::Invocation { tool, endpoint, .. } => {
                    assert_eq!(tool, "advanced_search");
                    assert_eq!(endpoint.as_str(), "probe");
                }
                other => panic!("unexpected error: {}", other),
            }
            assert!(client.is_connected());
        }
    }

    #[tokio::test]
    async fn test_heterogeneous_schemas_do_not_fail_fetch() {
        let structured = schemars::Schema::try_from(json!({
            "type": "object",
            "properties": {"data_input": {"type": "string"}}
        }))
        .unwrap();

        let connector = Arc::new(MockConnector::new().with_remote_tools(
            "mixed",
            vec![
                RemoteTool {
                    name: "typed".into(),
                    description: Some("typed schema".into()),
                    input_schema: RemoteSchema::Structured(structured),
                },
                RemoteTool {
                    name: "plain".into(),
                    description: None,
                    input_schema: RemoteSchema::from(json!({"type": "object"})),
                },
                RemoteTool {
                    name: "odd".into(),
                    description: None,
                    input_schema: RemoteSchema::Other(json!(42)),
                },
            ],
        ));
        let mut client = client_for(&connector, "mixed");
        client.connect().await.unwrap();

        let catalog = client.list_capabilities().await.unwrap();
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog[0].input_schema["properties"]["data_input"]["type"], "string");
        assert_eq!(catalog[1].input_schema["type"], "object");
        assert!(catalog[2].input_schema.is_empty());
    }

    #[test]
    fn test_instances_are_unique() {
        let connector = Arc::new(MockConnector::new());
        let a = client_for(&connector, "a");
        let b = client_for(&connector, "b");
        assert_ne!(a.instance(), b.instance());
    }
}
