//! Session registry: at most one live client per endpoint
//!
//! Clients are created and connected on first reference and kept until
//! [`SessionRegistry::disconnect_all`]. Nothing is evicted implicitly.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;

use super::client::CapabilityClient;
use super::error::SessionError;
use super::transport::{Connector, Timeouts};
use super::types::{Capability, Endpoint, ToolDefinition};

/// Tools merged from several endpoints, each tagged with its origin
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    entries: Vec<Capability>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, capabilities: &[Capability]) {
        self.entries.extend_from_slice(capabilities);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Capability> {
        self.entries.iter()
    }

    /// Tool names in merge order (duplicates across endpoints kept)
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|c| c.name.clone()).collect()
    }

    /// Distinct origin endpoints in first-seen order
    pub fn origins(&self) -> Vec<&Endpoint> {
        let mut seen: Vec<&Endpoint> = Vec::new();
        for capability in &self.entries {
            if !seen.contains(&&capability.origin) {
                seen.push(&capability.origin);
            }
        }
        seen
    }

    /// Endpoint that owns `name`
    ///
    /// When several endpoints export the same name the first one in merge
    /// order wins.
    pub fn resolve(&self, name: &str) -> Option<&Endpoint> {
        self.entries
            .iter()
            .find(|c| c.name == name)
            .map(|c| &c.origin)
    }

    /// Model-facing definitions for every entry
    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.entries.iter().map(Capability::to_tool_definition).collect()
    }
}

/// Maps endpoint identity to its capability client
pub struct SessionRegistry {
    connector: Arc<dyn Connector>,
    timeouts: Timeouts,
    clients: HashMap<Endpoint, CapabilityClient>,
}

impl SessionRegistry {
    pub fn new(connector: Arc<dyn Connector>, timeouts: Timeouts) -> Self {
        Self {
            connector,
            timeouts,
            clients: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Registered endpoints, sorted
    pub fn endpoints(&self) -> Vec<&Endpoint> {
        let mut endpoints: Vec<_> = self.clients.keys().collect();
        endpoints.sort();
        endpoints
    }

    pub fn client(&self, endpoint: &Endpoint) -> Option<&CapabilityClient> {
        self.clients.get(endpoint)
    }

    /// The connected client for `endpoint`, creating it on first use
    ///
    /// A client whose first connect fails is not registered.
    pub async fn get_or_create(
        &mut self,
        endpoint: &Endpoint,
    ) -> Result<&mut CapabilityClient, SessionError> {
        match self.clients.entry(endpoint.clone()) {
            Entry::Occupied(entry) => {
                let client = entry.into_mut();
                client.connect().await?;
                Ok(client)
            }
            Entry::Vacant(entry) => {
                let mut client =
                    CapabilityClient::new(endpoint.clone(), self.connector.clone(), self.timeouts);
                client.connect().await?;
                Ok(entry.insert(client))
            }
        }
    }

    /// Merged catalog for `endpoints`, in the given order. Fails on the first error.
    pub async fn catalog(&mut self, endpoints: &[Endpoint]) -> Result<Catalog, SessionError> {
        let mut catalog = Catalog::new();
        for endpoint in endpoints {
            let capabilities = self.get_or_create(endpoint).await?.list_capabilities().await?;
            catalog.extend(&capabilities);
        }
        Ok(catalog)
    }

    /// Merged catalog for the endpoints that work; failures are returned alongside
    pub async fn catalog_lenient(
        &mut self,
        endpoints: &[Endpoint],
    ) -> (Catalog, Vec<SessionError>) {
        let mut catalog = Catalog::new();
        let mut failures = Vec::new();

        for endpoint in endpoints {
            let fetched = match self.get_or_create(endpoint).await {
                Ok(client) => client.list_capabilities().await,
                Err(e) => Err(e),
            };
            match fetched {
                Ok(capabilities) => catalog.extend(&capabilities),
                Err(e) => {
                    tracing::warn!(%endpoint, "Skipping endpoint: {}", e);
                    failures.push(e);
                }
            }
        }

        (catalog, failures)
    }

    /// Disconnect every client and empty the registry. Never fails.
    pub async fn disconnect_all(&mut self) {
        for (endpoint, mut client) in self.clients.drain() {
            let outcome = AssertUnwindSafe(client.disconnect()).catch_unwind().await;
            if outcome.is_err() {
                tracing::warn!(%endpoint, "Ignoring panic while disconnecting");
            }
        }
    }
}
