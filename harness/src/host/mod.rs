//! Research host: offers tools from MCP servers to a model and records its pick
//!
//! The host owns the [`SessionRegistry`], so clients and their catalogs live
//! for the whole run and are reused across experiments. Connect failures are
//! reported per endpoint; experiments continue with whatever connected.

mod record;

pub use record::{ExperimentRecord, ToolCallRecord};

use std::sync::Arc;

use thiserror::Error;

use crate::llm::{ChatModel, LlmError, Message};
use crate::mcp::{Catalog, Endpoint, Invocation, JsonObject, SessionError, SessionRegistry};
use crate::output::{OutputEvent, OutputWriter, PlainOutput};

#[derive(Debug, Error)]
pub enum HostError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Model(#[from] LlmError),
}

/// Runs tool-selection experiments against one model
pub struct ResearchHost {
    registry: SessionRegistry,
    model: Arc<dyn ChatModel>,
    system_prompt: Option<String>,
    default_endpoints: Vec<Endpoint>,
    output: Box<dyn OutputWriter>,
    /// Sorted endpoint set of the previous experiment
    last_endpoints: Option<Vec<Endpoint>>,
    printed_server_info: bool,
    printed_banner: bool,
}

impl ResearchHost {
    pub fn new(registry: SessionRegistry, model: Arc<dyn ChatModel>) -> Self {
        Self {
            registry,
            model,
            system_prompt: None,
            default_endpoints: Vec::new(),
            output: Box::new(PlainOutput::new()),
            last_endpoints: None,
            printed_server_info: false,
            printed_banner: false,
        }
    }

    /// Set the system message sent before every query
    pub fn with_system_prompt(mut self, prompt: Option<String>) -> Self {
        self.set_system_prompt(prompt);
        self
    }

    pub fn set_system_prompt(&mut self, prompt: Option<String>) {
        self.system_prompt = prompt.filter(|p| !p.is_empty());
    }

    /// Endpoints used when an experiment names none
    pub fn with_default_endpoints(mut self, endpoints: Vec<Endpoint>) -> Self {
        self.default_endpoints = endpoints;
        self
    }

    pub fn with_output(mut self, output: Box<dyn OutputWriter>) -> Self {
        self.output = output;
        self
    }

    pub fn default_endpoints(&self) -> &[Endpoint] {
        &self.default_endpoints
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn model_name(&self) -> &str {
        self.model.model()
    }

    /// Offer the tools of `endpoints` to the model and record which it picks
    ///
    /// Endpoints that fail to connect or list tools are reported and skipped.
    /// Chosen tools are resolved back to their server but never executed.
    pub async fn run_experiment(
        &mut self,
        query: &str,
        endpoints: Option<&[Endpoint]>,
    ) -> Result<ExperimentRecord, HostError> {
        let endpoints: Vec<Endpoint> = match endpoints {
            Some(endpoints) => endpoints.to_vec(),
            None => self.default_endpoints.clone(),
        };

        self.reset_print_flags(&endpoints);

        let (catalog, failures) = self.registry.catalog_lenient(&endpoints).await;
        for failure in &failures {
            self.output.write(OutputEvent::Warning(failure.to_string()));
        }

        if !self.printed_server_info {
            self.print_server_info(&endpoints, &catalog);
            self.printed_server_info = true;
        }

        let mut messages = Vec::with_capacity(2);
        if let Some(prompt) = &self.system_prompt {
            messages.push(Message::system(prompt.as_str()));
        }
        messages.push(Message::user(query));

        tracing::info!(
            model = self.model.model(),
            tools = catalog.len(),
            "Running experiment"
        );
        let reply = self.model.complete(messages, catalog.tool_definitions()).await?;

        let mut record = ExperimentRecord {
            user_query: query.to_string(),
            available_tools: catalog.names(),
            selected_server: display_server(&catalog),
            selected_tool: None,
            tool_arguments: None,
            llm_response: reply.content,
            tool_calls: Vec::with_capacity(reply.tool_calls.len()),
        };

        for call in reply.tool_calls {
            let server = catalog.resolve(&call.name).cloned();
            if server.is_none() {
                tracing::warn!(tool = %call.name, "Model chose a tool no endpoint offers");
            }
            record.selected_tool = Some(call.name.clone());
            record.tool_arguments = Some(call.arguments.clone());
            record.tool_calls.push(ToolCallRecord {
                tool_name: call.name,
                arguments: call.arguments,
                server,
            });
        }

        Ok(record)
    }

    /// Print one result; the "Results" banner only precedes the first
    pub fn print_result(&mut self, record: &ExperimentRecord) {
        if !self.printed_banner {
            self.output.write(OutputEvent::ResultsBanner);
            self.printed_banner = true;
        }

        self.output.write(OutputEvent::Query(record.user_query.clone()));

        match &record.selected_tool {
            Some(tool) => self.output.write(OutputEvent::ToolChosen {
                tool: tool.clone(),
                server: Some(
                    record
                        .selected_tool_server()
                        .map(Endpoint::to_string)
                        .unwrap_or_else(|| "unknown".to_string()),
                ),
            }),
            None => self.output.write(OutputEvent::NoToolChosen),
        }

        if let Some(text) = record.llm_response.as_deref().filter(|t| !t.is_empty()) {
            self.output.write(OutputEvent::ModelResponse(text.to_string()));
        }
        self.output.write(OutputEvent::Separator);
        self.output.flush();
    }

    /// Connect to each endpoint and print its tools with their schemas
    ///
    /// Returns the endpoints that failed; the rest are still listed.
    pub async fn list_endpoint_tools(&mut self, endpoints: &[Endpoint]) -> Vec<SessionError> {
        let mut failures = Vec::new();

        for endpoint in endpoints {
            self.output.write(OutputEvent::Heading(format!("Server: {}", endpoint)));

            let listed = match self.registry.get_or_create(endpoint).await {
                Ok(client) => client.list_capabilities().await,
                Err(e) => Err(e),
            };

            match listed {
                Ok(capabilities) => {
                    self.output
                        .write(OutputEvent::Text(format!("Find {} Tools:", capabilities.len())));
                    for capability in capabilities.iter() {
                        self.output.write(OutputEvent::Text(format!(
                            "  - {} : {}",
                            capability.name,
                            capability.description
                        )));
                        self.output.write(OutputEvent::Text(format!(
                            "  {}",
                            serde_json::Value::Object(capability.input_schema.clone())
                        )));
                    }
                }
                Err(e) => {
                    self.output.write(OutputEvent::Error(e.to_string()));
                    failures.push(e);
                }
            }
            self.output.write(OutputEvent::Separator);
        }

        self.output.flush();
        failures
    }

    /// Execute a tool directly, outside any experiment
    pub async fn call_tool(
        &mut self,
        endpoint: &Endpoint,
        tool: &str,
        arguments: JsonObject,
    ) -> Result<Invocation, HostError> {
        let client = self.registry.get_or_create(endpoint).await?;
        Ok(client.invoke(tool, arguments).await?)
    }

    /// Disconnect every client. Never fails.
    pub async fn shutdown(&mut self) {
        tracing::debug!(clients = self.registry.len(), "Shutting down host");
        self.registry.disconnect_all().await;
    }

    /// A different endpoint set gets its server info and banner printed again
    fn reset_print_flags(&mut self, endpoints: &[Endpoint]) {
        let mut key = endpoints.to_vec();
        key.sort();
        if self.last_endpoints.as_ref() != Some(&key) {
            self.printed_server_info = false;
            self.printed_banner = false;
            self.last_endpoints = Some(key);
        }
    }

    fn print_server_info(&self, endpoints: &[Endpoint], catalog: &Catalog) {
        for endpoint in endpoints {
            if let Some(client) = self.registry.client(endpoint) {
                self.output.write(OutputEvent::ServerMapping {
                    endpoint: endpoint.to_string(),
                    instance: client.instance(),
                    connected: client.is_connected(),
                });
            }
        }
        self.output.write(OutputEvent::ToolsAvailable(catalog.names()));
    }
}

/// Origins of the offered tools in first-seen order, or "unknown"
fn display_server(catalog: &Catalog) -> String {
    let origins = catalog.origins();
    if origins.is_empty() {
        return "unknown".to_string();
    }
    origins
        .iter()
        .map(|e| e.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
