//! MCP-facing data types
//!
//! Remote shapes ([`RemoteTool`], [`RemoteSchema`], `CallToolResult`) are
//! normalized once at the client boundary into [`Capability`] and
//! [`Invocation`]. Nothing past the client branches on representation.

use std::fmt;
use std::path::Path;

use rmcp::model::{CallToolResult, RawContent};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// JSON object as used for schemas and tool arguments
pub type JsonObject = Map<String, Value>;

// =============================================================================
// Endpoint
// =============================================================================

/// Opaque launch string identifying a tool server (usually a binary path)
///
/// Used as the key for client identity and catalog caching.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Endpoint(String);

impl Endpoint {
    pub fn new(launch: impl Into<String>) -> Self {
        Self(launch.into())
    }

    /// A binary shipped next to the running executable
    pub fn sibling_binary(name: &str) -> Self {
        let path = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join(name)))
            .unwrap_or_else(|| Path::new(name).to_path_buf());
        Self(path.display().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Endpoint {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Endpoint {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// =============================================================================
// Remote shapes
// =============================================================================

/// Input schema as received from a server
///
/// Servers built on different SDKs hand back schemas in different shapes;
/// [`RemoteSchema::normalize`] turns every variant into a plain object.
#[derive(Debug, Clone)]
pub enum RemoteSchema {
    /// Typed schema document
    Structured(schemars::Schema),
    /// Already a plain JSON object
    Mapping(JsonObject),
    /// Anything else (booleans, arrays, strings)
    Other(Value),
    /// No schema advertised
    Missing,
}

impl RemoteSchema {
    /// Canonical mapping form. Unsupported shapes become an empty object.
    pub fn normalize(self) -> JsonObject {
        match self {
            RemoteSchema::Structured(schema) => match schema.to_value() {
                Value::Object(map) => map,
                _ => JsonObject::new(),
            },
            RemoteSchema::Mapping(map) => map,
            RemoteSchema::Other(_) | RemoteSchema::Missing => JsonObject::new(),
        }
    }
}

impl From<Value> for RemoteSchema {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => RemoteSchema::Mapping(map),
            Value::Null => RemoteSchema::Missing,
            other => RemoteSchema::Other(other),
        }
    }
}

/// A tool as listed by a server, before normalization
#[derive(Debug, Clone)]
pub struct RemoteTool {
    pub name: String,
    pub description: Option<String>,
    pub input_schema: RemoteSchema,
}

impl From<rmcp::model::Tool> for RemoteTool {
    fn from(tool: rmcp::model::Tool) -> Self {
        Self {
            name: tool.name.to_string(),
            description: tool.description.map(|d| d.to_string()),
            input_schema: RemoteSchema::Mapping(tool.input_schema.as_ref().clone()),
        }
    }
}

// =============================================================================
// Capability
// =============================================================================

/// A normalized tool descriptor tagged with the endpoint that advertised it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Capability {
    /// Unique within its endpoint, not globally
    pub name: String,
    pub description: String,
    pub input_schema: JsonObject,
    pub origin: Endpoint,
}

impl Capability {
    pub fn from_remote(tool: RemoteTool, origin: &Endpoint) -> Self {
        Self {
            name: tool.name,
            description: tool.description.unwrap_or_default(),
            input_schema: tool.input_schema.normalize(),
            origin: origin.clone(),
        }
    }

    /// Model-facing function definition (field-for-field projection)
    pub fn to_tool_definition(&self) -> ToolDefinition {
        ToolDefinition {
            r#type: "function".to_string(),
            function: FunctionDefinition {
                name: self.name.clone(),
                description: self.description.clone(),
                parameters: Value::Object(self.input_schema.clone()),
            },
        }
    }
}

/// Tool definition in chat-completions format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub r#type: String,
    pub function: FunctionDefinition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

// =============================================================================
// Invocation results
// =============================================================================

/// One part of a tool result
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentPart {
    Text {
        text: String,
    },
    Image {
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
}

/// Normalized result of calling a tool
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Invocation {
    pub content: Vec<ContentPart>,
    #[serde(rename = "isError")]
    pub is_error: bool,
}

impl Invocation {
    /// Concatenated text parts, newline separated
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|part| match part {
                ContentPart::Text { text } => Some(text.as_str()),
                ContentPart::Image { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl From<CallToolResult> for Invocation {
    fn from(result: CallToolResult) -> Self {
        // Text and image parts only; other kinds are dropped, order kept
        let content = result
            .content
            .into_iter()
            .filter_map(|content| match content.raw {
                RawContent::Text(t) => Some(ContentPart::Text { text: t.text }),
                RawContent::Image(i) => Some(ContentPart::Image {
                    data: i.data,
                    mime_type: i.mime_type,
                }),
                _ => None,
            })
            .collect();

        Self {
            content,
            is_error: result.is_error.unwrap_or(false),
        }
    }
}
