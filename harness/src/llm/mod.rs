//! LLM abstraction layer
//!
//! The host only needs one round trip: send messages plus tool definitions,
//! get back text and the tool calls the model chose.

mod openai;

pub use openai::{OpenAiClient, DEFAULT_BASE_URL, DEFAULT_MODEL};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::mcp::ToolDefinition;

/// Message in a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// One tool the model asked to call
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedCall {
    pub name: String,
    /// Decoded arguments; a JSON object for well-behaved models
    pub arguments: Value,
}

/// What the model answered
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelReply {
    pub content: Option<String>,
    pub tool_calls: Vec<SelectedCall>,
}

/// Model API errors
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("model API returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode model response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("model response contained no choices")]
    EmptyResponse,
}

/// Trait for chat models that support tool calling
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// One completion with `tool_choice = auto`
    async fn complete(
        &self,
        messages: Vec<Message>,
        tools: Vec<ToolDefinition>,
    ) -> Result<ModelReply, LlmError>;

    /// Get the model name
    fn model(&self) -> &str;
}
