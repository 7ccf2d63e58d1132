//! OpenAI-compatible chat-completions client
//!
//! Targets the Hugging Face router by default; any endpoint that speaks
//! `POST {base}/chat/completions` with bearer auth works.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ChatModel, LlmError, Message, ModelReply, SelectedCall};
use crate::mcp::ToolDefinition;

pub const DEFAULT_BASE_URL: &str = "https://router.huggingface.co/v1";
pub const DEFAULT_MODEL: &str = "Qwen/Qwen2.5-7B-Instruct:together";

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [ToolDefinition]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCallResponse>>,
}

#[derive(Debug, Deserialize)]
struct ToolCallResponse {
    function: FunctionCallResponse,
}

#[derive(Debug, Deserialize)]
struct FunctionCallResponse {
    name: String,
    /// A JSON-encoded string per the API, though some providers send an object
    #[serde(default)]
    arguments: Value,
}

// ============================================================================
// Client
// ============================================================================

/// Chat-completions client with bearer-token auth
pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }

    fn request_body<'a>(
        &'a self,
        messages: &'a [Message],
        tools: &'a [ToolDefinition],
    ) -> ChatCompletionRequest<'a> {
        let has_tools = !tools.is_empty();
        ChatCompletionRequest {
            model: &self.model,
            messages,
            tools: has_tools.then_some(tools),
            tool_choice: has_tools.then_some("auto"),
        }
    }
}

#[async_trait]
impl ChatModel for OpenAiClient {
    async fn complete(
        &self,
        messages: Vec<Message>,
        tools: Vec<ToolDefinition>,
    ) -> Result<ModelReply, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.request_body(&messages, &tools);

        tracing::debug!(model = %self.model, tools = tools.len(), "Sending chat completion");
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|source| LlmError::Request {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|source| LlmError::Request {
            url: url.clone(),
            source,
        })?;
        if !status.is_success() {
            return Err(LlmError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        parse_response(&text)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Decode a non-streaming response into the first choice's reply
fn parse_response(body: &str) -> Result<ModelReply, LlmError> {
    let response: ChatCompletionResponse = serde_json::from_str(body)?;
    let message = response
        .choices
        .into_iter()
        .next()
        .ok_or(LlmError::EmptyResponse)?
        .message;

    let tool_calls = message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|call| SelectedCall {
            name: call.function.name,
            arguments: decode_arguments(call.function.arguments),
        })
        .collect();

    Ok(ModelReply {
        content: message.content,
        tool_calls,
    })
}

/// Tool-call arguments arrive either JSON-encoded in a string or inline
fn decode_arguments(raw: Value) -> Value {
    match raw {
        Value::String(encoded) if encoded.trim().is_empty() => Value::Object(Default::default()),
        Value::String(encoded) => match serde_json::from_str(&encoded) {
            Ok(decoded) => decoded,
            Err(e) => {
                tracing::warn!("Model sent undecodable tool arguments ({}), keeping raw text", e);
                Value::String(encoded)
            }
        },
        Value::Null => Value::Object(Default::default()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::FunctionDefinition;
    use serde_json::json;

    fn tool(name: &str) -> ToolDefinition {
        ToolDefinition {
            r#type: "function".into(),
            function: FunctionDefinition {
                name: name.into(),
                description: "desc".into(),
                parameters: json!({"type": "object"}),
            },
        }
    }

    #[test]
    fn test_request_body_with_tools() {
        let client = OpenAiClient::new("https://example.test/v1/", "key", "some-model");
        let messages = [Message::system("pick tools"), Message::user("Get system status")];
        let tools = [tool("get_status")];
        let body = serde_json::to_value(client.request_body(&messages, &tools)).unwrap();

        assert_eq!(body["model"], "some-model");
        assert_eq!(body["tool_choice"], "auto");
        assert_eq!(body["messages"][0], json!({"role": "system", "content": "pick tools"}));
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["tools"][0]["function"]["name"], "get_status");
        assert_eq!(client.base_url, "https://example.test/v1");
    }

    #[test]
    fn test_request_body_without_tools_omits_tool_fields() {
        let client = OpenAiClient::new(DEFAULT_BASE_URL, "key", DEFAULT_MODEL);
        let messages = [Message::user("hi")];
        let body = serde_json::to_value(client.request_body(&messages, &[])).unwrap();
        assert!(body.get("tools").is_none());
        assert!(body.get("tool_choice").is_none());
    }

    #[test]
    fn test_parse_tool_call_response() {
        let body = json!({
            "id": "chatcmpl-1",
            "choices": [{
                "index": 0,
                "finish_reason": "tool_calls",
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "simple_query", "arguments": "{\"query\": \"USDT\"}"}
                    }]
                }
            }]
        })
        .to_string();

        let reply = parse_response(&body).unwrap();
        assert_eq!(reply.content, None);
        assert_eq!(
            reply.tool_calls,
            vec![SelectedCall {
                name: "simple_query".into(),
                arguments: json!({"query": "USDT"}),
            }]
        );
    }

    #[test]
    fn test_parse_text_only_response() {
        let body = json!({
            "choices": [{"message": {"role": "assistant", "content": "No tool needed."}}]
        })
        .to_string();

        let reply = parse_response(&body).unwrap();
        assert_eq!(reply.content.as_deref(), Some("No tool needed."));
        assert!(reply.tool_calls.is_empty());
    }

    #[test]
    fn test_parse_empty_choices() {
        let err = parse_response(r#"{"choices": []}"#).unwrap_err();
        assert!(matches!(err, LlmError::EmptyResponse));
    }

    #[test]
    fn test_decode_arguments_shapes() {
        assert_eq!(decode_arguments(json!("{\"a\": 1}")), json!({"a": 1}));
        assert_eq!(decode_arguments(json!({"a": 1})), json!({"a": 1}));
        assert_eq!(decode_arguments(json!("")), json!({}));
        assert_eq!(decode_arguments(Value::Null), json!({}));
        assert_eq!(decode_arguments(json!("{broken")), json!("{broken"));
    }
}
