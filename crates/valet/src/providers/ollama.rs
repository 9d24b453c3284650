use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

use super::base::{GenerateOptions, Provider};
use crate::models::message::Message;
use crate::models::role::Role;
use crate::models::tool::{ToolCall, ToolSchema};

pub const OLLAMA_HOST: &str = "http://localhost:11434";
pub const OLLAMA_MODEL: &str = "qwen3";

#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub host: String,
    pub model: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        OllamaConfig {
            host: OLLAMA_HOST.to_string(),
            model: OLLAMA_MODEL.to_string(),
        }
    }
}

/// Provider backed by an Ollama server's OpenAI-compatible chat endpoint.
pub struct OllamaProvider {
    client: Client,
    config: OllamaConfig,
}

impl OllamaProvider {
    pub fn new(config: OllamaConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(600)) // 10 minutes timeout
            .build()?;

        Ok(Self { client, config })
    }

    async fn post(&self, payload: Value) -> Result<Value> {
        let url = format!(
            "{}/v1/chat/completions",
            self.config.host.trim_end_matches('/')
        );

        let response = self.client.post(&url).json(&payload).send().await?;

        match response.status() {
            StatusCode::OK => Ok(response.json().await?),
            status if status == StatusCode::TOO_MANY_REQUESTS || status.as_u16() >= 500 => {
                Err(anyhow!("Server error: {}", status))
            }
            _ => Err(anyhow!(
                "Request failed: {}\nPayload: {}",
                response.status(),
                payload
            )),
        }
    }
}

/// Convert internal messages to the OpenAI chat message specification
fn messages_to_spec(messages: &[Message]) -> Vec<Value> {
    messages
        .iter()
        .map(|message| {
            let mut converted = json!({
                "role": message.role.as_str(),
                "content": message.content,
            });
            if message.role == Role::Assistant {
                if let Some(calls) = &message.tool_calls {
                    let spec: Vec<Value> = calls
                        .iter()
                        .map(|call| {
                            json!({
                                "id": call.id.clone().unwrap_or_default(),
                                "type": "function",
                                "function": {
                                    "name": call.name,
                                    "arguments": call.arguments.to_string(),
                                }
                            })
                        })
                        .collect();
                    converted["tool_calls"] = json!(spec);
                }
            }
            converted
        })
        .collect()
}

/// Convert tool schemas to the OpenAI function-tool specification. The flat
/// parameter mapping becomes a JSON schema object's properties.
fn tools_to_spec(tools: &[ToolSchema]) -> Vec<Value> {
    tools
        .iter()
        .map(|tool| {
            json!({
                "type": "function",
                "function": {
                    "name": tool.name,
                    "description": tool.description,
                    "parameters": {
                        "type": "object",
                        "properties": tool.parameters,
                    }
                }
            })
        })
        .collect()
}

fn response_to_message(response: Value) -> Result<Message> {
    let message = response
        .pointer("/choices/0/message")
        .ok_or_else(|| anyhow!("No message in response: {}", response))?;

    let content = message
        .get("content")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let thinking = message
        .get("reasoning_content")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let mut result = Message::assistant(content).with_thinking(thinking);

    if let Some(calls) = message.get("tool_calls").and_then(Value::as_array) {
        let tool_calls = calls
            .iter()
            .map(|call| {
                let name = call
                    .pointer("/function/name")
                    .and_then(Value::as_str)
                    .ok_or_else(|| anyhow!("Tool call without a name: {}", call))?;
                let arguments = match call.pointer("/function/arguments") {
                    Some(Value::String(raw)) => serde_json::from_str(raw)?,
                    Some(value) => value.clone(),
                    None => json!({}),
                };
                let mut parsed = ToolCall::new(name, arguments);
                if let Some(id) = call.get("id").and_then(Value::as_str) {
                    parsed = parsed.with_id(id);
                }
                Ok(parsed)
            })
            .collect::<Result<Vec<_>>>()?;
        if !tool_calls.is_empty() {
            result = result.with_tool_calls(tool_calls);
        }
    }

    Ok(result)
}

#[async_trait]
impl Provider for OllamaProvider {
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolSchema],
        options: &GenerateOptions,
    ) -> Result<Message> {
        let mut payload = json!({
            "model": self.config.model,
            "messages": messages_to_spec(messages),
        });
        let body = payload.as_object_mut().unwrap();

        if !tools.is_empty() {
            body.insert("tools".to_string(), json!(tools_to_spec(tools)));
        }
        if let Some(temperature) = options.temperature {
            body.insert("temperature".to_string(), json!(temperature));
        }
        if let Some(max_tokens) = options.max_tokens {
            body.insert("max_tokens".to_string(), json!(max_tokens));
        }
        if options.reasoning {
            body.insert("reasoning".to_string(), json!(true));
        }
        if options.format.as_deref() == Some("json") {
            body.insert(
                "response_format".to_string(),
                json!({"type": "json_object"}),
            );
        }

        let response = self.post(payload).await?;
        response_to_message(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn setup_mock_server(response_body: Value) -> (MockServer, OllamaProvider) {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(response_body))
            .mount(&mock_server)
            .await;

        let config = OllamaConfig {
            host: mock_server.uri(),
            model: OLLAMA_MODEL.to_string(),
        };
        let provider = OllamaProvider::new(config).unwrap();
        (mock_server, provider)
    }

    #[tokio::test]
    async fn test_complete_basic() -> Result<()> {
        let response_body = json!({
            "id": "chatcmpl-123",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": "Hello! How can I assist you today?",
                    "reasoning_content": "A greeting.",
                    "tool_calls": null
                },
                "finish_reason": "stop"
            }]
        });

        let (_, provider) = setup_mock_server(response_body).await;
        let messages = vec![Message::user("Hello?")];
        let message = provider
            .complete(&messages, &[], &GenerateOptions::default())
            .await?;

        assert_eq!(message.content, "Hello! How can I assist you today?");
        assert_eq!(message.thinking, "A greeting.");
        assert!(!message.has_tool_calls());
        Ok(())
    }

    #[tokio::test]
    async fn test_complete_tool_call() -> Result<()> {
        let response_body = json!({
            "id": "chatcmpl-tool",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_h5d3s25w",
                        "type": "function",
                        "function": {
                            "name": "get_coffee",
                            "arguments": "{}"
                        }
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        });

        let (_, provider) = setup_mock_server(response_body).await;
        let tool = ToolSchema::builder("get_coffee")
            .description("Brews a cup of coffee.")
            .build()
            .unwrap();

        let messages = vec![Message::user("Make me coffee")];
        let message = provider
            .complete(&messages, &[tool], &GenerateOptions::default())
            .await?;

        let calls = message.tool_calls.unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "get_coffee");
        assert_eq!(calls[0].arguments, json!({}));
        assert_eq!(calls[0].id.as_deref(), Some("call_h5d3s25w"));
        Ok(())
    }

    #[tokio::test]
    async fn test_server_error() -> Result<()> {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let config = OllamaConfig {
            host: mock_server.uri(),
            model: OLLAMA_MODEL.to_string(),
        };
        let provider = OllamaProvider::new(config)?;
        let messages = vec![Message::user("Hello?")];
        let result = provider
            .complete(&messages, &[], &GenerateOptions::default())
            .await;

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Server error: 500"));
        Ok(())
    }
}
