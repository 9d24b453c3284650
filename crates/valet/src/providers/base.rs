use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::message::Message;
use crate::models::tool::ToolSchema;

/// Generation options passed through to the inference engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateOptions {
    pub max_tokens: Option<i32>,
    pub temperature: Option<f32>,
    /// Ask the model for a private reasoning channel alongside the visible
    /// content.
    pub reasoning: bool,
    /// Structured-output hint, e.g. "json".
    pub format: Option<String>,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        GenerateOptions {
            max_tokens: None,
            temperature: None,
            reasoning: false,
            format: None,
        }
    }
}

impl GenerateOptions {
    /// Options for a reasoning-enabled call with the given token budget.
    pub fn reasoning(max_tokens: i32) -> Self {
        GenerateOptions {
            max_tokens: Some(max_tokens),
            reasoning: true,
            ..Default::default()
        }
    }
}

/// Base trait for model providers (Ollama, OpenAI-compatible servers, mocks).
///
/// A provider turns a message history plus the advertised tool schemas into
/// exactly one assistant message, which may carry tool calls.
#[async_trait]
pub trait Provider: Send + Sync {
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolSchema],
        options: &GenerateOptions,
    ) -> Result<Message>;
}
