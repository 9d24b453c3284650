use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::role::Role;
use super::tool::ToolCall;

/// A message to or from an LLM.
///
/// Messages are immutable once constructed, with one exception: the `result`
/// field of an embedded [`ToolCall`] is filled in by tool execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub created: i64,
    pub content: String,
    /// Private reasoning emitted by the model, never shown to the user.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub thinking: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
}

impl Message {
    pub fn new<S: Into<String>>(role: Role, content: S) -> Self {
        Message {
            role,
            created: Utc::now().timestamp(),
            content: content.into(),
            thinking: String::new(),
            tool_calls: None,
        }
    }

    /// Create a new system message with the current timestamp
    pub fn system<S: Into<String>>(content: S) -> Self {
        Message::new(Role::System, content)
    }

    /// Create a new user message with the current timestamp
    pub fn user<S: Into<String>>(content: S) -> Self {
        Message::new(Role::User, content)
    }

    /// Create a new assistant message with the current timestamp
    pub fn assistant<S: Into<String>>(content: S) -> Self {
        Message::new(Role::Assistant, content)
    }

    /// Create a new tool message with the current timestamp
    pub fn tool<S: Into<String>>(content: S) -> Self {
        Message::new(Role::Tool, content)
    }

    /// Attach the model's private reasoning to the message
    pub fn with_thinking<S: Into<String>>(mut self, thinking: S) -> Self {
        self.thinking = thinking.into();
        self
    }

    /// Attach the tool calls the model requested in this turn
    pub fn with_tool_calls(mut self, tool_calls: Vec<ToolCall>) -> Self {
        self.tool_calls = Some(tool_calls);
        self
    }

    pub fn has_tool_calls(&self) -> bool {
        self.tool_calls.as_ref().is_some_and(|calls| !calls.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_roles_serialize_lowercase() {
        let message = Message::assistant("hi");
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["role"], json!("assistant"));
    }

    #[test]
    fn test_has_tool_calls() {
        let message = Message::assistant("");
        assert!(!message.has_tool_calls());

        let message = message.with_tool_calls(vec![ToolCall::new("noop", json!({}))]);
        assert!(message.has_tool_calls());

        let message = Message::assistant("").with_tool_calls(vec![]);
        assert!(!message.has_tool_calls());
    }

    #[test]
    fn test_thinking_not_serialized_when_empty() {
        let value = serde_json::to_value(Message::user("hello")).unwrap();
        assert!(value.get("thinking").is_none());

        let value = serde_json::to_value(Message::assistant("hi").with_thinking("hmm")).unwrap();
        assert_eq!(value["thinking"], json!("hmm"));
    }
}
