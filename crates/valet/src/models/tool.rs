use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::errors::{AgentError, AgentResult};
use crate::models::message::Message;

/// JSON schema types a tool parameter may declare.
const JSON_TYPES: &[&str] = &["string", "integer", "number", "boolean", "array", "object"];

/// The machine-readable contract of a tool advertised to a model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolSchema {
    /// The name of the tool
    pub name: String,
    /// A description of what the tool does
    pub description: String,
    /// Parameters that the tool accepts, a mapping from parameter name to
    /// `{"type": ..., "description": ...}`
    pub parameters: Value,
}

impl ToolSchema {
    /// Create a new schema with the given name and description, storing the
    /// supplied parameters verbatim.
    pub fn new<N, D>(name: N, description: D, parameters: Value) -> Self
    where
        N: Into<String>,
        D: Into<String>,
    {
        ToolSchema {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }

    /// Start a declarative schema builder for the named tool.
    pub fn builder<N: Into<String>>(name: N) -> ToolSchemaBuilder {
        ToolSchemaBuilder {
            name: name.into(),
            description: None,
            params: Vec::new(),
        }
    }
}

/// Declarative schema builder, validating at build time: a tool with no
/// description fails with [`AgentError::MissingDescription`] and a parameter
/// whose type is not a known JSON schema type fails with
/// [`AgentError::MissingParameterType`].
pub struct ToolSchemaBuilder {
    name: String,
    description: Option<String>,
    params: Vec<(String, String, String)>,
}

impl ToolSchemaBuilder {
    pub fn description<D: Into<String>>(mut self, description: D) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn param<N, T, D>(mut self, name: N, param_type: T, description: D) -> Self
    where
        N: Into<String>,
        T: Into<String>,
        D: Into<String>,
    {
        self.params
            .push((name.into(), param_type.into(), description.into()));
        self
    }

    pub fn build(self) -> AgentResult<ToolSchema> {
        let description = match self.description {
            Some(d) if !d.trim().is_empty() => d,
            _ => return Err(AgentError::MissingDescription(self.name)),
        };

        let mut parameters = Map::new();
        for (name, param_type, param_description) in self.params {
            if !JSON_TYPES.contains(&param_type.as_str()) {
                return Err(AgentError::MissingParameterType {
                    tool: self.name,
                    parameter: name,
                });
            }
            parameters.insert(
                name,
                json!({"type": param_type, "description": param_description}),
            );
        }

        Ok(ToolSchema {
            name: self.name,
            description,
            parameters: Value::Object(parameters),
        })
    }
}

/// A tool invocation emitted by a model.
///
/// The `result` field starts unset and is written exactly once when the
/// registry executes the call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    /// The name of the tool to execute
    pub name: String,
    /// The arguments for the execution, keyed by parameter name
    pub arguments: Value,
    /// The value the tool returned, filled in by execution
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Provider-assigned identifier, when the provider uses one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl ToolCall {
    pub fn new<S: Into<String>>(name: S, arguments: Value) -> Self {
        Self {
            name: name.into(),
            arguments,
            result: None,
            id: None,
        }
    }

    pub fn with_id<S: Into<String>>(mut self, id: S) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Record the value execution produced. Execution happens once per call,
    /// so a second write is a programming error.
    pub fn set_result(&mut self, result: Value) {
        debug_assert!(self.result.is_none(), "tool call result set twice");
        self.result = Some(result);
    }

    /// Render this call as a tool-role message summarizing the invocation and
    /// its outcome, for feeding back into the conversation.
    pub fn to_message(&self) -> Message {
        let result = self
            .result
            .as_ref()
            .map(|r| r.to_string())
            .unwrap_or_else(|| "(no result)".to_string());
        let content = format!(
            "Tool call: {}\nArguments: {}\nResult: {}",
            self.name, self.arguments, result
        );
        Message::tool(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::role::Role;

    #[test]
    fn test_builder_derives_schema() {
        let schema = ToolSchema::builder("greet")
            .description("Says hello.")
            .param("name", "string", "who to greet.")
            .build()
            .unwrap();

        assert_eq!(schema.name, "greet");
        assert_eq!(schema.description, "Says hello.");
        assert_eq!(
            schema.parameters,
            json!({"name": {"type": "string", "description": "who to greet."}})
        );
    }

    #[test]
    fn test_builder_requires_description() {
        let err = ToolSchema::builder("greet").build().unwrap_err();
        assert!(matches!(err, AgentError::MissingDescription(name) if name == "greet"));

        let err = ToolSchema::builder("greet")
            .description("   ")
            .build()
            .unwrap_err();
        assert!(matches!(err, AgentError::MissingDescription(_)));
    }

    #[test]
    fn test_builder_rejects_unknown_parameter_type() {
        let err = ToolSchema::builder("greet")
            .description("Says hello.")
            .param("name", "str", "who to greet.")
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            AgentError::MissingParameterType { tool, parameter }
                if tool == "greet" && parameter == "name"
        ));
    }

    #[test]
    fn test_tool_call_to_message() {
        let mut call = ToolCall::new("add", json!({"a": 1, "b": 2}));
        call.set_result(json!(3));

        let message = call.to_message();
        assert_eq!(message.role, Role::Tool);
        assert!(message.content.contains("Tool call: add"));
        assert!(message.content.contains("Result: 3"));
    }
}
