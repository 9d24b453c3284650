use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use serde_json::Value;

use crate::errors::{AgentError, AgentResult};
use crate::models::tool::{ToolCall, ToolSchema};

/// The executable side of a tool: an async function from an argument mapping
/// to a serializable value.
pub type ToolFn = Arc<dyn Fn(Value) -> BoxFuture<'static, AgentResult<Value>> + Send + Sync>;

/// Wrap an async closure as a [`ToolFn`].
pub fn tool_fn<F, Fut>(f: F) -> ToolFn
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = AgentResult<Value>> + Send + 'static,
{
    Arc::new(move |args| Box::pin(f(args)))
}

struct ToolEntry {
    schema: ToolSchema,
    func: ToolFn,
}

/// Mapping from tool name to schema and executable function.
///
/// The registry is also the set of tools the next model call advertises, so
/// removing a tool here is all it takes to stop offering it.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Mutex<HashMap<String, ToolEntry>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. A second registration under the same name replaces
    /// the first.
    pub fn register(&self, schema: ToolSchema, func: ToolFn) {
        let name = schema.name.clone();
        self.tools
            .lock()
            .unwrap()
            .insert(name, ToolEntry { schema, func });
    }

    /// Remove a tool by name. A no-op when the name is unregistered.
    pub fn remove(&self, name: &str) {
        self.tools.lock().unwrap().remove(name);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.lock().unwrap().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.lock().unwrap().is_empty()
    }

    /// The schemas of every registered tool, for advertising to the model.
    pub fn schemas(&self) -> Vec<ToolSchema> {
        let mut schemas: Vec<ToolSchema> = self
            .tools
            .lock()
            .unwrap()
            .values()
            .map(|entry| entry.schema.clone())
            .collect();
        schemas.sort_by(|a, b| a.name.cmp(&b.name));
        schemas
    }

    /// Execute a model-emitted call, writing the return value into the call's
    /// `result` field. Fails with [`AgentError::ToolNotFound`] when the name
    /// is unregistered; tool failures propagate unmodified.
    pub async fn execute(&self, call: &mut ToolCall) -> AgentResult<()> {
        let func = self
            .tools
            .lock()
            .unwrap()
            .get(&call.name)
            .map(|entry| entry.func.clone())
            .ok_or_else(|| AgentError::ToolNotFound(call.name.clone()))?;

        let result = func(call.arguments.clone()).await?;
        call.set_result(result);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn answer_tool() -> (ToolSchema, ToolFn) {
        let schema = ToolSchema::builder("answer")
            .description("Returns the answer.")
            .build()
            .unwrap();
        (schema, tool_fn(|_args| async { Ok(json!(42)) }))
    }

    #[tokio::test]
    async fn test_execute_round_trip() {
        let registry = ToolRegistry::new();
        let (schema, func) = answer_tool();
        registry.register(schema, func);

        let mut call = ToolCall::new("answer", json!({}));
        registry.execute(&mut call).await.unwrap();

        assert_eq!(call.result, Some(json!(42)));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_execute_unknown_tool() {
        let registry = ToolRegistry::new();
        let mut call = ToolCall::new("missing", json!({}));
        let err = registry.execute(&mut call).await.unwrap_err();
        assert!(matches!(err, AgentError::ToolNotFound(name) if name == "missing"));
        assert!(call.result.is_none());
    }

    #[tokio::test]
    async fn test_tool_receives_arguments() {
        let registry = ToolRegistry::new();
        let schema = ToolSchema::builder("double")
            .description("Doubles a number.")
            .param("n", "integer", "the number to double")
            .build()
            .unwrap();
        registry.register(
            schema,
            tool_fn(|args| async move {
                let n = args
                    .get("n")
                    .and_then(Value::as_i64)
                    .ok_or_else(|| AgentError::InvalidParameters("n".to_string()))?;
                Ok(json!(n * 2))
            }),
        );

        let mut call = ToolCall::new("double", json!({"n": 21}));
        registry.execute(&mut call).await.unwrap();
        assert_eq!(call.result, Some(json!(42)));
    }

    #[test]
    fn test_remove_is_noop_when_absent() {
        let registry = ToolRegistry::new();
        registry.remove("never-registered");
        assert!(registry.is_empty());

        let (schema, func) = answer_tool();
        registry.register(schema, func);
        registry.remove("answer");
        assert!(!registry.contains("answer"));
    }

    #[test]
    fn test_schemas_reflect_registrations() {
        let registry = ToolRegistry::new();
        let (schema, func) = answer_tool();
        registry.register(schema.clone(), func.clone());
        registry.register(schema, func);

        let schemas = registry.schemas();
        assert_eq!(schemas.len(), 1);
        assert_eq!(schemas[0].name, "answer");
    }
}
