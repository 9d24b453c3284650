use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tera::Context;
use tracing::debug;

use crate::context::AgentContext;
use crate::errors::PromptError;
use crate::hub::AgentHub;
use crate::models::message::Message;
use crate::prompt_set::{prompts_dir, PromptSet};
use crate::providers::base::{GenerateOptions, Provider};
use crate::registry::{ToolFn, ToolRegistry};
use crate::models::tool::ToolSchema;

/// An agent pairs a model provider with a prompt set, a tool registry, and a
/// shared context, and produces conversational turns.
pub struct Agent {
    name: String,
    provider: Arc<dyn Provider>,
    prompt_set: PromptSet,
    system_prompt: String,
    context: Arc<AgentContext>,
    tools: ToolRegistry,
}

impl Agent {
    /// Create an agent and register it in the hub under `name`.
    ///
    /// Prompt templates load from the common directory first, then from the
    /// caller's directories in order, so agent-specific prompts override the
    /// common set. The system prompt is rendered once, here.
    pub fn new(
        name: &str,
        provider: Arc<dyn Provider>,
        prompt_dirs: &[PathBuf],
        context: Arc<AgentContext>,
        hub: &AgentHub,
    ) -> Result<Arc<Self>, PromptError> {
        let mut dirs = vec![prompts_dir().join("common")];
        dirs.extend(prompt_dirs.iter().cloned());

        let prompt_set = PromptSet::load(&dirs)?;
        let system_prompt = prompt_set.render("system_prompt", &Context::new())?;

        let agent = Arc::new(Agent {
            name: name.to_string(),
            provider,
            prompt_set,
            system_prompt,
            context,
            tools: ToolRegistry::new(),
        });
        hub.register(name, agent.clone());
        Ok(agent)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn prompt_set(&self) -> &PromptSet {
        &self.prompt_set
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn context(&self) -> &Arc<AgentContext> {
        &self.context
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn make_system_message(&self) -> Message {
        Message::system(self.system_prompt.clone())
    }

    /// The two-message seed of a fresh conversation: the system prompt plus
    /// the given user prompt.
    pub fn make_initial_prompt(&self, user_prompt: &str) -> Vec<Message> {
        vec![self.make_system_message(), Message::user(user_prompt)]
    }

    /// Register a tool so the next model call advertises it.
    pub fn add_tool(&self, schema: ToolSchema, func: ToolFn) {
        self.tools.register(schema, func);
    }

    /// Unregister a tool. A no-op when the name is unknown.
    pub fn remove_tool(&self, name: &str) {
        self.tools.remove(name);
    }

    /// One model completion, plus execution of whatever tool calls it emits.
    ///
    /// The provider returns exactly one assistant message. If it carries tool
    /// calls they execute sequentially in the order the model emitted them,
    /// and each completed call becomes a trailing tool-role message. The
    /// caller appends the whole returned sequence to its running log. Model
    /// and tool failures propagate uncaught; there is no partial-result
    /// recovery here.
    pub async fn generate(
        &self,
        messages: &[Message],
        options: &GenerateOptions,
    ) -> Result<Vec<Message>> {
        let schemas = self.tools.schemas();
        debug!(agent = %self.name, tools = schemas.len(), "requesting completion");

        let mut response = self.provider.complete(messages, &schemas, options).await?;

        if let Some(calls) = response.tool_calls.as_mut() {
            for call in calls.iter_mut() {
                debug!(agent = %self.name, tool = %call.name, "executing tool call");
                self.tools.execute(call).await?;
            }
        }

        let tool_messages: Vec<Message> = response
            .tool_calls
            .iter()
            .flatten()
            .map(|call| call.to_message())
            .collect();

        let mut out = vec![response];
        out.extend(tool_messages);
        Ok(out)
    }
}
