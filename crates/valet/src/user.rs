use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tera::Context;

use crate::agent::Agent;
use crate::context::AgentContext;
use crate::errors::PromptError;
use crate::hub::AgentHub;
use crate::prompt_set::agent_prompts_dir;
use crate::providers::base::{GenerateOptions, Provider};

/// Something believed about the user, with how strongly it is believed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DescriptiveStatement {
    pub id: u64,
    pub content: String,
    pub confidence: f32,
}

impl fmt::Display for DescriptiveStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n{}\n{}", self.id, self.content, self.confidence)
    }
}

/// A piece of evidence about the user: an email, a request, an observed
/// action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InformationSource {
    pub kind: String,
    pub timestamp: String,
    pub content: String,
}

impl fmt::Display for InformationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n{}\n{}", self.kind, self.timestamp, self.content)
    }
}

/// The durable model of the user: descriptive statements accumulated over
/// time, each with a confidence score.
///
/// Ids come from a monotonic counter and are never reused after removal, so
/// a statement can be referred to stably across revisions. Interior
/// mutability for the same reason as [`crate::context::AgentContext`]: one
/// store shared by reference across agents.
#[derive(Debug)]
pub struct UserContext {
    next_id: AtomicU64,
    statements: Mutex<BTreeMap<u64, DescriptiveStatement>>,
}

impl Default for UserContext {
    fn default() -> Self {
        Self::new()
    }
}

impl UserContext {
    pub fn new() -> Self {
        UserContext {
            next_id: AtomicU64::new(1),
            statements: Mutex::new(BTreeMap::new()),
        }
    }

    /// Record a statement about the user, returning its id.
    pub fn add_statement<S: Into<String>>(&self, content: S, confidence: f32) -> u64 {
        let statement = DescriptiveStatement {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            content: content.into(),
            confidence,
        };
        let id = statement.id;
        self.statements.lock().unwrap().insert(id, statement);
        id
    }

    /// Remove a statement by id. A no-op when the id is absent.
    pub fn remove_statement(&self, id: u64) {
        self.statements.lock().unwrap().remove(&id);
    }

    pub fn statements(&self) -> Vec<DescriptiveStatement> {
        self.statements.lock().unwrap().values().cloned().collect()
    }

    /// Render all statements as a block of id/content/confidence records for
    /// prompt interpolation.
    pub fn statements_block(&self) -> String {
        self.statements
            .lock()
            .unwrap()
            .values()
            .map(|statement| statement.to_string())
            .collect::<Vec<_>>()
            .join("\n\n---\n\n")
    }
}

fn sources_block(sources: &[InformationSource]) -> String {
    sources
        .iter()
        .map(|source| source.to_string())
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

/// Agent that maintains the user model: given new evidence, it revises the
/// descriptive statements.
pub struct UserDescriptorAgent {
    agent: Arc<Agent>,
    user_context: Arc<UserContext>,
}

impl UserDescriptorAgent {
    pub fn new(
        provider: Arc<dyn Provider>,
        context: Arc<AgentContext>,
        user_context: Arc<UserContext>,
        hub: &AgentHub,
    ) -> Result<Arc<Self>, PromptError> {
        let agent = Agent::new(
            "user_descriptor",
            provider,
            &[agent_prompts_dir("user_descriptor")],
            context,
            hub,
        )?;
        Ok(Arc::new(UserDescriptorAgent {
            agent,
            user_context,
        }))
    }

    pub fn user_context(&self) -> &Arc<UserContext> {
        &self.user_context
    }

    /// Ask the model how the descriptive statements should change in light
    /// of new information about the user.
    pub async fn update_descriptive_statements(
        &self,
        information_sources: &[InformationSource],
    ) -> Result<String> {
        let mut context = Context::new();
        context.insert("information_sources", &sources_block(information_sources));
        context.insert(
            "descriptive_statements",
            &self.user_context.statements_block(),
        );
        let user_prompt = self
            .agent
            .prompt_set()
            .render("description_summary", &context)?;

        let options = GenerateOptions {
            max_tokens: Some(4096),
            ..Default::default()
        };
        let messages = self.agent.make_initial_prompt(&user_prompt);
        let responses = self.agent.generate(&messages, &options).await?;
        Ok(responses[0].content.trim().to_string())
    }
}
