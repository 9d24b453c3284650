use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tera::Context;

use crate::agent::Agent;
use crate::context::AgentContext;
use crate::errors::PromptError;
use crate::hub::AgentHub;
use crate::prompt_set::agent_prompts_dir;
use crate::providers::base::{GenerateOptions, Provider};

/// Categories the email agent sorts threads into.
pub const VALID_CATEGORIES: &[&str] = &["ADVERTISEMENT", "EMAIL_BLAST", "BUSINESS", "PERSONAL"];

/// A single email message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailMessage {
    pub subject: String,
    pub sender: String,
    pub recipients: Vec<String>,
    pub body: String,
    pub timestamp: String,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub message_id: String,
}

impl EmailMessage {
    pub fn recipients_str(&self) -> String {
        self.recipients.join(", ")
    }

    pub fn as_formatted_string(&self) -> String {
        format!(
            "From: {}\nTo: {}\nSubject: {}\nDate: {}\n\n{}",
            self.sender,
            self.recipients_str(),
            self.subject,
            self.timestamp,
            self.body
        )
    }
}

/// A thread of email messages, newest timestamp on the thread itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailThread {
    pub thread_id: String,
    pub timestamp: String,
    pub messages: Vec<EmailMessage>,
}

impl EmailThread {
    pub fn as_formatted_string(&self) -> String {
        let formatted: Vec<String> = self
            .messages
            .iter()
            .map(EmailMessage::as_formatted_string)
            .collect();
        format!(
            "Thread ID: {}\n\n{}",
            self.thread_id,
            formatted.join("\n\n---\n\n")
        )
    }
}

/// Thread/message retrieval interface the core consumes. The provider
/// integration behind it (Gmail fetch, local cache) is collaborator-owned.
#[async_trait]
pub trait MailStore: Send + Sync {
    /// Pull new mail from the provider into the store.
    async fn refresh(&self) -> Result<()>;

    /// All known threads, in no particular order.
    fn threads(&self) -> Vec<EmailThread>;
}

/// Mail store holding whatever threads it was seeded with. Used by tests and
/// the demo loop.
#[derive(Default)]
pub struct InMemoryMailStore {
    threads: Mutex<Vec<EmailThread>>,
}

impl InMemoryMailStore {
    pub fn new(threads: Vec<EmailThread>) -> Self {
        InMemoryMailStore {
            threads: Mutex::new(threads),
        }
    }

    pub fn push(&self, thread: EmailThread) {
        self.threads.lock().unwrap().push(thread);
    }
}

#[async_trait]
impl MailStore for InMemoryMailStore {
    async fn refresh(&self) -> Result<()> {
        Ok(())
    }

    fn threads(&self) -> Vec<EmailThread> {
        self.threads.lock().unwrap().clone()
    }
}

/// Agent that reads, summarizes, and sorts the user's email.
pub struct EmailAgent {
    agent: Arc<Agent>,
}

impl EmailAgent {
    pub fn new(
        provider: Arc<dyn Provider>,
        context: Arc<AgentContext>,
        hub: &AgentHub,
    ) -> Result<Arc<Self>, PromptError> {
        let agent = Agent::new(
            "email",
            provider,
            &[agent_prompts_dir("email")],
            context,
            hub,
        )?;
        Ok(Arc::new(EmailAgent { agent }))
    }

    /// Summarize a single email.
    pub async fn summarize_email(&self, email: &EmailMessage) -> Result<String> {
        let mut context = Context::new();
        context.insert("email", &email.as_formatted_string());
        let user_prompt = self.agent.prompt_set().render("email_summary", &context)?;

        let messages = self.agent.make_initial_prompt(&user_prompt);
        let responses = self
            .agent
            .generate(&messages, &GenerateOptions::default())
            .await?;
        Ok(responses[0].content.trim().to_string())
    }

    /// Decide what, if anything, should happen in response to an email.
    pub async fn process_email(&self, email: &EmailMessage) -> Result<String> {
        let mut context = Context::new();
        context.insert("email", &email.as_formatted_string());
        let user_prompt = self.agent.prompt_set().render("email_process", &context)?;

        let messages = self.agent.make_initial_prompt(&user_prompt);
        let responses = self
            .agent
            .generate(&messages, &GenerateOptions::default())
            .await?;
        Ok(responses[0].content.trim().to_string())
    }

    /// Sort threads into categories based on each thread's first message.
    /// Empty threads get `None`; so does a response naming no known category.
    pub async fn sort_threads(&self, threads: &[EmailThread]) -> Result<Vec<Option<String>>> {
        let mut categories = Vec::with_capacity(threads.len());
        for thread in threads {
            let Some(first_email) = thread.messages.first() else {
                categories.push(None);
                continue;
            };

            let mut context = Context::new();
            context.insert("email", &first_email.as_formatted_string());
            let user_prompt = self.agent.prompt_set().render("email_sort", &context)?;

            let messages = self.agent.make_initial_prompt(&user_prompt);
            let responses = self
                .agent
                .generate(&messages, &GenerateOptions::default())
                .await?;
            categories.push(parse_category(&responses[0].content));
        }
        Ok(categories)
    }
}

/// Match a model response against the known categories.
fn parse_category(response: &str) -> Option<String> {
    let cleaned = response.trim().to_uppercase();
    VALID_CATEGORIES
        .iter()
        .find(|category| cleaned.contains(**category))
        .map(|category| category.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::message::Message;
    use crate::providers::mock::MockProvider;

    fn email(subject: &str, body: &str) -> EmailMessage {
        EmailMessage {
            subject: subject.to_string(),
            sender: "alice@example.com".to_string(),
            recipients: vec!["user@example.com".to_string()],
            body: body.to_string(),
            timestamp: "2025-11-05T07:00:00Z".to_string(),
            labels: vec![],
            message_id: "m1".to_string(),
        }
    }

    fn thread(id: &str, messages: Vec<EmailMessage>) -> EmailThread {
        EmailThread {
            thread_id: id.to_string(),
            timestamp: "2025-11-05T07:00:00Z".to_string(),
            messages,
        }
    }

    fn make_email_agent(responses: Vec<Message>) -> Arc<EmailAgent> {
        let hub = AgentHub::new();
        EmailAgent::new(
            Arc::new(MockProvider::new(responses)),
            Arc::new(AgentContext::new()),
            &hub,
        )
        .unwrap()
    }

    #[test]
    fn test_formatted_string() {
        let formatted = email("Lunch?", "Want to grab lunch today?").as_formatted_string();
        assert!(formatted.starts_with("From: alice@example.com"));
        assert!(formatted.contains("Subject: Lunch?"));
        assert!(formatted.ends_with("Want to grab lunch today?"));
    }

    #[test]
    fn test_parse_category() {
        assert_eq!(parse_category("personal"), Some("PERSONAL".to_string()));
        assert_eq!(
            parse_category("This looks like BUSINESS."),
            Some("BUSINESS".to_string())
        );
        assert_eq!(parse_category("no idea"), None);
    }

    #[tokio::test]
    async fn test_summarize_email() {
        let agent = make_email_agent(vec![Message::assistant("Alice proposes lunch today.")]);
        let summary = agent
            .summarize_email(&email("Lunch?", "Want to grab lunch today?"))
            .await
            .unwrap();
        assert_eq!(summary, "Alice proposes lunch today.");
    }

    #[tokio::test]
    async fn test_sort_threads_skips_empty() {
        let agent = make_email_agent(vec![Message::assistant("PERSONAL")]);
        let threads = vec![
            thread("t1", vec![]),
            thread("t2", vec![email("Lunch?", "Want to grab lunch today?")]),
        ];

        let categories = agent.sort_threads(&threads).await.unwrap();
        assert_eq!(categories, vec![None, Some("PERSONAL".to_string())]);
    }

    #[tokio::test]
    async fn test_in_memory_store() {
        let store = InMemoryMailStore::default();
        store.refresh().await.unwrap();
        assert!(store.threads().is_empty());

        store.push(thread("t1", vec![email("Hi", "hello")]));
        assert_eq!(store.threads().len(), 1);
    }
}
