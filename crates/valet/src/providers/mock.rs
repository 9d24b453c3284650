use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;

use super::base::{GenerateOptions, Provider};
use crate::models::message::Message;
use crate::models::tool::ToolSchema;

/// A mock provider that returns pre-configured responses for testing.
///
/// Counts completions and records each request's message history, so tests
/// can assert how many generations a code path performed and what prompts it
/// sent. Once the scripted responses run out it returns empty assistant
/// messages.
pub struct MockProvider {
    responses: Arc<Mutex<Vec<Message>>>,
    requests: Mutex<Vec<Vec<Message>>>,
    calls: AtomicUsize,
}

impl MockProvider {
    /// Create a new mock provider with a sequence of responses
    pub fn new(responses: Vec<Message>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// How many times `complete` has been called
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The message histories passed to `complete`, in call order
    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(
        &self,
        messages: &[Message],
        _tools: &[ToolSchema],
        _options: &GenerateOptions,
    ) -> Result<Message> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(messages.to_vec());
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok(Message::assistant(""))
        } else {
            Ok(responses.remove(0))
        }
    }
}
