use std::sync::Arc;

use anyhow::Result;
use chrono::Local;
use serde_json::Value;
use tera::Context;
use tracing::info;

use crate::agent::Agent;
use crate::context::AgentContext;
use crate::errors::{AgentError, AgentResult, PromptError};
use crate::hub::AgentHub;
use crate::models::tool::ToolSchema;
use crate::prompt_set::agent_prompts_dir;
use crate::providers::base::{GenerateOptions, Provider};
use crate::registry::{tool_fn, ToolFn};
use crate::weather::Location;

/// Agent that wakes the user: activates the alarm and composes a spoken
/// morning message.
pub struct WakeupAgent {
    agent: Arc<Agent>,
    home: Location,
}

impl WakeupAgent {
    pub fn new(
        provider: Arc<dyn Provider>,
        context: Arc<AgentContext>,
        home: Location,
        hub: &AgentHub,
    ) -> Result<Arc<Self>, PromptError> {
        let agent = Agent::new(
            "wakeup",
            provider,
            &[agent_prompts_dir("wakeup")],
            context,
            hub,
        )?;
        Ok(Arc::new(WakeupAgent { agent, home }))
    }

    /// Activate the wakeup alarm and generate the message read aloud to the
    /// user. Both device actions are recorded in the shared context.
    pub async fn morning_wakeup(
        &self,
        morning_weather_report: &str,
        daily_summary: &str,
    ) -> Result<String> {
        let now = Local::now();
        let mut context = Context::new();
        context.insert("current_time", &now.format("%I:%M %p").to_string());
        context.insert("current_date", &now.format("%A, %B %d, %Y").to_string());
        context.insert("location", &self.home.describe());
        context.insert("weather_description", morning_weather_report);
        context.insert("daily_summary", daily_summary);
        let user_prompt = self.agent.prompt_set().render("initial_wakeup", &context)?;

        let messages = self.agent.make_initial_prompt(&user_prompt);
        let responses = self
            .agent
            .generate(&messages, &GenerateOptions::reasoning(2048))
            .await?;
        let message = responses[0].content.trim().to_string();

        info!("alarm activated for wakeup");
        self.agent
            .context()
            .add_context("ACTION TAKEN: Wakeup alarm activated.");
        info!(%message, "speaking wakeup message aloud");
        self.agent
            .context()
            .add_context("ACTION TAKEN: Wakeup message spoken aloud.");

        Ok(message)
    }

    /// Expose this agent as a tool another agent can call in-line.
    pub fn as_tool(self: &Arc<Self>) -> AgentResult<(ToolSchema, ToolFn)> {
        let schema = ToolSchema::builder("morning_wakeup")
            .description(
                "Activates the wakeup alarm and reads a morning wakeup message \
                 that prepares the user for the day ahead.",
            )
            .param(
                "morning_weather_report",
                "string",
                "A brief report of the current and forecasted weather.",
            )
            .param(
                "daily_summary",
                "string",
                "A summary of the day's events and tasks.",
            )
            .build()?;

        let wakeup = self.clone();
        let func = tool_fn(move |args: Value| {
            let wakeup = wakeup.clone();
            async move {
                let report = args
                    .get("morning_weather_report")
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        AgentError::InvalidParameters("morning_weather_report".to_string())
                    })?
                    .to_string();
                let summary = args
                    .get("daily_summary")
                    .and_then(Value::as_str)
                    .ok_or_else(|| AgentError::InvalidParameters("daily_summary".to_string()))?
                    .to_string();
                wakeup
                    .morning_wakeup(&report, &summary)
                    .await
                    .map(Value::String)
                    .map_err(|e| AgentError::ExecutionError(e.to_string()))
            }
        });
        Ok((schema, func))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::message::Message;
    use crate::providers::mock::MockProvider;
    use crate::registry::ToolRegistry;
    use crate::models::tool::ToolCall;
    use serde_json::json;

    fn home() -> Location {
        Location {
            city: "Boston".to_string(),
            state: "Massachusetts".to_string(),
            country: "United States".to_string(),
            lat: 42.36,
            lng: -71.06,
        }
    }

    #[tokio::test]
    async fn test_morning_wakeup_records_actions() {
        let context = Arc::new(AgentContext::new());
        let hub = AgentHub::new();
        let provider = Arc::new(MockProvider::new(vec![Message::assistant(
            "Good morning! It's a crisp fall day.",
        )]));
        let wakeup = WakeupAgent::new(provider, context.clone(), home(), &hub).unwrap();

        let message = wakeup
            .morning_wakeup("Sunny and 48F.", "Video call at 10:00 AM.")
            .await
            .unwrap();

        assert_eq!(message, "Good morning! It's a crisp fall day.");
        let recorded = context.get_context();
        assert!(recorded.contains("ACTION TAKEN: Wakeup alarm activated."));
        assert!(recorded.contains("ACTION TAKEN: Wakeup message spoken aloud."));
    }

    #[tokio::test]
    async fn test_as_tool_requires_both_arguments() {
        let context = Arc::new(AgentContext::new());
        let hub = AgentHub::new();
        let provider = Arc::new(MockProvider::new(vec![]));
        let wakeup = WakeupAgent::new(provider, context, home(), &hub).unwrap();

        let (schema, func) = wakeup.as_tool().unwrap();
        let registry = ToolRegistry::new();
        registry.register(schema, func);

        let mut call = ToolCall::new("morning_wakeup", json!({"daily_summary": "quiet day"}));
        let err = registry.execute(&mut call).await.unwrap_err();
        assert!(matches!(err, AgentError::InvalidParameters(_)));
    }
}
