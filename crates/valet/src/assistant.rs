use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Local};
use serde_json::{json, Value};
use tera::Context;
use tracing::{info, warn};

use crate::agent::Agent;
use crate::context::AgentContext;
use crate::email::{EmailAgent, MailStore};
use crate::errors::AgentError;
use crate::hub::AgentHub;
use crate::models::message::Message;
use crate::models::tool::ToolSchema;
use crate::prompt_set::agent_prompts_dir;
use crate::providers::base::{GenerateOptions, Provider};
use crate::registry::tool_fn;
use crate::task::Task;
use crate::wakeup::WakeupAgent;
use crate::weather::{Location, WeatherAgent, WeatherConfig};

/// Upper bound on model generations spent on a single task before it is
/// abandoned.
pub const MAX_TASK_ITERATIONS: usize = 20;

/// Stand-in summary until a calendar integration exists.
const DAILY_SUMMARY: &str =
    "Today's schedule is clear. No meetings or deadlines are on the calendar.";

/// The orchestrating agent. It owns the task list, drives the
/// generate/select/execute cycle, and fronts the collaborator agents as
/// tools on its own registry.
pub struct AssistantAgent {
    agent: Arc<Agent>,
    hub: AgentHub,
    weather: Arc<WeatherAgent>,
    wakeup: Arc<WakeupAgent>,
    email: Arc<EmailAgent>,
    mail: Arc<dyn MailStore>,
    tasks: Vec<Task>,
    home: Location,
    debug_time: Option<DateTime<Local>>,
}

impl AssistantAgent {
    /// Build the assistant and its collaborators around one shared context,
    /// then register the standing tool set.
    pub fn new(
        provider: Arc<dyn Provider>,
        home: Location,
        weather_config: WeatherConfig,
        mail: Arc<dyn MailStore>,
    ) -> Result<Self> {
        let hub = AgentHub::new();
        let context = Arc::new(AgentContext::new());

        let agent = Agent::new(
            "assistant",
            provider.clone(),
            &[agent_prompts_dir("assistant")],
            context.clone(),
            &hub,
        )?;
        let weather = WeatherAgent::new(
            provider.clone(),
            context.clone(),
            home.clone(),
            weather_config,
            &hub,
        )?;
        let wakeup = WakeupAgent::new(provider.clone(), context.clone(), home.clone(), &hub)?;
        let email = EmailAgent::new(provider, context.clone(), &hub)?;

        let assistant = AssistantAgent {
            agent,
            hub,
            weather,
            wakeup,
            email,
            mail,
            tasks: Vec::new(),
            home,
            debug_time: None,
        };
        assistant.register_standing_tools()?;
        Ok(assistant)
    }

    /// Pin the clock for deterministic prompt timestamps.
    pub fn with_debug_time(mut self, time: DateTime<Local>) -> Self {
        self.debug_time = Some(time);
        self
    }

    pub fn agent(&self) -> &Arc<Agent> {
        &self.agent
    }

    pub fn hub(&self) -> &AgentHub {
        &self.hub
    }

    pub fn context(&self) -> &Arc<AgentContext> {
        self.agent.context()
    }

    pub fn home(&self) -> &Location {
        &self.home
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn add_task(&mut self, task: Task) {
        self.tasks.push(task);
    }

    fn timestamp(&self) -> String {
        let now = self.debug_time.unwrap_or_else(Local::now);
        now.format("%I:%M %p on %A, %B %d, %Y").to_string()
    }

    fn register_standing_tools(&self) -> Result<()> {
        let (schema, func) = self.weather.as_tool()?;
        self.agent.add_tool(schema, func);

        let (schema, func) = self.wakeup.as_tool()?;
        self.agent.add_tool(schema, func);

        let schema = ToolSchema::builder("gen_daily_summary")
            .description("Generates a summary of the day's events from the user's calendar.")
            .build()?;
        self.agent
            .add_tool(schema, tool_fn(|_args| async { Ok(json!(DAILY_SUMMARY)) }));

        let schema = ToolSchema::builder("get_coffee")
            .description("Starts the coffee maker so a fresh cup is ready for the user.")
            .build()?;
        let context = self.context().clone();
        self.agent.add_tool(
            schema,
            tool_fn(move |_args| {
                let context = context.clone();
                async move {
                    info!("starting the coffee maker");
                    context.add_context("ACTION TAKEN: Coffee brewed.");
                    Ok(json!(0))
                }
            }),
        );

        let schema = ToolSchema::builder("remove_notification")
            .description(
                "Removes a notification from the notification list once it has \
                 been addressed.",
            )
            .param(
                "notification_id",
                "integer",
                "The id of the notification to remove.",
            )
            .build()?;
        let context = self.context().clone();
        self.agent.add_tool(
            schema,
            tool_fn(move |args| {
                let context = context.clone();
                async move {
                    let id = args
                        .get("notification_id")
                        .and_then(Value::as_u64)
                        .ok_or_else(|| {
                            AgentError::InvalidParameters("notification_id".to_string())
                        })?;
                    context.remove_notification(id);
                    Ok(json!("Notification removed."))
                }
            }),
        );

        let schema = ToolSchema::builder("get_latest_email_summary")
            .description("Fetches the user's most recent email and summarizes it.")
            .build()?;
        let mail = self.mail.clone();
        let email = self.email.clone();
        self.agent.add_tool(
            schema,
            tool_fn(move |_args| {
                let mail = mail.clone();
                let email = email.clone();
                async move {
                    mail.refresh()
                        .await
                        .map_err(|e| AgentError::ExecutionError(e.to_string()))?;
                    let threads = mail.threads();
                    let newest = threads
                        .iter()
                        .max_by(|a, b| a.timestamp.cmp(&b.timestamp));
                    let Some(message) = newest.and_then(|thread| thread.messages.last()) else {
                        return Ok(json!("No recent email found."));
                    };
                    email
                        .summarize_email(message)
                        .await
                        .map(Value::String)
                        .map_err(|e| AgentError::ExecutionError(e.to_string()))
                }
            }),
        );

        Ok(())
    }

    /// One pass of the assistant loop. With nothing outstanding, a new task
    /// is generated from the current situation and the cycle ends there;
    /// selection and execution happen on a later tick, once the list is
    /// non-empty.
    pub async fn cycle_step(&mut self) -> Result<()> {
        if self.tasks.is_empty() {
            let goal = self.gen_assistant_task().await?;
            info!(%goal, "generated task");
            self.tasks.push(Task::new(goal));
            return Ok(());
        }

        let index = self.select_next_task().await?;
        self.execute_task(index).await
    }

    /// Ask the model what, if anything, the assistant should do right now.
    /// The response is taken verbatim as the new task's goal.
    pub async fn gen_assistant_task(&self) -> Result<String> {
        let mut context = Context::new();
        context.insert("timestamp", &self.timestamp());
        context.insert("location", &self.home.describe());
        context.insert("agent_context", &self.context().get_context());
        context.insert("agent_notifications", &self.context().get_notifications());
        let user_prompt = self.agent.prompt_set().render("task_gen", &context)?;

        let messages = self.agent.make_initial_prompt(&user_prompt);
        let responses = self
            .agent
            .generate(&messages, &GenerateOptions::reasoning(4096))
            .await?;
        Ok(responses[0].content.trim().to_string())
    }

    /// Ask the model which task to work on next. The model answers with a
    /// 1-based position in the presented list; anything else is an error.
    pub async fn select_next_task(&self) -> Result<usize> {
        let listed: Vec<Value> = self
            .tasks
            .iter()
            .map(|task| json!({"goal": task.goal(), "plan": task.plan()}))
            .collect();

        let mut context = Context::new();
        context.insert("timestamp", &self.timestamp());
        context.insert("location", &self.home.describe());
        context.insert("agent_context", &self.context().get_context());
        context.insert("tasks", &listed);
        let user_prompt = self.agent.prompt_set().render("task_selection", &context)?;

        let messages = self.agent.make_initial_prompt(&user_prompt);
        let responses = self
            .agent
            .generate(&messages, &GenerateOptions::reasoning(4096))
            .await?;

        let answer = responses[0].content.trim().to_string();
        let selection: usize = answer
            .parse()
            .map_err(|_| AgentError::TaskSelectionParse(answer.clone()))?;
        if selection < 1 || selection > self.tasks.len() {
            return Err(AgentError::TaskSelectionParse(answer).into());
        }
        Ok(selection - 1)
    }

    /// Run the task at `index` until it completes, exhausts its iteration
    /// budget, or fails.
    ///
    /// A standby task is dismissed immediately with no model calls. For
    /// anything else the transient `mark_task_completed` tool is registered
    /// for the duration of the run and removed again on every exit path. A
    /// completed task leaves a record in the shared context; a task that runs
    /// out of budget is dropped without one. On error the task stays on the
    /// list so a later cycle can pick it up again.
    pub async fn execute_task(&mut self, index: usize) -> Result<()> {
        if self.tasks[index].is_standby() {
            info!("standing by");
            self.tasks.remove(index);
            return Ok(());
        }

        let schema = ToolSchema::builder("mark_task_completed")
            .description("Marks the current task as completed. Call this when the goal is met.")
            .build()?;
        let flag = self.tasks[index].completion_flag();
        self.agent.add_tool(
            schema,
            tool_fn(move |_args| {
                let flag = flag.clone();
                async move {
                    flag.store(true, std::sync::atomic::Ordering::SeqCst);
                    Ok(json!("Task marked as completed."))
                }
            }),
        );

        let result = self.run_task_loop(index).await;
        self.agent.remove_tool("mark_task_completed");
        result?;

        let task = &self.tasks[index];
        if task.completed() {
            info!(goal = %task.goal(), "task completed");
            self.context()
                .add_context(format!("TASK COMPLETED: {}", task.goal()));
        } else {
            warn!(goal = %task.goal(), "task abandoned after {MAX_TASK_ITERATIONS} iterations");
        }
        self.tasks.remove(index);
        Ok(())
    }

    async fn run_task_loop(&mut self, index: usize) -> Result<()> {
        for _ in 0..MAX_TASK_ITERATIONS {
            if !self.tasks[index].has_plan() {
                self.gen_task_plan(index).await?;
            } else {
                self.execute_task_step(index).await?;
            }
            if self.tasks[index].completed() {
                break;
            }
        }
        Ok(())
    }

    /// Generate the plan for a freshly created task. The planning exchange
    /// seeds the task's message log.
    async fn gen_task_plan(&mut self, index: usize) -> Result<()> {
        let mut context = Context::new();
        context.insert("timestamp", &self.timestamp());
        context.insert("location", &self.home.describe());
        context.insert("agent_context", &self.context().get_context());
        context.insert("goal", self.tasks[index].goal());
        let user_prompt = self.agent.prompt_set().render("task_planning", &context)?;

        let messages = self.agent.make_initial_prompt(&user_prompt);
        let responses = self
            .agent
            .generate(&messages, &GenerateOptions::reasoning(4096))
            .await?;
        let plan = responses[0].content.trim().to_string();

        let task = &mut self.tasks[index];
        task.add_plan(plan);
        task.log_message(Message::user(user_prompt));
        task.log_messages(responses);
        Ok(())
    }

    /// Take one step toward the task's goal, carrying the full planning and
    /// execution history so far. The step prompt and its responses are
    /// committed to the log only after the model call succeeds.
    async fn execute_task_step(&mut self, index: usize) -> Result<()> {
        let mut context = Context::new();
        context.insert("timestamp", &self.timestamp());
        context.insert("location", &self.home.describe());
        context.insert("agent_context", &self.context().get_context());
        context.insert(
            "task",
            &json!({
                "goal": self.tasks[index].goal(),
                "plan": self.tasks[index].plan(),
            }),
        );
        let user_prompt = self.agent.prompt_set().render("task_step", &context)?;

        let mut messages = vec![self.agent.make_system_message()];
        messages.extend(self.tasks[index].message_log().to_vec());
        messages.push(Message::user(user_prompt.clone()));

        let responses = self
            .agent
            .generate(&messages, &GenerateOptions::reasoning(4096))
            .await?;

        let task = &mut self.tasks[index];
        task.log_message(Message::user(user_prompt));
        task.log_messages(responses);
        Ok(())
    }
}
