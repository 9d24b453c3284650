use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::models::message::Message;

/// Lifecycle state of a task, derived from its fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// No plan has been generated yet
    Planning,
    /// A plan exists and steps are executing
    Executing,
    /// The completion tool was invoked
    Completed,
}

/// A goal-directed unit of work an agent is undertaking.
///
/// A task starts as a small, achievable goal. The agent fleshes it out by
/// generating a plan, then performs it step by step, accumulating the full
/// planning and execution conversation in the message log. The completion
/// flag is a shared atomic so the transient `mark_task_completed` tool can
/// flip it from inside a tool handler.
#[derive(Debug, Clone)]
pub struct Task {
    goal: String,
    plan: String,
    completed: Arc<AtomicBool>,
    message_log: Vec<Message>,
}

impl Task {
    pub fn new<S: Into<String>>(goal: S) -> Self {
        Task {
            goal: goal.into(),
            plan: String::new(),
            completed: Arc::new(AtomicBool::new(false)),
            message_log: Vec::new(),
        }
    }

    pub fn goal(&self) -> &str {
        &self.goal
    }

    pub fn plan(&self) -> &str {
        &self.plan
    }

    pub fn has_plan(&self) -> bool {
        !self.plan.is_empty()
    }

    /// Record the generated plan. The plan is generated once and stays
    /// in-context through the message log afterwards.
    pub fn add_plan<S: Into<String>>(&mut self, plan: S) {
        self.plan = plan.into();
    }

    pub fn completed(&self) -> bool {
        self.completed.load(Ordering::SeqCst)
    }

    /// Shared handle to the completion flag, for the capture object behind
    /// the `mark_task_completed` tool.
    pub fn completion_flag(&self) -> Arc<AtomicBool> {
        self.completed.clone()
    }

    /// A "standby" goal means "do nothing this cycle": compared
    /// case-insensitively with trailing periods stripped.
    pub fn is_standby(&self) -> bool {
        self.goal
            .trim()
            .trim_end_matches('.')
            .eq_ignore_ascii_case("standby")
    }

    pub fn state(&self) -> TaskState {
        if self.completed() {
            TaskState::Completed
        } else if self.has_plan() {
            TaskState::Executing
        } else {
            TaskState::Planning
        }
    }

    pub fn message_log(&self) -> &[Message] {
        &self.message_log
    }

    pub fn log_message(&mut self, message: Message) {
        self.message_log.push(message);
    }

    pub fn log_messages<I: IntoIterator<Item = Message>>(&mut self, messages: I) {
        self.message_log.extend(messages);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_states() {
        let mut task = Task::new("water the plants");
        assert_eq!(task.state(), TaskState::Planning);

        task.add_plan("1. Find the watering can.\n2. Water the plants.");
        assert_eq!(task.state(), TaskState::Executing);

        task.completion_flag().store(true, Ordering::SeqCst);
        assert_eq!(task.state(), TaskState::Completed);
    }

    #[test]
    fn test_standby_detection() {
        assert!(Task::new("standby").is_standby());
        assert!(Task::new("Standby.").is_standby());
        assert!(Task::new("  STANDBY..  ").is_standby());
        assert!(!Task::new("stand by").is_standby());
        assert!(!Task::new("brew coffee").is_standby());
    }

    #[test]
    fn test_message_log_appends() {
        let mut task = Task::new("goal");
        task.log_message(Message::user("plan please"));
        task.log_messages(vec![Message::assistant("the plan")]);
        assert_eq!(task.message_log().len(), 2);
    }
}
