use serde::{Deserialize, Serialize};
use thiserror::Error;

#[non_exhaustive]
#[derive(Error, Debug, Clone, Deserialize, Serialize)]
pub enum AgentError {
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Tool '{0}' has no description")]
    MissingDescription(String),

    #[error("Parameter '{parameter}' of tool '{tool}' has a missing or unknown type")]
    MissingParameterType { tool: String, parameter: String },

    #[error("Could not parse task selection: {0}")]
    TaskSelectionParse(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Tool execution failed: {0}")]
    ExecutionError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AgentResult<T> = Result<T, AgentError>;

#[derive(Error, Debug)]
pub enum PromptError {
    #[error("Prompt template not found: {0}")]
    NotFound(String),

    #[error("Failed to read prompt directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to render prompt: {0}")]
    Render(#[from] tera::Error),
}
