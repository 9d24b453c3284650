//! These models represent the objects passed between the agents and the model
//! interface: conversation turns, and the tool calls a model may emit inside
//! an assistant turn. Tool output re-enters the conversation by converting a
//! completed `ToolCall` into a tool-role `Message`.
pub mod message;
pub mod role;
pub mod tool;
