pub mod base;
pub mod mock;
pub mod ollama;
