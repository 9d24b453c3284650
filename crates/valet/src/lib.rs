pub mod agent;
pub mod assistant;
pub mod context;
pub mod email;
pub mod errors;
pub mod hub;
pub mod models;
pub mod prompt_set;
pub mod providers;
pub mod registry;
pub mod secrets;
pub mod task;
pub mod user;
pub mod wakeup;
pub mod weather;
