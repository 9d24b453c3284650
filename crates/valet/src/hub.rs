use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::agent::Agent;

/// Registry of the live agents cooperating on one user's behalf.
///
/// Passed by reference to agent constructors so cross-agent lookup works
/// without global state. The last registration under a given name wins;
/// callers needing multiple instances of the same agent must manage distinct
/// names deliberately.
#[derive(Default)]
pub struct AgentHub {
    agents: Mutex<HashMap<String, Arc<Agent>>>,
}

impl AgentHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, name: &str, agent: Arc<Agent>) {
        self.agents.lock().unwrap().insert(name.to_string(), agent);
    }

    pub fn get(&self, name: &str) -> Option<Arc<Agent>> {
        self.agents.lock().unwrap().get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.agents.lock().unwrap().keys().cloned().collect();
        names.sort();
        names
    }
}
