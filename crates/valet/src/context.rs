use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// A unit of situational text available to prompt construction.
#[derive(Debug, Clone)]
pub struct ContextItem {
    pub id: u64,
    pub content: String,
}

impl fmt::Display for ContextItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CONTEXT #{}: {}", self.id, self.content)
    }
}

/// A context entry recording an event that awaits acknowledgement.
#[derive(Debug, Clone)]
pub struct Notification {
    pub id: u64,
    pub content: String,
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NOTIFICATION #{}: {}", self.id, self.content)
    }
}

/// Shared store of context entries and notifications.
///
/// One `AgentContext` is shared by reference across all the agents cooperating
/// on one user's behalf, so every mutation point is interior. A single counter
/// feeds ids for both items and notifications; ids are never reused, even
/// after removal.
#[derive(Debug)]
pub struct AgentContext {
    next_id: AtomicU64,
    items: Mutex<BTreeMap<u64, ContextItem>>,
    notifications: Mutex<BTreeMap<u64, Notification>>,
}

impl Default for AgentContext {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentContext {
    pub fn new() -> Self {
        AgentContext {
            next_id: AtomicU64::new(1),
            items: Mutex::new(BTreeMap::new()),
            notifications: Mutex::new(BTreeMap::new()),
        }
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Append a context entry, returning its id.
    pub fn add_context<S: Into<String>>(&self, content: S) -> u64 {
        let item = ContextItem {
            id: self.next_id(),
            content: content.into(),
        };
        let id = item.id;
        self.items.lock().unwrap().insert(id, item);
        id
    }

    /// Remove a context entry by id. A no-op when the id is absent.
    pub fn remove_context(&self, id: u64) {
        self.items.lock().unwrap().remove(&id);
    }

    /// Render all live context entries as newline-joined labeled text.
    pub fn get_context(&self) -> String {
        self.items
            .lock()
            .unwrap()
            .values()
            .map(|item| item.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn clear_context(&self) {
        self.items.lock().unwrap().clear();
    }

    /// Append a notification, returning its id.
    pub fn add_notification<S: Into<String>>(&self, content: S) -> u64 {
        let notification = Notification {
            id: self.next_id(),
            content: content.into(),
        };
        let id = notification.id;
        self.notifications.lock().unwrap().insert(id, notification);
        id
    }

    /// Remove a notification by id. A no-op when the id is absent.
    pub fn remove_notification(&self, id: u64) {
        self.notifications.lock().unwrap().remove(&id);
    }

    pub fn has_notification(&self, id: u64) -> bool {
        self.notifications.lock().unwrap().contains_key(&id)
    }

    /// Render all live notifications as newline-joined labeled text.
    pub fn get_notifications(&self) -> String {
        self.notifications
            .lock()
            .unwrap()
            .values()
            .map(|note| note.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn clear_notifications(&self) {
        self.notifications.lock().unwrap().clear();
    }
}
