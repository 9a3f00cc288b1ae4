use std::sync::Arc;
use parking_lot::Mutex;
use crate::event::{EditorEvent, EventHandler};

/// Collects every event it sees. Cloned logs share the same buffer, so one
/// clone can be subscribed while another is inspected.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<EditorEvent>>>,
}

impl EventLog {
    /// Creates a new empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events recorded so far
    pub fn events(&self) -> Vec<EditorEvent> {
        self.events.lock().clone()
    }

    /// Drain the recorded events
    pub fn take(&self) -> Vec<EditorEvent> {
        std::mem::take(&mut *self.events.lock())
    }
}

impl EventHandler for EventLog {
    fn handle_event(&mut self, event: &EditorEvent) {
        self.events.lock().push(event.clone());
    }
}
