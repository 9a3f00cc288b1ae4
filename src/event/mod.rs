mod bus;
mod events;
mod handlers;

pub use bus::EventBus;
pub use handlers::EventLog;

pub trait EventHandler: Send {
    fn handle_event(&mut self, event: &EditorEvent);
}

impl<F> EventHandler for F
where
    F: FnMut(&EditorEvent) + Send,
{
    fn handle_event(&mut self, event: &EditorEvent) {
        self(event)
    }
}

// Re-export the event types
pub use events::EditorEvent;
pub use events::LayerEvent;
pub use events::BackgroundEvent;
