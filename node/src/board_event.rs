//! Notifications emitted after the proposal board changes.

use govsync_types::ProposalId;

/// Board-level events that observers can subscribe to via the [`EventBus`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BoardEvent {
    /// A board build finished and the index covers blocks up to `checkpoint`.
    BoardRebuilt { proposals: usize, checkpoint: u64 },
    /// A single proposal was refreshed.
    ProposalUpdated { id: ProposalId },
    /// The comment sweep finished.
    CommentsUpdated { comments: usize },
}

/// Synchronous fan-out event bus for board events.
///
/// Listeners are invoked inline on the emitting task; keep handlers fast to
/// avoid stalling synchronization.
pub struct EventBus {
    listeners: Vec<Box<dyn Fn(&BoardEvent) + Send + Sync>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, listener: Box<dyn Fn(&BoardEvent) + Send + Sync>) {
        self.listeners.push(listener);
    }

    pub fn emit(&self, event: &BoardEvent) {
        for listener in &self.listeners {
            listener(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn emit_calls_all_listeners_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut bus = EventBus::new();

        let s1 = Arc::clone(&seen);
        bus.subscribe(Box::new(move |e| s1.lock().unwrap().push(("first", e.clone()))));
        let s2 = Arc::clone(&seen);
        bus.subscribe(Box::new(move |e| s2.lock().unwrap().push(("second", e.clone()))));

        let event = BoardEvent::CommentsUpdated { comments: 3 };
        bus.emit(&event);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], ("first", event.clone()));
        assert_eq!(seen[1], ("second", event));
    }

    #[test]
    fn emit_with_no_listeners_is_noop() {
        let bus = EventBus::new();
        bus.emit(&BoardEvent::ProposalUpdated {
            id: ProposalId::from(1u64),
        });
        assert_eq!(bus.listener_count(), 0);
    }
}
