#![forbid(unsafe_code)]

//! Embedded event emitters.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use vireo_core::Value;

/// Receives the event payload.
pub type EventHandler = Rc<dyn Fn(&Value)>;

/// Identity of one registered handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventListenerId(u64);

/// Named-event fan-out. Handlers run in registration order against a
/// snapshot, so a handler may remove itself or others while running.
#[derive(Default)]
pub struct EventEmitter {
    listeners: RefCell<IndexMap<String, Vec<(EventListenerId, EventHandler)>>>,
    next_id: Cell<u64>,
}

impl fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listeners = self.listeners.borrow();
        f.debug_map()
            .entries(listeners.iter().map(|(name, l)| (name, l.len())))
            .finish()
    }
}

impl EventEmitter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(&self, event: &str, handler: EventHandler) -> EventListenerId {
        let id = EventListenerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.listeners
            .borrow_mut()
            .entry(event.to_owned())
            .or_default()
            .push((id, handler));
        id
    }

    pub fn remove_listener(&self, event: &str, id: EventListenerId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let Some(handlers) = listeners.get_mut(event) else {
            return false;
        };
        let before = handlers.len();
        handlers.retain(|(hid, _)| *hid != id);
        let removed = handlers.len() != before;
        if handlers.is_empty() {
            listeners.shift_remove(event);
        }
        removed
    }

    /// Deliver `payload` to every handler of `event`; returns how many ran.
    pub fn emit(&self, event: &str, payload: &Value) -> usize {
        let snapshot: Vec<EventHandler> = self
            .listeners
            .borrow()
            .get(event)
            .map(|handlers| handlers.iter().map(|(_, h)| Rc::clone(h)).collect())
            .unwrap_or_default();
        for handler in &snapshot {
            handler(payload);
        }
        snapshot.len()
    }

    #[must_use]
    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners.borrow().get(event).map_or(0, Vec::len)
    }

    pub fn clear(&self) {
        self.listeners.borrow_mut().clear();
    }
}
