#![forbid(unsafe_code)]

//! Per-value notification hub.
//!
//! A [`Hub`] owns two listener channels:
//!
//! - **property listeners**, keyed by property name and fired by
//!   [`Hub::emit`] when that property is written;
//! - **changed listeners**, fired by [`Hub::notify_changed`] when the value
//!   is mutated as a container (array mutators, key insertion or removal).
//!   A parent object uses this channel to forward in-place mutations of a
//!   child to the property that holds it.
//!
//! # Invariants
//!
//! 1. Listeners fire in registration order.
//! 2. Emission iterates a snapshot: listeners added or removed during an
//!    emit take effect on the next emit.
//! 3. No `RefCell` borrow is held while a listener runs, so listeners may
//!    freely add or remove listeners on the same hub.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;

use crate::uid::HubId;

/// A change listener.
pub type Listener = Rc<dyn Fn()>;

/// Handle returned by listener registration; used to remove it again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Default)]
struct HubInner {
    properties: AHashMap<String, Vec<(ListenerId, Listener)>>,
    changed: Vec<(ListenerId, Listener)>,
    next_listener: u64,
}

impl HubInner {
    fn allocate(&mut self) -> ListenerId {
        self.next_listener += 1;
        ListenerId(self.next_listener)
    }
}

/// Notification hub attached to one observable value.
pub struct Hub {
    id: HubId,
    inner: RefCell<HubInner>,
}

impl fmt::Debug for Hub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Hub")
            .field("id", &self.id)
            .field("properties", &inner.properties.len())
            .field("changed_listeners", &inner.changed.len())
            .finish()
    }
}

impl Hub {
    /// Create an empty hub.
    #[must_use]
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            id: HubId::new(),
            inner: RefCell::new(HubInner::default()),
        })
    }

    /// Identity of this hub.
    #[must_use]
    pub fn id(&self) -> HubId {
        self.id
    }

    /// Register a listener for writes to `property`.
    pub fn add_listener(&self, property: &str, listener: Listener) -> ListenerId {
        let mut inner = self.inner.borrow_mut();
        let id = inner.allocate();
        inner
            .properties
            .entry(property.to_owned())
            .or_default()
            .push((id, listener));
        id
    }

    /// Remove a property listener. Returns `false` if it was not registered.
    pub fn remove_listener(&self, property: &str, id: ListenerId) -> bool {
        let mut inner = self.inner.borrow_mut();
        let Some(list) = inner.properties.get_mut(property) else {
            return false;
        };
        let before = list.len();
        list.retain(|(lid, _)| *lid != id);
        let removed = list.len() != before;
        if list.is_empty() {
            inner.properties.remove(property);
        }
        removed
    }

    /// Fire every listener registered for `property`.
    pub fn emit(&self, property: &str) {
        let snapshot: Vec<Listener> = match self.inner.borrow().properties.get(property) {
            Some(list) => list.iter().map(|(_, l)| Rc::clone(l)).collect(),
            None => return,
        };
        for listener in snapshot {
            listener();
        }
    }

    /// Register a container-changed listener.
    pub fn add_changed_listener(&self, listener: Listener) -> ListenerId {
        let mut inner = self.inner.borrow_mut();
        let id = inner.allocate();
        inner.changed.push((id, listener));
        id
    }

    /// Remove a container-changed listener.
    pub fn remove_changed_listener(&self, id: ListenerId) -> bool {
        let mut inner = self.inner.borrow_mut();
        let before = inner.changed.len();
        inner.changed.retain(|(lid, _)| *lid != id);
        inner.changed.len() != before
    }

    /// Fire every container-changed listener.
    pub fn notify_changed(&self) {
        let snapshot: Vec<Listener> = self
            .inner
            .borrow()
            .changed
            .iter()
            .map(|(_, l)| Rc::clone(l))
            .collect();
        for listener in snapshot {
            listener();
        }
    }

    /// Number of listeners registered for `property`.
    #[must_use]
    pub fn listener_count(&self, property: &str) -> usize {
        self.inner
            .borrow()
            .properties
            .get(property)
            .map_or(0, Vec::len)
    }

    /// Number of container-changed listeners.
    #[must_use]
    pub fn changed_listener_count(&self) -> usize {
        self.inner.borrow().changed.len()
    }

    /// Whether any listener of either channel is registered.
    #[must_use]
    pub fn has_listeners(&self) -> bool {
        let inner = self.inner.borrow();
        !inner.properties.is_empty() || !inner.changed.is_empty()
    }

    /// Drop every listener on both channels.
    pub fn clear(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.properties.clear();
        inner.changed.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn counter() -> (Rc<Cell<u32>>, Listener) {
        let count = Rc::new(Cell::new(0));
        let c = Rc::clone(&count);
        (count, Rc::new(move || c.set(c.get() + 1)))
    }

    #[test]
    fn emit_reaches_only_matching_property() {
        let hub = Hub::new();
        let (a_count, a) = counter();
        let (b_count, b) = counter();
        hub.add_listener("a", a);
        hub.add_listener("b", b);

        hub.emit("a");
        hub.emit("a");
        hub.emit("missing");

        assert_eq!(a_count.get(), 2);
        assert_eq!(b_count.get(), 0);
    }

    #[test]
    fn listeners_fire_in_registration_order() {
        let hub = Hub::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        for tag in ["first", "second", "third"] {
            let log = Rc::clone(&log);
            hub.add_listener("p", Rc::new(move || log.borrow_mut().push(tag)));
        }
        hub.emit("p");
        assert_eq!(*log.borrow(), vec!["first", "second", "third"]);
    }

    #[test]
    fn remove_listener_is_idempotent() {
        let hub = Hub::new();
        let (count, l) = counter();
        let id = hub.add_listener("p", l);
        assert!(hub.remove_listener("p", id));
        assert!(!hub.remove_listener("p", id));
        hub.emit("p");
        assert_eq!(count.get(), 0);
        assert_eq!(hub.listener_count("p"), 0);
    }

    #[test]
    fn listener_may_remove_itself_during_emit() {
        let hub = Hub::new();
        let slot: Rc<Cell<Option<ListenerId>>> = Rc::new(Cell::new(None));
        let weak_hub = Rc::downgrade(&hub);
        let s = Rc::clone(&slot);
        let id = hub.add_listener(
            "p",
            Rc::new(move || {
                if let (Some(h), Some(id)) = (weak_hub.upgrade(), s.get()) {
                    h.remove_listener("p", id);
                }
            }),
        );
        slot.set(Some(id));
        hub.emit("p");
        assert_eq!(hub.listener_count("p"), 0);
    }

    #[test]
    fn changed_channel_is_separate() {
        let hub = Hub::new();
        let (count, l) = counter();
        let id = hub.add_changed_listener(l);
        hub.emit("p");
        assert_eq!(count.get(), 0);
        hub.notify_changed();
        assert_eq!(count.get(), 1);
        assert!(hub.remove_changed_listener(id));
        assert!(!hub.has_listeners());
    }

    #[test]
    fn clear_drops_everything() {
        let hub = Hub::new();
        let (count, l) = counter();
        hub.add_listener("p", Rc::clone(&l));
        hub.add_changed_listener(l);
        hub.clear();
        hub.emit("p");
        hub.notify_changed();
        assert_eq!(count.get(), 0);
        assert!(!hub.has_listeners());
    }
}
