#![forbid(unsafe_code)]

//! Observable objects.
//!
//! An [`ObservableObject`] is an insertion-ordered property map whose every
//! write goes through its [`Hub`]. A property holding another wrapped value
//! carries a *forward*: a changed-listener on the child's hub that re-emits
//! the property on this hub, so in-place mutation of the child (for example
//! `items.push(x)`) notifies whoever read `items`.
//!
//! # Invariants
//!
//! 1. Writing a primitive equal to the current value emits nothing.
//! 2. Writing any object-typed value emits, even if it is the same handle.
//! 3. Each slot holds at most one forward, attached to its current value.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Missing key | Read of an undefined property | Returns `Undefined` (still tracked) |
//! | Self-reference | Object stored inside itself | Allowed; [`ObservableObject::dispose`] breaks the cycle |

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::hub::{Hub, ListenerId};
use crate::tracker::DependencyTracker;
use crate::value::Value;

struct Forward {
    hub: Rc<Hub>,
    id: ListenerId,
}

impl Forward {
    fn attach(parent: &Rc<Hub>, key: &str, value: &Value) -> Option<Self> {
        let child = value.hub()?;
        let parent = Rc::downgrade(parent);
        let key = key.to_owned();
        let id = child.add_changed_listener(Rc::new(move || {
            if let Some(parent) = parent.upgrade() {
                parent.emit(&key);
            }
        }));
        Some(Self { hub: child, id })
    }

    fn detach(self) {
        self.hub.remove_changed_listener(self.id);
    }
}

struct Slot {
    value: Value,
    forward: Option<Forward>,
}

struct ObjectInner {
    hub: Rc<Hub>,
    slots: RefCell<IndexMap<String, Slot>>,
}

/// A shared, observable property map.
#[derive(Clone)]
pub struct ObservableObject {
    inner: Rc<ObjectInner>,
}

impl Default for ObservableObject {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ObservableObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slots = self.inner.slots.borrow();
        write!(f, "Object#{}{{", self.id())?;
        for (i, (key, slot)) in slots.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match &slot.value {
                Value::Object(o) => write!(f, "{key}: Object#{}", o.id())?,
                Value::Array(a) => write!(f, "{key}: Array#{}", a.id())?,
                other => write!(f, "{key}: {other:?}")?,
            }
        }
        f.write_str("}")
    }
}

impl ObservableObject {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(ObjectInner {
                hub: Hub::new(),
                slots: RefCell::new(IndexMap::new()),
            }),
        }
    }

    /// Build from entries without emitting.
    pub fn from_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let object = Self::new();
        for (key, value) in entries {
            object.observe_property(&key.into(), value.into());
        }
        object
    }

    #[must_use]
    pub fn hub(&self) -> &Rc<Hub> {
        &self.inner.hub
    }

    /// Handle of this object (its hub id).
    #[must_use]
    pub fn id(&self) -> u64 {
        self.inner.hub.id().get()
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Untracked read.
    #[must_use]
    pub fn get(&self, key: &str) -> Value {
        self.inner
            .slots
            .borrow()
            .get(key)
            .map(|slot| slot.value.clone())
            .unwrap_or_default()
    }

    /// Read `key`, recording the read into `tracker` even when the key is
    /// missing.
    pub fn get_tracked(&self, key: &str, tracker: Option<&DependencyTracker>) -> Value {
        if let Some(tracker) = tracker {
            tracker.record(&self.inner.hub, key);
        }
        self.get(key)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.slots.borrow().contains_key(key)
    }

    /// Keys in insertion order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.inner.slots.borrow().keys().cloned().collect()
    }

    /// Snapshot of all entries in insertion order.
    #[must_use]
    pub fn entries(&self) -> Vec<(String, Value)> {
        self.inner
            .slots
            .borrow()
            .iter()
            .map(|(k, slot)| (k.clone(), slot.value.clone()))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.slots.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.slots.borrow().is_empty()
    }

    /// Define `key` as a reactive property holding `value`, without emitting.
    ///
    /// Returns `false` and leaves the property untouched if it is already
    /// defined.
    pub fn observe_property(&self, key: &str, value: Value) -> bool {
        if self.contains_key(key) {
            return false;
        }
        let forward = Forward::attach(&self.inner.hub, key, &value);
        self.inner
            .slots
            .borrow_mut()
            .insert(key.to_owned(), Slot { value, forward });
        true
    }

    /// Write `key`.
    ///
    /// An existing property emits `key` when the write is a change (see
    /// [`Value::changed`]). A new property emits `key` and then notifies the
    /// changed channel. Returns whether anything was emitted.
    pub fn set(&self, key: &str, value: Value) -> bool {
        let old = self
            .inner
            .slots
            .borrow()
            .get(key)
            .map(|slot| slot.value.clone());
        let Some(old) = old else {
            self.observe_property(key, value);
            self.inner.hub.emit(key);
            self.inner.hub.notify_changed();
            return true;
        };
        if !Value::changed(&value, &old) {
            return false;
        }
        let forward = Forward::attach(&self.inner.hub, key, &value);
        let previous = {
            let mut slots = self.inner.slots.borrow_mut();
            match slots.get_mut(key) {
                Some(slot) => {
                    slot.value = value;
                    std::mem::replace(&mut slot.forward, forward)
                }
                None => {
                    slots.insert(key.to_owned(), Slot { value, forward });
                    None
                }
            }
        };
        if let Some(previous) = previous {
            previous.detach();
        }
        self.inner.hub.emit(key);
        true
    }

    /// Delete `key`, emitting `key` and then the changed channel.
    pub fn remove(&self, key: &str) -> Option<Value> {
        let slot = self.inner.slots.borrow_mut().shift_remove(key)?;
        if let Some(forward) = slot.forward {
            forward.detach();
        }
        self.inner.hub.emit(key);
        self.inner.hub.notify_changed();
        Some(slot.value)
    }

    /// Detach every forward, drop all properties, and clear all listeners.
    pub fn dispose(&self) {
        let slots = std::mem::take(&mut *self.inner.slots.borrow_mut());
        for (_, slot) in slots {
            if let Some(forward) = slot.forward {
                forward.detach();
            }
        }
        self.inner.hub.clear();
    }
}
