#![forbid(unsafe_code)]

//! Visual objects: the mutable output tree.
//!
//! A [`VisualNode`] is what directives manipulate. It carries a reactive
//! property bag (so two-way bindings can watch it), ordered children with a
//! weak back-pointer to the parent, and optionally an embedded
//! [`EventEmitter`]. Drawing is someone else's job.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use vireo_core::{DependencyTracker, HostObject, ObservableObject, Value, next_uid};

use crate::event::{EventEmitter, EventHandler, EventListenerId};

/// Tag of the placeholder visual left where a terminal directive sits.
pub const ANCHOR_TAG: &str = "anchor";

struct VisualInner {
    id: u64,
    tag: Rc<str>,
    props: ObservableObject,
    children: RefCell<Vec<VisualNode>>,
    parent: RefCell<Weak<VisualInner>>,
    events: Option<EventEmitter>,
    released: Cell<bool>,
}

/// Shared handle to one visual object.
#[derive(Clone)]
pub struct VisualNode {
    inner: Rc<VisualInner>,
}

impl fmt::Debug for VisualNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VisualNode")
            .field("id", &self.inner.id)
            .field("tag", &self.inner.tag)
            .field("children", &self.inner.children.borrow().len())
            .finish()
    }
}

impl PartialEq for VisualNode {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for VisualNode {}

impl VisualNode {
    fn build(tag: &str, events: bool) -> Self {
        Self {
            inner: Rc::new(VisualInner {
                id: next_uid(),
                tag: Rc::from(tag),
                props: ObservableObject::new(),
                children: RefCell::new(Vec::new()),
                parent: RefCell::new(Weak::new()),
                events: events.then(EventEmitter::new),
                released: Cell::new(false),
            }),
        }
    }

    /// A container with an embedded event emitter.
    #[must_use]
    pub fn new(tag: &str) -> Self {
        Self::build(tag, true)
    }

    /// A visual without event capability.
    #[must_use]
    pub fn without_events(tag: &str) -> Self {
        Self::build(tag, false)
    }

    #[must_use]
    pub fn anchor() -> Self {
        Self::without_events(ANCHOR_TAG)
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    #[must_use]
    pub fn tag(&self) -> &str {
        &self.inner.tag
    }

    #[must_use]
    pub fn is_anchor(&self) -> bool {
        &*self.inner.tag == ANCHOR_TAG
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// The reactive property bag.
    #[must_use]
    pub fn props(&self) -> &ObservableObject {
        &self.inner.props
    }

    #[must_use]
    pub fn property(&self, name: &str) -> Value {
        self.inner.props.get(name)
    }

    /// Write a property. Ignored once released.
    pub fn set_property(&self, name: &str, value: Value) -> bool {
        if self.inner.released.get() {
            return false;
        }
        self.inner.props.set(name, value)
    }

    #[must_use]
    pub fn parent(&self) -> Option<VisualNode> {
        self.inner
            .parent
            .borrow()
            .upgrade()
            .map(|inner| Self { inner })
    }

    #[must_use]
    pub fn children(&self) -> Vec<VisualNode> {
        self.inner.children.borrow().clone()
    }

    #[must_use]
    pub fn child_count(&self) -> usize {
        self.inner.children.borrow().len()
    }

    #[must_use]
    pub fn index_of(&self, child: &VisualNode) -> Option<usize> {
        self.inner
            .children
            .borrow()
            .iter()
            .position(|c| c.ptr_eq(child))
    }

    /// Insert `child` at `index` (appended when `None` or past the end),
    /// detaching it from its previous parent first.
    pub fn add_child(&self, child: &VisualNode, index: Option<usize>) {
        if let Some(previous) = child.parent() {
            previous.remove_child(child);
        }
        let mut children = self.inner.children.borrow_mut();
        let at = index.map_or(children.len(), |i| i.min(children.len()));
        children.insert(at, child.clone());
        *child.inner.parent.borrow_mut() = Rc::downgrade(&self.inner);
    }

    pub fn remove_child(&self, child: &VisualNode) -> bool {
        let removed = {
            let mut children = self.inner.children.borrow_mut();
            match children.iter().position(|c| c.ptr_eq(child)) {
                Some(index) => {
                    children.remove(index);
                    true
                }
                None => false,
            }
        };
        if removed {
            *child.inner.parent.borrow_mut() = Weak::new();
        }
        removed
    }

    /// Put `replacements` where `old` was, in order. `old` is detached.
    pub fn replace_child(&self, old: &VisualNode, replacements: &[VisualNode]) -> bool {
        let Some(index) = self.index_of(old) else {
            return false;
        };
        self.remove_child(old);
        for (offset, node) in replacements.iter().enumerate() {
            self.add_child(node, Some(index + offset));
        }
        true
    }

    /// Detach from the parent and drop state. With `recursive`, children
    /// are released too.
    pub fn release(&self, recursive: bool) {
        if let Some(parent) = self.parent() {
            parent.remove_child(self);
        }
        if self.inner.released.replace(true) {
            return;
        }
        let children = std::mem::take(&mut *self.inner.children.borrow_mut());
        for child in children {
            *child.inner.parent.borrow_mut() = Weak::new();
            if recursive {
                child.release(true);
            }
        }
        if let Some(events) = &self.inner.events {
            events.clear();
        }
        self.inner.props.dispose();
    }

    #[must_use]
    pub fn is_released(&self) -> bool {
        self.inner.released.get()
    }

    #[must_use]
    pub fn events(&self) -> Option<&EventEmitter> {
        self.inner.events.as_ref()
    }

    /// Register a handler directly; `None` when this visual has no events.
    pub fn add_listener(&self, event: &str, handler: EventHandler) -> Option<EventListenerId> {
        self.events().map(|e| e.add_listener(event, handler))
    }

    pub fn remove_listener(&self, event: &str, id: EventListenerId) -> bool {
        self.events().is_some_and(|e| e.remove_listener(event, id))
    }

    pub fn emit(&self, event: &str, payload: &Value) -> usize {
        self.events().map_or(0, |e| e.emit(event, payload))
    }

    /// This visual as an expression value (`$element`).
    #[must_use]
    pub fn as_value(&self) -> Value {
        Value::Host(Rc::clone(&self.inner) as Rc<dyn HostObject>)
    }

    /// Recover the handle from a value produced by [`as_value`](Self::as_value).
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        let host = Rc::clone(value.as_host()?);
        host.into_any()
            .downcast::<VisualInner>()
            .ok()
            .map(|inner| Self { inner })
    }
}

impl HostObject for VisualInner {
    fn host_id(&self) -> u64 {
        self.id
    }

    fn type_name(&self) -> &'static str {
        "visual"
    }

    fn get_member(&self, name: &str, tracker: Option<&DependencyTracker>) -> Value {
        match name {
            "tag" => Value::from(Rc::clone(&self.tag)),
            "childCount" => Value::from(self.children.borrow().len()),
            _ => self.props.get_tracked(name, tracker),
        }
    }

    fn set_member(&self, name: &str, value: Value) -> bool {
        if self.released.get() {
            return false;
        }
        self.props.set(name, value);
        true
    }

    fn into_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}
