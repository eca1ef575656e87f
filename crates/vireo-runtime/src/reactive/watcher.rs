#![forbid(unsafe_code)]

//! Dependency-tracking watchers.
//!
//! A [`Watcher`] evaluates one compiled expression against a scope value
//! with a fresh [`DependencyTracker`], then subscribes to exactly the
//! `(hub, property)` pairs that evaluation read. A notification on any of
//! them schedules a coalesced flush; the flush re-evaluates, diffs the
//! subscription set, and runs the callbacks if the value changed.
//!
//! # State machine
//!
//! ```text
//! constructing -> active -> (scheduled <-> idle) -> destroyed
//! ```
//!
//! `destroyed` is terminal. A destroyed watcher's pending flush is
//! cancelled, and a flush that still reaches it is a no-op.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use ahash::AHashMap;
use vireo_core::{
    Dependency, DependencyTracker, Hub, HubId, IdentityKey, ListenerId, Value, next_uid,
    visit_deep,
};
use vireo_expr::{CompiledExpr, EvalContext, compile_auto};

use super::registry::RegistryInner;
use super::scheduler::{Scheduler, TaskKey, TaskToken};

/// Callback identity used as the coalescing key of every watcher flush.
pub const WATCHER_FLUSH: u64 = 1;

/// Receives `(new_value, old_value)`.
pub type WatchCallback = Rc<dyn Fn(&Value, &Value)>;

/// Identity of one registered callback on a watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackId(pub(crate) u64);

/// Registry key: watchers are shared per `(scope, expression, deep)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WatchKey {
    pub scope: IdentityKey,
    pub expression: Rc<str>,
    pub deep: bool,
}

struct Subscription {
    hub: Rc<Hub>,
    listeners: AHashMap<String, ListenerId>,
}

/// A memoized expression plus the subscriptions it needs.
pub struct Watcher {
    id: u64,
    key: WatchKey,
    scope: Value,
    global: Value,
    getter: Rc<CompiledExpr>,
    value: RefCell<Value>,
    subscriptions: RefCell<AHashMap<HubId, Subscription>>,
    callbacks: RefCell<Vec<(CallbackId, WatchCallback)>>,
    active: Cell<bool>,
    token: Cell<Option<TaskToken>>,
    scheduler: Rc<Scheduler>,
    registry: Weak<RegistryInner>,
    me: Weak<Watcher>,
}

impl fmt::Debug for Watcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watcher")
            .field("id", &self.id)
            .field("expression", &self.key.expression)
            .field("deep", &self.key.deep)
            .field("active", &self.active.get())
            .field("callbacks", &self.callbacks.borrow().len())
            .finish()
    }
}

impl Watcher {
    pub(crate) fn new(
        key: WatchKey,
        scope: Value,
        global: Value,
        scheduler: Rc<Scheduler>,
        registry: Weak<RegistryInner>,
    ) -> Rc<Self> {
        let getter = compile_auto(&key.expression);
        let watcher = Rc::new_cyclic(|me| Self {
            id: next_uid(),
            key,
            scope,
            global,
            getter,
            value: RefCell::new(Value::Undefined),
            subscriptions: RefCell::new(AHashMap::new()),
            callbacks: RefCell::new(Vec::new()),
            active: Cell::new(true),
            token: Cell::new(None),
            scheduler,
            registry,
            me: me.clone(),
        });
        let (value, dependencies) = watcher.evaluate();
        watcher.resubscribe(dependencies);
        *watcher.value.borrow_mut() = value;
        watcher
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn key(&self) -> &WatchKey {
        &self.key
    }

    #[must_use]
    pub fn expression(&self) -> &str {
        &self.key.expression
    }

    /// Value from the latest evaluation.
    #[must_use]
    pub fn value(&self) -> Value {
        self.value.borrow().clone()
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    #[must_use]
    pub fn callback_count(&self) -> usize {
        self.callbacks.borrow().len()
    }

    /// Current subscription set as `(hub, property)` pairs.
    #[must_use]
    pub fn dependencies(&self) -> Vec<(HubId, String)> {
        let subscriptions = self.subscriptions.borrow();
        let mut pairs: Vec<(HubId, String)> = subscriptions
            .iter()
            .flat_map(|(id, sub)| sub.listeners.keys().map(move |p| (*id, p.clone())))
            .collect();
        pairs.sort();
        pairs
    }

    pub(crate) fn add_callback(&self, callback: WatchCallback) -> CallbackId {
        let id = CallbackId(next_uid());
        self.callbacks.borrow_mut().push((id, callback));
        id
    }

    /// Remove one callback; destroys the watcher when it was the last.
    pub(crate) fn remove_callback(&self, id: CallbackId) {
        let now_empty = {
            let mut callbacks = self.callbacks.borrow_mut();
            let before = callbacks.len();
            callbacks.retain(|(cid, _)| *cid != id);
            before != callbacks.len() && callbacks.is_empty()
        };
        if now_empty {
            self.destroy();
        }
    }

    fn evaluate(&self) -> (Value, Vec<Dependency>) {
        let tracker = DependencyTracker::new();
        let ctx = EvalContext::new(self.scope.clone())
            .with_global(self.global.clone())
            .with_tracker(&tracker);
        let value = self.getter.call(&ctx);
        if self.key.deep {
            visit_deep(&value, &tracker);
        }
        (value, tracker.into_dependencies())
    }

    /// Diff the subscription set against `dependencies`.
    fn resubscribe(&self, dependencies: Vec<Dependency>) {
        let mut wanted: AHashMap<HubId, (Rc<Hub>, Vec<String>)> = AHashMap::new();
        for dependency in dependencies {
            wanted
                .entry(dependency.hub.id())
                .or_insert_with(|| (Rc::clone(&dependency.hub), Vec::new()))
                .1
                .push(dependency.property);
        }

        let mut subscriptions = self.subscriptions.borrow_mut();
        subscriptions.retain(|hub_id, sub| {
            let keep = wanted.get(hub_id).map(|(_, props)| props);
            sub.listeners.retain(|property, listener| {
                let still_read = keep.is_some_and(|props| props.contains(property));
                if !still_read {
                    sub.hub.remove_listener(property, *listener);
                }
                still_read
            });
            !sub.listeners.is_empty()
        });

        for (hub_id, (hub, properties)) in wanted {
            let sub = subscriptions.entry(hub_id).or_insert_with(|| Subscription {
                hub: Rc::clone(&hub),
                listeners: AHashMap::new(),
            });
            for property in properties {
                if sub.listeners.contains_key(&property) {
                    continue;
                }
                let me = self.me.clone();
                let listener = hub.add_listener(
                    &property,
                    Rc::new(move || {
                        if let Some(watcher) = me.upgrade() {
                            watcher.schedule();
                        }
                    }),
                );
                sub.listeners.insert(property, listener);
            }
        }
    }

    fn unsubscribe_all(&self) {
        let subscriptions = std::mem::take(&mut *self.subscriptions.borrow_mut());
        for (_, sub) in subscriptions {
            for (property, listener) in sub.listeners {
                sub.hub.remove_listener(&property, listener);
            }
        }
    }

    /// Queue a flush on the next tick. Repeated calls before the tick
    /// coalesce.
    pub fn schedule(&self) {
        if !self.active.get() {
            return;
        }
        let me = self.me.clone();
        let token = self
            .scheduler
            .next_tick(TaskKey::new(WATCHER_FLUSH, self.id), move || {
                if let Some(watcher) = me.upgrade() {
                    watcher.flush();
                }
            });
        if token.is_some() {
            self.token.set(token);
        }
    }

    /// Re-evaluate now and run the callbacks if the value changed.
    pub fn flush(&self) {
        self.token.set(None);
        if !self.active.get() {
            return;
        }
        let (value, dependencies) = self.evaluate();
        if !self.active.get() {
            return;
        }
        self.resubscribe(dependencies);
        let old = self.value.replace(value.clone());
        if !Value::changed(&value, &old) {
            return;
        }
        tracing::trace!(
            target: "vireo::watcher",
            watcher = self.id,
            expression = %self.key.expression,
            "value changed"
        );

        let callbacks: Vec<(CallbackId, WatchCallback)> = self
            .callbacks
            .borrow()
            .iter()
            .map(|(id, cb)| (*id, Rc::clone(cb)))
            .collect();
        for (id, callback) in callbacks {
            if !self.active.get() {
                break;
            }
            let registered = self.callbacks.borrow().iter().any(|(cid, _)| *cid == id);
            if registered {
                callback(&value, &old);
            }
        }
    }

    /// Release every subscription and leave the registry. Idempotent.
    pub fn destroy(&self) {
        if !self.active.replace(false) {
            return;
        }
        self.unsubscribe_all();
        if let Some(token) = self.token.take() {
            self.scheduler.cancel(token);
        }
        self.callbacks.borrow_mut().clear();
        if let Some(registry) = self.registry.upgrade() {
            registry.forget(&self.key, self.id);
        }
        tracing::trace!(
            target: "vireo::watcher",
            watcher = self.id,
            expression = %self.key.expression,
            "watcher destroyed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vireo_core::{ObservableArray, ObservableObject};

    fn watcher(scope: &ObservableObject, expression: &str, deep: bool) -> Rc<Watcher> {
        let scope = Value::Object(scope.clone());
        Watcher::new(
            WatchKey {
                scope: scope.identity_key(),
                expression: Rc::from(expression),
                deep,
            },
            scope,
            Value::Undefined,
            Scheduler::new(),
            Weak::new(),
        )
    }

    #[test]
    fn subscribes_to_exactly_what_was_read() {
        let scope = ObservableObject::from_entries([("flag", true), ("a", false), ("b", false)]);
        let w = watcher(&scope, "flag ? a : b", false);
        let id = scope.hub().id();
        assert_eq!(
            w.dependencies(),
            vec![(id, "a".to_owned()), (id, "flag".to_owned())]
        );

        scope.set("flag", Value::Bool(false));
        w.flush();
        assert_eq!(
            w.dependencies(),
            vec![(id, "b".to_owned()), (id, "flag".to_owned())]
        );
        assert_eq!(scope.hub().listener_count("a"), 0);
        w.destroy();
    }

    #[test]
    fn notifications_coalesce_into_one_flush() {
        let scope = ObservableObject::from_entries([("n", 0)]);
        let w = watcher(&scope, "n", false);
        let calls = Rc::new(RefCell::new(Vec::new()));
        let c = Rc::clone(&calls);
        w.add_callback(Rc::new(move |new, old| {
            c.borrow_mut().push((new.to_number(), old.to_number()));
        }));

        for n in 1..=5 {
            scope.set("n", Value::from(n));
        }
        assert_eq!(w.scheduler.pending(), 1);
        w.scheduler.flush();
        assert_eq!(*calls.borrow(), vec![(5.0, 0.0)]);
        w.destroy();
    }

    #[test]
    fn unchanged_primitive_does_not_call_back() {
        let scope = ObservableObject::from_entries([("a", 1), ("b", 2)]);
        let w = watcher(&scope, "a + b", false);
        let calls = Rc::new(Cell::new(0));
        let c = Rc::clone(&calls);
        w.add_callback(Rc::new(move |_, _| c.set(c.get() + 1)));

        scope.set("a", Value::from(2));
        scope.set("b", Value::from(1));
        w.scheduler.flush();
        assert_eq!(calls.get(), 0);
        w.destroy();
    }

    #[test]
    fn deep_watch_tracks_nested_writes() {
        let inner = ObservableObject::from_entries([("x", 1)]);
        let scope = ObservableObject::from_entries([("cfg", Value::Object(inner.clone()))]);
        let shallow = watcher(&scope, "cfg", false);
        let deep = watcher(&scope, "cfg", true);
        assert_eq!(inner.hub().listener_count("x"), 1);

        inner.set("x", Value::from(2));
        assert!(
            !shallow
                .scheduler
                .is_scheduled(TaskKey::new(WATCHER_FLUSH, shallow.id()))
        );
        assert!(
            deep.scheduler
                .is_scheduled(TaskKey::new(WATCHER_FLUSH, deep.id()))
        );
        shallow.destroy();
        deep.destroy();
    }

    #[test]
    fn destroy_is_idempotent_and_cancels_pending_flush() {
        let scope = ObservableObject::from_entries([("items", Value::Array(ObservableArray::new()))]);
        let w = watcher(&scope, "items.length", false);
        let calls = Rc::new(Cell::new(0));
        let c = Rc::clone(&calls);
        w.add_callback(Rc::new(move |_, _| c.set(c.get() + 1)));

        if let Value::Array(items) = scope.get("items") {
            items.push(Value::from(1));
        }
        assert_eq!(w.scheduler.pending(), 1);
        w.destroy();
        w.destroy();
        assert_eq!(w.scheduler.pending(), 0);
        assert!(!scope.hub().has_listeners());
        w.scheduler.flush();
        w.flush();
        assert_eq!(calls.get(), 0);
    }
}
