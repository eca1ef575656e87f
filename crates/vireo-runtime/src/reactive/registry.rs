#![forbid(unsafe_code)]

//! Shared watcher registry and RAII watch handles.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use ahash::AHashMap;
use vireo_core::{IdentityKey, Value};

use super::scheduler::Scheduler;
use super::watcher::{CallbackId, WatchKey, Watcher};

/// Options of one [`WatcherRegistry::watch`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WatchOptions {
    /// Walk the result so nested writes re-trigger the watch.
    pub deep: bool,
    /// Call back synchronously with `(value, Undefined)`.
    pub immediate: bool,
}

impl WatchOptions {
    #[must_use]
    pub fn deep(mut self) -> Self {
        self.deep = true;
        self
    }

    #[must_use]
    pub fn immediate(mut self) -> Self {
        self.immediate = true;
        self
    }
}

pub(crate) struct RegistryInner {
    scheduler: Rc<Scheduler>,
    global: RefCell<Value>,
    watchers: RefCell<AHashMap<WatchKey, Rc<Watcher>>>,
}

impl RegistryInner {
    /// Drop `key` if it still maps to watcher `id`.
    pub(crate) fn forget(&self, key: &WatchKey, id: u64) {
        let mut watchers = self.watchers.borrow_mut();
        if watchers.get(key).is_some_and(|w| w.id() == id) {
            watchers.remove(key);
        }
    }
}

/// Owns every live [`Watcher`], keyed by `(scope, expression, deep)`.
///
/// Call sites watching the same key share one watcher; each adds its own
/// callback. A watcher is destroyed when its last callback goes away, and a
/// later watch on the same key builds a fresh one.
#[derive(Clone)]
pub struct WatcherRegistry {
    inner: Rc<RegistryInner>,
}

impl fmt::Debug for WatcherRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatcherRegistry")
            .field("watchers", &self.inner.watchers.borrow().len())
            .finish()
    }
}

impl Default for WatcherRegistry {
    fn default() -> Self {
        Self::new(Scheduler::new())
    }
}

impl WatcherRegistry {
    #[must_use]
    pub fn new(scheduler: Rc<Scheduler>) -> Self {
        Self {
            inner: Rc::new(RegistryInner {
                scheduler,
                global: RefCell::new(Value::Undefined),
                watchers: RefCell::new(AHashMap::new()),
            }),
        }
    }

    #[must_use]
    pub fn scheduler(&self) -> &Rc<Scheduler> {
        &self.inner.scheduler
    }

    /// Value bound to `$global` in watched expressions created from now on.
    pub fn set_global(&self, global: Value) {
        *self.inner.global.borrow_mut() = global;
    }

    #[must_use]
    pub fn global(&self) -> Value {
        self.inner.global.borrow().clone()
    }

    /// The shared watcher for `(scope, expression, deep)`, created on demand.
    pub fn watcher(&self, scope: &Value, expression: &str, deep: bool) -> Rc<Watcher> {
        let key = WatchKey {
            scope: scope.identity_key(),
            expression: Rc::from(expression),
            deep,
        };
        let existing = self.inner.watchers.borrow().get(&key).cloned();
        if let Some(watcher) = existing.filter(|w| w.is_active()) {
            return watcher;
        }
        let watcher = Watcher::new(
            key.clone(),
            scope.clone(),
            self.global(),
            Rc::clone(&self.inner.scheduler),
            Rc::downgrade(&self.inner),
        );
        self.inner
            .watchers
            .borrow_mut()
            .insert(key, Rc::clone(&watcher));
        watcher
    }

    /// Watch `expression` on `scope`. Text containing `{{ }}` is compiled as
    /// an interpolation.
    pub fn watch(
        &self,
        scope: &Value,
        expression: &str,
        options: WatchOptions,
        callback: impl Fn(&Value, &Value) + 'static,
    ) -> WatchHandle {
        let watcher = self.watcher(scope, expression, options.deep);
        let callback: Rc<dyn Fn(&Value, &Value)> = Rc::new(callback);
        let id = watcher.add_callback(Rc::clone(&callback));
        if options.immediate {
            callback(&watcher.value(), &Value::Undefined);
        }
        WatchHandle {
            watcher: Rc::downgrade(&watcher),
            id,
            released: Cell::new(false),
            detached: false,
        }
    }

    /// Destroy every watcher whose scope is the handle `scope_id`.
    pub fn remove_watchers(&self, scope_id: u64) -> usize {
        let scope = IdentityKey::handle(scope_id);
        let doomed: Vec<Rc<Watcher>> = self
            .inner
            .watchers
            .borrow()
            .iter()
            .filter(|(key, _)| key.scope == scope)
            .map(|(_, w)| Rc::clone(w))
            .collect();
        for watcher in &doomed {
            watcher.destroy();
        }
        doomed.len()
    }

    #[must_use]
    pub fn watcher_count(&self) -> usize {
        self.inner.watchers.borrow().len()
    }

    #[must_use]
    pub fn watchers_for(&self, scope_id: u64) -> usize {
        let scope = IdentityKey::handle(scope_id);
        self.inner
            .watchers
            .borrow()
            .keys()
            .filter(|key| key.scope == scope)
            .count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.watchers.borrow().is_empty()
    }
}

/// Keeps one callback registered on a shared watcher.
///
/// Dropping the handle unwatches unless it was [`detach`](Self::detach)ed.
#[must_use = "dropping a WatchHandle unwatches immediately"]
pub struct WatchHandle {
    watcher: Weak<Watcher>,
    id: CallbackId,
    released: Cell<bool>,
    detached: bool,
}

impl fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchHandle")
            .field("id", &self.id)
            .field("released", &self.released.get())
            .finish()
    }
}

impl WatchHandle {
    /// Remove this callback. Idempotent.
    pub fn unwatch(&self) {
        if self.released.replace(true) {
            return;
        }
        if let Some(watcher) = self.watcher.upgrade() {
            watcher.remove_callback(self.id);
        }
    }

    /// Keep the callback for the watcher's whole lifetime.
    pub fn detach(mut self) {
        self.detached = true;
    }

    #[must_use]
    pub fn watcher(&self) -> Option<Rc<Watcher>> {
        self.watcher.upgrade()
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.released.get() && self.watcher.upgrade().is_some_and(|w| w.is_active())
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        if !self.detached {
            self.unwatch();
        }
    }
}
