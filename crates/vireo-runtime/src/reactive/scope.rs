#![forbid(unsafe_code)]

//! Grouped release of watch handles.

use vireo_core::Value;

use super::registry::{WatchHandle, WatchOptions, WatcherRegistry};

/// Collects [`WatchHandle`]s for a logical owner (a directive, a test).
///
/// When the scope is dropped or cleared, every held handle is unwatched in
/// reverse registration order.
///
/// # Invariants
///
/// 1. After `clear()` or drop, no callback registered through this scope
///    fires again.
/// 2. `clear()` leaves the scope reusable.
/// 3. `handle_count()` is always accurate.
#[derive(Default)]
pub struct WatchScope {
    handles: Vec<WatchHandle>,
}

impl WatchScope {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of an existing handle.
    pub fn hold(&mut self, handle: WatchHandle) {
        self.handles.push(handle);
    }

    /// Watch through `registry` and hold the handle here.
    pub fn watch(
        &mut self,
        registry: &WatcherRegistry,
        scope: &Value,
        expression: &str,
        options: WatchOptions,
        callback: impl Fn(&Value, &Value) + 'static,
    ) -> &mut Self {
        let handle = registry.watch(scope, expression, options, callback);
        self.handles.push(handle);
        self
    }

    #[must_use]
    pub fn handle_count(&self) -> usize {
        self.handles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Unwatch everything now.
    pub fn clear(&mut self) {
        while let Some(handle) = self.handles.pop() {
            handle.unwatch();
        }
    }
}

impl Drop for WatchScope {
    fn drop(&mut self) {
        self.clear();
    }
}

impl std::fmt::Debug for WatchScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchScope")
            .field("handle_count", &self.handles.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;
    use vireo_core::ObservableObject;

    #[test]
    fn clear_releases_every_handle() {
        let registry = WatcherRegistry::default();
        let object = ObservableObject::from_entries([("a", 1), ("b", 2)]);
        let target = Value::Object(object.clone());
        let calls = Rc::new(Cell::new(0));

        let mut scope = WatchScope::new();
        for expression in ["a", "b", "a + b"] {
            let c = Rc::clone(&calls);
            scope.watch(&registry, &target, expression, WatchOptions::default(), move |_, _| {
                c.set(c.get() + 1);
            });
        }
        assert_eq!(scope.handle_count(), 3);
        assert_eq!(registry.watcher_count(), 3);

        scope.clear();
        assert!(scope.is_empty());
        assert!(registry.is_empty());
        object.set("a", Value::from(5));
        registry.scheduler().flush();
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn drop_releases_handles() {
        let registry = WatcherRegistry::default();
        let target = Value::Object(ObservableObject::from_entries([("a", 1)]));
        {
            let mut scope = WatchScope::new();
            scope.hold(registry.watch(&target, "a", WatchOptions::default(), |_, _| {}));
            assert_eq!(registry.watcher_count(), 1);
        }
        assert!(registry.is_empty());
    }
}
