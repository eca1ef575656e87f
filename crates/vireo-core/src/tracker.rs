#![forbid(unsafe_code)]

//! Explicit dependency-tracking context.
//!
//! A [`DependencyTracker`] is passed into an evaluation by the caller that
//! wants to learn which `(hub, property)` pairs were read. Reads performed
//! without a tracker are untracked. Because the tracker is a value rather
//! than a shared slot, nested evaluations each see only their own tracker
//! and a panicking expression cannot leave stale tracking state behind.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use ahash::AHashSet;

use crate::hub::Hub;
use crate::uid::HubId;
use crate::value::Value;

/// One recorded read.
#[derive(Clone)]
pub struct Dependency {
    pub hub: Rc<Hub>,
    pub property: String,
}

impl fmt::Debug for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dependency")
            .field("hub", &self.hub.id())
            .field("property", &self.property)
            .finish()
    }
}

/// Collects the `(hub, property)` pairs read during one evaluation.
#[derive(Default)]
pub struct DependencyTracker {
    reads: RefCell<Vec<Dependency>>,
    seen: RefCell<AHashSet<(HubId, String)>>,
}

impl fmt::Debug for DependencyTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependencyTracker")
            .field("reads", &self.reads.borrow().len())
            .finish()
    }
}

impl DependencyTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a read of `property` on `hub`. Duplicate reads are collapsed.
    pub fn record(&self, hub: &Rc<Hub>, property: &str) {
        let key = (hub.id(), property.to_owned());
        if !self.seen.borrow_mut().insert(key) {
            return;
        }
        self.reads.borrow_mut().push(Dependency {
            hub: Rc::clone(hub),
            property: property.to_owned(),
        });
    }

    /// Whether `property` on the hub `hub` was read.
    #[must_use]
    pub fn contains(&self, hub: HubId, property: &str) -> bool {
        self.seen.borrow().contains(&(hub, property.to_owned()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.reads.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reads.borrow().is_empty()
    }

    /// Consume the tracker, yielding reads in first-read order.
    #[must_use]
    pub fn into_dependencies(self) -> Vec<Dependency> {
        self.reads.into_inner()
    }
}

/// Read every nested property of `value` through `tracker`.
///
/// Used by deep watches: plain objects and arrays are walked recursively so
/// that writes anywhere inside the structure re-trigger the watcher. Host
/// objects and functions are not entered. Cycles are visited once.
pub fn visit_deep(value: &Value, tracker: &DependencyTracker) {
    let mut visited = AHashSet::new();
    visit(value, tracker, &mut visited);
}

fn visit(value: &Value, tracker: &DependencyTracker, visited: &mut AHashSet<HubId>) {
    match value {
        Value::Object(object) => {
            if !visited.insert(object.hub().id()) {
                return;
            }
            for key in object.keys() {
                let child = object.get_tracked(&key, Some(tracker));
                visit(&child, tracker, visited);
            }
        }
        Value::Array(array) => {
            if !visited.insert(array.hub().id()) {
                return;
            }
            for item in array.to_vec() {
                visit(&item, tracker, visited);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ObservableArray, ObservableObject};

    #[test]
    fn duplicate_reads_collapse() {
        let hub = Hub::new();
        let tracker = DependencyTracker::new();
        tracker.record(&hub, "a");
        tracker.record(&hub, "a");
        tracker.record(&hub, "b");
        assert_eq!(tracker.len(), 2);
        assert!(tracker.contains(hub.id(), "b"));
        let deps = tracker.into_dependencies();
        assert_eq!(deps[0].property, "a");
        assert_eq!(deps[1].property, "b");
    }

    #[test]
    fn deep_visit_reads_nested_properties() {
        let inner = ObservableObject::new();
        inner.set("x", Value::from(1));
        let list = ObservableArray::from(vec![Value::Object(inner.clone())]);
        let root = ObservableObject::new();
        root.set("list", Value::Array(list));

        let tracker = DependencyTracker::new();
        visit_deep(&Value::Object(root.clone()), &tracker);

        assert!(tracker.contains(root.hub().id(), "list"));
        assert!(tracker.contains(inner.hub().id(), "x"));
    }

    #[test]
    fn deep_visit_terminates_on_cycles() {
        let a = ObservableObject::new();
        a.set("me", Value::Object(a.clone()));
        let tracker = DependencyTracker::new();
        visit_deep(&Value::Object(a.clone()), &tracker);
        assert_eq!(tracker.len(), 1);
        a.dispose();
    }
}
