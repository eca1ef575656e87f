#![forbid(unsafe_code)]

//! Observable values and dependency tracking for Vireo.
//!
//! # Role in Vireo
//! `vireo-core` is the leaf of the workspace. It defines the dynamic
//! [`Value`] model used by expressions and bindings, the per-value
//! notification [`Hub`], the observable containers ([`ObservableObject`],
//! [`ObservableArray`]), and the explicit [`DependencyTracker`] that
//! watchers pass into evaluations to learn what was read.
//!
//! # Wrapping
//! Containers are observable from construction, so wrapping is a lookup:
//! [`wrap`] returns the existing hub of an object or array and nothing for
//! primitives, functions, and host objects. Calling it twice returns the
//! same hub.

use std::rc::Rc;

pub mod array;
pub mod host;
pub mod hub;
pub mod identity;
mod json;
pub mod object;
pub mod tracker;
pub mod uid;
pub mod value;

pub use array::ObservableArray;
pub use host::HostObject;
pub use hub::{Hub, Listener, ListenerId};
pub use identity::IdentityKey;
pub use object::ObservableObject;
pub use tracker::{Dependency, DependencyTracker, visit_deep};
pub use uid::{HubId, next_uid};
pub use value::{NativeFn, Value, format_number};

/// The notification hub of `value`, if it is an observable container.
#[must_use]
pub fn wrap(value: &Value) -> Option<Rc<Hub>> {
    value.hub()
}

/// Define `name` on `owner` as a reactive property holding `value`.
///
/// Returns `false` if the property is already reactive.
pub fn observe_property(owner: &ObservableObject, name: &str, value: Value) -> bool {
    owner.observe_property(name, value)
}

/// Fire the changed channel of `value`, if it is an observable container.
pub fn notify_changed(value: &Value) {
    if let Some(hub) = value.hub() {
        hub.notify_changed();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_is_idempotent() {
        let value = Value::Object(ObservableObject::new());
        let first = wrap(&value).map(|h| h.id());
        let second = wrap(&value).map(|h| h.id());
        assert!(first.is_some());
        assert_eq!(first, second);
    }

    #[test]
    fn wrap_skips_non_containers() {
        assert!(wrap(&Value::from(1)).is_none());
        assert!(wrap(&Value::from("s")).is_none());
        assert!(wrap(&Value::Function(NativeFn::new("f", |_| Value::Undefined))).is_none());
    }
}
