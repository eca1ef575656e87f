#![forbid(unsafe_code)]

//! Host objects: values owned by the embedding layer.
//!
//! Components and visual objects are exposed to expressions as host objects.
//! They resolve their own members (and decide what is tracked), are never
//! wrapped, and are compared by handle.

use std::any::Any;
use std::rc::Rc;

use crate::tracker::DependencyTracker;
use crate::value::Value;

/// A value whose members are resolved by the embedding layer.
pub trait HostObject {
    /// Stable handle identifying this object.
    fn host_id(&self) -> u64;

    /// Short type label for diagnostics.
    fn type_name(&self) -> &'static str;

    /// Read a member. Implementations record reactive reads into `tracker`.
    fn get_member(&self, name: &str, tracker: Option<&DependencyTracker>) -> Value;

    /// Write a member. Returns `false` if the write was rejected.
    fn set_member(&self, name: &str, value: Value) -> bool;

    /// Upcast for downcasting back to the concrete handle type.
    fn into_any(self: Rc<Self>) -> Rc<dyn Any>;
}
