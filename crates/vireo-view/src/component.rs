#![forbid(unsafe_code)]

//! Components: a reactive model plus methods, lifecycle, and a template.
//!
//! A [`ComponentDefinition`] is registered once by name; each instance is a
//! [`Component`] handle. Expressions see a component as a host object and
//! resolve bare identifiers against it in this order:
//!
//! 1. `$parent`
//! 2. model properties (declared or added later)
//! 3. methods, returned bound to the instance
//! 4. otherwise `undefined`, with the miss still tracked so a later write
//!    re-triggers the watcher
//!
//! # Invariants
//!
//! 1. Each lifecycle hook runs at most once per instance.
//! 2. Declared defaults are deep-copied per instance.
//! 3. After destruction the model is disposed and writes are ignored.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use ahash::AHashMap;
use bitflags::bitflags;
use indexmap::IndexMap;
use vireo_core::{DependencyTracker, HostObject, NativeFn, ObservableObject, Value, next_uid};

use crate::event::EventEmitter;
use crate::view::View;

/// Method body: receives the instance and the call arguments.
pub type Method = Rc<dyn Fn(&Component, &[Value]) -> Value>;

/// Optional lifecycle hooks. Every method defaults to doing nothing.
pub trait Lifecycle {
    fn on_init(&self, _component: &Component) {}
    fn on_before_mount(&self, _component: &Component, _view: &View) {}
    fn on_after_mounted(&self, _component: &Component) {}
    fn on_enter(&self, _component: &Component) {}
    fn on_destroy(&self, _component: &Component) {}
}

bitflags! {
    /// Lifecycle phases an instance has already passed.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct LifecyclePhase: u8 {
        const INIT = 1 << 0;
        const BEFORE_MOUNT = 1 << 1;
        const AFTER_MOUNTED = 1 << 2;
        const ENTER = 1 << 3;
        const DESTROY = 1 << 4;
    }
}

/// Declared type of a component property, used to coerce static and bound
/// attribute values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyType {
    Any,
    String,
    Number,
    Boolean,
    Object,
    Array,
    Function,
    OneOf(Vec<PropertyType>),
}

impl PropertyType {
    fn accepts(&self, value: &Value) -> bool {
        match self {
            Self::Any => true,
            Self::String => matches!(value, Value::Str(_)),
            Self::Number => matches!(value, Value::Number(_)),
            Self::Boolean => matches!(value, Value::Bool(_)),
            Self::Object => matches!(value, Value::Object(_)),
            Self::Array => matches!(value, Value::Array(_)),
            Self::Function => matches!(value, Value::Function(_)),
            Self::OneOf(types) => types.iter().any(|t| t.accepts(value)),
        }
    }

    /// Coerce `value` for a property of this type. `None` means the write
    /// is skipped.
    #[must_use]
    pub fn coerce(&self, value: Value) -> Option<Value> {
        match self {
            Self::Any => Some(value),
            Self::Boolean => Some(match value.as_str() {
                Some("true") => Value::Bool(true),
                Some("false") => Value::Bool(false),
                _ => Value::Bool(value.is_truthy()),
            }),
            Self::Number => {
                let n = value.to_number();
                (!n.is_nan()).then_some(Value::Number(n))
            }
            Self::String => match &value {
                Value::Object(object) => object
                    .entries()
                    .into_iter()
                    .rev()
                    .find(|(_, v)| v.is_truthy())
                    .map(|(key, _)| Value::from(key)),
                other => Some(Value::from(other.to_display_string())),
            },
            Self::Object | Self::Array | Self::Function | Self::OneOf(_) => {
                self.accepts(&value).then_some(value)
            }
        }
    }
}

#[derive(Clone)]
struct PropertyDecl {
    ty: PropertyType,
    default: Value,
}

/// Blueprint shared by every instance of one component.
#[derive(Clone)]
pub struct ComponentDefinition {
    name: String,
    properties: IndexMap<String, PropertyDecl>,
    methods: AHashMap<String, Method>,
    lifecycle: Option<Rc<dyn Lifecycle>>,
    template: Option<String>,
    emitter: bool,
}

impl fmt::Debug for ComponentDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDefinition")
            .field("name", &self.name)
            .field("properties", &self.properties.keys().collect::<Vec<_>>())
            .field("methods", &self.methods.len())
            .field("template", &self.template)
            .finish()
    }
}

impl ComponentDefinition {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: IndexMap::new(),
            methods: AHashMap::new(),
            lifecycle: None,
            template: None,
            emitter: false,
        }
    }

    #[must_use]
    pub fn property(mut self, name: &str, ty: PropertyType, default: impl Into<Value>) -> Self {
        self.properties.insert(
            name.to_owned(),
            PropertyDecl {
                ty,
                default: default.into(),
            },
        );
        self
    }

    #[must_use]
    pub fn method(
        mut self,
        name: &str,
        body: impl Fn(&Component, &[Value]) -> Value + 'static,
    ) -> Self {
        self.methods.insert(name.to_owned(), Rc::new(body));
        self
    }

    #[must_use]
    pub fn lifecycle(mut self, lifecycle: impl Lifecycle + 'static) -> Self {
        self.lifecycle = Some(Rc::new(lifecycle));
        self
    }

    #[must_use]
    pub fn lifecycle_rc(mut self, lifecycle: Rc<dyn Lifecycle>) -> Self {
        self.lifecycle = Some(lifecycle);
        self
    }

    #[must_use]
    pub fn template(mut self, name: impl Into<String>) -> Self {
        self.template = Some(name.into());
        self
    }

    /// Give instances an embedded [`EventEmitter`].
    #[must_use]
    pub fn with_emitter(mut self) -> Self {
        self.emitter = true;
        self
    }

    /// Add `base`'s declared properties and methods that this definition
    /// lacks.
    #[must_use]
    pub fn extending(mut self, base: &ComponentDefinition) -> Self {
        for (name, decl) in &base.properties {
            if !self.properties.contains_key(name) {
                self.properties.insert(name.clone(), decl.clone());
            }
        }
        for (name, body) in &base.methods {
            self.methods
                .entry(name.clone())
                .or_insert_with(|| Rc::clone(body));
        }
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn template_name(&self) -> Option<&str> {
        self.template.as_deref()
    }

    #[must_use]
    pub fn property_type(&self, name: &str) -> Option<&PropertyType> {
        self.properties.get(name).map(|decl| &decl.ty)
    }

    #[must_use]
    pub fn property_names(&self) -> Vec<&str> {
        self.properties.keys().map(String::as_str).collect()
    }

    #[must_use]
    pub fn has_method(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }
}

struct ComponentInner {
    uid: u64,
    definition: Rc<ComponentDefinition>,
    model: ObservableObject,
    emitter: Option<EventEmitter>,
    phases: Cell<LifecyclePhase>,
    parent: RefCell<Weak<ComponentInner>>,
    me: Weak<ComponentInner>,
}

/// Shared handle to one component instance.
#[derive(Clone)]
pub struct Component {
    inner: Rc<ComponentInner>,
}

/// Non-owning [`Component`] handle.
#[derive(Clone, Default)]
pub struct WeakComponent {
    inner: Weak<ComponentInner>,
}

impl WeakComponent {
    #[must_use]
    pub fn upgrade(&self) -> Option<Component> {
        self.inner.upgrade().map(|inner| Component { inner })
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("uid", &self.inner.uid)
            .field("name", &self.inner.definition.name)
            .field("phases", &self.inner.phases.get())
            .finish()
    }
}

impl PartialEq for Component {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Component {}

impl Component {
    /// New instance with per-instance copies of the declared defaults.
    /// No lifecycle hook runs here.
    #[must_use]
    pub fn new(definition: Rc<ComponentDefinition>) -> Self {
        let model = ObservableObject::new();
        for (name, decl) in &definition.properties {
            model.observe_property(name, decl.default.deep_clone());
        }
        let emitter = definition.emitter.then(EventEmitter::new);
        Self {
            inner: Rc::new_cyclic(|me| ComponentInner {
                uid: next_uid(),
                definition,
                model,
                emitter,
                phases: Cell::new(LifecyclePhase::empty()),
                parent: RefCell::new(Weak::new()),
                me: me.clone(),
            }),
        }
    }

    #[must_use]
    pub fn uid(&self) -> u64 {
        self.inner.uid
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.definition.name
    }

    #[must_use]
    pub fn definition(&self) -> &Rc<ComponentDefinition> {
        &self.inner.definition
    }

    #[must_use]
    pub fn model(&self) -> &ObservableObject {
        &self.inner.model
    }

    #[must_use]
    pub fn emitter(&self) -> Option<&EventEmitter> {
        self.inner.emitter.as_ref()
    }

    #[must_use]
    pub fn downgrade(&self) -> WeakComponent {
        WeakComponent {
            inner: Rc::downgrade(&self.inner),
        }
    }

    #[must_use]
    pub fn parent(&self) -> Option<Component> {
        self.inner
            .parent
            .borrow()
            .upgrade()
            .map(|inner| Self { inner })
    }

    pub fn set_parent(&self, parent: Option<&Component>) {
        *self.inner.parent.borrow_mut() = parent.map_or_else(Weak::new, |p| Rc::downgrade(&p.inner));
    }

    /// Untracked model read.
    #[must_use]
    pub fn get(&self, name: &str) -> Value {
        self.inner.model.get(name)
    }

    /// Raw model write. Ignored after destruction.
    pub fn set(&self, name: &str, value: Value) -> bool {
        if self.is_destroyed() {
            return false;
        }
        self.inner.model.set(name, value)
    }

    /// Write through the declared property type. Undeclared names become
    /// plain reactive properties.
    pub fn set_attribute(&self, name: &str, value: Value) {
        let Some(ty) = self.inner.definition.property_type(name) else {
            self.set(name, value);
            return;
        };
        if value.is_nullish() {
            self.set(name, value);
            return;
        }
        match ty.coerce(value) {
            Some(coerced) => {
                self.set(name, coerced);
            }
            None if matches!(ty, PropertyType::Number | PropertyType::String) => {}
            None => {
                tracing::warn!(
                    target: "vireo::view",
                    component = %self.inner.definition.name,
                    attribute = name,
                    "attribute type mismatch"
                );
            }
        }
    }

    /// Invoke a declared method.
    pub fn call(&self, method: &str, args: &[Value]) -> Value {
        match self.inner.definition.methods.get(method) {
            Some(body) => body(self, args),
            None => {
                tracing::debug!(
                    target: "vireo::view",
                    component = %self.inner.definition.name,
                    method,
                    "call of undeclared method"
                );
                Value::Undefined
            }
        }
    }

    #[must_use]
    pub fn phases(&self) -> LifecyclePhase {
        self.inner.phases.get()
    }

    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.inner.phases.get().contains(LifecyclePhase::DESTROY)
    }

    /// Mark `phase`; returns `false` if it had already been entered.
    fn enter_phase(&self, phase: LifecyclePhase) -> bool {
        let phases = self.inner.phases.get();
        if phases.contains(phase) {
            return false;
        }
        self.inner.phases.set(phases | phase);
        true
    }

    fn with_lifecycle(&self, phase: LifecyclePhase, hook: impl FnOnce(&dyn Lifecycle)) -> bool {
        if !self.enter_phase(phase) {
            return false;
        }
        if let Some(lifecycle) = self.inner.definition.lifecycle.clone() {
            hook(&*lifecycle);
        }
        true
    }

    pub fn init(&self) -> bool {
        self.with_lifecycle(LifecyclePhase::INIT, |l| l.on_init(self))
    }

    pub fn before_mount(&self, view: &View) -> bool {
        self.with_lifecycle(LifecyclePhase::BEFORE_MOUNT, |l| {
            l.on_before_mount(self, view);
        })
    }

    pub fn after_mounted(&self) -> bool {
        self.with_lifecycle(LifecyclePhase::AFTER_MOUNTED, |l| l.on_after_mounted(self))
    }

    pub fn enter(&self) -> bool {
        self.with_lifecycle(LifecyclePhase::ENTER, |l| l.on_enter(self))
    }

    /// Run `on_destroy` and mark the instance destroyed. Returns `false` if
    /// it already was.
    pub(crate) fn begin_destroy(&self) -> bool {
        self.with_lifecycle(LifecyclePhase::DESTROY, |l| l.on_destroy(self))
    }

    pub(crate) fn finish_destroy(&self) {
        *self.inner.parent.borrow_mut() = Weak::new();
        if let Some(emitter) = &self.inner.emitter {
            emitter.clear();
        }
        self.inner.model.dispose();
    }

    /// This instance as an expression scope.
    #[must_use]
    pub fn as_value(&self) -> Value {
        Value::Host(Rc::clone(&self.inner) as Rc<dyn HostObject>)
    }

    /// Recover the handle from a value produced by [`as_value`](Self::as_value).
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        let host = Rc::clone(value.as_host()?);
        host.into_any()
            .downcast::<ComponentInner>()
            .ok()
            .map(|inner| Self { inner })
    }
}

impl HostObject for ComponentInner {
    fn host_id(&self) -> u64 {
        self.uid
    }

    fn type_name(&self) -> &'static str {
        "component"
    }

    fn get_member(&self, name: &str, tracker: Option<&DependencyTracker>) -> Value {
        if name == "$parent" {
            return self
                .parent
                .borrow()
                .upgrade()
                .map_or(Value::Null, |inner| Component { inner }.as_value());
        }
        if self.model.contains_key(name) || !self.definition.methods.contains_key(name) {
            return self.model.get_tracked(name, tracker);
        }
        let Some(body) = self.definition.methods.get(name).cloned() else {
            return Value::Undefined;
        };
        let me = Weak::clone(&self.me);
        Value::Function(NativeFn::bound(self.uid, name, move |args| {
            me.upgrade()
                .map_or(Value::Undefined, |inner| body(&Component { inner }, args))
        }))
    }

    fn set_member(&self, name: &str, value: Value) -> bool {
        if name == "$parent" || self.phases.get().contains(LifecyclePhase::DESTROY) {
            return false;
        }
        self.model.set(name, value);
        true
    }

    fn into_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counting {
        log: Rc<RefCell<Vec<&'static str>>>,
    }

    impl Lifecycle for Counting {
        fn on_init(&self, _: &Component) {
            self.log.borrow_mut().push("init");
        }

        fn on_destroy(&self, _: &Component) {
            self.log.borrow_mut().push("destroy");
        }
    }

    fn counter() -> Rc<ComponentDefinition> {
        Rc::new(
            ComponentDefinition::new("Counter")
                .property("count", PropertyType::Number, 0)
                .property("enabled", PropertyType::Boolean, false)
                .property("label", PropertyType::String, "")
                .property("tags", PropertyType::Array, Value::Array(Default::default()))
                .method("bump", |c, args| {
                    let by = args.first().map_or(1.0, Value::to_number);
                    let next = c.get("count").to_number() + by;
                    c.set("count", Value::from(next));
                    Value::from(next)
                }),
        )
    }

    #[test]
    fn defaults_are_copied_per_instance() {
        let def = counter();
        let a = Component::new(Rc::clone(&def));
        let b = Component::new(def);
        assert!(!a.get("tags").same_value(&b.get("tags")));
        assert_eq!(a.get("count"), Value::from(0));
    }

    #[test]
    fn set_attribute_coerces_by_declared_type() {
        let c = Component::new(counter());
        c.set_attribute("count", Value::from("42"));
        c.set_attribute("enabled", Value::from("false"));
        c.set_attribute("label", Value::from(7));
        assert_eq!(c.get("count"), Value::from(42));
        assert_eq!(c.get("enabled"), Value::Bool(false));
        assert_eq!(c.get("label"), Value::from("7"));

        c.set_attribute("count", Value::from("abc"));
        assert_eq!(c.get("count"), Value::from(42));
        c.set_attribute("tags", Value::from("nope"));
        assert!(c.get("tags").as_array().is_some());

        let choice = ObservableObject::from_entries([("a", true), ("b", false), ("c", true)]);
        c.set_attribute("label", Value::Object(choice));
        assert_eq!(c.get("label"), Value::from("c"));

        c.set_attribute("extra", Value::from(1));
        assert_eq!(c.get("extra"), Value::from(1));
    }

    #[test]
    fn members_resolve_parent_model_then_methods() {
        let parent = Component::new(counter());
        let child = Component::new(counter());
        child.set_parent(Some(&parent));
        let scope = child.as_value();

        assert_eq!(scope.get_member("$parent", None).as_host().map(|h| h.host_id()), Some(parent.uid()));
        let bump = scope.get_member("bump", None);
        assert_eq!(bump.as_function().map(|f| f.call(&[Value::from(2)])), Some(Value::from(2)));
        assert_eq!(child.get("count"), Value::from(2));

        let tracker = DependencyTracker::new();
        assert_eq!(scope.get_member("missing", Some(&tracker)), Value::Undefined);
        assert!(tracker.contains(child.model().hub().id(), "missing"));
    }

    #[test]
    fn lifecycle_hooks_run_once() {
        let counting = Counting::default();
        let log = Rc::clone(&counting.log);
        let def = Rc::new(ComponentDefinition::new("X").lifecycle(counting));
        let c = Component::new(def);
        assert!(c.init());
        assert!(!c.init());
        assert!(c.begin_destroy());
        assert!(!c.begin_destroy());
        c.finish_destroy();
        assert!(c.is_destroyed());
        assert!(!c.set("x", Value::from(1)));
        assert_eq!(*log.borrow(), vec!["init", "destroy"]);
    }

    #[test]
    fn value_round_trip() {
        let c = Component::new(counter());
        assert_eq!(Component::from_value(&c.as_value()), Some(c.clone()));
        assert_eq!(Component::from_value(&Value::from(1)), None);
    }
}
