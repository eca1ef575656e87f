#![forbid(unsafe_code)]

//! Binding manager: attaches directives to built views and tears them down.
//!
//! Every directive created for a component is recorded under that
//! component's uid. Removal is idempotent through an active set keyed by
//! directive id, so a directive torn down by its owner (a structural
//! directive dropping its subtree) is skipped when the component's whole
//! list is removed later.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use ahash::{AHashMap, AHashSet};
use vireo_core::{IdentityKey, Value, next_uid};
use vireo_expr::{EvalContext, compile_setter, compile_statement, has_interpolation};
use vireo_runtime::{Scheduler, WatchOptions, WatcherRegistry};

use crate::component::Component;
use crate::config::BindingConfig;
use crate::directive::{BindingContext, Directive, DirectiveHandle, DirectiveScope, Teardown};
use crate::error::{Result, ViewError};
use crate::event::EventHandler;
use crate::registry::Registry;
use crate::view::{self, View};
use crate::vnode::VNode;
use crate::weak_table::WeakTable;

struct ManagerInner {
    registry: Rc<Registry>,
    watchers: WatcherRegistry,
    config: BindingConfig,
    global: RefCell<Value>,
    directives: RefCell<AHashMap<u64, Vec<DirectiveHandle>>>,
    active: RefCell<AHashSet<u64>>,
    refs: RefCell<WeakTable<Value>>,
}

#[derive(Clone)]
pub struct BindingManager {
    inner: Rc<ManagerInner>,
}

/// Non-owning manager handle for closures stored inside bindings.
#[derive(Clone)]
pub struct WeakBindingManager {
    inner: Weak<ManagerInner>,
}

impl WeakBindingManager {
    #[must_use]
    pub fn upgrade(&self) -> Option<BindingManager> {
        self.inner.upgrade().map(|inner| BindingManager { inner })
    }
}

impl fmt::Debug for BindingManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingManager")
            .field("components", &self.inner.directives.borrow().len())
            .field("active", &self.inner.active.borrow().len())
            .field("watchers", &self.inner.watchers.watcher_count())
            .finish()
    }
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

impl BindingManager {
    #[must_use]
    pub fn new(registry: Rc<Registry>) -> Self {
        Self::with_parts(registry, WatcherRegistry::default(), BindingConfig::default())
    }

    #[must_use]
    pub fn with_parts(registry: Rc<Registry>, watchers: WatcherRegistry, config: BindingConfig) -> Self {
        let global = watchers.global();
        Self {
            inner: Rc::new(ManagerInner {
                registry,
                watchers,
                config,
                global: RefCell::new(global),
                directives: RefCell::new(AHashMap::new()),
                active: RefCell::new(AHashSet::new()),
                refs: RefCell::new(WeakTable::new()),
            }),
        }
    }

    #[must_use]
    pub fn downgrade(&self) -> WeakBindingManager {
        WeakBindingManager {
            inner: Rc::downgrade(&self.inner),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &Rc<Registry> {
        &self.inner.registry
    }

    #[must_use]
    pub fn watchers(&self) -> &WatcherRegistry {
        &self.inner.watchers
    }

    #[must_use]
    pub fn scheduler(&self) -> &Rc<Scheduler> {
        self.inner.watchers.scheduler()
    }

    #[must_use]
    pub fn config(&self) -> BindingConfig {
        self.inner.config
    }

    /// Value bound to `$global` in handlers and watched expressions.
    #[must_use]
    pub fn global(&self) -> Value {
        self.inner.global.borrow().clone()
    }

    pub fn set_global(&self, global: Value) {
        self.inner.watchers.set_global(global.clone());
        *self.inner.global.borrow_mut() = global;
    }

    #[must_use]
    pub fn create_view(&self, node: &VNode) -> Rc<View> {
        view::create_view(&self.inner.registry, node)
    }

    /// Instantiate a registered component and run its `on_init`.
    pub fn create_component(&self, name: &str) -> Result<Component> {
        let definition = self.inner.registry.try_component(name)?;
        let component = Component::new(definition);
        component.init();
        Ok(component)
    }

    /// Create component `name`, build its template, and mount it.
    pub fn create_root(&self, name: &str) -> Result<(Component, Rc<View>)> {
        let component = self.create_component(name)?;
        let template = component
            .definition()
            .template_name()
            .map(str::to_owned)
            .unwrap_or_default();
        let node = self.inner.registry.try_template(&template)?;
        let view = self.create_view(&node);
        self.mount(&component, &view);
        tracing::debug!(target: "vireo::binding", component = name, uid = component.uid(), "root mounted");
        Ok((component, view))
    }

    /// Bind `view` against `component` between its mount hooks.
    pub fn mount(&self, component: &Component, view: &Rc<View>) -> Vec<DirectiveHandle> {
        component.before_mount(view);
        let handles = self.create_binding(component, view, &BindingContext::new());
        component.after_mounted();
        handles
    }

    pub fn enter(&self, component: &Component) -> bool {
        component.enter()
    }

    /// Attach every binding of `view` and its subtree to `component`.
    /// Returns the directives this call created, nested ones included.
    pub fn create_binding(
        &self,
        component: &Component,
        view: &Rc<View>,
        context: &Rc<BindingContext>,
    ) -> Vec<DirectiveHandle> {
        let watermark = next_uid();
        for (name, expression) in &view.directives {
            if let Some(def) = self.inner.registry.directive(name) {
                self.add_directive(component, view, context, name, expression, (def.factory)());
            } else if let Some(property) = named(name, "::") {
                self.bind_attribute(component, view, context, name, property, expression, true);
            } else if let Some(event) = named(name, "@") {
                self.bind_event(component, view, context, name, event, expression);
            } else if let Some(property) = named(name, ":") {
                self.bind_attribute(component, view, context, name, property, expression, false);
            } else if has_interpolation(expression) && !name.starts_with([':', '@']) {
                self.bind_attribute(component, view, context, name, name, expression, false);
            } else if self.inner.config.warn_unknown_attributes {
                let error = ViewError::UnknownDirective { name: name.clone() };
                tracing::warn!(target: "vireo::binding", %error, tag = %view.node.tag, "unknown directive");
            }
        }

        if let Some(inner) = view.component() {
            self.bind_component(component, inner, view);
        } else {
            for child in &view.children {
                self.create_binding(component, child, context);
            }
        }

        self.inner
            .directives
            .borrow()
            .get(&component.uid())
            .map(|list| list.iter().filter(|h| h.id > watermark).cloned().collect())
            .unwrap_or_default()
    }

    /// Record `directive` under `component` and initialize it.
    pub fn add_directive(
        &self,
        component: &Component,
        view: &Rc<View>,
        context: &Rc<BindingContext>,
        label: &str,
        expression: &str,
        directive: Rc<dyn Directive>,
    ) -> DirectiveHandle {
        let handle = DirectiveHandle {
            id: next_uid(),
            owner: component.uid(),
            label: Rc::from(label),
            directive,
        };
        self.inner
            .directives
            .borrow_mut()
            .entry(component.uid())
            .or_default()
            .push(handle.clone());
        self.inner.active.borrow_mut().insert(handle.id);
        tracing::trace!(target: "vireo::binding", label, id = handle.id, owner = handle.owner, "directive added");
        handle.directive.on_init(
            expression,
            &DirectiveScope {
                manager: self,
                component,
                view,
                context,
            },
        );
        handle
    }

    /// Destroy one directive. A second call is a no-op.
    pub fn remove_directive(&self, handle: &DirectiveHandle) -> bool {
        if !self.inner.active.borrow_mut().remove(&handle.id) {
            return false;
        }
        if let Some(list) = self.inner.directives.borrow_mut().get_mut(&handle.owner) {
            list.retain(|h| h.id != handle.id);
        }
        tracing::trace!(target: "vireo::binding", label = %handle.label, id = handle.id, "directive removed");
        handle.directive.on_destroy();
        true
    }

    /// Destroy every directive recorded under `component`.
    pub fn remove_binding(&self, component: &Component) -> usize {
        let handles = self
            .inner
            .directives
            .borrow_mut()
            .remove(&component.uid())
            .unwrap_or_default();
        handles.iter().filter(|h| self.remove_directive(h)).count()
    }

    /// Tear a component down: `on_destroy`, directives, watchers, refs,
    /// then its model. Repeated calls do nothing.
    pub fn destroy_component(&self, component: &Component) {
        if !component.begin_destroy() {
            return;
        }
        let directives = self.remove_binding(component);
        let watchers = self.inner.watchers.remove_watchers(component.uid());
        self.inner
            .refs
            .borrow_mut()
            .clear(&IdentityKey::handle(component.uid()));
        component.finish_destroy();
        tracing::debug!(
            target: "vireo::binding",
            component = component.name(),
            uid = component.uid(),
            directives,
            watchers,
            "component destroyed"
        );
    }

    #[must_use]
    pub fn directive_count(&self, component: &Component) -> usize {
        self.inner
            .directives
            .borrow()
            .get(&component.uid())
            .map_or(0, Vec::len)
    }

    #[must_use]
    pub fn is_active(&self, handle: &DirectiveHandle) -> bool {
        self.inner.active.borrow().contains(&handle.id)
    }

    /// The instance registered by `:ref="name"` on `component`.
    #[must_use]
    pub fn reference(&self, component: &Component, name: &str) -> Option<Value> {
        self.inner
            .refs
            .borrow()
            .get(&ref_key(name), &IdentityKey::handle(component.uid()))
            .cloned()
    }

    pub fn set_reference(&self, component: &Component, name: &str, instance: Value) {
        self.inner
            .refs
            .borrow_mut()
            .set(ref_key(name), IdentityKey::handle(component.uid()), instance);
    }

    pub fn remove_reference(&self, component: &Component, name: &str) -> Option<Value> {
        self.inner
            .refs
            .borrow_mut()
            .remove(&ref_key(name), &IdentityKey::handle(component.uid()))
    }

    #[allow(clippy::too_many_arguments)]
    fn bind_attribute(
        &self,
        component: &Component,
        view: &Rc<View>,
        context: &Rc<BindingContext>,
        label: &str,
        property: &str,
        expression: &str,
        two_way: bool,
    ) {
        let watchers = &self.inner.watchers;
        let last = Rc::new(RefCell::new(Value::Undefined));
        let options = WatchOptions {
            deep: self.inner.config.deep_attribute_bindings,
            immediate: true,
        };

        let (target, seen, name) = (view.instance.clone(), Rc::clone(&last), property.to_owned());
        let forward = watchers.watch(&component.as_value(), expression, options, move |new, _| {
            *seen.borrow_mut() = new.clone();
            target.set_attribute(&name, new.clone());
        });

        let backward = two_way.then(|| {
            let owner = component.downgrade();
            let expression = expression.to_owned();
            watchers.watch(
                &view.instance.as_value(),
                property,
                WatchOptions::default(),
                move |new, _| {
                    if new.same_value(&last.borrow()) {
                        return;
                    }
                    *last.borrow_mut() = new.clone();
                    if let Some(component) = owner.upgrade() {
                        write_back(&component, &expression, new.clone());
                    }
                },
            )
        });

        let teardown = Teardown::new(move || {
            forward.unwatch();
            if let Some(backward) = backward {
                backward.unwatch();
            }
        });
        self.add_directive(component, view, context, label, expression, Rc::new(teardown));
    }

    fn bind_event(
        &self,
        component: &Component,
        view: &Rc<View>,
        context: &Rc<BindingContext>,
        label: &str,
        event: &str,
        expression: &str,
    ) {
        let statement = compile_statement(expression);
        let owner = component.downgrade();
        let manager = self.downgrade();
        let element = view.instance.as_value();
        let handler: EventHandler = Rc::new(move |payload: &Value| {
            let Some(component) = owner.upgrade() else {
                return;
            };
            let global = manager
                .upgrade()
                .map_or(Value::Undefined, |manager| manager.global());
            let ctx = EvalContext::new(component.as_value())
                .with_event(payload.clone())
                .with_element(element.clone())
                .with_global(global);
            statement.call(&ctx);
        });

        let Some(id) = view.instance.add_listener(event, handler) else {
            tracing::error!(
                target: "vireo::binding",
                event,
                tag = %view.node.tag,
                "event target has no event capability"
            );
            return;
        };
        let (target, event_name) = (view.instance.clone(), event.to_owned());
        let teardown = Teardown::new(move || {
            target.remove_listener(&event_name, id);
        });
        self.add_directive(component, view, context, label, expression, Rc::new(teardown));
    }

    /// Bind a nested component: its tag's children against `outer`, its
    /// template against itself between the mount hooks.
    fn bind_component(&self, outer: &Component, inner: &Component, view: &Rc<View>) {
        let context = BindingContext::new();
        for nested in &view.nested {
            self.create_binding(outer, nested, &context);
        }
        inner.set_parent(Some(outer));
        inner.before_mount(view);
        for child in &view.children {
            self.create_binding(inner, child, &context);
        }
        inner.after_mounted();

        let manager = self.downgrade();
        let (component, visual) = (inner.clone(), view.visual.clone());
        let teardown = Teardown::new(move || {
            if let Some(manager) = manager.upgrade() {
                manager.destroy_component(&component);
            }
            visual.release(true);
        });
        let label = format!("component:{}", inner.name());
        self.add_directive(outer, view, &context, &label, "", Rc::new(teardown));
    }
}

/// `name` without `prefix`, when something is left.
fn named<'a>(name: &'a str, prefix: &str) -> Option<&'a str> {
    name
        .strip_prefix(prefix)
        .filter(|rest| !rest.is_empty() && !rest.starts_with(':'))
}

fn ref_key(name: &str) -> IdentityKey {
    IdentityKey::of(&Value::from(name))
}

/// Push a value from a two-way binding back into component state.
fn write_back(component: &Component, expression: &str, value: Value) {
    let expression = expression.trim();
    if is_identifier(expression) {
        component.set_attribute(expression, value);
        return;
    }
    match compile_setter(expression) {
        Some(setter) => {
            setter.assign(&EvalContext::new(component.as_value()), value);
        }
        None => tracing::warn!(
            target: "vireo::binding",
            expression,
            "two-way binding target is not assignable"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{ComponentDefinition, PropertyType};
    use crate::visual::VisualNode;

    fn manager() -> BindingManager {
        let registry = Registry::with_builtins();
        registry.register_template(
            "main",
            VNode::element("root").child(
                VNode::element("label")
                    .attr(":text", "title")
                    .attr("::value", "draft"),
            ),
        );
        registry.register_component(
            ComponentDefinition::new("Main")
                .property("title", PropertyType::String, "hello")
                .property("draft", PropertyType::String, "")
                .template("main"),
        );
        BindingManager::new(Rc::new(registry))
    }

    fn label(view: &Rc<View>) -> VisualNode {
        view.children[0].visual.clone()
    }

    #[test]
    fn identifier_detection() {
        assert!(is_identifier("value"));
        assert!(is_identifier("$index"));
        assert!(!is_identifier("a.b"));
        assert!(!is_identifier("1a"));
        assert!(!is_identifier(""));
    }

    #[test]
    fn one_way_binding_applies_and_follows() {
        let manager = manager();
        let (root, view) = manager.create_root("Main").unwrap();
        let label = label(&view);
        assert_eq!(label.property("text"), Value::from("hello"));

        root.set("title", Value::from("bye"));
        manager.scheduler().flush();
        assert_eq!(label.property("text"), Value::from("bye"));
    }

    #[test]
    fn two_way_binding_writes_back() {
        let manager = manager();
        let (root, view) = manager.create_root("Main").unwrap();
        let label = label(&view);

        label.set_property("value", Value::from("typed"));
        manager.scheduler().run_until_idle();
        assert_eq!(root.get("draft"), Value::from("typed"));
        assert_eq!(label.property("value"), Value::from("typed"));
    }

    #[test]
    fn destroy_component_removes_everything_once() {
        let manager = manager();
        let (root, _view) = manager.create_root("Main").unwrap();
        assert_eq!(manager.directive_count(&root), 2);
        assert!(manager.watchers().watchers_for(root.uid()) > 0);

        manager.destroy_component(&root);
        assert_eq!(manager.directive_count(&root), 0);
        assert_eq!(manager.watchers().watchers_for(root.uid()), 0);
        assert!(root.is_destroyed());
        manager.destroy_component(&root);
    }

    #[test]
    fn remove_directive_is_idempotent() {
        let manager = manager();
        let (root, view) = manager.create_root("Main").unwrap();
        let handles = manager.create_binding(&root, &view.children[0], &BindingContext::new());
        assert_eq!(handles.len(), 2);
        assert!(manager.remove_directive(&handles[0]));
        assert!(!manager.remove_directive(&handles[0]));
        assert!(!manager.is_active(&handles[0]));
        assert_eq!(manager.directive_count(&root), 3);
    }

    #[test]
    fn missing_root_is_an_error() {
        let manager = manager();
        assert!(manager.create_root("Nope").is_err());
    }
}
