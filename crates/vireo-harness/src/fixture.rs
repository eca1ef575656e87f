#![forbid(unsafe_code)]

//! A mounted root component ready for scenario tests.

use std::rc::Rc;

use vireo_core::Value;
use vireo_view::{
    BindingManager, Component, ComponentDefinition, Registry, VNode, View, VisualNode,
};

use crate::snapshot::tree_snapshot;

/// Template name the root definition is registered under.
pub const ROOT_TEMPLATE: &str = "harness-root";

/// Builder for a [`Harness`].
pub struct HarnessBuilder {
    registry: Registry,
    root: ComponentDefinition,
    template: VNode,
}

impl HarnessBuilder {
    /// Register an extra component definition.
    #[must_use]
    pub fn component(self, definition: ComponentDefinition) -> Self {
        self.registry.register_component(definition);
        self
    }

    #[must_use]
    pub fn template(self, name: &str, root: VNode) -> Self {
        self.registry.register_template(name, root);
        self
    }

    /// Direct access for directives and anything else the builder lacks.
    #[must_use]
    pub fn configure(self, f: impl FnOnce(&Registry)) -> Self {
        f(&self.registry);
        self
    }

    /// Mount the root. Panics if the root cannot be created.
    #[must_use]
    pub fn mount(self) -> Harness {
        let name = self.root.name().to_owned();
        self.registry.register_template(ROOT_TEMPLATE, self.template);
        self.registry
            .register_component(self.root.template(ROOT_TEMPLATE));
        let manager = BindingManager::new(Rc::new(self.registry));
        let (root, view) = manager
            .create_root(&name)
            .unwrap_or_else(|error| panic!("harness root '{name}': {error}"));
        Harness {
            manager,
            root,
            view,
        }
    }
}

/// Root component, its view, and the manager driving both.
pub struct Harness {
    pub manager: BindingManager,
    pub root: Component,
    pub view: Rc<View>,
}

impl Harness {
    /// Start from a root definition and its template, with built-in
    /// directives registered.
    #[must_use]
    pub fn builder(root: ComponentDefinition, template: VNode) -> HarnessBuilder {
        HarnessBuilder {
            registry: Registry::with_builtins(),
            root,
            template,
        }
    }

    /// Run scheduled watcher callbacks until none remain.
    pub fn settle(&self) {
        self.manager.scheduler().run_until_idle();
    }

    /// Write a root property and settle.
    pub fn set(&self, name: &str, value: impl Into<Value>) {
        self.root.set(name, value.into());
        self.settle();
    }

    #[must_use]
    pub fn visual(&self) -> &VisualNode {
        &self.view.visual
    }

    /// Top-level children of the root visual, anchors excluded.
    #[must_use]
    pub fn rows(&self) -> Vec<VisualNode> {
        self.view
            .visual
            .children()
            .into_iter()
            .filter(|node| !node.is_anchor())
            .collect()
    }

    #[must_use]
    pub fn tree(&self) -> String {
        tree_snapshot(&self.view.visual)
    }

    /// Destroy the root and everything mounted under it.
    pub fn teardown(&self) {
        self.manager.destroy_component(&self.root);
    }
}
