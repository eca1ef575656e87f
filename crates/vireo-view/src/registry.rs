#![forbid(unsafe_code)]

//! Name tables for directives, components, and templates.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;
use indexmap::IndexMap;

use crate::component::ComponentDefinition;
use crate::directive::Directive;
use crate::error::{Result, ViewError};
use crate::vnode::VNode;

/// Builds one directive instance per binding site.
pub type DirectiveFactory = Rc<dyn Fn() -> Rc<dyn Directive>>;

/// A registered directive.
#[derive(Clone)]
pub struct DirectiveDef {
    pub factory: DirectiveFactory,
    pub terminal: bool,
    pub priority: i32,
}

impl fmt::Debug for DirectiveDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectiveDef")
            .field("terminal", &self.terminal)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

impl DirectiveDef {
    pub fn new<D: Directive + 'static>(factory: impl Fn() -> Rc<D> + 'static) -> Self {
        Self {
            factory: Rc::new(move || factory() as Rc<dyn Directive>),
            terminal: false,
            priority: 0,
        }
    }

    /// Claim the whole node, ranked by `priority` against other terminals.
    #[must_use]
    pub fn terminal(mut self, priority: i32) -> Self {
        self.terminal = true;
        self.priority = priority;
        self
    }
}

#[derive(Default)]
pub struct Registry {
    directives: RefCell<AHashMap<String, DirectiveDef>>,
    /// Terminal names, highest priority first.
    terminals: RefCell<Vec<(i32, String)>>,
    components: RefCell<AHashMap<String, Rc<ComponentDefinition>>>,
    templates: RefCell<AHashMap<String, VNode>>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("directives", &self.directives.borrow().len())
            .field("components", &self.components.borrow().len())
            .field("templates", &self.templates.borrow().len())
            .finish()
    }
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with `:if`, `:for`, `:include`, `:slot`, `:slot-to`,
    /// `:ref` and `@ref` installed.
    #[must_use]
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        crate::directives::register_builtins(&registry);
        registry
    }

    pub fn register_directive(&self, name: &str, def: DirectiveDef) {
        let terminal = def.terminal.then_some(def.priority);
        if self
            .directives
            .borrow_mut()
            .insert(name.to_owned(), def)
            .is_some()
        {
            tracing::warn!(target: "vireo::directive", name, "directive overridden");
        }
        let mut terminals = self.terminals.borrow_mut();
        terminals.retain(|(_, n)| n != name);
        if let Some(priority) = terminal {
            terminals.push((priority, name.to_owned()));
            terminals.sort_by(|a, b| b.0.cmp(&a.0));
        }
    }

    #[must_use]
    pub fn directive(&self, name: &str) -> Option<DirectiveDef> {
        self.directives.borrow().get(name).cloned()
    }

    #[must_use]
    pub fn has_directive(&self, name: &str) -> bool {
        self.directives.borrow().contains_key(name)
    }

    /// The highest-priority terminal directive among `attrs`.
    #[must_use]
    pub fn highest_terminal(&self, attrs: &IndexMap<String, String>) -> Option<String> {
        self.terminals
            .borrow()
            .iter()
            .find(|(_, name)| attrs.contains_key(name))
            .map(|(_, name)| name.clone())
    }

    pub fn register_component(&self, def: ComponentDefinition) {
        let name = def.name().to_owned();
        if self
            .components
            .borrow_mut()
            .insert(name.clone(), Rc::new(def))
            .is_some()
        {
            tracing::warn!(target: "vireo::view", name, "component overridden");
        }
    }

    /// Register `def` with the declared properties and methods of the
    /// registered component `base` merged underneath.
    pub fn register_component_extending(&self, def: ComponentDefinition, base: &str) {
        match self.component(base) {
            Some(base) => self.register_component(def.extending(&base)),
            None => {
                tracing::warn!(target: "vireo::view", component = def.name(), base, "base component not registered");
                self.register_component(def);
            }
        }
    }

    #[must_use]
    pub fn component(&self, name: &str) -> Option<Rc<ComponentDefinition>> {
        self.components.borrow().get(name).cloned()
    }

    pub fn try_component(&self, name: &str) -> Result<Rc<ComponentDefinition>> {
        self.component(name).ok_or_else(|| ViewError::UnknownComponent {
            name: name.to_owned(),
        })
    }

    pub fn register_template(&self, name: &str, template: VNode) {
        if self
            .templates
            .borrow_mut()
            .insert(name.to_owned(), template)
            .is_some()
        {
            tracing::warn!(target: "vireo::view", name, "template overridden");
        }
    }

    #[must_use]
    pub fn template(&self, name: &str) -> Option<VNode> {
        self.templates.borrow().get(name).cloned()
    }

    pub fn try_template(&self, name: &str) -> Result<VNode> {
        self.template(name).ok_or_else(|| ViewError::UnknownTemplate {
            name: name.to_owned(),
        })
    }
}
