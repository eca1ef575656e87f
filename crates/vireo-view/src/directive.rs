#![forbid(unsafe_code)]

//! The directive contract and the per-pass binding context.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::binding::BindingManager;
use crate::component::Component;
use crate::view::View;

/// A stateful handler attached to one `(component, view)` pair.
///
/// `on_init` runs once when the binding is created and `on_destroy` once
/// when it is removed. Implementations keep their state behind `RefCell`s
/// and must not hold a borrow across calls back into the manager.
pub trait Directive {
    fn on_init(&self, _expression: &str, _scope: &DirectiveScope<'_>) {}

    fn on_destroy(&self) {}
}

/// Everything a directive sees while it initializes.
pub struct DirectiveScope<'a> {
    pub manager: &'a BindingManager,
    pub component: &'a Component,
    pub view: &'a Rc<View>,
    pub context: &'a Rc<BindingContext>,
}

/// State shared by one binding pass: views stashed by `:slot-to` for the
/// matching `:slot` placeholders.
#[derive(Debug, Default)]
pub struct BindingContext {
    slots: RefCell<IndexMap<String, Vec<Rc<View>>>>,
}

impl BindingContext {
    #[must_use]
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn stash(&self, name: &str, view: Rc<View>) {
        self.slots
            .borrow_mut()
            .entry(name.to_owned())
            .or_default()
            .push(view);
    }

    #[must_use]
    pub fn slot(&self, name: &str) -> Option<Vec<Rc<View>>> {
        self.slots.borrow().get(name).cloned()
    }
}

/// One registered directive instance.
#[derive(Clone)]
pub struct DirectiveHandle {
    pub(crate) id: u64,
    pub(crate) owner: u64,
    pub(crate) label: Rc<str>,
    pub(crate) directive: Rc<dyn Directive>,
}

impl fmt::Debug for DirectiveHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectiveHandle")
            .field("id", &self.id)
            .field("owner", &self.owner)
            .field("label", &self.label)
            .finish()
    }
}

impl DirectiveHandle {
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Uid of the component this directive is recorded under.
    #[must_use]
    pub fn owner(&self) -> u64 {
        self.owner
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }
}

/// Runs a closure once on destroy.
pub struct Teardown {
    action: RefCell<Option<Box<dyn FnOnce()>>>,
}

impl Teardown {
    pub fn new(action: impl FnOnce() + 'static) -> Self {
        Self {
            action: RefCell::new(Some(Box::new(action))),
        }
    }
}

impl Directive for Teardown {
    fn on_destroy(&self) {
        let action = self.action.borrow_mut().take();
        if let Some(action) = action {
            action();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn teardown_runs_once() {
        let count = Rc::new(Cell::new(0));
        let c = Rc::clone(&count);
        let teardown = Teardown::new(move || c.set(c.get() + 1));
        teardown.on_destroy();
        teardown.on_destroy();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn context_keeps_stash_order() {
        use crate::visual::VisualNode;
        use crate::view::ViewInstance;
        use crate::vnode::VNode;

        let context = BindingContext::new();
        for tag in ["a", "b"] {
            let visual = VisualNode::new(tag);
            context.stash(
                "body",
                Rc::new(View {
                    node: VNode::element(tag),
                    instance: ViewInstance::Visual(visual.clone()),
                    visual,
                    directives: IndexMap::new(),
                    children: Vec::new(),
                    nested: Vec::new(),
                }),
            );
        }
        let tags: Vec<String> = context
            .slot("body")
            .unwrap_or_default()
            .iter()
            .map(|v| v.visual.tag().to_owned())
            .collect();
        assert_eq!(tags, vec!["a", "b"]);
        assert!(context.slot("other").is_none());
    }
}
