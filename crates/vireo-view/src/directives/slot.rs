#![forbid(unsafe_code)]

//! `:slot-to="name"` stashes a view; `:slot="name"` splices stashed
//! visuals in place of its placeholder.

use std::cell::RefCell;
use std::rc::Rc;

use crate::directive::{Directive, DirectiveScope};
use crate::visual::VisualNode;

#[derive(Default)]
pub struct SlotToDirective;

impl SlotToDirective {
    #[must_use]
    pub fn new() -> Rc<Self> {
        Rc::new(Self)
    }
}

impl Directive for SlotToDirective {
    fn on_init(&self, name: &str, scope: &DirectiveScope<'_>) {
        scope.context.stash(name, Rc::clone(scope.view));
    }
}

#[derive(Default)]
pub struct SlotDirective {
    spliced: RefCell<Vec<VisualNode>>,
}

impl SlotDirective {
    #[must_use]
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }
}

impl Directive for SlotDirective {
    fn on_init(&self, name: &str, scope: &DirectiveScope<'_>) {
        if scope.view.is_component() {
            tracing::error!(target: "vireo::directive", name, "a component cannot be a `:slot` placeholder");
            return;
        }
        // No stash under this name leaves the placeholder as it is.
        let Some(views) = scope.context.slot(name) else {
            return;
        };
        let placeholder = &scope.view.visual;
        let Some(parent) = placeholder.parent() else {
            tracing::error!(target: "vireo::directive", name, "`:slot` placeholder has no parent");
            return;
        };
        let visuals: Vec<VisualNode> = views.iter().map(|view| view.visual.clone()).collect();
        parent.replace_child(placeholder, &visuals);
        *self.spliced.borrow_mut() = visuals;
    }

    fn on_destroy(&self) {
        for visual in self.spliced.take() {
            visual.release(true);
        }
    }
}
