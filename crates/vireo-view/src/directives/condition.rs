#![forbid(unsafe_code)]

//! `:if="expr"`: presence of a subtree.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use vireo_core::Value;
use vireo_runtime::{WatchHandle, WatchOptions};

use crate::binding::{BindingManager, WeakBindingManager};
use crate::component::Component;
use crate::directive::{BindingContext, Directive, DirectiveHandle, DirectiveScope};
use crate::view::View;
use crate::visual::VisualNode;

struct Shown {
    visual: VisualNode,
    directives: Vec<DirectiveHandle>,
}

struct Bound {
    manager: WeakBindingManager,
    component: Component,
    anchor: Rc<View>,
    parent: VisualNode,
}

/// While the expression is truthy the anchor is replaced by a freshly built
/// subtree; when it turns falsy the subtree's directives are removed, the
/// anchor goes back to the same index, and the subtree is released.
pub struct ConditionDirective {
    me: Weak<Self>,
    bound: RefCell<Option<Bound>>,
    shown: RefCell<Option<Shown>>,
    watch: RefCell<Option<WatchHandle>>,
}

impl ConditionDirective {
    #[must_use]
    pub fn new() -> Rc<Self> {
        Rc::new_cyclic(|me| Self {
            me: me.clone(),
            bound: RefCell::new(None),
            shown: RefCell::new(None),
            watch: RefCell::new(None),
        })
    }

    fn on_update(&self, visible: bool) {
        let Some((manager, component, anchor, parent)) = self.bound.borrow().as_ref().and_then(|b| {
            b.manager
                .upgrade()
                .map(|m| (m, b.component.clone(), Rc::clone(&b.anchor), b.parent.clone()))
        }) else {
            return;
        };
        let showing = self.shown.borrow().is_some();
        if visible && !showing {
            let view = manager.create_view(&anchor.node);
            parent.replace_child(&anchor.visual, std::slice::from_ref(&view.visual));
            let directives = manager.create_binding(&component, &view, &BindingContext::new());
            *self.shown.borrow_mut() = Some(Shown {
                visual: view.visual.clone(),
                directives,
            });
        } else if !visible {
            self.hide(&manager, &anchor.visual, &parent);
        }
    }

    fn hide(&self, manager: &BindingManager, anchor: &VisualNode, parent: &VisualNode) {
        let Some(shown) = self.shown.borrow_mut().take() else {
            return;
        };
        let index = parent.index_of(&shown.visual);
        for handle in &shown.directives {
            manager.remove_directive(handle);
        }
        parent.add_child(anchor, index);
        shown.visual.release(true);
    }
}

impl Directive for ConditionDirective {
    fn on_init(&self, expression: &str, scope: &DirectiveScope<'_>) {
        let Some(parent) = scope.view.visual.parent() else {
            tracing::error!(target: "vireo::directive", expression, "`:if` anchor has no parent");
            return;
        };
        *self.bound.borrow_mut() = Some(Bound {
            manager: scope.manager.downgrade(),
            component: scope.component.clone(),
            anchor: Rc::clone(scope.view),
            parent,
        });
        let me = Weak::clone(&self.me);
        let handle = scope.manager.watchers().watch(
            &scope.component.as_value(),
            expression,
            WatchOptions::default().deep().immediate(),
            move |value: &Value, _: &Value| {
                if let Some(me) = me.upgrade() {
                    me.on_update(value.is_truthy());
                }
            },
        );
        *self.watch.borrow_mut() = Some(handle);
    }

    fn on_destroy(&self) {
        let bound = self.bound.borrow_mut().take();
        if let Some(bound) = bound
            && let Some(manager) = bound.manager.upgrade()
        {
            self.hide(&manager, &bound.anchor.visual, &bound.parent);
        }
        if let Some(handle) = self.watch.borrow_mut().take() {
            handle.unwatch();
        }
    }
}
