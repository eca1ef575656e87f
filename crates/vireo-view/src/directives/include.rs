#![forbid(unsafe_code)]

//! `:include="template"`: swap the placeholder for a registered template.

use std::cell::RefCell;
use std::rc::Rc;

use crate::binding::WeakBindingManager;
use crate::directive::{BindingContext, Directive, DirectiveHandle, DirectiveScope};
use crate::visual::VisualNode;

struct Included {
    manager: WeakBindingManager,
    placeholder: VisualNode,
    parent: VisualNode,
    visual: VisualNode,
    directives: Vec<DirectiveHandle>,
}

#[derive(Default)]
pub struct IncludeDirective {
    included: RefCell<Option<Included>>,
}

impl IncludeDirective {
    #[must_use]
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }
}

impl Directive for IncludeDirective {
    fn on_init(&self, name: &str, scope: &DirectiveScope<'_>) {
        let template = match scope.manager.registry().try_template(name) {
            Ok(template) => template,
            Err(error) => {
                tracing::warn!(target: "vireo::directive", %error, "`:include` skipped");
                return;
            }
        };
        let placeholder = scope.view.visual.clone();
        let Some(parent) = placeholder.parent() else {
            tracing::error!(target: "vireo::directive", name, "`:include` placeholder has no parent");
            return;
        };
        let view = scope.manager.create_view(&template);
        parent.replace_child(&placeholder, std::slice::from_ref(&view.visual));
        let directives = scope
            .manager
            .create_binding(scope.component, &view, &BindingContext::new());
        *self.included.borrow_mut() = Some(Included {
            manager: scope.manager.downgrade(),
            placeholder,
            parent,
            visual: view.visual.clone(),
            directives,
        });
    }

    fn on_destroy(&self) {
        let Some(included) = self.included.borrow_mut().take() else {
            return;
        };
        if let Some(manager) = included.manager.upgrade() {
            for handle in &included.directives {
                manager.remove_directive(handle);
            }
        }
        included
            .parent
            .replace_child(&included.visual, std::slice::from_ref(&included.placeholder));
        included.visual.release(true);
    }
}
