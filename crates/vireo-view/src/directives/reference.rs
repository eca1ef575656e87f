#![forbid(unsafe_code)]

//! `:ref="name"` and `@ref="expr"`.

use std::cell::RefCell;
use std::rc::Rc;

use vireo_expr::{EvalContext, compile};

use crate::binding::WeakBindingManager;
use crate::component::WeakComponent;
use crate::directive::{Directive, DirectiveScope};

/// Registers the view instance under `(name, component)` until destroyed.
#[derive(Default)]
pub struct RefDirective {
    registered: RefCell<Option<(WeakBindingManager, WeakComponent, String)>>,
}

impl RefDirective {
    #[must_use]
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }
}

impl Directive for RefDirective {
    fn on_init(&self, name: &str, scope: &DirectiveScope<'_>) {
        scope
            .manager
            .set_reference(scope.component, name, scope.view.instance.as_value());
        *self.registered.borrow_mut() = Some((
            scope.manager.downgrade(),
            scope.component.downgrade(),
            name.to_owned(),
        ));
    }

    fn on_destroy(&self) {
        let Some((manager, component, name)) = self.registered.borrow_mut().take() else {
            return;
        };
        if let (Some(manager), Some(component)) = (manager.upgrade(), component.upgrade()) {
            manager.remove_reference(&component, &name);
        }
    }
}

/// Evaluates its expression once with `$element` set to the instance.
#[derive(Default)]
pub struct RefCallbackDirective;

impl RefCallbackDirective {
    #[must_use]
    pub fn new() -> Rc<Self> {
        Rc::new(Self)
    }
}

impl Directive for RefCallbackDirective {
    fn on_init(&self, expression: &str, scope: &DirectiveScope<'_>) {
        let ctx = EvalContext::new(scope.component.as_value())
            .with_element(scope.view.instance.as_value())
            .with_global(scope.manager.global());
        compile(expression).call(&ctx);
    }
}
