#![forbid(unsafe_code)]

//! Vireo public facade crate.
//!
//! This crate provides the stable, ergonomic surface area for users.
//!
//! ```
//! use std::rc::Rc;
//! use vireo::prelude::*;
//!
//! let registry = Registry::with_builtins();
//! registry.register_template("hello", VNode::element("box").attr("title", "Hi {{ name }}"));
//! registry.register_component(
//!     ComponentDefinition::new("Hello")
//!         .property("name", PropertyType::String, "there")
//!         .template("hello"),
//! );
//! let manager = BindingManager::new(Rc::new(registry));
//! let (root, view) = manager.create_root("Hello")?;
//! assert_eq!(view.visual.property("title"), Value::from("Hi there"));
//!
//! root.set("name", Value::from("you"));
//! manager.scheduler().run_until_idle();
//! assert_eq!(view.visual.property("title"), Value::from("Hi you"));
//! # Ok::<(), vireo::prelude::view::ViewError>(())
//! ```

pub use vireo_core::{ObservableArray, ObservableObject, Value};
pub use vireo_view::{
    BindingManager, Component, ComponentDefinition, Directive, DirectiveDef, DirectiveScope,
    Lifecycle, PropertyType, Registry, VNode, View, VisualNode,
};

pub mod prelude {
    pub use vireo_core as core;
    pub use vireo_expr as expr;
    #[cfg(feature = "harness")]
    pub use vireo_harness as harness;
    pub use vireo_runtime as runtime;
    pub use vireo_view as view;

    pub use vireo_core::{ObservableArray, ObservableObject, Value};
    pub use vireo_view::{
        BindingManager, Component, ComponentDefinition, PropertyType, Registry, VNode,
    };
}
