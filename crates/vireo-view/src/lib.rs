#![forbid(unsafe_code)]

//! Views, components, and directive bindings for Vireo.
//!
//! # Role in Vireo
//! `vireo-view` is where templates meet state. A [`VNode`] tree comes in,
//! [`create_view`] turns it into [`VisualNode`]s plus the binding
//! attributes still to attach, and a [`BindingManager`] attaches them to a
//! [`Component`] through watchers from `vireo-runtime`.
//!
//! # How it fits in the system
//! The host registers components, templates, and any custom directives in a
//! [`Registry`], creates a root with [`BindingManager::create_root`], and
//! flushes the scheduler once per frame. Built-in structural directives
//! (`:if`, `:for`) and routing directives (`:include`, `:slot`,
//! `:slot-to`, `:ref`, `@ref`) live in [`directives`].

pub mod binding;
pub mod component;
pub mod config;
pub mod directive;
pub mod directives;
pub mod error;
pub mod event;
pub mod registry;
pub mod view;
pub mod visual;
pub mod vnode;
pub mod weak_table;

pub use binding::{BindingManager, WeakBindingManager};
pub use component::{
    Component, ComponentDefinition, Lifecycle, LifecyclePhase, Method, PropertyType, WeakComponent,
};
pub use config::BindingConfig;
pub use directive::{BindingContext, Directive, DirectiveHandle, DirectiveScope, Teardown};
pub use directives::{ForExpression, ForLoopDirective, parse_for_expression};
pub use error::{Result, ViewError};
pub use event::{EventEmitter, EventHandler, EventListenerId};
pub use registry::{DirectiveDef, DirectiveFactory, Registry};
pub use view::{View, ViewInstance, create_view};
pub use visual::{ANCHOR_TAG, VisualNode};
pub use vnode::{TEXT_TAG, VNode};
pub use weak_table::WeakTable;
