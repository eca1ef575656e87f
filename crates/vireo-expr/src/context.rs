#![forbid(unsafe_code)]

//! Evaluation context passed to compiled expressions.

use vireo_core::{DependencyTracker, Value};

/// Inputs of one evaluation.
///
/// `scope` is the value bare identifiers resolve against (normally a
/// component). A tracker, when present, receives every reactive read.
#[derive(Debug, Clone)]
pub struct EvalContext<'a> {
    scope: Value,
    event: Value,
    element: Value,
    global: Value,
    tracker: Option<&'a DependencyTracker>,
}

impl<'a> EvalContext<'a> {
    #[must_use]
    pub fn new(scope: Value) -> Self {
        Self {
            scope,
            event: Value::Undefined,
            element: Value::Undefined,
            global: Value::Undefined,
            tracker: None,
        }
    }

    #[must_use]
    pub fn with_event(mut self, event: Value) -> Self {
        self.event = event;
        self
    }

    #[must_use]
    pub fn with_element(mut self, element: Value) -> Self {
        self.element = element;
        self
    }

    #[must_use]
    pub fn with_global(mut self, global: Value) -> Self {
        self.global = global;
        self
    }

    #[must_use]
    pub fn with_tracker(mut self, tracker: &'a DependencyTracker) -> Self {
        self.tracker = Some(tracker);
        self
    }

    #[must_use]
    pub fn scope(&self) -> &Value {
        &self.scope
    }

    #[must_use]
    pub fn event(&self) -> &Value {
        &self.event
    }

    #[must_use]
    pub fn element(&self) -> &Value {
        &self.element
    }

    #[must_use]
    pub fn global(&self) -> &Value {
        &self.global
    }

    #[must_use]
    pub fn tracker(&self) -> Option<&'a DependencyTracker> {
        self.tracker
    }
}
