#![forbid(unsafe_code)]

//! Lifecycle hook recording.

use std::cell::RefCell;
use std::rc::Rc;

use vireo_view::{Component, Lifecycle, View};

/// Appends `"<label>:<hook>"` to a shared log for every hook it sees.
///
/// Recorders made with [`for_label`](Self::for_label) share one log, so a
/// parent and its nested components interleave in call order.
#[derive(Debug, Clone)]
pub struct LifecycleRecorder {
    label: Rc<str>,
    log: Rc<RefCell<Vec<String>>>,
}

impl LifecycleRecorder {
    #[must_use]
    pub fn new(label: &str) -> Self {
        Self {
            label: Rc::from(label),
            log: Rc::default(),
        }
    }

    /// A recorder with a different label writing to the same log.
    #[must_use]
    pub fn for_label(&self, label: &str) -> Self {
        Self {
            label: Rc::from(label),
            log: Rc::clone(&self.log),
        }
    }

    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.log.borrow().clone()
    }

    /// Entries for one label, without the prefix.
    #[must_use]
    pub fn hooks_for(&self, label: &str) -> Vec<String> {
        let prefix = format!("{label}:");
        self.log
            .borrow()
            .iter()
            .filter_map(|entry| entry.strip_prefix(&prefix).map(str::to_owned))
            .collect()
    }

    pub fn clear(&self) {
        self.log.borrow_mut().clear();
    }

    fn push(&self, hook: &str) {
        self.log.borrow_mut().push(format!("{}:{hook}", self.label));
    }
}

impl Lifecycle for LifecycleRecorder {
    fn on_init(&self, _component: &Component) {
        self.push("init");
    }

    fn on_before_mount(&self, _component: &Component, _view: &View) {
        self.push("before_mount");
    }

    fn on_after_mounted(&self, _component: &Component) {
        self.push("after_mounted");
    }

    fn on_enter(&self, _component: &Component) {
        self.push("enter");
    }

    fn on_destroy(&self, _component: &Component) {
        self.push("destroy");
    }
}
