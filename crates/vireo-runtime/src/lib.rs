#![forbid(unsafe_code)]

//! Runtime for Vireo bindings.
//!
//! # Role in Vireo
//! `vireo-runtime` sits between the expression compiler and the view layer.
//! It turns a compiled expression plus a scope into a [`Watcher`] that
//! re-runs when, and only when, something it read has changed, and it owns
//! the [`Scheduler`] that batches those re-runs per frame.
//!
//! # How it fits in the system
//! Directives in `vireo-view` create watches through a shared
//! [`WatcherRegistry`]. The host calls [`Scheduler::flush`] once per frame
//! (or installs a frame requester and flushes from it).

pub mod config;
pub mod reactive;

pub use config::SchedulerConfig;
pub use reactive::{
    CallbackId, Scheduler, TaskKey, TaskToken, TickReport, WATCHER_FLUSH, WatchCallback,
    WatchHandle, WatchKey, WatchOptions, WatchScope, Watcher, WatcherRegistry,
};
