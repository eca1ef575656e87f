#![forbid(unsafe_code)]

//! Watchers and the tick scheduler.
//!
//! - [`Scheduler`]: a coalescing next-tick queue, flushed once per frame.
//! - [`Watcher`]: one expression on one scope, subscribed to exactly the
//!   properties its last evaluation read.
//! - [`WatcherRegistry`]: shares watchers per `(scope, expression, deep)`
//!   and hands out RAII [`WatchHandle`]s.
//! - [`WatchScope`]: releases a group of handles together.
//!
//! # Architecture
//!
//! Everything is single-threaded and built on `Rc`. A property write emits
//! synchronously on its hub; the watcher listener only queues a flush keyed
//! by `(WATCHER_FLUSH, watcher id)`, so a burst of writes in one operation
//! costs one re-evaluation per watcher per tick.
//!
//! # Invariants
//!
//! 1. After evaluation, a watcher's subscriptions equal the pairs it read.
//! 2. Callbacks fire only when [`Value::changed`](vireo_core::Value::changed)
//!    holds between the old and new value.
//! 3. Two watchers triggered in the same tick flush in queue order.
//! 4. Destroying a watcher twice has no further effect.

pub mod registry;
pub mod scheduler;
pub mod scope;
pub mod watcher;

pub use registry::{WatchHandle, WatchOptions, WatcherRegistry};
pub use scheduler::{Scheduler, TaskKey, TaskToken, TickReport};
pub use scope::WatchScope;
pub use watcher::{CallbackId, WATCHER_FLUSH, WatchCallback, WatchKey, Watcher};
