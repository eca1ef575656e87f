#![forbid(unsafe_code)]

//! Coalesced next-tick task queue.
//!
//! Reactions to state writes never run inside the write. They are queued on
//! a [`Scheduler`] under a [`TaskKey`] and run together on the next
//! [`flush`](Scheduler::flush), which the host calls once per frame.
//!
//! # Invariants
//!
//! 1. At most one task per [`TaskKey`] is pending; later requests coalesce.
//! 2. Tasks run in insertion order.
//! 3. Tasks queued while a tick is running go to the next tick.
//! 4. A cancelled task never runs; cancelling twice is a no-op.
//! 5. The frame requester is called once per empty → non-empty transition.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use ahash::AHashMap;
use web_time::Instant;

use crate::config::SchedulerConfig;

/// Coalescing identity of a task: which callback, on which receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskKey {
    pub callback: u64,
    pub receiver: u64,
}

impl TaskKey {
    #[must_use]
    pub const fn new(callback: u64, receiver: u64) -> Self {
        Self { callback, receiver }
    }
}

/// Cancellation token of one queued task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskToken(u64);

/// Outcome of one [`Scheduler::flush`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickReport {
    /// Sequence number of this tick, starting at 1.
    pub tick: u64,
    pub ran: usize,
    /// Tasks cancelled after being queued.
    pub skipped: usize,
    pub elapsed: Duration,
}

struct Task {
    key: TaskKey,
    token: TaskToken,
    live: Cell<bool>,
    run: RefCell<Option<Box<dyn FnOnce()>>>,
}

#[derive(Default)]
struct State {
    queue: Vec<Rc<Task>>,
    pending: AHashMap<TaskKey, Rc<Task>>,
    next_token: u64,
    ticks: u64,
}

/// Single-threaded coalescing task queue.
pub struct Scheduler {
    config: SchedulerConfig,
    state: RefCell<State>,
    frame_requester: RefCell<Option<Rc<dyn Fn()>>>,
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("Scheduler")
            .field("pending", &state.pending.len())
            .field("ticks", &state.ticks)
            .finish()
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::with_config(SchedulerConfig::default())
    }
}

impl Scheduler {
    #[must_use]
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    #[must_use]
    pub fn with_config(config: SchedulerConfig) -> Self {
        Self {
            config,
            state: RefCell::new(State::default()),
            frame_requester: RefCell::new(None),
        }
    }

    #[must_use]
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Install the hook asking the host for a frame.
    pub fn set_frame_requester(&self, requester: impl Fn() + 'static) {
        *self.frame_requester.borrow_mut() = Some(Rc::new(requester));
    }

    /// Queue `task` for the next tick.
    ///
    /// Returns `None` when a task with the same key is already pending; the
    /// pending task is kept and `task` is dropped.
    pub fn next_tick(&self, key: TaskKey, task: impl FnOnce() + 'static) -> Option<TaskToken> {
        let (token, was_empty) = {
            let mut state = self.state.borrow_mut();
            if state.pending.contains_key(&key) {
                return None;
            }
            state.next_token += 1;
            let token = TaskToken(state.next_token);
            let entry = Rc::new(Task {
                key,
                token,
                live: Cell::new(true),
                run: RefCell::new(Some(Box::new(task))),
            });
            let was_empty = state.pending.is_empty();
            state.pending.insert(key, Rc::clone(&entry));
            state.queue.push(entry);
            (token, was_empty)
        };
        if was_empty {
            let requester = self.frame_requester.borrow().clone();
            if let Some(requester) = requester {
                requester();
            }
        }
        Some(token)
    }

    /// Cancel a queued task. Returns whether it was still pending.
    pub fn cancel(&self, token: TaskToken) -> bool {
        let mut state = self.state.borrow_mut();
        let Some(task) = state.queue.iter().find(|t| t.token == token).cloned() else {
            return false;
        };
        if !task.live.replace(false) {
            return false;
        }
        state.pending.remove(&task.key);
        task.run.borrow_mut().take();
        true
    }

    /// Cancel whatever task is pending under `key`.
    pub fn cancel_key(&self, key: TaskKey) -> bool {
        let task = self.state.borrow_mut().pending.remove(&key);
        match task {
            Some(task) => {
                task.live.set(false);
                task.run.borrow_mut().take();
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn is_scheduled(&self, key: TaskKey) -> bool {
        self.state.borrow().pending.contains_key(&key)
    }

    /// Number of live tasks waiting for the next tick.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.state.borrow().pending.len()
    }

    /// Ticks flushed so far.
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.state.borrow().ticks
    }

    /// Run every task queued before this call.
    pub fn flush(&self) -> TickReport {
        let start = Instant::now();
        let (tick, batch) = {
            let mut state = self.state.borrow_mut();
            state.ticks += 1;
            state.pending.clear();
            (state.ticks, std::mem::take(&mut state.queue))
        };

        let mut report = TickReport {
            tick,
            ..TickReport::default()
        };
        for task in batch {
            let run = task.run.borrow_mut().take();
            match run {
                Some(run) if task.live.replace(false) => {
                    run();
                    report.ran += 1;
                }
                _ => report.skipped += 1,
            }
        }
        report.elapsed = start.elapsed();

        if report.elapsed > self.config.slow_tick_threshold {
            tracing::warn!(
                target: "vireo::scheduler",
                tick,
                ran = report.ran,
                elapsed_us = report.elapsed.as_micros() as u64,
                "slow tick"
            );
        } else {
            tracing::trace!(
                target: "vireo::scheduler",
                tick,
                ran = report.ran,
                skipped = report.skipped,
                "tick flushed"
            );
        }
        report
    }

    /// Flush until nothing is pending or `idle_tick_limit` ticks have run.
    /// Returns the number of ticks flushed.
    pub fn run_until_idle(&self) -> usize {
        let mut ticks = 0;
        while self.pending() > 0 {
            if ticks >= self.config.idle_tick_limit {
                tracing::warn!(
                    target: "vireo::scheduler",
                    limit = self.config.idle_tick_limit,
                    pending = self.pending(),
                    "scheduler did not settle"
                );
                break;
            }
            self.flush();
            ticks += 1;
        }
        ticks
    }
}
