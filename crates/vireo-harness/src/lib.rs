#![forbid(unsafe_code)]

//! Test support for Vireo.
//!
//! - [`Harness`] mounts a root component from a definition and template.
//! - [`LogCapture`] records `tracing` events so tests can assert on the
//!   warnings and errors the binding layer reports instead of failing.
//! - [`LifecycleRecorder`] logs hook order across nested components.
//! - [`tree_snapshot`] and [`assert_snapshot!`] compare visual trees as
//!   text. Run `BLESS=1 cargo test --package vireo-harness` to create or
//!   update snapshot files.
//! - [`strategies`] holds `proptest` inputs for list reconciliation.

pub mod capture;
pub mod fixture;
pub mod lifecycle;
pub mod snapshot;
pub mod strategies;

pub use capture::{CapturedEvent, LogCapture};
pub use fixture::{Harness, HarnessBuilder, ROOT_TEMPLATE};
pub use lifecycle::LifecycleRecorder;
pub use snapshot::{Snapshot, tree_snapshot};
