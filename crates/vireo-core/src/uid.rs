#![forbid(unsafe_code)]

//! Process-unique integer handles.
//!
//! Every hub, component, visual object, and watcher draws its identity from
//! one monotonically increasing counter, so handles never collide across
//! kinds and are never reused.

use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_UID: AtomicU64 = AtomicU64::new(1);

/// Allocate a fresh handle.
#[must_use]
pub fn next_uid() -> u64 {
    NEXT_UID.fetch_add(1, Ordering::Relaxed)
}

/// Identity of a notification hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HubId(u64);

impl HubId {
    pub(crate) fn new() -> Self {
        Self(next_uid())
    }

    /// Raw handle value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uids_are_unique_and_increasing() {
        let a = next_uid();
        let b = next_uid();
        assert!(b > a);
        assert_ne!(HubId::new(), HubId::new());
    }
}
