#![forbid(unsafe_code)]

//! Non-owning side table keyed by value identity.
//!
//! Entries are addressed by `(reference, source)`: the identity of the value
//! something is attached to, and the identity of whoever attached it. Values
//! are never touched, so user data carries no injected fields.

use std::fmt;

use ahash::AHashMap;
use vireo_core::IdentityKey;

pub struct WeakTable<T> {
    table: AHashMap<IdentityKey, AHashMap<IdentityKey, T>>,
}

impl<T> Default for WeakTable<T> {
    fn default() -> Self {
        Self {
            table: AHashMap::new(),
        }
    }
}

impl<T> fmt::Debug for WeakTable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakTable")
            .field("references", &self.table.len())
            .field("entries", &self.len())
            .finish()
    }
}

impl<T> WeakTable<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `target`. Replacing an existing entry is reported.
    pub fn set(&mut self, reference: IdentityKey, source: IdentityKey, target: T) {
        let sources = self.table.entry(reference).or_default();
        if sources.insert(source.clone(), target).is_some() {
            tracing::warn!(target: "vireo::view", ?source, "side table entry overridden");
        }
    }

    #[must_use]
    pub fn get(&self, reference: &IdentityKey, source: &IdentityKey) -> Option<&T> {
        self.table.get(reference)?.get(source)
    }

    pub fn get_mut(&mut self, reference: &IdentityKey, source: &IdentityKey) -> Option<&mut T> {
        self.table.get_mut(reference)?.get_mut(source)
    }

    /// Remove one entry; a reference left without sources is dropped.
    pub fn remove(&mut self, reference: &IdentityKey, source: &IdentityKey) -> Option<T> {
        let sources = self.table.get_mut(reference)?;
        let removed = sources.remove(source);
        if sources.is_empty() {
            self.table.remove(reference);
        }
        removed
    }

    /// Remove every entry attached by `source`.
    pub fn clear(&mut self, source: &IdentityKey) -> usize {
        let mut removed = 0;
        self.table.retain(|_, sources| {
            if sources.remove(source).is_some() {
                removed += 1;
            }
            !sources.is_empty()
        });
        removed
    }

    /// Entries attached by `source`.
    pub fn entries_for<'a>(&'a self, source: &'a IdentityKey) -> impl Iterator<Item = (&'a IdentityKey, &'a T)> + 'a {
        self.table
            .iter()
            .filter_map(move |(reference, sources)| sources.get(source).map(|t| (reference, t)))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.table.values().map(|sources| sources.len()).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vireo_core::{ObservableObject, Value};

    #[test]
    fn entries_are_scoped_by_source() {
        let mut table = WeakTable::new();
        let item = Value::Object(ObservableObject::new());
        let (a, b) = (IdentityKey::handle(1), IdentityKey::handle(2));
        table.set(item.identity_key(), a.clone(), "first");
        table.set(item.identity_key(), b.clone(), "second");

        assert_eq!(table.get(&item.identity_key(), &a), Some(&"first"));
        assert_eq!(table.len(), 2);
        assert_eq!(table.clear(&a), 1);
        assert_eq!(table.get(&item.identity_key(), &a), None);
        assert_eq!(table.remove(&item.identity_key(), &b), Some("second"));
        assert!(table.is_empty());
    }

    #[test]
    fn equal_primitives_share_a_reference() {
        let mut table = WeakTable::new();
        let source = IdentityKey::handle(9);
        table.set(Value::from(2).identity_key(), source.clone(), 1);
        if let Some(count) = table.get_mut(&Value::from(2.0).identity_key(), &source) {
            *count += 1;
        }
        assert_eq!(table.get(&Value::from(2).identity_key(), &source), Some(&2));
        assert_eq!(table.entries_for(&source).count(), 1);
    }
}
