#![forbid(unsafe_code)]

//! Observable arrays.
//!
//! [`ObservableArray`] is a sequence facade whose mutators notify the
//! array's hub on the changed channel exactly once per call, however many
//! elements are touched. Elements themselves are not forwarded: an array
//! notifies through whichever object property holds it.
//!
//! Removal helpers (`remove_at`, `remove_item`, `remove_all`) notify only
//! when something was removed; the sequence mutators (`push`, `pop`,
//! `shift`, `unshift`, `splice`, `sort`, `reverse`) always notify.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use crate::hub::Hub;
use crate::value::Value;

/// How far past the end [`ObservableArray::set_at`] may pad.
pub const MAX_INDEX_GAP: usize = 1 << 16;

struct ArrayInner {
    hub: Rc<Hub>,
    items: RefCell<Vec<Value>>,
}

/// A shared, observable sequence of values.
#[derive(Clone)]
pub struct ObservableArray {
    inner: Rc<ArrayInner>,
}

impl Default for ObservableArray {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ObservableArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Array#{}(len={})", self.id(), self.len())
    }
}

impl From<Vec<Value>> for ObservableArray {
    fn from(items: Vec<Value>) -> Self {
        Self {
            inner: Rc::new(ArrayInner {
                hub: Hub::new(),
                items: RefCell::new(items),
            }),
        }
    }
}

impl FromIterator<Value> for ObservableArray {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self::from(iter.into_iter().collect::<Vec<_>>())
    }
}

impl ObservableArray {
    #[must_use]
    pub fn new() -> Self {
        Self::from(Vec::new())
    }

    #[must_use]
    pub fn hub(&self) -> &Rc<Hub> {
        &self.inner.hub
    }

    /// Handle of this array (its hub id).
    #[must_use]
    pub fn id(&self) -> u64 {
        self.inner.hub.id().get()
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.items.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.items.borrow().is_empty()
    }

    /// Element at `index`, or `Undefined`.
    #[must_use]
    pub fn get(&self, index: usize) -> Value {
        self.inner
            .items
            .borrow()
            .get(index)
            .cloned()
            .unwrap_or_default()
    }

    /// Snapshot of the elements.
    #[must_use]
    pub fn to_vec(&self) -> Vec<Value> {
        self.inner.items.borrow().clone()
    }

    /// Position of the first element strictly equal to `item`.
    #[must_use]
    pub fn index_of(&self, item: &Value) -> Option<usize> {
        self.inner
            .items
            .borrow()
            .iter()
            .position(|v| v.same_value(item))
    }

    #[must_use]
    pub fn contains(&self, item: &Value) -> bool {
        self.index_of(item).is_some()
    }

    fn mutate<R>(&self, f: impl FnOnce(&mut Vec<Value>) -> R) -> R {
        let mut items = self.inner.items.borrow_mut();
        let result = f(&mut *items);
        drop(items);
        self.inner.hub.notify_changed();
        result
    }

    /// Append one element; returns the new length.
    pub fn push(&self, item: Value) -> usize {
        self.mutate(|items| {
            items.push(item);
            items.len()
        })
    }

    /// Append many elements with a single notification.
    pub fn push_all(&self, new_items: impl IntoIterator<Item = Value>) -> usize {
        self.mutate(|items| {
            items.extend(new_items);
            items.len()
        })
    }

    pub fn pop(&self) -> Option<Value> {
        self.mutate(Vec::pop)
    }

    pub fn shift(&self) -> Option<Value> {
        self.mutate(|items| (!items.is_empty()).then(|| items.remove(0)))
    }

    /// Prepend elements, keeping their order; returns the new length.
    pub fn unshift(&self, new_items: impl IntoIterator<Item = Value>) -> usize {
        self.mutate(|items| {
            let head: Vec<Value> = new_items.into_iter().collect();
            items.splice(0..0, head);
            items.len()
        })
    }

    /// Remove `delete_count` elements at `start` and insert `insert` there.
    /// Out-of-range arguments are clamped. Returns the removed elements.
    pub fn splice(
        &self,
        start: usize,
        delete_count: usize,
        insert: impl IntoIterator<Item = Value>,
    ) -> Vec<Value> {
        self.mutate(|items| {
            let start = start.min(items.len());
            let end = start.saturating_add(delete_count).min(items.len());
            items.splice(start..end, insert).collect()
        })
    }

    /// Default ordering: `Undefined` last, everything else by display string.
    pub fn sort(&self) {
        self.sort_by(|a, b| match (a, b) {
            (Value::Undefined, Value::Undefined) => Ordering::Equal,
            (Value::Undefined, _) => Ordering::Greater,
            (_, Value::Undefined) => Ordering::Less,
            _ => a.to_display_string().cmp(&b.to_display_string()),
        });
    }

    /// Stable sort with a comparator.
    pub fn sort_by(&self, compare: impl FnMut(&Value, &Value) -> Ordering) {
        self.mutate(|items| items.sort_by(compare));
    }

    pub fn reverse(&self) {
        self.mutate(|items| items.reverse());
    }

    /// Write `index`, padding with `Undefined` past the end.
    ///
    /// Writes more than [`MAX_INDEX_GAP`] past the end are refused with a
    /// warning and no notification; returns whether the write happened.
    pub fn set_at(&self, index: usize, item: Value) -> bool {
        let len = self.len();
        if index > len.saturating_add(MAX_INDEX_GAP) {
            tracing::warn!(
                target: "vireo::observable",
                index,
                len,
                "array write too far past the end"
            );
            return false;
        }
        self.mutate(|items| {
            if index >= items.len() {
                items.resize(index + 1, Value::Undefined);
            }
            items[index] = item;
        });
        true
    }

    /// Remove the element at `index`. Silent when out of range.
    pub fn remove_at(&self, index: usize) -> Option<Value> {
        if index >= self.len() {
            return None;
        }
        Some(self.mutate(|items| items.remove(index)))
    }

    /// Remove the first element strictly equal to `item`.
    pub fn remove_item(&self, item: &Value) -> bool {
        match self.index_of(item) {
            Some(index) => {
                self.mutate(|items| items.remove(index));
                true
            }
            None => false,
        }
    }

    /// Remove every element strictly equal to `item`; returns the count.
    pub fn remove_all(&self, item: &Value) -> usize {
        let count = self
            .inner
            .items
            .borrow()
            .iter()
            .filter(|v| v.same_value(item))
            .count();
        if count > 0 {
            self.mutate(|items| items.retain(|v| !v.same_value(item)));
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn watched(items: Vec<i32>) -> (ObservableArray, Rc<Cell<u32>>) {
        let array: ObservableArray = items.into_iter().map(Value::from).collect();
        let count = Rc::new(Cell::new(0));
        let c = Rc::clone(&count);
        array
            .hub()
            .add_changed_listener(Rc::new(move || c.set(c.get() + 1)));
        (array, count)
    }

    fn numbers(array: &ObservableArray) -> Vec<f64> {
        array.to_vec().iter().map(Value::to_number).collect()
    }

    #[test]
    fn push_all_notifies_once() {
        let (array, count) = watched(vec![]);
        assert_eq!(array.push_all((0..5).map(Value::from)), 5);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn splice_clamps_and_returns_removed() {
        let (array, count) = watched(vec![1, 2, 3, 4]);
        let removed = array.splice(1, 10, [Value::from(9)]);
        assert_eq!(removed.len(), 3);
        assert_eq!(numbers(&array), vec![1.0, 9.0]);
        assert_eq!(count.get(), 1);
        array.splice(99, 1, []);
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn shift_and_unshift_preserve_order() {
        let (array, count) = watched(vec![3]);
        array.unshift([Value::from(1), Value::from(2)]);
        assert_eq!(numbers(&array), vec![1.0, 2.0, 3.0]);
        assert_eq!(array.shift(), Some(Value::from(1)));
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn pop_on_empty_still_notifies() {
        let (array, count) = watched(vec![]);
        assert_eq!(array.pop(), None);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn default_sort_is_lexicographic_with_undefined_last() {
        let array = ObservableArray::from(vec![
            Value::from(10),
            Value::Undefined,
            Value::from(9),
            Value::from(1),
        ]);
        array.sort();
        assert_eq!(array.get(0), Value::from(1));
        assert_eq!(array.get(1), Value::from(10));
        assert_eq!(array.get(2), Value::from(9));
        assert_eq!(array.get(3), Value::Undefined);
    }

    #[test]
    fn set_at_pads_with_undefined() {
        let (array, count) = watched(vec![1]);
        assert!(array.set_at(3, Value::from(4)));
        assert_eq!(array.len(), 4);
        assert_eq!(array.get(2), Value::Undefined);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn far_writes_are_refused() {
        let (array, count) = watched(vec![1, 2]);
        assert!(!array.set_at(usize::MAX, Value::from(0)));
        assert!(!array.set_at(usize::MAX / 2, Value::from(0)));
        assert!(!array.set_at(2 + MAX_INDEX_GAP + 1, Value::from(0)));
        assert_eq!(array.len(), 2);
        assert_eq!(count.get(), 0);

        assert!(array.set_at(2 + MAX_INDEX_GAP, Value::from(9)));
        assert_eq!(array.len(), MAX_INDEX_GAP + 3);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn removal_helpers_notify_only_on_hit() {
        let (array, count) = watched(vec![1, 2, 2, 3]);
        assert_eq!(array.remove_at(10), None);
        assert!(!array.remove_item(&Value::from(7)));
        assert_eq!(array.remove_all(&Value::from(7)), 0);
        assert_eq!(count.get(), 0);

        assert_eq!(array.remove_all(&Value::from(2)), 2);
        assert_eq!(count.get(), 1);
        assert!(array.remove_item(&Value::from(3)));
        assert_eq!(array.remove_at(0), Some(Value::from(1)));
        assert_eq!(count.get(), 3);
        assert!(array.is_empty());
    }
}
