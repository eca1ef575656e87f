#![forbid(unsafe_code)]

//! `proptest` strategies for collections fed to `:for`.

use proptest::prelude::*;
use vireo_core::{ObservableArray, ObservableObject, Value};

/// Small integers, duplicates likely.
pub fn primitive_list(max_len: usize) -> impl Strategy<Value = Vec<i32>> {
    proptest::collection::vec(0i32..6, 0..=max_len)
}

/// A permutation of `0..len` for some `len` up to `max_len`.
pub fn shuffled_ids(max_len: usize) -> impl Strategy<Value = Vec<i32>> {
    (0..=max_len).prop_flat_map(|len| {
        let ids: Vec<i32> = (0..len).filter_map(|i| i32::try_from(i).ok()).collect();
        Just(ids).prop_shuffle()
    })
}

/// Successive passes of unique ids, each drawn from a shared pool so that
/// consecutive passes overlap.
pub fn id_passes(max_len: usize, passes: usize) -> impl Strategy<Value = Vec<Vec<i32>>> {
    proptest::collection::vec(
        proptest::sample::subsequence((0..20).collect::<Vec<i32>>(), 0..=max_len)
            .prop_shuffle(),
        1..=passes,
    )
}

/// Array of integers.
#[must_use]
pub fn numbers(values: &[i32]) -> Value {
    Value::Array(values.iter().copied().map(Value::from).collect::<ObservableArray>())
}

/// Array of `{ id, name }` records.
#[must_use]
pub fn records(ids: &[i32]) -> Value {
    Value::Array(
        ids.iter()
            .map(|id| {
                Value::Object(ObservableObject::from_entries([
                    ("id", Value::from(*id)),
                    ("name", Value::from(format!("item {id}"))),
                ]))
            })
            .collect::<ObservableArray>(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn shuffled_ids_are_a_permutation(ids in shuffled_ids(12)) {
            let mut sorted = ids.clone();
            sorted.sort_unstable();
            let expected: Vec<i32> = (0..sorted.len()).filter_map(|i| i32::try_from(i).ok()).collect();
            prop_assert_eq!(sorted, expected);
        }

        #[test]
        fn id_passes_have_no_duplicates(passes in id_passes(8, 4)) {
            for pass in passes {
                let mut seen = pass.clone();
                seen.sort_unstable();
                seen.dedup();
                prop_assert_eq!(seen.len(), pass.len());
            }
        }
    }
}
