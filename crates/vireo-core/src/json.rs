#![forbid(unsafe_code)]

//! JSON import/export and deep copies.

use ahash::{AHashMap, AHashSet};

use crate::array::ObservableArray;
use crate::object::ObservableObject;
use crate::value::Value;

impl Value {
    /// Convert JSON into wrapped values. Key order is preserved.
    #[must_use]
    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(*b),
            serde_json::Value::Number(n) => Self::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Self::from(s.as_str()),
            serde_json::Value::Array(items) => {
                Self::Array(items.iter().map(Self::from_json).collect())
            }
            serde_json::Value::Object(map) => Self::Object(ObservableObject::from_entries(
                map.iter().map(|(k, v)| (k.clone(), Self::from_json(v))),
            )),
        }
    }

    /// Snapshot as JSON.
    ///
    /// `Undefined`, functions, host objects, non-finite numbers, and
    /// back-references to an enclosing container become `null`.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        let mut path = AHashSet::new();
        to_json(self, &mut path)
    }

    /// Structural copy of objects and arrays; other values are shared.
    /// Shared substructure and cycles are preserved in the copy.
    #[must_use]
    pub fn deep_clone(&self) -> Self {
        let mut copies = AHashMap::new();
        deep_clone(self, &mut copies)
    }
}

/// Largest magnitude below which every integer is exact in an `f64`.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Integral numbers export as JSON integers, the rest as floats.
fn number_to_json(n: f64) -> serde_json::Value {
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        #[allow(clippy::cast_possible_truncation)]
        return serde_json::Value::Number(serde_json::Number::from(n as i64));
    }
    serde_json::Number::from_f64(n).map_or(serde_json::Value::Null, serde_json::Value::Number)
}

fn to_json(value: &Value, path: &mut AHashSet<u64>) -> serde_json::Value {
    match value {
        Value::Undefined | Value::Null | Value::Function(_) | Value::Host(_) => {
            serde_json::Value::Null
        }
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Number(n) => number_to_json(*n),
        Value::Str(s) => serde_json::Value::String(s.to_string()),
        Value::Array(array) => {
            if !path.insert(array.id()) {
                return serde_json::Value::Null;
            }
            let items = array.to_vec().iter().map(|v| to_json(v, path)).collect();
            path.remove(&array.id());
            serde_json::Value::Array(items)
        }
        Value::Object(object) => {
            if !path.insert(object.id()) {
                return serde_json::Value::Null;
            }
            let map = object
                .entries()
                .into_iter()
                .map(|(k, v)| {
                    let json = to_json(&v, path);
                    (k, json)
                })
                .collect();
            path.remove(&object.id());
            serde_json::Value::Object(map)
        }
    }
}

fn deep_clone(value: &Value, copies: &mut AHashMap<u64, Value>) -> Value {
    match value {
        Value::Object(object) => {
            if let Some(copy) = copies.get(&object.id()) {
                return copy.clone();
            }
            let copy = ObservableObject::new();
            copies.insert(object.id(), Value::Object(copy.clone()));
            for (key, child) in object.entries() {
                let child = deep_clone(&child, copies);
                copy.observe_property(&key, child);
            }
            Value::Object(copy)
        }
        Value::Array(array) => {
            if let Some(copy) = copies.get(&array.id()) {
                return copy.clone();
            }
            let copy = ObservableArray::new();
            copies.insert(array.id(), Value::Array(copy.clone()));
            let items: Vec<Value> = array
                .to_vec()
                .iter()
                .map(|v| deep_clone(v, copies))
                .collect();
            for item in items {
                copy.push(item);
            }
            Value::Array(copy)
        }
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_round_trip_keeps_key_order() {
        let source = json!({"z": 1, "a": [true, null, "s"], "m": {"k": 2.5}});
        let value = Value::from_json(&source);
        let object = value.as_object().cloned().unwrap_or_default();
        assert_eq!(object.keys(), vec!["z", "a", "m"]);
        assert_eq!(value.to_json(), source);
    }

    #[test]
    fn integral_numbers_export_as_integers() {
        assert_eq!(Value::from(1).to_json(), json!(1));
        assert_eq!(Value::from(-0.0).to_json(), json!(0));
        assert_eq!(Value::from(2.5).to_json(), json!(2.5));
        assert_eq!(Value::from(1e300).to_json(), json!(1e300));
        assert_eq!(Value::from(f64::NAN).to_json(), serde_json::Value::Null);
        assert!(Value::from(3).to_json().is_i64());
    }

    #[test]
    fn deep_clone_copies_containers() {
        let value = Value::from_json(&json!({"list": [1, 2], "name": "x"}));
        let copy = value.deep_clone();
        assert!(!copy.same_value(&value));
        let original_list = value.get_member("list", None);
        let copied_list = copy.get_member("list", None);
        assert!(!copied_list.same_value(&original_list));
        assert_eq!(copy.to_json(), value.to_json());
    }

    #[test]
    fn deep_clone_preserves_cycles() {
        let object = ObservableObject::new();
        object.set("me", Value::Object(object.clone()));
        let copy = Value::Object(object.clone()).deep_clone();
        let inner = copy.get_member("me", None);
        assert!(inner.same_value(&copy));
        assert_eq!(Value::Object(object.clone()).to_json(), json!({"me": null}));
        object.dispose();
        if let Some(copy) = copy.as_object() {
            copy.dispose();
        }
    }
}
