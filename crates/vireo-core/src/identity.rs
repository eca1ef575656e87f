#![forbid(unsafe_code)]

//! Identity keys for side tables.
//!
//! Reference values (objects, arrays, functions, host objects) are keyed by
//! their handle. Primitives are keyed by value, so two equal strings or
//! numbers share a key. `NaN` has its own key so that it is equal to itself.

use std::rc::Rc;

use crate::value::Value;

/// Hashable identity of a [`Value`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IdentityKey {
    Undefined,
    Null,
    Bool(bool),
    Number(u64),
    NaN,
    Str(Rc<str>),
    Function(u64, Rc<str>),
    Ref(u64),
}

impl IdentityKey {
    /// Identity of `value`.
    #[must_use]
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Undefined => Self::Undefined,
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) if n.is_nan() => Self::NaN,
            // -0 and +0 share a key.
            Value::Number(n) => Self::Number(if *n == 0.0 { 0 } else { n.to_bits() }),
            Value::Str(s) => Self::Str(Rc::clone(s)),
            Value::Object(o) => Self::Ref(o.id()),
            Value::Array(a) => Self::Ref(a.id()),
            Value::Function(f) => {
                let (owner, name) = f.key();
                Self::Function(owner, Rc::clone(name))
            }
            Value::Host(h) => Self::Ref(h.host_id()),
        }
    }

    /// Identity of a handle-based value.
    #[must_use]
    pub const fn handle(uid: u64) -> Self {
        Self::Ref(uid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ObservableObject;

    #[test]
    fn primitives_share_keys_by_value() {
        assert_eq!(
            IdentityKey::of(&Value::from("a")),
            IdentityKey::of(&Value::from(String::from("a")))
        );
        assert_eq!(IdentityKey::of(&Value::from(2)), IdentityKey::of(&Value::from(2.0)));
        assert_eq!(IdentityKey::of(&Value::from(0.0)), IdentityKey::of(&Value::from(-0.0)));
        assert_eq!(
            IdentityKey::of(&Value::Number(f64::NAN)),
            IdentityKey::of(&Value::Number(f64::NAN))
        );
        assert_ne!(IdentityKey::of(&Value::from(1)), IdentityKey::of(&Value::from("1")));
    }

    #[test]
    fn objects_are_keyed_by_handle() {
        let a = ObservableObject::new();
        let b = ObservableObject::new();
        assert_eq!(
            IdentityKey::of(&Value::Object(a.clone())),
            IdentityKey::of(&Value::Object(a))
        );
        assert_ne!(
            IdentityKey::of(&Value::Object(b)),
            IdentityKey::of(&Value::Object(ObservableObject::new()))
        );
    }
}
