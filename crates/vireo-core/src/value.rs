#![forbid(unsafe_code)]

//! Dynamic values flowing through expressions and bindings.
//!
//! [`Value`] mirrors the value space of the template language: primitives
//! are copied, while objects, arrays, functions, and host objects are shared
//! handles compared by identity.
//!
//! # Invariants
//!
//! 1. `same_value` is reflexive for every variant except `Number(NaN)`.
//! 2. Reference variants compare by handle, never by contents.
//! 3. [`Value::changed`] treats every object-typed new value as a change,
//!    since in-place mutation cannot be observed by identity.

use std::fmt;
use std::rc::Rc;

use crate::array::ObservableArray;
use crate::host::HostObject;
use crate::hub::Hub;
use crate::identity::IdentityKey;
use crate::object::ObservableObject;
use crate::tracker::DependencyTracker;
use crate::uid::next_uid;

// ---------------------------------------------------------------------------
// NativeFn
// ---------------------------------------------------------------------------

/// A native callable exposed to expressions.
///
/// Identity is the pair `(owner, name)`: a method bound to the same owner
/// under the same name compares equal across lookups.
#[derive(Clone)]
pub struct NativeFn {
    owner: u64,
    name: Rc<str>,
    f: Rc<dyn Fn(&[Value]) -> Value>,
}

impl NativeFn {
    /// A free-standing function with a fresh identity.
    pub fn new(name: impl Into<Rc<str>>, f: impl Fn(&[Value]) -> Value + 'static) -> Self {
        Self {
            owner: next_uid(),
            name: name.into(),
            f: Rc::new(f),
        }
    }

    /// A function bound to `owner`; equal to any other binding of the same
    /// owner and name.
    pub fn bound(
        owner: u64,
        name: impl Into<Rc<str>>,
        f: impl Fn(&[Value]) -> Value + 'static,
    ) -> Self {
        Self {
            owner,
            name: name.into(),
            f: Rc::new(f),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn key(&self) -> (u64, &Rc<str>) {
        (self.owner, &self.name)
    }

    /// Invoke with positional arguments.
    pub fn call(&self, args: &[Value]) -> Value {
        (self.f)(args)
    }

    /// Identity comparison.
    #[must_use]
    pub fn same(&self, other: &Self) -> bool {
        self.owner == other.owner && self.name == other.name
    }
}

impl fmt::Debug for NativeFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeFn({}#{})", self.name, self.owner)
    }
}

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

/// A dynamically typed value.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(Rc<str>),
    Object(ObservableObject),
    Array(ObservableArray),
    Function(NativeFn),
    Host(Rc<dyn HostObject>),
}

impl Value {
    /// Truthiness as used by conditions and `!`.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Undefined | Self::Null => false,
            Self::Bool(b) => *b,
            Self::Number(n) => *n != 0.0 && !n.is_nan(),
            Self::Str(s) => !s.is_empty(),
            Self::Object(_) | Self::Array(_) | Self::Function(_) | Self::Host(_) => true,
        }
    }

    #[must_use]
    pub fn is_nullish(&self) -> bool {
        matches!(self, Self::Undefined | Self::Null)
    }

    /// Non-null object-typed values: objects, arrays, and host objects.
    #[must_use]
    pub fn is_object_like(&self) -> bool {
        matches!(self, Self::Object(_) | Self::Array(_) | Self::Host(_))
    }

    /// The `typeof` label.
    #[must_use]
    pub fn type_of(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::Str(_) => "string",
            Self::Function(_) => "function",
            Self::Null | Self::Object(_) | Self::Array(_) | Self::Host(_) => "object",
        }
    }

    /// Strict equality (`===`).
    #[must_use]
    pub fn same_value(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Undefined, Self::Undefined) | (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a.ptr_eq(b),
            (Self::Array(a), Self::Array(b)) => a.ptr_eq(b),
            (Self::Function(a), Self::Function(b)) => a.same(b),
            (Self::Host(a), Self::Host(b)) => a.host_id() == b.host_id(),
            _ => false,
        }
    }

    /// Loose equality (`==`).
    #[must_use]
    pub fn loose_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (a, b) if a.is_nullish() && b.is_nullish() => true,
            (a, b) if a.is_nullish() || b.is_nullish() => false,
            (Self::Number(_) | Self::Str(_) | Self::Bool(_), Self::Number(_) | Self::Bool(_))
            | (Self::Number(_) | Self::Bool(_), Self::Str(_)) => {
                self.to_number() == other.to_number()
            }
            _ => self.same_value(other),
        }
    }

    /// Whether replacing `old` with `new` counts as a change.
    ///
    /// Object-typed new values always count.
    #[must_use]
    pub fn changed(new: &Self, old: &Self) -> bool {
        !new.same_value(old) || new.is_object_like()
    }

    /// Numeric conversion.
    #[must_use]
    pub fn to_number(&self) -> f64 {
        match self {
            Self::Undefined => f64::NAN,
            Self::Null => 0.0,
            Self::Bool(b) => f64::from(u8::from(*b)),
            Self::Number(n) => *n,
            Self::Str(s) => parse_number(s),
            Self::Array(a) => match a.len() {
                0 => 0.0,
                1 => a.get(0).to_number(),
                _ => f64::NAN,
            },
            Self::Object(_) | Self::Function(_) | Self::Host(_) => f64::NAN,
        }
    }

    /// String conversion.
    #[must_use]
    pub fn to_display_string(&self) -> String {
        match self {
            Self::Undefined => "undefined".to_owned(),
            Self::Null => "null".to_owned(),
            Self::Bool(b) => b.to_string(),
            Self::Number(n) => format_number(*n),
            Self::Str(s) => s.to_string(),
            Self::Object(_) => "[object Object]".to_owned(),
            Self::Array(a) => a
                .to_vec()
                .iter()
                .map(|v| {
                    if v.is_nullish() {
                        String::new()
                    } else {
                        v.to_display_string()
                    }
                })
                .collect::<Vec<_>>()
                .join(","),
            Self::Function(f) => format!("function {}() {{ [native code] }}", f.name()),
            Self::Host(h) => format!("[object {}]", h.type_name()),
        }
    }

    /// String conversion for `{{ }}` fragments: nullish values render empty.
    #[must_use]
    pub fn to_interpolation_string(&self) -> String {
        if self.is_nullish() {
            String::new()
        } else {
            self.to_display_string()
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_object(&self) -> Option<&ObservableObject> {
        match self {
            Self::Object(o) => Some(o),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_array(&self) -> Option<&ObservableArray> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_function(&self) -> Option<&NativeFn> {
        match self {
            Self::Function(f) => Some(f),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_host(&self) -> Option<&Rc<dyn HostObject>> {
        match self {
            Self::Host(h) => Some(h),
            _ => None,
        }
    }

    /// The notification hub of a wrapped value.
    #[must_use]
    pub fn hub(&self) -> Option<Rc<Hub>> {
        match self {
            Self::Object(o) => Some(Rc::clone(o.hub())),
            Self::Array(a) => Some(Rc::clone(a.hub())),
            _ => None,
        }
    }

    /// Identity key for side tables.
    #[must_use]
    pub fn identity_key(&self) -> IdentityKey {
        IdentityKey::of(self)
    }

    /// Read a data member. Object reads are recorded into `tracker`.
    ///
    /// Array elements and `length` are read untracked: arrays notify through
    /// the property that holds them.
    pub fn get_member(&self, name: &str, tracker: Option<&DependencyTracker>) -> Self {
        match self {
            Self::Object(o) => o.get_tracked(name, tracker),
            Self::Array(a) => {
                if name == "length" {
                    Self::from(a.len())
                } else {
                    parse_index(name).map_or(Self::Undefined, |i| a.get(i))
                }
            }
            Self::Str(s) => {
                if name == "length" {
                    Self::from(s.chars().count())
                } else {
                    parse_index(name)
                        .and_then(|i| s.chars().nth(i))
                        .map_or(Self::Undefined, |c| Self::from(c.to_string()))
                }
            }
            Self::Host(h) => h.get_member(name, tracker),
            _ => Self::Undefined,
        }
    }

    /// Write a data member. Returns `false` when the receiver cannot hold
    /// members or refuses the write.
    pub fn set_member(&self, name: &str, value: Self) -> bool {
        match self {
            Self::Object(o) => {
                o.set(name, value);
                true
            }
            Self::Array(a) => parse_index(name).is_some_and(|i| a.set_at(i, value)),
            Self::Host(h) => h.set_member(name, value),
            _ => false,
        }
    }
}

fn parse_index(name: &str) -> Option<usize> {
    if name.is_empty() || (name.len() > 1 && name.starts_with('0')) {
        return None;
    }
    name.parse().ok()
}

fn parse_number(text: &str) -> f64 {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        return u64::from_str_radix(hex, 16).map_or(f64::NAN, |n| n as f64);
    }
    match trimmed {
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        // Rust accepts "inf"/"nan" spellings that the template language does not.
        t if t.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') => f64::NAN,
        t => t.parse().unwrap_or(f64::NAN),
    }
}

/// Shortest round-trip rendering; integral values print without a fraction.
#[must_use]
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_owned()
    } else if n.is_infinite() {
        let label = if n > 0.0 { "Infinity" } else { "-Infinity" };
        label.to_owned()
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.same_value(other)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_display_string())
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => f.write_str("Undefined"),
            Self::Null => f.write_str("Null"),
            Self::Bool(b) => write!(f, "Bool({b})"),
            Self::Number(n) => write!(f, "Number({})", format_number(*n)),
            Self::Str(s) => write!(f, "Str({s:?})"),
            Self::Object(o) => write!(f, "{o:?}"),
            Self::Array(a) => write!(f, "{a:?}"),
            Self::Function(func) => write!(f, "{func:?}"),
            Self::Host(h) => write!(f, "Host({}#{})", h.type_name(), h.host_id()),
        }
    }
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Self::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(Rc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(Rc::from(s))
    }
}

impl From<Rc<str>> for Value {
    fn from(s: Rc<str>) -> Self {
        Self::Str(s)
    }
}

impl From<ObservableObject> for Value {
    fn from(o: ObservableObject) -> Self {
        Self::Object(o)
    }
}

impl From<ObservableArray> for Value {
    fn from(a: ObservableArray) -> Self {
        Self::Array(a)
    }
}

impl From<NativeFn> for Value {
    fn from(f: NativeFn) -> Self {
        Self::Function(f)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness() {
        assert!(!Value::Undefined.is_truthy());
        assert!(!Value::Null.is_truthy());
        assert!(!Value::from(0).is_truthy());
        assert!(!Value::Number(f64::NAN).is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(Value::from("0").is_truthy());
        assert!(Value::Object(ObservableObject::new()).is_truthy());
        assert!(Value::Array(ObservableArray::new()).is_truthy());
    }

    #[test]
    fn strict_and_loose_equality() {
        assert_eq!(Value::from(1), Value::from(1.0));
        assert_ne!(Value::Number(f64::NAN), Value::Number(f64::NAN));
        assert_ne!(Value::from(1), Value::from("1"));
        assert!(Value::from(1).loose_eq(&Value::from("1")));
        assert!(Value::Null.loose_eq(&Value::Undefined));
        assert!(!Value::Null.loose_eq(&Value::from(0)));
        assert!(Value::from(true).loose_eq(&Value::from(1)));
    }

    #[test]
    fn object_typed_values_always_change() {
        let obj = Value::Object(ObservableObject::new());
        assert!(Value::changed(&obj, &obj.clone()));
        assert!(!Value::changed(&Value::from("a"), &Value::from("a")));
        assert!(Value::changed(&Value::from("a"), &Value::from("b")));
        assert!(!Value::changed(&Value::Null, &Value::Null));
    }

    #[test]
    fn number_formatting() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(0.5), "0.5");
        assert_eq!(format_number(f64::INFINITY), "Infinity");
        assert_eq!(Value::Number(f64::NAN).to_display_string(), "NaN");
    }

    #[test]
    fn number_parsing() {
        assert_eq!(Value::from(" 42 ").to_number(), 42.0);
        assert_eq!(Value::from("").to_number(), 0.0);
        assert_eq!(Value::from("0x1f").to_number(), 31.0);
        assert!(Value::from("inf").to_number().is_nan());
        assert!(Value::from("abc").to_number().is_nan());
        assert_eq!(Value::from("1e3").to_number(), 1000.0);
    }

    #[test]
    fn array_display_joins_elements() {
        let arr = ObservableArray::from(vec![Value::from(1), Value::Null, Value::from("x")]);
        assert_eq!(Value::Array(arr).to_display_string(), "1,,x");
    }

    #[test]
    fn member_access_on_primitives() {
        assert_eq!(Value::from("héllo").get_member("length", None), Value::from(5));
        assert_eq!(Value::from("abc").get_member("1", None), Value::from("b"));
        assert_eq!(Value::from(3).get_member("x", None), Value::Undefined);
    }

    #[test]
    fn interpolation_string_drops_nullish() {
        assert_eq!(Value::Undefined.to_interpolation_string(), "");
        assert_eq!(Value::Null.to_interpolation_string(), "");
        assert_eq!(Value::from(false).to_interpolation_string(), "false");
    }

    #[test]
    fn bound_functions_compare_by_owner_and_name() {
        let a = NativeFn::bound(7, "go", |_| Value::Undefined);
        let b = NativeFn::bound(7, "go", |_| Value::from(1));
        let c = NativeFn::new("go", |_| Value::Undefined);
        assert!(a.same(&b));
        assert!(!a.same(&c));
        assert_eq!(b.call(&[]), Value::from(1));
    }
}
