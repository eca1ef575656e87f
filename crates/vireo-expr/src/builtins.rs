#![forbid(unsafe_code)]

//! Built-in methods on primitive receivers.

use vireo_core::{NativeFn, Value, format_number};

/// Resolve a built-in method of `receiver`, bound to it.
pub(crate) fn method(receiver: &Value, name: &str) -> Option<Value> {
    let f = match (receiver, name) {
        (Value::Str(s), "toUpperCase") => {
            let s = s.clone();
            NativeFn::new(name, move |_| Value::from(s.to_uppercase()))
        }
        (Value::Str(s), "toLowerCase") => {
            let s = s.clone();
            NativeFn::new(name, move |_| Value::from(s.to_lowercase()))
        }
        (Value::Str(s), "trim") => {
            let s = s.clone();
            NativeFn::new(name, move |_| Value::from(s.trim()))
        }
        (Value::Str(s), "indexOf") => {
            let s = s.clone();
            NativeFn::new(name, move |args| {
                let needle = arg(args, 0).to_display_string();
                s.find(&needle).map_or(Value::from(-1), |byte| {
                    Value::from(s[..byte].chars().count())
                })
            })
        }
        (Value::Str(s), "includes") => {
            let s = s.clone();
            NativeFn::new(name, move |args| {
                Value::from(s.contains(&arg(args, 0).to_display_string()))
            })
        }
        (Value::Array(a), "indexOf") => {
            let a = a.clone();
            NativeFn::new(name, move |args| {
                a.index_of(&arg(args, 0))
                    .map_or(Value::from(-1), Value::from)
            })
        }
        (Value::Array(a), "includes") => {
            let a = a.clone();
            NativeFn::new(name, move |args| Value::from(a.contains(&arg(args, 0))))
        }
        (Value::Array(a), "join") => {
            let a = a.clone();
            NativeFn::new(name, move |args| {
                let sep = match arg(args, 0) {
                    Value::Undefined => ",".to_owned(),
                    other => other.to_display_string(),
                };
                let parts: Vec<String> = a
                    .to_vec()
                    .iter()
                    .map(Value::to_interpolation_string)
                    .collect();
                Value::from(parts.join(&sep))
            })
        }
        (Value::Number(n), "toFixed") => {
            let n = *n;
            NativeFn::new(name, move |args| {
                let digits = arg(args, 0).to_number();
                let digits = if digits.is_nan() {
                    0
                } else {
                    digits.clamp(0.0, 100.0) as usize
                };
                if n.is_finite() {
                    Value::from(format!("{n:.digits$}"))
                } else {
                    Value::from(format_number(n))
                }
            })
        }
        _ => return None,
    };
    Some(Value::Function(f))
}

fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or_default()
}
