#![forbid(unsafe_code)]

//! Template expression compiler for Vireo.
//!
//! Expressions are written in a small scripting subset and compiled to
//! closures evaluated against an [`EvalContext`]. Bare identifiers resolve
//! as members of the context's scope (normally a component); `this`,
//! `$event`, `$element`, and `$global` are provided by the caller.
//!
//! ```ignore
//! use vireo_core::{ObservableObject, Value};
//! use vireo_expr::{EvalContext, compile, compile_interpolation};
//!
//! let scope = Value::Object(ObservableObject::from_entries([("name", "Ada")]));
//! let ctx = EvalContext::new(scope);
//! assert_eq!(compile("name.length").call(&ctx), Value::from(3));
//! assert_eq!(
//!     compile_interpolation("Hi {{ name }}!").call(&ctx),
//!     Value::from("Hi Ada!")
//! );
//! ```
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Parse error | Malformed text | Logged at `error`; getter yields `Undefined` |
//! | Runtime error | Member of `undefined`, non-callable call | Logged at `debug`; yields `Undefined` |
//! | Unsupported keyword | `new`, `function`, ... | Parse error |

pub mod ast;
mod builtins;
mod cache;
mod compile;
mod compiled;
mod context;
pub mod error;
mod interpolation;
pub mod lexer;
pub mod parser;

pub use cache::{
    cache_len, clear_cache, compile, compile_interpolation, compile_setter, compile_statement,
    register_native, try_compile, try_compile_interpolation,
};
pub use compiled::{CompiledExpr, CompiledSetter, ExprKind};
pub use context::EvalContext;
pub use error::{EvalError, ExprError, ParseError, Result};
pub use interpolation::has_interpolation;

/// Compile `text` as an interpolation if it contains `{{ }}`, otherwise as a
/// getter.
#[must_use]
pub fn compile_auto(text: &str) -> std::rc::Rc<CompiledExpr> {
    if has_interpolation(text) {
        compile_interpolation(text)
    } else {
        compile(text)
    }
}
