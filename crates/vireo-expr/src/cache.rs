#![forbid(unsafe_code)]

//! Process-wide memoization of compiled expressions.
//!
//! Compilation results are cached per thread (values are `Rc`-based and
//! the engine is single-threaded) and keyed by raw expression text and
//! compilation kind. Failed compilations are cached as well, so a broken
//! expression is reported once rather than on every binding.

use std::cell::RefCell;
use std::rc::Rc;

use ahash::AHashMap;
use vireo_core::Value;

use crate::compile::{compile_place, compile_program};
use crate::compiled::{CompiledExpr, CompiledSetter, ExprKind};
use crate::context::EvalContext;
use crate::error::ParseError;
use crate::interpolation::{compile_template, normalize};
use crate::parser::{parse_expression, parse_program};

#[derive(Default)]
struct ExprCache {
    compiled: AHashMap<(ExprKind, String), Rc<CompiledExpr>>,
    natives: AHashMap<String, Rc<CompiledExpr>>,
    setters: AHashMap<String, Option<Rc<CompiledSetter>>>,
}

thread_local! {
    static CACHE: RefCell<ExprCache> = RefCell::new(ExprCache::default());
}

fn cached(kind: ExprKind, text: &str) -> Option<Rc<CompiledExpr>> {
    CACHE.with(|cache| {
        let cache = cache.borrow();
        cache
            .natives
            .get(text)
            .or_else(|| cache.compiled.get(&(kind, text.to_owned())))
            .cloned()
    })
}

fn store(kind: ExprKind, text: &str, compiled: CompiledExpr) -> Rc<CompiledExpr> {
    let compiled = Rc::new(compiled);
    CACHE.with(|cache| {
        cache
            .borrow_mut()
            .compiled
            .insert((kind, text.to_owned()), Rc::clone(&compiled));
    });
    compiled
}

fn report(kind: ExprKind, text: &str, error: &ParseError) {
    tracing::error!(
        target: "vireo::expr",
        expression = text,
        ?kind,
        %error,
        "failed to compile expression"
    );
}

fn build(kind: ExprKind, text: &str) -> Result<CompiledExpr, ParseError> {
    if kind == ExprKind::Interpolation {
        let (thunk, identifiers) = compile_template(text)?;
        return Ok(CompiledExpr::new(text, kind, thunk, identifiers));
    }
    let mut program = parse_program(&normalize(text))?;
    if kind == ExprKind::Statement {
        program.is_statement = true;
    }
    let mut identifiers = Vec::new();
    for statement in &program.statements {
        statement.collect_identifiers(&mut identifiers);
    }
    Ok(CompiledExpr::new(
        text,
        kind,
        compile_program(&program),
        identifiers,
    ))
}

fn compile_kind(kind: ExprKind, text: &str) -> Rc<CompiledExpr> {
    if let Some(hit) = cached(kind, text) {
        return hit;
    }
    let compiled = build(kind, text).unwrap_or_else(|error| {
        report(kind, text, &error);
        CompiledExpr::invalid(text, kind, error)
    });
    store(kind, text, compiled)
}

fn try_compile_kind(kind: ExprKind, text: &str) -> Result<Rc<CompiledExpr>, ParseError> {
    let compiled = compile_kind(kind, text);
    match compiled.error() {
        Some(error) => Err(error.clone()),
        None => Ok(compiled),
    }
}

/// Compile a getter expression. Never fails: invalid text yields a getter
/// returning `Undefined` and logs the parse error.
#[must_use]
pub fn compile(text: &str) -> Rc<CompiledExpr> {
    compile_kind(ExprKind::Getter, text)
}

/// Strict variant of [`compile`].
pub fn try_compile(text: &str) -> Result<Rc<CompiledExpr>, ParseError> {
    try_compile_kind(ExprKind::Getter, text)
}

/// Compile an event-handler statement list.
#[must_use]
pub fn compile_statement(text: &str) -> Rc<CompiledExpr> {
    compile_kind(ExprKind::Statement, text)
}

/// Compile a `{{ }}` template.
#[must_use]
pub fn compile_interpolation(text: &str) -> Rc<CompiledExpr> {
    compile_kind(ExprKind::Interpolation, text)
}

/// Strict variant of [`compile_interpolation`].
pub fn try_compile_interpolation(text: &str) -> Result<Rc<CompiledExpr>, ParseError> {
    try_compile_kind(ExprKind::Interpolation, text)
}

/// Compile an assignable expression (`name`, `a.b`, `list[i]`) into a
/// setter. Returns `None`, after logging, when the text is not assignable.
#[must_use]
pub fn compile_setter(text: &str) -> Option<Rc<CompiledSetter>> {
    if let Some(hit) = CACHE.with(|cache| cache.borrow().setters.get(text).cloned()) {
        return hit;
    }
    let setter = match parse_expression(&normalize(text)) {
        Ok(expr) if expr.is_assignable() => {
            Some(Rc::new(CompiledSetter::new(text, compile_place(&expr))))
        }
        Ok(_) => {
            tracing::warn!(target: "vireo::expr", expression = text, "expression is not assignable");
            None
        }
        Err(error) => {
            report(ExprKind::Getter, text, &error);
            None
        }
    };
    CACHE.with(|cache| {
        cache
            .borrow_mut()
            .setters
            .insert(text.to_owned(), setter.clone());
    });
    setter
}

/// Register a native getter under `text`. It takes precedence over parsing
/// for every compilation kind.
pub fn register_native(text: &str, getter: impl Fn(&EvalContext<'_>) -> Value + 'static) {
    let compiled = CompiledExpr::new(
        text,
        ExprKind::Native,
        Box::new(move |ctx| Ok(getter(ctx))),
        Vec::new(),
    );
    CACHE.with(|cache| {
        cache
            .borrow_mut()
            .natives
            .insert(text.to_owned(), Rc::new(compiled));
    });
}

/// Number of cached compilations on this thread.
#[must_use]
pub fn cache_len() -> usize {
    CACHE.with(|cache| {
        let cache = cache.borrow();
        cache.compiled.len() + cache.natives.len() + cache.setters.len()
    })
}

/// Drop every cached compilation on this thread.
pub fn clear_cache() {
    CACHE.with(|cache| *cache.borrow_mut() = ExprCache::default());
}

#[cfg(test)]
mod tests {
    use super::*;
    use vireo_core::ObservableObject;

    fn scope() -> Value {
        Value::Object(ObservableObject::from_entries([("n", Value::from(4))]))
    }

    #[test]
    fn compilation_is_memoized_by_text() {
        let a = compile("n + 1");
        let b = compile("n + 1");
        assert!(Rc::ptr_eq(&a, &b));
        let statement = compile_statement("n + 1");
        assert!(!Rc::ptr_eq(&a, &statement));
    }

    #[test]
    fn invalid_expressions_fail_softly() {
        let broken = compile("n +");
        assert!(!broken.is_valid());
        assert_eq!(broken.call(&EvalContext::new(scope())), Value::Undefined);
        assert!(try_compile("n +").is_err());
        assert!(Rc::ptr_eq(&broken, &compile("n +")));
    }

    #[test]
    fn statements_yield_nothing() {
        let s = scope();
        let ctx = EvalContext::new(s.clone());
        assert_eq!(compile_statement("n = n * 2").call(&ctx), Value::Undefined);
        assert_eq!(s.get_member("n", None), Value::from(8));
        assert_eq!(compile("n;").call(&ctx), Value::Undefined);
    }

    #[test]
    fn setters_write_paths() {
        let s = Value::Object(ObservableObject::from_entries([(
            "user",
            Value::Object(ObservableObject::from_entries([("name", "a")])),
        )]));
        let ctx = EvalContext::new(s.clone());
        let setter = compile_setter("user.name");
        assert!(setter.is_some_and(|setter| setter.assign(&ctx, Value::from("b"))));
        assert_eq!(
            s.get_member("user", None).get_member("name", None),
            Value::from("b")
        );
        assert!(compile_setter("a + b").is_none());
    }

    #[test]
    fn natives_take_precedence() {
        register_native("magic()", |_| Value::from(42));
        assert_eq!(compile("magic()").kind(), ExprKind::Native);
        assert_eq!(
            compile("magic()").call(&EvalContext::new(Value::Undefined)),
            Value::from(42)
        );
    }

    #[test]
    fn clear_resets_the_cache() {
        let _ = compile("n * 3");
        assert!(cache_len() > 0);
        clear_cache();
        assert_eq!(cache_len(), 0);
    }
}
