#![forbid(unsafe_code)]

//! Compiled expression handles.

use std::fmt;
use std::rc::Rc;

use vireo_core::Value;

use crate::compile::{Place, Thunk, write_member};
use crate::context::EvalContext;
use crate::error::{EvalError, ParseError};

/// How an expression text was compiled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExprKind {
    /// Yields the value of its last statement (none if it ends with `;`).
    Getter,
    /// Evaluated for its effects; always yields `Undefined`.
    Statement,
    /// `{{ }}` template producing a string.
    Interpolation,
    /// A host-registered native getter.
    Native,
}

/// A memoized, callable expression.
///
/// Invalid sources compile to a getter that always yields `Undefined`; the
/// parse error stays available through [`CompiledExpr::error`].
pub struct CompiledExpr {
    source: Rc<str>,
    kind: ExprKind,
    eval: Thunk,
    identifiers: Vec<String>,
    error: Option<ParseError>,
}

impl fmt::Debug for CompiledExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledExpr")
            .field("source", &self.source)
            .field("kind", &self.kind)
            .field("identifiers", &self.identifiers)
            .field("error", &self.error)
            .finish()
    }
}

impl CompiledExpr {
    pub(crate) fn new(
        source: &str,
        kind: ExprKind,
        eval: Thunk,
        identifiers: Vec<String>,
    ) -> Self {
        Self {
            source: Rc::from(source),
            kind,
            eval,
            identifiers,
            error: None,
        }
    }

    pub(crate) fn invalid(source: &str, kind: ExprKind, error: ParseError) -> Self {
        Self {
            source: Rc::from(source),
            kind,
            eval: Box::new(|_| Ok(Value::Undefined)),
            identifiers: Vec::new(),
            error: Some(error),
        }
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub fn kind(&self) -> ExprKind {
        self.kind
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.error.is_none()
    }

    #[must_use]
    pub fn error(&self) -> Option<&ParseError> {
        self.error.as_ref()
    }

    /// Free identifiers, resolved against the scope at evaluation time.
    #[must_use]
    pub fn identifiers(&self) -> &[String] {
        &self.identifiers
    }

    /// Evaluate, surfacing runtime errors.
    pub fn evaluate(&self, ctx: &EvalContext<'_>) -> Result<Value, EvalError> {
        (self.eval)(ctx)
    }

    /// Evaluate, degrading runtime errors to `Undefined`.
    pub fn call(&self, ctx: &EvalContext<'_>) -> Value {
        match (self.eval)(ctx) {
            Ok(value) => value,
            Err(error) => {
                tracing::debug!(
                    target: "vireo::expr",
                    expression = %self.source,
                    %error,
                    "expression evaluation failed"
                );
                Value::Undefined
            }
        }
    }
}

/// Writes a value through an assignable expression such as `user.name`.
pub struct CompiledSetter {
    source: Rc<str>,
    place: Place,
}

impl fmt::Debug for CompiledSetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledSetter")
            .field("source", &self.source)
            .finish()
    }
}

impl CompiledSetter {
    pub(crate) fn new(source: &str, place: Place) -> Self {
        Self {
            source: Rc::from(source),
            place,
        }
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Assign, surfacing runtime errors.
    pub fn try_assign(&self, ctx: &EvalContext<'_>, value: Value) -> Result<(), EvalError> {
        let (base, key) = (self.place)(ctx)?;
        write_member(&base, &key, value)
    }

    /// Assign, logging and swallowing runtime errors. Returns success.
    pub fn assign(&self, ctx: &EvalContext<'_>, value: Value) -> bool {
        match self.try_assign(ctx, value) {
            Ok(()) => true,
            Err(error) => {
                tracing::debug!(
                    target: "vireo::expr",
                    expression = %self.source,
                    %error,
                    "assignment failed"
                );
                false
            }
        }
    }
}
