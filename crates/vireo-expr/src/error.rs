#![forbid(unsafe_code)]

//! Expression errors.

use thiserror::Error;

/// A template expression could not be compiled.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("empty expression")]
    Empty,

    #[error("unexpected character {found:?} at offset {offset}")]
    UnexpectedChar { found: char, offset: usize },

    #[error("unterminated string literal starting at offset {offset}")]
    UnterminatedString { offset: usize },

    #[error("invalid number literal {text:?} at offset {offset}")]
    InvalidNumber { text: String, offset: usize },

    #[error("unexpected {found} at offset {offset}, expected {expected}")]
    UnexpectedToken {
        found: String,
        expected: &'static str,
        offset: usize,
    },

    #[error("unexpected end of expression, expected {expected}")]
    UnexpectedEnd { expected: &'static str },

    #[error("unsupported keyword `{keyword}` at offset {offset}")]
    UnsupportedKeyword { keyword: String, offset: usize },

    #[error("invalid assignment target at offset {offset}")]
    InvalidAssignmentTarget { offset: usize },

    #[error("expression nested deeper than {limit} levels")]
    TooDeep { limit: usize },
}

/// A compiled expression failed while evaluating.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("cannot read property `{property}` of {base}")]
    ReadOfNullish {
        property: String,
        base: &'static str,
    },

    #[error("cannot set property `{property}` of {base}")]
    WriteToNullish {
        property: String,
        base: &'static str,
    },

    #[error("`{callee}` is not a function")]
    NotCallable { callee: String },

    #[error("assignment to `{target}` was rejected")]
    RejectedAssignment { target: String },
}

/// Either kind of expression error.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExprError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Eval(#[from] EvalError),
}

pub type Result<T> = std::result::Result<T, ExprError>;
