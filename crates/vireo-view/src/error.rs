#![forbid(unsafe_code)]

//! Errors of the strict view entry points.
//!
//! Binding itself never fails: these surface only from helpers such as
//! [`parse_for_expression`](crate::parse_for_expression) and
//! [`Registry::try_template`](crate::Registry::try_template). The soft
//! paths log the same conditions and skip the offending binding.

/// A configuration problem in a template or registry lookup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ViewError {
    #[error("invalid loop syntax `{expression}`")]
    MalformedLoop { expression: String },
    #[error("template `{name}` not found")]
    UnknownTemplate { name: String },
    #[error("component `{name}` not found")]
    UnknownComponent { name: String },
    #[error("unknown directive `{name}`")]
    UnknownDirective { name: String },
}

pub type Result<T> = std::result::Result<T, ViewError>;
