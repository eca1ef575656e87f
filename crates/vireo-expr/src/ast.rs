#![forbid(unsafe_code)]

//! Expression syntax tree.

use std::rc::Rc;

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(Rc<str>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
    TypeOf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

/// `=` or a compound assignment carrying its arithmetic operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Compound(BinaryOp),
}

/// Names that are never resolved against the scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reserved {
    This,
    Event,
    Element,
    Global,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    /// A free identifier, resolved as a member of the scope.
    Ident(String),
    Reserved(Reserved),
    Member {
        object: Box<Expr>,
        property: String,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },
    Assign {
        op: AssignOp,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Array(Vec<Expr>),
    Object(Vec<(String, Expr)>),
}

impl Expr {
    /// Whether this node may appear on the left of an assignment.
    #[must_use]
    pub fn is_assignable(&self) -> bool {
        matches!(self, Self::Ident(_) | Self::Member { .. } | Self::Index { .. })
    }

    /// Free identifiers in first-occurrence order.
    pub fn collect_identifiers(&self, out: &mut Vec<String>) {
        match self {
            Self::Ident(name) => {
                if !out.iter().any(|n| n == name) {
                    out.push(name.clone());
                }
            }
            Self::Literal(_) | Self::Reserved(_) => {}
            Self::Member { object, .. } => object.collect_identifiers(out),
            Self::Index { object, index } => {
                object.collect_identifiers(out);
                index.collect_identifiers(out);
            }
            Self::Call { callee, args } => {
                callee.collect_identifiers(out);
                for arg in args {
                    arg.collect_identifiers(out);
                }
            }
            Self::Unary { operand, .. } => operand.collect_identifiers(out),
            Self::Binary { left, right, .. } | Self::Logical { left, right, .. } => {
                left.collect_identifiers(out);
                right.collect_identifiers(out);
            }
            Self::Conditional {
                test,
                consequent,
                alternate,
            } => {
                test.collect_identifiers(out);
                consequent.collect_identifiers(out);
                alternate.collect_identifiers(out);
            }
            Self::Assign { target, value, .. } => {
                target.collect_identifiers(out);
                value.collect_identifiers(out);
            }
            Self::Array(items) => {
                for item in items {
                    item.collect_identifiers(out);
                }
            }
            Self::Object(entries) => {
                for (_, value) in entries {
                    value.collect_identifiers(out);
                }
            }
        }
    }
}

/// A `;`-separated statement list.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub statements: Vec<Expr>,
    /// The source ended with `;`: the program yields no value.
    pub is_statement: bool,
}
