#![forbid(unsafe_code)]

//! Lowering of syntax trees into closures.
//!
//! Every node becomes a boxed closure over its compiled children, so
//! evaluation never re-inspects the tree. Reads go through
//! [`Value::get_member`] with the context's tracker, which is what makes
//! watcher dependencies exact.

use std::cmp::Ordering;

use vireo_core::{ObservableArray, ObservableObject, Value, format_number};

use crate::ast::{AssignOp, BinaryOp, Expr, Literal, LogicalOp, Program, Reserved, UnaryOp};
use crate::builtins;
use crate::context::EvalContext;
use crate::error::EvalError;

pub(crate) type Thunk = Box<dyn Fn(&EvalContext<'_>) -> Result<Value, EvalError>>;

/// Resolves an assignment target to `(receiver, key)`.
pub(crate) type Place = Box<dyn Fn(&EvalContext<'_>) -> Result<(Value, String), EvalError>>;

pub(crate) fn compile_program(program: &Program) -> Thunk {
    let statements: Vec<Thunk> = program.statements.iter().map(compile_expr).collect();
    let is_statement = program.is_statement;
    Box::new(move |ctx| {
        let mut last = Value::Undefined;
        for statement in &statements {
            last = statement(ctx)?;
        }
        Ok(if is_statement { Value::Undefined } else { last })
    })
}

pub(crate) fn compile_expr(expr: &Expr) -> Thunk {
    match expr {
        Expr::Literal(literal) => {
            let value = literal_value(literal);
            Box::new(move |_| Ok(value.clone()))
        }
        Expr::Ident(name) => {
            let name = name.clone();
            Box::new(move |ctx| Ok(ctx.scope().get_member(&name, ctx.tracker())))
        }
        Expr::Reserved(reserved) => {
            let reserved = *reserved;
            Box::new(move |ctx| {
                Ok(match reserved {
                    Reserved::This => ctx.scope().clone(),
                    Reserved::Event => ctx.event().clone(),
                    Reserved::Element => ctx.element().clone(),
                    Reserved::Global => ctx.global().clone(),
                })
            })
        }
        Expr::Member { object, property } => {
            let object = compile_expr(object);
            let property = property.clone();
            Box::new(move |ctx| read_member(&object(ctx)?, &property, ctx))
        }
        Expr::Index { object, index } => {
            let object = compile_expr(object);
            let index = compile_expr(index);
            Box::new(move |ctx| {
                let base = object(ctx)?;
                let key = property_key(&index(ctx)?);
                read_member(&base, &key, ctx)
            })
        }
        Expr::Call { callee, args } => compile_call(callee, args),
        Expr::Unary { op, operand } => {
            let op = *op;
            let operand = compile_expr(operand);
            Box::new(move |ctx| Ok(unary(op, &operand(ctx)?)))
        }
        Expr::Binary { op, left, right } => {
            let op = *op;
            let left = compile_expr(left);
            let right = compile_expr(right);
            Box::new(move |ctx| {
                let l = left(ctx)?;
                let r = right(ctx)?;
                Ok(binary(op, &l, &r))
            })
        }
        Expr::Logical { op, left, right } => {
            let op = *op;
            let left = compile_expr(left);
            let right = compile_expr(right);
            Box::new(move |ctx| {
                let l = left(ctx)?;
                match (op, l.is_truthy()) {
                    (LogicalOp::And, false) | (LogicalOp::Or, true) => Ok(l),
                    _ => right(ctx),
                }
            })
        }
        Expr::Conditional {
            test,
            consequent,
            alternate,
        } => {
            let test = compile_expr(test);
            let consequent = compile_expr(consequent);
            let alternate = compile_expr(alternate);
            Box::new(move |ctx| {
                if test(ctx)?.is_truthy() {
                    consequent(ctx)
                } else {
                    alternate(ctx)
                }
            })
        }
        Expr::Assign { op, target, value } => {
            let op = *op;
            let place = compile_place(target);
            let value = compile_expr(value);
            Box::new(move |ctx| {
                let (base, key) = place(ctx)?;
                let rhs = value(ctx)?;
                let new = match op {
                    AssignOp::Assign => rhs,
                    AssignOp::Compound(bop) => binary(bop, &read_member(&base, &key, ctx)?, &rhs),
                };
                write_member(&base, &key, new.clone())?;
                Ok(new)
            })
        }
        Expr::Array(items) => {
            let items: Vec<Thunk> = items.iter().map(compile_expr).collect();
            Box::new(move |ctx| {
                let values = items
                    .iter()
                    .map(|item| item(ctx))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::Array(ObservableArray::from(values)))
            })
        }
        Expr::Object(entries) => {
            let entries: Vec<(String, Thunk)> = entries
                .iter()
                .map(|(key, value)| (key.clone(), compile_expr(value)))
                .collect();
            Box::new(move |ctx| {
                let object = ObservableObject::new();
                for (key, value) in &entries {
                    object.observe_property(key, value(ctx)?);
                }
                Ok(Value::Object(object))
            })
        }
    }
}

fn compile_call(callee: &Expr, args: &[Expr]) -> Thunk {
    let label = describe(callee);
    let callee = compile_expr(callee);
    let args: Vec<Thunk> = args.iter().map(compile_expr).collect();
    Box::new(move |ctx| {
        let Value::Function(f) = callee(ctx)? else {
            return Err(EvalError::NotCallable {
                callee: label.clone(),
            });
        };
        let args = args
            .iter()
            .map(|arg| arg(ctx))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(f.call(&args))
    })
}

/// Compile an assignable expression into a [`Place`].
pub(crate) fn compile_place(target: &Expr) -> Place {
    match target {
        Expr::Ident(name) => {
            let name = name.clone();
            Box::new(move |ctx| Ok((ctx.scope().clone(), name.clone())))
        }
        Expr::Member { object, property } => {
            let object = compile_expr(object);
            let property = property.clone();
            Box::new(move |ctx| Ok((object(ctx)?, property.clone())))
        }
        Expr::Index { object, index } => {
            let object = compile_expr(object);
            let index = compile_expr(index);
            Box::new(move |ctx| {
                let base = object(ctx)?;
                Ok((base, property_key(&index(ctx)?)))
            })
        }
        other => {
            let target = describe(other);
            Box::new(move |_| {
                Err(EvalError::RejectedAssignment {
                    target: target.clone(),
                })
            })
        }
    }
}

fn describe(expr: &Expr) -> String {
    match expr {
        Expr::Ident(name) => name.clone(),
        Expr::Member { object, property } => format!("{}.{property}", describe(object)),
        Expr::Index { object, .. } => format!("{}[..]", describe(object)),
        Expr::Reserved(Reserved::This) => "this".to_owned(),
        Expr::Reserved(Reserved::Event) => "$event".to_owned(),
        Expr::Reserved(Reserved::Element) => "$element".to_owned(),
        Expr::Reserved(Reserved::Global) => "$global".to_owned(),
        _ => "expression".to_owned(),
    }
}

fn literal_value(literal: &Literal) -> Value {
    match literal {
        Literal::Undefined => Value::Undefined,
        Literal::Null => Value::Null,
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Number(n) => Value::Number(*n),
        Literal::Str(s) => Value::Str(s.clone()),
    }
}

fn nullish_label(value: &Value) -> &'static str {
    if matches!(value, Value::Null) {
        "null"
    } else {
        "undefined"
    }
}

fn property_key(value: &Value) -> String {
    match value {
        Value::Number(n) => format_number(*n),
        other => other.to_display_string(),
    }
}

pub(crate) fn read_member(
    base: &Value,
    name: &str,
    ctx: &EvalContext<'_>,
) -> Result<Value, EvalError> {
    if base.is_nullish() {
        return Err(EvalError::ReadOfNullish {
            property: name.to_owned(),
            base: nullish_label(base),
        });
    }
    let value = base.get_member(name, ctx.tracker());
    if matches!(value, Value::Undefined)
        && let Some(method) = builtins::method(base, name)
    {
        return Ok(method);
    }
    Ok(value)
}

pub(crate) fn write_member(base: &Value, name: &str, value: Value) -> Result<(), EvalError> {
    if base.is_nullish() {
        return Err(EvalError::WriteToNullish {
            property: name.to_owned(),
            base: nullish_label(base),
        });
    }
    if base.set_member(name, value) {
        Ok(())
    } else {
        Err(EvalError::RejectedAssignment {
            target: name.to_owned(),
        })
    }
}

fn unary(op: UnaryOp, value: &Value) -> Value {
    match op {
        UnaryOp::Not => Value::Bool(!value.is_truthy()),
        UnaryOp::Neg => Value::Number(-value.to_number()),
        UnaryOp::Plus => Value::Number(value.to_number()),
        UnaryOp::TypeOf => Value::from(value.type_of()),
    }
}

pub(crate) fn binary(op: BinaryOp, l: &Value, r: &Value) -> Value {
    match op {
        BinaryOp::Add => {
            let concat = |v: &Value| matches!(v, Value::Str(_)) || v.is_object_like();
            if concat(l) || concat(r) {
                Value::from(format!("{}{}", l.to_display_string(), r.to_display_string()))
            } else {
                Value::Number(l.to_number() + r.to_number())
            }
        }
        BinaryOp::Sub => Value::Number(l.to_number() - r.to_number()),
        BinaryOp::Mul => Value::Number(l.to_number() * r.to_number()),
        BinaryOp::Div => Value::Number(l.to_number() / r.to_number()),
        BinaryOp::Rem => Value::Number(l.to_number() % r.to_number()),
        BinaryOp::Lt => Value::Bool(compare(l, r) == Some(Ordering::Less)),
        BinaryOp::Le => Value::Bool(matches!(
            compare(l, r),
            Some(Ordering::Less | Ordering::Equal)
        )),
        BinaryOp::Gt => Value::Bool(compare(l, r) == Some(Ordering::Greater)),
        BinaryOp::Ge => Value::Bool(matches!(
            compare(l, r),
            Some(Ordering::Greater | Ordering::Equal)
        )),
        BinaryOp::Eq => Value::Bool(l.loose_eq(r)),
        BinaryOp::NotEq => Value::Bool(!l.loose_eq(r)),
        BinaryOp::StrictEq => Value::Bool(l.same_value(r)),
        BinaryOp::StrictNotEq => Value::Bool(!l.same_value(r)),
    }
}

fn compare(l: &Value, r: &Value) -> Option<Ordering> {
    match (l, r) {
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        _ => l.to_number().partial_cmp(&r.to_number()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_program;

    fn eval_in(scope: &Value, source: &str) -> Result<Value, EvalError> {
        let program = parse_program(source).map_err(|e| EvalError::NotCallable {
            callee: e.to_string(),
        })?;
        let thunk = compile_program(&program);
        thunk(&EvalContext::new(scope.clone()))
    }

    fn scope() -> Value {
        Value::Object(ObservableObject::from_entries([
            ("a", Value::from(2)),
            ("b", Value::from(3)),
            ("name", Value::from("Ada")),
            ("list", Value::Array(ObservableArray::from(vec![Value::from(1), Value::from(2)]))),
        ]))
    }

    #[test]
    fn arithmetic_and_concatenation() {
        let s = scope();
        assert_eq!(eval_in(&s, "a * b + 1"), Ok(Value::from(7)));
        assert_eq!(eval_in(&s, "'x' + a"), Ok(Value::from("x2")));
        assert_eq!(eval_in(&s, "7 % 4"), Ok(Value::from(3)));
        assert_eq!(eval_in(&s, "list + ''"), Ok(Value::from("1,2")));
    }

    #[test]
    fn comparisons_and_logic() {
        let s = scope();
        assert_eq!(eval_in(&s, "a < b && b >= 3"), Ok(Value::from(true)));
        assert_eq!(eval_in(&s, "missing || 'fallback'"), Ok(Value::from("fallback")));
        assert_eq!(eval_in(&s, "a == '2'"), Ok(Value::from(true)));
        assert_eq!(eval_in(&s, "a === '2'"), Ok(Value::from(false)));
        assert_eq!(eval_in(&s, "'b' > 'a'"), Ok(Value::from(true)));
        assert_eq!(eval_in(&s, "a > b ? 'big' : 'small'"), Ok(Value::from("small")));
    }

    #[test]
    fn assignment_writes_back_to_scope() {
        let s = scope();
        assert_eq!(eval_in(&s, "a = a + 10"), Ok(Value::from(12)));
        assert_eq!(eval_in(&s, "a += 1; a"), Ok(Value::from(13)));
        assert_eq!(eval_in(&s, "list[0] = 'z';"), Ok(Value::Undefined));
        assert_eq!(s.get_member("list", None).get_member("0", None), Value::from("z"));
    }

    #[test]
    fn far_index_writes_are_rejected() {
        let s = scope();
        for source in ["list[1e18] = 1", "list[18446744073709551615] = 1"] {
            assert!(
                matches!(eval_in(&s, source), Err(EvalError::RejectedAssignment { .. })),
                "{source}"
            );
        }
        assert_eq!(eval_in(&s, "list.length"), Ok(Value::from(2)));
    }

    #[test]
    fn builtins_and_lengths() {
        let s = scope();
        assert_eq!(eval_in(&s, "name.toUpperCase()"), Ok(Value::from("ADA")));
        assert_eq!(eval_in(&s, "list.length"), Ok(Value::from(2)));
        assert_eq!(eval_in(&s, "list.join('-')"), Ok(Value::from("1-2")));
        assert_eq!(eval_in(&s, "list.indexOf(2)"), Ok(Value::from(1)));
        assert_eq!(eval_in(&s, "(1/3).toFixed(2)"), Ok(Value::from("0.33")));
        assert_eq!(eval_in(&s, "typeof name"), Ok(Value::from("string")));
    }

    #[test]
    fn runtime_errors() {
        let s = scope();
        assert_eq!(
            eval_in(&s, "missing.deep"),
            Err(EvalError::ReadOfNullish {
                property: "deep".into(),
                base: "undefined"
            })
        );
        assert_eq!(
            eval_in(&s, "name.nope()"),
            Err(EvalError::NotCallable {
                callee: "name.nope".into()
            })
        );
        assert!(matches!(
            eval_in(&s, "name.x = 1"),
            Err(EvalError::RejectedAssignment { .. })
        ));
    }

    #[test]
    fn object_literals_read_values_not_keys() {
        let s = scope();
        let value = eval_in(&s, "{ a: b, name }");
        let object = value.ok().and_then(|v| v.as_object().cloned());
        assert!(object.is_some());
        if let Some(object) = object {
            assert_eq!(object.get("a"), Value::from(3));
            assert_eq!(object.get("name"), Value::from("Ada"));
        }
    }
}
