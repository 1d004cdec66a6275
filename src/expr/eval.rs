//! Tree-walking evaluator over the condition AST.

use super::ast::{BinaryOp, Expr, UnaryOp};
use super::context::EvalContext;
use super::error::{EvaluationError, EvaluationErrorKind, Result};
use crate::value::Value;

/// Intermediate evaluation result. `Undefined` is distinct from the `Null`
/// literal: it only arises from a path that doesn't resolve, and per the
/// grammar it compares equal to nothing and collapses to `false` wherever a
/// boolean is expected.
#[derive(Debug, Clone, PartialEq)]
enum EvalValue {
    Undefined,
    Value(Value),
}

impl EvalValue {
    fn truthy(&self) -> bool {
        match self {
            EvalValue::Undefined => false,
            EvalValue::Value(v) => v.as_bool().unwrap_or(false),
        }
    }
}

/// Evaluate a compiled expression against a binding context, returning the
/// final boolean. A non-boolean final value is a `TypeMismatch`; an
/// undefined final value (e.g. a bare unresolved path) is `false`, not an
/// error, per the undefined-propagation rule.
pub fn evaluate(expr: &Expr, ctx: &EvalContext<'_>) -> Result<bool> {
    match eval(expr, ctx)? {
        EvalValue::Undefined => Ok(false),
        EvalValue::Value(Value::Bool(b)) => Ok(b),
        EvalValue::Value(other) => Err(EvaluationError::new(
            EvaluationErrorKind::TypeMismatch,
            format!("condition must evaluate to a boolean, got {other}"),
        )),
    }
}

fn eval(expr: &Expr, ctx: &EvalContext<'_>) -> Result<EvalValue> {
    match expr {
        Expr::Literal(v) => Ok(EvalValue::Value(v.clone())),
        Expr::Path(segments) => Ok(match ctx.resolve(segments) {
            Some(v) => EvalValue::Value(v.clone()),
            None => EvalValue::Undefined,
        }),
        Expr::Unary { op: UnaryOp::Not, inner } => {
            let v = eval(inner, ctx)?;
            Ok(EvalValue::Value(Value::Bool(!v.truthy())))
        }
        Expr::Binary { op: BinaryOp::And, lhs, rhs } => {
            let l = eval(lhs, ctx)?;
            if !l.truthy() {
                return Ok(EvalValue::Value(Value::Bool(false)));
            }
            let r = eval(rhs, ctx)?;
            Ok(EvalValue::Value(Value::Bool(r.truthy())))
        }
        Expr::Binary { op: BinaryOp::Or, lhs, rhs } => {
            let l = eval(lhs, ctx)?;
            if l.truthy() {
                return Ok(EvalValue::Value(Value::Bool(true)));
            }
            let r = eval(rhs, ctx)?;
            Ok(EvalValue::Value(Value::Bool(r.truthy())))
        }
        Expr::Binary { op: BinaryOp::Eq, lhs, rhs } => {
            let l = eval(lhs, ctx)?;
            let r = eval(rhs, ctx)?;
            Ok(EvalValue::Value(Value::Bool(values_equal(&l, &r))))
        }
        Expr::Binary { op: BinaryOp::Ne, lhs, rhs } => {
            let l = eval(lhs, ctx)?;
            let r = eval(rhs, ctx)?;
            Ok(EvalValue::Value(Value::Bool(!values_equal(&l, &r))))
        }
        Expr::Binary { op, lhs, rhs } if is_ordering(*op) => {
            let l = eval(lhs, ctx)?;
            let r = eval(rhs, ctx)?;
            if matches!(l, EvalValue::Undefined) || matches!(r, EvalValue::Undefined) {
                return Ok(EvalValue::Value(Value::Bool(false)));
            }
            Ok(EvalValue::Value(Value::Bool(compare(*op, &l, &r)?)))
        }
        Expr::Binary { op: BinaryOp::In, lhs, rhs } => {
            let l = eval(lhs, ctx)?;
            let r = eval(rhs, ctx)?;
            let (EvalValue::Value(needle), haystack) = (l, r) else {
                return Ok(EvalValue::Value(Value::Bool(false)));
            };
            let haystack = match haystack {
                EvalValue::Undefined => return Ok(EvalValue::Value(Value::Bool(false))),
                EvalValue::Value(v) => v,
            };
            let list = haystack.as_list().ok_or_else(|| {
                EvaluationError::new(
                    EvaluationErrorKind::TypeMismatch,
                    format!("right-hand side of 'in' must be a list, got {haystack}"),
                )
            })?;
            Ok(EvalValue::Value(Value::Bool(list.contains(&needle))))
        }
        Expr::Binary { .. } => unreachable!("all BinaryOp variants handled above"),
    }
}

fn is_ordering(op: BinaryOp) -> bool {
    matches!(op, BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge)
}

fn values_equal(lhs: &EvalValue, rhs: &EvalValue) -> bool {
    match (lhs, rhs) {
        // undefined compares equal to nothing, including another undefined.
        (EvalValue::Undefined, _) | (_, EvalValue::Undefined) => false,
        (EvalValue::Value(a), EvalValue::Value(b)) => a == b,
    }
}

fn compare(op: BinaryOp, lhs: &EvalValue, rhs: &EvalValue) -> Result<bool> {
    let (EvalValue::Value(l), EvalValue::Value(r)) = (lhs, rhs) else {
        unreachable!("undefined operands are filtered out before compare() is called");
    };
    let ordering = match (l, r) {
        (Value::Int(a), Value::Int(b)) => a.partial_cmp(b),
        (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
        (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
        (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
        (Value::String(a), Value::String(b)) => a.partial_cmp(b),
        _ => {
            return Err(EvaluationError::new(
                EvaluationErrorKind::TypeMismatch,
                format!("cannot compare {l} and {r}"),
            ));
        }
    };
    let ordering = ordering.ok_or_else(|| {
        EvaluationError::new(EvaluationErrorKind::TypeMismatch, format!("cannot compare {l} and {r}"))
    })?;
    Ok(match op {
        BinaryOp::Lt => ordering.is_lt(),
        BinaryOp::Le => ordering.is_le(),
        BinaryOp::Gt => ordering.is_gt(),
        BinaryOp::Ge => ordering.is_ge(),
        _ => unreachable!("is_ordering guards the op set passed here"),
    })
}
