//! Expression evaluation.

use std::cmp::Ordering;

use super::error::{ExecuteError, ExecuteResult};
use crate::catalog::Value;
use crate::stmt::{ArithmeticOp, CompOp, ConjunctionKind, Expression};
use crate::tuple::{Tuple, TupleCellSpec};

/// Evaluate an expression against a tuple.
pub fn evaluate(expr: &Expression, tuple: &dyn Tuple) -> ExecuteResult<Value> {
    match expr {
        Expression::Field(field) => {
            let spec = TupleCellSpec::qualified(field.table.clone(), field.field.clone());
            tuple
                .find_cell(&spec)?
                .ok_or_else(|| ExecuteError::FieldNotFound(spec.to_string()))
        }

        Expression::Value(value) => Ok(value.clone()),

        Expression::Comparison { op, left, right } => {
            let l = evaluate(left, tuple)?;
            let r = evaluate(right, tuple)?;
            Ok(Value::Boolean(compare(*op, &l, &r)))
        }

        Expression::Conjunction { kind, children } => {
            // short-circuits; an empty AND is true, an empty OR false
            let stop_on = matches!(kind, ConjunctionKind::Or);
            for child in children {
                if evaluate(child, tuple)?.as_bool() == stop_on {
                    return Ok(Value::Boolean(stop_on));
                }
            }
            Ok(Value::Boolean(!stop_on))
        }

        Expression::Arithmetic { op, left, right } => {
            let l = evaluate(left, tuple)?;
            match right {
                Some(right) => {
                    let r = evaluate(right, tuple)?;
                    eval_arithmetic(*op, &l, &r)
                }
                None => eval_negate(&l),
            }
        }

        Expression::IsNull { expr, negated } => {
            let is_null = evaluate(expr, tuple)?.is_null();
            Ok(Value::Boolean(is_null != *negated))
        }

        // Aggregates are computed by the aggregate operator and read back
        // from its output by name.
        Expression::Aggregate(agg) => {
            let spec = TupleCellSpec::new(agg.to_string());
            tuple
                .find_cell(&spec)?
                .ok_or_else(|| ExecuteError::FieldNotFound(spec.to_string()))
        }
    }
}

/// Evaluate a filter condition. NULL counts as false.
pub fn evaluate_predicate(expr: &Expression, tuple: &dyn Tuple) -> ExecuteResult<bool> {
    Ok(evaluate(expr, tuple)?.as_bool())
}

fn compare(op: CompOp, left: &Value, right: &Value) -> bool {
    let Some(ordering) = left.compare(right) else {
        return false;
    };
    match op {
        CompOp::Eq => ordering == Ordering::Equal,
        CompOp::NotEq => ordering != Ordering::Equal,
        CompOp::Lt => ordering == Ordering::Less,
        CompOp::LtEq => ordering != Ordering::Greater,
        CompOp::Gt => ordering == Ordering::Greater,
        CompOp::GtEq => ordering != Ordering::Less,
    }
}

fn eval_arithmetic(op: ArithmeticOp, left: &Value, right: &Value) -> ExecuteResult<Value> {
    if left.is_null() || right.is_null() {
        return Ok(Value::Null);
    }

    if let (Value::Integer(a), Value::Integer(b), false) =
        (left, right, matches!(op, ArithmeticOp::Div))
    {
        let result = match op {
            ArithmeticOp::Add => a.checked_add(*b),
            ArithmeticOp::Sub => a.checked_sub(*b),
            ArithmeticOp::Mul => a.checked_mul(*b),
            ArithmeticOp::Div | ArithmeticOp::Negate => None,
        };
        return result
            .map(Value::Integer)
            .ok_or_else(|| ExecuteError::Overflow(format!("{} {} {}", a, op, b)));
    }

    let l = numeric(left)?;
    let r = numeric(right)?;
    let result = match op {
        ArithmeticOp::Add => l + r,
        ArithmeticOp::Sub => l - r,
        ArithmeticOp::Mul => l * r,
        ArithmeticOp::Div => {
            if r == 0.0 {
                return Err(ExecuteError::DivisionByZero);
            }
            l / r
        }
        ArithmeticOp::Negate => {
            return Err(ExecuteError::Internal("negate with two operands".into()))
        }
    };
    Ok(Value::Float(result))
}

fn eval_negate(value: &Value) -> ExecuteResult<Value> {
    match value {
        Value::Null => Ok(Value::Null),
        Value::Integer(n) => n
            .checked_neg()
            .map(Value::Integer)
            .ok_or_else(|| ExecuteError::Overflow(format!("-{}", n))),
        Value::Float(x) => Ok(Value::Float(-x)),
        other => Err(type_mismatch(other)),
    }
}

fn numeric(value: &Value) -> ExecuteResult<f64> {
    value.as_f64().ok_or_else(|| type_mismatch(value))
}

fn type_mismatch(value: &Value) -> ExecuteError {
    ExecuteError::TypeMismatch {
        expected: "numeric".into(),
        actual: value.data_type().to_string(),
    }
}
