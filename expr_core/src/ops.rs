//! Operator semantics over [`Value`]s

use crate::error::{EvalError, EvalResult};
use crate::parser::{BinaryOp, UnaryOp};
use crate::value::{Complex, Matrix, Shape, Value};

/// Largest n whose factorial is finite in f64
const MAX_FACTORIAL: i64 = 170;

/// Upper bound on repeated multiplication for `matrix ^ n`
const MAX_MATRIX_POWER: u64 = 1024;

fn op_symbol(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Or => "or",
        BinaryOp::And => "and",
        BinaryOp::Eq => "==",
        BinaryOp::NotEq => "!=",
        BinaryOp::Lt => "<",
        BinaryOp::Le => "<=",
        BinaryOp::Gt => ">",
        BinaryOp::Ge => ">=",
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Mod => "mod",
        BinaryOp::Pow => "^",
    }
}

fn mismatch(op: BinaryOp, lhs: &Value, rhs: &Value) -> EvalError {
    EvalError::TypeMismatch(format!(
        "cannot apply '{}' to {} and {}",
        op_symbol(op),
        lhs.type_name(),
        rhs.type_name()
    ))
}

/// Applies a unary operator
pub fn unary(op: UnaryOp, operand: Value) -> EvalResult<Value> {
    match (op, operand) {
        (UnaryOp::Not, v) => Ok(Value::Boolean(!v.truthy()?)),
        (UnaryOp::Plus, v @ (Value::Number(_) | Value::Complex(_) | Value::Matrix(_))) => Ok(v),
        (UnaryOp::Neg, Value::Number(n)) => Ok(Value::Number(-n)),
        (UnaryOp::Neg, Value::Complex(c)) => Ok(Value::Complex(c.neg())),
        (UnaryOp::Neg, Value::Matrix(m)) => Ok(Value::Matrix(m.map(|x| -x))),
        (_, v) => Err(EvalError::TypeMismatch(format!(
            "cannot negate {}",
            v.type_name()
        ))),
    }
}

/// Applies a binary operator to two evaluated operands
///
/// `and`/`or` are evaluated eagerly here; the evaluator short-circuits them
/// before reaching this point.
pub fn binary(op: BinaryOp, lhs: Value, rhs: Value) -> EvalResult<Value> {
    match op {
        BinaryOp::And => Ok(Value::Boolean(lhs.truthy()? && rhs.truthy()?)),
        BinaryOp::Or => Ok(Value::Boolean(lhs.truthy()? || rhs.truthy()?)),
        BinaryOp::Eq => Ok(Value::Boolean(values_equal(&lhs, &rhs))),
        BinaryOp::NotEq => Ok(Value::Boolean(!values_equal(&lhs, &rhs))),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => compare(op, &lhs, &rhs),
        BinaryOp::Add | BinaryOp::Sub => additive(op, lhs, rhs),
        BinaryOp::Mul => multiply(lhs, rhs),
        BinaryOp::Div => divide(lhs, rhs),
        BinaryOp::Mod => modulo(lhs, rhs),
        BinaryOp::Pow => power(lhs, rhs),
    }
}

fn values_equal(lhs: &Value, rhs: &Value) -> bool {
    match (lhs.as_complex(), rhs.as_complex()) {
        (Some(a), Some(b)) => a == b,
        _ => lhs == rhs,
    }
}

fn compare(op: BinaryOp, lhs: &Value, rhs: &Value) -> EvalResult<Value> {
    let ordering = match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => return Err(mismatch(op, lhs, rhs)),
    };
    let Some(ordering) = ordering else {
        return Ok(Value::Boolean(false));
    };
    let result = match op {
        BinaryOp::Lt => ordering.is_lt(),
        BinaryOp::Le => ordering.is_le(),
        BinaryOp::Gt => ordering.is_gt(),
        _ => ordering.is_ge(),
    };
    Ok(Value::Boolean(result))
}

fn additive(op: BinaryOp, lhs: Value, rhs: Value) -> EvalResult<Value> {
    let subtract = op == BinaryOp::Sub;
    let real = move |a: f64, b: f64| if subtract { a - b } else { a + b };
    match (&lhs, &rhs) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Number(real(*a, *b))),
        (Value::Matrix(a), Value::Matrix(b)) => a.zip_with(b, real).map(Value::Matrix),
        (Value::Matrix(a), Value::Number(b)) => Ok(Value::Matrix(a.map(|x| real(x, *b)))),
        (Value::Number(a), Value::Matrix(b)) => Ok(Value::Matrix(b.map(|x| real(*a, x)))),
        _ => match (lhs.as_complex(), rhs.as_complex()) {
            (Some(a), Some(b)) => Ok(Value::from_complex(if subtract {
                a.sub(b)
            } else {
                a.add(b)
            })),
            _ => Err(mismatch(op, &lhs, &rhs)),
        },
    }
}

fn multiply(lhs: Value, rhs: Value) -> EvalResult<Value> {
    match (&lhs, &rhs) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a * b)),
        (Value::Matrix(a), Value::Matrix(b)) => a.matmul(b),
        (Value::Matrix(a), Value::Number(b)) => Ok(Value::Matrix(a.map(|x| x * b))),
        (Value::Number(a), Value::Matrix(b)) => Ok(Value::Matrix(b.map(|x| a * x))),
        _ => match (lhs.as_complex(), rhs.as_complex()) {
            (Some(a), Some(b)) => Ok(Value::from_complex(a.mul(b))),
            _ => Err(mismatch(BinaryOp::Mul, &lhs, &rhs)),
        },
    }
}

fn divide(lhs: Value, rhs: Value) -> EvalResult<Value> {
    match (&lhs, &rhs) {
        (_, Value::Number(b)) if *b == 0.0 => Err(EvalError::DivisionByZero),
        (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a / b)),
        (Value::Matrix(a), Value::Number(b)) => Ok(Value::Matrix(a.map(|x| x / b))),
        (Value::Matrix(a), Value::Matrix(b)) => a.matmul(&b.inv()?),
        (Value::Number(a), Value::Matrix(b)) => Ok(Value::Matrix(b.inv()?.map(|x| a * x))),
        _ => match (lhs.as_complex(), rhs.as_complex()) {
            (Some(a), Some(b)) => a.div(b).map(Value::from_complex),
            _ => Err(mismatch(BinaryOp::Div, &lhs, &rhs)),
        },
    }
}

fn modulo(lhs: Value, rhs: Value) -> EvalResult<Value> {
    match (&lhs, &rhs) {
        (Value::Number(_), Value::Number(b)) if *b == 0.0 => Err(EvalError::DivisionByZero),
        // Floored modulo: the result takes the sign of the divisor
        (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a - b * (a / b).floor())),
        _ => Err(mismatch(BinaryOp::Mod, &lhs, &rhs)),
    }
}

fn power(lhs: Value, rhs: Value) -> EvalResult<Value> {
    match (&lhs, &rhs) {
        (Value::Number(a), Value::Number(b)) => {
            if *a < 0.0 && b.fract() != 0.0 {
                Ok(Value::from_complex(
                    Complex::from_real(*a).powc(Complex::from_real(*b)),
                ))
            } else {
                Ok(Value::Number(a.powf(*b)))
            }
        }
        (Value::Matrix(m), Value::Number(_)) => matrix_power(m, rhs.as_integer()?),
        _ => match (lhs.as_complex(), rhs.as_complex()) {
            (Some(a), Some(b)) => Ok(Value::from_complex(a.powc(b))),
            _ => Err(mismatch(BinaryOp::Pow, &lhs, &rhs)),
        },
    }
}

fn matrix_power(m: &Matrix, exponent: i64) -> EvalResult<Value> {
    let n = match m.shape() {
        Shape::Grid { rows, cols } if rows == cols => rows,
        _ => {
            return Err(EvalError::DimensionMismatch(
                "matrix power requires a square matrix".to_string(),
            ))
        }
    };
    if exponent.unsigned_abs() > MAX_MATRIX_POWER {
        return Err(EvalError::Domain(format!("matrix power {} too large", exponent)));
    }
    let base = if exponent < 0 { m.inv()? } else { m.clone() };
    let identity: Vec<Vec<f64>> = (0..n)
        .map(|r| (0..n).map(|c| if r == c { 1.0 } else { 0.0 }).collect())
        .collect();
    let mut result = Value::Matrix(Matrix::from_rows(identity)?);
    for _ in 0..exponent.unsigned_abs() {
        result = multiply(result, Value::Matrix(base.clone()))?;
    }
    Ok(result)
}

/// Applies 1-based indices to a vector or matrix
pub fn index(target: Value, indices: &[Value]) -> EvalResult<Value> {
    let Value::Matrix(m) = &target else {
        return Err(EvalError::TypeMismatch(format!(
            "cannot index {}",
            target.type_name()
        )));
    };
    let mut zero_based = Vec::with_capacity(indices.len());
    for index in indices {
        let i = index.as_integer()?;
        if i < 1 {
            return Err(EvalError::IndexOutOfRange(format!(
                "indices start at 1, got {}",
                i
            )));
        }
        zero_based.push((i - 1) as usize);
    }
    let out_of_range = || EvalError::IndexOutOfRange(format!("{:?}", indices_text(indices)));
    match (m.shape(), zero_based.as_slice()) {
        (Shape::Vector(_), [i]) => m
            .data()
            .get(*i)
            .map(|v| Value::Number(*v))
            .ok_or_else(out_of_range),
        (Shape::Grid { .. }, [r]) => m.row(*r).map(Value::Matrix).ok_or_else(out_of_range),
        (Shape::Grid { .. }, [r, c]) => m.get(*r, *c).map(Value::Number).ok_or_else(out_of_range),
        _ => Err(EvalError::TypeMismatch(format!(
            "{} indices for a {}",
            indices.len(),
            target.type_name()
        ))),
    }
}

fn indices_text(indices: &[Value]) -> Vec<String> {
    indices.iter().map(|v| v.to_string()).collect()
}

/// n! for non-negative integers
pub fn factorial(value: Value) -> EvalResult<Value> {
    let n = value.as_integer()?;
    if n < 0 {
        return Err(EvalError::Domain(
            "factorial of a negative number".to_string(),
        ));
    }
    if n > MAX_FACTORIAL {
        return Err(EvalError::Domain(format!("factorial of {} overflows", n)));
    }
    Ok(Value::Number((1..=n).map(|k| k as f64).product()))
}
