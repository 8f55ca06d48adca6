//! Built-in constants and functions
//!
//! User-defined functions shadow builtins of the same name; the evaluator
//! consults the bindings first and falls back here.

use crate::error::{EvalError, EvalResult};
use crate::ops;
use crate::parser::BinaryOp;
use crate::value::{format_number, Complex, Matrix, Value};

/// Looks up a named constant
pub fn constant(name: &str) -> Option<Value> {
    let value = match name {
        "pi" | "PI" => Value::Number(std::f64::consts::PI),
        "e" | "E" => Value::Number(std::f64::consts::E),
        "tau" => Value::Number(std::f64::consts::TAU),
        "phi" => Value::Number((1.0 + 5f64.sqrt()) / 2.0),
        "i" => Value::Complex(Complex::I),
        "Infinity" => Value::Number(f64::INFINITY),
        "true" => Value::Boolean(true),
        "false" => Value::Boolean(false),
        _ => return None,
    };
    Some(value)
}

/// Names of all builtin functions, sorted
pub const FUNCTION_NAMES: &[&str] = &[
    "abs", "acos", "arg", "asin", "atan", "atan2", "ceil", "concat", "conj", "cos", "cosh",
    "cross", "det", "dot", "exp", "factorial", "floor", "im", "inv", "ln", "log", "log10",
    "log2", "max", "mean", "min", "mod", "norm", "number", "pow", "re", "round", "sign", "sin",
    "sinh", "size", "sqrt", "string", "sum", "tan", "tanh", "transpose",
];

pub fn is_builtin(name: &str) -> bool {
    FUNCTION_NAMES.binary_search(&name).is_ok()
}

/// Calls a builtin; `None` when no builtin has that name
pub fn call(name: &str, args: Vec<Value>) -> Option<EvalResult<Value>> {
    if !is_builtin(name) {
        return None;
    }
    Some(dispatch(name, args))
}

fn arity(name: &str, expected: &str, got: usize) -> EvalError {
    EvalError::Arity {
        name: name.to_string(),
        expected: expected.to_string(),
        got,
    }
}

fn exactly<const N: usize>(name: &str, args: Vec<Value>) -> EvalResult<[Value; N]> {
    let got = args.len();
    args.try_into()
        .map_err(|_| arity(name, &N.to_string(), got))
}

fn matrix_arg(name: &str, value: &Value) -> EvalResult<Matrix> {
    match value {
        Value::Matrix(m) => Ok(m.clone()),
        other => Err(EvalError::TypeMismatch(format!(
            "{} expects a matrix, got {}",
            name,
            other.type_name()
        ))),
    }
}

/// Applies a real function elementwise over numbers and matrices
fn real_map(name: &str, args: Vec<Value>, f: impl Fn(f64) -> f64) -> EvalResult<Value> {
    let [x] = exactly::<1>(name, args)?;
    match x {
        Value::Number(n) => Ok(Value::Number(f(n))),
        Value::Matrix(m) => Ok(Value::Matrix(m.map(f))),
        other => Err(EvalError::TypeMismatch(format!(
            "{} expects a number, got {}",
            name,
            other.type_name()
        ))),
    }
}

/// Real function with a restricted domain; complex inputs and out-of-domain
/// reals go through `complex`
fn real_or_complex(
    name: &str,
    args: Vec<Value>,
    in_domain: impl Fn(f64) -> bool,
    real: impl Fn(f64) -> f64,
    complex: impl Fn(Complex) -> Complex,
) -> EvalResult<Value> {
    let [x] = exactly::<1>(name, args)?;
    match x {
        Value::Number(n) if in_domain(n) => Ok(Value::Number(real(n))),
        Value::Number(n) => Ok(Value::from_complex(complex(Complex::from_real(n)))),
        Value::Complex(c) => Ok(Value::from_complex(complex(c))),
        other => Err(EvalError::TypeMismatch(format!(
            "{} expects a number, got {}",
            name,
            other.type_name()
        ))),
    }
}

/// Flattens numbers and matrices into a list of reals
fn numbers(name: &str, args: Vec<Value>) -> EvalResult<Vec<f64>> {
    let mut out = Vec::new();
    for arg in args {
        match arg {
            Value::Number(n) => out.push(n),
            Value::Matrix(m) => out.extend_from_slice(m.data()),
            other => {
                return Err(EvalError::TypeMismatch(format!(
                    "{} expects numbers, got {}",
                    name,
                    other.type_name()
                )))
            }
        }
    }
    if out.is_empty() {
        return Err(arity(name, "at least 1", 0));
    }
    Ok(out)
}

fn round_to(n: f64, digits: i64) -> f64 {
    if digits == 0 {
        return n.round();
    }
    let scale = 10f64.powi(digits as i32);
    (n * scale).round() / scale
}

fn dispatch(name: &str, args: Vec<Value>) -> EvalResult<Value> {
    match name {
        "sqrt" => real_or_complex(name, args, |n| n >= 0.0, f64::sqrt, Complex::sqrt),
        "ln" => real_or_complex(name, args, |n| n > 0.0, f64::ln, Complex::ln),
        "exp" => real_or_complex(name, args, |_| true, f64::exp, Complex::exp),
        "log" => match args.len() {
            1 => real_or_complex(name, args, |n| n > 0.0, f64::log10, |c| {
                let ln10 = std::f64::consts::LN_10;
                let l = c.ln();
                Complex::new(l.re / ln10, l.im / ln10)
            }),
            2 => {
                let [x, base] = exactly::<2>(name, args)?;
                let (x, base) = (x.as_number()?, base.as_number()?);
                if x <= 0.0 || base <= 0.0 || base == 1.0 {
                    return Err(EvalError::Domain(format!(
                        "log({}, {})",
                        format_number(x),
                        format_number(base)
                    )));
                }
                Ok(Value::Number(x.ln() / base.ln()))
            }
            got => Err(arity(name, "1 or 2", got)),
        },
        "log10" => real_or_complex(name, args, |n| n > 0.0, f64::log10, |c| {
            let l = c.ln();
            let ln10 = std::f64::consts::LN_10;
            Complex::new(l.re / ln10, l.im / ln10)
        }),
        "log2" => real_or_complex(name, args, |n| n > 0.0, f64::log2, |c| {
            let l = c.ln();
            let ln2 = std::f64::consts::LN_2;
            Complex::new(l.re / ln2, l.im / ln2)
        }),
        "abs" => {
            let [x] = exactly::<1>(name, args)?;
            match x {
                Value::Number(n) => Ok(Value::Number(n.abs())),
                Value::Complex(c) => Ok(Value::Number(c.abs())),
                Value::Matrix(m) => Ok(Value::Matrix(m.map(f64::abs))),
                other => Err(EvalError::TypeMismatch(format!(
                    "abs expects a number, got {}",
                    other.type_name()
                ))),
            }
        }
        "sin" => real_map(name, args, f64::sin),
        "cos" => real_map(name, args, f64::cos),
        "tan" => real_map(name, args, f64::tan),
        "asin" | "acos" => {
            let [x] = exactly::<1>(name, args)?;
            let n = x.as_number()?;
            if !(-1.0..=1.0).contains(&n) {
                return Err(EvalError::Domain(format!("{}({})", name, format_number(n))));
            }
            Ok(Value::Number(if name == "asin" { n.asin() } else { n.acos() }))
        }
        "atan" => real_map(name, args, f64::atan),
        "atan2" => {
            let [y, x] = exactly::<2>(name, args)?;
            Ok(Value::Number(y.as_number()?.atan2(x.as_number()?)))
        }
        "sinh" => real_map(name, args, f64::sinh),
        "cosh" => real_map(name, args, f64::cosh),
        "tanh" => real_map(name, args, f64::tanh),
        "floor" => real_map(name, args, f64::floor),
        "ceil" => real_map(name, args, f64::ceil),
        "sign" => real_map(name, args, |n| if n == 0.0 { 0.0 } else { n.signum() }),
        "round" => match args.len() {
            1 => real_map(name, args, f64::round),
            2 => {
                let [x, digits] = exactly::<2>(name, args)?;
                let digits = digits.as_integer()?;
                match x {
                    Value::Number(n) => Ok(Value::Number(round_to(n, digits))),
                    Value::Matrix(m) => Ok(Value::Matrix(m.map(|n| round_to(n, digits)))),
                    other => Err(EvalError::TypeMismatch(format!(
                        "round expects a number, got {}",
                        other.type_name()
                    ))),
                }
            }
            got => Err(arity(name, "1 or 2", got)),
        },
        "min" => Ok(Value::Number(
            numbers(name, args)?.into_iter().fold(f64::INFINITY, f64::min),
        )),
        "max" => Ok(Value::Number(
            numbers(name, args)?
                .into_iter()
                .fold(f64::NEG_INFINITY, f64::max),
        )),
        "sum" => Ok(Value::Number(numbers(name, args)?.into_iter().sum())),
        "mean" => {
            let values = numbers(name, args)?;
            let count = values.len() as f64;
            Ok(Value::Number(values.into_iter().sum::<f64>() / count))
        }
        "pow" => {
            let [base, exponent] = exactly::<2>(name, args)?;
            ops::binary(BinaryOp::Pow, base, exponent)
        }
        "mod" => {
            let [lhs, rhs] = exactly::<2>(name, args)?;
            ops::binary(BinaryOp::Mod, lhs, rhs)
        }
        "factorial" => {
            let [x] = exactly::<1>(name, args)?;
            ops::factorial(x)
        }
        "re" | "im" | "conj" | "arg" => {
            let [x] = exactly::<1>(name, args)?;
            let c = x.as_complex().ok_or_else(|| {
                EvalError::TypeMismatch(format!("{} expects a number, got {}", name, x.type_name()))
            })?;
            Ok(match name {
                "re" => Value::Number(c.re),
                "im" => Value::Number(c.im),
                "conj" => Value::from_complex(c.conj()),
                _ => Value::Number(c.arg()),
            })
        }
        "transpose" => {
            let [m] = exactly::<1>(name, args)?;
            Ok(Value::Matrix(matrix_arg(name, &m)?.transpose()))
        }
        "det" => {
            let [m] = exactly::<1>(name, args)?;
            Ok(Value::Number(matrix_arg(name, &m)?.det()?))
        }
        "inv" => {
            let [m] = exactly::<1>(name, args)?;
            Ok(Value::Matrix(matrix_arg(name, &m)?.inv()?))
        }
        "norm" => {
            let [m] = exactly::<1>(name, args)?;
            match m {
                Value::Number(n) => Ok(Value::Number(n.abs())),
                Value::Complex(c) => Ok(Value::Number(c.abs())),
                other => Ok(Value::Number(matrix_arg(name, &other)?.norm())),
            }
        }
        "size" => {
            let [m] = exactly::<1>(name, args)?;
            let m = matrix_arg(name, &m)?;
            if m.is_vector() {
                Ok(Value::Matrix(Matrix::vector(vec![m.data().len() as f64])))
            } else {
                Ok(Value::Matrix(Matrix::vector(vec![
                    m.rows() as f64,
                    m.cols() as f64,
                ])))
            }
        }
        "dot" => {
            let [a, b] = exactly::<2>(name, args)?;
            Ok(Value::Number(matrix_arg(name, &a)?.dot(&matrix_arg(name, &b)?)?))
        }
        "cross" => {
            let [a, b] = exactly::<2>(name, args)?;
            let (a, b) = (matrix_arg(name, &a)?, matrix_arg(name, &b)?);
            match (a.data(), b.data()) {
                ([a1, a2, a3], [b1, b2, b3]) if a.is_vector() && b.is_vector() => {
                    Ok(Value::Matrix(Matrix::vector(vec![
                        a2 * b3 - a3 * b2,
                        a3 * b1 - a1 * b3,
                        a1 * b2 - a2 * b1,
                    ])))
                }
                _ => Err(EvalError::DimensionMismatch(
                    "cross expects two 3-element vectors".to_string(),
                )),
            }
        }
        "string" => {
            let [x] = exactly::<1>(name, args)?;
            Ok(Value::String(x.to_string()))
        }
        "number" => {
            let [x] = exactly::<1>(name, args)?;
            match x {
                Value::Number(_) => Ok(x),
                Value::Boolean(b) => Ok(Value::Number(if b { 1.0 } else { 0.0 })),
                Value::String(s) => s
                    .trim()
                    .parse::<f64>()
                    .map(Value::Number)
                    .map_err(|_| EvalError::InvalidNumber(s)),
                other => Err(EvalError::TypeMismatch(format!(
                    "cannot convert {} to number",
                    other.type_name()
                ))),
            }
        }
        "concat" => Ok(Value::String(
            args.iter().map(|v| v.to_string()).collect::<String>(),
        )),
        _ => Err(EvalError::UndefinedFunction(name.to_string())),
    }
}
