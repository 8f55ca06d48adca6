//! Tree-walking evaluator

use crate::builtins;
use crate::error::{EvalError, EvalResult};
use crate::ops;
use crate::parser::{parse, BinaryOp, Expr};
use crate::value::{Matrix, Value};
use crate::{Bindings, ExpressionEngine, FunctionDefinition};

/// Default bound on nested user function calls
pub const DEFAULT_MAX_CALL_DEPTH: usize = 64;

/// Largest call depth an engine accepts; deeper settings are clamped
pub const MAX_CALL_DEPTH: usize = 128;

/// Evaluator frames allowed across all active user calls
const MAX_EVAL_NESTING: usize = 256;

/// The built-in expression engine
///
/// Identifiers resolve against the supplied [`Bindings`] first and the
/// constant table second. Calls resolve user functions first and builtins
/// second. User function bodies are parsed at call time and evaluated
/// against the caller's bindings plus their parameters, so a body sees the
/// values in scope where it is called.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MathEngine {
    max_call_depth: usize,
}

impl MathEngine {
    pub fn new() -> Self {
        Self {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }

    pub fn with_max_call_depth(max_call_depth: usize) -> Self {
        Self {
            max_call_depth: max_call_depth.min(MAX_CALL_DEPTH),
        }
    }

    pub fn max_call_depth(&self) -> usize {
        self.max_call_depth
    }

    /// Evaluates `source`, keeping the failure reason
    pub fn try_evaluate(&self, source: &str, bindings: &dyn Bindings) -> EvalResult<Value> {
        let expr = parse(source)?;
        Evaluator {
            max_depth: self.max_call_depth,
            depth: 0,
            nesting: 0,
        }
        .eval(&expr, bindings)
    }
}

impl Default for MathEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ExpressionEngine for MathEngine {
    fn evaluate(&self, expr: &str, bindings: &dyn Bindings) -> Value {
        self.try_evaluate(expr, bindings).unwrap_or(Value::Error)
    }
}

/// Parameters of an active user function call layered over the caller
struct CallFrame<'a> {
    locals: Vec<(String, Value)>,
    parent: &'a dyn Bindings,
}

impl Bindings for CallFrame<'_> {
    fn variable(&self, name: &str) -> Option<&Value> {
        self.locals
            .iter()
            .find(|(param, _)| param == name)
            .map(|(_, value)| value)
            .or_else(|| self.parent.variable(name))
    }

    fn function(&self, name: &str) -> Option<&FunctionDefinition> {
        self.parent.function(name)
    }
}

struct Evaluator {
    max_depth: usize,
    depth: usize,
    /// Active `eval` frames, including those of enclosing calls
    nesting: usize,
}

impl Evaluator {
    fn eval(&mut self, expr: &Expr, bindings: &dyn Bindings) -> EvalResult<Value> {
        if self.nesting >= MAX_EVAL_NESTING {
            return Err(EvalError::NestingTooDeep(MAX_EVAL_NESTING));
        }
        self.nesting += 1;
        let result = self.eval_node(expr, bindings);
        self.nesting -= 1;
        result
    }

    fn eval_node(&mut self, expr: &Expr, bindings: &dyn Bindings) -> EvalResult<Value> {
        match expr {
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::Bool(b) => Ok(Value::Boolean(*b)),
            Expr::Str(s) => Ok(Value::String(s.clone())),
            Expr::Ident(name) => lookup(name, bindings),
            Expr::Matrix(rows) => self.eval_matrix(rows, bindings),
            Expr::Unary { op, operand } => {
                let value = self.eval(operand, bindings)?;
                ops::unary(*op, value)
            }
            Expr::Binary {
                op: BinaryOp::And,
                lhs,
                rhs,
            } => {
                if !self.eval(lhs, bindings)?.truthy()? {
                    return Ok(Value::Boolean(false));
                }
                Ok(Value::Boolean(self.eval(rhs, bindings)?.truthy()?))
            }
            Expr::Binary {
                op: BinaryOp::Or,
                lhs,
                rhs,
            } => {
                if self.eval(lhs, bindings)?.truthy()? {
                    return Ok(Value::Boolean(true));
                }
                Ok(Value::Boolean(self.eval(rhs, bindings)?.truthy()?))
            }
            Expr::Binary { op, lhs, rhs } => {
                let lhs = self.eval(lhs, bindings)?;
                let rhs = self.eval(rhs, bindings)?;
                ops::binary(*op, lhs, rhs)
            }
            Expr::Conditional {
                condition,
                then,
                otherwise,
            } => {
                if self.eval(condition, bindings)?.truthy()? {
                    self.eval(then, bindings)
                } else {
                    self.eval(otherwise, bindings)
                }
            }
            Expr::Call { name, args } => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval(arg, bindings)?);
                }
                self.call(name, values, bindings)
            }
            Expr::Index { target, indices } => {
                let target = self.eval(target, bindings)?;
                let mut values = Vec::with_capacity(indices.len());
                for index in indices {
                    values.push(self.eval(index, bindings)?);
                }
                ops::index(target, &values)
            }
            Expr::Factorial(operand) => {
                let value = self.eval(operand, bindings)?;
                ops::factorial(value)
            }
        }
    }

    fn call(&mut self, name: &str, args: Vec<Value>, bindings: &dyn Bindings) -> EvalResult<Value> {
        if let Some(def) = bindings.function(name) {
            return self.call_user(def, args, bindings);
        }
        builtins::call(name, args).unwrap_or_else(|| Err(EvalError::UndefinedFunction(name.to_string())))
    }

    fn call_user(
        &mut self,
        def: &FunctionDefinition,
        args: Vec<Value>,
        bindings: &dyn Bindings,
    ) -> EvalResult<Value> {
        if args.len() != def.arity() {
            return Err(EvalError::Arity {
                name: def.name.clone(),
                expected: def.arity().to_string(),
                got: args.len(),
            });
        }
        if self.depth >= self.max_depth {
            return Err(EvalError::CallDepthExceeded(self.max_depth));
        }
        let body = parse(&def.body)?;
        let frame = CallFrame {
            locals: def.params.iter().cloned().zip(args).collect(),
            parent: bindings,
        };
        self.depth += 1;
        let result = self.eval(&body, &frame);
        self.depth -= 1;
        result
    }

    /// Builds a vector or matrix from a literal
    ///
    /// `[1, 2]` is a vector, `[1, 2; 3, 4]` a matrix, and a single row of
    /// equal-length vectors such as `[[1, 2], [3, 4]]` is also a matrix.
    fn eval_matrix(&mut self, rows: &[Vec<Expr>], bindings: &dyn Bindings) -> EvalResult<Value> {
        let mut evaluated = Vec::with_capacity(rows.len());
        for row in rows {
            let mut values = Vec::with_capacity(row.len());
            for item in row {
                values.push(self.eval(item, bindings)?);
            }
            evaluated.push(values);
        }

        if let [only] = evaluated.as_slice() {
            if !only.is_empty() && only.iter().all(|v| matches!(v, Value::Matrix(m) if m.is_vector())) {
                let nested = only
                    .iter()
                    .map(|v| match v {
                        Value::Matrix(m) => m.data().to_vec(),
                        _ => Vec::new(),
                    })
                    .collect();
                return Ok(Value::Matrix(Matrix::from_rows(nested)?));
            }
            let data = only.iter().map(element).collect::<EvalResult<Vec<f64>>>()?;
            return Ok(Value::Matrix(Matrix::vector(data)));
        }

        let grid = evaluated
            .iter()
            .map(|row| row.iter().map(element).collect::<EvalResult<Vec<f64>>>())
            .collect::<EvalResult<Vec<Vec<f64>>>>()?;
        Ok(Value::Matrix(Matrix::from_rows(grid)?))
    }
}

fn element(value: &Value) -> EvalResult<f64> {
    match value {
        Value::Number(n) => Ok(*n),
        other => Err(EvalError::TypeMismatch(format!(
            "matrix elements must be numbers, got {}",
            other.type_name()
        ))),
    }
}

fn lookup(name: &str, bindings: &dyn Bindings) -> EvalResult<Value> {
    match bindings.variable(name) {
        Some(Value::Error) => Err(EvalError::ErrorOperand(name.to_string())),
        Some(value) => Ok(value.clone()),
        None => builtins::constant(name).ok_or_else(|| EvalError::UndefinedSymbol(name.to_string())),
    }
}
