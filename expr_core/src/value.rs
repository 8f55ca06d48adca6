//! Runtime values and their text rendering
//!
//! Rendering lives here because result text is owned by the evaluator: the
//! sheet layer only ever calls `to_string()` on a [`Value`].

use crate::error::{EvalError, EvalResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Significant digits kept when rendering a real number
const SIGNIFICANT_DIGITS: usize = 14;

/// Complex number with f64 parts
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Complex {
    pub re: f64,
    pub im: f64,
}

impl Complex {
    /// The imaginary unit
    pub const I: Complex = Complex { re: 0.0, im: 1.0 };

    pub const fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }

    pub const fn from_real(re: f64) -> Self {
        Self { re, im: 0.0 }
    }

    pub fn is_zero(&self) -> bool {
        self.re == 0.0 && self.im == 0.0
    }

    pub fn add(self, other: Complex) -> Complex {
        Complex::new(self.re + other.re, self.im + other.im)
    }

    pub fn sub(self, other: Complex) -> Complex {
        Complex::new(self.re - other.re, self.im - other.im)
    }

    pub fn mul(self, other: Complex) -> Complex {
        Complex::new(
            self.re * other.re - self.im * other.im,
            self.re * other.im + self.im * other.re,
        )
    }

    pub fn div(self, other: Complex) -> EvalResult<Complex> {
        let denom = other.re * other.re + other.im * other.im;
        if denom == 0.0 {
            return Err(EvalError::DivisionByZero);
        }
        Ok(Complex::new(
            (self.re * other.re + self.im * other.im) / denom,
            (self.im * other.re - self.re * other.im) / denom,
        ))
    }

    pub fn neg(self) -> Complex {
        Complex::new(-self.re, -self.im)
    }

    pub fn conj(self) -> Complex {
        Complex::new(self.re, -self.im)
    }

    pub fn abs(self) -> f64 {
        self.re.hypot(self.im)
    }

    pub fn arg(self) -> f64 {
        self.im.atan2(self.re)
    }

    /// Principal square root; exact for negative reals
    pub fn sqrt(self) -> Complex {
        let m = self.abs();
        let re = ((m + self.re) / 2.0).max(0.0).sqrt();
        let im = ((m - self.re) / 2.0).max(0.0).sqrt();
        Complex::new(re, if self.im < 0.0 { -im } else { im })
    }

    pub fn exp(self) -> Complex {
        let scale = self.re.exp();
        Complex::new(scale * self.im.cos(), scale * self.im.sin())
    }

    pub fn ln(self) -> Complex {
        Complex::new(self.abs().ln(), self.arg())
    }

    pub fn powc(self, exponent: Complex) -> Complex {
        if self.is_zero() {
            return if exponent.is_zero() {
                Complex::from_real(1.0)
            } else {
                Complex::from_real(0.0)
            };
        }
        exponent.mul(self.ln()).exp().snap()
    }

    /// Zeroes a component that is only rounding noise next to the other
    fn snap(self) -> Complex {
        let scale = self.abs() * 1e-15;
        let clean = |x: f64| if x.abs() <= scale { 0.0 } else { x };
        Complex::new(clean(self.re), clean(self.im))
    }
}

impl fmt::Display for Complex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.im == 0.0 {
            return write!(f, "{}", format_number(self.re));
        }
        let im_abs = self.im.abs();
        let im_text = if im_abs == 1.0 {
            "i".to_string()
        } else {
            format!("{}i", format_number(im_abs))
        };
        if self.re == 0.0 {
            if self.im < 0.0 {
                write!(f, "-{}", im_text)
            } else {
                write!(f, "{}", im_text)
            }
        } else {
            let sign = if self.im < 0.0 { '-' } else { '+' };
            write!(f, "{} {} {}", format_number(self.re), sign, im_text)
        }
    }
}

/// Shape of a [`Matrix`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Shape {
    /// One-dimensional
    Vector(usize),
    /// Two-dimensional, row-major
    Grid { rows: usize, cols: usize },
}

/// Dense real vector or matrix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    shape: Shape,
    data: Vec<f64>,
}

impl Matrix {
    /// Creates a vector
    pub fn vector(data: Vec<f64>) -> Self {
        Self {
            shape: Shape::Vector(data.len()),
            data,
        }
    }

    /// Creates a matrix from rows, rejecting ragged input
    pub fn from_rows(rows: Vec<Vec<f64>>) -> EvalResult<Self> {
        let cols = rows.first().map(|r| r.len()).unwrap_or(0);
        if rows.iter().any(|r| r.len() != cols) {
            return Err(EvalError::DimensionMismatch(
                "rows must all have the same length".to_string(),
            ));
        }
        let row_count = rows.len();
        Ok(Self {
            shape: Shape::Grid {
                rows: row_count,
                cols,
            },
            data: rows.into_iter().flatten().collect(),
        })
    }

    fn grid(rows: usize, cols: usize, data: Vec<f64>) -> Self {
        Self {
            shape: Shape::Grid { rows, cols },
            data,
        }
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn is_vector(&self) -> bool {
        matches!(self.shape, Shape::Vector(_))
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Number of rows (vectors count as a single column)
    pub fn rows(&self) -> usize {
        match self.shape {
            Shape::Vector(n) => n,
            Shape::Grid { rows, .. } => rows,
        }
    }

    pub fn cols(&self) -> usize {
        match self.shape {
            Shape::Vector(_) => 1,
            Shape::Grid { cols, .. } => cols,
        }
    }

    /// Zero-based element access for grids
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row < self.rows() && col < self.cols() {
            self.data.get(row * self.cols() + col).copied()
        } else {
            None
        }
    }

    /// Zero-based row of a grid, as a vector
    pub fn row(&self, row: usize) -> Option<Matrix> {
        if self.is_vector() || row >= self.rows() {
            return None;
        }
        let cols = self.cols();
        Some(Matrix::vector(self.data[row * cols..(row + 1) * cols].to_vec()))
    }

    pub fn map(&self, f: impl Fn(f64) -> f64) -> Matrix {
        Self {
            shape: self.shape,
            data: self.data.iter().map(|v| f(*v)).collect(),
        }
    }

    pub fn zip_with(&self, other: &Matrix, f: impl Fn(f64, f64) -> f64) -> EvalResult<Matrix> {
        if self.shape != other.shape {
            return Err(EvalError::DimensionMismatch(format!(
                "{} vs {}",
                self.shape_text(),
                other.shape_text()
            )));
        }
        Ok(Self {
            shape: self.shape,
            data: self
                .data
                .iter()
                .zip(&other.data)
                .map(|(a, b)| f(*a, *b))
                .collect(),
        })
    }

    pub fn transpose(&self) -> Matrix {
        match self.shape {
            Shape::Vector(_) => self.clone(),
            Shape::Grid { rows, cols } => {
                let mut data = Vec::with_capacity(self.data.len());
                for c in 0..cols {
                    for r in 0..rows {
                        data.push(self.data[r * cols + c]);
                    }
                }
                Matrix::grid(cols, rows, data)
            }
        }
    }

    /// Matrix product; vector · vector is the dot product
    pub fn matmul(&self, other: &Matrix) -> EvalResult<Value> {
        match (self.shape, other.shape) {
            (Shape::Vector(_), Shape::Vector(_)) => self.dot(other).map(Value::Number),
            (Shape::Grid { rows, cols }, Shape::Vector(n)) => {
                if cols != n {
                    return Err(self.product_mismatch(other));
                }
                let data = (0..rows)
                    .map(|r| (0..cols).map(|c| self.data[r * cols + c] * other.data[c]).sum::<f64>())
                    .collect();
                Ok(Value::Matrix(Matrix::vector(data)))
            }
            (Shape::Vector(n), Shape::Grid { rows, cols }) => {
                if n != rows {
                    return Err(self.product_mismatch(other));
                }
                let data = (0..cols)
                    .map(|c| (0..rows).map(|r| self.data[r] * other.data[r * cols + c]).sum::<f64>())
                    .collect();
                Ok(Value::Matrix(Matrix::vector(data)))
            }
            (Shape::Grid { rows, cols: inner }, Shape::Grid { rows: other_rows, cols }) => {
                if inner != other_rows {
                    return Err(self.product_mismatch(other));
                }
                let mut data = vec![0.0; rows * cols];
                for r in 0..rows {
                    for c in 0..cols {
                        data[r * cols + c] = (0..inner)
                            .map(|k| self.data[r * inner + k] * other.data[k * cols + c])
                            .sum();
                    }
                }
                Ok(Value::Matrix(Matrix::grid(rows, cols, data)))
            }
        }
    }

    pub fn dot(&self, other: &Matrix) -> EvalResult<f64> {
        if !self.is_vector() || !other.is_vector() || self.data.len() != other.data.len() {
            return Err(self.product_mismatch(other));
        }
        Ok(self.data.iter().zip(&other.data).map(|(a, b)| a * b).sum())
    }

    /// Euclidean norm (Frobenius for grids)
    pub fn norm(&self) -> f64 {
        self.data.iter().map(|v| v * v).sum::<f64>().sqrt()
    }

    fn square_size(&self, op: &str) -> EvalResult<usize> {
        match self.shape {
            Shape::Grid { rows, cols } if rows == cols => Ok(rows),
            _ => Err(EvalError::DimensionMismatch(format!(
                "{} requires a square matrix, got {}",
                op,
                self.shape_text()
            ))),
        }
    }

    /// Determinant by Gaussian elimination with partial pivoting
    pub fn det(&self) -> EvalResult<f64> {
        let n = self.square_size("det")?;
        let mut a = self.data.clone();
        let mut det = 1.0;
        for col in 0..n {
            let pivot = (col..n)
                .max_by(|x, y| a[x * n + col].abs().total_cmp(&a[y * n + col].abs()))
                .unwrap_or(col);
            if a[pivot * n + col] == 0.0 {
                return Ok(0.0);
            }
            if pivot != col {
                for k in 0..n {
                    a.swap(pivot * n + k, col * n + k);
                }
                det = -det;
            }
            let p = a[col * n + col];
            det *= p;
            for r in (col + 1)..n {
                let factor = a[r * n + col] / p;
                for k in col..n {
                    a[r * n + k] -= factor * a[col * n + k];
                }
            }
        }
        Ok(det)
    }

    /// Inverse by Gauss-Jordan elimination
    pub fn inv(&self) -> EvalResult<Matrix> {
        let n = self.square_size("inv")?;
        let mut a = self.data.clone();
        let mut inv = vec![0.0; n * n];
        for i in 0..n {
            inv[i * n + i] = 1.0;
        }
        for col in 0..n {
            let pivot = (col..n)
                .max_by(|x, y| a[x * n + col].abs().total_cmp(&a[y * n + col].abs()))
                .unwrap_or(col);
            if a[pivot * n + col] == 0.0 {
                return Err(EvalError::Domain("matrix is singular".to_string()));
            }
            for k in 0..n {
                a.swap(pivot * n + k, col * n + k);
                inv.swap(pivot * n + k, col * n + k);
            }
            let p = a[col * n + col];
            for k in 0..n {
                a[col * n + k] /= p;
                inv[col * n + k] /= p;
            }
            for r in 0..n {
                if r == col {
                    continue;
                }
                let factor = a[r * n + col];
                for k in 0..n {
                    a[r * n + k] -= factor * a[col * n + k];
                    inv[r * n + k] -= factor * inv[col * n + k];
                }
            }
        }
        Ok(Matrix::grid(n, n, inv))
    }

    fn shape_text(&self) -> String {
        match self.shape {
            Shape::Vector(n) => format!("[{}]", n),
            Shape::Grid { rows, cols } => format!("[{}, {}]", rows, cols),
        }
    }

    fn product_mismatch(&self, other: &Matrix) -> EvalError {
        EvalError::DimensionMismatch(format!(
            "cannot multiply {} by {}",
            self.shape_text(),
            other.shape_text()
        ))
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |values: &[f64]| {
            values
                .iter()
                .map(|v| format_number(*v))
                .collect::<Vec<_>>()
                .join(", ")
        };
        match self.shape {
            Shape::Vector(_) => write!(f, "[{}]", join(&self.data)),
            Shape::Grid { cols, .. } => {
                let rows = if cols == 0 {
                    Vec::new()
                } else {
                    self.data
                        .chunks(cols)
                        .map(|row| format!("[{}]", join(row)))
                        .collect()
                };
                write!(f, "[{}]", rows.join(", "))
            }
        }
    }
}

/// A value produced by evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    Number(f64),
    Boolean(bool),
    Complex(Complex),
    Matrix(Matrix),
    String(String),
    /// Failure sentinel; renders as `Error`
    Error,
}

impl Value {
    /// Wraps a complex result, demoting it to a real number when the
    /// imaginary part is exactly zero
    pub fn from_complex(c: Complex) -> Value {
        if c.im == 0.0 {
            Value::Number(c.re)
        } else {
            Value::Complex(c)
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Boolean(_) => "boolean",
            Value::Complex(_) => "complex",
            Value::Matrix(m) if m.is_vector() => "vector",
            Value::Matrix(_) => "matrix",
            Value::String(_) => "string",
            Value::Error => "error",
        }
    }

    pub fn as_number(&self) -> EvalResult<f64> {
        match self {
            Value::Number(n) => Ok(*n),
            other => Err(EvalError::type_mismatch(format!(
                "expected number, got {}",
                other.type_name()
            ))),
        }
    }

    /// Integral number, used for indices and factorials
    pub fn as_integer(&self) -> EvalResult<i64> {
        let n = self.as_number()?;
        if n.fract() != 0.0 || !n.is_finite() {
            return Err(EvalError::type_mismatch(format!(
                "expected integer, got {}",
                format_number(n)
            )));
        }
        Ok(n as i64)
    }

    /// Numeric value promoted to complex
    pub fn as_complex(&self) -> Option<Complex> {
        match self {
            Value::Number(n) => Some(Complex::from_real(*n)),
            Value::Complex(c) => Some(*c),
            _ => None,
        }
    }

    pub fn truthy(&self) -> EvalResult<bool> {
        match self {
            Value::Boolean(b) => Ok(*b),
            Value::Number(n) => Ok(*n != 0.0),
            other => Err(EvalError::type_mismatch(format!(
                "{} has no truth value",
                other.type_name()
            ))),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Complex(c) => write!(f, "{}", c),
            Value::Matrix(m) => write!(f, "{}", m),
            Value::String(s) => write!(f, "{}", s),
            Value::Error => write!(f, "Error"),
        }
    }
}

/// Renders a real number the way results appear on a sheet
///
/// Values are rounded to 14 significant digits so binary noise such as
/// `0.1 + 0.2` prints as `0.3`; integral values print without a fraction.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    let rounded: f64 = format!("{:.*e}", SIGNIFICANT_DIGITS - 1, n)
        .parse()
        .unwrap_or(n);
    let magnitude = rounded.abs();
    if !(1e-7..1e21).contains(&magnitude) {
        format!("{:e}", rounded)
    } else {
        format!("{}", rounded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number_integral() {
        assert_eq!(format_number(4.0), "4");
        assert_eq!(format_number(-12.0), "-12");
        assert_eq!(format_number(-0.0), "0");
    }

    #[test]
    fn test_format_number_rounds_binary_noise() {
        assert_eq!(format_number(0.1 + 0.2), "0.3");
        assert_eq!(format_number(1.0 / 3.0), "0.33333333333333");
    }

    #[test]
    fn test_format_number_extremes() {
        assert_eq!(format_number(f64::INFINITY), "Infinity");
        assert_eq!(format_number(1e21), "1e21");
        assert_eq!(format_number(1.5e-8), "1.5e-8");
    }

    #[test]
    fn test_complex_display() {
        assert_eq!(Complex::new(3.0, 4.0).to_string(), "3 + 4i");
        assert_eq!(Complex::new(3.0, -4.0).to_string(), "3 - 4i");
        assert_eq!(Complex::new(0.0, 2.0).to_string(), "2i");
        assert_eq!(Complex::I.to_string(), "i");
        assert_eq!(Complex::new(0.0, -1.0).to_string(), "-i");
    }

    #[test]
    fn test_complex_arithmetic() {
        let a = Complex::new(1.0, 2.0);
        let b = Complex::new(3.0, -1.0);
        assert_eq!(a.mul(b), Complex::new(5.0, 5.0));
        assert_eq!(a.div(Complex::from_real(0.0)), Err(EvalError::DivisionByZero));
        let root = Complex::from_real(-4.0).sqrt();
        assert!(root.re.abs() < 1e-12);
        assert!((root.im - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_matrix_display() {
        assert_eq!(Matrix::vector(vec![1.0, 2.5]).to_string(), "[1, 2.5]");
        let m = Matrix::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        assert_eq!(m.to_string(), "[[1, 2], [3, 4]]");
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let result = Matrix::from_rows(vec![vec![1.0, 2.0], vec![3.0]]);
        assert!(matches!(result, Err(EvalError::DimensionMismatch(_))));
    }

    #[test]
    fn test_matrix_products() {
        let m = Matrix::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        let v = Matrix::vector(vec![1.0, 1.0]);
        assert_eq!(m.matmul(&v).unwrap().to_string(), "[3, 7]");
        assert_eq!(v.matmul(&v).unwrap(), Value::Number(2.0));
        assert_eq!(m.matmul(&m).unwrap().to_string(), "[[7, 10], [15, 22]]");
    }

    #[test]
    fn test_det_and_inverse() {
        let m = Matrix::from_rows(vec![vec![4.0, 7.0], vec![2.0, 6.0]]).unwrap();
        assert!((m.det().unwrap() - 10.0).abs() < 1e-12);
        assert_eq!(m.inv().unwrap().to_string(), "[[0.6, -0.7], [-0.2, 0.4]]");

        let singular = Matrix::from_rows(vec![vec![1.0, 2.0], vec![2.0, 4.0]]).unwrap();
        assert_eq!(singular.det().unwrap(), 0.0);
        assert!(matches!(singular.inv(), Err(EvalError::Domain(_))));
    }

    #[test]
    fn test_error_value_is_distinct_from_string() {
        let sentinel = Value::Error;
        let text = Value::String("Error".to_string());
        assert_eq!(sentinel.to_string(), text.to_string());
        assert_ne!(sentinel, text);
        assert!(sentinel.is_error());
        assert!(!text.is_error());
    }
}
