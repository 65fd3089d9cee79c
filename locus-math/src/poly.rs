//! Polynomial evaluation and point-to-curve distance.
//!
//! Coefficients are stored highest-degree term first, matching the ordering
//! returned by [`crate::regression::orthogonal_regression`].

use thiserror::Error;

/// Errors raised when constructing a polynomial from a coefficient list.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PolyError {
    #[error("coefficient list must not be empty")]
    Empty,
}

/// A real polynomial with coefficients ordered highest degree first.
///
/// `Polynomial::new(vec![2.0, 1.0])` is the line `y = 2x + 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct Polynomial {
    coeffs: Vec<f64>,
}

impl Polynomial {
    /// Create a polynomial from coefficients, highest degree first.
    pub fn new(coeffs: Vec<f64>) -> Result<Self, PolyError> {
        if coeffs.is_empty() {
            return Err(PolyError::Empty);
        }
        Ok(Self { coeffs })
    }

    /// Degree of the polynomial (length of the coefficient list minus one).
    pub fn order(&self) -> usize {
        self.coeffs.len() - 1
    }

    /// Coefficients, highest degree first.
    pub fn coeffs(&self) -> &[f64] {
        &self.coeffs
    }

    /// Evaluate at `x` using Horner's scheme.
    pub fn eval(&self, x: f64) -> f64 {
        self.coeffs.iter().fold(0.0, |acc, &c| acc * x + c)
    }

    /// First derivative as a new polynomial.
    ///
    /// The derivative of a constant is the zero polynomial (single 0.0
    /// coefficient), so the result is always valid to evaluate.
    pub fn derivative(&self) -> Polynomial {
        let n = self.coeffs.len();
        if n == 1 {
            return Polynomial { coeffs: vec![0.0] };
        }
        let coeffs = self
            .coeffs
            .iter()
            .take(n - 1)
            .enumerate()
            .map(|(i, &c)| c * (n - 1 - i) as f64)
            .collect();
        Polynomial { coeffs }
    }
}

/// Squared distance between point (`x1`, `y1`) and the curve `poly` at `x2`.
///
/// Returns `(x2 - x1)^2 + (poly(x2) - y1)^2`. Callers minimize this over
/// `x2` to obtain the true perpendicular distance to the curve; the
/// minimization itself is the caller's responsibility.
pub fn distance_squared_to_poly(x1: f64, y1: f64, x2: f64, poly: &Polynomial) -> f64 {
    (x2 - x1).powi(2) + (poly.eval(x2) - y1).powi(2)
}
