//! Least-squares and orthogonal-distance polynomial regression.
//!
//! [`orthogonal_regression`] fits a polynomial of order 1 to 3 minimizing the
//! total perpendicular distance of the points to the curve (errors in both
//! coordinates), not the vertical residual. Each iteration projects every
//! point onto its nearest abscissa on the current curve, then refits the
//! coefficients with a curvature-weighted linear least squares solve. The
//! refit is a Gauss-Newton step on the orthogonal-distance objective, so
//! convergence is fast once the iterate is close.

use nalgebra::{DMatrix, DVector};
use thiserror::Error;

use crate::poly::Polynomial;

/// Errors that can occur during regression.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FitError {
    /// Polynomial order outside the supported range {1, 2, 3}.
    #[error("order must be between 1 and 3 (value requested, {0}, not accommodated)")]
    InvalidOrder(usize),

    /// x and y (or an initial guess) have incompatible lengths.
    #[error("length mismatch: expected {expected}, got {got}")]
    LengthMismatch { expected: usize, got: usize },

    /// Fewer points than coefficients to solve for.
    #[error("insufficient data: need at least {expected} points, got {got}")]
    InsufficientData { expected: usize, got: usize },

    /// All x values are identical; no line can be fit.
    #[error("x data has zero variance")]
    ZeroVariance,

    /// The least-squares subproblem could not be solved.
    #[error("SVD least-squares solve failed")]
    SvdFailed,

    /// The iteration cap was reached before the coefficients settled.
    #[error("fit did not converge after {iterations} iterations")]
    NonConvergence { iterations: usize },
}

/// Slope/intercept result of a simple vertical-residual line fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineFit {
    pub slope: f64,
    pub intercept: f64,
}

/// Maximum outer iterations for the orthogonal-distance fit.
const MAX_ODR_ITERATIONS: usize = 100;

/// Coefficient-change tolerance declaring the outer iteration converged.
const COEFF_TOLERANCE: f64 = 1e-12;

/// Newton iterations when projecting a point onto the curve.
const MAX_FOOT_ITERATIONS: usize = 50;

/// Ordinary least-squares line fit (vertical residuals).
///
/// Used to seed [`orthogonal_regression`] when no initial guess is supplied;
/// also useful on its own for quick slope/intercept estimates.
pub fn linear_regression(x: &[f64], y: &[f64]) -> Result<LineFit, FitError> {
    if x.len() != y.len() {
        return Err(FitError::LengthMismatch {
            expected: x.len(),
            got: y.len(),
        });
    }
    if x.len() < 2 {
        return Err(FitError::InsufficientData {
            expected: 2,
            got: x.len(),
        });
    }

    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let mut ss_xx = 0.0;
    let mut ss_xy = 0.0;
    for (&xi, &yi) in x.iter().zip(y.iter()) {
        ss_xx += (xi - mean_x) * (xi - mean_x);
        ss_xy += (xi - mean_x) * (yi - mean_y);
    }

    if ss_xx < f64::EPSILON {
        return Err(FitError::ZeroVariance);
    }

    let slope = ss_xy / ss_xx;
    let intercept = mean_y - slope * mean_x;
    Ok(LineFit { slope, intercept })
}

/// Fit a polynomial of the given order minimizing perpendicular distances.
///
/// # Arguments
/// * `x`, `y` - Point coordinates; equal length, at least `order + 1` points
/// * `order` - Polynomial order, must be 1, 2, or 3
/// * `initial_guess` - Optional starting coefficients (highest degree first,
///   length `order + 1`). If `None`, a simple least-squares line fit seeds
///   the iteration, left-padded with zeros for orders above 1.
///
/// # Returns
/// The `order + 1` fit coefficients, highest degree first.
///
/// # Errors
/// * [`FitError::InvalidOrder`] - order outside {1, 2, 3}
/// * [`FitError::LengthMismatch`] - mismatched input lengths
/// * [`FitError::InsufficientData`] - fewer than `order + 1` points
/// * [`FitError::NonConvergence`] - coefficients did not settle within the
///   iteration cap
pub fn orthogonal_regression(
    x: &[f64],
    y: &[f64],
    order: usize,
    initial_guess: Option<&[f64]>,
) -> Result<Vec<f64>, FitError> {
    if !(1..=3).contains(&order) {
        return Err(FitError::InvalidOrder(order));
    }
    if x.len() != y.len() {
        return Err(FitError::LengthMismatch {
            expected: x.len(),
            got: y.len(),
        });
    }
    if x.len() < order + 1 {
        return Err(FitError::InsufficientData {
            expected: order + 1,
            got: x.len(),
        });
    }

    let mut coeffs = match initial_guess {
        Some(guess) => {
            if guess.len() != order + 1 {
                return Err(FitError::LengthMismatch {
                    expected: order + 1,
                    got: guess.len(),
                });
            }
            guess.to_vec()
        }
        None => {
            // Seed with a plain line fit, zero-padded up to the requested order.
            let line = linear_regression(x, y)?;
            let mut seed = vec![0.0; order - 1];
            seed.push(line.slope);
            seed.push(line.intercept);
            seed
        }
    };

    for iteration in 0..MAX_ODR_ITERATIONS {
        let poly = Polynomial::new(coeffs.clone())
            .expect("order >= 1 guarantees a non-empty coefficient list");
        let deriv = poly.derivative();

        // Project each point onto the current curve, then refit through the
        // foot abscissae. Weighting rows by sqrt(1 + p'^2) makes the refit a
        // Gauss-Newton step on the perpendicular-distance objective.
        let feet: Vec<f64> = x
            .iter()
            .zip(y.iter())
            .map(|(&xi, &yi)| foot_abscissa(&poly, &deriv, xi, yi))
            .collect();

        let n = x.len();
        let mut design = DMatrix::zeros(n, order + 1);
        let mut target = DVector::zeros(n);
        for (i, (&fx, &yi)) in feet.iter().zip(y.iter()).enumerate() {
            let weight = (1.0 + deriv.eval(fx).powi(2)).sqrt();
            let mut basis = 1.0;
            // Fill lowest degree last to keep highest-degree-first ordering.
            for j in (0..=order).rev() {
                design[(i, j)] = basis * weight;
                basis *= fx;
            }
            target[i] = yi * weight;
        }

        let solution = design
            .svd(true, true)
            .solve(&target, f64::EPSILON)
            .map_err(|_| FitError::SvdFailed)?;

        let delta = coeffs
            .iter()
            .zip(solution.iter())
            .map(|(old, new)| (old - new).abs())
            .fold(0.0, f64::max);
        coeffs.copy_from_slice(solution.as_slice());

        if delta < COEFF_TOLERANCE {
            log::debug!(
                "orthogonal regression converged after {} iterations (order {})",
                iteration + 1,
                order
            );
            return Ok(coeffs);
        }
    }

    Err(FitError::NonConvergence {
        iterations: MAX_ODR_ITERATIONS,
    })
}

/// Abscissa of the point on `poly` nearest to (`x`, `y`).
///
/// Newton iteration on the stationarity condition
/// `(t - x) + p'(t) * (p(t) - y) = 0`, seeded at `x`. The seed is already
/// optimal when the point lies on the curve, so noiseless fits settle
/// immediately.
fn foot_abscissa(poly: &Polynomial, deriv: &Polynomial, x: f64, y: f64) -> f64 {
    let second = deriv.derivative();
    let mut t = x;
    for _ in 0..MAX_FOOT_ITERATIONS {
        let residual = poly.eval(t) - y;
        let slope = deriv.eval(t);
        let g = (t - x) + slope * residual;
        let g_prime = 1.0 + second.eval(t) * residual + slope * slope;
        if g_prime.abs() < f64::EPSILON {
            break;
        }
        let step = g / g_prime;
        t -= step;
        if step.abs() < 1e-14 {
            break;
        }
    }
    t
}
