//! Ivezic et al. 2004 P1/P2 axis construction in color-color space.
//!
//! The stellar locus in a color-color diagram (x = c1 - c2, y = c2 - c3 for
//! three photometric bands) is characterized by a pair of orthogonal axes:
//! P2 measures perpendicular distance from the locus, P1 runs along it. Both
//! are expressed as 4-vectors (c1, c2, c3, const) over the band magnitudes,
//! following Ivezic et al. 2004 (2004AN....325..583I).
//!
//! Degenerate geometry (a vertical or horizontal equivalent line) is raised
//! as [`LocusError::DegenerateAxis`] rather than propagated as NaN.

use nalgebra::{Matrix2, Vector2};
use thiserror::Error;

/// Errors raised by the locus geometry routines.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LocusError {
    /// Axis geometry is undefined (zero normal component or zero slope).
    #[error("degenerate axis geometry: {0}")]
    DegenerateAxis(String),

    /// The origin root-finder did not settle.
    #[error("root finder did not converge after {iterations} iterations")]
    NonConvergence { iterations: usize },

    /// Coefficient and exponent-label lists differ in length.
    #[error("lengths of coefficient list ({coeffs}) and exponent list ({exponents}) are not equal")]
    LengthMismatch { coeffs: usize, exponents: usize },
}

/// P2 and P1 coefficient vectors derived from a linear locus fit.
#[derive(Debug, Clone, PartialEq)]
pub struct LocusFit {
    /// Four P2 equation coefficients (unit-normalized perpendicular axis).
    pub p2_coeffs: [f64; 4],
    /// Four P1 equation coefficients (parallel axis, zero at the origin).
    pub p1_coeffs: [f64; 4],
}

/// Slope/intercept of the P1 line recovered from P2 coefficients.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct P1Line {
    pub slope: f64,
    pub intercept: f64,
}

/// Full P1/P2 axis geometry in color-color coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocusAxes {
    /// Slope and intercept of the P2 (perpendicular) line.
    pub m_p2: f64,
    pub b_p2: f64,
    /// Slope and intercept of the P1 (parallel) line.
    pub m_p1: f64,
    pub b_p1: f64,
    /// Intersection of the two axes: the origin where P1 = 0.
    pub x0: f64,
    pub y0: f64,
}

const MAX_NEWTON_ITERATIONS: usize = 50;
const NEWTON_TOLERANCE: f64 = 1e-12;

/// Compute P1 coefficients from P2 coefficients and the axis origin.
///
/// `theta = arctan(mP1)`, where `mP1` is the slope of the straight line
/// equivalent to the P2 axis in (x, y) coordinates. The P1 axis is then
/// `cos(theta)*x + sin(theta)*y + delta`, with `delta` chosen so that
/// P1 = 0 exactly at (`x0`, `y0`).
///
/// # Errors
/// [`LocusError::DegenerateAxis`] when the third P2 component is zero and
/// the equivalent slope is undefined.
pub fn p1_coeffs_from_p2_origin(
    p2_coeffs: &[f64; 4],
    x0: f64,
    y0: f64,
) -> Result<[f64; 4], LocusError> {
    if p2_coeffs[2].abs() < f64::EPSILON {
        return Err(LocusError::DegenerateAxis(
            "third P2 component is zero, equivalent P1 slope is undefined".to_string(),
        ));
    }
    let m_p1 = p2_coeffs[0] / p2_coeffs[2];
    let theta = m_p1.atan();
    let (sin_theta, cos_theta) = theta.sin_cos();
    let delta = -cos_theta * x0 - sin_theta * y0;
    Ok([cos_theta, sin_theta - cos_theta, -sin_theta, delta])
}

/// Derive P2 and P1 coefficient vectors from a linear locus fit.
///
/// For the fit `y = m*x + b` with x = c1 - c2 and y = c2 - c3:
///
/// ```text
/// P2 = (-m*c1 + (m + 1)*c2 - c3 - b) / sqrt(m^2 + 1)
/// ```
///
/// after which all four components are re-normalized by the L2 norm of the
/// first three, so the linear part is a true unit normal with the constant
/// term scaled identically. P1 follows via [`p1_coeffs_from_p2_origin`]
/// anchored at (`x0`, `y0`).
pub fn p2p1_coeffs_from_linear_fit(
    m: f64,
    b: f64,
    x0: f64,
    y0: f64,
) -> Result<LocusFit, LocusError> {
    let scale = (m * m + 1.0).sqrt();
    let mut p2_coeffs = [-m / scale, (m + 1.0) / scale, -1.0 / scale, -b / scale];

    // Unit-normalize the perpendicular vector; the constant term is scaled
    // by the same factor but excluded from the norm itself.
    let norm = p2_coeffs[..3].iter().map(|c| c * c).sum::<f64>().sqrt();
    for coeff in &mut p2_coeffs {
        *coeff /= norm;
    }

    let p1_coeffs = p1_coeffs_from_p2_origin(&p2_coeffs, x0, y0)?;
    Ok(LocusFit {
        p2_coeffs,
        p1_coeffs,
    })
}

/// Recover the P1 line (slope, intercept) from P2 coefficients.
///
/// Inverse of part of [`p2p1_coeffs_from_linear_fit`]: reconstructs the
/// plottable line from the implicit P2 plane equation.
pub fn line_from_p2_coeffs(p2_coeffs: &[f64; 4]) -> Result<P1Line, LocusError> {
    if p2_coeffs[2].abs() < f64::EPSILON {
        return Err(LocusError::DegenerateAxis(
            "third P2 component is zero, equivalent P1 slope is undefined".to_string(),
        ));
    }
    let slope = p2_coeffs[0] / p2_coeffs[2];
    let intercept = -p2_coeffs[3] * (slope * slope + (slope + 1.0).powi(2) + 1.0).sqrt();
    Ok(P1Line { slope, intercept })
}

/// Derive the full P1/P2 axis geometry from both coefficient vectors.
///
/// The P1 line comes from [`line_from_p2_coeffs`]; the P2 line is its
/// perpendicular; the shared origin (x0, y0) is the root of
///
/// ```text
/// cos(theta)*x + sin(theta)*y + p1Coeffs[3] = 0
/// mP1*x - y + bP1 = 0
/// ```
///
/// solved with a Newton iteration seeded at (1, 1).
///
/// # Errors
/// * [`LocusError::DegenerateAxis`] - zero P1 slope (P2 slope undefined)
/// * [`LocusError::NonConvergence`] - the root-finder failed to settle; a
///   stale seed value is never returned
pub fn lines_from_p2_p1_coeffs(
    p2_coeffs: &[f64; 4],
    p1_coeffs: &[f64; 4],
) -> Result<LocusAxes, LocusError> {
    let p1_line = line_from_p2_coeffs(p2_coeffs)?;
    let m_p1 = p1_line.slope;
    let b_p1 = p1_line.intercept;

    if m_p1.abs() < f64::EPSILON {
        return Err(LocusError::DegenerateAxis(
            "P1 slope is zero, perpendicular P2 slope is undefined".to_string(),
        ));
    }

    let theta = m_p1.atan();
    let (sin_theta, cos_theta) = theta.sin_cos();
    let delta = p1_coeffs[3];

    let origin = newton_2d(
        |p| {
            let value = Vector2::new(
                cos_theta * p.x + sin_theta * p.y + delta,
                m_p1 * p.x - p.y + b_p1,
            );
            let jacobian = Matrix2::new(cos_theta, sin_theta, m_p1, -1.0);
            (value, jacobian)
        },
        Vector2::new(1.0, 1.0),
    )?;

    let m_p2 = -1.0 / m_p1;
    let b_p2 = origin.y - m_p2 * origin.x;
    Ok(LocusAxes {
        m_p2,
        b_p2,
        m_p1,
        b_p1,
        x0: origin.x,
        y0: origin.y,
    })
}

/// Newton root-finder for a 2-equation system.
///
/// Non-convergence and singular Jacobians are reported as errors instead of
/// handing back the last iterate.
fn newton_2d<F>(mut system: F, seed: Vector2<f64>) -> Result<Vector2<f64>, LocusError>
where
    F: FnMut(Vector2<f64>) -> (Vector2<f64>, Matrix2<f64>),
{
    let mut point = seed;
    for _ in 0..MAX_NEWTON_ITERATIONS {
        let (value, jacobian) = system(point);
        if value.norm() < NEWTON_TOLERANCE {
            return Ok(point);
        }
        let step = jacobian
            .lu()
            .solve(&value)
            .ok_or(LocusError::NonConvergence {
                iterations: MAX_NEWTON_ITERATIONS,
            })?;
        point -= step;
    }

    // One more residual check in case the last step landed on the root.
    let (value, _) = system(point);
    if value.norm() < NEWTON_TOLERANCE {
        return Ok(point);
    }
    Err(LocusError::NonConvergence {
        iterations: MAX_NEWTON_ITERATIONS,
    })
}
