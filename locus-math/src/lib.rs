//! Numerical geometry for stellar-locus analysis in color-color space.
//!
//! This crate provides the math underneath the survey catalog QA tools:
//! orthogonal distance regression of polynomials to color-color point sets,
//! the Ivezic et al. 2004 P1/P2 orthogonal photometric axis construction,
//! and the small helpers (point-to-curve distance, equation formatting) that
//! the plotting layer consumes.
//!
//! All functions here are pure: they take caller-owned slices and scalars and
//! return freshly computed results. There is no I/O and no shared state.

pub mod eqn;
pub mod locus;
pub mod poly;
pub mod regression;

pub use eqn::make_eqn_str;
pub use locus::{
    lines_from_p2_p1_coeffs, p1_coeffs_from_p2_origin, p2p1_coeffs_from_linear_fit, LocusAxes,
    LocusError, LocusFit, P1Line,
};
pub use poly::{distance_squared_to_poly, Polynomial};
pub use regression::{linear_regression, orthogonal_regression, FitError, LineFit};
