//! Stateless functors deriving plotted quantities from catalog columns.
//!
//! Each functor captures the column names (and an optional unit scale) it
//! needs, and derives one value per source when applied to a catalog. They
//! are the quantity definitions behind the QA scatter plots: magnitude
//! differences, astrometric offsets, trace sizes and ellipticity residuals.
//!
//! Matched-catalog functors expect the `first_`/`second_` column prefixes
//! produced by [`crate::catalog::join`].

use ndarray::ArrayView1;
use std::fmt;

use crate::catalog::{CatalogError, SourceCatalog};

/// Radians to arcseconds, for astrometric offsets.
const RADIANS_TO_ARCSEC: f64 = 206_264.806_247_096_36;

/// Factor converting a relative flux error to a magnitude error.
const MAG_ERR_FACTOR: f64 = 2.5 / std::f64::consts::LN_10;

/// A derived per-source quantity.
pub trait CatalogFunctor {
    /// Compute one value per source from the catalog columns.
    fn derive(&self, catalog: &SourceCatalog) -> Result<Vec<f64>, CatalogError>;
}

/// Flux ratio expressed as a magnitude difference: -2.5 log10(f1/f2).
fn mag_diff(flux1: &[f64], flux2: &[f64], unit_scale: f64) -> Vec<f64> {
    flux1
        .iter()
        .zip(flux2.iter())
        .map(|(&f1, &f2)| -2.5 * (f1 / f2).log10() * unit_scale)
        .collect()
}

/// Trace radius sqrt(0.5*(Ixx + Iyy)) from a moment column family.
fn trace_size(catalog: &SourceCatalog, column: &str) -> Result<Vec<f64>, CatalogError> {
    let xx = ArrayView1::from(catalog.floats(&format!("{}_xx", column))?);
    let yy = ArrayView1::from(catalog.floats(&format!("{}_yy", column))?);
    Ok(((&xx + &yy) * 0.5).mapv(f64::sqrt).to_vec())
}

/// Percent difference normalized by the pairwise mean.
fn percent_diff(first: &[f64], second: &[f64]) -> Vec<f64> {
    first
        .iter()
        .zip(second.iter())
        .map(|(&a, &b)| 100.0 * (a - b) / (0.5 * (a + b)))
        .collect()
}

/// Magnitude difference between two flux columns of one catalog.
#[derive(Debug, Clone)]
pub struct MagDiff {
    pub col1: String,
    pub col2: String,
    pub unit_scale: f64,
}

impl CatalogFunctor for MagDiff {
    fn derive(&self, catalog: &SourceCatalog) -> Result<Vec<f64>, CatalogError> {
        let flux1 = catalog.floats(&self.col1)?;
        let flux2 = catalog.floats(&self.col2)?;
        Ok(mag_diff(flux1, flux2, self.unit_scale))
    }
}

/// Magnitude difference for one flux column between the two sides of a
/// joined comparison catalog (column entries are fluxes, converted here).
#[derive(Debug, Clone)]
pub struct MagDiffCompare {
    pub column: String,
    pub unit_scale: f64,
}

impl CatalogFunctor for MagDiffCompare {
    fn derive(&self, catalog: &SourceCatalog) -> Result<Vec<f64>, CatalogError> {
        let flux1 = catalog.floats(&format!("first_{}", self.column))?;
        let flux2 = catalog.floats(&format!("second_{}", self.column))?;
        Ok(mag_diff(flux1, flux2, self.unit_scale))
    }
}

/// Difference between two astrometric coordinate columns, in arcseconds.
///
/// Right-ascension comparisons supply the matching declination columns so
/// the offset is scaled by cos(dec).
#[derive(Debug, Clone)]
pub struct AstrometryDiff {
    pub first: String,
    pub second: String,
    pub declination1: Option<String>,
    pub declination2: Option<String>,
    pub unit_scale: f64,
}

impl CatalogFunctor for AstrometryDiff {
    fn derive(&self, catalog: &SourceCatalog) -> Result<Vec<f64>, CatalogError> {
        let first = catalog.floats(&self.first)?;
        let second = catalog.floats(&self.second)?;

        let cos_dec = |name: &Option<String>| -> Result<Option<Vec<f64>>, CatalogError> {
            match name {
                Some(column) => Ok(Some(
                    catalog.floats(column)?.iter().map(|d| d.cos()).collect(),
                )),
                None => Ok(None),
            }
        };
        let cos1 = cos_dec(&self.declination1)?;
        let cos2 = cos_dec(&self.declination2)?;

        Ok(first
            .iter()
            .zip(second.iter())
            .enumerate()
            .map(|(i, (&a, &b))| {
                let c1 = cos1.as_ref().map_or(1.0, |c| c[i]);
                let c2 = cos2.as_ref().map_or(1.0, |c| c[i]);
                (a * c1 - b * c2) * RADIANS_TO_ARCSEC * self.unit_scale
            })
            .collect())
    }
}

/// Trace radius size for each source.
#[derive(Debug, Clone)]
pub struct TraceSize {
    pub column: String,
}

impl CatalogFunctor for TraceSize {
    fn derive(&self, catalog: &SourceCatalog) -> Result<Vec<f64>, CatalogError> {
        trace_size(catalog, &self.column)
    }
}

/// Trace radius difference (%) between a source and its PSF model.
#[derive(Debug, Clone)]
pub struct PsfTraceSizeDiff {
    pub column: String,
    pub psf_column: String,
}

impl CatalogFunctor for PsfTraceSizeDiff {
    fn derive(&self, catalog: &SourceCatalog) -> Result<Vec<f64>, CatalogError> {
        let src = trace_size(catalog, &self.column)?;
        let psf = trace_size(catalog, &self.psf_column)?;
        Ok(percent_diff(&src, &psf))
    }
}

/// Trace radius difference (%) between the two sides of a joined catalog.
#[derive(Debug, Clone)]
pub struct TraceSizeCompare {
    pub column: String,
}

impl CatalogFunctor for TraceSizeCompare {
    fn derive(&self, catalog: &SourceCatalog) -> Result<Vec<f64>, CatalogError> {
        let first = trace_size(catalog, &format!("first_{}", self.column))?;
        let second = trace_size(catalog, &format!("second_{}", self.column))?;
        Ok(percent_diff(&first, &second))
    }
}

/// Percent difference of one column between the two sides of a joined
/// catalog.
#[derive(Debug, Clone)]
pub struct PercentDiff {
    pub column: String,
}

impl CatalogFunctor for PercentDiff {
    fn derive(&self, catalog: &SourceCatalog) -> Result<Vec<f64>, CatalogError> {
        let first = catalog.floats(&format!("first_{}", self.column))?;
        let second = catalog.floats(&format!("second_{}", self.column))?;
        Ok(percent_diff(first, second))
    }
}

/// e1 ellipticity residual between a source and its PSF model:
/// (Ixx - Iyy)/(Ixx + Iyy) differenced.
#[derive(Debug, Clone)]
pub struct E1Resids {
    pub column: String,
    pub psf_column: String,
    pub unit_scale: f64,
}

impl CatalogFunctor for E1Resids {
    fn derive(&self, catalog: &SourceCatalog) -> Result<Vec<f64>, CatalogError> {
        let e1 = |column: &str| -> Result<Vec<f64>, CatalogError> {
            let xx = catalog.floats(&format!("{}_xx", column))?;
            let yy = catalog.floats(&format!("{}_yy", column))?;
            Ok(xx
                .iter()
                .zip(yy.iter())
                .map(|(&x, &y)| (x - y) / (x + y))
                .collect())
        };
        let src = e1(&self.column)?;
        let psf = e1(&self.psf_column)?;
        Ok(src
            .iter()
            .zip(psf.iter())
            .map(|(&s, &p)| (s - p) * self.unit_scale)
            .collect())
    }
}

/// e2 ellipticity residual between a source and its PSF model:
/// 2*Ixy/(Ixx + Iyy) differenced.
#[derive(Debug, Clone)]
pub struct E2Resids {
    pub column: String,
    pub psf_column: String,
    pub unit_scale: f64,
}

impl CatalogFunctor for E2Resids {
    fn derive(&self, catalog: &SourceCatalog) -> Result<Vec<f64>, CatalogError> {
        let e2 = |column: &str| -> Result<Vec<f64>, CatalogError> {
            let xx = catalog.floats(&format!("{}_xx", column))?;
            let yy = catalog.floats(&format!("{}_yy", column))?;
            let xy = catalog.floats(&format!("{}_xy", column))?;
            Ok(xx
                .iter()
                .zip(yy.iter())
                .zip(xy.iter())
                .map(|((&x, &y), &c)| 2.0 * c / (x + y))
                .collect())
        };
        let src = e2(&self.column)?;
        let psf = e2(&self.psf_column)?;
        Ok(src
            .iter()
            .zip(psf.iter())
            .map(|(&s, &p)| (s - p) * self.unit_scale)
            .collect())
    }
}

/// e1 residual between the HSM regauss shape and the HSM PSF moments.
///
/// The regauss measurement reports e1 directly; only the PSF side is
/// reconstructed from moments.
#[derive(Debug, Clone)]
pub struct E1ResidsHsmRegauss {
    pub unit_scale: f64,
}

impl CatalogFunctor for E1ResidsHsmRegauss {
    fn derive(&self, catalog: &SourceCatalog) -> Result<Vec<f64>, CatalogError> {
        let src = catalog.floats("ext_shapeHSM_HsmShapeRegauss_e1")?;
        let xx = catalog.floats("ext_shapeHSM_HsmPsfMoments_xx")?;
        let yy = catalog.floats("ext_shapeHSM_HsmPsfMoments_yy")?;
        Ok(src
            .iter()
            .zip(xx.iter().zip(yy.iter()))
            .map(|(&s, (&x, &y))| (s - (x - y) / (x + y)) * self.unit_scale)
            .collect())
    }
}

/// e2 residual between the HSM regauss shape and the HSM PSF moments.
#[derive(Debug, Clone)]
pub struct E2ResidsHsmRegauss {
    pub unit_scale: f64,
}

impl CatalogFunctor for E2ResidsHsmRegauss {
    fn derive(&self, catalog: &SourceCatalog) -> Result<Vec<f64>, CatalogError> {
        let src = catalog.floats("ext_shapeHSM_HsmShapeRegauss_e2")?;
        let xx = catalog.floats("ext_shapeHSM_HsmPsfMoments_xx")?;
        let yy = catalog.floats("ext_shapeHSM_HsmPsfMoments_yy")?;
        let xy = catalog.floats("ext_shapeHSM_HsmPsfMoments_xy")?;
        Ok(src
            .iter()
            .zip(xx.iter().zip(yy.iter()).zip(xy.iter()))
            .map(|(&s, ((&x, &y), &c))| (s - 2.0 * c / (x + y)) * self.unit_scale)
            .collect())
    }
}

/// Deconvolved trace moments: source moments minus PSF moments.
///
/// Prefers the HSM source and PSF moments, falling back per source to the
/// SDSS shape where the HSM measurement is absent or not finite.
#[derive(Debug, Clone)]
pub struct DeconvolvedMoments;

impl CatalogFunctor for DeconvolvedMoments {
    fn derive(&self, catalog: &SourceCatalog) -> Result<Vec<f64>, CatalogError> {
        let sdss: Vec<f64> = catalog
            .floats("base_SdssShape_xx")?
            .iter()
            .zip(catalog.floats("base_SdssShape_yy")?.iter())
            .map(|(&x, &y)| x + y)
            .collect();

        let hsm: Vec<f64> = if catalog.contains("ext_shapeHSM_HsmSourceMoments_xx") {
            catalog
                .floats("ext_shapeHSM_HsmSourceMoments_xx")?
                .iter()
                .zip(catalog.floats("ext_shapeHSM_HsmSourceMoments_yy")?.iter())
                .map(|(&x, &y)| x + y)
                .collect()
        } else {
            vec![f64::NAN; sdss.len()]
        };

        let psf_family = if catalog.contains("ext_shapeHSM_HsmPsfMoments_xx") {
            "ext_shapeHSM_HsmPsfMoments"
        } else if catalog.contains("base_SdssShape_psf_xx") {
            "base_SdssShape_psf"
        } else {
            return Err(CatalogError::SchemaMismatch(
                "no psf shape parameter found in catalog".to_string(),
            ));
        };
        let psf: Vec<f64> = catalog
            .floats(&format!("{}_xx", psf_family))?
            .iter()
            .zip(catalog.floats(&format!("{}_yy", psf_family))?.iter())
            .map(|(&x, &y)| x + y)
            .collect();

        Ok(hsm
            .iter()
            .zip(sdss.iter())
            .zip(psf.iter())
            .map(|((&h, &s), &p)| if h.is_finite() { h } else { s } - p)
            .collect())
    }
}

// Logistic star/galaxy classifier trained on deconvolved moments and
// PSF-flux signal to noise.
const STAR_GAL_POLY: [f64; 10] = [
    -4.2759879274,
    0.0713088756641,
    0.16352932561,
    -4.54656639596e-05,
    -0.0482134274008,
    4.41366874902e-13,
    7.58973714641e-09,
    1.51008430135e-05,
    4.38493363998e-14,
    1.83899834142e-20,
];

/// P(star) from the deconvolved moments and the PSF-flux S/N.
#[derive(Debug, Clone)]
pub struct DeconvolvedMomentsStarGal;

impl CatalogFunctor for DeconvolvedMomentsStarGal {
    fn derive(&self, catalog: &SourceCatalog) -> Result<Vec<f64>, CatalogError> {
        let r_trace = DeconvolvedMoments.derive(catalog)?;
        let flux = catalog.floats("base_PsfFlux_instFlux")?;
        let err = catalog.floats("base_PsfFlux_instFluxErr")?;

        Ok(r_trace
            .iter()
            .zip(flux.iter().zip(err.iter()))
            .map(|(&r, (&f, &e))| {
                let s = f / e;
                let c = &STAR_GAL_POLY;
                let poly = c[0]
                    + c[1] * s
                    + c[2] * r
                    + c[3] * s * s
                    + c[4] * s * r
                    + c[5] * r * r
                    + c[6] * s * s * s
                    + c[7] * s * s * r
                    + c[8] * s * r * r
                    + c[9] * r * r * r;
                1.0 / (1.0 + (-poly).exp())
            })
            .collect())
    }
}

/// Footprint pixel-count difference between the sides of a joined catalog.
#[derive(Debug, Clone)]
pub struct FootNpixDiffCompare {
    pub column: String,
}

impl CatalogFunctor for FootNpixDiffCompare {
    fn derive(&self, catalog: &SourceCatalog) -> Result<Vec<f64>, CatalogError> {
        let first = catalog.ints(&format!("first_{}", self.column))?;
        let second = catalog.ints(&format!("second_{}", self.column))?;
        Ok(first
            .iter()
            .zip(second.iter())
            .map(|(&a, &b)| (a - b) as f64)
            .collect())
    }
}

/// Combined magnitude-difference error from both sides of a joined catalog.
///
/// Per-side magnitude errors are (2.5/ln 10) * fluxErr/flux, added in
/// quadrature. The zero point cancels in the difference, so none is needed.
#[derive(Debug, Clone)]
pub struct MagDiffErr {
    pub column: String,
    pub unit_scale: f64,
}

impl CatalogFunctor for MagDiffErr {
    fn derive(&self, catalog: &SourceCatalog) -> Result<Vec<f64>, CatalogError> {
        let mag_err = |side: &str| -> Result<Vec<f64>, CatalogError> {
            let flux = catalog.floats(&format!("{}_{}", side, self.column))?;
            let err = catalog.floats(&format!("{}_{}Err", side, self.column))?;
            Ok(flux
                .iter()
                .zip(err.iter())
                .map(|(&f, &e)| MAG_ERR_FACTOR * e / f)
                .collect())
        };
        let err1 = mag_err("first")?;
        let err2 = mag_err("second")?;
        Ok(err1
            .iter()
            .zip(err2.iter())
            .map(|(&a, &b)| a.hypot(b) * self.unit_scale)
            .collect())
    }
}

/// Quadrature sum of a column's errors from both sides of a joined catalog.
#[derive(Debug, Clone)]
pub struct ApCorrDiffErr {
    pub column: String,
    pub unit_scale: f64,
}

impl CatalogFunctor for ApCorrDiffErr {
    fn derive(&self, catalog: &SourceCatalog) -> Result<Vec<f64>, CatalogError> {
        let err1 = catalog.floats(&format!("first_{}Err", self.column))?;
        let err2 = catalog.floats(&format!("second_{}Err", self.column))?;
        Ok(err1
            .iter()
            .zip(err2.iter())
            .map(|(&a, &b)| a.hypot(b) * self.unit_scale)
            .collect())
    }
}

/// Centroid axis selector for [`CentroidDiff`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CentroidComponent {
    X,
    Y,
}

impl fmt::Display for CentroidComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CentroidComponent::X => write!(f, "x"),
            CentroidComponent::Y => write!(f, "y"),
        }
    }
}

/// Centroid difference along one axis between the sides of a joined
/// catalog. The two sides may use different centroid algorithms.
#[derive(Debug, Clone)]
pub struct CentroidDiff {
    pub component: CentroidComponent,
    pub centroid1: String,
    pub centroid2: String,
    pub unit_scale: f64,
}

impl CatalogFunctor for CentroidDiff {
    fn derive(&self, catalog: &SourceCatalog) -> Result<Vec<f64>, CatalogError> {
        let first = catalog.floats(&format!("first_{}_{}", self.centroid1, self.component))?;
        let second = catalog.floats(&format!("second_{}_{}", self.centroid2, self.component))?;
        Ok(first
            .iter()
            .zip(second.iter())
            .map(|(&a, &b)| (a - b) * self.unit_scale)
            .collect())
    }
}

/// Error on a centroid difference along one axis: the two sides' centroid
/// errors added in quadrature.
#[derive(Debug, Clone)]
pub struct CentroidDiffErr {
    pub component: CentroidComponent,
    pub centroid1: String,
    pub centroid2: String,
    pub unit_scale: f64,
}

impl CatalogFunctor for CentroidDiffErr {
    fn derive(&self, catalog: &SourceCatalog) -> Result<Vec<f64>, CatalogError> {
        let first =
            catalog.floats(&format!("first_{}_{}Err", self.centroid1, self.component))?;
        let second =
            catalog.floats(&format!("second_{}_{}Err", self.centroid2, self.component))?;
        Ok(first
            .iter()
            .zip(second.iter())
            .map(|(&a, &b)| a.hypot(b) * self.unit_scale)
            .collect())
    }
}
