//! Color construction from per-band magnitude arrays.

use std::collections::HashMap;

use crate::catalog::{CatalogError, SourceCatalog};

/// Calibrated magnitudes for one flux column: -2.5 log10(flux).
pub fn magnitudes_from_flux(
    catalog: &SourceCatalog,
    column: &str,
) -> Result<Vec<f64>, CatalogError> {
    Ok(catalog
        .floats(column)?
        .iter()
        .map(|&f| -2.5 * f.log10())
        .collect())
}

/// Color `band1 - band2` over the sources where `good` is set.
///
/// `mags` maps band names to equal-length magnitude arrays, one entry per
/// source. Without a `good` mask every source contributes.
pub fn cat_colors(
    band1: &str,
    band2: &str,
    mags: &HashMap<String, Vec<f64>>,
    good: Option<&[bool]>,
) -> Result<Vec<f64>, CatalogError> {
    let m1 = mags
        .get(band1)
        .ok_or_else(|| CatalogError::MissingColumn(band1.to_string()))?;
    let m2 = mags
        .get(band2)
        .ok_or_else(|| CatalogError::MissingColumn(band2.to_string()))?;
    if m1.len() != m2.len() {
        return Err(CatalogError::LengthMismatch {
            expected: m1.len(),
            got: m2.len(),
        });
    }
    if let Some(mask) = good {
        if mask.len() != m1.len() {
            return Err(CatalogError::LengthMismatch {
                expected: m1.len(),
                got: mask.len(),
            });
        }
    }

    Ok(m1
        .iter()
        .zip(m2.iter())
        .enumerate()
        .filter(|(i, _)| good.map_or(true, |mask| mask[*i]))
        .map(|(_, (&a, &b))| a - b)
        .collect())
}
