//! Photometric calibration of catalog flux columns.
//!
//! Instrumental fluxes come out of the measurement pipeline in detector
//! counts. These helpers locate the flux columns in a catalog, rescale them
//! to a common zero point, undo previously applied aperture corrections,
//! and convert absolute fluxes from jansky to the AB reference scale.

use crate::catalog::{CatalogError, ColumnKind, SourceCatalog};

/// AB flux reference, in jansky.
pub const JANSKYS_PER_AB_FLUX: f64 = 3631.0;

/// Instrumental flux column with its error column, when one exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FluxKey {
    pub flux: String,
    pub err: Option<String>,
}

/// Locate the instrumental flux columns of a catalog.
///
/// A flux column is a float column whose name ends in `_instFlux` and does
/// not start with `slot` (slot names alias a measurement column that is
/// already in the list). The paired `...Err` column is attached when
/// present.
///
/// # Errors
/// [`CatalogError::NoFluxColumns`] when the catalog has none.
pub fn find_flux_keys(catalog: &SourceCatalog) -> Result<Vec<FluxKey>, CatalogError> {
    let mut keys = Vec::new();
    for name in catalog.column_names() {
        if !name.ends_with("_instFlux") || name.starts_with("slot") {
            continue;
        }
        if catalog.kind_of(name) != Some(ColumnKind::Float) {
            continue;
        }
        let err_name = format!("{}Err", name);
        let err = catalog.contains(&err_name).then_some(err_name);
        keys.push(FluxKey {
            flux: name.to_string(),
            err,
        });
    }
    if keys.is_empty() {
        return Err(CatalogError::NoFluxColumns);
    }
    Ok(keys)
}

/// Rescale every instrumental flux (and error) column to a zero point.
///
/// Divides by `10^(0.4 * zero_point)` so calibrated magnitudes read
/// directly as `-2.5 log10(flux)`.
pub fn calibrate_source_catalog(
    catalog: &mut SourceCatalog,
    zero_point: f64,
) -> Result<(), CatalogError> {
    let factor = 10f64.powf(0.4 * zero_point);
    log::debug!(
        "calibrating fluxes to zero point {} (factor {:.6e})",
        zero_point,
        factor
    );
    for key in find_flux_keys(catalog)? {
        for flux in catalog.floats_mut(&key.flux)? {
            *flux /= factor;
        }
        if let Some(err_name) = &key.err {
            for err in catalog.floats_mut(err_name)? {
                *err /= factor;
            }
        }
    }
    Ok(())
}

/// Undo per-source aperture corrections on the flux columns.
///
/// Each flux column whose algorithm has a sibling `_apCorr` column is
/// divided by it per source, restoring the uncorrected instrumental flux.
pub fn backout_ap_corr(catalog: &mut SourceCatalog) -> Result<(), CatalogError> {
    log::info!("backing out aperture corrections from instrumental fluxes");
    for key in find_flux_keys(catalog)? {
        let ap_corr_name = format!(
            "{}_apCorr",
            key.flux.trim_end_matches("_instFlux")
        );
        if !catalog.contains(&ap_corr_name) {
            continue;
        }
        let ap_corr = catalog.floats(&ap_corr_name)?.to_vec();
        for (flux, corr) in catalog.floats_mut(&key.flux)?.iter_mut().zip(ap_corr.iter()) {
            *flux /= corr;
        }
        if let Some(err_name) = &key.err {
            for (err, corr) in catalog.floats_mut(err_name)?.iter_mut().zip(ap_corr.iter()) {
                *err /= corr;
            }
        }
    }
    Ok(())
}

/// Convert absolute flux columns from jansky to the AB reference scale.
///
/// Applies to every float column whose name ends in `_flux`, along with its
/// `...Err` and `..._fluxSigma` companions when present.
pub fn jansky_to_ab_scale(catalog: &mut SourceCatalog) -> Result<(), CatalogError> {
    let targets: Vec<String> = catalog
        .column_names()
        .filter(|name| {
            name.ends_with("_flux") || name.ends_with("_fluxErr") || name.ends_with("_fluxSigma")
        })
        .filter(|name| catalog.kind_of(name) == Some(ColumnKind::Float))
        .map(str::to_string)
        .collect();
    for name in targets {
        for value in catalog.floats_mut(&name)? {
            *value /= JANSKYS_PER_AB_FLUX;
        }
    }
    Ok(())
}

/// Short algorithm label for a flux column name.
///
/// Callers compose the axis text around the bare label (e.g.
/// `mag_{PSF}`). Unknown algorithms fall back to the column name itself
/// with a warning, so a plot still renders with a legible (if verbose)
/// label.
pub fn flux_to_plot_string(flux_column: &str) -> String {
    let algorithm = flux_column
        .trim_end_matches("_instFlux")
        .trim_end_matches("_flux");
    let label = match algorithm {
        "base_PsfFlux" => "PSF",
        "base_GaussianFlux" => "Gaussian",
        "ext_photometryKron_KronFlux" => "Kron",
        "modelfit_CModel" => "CModel",
        "base_CircularApertureFlux_12_0" => "CircAper 12pix",
        _ => {
            log::warn!(
                "unknown flux column {:?}: using the column name as plot label",
                flux_column
            );
            return flux_column.to_string();
        }
    };
    label.to_string()
}
