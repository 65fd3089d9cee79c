//! Quality-assurance selection, statistics and limit enforcement.
//!
//! [`make_bad_array`] turns pipeline flag columns into a per-source bad
//! mask, [`Stats`] summarizes a derived quantity with sigma clipping, and
//! [`Enforcer`] checks those summaries against configured bounds.

use std::collections::HashMap;
use std::fmt;

use crate::catalog::{CatalogError, SourceCatalog};

/// Selection criteria for flagging sources as unusable for QA.
#[derive(Debug, Clone)]
pub struct BadSourceCriteria<'a> {
    /// Additional boolean flag columns that mark a source bad when set.
    pub flag_list: &'a [&'a str],
    /// Reject extended sources (classification value above 0.5).
    pub only_stars: bool,
    /// Reject sources outside the inner patch region.
    pub patch_inner_only: bool,
    /// Reject sources outside the inner tract region.
    pub tract_inner_only: bool,
}

impl Default for BadSourceCriteria<'_> {
    fn default() -> Self {
        Self {
            flag_list: &[],
            only_stars: false,
            patch_inner_only: true,
            tract_inner_only: false,
        }
    }
}

/// Per-source bad mask from the pipeline's flag columns.
///
/// A source is bad when it is a deblend parent (`deblend_nChild > 0`), when
/// any requested flag column is set, when it falls outside the requested
/// inner patch/tract region, or when it sits under a sky-object peak. With
/// `only_stars`, extended sources are bad too.
///
/// The patch/tract, sky-peak and extendedness columns only exist at certain
/// processing stages (coadd vs visit level), so each of those checks applies
/// only when its column is present. Requested `flag_list` columns and
/// `deblend_nChild` are always required.
pub fn make_bad_array(
    catalog: &SourceCatalog,
    criteria: &BadSourceCriteria<'_>,
) -> Result<Vec<bool>, CatalogError> {
    let n_child = catalog.ints("deblend_nChild")?;
    let mut bad: Vec<bool> = n_child.iter().map(|&n| n > 0).collect();

    for flag in criteria.flag_list {
        for (b, &f) in bad.iter_mut().zip(catalog.flags(flag)?.iter()) {
            *b |= f;
        }
    }
    if criteria.patch_inner_only && catalog.contains("detect_isPatchInner") {
        for (b, &inner) in bad.iter_mut().zip(catalog.flags("detect_isPatchInner")?.iter()) {
            *b |= !inner;
        }
    }
    if criteria.tract_inner_only && catalog.contains("detect_isTractInner") {
        for (b, &inner) in bad.iter_mut().zip(catalog.flags("detect_isTractInner")?.iter()) {
            *b |= !inner;
        }
    }
    if catalog.contains("merge_peak_sky") {
        for (b, &sky) in bad.iter_mut().zip(catalog.flags("merge_peak_sky")?.iter()) {
            *b |= sky;
        }
    }
    if criteria.only_stars && catalog.contains("base_ClassificationExtendedness_value") {
        let extendedness = catalog.floats("base_ClassificationExtendedness_value")?;
        for (b, &e) in bad.iter_mut().zip(extendedness.iter()) {
            *b |= e > 0.5;
        }
    }
    Ok(bad)
}

/// Sigma-clipped summary statistics of a derived quantity.
#[derive(Debug, Clone, PartialEq)]
pub struct Stats {
    /// Sources surviving selection and clipping.
    pub num: usize,
    /// Sources in the input, before any selection.
    pub total: usize,
    pub mean: f64,
    pub stdev: f64,
    pub median: f64,
    /// Half-width of the clip window applied around the median.
    pub clip: f64,
}

fn sample_stdev(values: &[f64], mean: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    (ss / (values.len() - 1) as f64).sqrt()
}

fn median_of(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        0.5 * (sorted[n / 2 - 1] + sorted[n / 2])
    }
}

impl Stats {
    /// Compute clipped statistics over the selected, finite entries.
    ///
    /// Entries where `good` is false (when given) or the value is not
    /// finite are dropped, then values farther than `n_sigma_clip` sample
    /// deviations from the median are clipped before the final pass.
    pub fn compute(
        values: &[f64],
        good: Option<&[bool]>,
        n_sigma_clip: f64,
    ) -> Result<Stats, CatalogError> {
        if let Some(mask) = good {
            if mask.len() != values.len() {
                return Err(CatalogError::LengthMismatch {
                    expected: values.len(),
                    got: mask.len(),
                });
            }
        }

        let mut selected: Vec<f64> = values
            .iter()
            .enumerate()
            .filter(|(i, v)| good.map_or(true, |m| m[*i]) && v.is_finite())
            .map(|(_, &v)| v)
            .collect();
        if selected.is_empty() {
            return Err(CatalogError::EmptyInput);
        }

        selected.sort_by(|a, b| a.total_cmp(b));
        let first_median = median_of(&selected);
        let first_mean = selected.iter().sum::<f64>() / selected.len() as f64;
        let clip = n_sigma_clip * sample_stdev(&selected, first_mean);

        let kept: Vec<f64> = selected
            .iter()
            .filter(|&&v| (v - first_median).abs() <= clip)
            .copied()
            .collect();
        // A zero-spread sample clips nothing.
        let kept = if kept.is_empty() { selected } else { kept };

        let mean = kept.iter().sum::<f64>() / kept.len() as f64;
        Ok(Stats {
            num: kept.len(),
            total: values.len(),
            mean,
            stdev: sample_stdev(&kept, mean),
            median: median_of(&kept),
            clip,
        })
    }

    fn lookup(&self, stat: &str) -> Result<f64, CatalogError> {
        match stat {
            "num" => Ok(self.num as f64),
            "total" => Ok(self.total as f64),
            "mean" => Ok(self.mean),
            "stdev" => Ok(self.stdev),
            "median" => Ok(self.median),
            "clip" => Ok(self.clip),
            other => Err(CatalogError::UnknownStatistic(other.to_string())),
        }
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Stats(mean={:.4}; stdev={:.4}; num={}; total={}; median={:.4}; clip={:.4})",
            self.mean, self.stdev, self.num, self.total, self.median, self.clip
        )
    }
}

/// Bounds on summary statistics, checked after each QA computation.
///
/// Violations are always logged; with `do_raise` they become errors so a
/// pipeline run fails instead of silently producing out-of-spec plots.
#[derive(Debug, Clone, Default)]
pub struct Enforcer {
    pub require_greater: HashMap<String, f64>,
    pub require_less: HashMap<String, f64>,
    pub do_raise: bool,
}

impl Enforcer {
    pub fn apply(&self, stats: &Stats, description: &str) -> Result<(), CatalogError> {
        for (stat, &limit) in &self.require_greater {
            let value = stats.lookup(stat)?;
            if value <= limit {
                self.violation(description, stat, value, "minimum", limit)?;
            }
        }
        for (stat, &limit) in &self.require_less {
            let value = stats.lookup(stat)?;
            if value >= limit {
                self.violation(description, stat, value, "maximum", limit)?;
            }
        }
        Ok(())
    }

    fn violation(
        &self,
        description: &str,
        stat: &str,
        value: f64,
        bound: &str,
        limit: f64,
    ) -> Result<(), CatalogError> {
        log::warn!(
            "{}: {} = {:.4} violates {} limit of {:.4}",
            description,
            stat,
            value,
            bound,
            limit
        );
        if self.do_raise {
            return Err(CatalogError::QaLimitExceeded {
                description: description.to_string(),
                stat: stat.to_string(),
                value,
                bound: bound.to_string(),
                limit,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ColumnValues;
    use approx::assert_relative_eq;

    fn flagged_catalog() -> SourceCatalog {
        let mut catalog = SourceCatalog::new();
        catalog
            .add_column("deblend_nChild", ColumnValues::Int(vec![0, 2, 0, 0]))
            .unwrap();
        catalog
            .add_flag("detect_isPatchInner", &[true, true, false, true])
            .unwrap();
        catalog
            .add_flag("base_PixelFlags_flag_saturated", &[false, false, false, true])
            .unwrap();
        catalog
            .add_column(
                "base_ClassificationExtendedness_value",
                ColumnValues::Float(vec![0.0, 0.0, 0.0, 1.0]),
            )
            .unwrap();
        catalog
    }

    #[test]
    fn test_make_bad_array_defaults() {
        let catalog = flagged_catalog();
        let bad = make_bad_array(&catalog, &BadSourceCriteria::default()).unwrap();
        // Deblend parent and patch-outer source are bad.
        assert_eq!(bad, vec![false, true, true, false]);
    }

    #[test]
    fn test_make_bad_array_with_flags_and_stars() {
        let catalog = flagged_catalog();
        let criteria = BadSourceCriteria {
            flag_list: &["base_PixelFlags_flag_saturated"],
            only_stars: true,
            ..Default::default()
        };
        let bad = make_bad_array(&catalog, &criteria).unwrap();
        assert_eq!(bad, vec![false, true, true, true]);
    }

    #[test]
    fn test_make_bad_array_merge_peak_sky() {
        let mut catalog = flagged_catalog();
        catalog
            .add_flag("merge_peak_sky", &[true, false, false, false])
            .unwrap();
        let bad = make_bad_array(&catalog, &BadSourceCriteria::default()).unwrap();
        assert!(bad[0]);
    }

    #[test]
    fn test_make_bad_array_visit_level_catalog() {
        // Visit-level catalogs carry no patch/tract or extendedness columns;
        // those checks must simply not apply.
        let mut catalog = SourceCatalog::new();
        catalog
            .add_column("deblend_nChild", ColumnValues::Int(vec![0, 3, 0]))
            .unwrap();
        let criteria = BadSourceCriteria {
            only_stars: true,
            tract_inner_only: true,
            ..Default::default()
        };
        let bad = make_bad_array(&catalog, &criteria).unwrap();
        assert_eq!(bad, vec![false, true, false]);
    }

    #[test]
    fn test_make_bad_array_missing_column() {
        let catalog = SourceCatalog::new();
        assert!(matches!(
            make_bad_array(&catalog, &BadSourceCriteria::default()),
            Err(CatalogError::MissingColumn(_))
        ));
    }

    #[test]
    fn test_stats_clips_outlier() {
        let mut values = vec![0.0; 10];
        values.push(1000.0);
        let stats = Stats::compute(&values, None, 3.0).unwrap();
        assert_eq!(stats.total, 11);
        assert_eq!(stats.num, 10);
        assert_relative_eq!(stats.mean, 0.0, epsilon = 1e-12);
        assert_relative_eq!(stats.median, 0.0, epsilon = 1e-12);
        assert_relative_eq!(stats.stdev, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_stats_respects_good_mask_and_nan() {
        let values = [1.0, 2.0, 3.0, f64::NAN, 100.0];
        let good = [true, true, true, true, false];
        let stats = Stats::compute(&values, Some(&good), 3.0).unwrap();
        assert_eq!(stats.total, 5);
        assert_eq!(stats.num, 3);
        assert_relative_eq!(stats.mean, 2.0, epsilon = 1e-12);
        assert_relative_eq!(stats.median, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_stats_empty_selection() {
        let values = [1.0, 2.0];
        let good = [false, false];
        assert_eq!(
            Stats::compute(&values, Some(&good), 3.0),
            Err(CatalogError::EmptyInput)
        );
    }

    #[test]
    fn test_stats_display() {
        let stats = Stats {
            num: 3,
            total: 5,
            mean: 2.0,
            stdev: 1.0,
            median: 2.0,
            clip: 3.0,
        };
        assert_eq!(
            stats.to_string(),
            "Stats(mean=2.0000; stdev=1.0000; num=3; total=5; median=2.0000; clip=3.0000)"
        );
    }

    fn sample_stats() -> Stats {
        Stats {
            num: 50,
            total: 60,
            mean: 0.01,
            stdev: 0.05,
            median: 0.008,
            clip: 0.15,
        }
    }

    #[test]
    fn test_enforcer_passes_within_limits() {
        let mut enforcer = Enforcer {
            do_raise: true,
            ..Default::default()
        };
        enforcer.require_greater.insert("num".to_string(), 10.0);
        enforcer.require_less.insert("stdev".to_string(), 0.1);
        assert!(enforcer.apply(&sample_stats(), "psf mag diff").is_ok());
    }

    #[test]
    fn test_enforcer_raises_on_violation() {
        let mut enforcer = Enforcer {
            do_raise: true,
            ..Default::default()
        };
        enforcer.require_less.insert("stdev".to_string(), 0.01);
        assert!(matches!(
            enforcer.apply(&sample_stats(), "psf mag diff"),
            Err(CatalogError::QaLimitExceeded { .. })
        ));
    }

    #[test]
    fn test_enforcer_logs_without_raise() {
        let mut enforcer = Enforcer::default();
        enforcer.require_less.insert("stdev".to_string(), 0.01);
        assert!(enforcer.apply(&sample_stats(), "psf mag diff").is_ok());
    }

    #[test]
    fn test_enforcer_unknown_statistic() {
        let mut enforcer = Enforcer::default();
        enforcer.require_greater.insert("kurtosis".to_string(), 1.0);
        assert_eq!(
            enforcer.apply(&sample_stats(), "psf mag diff"),
            Err(CatalogError::UnknownStatistic("kurtosis".to_string()))
        );
    }
}
