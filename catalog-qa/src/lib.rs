//! Analysis-support utilities for survey source catalogs.
//!
//! This crate carries the catalog-side glue around the numerical engine in
//! `locus-math`: an in-memory columnar source catalog with a schema alias
//! map, stateless functors deriving plotted quantities (magnitude
//! differences, ellipticity residuals, trace sizes), photometric calibration
//! to a common zero point, QA statistics with limit enforcement, and the
//! color helpers that feed stellar-locus fitting.
//!
//! Everything operates synchronously on caller-owned in-memory catalogs;
//! file formats, data butlers and sky-map geometry live in external layers.

pub mod calibration;
pub mod catalog;
pub mod colors;
pub mod environment;
pub mod functors;
pub mod qa;

pub use catalog::{CatalogError, ColumnKind, ColumnValues, SourceCatalog};
pub use functors::CatalogFunctor;
