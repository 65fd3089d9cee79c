//! In-memory columnar source catalog with a schema alias map.
//!
//! A [`SourceCatalog`] is a set of equal-length named columns, each holding
//! one of four value kinds (float, integer, string, boolean flag). Column
//! typing is explicit at the call site via the [`ColumnValues`] tagged
//! variant rather than inferred from runtime values. An alias map lets
//! analysis code address columns through a newer naming convention while the
//! underlying data keeps whatever names its producing pipeline used.

use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Errors surfaced by catalog operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CatalogError {
    #[error("column {0:?} not found in catalog")]
    MissingColumn(String),

    #[error("column {name:?} has type {found}, expected {expected}")]
    TypeMismatch {
        name: String,
        expected: ColumnKind,
        found: ColumnKind,
    },

    #[error("length mismatch: expected {expected}, got {got}")]
    LengthMismatch { expected: usize, got: usize },

    #[error("column {0:?} already exists in catalog")]
    DuplicateColumn(String),

    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("catalogs with different sets of objects cannot be joined")]
    IdMismatch,

    #[error("no object id column found (tried id, objectId and prefixed forms)")]
    NoIdColumn,

    #[error("no catalogs to concatenate")]
    EmptyInput,

    #[error("no flux columns found in catalog")]
    NoFluxColumns,

    #[error("unknown statistic {0:?}")]
    UnknownStatistic(String),

    #[error("{description}: {stat} = {value:.2} exceeds {bound} limit of {limit:.2}")]
    QaLimitExceeded {
        description: String,
        stat: String,
        value: f64,
        bound: String,
        limit: f64,
    },
}

/// The value kind a column holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Float,
    Int,
    Str,
    Flag,
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnKind::Float => "float",
            ColumnKind::Int => "int",
            ColumnKind::Str => "str",
            ColumnKind::Flag => "flag",
        };
        write!(f, "{}", name)
    }
}

/// Column payload, tagged by value kind.
///
/// Callers state the intended column type explicitly when inserting; there
/// is no runtime inference from the values themselves.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValues {
    Float(Vec<f64>),
    Int(Vec<i64>),
    Str(Vec<String>),
    Flag(Vec<bool>),
}

impl ColumnValues {
    /// Number of entries.
    pub fn len(&self) -> usize {
        match self {
            ColumnValues::Float(v) => v.len(),
            ColumnValues::Int(v) => v.len(),
            ColumnValues::Str(v) => v.len(),
            ColumnValues::Flag(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Kind tag for this payload.
    pub fn kind(&self) -> ColumnKind {
        match self {
            ColumnValues::Float(_) => ColumnKind::Float,
            ColumnValues::Int(_) => ColumnKind::Int,
            ColumnValues::Str(_) => ColumnKind::Str,
            ColumnValues::Flag(_) => ColumnKind::Flag,
        }
    }

    /// Repeat a single-entry payload out to `n` entries.
    fn broadcast(&self, n: usize) -> ColumnValues {
        match self {
            ColumnValues::Float(v) => ColumnValues::Float(vec![v[0]; n]),
            ColumnValues::Int(v) => ColumnValues::Int(vec![v[0]; n]),
            ColumnValues::Str(v) => ColumnValues::Str(vec![v[0].clone(); n]),
            ColumnValues::Flag(v) => ColumnValues::Flag(vec![v[0]; n]),
        }
    }

    fn select(&self, keep: &[bool]) -> ColumnValues {
        fn pick<T: Clone>(values: &[T], keep: &[bool]) -> Vec<T> {
            values
                .iter()
                .zip(keep.iter())
                .filter(|(_, &k)| k)
                .map(|(v, _)| v.clone())
                .collect()
        }
        match self {
            ColumnValues::Float(v) => ColumnValues::Float(pick(v, keep)),
            ColumnValues::Int(v) => ColumnValues::Int(pick(v, keep)),
            ColumnValues::Str(v) => ColumnValues::Str(pick(v, keep)),
            ColumnValues::Flag(v) => ColumnValues::Flag(pick(v, keep)),
        }
    }

    fn extend_from(&mut self, other: &ColumnValues) -> Result<(), CatalogError> {
        match (self, other) {
            (ColumnValues::Float(a), ColumnValues::Float(b)) => a.extend_from_slice(b),
            (ColumnValues::Int(a), ColumnValues::Int(b)) => a.extend_from_slice(b),
            (ColumnValues::Str(a), ColumnValues::Str(b)) => a.extend_from_slice(b),
            (ColumnValues::Flag(a), ColumnValues::Flag(b)) => a.extend_from_slice(b),
            (a, b) => {
                return Err(CatalogError::TypeMismatch {
                    name: String::new(),
                    expected: a.kind(),
                    found: b.kind(),
                })
            }
        }
        Ok(())
    }
}

/// An in-memory columnar source catalog.
///
/// Columns keep insertion order; lookups go through the alias map first, so
/// analysis code can use one naming convention across catalogs produced
/// under different schema versions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceCatalog {
    columns: Vec<(String, ColumnValues)>,
    index: HashMap<String, usize>,
    aliases: HashMap<String, String>,
}

impl SourceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sources (rows). Zero when no columns exist yet.
    pub fn len(&self) -> usize {
        self.columns.first().map_or(0, |(_, v)| v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Column names in insertion order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    /// Resolve a name through the alias map to the stored column name.
    pub fn resolve<'a>(&'a self, name: &'a str) -> &'a str {
        self.aliases.get(name).map(String::as_str).unwrap_or(name)
    }

    /// Whether a column exists under this name (aliases included).
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(self.resolve(name))
    }

    /// Value kind of the named column, if present.
    pub fn kind_of(&self, name: &str) -> Option<ColumnKind> {
        let resolved = self.resolve(name);
        self.index
            .get(resolved)
            .map(|&i| self.columns[i].1.kind())
    }

    /// Add a column to the catalog.
    ///
    /// A single-entry payload is broadcast to the catalog length, matching
    /// the convention for attaching a constant annotation column to every
    /// source. Any other length that disagrees with the existing row count
    /// is an error, as is reusing an existing column or alias name.
    pub fn add_column(&mut self, name: &str, values: ColumnValues) -> Result<(), CatalogError> {
        if self.index.contains_key(name) || self.aliases.contains_key(name) {
            return Err(CatalogError::DuplicateColumn(name.to_string()));
        }
        let values = if !self.columns.is_empty() && values.len() != self.len() {
            if values.len() == 1 {
                values.broadcast(self.len())
            } else {
                return Err(CatalogError::LengthMismatch {
                    expected: self.len(),
                    got: values.len(),
                });
            }
        } else {
            values
        };
        self.index.insert(name.to_string(), self.columns.len());
        self.columns.push((name.to_string(), values));
        Ok(())
    }

    /// Add a boolean flag column from a mask with one entry per source.
    pub fn add_flag(&mut self, name: &str, mask: &[bool]) -> Result<(), CatalogError> {
        if !self.columns.is_empty() && mask.len() != self.len() {
            return Err(CatalogError::LengthMismatch {
                expected: self.len(),
                got: mask.len(),
            });
        }
        self.add_column(name, ColumnValues::Flag(mask.to_vec()))
    }

    fn column(&self, name: &str) -> Result<&ColumnValues, CatalogError> {
        let resolved = self.resolve(name);
        self.index
            .get(resolved)
            .map(|&i| &self.columns[i].1)
            .ok_or_else(|| CatalogError::MissingColumn(name.to_string()))
    }

    fn column_mut(&mut self, name: &str) -> Result<&mut ColumnValues, CatalogError> {
        let resolved = self.resolve(name).to_string();
        match self.index.get(&resolved) {
            Some(&i) => Ok(&mut self.columns[i].1),
            None => Err(CatalogError::MissingColumn(name.to_string())),
        }
    }

    /// Borrow a float column.
    pub fn floats(&self, name: &str) -> Result<&[f64], CatalogError> {
        match self.column(name)? {
            ColumnValues::Float(v) => Ok(v),
            other => Err(CatalogError::TypeMismatch {
                name: name.to_string(),
                expected: ColumnKind::Float,
                found: other.kind(),
            }),
        }
    }

    /// Mutably borrow a float column (used by calibration rescaling).
    pub fn floats_mut(&mut self, name: &str) -> Result<&mut [f64], CatalogError> {
        match self.column_mut(name)? {
            ColumnValues::Float(v) => Ok(v),
            other => Err(CatalogError::TypeMismatch {
                name: name.to_string(),
                expected: ColumnKind::Float,
                found: other.kind(),
            }),
        }
    }

    /// Borrow an integer column.
    pub fn ints(&self, name: &str) -> Result<&[i64], CatalogError> {
        match self.column(name)? {
            ColumnValues::Int(v) => Ok(v),
            other => Err(CatalogError::TypeMismatch {
                name: name.to_string(),
                expected: ColumnKind::Int,
                found: other.kind(),
            }),
        }
    }

    /// Borrow a string column.
    pub fn strs(&self, name: &str) -> Result<&[String], CatalogError> {
        match self.column(name)? {
            ColumnValues::Str(v) => Ok(v),
            other => Err(CatalogError::TypeMismatch {
                name: name.to_string(),
                expected: ColumnKind::Str,
                found: other.kind(),
            }),
        }
    }

    /// Borrow a flag column.
    pub fn flags(&self, name: &str) -> Result<&[bool], CatalogError> {
        match self.column(name)? {
            ColumnValues::Flag(v) => Ok(v),
            other => Err(CatalogError::TypeMismatch {
                name: name.to_string(),
                expected: ColumnKind::Flag,
                found: other.kind(),
            }),
        }
    }

    /// Register alias mappings for differing schema naming conventions.
    ///
    /// Each pair maps a new name to an existing column name; a mapping is
    /// only added when `prefix + old` actually exists in the catalog (e.g.
    /// matched catalogs carry "src_"/"ref_" prefixes on every column).
    pub fn set_aliases(&mut self, mappings: &[(&str, &str)], prefix: &str) {
        for (new_name, old_name) in mappings {
            let old = format!("{}{}", prefix, old_name);
            if self.index.contains_key(&old) {
                self.aliases.insert(format!("{}{}", prefix, new_name), old);
            }
        }
    }

    /// Alias mappings currently registered, as (new name, stored name).
    pub fn aliases(&self) -> impl Iterator<Item = (&str, &str)> {
        self.aliases.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// New catalog keeping only the rows where `keep` is true.
    pub fn filter(&self, keep: &[bool]) -> Result<SourceCatalog, CatalogError> {
        if keep.len() != self.len() {
            return Err(CatalogError::LengthMismatch {
                expected: self.len(),
                got: keep.len(),
            });
        }
        let columns: Vec<(String, ColumnValues)> = self
            .columns
            .iter()
            .map(|(name, values)| (name.clone(), values.select(keep)))
            .collect();
        let index = self.index.clone();
        Ok(SourceCatalog {
            columns,
            index,
            aliases: self.aliases.clone(),
        })
    }
}

/// Concatenate schema-identical catalogs into one.
///
/// All inputs must share the same column names and kinds in the same order.
/// Aliases from the first catalog are carried over.
pub fn concatenate(catalogs: &[SourceCatalog]) -> Result<SourceCatalog, CatalogError> {
    let template = catalogs.first().ok_or(CatalogError::EmptyInput)?;

    let mut merged = template.clone();
    for catalog in &catalogs[1..] {
        let names_match = catalog.columns.len() == merged.columns.len()
            && catalog
                .columns
                .iter()
                .zip(merged.columns.iter())
                .all(|((an, av), (bn, bv))| an == bn && av.kind() == bv.kind());
        if !names_match {
            return Err(CatalogError::SchemaMismatch(
                "catalogs to concatenate must share column names and types".to_string(),
            ));
        }
        for ((_, into), (_, from)) in merged.columns.iter_mut().zip(catalog.columns.iter()) {
            into.extend_from(from)?;
        }
    }
    Ok(merged)
}

/// Check whether two catalogs describe an identical list of objects by id.
///
/// Looks for an integer id column under `id`, `objectId`, or the prefixed
/// forms, in that order.
pub fn check_id_lists(
    first: &SourceCatalog,
    second: &SourceCatalog,
    prefix: &str,
) -> Result<bool, CatalogError> {
    let find_ids = |catalog: &SourceCatalog| -> Result<Vec<i64>, CatalogError> {
        let candidates = [
            "id".to_string(),
            "objectId".to_string(),
            format!("{}id", prefix),
            format!("{}objectId", prefix),
        ];
        for name in &candidates {
            if catalog.contains(name) {
                return catalog.ints(name).map(|v| v.to_vec());
            }
        }
        Err(CatalogError::NoIdColumn)
    };

    let ids1 = find_ids(first)?;
    let ids2 = find_ids(second)?;
    Ok(ids1 == ids2)
}

/// Join two catalogs of the same objects into one, prefixing column names.
///
/// Fails with [`CatalogError::IdMismatch`] unless both catalogs list the
/// same object ids in the same order. Aliases from both sides are carried
/// over with their prefix applied.
pub fn join(
    first: &SourceCatalog,
    second: &SourceCatalog,
    prefix1: &str,
    prefix2: &str,
) -> Result<SourceCatalog, CatalogError> {
    if !check_id_lists(first, second, "")? {
        return Err(CatalogError::IdMismatch);
    }

    let mut joined = SourceCatalog::new();
    for (prefix, catalog) in [(prefix1, first), (prefix2, second)] {
        for (name, values) in &catalog.columns {
            joined.add_column(&format!("{}{}", prefix, name), values.clone())?;
        }
        for (new_name, old_name) in &catalog.aliases {
            joined.aliases.insert(
                format!("{}{}", prefix, new_name),
                format!("{}{}", prefix, old_name),
            );
        }
    }
    Ok(joined)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_catalog() -> SourceCatalog {
        let mut catalog = SourceCatalog::new();
        catalog
            .add_column("id", ColumnValues::Int(vec![1, 2, 3]))
            .unwrap();
        catalog
            .add_column(
                "base_PsfFlux_instFlux",
                ColumnValues::Float(vec![10.0, 20.0, 40.0]),
            )
            .unwrap();
        catalog
    }

    #[test]
    fn test_add_and_read_columns() {
        let catalog = sample_catalog();
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.ints("id").unwrap(), &[1, 2, 3]);
        assert_eq!(
            catalog.floats("base_PsfFlux_instFlux").unwrap(),
            &[10.0, 20.0, 40.0]
        );
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let mut catalog = sample_catalog();
        let result = catalog.add_column("id", ColumnValues::Int(vec![4, 5, 6]));
        assert_eq!(result, Err(CatalogError::DuplicateColumn("id".to_string())));
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let mut catalog = sample_catalog();
        let result = catalog.add_column("extra", ColumnValues::Float(vec![1.0, 2.0]));
        assert_eq!(
            result,
            Err(CatalogError::LengthMismatch {
                expected: 3,
                got: 2
            })
        );
    }

    #[test]
    fn test_scalar_broadcast() {
        let mut catalog = sample_catalog();
        catalog
            .add_column("tract", ColumnValues::Int(vec![42]))
            .unwrap();
        assert_eq!(catalog.ints("tract").unwrap(), &[42, 42, 42]);

        catalog
            .add_column(
                "filter",
                ColumnValues::Str(vec!["HSC-G".to_string()]),
            )
            .unwrap();
        assert_eq!(catalog.strs("filter").unwrap()[2], "HSC-G");
    }

    #[test]
    fn test_type_mismatch() {
        let catalog = sample_catalog();
        assert!(matches!(
            catalog.floats("id"),
            Err(CatalogError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_missing_column() {
        let catalog = sample_catalog();
        assert_eq!(
            catalog.floats("nope"),
            Err(CatalogError::MissingColumn("nope".to_string()))
        );
    }

    #[test]
    fn test_alias_resolution() {
        let mut catalog = sample_catalog();
        catalog.set_aliases(&[("slot_PsfFlux_instFlux", "base_PsfFlux_instFlux")], "");
        assert!(catalog.contains("slot_PsfFlux_instFlux"));
        assert_eq!(
            catalog.floats("slot_PsfFlux_instFlux").unwrap(),
            &[10.0, 20.0, 40.0]
        );
    }

    #[test]
    fn test_alias_only_added_when_target_exists() {
        let mut catalog = sample_catalog();
        catalog.set_aliases(&[("new_name", "column_that_is_not_there")], "");
        assert!(!catalog.contains("new_name"));
    }

    #[test]
    fn test_add_flag() {
        let mut catalog = sample_catalog();
        catalog.add_flag("qa_bad_flag", &[false, true, false]).unwrap();
        assert_eq!(catalog.flags("qa_bad_flag").unwrap(), &[false, true, false]);
    }

    #[test]
    fn test_filter() {
        let catalog = sample_catalog();
        let kept = catalog.filter(&[true, false, true]).unwrap();
        assert_eq!(kept.len(), 2);
        assert_eq!(kept.ints("id").unwrap(), &[1, 3]);
        assert_eq!(
            kept.floats("base_PsfFlux_instFlux").unwrap(),
            &[10.0, 40.0]
        );
    }

    #[test]
    fn test_concatenate() {
        let cat1 = sample_catalog();
        let mut cat2 = SourceCatalog::new();
        cat2.add_column("id", ColumnValues::Int(vec![4, 5])).unwrap();
        cat2.add_column(
            "base_PsfFlux_instFlux",
            ColumnValues::Float(vec![80.0, 160.0]),
        )
        .unwrap();

        let merged = concatenate(&[cat1, cat2]).unwrap();
        assert_eq!(merged.len(), 5);
        assert_eq!(merged.ints("id").unwrap(), &[1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_concatenate_schema_mismatch() {
        let cat1 = sample_catalog();
        let mut cat2 = SourceCatalog::new();
        cat2.add_column("id", ColumnValues::Int(vec![4])).unwrap();

        assert!(matches!(
            concatenate(&[cat1, cat2]),
            Err(CatalogError::SchemaMismatch(_))
        ));
    }

    #[test]
    fn test_concatenate_empty_input() {
        assert_eq!(concatenate(&[]), Err(CatalogError::EmptyInput));
    }

    #[test]
    fn test_join_matching_ids() {
        let cat1 = sample_catalog();
        let mut cat2 = SourceCatalog::new();
        cat2.add_column("id", ColumnValues::Int(vec![1, 2, 3])).unwrap();
        cat2.add_column("psf_mag", ColumnValues::Float(vec![21.0, 20.5, 19.8]))
            .unwrap();

        let joined = join(&cat1, &cat2, "first_", "second_").unwrap();
        assert_eq!(joined.len(), 3);
        assert_eq!(joined.ints("first_id").unwrap(), &[1, 2, 3]);
        assert_eq!(
            joined.floats("second_psf_mag").unwrap(),
            &[21.0, 20.5, 19.8]
        );
    }

    #[test]
    fn test_join_id_mismatch() {
        let cat1 = sample_catalog();
        let mut cat2 = SourceCatalog::new();
        cat2.add_column("id", ColumnValues::Int(vec![7, 8, 9])).unwrap();

        assert_eq!(
            join(&cat1, &cat2, "first_", "second_"),
            Err(CatalogError::IdMismatch)
        );
    }

    #[test]
    fn test_join_missing_id_column() {
        let mut cat1 = SourceCatalog::new();
        cat1.add_column("flux", ColumnValues::Float(vec![1.0])).unwrap();
        let cat2 = sample_catalog();
        assert_eq!(
            join(&cat1, &cat2, "a_", "b_"),
            Err(CatalogError::NoIdColumn)
        );
    }
}
