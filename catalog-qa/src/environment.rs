//! Reference-data provenance tracking.
//!
//! QA outputs record which versions of external reference packages (e.g.
//! the astrometry and photometry reference catalogs) were in play when a
//! quantity was derived. A process-wide environment holds the current
//! versions; [`VersionGuard`] swaps one in for the duration of a scope and
//! restores the previous value on drop.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Versions of the external reference packages currently in use.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceEnvironment {
    versions: HashMap<String, String>,
}

impl ReferenceEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a package version, returning the previous one if any.
    pub fn set_version(&mut self, package: &str, version: &str) -> Option<String> {
        self.versions
            .insert(package.to_string(), version.to_string())
    }

    /// Current version of a package, if recorded.
    pub fn version(&self, package: &str) -> Option<&str> {
        self.versions.get(package).map(String::as_str)
    }

    /// Drop a package record, returning the removed version if any.
    pub fn clear_version(&mut self, package: &str) -> Option<String> {
        self.versions.remove(package)
    }
}

static GLOBAL: Lazy<Mutex<ReferenceEnvironment>> =
    Lazy::new(|| Mutex::new(ReferenceEnvironment::new()));

/// Lock the process-wide reference environment.
///
/// A poisoned lock is recovered; the environment is a plain version map and
/// stays consistent regardless of where a panicking holder stopped.
pub fn global() -> MutexGuard<'static, ReferenceEnvironment> {
    GLOBAL.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Scoped override of one package version in the global environment.
///
/// Restores the previous version (or removes the record) when dropped.
#[derive(Debug)]
pub struct VersionGuard {
    package: String,
    previous: Option<String>,
}

impl VersionGuard {
    pub fn set(package: &str, version: &str) -> VersionGuard {
        let previous = global().set_version(package, version);
        log::debug!("using {} version {}", package, version);
        VersionGuard {
            package: package.to_string(),
            previous,
        }
    }
}

impl Drop for VersionGuard {
    fn drop(&mut self) {
        let mut env = global();
        match self.previous.take() {
            Some(previous) => {
                env.set_version(&self.package, &previous);
            }
            None => {
                env.clear_version(&self.package);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standalone_environment() {
        let mut env = ReferenceEnvironment::new();
        assert_eq!(env.version("astrometry_net_data"), None);
        env.set_version("astrometry_net_data", "sdss-dr9-fink-v5b");
        assert_eq!(
            env.version("astrometry_net_data"),
            Some("sdss-dr9-fink-v5b")
        );
        assert_eq!(
            env.clear_version("astrometry_net_data"),
            Some("sdss-dr9-fink-v5b".to_string())
        );
        assert_eq!(env.version("astrometry_net_data"), None);
    }

    #[test]
    fn test_version_guard_restores_on_drop() {
        // One test exercises the global map end to end; separate tests
        // would race on the shared state under the parallel test runner.
        let package = "ps1_pv3_3pi_20170110";

        global().set_version(package, "v1");
        {
            let _guard = VersionGuard::set(package, "v2");
            assert_eq!(global().version(package), Some("v2"));
        }
        assert_eq!(global().version(package), Some("v1"));

        global().clear_version(package);
        {
            let _guard = VersionGuard::set(package, "v3");
            assert_eq!(global().version(package), Some("v3"));
        }
        assert_eq!(global().version(package), None);
    }
}
