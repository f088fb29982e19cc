//! Version-pinned install cache
//!
//! Maps the embedded version to `<state>/sushibox/versions/<version>` and
//! keeps that directory a faithful copy of the bundle.
//!
//! # Cache States
//!
//! | State | Detected by | Action |
//! |-------|-------------|--------|
//! | Intact | every file matches size, mode, mtime | none |
//! | Absent | root missing | extract to staging, rename in |
//! | Corrupt | any mismatch | extract to staging, swap in |
//! | Blocked | root exists but is not a directory | `InstallFailed` |
//!
//! There is no lock file. Concurrent first runs each extract in full and the
//! last rename wins; every writer produces the same tree.

pub mod integrity;
pub mod restore;

pub use integrity::{check_integrity, Mismatch};
pub use restore::{commit, restore_asset, restore_assets, Commit};

use crate::assets::AssetSource;
use crate::config::Layout;
use crate::error::{SushiboxError, SushiboxResult};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};

/// Result of [`InstallCache::ensure_installed`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Installed {
    /// The verified cache root
    pub cache_root: PathBuf,
    /// Whether this call extracted the bundle
    pub rebuilt: bool,
}

/// Install cache for one bundle and layout
pub struct InstallCache<'a> {
    assets: &'a dyn AssetSource,
    layout: &'a Layout,
}

impl<'a> InstallCache<'a> {
    /// Create a cache over `assets` rooted at `layout.cache_root`
    pub fn new(assets: &'a dyn AssetSource, layout: &'a Layout) -> Self {
        Self { assets, layout }
    }

    /// First mismatch between the bundle and the cache root, if any
    pub fn check_integrity(&self) -> SushiboxResult<Option<Mismatch>> {
        check_integrity(self.assets, &self.layout.cache_root)
    }

    /// Make sure the cache root holds an intact copy of the bundle
    ///
    /// Idempotent: an intact cache is left untouched. Otherwise the bundle is
    /// extracted into a fresh staging directory and renamed into place, then
    /// verified once more. A failed re-verification is not retried.
    pub fn ensure_installed(&self) -> SushiboxResult<Installed> {
        let root = &self.layout.cache_root;

        if let Ok(meta) = fs::metadata(root) {
            if !meta.is_dir() {
                return Err(SushiboxError::install_failed(
                    root,
                    "exists and is not a directory",
                ));
            }
        }

        match self.check_integrity()? {
            None => {
                debug!("Cache {} is intact", root.display());
                return Ok(Installed {
                    cache_root: root.clone(),
                    rebuilt: false,
                });
            }
            Some(mismatch) => info!("Installing into {} ({})", root.display(), mismatch),
        }

        self.rebuild()?;

        if let Some(mismatch) = self.check_integrity()? {
            return Err(SushiboxError::install_failed(
                root,
                format!("verification after install failed: {}", mismatch),
            ));
        }

        Ok(Installed {
            cache_root: root.clone(),
            rebuilt: true,
        })
    }

    fn rebuild(&self) -> SushiboxResult<()> {
        let root = &self.layout.cache_root;
        let versions_dir = &self.layout.versions_dir;

        restore::create_dir_all(versions_dir)
            .map_err(|e| SushiboxError::install_failed(root, format!("creating {}: {}", versions_dir.display(), e)))?;

        let prefix = format!(
            ".{}-",
            root.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        );
        let staging = tempfile::Builder::new()
            .prefix(&prefix)
            .tempdir_in(versions_dir)
            .map_err(|e| SushiboxError::install_failed(root, format!("creating staging directory: {}", e)))?;
        debug!("Extracting bundle into {}", staging.path().display());

        let count = restore_assets(self.assets, staging.path()).map_err(|e| into_install_failed(root, e))?;
        restore::set_mode(staging.path(), restore::DIR_MODE)
            .map_err(|e| SushiboxError::install_failed(root, format!("setting mode on staging directory: {}", e)))?;

        let outcome = commit(self.assets, staging.path(), root).map_err(|e| into_install_failed(root, e))?;
        info!("Installed {} files into {} ({:?})", count, root.display(), outcome);

        // Removes whatever is left at the staging path: nothing after a rename,
        // the replaced tree after an exchange, the unused copy after a lost race.
        drop(staging);
        Ok(())
    }
}

/// Filesystem failures while installing become `InstallFailed`; asset errors
/// keep their own kind
fn into_install_failed(root: &std::path::Path, err: SushiboxError) -> SushiboxError {
    match err {
        SushiboxError::Io { .. } => SushiboxError::install_failed(root, err),
        other => other,
    }
}
