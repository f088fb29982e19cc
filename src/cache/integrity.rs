//! Metadata-based integrity check of an extracted bundle
//!
//! A cache root is intact when every bundled file exists under it with the
//! recorded size, permission bits and modification time. File contents are
//! never read: this runs on every invocation.

use crate::assets::{mode_of, AssetSource};
use crate::error::SushiboxResult;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// First difference found between the bundle and a cache root
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mismatch {
    /// Target does not exist
    Missing { path: PathBuf },
    /// Target could not be inspected
    Unreadable { path: PathBuf, kind: io::ErrorKind },
    /// Target exists but is not a regular file
    NotAFile { path: PathBuf },
    /// Size differs
    Size {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },
    /// Permission bits differ
    Mode {
        path: PathBuf,
        expected: u32,
        actual: u32,
    },
    /// Modification time differs
    Modified { path: PathBuf },
}

impl Mismatch {
    /// Path of the offending file
    pub fn path(&self) -> &Path {
        match self {
            Self::Missing { path }
            | Self::Unreadable { path, .. }
            | Self::NotAFile { path }
            | Self::Size { path, .. }
            | Self::Mode { path, .. }
            | Self::Modified { path } => path,
        }
    }
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing { path } => write!(f, "{}: missing", path.display()),
            Self::Unreadable { path, kind } => write!(f, "{}: cannot stat ({})", path.display(), kind),
            Self::NotAFile { path } => write!(f, "{}: not a regular file", path.display()),
            Self::Size {
                path,
                expected,
                actual,
            } => write!(
                f,
                "{}: size is different (expected {}, found {})",
                path.display(),
                expected,
                actual
            ),
            Self::Mode {
                path,
                expected,
                actual,
            } => write!(
                f,
                "{}: mode is different (expected {:o}, found {:o})",
                path.display(),
                expected,
                actual
            ),
            Self::Modified { path } => write!(f, "{}: mtime is different", path.display()),
        }
    }
}

/// Map a `/`-separated asset name to its path under `root`
pub(crate) fn target_path(root: &Path, name: &str) -> PathBuf {
    name.split('/')
        .filter(|part| !part.is_empty())
        .fold(root.to_path_buf(), |path, part| path.join(part))
}

/// Compare every bundled file against its copy under `root`
///
/// Returns the first mismatch, or `None` when the tree is intact. An empty
/// bundle is always intact. Asset lookup failures are errors, not
/// mismatches.
pub fn check_integrity(assets: &dyn AssetSource, root: &Path) -> SushiboxResult<Option<Mismatch>> {
    for name in assets.list()? {
        let expected = assets.stat(&name)?;
        let path = target_path(root, &name);

        let meta = match fs::metadata(&path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Ok(Some(Mismatch::Missing { path }));
            }
            Err(e) => {
                return Ok(Some(Mismatch::Unreadable {
                    path,
                    kind: e.kind(),
                }));
            }
        };

        if !meta.is_file() {
            return Ok(Some(Mismatch::NotAFile { path }));
        }
        if meta.len() != expected.size {
            return Ok(Some(Mismatch::Size {
                path,
                expected: expected.size,
                actual: meta.len(),
            }));
        }
        let mode = mode_of(&meta);
        if mode != expected.mode {
            return Ok(Some(Mismatch::Mode {
                path,
                expected: expected.mode,
                actual: mode,
            }));
        }
        match meta.modified() {
            Ok(modified) if modified == expected.modified => {}
            Ok(_) => return Ok(Some(Mismatch::Modified { path })),
            Err(e) => {
                return Ok(Some(Mismatch::Unreadable {
                    path,
                    kind: e.kind(),
                }));
            }
        }
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{DirAssets, EmbeddedAssets, EmbeddedFile};
    use crate::cache::restore::restore_assets;
    use filetime::FileTime;
    use tempfile::TempDir;

    static FILES: &[EmbeddedFile] = &[
        EmbeddedFile {
            name: "bin/foo",
            mode: 0o755,
            modified: 1_500_000_000,
            data: b"#!/bin/sh\necho foo\n",
        },
        EmbeddedFile {
            name: "bin/bar",
            mode: 0o644,
            modified: 1_500_000_000,
            data: b"bar\n",
        },
    ];

    fn restored() -> (TempDir, EmbeddedAssets) {
        let dir = TempDir::new().unwrap();
        let assets = EmbeddedAssets::new(FILES);
        restore_assets(&assets, dir.path()).unwrap();
        (dir, assets)
    }

    #[test]
    fn intact_after_restore() {
        let (dir, assets) = restored();
        assert_eq!(check_integrity(&assets, dir.path()).unwrap(), None);
    }

    #[test]
    fn missing_root() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("absent");
        let assets = EmbeddedAssets::new(FILES);

        let mismatch = check_integrity(&assets, &root).unwrap().unwrap();
        assert!(matches!(mismatch, Mismatch::Missing { .. }));
        assert!(mismatch.path().starts_with(&root));
    }

    #[test]
    fn empty_bundle_is_vacuously_intact() {
        let dir = TempDir::new().unwrap();
        let assets = EmbeddedAssets::new(&[]);
        assert_eq!(check_integrity(&assets, &dir.path().join("absent")).unwrap(), None);
    }

    #[test]
    fn truncated_file() {
        let (dir, assets) = restored();
        let path = dir.path().join("bin/bar");
        let file = fs::OpenOptions::new().write(true).open(&path).unwrap();
        file.set_len(1).unwrap();
        drop(file);

        let mismatch = check_integrity(&assets, dir.path()).unwrap().unwrap();
        assert_eq!(
            mismatch,
            Mismatch::Size {
                path,
                expected: 4,
                actual: 1
            }
        );
    }

    #[test]
    fn touched_file() {
        let (dir, assets) = restored();
        let path = dir.path().join("bin/foo");
        filetime::set_file_mtime(&path, FileTime::from_unix_time(1_600_000_000, 0)).unwrap();

        let mismatch = check_integrity(&assets, dir.path()).unwrap().unwrap();
        assert_eq!(mismatch, Mismatch::Modified { path });
        assert!(mismatch.to_string().contains("mtime is different"));
    }

    #[cfg(unix)]
    #[test]
    fn changed_mode() {
        use std::os::unix::fs::PermissionsExt;

        let (dir, assets) = restored();
        let path = dir.path().join("bin/foo");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o700)).unwrap();
        filetime::set_file_mtime(&path, FileTime::from_unix_time(1_500_000_000, 0)).unwrap();

        let mismatch = check_integrity(&assets, dir.path()).unwrap().unwrap();
        assert_eq!(
            mismatch,
            Mismatch::Mode {
                path,
                expected: 0o755,
                actual: 0o700
            }
        );
    }

    #[test]
    fn directory_in_place_of_file() {
        let (dir, assets) = restored();
        let path = dir.path().join("bin/bar");
        fs::remove_file(&path).unwrap();
        fs::create_dir(&path).unwrap();

        let mismatch = check_integrity(&assets, dir.path()).unwrap().unwrap();
        assert_eq!(mismatch, Mismatch::NotAFile { path });
    }

    #[test]
    fn asset_errors_propagate() {
        let dir = TempDir::new().unwrap();
        let assets = DirAssets::new(dir.path().join("no-bundle"));

        assert!(check_integrity(&assets, dir.path()).is_err());
    }

    #[test]
    fn target_path_splits_on_slash() {
        let root = Path::new("/cache");
        assert_eq!(
            target_path(root, "share/doc/readme.txt"),
            Path::new("/cache").join("share").join("doc").join("readme.txt")
        );
    }
}
