//! Directory-backed asset source
//!
//! Serves a tree on disk as if it were the compiled-in bundle. Used for
//! tests and for trying out a bundle without rebuilding the launcher.

use super::{mode_of, AssetMeta, AssetSource};
use crate::error::{SushiboxError, SushiboxResult};
use std::borrow::Cow;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Asset source reading from a directory
#[derive(Debug, Clone)]
pub struct DirAssets {
    root: PathBuf,
}

impl DirAssets {
    /// Serve the tree under `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root of the served tree
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_of(&self, name: &str) -> PathBuf {
        name.split('/')
            .filter(|part| !part.is_empty())
            .fold(self.root.clone(), |path, part| path.join(part))
    }

    fn walk(&self, dir: &Path, prefix: &str, names: &mut Vec<String>) -> SushiboxResult<()> {
        let entries = fs::read_dir(dir)
            .map_err(|e| SushiboxError::io(format!("reading asset directory {}", dir.display()), e))?;

        let mut entries = entries
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| SushiboxError::io(format!("reading asset directory {}", dir.display()), e))?;
        entries.sort_by_key(|e| e.file_name());

        for entry in entries {
            let Some(file_name) = entry.file_name().to_str().map(str::to_string) else {
                warn!("Skipping non UTF-8 asset name under {}", dir.display());
                continue;
            };
            let name = if prefix.is_empty() {
                file_name
            } else {
                format!("{}/{}", prefix, file_name)
            };

            let file_type = entry
                .file_type()
                .map_err(|e| SushiboxError::io(format!("inspecting asset {}", name), e))?;

            if file_type.is_dir() {
                self.walk(&entry.path(), &name, names)?;
            } else if file_type.is_file() {
                names.push(name);
            } else {
                warn!("Skipping asset {}: not a regular file", name);
            }
        }

        Ok(())
    }
}

impl AssetSource for DirAssets {
    fn list(&self) -> SushiboxResult<Vec<String>> {
        if !self.root.is_dir() {
            return Err(SushiboxError::NotConfigured(format!(
                "asset directory {} does not exist",
                self.root.display()
            )));
        }

        let mut names = Vec::new();
        self.walk(&self.root, "", &mut names)?;
        names.sort();
        Ok(names)
    }

    fn read(&self, name: &str) -> SushiboxResult<Cow<'_, [u8]>> {
        let path = self.path_of(name);
        fs::read(&path)
            .map(Cow::Owned)
            .map_err(|source| SushiboxError::AssetNotFound {
                name: name.to_string(),
                source,
            })
    }

    fn stat(&self, name: &str) -> SushiboxResult<AssetMeta> {
        let path = self.path_of(name);
        let meta = fs::metadata(&path).map_err(|source| SushiboxError::AssetNotFound {
            name: name.to_string(),
            source,
        })?;

        if !meta.is_file() {
            return Err(SushiboxError::AssetNotFound {
                name: name.to_string(),
                source: io::Error::new(io::ErrorKind::InvalidInput, "not a regular file"),
            });
        }

        let modified = meta
            .modified()
            .map_err(|e| SushiboxError::io(format!("reading mtime of asset {}", name), e))?;

        Ok(AssetMeta {
            size: meta.len(),
            mode: mode_of(&meta),
            modified,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_tree() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("bin")).unwrap();
        fs::create_dir_all(dir.path().join("share/doc")).unwrap();
        fs::write(dir.path().join("bin/foo"), "foo").unwrap();
        fs::write(dir.path().join("bin/bar"), "bar").unwrap();
        fs::write(dir.path().join("share/doc/readme.txt"), "readme").unwrap();
        dir
    }

    #[test]
    fn list_walks_recursively() {
        let dir = sample_tree();
        let assets = DirAssets::new(dir.path());

        assert_eq!(
            assets.list().unwrap(),
            vec!["bin/bar", "bin/foo", "share/doc/readme.txt"]
        );
    }

    #[test]
    fn list_skips_empty_directories() {
        let dir = sample_tree();
        fs::create_dir_all(dir.path().join("empty")).unwrap();
        let assets = DirAssets::new(dir.path());

        assert!(!assets.list().unwrap().iter().any(|n| n.starts_with("empty")));
    }

    #[test]
    fn missing_root_is_not_configured() {
        let dir = TempDir::new().unwrap();
        let assets = DirAssets::new(dir.path().join("nope"));

        assert_eq!(assets.root(), dir.path().join("nope"));
        assert!(matches!(assets.list(), Err(SushiboxError::NotConfigured(_))));
    }

    #[test]
    fn read_and_stat() {
        let dir = sample_tree();
        let assets = DirAssets::new(dir.path());

        assert_eq!(&*assets.read("share/doc/readme.txt").unwrap(), b"readme");

        let meta = assets.stat("bin/foo").unwrap();
        let on_disk = fs::metadata(dir.path().join("bin/foo")).unwrap();
        assert_eq!(meta.size, 3);
        assert_eq!(meta.modified, on_disk.modified().unwrap());
    }

    #[test]
    fn unknown_name_wraps_io_error() {
        let dir = sample_tree();
        let assets = DirAssets::new(dir.path());

        match assets.read("bin/baz") {
            Err(SushiboxError::AssetNotFound { name, source }) => {
                assert_eq!(name, "bin/baz");
                assert_eq!(source.kind(), io::ErrorKind::NotFound);
            }
            other => panic!("expected AssetNotFound, got {:?}", other),
        }
    }

    #[test]
    fn stat_on_directory_is_not_found() {
        let dir = sample_tree();
        let assets = DirAssets::new(dir.path());

        assert!(matches!(
            assets.stat("bin"),
            Err(SushiboxError::AssetNotFound { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn stat_reports_permission_bits() {
        use std::os::unix::fs::PermissionsExt;

        let dir = sample_tree();
        fs::set_permissions(dir.path().join("bin/foo"), fs::Permissions::from_mode(0o755)).unwrap();
        fs::set_permissions(dir.path().join("bin/bar"), fs::Permissions::from_mode(0o640)).unwrap();
        let assets = DirAssets::new(dir.path());

        assert_eq!(assets.stat("bin/foo").unwrap().mode, 0o755);
        assert_eq!(assets.stat("bin/bar").unwrap().mode, 0o640);
    }
}
