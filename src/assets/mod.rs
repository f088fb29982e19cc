//! Read-only access to the bundled files
//!
//! The bundle is a flat set of `/`-separated relative file names, each with
//! recorded metadata (size, permission bits, modification time) and content.
//! Directories are implicit: they only exist as name prefixes.
//!
//! Two sources implement [`AssetSource`]:
//!
//! | Source | Backing | Selected when |
//! |--------|---------|---------------|
//! | [`EmbeddedAssets`] | table compiled in by `build.rs` | default |
//! | [`DirAssets`] | a directory on disk | `SUSHIBOX_MOCK` is set |

mod dir;
mod embedded;

pub use dir::DirAssets;
pub use embedded::{EmbeddedAssets, EmbeddedFile};

use crate::error::{SushiboxError, SushiboxResult};
use std::borrow::Cow;
use std::fs;
use std::io;
use std::time::SystemTime;
use tracing::debug;

/// Environment variable naming a directory that replaces the compiled-in bundle
pub const MOCK_DIR_ENV: &str = "SUSHIBOX_MOCK";

/// Recorded metadata of one bundled file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetMeta {
    /// Size in bytes
    pub size: u64,
    /// Permission bits (`0o7777` mask)
    pub mode: u32,
    /// Modification time
    pub modified: SystemTime,
}

/// Observational accessor over a bundle
///
/// Implementations have no side effects. Names passed to `read` and `stat`
/// are the ones returned by `list`.
pub trait AssetSource: Send + Sync {
    /// All regular-file names in the bundle, sorted
    fn list(&self) -> SushiboxResult<Vec<String>>;

    /// Content of one file
    fn read(&self, name: &str) -> SushiboxResult<Cow<'_, [u8]>>;

    /// Recorded metadata of one file
    fn stat(&self, name: &str) -> SushiboxResult<AssetMeta>;

    /// Immediate children of the implicit directory `name` (`""` is the root)
    fn list_dir(&self, name: &str) -> SushiboxResult<Vec<String>> {
        let prefix = name.trim_matches('/');
        let names = self.list()?;

        if !prefix.is_empty() && names.iter().any(|n| n == prefix) {
            return Err(SushiboxError::NotADirectory(prefix.to_string()));
        }

        let mut children: Vec<String> = names
            .iter()
            .filter_map(|n| {
                if prefix.is_empty() {
                    Some(n.as_str())
                } else {
                    n.strip_prefix(prefix).and_then(|rest| rest.strip_prefix('/'))
                }
            })
            .map(|rest| rest.split_once('/').map_or(rest, |(head, _)| head).to_string())
            .collect();
        children.sort();
        children.dedup();

        if children.is_empty() && !prefix.is_empty() {
            return Err(SushiboxError::AssetNotFound {
                name: prefix.to_string(),
                source: io::Error::new(io::ErrorKind::NotFound, "no such directory in bundle"),
            });
        }

        Ok(children)
    }
}

/// Pick the asset source for this process
///
/// `SUSHIBOX_MOCK` wins over the compiled-in bundle. An empty value counts
/// as unset.
pub fn from_env() -> Box<dyn AssetSource> {
    match std::env::var_os(MOCK_DIR_ENV) {
        Some(dir) if !dir.is_empty() => {
            let assets = DirAssets::new(dir);
            debug!("Using asset directory {} from {}", assets.root().display(), MOCK_DIR_ENV);
            Box::new(assets)
        }
        _ => Box::new(EmbeddedAssets::bundled()),
    }
}

/// Permission bits of a file as recorded in the bundle
#[cfg(unix)]
pub(crate) fn mode_of(meta: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o7777
}

/// Permission bits of a file as recorded in the bundle
#[cfg(not(unix))]
pub(crate) fn mode_of(meta: &fs::Metadata) -> u32 {
    if meta.permissions().readonly() {
        0o444
    } else {
        0o644
    }
}
