//! Bundle compiled into the launcher by `build.rs`

use super::{AssetMeta, AssetSource, MOCK_DIR_ENV};
use crate::error::{SushiboxError, SushiboxResult};
use std::borrow::Cow;
use std::io;
use std::time::{Duration, UNIX_EPOCH};

/// One file of the compiled-in bundle
#[derive(Debug, Clone, Copy)]
pub struct EmbeddedFile {
    /// Relative `/`-separated name
    pub name: &'static str,
    /// Permission bits
    pub mode: u32,
    /// Modification time, whole seconds since the Unix epoch
    pub modified: u64,
    /// File content
    pub data: &'static [u8],
}

mod bundle {
    use super::EmbeddedFile;

    include!(concat!(env!("OUT_DIR"), "/bundle.rs"));
}

/// Asset source over a static file table
#[derive(Debug, Clone, Copy)]
pub struct EmbeddedAssets {
    files: Option<&'static [EmbeddedFile]>,
}

impl EmbeddedAssets {
    /// The bundle this binary was built with, if any
    pub fn bundled() -> Self {
        Self {
            files: bundle::BUNDLE,
        }
    }

    /// Asset source over an explicit table
    pub const fn new(files: &'static [EmbeddedFile]) -> Self {
        Self { files: Some(files) }
    }

    /// Whether a table is present at all
    pub fn is_configured(&self) -> bool {
        self.files.is_some()
    }

    fn files(&self) -> SushiboxResult<&'static [EmbeddedFile]> {
        self.files.ok_or_else(|| {
            SushiboxError::NotConfigured(format!(
                "this build carries no embedded bundle and {} is not set",
                MOCK_DIR_ENV
            ))
        })
    }

    fn find(&self, name: &str) -> SushiboxResult<&'static EmbeddedFile> {
        self.files()?
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| SushiboxError::AssetNotFound {
                name: name.to_string(),
                source: io::Error::new(io::ErrorKind::NotFound, "not in embedded bundle"),
            })
    }
}

impl AssetSource for EmbeddedAssets {
    fn list(&self) -> SushiboxResult<Vec<String>> {
        let mut names: Vec<String> = self.files()?.iter().map(|f| f.name.to_string()).collect();
        names.sort();
        Ok(names)
    }

    fn read(&self, name: &str) -> SushiboxResult<Cow<'_, [u8]>> {
        Ok(Cow::Borrowed(self.find(name)?.data))
    }

    fn stat(&self, name: &str) -> SushiboxResult<AssetMeta> {
        let file = self.find(name)?;
        Ok(AssetMeta {
            size: file.data.len() as u64,
            mode: file.mode,
            modified: UNIX_EPOCH + Duration::from_secs(file.modified),
        })
    }
}
