//! Error types for Sushibox
//!
//! All modules use `SushiboxResult<T>` as their return type.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Sushibox operations
pub type SushiboxResult<T> = Result<T, SushiboxError>;

/// All errors that can occur in Sushibox
#[derive(Error, Debug)]
pub enum SushiboxError {
    // Asset errors
    #[error("Asset bundle not configured: {0}")]
    NotConfigured(String),

    #[error("Asset not found: {name}: {source}")]
    AssetNotFound {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("Asset is not a directory: {0}")]
    NotADirectory(String),

    // Install errors
    #[error("Install failed for {path}: {reason}")]
    InstallFailed { path: PathBuf, reason: String },

    // Invocation errors
    #[error("Missing command\n\n{usage}")]
    MissingCommand { usage: String },

    #[error("{0}")]
    Usage(String),

    // Dispatch errors
    #[error("Dispatch of {command} ({path}) failed: {source}")]
    DispatchFailed {
        command: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    // IO errors
    #[error("IO error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl SushiboxError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create an install failure for the given cache root
    pub fn install_failed(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::InstallFailed {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Kind of the underlying OS error when dispatching failed
    ///
    /// Lets callers tell a missing command (`NotFound`) apart from one that
    /// exists but cannot be run (`PermissionDenied`).
    pub fn dispatch_kind(&self) -> Option<io::ErrorKind> {
        match self {
            Self::DispatchFailed { source, .. } => Some(source.kind()),
            _ => None,
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::NotConfigured(_) => {
                Some("Build with SUSHIBOX_BUNDLE_DIR set, or point SUSHIBOX_MOCK at an asset directory")
            }
            Self::InstallFailed { .. } => Some("Re-run the command to retry the installation"),
            Self::DispatchFailed { source, .. } => match source.kind() {
                io::ErrorKind::NotFound => Some("Commands are looked up in the bundle's bin/ directory"),
                io::ErrorKind::PermissionDenied => {
                    Some("The bundled file is not executable; check its mode in the bundle")
                }
                _ => None,
            },
            _ => None,
        }
    }
}
