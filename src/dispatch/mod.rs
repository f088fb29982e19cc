//! Command resolution and dispatch
//!
//! The launcher is either run under its product name (`sushibox foo a b`)
//! or under an alias named after a bundled command (`foo a b`, usually a
//! symlink). Both resolve to `foo` with arguments `[a, b]`, which is then
//! looked up in the cache's `bin/` directory and executed.

mod runner;

pub use runner::{Captured, CapturingRunner, ExecRunner, ProcessRunner};

use crate::cli;
use crate::error::{SushiboxError, SushiboxResult};
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// How the launcher was called
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// File name the launcher was invoked as
    pub invoked_name: String,
    /// Arguments after argv[0]
    pub raw_args: Vec<OsString>,
}

impl Invocation {
    pub fn new(invoked_name: impl Into<String>, raw_args: Vec<OsString>) -> Self {
        Self {
            invoked_name: invoked_name.into(),
            raw_args,
        }
    }

    /// Build from a full argument vector, argv[0] included
    ///
    /// The invoked name is the file name of argv[0] without the platform's
    /// executable suffix. An empty argv counts as an invocation under
    /// `fallback_name`.
    pub fn from_args<I>(args: I, fallback_name: &str) -> Self
    where
        I: IntoIterator<Item = OsString>,
    {
        let mut args = args.into_iter();
        let invoked_name = args
            .next()
            .and_then(|arg0| {
                Path::new(&arg0)
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
            })
            .map(|name| strip_exe_suffix(&name).to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| fallback_name.to_string());

        Self {
            invoked_name,
            raw_args: args.collect(),
        }
    }
}

fn strip_exe_suffix(name: &str) -> &str {
    let suffix = std::env::consts::EXE_SUFFIX;
    if suffix.is_empty() {
        return name;
    }
    name.strip_suffix(suffix).unwrap_or(name)
}

/// A resolved command and the arguments to pass it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub command: String,
    pub args: Vec<OsString>,
}

/// Decide which command an invocation refers to
///
/// Invoked as `product`, the first argument is the command. Invoked under
/// any other name, that name is the command and every argument passes
/// through untouched.
pub fn resolve(invocation: &Invocation, product: &str) -> SushiboxResult<Target> {
    if invocation.invoked_name != product {
        return Ok(Target {
            command: invocation.invoked_name.clone(),
            args: invocation.raw_args.clone(),
        });
    }

    let (first, rest) = invocation
        .raw_args
        .split_first()
        .ok_or_else(|| SushiboxError::MissingCommand {
            usage: cli::usage(),
        })?;

    let command = first.to_str().ok_or_else(|| {
        SushiboxError::Usage(format!("command name is not valid UTF-8: {:?}", first))
    })?;

    Ok(Target {
        command: command.to_string(),
        args: rest.to_vec(),
    })
}

/// Run `target` from `bin_root` with `runner`
///
/// With a replacing runner this only returns on failure. Errors keep the
/// OS error kind, so a missing command (`NotFound`) can be told apart from
/// one that is not executable (`PermissionDenied`).
pub fn execute(bin_root: &Path, target: &Target, runner: &dyn ProcessRunner) -> SushiboxResult<i32> {
    let path = command_path(bin_root, &target.command)?;
    let failed = |source: io::Error| SushiboxError::DispatchFailed {
        command: target.command.clone(),
        path: path.clone(),
        source,
    };

    fs::metadata(&path).map_err(failed)?;

    debug!("Dispatching {} with {} args", path.display(), target.args.len());
    runner.exec(&path, &target.args).map_err(failed)
}

/// `<bin_root>/<command>`, refusing names that would leave `bin_root`
fn command_path(bin_root: &Path, command: &str) -> SushiboxResult<PathBuf> {
    let mut components = Path::new(command).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(name)), None) if name == command => Ok(bin_root.join(command)),
        _ => Err(SushiboxError::DispatchFailed {
            command: command.to_string(),
            path: bin_root.join(command),
            source: io::Error::new(
                io::ErrorKind::InvalidInput,
                "command must be a plain file name",
            ),
        }),
    }
}
