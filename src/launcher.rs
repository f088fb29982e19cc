//! Launcher orchestration
//!
//! ```text
//! Init ──ensure_installed──▶ Installed ──execute──▶ Dispatched
//!   │                           │
//!   └──────────▶ Failed ◀───────┘
//! ```
//!
//! `Dispatched` is reached by replacing the process, so in production `run`
//! only returns for the version/help requests or on failure.

use crate::assets::AssetSource;
use crate::cache::InstallCache;
use crate::cli::Request;
use crate::config::Settings;
use crate::dispatch::{self, ProcessRunner};
use crate::error::{SushiboxError, SushiboxResult};
use std::io::Write;
use tracing::debug;

/// Launcher state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Init,
    Installed,
    Dispatched,
    Failed,
}

/// Wires the asset source, install cache and dispatcher together
pub struct Launcher<'a> {
    settings: &'a Settings,
    assets: &'a dyn AssetSource,
    runner: &'a dyn ProcessRunner,
}

impl<'a> Launcher<'a> {
    pub fn new(
        settings: &'a Settings,
        assets: &'a dyn AssetSource,
        runner: &'a dyn ProcessRunner,
    ) -> Self {
        Self {
            settings,
            assets,
            runner,
        }
    }

    /// Carry out `request`, writing version and help output to `out`
    ///
    /// Returns the exit code when the process was not replaced.
    pub fn run(&self, request: Request, out: &mut dyn Write) -> SushiboxResult<i32> {
        let invocation = match request {
            Request::Dispatch { invocation, .. } => invocation,
            other => {
                return respond(&other, self.settings.version, out).map(|code| code.unwrap_or(0));
            }
        };

        let mut stage = Stage::Init;
        let result = self.dispatch(&invocation, &mut stage);
        if result.is_err() {
            transition(&mut stage, Stage::Failed);
        }
        result
    }

    fn dispatch(&self, invocation: &dispatch::Invocation, stage: &mut Stage) -> SushiboxResult<i32> {
        let target = match dispatch::resolve(invocation, self.settings.product) {
            Err(SushiboxError::MissingCommand { usage }) => {
                return Err(SushiboxError::MissingCommand {
                    usage: self.usage_with_commands(usage),
                });
            }
            other => other?,
        };

        let installed = InstallCache::new(self.assets, &self.settings.layout).ensure_installed()?;
        debug!(
            "Version {} ready at {} (rebuilt: {})",
            self.settings.version,
            installed.cache_root.display(),
            installed.rebuilt
        );
        transition(stage, Stage::Installed);

        let code = dispatch::execute(&self.settings.layout.bin_root, &target, self.runner)?;
        transition(stage, Stage::Dispatched);
        Ok(code)
    }

    /// Append the bundled command names to a usage text, when available
    fn usage_with_commands(&self, usage: String) -> String {
        match self.assets.list_dir("bin") {
            Ok(commands) if !commands.is_empty() => {
                format!("{}\n\nCommands:\n  {}", usage.trim_end(), commands.join("\n  "))
            }
            _ => usage,
        }
    }
}

/// Answer the requests that need neither settings nor the bundle
///
/// Writes the version or help text to `out` and returns the exit code;
/// returns `None` for a dispatch request.
pub fn respond(request: &Request, version: &str, out: &mut dyn Write) -> SushiboxResult<Option<i32>> {
    match request {
        Request::ShowVersion => {
            writeln!(out, "{}", version).map_err(|e| SushiboxError::io("writing version", e))?;
            Ok(Some(0))
        }
        Request::ShowHelp(text) => {
            write!(out, "{}", text).map_err(|e| SushiboxError::io("writing help", e))?;
            Ok(Some(0))
        }
        Request::Dispatch { .. } => Ok(None),
    }
}

fn transition(stage: &mut Stage, next: Stage) {
    debug!("{:?} -> {:?}", stage, next);
    *stage = next;
}
