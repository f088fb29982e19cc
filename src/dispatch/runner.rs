//! Process runners
//!
//! [`ExecRunner`] replaces the launcher with the target command. On targets
//! without `exec` it falls back to spawn-and-wait, which does not keep the
//! process id and does not forward signals.
//! [`CapturingRunner`] runs the target as a child and records its output.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use std::sync::{Mutex, PoisonError};
use tracing::debug;

/// Runs a resolved command
pub trait ProcessRunner {
    /// Run `program` with `args`, inheriting the environment
    ///
    /// A replacing runner only returns on failure. A runner that waits for a
    /// child returns the child's exit code.
    fn exec(&self, program: &Path, args: &[OsString]) -> io::Result<i32>;
}

/// Production runner: process image replacement
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecRunner;

impl ProcessRunner for ExecRunner {
    #[cfg(unix)]
    fn exec(&self, program: &Path, args: &[OsString]) -> io::Result<i32> {
        use std::os::unix::process::CommandExt;

        debug!("exec {}", program.display());
        // argv[0] is the program path as given
        Err(Command::new(program).args(args).exec())
    }

    #[cfg(not(unix))]
    fn exec(&self, program: &Path, args: &[OsString]) -> io::Result<i32> {
        debug!("spawning {} (no exec on this platform)", program.display());
        let status = Command::new(program).args(args).status()?;
        Ok(exit_code(&status))
    }
}

/// One finished run recorded by [`CapturingRunner`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Captured {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub code: i32,
}

/// Runner that spawns the command as a child and captures its output
#[derive(Debug, Default)]
pub struct CapturingRunner {
    last: Mutex<Option<Captured>>,
}

impl CapturingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recent successful spawn
    pub fn last(&self) -> Option<Captured> {
        self.last.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl ProcessRunner for CapturingRunner {
    fn exec(&self, program: &Path, args: &[OsString]) -> io::Result<i32> {
        let output = Command::new(program).args(args).output()?;
        let code = exit_code(&output.status);

        *self.last.lock().unwrap_or_else(PoisonError::into_inner) = Some(Captured {
            program: program.to_path_buf(),
            args: args.to_vec(),
            stdout: output.stdout,
            stderr: output.stderr,
            code,
        });
        Ok(code)
    }
}

/// Shell-style exit code: the status code, or 128 + signal number
fn exit_code(status: &ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}
