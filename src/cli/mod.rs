//! Command-line handling for the launcher itself
//!
//! Options are only parsed when the launcher runs under its product name.
//! Under an alias every argument belongs to the aliased command.

pub mod args;

pub use args::{normalize_flags, usage, LauncherArgs};

use crate::dispatch::Invocation;
use crate::error::{SushiboxError, SushiboxResult};
use clap::error::ErrorKind;
use clap::Parser;
use std::ffi::OsString;

/// What the invocation asks the launcher to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Print the embedded version and exit
    ShowVersion,
    /// Print help text and exit
    ShowHelp(String),
    /// Install if needed, then run a command
    Dispatch {
        invocation: Invocation,
        verbose: u8,
    },
}

impl Request {
    /// Interpret an invocation
    pub fn parse(invocation: Invocation, product: &str) -> SushiboxResult<Self> {
        if invocation.invoked_name != product {
            return Ok(Self::Dispatch {
                invocation,
                verbose: 0,
            });
        }

        let argv = std::iter::once(OsString::from(product))
            .chain(normalize_flags(&invocation.raw_args));

        let parsed = match LauncherArgs::try_parse_from(argv) {
            Ok(parsed) => parsed,
            Err(e) if e.kind() == ErrorKind::DisplayHelp => {
                return Ok(Self::ShowHelp(e.render().to_string()));
            }
            Err(e) => {
                let message = e.render().to_string();
                let message = message.strip_prefix("error: ").unwrap_or(&message);
                return Err(SushiboxError::Usage(message.trim_end().to_string()));
            }
        };

        if parsed.version {
            return Ok(Self::ShowVersion);
        }

        Ok(Self::Dispatch {
            invocation: Invocation::new(invocation.invoked_name, parsed.command),
            verbose: parsed.verbose,
        })
    }

    /// Requested verbosity (`-v` count)
    pub fn verbose(&self) -> u8 {
        match self {
            Self::Dispatch { verbose, .. } => *verbose,
            _ => 0,
        }
    }
}
