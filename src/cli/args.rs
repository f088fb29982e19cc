//! Launcher options, parsed only when invoked under the product name

use clap::{ArgAction, CommandFactory, Parser};
use std::ffi::OsString;

/// Sushibox - self-extracting command launcher
///
/// Installs the bundled files for this version on first use, then runs
/// the requested command from the bundle.
#[derive(Parser, Debug)]
#[command(name = crate::config::PRODUCT)]
#[command(long_about = None, disable_version_flag = true)]
#[command(override_usage = "sushibox [OPTIONS] <COMMAND> [ARGS]...")]
pub struct LauncherArgs {
    /// Print the bundle version and exit
    #[arg(long)]
    pub version: bool,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Bundled command to run, followed by its arguments
    #[arg(value_name = "COMMAND", trailing_var_arg = true)]
    pub command: Vec<OsString>,
}

/// Long options also accepted with a single dash before the command
const SINGLE_DASH_LONGS: &[&str] = &["-version", "-verbose", "-help"];

/// Accept `-version` style options in front of the command
///
/// Only the options before the first positional argument are rewritten;
/// the command's own arguments are never touched.
pub fn normalize_flags(args: &[OsString]) -> Vec<OsString> {
    let mut normalized = Vec::with_capacity(args.len());
    let mut options = true;

    for arg in args {
        if options {
            match arg.to_str() {
                Some("--") => options = false,
                Some(flag) if SINGLE_DASH_LONGS.contains(&flag) => {
                    normalized.push(OsString::from(format!("-{}", flag)));
                    continue;
                }
                Some(flag) if flag.starts_with('-') => {}
                _ => options = false,
            }
        }
        normalized.push(arg.clone());
    }

    normalized
}

/// Usage line for the launcher
pub fn usage() -> String {
    LauncherArgs::command().render_usage().to_string()
}
