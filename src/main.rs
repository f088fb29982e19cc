//! Sushibox - self-extracting command launcher
//!
//! Entry point: installs the bundle for this version if needed and execs
//! the requested command.

use console::style;
use std::io;
use std::process::ExitCode;
use sushibox::assets;
use sushibox::cli::Request;
use sushibox::config::{Settings, PRODUCT};
use sushibox::dispatch::{ExecRunner, Invocation};
use sushibox::error::SushiboxResult;
use sushibox::launcher::{self, Launcher};
use tracing::debug;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(code) => u8::try_from(code).map_or(ExitCode::FAILURE, ExitCode::from),
        Err(e) => {
            eprintln!("{} {}", style("Error:").for_stderr().red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").for_stderr().yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

fn run() -> SushiboxResult<i32> {
    let invocation = Invocation::from_args(std::env::args_os(), PRODUCT);
    let request = Request::parse(invocation, PRODUCT)?;
    if let Some(code) = launcher::respond(&request, sushibox::VERSION, &mut io::stdout())? {
        return Ok(code);
    }

    let settings = Settings::resolve(sushibox::VERSION)?;
    init_logging(request.verbose(), settings.log_filter.as_deref());
    if let Some(path) = &settings.config_path {
        if path.exists() {
            debug!("Using config file {}", path.display());
        } else {
            debug!("Config file {} not found, using defaults", path.display());
        }
    }

    let assets = assets::from_env();
    Launcher::new(&settings, assets.as_ref(), &ExecRunner).run(request, &mut io::stdout())
}

/// Logs go to stderr so the dispatched command's stdout stays clean.
///
/// Filter precedence: SUSHIBOX_LOG, then -v, then the config file.
fn init_logging(verbose: u8, configured: Option<&str>) {
    let filter = EnvFilter::try_from_env(sushibox::LOG_ENV)
        .ok()
        .or_else(|| match verbose {
            0 => None,
            1 => Some(EnvFilter::new("sushibox=info")),
            _ => Some(EnvFilter::new("sushibox=debug")),
        })
        .or_else(|| configured.and_then(|directive| EnvFilter::try_new(directive).ok()))
        .unwrap_or_else(|| EnvFilter::new("sushibox=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .init();
}
