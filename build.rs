//! Embeds the bundle directory into the launcher
//!
//! `SUSHIBOX_BUNDLE_DIR` names the directory to embed; it must contain a
//! `bin/` subdirectory. Every regular file below it becomes one entry of a
//! static table in `$OUT_DIR/bundle.rs`, with its permission bits and
//! whole-second mtime. Without the variable the table is `None`.
//!
//! The version is `SUSHIBOX_VERSION` if set, else the build time
//! (`%Y%m%d-%H%M%S`) when a bundle is embedded, else `developing`.

use std::env;
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

const BUNDLE_DIR_ENV: &str = "SUSHIBOX_BUNDLE_DIR";
const VERSION_ENV: &str = "SUSHIBOX_VERSION";

struct Entry {
    name: String,
    path: PathBuf,
    mode: u32,
    modified: u64,
}

fn main() -> io::Result<()> {
    println!("cargo::rerun-if-changed=build.rs");
    println!("cargo::rerun-if-env-changed={BUNDLE_DIR_ENV}");
    println!("cargo::rerun-if-env-changed={VERSION_ENV}");

    let bundle_dir = env::var_os(BUNDLE_DIR_ENV)
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from);

    let table = match &bundle_dir {
        Some(dir) => {
            println!("cargo::rerun-if-changed={}", dir.display());
            let dir = fs::canonicalize(dir).map_err(|e| {
                io::Error::new(e.kind(), format!("{BUNDLE_DIR_ENV}={}: {e}", dir.display()))
            })?;
            if !dir.join("bin").is_dir() {
                return Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("bin directory does not exist under {}", dir.display()),
                ));
            }

            let mut entries = Vec::new();
            collect(&dir, "", &mut entries)?;
            entries.sort_by(|a, b| a.name.cmp(&b.name));
            render_table(&entries)
        }
        None => {
            println!("cargo::warning=No {BUNDLE_DIR_ENV} set: the launcher carries no bundle and needs SUSHIBOX_MOCK at runtime");
            "None".to_string()
        }
    };

    let version = env::var(VERSION_ENV)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| match bundle_dir {
            Some(_) => chrono::Local::now().format("%Y%m%d-%H%M%S").to_string(),
            None => "developing".to_string(),
        });
    println!("cargo::rustc-env=SUSHIBOX_BUILD_VERSION={version}");

    let out_dir = PathBuf::from(env::var_os("OUT_DIR").ok_or_else(|| {
        io::Error::new(io::ErrorKind::NotFound, "OUT_DIR not set by cargo")
    })?);
    fs::write(
        out_dir.join("bundle.rs"),
        format!("pub(crate) static BUNDLE: Option<&[EmbeddedFile]> = {table};\n"),
    )
}

fn collect(dir: &Path, prefix: &str, entries: &mut Vec<Entry>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let file_name = entry.file_name().into_string().map_err(|name| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("bundle file name is not UTF-8: {name:?}"),
            )
        })?;
        let name = if prefix.is_empty() {
            file_name
        } else {
            format!("{prefix}/{file_name}")
        };

        let meta = fs::metadata(entry.path())?;
        if meta.is_dir() {
            collect(&entry.path(), &name, entries)?;
        } else if meta.is_file() {
            let modified = meta
                .modified()?
                .duration_since(UNIX_EPOCH)
                .map_or(0, |d| d.as_secs());
            entries.push(Entry {
                name,
                path: entry.path(),
                mode: mode_of(&meta),
                modified,
            });
        } else {
            println!("cargo::warning=Skipping {name}: not a regular file");
        }
    }
    Ok(())
}

fn render_table(entries: &[Entry]) -> String {
    let mut table = String::from("Some(&[\n");
    for entry in entries {
        let _ = writeln!(
            table,
            "    EmbeddedFile {{ name: {:?}, mode: {:#o}, modified: {}, data: include_bytes!({:?}) }},",
            entry.name,
            entry.mode,
            entry.modified,
            entry.path.display().to_string(),
        );
    }
    table.push_str("])");
    table
}

#[cfg(unix)]
fn mode_of(meta: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn mode_of(meta: &fs::Metadata) -> u32 {
    if meta.permissions().readonly() {
        0o444
    } else {
        0o644
    }
}
