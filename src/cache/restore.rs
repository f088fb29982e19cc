//! Extraction of the bundle and the atomic swap into place
//!
//! Files are written into a private staging directory first. Each file's
//! content is flushed to disk before its mode and mtime are stamped, since
//! the integrity check trusts that metadata. The staging directory then
//! becomes the cache root in a single rename.

use super::integrity::{check_integrity, target_path};
use crate::assets::{AssetMeta, AssetSource};
use crate::error::{SushiboxError, SushiboxResult};
use filetime::FileTime;
use std::fs::{self, DirBuilder, File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use tracing::{debug, warn};

/// Mode for every directory created during extraction
pub(crate) const DIR_MODE: u32 = 0o755;

/// How a staging directory ended up at the cache root
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commit {
    /// Cache root was absent and the staging directory was renamed onto it
    Renamed,
    /// An invalid cache root was swapped with the staging directory in one step
    Exchanged,
    /// An invalid cache root was moved aside, then the staging directory renamed in
    Displaced,
    /// Another invocation installed an intact tree first; staging is discarded
    LostRace,
}

/// Extract every bundled file under `dir`, returning the file count
pub fn restore_assets(assets: &dyn AssetSource, dir: &Path) -> SushiboxResult<usize> {
    let names = assets.list()?;
    for name in &names {
        restore_asset(assets, dir, name)?;
    }
    sync_dir(dir);
    Ok(names.len())
}

/// Extract one bundled file under `dir`
pub fn restore_asset(assets: &dyn AssetSource, dir: &Path, name: &str) -> SushiboxResult<()> {
    let meta = assets.stat(name)?;
    let data = assets.read(name)?;
    let path = target_path(dir, name);

    if let Some(parent) = path.parent() {
        create_dir_all(parent)
            .map_err(|e| SushiboxError::io(format!("creating directory {}", parent.display()), e))?;
    }

    write_synced(&path, &data)
        .map_err(|e| SushiboxError::io(format!("writing {}", path.display()), e))?;
    apply_metadata(&path, &meta)
        .map_err(|e| SushiboxError::io(format!("setting metadata on {}", path.display()), e))?;

    Ok(())
}

/// Recursively create `path` with [`DIR_MODE`]
pub(crate) fn create_dir_all(path: &Path) -> io::Result<()> {
    let mut builder = DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(DIR_MODE);
    }
    builder.create(path)
}

fn write_synced(path: &Path, data: &[u8]) -> io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    file.write_all(data)?;
    file.sync_all()
}

fn apply_metadata(path: &Path, meta: &AssetMeta) -> io::Result<()> {
    set_mode(path, meta.mode)?;
    let mtime = FileTime::from_system_time(meta.modified);
    filetime::set_file_times(path, mtime, mtime)
}

#[cfg(unix)]
pub(crate) fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
pub(crate) fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_readonly(mode & 0o222 == 0);
    fs::set_permissions(path, perms)
}

fn sync_dir(dir: &Path) {
    if let Err(e) = File::open(dir).and_then(|d| d.sync_all()) {
        debug!("Could not sync directory {}: {}", dir.display(), e);
    }
}

/// Move the fully written `staging` tree to `cache_root`
///
/// The rename is the commit point. If `cache_root` is occupied, a tree that
/// already verifies is kept (a concurrent invocation won) and anything else
/// is replaced wholesale. `staging` may afterwards hold the replaced tree;
/// the caller removes it.
pub fn commit(assets: &dyn AssetSource, staging: &Path, cache_root: &Path) -> SushiboxResult<Commit> {
    match fs::rename(staging, cache_root) {
        Ok(()) => return Ok(Commit::Renamed),
        Err(e) if fs::symlink_metadata(cache_root).is_err() => {
            return Err(SushiboxError::io(
                format!("renaming {} to {}", staging.display(), cache_root.display()),
                e,
            ));
        }
        Err(e) => debug!("Cache root {} occupied: {}", cache_root.display(), e),
    }

    if check_integrity(assets, cache_root)?.is_none() {
        debug!("Cache root {} was installed concurrently", cache_root.display());
        return Ok(Commit::LostRace);
    }

    replace(assets, staging, cache_root)
}

fn replace(assets: &dyn AssetSource, staging: &Path, cache_root: &Path) -> SushiboxResult<Commit> {
    #[cfg(all(target_os = "linux", target_env = "gnu"))]
    {
        match exchange(staging, cache_root) {
            Ok(()) => return Ok(Commit::Exchanged),
            Err(e) => debug!("Atomic exchange unavailable ({}), moving old tree aside", e),
        }
    }

    displace(assets, staging, cache_root)
}

/// Swap two directory entries in one step
#[cfg(all(target_os = "linux", target_env = "gnu"))]
fn exchange(a: &Path, b: &Path) -> io::Result<()> {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let a = CString::new(a.as_os_str().as_bytes())?;
    let b = CString::new(b.as_os_str().as_bytes())?;

    // SAFETY: both pointers are NUL-terminated strings that outlive the call.
    let rc = unsafe {
        libc::renameat2(
            libc::AT_FDCWD,
            a.as_ptr(),
            libc::AT_FDCWD,
            b.as_ptr(),
            libc::RENAME_EXCHANGE as libc::c_uint,
        )
    };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

/// Move `cache_root` aside, then rename `staging` onto it
///
/// Observers may briefly see no cache root, never a partial one.
fn displace(assets: &dyn AssetSource, staging: &Path, cache_root: &Path) -> SushiboxResult<Commit> {
    let parent = cache_root.parent().unwrap_or_else(|| Path::new("."));
    let prefix = format!(
        ".{}-stale-",
        cache_root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    );
    let stale = tempfile::Builder::new()
        .prefix(&prefix)
        .tempdir_in(parent)
        .map_err(|e| SushiboxError::io(format!("creating directory in {}", parent.display()), e))?;
    let aside = stale.path().join("old");

    match fs::rename(cache_root, &aside) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => {
            return Err(SushiboxError::io(
                format!("moving {} aside", cache_root.display()),
                e,
            ));
        }
    }

    let outcome = match fs::rename(staging, cache_root) {
        Ok(()) => Commit::Displaced,
        Err(_) if check_integrity(assets, cache_root)?.is_none() => Commit::LostRace,
        Err(e) => {
            return Err(SushiboxError::io(
                format!("renaming {} to {}", staging.display(), cache_root.display()),
                e,
            ));
        }
    };

    if let Err(e) = stale.close() {
        warn!("Failed to remove replaced cache tree: {}", e);
    }
    Ok(outcome)
}
