//! Atomic file replacement.
//!
//! Files shared between concurrently running host processes (the
//! authorized_keys store and the identity directory) are never truncated in
//! place. Content goes to a temporary file in the same directory which is
//! then renamed over the target, so a reader sees either the old or the new
//! file, never a partial one.

use std::{fs, io::Write, path::Path};

use tempfile::NamedTempFile;

/// Replace `path` with `contents`, restricting the result to `mode` on unix.
pub(crate) fn write_atomic(path: &Path, contents: &[u8], mode: u32) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    set_mode(tmp.path(), mode)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(unix)]
pub(crate) fn set_mode(path: &Path, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
pub(crate) fn set_mode(_path: &Path, _mode: u32) -> std::io::Result<()> {
    Ok(())
}
