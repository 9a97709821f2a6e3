//! Windows implementations of platform helpers (best-effort).
//!
//! Notes:
//! - Creating symlinks needs Developer Mode or the SeCreateSymbolicLink privilege.
//! - No ACL management; config writes are temp + rename.

use anyhow::{bail, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use super::temp::tmp_sibling_name;

/// Create a symlink at `link` storing `value`. Windows distinguishes directory and
/// file links, so the value is resolved against the link's parent to pick one.
pub fn create_symlink(value: &Path, link: &Path) -> io::Result<()> {
    let resolved = match link.parent() {
        Some(parent) => parent.join(value),
        None => value.to_path_buf(),
    };
    if resolved.is_dir() {
        std::os::windows::fs::symlink_dir(value, link)
    } else {
        std::os::windows::fs::symlink_file(value, link)
    }
}

/// Open log file for appending.
pub fn open_log_file_secure_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Write a new config file via a temp sibling + rename. Fails if the target exists.
pub fn write_config_secure_new_0600(path: &Path, contents: &[u8]) -> Result<()> {
    if path.exists() {
        bail!("Config file already exists: {}", path.display());
    }
    let parent = path
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "config path has no parent"))?;
    fs::create_dir_all(parent)?;
    let tmp = tmp_sibling_name(path);
    let mut f = OpenOptions::new().write(true).create_new(true).open(&tmp)?;
    f.write_all(contents)?;
    f.sync_all()?;
    drop(f);
    fs::rename(&tmp, path)?;
    Ok(())
}

/// No POSIX modes on Windows.
pub fn set_dir_mode_0700(_path: &Path) -> io::Result<()> {
    Ok(())
}
