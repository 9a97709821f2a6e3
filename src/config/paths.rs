//! Default path helpers and symlink checks.
//! Determines OS-appropriate config/log paths and detects symlinked ancestors for safety.

use anyhow::{anyhow, Result};
use dirs::{config_dir, data_dir};
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Environment variable pointing at an explicit config file (or a directory holding `config.xml`).
pub const CONFIG_ENV: &str = "XDG_RELOCATE_CONFIG";

const APP_DIR: &str = "xdg_relocate";

/// Config file location: `$XDG_RELOCATE_CONFIG` if set, else the OS config dir.
/// A relative override is resolved against the current directory.
pub fn default_config_path() -> Result<PathBuf> {
    if let Some(p) = env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
        let mut path = PathBuf::from(p);
        if path.is_relative() {
            path = env::current_dir()?.join(path);
        }
        if path.is_dir() {
            path.push("config.xml");
        }
        return Ok(path);
    }
    if let Some(base) = config_dir() {
        return Ok(base.join(APP_DIR).join("config.xml"));
    }
    env::var_os("HOME")
        .map(|h| PathBuf::from(h).join(".config").join(APP_DIR).join("config.xml"))
        .ok_or_else(|| anyhow!("cannot determine a config directory (no HOME)"))
}

/// OS-appropriate default log file path (data dir). Only suggested in the template.
pub fn default_log_path() -> Result<PathBuf> {
    if let Some(base) = data_dir() {
        return Ok(base.join(APP_DIR).join("xdg_relocate.log"));
    }
    env::var_os("HOME")
        .map(|h| {
            PathBuf::from(h)
                .join(".local")
                .join("share")
                .join(APP_DIR)
                .join("xdg_relocate.log")
        })
        .ok_or_else(|| anyhow!("cannot determine a data directory (no HOME)"))
}

/// Return true if any existing ancestor of `path` is a symlink.
pub fn path_has_symlink_ancestor(path: &Path) -> io::Result<bool> {
    let mut p = path.parent();
    while let Some(anc) = p {
        if anc.exists() {
            let meta = fs::symlink_metadata(anc)?;
            if meta.file_type().is_symlink() {
                return Ok(true);
            }
        }
        p = anc.parent();
    }
    Ok(false)
}
