//! Redirect installation: replace a retired directory path with a relative symlink.
//!
//! Relative link values keep the whole tree portable when the private storage area
//! itself lives inside a structure that may be moved as a unit.

use anyhow::{anyhow, Result};
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::info;

use super::helpers::io_error_with_help;
use crate::errors::RelocateError;
use crate::platform::create_symlink;

/// Lexically normalize a path: drop `.` and fold `..` into its parent.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                let last = out.components().next_back();
                let pops = matches!(last, Some(Component::Normal(_)));
                let at_root = matches!(last, Some(Component::RootDir | Component::Prefix(_)));
                if pops {
                    out.pop();
                } else if !at_root {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Express `path` relative to the directory `base`. Both are expected to be absolute;
/// the computation is purely lexical and never touches the filesystem.
pub fn relative_path(path: &Path, base: &Path) -> PathBuf {
    let path = normalize(path);
    let base = normalize(base);
    let path_comps: Vec<Component<'_>> = path.components().collect();
    let base_comps: Vec<Component<'_>> = base.components().collect();

    let common = path_comps
        .iter()
        .zip(&base_comps)
        .take_while(|(a, b)| a == b)
        .count();

    let mut rel = PathBuf::new();
    for _ in common..base_comps.len() {
        rel.push("..");
    }
    for comp in &path_comps[common..] {
        rel.push(comp.as_os_str());
    }
    if rel.as_os_str().is_empty() {
        rel.push(".");
    }
    rel
}

/// Create a symlink at `link_path` whose stored value is `real_path` relative to
/// `link_path`'s parent. `link_path` must not exist. Returns the stored value.
pub fn install_redirect(link_path: &Path, real_path: &Path) -> Result<PathBuf> {
    if fs::symlink_metadata(link_path).is_ok() {
        return Err(RelocateError::LinkPathOccupied(link_path.to_path_buf()).into());
    }
    let parent = link_path
        .parent()
        .ok_or_else(|| anyhow!("link path has no parent: {}", link_path.display()))?;
    let value = relative_path(real_path, parent);
    create_symlink(&value, link_path).map_err(io_error_with_help("create symlink", link_path))?;
    info!(link = %link_path.display(), value = %value.display(), "installed redirect");
    Ok(value)
}
