//! Recursive tree copy with exclusion pruning.
//!
//! - Walks the source without following symlinks; links are recreated as links.
//! - Excluded directories are pruned (never descended), excluded files skipped.
//! - Directories are created on demand; an existing directory (or a symlink to one) is fine.
//! - Regular files are copied with their permission bits; mtime is set to the copy time.
//! - An existing non-directory at a destination path is replaced, so a re-run over a
//!   partially copied target converges instead of failing.
//! - Never deletes anything under the source.

use anyhow::Result;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};
use walkdir::WalkDir;

use super::helpers::io_error_with_help;
use super::matcher::PathMatcher;
use super::metadata;
use crate::platform::create_symlink;

/// Counters collected while copying a tree.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CopyStats {
    pub dirs: u64,
    pub files: u64,
    pub symlinks: u64,
    pub bytes: u64,
    /// Entries pruned by the exclusion patterns.
    pub excluded: u64,
    /// Special files (fifo, socket, device) that were not copied.
    pub skipped: u64,
}

/// Copy everything under `src` into `dst`, skipping entries matched by `exclude`
/// (patterns relative to `src`).
pub fn copy_tree<I, P>(src: &Path, dst: &Path, exclude: I) -> Result<CopyStats>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let matcher = PathMatcher::new(src, exclude);
    let mut stats = CopyStats::default();
    let mut excluded = 0u64;
    // (destination dir, source metadata) to apply permissions to once children are written
    let mut dir_modes: Vec<(PathBuf, fs::Metadata)> = Vec::new();

    let walker = WalkDir::new(src)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            if e.depth() == 0 || !matcher.is_match(e.path()) {
                return true;
            }
            trace!(path = %e.path().display(), "excluded from copy");
            excluded += 1;
            false
        });

    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(src).to_path_buf();
            io_error_with_help("walk source tree", &path)(io::Error::from(e))
        })?;
        let ft = entry.file_type();
        let src_path = entry.path();

        if entry.depth() == 0 {
            if !ft.is_dir() {
                return Err(io_error_with_help("copy tree root", src_path)(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "not a directory",
                )));
            }
            fs::create_dir_all(dst).map_err(io_error_with_help("create directory", dst))?;
            let meta = entry
                .metadata()
                .map_err(|e| io_error_with_help("stat", src_path)(io::Error::from(e)))?;
            dir_modes.push((dst.to_path_buf(), meta));
            stats.dirs += 1;
            continue;
        }

        let rel = src_path.strip_prefix(src)?;
        let dest = dst.join(rel);

        if ft.is_dir() {
            if create_dir_idempotent(&dest)? {
                let meta = entry
                    .metadata()
                    .map_err(|e| io_error_with_help("stat", src_path)(io::Error::from(e)))?;
                dir_modes.push((dest, meta));
            }
            stats.dirs += 1;
        } else if ft.is_symlink() {
            copy_symlink(src_path, &dest)?;
            stats.symlinks += 1;
        } else if ft.is_file() {
            stats.bytes += copy_file(src_path, &dest)?;
            stats.files += 1;
        } else {
            warn!(path = %src_path.display(), "skipping special file");
            stats.skipped += 1;
        }
    }

    // Deepest first so a read-only parent never blocks its children.
    for (dir, meta) in dir_modes.iter().rev() {
        metadata::preserve_permissions(dir, meta)?;
    }

    stats.excluded = excluded;
    debug!(
        src = %src.display(),
        dest = %dst.display(),
        dirs = stats.dirs,
        files = stats.files,
        symlinks = stats.symlinks,
        bytes = stats.bytes,
        excluded = stats.excluded,
        "copied tree"
    );
    Ok(stats)
}

/// Create a single directory. An existing directory at `path`, or a symlink to
/// one, is accepted. Returns whether `path` is a real directory we may chmod.
fn create_dir_idempotent(path: &Path) -> Result<bool> {
    match fs::create_dir(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            let is_dir = fs::metadata(path).map(|m| m.is_dir()).unwrap_or(false);
            if !is_dir {
                return Err(io_error_with_help("create directory", path)(e));
            }
            let is_link = fs::symlink_metadata(path)
                .map(|m| m.file_type().is_symlink())
                .unwrap_or(false);
            if is_link {
                debug!(path = %path.display(), "destination directory is a symlink; copying through it");
            }
            Ok(!is_link)
        }
        Err(e) => Err(io_error_with_help("create directory", path)(e)),
    }
}

/// Remove a file or symlink sitting where we are about to write.
/// A real directory there is left alone and surfaces as an error from the caller's write.
fn clear_non_dir(path: &Path) -> Result<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if !meta.file_type().is_dir() => {
            fs::remove_file(path).map_err(io_error_with_help("replace existing entry", path))
        }
        _ => Ok(()),
    }
}

fn copy_file(src: &Path, dest: &Path) -> Result<u64> {
    clear_non_dir(dest)?;
    let bytes = fs::copy(src, dest).map_err(io_error_with_help("copy file", dest))?;
    let src_meta = fs::metadata(src).map_err(io_error_with_help("stat", src))?;
    metadata::refresh_times(dest, &src_meta)?;
    metadata::preserve_xattrs(src, dest);
    trace!(src = %src.display(), dest = %dest.display(), bytes, "copied file");
    Ok(bytes)
}

fn copy_symlink(src: &Path, dest: &Path) -> Result<()> {
    let value = fs::read_link(src).map_err(io_error_with_help("read symlink", src))?;
    clear_non_dir(dest)?;
    create_symlink(&value, dest).map_err(io_error_with_help("create symlink", dest))?;
    trace!(link = %dest.display(), value = %value.display(), "recreated symlink");
    Ok(())
}
