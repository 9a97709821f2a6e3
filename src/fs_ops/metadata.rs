//! Metadata handling for materialized copies.
//! - Carries atime over from the source and stamps mtime with the copy time, so a
//!   relocated file reads as freshly materialized to anything keyed on mtime.
//! - Preserves permission bits (Unix mode).
//! - Times and modes are part of the copy; failures propagate. Extended
//!   attributes are best-effort.

use anyhow::Result;
use filetime::{set_file_times, FileTime};
use std::fs;
use std::path::Path;
use tracing::trace;

use super::helpers::io_error_with_help;

/// Stamp `dest` with the source's atime and the current time as mtime.
pub fn refresh_times(dest: &Path, src_meta: &fs::Metadata) -> Result<()> {
    let at = FileTime::from_last_access_time(src_meta);
    set_file_times(dest, at, FileTime::now()).map_err(io_error_with_help("set file times", dest))?;
    trace!(path = %dest.display(), "refreshed mtime on destination");
    Ok(())
}

/// Copy permission bits from the source metadata onto `dest`.
pub fn preserve_permissions(dest: &Path, src_meta: &fs::Metadata) -> Result<()> {
    #[cfg(unix)]
    let perms = {
        use std::os::unix::fs::PermissionsExt;
        fs::Permissions::from_mode(src_meta.permissions().mode() & 0o7777)
    };
    #[cfg(not(unix))]
    let perms = {
        let mut perms = fs::metadata(dest)
            .map_err(io_error_with_help("stat", dest))?
            .permissions();
        perms.set_readonly(src_meta.permissions().readonly());
        perms
    };
    fs::set_permissions(dest, perms).map_err(io_error_with_help("set permissions", dest))
}

/// Preserve extended attributes (xattrs) from source path to destination path.
/// Requires the "xattrs" feature, otherwise this is a no-op.
pub fn preserve_xattrs(src: &Path, dest: &Path) {
    #[cfg(feature = "xattrs")]
    {
        match xattr::list(src) {
            Ok(names) => {
                for name in names {
                    let name_disp = name.to_string_lossy().into_owned();
                    match xattr::get(src, &name) {
                        Ok(value) => {
                            let value = value.unwrap_or_default();
                            if let Err(e) = xattr::set(dest, &name, &value) {
                                tracing::warn!(src = %src.display(), dest = %dest.display(), xattr = %name_disp, error = %e, "failed to set xattr on destination");
                            } else {
                                trace!(dest = %dest.display(), xattr = %name_disp, size = value.len(), "preserved xattr");
                            }
                        }
                        Err(e) => {
                            tracing::warn!(src = %src.display(), xattr = %name_disp, error = %e, "failed to read xattr value from source");
                        }
                    }
                }
            }
            Err(e) => {
                tracing::warn!(src = %src.display(), error = %e, "failed to list xattrs; continuing");
            }
        }
    }
    #[cfg(not(feature = "xattrs"))]
    {
        let _ = (src, dest);
    }
}
