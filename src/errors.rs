//! Typed error definitions for xdg_relocate.
//! Provides a small set of well-known failure modes for better logs and tests.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelocateError {
    #[error("{field} must be an absolute path: {path}")]
    NotAbsolute { field: &'static str, path: PathBuf },

    #[error("invalid {field} entry '{pattern}': {reason}")]
    InvalidPattern {
        field: &'static str,
        pattern: PathBuf,
        reason: &'static str,
    },

    #[error("source and target resolve to the same path: {0}")]
    SameSourceAndTarget(PathBuf),

    #[error("source '{source_dir}' and target '{target_dir}' must not be nested inside each other")]
    NestedPaths {
        source_dir: PathBuf,
        target_dir: PathBuf,
    },

    #[error("source exists but is neither a directory nor a symlink: {0}")]
    SourceNotDirectory(PathBuf),

    #[error("refusing to install redirect: {0} already exists")]
    LinkPathOccupied(PathBuf),

    #[error("cannot move {src} into place: {dest} already exists and is not empty")]
    RenameTargetOccupied { src: PathBuf, dest: PathBuf },

    #[error("sandbox metadata file not found: {0}")]
    SandboxInfoMissing(PathBuf),

    #[error("no state directory configured; pass --state-dir or set <state_dir> in the config file")]
    StateDirMissing,

    #[error("Operation interrupted by user")]
    Interrupted,
}

impl RelocateError {
    /// Stable numeric code for structured logs.
    pub fn code(&self) -> u16 {
        match self {
            RelocateError::NotAbsolute { .. } => 10,
            RelocateError::InvalidPattern { .. } => 11,
            RelocateError::SameSourceAndTarget(_) => 12,
            RelocateError::StateDirMissing => 13,
            RelocateError::NestedPaths { .. } => 14,
            RelocateError::SourceNotDirectory(_) => 20,
            RelocateError::LinkPathOccupied(_) => 21,
            RelocateError::RenameTargetOccupied { .. } => 22,
            RelocateError::SandboxInfoMissing(_) => 30,
            RelocateError::Interrupted => 130,
        }
    }

    /// Short machine-friendly name used as the `kind` log field.
    pub fn kind(&self) -> &'static str {
        match self {
            RelocateError::NotAbsolute { .. } => "not_absolute",
            RelocateError::InvalidPattern { .. } => "invalid_pattern",
            RelocateError::SameSourceAndTarget(_) => "same_source_and_target",
            RelocateError::NestedPaths { .. } => "nested_paths",
            RelocateError::StateDirMissing => "state_dir_missing",
            RelocateError::SourceNotDirectory(_) => "source_not_directory",
            RelocateError::LinkPathOccupied(_) => "link_path_occupied",
            RelocateError::RenameTargetOccupied { .. } => "rename_target_occupied",
            RelocateError::SandboxInfoMissing(_) => "sandbox_info_missing",
            RelocateError::Interrupted => "interrupted",
        }
    }

    /// True for errors raised before any filesystem mutation.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            RelocateError::NotAbsolute { .. }
                | RelocateError::InvalidPattern { .. }
                | RelocateError::SameSourceAndTarget(_)
                | RelocateError::NestedPaths { .. }
                | RelocateError::StateDirMissing
        )
    }
}
