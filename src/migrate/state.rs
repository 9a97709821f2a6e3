//! Unit progress derived purely from the filesystem.
//! Recomputed at the start of every call; never cached.

use anyhow::Result;
use std::fmt;
use std::fs;
use std::io;

use super::unit::MigrationUnit;
use crate::errors::RelocateError;
use crate::fs_ops::io_error_with_help;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitState {
    /// `source` is a real directory.
    NotStarted,
    /// `source` does not exist at all.
    Missing,
    /// `source` is a link and nothing is left to clean up.
    Migrated,
    /// `source` is a link and the retired original is still around.
    CleanupPending,
    /// The whole `source` directory is provided by an external mount.
    ExternallyMounted,
}

impl UnitState {
    pub fn detect(unit: &MigrationUnit) -> Result<Self> {
        if unit.covers_whole_tree() {
            return Ok(UnitState::ExternallyMounted);
        }
        match fs::symlink_metadata(&unit.source) {
            Ok(meta) if meta.file_type().is_symlink() => {
                if unit.two_step && unit.retired_source().is_dir() {
                    Ok(UnitState::CleanupPending)
                } else {
                    Ok(UnitState::Migrated)
                }
            }
            Ok(meta) if meta.file_type().is_dir() => Ok(UnitState::NotStarted),
            Ok(_) => Err(RelocateError::SourceNotDirectory(unit.source.clone()).into()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(UnitState::Missing),
            Err(e) => Err(io_error_with_help("stat source", &unit.source)(e)),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            UnitState::NotStarted => "not_started",
            UnitState::Missing => "missing",
            UnitState::Migrated => "migrated",
            UnitState::CleanupPending => "cleanup_pending",
            UnitState::ExternallyMounted => "externally_mounted",
        }
    }
}

impl fmt::Display for UnitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
