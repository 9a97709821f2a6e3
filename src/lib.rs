//! Core library for `xdg_relocate`.
//!
//! Relocates per-application XDG directories (config, data, cache) from where a
//! sandboxed application currently sees them into a private state directory,
//! leaving a relative symlink behind. Content the sandbox bind-mounts from the
//! host is never copied.
//!
//! The engine keeps no journal: each [`Migrator`] re-reads the filesystem to
//! decide what to do, so an interrupted run resumes on the next invocation.

pub mod cli;
pub mod config;
pub mod errors;
pub mod fs_ops;
pub mod migrate;
pub mod mounts;
pub mod output;
pub mod platform;
pub mod sandbox;
pub mod shutdown;

pub use config::{
    default_config_path, default_log_path, path_has_symlink_ancestor, Config, LogLevel,
    UnitOptions,
};
pub use errors::RelocateError;
pub use migrate::{MigrationUnit, Migrator, Plan, Step, UnitState};
pub use mounts::{host_mounts, Namespace};
pub use sandbox::SandboxInfo;

/// Convenient re-exports for library users.
pub mod prelude {
    pub use crate::config::{default_config_path, Config, LogLevel, UnitOptions};
    pub use crate::errors::RelocateError as Error;
    pub use crate::fs_ops::{copy_tree, CopyStats};
    pub use crate::migrate::{MigrationUnit, Migrator, Plan, Step, UnitState};
    pub use crate::mounts::{host_mounts, Namespace};
    pub use crate::sandbox::SandboxInfo;
    pub use crate::shutdown::request as request_shutdown;
    pub type XrResult<T> = anyhow::Result<T>;
}
