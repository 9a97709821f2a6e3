//! Directory migration engine.
//!
//! A [`MigrationUnit`] describes one directory to relocate; a [`Migrator`] drives it
//! through copy, retirement and redirection. Progress is never persisted: the
//! current [`UnitState`] is read back from the filesystem on every call.

mod migrator;
mod state;
mod unit;

pub use migrator::{Migrator, Plan, Step};
pub use state::UnitState;
pub use unit::{MigrationUnit, BACKUP_SUFFIX, RETIRED_SUFFIX};
