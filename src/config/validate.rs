//! Config validation and unit construction.
//! Runs before anything on disk is touched; path-level checks per unit are
//! delegated to `MigrationUnit::validate`.

use tracing::{debug, warn};

use super::types::Config;
use crate::errors::RelocateError;
use crate::migrate::MigrationUnit;
use crate::mounts::{host_mounts, Namespace};
use crate::sandbox::SandboxInfo;

impl Config {
    /// Check the settings every unit depends on.
    pub fn validate(&self) -> Result<(), RelocateError> {
        let state_dir = self.state_dir.as_ref().ok_or(RelocateError::StateDirMissing)?;
        if !state_dir.is_absolute() {
            return Err(RelocateError::NotAbsolute {
                field: "state_dir",
                path: state_dir.clone(),
            });
        }
        for ns in Namespace::ALL {
            if let Some(home) = self.home(ns)
                && !home.is_absolute()
            {
                return Err(RelocateError::NotAbsolute {
                    field: ns.env_var(),
                    path: home.to_path_buf(),
                });
            }
        }
        Ok(())
    }

    /// Build and validate one unit per selected namespace. Namespaces without a
    /// known source directory are skipped with a warning.
    pub fn build_units(
        &self,
        sandbox: &SandboxInfo,
    ) -> Result<Vec<(Namespace, MigrationUnit)>, RelocateError> {
        self.validate()?;
        let mut units = Vec::new();
        for ns in self.selected() {
            let Some(source) = self.home(ns) else {
                warn!(namespace = %ns, var = ns.env_var(), "no source directory known; skipping");
                continue;
            };
            let Some(target) = self.target(ns) else {
                return Err(RelocateError::StateDirMissing);
            };
            let opts = self.options(ns);
            let mounts = host_mounts(&sandbox.filesystems, ns);
            debug!(namespace = %ns, mounts = ?mounts, "host mounts");
            let unit = MigrationUnit::new(source, target)
                .with_ignore(mounts)
                .with_ignore(opts.ignore.iter().cloned())
                .with_rename(opts.rename.iter().cloned())
                .two_step(opts.two_step)
                .need_backup(opts.backup);
            unit.validate()?;
            units.push((ns, unit));
        }
        Ok(units)
    }
}
