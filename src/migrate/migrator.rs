//! The per-unit state machine.
//!
//! `apply()` detects the unit's state from the filesystem, plans the ordered
//! steps for that state and executes them. There is no rollback: a failed step
//! aborts, and the next run re-detects the state and resumes from the top.
//! Every step before retirement only adds data, so a retry is always safe.

use anyhow::Result;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::state::UnitState;
use super::unit::MigrationUnit;
use crate::errors::RelocateError;
use crate::fs_ops::{copy_tree, install_redirect, io_error_with_help, relative_path};
use crate::platform::create_symlink;

/// One filesystem mutation performed by a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Copy the pre-existing target aside, minus `no_copy`.
    Backup { from: PathBuf, to: PathBuf },
    /// Bulk copy of the source, minus `no_copy`.
    Copy { from: PathBuf, to: PathBuf },
    /// Move a subtree by rename (copy + delete across devices).
    MoveSubtree { from: PathBuf, to: PathBuf },
    /// Two-step retirement: rename the original aside.
    RetireAside { from: PathBuf, to: PathBuf },
    /// Recursive delete (single-step retirement, or cleanup).
    Delete(PathBuf),
    /// Create a directory and its parents.
    CreateDir(PathBuf),
    /// Symlink `link` -> `value`, where `value` is `target` relative to `link`'s parent.
    Redirect {
        link: PathBuf,
        target: PathBuf,
        value: PathBuf,
    },
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Backup { from, to } => write!(f, "back up {} -> {}", from.display(), to.display()),
            Step::Copy { from, to } => write!(f, "copy {} -> {}", from.display(), to.display()),
            Step::MoveSubtree { from, to } => {
                write!(f, "move {} -> {}", from.display(), to.display())
            }
            Step::RetireAside { from, to } => {
                write!(f, "rename {} -> {}", from.display(), to.display())
            }
            Step::Delete(p) => write!(f, "delete {}", p.display()),
            Step::CreateDir(p) => write!(f, "create directory {}", p.display()),
            Step::Redirect { link, value, .. } => {
                write!(f, "symlink {} -> {}", link.display(), value.display())
            }
        }
    }
}

/// What `apply()` would do right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub state: UnitState,
    pub steps: Vec<Step>,
    pub restart_needed: bool,
}

/// Drives one validated [`MigrationUnit`].
#[derive(Debug, Clone)]
pub struct Migrator {
    unit: MigrationUnit,
}

impl Migrator {
    /// Validate `unit` eagerly; nothing on disk is touched.
    pub fn new(unit: MigrationUnit) -> Result<Self, RelocateError> {
        unit.validate()?;
        Ok(Self { unit })
    }

    pub fn unit(&self) -> &MigrationUnit {
        &self.unit
    }

    pub fn state(&self) -> Result<UnitState> {
        UnitState::detect(&self.unit)
    }

    /// Plan the steps for the current state without touching the filesystem.
    pub fn plan(&self) -> Result<Plan> {
        let state = self.state()?;
        let steps = match state {
            UnitState::NotStarted => self.migration_steps(),
            UnitState::Missing => self.materialize_steps(),
            UnitState::CleanupPending => vec![Step::Delete(self.unit.retired_source())],
            UnitState::Migrated | UnitState::ExternallyMounted => Vec::new(),
        };
        Ok(Plan {
            state,
            steps,
            restart_needed: state == UnitState::NotStarted && self.unit.two_step,
        })
    }

    /// Run the unit once. Returns whether the host process must restart, which is
    /// only the case right after a first-time two-step migration.
    pub fn apply(&self) -> Result<bool> {
        let plan = self.plan()?;
        let unit = &self.unit;
        debug!(source = %unit.source.display(), state = %plan.state, steps = plan.steps.len(), "unit state detected");

        match plan.state {
            UnitState::Migrated => self.check_existing_link(),
            UnitState::ExternallyMounted => warn!(
                source = %unit.source.display(),
                "whole directory is provided by an external mount; leaving it untouched"
            ),
            UnitState::NotStarted => info!(
                source = %unit.source.display(),
                target = %unit.target.display(),
                two_step = unit.two_step,
                "migrating directory"
            ),
            UnitState::Missing => info!(
                source = %unit.source.display(),
                target = %unit.target.display(),
                "source missing; creating target and redirect"
            ),
            UnitState::CleanupPending => info!(
                retired = %unit.retired_source().display(),
                "cleaning up retired original"
            ),
        }

        for step in &plan.steps {
            self.execute(step)?;
        }
        Ok(plan.restart_needed)
    }

    fn migration_steps(&self) -> Vec<Step> {
        let unit = &self.unit;
        let mut steps = Vec::new();
        if unit.need_backup && unit.target.is_dir() {
            steps.push(Step::Backup {
                from: unit.target.clone(),
                to: unit.target_backup(),
            });
        }
        steps.push(Step::Copy {
            from: unit.source.clone(),
            to: unit.target.clone(),
        });
        for name in unit.effective_renames() {
            let from = unit.source.join(name);
            if from.is_dir() {
                steps.push(Step::MoveSubtree {
                    from,
                    to: unit.target.join(name),
                });
            }
        }
        if unit.two_step {
            steps.push(Step::RetireAside {
                from: unit.source.clone(),
                to: unit.retired_source(),
            });
        } else {
            steps.push(Step::Delete(unit.source.clone()));
        }
        steps.push(self.redirect_step());
        steps
    }

    fn materialize_steps(&self) -> Vec<Step> {
        let unit = &self.unit;
        let mut steps = vec![Step::CreateDir(unit.target.clone())];
        if let Some(parent) = unit.source.parent() {
            if !parent.is_dir() {
                steps.push(Step::CreateDir(parent.to_path_buf()));
            }
        }
        steps.push(self.redirect_step());
        steps
    }

    fn redirect_step(&self) -> Step {
        let unit = &self.unit;
        let base = unit.source.parent().unwrap_or(Path::new("/"));
        Step::Redirect {
            link: unit.source.clone(),
            target: unit.target.clone(),
            value: relative_path(&unit.target, base),
        }
    }

    fn execute(&self, step: &Step) -> Result<()> {
        match step {
            Step::Backup { from, to } | Step::Copy { from, to } => {
                let no_copy = self.unit.no_copy();
                info!(
                    src = %from.display(),
                    dest = %to.display(),
                    ignoring = ?no_copy,
                    "{}",
                    if matches!(step, Step::Backup { .. }) { "backing up target" } else { "copying" }
                );
                copy_tree(from, to, &no_copy)?;
            }
            Step::MoveSubtree { from, to } => {
                info!(src = %from.display(), dest = %to.display(), "moving subtree");
                move_subtree(from, to)?;
            }
            Step::RetireAside { from, to } => {
                info!(src = %from.display(), dest = %to.display(), "renaming original aside");
                if let Some(parent) = to.parent() {
                    fs::create_dir_all(parent)
                        .map_err(io_error_with_help("create directory", parent))?;
                }
                fs::rename(from, to).map_err(io_error_with_help("rename original aside", from))?;
            }
            Step::Delete(path) => {
                info!(path = %path.display(), "deleting");
                fs::remove_dir_all(path).map_err(io_error_with_help("remove directory", path))?;
            }
            Step::CreateDir(path) => {
                fs::create_dir_all(path).map_err(io_error_with_help("create directory", path))?;
            }
            Step::Redirect { link, target, .. } => {
                install_redirect(link, target)?;
            }
        }
        Ok(())
    }

    /// A link that does not lead to the configured target is reported, not repaired.
    fn check_existing_link(&self) {
        let unit = &self.unit;
        let Ok(value) = fs::read_link(&unit.source) else {
            return;
        };
        let base = unit.source.parent().unwrap_or(Path::new("/"));
        let resolved = crate::fs_ops::normalize(&base.join(&value));
        // symlinked ancestors may make lexically different paths the same directory
        let same = resolved == unit.target
            || matches!(
                (dunce::canonicalize(&unit.source), dunce::canonicalize(&unit.target)),
                (Ok(a), Ok(b)) if a == b
            );
        if !same {
            warn!(
                source = %unit.source.display(),
                link = %value.display(),
                target = %unit.target.display(),
                "source is a symlink that does not point at the configured target; leaving it as is"
            );
        } else {
            debug!(source = %unit.source.display(), "already migrated");
        }
    }
}

/// Rename `from` to `to`, falling back to copy + delete across filesystems.
/// An empty directory left at `to` by an interrupted run is replaced, and a link
/// already recreated at `to` only needs the original removed.
fn move_subtree(from: &Path, to: &Path) -> Result<()> {
    if is_same_link(from, to) {
        debug!(link = %to.display(), "symlink already moved; removing original");
        return fs::remove_file(from).map_err(io_error_with_help("remove moved symlink", from));
    }
    match fs::symlink_metadata(to) {
        Ok(meta) if meta.file_type().is_dir() => {
            let empty = fs::read_dir(to)
                .map_err(io_error_with_help("read directory", to))?
                .next()
                .is_none();
            // a non-empty one is left to the rename: refused on one filesystem,
            // merged into by the copy fallback across two
            if empty {
                fs::remove_dir(to).map_err(io_error_with_help("remove empty directory", to))?;
            }
        }
        Ok(_) => {
            return Err(RelocateError::RenameTargetOccupied {
                src: from.to_path_buf(),
                dest: to.to_path_buf(),
            }
            .into());
        }
        Err(_) => {}
    }
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).map_err(io_error_with_help("create directory", parent))?;
    }

    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device(&e) => {
            warn!(src = %from.display(), dest = %to.display(), "rename crosses filesystems; copying instead");
            copy_then_remove(from, to)
        }
        Err(e) if fs::symlink_metadata(to).is_ok() => {
            debug!(error = %e, dest = %to.display(), "rename refused by occupied destination");
            Err(RelocateError::RenameTargetOccupied {
                src: from.to_path_buf(),
                dest: to.to_path_buf(),
            }
            .into())
        }
        Err(e) => Err(io_error_with_help("rename subtree", from)(e)),
    }
}

/// Cross-device move. A symlink is recreated as the same link; a directory is
/// copied into a staging sibling and renamed into place, then the original is
/// removed. When `to` already holds a directory (a previous run died while
/// removing the original) the remaining entries are merged into it.
fn copy_then_remove(from: &Path, to: &Path) -> Result<()> {
    let staging = staging_path(to);
    remove_stale(&staging)?;

    let meta = fs::symlink_metadata(from).map_err(io_error_with_help("stat", from))?;
    if meta.file_type().is_symlink() {
        let value = fs::read_link(from).map_err(io_error_with_help("read symlink", from))?;
        if fs::symlink_metadata(to).is_ok() {
            return Err(RelocateError::RenameTargetOccupied {
                src: from.to_path_buf(),
                dest: to.to_path_buf(),
            }
            .into());
        }
        create_symlink(&value, &staging).map_err(io_error_with_help("create symlink", &staging))?;
        fs::rename(&staging, to).map_err(io_error_with_help("move symlink into place", to))?;
        fs::remove_file(from).map_err(io_error_with_help("remove moved symlink", from))?;
        debug!(link = %to.display(), value = %value.display(), "recreated symlinked subtree");
        return Ok(());
    }

    match fs::symlink_metadata(to) {
        Ok(m) if m.file_type().is_dir() => {
            info!(dest = %to.display(), "destination already populated; merging the rest");
            copy_tree(from, to, std::iter::empty::<&Path>())?;
        }
        Ok(_) => {
            return Err(RelocateError::RenameTargetOccupied {
                src: from.to_path_buf(),
                dest: to.to_path_buf(),
            }
            .into());
        }
        Err(_) => {
            copy_tree(from, &staging, std::iter::empty::<&Path>())?;
            fs::rename(&staging, to).map_err(io_error_with_help("move copied subtree into place", to))?;
        }
    }
    fs::remove_dir_all(from).map_err(io_error_with_help("remove moved subtree", from))?;
    Ok(())
}

fn is_same_link(from: &Path, to: &Path) -> bool {
    matches!((fs::read_link(from), fs::read_link(to)), (Ok(a), Ok(b)) if a == b)
}

/// `<parent>/.<name>.partial`, next to `to` so the final rename stays on one filesystem.
fn staging_path(to: &Path) -> PathBuf {
    let name = to.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    to.with_file_name(format!(".{name}.partial"))
}

fn remove_stale(path: &Path) -> Result<()> {
    match fs::symlink_metadata(path) {
        Ok(m) if m.file_type().is_dir() => {
            warn!(path = %path.display(), "removing incomplete copy from an interrupted run");
            fs::remove_dir_all(path).map_err(io_error_with_help("remove incomplete copy", path))?;
        }
        Ok(_) => fs::remove_file(path).map_err(io_error_with_help("remove incomplete copy", path))?,
        Err(_) => {}
    }
    Ok(())
}

fn is_cross_device(e: &io::Error) -> bool {
    if e.kind() == io::ErrorKind::CrossesDevices {
        return true;
    }
    #[cfg(unix)]
    {
        if e.raw_os_error() == Some(libc::EXDEV) {
            return true;
        }
    }
    #[cfg(windows)]
    {
        // ERROR_NOT_SAME_DEVICE
        if e.raw_os_error() == Some(17) {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn setup() -> (tempfile::TempDir, PathBuf, PathBuf) {
        let td = tempdir().unwrap();
        let root = dunce::canonicalize(td.path()).unwrap();
        let src = root.join("home/.config");
        let dst = root.join("state/.config");
        fs::create_dir_all(&src).unwrap();
        (td, src, dst)
    }

    #[test]
    fn new_rejects_invalid_unit_before_touching_disk() {
        let err = Migrator::new(MigrationUnit::new("relative", "/abs")).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn plan_orders_steps() {
        let (_td, src, dst) = setup();
        fs::create_dir_all(&dst).unwrap();
        fs::create_dir_all(src.join("Steam")).unwrap();
        let m = Migrator::new(MigrationUnit::new(&src, &dst).with_rename(["Steam", "absent"])).unwrap();

        let plan = m.plan().unwrap();
        assert_eq!(plan.state, UnitState::NotStarted);
        assert!(plan.restart_needed);
        let kinds: Vec<&str> = plan
            .steps
            .iter()
            .map(|s| match s {
                Step::Backup { .. } => "backup",
                Step::Copy { .. } => "copy",
                Step::MoveSubtree { .. } => "move",
                Step::RetireAside { .. } => "retire",
                Step::Delete(_) => "delete",
                Step::CreateDir(_) => "mkdir",
                Step::Redirect { .. } => "redirect",
            })
            .collect();
        assert_eq!(kinds, ["backup", "copy", "move", "retire", "redirect"]);
        // planning is read-only
        assert!(src.is_dir());
        assert!(!dst.with_extension("bak").exists());
    }

    #[test]
    fn plan_single_step_without_backup() {
        let (_td, src, dst) = setup();
        let m = Migrator::new(MigrationUnit::new(&src, &dst).two_step(false).need_backup(false))
            .unwrap();
        let plan = m.plan().unwrap();
        assert!(!plan.restart_needed);
        assert!(matches!(plan.steps.first(), Some(Step::Copy { .. })));
        assert!(matches!(plan.steps.get(1), Some(Step::Delete(p)) if *p == src));
        match plan.steps.last() {
            Some(Step::Redirect { value, .. }) => assert_eq!(value, Path::new("../state/.config")),
            other => panic!("unexpected last step: {other:?}"),
        }
    }

    #[test]
    fn move_subtree_replaces_empty_leftover() {
        let td = tempdir().unwrap();
        let from = td.path().join("a/Steam");
        let to = td.path().join("b/Steam");
        fs::create_dir_all(&from).unwrap();
        fs::write(from.join("game.bin"), b"g").unwrap();
        fs::create_dir_all(&to).unwrap();

        move_subtree(&from, &to).unwrap();
        assert!(!from.exists());
        assert_eq!(fs::read(to.join("game.bin")).unwrap(), b"g");
    }

    #[test]
    fn move_subtree_refuses_non_empty_destination() {
        let td = tempdir().unwrap();
        let from = td.path().join("a/Steam");
        let to = td.path().join("b/Steam");
        fs::create_dir_all(&from).unwrap();
        fs::create_dir_all(&to).unwrap();
        fs::write(to.join("keep"), b"k").unwrap();

        let err = move_subtree(&from, &to).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RelocateError>(),
            Some(RelocateError::RenameTargetOccupied { .. })
        ));
        assert!(from.exists());
    }

    #[cfg(unix)]
    #[test]
    fn copy_then_remove_keeps_symlinked_subtree_a_link() {
        use std::os::unix::fs::symlink;
        let td = tempdir().unwrap();
        let library = td.path().join("library");
        fs::create_dir_all(&library).unwrap();
        fs::write(library.join("game.bin"), b"g").unwrap();
        let from = td.path().join("home/Steam");
        let to = td.path().join("state/Steam");
        fs::create_dir_all(from.parent().unwrap()).unwrap();
        fs::create_dir_all(to.parent().unwrap()).unwrap();
        symlink(&library, &from).unwrap();

        copy_then_remove(&from, &to).unwrap();

        assert!(fs::symlink_metadata(&from).is_err());
        assert!(fs::symlink_metadata(&to).unwrap().file_type().is_symlink());
        assert_eq!(fs::read_link(&to).unwrap(), library);
        assert_eq!(fs::read(library.join("game.bin")).unwrap(), b"g");
        assert!(!staging_path(&to).exists());
    }

    #[cfg(unix)]
    #[test]
    fn move_subtree_finishes_interrupted_link_move() {
        use std::os::unix::fs::symlink;
        let td = tempdir().unwrap();
        let from = td.path().join("home/Steam");
        let to = td.path().join("state/Steam");
        fs::create_dir_all(from.parent().unwrap()).unwrap();
        fs::create_dir_all(to.parent().unwrap()).unwrap();
        symlink("/mnt/games", &from).unwrap();
        symlink("/mnt/games", &to).unwrap();

        move_subtree(&from, &to).unwrap();

        assert!(fs::symlink_metadata(&from).is_err());
        assert_eq!(fs::read_link(&to).unwrap(), Path::new("/mnt/games"));
    }

    #[test]
    fn copy_then_remove_moves_directory_through_staging() {
        let td = tempdir().unwrap();
        let from = td.path().join("home/Steam");
        let to = td.path().join("state/Steam");
        fs::create_dir_all(from.join("steamapps")).unwrap();
        fs::write(from.join("steamapps/a.bin"), b"a").unwrap();
        fs::create_dir_all(to.parent().unwrap()).unwrap();
        // leftover from a run that died mid-copy
        let staging = staging_path(&to);
        fs::create_dir_all(&staging).unwrap();
        fs::write(staging.join("half"), b"h").unwrap();

        copy_then_remove(&from, &to).unwrap();

        assert!(!from.exists());
        assert!(!staging.exists());
        assert_eq!(fs::read(to.join("steamapps/a.bin")).unwrap(), b"a");
        assert!(!to.join("half").exists());
    }

    #[test]
    fn copy_then_remove_converges_over_partial_destination() {
        let td = tempdir().unwrap();
        let from = td.path().join("home/Steam");
        let to = td.path().join("state/Steam");
        fs::create_dir_all(from.join("steamapps")).unwrap();
        fs::write(from.join("steamapps/a.bin"), b"a").unwrap();
        fs::write(from.join("steamapps/b.bin"), b"b").unwrap();
        fs::create_dir_all(to.join("steamapps")).unwrap();
        fs::write(to.join("steamapps/a.bin"), b"a").unwrap();

        copy_then_remove(&from, &to).unwrap();

        assert!(!from.exists());
        assert_eq!(fs::read(to.join("steamapps/a.bin")).unwrap(), b"a");
        assert_eq!(fs::read(to.join("steamapps/b.bin")).unwrap(), b"b");
    }

    #[test]
    fn copy_then_remove_refuses_file_in_the_way() {
        let td = tempdir().unwrap();
        let from = td.path().join("home/Steam");
        let to = td.path().join("state/Steam");
        fs::create_dir_all(&from).unwrap();
        fs::create_dir_all(to.parent().unwrap()).unwrap();
        fs::write(&to, b"not a directory").unwrap();

        let err = copy_then_remove(&from, &to).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RelocateError>(),
            Some(RelocateError::RenameTargetOccupied { .. })
        ));
        assert!(from.is_dir());
    }

    #[test]
    fn cross_device_detection() {
        assert!(is_cross_device(&io::Error::from(io::ErrorKind::CrossesDevices)));
        assert!(!is_cross_device(&io::Error::from(io::ErrorKind::NotFound)));
        #[cfg(unix)]
        assert!(is_cross_device(&io::Error::from_raw_os_error(libc::EXDEV)));
    }
}
