//! Migration unit configuration: what to relocate, where, and how.

use std::collections::BTreeSet;
use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

use crate::errors::RelocateError;
use crate::fs_ops::normalize;

/// Suffix of the backup copy of a pre-existing target.
pub const BACKUP_SUFFIX: &str = ".bak";
/// Suffix of the original directory once renamed aside in two-step mode.
pub const RETIRED_SUFFIX: &str = ".old";

/// Configuration for relocating one directory.
///
/// Built fresh on every run; the filesystem layout is the only record of progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationUnit {
    /// Directory as currently exposed to the application.
    pub source: PathBuf,
    /// Private storage location.
    pub target: PathBuf,
    /// Relative patterns under `source` that are never copied (bind-mounted content).
    pub ignore: BTreeSet<PathBuf>,
    /// Relative subtrees moved by rename instead of copied.
    pub rename: Vec<PathBuf>,
    /// Rename the original aside and delete it on a later run instead of deleting it now.
    pub two_step: bool,
    /// Copy a pre-existing target to `<target>.bak` before overwriting it.
    pub need_backup: bool,
}

impl MigrationUnit {
    /// Unit with no exclusions, two-step retirement and backup enabled.
    /// Paths are normalized lexically (`.`/`..` folded, trailing `/` dropped).
    pub fn new(source: impl AsRef<Path>, target: impl AsRef<Path>) -> Self {
        Self {
            source: normalize(source.as_ref()),
            target: normalize(target.as_ref()),
            ignore: BTreeSet::new(),
            rename: Vec::new(),
            two_step: true,
            need_backup: true,
        }
    }

    pub fn with_ignore<I, P>(mut self, ignore: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.ignore.extend(ignore.into_iter().map(Into::into));
        self
    }

    pub fn with_rename<I, P>(mut self, rename: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        for p in rename {
            let p = p.into();
            if !self.rename.contains(&p) {
                self.rename.push(p);
            }
        }
        self
    }

    pub fn two_step(mut self, two_step: bool) -> Self {
        self.two_step = two_step;
        self
    }

    pub fn need_backup(mut self, need_backup: bool) -> Self {
        self.need_backup = need_backup;
        self
    }

    /// `<target>.bak`
    pub fn target_backup(&self) -> PathBuf {
        with_suffix(&self.target, BACKUP_SUFFIX)
    }

    /// `<source>.old`
    pub fn retired_source(&self) -> PathBuf {
        with_suffix(&self.source, RETIRED_SUFFIX)
    }

    /// Everything excluded from the bulk copy: `ignore ∪ rename`.
    pub fn no_copy(&self) -> BTreeSet<PathBuf> {
        self.ignore.iter().chain(&self.rename).cloned().collect()
    }

    /// Rename entries that are not also ignored, in configured order.
    pub fn effective_renames(&self) -> impl Iterator<Item = &PathBuf> {
        self.rename.iter().filter(|r| !self.ignore.contains(*r))
    }

    /// True when the ignore set covers the source root itself, i.e. the whole
    /// directory is provided by an external mount and must be left alone.
    pub fn covers_whole_tree(&self) -> bool {
        self.ignore
            .iter()
            .any(|p| p.components().all(|c| matches!(c, Component::CurDir)))
    }

    /// Reject configurations that could escape the tree or loop on themselves.
    /// Runs before any filesystem access.
    pub fn validate(&self) -> Result<(), RelocateError> {
        if !self.source.is_absolute() {
            return Err(RelocateError::NotAbsolute {
                field: "source",
                path: self.source.clone(),
            });
        }
        if !self.target.is_absolute() {
            return Err(RelocateError::NotAbsolute {
                field: "target",
                path: self.target.clone(),
            });
        }
        if self.source == self.target {
            return Err(RelocateError::SameSourceAndTarget(self.source.clone()));
        }
        if self.source.starts_with(&self.target) || self.target.starts_with(&self.source) {
            return Err(RelocateError::NestedPaths {
                source_dir: self.source.clone(),
                target_dir: self.target.clone(),
            });
        }
        for p in &self.ignore {
            check_relative("ignore", p)?;
        }
        for p in &self.rename {
            check_relative("rename", p)?;
            if p.components().all(|c| matches!(c, Component::CurDir)) {
                return Err(RelocateError::InvalidPattern {
                    field: "rename",
                    pattern: p.clone(),
                    reason: "must name a subdirectory",
                });
            }
        }
        Ok(())
    }
}

fn check_relative(field: &'static str, p: &Path) -> Result<(), RelocateError> {
    for comp in p.components() {
        let reason = match comp {
            Component::RootDir | Component::Prefix(_) => "must be a relative path",
            Component::ParentDir => "must not contain '..'",
            _ => continue,
        };
        return Err(RelocateError::InvalidPattern {
            field,
            pattern: p.to_path_buf(),
            reason,
        });
    }
    Ok(())
}

fn with_suffix(p: &Path, suffix: &str) -> PathBuf {
    let mut s = OsString::from(p.as_os_str());
    s.push(suffix);
    PathBuf::from(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_paths() {
        let unit = MigrationUnit::new("/home/u/.config/", "/state/.config");
        assert_eq!(unit.source, PathBuf::from("/home/u/.config"));
        assert_eq!(unit.retired_source(), PathBuf::from("/home/u/.config.old"));
        assert_eq!(unit.target_backup(), PathBuf::from("/state/.config.bak"));
    }

    #[test]
    fn defaults_match_config_namespace() {
        let unit = MigrationUnit::new("/a", "/b");
        assert!(unit.two_step);
        assert!(unit.need_backup);
        assert!(unit.ignore.is_empty());
        assert!(unit.rename.is_empty());
    }

    #[test]
    fn no_copy_is_union() {
        let unit = MigrationUnit::new("/a", "/b")
            .with_ignore(["x", "y"])
            .with_rename(["y", "Steam"]);
        let expected: BTreeSet<PathBuf> = ["x", "y", "Steam"].iter().map(PathBuf::from).collect();
        assert_eq!(unit.no_copy(), expected);
        let renames: Vec<_> = unit.effective_renames().cloned().collect();
        assert_eq!(renames, vec![PathBuf::from("Steam")]);
    }

    #[test]
    fn rejects_relative_source_and_target() {
        let err = MigrationUnit::new("rel/src", "/b").validate().unwrap_err();
        assert!(matches!(err, RelocateError::NotAbsolute { field: "source", .. }));
        let err = MigrationUnit::new("/a", "b").validate().unwrap_err();
        assert!(matches!(err, RelocateError::NotAbsolute { field: "target", .. }));
        assert!(err.is_configuration());
    }

    #[test]
    fn rejects_escaping_patterns() {
        let err = MigrationUnit::new("/a", "/b")
            .with_ignore(["/etc"])
            .validate()
            .unwrap_err();
        assert!(matches!(err, RelocateError::InvalidPattern { field: "ignore", .. }));

        let err = MigrationUnit::new("/a", "/b")
            .with_rename(["../up"])
            .validate()
            .unwrap_err();
        assert!(matches!(err, RelocateError::InvalidPattern { field: "rename", .. }));

        let err = MigrationUnit::new("/a", "/b")
            .with_rename([""])
            .validate()
            .unwrap_err();
        assert!(matches!(err, RelocateError::InvalidPattern { field: "rename", .. }));
    }

    #[test]
    fn rejects_same_or_nested_paths() {
        assert!(matches!(
            MigrationUnit::new("/a", "/a/").validate(),
            Err(RelocateError::SameSourceAndTarget(_))
        ));
        assert!(matches!(
            MigrationUnit::new("/a", "/a/inner").validate(),
            Err(RelocateError::NestedPaths { .. })
        ));
        assert!(matches!(
            MigrationUnit::new("/a/inner", "/a").validate(),
            Err(RelocateError::NestedPaths { .. })
        ));
        // sibling with a shared name prefix is fine
        assert!(MigrationUnit::new("/a", "/ab").validate().is_ok());
    }

    #[test]
    fn whole_tree_exclusion_detected() {
        assert!(MigrationUnit::new("/a", "/b").with_ignore([""]).covers_whole_tree());
        assert!(MigrationUnit::new("/a", "/b").with_ignore(["."]).covers_whole_tree());
        assert!(!MigrationUnit::new("/a", "/b").with_ignore(["x"]).covers_whole_tree());
        assert!(MigrationUnit::new("/a", "/b").with_ignore([""]).validate().is_ok());
    }
}
