//! End-to-end behaviour of the migration engine on real temporary trees.

use std::fs;
use std::path::{Path, PathBuf};

use assert_fs::prelude::*;
use assert_fs::TempDir;
use tempfile::tempdir;

use xdg_relocate::prelude::*;

/// Canonical temp root so symlink assertions are not confused by /tmp links.
fn root(td: &Path) -> PathBuf {
    dunce::canonicalize(td).expect("canonicalize tempdir")
}

fn write(path: &Path, contents: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

#[cfg(unix)]
#[test]
fn worked_example_two_step_then_cleanup() {
    let td = tempdir().unwrap();
    let base = root(td.path());
    let src = base.join("home/.config");
    let dst = base.join("state/.config");
    write(&src.join("app1/a.txt"), "a");
    write(&src.join("mountedapp/b.txt"), "b");

    let unit = MigrationUnit::new(&src, &dst).with_ignore(["mountedapp"]);
    let m = Migrator::new(unit).unwrap();
    assert_eq!(m.state().unwrap(), UnitState::NotStarted);

    // first run: copy, retire aside, redirect, ask for a restart
    assert!(m.apply().unwrap());
    assert_eq!(fs::read_to_string(dst.join("app1/a.txt")).unwrap(), "a");
    assert!(!dst.join("mountedapp").exists());
    let old = base.join("home/.config.old");
    assert_eq!(fs::read_to_string(old.join("mountedapp/b.txt")).unwrap(), "b");
    assert_eq!(fs::read_link(&src).unwrap(), PathBuf::from("../state/.config"));
    assert_eq!(fs::canonicalize(&src).unwrap(), dst);
    assert_eq!(m.state().unwrap(), UnitState::CleanupPending);

    // second run: delete the retired original, no restart
    assert!(!m.apply().unwrap());
    assert!(!old.exists());
    assert_eq!(m.state().unwrap(), UnitState::Migrated);

    // third run: nothing to do
    assert!(!m.apply().unwrap());
    assert_eq!(fs::read_to_string(src.join("app1/a.txt")).unwrap(), "a");
}

#[cfg(unix)]
#[test]
fn single_step_deletes_source_and_needs_no_restart() {
    let temp = TempDir::new().unwrap();
    temp.child("home/cache/thumbs/x.png").write_str("img").unwrap();
    let base = root(temp.path());
    let src = base.join("home/cache");
    let dst = base.join("state/.cache");

    let m = Migrator::new(MigrationUnit::new(&src, &dst).two_step(false).need_backup(false))
        .unwrap();
    assert!(!m.apply().unwrap());

    assert!(fs::symlink_metadata(&src).unwrap().file_type().is_symlink());
    assert!(!base.join("home/cache.old").exists());
    assert_eq!(fs::read_to_string(dst.join("thumbs/x.png")).unwrap(), "img");
    assert_eq!(m.state().unwrap(), UnitState::Migrated);
}

#[cfg(unix)]
#[test]
fn existing_target_is_backed_up_without_ignored_content() {
    let td = tempdir().unwrap();
    let base = root(td.path());
    let src = base.join("home/.config");
    let dst = base.join("state/.config");
    write(&src.join("app/settings.ini"), "new");
    write(&dst.join("app/settings.ini"), "old");
    write(&dst.join("keep.txt"), "keep");
    write(&dst.join("mounted/secret"), "host");

    let m = Migrator::new(MigrationUnit::new(&src, &dst).with_ignore(["mounted"])).unwrap();
    m.apply().unwrap();

    let bak = base.join("state/.config.bak");
    assert_eq!(fs::read_to_string(bak.join("app/settings.ini")).unwrap(), "old");
    assert_eq!(fs::read_to_string(bak.join("keep.txt")).unwrap(), "keep");
    assert!(!bak.join("mounted").exists());
    // source wins over the old target, unrelated target files survive
    assert_eq!(fs::read_to_string(dst.join("app/settings.ini")).unwrap(), "new");
    assert_eq!(fs::read_to_string(dst.join("keep.txt")).unwrap(), "keep");
    assert_eq!(fs::read_to_string(dst.join("mounted/secret")).unwrap(), "host");
}

#[cfg(unix)]
#[test]
fn no_backup_when_disabled() {
    let td = tempdir().unwrap();
    let base = root(td.path());
    let src = base.join("home/.cache");
    let dst = base.join("state/.cache");
    write(&src.join("c"), "c");
    write(&dst.join("d"), "d");

    Migrator::new(MigrationUnit::new(&src, &dst).need_backup(false))
        .unwrap()
        .apply()
        .unwrap();
    assert!(!base.join("state/.cache.bak").exists());
}

#[cfg(unix)]
#[test]
fn renamed_subtree_is_moved_not_copied() {
    let td = tempdir().unwrap();
    let base = root(td.path());
    let src = base.join("home/.local/share");
    let dst = base.join("state/.local/share");
    write(&src.join("Steam/steamapps/game.bin"), "big");
    write(&src.join("other/file"), "o");

    let m = Migrator::new(
        MigrationUnit::new(&src, &dst)
            .with_rename(["Steam", "NotThere"])
            .two_step(false),
    )
    .unwrap();
    assert!(!m.apply().unwrap());

    assert_eq!(fs::read_to_string(dst.join("Steam/steamapps/game.bin")).unwrap(), "big");
    assert_eq!(fs::read_to_string(dst.join("other/file")).unwrap(), "o");
    assert!(!dst.join("NotThere").exists());
}

#[cfg(unix)]
#[test]
fn rename_entry_that_is_also_ignored_stays_behind() {
    let td = tempdir().unwrap();
    let base = root(td.path());
    let src = base.join("home/data");
    let dst = base.join("state/data");
    write(&src.join("Steam/x"), "x");

    let m = Migrator::new(
        MigrationUnit::new(&src, &dst)
            .with_rename(["Steam"])
            .with_ignore(["Steam"]),
    )
    .unwrap();
    m.apply().unwrap();
    assert!(!dst.join("Steam").exists());
    assert!(base.join("home/data.old/Steam/x").exists());
}

#[cfg(unix)]
#[test]
fn glob_patterns_exclude_at_matching_depth() {
    let td = tempdir().unwrap();
    let base = root(td.path());
    let src = base.join("home/.config");
    let dst = base.join("state/.config");
    write(&src.join("gtk-3.0/settings.ini"), "1");
    write(&src.join("gtk-4.0/settings.ini"), "2");
    write(&src.join("pulse/cookie"), "3");
    write(&src.join("pulse/client.conf"), "4");

    let unit = MigrationUnit::new(&src, &dst)
        .with_ignore(["gtk-?.0", "pulse/*.conf"])
        .two_step(false);
    Migrator::new(unit).unwrap().apply().unwrap();

    assert!(!dst.join("gtk-3.0").exists());
    assert!(!dst.join("gtk-4.0").exists());
    assert!(dst.join("pulse/cookie").exists());
    assert!(!dst.join("pulse/client.conf").exists());
}

#[cfg(unix)]
#[test]
fn missing_source_gets_fresh_target_and_redirect() {
    let td = tempdir().unwrap();
    let base = root(td.path());
    let src = base.join("home/new/.config");
    let dst = base.join("state/.config");

    let m = Migrator::new(MigrationUnit::new(&src, &dst)).unwrap();
    assert_eq!(m.state().unwrap(), UnitState::Missing);
    assert!(!m.apply().unwrap());

    assert!(dst.is_dir());
    assert_eq!(fs::canonicalize(&src).unwrap(), dst);
    assert_eq!(m.state().unwrap(), UnitState::Migrated);
}

#[test]
fn whole_tree_mount_is_left_alone() {
    let td = tempdir().unwrap();
    let base = root(td.path());
    let src = base.join("home/.cache");
    let dst = base.join("state/.cache");
    write(&src.join("f"), "f");

    let mounts = host_mounts(["xdg-cache"], Namespace::Cache);
    let m = Migrator::new(MigrationUnit::new(&src, &dst).with_ignore(mounts)).unwrap();
    assert_eq!(m.state().unwrap(), UnitState::ExternallyMounted);
    assert!(m.plan().unwrap().steps.is_empty());
    assert!(!m.apply().unwrap());

    assert!(src.join("f").is_file());
    assert!(!dst.exists());
}

#[test]
fn configuration_errors_happen_before_any_mutation() {
    let td = tempdir().unwrap();
    let base = root(td.path());
    let src = base.join("src");
    write(&src.join("f"), "f");

    let cases = [
        MigrationUnit::new(&src, "relative/target"),
        MigrationUnit::new(&src, &src),
        MigrationUnit::new(&src, src.join("inner")),
        MigrationUnit::new(&src, base.join("dst")).with_ignore(["../escape"]),
        MigrationUnit::new(&src, base.join("dst")).with_rename(["/abs"]),
    ];
    for unit in cases {
        let err = Migrator::new(unit.clone()).unwrap_err();
        assert!(err.is_configuration(), "{unit:?} -> {err}");
    }
    assert!(src.join("f").is_file());
    assert!(!base.join("dst").exists());
    assert!(!base.join("src.old").exists());
}

#[test]
fn regular_file_source_is_rejected() {
    let td = tempdir().unwrap();
    let base = root(td.path());
    let src = base.join("file");
    write(&src, "x");

    let m = Migrator::new(MigrationUnit::new(&src, base.join("dst"))).unwrap();
    let err = m.apply().unwrap_err();
    assert!(matches!(
        err.downcast_ref::<Error>(),
        Some(Error::SourceNotDirectory(_))
    ));
}

#[cfg(unix)]
#[test]
fn blocked_retirement_fails_after_copy() {
    let td = tempdir().unwrap();
    let base = root(td.path());
    let src = base.join("home/.config");
    let dst = base.join("state/.config");
    write(&src.join("a"), "a");

    let m = Migrator::new(MigrationUnit::new(&src, &dst)).unwrap();
    // the copy lands, then retirement fails because `.old` is a file
    write(&base.join("home/.config.old"), "in the way");
    assert!(m.apply().is_err());
    assert!(src.is_dir());
    assert_eq!(fs::read_to_string(dst.join("a")).unwrap(), "a");
}

#[cfg(unix)]
#[test]
fn interrupted_after_retire_resumes() {
    let td = tempdir().unwrap();
    let base = root(td.path());
    let src = base.join("home/.config");
    let dst = base.join("state/.config");
    write(&dst.join("a"), "a");
    write(&base.join("home/.config.old/a"), "a");

    // retired, but the redirect was never installed
    let m = Migrator::new(MigrationUnit::new(&src, &dst)).unwrap();
    assert_eq!(m.state().unwrap(), UnitState::Missing);
    assert!(!m.apply().unwrap());
    assert_eq!(m.state().unwrap(), UnitState::CleanupPending);
    assert!(!m.apply().unwrap());
    assert!(!base.join("home/.config.old").exists());
    assert_eq!(fs::read_to_string(src.join("a")).unwrap(), "a");
}

#[cfg(unix)]
#[test]
fn foreign_symlink_is_reported_not_repaired() {
    let td = tempdir().unwrap();
    let base = root(td.path());
    let elsewhere = base.join("elsewhere");
    fs::create_dir_all(&elsewhere).unwrap();
    fs::create_dir_all(base.join("home")).unwrap();
    let src = base.join("home/.config");
    std::os::unix::fs::symlink(&elsewhere, &src).unwrap();

    let m = Migrator::new(MigrationUnit::new(&src, base.join("state/.config"))).unwrap();
    assert_eq!(m.state().unwrap(), UnitState::Migrated);
    assert!(!m.apply().unwrap());
    assert_eq!(fs::read_link(&src).unwrap(), elsewhere);
}

#[cfg(unix)]
#[test]
fn dry_run_plan_matches_what_apply_does() {
    let td = tempdir().unwrap();
    let base = root(td.path());
    let src = base.join("home/.config");
    let dst = base.join("state/.config");
    write(&src.join("a"), "a");

    let m = Migrator::new(MigrationUnit::new(&src, &dst)).unwrap();
    let plan = m.plan().unwrap();
    assert!(plan.restart_needed);
    assert!(plan.steps.iter().any(|s| matches!(s, Step::RetireAside { .. })));
    let rendered: Vec<String> = plan.steps.iter().map(ToString::to_string).collect();
    assert!(rendered.last().unwrap().contains("../state/.config"), "{rendered:?}");
    // nothing happened yet
    assert!(src.is_dir() && !dst.exists());

    assert_eq!(m.apply().unwrap(), plan.restart_needed);
}
