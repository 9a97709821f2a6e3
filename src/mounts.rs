//! Namespaces and the bind-mount exclusion resolver.
//!
//! The sandbox reports its filesystem grants as entries of the form
//! `<mount-root>[/<sub/path>][:<mode>]`. For the three XDG namespaces the mount
//! root is a symbolic name (`xdg-config`, `xdg-data`, `xdg-cache`); anything
//! granted under it is provided by the mount and must not be copied.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use crate::fs_ops::normalize;

/// One of the directory kinds managed by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Namespace {
    Config,
    Data,
    Cache,
}

impl Namespace {
    /// Processing order used by the app.
    pub const ALL: [Namespace; 3] = [Namespace::Config, Namespace::Data, Namespace::Cache];

    /// Symbolic mount root used in sandbox filesystem entries.
    pub fn mount_root(self) -> &'static str {
        match self {
            Namespace::Config => "xdg-config",
            Namespace::Data => "xdg-data",
            Namespace::Cache => "xdg-cache",
        }
    }

    /// Location of this namespace under the private state directory.
    pub fn state_subdir(self) -> &'static Path {
        Path::new(match self {
            Namespace::Config => ".config",
            Namespace::Data => ".local/share",
            Namespace::Cache => ".cache",
        })
    }

    /// Environment variable conventionally holding this directory.
    pub fn env_var(self) -> &'static str {
        match self {
            Namespace::Config => "XDG_CONFIG_HOME",
            Namespace::Data => "XDG_DATA_HOME",
            Namespace::Cache => "XDG_CACHE_HOME",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Namespace::Config => "config",
            Namespace::Data => "data",
            Namespace::Cache => "cache",
        })
    }
}

impl FromStr for Namespace {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "config" | "xdg-config" => Ok(Namespace::Config),
            "data" | "xdg-data" => Ok(Namespace::Data),
            "cache" | "xdg-cache" => Ok(Namespace::Cache),
            _ => Err(format!("invalid namespace: '{s}' (expected config, data or cache)")),
        }
    }
}

/// Strip a trailing `:<mode>` (word characters only) from a filesystem entry.
fn entry_path(entry: &str) -> &str {
    match entry.rsplit_once(':') {
        Some((path, mode))
            if !mode.is_empty() && mode.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') =>
        {
            path
        }
        _ => entry,
    }
}

/// Relative subpaths of `namespace` that the sandbox mounts from the host.
///
/// An empty path in the result means the whole namespace directory is mounted.
pub fn host_mounts<I, S>(filesystems: I, namespace: Namespace) -> BTreeSet<PathBuf>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let root = namespace.mount_root();
    let mut dirs = BTreeSet::new();
    for entry in filesystems {
        let entry = entry.as_ref().trim();
        if entry.is_empty() {
            continue;
        }
        let normalized = normalize(Path::new(entry_path(entry)));
        let mut comps = normalized.components();
        match comps.next() {
            Some(Component::Normal(first)) if first == root => {
                dirs.insert(comps.as_path().to_path_buf());
            }
            _ => {}
        }
    }
    dirs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> BTreeSet<PathBuf> {
        items.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn picks_entries_under_namespace() {
        let fs = [
            "xdg-config/MangoHud:ro",
            "xdg-config/gtk-3.0",
            "xdg-data/Steam",
            "xdg-music:ro",
            "~/Games",
        ];
        assert_eq!(host_mounts(fs, Namespace::Config), set(&["MangoHud", "gtk-3.0"]));
        assert_eq!(host_mounts(fs, Namespace::Data), set(&["Steam"]));
        assert!(host_mounts(fs, Namespace::Cache).is_empty());
    }

    #[test]
    fn nested_and_unnormalized_entries() {
        let fs = ["xdg-data/a/./b/", "xdg-config/../xdg-data/c:create"];
        assert_eq!(host_mounts(fs, Namespace::Data), set(&["a/b", "c"]));
    }

    #[test]
    fn whole_namespace_yields_empty_path() {
        let got = host_mounts(["xdg-cache:rw"], Namespace::Cache);
        assert_eq!(got.len(), 1);
        assert!(got.iter().next().unwrap().as_os_str().is_empty());
    }

    #[test]
    fn colon_inside_path_is_kept_without_mode() {
        let got = host_mounts(["xdg-data/odd:name/x"], Namespace::Data);
        assert_eq!(got, set(&["odd:name/x"]));
    }

    #[test]
    fn prefix_of_root_is_not_a_match() {
        assert!(host_mounts(["xdg-configs/foo", "other/xdg-config"], Namespace::Config).is_empty());
    }

    #[test]
    fn namespace_parse_and_display() {
        for ns in Namespace::ALL {
            assert_eq!(ns.to_string().parse::<Namespace>().unwrap(), ns);
        }
        assert_eq!("xdg-data".parse::<Namespace>().unwrap(), Namespace::Data);
        assert!("music".parse::<Namespace>().is_err());
    }
}
