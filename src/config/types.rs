//! Core configuration types.
//! - Config holds runtime settings with defaults matching a stock sandbox layout.
//! - UnitOptions carries the per-namespace migration knobs.
//! - LogLevel represents verbosity with simple parsing helpers.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::mounts::Namespace;
use crate::sandbox::DEFAULT_SANDBOX_INFO;

/// Program-defined verbosity levels exposed to users/config.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Only errors
    Quiet,
    /// Informational output (default)
    #[default]
    Normal,
    /// More info (like verbose)
    Info,
    /// Debug/trace
    Debug,
}

impl LogLevel {
    /// Parse common string names into our LogLevel (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "quiet" | "error" | "none" => Some(LogLevel::Quiet),
            "normal" => Some(LogLevel::Normal),
            "info" | "verbose" | "detailed" => Some(LogLevel::Info),
            "debug" | "trace" => Some(LogLevel::Debug),
            _ => None,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Quiet => "quiet",
            LogLevel::Normal => "normal",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        };
        f.write_str(s)
    }
}

impl FromStr for LogLevel {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("invalid log level: '{s}'"))
    }
}

/// How one namespace is migrated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitOptions {
    pub two_step: bool,
    pub backup: bool,
    /// Subdirectories moved by rename (large trees).
    pub rename: Vec<PathBuf>,
    /// Extra exclusion patterns on top of the sandbox mounts.
    pub ignore: Vec<PathBuf>,
}

impl UnitOptions {
    /// Stock settings for `namespace`: data moves `Steam` by rename, cache is not backed up.
    pub fn defaults_for(namespace: Namespace) -> Self {
        let mut opts = UnitOptions {
            two_step: true,
            backup: true,
            rename: Vec::new(),
            ignore: Vec::new(),
        };
        match namespace {
            Namespace::Config => {}
            Namespace::Data => opts.rename.push(PathBuf::from("Steam")),
            Namespace::Cache => opts.backup = false,
        }
        opts
    }
}

/// Runtime configuration for one invocation.
#[derive(Debug, Clone)]
pub struct Config {
    /// Private storage root; targets live underneath it.
    pub state_dir: Option<PathBuf>,
    /// Current `$XDG_CONFIG_HOME` (the config unit's source).
    pub config_home: Option<PathBuf>,
    /// Current `$XDG_DATA_HOME`.
    pub data_home: Option<PathBuf>,
    /// Current `$XDG_CACHE_HOME`.
    pub cache_home: Option<PathBuf>,
    /// Sandbox metadata key file.
    pub sandbox_info: PathBuf,
    /// Fail when `sandbox_info` is missing instead of assuming no mounts.
    pub sandbox_info_required: bool,
    /// Filesystem grants added on the command line.
    pub extra_filesystems: Vec<String>,
    /// Restrict the run to these namespaces (empty = all).
    pub only: Vec<Namespace>,
    /// Console verbosity
    pub log_level: LogLevel,
    /// Optional path to a log file
    pub log_file: Option<PathBuf>,
    /// If true, print the plan but do not modify the filesystem
    pub dry_run: bool,
    pub config: UnitOptions,
    pub data: UnitOptions,
    pub cache: UnitOptions,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            state_dir: None,
            config_home: None,
            data_home: None,
            cache_home: None,
            sandbox_info: PathBuf::from(DEFAULT_SANDBOX_INFO),
            sandbox_info_required: false,
            extra_filesystems: Vec::new(),
            only: Vec::new(),
            log_level: LogLevel::Normal,
            log_file: None,
            dry_run: false,
            config: UnitOptions::defaults_for(Namespace::Config),
            data: UnitOptions::defaults_for(Namespace::Data),
            cache: UnitOptions::defaults_for(Namespace::Cache),
        }
    }
}

impl Config {
    /// Construct a Config with an explicit state directory; other fields use defaults.
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            state_dir: Some(state_dir.into()),
            ..Default::default()
        }
    }

    pub fn options(&self, namespace: Namespace) -> &UnitOptions {
        match namespace {
            Namespace::Config => &self.config,
            Namespace::Data => &self.data,
            Namespace::Cache => &self.cache,
        }
    }

    pub fn options_mut(&mut self, namespace: Namespace) -> &mut UnitOptions {
        match namespace {
            Namespace::Config => &mut self.config,
            Namespace::Data => &mut self.data,
            Namespace::Cache => &mut self.cache,
        }
    }

    /// Source directory of `namespace`, if known.
    pub fn home(&self, namespace: Namespace) -> Option<&Path> {
        match namespace {
            Namespace::Config => self.config_home.as_deref(),
            Namespace::Data => self.data_home.as_deref(),
            Namespace::Cache => self.cache_home.as_deref(),
        }
    }

    pub fn set_home(&mut self, namespace: Namespace, path: impl Into<PathBuf>) {
        let path = Some(path.into());
        match namespace {
            Namespace::Config => self.config_home = path,
            Namespace::Data => self.data_home = path,
            Namespace::Cache => self.cache_home = path,
        }
    }

    /// Namespaces selected for this run, in processing order.
    pub fn selected(&self) -> Vec<Namespace> {
        Namespace::ALL
            .into_iter()
            .filter(|ns| self.only.is_empty() || self.only.contains(ns))
            .collect()
    }

    /// `<state_dir>/<namespace subdir>`
    pub fn target(&self, namespace: Namespace) -> Option<PathBuf> {
        self.state_dir
            .as_ref()
            .map(|s| s.join(namespace.state_subdir()))
    }
}
