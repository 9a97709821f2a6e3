//! CLI definition and parsing.
//! Defines Args and how they layer over the loaded Config.
//!
//! Notes:
//! - Source directories fall back to the XDG_*_HOME variables of the calling process.
//! - Without a state directory, `$FLATPAK_ID` selects `~/.var/app/<id>`.
//! - --debug is a shorthand for --log-level debug.

use clap::{Parser, ValueHint};
use std::path::PathBuf;

use crate::config::types::{Config, LogLevel};
use crate::mounts::Namespace;

/// Relocate XDG directories into private app storage.
/// CLI flags override config values (which are loaded from XML if present).
#[derive(Parser, Debug, Clone, Default)]
#[command(
    author,
    version,
    about = "Relocate XDG config/data/cache into private app storage and leave symlinks behind"
)]
pub struct Args {
    /// Private storage root; targets are <STATE_DIR>/.config, .local/share and .cache.
    #[arg(long, value_hint = ValueHint::DirPath)]
    pub state_dir: Option<PathBuf>,

    /// Application id used to derive the state directory (~/.var/app/<ID>) when none is configured.
    #[arg(long, env = "FLATPAK_ID", value_name = "ID")]
    pub app_id: Option<String>,

    /// Config directory to relocate.
    #[arg(long, env = "XDG_CONFIG_HOME", value_hint = ValueHint::DirPath)]
    pub config_home: Option<PathBuf>,

    /// Data directory to relocate.
    #[arg(long, env = "XDG_DATA_HOME", value_hint = ValueHint::DirPath)]
    pub data_home: Option<PathBuf>,

    /// Cache directory to relocate.
    #[arg(long, env = "XDG_CACHE_HOME", value_hint = ValueHint::DirPath)]
    pub cache_home: Option<PathBuf>,

    /// Sandbox metadata key file (default /.flatpak-info; an explicit path must exist).
    #[arg(long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub sandbox_info: Option<PathBuf>,

    /// Extra filesystem grant, e.g. `xdg-config/MangoHud:ro` (repeatable).
    #[arg(long = "filesystem", value_name = "ENTRY")]
    pub filesystems: Vec<String>,

    /// Only process these namespaces: config, data, cache (repeatable).
    #[arg(long, value_name = "NAMESPACE")]
    pub only: Vec<Namespace>,

    /// Enable debug logging (equivalent to `--log-level debug`).
    #[arg(
        short = 'd',
        long,
        help = "Enable debug logging (shorthand for --log-level debug)"
    )]
    pub debug: bool,

    /// Set log level. One of: quiet, normal, info, debug.
    #[arg(long, help = "Set log level: quiet, normal, info, debug")]
    pub log_level: Option<LogLevel>,

    /// Write logs to this file as well.
    #[arg(long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub log_file: Option<PathBuf>,

    /// Print where xdg_relocate looks for its config file, then exit.
    #[arg(long, help = "Print the config file location and exit")]
    pub print_config: bool,

    /// Write a template config file at the config location, then exit.
    #[arg(long, help = "Create a template config file and exit")]
    pub init_config: bool,

    /// Dry-run: print the planned steps but do not modify the filesystem.
    #[arg(long, help = "Show what would be done, but do not modify files/directories")]
    pub dry_run: bool,

    /// Emit logs in structured JSON (includes timestamp, level, and structured fields).
    #[arg(long, help = "Emit logs in structured JSON")]
    pub json: bool,
}

impl Args {
    /// Effective log level derived from flags.
    /// Precedence: --debug > --log-level value > None (use config default).
    pub fn effective_log_level(&self) -> Option<LogLevel> {
        if self.debug {
            return Some(LogLevel::Debug);
        }
        self.log_level.clone()
    }

    /// Apply CLI overrides to a loaded Config (in-place). No-ops for unset flags.
    pub fn apply_overrides(&self, cfg: &mut Config) {
        if let Some(dir) = &self.state_dir {
            cfg.state_dir = Some(dir.clone());
        }
        if cfg.state_dir.is_none()
            && let Some(id) = self.app_id.as_deref().filter(|id| !id.trim().is_empty())
            && let Some(home) = dirs::home_dir()
        {
            cfg.state_dir = Some(home.join(".var").join("app").join(id.trim()));
        }
        for (ns, home) in [
            (Namespace::Config, &self.config_home),
            (Namespace::Data, &self.data_home),
            (Namespace::Cache, &self.cache_home),
        ] {
            if let Some(p) = home.as_ref().filter(|p| !p.as_os_str().is_empty()) {
                cfg.set_home(ns, p.clone());
            }
        }
        if let Some(p) = &self.sandbox_info {
            cfg.sandbox_info = p.clone();
            cfg.sandbox_info_required = true;
        }
        cfg.extra_filesystems.extend(self.filesystems.iter().cloned());
        if !self.only.is_empty() {
            cfg.only = self.only.clone();
        }
        if let Some(level) = self.effective_log_level() {
            cfg.log_level = level;
        }
        if let Some(p) = &self.log_file {
            cfg.log_file = Some(p.clone());
        }
        if self.dry_run {
            cfg.dry_run = true;
        }
    }
}

pub fn parse() -> Args {
    Args::parse()
}
