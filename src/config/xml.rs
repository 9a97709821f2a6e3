//! XML configuration support.
//! - Loads settings from config.xml (quick_xml + serde).
//! - Creates a secure template on request (`--init-config`).
//!
//! Notes:
//! - This module only reads/writes the config file; validation happens elsewhere.
//! - Unknown XML fields are a hard error so misconfigurations surface early.

use anyhow::{anyhow, bail, Context, Result};
use quick_xml::de::from_str as from_xml_str;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use super::paths::{default_config_path, default_log_path, path_has_symlink_ancestor};
use super::types::{Config, LogLevel, UnitOptions};
use crate::platform::{set_dir_mode_0700, write_config_secure_new_0600};

/// Struct mirroring the XML config for deserialization.
#[derive(Debug, Default, Deserialize)]
#[serde(rename = "xdg_relocate")]
#[serde(deny_unknown_fields)]
struct XmlConfig {
    state_dir: Option<String>,
    sandbox_info: Option<String>,
    log_level: Option<String>,
    log_file: Option<String>,
    config: Option<XmlUnit>,
    data: Option<XmlUnit>,
    cache: Option<XmlUnit>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct XmlUnit {
    two_step: Option<bool>,
    backup: Option<bool>,
    /// Any `<rename>` element replaces the defaults; a single empty one clears them.
    #[serde(default)]
    rename: Vec<String>,
    #[serde(default)]
    ignore: Vec<String>,
}

fn trimmed_path(s: &str) -> Option<PathBuf> {
    let t = s.trim();
    if t.is_empty() { None } else { Some(PathBuf::from(t)) }
}

fn apply_unit(opts: &mut UnitOptions, xml: XmlUnit) {
    if let Some(v) = xml.two_step {
        opts.two_step = v;
    }
    if let Some(v) = xml.backup {
        opts.backup = v;
    }
    if !xml.rename.is_empty() {
        opts.rename = xml.rename.iter().filter_map(|s| trimmed_path(s)).collect();
    }
    opts.ignore
        .extend(xml.ignore.iter().filter_map(|s| trimmed_path(s)));
}

// Map XmlConfig -> Config on top of the defaults
fn xml_to_config(parsed: XmlConfig) -> Result<Config> {
    let mut cfg = Config::default();

    cfg.state_dir = parsed.state_dir.as_deref().and_then(trimmed_path);
    if let Some(p) = parsed.sandbox_info.as_deref().and_then(trimmed_path) {
        cfg.sandbox_info = p;
        cfg.sandbox_info_required = true;
    }
    cfg.log_file = parsed.log_file.as_deref().and_then(trimmed_path);
    if let Some(s) = parsed.log_level.as_deref().filter(|s| !s.trim().is_empty()) {
        cfg.log_level = LogLevel::parse(s).ok_or_else(|| anyhow!("invalid log_level '{}'", s.trim()))?;
    }

    if let Some(u) = parsed.config {
        apply_unit(&mut cfg.config, u);
    }
    if let Some(u) = parsed.data {
        apply_unit(&mut cfg.data, u);
    }
    if let Some(u) = parsed.cache {
        apply_unit(&mut cfg.cache, u);
    }
    Ok(cfg)
}

/// Parse config XML text on top of the defaults.
pub fn parse_config_xml(contents: &str) -> Result<Config> {
    let parsed: XmlConfig = if contents.trim().is_empty() {
        XmlConfig::default()
    } else {
        from_xml_str(contents)?
    };
    xml_to_config(parsed)
}

/// Load a Config from a specific XML file path (quick_xml).
pub fn load_config_from_xml_path(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("read config xml '{}'", path.display()))?;
    parse_config_xml(&contents).with_context(|| format!("parse config xml '{}'", path.display()))
}

/// Load the config file from its default location, or the defaults when no file
/// exists there. Returns the path that was read, if any.
pub fn load_or_default() -> Result<(Config, Option<PathBuf>)> {
    let path = default_config_path()?;
    if !path.exists() {
        return Ok((Config::default(), None));
    }
    let cfg = load_config_from_xml_path(&path)?;
    Ok((cfg, Some(path)))
}

/// Create a template config file and its parent directory (0700/0600 on Unix).
/// Uses secure creation to avoid following attacker-controlled symlinks.
pub fn create_template_config(path: &Path) -> Result<()> {
    if path_has_symlink_ancestor(path)? {
        bail!(
            "Refusing to create config: ancestor of {} is a symlink",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
        let _ = set_dir_mode_0700(parent);
    }

    let suggested_log = default_log_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| "/path/to/xdg_relocate.log".into());

    let content = format!(
        "<!--\n  xdg_relocate configuration (XML)\n\n  Top-level fields:\n    state_dir     -> private storage root; targets are <state_dir>/.config, .local/share, .cache\n    sandbox_info  -> sandbox metadata key file (default /.flatpak-info)\n    log_level     -> quiet | normal | info | debug\n    log_file      -> path to log file (optional; stdout still used)\n\n  Per-namespace sections <config>, <data>, <cache>:\n    two_step      -> rename the original aside and delete it on the next run (true/false)\n    backup        -> copy a pre-existing target to <target>.bak first (true/false)\n    rename        -> subdirectory moved by rename instead of copied (repeatable;\n                     replaces the defaults, a single empty <rename/> clears them)\n    ignore        -> extra pattern never copied (repeatable; *, ? and [..] per segment)\n\n  Notes:\n    - CLI flags override XML values.\n    - Source directories come from --config-home/--data-home/--cache-home or XDG_*_HOME.\n-->\n<xdg_relocate>\n  <state_dir></state_dir>\n  <log_level>normal</log_level>\n  <log_file>{suggested_log}</log_file>\n  <config>\n    <two_step>true</two_step>\n    <backup>true</backup>\n  </config>\n  <data>\n    <two_step>true</two_step>\n    <backup>true</backup>\n    <rename>Steam</rename>\n  </data>\n  <cache>\n    <two_step>true</two_step>\n    <backup>false</backup>\n  </cache>\n</xdg_relocate>\n"
    );

    // Atomic, secure write (create_new with 0600 on Unix).
    write_config_secure_new_0600(path, content.as_bytes())?;

    info!("Created template config at {}", path.display());
    Ok(())
}
