//! Sandbox metadata reader.
//!
//! The sandbox runtime describes the running instance in a small INI-style key
//! file. Only three keys matter here: the filesystem grants (which feed the
//! mount exclusion resolver) plus the runtime and sandbox version for logging.

use anyhow::Result;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::errors::RelocateError;
use crate::fs_ops::io_error_with_help;

/// Where the sandbox places its metadata inside the instance.
pub const DEFAULT_SANDBOX_INFO: &str = "/.flatpak-info";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SandboxInfo {
    pub flatpak_version: Option<String>,
    pub runtime: Option<String>,
    /// Raw filesystem grant entries, e.g. `xdg-config/MangoHud:ro`.
    pub filesystems: Vec<String>,
}

impl SandboxInfo {
    /// Parse key-file text. Unknown sections and keys are ignored.
    pub fn parse(text: &str) -> Self {
        let sections = parse_keyfile(text);
        let get = |section: &str, key: &str| {
            sections
                .get(section)
                .and_then(|s| s.get(key))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let filesystems = get("Context", "filesystems")
            .map(|v| split_string_list(&v))
            .unwrap_or_default();
        SandboxInfo {
            flatpak_version: get("Instance", "flatpak-version"),
            runtime: get("Application", "runtime"),
            filesystems,
        }
    }

    /// Read metadata from `path`. When `required` is false a missing file yields
    /// empty metadata, which is the normal case outside a sandbox.
    pub fn load(path: &Path, required: bool) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(text) => {
                let info = Self::parse(&text);
                debug!(
                    path = %path.display(),
                    version = info.flatpak_version.as_deref().unwrap_or("-"),
                    runtime = info.runtime.as_deref().unwrap_or("-"),
                    filesystems = info.filesystems.len(),
                    "loaded sandbox metadata"
                );
                Ok(info)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                if required {
                    Err(RelocateError::SandboxInfoMissing(PathBuf::from(path)).into())
                } else {
                    debug!(path = %path.display(), "no sandbox metadata; assuming no host mounts");
                    Ok(Self::default())
                }
            }
            Err(e) => Err(io_error_with_help("read sandbox metadata", path)(e)),
        }
    }

    /// Append extra grants (e.g. from the command line), skipping duplicates.
    pub fn extend_filesystems<I, S>(&mut self, extra: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for entry in extra {
            let entry = entry.into();
            if !entry.trim().is_empty() && !self.filesystems.contains(&entry) {
                self.filesystems.push(entry);
            }
        }
    }
}

fn parse_keyfile(text: &str) -> HashMap<String, HashMap<String, String>> {
    let mut sections: HashMap<String, HashMap<String, String>> = HashMap::new();
    let mut current: Option<String> = None;
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            current = Some(name.trim().to_string());
            sections.entry(name.trim().to_string()).or_default();
            continue;
        }
        let (Some(section), Some((key, value))) = (&current, line.split_once('=')) else {
            continue;
        };
        let key = key.trim();
        // localized variants like `name[de]` are not needed
        if key.contains('[') {
            continue;
        }
        sections
            .entry(section.clone())
            .or_default()
            .insert(key.to_string(), value.to_string());
    }
    sections
}

/// Split a `;`-separated list, honouring `\;` and `\\` escapes.
fn split_string_list(value: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut cur = String::new();
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(';') => cur.push(';'),
                Some('\\') => cur.push('\\'),
                Some('s') => cur.push(' '),
                Some(other) => {
                    cur.push('\\');
                    cur.push(other);
                }
                None => cur.push('\\'),
            },
            ';' => items.push(std::mem::take(&mut cur)),
            other => cur.push(other),
        }
    }
    items.push(cur);
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
