//! Package type detection from launcher metadata.
//!
//! Everything here is pure: the same record and settings always give the same
//! [`PackageKind`]. Empty fields are treated as absent and never match.

use std::path::Path;
use std::sync::LazyLock;
use regex::Regex;
use crate::config::{AppImageConfig, AppImageStrategy};
use crate::model::{AppRecord, PackageKind};

const FLATPAK_PATH_MARKER: &str = "/flatpak/";
const FLATPAK_ID_MARKER: &str = "flatpak";

// First double-quoted token, else first run of non-whitespace.
static COMMAND_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""([^"]+)"|(\S+)"#).expect("static regex")
});

#[derive(Debug, Clone)]
pub struct Detector {
    root: Option<String>,
    default_root: String,
    strategy: AppImageStrategy,
    extensions: Vec<String>,
}

impl Detector {
    pub fn new(config: &AppImageConfig) -> Self {
        Self {
            root: config.configured_root().map(str::to_string),
            default_root: config.default_root.trim().to_string(),
            strategy: config.strategy,
            extensions: config.extensions.iter().map(|e| e.to_lowercase()).collect(),
        }
    }

    pub fn detect(&self, record: &AppRecord) -> PackageKind {
        if is_flatpak(record) {
            PackageKind::Flatpak
        } else if self.is_appimage(record) {
            PackageKind::AppImage
        } else {
            PackageKind::None
        }
    }

    /// Root the `path` strategy matches against.
    pub fn effective_root(&self) -> Option<&str> {
        self.root
            .as_deref()
            .or(Some(self.default_root.as_str()))
            .filter(|r| r.len() > 1)
    }

    /// True when the file name itself ends in one of the markers. Directory
    /// components never count.
    pub fn has_portable_extension(&self, path: &str) -> bool {
        let Some(file_name) = Path::new(path).file_name() else { return false };
        let lower = file_name.to_string_lossy().to_lowercase();
        self.extensions.iter().any(|ext| !ext.is_empty() && lower.ends_with(ext.as_str()))
    }

    fn is_appimage(&self, record: &AppRecord) -> bool {
        match self.strategy {
            AppImageStrategy::Path => {
                let Some(root) = self.effective_root() else { return false };
                contains_non_empty(&record.command_line, root)
                    || contains_non_empty(&record.desktop_entry_path, root)
            }
            AppImageStrategy::Extension => binary_candidate(&record.command_line)
                .is_some_and(|candidate| self.has_portable_extension(&candidate)),
        }
    }
}

fn is_flatpak(record: &AppRecord) -> bool {
    contains_non_empty(&record.desktop_entry_path, FLATPAK_PATH_MARKER)
        || (!record.id.is_empty() && record.id.to_lowercase().contains(FLATPAK_ID_MARKER))
}

fn contains_non_empty(haystack: &str, needle: &str) -> bool {
    !haystack.is_empty() && !needle.is_empty() && haystack.contains(needle)
}

/// Path of the binary a command line launches: the first quoted token, or the
/// first whitespace-delimited one.
pub fn binary_candidate(command_line: &str) -> Option<String> {
    let caps = COMMAND_TOKEN.captures(command_line)?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().to_string())
}
