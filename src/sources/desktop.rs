use crate::model::{AppRecord, Entry};
use crate::sources::Source;
use anyhow::Result;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use directories::BaseDirs;
use log::{info, debug};
use walkdir::WalkDir;

pub struct DesktopSource {
    dirs: Vec<PathBuf>,
}

impl Default for DesktopSource {
    fn default() -> Self {
        Self::new(default_application_dirs())
    }
}

impl DesktopSource {
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self { dirs }
    }

    /// Find one app by desktop id ("org.gnome.Maps.desktop", with or without
    /// the suffix) or by a path to its descriptor.
    pub fn find(&self, query: &str) -> Result<Option<Entry>> {
        let path = Path::new(query);
        if path.is_file() {
            let id = path.file_name().and_then(|s| s.to_str()).unwrap_or_default();
            return Ok(load_desktop_file(path, id));
        }

        let wanted = if query.ends_with(".desktop") { query.to_string() } else { format!("{}.desktop", query) };
        Ok(self.scan()?.into_iter().find(|e| e.record.id == wanted))
    }
}

/// Where launchers live, in XDG precedence order. Flatpak exports are listed
/// explicitly since not every session puts them on XDG_DATA_DIRS.
pub fn default_application_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Some(base_dirs) = BaseDirs::new() {
        dirs.push(base_dirs.data_dir().join("applications"));
        dirs.push(base_dirs.data_dir().join("flatpak/exports/share/applications"));
    }
    dirs.push(PathBuf::from("/var/lib/flatpak/exports/share/applications"));
    dirs.push(PathBuf::from("/usr/local/share/applications"));
    dirs.push(PathBuf::from("/usr/share/applications"));
    dirs
}

impl Source for DesktopSource {
    fn scan(&self) -> Result<Vec<Entry>> {
        let mut entries = Vec::new();
        let mut seen = HashSet::new();

        for dir in &self.dirs {
            if !dir.exists() { continue; }
            debug!("Scanning desktop files in {:?}", dir);

            for file in WalkDir::new(dir).follow_links(true).max_depth(3).into_iter().flatten() {
                let path = file.path();
                if !file.file_type().is_file() || path.extension().and_then(|s| s.to_str()) != Some("desktop") {
                    continue;
                }
                let Some(id) = desktop_id(dir, path) else { continue };
                // First directory wins, like XDG lookup.
                if !seen.insert(id.clone()) { continue; }

                if let Some(entry) = load_desktop_file(path, &id) {
                    entries.push(entry);
                }
            }
        }
        info!("DesktopSource: found {} entries", entries.len());
        Ok(entries)
    }
}

// "kde4/okular.desktop" under a root becomes "kde4-okular.desktop".
fn desktop_id(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<_> = relative.iter().filter_map(|s| s.to_str()).collect();
    Some(parts.join("-"))
}

fn load_desktop_file(path: &Path, id: &str) -> Option<Entry> {
    let content = fs::read_to_string(path).ok()?;
    let parsed = parse_desktop_file(&content)?;
    let record = AppRecord::new(id, parsed.name, path.to_string_lossy(), parsed.exec);
    Some(Entry::new(record, parsed.terminal))
}

#[derive(Debug, PartialEq, Eq)]
struct DesktopFile {
    name: String,
    exec: String,
    terminal: bool,
}

fn parse_desktop_file(content: &str) -> Option<DesktopFile> {
    let mut name = None;
    let mut exec = None;
    let mut terminal = false;
    let mut hidden = false;
    let mut is_application = true;
    let mut is_desktop_entry = false;

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') { continue; }

        if line == "[Desktop Entry]" {
            is_desktop_entry = true;
            continue;
        }

        if line.starts_with('[') {
            is_desktop_entry = false;
            continue;
        }

        if !is_desktop_entry { continue; }

        let Some((key, value)) = line.split_once('=') else { continue };
        match key.trim() {
            "Name" => name = Some(value.trim().to_string()),
            // Exec is kept raw: quoting matters for finding the binary later.
            "Exec" => exec = Some(value.trim().to_string()),
            "Terminal" => terminal = value.trim() == "true",
            "NoDisplay" | "Hidden" => hidden |= value.trim() == "true",
            "Type" => is_application = value.trim() == "Application",
            _ => {}
        }
    }

    if hidden || !is_application { return None; }

    match (name, exec) {
        (Some(name), Some(exec)) => Some(DesktopFile { name, exec, terminal }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAPS: &str = "[Desktop Entry]\n\
        Name=Maps\n\
        Name[de]=Karten\n\
        Exec=/usr/bin/flatpak run --branch=stable --command=gnome-maps org.gnome.Maps %U\n\
        Type=Application\n\
        \n\
        [Desktop Action new-window]\n\
        Name=New Window\n\
        Exec=gnome-maps --new-window\n";

    #[test]
    fn parses_main_group_only() {
        let parsed = parse_desktop_file(MAPS).unwrap();
        assert_eq!(parsed.name, "Maps");
        assert!(parsed.exec.ends_with("org.gnome.Maps %U"));
        assert!(!parsed.terminal);
    }

    #[test]
    fn hidden_and_links_are_skipped() {
        assert!(parse_desktop_file("[Desktop Entry]\nName=X\nExec=x\nNoDisplay=true\n").is_none());
        assert!(parse_desktop_file("[Desktop Entry]\nName=X\nExec=x\nType=Link\n").is_none());
        assert!(parse_desktop_file("[Desktop Entry]\nName=X\n").is_none());
    }

    #[test]
    fn scan_reads_flatpak_exports_and_subdirs() {
        let root = tempfile::tempdir().unwrap();
        let exports = root.path().join("flatpak/exports/share/applications");
        let local = root.path().join("applications");
        fs::create_dir_all(&exports).unwrap();
        fs::create_dir_all(local.join("kde4")).unwrap();

        fs::write(exports.join("org.gnome.Maps.desktop"), MAPS).unwrap();
        fs::write(local.join("kde4/okular.desktop"), "[Desktop Entry]\nName=Okular\nExec=okular %U\n").unwrap();
        // Shadowed by the earlier directory.
        fs::write(local.join("org.gnome.Maps.desktop"), "[Desktop Entry]\nName=Old Maps\nExec=maps\n").unwrap();

        let source = DesktopSource::new(vec![exports.clone(), local.clone()]);
        let mut entries = source.scan().unwrap();
        entries.sort_by(|a, b| a.record.id.cmp(&b.record.id));

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].record.id, "kde4-okular.desktop");
        assert_eq!(entries[1].record.id, "org.gnome.Maps.desktop");
        assert_eq!(entries[1].record.name, "Maps");
        assert!(entries[1].record.desktop_entry_path.contains("/flatpak/"));
    }

    #[test]
    fn find_by_id_or_path() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("applications");
        fs::create_dir_all(&dir).unwrap();
        let file = dir.join("org.gnome.Maps.desktop");
        fs::write(&file, MAPS).unwrap();

        let source = DesktopSource::new(vec![dir]);
        assert!(source.find("org.gnome.Maps").unwrap().is_some());
        assert!(source.find("org.gnome.Maps.desktop").unwrap().is_some());
        assert!(source.find("missing").unwrap().is_none());

        let by_path = source.find(file.to_str().unwrap()).unwrap().unwrap();
        assert_eq!(by_path.record.id, "org.gnome.Maps.desktop");
    }
}
