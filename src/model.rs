use serde::Serialize;

pub const UNKNOWN_APP: &str = "Unknown App";

/// Snapshot of one launcher application, taken when its menu opens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppRecord {
    pub id: String,                 // e.g. "org.gnome.Maps.desktop", may be empty
    pub name: String,               // Display name
    pub desktop_entry_path: String, // Launcher descriptor on disk, may be empty
    pub command_line: String,       // Raw Exec line, may be empty
}

impl AppRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>, desktop_entry_path: impl Into<String>, command_line: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: id.into(),
            name: if name.trim().is_empty() { UNKNOWN_APP.to_string() } else { name },
            desktop_entry_path: desktop_entry_path.into(),
            command_line: command_line.into(),
        }
    }

    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() { UNKNOWN_APP } else { &self.name }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageKind {
    Flatpak,
    AppImage,
    None,
}

impl PackageKind {
    pub fn is_removable(self) -> bool {
        self != PackageKind::None
    }

    pub fn label(self) -> &'static str {
        match self {
            PackageKind::Flatpak => "Flatpak",
            PackageKind::AppImage => "AppImage",
            PackageKind::None => "-",
        }
    }
}

/// A row in the launcher list.
#[derive(Debug, Clone)]
pub struct Entry {
    pub record: AppRecord,
    pub score: i64,            // Fuzzy match score
    pub open_in_terminal: bool,
}

impl Entry {
    pub fn new(record: AppRecord, open_in_terminal: bool) -> Self {
        Self {
            record,
            score: 0,
            open_in_terminal,
        }
    }

    pub fn name(&self) -> &str {
        self.record.display_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_name_falls_back_to_placeholder() {
        let record = AppRecord::new("x.desktop", "  ", "", "");
        assert_eq!(record.display_name(), UNKNOWN_APP);

        let record = AppRecord { name: String::new(), ..Default::default() };
        assert_eq!(record.display_name(), UNKNOWN_APP);
    }
}
