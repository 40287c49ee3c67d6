use std::io;
use std::path::{Path, PathBuf};
use log::{debug, info, warn};
use thiserror::Error;
use crate::detect::{binary_candidate, Detector};
use crate::executor::CommandSpawner;
use crate::model::{AppRecord, PackageKind};
use crate::notify::{Notice, Notifier};

const DESKTOP_SUFFIX: &str = ".desktop";

#[derive(Debug, Error)]
pub enum UninstallError {
    #[error("no Flatpak application id for {0}")]
    MissingFlatpakId(String),
    #[error("failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("{0} is not a Flatpak or AppImage")]
    NotRemovable(String),
}

/// Deletes files without blocking the caller. Outcomes are only logged.
pub trait FileRemover {
    fn remove_detached(&self, path: PathBuf);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct BackgroundFileRemover;

impl FileRemover for BackgroundFileRemover {
    fn remove_detached(&self, path: PathBuf) {
        std::thread::spawn(move || match std::fs::remove_file(&path) {
            Ok(()) => info!("Deleted {:?}", path),
            Err(e) => warn!("Could not delete {:?}: {}", path, e),
        });
    }
}

/// Work handed off by a removal. Nothing in here has completed yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatched {
    Command { program: String, args: Vec<String> },
    Delete(PathBuf),
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RemovalReceipt {
    pub dispatched: Vec<Dispatched>,
}

pub struct Remover<'a> {
    pub flatpak_program: &'a str,
    pub detector: &'a Detector,
    pub spawner: &'a dyn CommandSpawner,
    pub files: &'a dyn FileRemover,
    pub notifier: &'a dyn Notifier,
}

impl Remover<'_> {
    pub fn remove(&self, kind: PackageKind, record: &AppRecord) -> Result<RemovalReceipt, UninstallError> {
        match kind {
            PackageKind::Flatpak => self.remove_flatpak(record),
            PackageKind::AppImage => Ok(self.remove_appimage(record)),
            PackageKind::None => Err(UninstallError::NotRemovable(record.display_name().to_string())),
        }
    }

    /// `flatpak uninstall -y <id>`, spawned and left running.
    pub fn remove_flatpak(&self, record: &AppRecord) -> Result<RemovalReceipt, UninstallError> {
        let app_name = record.display_name();
        let Some(app_id) = flatpak_ref(record) else {
            self.notifier.notify(&Notice::failed(app_name));
            return Err(UninstallError::MissingFlatpakId(app_name.to_string()));
        };

        self.notifier.notify(&Notice::started(PackageKind::Flatpak.label(), app_name));

        let args = vec!["uninstall".to_string(), "-y".to_string(), app_id];
        if let Err(source) = self.spawner.spawn_detached(self.flatpak_program, &args) {
            warn!("Failed to launch {}: {}", self.flatpak_program, source);
            self.notifier.notify(&Notice::failed(app_name));
            return Err(UninstallError::Launch {
                program: self.flatpak_program.to_string(),
                source,
            });
        }

        Ok(RemovalReceipt {
            dispatched: vec![Dispatched::Command { program: self.flatpak_program.to_string(), args }],
        })
    }

    /// Delete the portable binary and its launcher descriptor. Each delete is
    /// attempted on its own; neither can fail the removal.
    pub fn remove_appimage(&self, record: &AppRecord) -> RemovalReceipt {
        self.notifier.notify(&Notice::started(PackageKind::AppImage.label(), record.display_name()));

        let mut receipt = RemovalReceipt::default();

        match binary_candidate(&record.command_line) {
            Some(binary) if self.detector.has_portable_extension(&binary) => {
                let path = PathBuf::from(binary);
                self.files.remove_detached(path.clone());
                receipt.dispatched.push(Dispatched::Delete(path));
            }
            Some(binary) => debug!("Skipping {:?}: not a portable binary", binary),
            None => debug!("No binary in command line of {}", record.display_name()),
        }

        if !record.desktop_entry_path.is_empty() {
            let path = PathBuf::from(&record.desktop_entry_path);
            self.files.remove_detached(path.clone());
            receipt.dispatched.push(Dispatched::Delete(path));
        }

        receipt
    }
}

/// Bare Flatpak application id for a record: its id without a trailing
/// `.desktop`, else the descriptor's file stem.
pub fn flatpak_ref(record: &AppRecord) -> Option<String> {
    let id = record.id.trim();
    let id = id.strip_suffix(DESKTOP_SUFFIX).unwrap_or(id);
    if !id.is_empty() {
        return Some(id.to_string());
    }

    Path::new(&record.desktop_entry_path)
        .file_name()
        .and_then(|s| s.to_str())
        .map(|name| name.strip_suffix(DESKTOP_SUFFIX).unwrap_or(name))
        .filter(|stem| !stem.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    pub struct RecordingFileRemover {
        pub removed: RefCell<Vec<PathBuf>>,
    }

    impl FileRemover for RecordingFileRemover {
        fn remove_detached(&self, path: PathBuf) {
            self.removed.borrow_mut().push(path);
        }
    }
}
