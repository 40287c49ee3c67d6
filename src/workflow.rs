//! Detect → Confirm → Remove → NotifyCompletion for one application.
//!
//! Every interaction ends back in [`Stage::Idle`]. Removal is dispatched and
//! never awaited, and the completion notice is scheduled independently of it:
//! "Success" means "removal was started a moment ago", not "removal finished".

use std::rc::Rc;
use std::time::Duration;
use log::{debug, info, warn};
use crate::config::Config;
use crate::detect::Detector;
use crate::executor::CommandSpawner;
use crate::model::{AppRecord, PackageKind};
use crate::notify::{CompletionScheduler, Notice, Notifier};
use crate::remove::{FileRemover, RemovalReceipt, Remover, UninstallError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Detected(PackageKind),
    AwaitingConfirm,
    Removing,
    NotifyScheduled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    Cancel,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmPrompt {
    pub message: String,
    pub cancel_label: &'static str,
    pub confirm_label: &'static str,
    pub default_choice: Choice,
}

impl ConfirmPrompt {
    pub fn for_app(app_name: &str) -> Self {
        Self {
            message: format!("Delete {}?", app_name),
            cancel_label: "Cancel",
            confirm_label: "Delete",
            default_choice: Choice::Cancel,
        }
    }
}

/// Host-side state of an open confirm dialog. Focus starts on Cancel; any
/// dismissal resolves to Cancel.
#[derive(Debug, Clone)]
pub struct ConfirmDialog {
    pub prompt: ConfirmPrompt,
    pub focus: Choice,
}

impl ConfirmDialog {
    pub fn new(prompt: ConfirmPrompt) -> Self {
        let focus = prompt.default_choice;
        Self { prompt, focus }
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Choice::Cancel => Choice::Delete,
            Choice::Delete => Choice::Cancel,
        };
    }

    pub fn activate(&self) -> Choice {
        self.focus
    }

    pub fn dismiss(&self) -> Choice {
        Choice::Cancel
    }
}

/// The snapshot an uninstall was offered for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub record: AppRecord,
    pub kind: PackageKind,
}

#[derive(Debug)]
pub enum Outcome {
    Cancelled,
    Scheduled(RemovalReceipt),
    Failed(UninstallError),
}

pub struct UninstallWorkflow {
    detector: Detector,
    flatpak_program: String,
    completion_delay: Duration,
    spawner: Rc<dyn CommandSpawner>,
    files: Rc<dyn FileRemover>,
    notifier: Rc<dyn Notifier>,
    scheduler: Box<dyn CompletionScheduler>,
    stage: Stage,
}

impl UninstallWorkflow {
    pub fn new(
        config: &Config,
        spawner: Rc<dyn CommandSpawner>,
        files: Rc<dyn FileRemover>,
        notifier: Rc<dyn Notifier>,
        scheduler: Box<dyn CompletionScheduler>,
    ) -> Self {
        Self {
            detector: Detector::new(&config.appimage),
            flatpak_program: config.flatpak.program.clone(),
            completion_delay: Duration::from_millis(config.notify.completion_delay_ms),
            spawner,
            files,
            notifier,
            scheduler,
            stage: Stage::Idle,
        }
    }

    #[cfg(test)]
    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn pending_notices(&self) -> usize {
        self.scheduler.pending()
    }

    pub fn detect(&mut self, record: &AppRecord) -> Option<Candidate> {
        let kind = self.detector.detect(record);
        debug!("Detected {:?} for {:?}", kind, record.id);
        if !kind.is_removable() {
            self.stage = Stage::Idle;
            return None;
        }
        self.stage = Stage::Detected(kind);
        Some(Candidate { record: record.clone(), kind })
    }

    pub fn request_confirm(&mut self, candidate: &Candidate) -> ConfirmPrompt {
        if let Stage::Detected(kind) = self.stage {
            debug!("Asking before removing {} {}", kind.label(), candidate.record.display_name());
        }
        self.stage = Stage::AwaitingConfirm;
        ConfirmPrompt::for_app(candidate.record.display_name())
    }

    /// Apply the user's answer. Cancel touches nothing; Delete dispatches the
    /// removal and, if dispatch worked, schedules the completion notice.
    pub fn resolve(&mut self, candidate: Candidate, choice: Choice) -> Outcome {
        let app_name = candidate.record.display_name().to_string();
        if choice == Choice::Cancel {
            debug!("Uninstall of {} cancelled", app_name);
            self.stage = Stage::Idle;
            return Outcome::Cancelled;
        }

        self.stage = Stage::Removing;
        info!("Removing {} ({})", app_name, candidate.kind.label());
        let remover = Remover {
            flatpak_program: &self.flatpak_program,
            detector: &self.detector,
            spawner: self.spawner.as_ref(),
            files: self.files.as_ref(),
            notifier: self.notifier.as_ref(),
        };

        let outcome = match remover.remove(candidate.kind, &candidate.record) {
            Ok(receipt) => {
                self.scheduler.schedule(self.completion_delay, Notice::completed(&app_name));
                self.stage = Stage::NotifyScheduled;
                Outcome::Scheduled(receipt)
            }
            Err(e) => {
                warn!("Uninstall of {} failed: {}", app_name, e);
                Outcome::Failed(e)
            }
        };
        self.stage = Stage::Idle;
        outcome
    }

    /// Teardown: pending completion notices must not fire afterwards.
    pub fn shutdown(&mut self) {
        if self.stage != Stage::Idle {
            debug!("Shutting down during {:?}", self.stage);
        }
        self.scheduler.cancel_all();
        self.stage = Stage::Idle;
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::cell::RefCell;
    use crate::executor::testing::RecordingSpawner;
    use crate::notify::testing::{ManualScheduler, RecordingNotifier};
    use crate::remove::testing::RecordingFileRemover;

    pub struct Harness {
        pub spawner: Rc<RecordingSpawner>,
        pub files: Rc<RecordingFileRemover>,
        pub notifier: Rc<RecordingNotifier>,
        pub scheduled: Rc<RefCell<Vec<(Duration, Notice)>>>,
    }

    impl Harness {
        pub fn workflow(config: &Config) -> (UninstallWorkflow, Harness) {
            Self::workflow_with(config, RecordingSpawner::default())
        }

        pub fn workflow_with(config: &Config, spawner: RecordingSpawner) -> (UninstallWorkflow, Harness) {
            let scheduler = ManualScheduler::default();
            let harness = Harness {
                spawner: Rc::new(spawner),
                files: Rc::new(RecordingFileRemover::default()),
                notifier: Rc::new(RecordingNotifier::default()),
                scheduled: scheduler.scheduled.clone(),
            };
            let workflow = UninstallWorkflow::new(
                config,
                harness.spawner.clone(),
                harness.files.clone(),
                harness.notifier.clone(),
                Box::new(scheduler),
            );
            (workflow, harness)
        }

        pub fn nothing_happened(&self) -> bool {
            self.spawner.calls.borrow().is_empty()
                && self.files.removed.borrow().is_empty()
                && self.notifier.notices.borrow().is_empty()
                && self.scheduled.borrow().is_empty()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::testing::Harness;
    use crate::executor::testing::RecordingSpawner;

    fn flatpak_record() -> AppRecord {
        AppRecord::new(
            "org.gnome.Maps.desktop",
            "Maps",
            "/var/lib/flatpak/exports/share/applications/org.gnome.Maps.desktop",
            "/usr/bin/flatpak run org.gnome.Maps",
        )
    }

    #[test]
    fn prompt_defaults_to_cancel() {
        let prompt = ConfirmPrompt::for_app("Maps");
        assert_eq!(prompt.message, "Delete Maps?");

        let mut dialog = ConfirmDialog::new(prompt);
        assert_eq!(dialog.activate(), Choice::Cancel);
        dialog.toggle_focus();
        assert_eq!(dialog.activate(), Choice::Delete);
        assert_eq!(dialog.dismiss(), Choice::Cancel);
    }

    #[test]
    fn plain_app_goes_back_to_idle() {
        let (mut workflow, harness) = Harness::workflow(&Config::default());
        let record = AppRecord::new("gedit.desktop", "Text Editor", "/usr/share/applications/gedit.desktop", "gedit %U");
        assert!(workflow.detect(&record).is_none());
        assert_eq!(workflow.stage(), Stage::Idle);
        assert!(harness.nothing_happened());
    }

    #[test]
    fn cancel_has_no_side_effects() {
        let (mut workflow, harness) = Harness::workflow(&Config::default());
        let candidate = workflow.detect(&flatpak_record()).unwrap();
        assert_eq!(workflow.stage(), Stage::Detected(PackageKind::Flatpak));

        workflow.request_confirm(&candidate);
        assert_eq!(workflow.stage(), Stage::AwaitingConfirm);

        assert!(matches!(workflow.resolve(candidate, Choice::Cancel), Outcome::Cancelled));
        assert_eq!(workflow.stage(), Stage::Idle);
        assert!(harness.nothing_happened());
    }

    #[test]
    fn confirm_dispatches_then_schedules() {
        let (mut workflow, harness) = Harness::workflow(&Config::default());
        let candidate = workflow.detect(&flatpak_record()).unwrap();
        workflow.request_confirm(&candidate);

        let receipt = match workflow.resolve(candidate, Choice::Delete) {
            Outcome::Scheduled(receipt) => receipt,
            other => panic!("expected scheduled, got {:?}", other),
        };
        assert_eq!(receipt.dispatched.len(), 1);
        assert_eq!(workflow.stage(), Stage::Idle);

        // Start notice is immediate; success is only scheduled, never sent yet.
        assert_eq!(harness.notifier.titles(), vec!["Uninstalling..."]);
        let scheduled = harness.scheduled.borrow();
        assert_eq!(scheduled.len(), 1);
        assert_eq!(scheduled[0].0, Duration::from_millis(2000));
        assert_eq!(scheduled[0].1, Notice::completed("Maps"));
    }

    #[test]
    fn launch_failure_schedules_nothing() {
        let (mut workflow, harness) = Harness::workflow_with(&Config::default(), RecordingSpawner::failing());
        let candidate = workflow.detect(&flatpak_record()).unwrap();

        assert!(matches!(workflow.resolve(candidate, Choice::Delete), Outcome::Failed(UninstallError::Launch { .. })));
        assert!(harness.scheduled.borrow().is_empty());
        assert_eq!(harness.notifier.titles(), vec!["Uninstalling...", "Error"]);
    }

    #[test]
    fn appimage_uses_snapshot_from_detection() {
        let mut config = Config::default();
        config.appimage.root = Some("/home/u/.appimage".to_string());
        let (mut workflow, harness) = Harness::workflow(&config);

        let mut record = AppRecord::new(
            "tool.desktop",
            "Tool",
            "/home/u/.local/share/applications/tool.desktop",
            r#""/home/u/.appimage/Tool.AppImage" --flag"#,
        );
        let candidate = workflow.detect(&record).unwrap();
        assert_eq!(candidate.kind, PackageKind::AppImage);

        // Host data changing afterwards does not affect what gets removed.
        record.command_line.clear();
        record.desktop_entry_path.clear();

        workflow.resolve(candidate, Choice::Delete);
        assert_eq!(harness.files.removed.borrow().len(), 2);
        assert_eq!(harness.scheduled.borrow().len(), 1);
    }

    #[test]
    fn shutdown_drops_pending_notices() {
        let (mut workflow, harness) = Harness::workflow(&Config::default());
        let candidate = workflow.detect(&flatpak_record()).unwrap();
        workflow.resolve(candidate, Choice::Delete);
        assert_eq!(workflow.pending_notices(), 1);

        workflow.shutdown();
        assert_eq!(workflow.pending_notices(), 0);
        assert!(harness.scheduled.borrow().is_empty());
    }
}
