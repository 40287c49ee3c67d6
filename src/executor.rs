use std::io;
use std::os::unix::process::CommandExt;
use std::process::{Command, Stdio};
use anyhow::Result;
use log::{debug, warn};
use crate::config::Config;
use crate::model::Entry;

/// Starts external programs without waiting for them.
pub trait CommandSpawner {
    fn spawn_detached(&self, program: &str, args: &[String]) -> io::Result<()>;
}

/// Spawns into its own process group with null stdio, so children outlive the launcher.
#[derive(Debug, Default, Clone, Copy)]
pub struct DetachedSpawner;

impl CommandSpawner for DetachedSpawner {
    fn spawn_detached(&self, program: &str, args: &[String]) -> io::Result<()> {
        let mut command = Command::new(program);
        command.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .process_group(0);

        let mut child = command.spawn()?;
        debug!("Spawned {} {:?} (pid {})", program, args, child.id());

        // Reap in the background so the child does not linger as a zombie.
        let program = program.to_string();
        std::thread::spawn(move || match child.wait() {
            Ok(status) => debug!("{} exited with {}", program, status),
            Err(e) => warn!("Failed to wait for {}: {}", program, e),
        });
        Ok(())
    }
}

/// Launch an entry, wrapping it in the configured terminal when it asks for one.
pub fn launch(entry: &Entry, config: &Config, spawner: &dyn CommandSpawner) -> Result<()> {
    let command = strip_field_codes(&entry.record.command_line);

    let mut cmd_parts: Vec<String> = Vec::new();
    match (&config.general.terminal, entry.open_in_terminal) {
        (Some(term_cmd), true) => {
            cmd_parts.extend(term_cmd.split_whitespace().map(str::to_string));
            cmd_parts.push(command);
        }
        _ => cmd_parts.extend(command.split_whitespace().map(str::to_string)),
    }

    let Some((program, args)) = cmd_parts.split_first() else {
        return Ok(());
    };
    spawner.spawn_detached(program, args)?;
    Ok(())
}

// Desktop entry field codes (%U, %f, ...) carry no meaning outside a file manager.
fn strip_field_codes(exec: &str) -> String {
    exec.split_whitespace()
        .filter(|s| !s.starts_with('%'))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::cell::RefCell;

    /// Records spawn requests; optionally fails them all.
    #[derive(Default)]
    pub struct RecordingSpawner {
        pub calls: RefCell<Vec<(String, Vec<String>)>>,
        pub fail: bool,
    }

    impl RecordingSpawner {
        pub fn failing() -> Self {
            Self { fail: true, ..Self::default() }
        }
    }

    impl CommandSpawner for RecordingSpawner {
        fn spawn_detached(&self, program: &str, args: &[String]) -> io::Result<()> {
            if self.fail {
                return Err(io::Error::new(io::ErrorKind::NotFound, format!("{} not found", program)));
            }
            self.calls.borrow_mut().push((program.to_string(), args.to_vec()));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::testing::RecordingSpawner;
    use crate::model::AppRecord;

    #[test]
    fn launch_strips_field_codes() {
        let spawner = RecordingSpawner::default();
        let entry = Entry::new(AppRecord::new("a.desktop", "A", "", "/usr/bin/app --new %U"), false);
        launch(&entry, &Config::default(), &spawner).unwrap();

        let calls = spawner.calls.borrow();
        assert_eq!(calls[0].0, "/usr/bin/app");
        assert_eq!(calls[0].1, vec!["--new".to_string()]);
    }

    #[test]
    fn launch_wraps_terminal_apps() {
        let spawner = RecordingSpawner::default();
        let mut config = Config::default();
        config.general.terminal = Some("foot -e".to_string());
        let entry = Entry::new(AppRecord::new("htop.desktop", "htop", "", "htop"), true);
        launch(&entry, &config, &spawner).unwrap();

        let calls = spawner.calls.borrow();
        assert_eq!(calls[0].0, "foot");
        assert_eq!(calls[0].1, vec!["-e".to_string(), "htop".to_string()]);
    }

    #[test]
    fn detached_spawn_starts_and_reports_missing_programs() {
        assert!(DetachedSpawner.spawn_detached("true", &[]).is_ok());

        let err = DetachedSpawner.spawn_detached("/nonexistent/flatnuke-helper", &[]).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }

    #[test]
    fn empty_command_is_a_no_op() {
        let spawner = RecordingSpawner::default();
        let entry = Entry::new(AppRecord::new("a.desktop", "A", "", ""), false);
        launch(&entry, &Config::default(), &spawner).unwrap();
        assert!(spawner.calls.borrow().is_empty());
    }
}
