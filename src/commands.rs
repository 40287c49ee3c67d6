//! Headless subcommands: listing, one-shot uninstall, and preferences.

use std::io::{self, BufRead, Write};
use std::path::Path;
use std::rc::Rc;
use anyhow::{anyhow, bail, Result};
use calloop::EventLoop;
use log::info;
use serde::Serialize;
use crate::config::{self, Config};
use crate::detect::Detector;
use crate::executor::{CommandSpawner, DetachedSpawner};
use crate::matcher::FuzzyMatcher;
use crate::menu::{ItemRole, MenuHooks, MenuId, PopupMenu};
use crate::model::PackageKind;
use crate::notify::{DesktopNotifier, LoopScheduler, Notifier};
use crate::plugin::UninstallPlugin;
use crate::remove::{BackgroundFileRemover, Dispatched};
use crate::sources::desktop::DesktopSource;
use crate::sources::Source;
use crate::workflow::{Choice, ConfirmPrompt, Outcome, UninstallWorkflow};

#[derive(Serialize)]
struct ListRow<'a> {
    id: &'a str,
    name: &'a str,
    kind: PackageKind,
    desktop_entry_path: &'a str,
    command_line: &'a str,
}

pub fn list(config: &Config, query: Option<&str>, all: bool, json: bool) -> Result<()> {
    let mut entries = DesktopSource::default().scan()?;
    let order = FuzzyMatcher::new().filter(query.unwrap_or_default(), &mut entries);
    let detector = Detector::new(&config.appimage);

    let rows: Vec<ListRow> = order.iter()
        .map(|&i| &entries[i])
        .map(|e| ListRow {
            id: &e.record.id,
            name: e.record.display_name(),
            kind: detector.detect(&e.record),
            desktop_entry_path: &e.record.desktop_entry_path,
            command_line: &e.record.command_line,
        })
        .filter(|row| all || row.kind.is_removable())
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    for row in &rows {
        println!("{:<9} {:<40} {}", row.kind.label(), row.id, row.name);
    }
    Ok(())
}

/// Run the whole workflow for one app from a terminal, then keep the event
/// loop alive until the completion notice has fired.
pub fn uninstall(config: &Config, app: &str, assume_yes: bool) -> Result<()> {
    let entry = DesktopSource::default()
        .find(app)?
        .ok_or_else(|| anyhow!("no application matching {:?}", app))?;

    let mut event_loop: EventLoop<'static, ()> = EventLoop::try_new()?;
    let spawner: Rc<dyn CommandSpawner> = Rc::new(DetachedSpawner);
    let notifier: Rc<dyn Notifier> = Rc::new(DesktopNotifier::new(config.notify.command.clone(), spawner.clone()));
    let scheduler = LoopScheduler::new(event_loop.handle(), notifier.clone());
    let workflow = UninstallWorkflow::new(
        config,
        spawner,
        Rc::new(BackgroundFileRemover),
        notifier,
        Box::new(scheduler),
    );

    let mut hooks = MenuHooks::default();
    let mut plugin = UninstallPlugin::new(workflow);
    plugin.enable(&mut hooks);

    let mut menu = PopupMenu::new(MenuId(0), entry.record.clone());
    hooks.emit_opened(&mut menu);
    if menu.count_role(ItemRole::Uninstall) == 0 {
        plugin.disable(&mut hooks);
        bail!("{} is neither a Flatpak nor an AppImage", entry.name());
    }

    let prompt = plugin.hook().borrow_mut().activate(menu.id)
        .ok_or_else(|| anyhow!("menu lost its uninstall action"))?;
    let choice = if assume_yes {
        Choice::Delete
    } else {
        confirm_on_terminal(&prompt, io::stdin().lock(), io::stderr())?
    };

    let outcome = plugin.hook().borrow_mut().resolve(choice);
    let result = match outcome {
        Some(Outcome::Scheduled(receipt)) => {
            for step in &receipt.dispatched {
                match step {
                    Dispatched::Command { program, args } => eprintln!("Started: {} {}", program, args.join(" ")),
                    Dispatched::Delete(path) => eprintln!("Deleting: {}", path.display()),
                }
            }
            while plugin.hook().borrow().workflow().pending_notices() > 0 {
                event_loop.dispatch(None, &mut ())?;
            }
            Ok(())
        }
        Some(Outcome::Failed(e)) => Err(e.into()),
        Some(Outcome::Cancelled) | None => {
            eprintln!("Cancelled.");
            Ok(())
        }
    };

    hooks.emit_destroyed(menu.id);
    plugin.disable(&mut hooks);
    result
}

/// Terminal rendition of the confirm dialog. Only an explicit yes deletes.
pub fn confirm_on_terminal(prompt: &ConfirmPrompt, mut input: impl BufRead, mut output: impl Write) -> io::Result<Choice> {
    write!(output, "{} [y/N] ", prompt.message)?;
    output.flush()?;

    let mut answer = String::new();
    if input.read_line(&mut answer)? == 0 {
        writeln!(output)?;
        return Ok(prompt.default_choice);
    }
    Ok(match answer.trim().to_lowercase().as_str() {
        "y" | "yes" => Choice::Delete,
        _ => Choice::Cancel,
    })
}

pub fn show_config(config: &Config) -> Result<()> {
    println!("# {}", config::config_path().display());
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

pub fn set_appimage_root(dir: &Path) -> Result<()> {
    if !dir.is_dir() {
        bail!("{} is not a directory", dir.display());
    }
    let dir = dir.canonicalize()?;

    let mut config = config::load_config()?;
    config.appimage.root = Some(dir.to_string_lossy().into_owned());
    config::save_config(&config)?;
    info!("AppImage root set to {}", dir.display());
    Ok(())
}

pub fn clear_appimage_root() -> Result<()> {
    let mut config = config::load_config()?;
    config.appimage.root = None;
    config::save_config(&config)?;
    info!("AppImage root cleared");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ask(answer: &str) -> (Choice, String) {
        let mut out = Vec::new();
        let choice = confirm_on_terminal(&ConfirmPrompt::for_app("Maps"), answer.as_bytes(), &mut out).unwrap();
        (choice, String::from_utf8(out).unwrap())
    }

    #[test]
    fn only_yes_deletes() {
        assert_eq!(ask("y\n").0, Choice::Delete);
        assert_eq!(ask("YES\n").0, Choice::Delete);
        assert_eq!(ask("\n").0, Choice::Cancel);
        assert_eq!(ask("nope\n").0, Choice::Cancel);
    }

    #[test]
    fn closed_input_cancels() {
        let (choice, shown) = ask("");
        assert_eq!(choice, Choice::Cancel);
        assert!(shown.starts_with("Delete Maps? [y/N]"));
    }
}
