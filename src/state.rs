use std::collections::HashMap;
use crate::config::Config;
use crate::matcher::FuzzyMatcher;
use crate::menu::{ItemRole, MenuHooks, MenuId, PopupMenu};
use crate::model::Entry;
use crate::plugin::UninstallPlugin;
use crate::workflow::{Choice, ConfirmDialog, Outcome};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
    Tab,
    Return,
    Escape,
    Menu,
    Backspace,
    Text(String),
}

/// What the host should do after a key press.
#[derive(Debug)]
pub enum Command {
    Redraw,
    Launch(Entry),
    Exit,
}

#[derive(Debug)]
pub enum Mode {
    Browse,
    Menu { app_id: String, selected: usize },
    Confirm(ConfirmDialog),
}

pub struct AppState {
    pub config: Config,
    pub entries: Vec<Entry>,
    pub filtered_indices: Vec<usize>,
    pub selected_index: usize,
    pub query: String,
    pub matcher: FuzzyMatcher,
    pub mode: Mode,
    pub status: Option<String>,
    hooks: MenuHooks,
    plugin: UninstallPlugin,
    // One menu per app, reused across opens the way a shell keeps them.
    menus: HashMap<String, PopupMenu>,
    next_menu_id: u64,
}

impl AppState {
    pub fn new(config: Config, mut plugin: UninstallPlugin) -> Self {
        let mut hooks = MenuHooks::default();
        plugin.enable(&mut hooks);

        Self {
            config,
            entries: Vec::new(),
            filtered_indices: Vec::new(),
            selected_index: 0,
            query: String::new(),
            matcher: FuzzyMatcher::new(),
            mode: Mode::Browse,
            status: None,
            hooks,
            plugin,
            menus: HashMap::new(),
            next_menu_id: 0,
        }
    }

    pub fn set_entries(&mut self, entries: Vec<Entry>) {
        // Fresh records mean fresh menus.
        for menu in self.menus.values() {
            self.hooks.emit_destroyed(menu.id);
        }
        self.menus.clear();
        self.entries = entries;
        self.update_filter();
    }

    pub fn update_query(&mut self, query: &str) {
        self.query = query.to_string();
        self.update_filter();
    }

    pub fn update_filter(&mut self) {
        self.filtered_indices = self.matcher.filter(&self.query, &mut self.entries);
        log::debug!("AppState: query='{}', filtered_count={}", self.query, self.filtered_indices.len());
        self.selected_index = 0;
    }

    pub fn move_selection(&mut self, delta: i32) {
        if self.filtered_indices.is_empty() {
            self.selected_index = 0;
            return;
        }

        let len = self.filtered_indices.len() as i32;
        let new_index = (self.selected_index as i32 + delta).rem_euclid(len);
        self.selected_index = new_index as usize;
    }

    pub fn get_selected(&self) -> Option<&Entry> {
        self.filtered_indices.get(self.selected_index)
            .map(|&idx| &self.entries[idx])
    }

    pub fn open_menu(&mut self) {
        let Some(entry) = self.get_selected() else { return };
        let record = entry.record.clone();
        let app_id = record.id.clone();

        let next_id = &mut self.next_menu_id;
        let menu = self.menus.entry(app_id.clone()).or_insert_with(|| {
            *next_id += 1;
            PopupMenu::new(MenuId(*next_id), record)
        });
        self.hooks.emit_opened(menu);
        self.mode = Mode::Menu { app_id, selected: 0 };
    }

    pub fn open_menu_for(&self, app_id: &str) -> Option<&PopupMenu> {
        self.menus.get(app_id)
    }

    pub fn handle_key(&mut self, key: Key) -> Command {
        match std::mem::replace(&mut self.mode, Mode::Browse) {
            Mode::Browse => self.browse_key(key),
            Mode::Menu { app_id, selected } => self.menu_key(key, app_id, selected),
            Mode::Confirm(dialog) => self.confirm_key(key, dialog),
        }
    }

    fn browse_key(&mut self, key: Key) -> Command {
        match key {
            Key::Escape => return Command::Exit,
            Key::Return => {
                if let Some(entry) = self.get_selected() {
                    return Command::Launch(entry.clone());
                }
            }
            Key::Menu | Key::Tab | Key::Right => self.open_menu(),
            Key::Up => self.move_selection(-1),
            Key::Down => self.move_selection(1),
            Key::Backspace => {
                let mut query = self.query.clone();
                query.pop();
                self.update_query(&query);
            }
            Key::Text(text) => {
                let query = format!("{}{}", self.query, text);
                self.update_query(&query);
            }
            Key::Left => {}
        }
        Command::Redraw
    }

    fn menu_key(&mut self, key: Key, app_id: String, selected: usize) -> Command {
        let Some(menu) = self.menus.get(&app_id) else { return Command::Redraw };
        match key {
            Key::Escape | Key::Left => {}
            Key::Up => {
                let selected = menu.step(selected, -1);
                self.mode = Mode::Menu { app_id, selected };
            }
            Key::Down | Key::Tab => {
                let selected = menu.step(selected, 1);
                self.mode = Mode::Menu { app_id, selected };
            }
            Key::Return => match menu.role_at(selected) {
                Some(ItemRole::Open) => {
                    if let Some(entry) = self.entries.iter().find(|e| e.record.id == app_id) {
                        return Command::Launch(entry.clone());
                    }
                }
                Some(ItemRole::Uninstall) => {
                    let menu_id = menu.id;
                    if let Some(prompt) = self.plugin.hook().borrow_mut().activate(menu_id) {
                        self.mode = Mode::Confirm(ConfirmDialog::new(prompt));
                    }
                }
                None => self.mode = Mode::Menu { app_id, selected },
            },
            _ => self.mode = Mode::Menu { app_id, selected },
        }
        Command::Redraw
    }

    fn confirm_key(&mut self, key: Key, mut dialog: ConfirmDialog) -> Command {
        let choice = match key {
            Key::Escape => dialog.dismiss(),
            Key::Return => dialog.activate(),
            Key::Left | Key::Right | Key::Tab => {
                dialog.toggle_focus();
                self.mode = Mode::Confirm(dialog);
                return Command::Redraw;
            }
            _ => {
                self.mode = Mode::Confirm(dialog);
                return Command::Redraw;
            }
        };
        self.finish_confirm(choice);
        Command::Redraw
    }

    fn finish_confirm(&mut self, choice: Choice) {
        let outcome = self.plugin.hook().borrow_mut().resolve(choice);
        self.status = match outcome {
            Some(Outcome::Scheduled(_)) => Some("Uninstall started".to_string()),
            Some(Outcome::Failed(e)) => Some(e.to_string()),
            Some(Outcome::Cancelled) | None => None,
        };
    }

    /// Disconnect the plugin; completion notices still pending are dropped.
    pub fn shutdown(&mut self) {
        self.plugin.disable(&mut self.hooks);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AppRecord;
    use crate::workflow::testing::Harness;

    fn state() -> (AppState, Harness) {
        let config = Config::default();
        let (workflow, harness) = Harness::workflow(&config);
        let mut state = AppState::new(config, UninstallPlugin::new(workflow));
        state.set_entries(vec![
            Entry::new(AppRecord::new(
                "org.gnome.Maps.desktop",
                "Maps",
                "/var/lib/flatpak/exports/share/applications/org.gnome.Maps.desktop",
                "flatpak run org.gnome.Maps",
            ), false),
            Entry::new(AppRecord::new("gedit.desktop", "Text Editor", "/usr/share/applications/gedit.desktop", "gedit %U"), false),
        ]);
        (state, harness)
    }

    #[test]
    fn reopening_menu_keeps_one_uninstall() {
        let (mut state, _harness) = state();
        state.handle_key(Key::Menu);
        state.handle_key(Key::Escape);
        state.handle_key(Key::Menu);

        let menu = state.open_menu_for("org.gnome.Maps.desktop").unwrap();
        assert_eq!(menu.count_role(ItemRole::Uninstall), 1);
    }

    #[test]
    fn return_in_dialog_defaults_to_cancel() {
        let (mut state, harness) = state();
        state.handle_key(Key::Menu);
        state.handle_key(Key::Down);
        state.handle_key(Key::Return);
        assert!(matches!(state.mode, Mode::Confirm(_)));

        state.handle_key(Key::Return);
        assert!(matches!(state.mode, Mode::Browse));
        assert!(harness.nothing_happened());
    }

    #[test]
    fn escape_in_dialog_cancels() {
        let (mut state, harness) = state();
        state.handle_key(Key::Menu);
        state.handle_key(Key::Down);
        state.handle_key(Key::Return);
        state.handle_key(Key::Right);
        state.handle_key(Key::Escape);
        assert!(harness.nothing_happened());
    }

    #[test]
    fn focusing_delete_uninstalls() {
        let (mut state, harness) = state();
        state.handle_key(Key::Menu);
        state.handle_key(Key::Down);
        state.handle_key(Key::Return);
        state.handle_key(Key::Tab);
        state.handle_key(Key::Return);

        assert_eq!(harness.spawner.calls.borrow().len(), 1);
        assert_eq!(state.status.as_deref(), Some("Uninstall started"));
    }

    #[test]
    fn plain_app_menu_has_only_open() {
        let (mut state, _harness) = state();
        state.handle_key(Key::Down);
        state.handle_key(Key::Menu);
        let menu = state.open_menu_for("gedit.desktop").unwrap();
        assert_eq!(menu.items.len(), 1);

        assert!(matches!(state.handle_key(Key::Return), Command::Launch(_)));
    }

    #[test]
    fn shutdown_drops_pending_notice() {
        let (mut state, harness) = state();
        state.handle_key(Key::Menu);
        state.handle_key(Key::Down);
        state.handle_key(Key::Return);
        state.handle_key(Key::Tab);
        state.handle_key(Key::Return);
        assert_eq!(harness.scheduled.borrow().len(), 1);

        state.shutdown();
        assert!(harness.scheduled.borrow().is_empty());
    }
}
