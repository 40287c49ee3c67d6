//! Per-application popup menus and the listeners that augment them.

use std::cell::RefCell;
use std::rc::Rc;
use crate::model::AppRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MenuId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemRole {
    Open,
    Uninstall,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuItem {
    Separator,
    Action { label: String, role: ItemRole, destructive: bool },
}

impl MenuItem {
    pub fn action(label: impl Into<String>, role: ItemRole) -> Self {
        MenuItem::Action { label: label.into(), role, destructive: false }
    }

    pub fn is_actionable(&self) -> bool {
        matches!(self, MenuItem::Action { .. })
    }
}

#[derive(Debug, Clone)]
pub struct PopupMenu {
    pub id: MenuId,
    pub app: AppRecord,
    pub items: Vec<MenuItem>,
}

impl PopupMenu {
    pub fn new(id: MenuId, app: AppRecord) -> Self {
        Self {
            id,
            app,
            items: vec![MenuItem::action("Open", ItemRole::Open)],
        }
    }

    pub fn add_item(&mut self, item: MenuItem) {
        self.items.push(item);
    }

    pub fn count_role(&self, role: ItemRole) -> usize {
        self.items
            .iter()
            .filter(|item| matches!(item, MenuItem::Action { role: r, .. } if *r == role))
            .count()
    }

    pub fn role_at(&self, index: usize) -> Option<ItemRole> {
        match self.items.get(index) {
            Some(MenuItem::Action { role, .. }) => Some(*role),
            _ => None,
        }
    }

    /// Next actionable index after `from`, wrapping, skipping separators.
    pub fn step(&self, from: usize, delta: i32) -> usize {
        let len = self.items.len() as i32;
        if len == 0 {
            return 0;
        }
        let mut index = from as i32;
        for _ in 0..len {
            index = (index + delta).rem_euclid(len);
            if self.items[index as usize].is_actionable() {
                return index as usize;
            }
        }
        from
    }
}

pub trait MenuOpenListener {
    /// Called every time `menu` is about to be shown.
    fn menu_opened(&mut self, menu: &mut PopupMenu);
    /// Called once when `menu` is gone for good.
    fn menu_destroyed(&mut self, _menu: MenuId) {}
}

pub type SharedListener = Rc<RefCell<dyn MenuOpenListener>>;

/// Registry the host emits menu events through. Listeners connect on enable and
/// disconnect on disable; nothing outlives that pairing.
#[derive(Default)]
pub struct MenuHooks {
    listeners: Vec<(HookId, SharedListener)>,
    next_id: u64,
}

impl MenuHooks {
    pub fn connect(&mut self, listener: SharedListener) -> HookId {
        let id = HookId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, listener));
        id
    }

    pub fn disconnect(&mut self, id: HookId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(hook, _)| *hook != id);
        self.listeners.len() != before
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn emit_opened(&self, menu: &mut PopupMenu) {
        for (_, listener) in &self.listeners {
            listener.borrow_mut().menu_opened(menu);
        }
    }

    pub fn emit_destroyed(&self, menu: MenuId) {
        for (_, listener) in &self.listeners {
            listener.borrow_mut().menu_destroyed(menu);
        }
    }
}
