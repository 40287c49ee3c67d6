//! Menu integration: adds one "Uninstall" action to each eligible app menu.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use log::debug;
use crate::menu::{HookId, ItemRole, MenuHooks, MenuId, MenuItem, MenuOpenListener, PopupMenu};
use crate::workflow::{Candidate, Choice, ConfirmPrompt, Outcome, UninstallWorkflow};

pub const UNINSTALL_LABEL: &str = "Uninstall";

/// Listener owning the workflow plus a side table of menus it already augmented.
pub struct UninstallHook {
    workflow: UninstallWorkflow,
    augmented: HashMap<MenuId, Candidate>,
    awaiting: Option<Candidate>,
}

impl UninstallHook {
    pub fn new(workflow: UninstallWorkflow) -> Self {
        Self {
            workflow,
            augmented: HashMap::new(),
            awaiting: None,
        }
    }

    pub fn workflow(&self) -> &UninstallWorkflow {
        &self.workflow
    }

    #[cfg(test)]
    pub fn is_augmented(&self, menu: MenuId) -> bool {
        self.augmented.contains_key(&menu)
    }

    /// The user picked "Uninstall" in `menu`. Returns the prompt to show.
    pub fn activate(&mut self, menu: MenuId) -> Option<ConfirmPrompt> {
        let candidate = self.augmented.get(&menu)?.clone();
        let prompt = self.workflow.request_confirm(&candidate);
        self.awaiting = Some(candidate);
        Some(prompt)
    }

    /// The confirm dialog closed with `choice`.
    pub fn resolve(&mut self, choice: Choice) -> Option<Outcome> {
        let candidate = self.awaiting.take()?;
        Some(self.workflow.resolve(candidate, choice))
    }

    pub fn shutdown(&mut self) {
        self.awaiting = None;
        self.augmented.clear();
        self.workflow.shutdown();
    }
}

impl MenuOpenListener for UninstallHook {
    fn menu_opened(&mut self, menu: &mut PopupMenu) {
        if self.augmented.contains_key(&menu.id) {
            return;
        }
        // Existing uninstall items come from another source; leave them alone.
        if menu.count_role(ItemRole::Uninstall) > 0 {
            debug!("Menu {:?} already has an uninstall item", menu.id);
            return;
        }

        let Some(candidate) = self.workflow.detect(&menu.app) else { return };
        debug!("Adding uninstall action for {} ({})", candidate.record.display_name(), candidate.kind.label());

        menu.add_item(MenuItem::Separator);
        menu.add_item(MenuItem::Action {
            label: UNINSTALL_LABEL.to_string(),
            role: ItemRole::Uninstall,
            destructive: true,
        });
        self.augmented.insert(menu.id, candidate);
    }

    fn menu_destroyed(&mut self, menu: MenuId) {
        self.augmented.remove(&menu);
    }
}

/// Enable/disable pairing around the hook.
pub struct UninstallPlugin {
    hook: Rc<RefCell<UninstallHook>>,
    connection: Option<HookId>,
}

impl UninstallPlugin {
    pub fn new(workflow: UninstallWorkflow) -> Self {
        Self {
            hook: Rc::new(RefCell::new(UninstallHook::new(workflow))),
            connection: None,
        }
    }

    pub fn hook(&self) -> &Rc<RefCell<UninstallHook>> {
        &self.hook
    }

    #[cfg(test)]
    pub fn is_enabled(&self) -> bool {
        self.connection.is_some()
    }

    pub fn enable(&mut self, hooks: &mut MenuHooks) {
        if self.connection.is_none() {
            self.connection = Some(hooks.connect(self.hook.clone()));
        }
    }

    pub fn disable(&mut self, hooks: &mut MenuHooks) {
        if let Some(id) = self.connection.take() {
            hooks.disconnect(id);
        }
        self.hook.borrow_mut().shutdown();
    }
}
