//! User-facing notifications and the deferred completion notice.
//!
//! The completion notice is optimistic: it fires a fixed delay after removal
//! was dispatched, whether or not the removal actually finished or succeeded.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;
use calloop::timer::{TimeoutAction, Timer};
use calloop::{LoopHandle, RegistrationToken};
use log::{info, warn};
use crate::executor::CommandSpawner;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub body: String,
}

impl Notice {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self { title: title.into(), body: body.into() }
    }

    pub fn started(kind_label: &str, app_name: &str) -> Self {
        Self::new("Uninstalling...", format!("Removing {}: {}", kind_label, app_name))
    }

    pub fn completed(app_name: &str) -> Self {
        Self::new("Success", format!("{} removed.", app_name))
    }

    pub fn failed(app_name: &str) -> Self {
        Self::new("Error", format!("Failed to uninstall {}", app_name))
    }
}

/// Fire-and-forget notification surface.
pub trait Notifier {
    fn notify(&self, notice: &Notice);
}

/// Sends desktop notifications through an external command such as `notify-send`.
pub struct DesktopNotifier {
    command: Option<String>,
    spawner: Rc<dyn CommandSpawner>,
}

impl DesktopNotifier {
    pub fn new(command: Option<String>, spawner: Rc<dyn CommandSpawner>) -> Self {
        let command = command.filter(|c| !c.trim().is_empty());
        Self { command, spawner }
    }
}

impl Notifier for DesktopNotifier {
    fn notify(&self, notice: &Notice) {
        info!("{}: {}", notice.title, notice.body);
        let Some(command) = &self.command else { return };

        let args = vec![
            "--app-name=flatnuke".to_string(),
            notice.title.clone(),
            notice.body.clone(),
        ];
        if let Err(e) = self.spawner.spawn_detached(command, &args) {
            warn!("Could not send notification via {}: {}", command, e);
        }
    }
}

/// Runs a notice once after a delay, on the host event loop.
pub trait CompletionScheduler {
    fn schedule(&mut self, delay: Duration, notice: Notice);
    /// Drop every notice that has not fired yet.
    fn cancel_all(&mut self);
    fn pending(&self) -> usize;
}

/// calloop-backed scheduler: one `Timer` source per notice, dropped after it fires.
pub struct LoopScheduler<D: 'static> {
    handle: LoopHandle<'static, D>,
    notifier: Rc<dyn Notifier>,
    pending: Rc<RefCell<HashMap<u64, RegistrationToken>>>,
    next_id: u64,
}

impl<D: 'static> LoopScheduler<D> {
    pub fn new(handle: LoopHandle<'static, D>, notifier: Rc<dyn Notifier>) -> Self {
        Self {
            handle,
            notifier,
            pending: Rc::new(RefCell::new(HashMap::new())),
            next_id: 0,
        }
    }
}

impl<D: 'static> CompletionScheduler for LoopScheduler<D> {
    fn schedule(&mut self, delay: Duration, notice: Notice) {
        let id = self.next_id;
        self.next_id += 1;

        let notifier = self.notifier.clone();
        let pending = self.pending.clone();
        let inserted = self.handle.insert_source(Timer::from_duration(delay), move |_, _, _| {
            // Unregister before notifying so cancel_all never sees a fired timer.
            pending.borrow_mut().remove(&id);
            notifier.notify(&notice);
            TimeoutAction::Drop
        });

        match inserted {
            Ok(token) => {
                self.pending.borrow_mut().insert(id, token);
            }
            Err(e) => warn!("Failed to schedule completion notice: {}", e),
        }
    }

    fn cancel_all(&mut self) {
        let tokens: Vec<_> = self.pending.borrow_mut().drain().map(|(_, t)| t).collect();
        if !tokens.is_empty() {
            info!("Dropping {} pending completion notice(s)", tokens.len());
        }
        for token in tokens {
            self.handle.remove(token);
        }
    }

    fn pending(&self) -> usize {
        self.pending.borrow().len()
    }
}

impl<D: 'static> Drop for LoopScheduler<D> {
    fn drop(&mut self) {
        self.cancel_all();
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use super::testing::RecordingNotifier;
    use crate::executor::testing::RecordingSpawner;
    use calloop::EventLoop;
    use std::time::Instant;

    const DELAY: Duration = Duration::from_millis(60);

    fn run_until_idle(event_loop: &mut EventLoop<'static, ()>, pending: impl Fn() -> usize) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while pending() > 0 && Instant::now() < deadline {
            event_loop.dispatch(Some(Duration::from_millis(20)), &mut ()).unwrap();
        }
    }

    #[test]
    fn completion_fires_once_after_delay() {
        let mut event_loop: EventLoop<'static, ()> = EventLoop::try_new().unwrap();
        let notifier = Rc::new(RecordingNotifier::default());
        let mut scheduler = LoopScheduler::new(event_loop.handle(), notifier.clone());

        let scheduled_at = Instant::now();
        scheduler.schedule(DELAY, Notice::completed("Foo"));
        assert_eq!(scheduler.pending(), 1);

        run_until_idle(&mut event_loop, || scheduler.pending());
        // A few more turns must not deliver it again.
        for _ in 0..3 {
            event_loop.dispatch(Some(DELAY), &mut ()).unwrap();
        }

        let notices = notifier.notices.borrow();
        assert_eq!(notices.len(), 1);
        assert!(notices[0].0.duration_since(scheduled_at) >= DELAY);
        assert_eq!(notices[0].1, Notice::completed("Foo"));
    }

    #[test]
    fn cancelled_notice_never_fires() {
        let mut event_loop: EventLoop<'static, ()> = EventLoop::try_new().unwrap();
        let notifier = Rc::new(RecordingNotifier::default());
        let mut scheduler = LoopScheduler::new(event_loop.handle(), notifier.clone());

        scheduler.schedule(DELAY, Notice::completed("Foo"));
        scheduler.cancel_all();
        assert_eq!(scheduler.pending(), 0);

        event_loop.dispatch(Some(DELAY * 3), &mut ()).unwrap();
        assert!(notifier.notices.borrow().is_empty());
    }

    #[test]
    fn dropping_scheduler_cancels_pending() {
        let mut event_loop: EventLoop<'static, ()> = EventLoop::try_new().unwrap();
        let notifier = Rc::new(RecordingNotifier::default());
        {
            let mut scheduler = LoopScheduler::new(event_loop.handle(), notifier.clone());
            scheduler.schedule(DELAY, Notice::completed("Foo"));
        }
        event_loop.dispatch(Some(DELAY * 3), &mut ()).unwrap();
        assert!(notifier.notices.borrow().is_empty());
    }

    #[test]
    fn desktop_notifier_uses_argv() {
        let spawner = Rc::new(RecordingSpawner::default());
        let notifier = DesktopNotifier::new(Some("notify-send".to_string()), spawner.clone());
        notifier.notify(&Notice::started("Flatpak", "Maps"));

        let calls = spawner.calls.borrow();
        assert_eq!(calls[0].0, "notify-send");
        assert_eq!(calls[0].1[1], "Uninstalling...");
        assert_eq!(calls[0].1[2], "Removing Flatpak: Maps");
    }

    #[test]
    fn blank_notify_command_only_logs() {
        let spawner = Rc::new(RecordingSpawner::default());
        let notifier = DesktopNotifier::new(Some(" ".to_string()), spawner.clone());
        notifier.notify(&Notice::failed("Maps"));
        assert!(spawner.calls.borrow().is_empty());
    }
}
