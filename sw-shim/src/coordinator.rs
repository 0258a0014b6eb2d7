//! Update/Reload Coordinator (page side)
//!
//! Registers the worker bundle, nudges a freshly installed version to take
//! over from the old one, and reloads the page once control has actually
//! moved to the new version.
//!
//! Update detection has two producers: the `updatefound` notification (and
//! `statechange` on the installing worker it reveals) and a direct look at
//! the registration right after `register` resolves, which catches an
//! update that finished before the page subscribed. Both feed
//! [`UpdateCoordinator::handle_update`], which sends at most one skip
//! request per version.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::Rc;

use crate::config::{PageConfig, ReloadPolicy, TakeoverPolicy};
use crate::error::PlatformError;
use crate::events::ControlMessage;
use crate::platform::PageHost;
use crate::registration::{RegistrationSnapshot, WorkerRef};
use crate::version::ProcessVersion;

/// Set at most once per page load.
#[derive(Debug, Default)]
pub struct ReloadGuard {
    fired: Cell<bool>,
}

impl ReloadGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` exactly once.
    pub fn try_fire(&self) -> bool {
        !self.fired.replace(true)
    }

    pub fn has_fired(&self) -> bool {
        self.fired.get()
    }
}

/// What an inspection of the registration led to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateAction {
    /// Posted `SKIP_WAITING` to the waiting worker.
    RequestSkip(WorkerRef),
    /// Recorded as a pending update for the application to apply.
    Offered(WorkerRef),
    /// Started watching the installing worker's state changes.
    WatchInstalling(WorkerRef),
    /// This version was already dealt with.
    AlreadyHandled,
    /// Nothing to do.
    Idle,
}

pub struct UpdateCoordinator {
    host: Rc<dyn PageHost>,
    config: PageConfig,
    reload_guard: ReloadGuard,
    skip_sent: RefCell<HashSet<ProcessVersion>>,
    watching: RefCell<HashSet<ProcessVersion>>,
    pending_update: RefCell<Option<WorkerRef>>,
    reload_available: Cell<bool>,
}

impl UpdateCoordinator {
    pub fn new(host: Rc<dyn PageHost>, config: PageConfig) -> Self {
        Self {
            host,
            config,
            reload_guard: ReloadGuard::new(),
            skip_sent: RefCell::new(HashSet::new()),
            watching: RefCell::new(HashSet::new()),
            pending_update: RefCell::new(None),
            reload_available: Cell::new(false),
        }
    }

    pub fn config(&self) -> &PageConfig {
        &self.config
    }

    /// Register the worker bundle.
    ///
    /// Failure is logged and `None` returned; the page carries on without a
    /// background worker.
    pub async fn register(&self) -> Option<RegistrationSnapshot> {
        let options = &self.config.registration;
        let snapshot = match self.host.register(&self.config.script_url, options).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                log::error!("[SW Page] Service worker registration failed: {}", e);
                return None;
            }
        };

        log::info!(
            "[SW Page] Registered {} (scope {}, {})",
            self.config.script_url,
            options.scope.path(),
            options.worker_type.as_str()
        );

        if snapshot.missed_update() {
            log::debug!("[SW Page] Worker already waiting, checking for a missed update");
            self.handle_update(&snapshot);
        }
        Some(snapshot)
    }

    /// `updatefound` fired on the registration.
    pub fn on_update_found(&self, snapshot: &RegistrationSnapshot) -> UpdateAction {
        self.handle_update(snapshot)
    }

    /// A watched installing worker changed state.
    pub fn on_state_change(&self, snapshot: &RegistrationSnapshot) -> UpdateAction {
        self.handle_update(snapshot)
    }

    /// Inspect the registration and act on a waiting update.
    ///
    /// Idempotent per version: repeated calls never send a second skip
    /// request or add a second state-change watch.
    pub fn handle_update(&self, snapshot: &RegistrationSnapshot) -> UpdateAction {
        log::info!("[SW Page] {}", snapshot.summary());

        if let Some(waiting) = snapshot.needs_update() {
            if self.skip_sent.borrow().contains(&waiting.version) {
                return UpdateAction::AlreadyHandled;
            }

            return match self.config.takeover {
                TakeoverPolicy::Immediate => {
                    self.send_skip(waiting);
                    UpdateAction::RequestSkip(waiting.clone())
                }
                TakeoverPolicy::Offer => {
                    let mut pending = self.pending_update.borrow_mut();
                    if pending.as_ref() == Some(waiting) {
                        return UpdateAction::AlreadyHandled;
                    }
                    log::info!("[SW Page] Update {} ready to apply", waiting.version);
                    *pending = Some(waiting.clone());
                    UpdateAction::Offered(waiting.clone())
                }
            };
        }

        if let Some(installing) = &snapshot.installing {
            if !self.watching.borrow_mut().insert(installing.version.clone()) {
                return UpdateAction::AlreadyHandled;
            }
            self.host.watch_state_changes(installing);
            return UpdateAction::WatchInstalling(installing.clone());
        }

        UpdateAction::Idle
    }

    fn send_skip(&self, worker: &WorkerRef) {
        self.skip_sent.borrow_mut().insert(worker.version.clone());
        match self.host.post_message(worker, ControlMessage::SkipWaiting) {
            Ok(()) => log::info!("[SW Page] Asked {} to skip waiting", worker.version),
            Err(e) => log::error!("[SW Page] {}", e),
        }
    }

    /// Update held back by [`TakeoverPolicy::Offer`], if any.
    pub fn pending_update(&self) -> Option<WorkerRef> {
        self.pending_update.borrow().clone()
    }

    /// Send the skip request for the pending update.
    pub fn apply_update(&self) -> Option<WorkerRef> {
        let worker = self.pending_update.borrow_mut().take()?;
        if self.skip_sent.borrow().contains(&worker.version) {
            return None;
        }
        self.send_skip(&worker);
        Some(worker)
    }

    /// `controllerchange` fired. Returns whether the page is reloading.
    pub fn on_controller_change(&self) -> bool {
        match self.config.reload {
            ReloadPolicy::Automatic => {
                if !self.reload_guard.try_fire() {
                    log::debug!("[SW Page] Controller changed again, reload already issued");
                    return false;
                }
                log::info!("[SW Page] New worker in control, reloading");
                if let Err(e) = self.host.reload() {
                    log::error!("[SW Page] {}", e);
                }
                true
            }
            ReloadPolicy::Manual => {
                log::info!("[SW Page] New worker in control, reload available");
                self.reload_available.set(true);
                false
            }
        }
    }

    /// Reload after a controller change under [`ReloadPolicy::Manual`].
    ///
    /// Does nothing before the controller has changed or after the page
    /// already reloaded.
    pub fn reload_now(&self) -> Result<bool, PlatformError> {
        if !self.reload_available.get() || !self.reload_guard.try_fire() {
            return Ok(false);
        }
        self.host.reload()?;
        Ok(true)
    }

    pub fn reload_available(&self) -> bool {
        self.reload_available.get() && !self.reload_guard.has_fired()
    }

    pub fn has_reloaded(&self) -> bool {
        self.reload_guard.has_fired()
    }
}
