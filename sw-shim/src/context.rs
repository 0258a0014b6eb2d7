//! Worker execution context.
//!
//! One [`WorkerContext`] is built when the worker script is evaluated and
//! passed as `Rc<WorkerContext>` to every event handler. It owns the init
//! gate, the local lifecycle mirror and the push renewer for this version.

use std::cell::RefCell;
use std::rc::Rc;

use futures_util::future::FutureExt;

use crate::config::{ShimConfig, StartupMode};
use crate::error::{LifecycleError, PlatformError};
use crate::events::EventKind;
use crate::gate::InitGate;
use crate::lifecycle::{LifecyclePhase, LifecycleStateMachine, TakeoverDecision, Transition};
use crate::module::{ModuleLoader, ModuleSource};
use crate::platform::{HttpClient, WorkerPlatform};
use crate::registrar::Registrar;
use crate::renewer::{PushSubscriptionRecord, PushSubscriptionRenewer, SubscribeOptions};
use crate::version::ProcessVersion;

/// Host services a worker context is built from
#[derive(Clone)]
pub struct WorkerDeps {
    pub platform: Rc<dyn WorkerPlatform>,
    pub loader: Rc<dyn ModuleLoader>,
    pub http: Rc<dyn HttpClient>,
}

pub struct WorkerContext {
    config: ShimConfig,
    version: ProcessVersion,
    pub(crate) gate: InitGate,
    lifecycle: RefCell<LifecycleStateMachine>,
    pub(crate) platform: Rc<dyn WorkerPlatform>,
    pub(crate) renewer: PushSubscriptionRenewer,
}

impl WorkerContext {
    /// Build the context for `version`.
    ///
    /// With [`StartupMode::Eager`] module construction is spawned right away.
    pub fn start(
        config: ShimConfig,
        version: ProcessVersion,
        source: ModuleSource,
        deps: WorkerDeps,
    ) -> Rc<Self> {
        let registrar = Registrar::new(deps.http, config.registrar_path.clone());
        let ctx = Rc::new(Self {
            gate: InitGate::new(deps.loader, source),
            lifecycle: RefCell::new(LifecycleStateMachine::new(version.clone(), config.takeover)),
            platform: deps.platform,
            renewer: PushSubscriptionRenewer::new(registrar),
            version,
            config,
        });

        log::info!(
            "[SW Lifecycle] Worker {} started ({:?} startup, {:?} takeover)",
            ctx.version,
            ctx.config.startup,
            ctx.config.takeover
        );
        if let Some(stamp) = ctx.version.stamp() {
            log::info!(
                "[SW Lifecycle] Build {} built at {}",
                stamp.package_version,
                stamp.built_at
            );
        }

        if ctx.config.startup == StartupMode::Eager {
            let signal = ctx.gate.start();
            ctx.platform.spawn(signal.map(|_| ()).boxed_local());
        }

        ctx
    }

    pub fn version(&self) -> &ProcessVersion {
        &self.version
    }

    pub fn config(&self) -> &ShimConfig {
        &self.config
    }

    pub fn phase(&self) -> LifecyclePhase {
        self.lifecycle.borrow().phase()
    }

    pub fn gate(&self) -> &InitGate {
        &self.gate
    }

    pub fn platform(&self) -> &dyn WorkerPlatform {
        self.platform.as_ref()
    }

    /// Endpoint currently believed registered, if a renewal happened.
    pub fn subscription(&self) -> Option<PushSubscriptionRecord> {
        self.renewer.record()
    }

    /// Event kinds the host should add listeners for.
    ///
    /// `install` and `activate` are always listened to; their flags only
    /// control whether the module's entry point is called.
    pub fn subscribed_events(&self) -> Vec<EventKind> {
        EventKind::ALL
            .into_iter()
            .filter(|kind| kind.is_lifecycle() || self.config.handled.handles(*kind))
            .collect()
    }

    pub(crate) fn subscribe_options(&self) -> SubscribeOptions {
        SubscribeOptions {
            user_visible_only: self.config.user_visible_only,
            application_server_key: self.config.application_server_key.clone(),
        }
    }

    pub(crate) fn advance(&self, to: LifecyclePhase) -> Result<Transition, LifecycleError> {
        self.lifecycle.borrow_mut().advance(to)
    }

    /// Inspect the registration and request takeover if this waiting
    /// version sits behind an older active one. Safe to call repeatedly.
    pub fn reconcile_waiting(&self) -> TakeoverDecision {
        let snapshot = self.platform.registration();
        log::debug!("[SW Lifecycle] {}: {}", self.version, snapshot.summary());

        let decision = self.lifecycle.borrow_mut().takeover_decision(&snapshot);
        self.act_on(decision)
    }

    /// The page posted `SKIP_WAITING`.
    pub(crate) fn control_skip(&self) -> Result<TakeoverDecision, PlatformError> {
        let decision = self.lifecycle.borrow_mut().control_skip();
        if decision == TakeoverDecision::RequestSkip {
            self.platform.skip_waiting()?;
            log::info!("[SW Lifecycle] {}: skip waiting requested by page", self.version);
        }
        Ok(decision)
    }

    fn act_on(&self, decision: TakeoverDecision) -> TakeoverDecision {
        match decision {
            TakeoverDecision::RequestSkip => match self.platform.skip_waiting() {
                Ok(()) => log::info!(
                    "[SW Lifecycle] {}: older version active, skip waiting requested",
                    self.version
                ),
                Err(e) => log::error!("[SW Lifecycle] {}: {}", self.version, e),
            },
            TakeoverDecision::AwaitControlMessage => log::info!(
                "[SW Lifecycle] {}: update ready, waiting for the page to accept it",
                self.version
            ),
            TakeoverDecision::AlreadyRequested | TakeoverDecision::NotNeeded => {}
        }
        decision
    }

    /// This version will never control clients.
    pub fn mark_redundant(&self) {
        if let Err(e) = self.advance(LifecyclePhase::Redundant) {
            log::error!("[SW Lifecycle] {}: {}", self.version, e);
        }
    }
}

impl core::fmt::Debug for WorkerContext {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WorkerContext")
            .field("version", &self.version)
            .field("phase", &self.phase())
            .field("gate", &self.gate)
            .finish()
    }
}
