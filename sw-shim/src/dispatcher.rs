//! Event Dispatcher
//!
//! Routes each platform event through the init gate into the processing
//! module. The caller hands in the event's [`DeferredToken`]; dispatch holds
//! it for the whole async chain and settles it on every path:
//!
//! - `install` / `activate` settle `Rejected` on failure so the platform
//!   discards the version.
//! - Every other kind logs the failure and settles `Fulfilled`.
//!
//! No `RefCell` borrow of the context is held across an `.await`.

use crate::context::WorkerContext;
use crate::error::{DispatchError, LifecycleError, RenewError};
use crate::events::{
    EventKind, FetchEvent, FetchOutcome, FetchResponse, MessageEvent, NotificationClickEvent,
    PushEvent, PushSubscriptionChangeEvent, WorkerEvent,
};
use crate::lifecycle::LifecyclePhase;
use crate::token::{DeferredToken, EventOutcome};

/// What happened to one dispatched event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub kind: EventKind,
    /// Outcome the token was settled with
    pub outcome: EventOutcome,
    /// Failure that was logged, if any
    pub error: Option<DispatchError>,
    /// Answer for `fetch` events
    pub fetch: Option<FetchOutcome>,
}

impl WorkerContext {
    /// Handle one platform event and settle its token.
    pub async fn dispatch(&self, event: WorkerEvent, token: DeferredToken) -> DispatchReport {
        let kind = event.kind();
        log::debug!("[SW Dispatch] {} delivered to {}", kind, self.version());

        let mut fetch = None;
        let result = match event {
            WorkerEvent::Install => self.handle_install().await,
            WorkerEvent::Activate => self.handle_activate().await,
            WorkerEvent::Fetch(request) => {
                let (outcome, error) = self.fetch_outcome(&request).await;
                fetch = Some(outcome);
                error.map_or(Ok(()), Err)
            }
            WorkerEvent::Push(push) => self.handle_push(&push).await,
            WorkerEvent::PushSubscriptionChange(change) => {
                self.handle_push_subscription_change(change).await
            }
            WorkerEvent::NotificationClick(click) => self.handle_notification_click(&click).await,
            WorkerEvent::Message(message) => self.handle_message(&message).await,
        };

        let (outcome, error) = match result {
            Ok(()) => (EventOutcome::Fulfilled, None),
            Err(e) if kind.is_lifecycle() => {
                log::error!("[SW Dispatch] {} failed: {}", kind, e);
                (EventOutcome::Rejected(e.to_string()), Some(e))
            }
            Err(e) => {
                log::error!("[SW Dispatch] {} handler failed: {}", kind, e);
                (EventOutcome::Fulfilled, Some(e))
            }
        };

        token.settle(outcome.clone());
        DispatchReport {
            kind,
            outcome,
            error,
            fetch,
        }
    }

    fn forwards(&self, kind: EventKind) -> bool {
        self.config().handled.handles(kind)
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Wait for the module, run its install step, then enter `Waiting`.
    ///
    /// Failure leaves this version `Redundant`.
    pub async fn handle_install(&self) -> Result<(), DispatchError> {
        self.advance(LifecyclePhase::Installing)?;

        if let Err(e) = self.install_module().await {
            self.mark_redundant();
            return Err(e);
        }

        self.advance(LifecyclePhase::Waiting)?;
        self.reconcile_waiting();
        Ok(())
    }

    async fn install_module(&self) -> Result<(), DispatchError> {
        let module = self.gate.ensure_ready().await?;
        if self.forwards(EventKind::Install) {
            module.install(self).await?;
        }
        Ok(())
    }

    /// Run the module's activate step and claim clients.
    ///
    /// Refused outright for a redundant version.
    pub async fn handle_activate(&self) -> Result<(), DispatchError> {
        if self.phase() == LifecyclePhase::Redundant {
            log::warn!("[SW Lifecycle] {}: activate on a redundant version", self.version());
            return Err(LifecycleError::Redundant {
                version: self.version().to_string(),
            }
            .into());
        }

        self.advance(LifecyclePhase::Activating)?;

        if let Err(e) = self.activate_module().await {
            self.mark_redundant();
            return Err(e);
        }

        self.advance(LifecyclePhase::Active)?;
        Ok(())
    }

    async fn activate_module(&self) -> Result<(), DispatchError> {
        let module = self.gate.ensure_ready().await?;
        if self.forwards(EventKind::Activate) {
            module.activate(self).await?;
        }
        self.platform.claim_clients().await?;
        Ok(())
    }

    // ── Domain events ────────────────────────────────────────────

    /// Answer an intercepted request, or fall through to the network.
    pub async fn handle_fetch(&self, event: &FetchEvent) -> FetchOutcome {
        self.fetch_outcome(event).await.0
    }

    async fn fetch_outcome(&self, event: &FetchEvent) -> (FetchOutcome, Option<DispatchError>) {
        if !self.forwards(EventKind::Fetch) {
            return (FetchOutcome::Fallthrough, None);
        }

        match self.fetch_response(event).await {
            Ok(response) => (FetchOutcome::Respond(response), None),
            Err(e) => {
                log::warn!(
                    "[SW Dispatch] {} {} falls through: {}",
                    event.method(),
                    event.url(),
                    e
                );
                (FetchOutcome::Fallthrough, Some(e))
            }
        }
    }

    async fn fetch_response(&self, event: &FetchEvent) -> Result<FetchResponse, DispatchError> {
        let module = self.gate.ensure_ready().await?;
        Ok(module.fetch(self, event).await?)
    }

    pub async fn handle_push(&self, event: &PushEvent) -> Result<(), DispatchError> {
        let module = self.gate.ensure_ready().await?;
        module.push(self, event).await?;
        Ok(())
    }

    /// Renew the subscription, then hand the event (with the new endpoint)
    /// to the module.
    ///
    /// The module is notified even if re-subscribing failed.
    pub async fn handle_push_subscription_change(
        &self,
        mut event: PushSubscriptionChangeEvent,
    ) -> Result<(), DispatchError> {
        let options = self.subscribe_options();
        let renewed = self.renewer.renew(self.platform.as_ref(), &options).await;
        if let Ok(report) = &renewed {
            event.set_new_endpoint(report.endpoint.clone());
        }

        let module = self.gate.ensure_ready().await?;
        module.push_subscription_change(self, &event).await?;

        match renewed {
            Ok(_) => Ok(()),
            Err(RenewError::Subscribe(e)) => Err(e.into()),
        }
    }

    pub async fn handle_notification_click(
        &self,
        event: &NotificationClickEvent,
    ) -> Result<(), DispatchError> {
        let module = self.gate.ensure_ready().await?;
        module.notification_click(self, event).await?;
        Ok(())
    }

    /// `SKIP_WAITING` is consumed here; anything else goes to the module.
    pub async fn handle_message(&self, event: &MessageEvent) -> Result<(), DispatchError> {
        if event.control().is_some() {
            self.control_skip()?;
            return Ok(());
        }

        let module = self.gate.ensure_ready().await?;
        module.message(self, event).await?;
        Ok(())
    }
}
