//! Host platform seams.
//!
//! Everything the shim asks of its environment goes through these traits:
//! the worker global scope ([`WorkerPlatform`]), the page's service worker
//! container ([`PageHost`]) and the network ([`HttpClient`]). A binding
//! layer implements them over the browser APIs; tests implement them in
//! memory.

use async_trait::async_trait;
use futures_util::future::LocalBoxFuture;

use crate::error::{NetworkError, PlatformError, RegistrationError};
use crate::events::ControlMessage;
use crate::registrar::{HttpRequest, HttpResponse};
use crate::registration::{RegistrationOptions, RegistrationSnapshot, WorkerRef};
use crate::renewer::{PushSubscription, SubscribeOptions};

/// The worker global scope.
#[async_trait(?Send)]
pub trait WorkerPlatform {
    /// Current view of this worker's registration.
    fn registration(&self) -> RegistrationSnapshot;

    /// `self.skipWaiting()`
    fn skip_waiting(&self) -> Result<(), PlatformError>;

    /// `clients.claim()`
    async fn claim_clients(&self) -> Result<(), PlatformError>;

    /// `registration.pushManager.subscribe(options)`
    async fn subscribe_push(
        &self,
        options: &SubscribeOptions,
    ) -> Result<PushSubscription, PlatformError>;

    /// Run a task on the worker's event loop.
    fn spawn(&self, task: LocalBoxFuture<'static, ()>);
}

/// Outbound HTTP.
#[async_trait(?Send)]
pub trait HttpClient {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, NetworkError>;
}

/// The page's `navigator.serviceWorker` container.
#[async_trait(?Send)]
pub trait PageHost {
    /// `navigator.serviceWorker.register(script_url, options)`
    async fn register(
        &self,
        script_url: &str,
        options: &RegistrationOptions,
    ) -> Result<RegistrationSnapshot, RegistrationError>;

    /// `worker.postMessage(message)`
    fn post_message(&self, worker: &WorkerRef, message: ControlMessage)
        -> Result<(), PlatformError>;

    /// Start delivering `statechange` for `worker` to the coordinator.
    fn watch_state_changes(&self, worker: &WorkerRef);

    /// `window.location.reload()`
    fn reload(&self) -> Result<(), PlatformError>;
}
