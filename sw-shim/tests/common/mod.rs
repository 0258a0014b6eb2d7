//! In-memory host doubles shared by the integration tests.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::future::Future;
use std::rc::Rc;
use std::sync::Once;

use async_trait::async_trait;
use futures_util::future::LocalBoxFuture;
use tokio::sync::oneshot;

use kpio_sw_shim::error::{
    HandlerError, InitError, NetworkError, PlatformError, RegistrationError,
};
use kpio_sw_shim::events::{
    ControlMessage, EventKind, FetchEvent, FetchResponse, MessageEvent, NotificationClickEvent,
    PushEvent, PushSubscriptionChangeEvent,
};
use kpio_sw_shim::lifecycle::LifecyclePhase;
use kpio_sw_shim::module::{ModuleHandle, ModuleLoader, ModuleSource, ProcessingModule};
use kpio_sw_shim::platform::{HttpClient, PageHost, WorkerPlatform};
use kpio_sw_shim::registrar::{HttpRequest, HttpResponse};
use kpio_sw_shim::registration::{RegistrationOptions, RegistrationSnapshot, WorkerRef};
use kpio_sw_shim::renewer::{PushSubscription, SubscribeOptions};
use kpio_sw_shim::token::{DeferredToken, EventOutcome};
use kpio_sw_shim::version::ProcessVersion;
use kpio_sw_shim::{ShimConfig, WorkerContext, WorkerDeps};

/// Smallest valid module preamble
pub const WASM_STUB: &[u8] = b"\0asm\x01\0\0\0";

// ── Logging ──────────────────────────────────────────────────────

thread_local! {
    static RECORDS: RefCell<Vec<(log::Level, String)>> = RefCell::new(Vec::new());
}

struct CaptureLogger;

impl log::Log for CaptureLogger {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        let line = record.args().to_string();
        RECORDS.with(|records| records.borrow_mut().push((record.level(), line)));
    }

    fn flush(&self) {}
}

static LOGGER: CaptureLogger = CaptureLogger;
static INIT_LOGGER: Once = Once::new();

/// Install the capturing logger and clear this thread's records.
pub fn capture_logs() {
    INIT_LOGGER.call_once(|| {
        log::set_logger(&LOGGER).unwrap();
        log::set_max_level(log::LevelFilter::Trace);
    });
    RECORDS.with(|records| records.borrow_mut().clear());
}

/// Records logged on this thread since [`capture_logs`].
pub fn logs() -> Vec<(log::Level, String)> {
    RECORDS.with(|records| records.borrow().clone())
}

pub fn logged(level: log::Level, needle: &str) -> bool {
    logs()
        .iter()
        .any(|(lvl, line)| *lvl == level && line.contains(needle))
}

// ── Executor ─────────────────────────────────────────────────────

/// Drive `fut` on a current-thread runtime that allows `spawn_local`.
pub fn run_local<F: Future>(fut: F) -> F::Output {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    let local = tokio::task::LocalSet::new();
    local.block_on(&runtime, fut)
}

// ── Tokens ───────────────────────────────────────────────────────

pub type Outcomes = Rc<RefCell<Vec<EventOutcome>>>;

/// Token that records every release.
pub fn recorder(kind: EventKind) -> (DeferredToken, Outcomes) {
    let outcomes: Outcomes = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&outcomes);
    let token = DeferredToken::new(kind, move |outcome| sink.borrow_mut().push(outcome));
    (token, outcomes)
}

// ── Processing module ────────────────────────────────────────────

#[derive(Default)]
pub struct FakeModule {
    calls: RefCell<Vec<String>>,
    failing: RefCell<HashSet<EventKind>>,
}

impl FakeModule {
    pub fn fail_on(&self, kind: EventKind) {
        self.failing.borrow_mut().insert(kind);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }

    fn enter(&self, kind: EventKind, call: String) -> Result<(), HandlerError> {
        self.calls.borrow_mut().push(call);
        if self.failing.borrow().contains(&kind) {
            return Err(HandlerError::new(kind.platform_name(), "injected failure"));
        }
        Ok(())
    }
}

#[async_trait(?Send)]
impl ProcessingModule for FakeModule {
    async fn install(&self, _ctx: &WorkerContext) -> Result<(), HandlerError> {
        self.enter(EventKind::Install, String::from("install"))
    }

    async fn activate(&self, _ctx: &WorkerContext) -> Result<(), HandlerError> {
        self.enter(EventKind::Activate, String::from("activate"))
    }

    async fn fetch(
        &self,
        _ctx: &WorkerContext,
        event: &FetchEvent,
    ) -> Result<FetchResponse, HandlerError> {
        self.enter(EventKind::Fetch, format!("fetch:{}", event.path()))?;
        Ok(FetchResponse::new(200, b"from module".to_vec()).with_content_type("text/plain"))
    }

    async fn push(&self, _ctx: &WorkerContext, event: &PushEvent) -> Result<(), HandlerError> {
        let text = event.text().unwrap_or_default();
        self.enter(EventKind::Push, format!("push:{text}"))
    }

    async fn push_subscription_change(
        &self,
        _ctx: &WorkerContext,
        event: &PushSubscriptionChangeEvent,
    ) -> Result<(), HandlerError> {
        let endpoint = event.new_endpoint().unwrap_or("none");
        self.enter(
            EventKind::PushSubscriptionChange,
            format!("pushsubscriptionchange:{endpoint}"),
        )
    }

    async fn notification_click(
        &self,
        _ctx: &WorkerContext,
        event: &NotificationClickEvent,
    ) -> Result<(), HandlerError> {
        let tag = event.tag().unwrap_or("");
        self.enter(EventKind::NotificationClick, format!("notificationclick:{tag}"))
    }

    async fn message(
        &self,
        _ctx: &WorkerContext,
        event: &MessageEvent,
    ) -> Result<(), HandlerError> {
        let text = event.text().unwrap_or("");
        self.enter(EventKind::Message, format!("message:{text}"))
    }
}

// ── Loader ───────────────────────────────────────────────────────

pub struct FakeLoader {
    pub module: Rc<FakeModule>,
    instantiations: Cell<u32>,
    failure: Option<InitError>,
    hold: RefCell<Option<oneshot::Receiver<()>>>,
}

impl FakeLoader {
    pub fn ready() -> Self {
        Self {
            module: Rc::new(FakeModule::default()),
            instantiations: Cell::new(0),
            failure: None,
            hold: RefCell::new(None),
        }
    }

    pub fn failing(error: InitError) -> Self {
        Self {
            failure: Some(error),
            ..Self::ready()
        }
    }

    /// Construction stays pending until the sender fires.
    pub fn held(release: oneshot::Receiver<()>) -> Self {
        Self {
            hold: RefCell::new(Some(release)),
            ..Self::ready()
        }
    }

    pub fn instantiations(&self) -> u32 {
        self.instantiations.get()
    }
}

#[async_trait(?Send)]
impl ModuleLoader for FakeLoader {
    async fn instantiate(&self, _source: &ModuleSource) -> Result<ModuleHandle, InitError> {
        self.instantiations.set(self.instantiations.get() + 1);

        let hold = self.hold.borrow_mut().take();
        if let Some(release) = hold {
            let _ = release.await;
        }
        tokio::task::yield_now().await;

        match &self.failure {
            Some(error) => Err(error.clone()),
            None => {
                let module: ModuleHandle = self.module.clone();
                Ok(module)
            }
        }
    }
}

// ── Worker platform ──────────────────────────────────────────────

pub struct FakePlatform {
    pub snapshot: RefCell<RegistrationSnapshot>,
    pub skip_calls: Cell<u32>,
    pub claim_calls: Cell<u32>,
    pub subscribe_result: RefCell<Result<PushSubscription, PlatformError>>,
    pub subscribe_calls: RefCell<Vec<SubscribeOptions>>,
}

impl Default for FakePlatform {
    fn default() -> Self {
        Self {
            snapshot: RefCell::new(RegistrationSnapshot::default()),
            skip_calls: Cell::new(0),
            claim_calls: Cell::new(0),
            subscribe_result: RefCell::new(Ok(PushSubscription {
                endpoint: String::from("https://push.example/new"),
                expiration_time: None,
            })),
            subscribe_calls: RefCell::new(Vec::new()),
        }
    }
}

impl FakePlatform {
    /// Registration with `old` active.
    pub fn with_active(old: ProcessVersion) -> Self {
        let platform = Self::default();
        platform.snapshot.borrow_mut().active = Some(WorkerRef::new(old, LifecyclePhase::Active));
        platform
    }
}

#[async_trait(?Send)]
impl WorkerPlatform for FakePlatform {
    fn registration(&self) -> RegistrationSnapshot {
        self.snapshot.borrow().clone()
    }

    fn skip_waiting(&self) -> Result<(), PlatformError> {
        self.skip_calls.set(self.skip_calls.get() + 1);
        Ok(())
    }

    async fn claim_clients(&self) -> Result<(), PlatformError> {
        self.claim_calls.set(self.claim_calls.get() + 1);
        Ok(())
    }

    async fn subscribe_push(
        &self,
        options: &SubscribeOptions,
    ) -> Result<PushSubscription, PlatformError> {
        self.subscribe_calls.borrow_mut().push(options.clone());
        self.subscribe_result.borrow().clone()
    }

    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        tokio::task::spawn_local(task);
    }
}

// ── Network ──────────────────────────────────────────────────────

pub struct FakeHttp {
    pub requests: RefCell<Vec<HttpRequest>>,
    pub response: RefCell<Result<HttpResponse, NetworkError>>,
}

impl FakeHttp {
    pub fn responding(status: u16) -> Self {
        Self {
            requests: RefCell::new(Vec::new()),
            response: RefCell::new(Ok(HttpResponse { status })),
        }
    }
}

#[async_trait(?Send)]
impl HttpClient for FakeHttp {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, NetworkError> {
        self.requests.borrow_mut().push(request);
        self.response.borrow().clone()
    }
}

// ── Page host ────────────────────────────────────────────────────

pub struct FakePageHost {
    pub register_result: RefCell<Result<RegistrationSnapshot, RegistrationError>>,
    pub registered: RefCell<Vec<(String, RegistrationOptions)>>,
    pub posts: RefCell<Vec<(ProcessVersion, ControlMessage)>>,
    pub watches: RefCell<Vec<ProcessVersion>>,
    pub reloads: Cell<u32>,
}

impl FakePageHost {
    pub fn registering(snapshot: RegistrationSnapshot) -> Self {
        Self {
            register_result: RefCell::new(Ok(snapshot)),
            registered: RefCell::new(Vec::new()),
            posts: RefCell::new(Vec::new()),
            watches: RefCell::new(Vec::new()),
            reloads: Cell::new(0),
        }
    }

    pub fn rejecting(error: RegistrationError) -> Self {
        let host = Self::registering(RegistrationSnapshot::default());
        *host.register_result.borrow_mut() = Err(error);
        host
    }
}

#[async_trait(?Send)]
impl PageHost for FakePageHost {
    async fn register(
        &self,
        script_url: &str,
        options: &RegistrationOptions,
    ) -> Result<RegistrationSnapshot, RegistrationError> {
        self.registered
            .borrow_mut()
            .push((script_url.to_string(), options.clone()));
        self.register_result.borrow().clone()
    }

    fn post_message(
        &self,
        worker: &WorkerRef,
        message: ControlMessage,
    ) -> Result<(), PlatformError> {
        self.posts
            .borrow_mut()
            .push((worker.version.clone(), message));
        Ok(())
    }

    fn watch_state_changes(&self, worker: &WorkerRef) {
        self.watches.borrow_mut().push(worker.version.clone());
    }

    fn reload(&self) -> Result<(), PlatformError> {
        self.reloads.set(self.reloads.get() + 1);
        Ok(())
    }
}

/// Registration with `waiting` queued behind `active`.
pub fn waiting_behind(waiting: &ProcessVersion, active: &ProcessVersion) -> RegistrationSnapshot {
    RegistrationSnapshot {
        installing: None,
        waiting: Some(WorkerRef::new(waiting.clone(), LifecyclePhase::Waiting)),
        active: Some(WorkerRef::new(active.clone(), LifecyclePhase::Active)),
    }
}

// ── Worker harness ───────────────────────────────────────────────

pub struct Harness {
    pub ctx: Rc<WorkerContext>,
    pub module: Rc<FakeModule>,
    pub loader: Rc<FakeLoader>,
    pub platform: Rc<FakePlatform>,
    pub http: Rc<FakeHttp>,
}

/// Build a worker context. Must run inside [`run_local`] when the config
/// starts eagerly.
pub fn harness(config: ShimConfig, loader: FakeLoader, platform: FakePlatform) -> Harness {
    let loader = Rc::new(loader);
    let platform = Rc::new(platform);
    let http = Rc::new(FakeHttp::responding(200));
    let version = ProcessVersion::next(config.build_version.clone());

    let ctx = WorkerContext::start(
        config,
        version,
        ModuleSource::embedded(WASM_STUB.to_vec()),
        WorkerDeps {
            platform: platform.clone(),
            loader: loader.clone(),
            http: http.clone(),
        },
    );

    Harness {
        ctx,
        module: Rc::clone(&loader.module),
        loader,
        platform,
        http,
    }
}
