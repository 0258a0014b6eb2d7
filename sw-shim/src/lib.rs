//! KPIO Service Worker Shim
//!
//! This crate sits between a browser's service worker runtime and a processing
//! module compiled to WebAssembly. It manages installation, activation and
//! version migration of the background worker, and dispatches fetch, push,
//! notification and message events to the module only once the module has
//! finished its asynchronous construction.
//!
//! The worker side is driven through [`WorkerContext`]; the page side through
//! [`UpdateCoordinator`]. Host APIs are reached via the traits in
//! [`platform`], so a wasm-bindgen layer or an in-memory double can drive
//! either side.
//!
//! # Architecture
//!
//! - `gate`: Init Gate (memoized module construction)
//! - `lifecycle`: Lifecycle state machine for this worker version
//! - `dispatcher`: Event dispatch through the gate into the module
//! - `coordinator`: Page-side update detection and reload-once
//! - `renewer`: Push subscription renewal + registrar report
//! - `context`: Per-worker context owning gate, lifecycle and renewer
//! - `module`: Processing module boundary (entry points, loader, wasm header check)
//! - `token`: Deferred completion tokens (`waitUntil`)
//! - `events` / `registration`: Event payloads + registration snapshots
//! - `platform` / `registrar`: Host traits + `POST /register` wire format
//! - `config` / `version` / `error`: Configuration, build versions, error types

pub mod config;
pub mod context;
pub mod coordinator;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod gate;
pub mod lifecycle;
pub mod module;
pub mod platform;
pub mod registrar;
pub mod registration;
pub mod renewer;
pub mod token;
pub mod version;

pub use config::{HandledEvents, PageConfig, ReloadPolicy, ShimConfig, StartupMode, TakeoverPolicy};
pub use context::{WorkerContext, WorkerDeps};
pub use coordinator::{ReloadGuard, UpdateAction, UpdateCoordinator};
pub use dispatcher::DispatchReport;
pub use error::{
    DispatchError, HandlerError, InitError, LifecycleError, NetworkError, PlatformError,
    RegistrationError, RenewError, ShimError,
};
pub use events::{EventKind, FetchOutcome, WorkerEvent, SKIP_WAITING};
pub use gate::{GateStatus, InitGate};
pub use lifecycle::{LifecyclePhase, TakeoverDecision};
pub use module::{ModuleHandle, ModuleLoader, ModuleSource, ProcessingModule};
pub use token::{DeferredToken, EventOutcome};
pub use version::{ProcessVersion, BUILD_VERSION};
