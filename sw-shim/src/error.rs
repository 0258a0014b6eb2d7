//! Error taxonomy for the shim.
//!
//! Worker-side failures split into construction failures ([`InitError`]),
//! entry point failures ([`HandlerError`]) and best-effort network failures
//! ([`NetworkError`]). Page-side registration failures are
//! [`RegistrationError`]. None of them is allowed to escape a handler: the
//! dispatcher and coordinator log them and settle the outer event.

use crate::lifecycle::LifecyclePhase;

/// Processing module construction failed.
///
/// Terminal for the worker instance. The value is captured by the init gate
/// and handed to every waiter, hence `Clone`.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum InitError {
    #[error("malformed module payload: {reason}")]
    MalformedPayload { reason: String },

    #[error("module instantiation trapped: {message}")]
    Trap { message: String },

    #[error("resources exhausted while constructing module: {0}")]
    ResourceExhausted(String),

    #[error("module source unavailable: {0}")]
    SourceUnavailable(String),
}

/// A processing module entry point failed for one event.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{entry} handler failed: {message}")]
pub struct HandlerError {
    /// Entry point name (`install`, `push`, ...).
    pub entry: &'static str,
    /// Failure description reported by the module.
    pub message: String,
}

impl HandlerError {
    pub fn new(entry: &'static str, message: impl Into<String>) -> Self {
        Self {
            entry,
            message: message.into(),
        }
    }
}

/// Registrar notification failed. Best-effort only.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("registrar request failed: {0}")]
    Transport(String),

    #[error("registrar responded with status {status}")]
    Status { status: u16 },

    #[error("failed to encode registrar request: {0}")]
    Encode(String),
}

/// Page-side worker registration failed.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("service workers are not available in this context")]
    Unsupported,

    #[error("registration of {script_url} rejected: {reason}")]
    Rejected { script_url: String, reason: String },
}

/// Worker lifecycle violation.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("invalid lifecycle transition {from:?} -> {to:?}")]
    InvalidTransition {
        from: LifecyclePhase,
        to: LifecyclePhase,
    },

    #[error("version {version} is redundant")]
    Redundant { version: String },
}

/// A host platform call (skip waiting, claim, subscribe, reload) failed.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{operation} failed: {reason}")]
pub struct PlatformError {
    pub operation: &'static str,
    pub reason: String,
}

impl PlatformError {
    pub fn new(operation: &'static str, reason: impl Into<String>) -> Self {
        Self {
            operation,
            reason: reason.into(),
        }
    }
}

/// Push subscription renewal failed before anything was reported.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RenewError {
    #[error("re-subscribe failed: {0}")]
    Subscribe(#[source] PlatformError),
}

/// Anything that can stop a single event dispatch.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error(transparent)]
    Init(#[from] InitError),

    #[error(transparent)]
    Handler(#[from] HandlerError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error(transparent)]
    Platform(#[from] PlatformError),
}

/// Crate-level error.
#[derive(thiserror::Error, Debug)]
pub enum ShimError {
    // ── Worker side ──────────────────────────────────────────────

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Renew(#[from] RenewError),

    #[error(transparent)]
    Network(#[from] NetworkError),

    // ── Page side ────────────────────────────────────────────────

    #[error(transparent)]
    Registration(#[from] RegistrationError),

    // ── Host supplied input ──────────────────────────────────────

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}
