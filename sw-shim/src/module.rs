//! Processing module seam.
//!
//! The processing module is the application logic compiled to WebAssembly.
//! The shim only needs a handle with one entry point per event kind and a
//! loader that turns a [`ModuleSource`] into that handle.

use std::rc::Rc;

use async_trait::async_trait;

use crate::context::WorkerContext;
use crate::error::{HandlerError, InitError};
use crate::events::{
    FetchEvent, FetchResponse, MessageEvent, NotificationClickEvent, PushEvent,
    PushSubscriptionChangeEvent,
};

/// WASM magic number
pub const WASM_MAGIC: [u8; 4] = [0x00, 0x61, 0x73, 0x6D]; // \0asm

/// WASM binary format version
pub const WASM_VERSION: u32 = 1;

/// Shared handle to a constructed processing module
pub type ModuleHandle = Rc<dyn ProcessingModule>;

/// Entry points exported by the processing module.
///
/// Each receives the worker context so it can reach the platform (clients,
/// caches, push manager) itself.
#[async_trait(?Send)]
pub trait ProcessingModule {
    async fn install(&self, ctx: &WorkerContext) -> Result<(), HandlerError>;

    async fn activate(&self, ctx: &WorkerContext) -> Result<(), HandlerError>;

    async fn fetch(
        &self,
        ctx: &WorkerContext,
        event: &FetchEvent,
    ) -> Result<FetchResponse, HandlerError>;

    async fn push(&self, ctx: &WorkerContext, event: &PushEvent) -> Result<(), HandlerError>;

    async fn push_subscription_change(
        &self,
        ctx: &WorkerContext,
        event: &PushSubscriptionChangeEvent,
    ) -> Result<(), HandlerError>;

    async fn notification_click(
        &self,
        ctx: &WorkerContext,
        event: &NotificationClickEvent,
    ) -> Result<(), HandlerError>;

    async fn message(&self, ctx: &WorkerContext, event: &MessageEvent)
        -> Result<(), HandlerError>;
}

/// Where the module binary comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleSource {
    /// Bytes bundled into the worker script.
    Embedded(Rc<[u8]>),
    /// Fetched from this URL at construction time.
    Remote(String),
}

impl ModuleSource {
    pub fn embedded(bytes: impl Into<Rc<[u8]>>) -> Self {
        ModuleSource::Embedded(bytes.into())
    }

    /// Short description for logs
    pub fn describe(&self) -> String {
        match self {
            ModuleSource::Embedded(bytes) => format!("embedded ({} bytes)", bytes.len()),
            ModuleSource::Remote(url) => format!("remote ({url})"),
        }
    }
}

/// Check the 8-byte WASM preamble.
pub fn validate_wasm_header(bytes: &[u8]) -> Result<(), InitError> {
    if bytes.len() < 8 {
        return Err(InitError::MalformedPayload {
            reason: format!("{} bytes is too short for a module header", bytes.len()),
        });
    }

    if bytes[0..4] != WASM_MAGIC {
        return Err(InitError::MalformedPayload {
            reason: String::from("invalid magic number"),
        });
    }

    let version = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    if version != WASM_VERSION {
        return Err(InitError::MalformedPayload {
            reason: format!("unsupported binary version {version}"),
        });
    }

    Ok(())
}

/// Host-provided module constructor.
#[async_trait(?Send)]
pub trait ModuleLoader {
    /// Fetch, compile and instantiate. Called at most once per worker.
    async fn instantiate(&self, source: &ModuleSource) -> Result<ModuleHandle, InitError>;
}

/// Validate an embedded payload, then hand it to `loader`.
pub async fn load_module(
    loader: &dyn ModuleLoader,
    source: &ModuleSource,
) -> Result<ModuleHandle, InitError> {
    if let ModuleSource::Embedded(bytes) = source {
        validate_wasm_header(bytes)?;
    }
    loader.instantiate(source).await
}
