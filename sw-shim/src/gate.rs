//! Init Gate
//!
//! Wraps construction of the processing module behind one memoized
//! completion signal. Every handler awaits the same [`InitFuture`]; the first
//! caller (or eager startup) creates it, and its outcome is captured for the
//! lifetime of the worker. A failed construction is never retried.

use std::cell::{Cell, OnceCell};
use std::rc::Rc;

use futures_util::future::{FutureExt, LocalBoxFuture, Shared};

use crate::error::InitError;
use crate::module::{load_module, ModuleHandle, ModuleLoader, ModuleSource};

/// Shared construction future. Cloning it is cheap; all clones resolve to
/// the same outcome.
pub type InitFuture = Shared<LocalBoxFuture<'static, Result<ModuleHandle, InitError>>>;

/// Observable state of the gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateStatus {
    /// Nobody asked for the module yet
    NotStarted,
    /// Construction in progress
    Pending,
    /// Module constructed
    Ready,
    /// Construction failed; terminal
    Failed(InitError),
}

/// Memoized processing module construction
pub struct InitGate {
    loader: Rc<dyn ModuleLoader>,
    source: ModuleSource,
    signal: OnceCell<InitFuture>,
    attempts: Cell<u32>,
}

impl InitGate {
    pub fn new(loader: Rc<dyn ModuleLoader>, source: ModuleSource) -> Self {
        Self {
            loader,
            source,
            signal: OnceCell::new(),
            attempts: Cell::new(0),
        }
    }

    /// Get the construction future, creating it on first call.
    pub fn start(&self) -> InitFuture {
        self.signal
            .get_or_init(|| {
                self.attempts.set(self.attempts.get() + 1);
                let loader = Rc::clone(&self.loader);
                let source = self.source.clone();

                async move {
                    log::info!(
                        "[SW Gate] Constructing processing module from {}",
                        source.describe()
                    );
                    let result = load_module(loader.as_ref(), &source).await;
                    match &result {
                        Ok(_) => log::info!("[SW Gate] Processing module ready"),
                        Err(e) => log::error!("[SW Gate] Processing module failed: {}", e),
                    }
                    result
                }
                .boxed_local()
                .shared()
            })
            .clone()
    }

    /// Wait until the module is constructed.
    ///
    /// Starts construction if nothing has yet. Every caller sees the same
    /// outcome.
    pub async fn ensure_ready(&self) -> Result<ModuleHandle, InitError> {
        self.start().await
    }

    pub fn status(&self) -> GateStatus {
        match self.signal.get() {
            None => GateStatus::NotStarted,
            Some(signal) => match signal.peek() {
                None => GateStatus::Pending,
                Some(Ok(_)) => GateStatus::Ready,
                Some(Err(e)) => GateStatus::Failed(e.clone()),
            },
        }
    }

    /// How many construction futures were created (0 or 1).
    pub fn construction_attempts(&self) -> u32 {
        self.attempts.get()
    }
}

impl core::fmt::Debug for InitGate {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InitGate")
            .field("source", &self.source)
            .field("status", &self.status())
            .finish()
    }
}
