//! Service Worker Registration
//!
//! What a page or worker can observe about a registration: the installing,
//! waiting and active workers, plus the options the page registers with.

use serde::{Deserialize, Serialize};

use crate::lifecycle::LifecyclePhase;
use crate::version::ProcessVersion;

/// Service Worker scope
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Scope(String);

impl Scope {
    /// Create a new scope
    pub fn new(path: impl Into<String>) -> Self {
        let mut path = path.into();
        if !path.ends_with('/') {
            path.push('/');
        }
        Self(path)
    }

    /// Get the path
    pub fn path(&self) -> &str {
        &self.0
    }

}

impl Default for Scope {
    fn default() -> Self {
        Self::new("/")
    }
}

impl From<String> for Scope {
    fn from(path: String) -> Self {
        Self::new(path)
    }
}

impl From<Scope> for String {
    fn from(scope: Scope) -> Self {
        scope.0
    }
}

/// How the platform loads the worker script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerType {
    /// Plain script. The worker performs its own module loading internally.
    #[default]
    Classic,
    /// ES module worker.
    Module,
}

impl WorkerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerType::Classic => "classic",
            WorkerType::Module => "module",
        }
    }
}

/// Options passed to `navigator.serviceWorker.register`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationOptions {
    pub scope: Scope,
    #[serde(rename = "type")]
    pub worker_type: WorkerType,
}

/// A worker slot of a registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerRef {
    pub version: ProcessVersion,
    pub phase: LifecyclePhase,
}

impl WorkerRef {
    pub fn new(version: ProcessVersion, phase: LifecyclePhase) -> Self {
        Self { version, phase }
    }
}

/// Point-in-time view of a registration's installing/waiting/active slots.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RegistrationSnapshot {
    pub installing: Option<WorkerRef>,
    pub waiting: Option<WorkerRef>,
    pub active: Option<WorkerRef>,
}

impl RegistrationSnapshot {
    /// The waiting worker, when another one is still active.
    ///
    /// The platform only ever queues a newer build in the waiting slot, so
    /// slot presence decides; install orders from different processes are
    /// not comparable.
    pub fn needs_update(&self) -> Option<&WorkerRef> {
        match (&self.waiting, &self.active) {
            (Some(waiting), Some(_)) => Some(waiting),
            _ => None,
        }
    }

    /// Something is waiting but nothing is installing: an `updatefound`
    /// notification may have been missed.
    pub fn missed_update(&self) -> bool {
        self.installing.is_none() && self.waiting.is_some()
    }

    /// Diagnostics line logged on every inspection.
    pub fn summary(&self) -> String {
        format!(
            "waiting={}, installing={}, active={}",
            self.waiting.is_some(),
            self.installing.is_some(),
            self.active.is_some()
        )
    }
}
