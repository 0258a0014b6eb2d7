//! Shim configuration.
//!
//! Worker-side ([`ShimConfig`]) and page-side ([`PageConfig`]) settings.
//! Both deserialize from JSON with every field optional, so a host can embed
//! `{}` and get the defaults.

use serde::{Deserialize, Serialize};

use crate::error::ShimError;
use crate::events::EventKind;
use crate::registrar::REGISTER_PATH;
use crate::registration::RegistrationOptions;
use crate::version::BUILD_VERSION;

/// Script the page registers by default
pub const DEFAULT_SCRIPT_URL: &str = "/wasm/service_worker.js";

bitflags::bitflags! {
    /// Events the worker subscribes to.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct HandledEvents: u32 {
        const INSTALL = 1 << 0;
        const ACTIVATE = 1 << 1;
        const FETCH = 1 << 2;
        const PUSH = 1 << 3;
        const PUSH_SUBSCRIPTION_CHANGE = 1 << 4;
        const NOTIFICATION_CLICK = 1 << 5;
        const MESSAGE = 1 << 6;
    }
}

impl HandledEvents {
    pub fn from_kind(kind: EventKind) -> Self {
        match kind {
            EventKind::Install => HandledEvents::INSTALL,
            EventKind::Activate => HandledEvents::ACTIVATE,
            EventKind::Fetch => HandledEvents::FETCH,
            EventKind::Push => HandledEvents::PUSH,
            EventKind::PushSubscriptionChange => HandledEvents::PUSH_SUBSCRIPTION_CHANGE,
            EventKind::NotificationClick => HandledEvents::NOTIFICATION_CLICK,
            EventKind::Message => HandledEvents::MESSAGE,
        }
    }

    pub fn handles(&self, kind: EventKind) -> bool {
        self.contains(Self::from_kind(kind))
    }

    /// Handled kinds, in listener registration order.
    pub fn kinds(&self) -> Vec<EventKind> {
        EventKind::ALL
            .into_iter()
            .filter(|kind| self.handles(*kind))
            .collect()
    }
}

impl Default for HandledEvents {
    /// Everything but `fetch`: requests go to the network unless a
    /// deployment opts in.
    fn default() -> Self {
        HandledEvents::all().difference(HandledEvents::FETCH)
    }
}

/// When the processing module is constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartupMode {
    /// Start construction as soon as the worker script is evaluated.
    #[default]
    Eager,
    /// Construct on the first event that needs the module.
    Lazy,
}

/// Whether a newly installed version seizes control from an older one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TakeoverPolicy {
    /// Request skip-waiting as soon as the new version is waiting.
    #[default]
    Immediate,
    /// Wait for the page to post `SKIP_WAITING`.
    Offer,
}

/// What the page does once a new version controls it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReloadPolicy {
    /// Reload exactly once.
    #[default]
    Automatic,
    /// Expose a reload-available flag; the application decides.
    Manual,
}

/// Worker-side configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShimConfig {
    /// Build label for this version
    pub build_version: String,
    pub startup: StartupMode,
    pub takeover: TakeoverPolicy,
    pub handled: HandledEvents,
    /// Subscribe with `userVisibleOnly`
    pub user_visible_only: bool,
    /// VAPID key passed on re-subscribe
    pub application_server_key: Option<Vec<u8>>,
    /// Registrar endpoint path
    pub registrar_path: String,
}

impl Default for ShimConfig {
    fn default() -> Self {
        Self {
            build_version: String::from(BUILD_VERSION),
            startup: StartupMode::default(),
            takeover: TakeoverPolicy::default(),
            handled: HandledEvents::default(),
            user_visible_only: true,
            application_server_key: None,
            registrar_path: String::from(REGISTER_PATH),
        }
    }
}

impl ShimConfig {
    pub fn from_json(json: &str) -> Result<Self, ShimError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Page-side configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageConfig {
    pub script_url: String,
    pub registration: RegistrationOptions,
    pub takeover: TakeoverPolicy,
    pub reload: ReloadPolicy,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            script_url: String::from(DEFAULT_SCRIPT_URL),
            registration: RegistrationOptions::default(),
            takeover: TakeoverPolicy::default(),
            reload: ReloadPolicy::default(),
        }
    }
}

impl PageConfig {
    pub fn from_json(json: &str) -> Result<Self, ShimError> {
        Ok(serde_json::from_str(json)?)
    }
}
