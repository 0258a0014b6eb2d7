//! Process versions.
//!
//! Every deployed worker build is identified by a [`ProcessVersion`]. The
//! install order is the identity: it increases monotonically within a
//! process and is never reused there. It keys per-version bookkeeping such
//! as "skip already requested"; which registration slot a worker occupies,
//! not its number, decides takeover. The build label is opaque and only
//! used for diagnostics.

use core::cmp::Ordering as CmpOrdering;
use core::fmt;
use core::hash::{Hash, Hasher};
use core::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Next install order to hand out
static NEXT_INSTALL_ORDER: AtomicU64 = AtomicU64::new(1);

/// Build label embedded at compile time.
///
/// Set `SW_SHIM_BUILD_VERSION` when compiling the worker bundle; falls back
/// to the crate version.
pub const BUILD_VERSION: &str = match option_env!("SW_SHIM_BUILD_VERSION") {
    Some(version) => version,
    None => env!("CARGO_PKG_VERSION"),
};

/// One deployed build of the background process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessVersion {
    install_order: u64,
    build: String,
}

impl ProcessVersion {
    /// Allocate the next version in install order.
    pub fn next(build: impl Into<String>) -> Self {
        Self {
            install_order: NEXT_INSTALL_ORDER.fetch_add(1, Ordering::SeqCst),
            build: build.into(),
        }
    }

    /// Rebuild a version the host already numbered.
    ///
    /// Later [`ProcessVersion::next`] calls never hand out `install_order`
    /// again.
    pub fn from_parts(install_order: u64, build: impl Into<String>) -> Self {
        NEXT_INSTALL_ORDER.fetch_max(install_order.saturating_add(1), Ordering::SeqCst);
        Self {
            install_order,
            build: build.into(),
        }
    }

    pub fn install_order(&self) -> u64 {
        self.install_order
    }

    /// Opaque build label.
    pub fn build(&self) -> &str {
        &self.build
    }

    /// Parsed build stamp, when the label has the `<semver>_<timestamp>` shape.
    pub fn stamp(&self) -> Option<BuildStamp> {
        BuildStamp::parse(&self.build)
    }
}

impl PartialEq for ProcessVersion {
    fn eq(&self, other: &Self) -> bool {
        self.install_order == other.install_order
    }
}

impl Eq for ProcessVersion {}

impl Hash for ProcessVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.install_order.hash(state);
    }
}

impl PartialOrd for ProcessVersion {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for ProcessVersion {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        self.install_order.cmp(&other.install_order)
    }
}

impl fmt::Display for ProcessVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.build, self.install_order)
    }
}

/// Length of the `YYYYmmddHHMMSS` suffix
const TIMESTAMP_LEN: usize = 14;

/// Package version and build time carried by a stamped build label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildStamp {
    /// Package semver, e.g. `0.3.1`.
    pub package_version: String,
    /// Build time as `YYYYmmddHHMMSS`.
    pub built_at: String,
}

impl BuildStamp {
    /// Parse `0.3.1_20240131235959`. Anything else is `None`.
    pub fn parse(label: &str) -> Option<Self> {
        let (package_version, built_at) = label.rsplit_once('_')?;
        if package_version.is_empty()
            || built_at.len() != TIMESTAMP_LEN
            || !built_at.bytes().all(|b| b.is_ascii_digit())
        {
            return None;
        }
        Some(Self {
            package_version: package_version.to_string(),
            built_at: built_at.to_string(),
        })
    }
}
