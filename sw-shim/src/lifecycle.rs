//! Service Worker Lifecycle Management
//!
//! Local mirror of the platform's worker state for *this* version. It exists
//! to decide this process's own actions (requesting takeover), not to
//! duplicate the platform's bookkeeping.
//!
//! The platform may stop an idle worker and start a fresh one for the next
//! event, so a context can begin at `Parsed` while the platform already has
//! it installed. Events only the platform can route (`activate`, a page's
//! `SKIP_WAITING`) are trusted over the local phase in that case.
//!
//! The same transition may be observed twice (e.g. an `updatefound`
//! notification and a direct inspection of the registration). Re-entering
//! the current phase is a no-op, and a skip request is issued at most once
//! per version.

use crate::config::TakeoverPolicy;
use crate::error::LifecycleError;
use crate::registration::RegistrationSnapshot;
use crate::version::ProcessVersion;

/// Worker lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LifecyclePhase {
    /// Script evaluated, no install event yet
    #[default]
    Parsed,
    /// `install` event in flight
    Installing,
    /// Installed; another version still controls clients
    Waiting,
    /// `activate` event in flight
    Activating,
    /// Controlling clients
    Active,
    /// Superseded or failed; will never control clients
    Redundant,
}

/// Result of [`LifecycleStateMachine::advance`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Advanced {
        from: LifecyclePhase,
        to: LifecyclePhase,
    },
    /// Already in the requested phase.
    Unchanged,
}

/// What to do about an older active version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TakeoverDecision {
    /// Ask the platform to skip the waiting period now.
    RequestSkip,
    /// A skip was already requested for this version.
    AlreadyRequested,
    /// Policy says wait for the page to ask.
    AwaitControlMessage,
    /// Nothing to take over from, or not in a phase where skipping applies.
    NotNeeded,
}

/// Lifecycle of one worker version
#[derive(Debug, Clone)]
pub struct LifecycleStateMachine {
    version: ProcessVersion,
    phase: LifecyclePhase,
    policy: TakeoverPolicy,
    skip_requested: bool,
}

impl LifecycleStateMachine {
    pub fn new(version: ProcessVersion, policy: TakeoverPolicy) -> Self {
        Self {
            version,
            phase: LifecyclePhase::Parsed,
            policy,
            skip_requested: false,
        }
    }

    pub fn version(&self) -> &ProcessVersion {
        &self.version
    }

    pub fn phase(&self) -> LifecyclePhase {
        self.phase
    }

    pub fn skip_requested(&self) -> bool {
        self.skip_requested
    }

    /// Move to `to`. Re-entering the current phase is a no-op.
    pub fn advance(&mut self, to: LifecyclePhase) -> Result<Transition, LifecycleError> {
        let from = self.phase;
        if from == to {
            return Ok(Transition::Unchanged);
        }
        if !is_valid_transition(from, to) {
            return Err(LifecycleError::InvalidTransition { from, to });
        }

        self.phase = to;
        log::info!(
            "[SW Lifecycle] {}: {:?} -> {:?}",
            self.version,
            from,
            to
        );
        Ok(Transition::Advanced { from, to })
    }

    /// Decide whether this (waiting) version should seize control from the
    /// active one.
    pub fn takeover_decision(&mut self, snapshot: &RegistrationSnapshot) -> TakeoverDecision {
        if self.phase != LifecyclePhase::Waiting {
            return TakeoverDecision::NotNeeded;
        }
        if self.skip_requested {
            return TakeoverDecision::AlreadyRequested;
        }
        if snapshot.active.is_none() {
            return TakeoverDecision::NotNeeded;
        }

        match self.policy {
            TakeoverPolicy::Immediate => {
                self.skip_requested = true;
                TakeoverDecision::RequestSkip
            }
            TakeoverPolicy::Offer => TakeoverDecision::AwaitControlMessage,
        }
    }

    /// The page asked this version to skip waiting.
    ///
    /// The page only posts to the waiting slot, so a context restarted at
    /// `Parsed` honours the request too.
    pub fn control_skip(&mut self) -> TakeoverDecision {
        if self.skip_requested {
            return TakeoverDecision::AlreadyRequested;
        }
        match self.phase {
            LifecyclePhase::Parsed | LifecyclePhase::Installing | LifecyclePhase::Waiting => {
                self.skip_requested = true;
                TakeoverDecision::RequestSkip
            }
            _ => TakeoverDecision::NotNeeded,
        }
    }
}

/// Check if a state transition is valid
fn is_valid_transition(from: LifecyclePhase, to: LifecyclePhase) -> bool {
    use LifecyclePhase::*;

    matches!(
        (from, to),
        (Parsed, Installing)
            | (Parsed, Activating)      // Restarted after install
            | (Parsed, Redundant)       // Superseded before install
            | (Installing, Waiting)
            | (Installing, Redundant)   // Install failed
            | (Waiting, Activating)
            | (Waiting, Redundant)      // Superseded while waiting
            | (Activating, Active)
            | (Activating, Redundant)   // Activate failed or superseded
            | (Active, Redundant)       // Replaced by new worker
    )
}
