//! Deferred completion tokens.
//!
//! A [`DeferredToken`] is the shim's side of the platform's `waitUntil`
//! contract: while it is held the worker is kept alive, and it is released
//! exactly once. Settling consumes the token; dropping an unsettled token
//! releases it as rejected, so an early return or a panic unwinding through
//! a handler can never leave the platform waiting.

use core::fmt;

use crate::events::EventKind;

/// How an extended event finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    Fulfilled,
    Rejected(String),
}

impl EventOutcome {
    pub fn is_fulfilled(&self) -> bool {
        matches!(self, EventOutcome::Fulfilled)
    }
}

type Release = Box<dyn FnOnce(EventOutcome)>;

/// Scope guard holding an event open until its async work finishes.
pub struct DeferredToken {
    kind: EventKind,
    release: Option<Release>,
}

impl DeferredToken {
    /// Hold `kind` open; `release` is invoked once with the final outcome.
    pub fn new(kind: EventKind, release: impl FnOnce(EventOutcome) + 'static) -> Self {
        Self {
            kind,
            release: Some(Box::new(release)),
        }
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn fulfill(self) {
        self.settle(EventOutcome::Fulfilled);
    }

    pub fn reject(self, reason: impl Into<String>) {
        self.settle(EventOutcome::Rejected(reason.into()));
    }

    pub fn settle(mut self, outcome: EventOutcome) {
        if let Some(release) = self.release.take() {
            release(outcome);
        }
    }
}

impl Drop for DeferredToken {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            log::warn!(
                "[SW Dispatch] {} token dropped without settling; releasing as rejected",
                self.kind
            );
            release(EventOutcome::Rejected(String::from(
                "handler exited without settling",
            )));
        }
    }
}

impl fmt::Debug for DeferredToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredToken")
            .field("kind", &self.kind)
            .field("held", &self.release.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recording(kind: EventKind) -> (DeferredToken, Rc<RefCell<Vec<EventOutcome>>>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        let token = DeferredToken::new(kind, move |outcome| sink.borrow_mut().push(outcome));
        (token, log)
    }

    #[test]
    fn test_fulfill_releases_once() {
        let (token, log) = recording(EventKind::Push);
        token.fulfill();
        assert_eq!(*log.borrow(), vec![EventOutcome::Fulfilled]);
    }

    #[test]
    fn test_reject_carries_reason() {
        let (token, log) = recording(EventKind::Install);
        token.reject("trap");
        assert_eq!(*log.borrow(), vec![EventOutcome::Rejected("trap".into())]);
    }

    #[test]
    fn test_drop_releases_as_rejected() {
        let (token, log) = recording(EventKind::Message);
        drop(token);
        let log = log.borrow();
        assert_eq!(log.len(), 1);
        assert!(!log[0].is_fulfilled());
    }
}
