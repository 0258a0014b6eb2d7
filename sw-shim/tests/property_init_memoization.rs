//! Property 1: Init memoization.
//!
//! For any batch of concurrently delivered events, the processing module is
//! constructed at most once per worker. When construction fails, every
//! handler observes the same failure and nothing retries it.

mod common;

use futures_util::future::join_all;
use proptest::prelude::*;

use common::*;
use kpio_sw_shim::error::{DispatchError, InitError};
use kpio_sw_shim::events::{
    MessageEvent, NotificationClickEvent, PushEvent, PushSubscriptionChangeEvent, WorkerEvent,
};
use kpio_sw_shim::{GateStatus, ShimConfig, StartupMode};

/// Domain events that all need the module.
fn arb_domain_event() -> impl Strategy<Value = WorkerEvent> {
    let text = "[a-z]{0,12}";
    (0..4u8, text).prop_map(|(tag, s)| match tag {
        0 => WorkerEvent::Push(PushEvent::from_text(&s)),
        1 => WorkerEvent::NotificationClick(NotificationClickEvent::new().with_tag(s)),
        2 => WorkerEvent::Message(MessageEvent::new(s.into_bytes(), "https://example.com")),
        _ => WorkerEvent::PushSubscriptionChange(PushSubscriptionChangeEvent::new(None)),
    })
}

fn arb_startup() -> impl Strategy<Value = StartupMode> {
    prop_oneof![Just(StartupMode::Eager), Just(StartupMode::Lazy)]
}

proptest! {
    /// Concurrent handlers share one construction.
    #[test]
    fn module_constructed_once(
        events in prop::collection::vec(arb_domain_event(), 1..16),
        startup in arb_startup(),
    ) {
        let config = ShimConfig { startup, ..Default::default() };
        let (instantiations, attempts, ready, delivered) = run_local(async move {
            let h = harness(config, FakeLoader::ready(), FakePlatform::default());
            let count = events.len();

            let dispatches = events.into_iter().map(|event| {
                let (token, _) = recorder(event.kind());
                h.ctx.dispatch(event, token)
            });
            let reports = join_all(dispatches).await;
            assert_eq!(reports.len(), count);

            (
                h.loader.instantiations(),
                h.ctx.gate().construction_attempts(),
                h.ctx.gate().status() == GateStatus::Ready,
                h.module.calls().len() == count,
            )
        });

        prop_assert_eq!(instantiations, 1);
        prop_assert_eq!(attempts, 1);
        prop_assert!(ready);
        prop_assert!(delivered);
    }

    /// A failed construction is shared, never retried.
    #[test]
    fn failure_is_shared_by_every_handler(
        events in prop::collection::vec(arb_domain_event(), 1..16),
        message in "[a-z ]{1,24}",
    ) {
        let failure = InitError::ResourceExhausted(message);
        let expected = failure.clone();

        let (instantiations, errors, module_calls) = run_local(async move {
            let config = ShimConfig { startup: StartupMode::Lazy, ..Default::default() };
            let h = harness(config, FakeLoader::failing(failure), FakePlatform::default());

            let dispatches = events.into_iter().map(|event| {
                let (token, _) = recorder(event.kind());
                h.ctx.dispatch(event, token)
            });
            let reports = join_all(dispatches).await;
            let errors: Vec<Option<DispatchError>> =
                reports.into_iter().map(|report| report.error).collect();

            (h.loader.instantiations(), errors, h.module.calls().len())
        });

        prop_assert_eq!(instantiations, 1);
        prop_assert_eq!(module_calls, 0);
        for error in errors {
            prop_assert_eq!(error, Some(DispatchError::Init(expected.clone())));
        }
    }
}
