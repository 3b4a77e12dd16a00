use std::sync::Arc;

use derive_more::with_trait::{Display, Error};
use parking_lot::Mutex;
use proctor::{
    action, Failure, FailureLogged, Phase, Proctor, StoreMutated, Verdict,
};

#[test]
fn grouped_failures_flatten_into_cover_plus_leaves() {
    let heard = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&heard);

    let verdict =
        Proctor::new("Given_AListener_When_AGroupIsRecorded_Then_OneNoticeCoversIt")
            .listen(move |scope| {
                scope.bus().subscribe(move |logged: &FailureLogged| {
                    sink.lock().push((
                        logged.covers,
                        logged.total,
                        logged.message.clone(),
                    ));
                });
            })
            .given(|_| {})
            .when(|scope| {
                scope.failures().push(
                    Phase::When,
                    Failure::grouped(vec![
                        Failure::error(anyhow::anyhow!("left wing down")),
                        Failure::error(anyhow::anyhow!("right wing down")),
                    ]),
                );
            })
            .then_should_have_failed_times(2)
            .finish();

    assert!(verdict.is_success());

    let heard = heard.lock();
    let shape: Vec<_> =
        heard.iter().map(|(covers, total, _)| (*covers, *total)).collect();
    assert_eq!(shape, [(2, 2), (1, 1), (1, 2)]);
    assert_eq!(heard[0].2, "[When] left wing down; [When] right wing down");
}

#[test]
fn action_failures_announce_one_record_each() {
    let heard = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&heard);

    let proctor =
        Proctor::new("Given_AListener_When_TwoActsFail_Then_EachIsAnnounced")
            .listen(move |scope| {
                scope.bus().subscribe(move |logged: &FailureLogged| {
                    sink.lock().push((logged.phase, logged.covers));
                });
            })
            .given(|_| {})
            .when_all(vec![
                action(|_| panic!("first wobble")),
                action(|_| panic!("second wobble")),
            ])
            .then_should_have_failed_times(2);

    assert_eq!(*heard.lock(), [(Phase::When, 1), (Phase::When, 1)]);
    assert!(proctor.finish().is_success());
}

#[test]
fn failures_beyond_the_declared_count_still_fail_the_scope() {
    let proctor =
        Proctor::new("Given_TwoFaults_When_OnlyOneIsDeclared_Then_TheOtherStillCounts")
            .given_all(vec![
                action(|_| panic!("first wobble")),
                action(|_| panic!("second wobble")),
            ])
            .when(|_| {})
            .then_should_have_failed_times(1);

    let records = proctor.scope().failures().records();
    assert_eq!(records.len(), 2);
    assert!(records[0].is_checked());
    assert!(!records[1].is_checked());

    match proctor.finish() {
        Verdict::Failure(message) => {
            assert!(message.contains("1 unchecked"), "message: {message}");
            assert!(message.contains("second wobble"), "message: {message}");
        }
        other => panic!("expected a failure verdict, got {other}"),
    }
}

#[test]
fn typed_panic_payloads_match_the_typed_check() {
    let verdict =
        Proctor::new("Given_ATypedFault_When_ThrownAsAPanic_Then_TheTypeMatches")
            .given(|_| {})
            .when(|_| std::panic::panic_any(Timeout))
            .then_should_have_failed_with::<Timeout>()
            .finish();

    assert!(verdict.is_success());
}

#[test]
fn wrapped_errors_still_match_their_type() {
    let verdict =
        Proctor::new("Given_ATypedFault_When_WrappedInContext_Then_TheTypeMatches")
            .given(|_| {})
            .try_when(|_| {
                Err(anyhow::Error::new(Timeout).context("calling the backend"))
            })
            .then_should_have_failed_with::<Timeout>()
            .finish();

    assert!(verdict.is_success());
}

#[test]
fn claiming_an_absent_failure_type_is_recorded() {
    let proctor =
        Proctor::new("Given_NoFaults_When_ClaimingATypedOne_Then_TheClaimIsOnRecord")
            .given(|_| {})
            .when(|_| {})
            .then_should_have_failed_with::<Timeout>();

    let records = proctor.scope().failures().records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].phase(), Phase::Then);
    assert!(
        records[0].to_string().contains("Timeout"),
        "record: {}",
        records[0],
    );
    assert!(proctor.finish().is_failure());
}

#[test]
fn a_panicking_listener_is_recorded_without_recursion() {
    let proctor =
        Proctor::new("Given_AFaultyListener_When_AnEventFires_Then_ItIsOnRecord")
            .listen(|scope| {
                scope.bus().subscribe(|_: &StoreMutated| panic!("listener exploded"));
            })
            .given(|scope| scope.store().insert("poke", 1_u8))
            .when(|_| {})
            .then(|_| {});

    let records = proctor.scope().failures().records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].phase(), Phase::Listen);
    assert!(
        records[0].to_string().contains("listener exploded"),
        "record: {}",
        records[0],
    );
    assert!(proctor.finish().is_failure());
}

#[derive(Debug, Display, Error)]
#[display("the request timed out")]
struct Timeout;
