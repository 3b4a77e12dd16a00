use proctor::{Proctor, RecordingSink, RunStats};

#[test]
fn run_statistics_aggregate_across_scopes() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let stats = RunStats::global();
    stats.reset();

    let passing = Proctor::new("Given_AHealthyRun_When_Counted_Then_ItLandsInPassed")
        .given(|_| {})
        .when(|scope| scope.store().insert_actual(1_u8))
        .then(|_| {})
        .finish();
    assert!(passing.is_success());

    {
        let _failing =
            Proctor::new("Given_ABrokenStep_When_Counted_Then_ItLandsInFailed")
                .with_sink(RecordingSink::new())
                .given(|_| panic!("kaboom"))
                .when(|_| {})
                .then(|_| {});
    }

    let pending =
        Proctor::new("Given_AnUnwrittenAct_When_Counted_Then_ItLandsInInconclusive")
            .given(|_| {})
            .when_pending()
            .then(|_| {})
            .finish();
    assert!(pending.is_inconclusive());

    let snapshot = stats.snapshot();
    assert_eq!(snapshot.passed, 1);
    assert_eq!(snapshot.failed, 1);
    assert_eq!(snapshot.inconclusive, 1);
    assert_eq!(snapshot.total(), 3);
    assert_eq!(snapshot.failures_by_phase.get("Given"), Some(&1));

    let json = snapshot.to_json().unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed["passed"], 1);
    assert_eq!(parsed["failed"], 1);
    assert_eq!(parsed["inconclusive"], 1);
    assert_eq!(parsed["failures_by_phase"]["Given"], 1);
}
