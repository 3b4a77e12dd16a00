use std::sync::Arc;

use parking_lot::Mutex;
use proctor::{action, test_name, try_action, Proctor, StoreMutated};

#[test]
#[allow(non_snake_case)]
fn Given_AnEmptyCart_When_AddingOneItem_Then_TheTotalUpdates() {
    let _proctor = Proctor::new(test_name!())
        .given(|scope| scope.store().insert("cart", Vec::<u32>::new()))
        .when(|scope| {
            let cart = scope.store().read::<Vec<u32>>("cart").unwrap();
            scope.store().insert_actual(cart.len() + 1);
        })
        .then(|scope| {
            let total = scope.store().actual::<usize>().unwrap();
            assert_eq!(*total, 1);
        });
}

#[test]
fn store_writes_are_announced_in_order() {
    let writes = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&writes);

    let verdict = Proctor::new("Given_AListener_When_WritingTwice_Then_BothWritesWereHeard")
        .listen(move |scope| {
            scope.bus().subscribe(move |mutated: &StoreMutated| {
                seen.lock().push((mutated.key.clone(), mutated.is_new));
            });
        })
        .given(|scope| scope.store().insert("slot", 1_u8))
        .when(|scope| scope.store().insert("slot", 2_u8))
        .then(|scope| assert_eq!(*scope.store().read::<u8>("slot").unwrap(), 2))
        .finish();

    assert!(verdict.is_success());
    assert_eq!(
        *writes.lock(),
        [("slot".to_owned(), true), ("slot".to_owned(), false)],
    );
}

#[test]
fn teardown_runs_in_reverse_insertion_order() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let first = Arc::clone(&order);
    let second = Arc::clone(&order);

    let verdict = Proctor::new("Given_TwoResources_When_TheScopeEnds_Then_TheyCloseInReverse")
        .given(move |scope| {
            scope.store().insert_teardown("first", 1_u8, move |_| {
                first.lock().push("first");
            });
        })
        .when(move |scope| {
            scope.store().insert_teardown("second", 2_u8, move |_| {
                second.lock().push("second");
            });
        })
        .then(|_| {})
        .finish();

    assert!(verdict.is_success());
    assert_eq!(*order.lock(), ["second", "first"]);
}

#[test]
fn action_groups_run_in_order() {
    let journal = Arc::new(Mutex::new(Vec::new()));
    let arrange = Arc::clone(&journal);
    let prepare = Arc::clone(&journal);
    let act = Arc::clone(&journal);

    let verdict = Proctor::new("Given_SeveralSteps_When_GroupedInOnePhase_Then_TheyRanInOrder")
        .given_all(vec![
            action(move |_| arrange.lock().push("arrange")),
            try_action(move |scope| {
                prepare.lock().push("prepare");
                scope.store().insert("ready", true);
                Ok(())
            }),
        ])
        .when(move |_| act.lock().push("act"))
        .then(|scope| assert!(*scope.store().read::<bool>("ready").unwrap()))
        .finish();

    assert!(verdict.is_success());
    assert_eq!(*journal.lock(), ["arrange", "prepare", "act"]);
}

#[test]
fn recorded_error_can_be_declared_expected() {
    let verdict = Proctor::new("Given_Nothing_When_AnActFails_Then_TheFailureWasDeclared")
        .given(|_| {})
        .try_when(|_| Err(anyhow::anyhow!("deliberate")))
        .then_should_have_failed_times(1)
        .finish();

    assert!(verdict.is_success());
}

#[test]
fn anonymous_values_are_found_by_type() {
    #[derive(Debug, PartialEq)]
    struct Token(&'static str);

    let verdict = Proctor::new("Given_AnAnonymousValue_When_ReadBack_Then_ItIsFoundByType")
        .given(|scope| {
            scope.store().insert_anonymous(Token("abc"));
        })
        .when(|scope| {
            let token = scope.store().read_single::<Token>().unwrap();
            scope.store().insert_actual(token.0);
        })
        .then(|scope| {
            assert_eq!(*scope.store().actual::<&'static str>().unwrap(), "abc");
        })
        .finish();

    assert!(verdict.is_success());
}

#[test]
fn setup_reruns_before_every_executable_phase() {
    let counter = Arc::new(Mutex::new(0_u32));
    let bumps = Arc::clone(&counter);

    let verdict = Proctor::new("Given_SharedSetup_When_PhasesRun_Then_EachSawFreshState")
        .with_setup(move |_| {
            *bumps.lock() += 1;
            Ok(())
        })
        .given(|_| {})
        .when(|_| {})
        .then(|_| {})
        .finish();

    assert!(verdict.is_success());
    assert_eq!(*counter.lock(), 3);
}
