// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Top-level fluent harness driving one test scope.

use std::{sync::Arc, thread};

use derive_more::with_trait::Debug;
use itertools::Itertools as _;

use crate::{
    browser::{BrowserFactory, BrowserOptions},
    config::Config,
    engine::{self, action, try_action, Action, Outcome, Request, SpawnSut},
    event::PhaseFinished,
    failure::{self, Failure},
    naming::{InvalidTestName, TestName},
    report::RunStats,
    scope::Scope,
    sut::{SutFactory, SutOptions},
    verdict::{Expected, PanicSink, Verdict, VerdictSink},
    Phase,
};

/// Scope-wide setup routine replayed ahead of every executable phase.
type SetupFn = dyn Fn(&Scope) -> anyhow::Result<()>;

/// Top-level fluent harness driving one test scope.
///
/// A [`Proctor`] walks a test through its phases, submitting each phase call
/// to the execution engine and folding the outcome back into the scope it
/// owns. Nothing fails mid-run: panics and errors raised by actions are
/// recorded into the scope's failure log, later phases still execute, and
/// only when the value is dropped (or [`finish()`] is called) does the
/// accumulated state collapse into a single [`Verdict`].
///
/// Phase methods are labeled invocations, not restricted transitions: any
/// phase may be invoked any number of times, in any order. Conventionally a
/// test reads top to bottom as Given, When, Then:
///
/// ```rust
/// use proctor::Proctor;
///
/// let verdict = Proctor::new("Given_AnEmptyCart_When_AddingOneItem_Then_TheTotalUpdates")
///     .given(|scope| scope.store().insert("cart", Vec::<u32>::new()))
///     .when(|scope| scope.store().insert_actual(1_u32))
///     .then(|scope| {
///         let total = scope.store().actual::<u32>().unwrap();
///         assert_eq!(*total, 1);
///     })
///     .finish();
/// assert!(verdict.is_success());
/// ```
///
/// Dropping the final value concludes the scope: resources are torn down,
/// and the default [`PanicSink`] fails the surrounding test if unchecked
/// failures remain.
///
/// [`finish()`]: Proctor::finish
#[derive(Debug)]
pub struct Proctor {
    name: TestName,
    scope: Scope,
    config: Config,
    #[debug(ignore)]
    setup: Vec<Arc<SetupFn>>,
    #[debug(ignore)]
    sink: Option<Box<dyn VerdictSink>>,
    expected: Option<Expected>,
    prepared_only: bool,
    fail_on_inconclusive: bool,
    finished: bool,
}

impl Proctor {
    /// Creates a scope named `name`.
    ///
    /// The [`test_name!`](macro@crate::test_name) macro supplies the
    /// enclosing function's name, so the test name is written exactly once.
    ///
    /// # Panics
    ///
    /// If `name` breaks the `Given_<G>_When_<W>_Then_<T>` convention (see
    /// [`TestName::parse`]). A misnamed test is an authoring error caught
    /// before the scope even exists, so nothing lands in the failure log.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        match Self::try_new(name) {
            Ok(proctor) => proctor,
            Err(err) => panic!("{err}"),
        }
    }

    /// Creates a scope named `name`, reporting a convention violation
    /// instead of panicking.
    ///
    /// # Errors
    ///
    /// If `name` breaks the naming convention.
    pub fn try_new(name: impl Into<String>) -> Result<Self, InvalidTestName> {
        let name = TestName::parse(name)?;
        tracing::debug!(name = %name, "scope starting");
        Ok(Self {
            name,
            scope: Scope::new(),
            config: Config::global().clone(),
            setup: Vec::new(),
            sink: None,
            expected: None,
            prepared_only: false,
            fail_on_inconclusive: false,
            finished: false,
        })
    }

    /// The scope this harness drives.
    #[must_use]
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Validated name of this scope.
    #[must_use]
    pub fn name(&self) -> &TestName {
        &self.name
    }

    /// Replaces the process-wide configuration for this scope only.
    #[must_use]
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Replaces the default [`PanicSink`] receiving the verdict at drop.
    #[must_use]
    pub fn with_sink(mut self, sink: impl VerdictSink + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    /// Registers a setup routine replayed before the actions of every
    /// subsequent `Given`, `When`, `Then` and `Debug` call.
    ///
    /// Setup failures are recorded like action failures, but setup alone
    /// never makes a `When` phase count as exercised.
    #[must_use]
    pub fn with_setup(
        mut self,
        setup: impl Fn(&Scope) -> anyhow::Result<()> + 'static,
    ) -> Self {
        self.setup.push(Arc::new(setup));
        self
    }

    /// Escalates an inconclusive verdict from a styled warning to a panic.
    ///
    /// Only affects the default [`PanicSink`]; a sink installed through
    /// [`with_sink()`](Proctor::with_sink) sees the verdict unchanged.
    #[must_use]
    pub fn fail_on_inconclusive(mut self) -> Self {
        self.fail_on_inconclusive = true;
        self
    }

    /// Declares that this scope is supposed to end in failure.
    ///
    /// Meta-testing support: at disposal, a failing outcome becomes the
    /// test's own success, while any other outcome becomes a failure naming
    /// both sides.
    #[must_use]
    pub fn expect_fail(mut self) -> Self {
        self.expected = Some(Expected::Fail);
        self
    }

    /// Declares that this scope is supposed to end inconclusive.
    #[must_use]
    pub fn expect_inconclusive(mut self) -> Self {
        self.expected = Some(Expected::Inconclusive);
        self
    }

    /// Runs `f` under the `Given` phase.
    ///
    /// Arranges preconditions. Like every `Given`, the action is skipped
    /// once an earlier failure is on record, since its outcome could no
    /// longer change the verdict.
    #[must_use]
    pub fn given(mut self, f: impl FnOnce(&Scope) + 'static) -> Self {
        self.submit(Phase::Given, vec![action(f)], None, true);
        self
    }

    /// Fallible twin of [`given()`](Proctor::given): a returned `Err` is
    /// recorded exactly like a panic.
    #[must_use]
    pub fn try_given(
        mut self,
        f: impl FnOnce(&Scope) -> anyhow::Result<()> + 'static,
    ) -> Self {
        self.submit(Phase::Given, vec![try_action(f)], None, true);
        self
    }

    /// Runs several `Given` actions in one phase call.
    #[must_use]
    pub fn given_all(mut self, actions: Vec<Action>) -> Self {
        self.submit(Phase::Given, actions, None, true);
        self
    }

    /// Spawns the system under test as part of the `Given` phase.
    ///
    /// The spawn is serialized process-wide and retried with backoff on
    /// [transient] errors, up to [`Config::spawn_attempts`]. On success the
    /// scope adopts the running instance, disposing any previous one first;
    /// on exhaustion or a fatal error, exactly one failure is recorded and
    /// the run carries on.
    ///
    /// [transient]: crate::sut::SpawnError::Transient
    #[must_use]
    pub fn given_sut(
        mut self,
        factory: impl SutFactory + 'static,
        options: SutOptions,
    ) -> Self {
        let SutOptions { endpoint, args } = options;
        let spawn = SpawnSut { factory: Arc::new(factory), endpoint, args };
        self.submit(Phase::Given, Vec::new(), Some(spawn), true);
        self
    }

    /// Opens a browser pointed at `url` as part of the `Given` phase.
    ///
    /// The scope adopts the session, disposing any previous one first, and
    /// closes it at teardown. An opening error is recorded like any other
    /// `Given` failure.
    #[must_use]
    pub fn given_browser_at(
        mut self,
        url: impl Into<String>,
        factory: impl BrowserFactory + 'static,
        options: BrowserOptions,
    ) -> Self {
        let url = url.into();
        let open = try_action(move |scope| {
            let browser = factory.open(&url, &options)?;
            scope.adopt_browser(browser);
            Ok(())
        });
        self.submit(Phase::Given, vec![open], None, true);
        self
    }

    /// Runs `f` under the `When` phase.
    ///
    /// Skipped once an earlier failure is on record.
    #[must_use]
    pub fn when(mut self, f: impl FnOnce(&Scope) + 'static) -> Self {
        self.submit(Phase::When, vec![action(f)], None, true);
        self
    }

    /// Fallible twin of [`when()`](Proctor::when).
    #[must_use]
    pub fn try_when(
        mut self,
        f: impl FnOnce(&Scope) -> anyhow::Result<()> + 'static,
    ) -> Self {
        self.submit(Phase::When, vec![try_action(f)], None, true);
        self
    }

    /// Runs several `When` actions in one phase call.
    #[must_use]
    pub fn when_all(mut self, actions: Vec<Action>) -> Self {
        self.submit(Phase::When, actions, None, true);
        self
    }

    /// Declares the `When` phase pending: nothing runs, a skip is logged,
    /// and the scope ends inconclusive unless that was expected.
    #[must_use]
    pub fn when_pending(mut self) -> Self {
        self.submit(Phase::When, Vec::new(), None, false);
        self
    }

    /// Runs `f` under the `Then` phase.
    ///
    /// `Then` actions execute even when earlier phases failed, so
    /// assertions stay visible, and one failing assertion never suppresses
    /// the ones after it.
    #[must_use]
    pub fn then(mut self, f: impl FnOnce(&Scope) + 'static) -> Self {
        self.submit(Phase::Then, vec![action(f)], None, true);
        self
    }

    /// Fallible twin of [`then()`](Proctor::then).
    #[must_use]
    pub fn try_then(
        mut self,
        f: impl FnOnce(&Scope) -> anyhow::Result<()> + 'static,
    ) -> Self {
        self.submit(Phase::Then, vec![try_action(f)], None, true);
        self
    }

    /// Runs several `Then` actions in one phase call.
    #[must_use]
    pub fn then_all(mut self, actions: Vec<Action>) -> Self {
        self.submit(Phase::Then, actions, None, true);
        self
    }

    /// Runs `f` under the `Debug` phase, which executes even after earlier
    /// failures. Meant for emitting extra diagnostics.
    #[must_use]
    pub fn debug(mut self, f: impl FnOnce(&Scope) + 'static) -> Self {
        self.submit(Phase::Debug, vec![action(f)], None, true);
        self
    }

    /// Fallible twin of [`debug()`](Proctor::debug).
    #[must_use]
    pub fn try_debug(
        mut self,
        f: impl FnOnce(&Scope) -> anyhow::Result<()> + 'static,
    ) -> Self {
        self.submit(Phase::Debug, vec![try_action(f)], None, true);
        self
    }

    /// Runs several `Debug` actions in one phase call.
    #[must_use]
    pub fn debug_all(mut self, actions: Vec<Action>) -> Self {
        self.submit(Phase::Debug, actions, None, true);
        self
    }

    /// Registers event listeners under the `Listen` phase.
    ///
    /// The closure typically subscribes handlers on
    /// [`Scope::bus`]. `Listen` is the one phase whose completion is not
    /// announced on the bus, so listeners never observe their own
    /// registration.
    #[must_use]
    pub fn listen(mut self, register: impl FnOnce(&Scope) + 'static) -> Self {
        self.submit(Phase::Listen, vec![action(register)], None, true);
        self
    }

    /// Declares every failure recorded so far expected.
    ///
    /// Records a `Then`-tagged failure instead when there is nothing to
    /// declare, so a wrong meta-assertion cannot silently pass.
    #[must_use]
    pub fn then_should_have_failed(self) -> Self {
        if self.scope.failures().is_empty() {
            self.record_check_mismatch(
                "expected at least one failure, but none was recorded".into(),
            );
        } else {
            let checked = self.scope.failures().check_all();
            tracing::debug!(checked, "failures declared expected");
        }
        self
    }

    /// Declares the first `expected` failures expected.
    ///
    /// Failures beyond the first `expected` stay unchecked and still fail
    /// the scope; fewer recorded than declared records a `Then`-tagged
    /// mismatch failure.
    #[must_use]
    pub fn then_should_have_failed_times(self, expected: usize) -> Self {
        let total = self.scope.failures().len();
        let checked = self.scope.failures().check_first(expected);
        tracing::debug!(expected, checked, "leading failures declared expected");
        if total < expected {
            self.record_check_mismatch(format!(
                "expected {expected} failures, but only {total} were recorded",
            ));
        }
        self
    }

    /// Declares every failure of type `E` expected.
    ///
    /// Matches both panics whose payload is an `E` and errors carrying an
    /// `E` anywhere in their chain. Records a `Then`-tagged mismatch
    /// failure when no such failure exists.
    #[must_use]
    pub fn then_should_have_failed_with<E>(self) -> Self
    where
        E: std::error::Error + 'static,
    {
        let checked = self.scope.failures().check_all_of::<E>();
        tracing::debug!(checked, "typed failures declared expected");
        if self.scope.failures().count_of::<E>() == 0 {
            self.record_check_mismatch(format!(
                "expected a failure of type `{}`, but none was recorded",
                std::any::type_name::<E>(),
            ));
        }
        self
    }

    /// Concludes the scope now and hands the verdict back.
    ///
    /// Teardown and verdict computation are exactly those of dropping the
    /// value, but the verdict is returned instead of signaled, so the
    /// caller can assert on it directly. The configured [`VerdictSink`] is
    /// bypassed.
    #[must_use]
    pub fn finish(mut self) -> Verdict {
        self.conclude()
    }

    /// Builds a request for `phase`, runs it, and folds the outcome back
    /// into the scope.
    fn submit(
        &mut self,
        phase: Phase,
        actions: Vec<Action>,
        spawn: Option<SpawnSut>,
        run_actions: bool,
    ) {
        let description = self.name.label(phase).map(ToOwned::to_owned);
        let setup: Vec<Action> = match phase {
            Phase::Given | Phase::When | Phase::Then | Phase::Debug => self
                .setup
                .iter()
                .map(|setup| {
                    let setup = Arc::clone(setup);
                    try_action(move |scope| (*setup)(scope))
                })
                .collect(),
            Phase::Listen | Phase::Dispose => Vec::new(),
        };

        let request = Request {
            phase,
            description: description.clone(),
            setup,
            actions,
            spawn,
            run_actions,
            prior_failures: self.scope.failures().len(),
        };
        let outcome = engine::run(&self.scope, &self.config, request);
        self.merge(phase, description, outcome);
    }

    /// Merges one outcome into the scope: failures into the log, a fresh
    /// system under test in place of the previous one, and a completion
    /// notification for everything but `Listen`.
    fn merge(&mut self, phase: Phase, description: Option<String>, outcome: Outcome) {
        let Outcome { failures, prepared_only, sut, elapsed } = outcome;

        let before = self.scope.failures().len();
        for failure in failures {
            self.scope.failures().push(phase, failure);
        }
        if let Some(sut) = sut {
            // Disposing the replaced instance runs collaborator code, which
            // is as entitled to fail as any action.
            if let Err(failure) = failure::catch(|| self.scope.adopt_sut(sut)) {
                self.scope.failures().push(phase, failure);
            }
        }
        let new_failures = self.scope.failures().len() - before;

        if phase == Phase::When {
            self.prepared_only = self.prepared_only || prepared_only;
        }

        if phase != Phase::Listen {
            self.scope.bus().publish(&PhaseFinished {
                phase,
                description,
                new_failures,
                elapsed,
            });
        }
    }

    /// Tears the scope down and computes the verdict. Idempotent: the
    /// second caller gets nothing to do.
    fn conclude(&mut self) -> Verdict {
        self.finished = true;

        self.submit(
            Phase::Dispose,
            vec![
                action(|scope| scope.dispose_browser()),
                action(|scope| scope.dispose_sut()),
                action(|scope| scope.store().dispose_all()),
            ],
            None,
            true,
        );

        let verdict = self.verdict();

        let stats = RunStats::global();
        for record in self.scope.failures().records() {
            stats.note_failure(record.phase());
        }
        stats.note_verdict(&verdict);

        tracing::info!(name = %self.name, %verdict, "scope concluded");
        verdict
    }

    /// Collapses the accumulated state into a verdict, applying any
    /// declared expectation last.
    fn verdict(&self) -> Verdict {
        let raw = if self.prepared_only {
            Verdict::Inconclusive(format!(
                "`{}` never received an executable When action",
                self.name,
            ))
        } else if self.scope.failures().has_unchecked() {
            Verdict::Failure(describe_unchecked(&self.scope))
        } else {
            Verdict::Success
        };

        match self.expected {
            None => raw,
            Some(expected) if expected.matches(&raw) => Verdict::Success,
            Some(expected) => Verdict::Failure(format!(
                "expected this scope to end in {expected}, but it ended in: {raw}",
            )),
        }
    }

    fn record_check_mismatch(&self, message: String) {
        let failure = Failure::error(anyhow::anyhow!(message));
        self.scope.failures().push(Phase::Then, failure);
    }
}

impl Drop for Proctor {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let verdict = self.conclude();
        if thread::panicking() {
            // Resources are released either way, but signaling now could
            // abort the process with a second panic.
            tracing::warn!(name = %self.name, %verdict, "scope dropped mid-panic");
            return;
        }
        let mut sink = self
            .sink
            .take()
            .unwrap_or_else(|| Box::new(PanicSink::new(self.fail_on_inconclusive)));
        sink.signal(&verdict);
    }
}

/// Enumerates the unchecked records driving a failure verdict.
fn describe_unchecked(scope: &Scope) -> String {
    let unchecked = scope.failures().unchecked();
    let listed = unchecked.iter().map(ToString::to_string).join("; ");
    format!("{} unchecked: {listed}", unchecked.len())
}
