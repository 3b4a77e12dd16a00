// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Shared state every action can reach.

use std::sync::Arc;

use derive_more::with_trait::Debug;
use parking_lot::Mutex;

use crate::{
    browser::Browser,
    engine::ActiveSut,
    event::Bus,
    store::{FailureLog, RunStore},
    sut::SutClient,
    Phase,
};

/// Execution context handed to every action.
///
/// One scope lives exactly as long as the [`Proctor`] that owns it: the
/// [run store], [failure log] and [event bus] it exposes are created
/// together and torn down together. Actions receive `&Scope`, so anything
/// they need to outlive a single phase goes through the store.
///
/// [`Proctor`]: crate::Proctor
/// [run store]: RunStore
/// [failure log]: FailureLog
/// [event bus]: Bus
#[derive(Debug)]
pub struct Scope {
    #[debug(ignore)]
    bus: Arc<Bus>,

    #[debug(ignore)]
    store: Arc<RunStore>,

    #[debug(ignore)]
    failures: Arc<FailureLog>,

    #[debug(ignore)]
    active_sut: Mutex<Option<ActiveSut>>,

    #[debug(ignore)]
    browser: Mutex<Option<Box<dyn Browser>>>,
}

impl Scope {
    /// Creates a scope with its bus, store and failure log wired together.
    pub(crate) fn new() -> Self {
        let bus = Arc::new(Bus::new());
        let store = Arc::new(RunStore::new(Arc::clone(&bus)));
        let failures = Arc::new(FailureLog::new(Arc::clone(&bus)));

        // Handler failures are recorded like any other, but silently: a
        // fresh notification about a faulty listener could recurse through
        // that same listener forever. Downgraded because the log already
        // owns the bus.
        let log = Arc::downgrade(&failures);
        bus.set_failure_sink(Box::new(move |failure| {
            if let Some(log) = log.upgrade() {
                log.push_silent(Phase::Listen, failure);
            }
        }));

        Self {
            bus,
            store,
            failures,
            active_sut: Mutex::new(None),
            browser: Mutex::new(None),
        }
    }

    /// Event bus scoped to this execution.
    #[must_use]
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Keyed storage shared by all phases of this execution.
    #[must_use]
    pub fn store(&self) -> &RunStore {
        &self.store
    }

    /// Failure log the disposal-time verdict is computed from.
    #[must_use]
    pub fn failures(&self) -> &FailureLog {
        &self.failures
    }

    /// Client bound to the live system under test, if one is up.
    ///
    /// The concrete collaborator type is recovered with
    /// [`SutClient::as_any`] on the returned handle.
    #[must_use]
    pub fn client(&self) -> Option<Arc<dyn SutClient>> {
        self.active_sut
            .lock()
            .as_ref()
            .map(|sut| Arc::clone(sut.client()))
    }

    /// Endpoint the live system under test is reachable at.
    ///
    /// `None` when nothing is up, or when the system is hosted in-process.
    #[must_use]
    pub fn endpoint(&self) -> Option<String> {
        self.active_sut
            .lock()
            .as_ref()
            .and_then(|sut| sut.endpoint().map(str::to_owned))
    }

    /// Whether a system under test is currently live.
    #[must_use]
    pub fn has_sut(&self) -> bool {
        self.active_sut.lock().is_some()
    }

    /// Whether a browser is currently open.
    #[must_use]
    pub fn has_browser(&self) -> bool {
        self.browser.lock().is_some()
    }

    /// Runs `f` on the open browser, if any.
    ///
    /// The browser stays locked for the duration of `f`; re-entering the
    /// scope's browser accessors from inside `f` would deadlock.
    pub fn with_browser<R>(&self, f: impl FnOnce(&mut dyn Browser) -> R) -> Option<R> {
        self.browser.lock().as_mut().map(|browser| f(&mut **browser))
    }

    /// Adopts a freshly spawned system, closing the previous one.
    ///
    /// At most one system is live per scope.
    pub(crate) fn adopt_sut(&self, sut: ActiveSut) {
        let previous = self.active_sut.lock().replace(sut);
        if let Some(old) = previous {
            old.dispose();
        }
    }

    /// Adopts a freshly opened browser, disposing the previous one.
    pub(crate) fn adopt_browser(&self, browser: Box<dyn Browser>) {
        let previous = self.browser.lock().replace(browser);
        if let Some(mut old) = previous {
            old.dispose();
        }
    }

    /// Tears down the live system under test, client before host.
    pub(crate) fn dispose_sut(&self) {
        let taken = self.active_sut.lock().take();
        if let Some(sut) = taken {
            sut.dispose();
        }
    }

    /// Tears down the open browser.
    pub(crate) fn dispose_browser(&self) {
        let taken = self.browser.lock().take();
        if let Some(mut browser) = taken {
            browser.dispose();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{any::Any, sync::Arc};

    use super::*;
    use crate::{
        event::StoreMutated,
        sut::{SpawnError, SutHandle},
    };

    #[test]
    fn test_new_scope_is_bare() {
        let scope = Scope::new();

        assert!(!scope.has_sut());
        assert!(!scope.has_browser());
        assert!(scope.client().is_none());
        assert!(scope.endpoint().is_none());
        assert!(scope.store().is_empty());
        assert!(scope.failures().is_empty());
    }

    #[test]
    fn test_handler_failures_are_recorded_under_listen() {
        let scope = Scope::new();
        scope.bus().subscribe(|_: &StoreMutated| panic!("listener wrong"));

        scope.store().insert("answer", 42_u32);

        let records = scope.failures().records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].phase(), Phase::Listen);
        assert!(records[0].to_string().contains("listener wrong"));
    }

    #[test]
    fn test_adopt_sut_closes_the_previous_one() {
        let scope = Scope::new();
        let first = Steps::default();
        let second = Steps::default();
        scope.adopt_sut(first.active_sut(Some("http://old")));
        scope.adopt_sut(second.active_sut(Some("http://new")));

        assert_eq!(first.taken(), vec!["client", "host"]);
        assert!(second.taken().is_empty());
        assert_eq!(scope.endpoint().as_deref(), Some("http://new"));
    }

    #[test]
    fn test_dispose_sut_releases_client_before_host() {
        let scope = Scope::new();
        let steps = Steps::default();
        scope.adopt_sut(steps.active_sut(None));

        scope.dispose_sut();

        assert_eq!(steps.taken(), vec!["client", "host"]);
        assert!(!scope.has_sut());
        // A second teardown finds nothing to do.
        scope.dispose_sut();
        assert_eq!(steps.taken(), vec!["client", "host"]);
    }

    #[test]
    fn test_adopt_browser_disposes_the_previous_one() {
        let scope = Scope::new();
        let first = Steps::default();
        let second = Steps::default();
        scope.adopt_browser(Box::new(StepBrowser(first.clone())));
        scope.adopt_browser(Box::new(StepBrowser(second.clone())));

        assert_eq!(first.taken(), vec!["browser"]);
        assert!(second.taken().is_empty());
        assert!(scope.has_browser());
    }

    #[test]
    fn test_with_browser_reaches_the_concrete_type() {
        let scope = Scope::new();
        assert_eq!(scope.with_browser(|_| ()), None);

        scope.adopt_browser(Box::new(StepBrowser(Steps::default())));

        let reached = scope
            .with_browser(|browser| browser.as_any().downcast_ref::<StepBrowser>().is_some());
        assert_eq!(reached, Some(true));
    }

    /// Shared teardown journal for the fake collaborators below.
    #[derive(Clone, Default)]
    struct Steps(Arc<Mutex<Vec<&'static str>>>);

    impl Steps {
        fn active_sut(&self, endpoint: Option<&str>) -> ActiveSut {
            ActiveSut::new(
                Box::new(StepHandle(self.clone())),
                Arc::new(StepClient(self.clone())),
                endpoint.map(str::to_owned),
            )
        }

        fn taken(&self) -> Vec<&'static str> {
            self.0.lock().clone()
        }

        fn push(&self, step: &'static str) {
            self.0.lock().push(step);
        }
    }

    struct StepHandle(Steps);

    impl SutHandle for StepHandle {
        fn create_client(&self) -> Result<Arc<dyn SutClient>, SpawnError> {
            Ok(Arc::new(StepClient(self.0.clone())))
        }

        fn close(&mut self) {
            self.0.push("host");
        }
    }

    struct StepClient(Steps);

    impl SutClient for StepClient {
        fn close(&self) {
            self.0.push("client");
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    struct StepBrowser(Steps);

    impl Browser for StepBrowser {
        fn dispose(&mut self) {
            self.0.push("browser");
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }
}
