// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Verdict computation and signaling.
//!
//! A scope never fails mid-run: everything is recorded, and only at disposal
//! does the accumulated state collapse into a single [`Verdict`] pushed
//! through a [`VerdictSink`] into the surrounding test infrastructure.

use std::sync::Arc;

use derive_more::with_trait::Display;
use parking_lot::Mutex;

use crate::report::Styles;

/// Final outcome of one test scope.
#[derive(Clone, Debug, Display, Eq, PartialEq)]
pub enum Verdict {
    /// Every expectation held and nothing unexpected was recorded.
    #[display("success")]
    Success,

    /// No executable action was ever supplied to the `When` phase, so the
    /// test proved nothing either way.
    #[display("inconclusive: {_0}")]
    Inconclusive(String),

    /// Unchecked failures remained, or a declared expectation was missed.
    #[display("failed: {_0}")]
    Failure(String),
}

impl Verdict {
    /// Whether this is [`Verdict::Success`].
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Whether this is [`Verdict::Inconclusive`].
    #[must_use]
    pub fn is_inconclusive(&self) -> bool {
        matches!(self, Self::Inconclusive(_))
    }

    /// Whether this is [`Verdict::Failure`].
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }
}

/// Outcome a scope declares it intends to produce.
///
/// Meta-testing support: a test asserting that a failing scenario really
/// fails calls [`Proctor::expect_fail`], and the disposal-time verdict
/// treats the matching outcome as the test's own success.
///
/// [`Proctor::expect_fail`]: crate::Proctor::expect_fail
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum Expected {
    /// The run should end with unchecked failures.
    #[display("failure")]
    Fail,

    /// The run should end prepared-only.
    #[display("inconclusive")]
    Inconclusive,
}

impl Expected {
    /// Whether `verdict` is the outcome this expectation declared.
    #[must_use]
    pub fn matches(self, verdict: &Verdict) -> bool {
        match self {
            Self::Fail => verdict.is_failure(),
            Self::Inconclusive => verdict.is_inconclusive(),
        }
    }
}

/// Receives the verdict at scope disposal.
///
/// The default is [`PanicSink`]; meta-tests install a [`RecordingSink`]
/// through [`Proctor::with_sink`] instead.
///
/// [`Proctor::with_sink`]: crate::Proctor::with_sink
pub trait VerdictSink {
    /// Signals `verdict` to the surrounding test infrastructure.
    fn signal(&mut self, verdict: &Verdict);
}

/// Default sink: fails the surrounding test by panicking.
///
/// An inconclusive run only prints a styled warning, matching how most
/// runners treat skipped work; [`PanicSink::new`] with
/// `fail_on_inconclusive` set escalates it to a panic instead.
#[derive(Clone, Copy, Debug, Default)]
pub struct PanicSink {
    fail_on_inconclusive: bool,
}

impl PanicSink {
    /// Creates the sink, escalating inconclusive runs when asked to.
    #[must_use]
    pub fn new(fail_on_inconclusive: bool) -> Self {
        Self { fail_on_inconclusive }
    }
}

impl VerdictSink for PanicSink {
    #[expect(clippy::print_stderr, reason = "warning must reach the test output")]
    fn signal(&mut self, verdict: &Verdict) {
        match verdict {
            Verdict::Success => {}
            Verdict::Inconclusive(_) => {
                if self.fail_on_inconclusive {
                    panic!("{verdict}");
                }
                let styles = Styles::new();
                eprintln!("{}", styles.skipped(verdict.to_string()));
            }
            Verdict::Failure(_) => panic!("{verdict}"),
        }
    }
}

/// Sink collecting verdicts instead of signaling them; for meta-tests.
///
/// Cloning shares the underlying storage, so a test can keep one handle
/// while moving the other into the scope.
#[derive(Clone, Debug, Default)]
pub struct RecordingSink {
    seen: Arc<Mutex<Vec<Verdict>>>,
}

impl RecordingSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Verdicts signaled so far, in order.
    #[must_use]
    pub fn verdicts(&self) -> Vec<Verdict> {
        self.seen.lock().clone()
    }
}

impl VerdictSink for RecordingSink {
    fn signal(&mut self, verdict: &Verdict) {
        self.seen.lock().push(verdict.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expected_matches() {
        let failure = Verdict::Failure("boom".into());
        let inconclusive = Verdict::Inconclusive("prepared only".into());

        assert!(Expected::Fail.matches(&failure));
        assert!(!Expected::Fail.matches(&inconclusive));
        assert!(!Expected::Fail.matches(&Verdict::Success));
        assert!(Expected::Inconclusive.matches(&inconclusive));
        assert!(!Expected::Inconclusive.matches(&Verdict::Success));
    }

    #[test]
    #[should_panic(expected = "failed: 2 unchecked")]
    fn test_panic_sink_panics_on_failure() {
        PanicSink::default().signal(&Verdict::Failure("2 unchecked failures".into()));
    }

    #[test]
    fn test_panic_sink_passes_inconclusive_by_default() {
        PanicSink::default().signal(&Verdict::Inconclusive("prepared only".into()));
    }

    #[test]
    #[should_panic(expected = "inconclusive")]
    fn test_panic_sink_escalates_inconclusive_when_configured() {
        PanicSink::new(true).signal(&Verdict::Inconclusive("prepared only".into()));
    }

    #[test]
    fn test_recording_sink_shares_storage_across_clones() {
        let sink = RecordingSink::new();
        let mut moved = sink.clone();
        moved.signal(&Verdict::Success);
        moved.signal(&Verdict::Failure("boom".into()));

        let verdicts = sink.verdicts();
        assert_eq!(verdicts.len(), 2);
        assert!(verdicts[0].is_success());
        assert!(verdicts[1].is_failure());
    }
}
