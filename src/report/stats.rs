// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Process-wide outcome statistics.

use std::{
    collections::BTreeMap,
    io,
    sync::atomic::{AtomicUsize, Ordering},
};

use itertools::Itertools as _;
use once_cell::sync::Lazy;
use parking_lot::Mutex;

use crate::{config::Config, verdict::Verdict, Phase};

use super::{Output, Styles, WriteStrExt as _};

/// Aggregated verdict and failure counters.
///
/// Every scope reports into [`RunStats::global`] as it finishes, so a suite
/// can render one summary at the end no matter how the surrounding test
/// runner shuffles or parallelizes individual tests. Custom listeners may
/// also keep a private instance and feed it from bus notifications.
#[derive(Debug, Default)]
pub struct RunStats {
    passed: AtomicUsize,
    failed: AtomicUsize,
    inconclusive: AtomicUsize,
    failures: Mutex<BTreeMap<Phase, usize>>,
}

impl RunStats {
    /// The process-wide statistics registry.
    pub fn global() -> &'static Self {
        static GLOBAL: Lazy<RunStats> = Lazy::new(RunStats::default);
        &GLOBAL
    }

    /// Fresh, empty statistics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one finished scope by its verdict.
    pub fn note_verdict(&self, verdict: &Verdict) {
        let counter = match verdict {
            Verdict::Success => &self.passed,
            Verdict::Inconclusive(_) => &self.inconclusive,
            Verdict::Failure(_) => &self.failed,
        };
        counter.fetch_add(1, Ordering::SeqCst);
    }

    /// Counts one recorded failure under its phase.
    pub fn note_failure(&self, phase: Phase) {
        *self.failures.lock().entry(phase).or_default() += 1;
    }

    /// Point-in-time copy of the counters.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            passed: self.passed.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
            inconclusive: self.inconclusive.load(Ordering::SeqCst),
            failures_by_phase: self
                .failures
                .lock()
                .iter()
                .map(|(phase, count)| (phase.to_string(), *count))
                .collect(),
        }
    }

    /// Zeroes all counters.
    pub fn reset(&self) {
        self.passed.store(0, Ordering::SeqCst);
        self.failed.store(0, Ordering::SeqCst);
        self.inconclusive.store(0, Ordering::SeqCst);
        self.failures.lock().clear();
    }

    /// Renders a styled summary into `out`.
    ///
    /// # Errors
    ///
    /// If writing into `out` fails.
    pub fn render(&self, styles: &Styles, out: &mut impl io::Write) -> io::Result<()> {
        let snapshot = self.snapshot();

        out.write_line(styles.bold(styles.header("[Summary]")))?;

        let scopes = styles.maybe_plural("scope", snapshot.total());
        let breakdown = [
            (snapshot.passed > 0)
                .then(|| styles.bold(styles.ok(format!("{} passed", snapshot.passed)))),
            (snapshot.inconclusive > 0).then(|| {
                styles.bold(styles.skipped(format!("{} inconclusive", snapshot.inconclusive)))
            }),
            (snapshot.failed > 0)
                .then(|| styles.bold(styles.err(format!("{} failed", snapshot.failed)))),
        ]
        .into_iter()
        .flatten()
        .join(&styles.bold(", "));

        if breakdown.is_empty() {
            out.write_line(scopes)?;
        } else {
            out.write_line(format!("{scopes} ({breakdown})"))?;
        }

        if !snapshot.failures_by_phase.is_empty() {
            let by_phase = snapshot
                .failures_by_phase
                .iter()
                .map(|(phase, count)| format!("{phase}: {count}"))
                .join(", ");
            out.write_line(styles.err(format!("failures by phase: {by_phase}")))?;
        }

        Ok(())
    }

    /// Prints the styled summary to standard output, colored according to
    /// the global configuration.
    pub fn print_summary(&self) {
        let mut styles = Styles::new();
        styles.apply_coloring(Config::global().color);
        let mut out = Output::stdout();
        if let Err(err) = self.render(&styles, &mut out) {
            tracing::error!(%err, "failed to print the summary");
        }
    }
}

/// Point-in-time copy of [`RunStats`] counters.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "output-json", derive(serde::Serialize))]
pub struct StatsSnapshot {
    /// Scopes that ended in success.
    pub passed: usize,

    /// Scopes that ended in failure.
    pub failed: usize,

    /// Scopes that ended inconclusive.
    pub inconclusive: usize,

    /// Recorded failures, keyed by the phase they were recorded under.
    pub failures_by_phase: BTreeMap<String, usize>,
}

impl StatsSnapshot {
    /// Total number of finished scopes.
    #[must_use]
    pub fn total(&self) -> usize {
        self.passed + self.failed + self.inconclusive
    }

    /// Renders this snapshot as a JSON object.
    ///
    /// # Errors
    ///
    /// If the snapshot fails to serialize.
    #[cfg(feature = "output-json")]
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Coloring;

    fn plain_styles() -> Styles {
        let mut styles = Styles::new();
        styles.apply_coloring(Coloring::Never);
        styles
    }

    fn render_to_string(stats: &RunStats) -> String {
        let mut out = Output::in_memory();
        stats.render(&plain_styles(), &mut out).unwrap();
        out.into_string().unwrap()
    }

    #[test]
    fn test_counters_accumulate() {
        let stats = RunStats::new();
        stats.note_verdict(&Verdict::Success);
        stats.note_verdict(&Verdict::Success);
        stats.note_verdict(&Verdict::Failure("boom".into()));
        stats.note_verdict(&Verdict::Inconclusive("prepared only".into()));
        stats.note_failure(Phase::Given);
        stats.note_failure(Phase::Then);
        stats.note_failure(Phase::Then);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.passed, 2);
        assert_eq!(snapshot.failed, 1);
        assert_eq!(snapshot.inconclusive, 1);
        assert_eq!(snapshot.total(), 4);
        assert_eq!(snapshot.failures_by_phase.get("Given"), Some(&1));
        assert_eq!(snapshot.failures_by_phase.get("Then"), Some(&2));
    }

    #[test]
    fn test_render_lists_outcomes_and_phases() {
        let stats = RunStats::new();
        stats.note_verdict(&Verdict::Success);
        stats.note_verdict(&Verdict::Failure("boom".into()));
        stats.note_failure(Phase::When);

        let rendered = render_to_string(&stats);
        assert_eq!(
            rendered,
            "[Summary]\n2 scopes (1 passed, 1 failed)\nfailures by phase: When: 1\n",
        );
    }

    #[test]
    fn test_render_of_empty_stats_is_bare() {
        let rendered = render_to_string(&RunStats::new());
        assert_eq!(rendered, "[Summary]\n0 scopes\n");
    }

    #[test]
    fn test_reset_zeroes_everything() {
        let stats = RunStats::new();
        stats.note_verdict(&Verdict::Success);
        stats.note_failure(Phase::Given);

        stats.reset();

        assert_eq!(stats.snapshot(), StatsSnapshot::default());
    }

    #[cfg(feature = "output-json")]
    #[test]
    fn test_snapshot_serializes_to_json() {
        let stats = RunStats::new();
        stats.note_verdict(&Verdict::Success);
        stats.note_failure(Phase::Then);

        let json = stats.snapshot().to_json().unwrap();
        assert!(json.contains("\"passed\":1"));
        assert!(json.contains("\"Then\":1"));
    }
}
