// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Ordered, append-only log of per-phase failures.

use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use itertools::Itertools as _;
use parking_lot::Mutex;

use crate::{
    event::{Bus, FailureLogged},
    failure::Failure,
    Phase,
};

/// One recorded failure: the phase it happened in, the captured failure, and
/// whether a later assertion declared it expected.
#[derive(Debug)]
pub struct FailureRecord {
    phase: Phase,
    failure: Failure,
    checked: AtomicBool,
}

impl FailureRecord {
    fn new(phase: Phase, failure: Failure) -> Self {
        Self { phase, failure, checked: AtomicBool::new(false) }
    }

    /// Phase the failure was recorded under.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The captured failure.
    #[must_use]
    pub fn failure(&self) -> &Failure {
        &self.failure
    }

    /// Whether a `then_should_have_failed*` call declared this failure
    /// expected.
    #[must_use]
    pub fn is_checked(&self) -> bool {
        self.checked.load(Ordering::SeqCst)
    }

    /// Flips the checked flag, reporting whether this call was the one that
    /// flipped it. The flag only ever moves from unchecked to checked.
    fn mark_checked(&self) -> bool {
        !self.checked.swap(true, Ordering::SeqCst)
    }
}

impl fmt::Display for FailureRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.phase, self.failure)
    }
}

/// Append-only log of everything that went wrong in one test execution.
///
/// Records are never removed; only their checked flag mutates. Whether any
/// unchecked record remains at disposal is what turns the verdict into a
/// failure.
pub struct FailureLog {
    records: Mutex<Vec<Arc<FailureRecord>>>,
    bus: Arc<Bus>,
}

impl FailureLog {
    pub(crate) fn new(bus: Arc<Bus>) -> Self {
        Self { records: Mutex::new(Vec::new()), bus }
    }

    /// Appends `failure` under `phase` and announces the append on the bus.
    ///
    /// A [grouped] failure is flattened recursively: each leaf becomes its
    /// own unchecked record, announced by one covering [`FailureLogged`]
    /// notification followed by one notification per leaf. The group itself
    /// is never stored.
    ///
    /// [grouped]: Failure::Composite
    pub fn push(&self, phase: Phase, failure: Failure) {
        let grouped = matches!(failure, Failure::Composite(_));
        let mut leaves = Vec::new();
        failure.into_leaves(&mut leaves);

        let mut pending = Vec::with_capacity(leaves.len() + 1);
        {
            let mut records = self.records.lock();
            for leaf in leaves {
                let record = Arc::new(FailureRecord::new(phase, leaf));
                records.push(Arc::clone(&record));
                pending.push(FailureLogged {
                    phase,
                    message: record.to_string(),
                    covers: 1,
                    total: records.len(),
                });
            }
            if grouped {
                let message = pending
                    .iter()
                    .map(|notification| notification.message.as_str())
                    .join("; ");
                pending.insert(
                    0,
                    FailureLogged {
                        phase,
                        message,
                        covers: pending.len(),
                        total: records.len(),
                    },
                );
            }
        }

        // Published after the lock is released: a listener may read the log
        // or push into it again without deadlocking.
        for notification in pending {
            self.bus.publish(&notification);
        }
    }

    /// Appends without announcing. Used for failures raised by bus handlers
    /// themselves, where a notification could recurse endlessly through a
    /// faulty listener.
    pub(crate) fn push_silent(&self, phase: Phase, failure: Failure) {
        let mut leaves = Vec::new();
        failure.into_leaves(&mut leaves);
        let mut records = self.records.lock();
        records.extend(
            leaves
                .into_iter()
                .map(|leaf| Arc::new(FailureRecord::new(phase, leaf))),
        );
    }

    /// Total number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Whether nothing was recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Number of records whose failure is, or contains, an error of type `E`.
    #[must_use]
    pub fn count_of<E>(&self) -> usize
    where
        E: std::error::Error + 'static,
    {
        self.records
            .lock()
            .iter()
            .filter(|record| record.failure.is::<E>())
            .count()
    }

    /// Whether any record remains unchecked. This is the failure trigger at
    /// disposal.
    #[must_use]
    pub fn has_unchecked(&self) -> bool {
        self.records.lock().iter().any(|record| !record.is_checked())
    }

    /// Marks every record checked, reporting how many were newly marked.
    pub fn check_all(&self) -> usize {
        self.records
            .lock()
            .iter()
            .filter(|record| record.mark_checked())
            .count()
    }

    /// Marks every record of type `E` checked, reporting how many were newly
    /// marked.
    pub fn check_all_of<E>(&self) -> usize
    where
        E: std::error::Error + 'static,
    {
        self.records
            .lock()
            .iter()
            .filter(|record| record.failure.is::<E>() && record.mark_checked())
            .count()
    }

    /// Marks the first `n` records checked, reporting how many were newly
    /// marked.
    pub fn check_first(&self, n: usize) -> usize {
        self.records
            .lock()
            .iter()
            .take(n)
            .filter(|record| record.mark_checked())
            .count()
    }

    /// Snapshot of all records, in insertion order.
    #[must_use]
    pub fn records(&self) -> Vec<Arc<FailureRecord>> {
        self.records.lock().clone()
    }

    /// Snapshot of the records still unchecked, in insertion order.
    #[must_use]
    pub fn unchecked(&self) -> Vec<Arc<FailureRecord>> {
        self.records
            .lock()
            .iter()
            .filter(|record| !record.is_checked())
            .cloned()
            .collect()
    }
}

impl fmt::Debug for FailureLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FailureLog")
            .field("records", &*self.records.lock())
            .finish_non_exhaustive()
    }
}
