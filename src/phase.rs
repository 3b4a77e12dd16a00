// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Labeled stages of one test execution.

use derive_more::with_trait::Display;

/// A labeled stage of one test execution.
///
/// Ordering is conventional, not enforced: a test usually walks
/// [`Given`] → [`When`] → [`Then`], but any phase method may be invoked any
/// number of times in any order. See [`Proctor`] for the rationale.
///
/// [`Given`]: Phase::Given
/// [`When`]: Phase::When
/// [`Then`]: Phase::Then
/// [`Proctor`]: crate::Proctor
#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Phase {
    /// Arranges preconditions and spawns the system under test.
    Given,

    /// Performs the action under test.
    When,

    /// Asserts on the produced state.
    Then,

    /// Registers event listeners; never announced on the bus itself.
    Listen,

    /// Emits diagnostics; runs even after earlier failures.
    Debug,

    /// Tears down every resource the scope owns.
    Dispose,
}

impl Phase {
    /// All phases, in their conventional order.
    pub const ALL: [Self; 6] = [
        Self::Given,
        Self::When,
        Self::Then,
        Self::Listen,
        Self::Debug,
        Self::Dispose,
    ];

    /// Whether actions of this phase still execute once an earlier failure is
    /// recorded in the scope.
    ///
    /// [`Given`] and [`When`] actions are pointless after a failure (their
    /// outcome can no longer change the verdict), so they are skipped. All
    /// other phases keep running so assertions and diagnostics stay visible.
    ///
    /// [`Given`]: Phase::Given
    /// [`When`]: Phase::When
    #[must_use]
    pub const fn runs_after_failure(self) -> bool {
        !matches!(self, Self::Given | Self::When)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names() {
        assert_eq!(Phase::Given.to_string(), "Given");
        assert_eq!(Phase::Dispose.to_string(), "Dispose");
    }

    #[test]
    fn test_runs_after_failure() {
        assert!(!Phase::Given.runs_after_failure());
        assert!(!Phase::When.runs_after_failure());
        assert!(Phase::Then.runs_after_failure());
        assert!(Phase::Listen.runs_after_failure());
        assert!(Phase::Debug.runs_after_failure());
        assert!(Phase::Dispose.runs_after_failure());
    }

    #[test]
    fn test_conventional_order() {
        let mut sorted = Phase::ALL;
        sorted.sort();
        assert_eq!(sorted, Phase::ALL);
    }
}
