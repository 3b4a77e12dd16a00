// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Test-name convention and per-phase labels.
//!
//! A scope is named `Given_<G>_When_<W>_Then_<T>`: exactly six
//! underscore-separated tokens, with the three keywords in place and each
//! free segment in upper camel case. The segments double as human-readable
//! phase labels once spaces are inserted before their internal capitals.
//! Names starting with `Maintenance_` are exempt from the whole convention.

use derive_more::with_trait::{Display, Error};
use lazy_regex::{regex, regex::Captures};

use crate::Phase;

/// Parsed, validated name of one test scope.
#[derive(Clone, Debug, Display, Eq, PartialEq)]
pub enum TestName {
    /// Conventional `Given_<G>_When_<W>_Then_<T>` name.
    #[display("{raw}")]
    Scenario {
        /// Name as written.
        raw: String,

        /// Label derived from the `<G>` segment.
        given: String,

        /// Label derived from the `<W>` segment.
        when: String,

        /// Label derived from the `<T>` segment.
        then: String,
    },

    /// `Maintenance_…` name, exempt from the convention.
    #[display("{_0}")]
    Maintenance(String),
}

impl TestName {
    /// Parses and validates `raw`.
    ///
    /// Validation failures are deliberately unrecoverable guard-rails: a
    /// misnamed test is rejected before its scope even exists.
    pub fn parse(raw: impl Into<String>) -> Result<Self, InvalidTestName> {
        let raw = raw.into();
        if raw.starts_with("Maintenance_") {
            return Ok(Self::Maintenance(raw));
        }

        let tokens: Vec<&str> = raw.split('_').collect();
        if tokens.len() != 6 {
            return Err(InvalidTestName::TokenCount { found: tokens.len() });
        }
        for (index, expected) in [(0, "Given"), (2, "When"), (4, "Then")] {
            if tokens[index] != expected {
                return Err(InvalidTestName::Keyword {
                    index,
                    expected,
                    found: tokens[index].to_owned(),
                });
            }
        }
        for index in [1, 3, 5] {
            if !tokens[index].chars().next().is_some_and(char::is_uppercase) {
                return Err(InvalidTestName::Segment {
                    index,
                    found: tokens[index].to_owned(),
                });
            }
        }

        Ok(Self::Scenario {
            given: spaced(tokens[1]),
            when: spaced(tokens[3]),
            then: spaced(tokens[5]),
            raw,
        })
    }

    /// Label derived for `phase`, when the name carries one.
    #[must_use]
    pub fn label(&self, phase: Phase) -> Option<&str> {
        match self {
            Self::Scenario { given, when, then, .. } => match phase {
                Phase::Given => Some(given),
                Phase::When => Some(when),
                Phase::Then => Some(then),
                Phase::Listen | Phase::Debug | Phase::Dispose => None,
            },
            Self::Maintenance(_) => None,
        }
    }

    /// Name as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Scenario { raw, .. } | Self::Maintenance(raw) => raw,
        }
    }
}

/// A test name that breaks the `Given_<G>_When_<W>_Then_<T>` convention.
#[derive(Clone, Debug, Display, Eq, Error, PartialEq)]
pub enum InvalidTestName {
    /// Wrong number of underscore-separated tokens.
    #[display("expected 6 underscore-separated tokens, found {found}")]
    TokenCount {
        /// Number of tokens found.
        found: usize,
    },

    /// A keyword token is not the keyword the convention fixes there.
    #[display("token {index} must be `{expected}`, found `{found}`")]
    Keyword {
        /// Zero-based position of the offending token.
        index: usize,

        /// Keyword the convention fixes at this position.
        expected: &'static str,

        /// Token actually found.
        found: String,
    },

    /// A free segment is empty or does not start with an upper-case letter.
    #[display("segment {index} must start with an upper-case letter, found `{found}`")]
    Segment {
        /// Zero-based position of the offending token.
        index: usize,

        /// Segment actually found.
        found: String,
    },
}

/// Splits an upper-camel-case segment into space-separated words.
fn spaced(segment: &str) -> String {
    regex!(r"\B[A-Z]")
        .replace_all(segment, |caps: &Captures<'_>| format!(" {}", &caps[0]))
        .into_owned()
}
