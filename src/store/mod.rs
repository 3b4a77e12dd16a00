// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Per-scope state: the key/value run store and the failure log.

use derive_more::{Display, Error};

pub mod failures;
pub mod run;

pub use failures::{FailureLog, FailureRecord};
pub use run::{RunStore, ACTUAL_KEY, SUT_KEY};

/// Errors produced by typed reads from a [`RunStore`].
#[derive(Clone, Debug, Display, Eq, Error, PartialEq)]
pub enum Error {
    /// No value is stored under the requested key.
    #[display("no value stored under key \"{key}\"")]
    Missing {
        /// Requested key.
        key: String,
    },

    /// A value exists under the key, but is of a different type.
    #[display("value under key \"{key}\" is not a `{expected}`")]
    TypeMismatch {
        /// Requested key.
        key: String,

        /// Requested type.
        expected: &'static str,
    },

    /// A single-value-of-type lookup found nothing.
    #[display("no value of type `{type_name}` in the store")]
    NoneOfType {
        /// Requested type.
        type_name: &'static str,
    },

    /// A single-value-of-type lookup found more than one candidate.
    #[display("multiple values of type `{type_name}` in the store")]
    ManyOfType {
        /// Requested type.
        type_name: &'static str,
    },
}

/// Result type alias using the store [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
