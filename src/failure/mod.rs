// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Captured test failures.
//!
//! Nothing in a test body is allowed to abort the run: every panic or error
//! an action produces is caught and carried as a [`Failure`], recorded into
//! the scope's [`FailureLog`] and judged only at disposal time.
//!
//! [`FailureLog`]: crate::store::FailureLog

use std::any::Any;

use derive_more::with_trait::{Debug, Display};
use parking_lot::Mutex;

mod trap;

pub(crate) use self::trap::catch;

/// A failure captured from one test action.
#[derive(Debug, Display)]
pub enum Failure {
    /// A panic caught from an action body.
    #[display("panicked at {location}: {message}")]
    Panic {
        /// Rendered panic message.
        message: String,

        /// `file:line:column` of the panic site.
        location: String,

        /// Raw panic payload, kept for typed matching via [`Failure::is`].
        ///
        /// Wrapped in a [`Mutex`] only to keep records shareable across
        /// threads; the payload itself is never mutated.
        #[debug(ignore)]
        payload: Mutex<Box<dyn Any + Send>>,
    },

    /// An error returned from a fallible action.
    #[display("{_0:#}")]
    Error(anyhow::Error),

    /// Several failures reported as one unit.
    ///
    /// Never stored as-is: recording flattens it recursively into its leaves.
    #[display("{} grouped failures", _0.len())]
    Composite(Vec<Failure>),
}

impl Failure {
    /// Creates a [`Failure::Error`] from anything convertible into an
    /// [`anyhow::Error`].
    #[must_use]
    pub fn error(err: impl Into<anyhow::Error>) -> Self {
        Self::Error(err.into())
    }

    /// Groups several failures into one unit.
    #[must_use]
    pub fn grouped(failures: Vec<Self>) -> Self {
        Self::Composite(failures)
    }

    /// Whether this failure is, or anywhere contains, an error of type `E`.
    ///
    /// For a caught panic the payload itself is inspected, so a test can
    /// match a typed value thrown via [`std::panic::panic_any`]. For an error
    /// the whole source chain is searched.
    pub fn is<E>(&self) -> bool
    where
        E: std::error::Error + 'static,
    {
        match self {
            Self::Panic { payload, .. } => payload.lock().downcast_ref::<E>().is_some(),
            Self::Error(err) => {
                err.chain().any(|cause| cause.downcast_ref::<E>().is_some())
            }
            Self::Composite(inner) => inner.iter().any(Self::is::<E>),
        }
    }

    /// Recursively unfolds grouped failures, pushing every leaf into `out`.
    pub(crate) fn into_leaves(self, out: &mut Vec<Self>) {
        match self {
            Self::Composite(inner) => {
                for failure in inner {
                    failure.into_leaves(out);
                }
            }
            leaf => out.push(leaf),
        }
    }
}
