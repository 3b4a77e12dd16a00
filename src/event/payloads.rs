// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Payload types published by the framework itself.

use std::{any::Any, sync::Arc, time::Duration};

use derive_more::with_trait::Debug;

use crate::Phase;

/// Announces an upsert in the run store.
#[derive(Clone, Debug)]
pub struct StoreMutated {
    /// Key that was written.
    pub key: String,

    /// Value now stored under [`key`](StoreMutated::key).
    #[debug(ignore)]
    pub value: Arc<dyn Any + Send + Sync>,

    /// Whether the key was absent before this write.
    pub is_new: bool,

    /// Value the write displaced, if any.
    #[debug(ignore)]
    pub old_value: Option<Arc<dyn Any + Send + Sync>>,
}

/// Announces an append to the failure log.
///
/// A plain failure yields one notification covering itself. A grouped
/// failure yields one notification covering all of its leaves, followed by
/// one per leaf.
#[derive(Clone, Debug)]
pub struct FailureLogged {
    /// Phase the failure was recorded under.
    pub phase: Phase,

    /// Rendered failure message.
    pub message: String,

    /// Number of leaf records this notification covers.
    pub covers: usize,

    /// Failure log length after the append.
    pub total: usize,
}

/// Announces a completed phase execution.
///
/// Published after every phase method except [`Listen`], so statistics
/// collectors and other listeners can observe the run without being notified
/// about their own registration.
///
/// [`Listen`]: Phase::Listen
#[derive(Clone, Debug)]
pub struct PhaseFinished {
    /// Phase that ran.
    pub phase: Phase,

    /// Human-readable label of the phase, when one was available.
    pub description: Option<String>,

    /// Failures newly recorded by this phase.
    pub new_failures: usize,

    /// Wall-clock time the phase took.
    pub elapsed: Duration,
}
