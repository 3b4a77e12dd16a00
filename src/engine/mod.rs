// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Phase execution: runs requests, captures everything, throws nothing.
//!
//! [`run()`] is deliberately infallible from the caller's point of view.
//! Spawn errors and action failures land in [`Outcome::failures`] while
//! later actions still get their chance, so a `Then` phase can assert on
//! what a failing `When` left behind.

pub mod outcome;
pub mod request;
pub mod spawn;

use std::time::Instant;

use crate::{
    config::Config,
    failure::{self, Failure},
    scope::Scope,
};

pub use outcome::{ActiveSut, Outcome};
pub use request::{action, try_action, Action, Request, SpawnSut};

/// Executes one request against `scope`.
///
/// Actions run in order, each inside a catch-all, and one failing action
/// never suppresses the ones after it. Whole-request skipping applies only
/// to `Given`/`When` phases that start with failures already on record;
/// see [`Phase::runs_after_failure`](crate::Phase::runs_after_failure).
pub fn run(scope: &Scope, config: &Config, request: Request) -> Outcome {
    let started = Instant::now();
    let Request {
        phase,
        description,
        setup,
        actions,
        spawn,
        run_actions,
        prior_failures,
    } = request;

    tracing::debug!(
        phase = %phase,
        description = description.as_deref().unwrap_or_default(),
        "phase starting",
    );

    let mut outcome = Outcome {
        failures: vec![],
        prepared_only: actions.is_empty(),
        sut: None,
        elapsed: started.elapsed(),
    };

    if let Some(spawn_request) = spawn {
        match spawn::spawn(&spawn_request, config) {
            Ok(active) => outcome.sut = Some(active),
            Err(err) => {
                let failure = Failure::error(err);
                tracing::error!(phase = %phase, %failure, "spawn failed");
                outcome.failures.push(failure);
            }
        }
    }

    let total = setup.len() + actions.len();
    if !run_actions || total == 0 {
        tracing::debug!(phase = %phase, skipped = total, "skipping actions");
        outcome.elapsed = started.elapsed();
        return outcome;
    }

    let proceed = prior_failures == 0 || phase.runs_after_failure();
    for action in setup.into_iter().chain(actions) {
        if !proceed {
            tracing::debug!(phase = %phase, "action skipped after an earlier failure");
            continue;
        }
        match failure::catch(|| action(scope)) {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                let failure = Failure::Error(err);
                tracing::error!(phase = %phase, %failure, "action failed");
                outcome.failures.push(failure);
            }
            Err(panicked) => {
                tracing::error!(phase = %phase, %panicked, "action panicked");
                outcome.failures.push(panicked);
            }
        }
    }

    outcome.elapsed = started.elapsed();
    tracing::debug!(
        phase = %phase,
        failures = outcome.failures.len(),
        elapsed = %humantime::format_duration(outcome.elapsed),
        "phase finished",
    );
    outcome
}
