// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Unit of work a phase call submits to the engine.

use std::sync::Arc;

use derive_more::with_trait::Debug;

use crate::{scope::Scope, sut::SutFactory, Phase};

/// Single executable step.
///
/// Both explicit `Err` returns and panics end up recorded, so an action can
/// freely `assert!` or bubble errors up with `?`.
pub type Action = Box<dyn FnOnce(&Scope) -> anyhow::Result<()>>;

/// Boxes an infallible closure into an [`Action`].
///
/// Lets a phase method take several differently-typed closures at once:
/// `proctor.then_all(vec![action(..), action(..)])`.
pub fn action(f: impl FnOnce(&Scope) + 'static) -> Action {
    Box::new(move |scope| {
        f(scope);
        Ok(())
    })
}

/// Boxes a fallible closure into an [`Action`].
pub fn try_action(f: impl FnOnce(&Scope) -> anyhow::Result<()> + 'static) -> Action {
    Box::new(f)
}

/// Instruction to bring a system under test online before any action runs.
#[derive(Debug)]
pub struct SpawnSut {
    /// Builder of the hosted application.
    #[debug(ignore)]
    pub factory: Arc<dyn SutFactory>,

    /// Endpoint to bind, possibly containing the
    /// [`RANDOM_PORT`](crate::sut::RANDOM_PORT) sentinel. `None` hosts the
    /// application in-process.
    pub endpoint: Option<String>,

    /// Arguments forwarded to the hosted application.
    pub args: Vec<String>,
}

/// Everything the engine needs to execute one phase call.
#[derive(Debug)]
pub struct Request {
    /// Phase the work runs under.
    pub phase: Phase,

    /// Human-readable label for diagnostics and notifications.
    pub description: Option<String>,

    /// Scope-wide setup replayed before [`actions`](Request::actions).
    #[debug(ignore)]
    pub setup: Vec<Action>,

    /// Actions supplied for this phase call.
    #[debug(ignore)]
    pub actions: Vec<Action>,

    /// System under test to spawn before anything else.
    pub spawn: Option<SpawnSut>,

    /// When `false`, the phase is placed on record without running a thing.
    pub run_actions: bool,

    /// Failure-log length at the time this request was built. Frozen for
    /// the whole run: a failure raised by one action never suppresses its
    /// siblings within the same request.
    pub prior_failures: usize,
}

impl Request {
    /// Request for `phase` with no work attached.
    #[must_use]
    pub fn empty(phase: Phase) -> Self {
        Self {
            phase,
            description: None,
            setup: Vec::new(),
            actions: Vec::new(),
            spawn: None,
            run_actions: true,
            prior_failures: 0,
        }
    }
}
