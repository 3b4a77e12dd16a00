// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! What an executed request leaves behind.

use std::{sync::Arc, time::Duration};

use derive_more::with_trait::Debug;

use crate::{
    failure::Failure,
    sut::{SutClient, SutHandle},
};

/// Live system under test produced by a successful spawn.
///
/// Owns both halves of the collaborator pair: the hosted application and
/// the client bound to it.
#[derive(Debug)]
pub struct ActiveSut {
    #[debug(ignore)]
    handle: Box<dyn SutHandle>,

    #[debug(ignore)]
    client: Arc<dyn SutClient>,

    endpoint: Option<String>,
}

impl ActiveSut {
    pub(crate) fn new(
        handle: Box<dyn SutHandle>,
        client: Arc<dyn SutClient>,
        endpoint: Option<String>,
    ) -> Self {
        Self { handle, client, endpoint }
    }

    /// Client bound to the hosted application.
    #[must_use]
    pub fn client(&self) -> &Arc<dyn SutClient> {
        &self.client
    }

    /// Endpoint the application is reachable at, with any random-port
    /// sentinel already substituted. `None` means in-process hosting.
    #[must_use]
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    /// Releases the client before the host it talks to.
    pub fn dispose(mut self) {
        self.client.close();
        self.handle.close();
    }
}

/// Result of running one [`Request`](super::Request).
///
/// Failures are collected rather than thrown. The caller decides what they
/// mean once the whole scope is done.
#[derive(Debug)]
pub struct Outcome {
    /// Everything that failed, in the order it failed.
    pub failures: Vec<Failure>,

    /// Whether the request carried no actions of its own.
    pub prepared_only: bool,

    /// Spawned system, when the request asked for one and it came up.
    pub sut: Option<ActiveSut>,

    /// Wall-clock time the whole run took.
    pub elapsed: Duration,
}
