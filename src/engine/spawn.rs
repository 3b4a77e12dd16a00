// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Serialized, retrying bring-up of the system under test.

use std::thread;

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use rand::Rng as _;

use crate::{
    config::Config,
    sut::{SpawnError, SutFactory, RANDOM_PORT},
};

use super::{ActiveSut, SpawnSut};

/// Spawning claims an OS port, so bring-up must be serialized across scopes
/// no matter how the surrounding test runner parallelizes them.
static SPAWN_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

/// Brings the system under test online with bounded retry.
///
/// A transient error sleeps [`Config::spawn_backoff`] and tries again, up
/// to [`Config::spawn_attempts`] times, re-resolving the endpoint each
/// attempt so a fresh random port is drawn. Any other error stops the loop
/// at once. Exactly one error comes back on failure: the fatal one, or the
/// last transient one.
pub fn spawn(request: &SpawnSut, config: &Config) -> Result<ActiveSut, SpawnError> {
    let _guard = SPAWN_LOCK.lock();

    let attempts = config.spawn_attempts.max(1);
    let mut attempt = 1;
    loop {
        let endpoint = request.endpoint.as_deref().map(|e| resolve(e, config));
        tracing::debug!(attempt, endpoint = ?endpoint, "spawning system under test");

        match attempt_once(&*request.factory, endpoint, &request.args) {
            Ok(active) => {
                tracing::debug!(attempt, endpoint = ?active.endpoint(), "system under test is up");
                return Ok(active);
            }
            Err(err) if err.is_transient() && attempt < attempts => {
                tracing::warn!(
                    attempt,
                    backoff = ?config.spawn_backoff,
                    %err,
                    "transient spawn failure, backing off",
                );
                thread::sleep(config.spawn_backoff);
                attempt += 1;
            }
            Err(err) => {
                tracing::error!(attempt, %err, "giving up on spawning");
                return Err(err);
            }
        }
    }
}

/// One full attempt: host the application, then bind a client to it.
///
/// A host left without a client would hold its port into the next attempt,
/// so it is closed before the error is reported.
fn attempt_once(
    factory: &dyn SutFactory,
    endpoint: Option<String>,
    args: &[String],
) -> Result<ActiveSut, SpawnError> {
    let mut handle = factory.spawn(endpoint.as_deref(), args)?;
    match handle.create_client() {
        Ok(client) => Ok(ActiveSut::new(handle, client, endpoint)),
        Err(err) => {
            handle.close();
            Err(err)
        }
    }
}

/// Substitutes the random-port sentinel with a port drawn from
/// [`Config::port_range`].
fn resolve(endpoint: &str, config: &Config) -> String {
    if endpoint.contains(RANDOM_PORT) {
        let port = rand::thread_rng().gen_range(config.port_range());
        endpoint.replace(RANDOM_PORT, &port.to_string())
    } else {
        endpoint.to_owned()
    }
}
