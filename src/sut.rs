// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! System-under-test collaborators.
//!
//! The harness never bootstraps an application itself: tests hand it a
//! [`SutFactory`], and the engine drives the spawn with bounded retry,
//! serialized process-wide so concurrent tests cannot race for listener
//! ports. See [`Proctor::given_sut`].
//!
//! [`Proctor::given_sut`]: crate::Proctor::given_sut

use std::{any::Any, sync::Arc};

use derive_more::with_trait::{Display, Error};

/// Endpoint placeholder replaced by a pseudo-random port at spawn time.
///
/// A fresh port is picked for every attempt, so a port collision classified
/// as [`SpawnError::Transient`] gets a real chance to clear on retry.
pub const RANDOM_PORT: &str = "{randomPort}";

/// Boots instances of the hosted application under test.
pub trait SutFactory {
    /// Boots the application.
    ///
    /// An `endpoint` of [`None`] means in-process hosting; [`Some`] binds
    /// the application publicly at the given address (already resolved, the
    /// [`RANDOM_PORT`] placeholder never reaches the factory). `args` are
    /// forwarded as process/configuration arguments.
    ///
    /// # Errors
    ///
    /// [`SpawnError::Transient`] for conflicts a retry may clear,
    /// [`SpawnError::Fatal`] for everything else.
    fn spawn(
        &self,
        endpoint: Option<&str>,
        args: &[String],
    ) -> Result<Box<dyn SutHandle>, SpawnError>;
}

/// A running application instance.
pub trait SutHandle {
    /// Opens a client talking to this instance.
    ///
    /// # Errors
    ///
    /// Classified like [`SutFactory::spawn`]: a transient error here counts
    /// against the same attempt budget.
    fn create_client(&self) -> Result<Arc<dyn SutClient>, SpawnError>;

    /// Stops the instance and releases the resources it holds.
    fn close(&mut self);
}

/// A client connected to a running instance.
pub trait SutClient {
    /// Releases the client's connection resources.
    fn close(&self);

    /// Concrete-type access for test actions.
    fn as_any(&self) -> &dyn Any;
}

/// How to host the spawned application.
#[derive(Clone, Debug, Default)]
pub struct SutOptions {
    /// Address to bind publicly; [`None`] keeps hosting in-process. May
    /// contain the [`RANDOM_PORT`] placeholder.
    pub endpoint: Option<String>,

    /// Arguments forwarded to the application bootstrap.
    pub args: Vec<String>,
}

impl SutOptions {
    /// Hosts publicly, bound at `endpoint`.
    #[must_use]
    pub fn at(endpoint: impl Into<String>) -> Self {
        Self { endpoint: Some(endpoint.into()), args: Vec::new() }
    }

    /// Adds bootstrap arguments.
    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

/// Why spawning the system under test failed.
///
/// The classification drives the engine's retry decision: transient
/// failures are retried with backoff up to the configured attempt cap,
/// fatal ones stop the loop at once.
#[derive(Debug, Display, Error)]
pub enum SpawnError {
    /// A resource conflict a later attempt may clear, like a taken listener
    /// port.
    #[display("transient spawn failure: {_0:#}")]
    Transient(#[error(not(source))] anyhow::Error),

    /// Anything else; retrying would not help.
    #[display("spawn failed: {_0:#}")]
    Fatal(#[error(not(source))] anyhow::Error),
}

impl SpawnError {
    /// Creates a transient (retryable) spawn failure.
    #[must_use]
    pub fn transient(err: impl Into<anyhow::Error>) -> Self {
        Self::Transient(err.into())
    }

    /// Creates a fatal (non-retryable) spawn failure.
    #[must_use]
    pub fn fatal(err: impl Into<anyhow::Error>) -> Self {
        Self::Fatal(err.into())
    }

    /// Whether a retry may clear this failure.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    #[test]
    fn test_classification() {
        assert!(SpawnError::transient(anyhow::anyhow!("port taken")).is_transient());
        assert!(!SpawnError::fatal(anyhow::anyhow!("bad config")).is_transient());
    }

    #[test]
    fn test_display_keeps_cause_chain() {
        let err = SpawnError::transient(
            anyhow::Error::new(io::Error::new(
                io::ErrorKind::AddrInUse,
                "address in use",
            ))
            .context("binding listener"),
        );
        let rendered = err.to_string();
        assert!(rendered.contains("transient spawn failure"));
        assert!(rendered.contains("binding listener"));
        assert!(rendered.contains("address in use"));
    }

    #[test]
    fn test_downcasts_through_anyhow() {
        let any: anyhow::Error = SpawnError::fatal(anyhow::anyhow!("nope")).into();
        assert!(any.downcast_ref::<SpawnError>().is_some());
    }

    #[test]
    fn test_options_builder() {
        let options = SutOptions::at("http://localhost:{randomPort}")
            .with_args(["--migrate", "--seed"]);
        assert_eq!(
            options.endpoint.as_deref(),
            Some("http://localhost:{randomPort}"),
        );
        assert_eq!(options.args, vec!["--migrate", "--seed"]);
    }
}
