// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Execution tuning, sourced from `PROCTOR_*` environment variables.

use std::{ops::RangeInclusive, time::Duration};

use clap::Parser;
use once_cell::sync::Lazy;

use crate::report::Coloring;

/// Tuning knobs for one test run.
///
/// Read once per process from the environment via [`Config::global`]; the
/// test runner owns the real command line, so nothing is parsed from it.
/// Individual scopes may override the global values through
/// [`Proctor::with_config`].
///
/// [`Proctor::with_config`]: crate::Proctor::with_config
#[derive(Clone, Debug, Parser)]
#[command(name = "proctor")]
pub struct Config {
    /// Maximum number of attempts to spawn the system under test before
    /// giving up.
    #[arg(long, value_name = "int", env = "PROCTOR_SPAWN_ATTEMPTS", default_value_t = 5)]
    pub spawn_attempts: u32,

    /// Pause between spawn attempts that failed transiently.
    ///
    /// Duration is represented in a human-readable format like `90s` or
    /// `1min30s`.
    #[arg(
        long,
        value_name = "duration",
        env = "PROCTOR_SPAWN_BACKOFF",
        value_parser = humantime::parse_duration,
        default_value = "60s",
    )]
    pub spawn_backoff: Duration,

    /// Lower bound of the port range substituted for the `{randomPort}`
    /// endpoint placeholder.
    #[arg(long, value_name = "port", env = "PROCTOR_PORT_MIN", default_value_t = 4000)]
    pub port_min: u16,

    /// Upper bound (inclusive) of the `{randomPort}` range. Must not be
    /// below the lower bound.
    #[arg(long, value_name = "port", env = "PROCTOR_PORT_MAX", default_value_t = 4999)]
    pub port_max: u16,

    /// Whether verdict warnings and summaries should be colored.
    #[arg(long, value_name = "auto|always|never", env = "PROCTOR_COLOR", default_value = "auto")]
    pub color: Coloring,
}

impl Config {
    /// Reads the configuration from the environment.
    ///
    /// # Panics
    ///
    /// If the configured port range is empty. A malformed configuration is a
    /// hard authoring error, so it fails fast instead of being recorded into
    /// the run's failure log.
    #[must_use]
    pub fn from_env() -> Self {
        let config = Self::parse_from(["proctor"]);
        config.validate();
        config
    }

    fn validate(&self) {
        assert!(
            self.port_min <= self.port_max,
            "PROCTOR_PORT_MIN ({}) must not exceed PROCTOR_PORT_MAX ({})",
            self.port_min,
            self.port_max,
        );
    }

    /// The process-wide configuration, read from the environment on first
    /// use.
    #[must_use]
    pub fn global() -> &'static Self {
        static GLOBAL: Lazy<Config> = Lazy::new(Config::from_env);
        &GLOBAL
    }

    /// Ports eligible for `{randomPort}` substitution.
    #[must_use]
    pub fn port_range(&self) -> RangeInclusive<u16> {
        self.port_min..=self.port_max
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
