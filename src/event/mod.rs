// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! In-process eventing for one test scope.
//!
//! The [`Bus`] lets test authors observe low-level happenings without
//! polling: store mutations, failure log appends and phase completions are
//! all announced as typed payloads, and arbitrary user types can be
//! published the same way.

pub mod bus;
pub mod payloads;

pub use bus::Bus;
pub use payloads::{FailureLogged, PhaseFinished, StoreMutated};
