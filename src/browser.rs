// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Browser automation collaborators.
//!
//! Element lookup, scripting and screenshots belong to the automation layer
//! itself; the harness only owns the session lifecycle: at most one browser
//! per scope, disposed when replaced and at teardown.

use std::any::Any;

use derive_more::with_trait::Display;
use smart_default::SmartDefault;

/// An open browser session.
pub trait Browser {
    /// Closes the session and shuts down its driver.
    fn dispose(&mut self);

    /// Concrete-type access for test actions.
    fn as_any(&self) -> &dyn Any;
}

/// Opens browser sessions.
pub trait BrowserFactory {
    /// Opens a session pointed at `url`.
    ///
    /// # Errors
    ///
    /// Whatever the automation layer reports; the harness records it under
    /// the phase that requested the browser.
    fn open(
        &self,
        url: &str,
        options: &BrowserOptions,
    ) -> anyhow::Result<Box<dyn Browser>>;
}

/// Which driver implementation runs the session.
#[derive(Clone, Copy, Debug, Default, Display, Eq, PartialEq)]
pub enum DriverKind {
    /// Chrome / Chromium family.
    #[default]
    Chrome,

    /// Firefox via geckodriver.
    Firefox,

    /// Microsoft Edge.
    Edge,
}

/// Options for opening a browser session.
#[derive(Clone, Debug, SmartDefault)]
pub struct BrowserOptions {
    /// Run without a visible window.
    #[default = true]
    pub headless: bool,

    /// Accept the self-signed certificates local test hosts usually serve.
    #[default = true]
    pub ignore_ssl_errors: bool,

    /// Driver implementation to use.
    pub driver: DriverKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_suit_local_test_hosts() {
        let options = BrowserOptions::default();
        assert!(options.headless);
        assert!(options.ignore_ssl_errors);
        assert_eq!(options.driver, DriverKind::Chrome);
    }

    #[test]
    fn test_driver_display() {
        assert_eq!(DriverKind::Firefox.to_string(), "Firefox");
    }
}
