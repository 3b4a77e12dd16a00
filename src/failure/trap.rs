// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Panic capture for action execution.
//!
//! A process-wide panic hook records the panic site into a thread local, so
//! [`catch()`] can attach a precise `file:line:column` to the [`Failure`] it
//! returns. While a trap frame is active on the panicking thread the default
//! hook is bypassed, keeping test output free of double-reported panics;
//! panics on unrelated threads still reach the previously installed hook.

use std::{
    any::Any,
    cell::Cell,
    panic::{self, AssertUnwindSafe},
    sync::Once,
};

use super::Failure;

thread_local! {
    /// Location of the most recent panic on this thread.
    static LAST_PANIC_SITE: Cell<Option<String>> = Cell::new(None);

    /// Number of [`catch()`] frames currently live on this thread.
    static ACTIVE_TRAPS: Cell<usize> = Cell::new(0);
}

static INSTALL_HOOK: Once = Once::new();

/// Installs the recording hook, chaining to whatever hook was active before.
fn install_hook() {
    INSTALL_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let site = info.location().map_or_else(
                || "unknown location".to_owned(),
                |loc| format!("{}:{}:{}", loc.file(), loc.line(), loc.column()),
            );
            LAST_PANIC_SITE.with(|slot| slot.set(Some(site)));
            if ACTIVE_TRAPS.with(Cell::get) == 0 {
                previous(info);
            }
        }));
    });
}

/// Runs `f`, converting a panic into a [`Failure::Panic`] carrying the
/// rendered message, the panic site and the raw payload.
///
/// Nesting is fine: a trapped action may itself publish events whose handlers
/// are trapped again.
pub(crate) fn catch<T>(f: impl FnOnce() -> T) -> Result<T, Failure> {
    install_hook();
    ACTIVE_TRAPS.with(|n| n.set(n.get() + 1));
    let result = panic::catch_unwind(AssertUnwindSafe(f));
    ACTIVE_TRAPS.with(|n| n.set(n.get() - 1));

    result.map_err(|payload| {
        let location = LAST_PANIC_SITE
            .with(Cell::take)
            .unwrap_or_else(|| "unknown location".to_owned());
        Failure::Panic {
            message: message_of(&*payload),
            location,
            payload: parking_lot::Mutex::new(payload),
        }
    })
}

/// Renders a panic payload the way the default hook would.
fn message_of(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else {
        "opaque panic payload".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use std::{io, panic::panic_any};

    use super::*;

    #[test]
    fn test_passes_through_return_value() {
        let result = catch(|| 42);
        assert_eq!(result.unwrap(), 42);
    }

    #[test]
    fn test_captures_message_and_location() {
        let result: Result<(), _> = catch(|| panic!("exploded"));
        match result.unwrap_err() {
            Failure::Panic { message, location, .. } => {
                assert_eq!(message, "exploded");
                assert!(location.contains("trap.rs"), "got location {location}");
            }
            other => panic!("expected a panic failure, got {other}"),
        }
    }

    #[test]
    fn test_captures_formatted_message() {
        let result: Result<(), _> = catch(|| panic!("count was {}", 7));
        match result.unwrap_err() {
            Failure::Panic { message, .. } => assert_eq!(message, "count was 7"),
            other => panic!("expected a panic failure, got {other}"),
        }
    }

    #[test]
    fn test_keeps_typed_payload() {
        let result: Result<(), _> = catch(|| {
            panic_any(io::Error::new(io::ErrorKind::Other, "typed"));
        });
        let failure = result.unwrap_err();
        assert!(failure.is::<io::Error>());
        match failure {
            Failure::Panic { message, .. } => {
                assert_eq!(message, "opaque panic payload");
            }
            other => panic!("expected a panic failure, got {other}"),
        }
    }

    #[test]
    fn test_nested_traps_report_innermost_sites() {
        let outer: Result<(), _> = catch(|| {
            let inner: Result<(), _> = catch(|| panic!("inner"));
            assert!(inner.is_err());
            panic!("outer");
        });
        match outer.unwrap_err() {
            Failure::Panic { message, location, .. } => {
                assert_eq!(message, "outer");
                assert!(location.contains("trap.rs"));
            }
            other => panic!("expected a panic failure, got {other}"),
        }
    }
}
