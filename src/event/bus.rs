// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Synchronous in-process publish/subscribe.

use std::{
    any::{Any, TypeId},
    collections::HashMap,
    fmt,
    sync::Arc,
};

use parking_lot::RwLock;

use crate::failure::{self, Failure};

/// Type-erased subscriber; the wrapped closure re-checks the payload type.
type Handler = Arc<dyn Fn(&dyn Any) + Send + Sync>;

/// Where handler failures go; wired to the owning scope's failure log.
pub(crate) type FailureSink = Box<dyn Fn(Failure) + Send + Sync>;

/// Synchronous publish/subscribe keyed by payload type.
///
/// Dispatch is blocking and happens on the caller's thread: [`publish()`]
/// returns only once every subscriber current at that moment has run, in
/// registration order. There is no deferred delivery and no cancellation,
/// which is the right trade-off for short in-process test-time listeners.
///
/// There is no unsubscribe either: subscriptions live exactly as long as the
/// owning scope, which is one test execution.
///
/// [`publish()`]: Bus::publish
#[derive(Default)]
pub struct Bus {
    handlers: RwLock<HashMap<TypeId, Vec<Handler>>>,
    failure_sink: RwLock<Option<FailureSink>>,
}

impl Bus {
    /// Creates an empty [`Bus`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for payloads of type `E`.
    ///
    /// Handlers of the same payload type are invoked in registration order.
    pub fn subscribe<E, F>(&self, handler: F)
    where
        E: Any,
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.subscribe_erased(
            TypeId::of::<E>(),
            Arc::new(move |payload: &dyn Any| {
                if let Some(payload) = payload.downcast_ref::<E>() {
                    handler(payload);
                }
            }),
        );
    }

    /// Registers `handler` behind `predicate`: only payloads the predicate
    /// accepts are delivered.
    pub fn subscribe_filtered<E, P, F>(&self, predicate: P, handler: F)
    where
        E: Any,
        P: Fn(&E) -> bool + Send + Sync + 'static,
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.subscribe(move |payload: &E| {
            if predicate(payload) {
                handler(payload);
            }
        });
    }

    fn subscribe_erased(&self, key: TypeId, handler: Handler) {
        self.handlers.write().entry(key).or_default().push(handler);
    }

    /// Delivers `payload` to every current subscriber of `E`, in order.
    ///
    /// A panicking handler cannot crash the run: the panic is caught,
    /// forwarded to the owning scope's failure log, and the remaining
    /// handlers still run. Handlers may publish further payloads or register
    /// new subscriptions; those subscriptions only see later publishes.
    pub fn publish<E: Any>(&self, payload: &E) {
        let snapshot = self
            .handlers
            .read()
            .get(&TypeId::of::<E>())
            .cloned()
            .unwrap_or_default();

        for handler in snapshot {
            if let Err(failure) = failure::catch(|| handler(payload)) {
                self.sink_failure(failure);
            }
        }
    }

    /// Attaches the sink receiving handler failures.
    pub(crate) fn set_failure_sink(&self, sink: FailureSink) {
        *self.failure_sink.write() = Some(sink);
    }

    fn sink_failure(&self, failure: Failure) {
        let guard = self.failure_sink.read();
        if let Some(sink) = guard.as_ref() {
            sink(failure);
        } else {
            tracing::error!(%failure, "event handler failed with no failure sink attached");
        }
    }
}

impl fmt::Debug for Bus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bus")
            .field("handler_types", &self.handlers.read().len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use super::*;

    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    struct Ping(u32);

    #[derive(Clone, Copy, Debug)]
    struct Pong;

    fn collector() -> (Arc<Mutex<Vec<u32>>>, impl Fn(&Ping) + Send + Sync) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, move |ping: &Ping| sink.lock().push(ping.0))
    }

    #[test]
    fn test_publish_without_subscribers_is_noop() {
        let bus = Bus::new();
        bus.publish(&Ping(1));
    }

    #[test]
    fn test_delivers_in_registration_order() {
        let bus = Bus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for tag in 0..3_u32 {
            let sink = Arc::clone(&seen);
            bus.subscribe(move |_: &Pong| sink.lock().push(tag));
        }

        bus.publish(&Pong);

        assert_eq!(*seen.lock(), vec![0, 1, 2]);
    }

    #[test]
    fn test_keys_by_payload_type() {
        let bus = Bus::new();
        let (pings, on_ping) = collector();
        bus.subscribe(on_ping);

        bus.publish(&Pong);
        assert!(pings.lock().is_empty());

        bus.publish(&Ping(7));
        assert_eq!(*pings.lock(), vec![7]);
    }

    #[test]
    fn test_filtered_subscription() {
        let bus = Bus::new();
        let (seen, on_ping) = collector();
        bus.subscribe_filtered(|ping: &Ping| ping.0 % 2 == 0, on_ping);

        for n in 1..=4 {
            bus.publish(&Ping(n));
        }

        assert_eq!(*seen.lock(), vec![2, 4]);
    }

    #[test]
    fn test_panicking_handler_reaches_sink_and_rest_still_run() {
        let bus = Bus::new();
        let failures = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&failures);
        bus.set_failure_sink(Box::new(move |failure| {
            sink.lock().push(failure.to_string());
        }));

        let (seen, on_ping) = collector();
        bus.subscribe(|_: &Ping| panic!("listener exploded"));
        bus.subscribe(on_ping);

        bus.publish(&Ping(3));

        assert_eq!(*seen.lock(), vec![3]);
        let failures = failures.lock();
        assert_eq!(failures.len(), 1);
        assert!(failures[0].contains("listener exploded"));
    }

    #[test]
    fn test_reentrant_publish_from_handler() {
        let bus = Arc::new(Bus::new());
        let (pings, on_ping) = collector();

        let chained = Arc::clone(&bus);
        bus.subscribe(move |_: &Pong| chained.publish(&Ping(9)));
        bus.subscribe(on_ping);

        bus.publish(&Pong);

        assert_eq!(*pings.lock(), vec![9]);
    }

    #[test]
    fn test_subscribe_from_handler_does_not_deadlock() {
        let bus = Arc::new(Bus::new());
        let registrar = Arc::clone(&bus);
        bus.subscribe(move |_: &Pong| {
            registrar.subscribe(|_: &Ping| {});
        });

        bus.publish(&Pong);
        bus.publish(&Pong);
    }
}
