// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Key/value scratch space scoped to one test execution.

use std::{
    any::{type_name, Any},
    fmt,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use linked_hash_map::LinkedHashMap;
use parking_lot::Mutex;

use crate::event::{Bus, StoreMutated};

use super::Error;

/// Key of the reserved computed-result slot.
pub const ACTUAL_KEY: &str = "actual";

/// Key of the reserved system-under-test slot.
pub const SUT_KEY: &str = "sut";

type Value = Arc<dyn Any + Send + Sync>;
type Teardown = Box<dyn FnOnce() + Send>;

struct Slot {
    value: Value,
    teardown: Option<Teardown>,
}

/// Untyped key/value storage shared by all actions of one test.
///
/// Writes are last-write-wins and announced as [`StoreMutated`] on the
/// scope's bus after the internal lock is released, so a listener may read
/// or write the store again from the same thread without deadlocking.
///
/// We use a [`LinkedHashMap`] so teardown runs in a deterministic order:
/// values registered through [`insert_teardown()`] are released in reverse
/// insertion order during scope teardown.
///
/// [`insert_teardown()`]: RunStore::insert_teardown
pub struct RunStore {
    slots: Mutex<LinkedHashMap<String, Slot>>,
    bus: Arc<Bus>,
    anon_seq: AtomicUsize,
}

impl RunStore {
    pub(crate) fn new(bus: Arc<Bus>) -> Self {
        Self {
            slots: Mutex::new(LinkedHashMap::new()),
            bus,
            anon_seq: AtomicUsize::new(0),
        }
    }

    /// Upserts `value` under `key` and announces the write.
    ///
    /// If the displaced value carried a teardown thunk, the thunk runs
    /// before the announcement: replacing a managed resource releases it.
    pub fn insert<T>(&self, key: impl Into<String>, value: T)
    where
        T: Any + Send + Sync,
    {
        self.insert_slot(key.into(), Arc::new(value), None);
    }

    /// Stores `value` under a generated unique key, returning the key.
    pub fn insert_anonymous<T>(&self, value: T) -> String
    where
        T: Any + Send + Sync,
    {
        let n = self.anon_seq.fetch_add(1, Ordering::SeqCst);
        let key = format!("anonymous-{n}");
        self.insert(key.clone(), value);
        key
    }

    /// Stores `value` together with a release thunk invoked during scope
    /// teardown (or immediately when the value is displaced by a later
    /// write under the same key).
    pub fn insert_teardown<T, F>(&self, key: impl Into<String>, value: T, teardown: F)
    where
        T: Any + Send + Sync,
        F: FnOnce(Arc<T>) + Send + 'static,
    {
        let value = Arc::new(value);
        let stored: Value = Arc::<T>::clone(&value);
        self.insert_slot(key.into(), stored, Some(Box::new(move || teardown(value))));
    }

    /// Stores the computed result in the reserved [`ACTUAL_KEY`] slot.
    pub fn insert_actual<T>(&self, value: T)
    where
        T: Any + Send + Sync,
    {
        self.insert(ACTUAL_KEY, value);
    }

    /// Stores a value describing the system under test in the reserved
    /// [`SUT_KEY`] slot.
    pub fn insert_sut_value<T>(&self, value: T)
    where
        T: Any + Send + Sync,
    {
        self.insert(SUT_KEY, value);
    }

    /// Reads the value under `key`, downcast to `T`.
    ///
    /// # Errors
    ///
    /// [`Error::Missing`] if the key is absent, [`Error::TypeMismatch`] if
    /// the stored value is not a `T`.
    pub fn read<T>(&self, key: &str) -> super::Result<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        let value = self
            .slots
            .lock()
            .get(key)
            .map(|slot| Arc::clone(&slot.value))
            .ok_or_else(|| Error::Missing { key: key.to_owned() })?;
        value.downcast::<T>().map_err(|_| Error::TypeMismatch {
            key: key.to_owned(),
            expected: type_name::<T>(),
        })
    }

    /// Reads the raw value under `key`; absence is [`None`], not an error.
    #[must_use]
    pub fn read_raw(&self, key: &str) -> Option<Value> {
        self.slots.lock().get(key).map(|slot| Arc::clone(&slot.value))
    }

    /// Finds the single stored value of type `T`, whatever its key.
    ///
    /// This is the "find the one thing of this kind" idiom for tests that
    /// store exactly one instance of some type.
    ///
    /// # Errors
    ///
    /// [`Error::NoneOfType`] if no value downcasts to `T`,
    /// [`Error::ManyOfType`] if several do.
    pub fn read_single<T>(&self) -> super::Result<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        let slots = self.slots.lock();
        let mut hits = slots
            .values()
            .filter_map(|slot| Arc::clone(&slot.value).downcast::<T>().ok());
        match (hits.next(), hits.next()) {
            (Some(value), None) => Ok(value),
            (None, _) => Err(Error::NoneOfType { type_name: type_name::<T>() }),
            (Some(_), Some(_)) => {
                Err(Error::ManyOfType { type_name: type_name::<T>() })
            }
        }
    }

    /// Reads the reserved [`ACTUAL_KEY`] slot.
    ///
    /// # Errors
    ///
    /// See [`RunStore::read`].
    pub fn actual<T>(&self) -> super::Result<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        self.read(ACTUAL_KEY)
    }

    /// Reads the reserved [`SUT_KEY`] slot.
    ///
    /// # Errors
    ///
    /// See [`RunStore::read`].
    pub fn sut_value<T>(&self) -> super::Result<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        self.read(SUT_KEY)
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    /// Whether the store holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.lock().is_empty()
    }

    /// Releases every stored value, running teardown thunks in reverse
    /// insertion order. Called during scope teardown.
    pub fn dispose_all(&self) {
        let mut thunks = Vec::new();
        {
            let mut slots = self.slots.lock();
            while let Some((_, slot)) = slots.pop_back() {
                if let Some(thunk) = slot.teardown {
                    thunks.push(thunk);
                }
            }
        }
        for thunk in thunks {
            thunk();
        }
    }

    fn insert_slot(&self, key: String, value: Value, teardown: Option<Teardown>) {
        let displaced;
        let notification;
        {
            let mut slots = self.slots.lock();
            let old = slots.insert(
                key.clone(),
                Slot { value: Arc::clone(&value), teardown },
            );
            let (old_value, old_teardown) = match old {
                Some(slot) => (Some(slot.value), slot.teardown),
                None => (None, None),
            };
            displaced = old_teardown;
            notification = StoreMutated {
                key,
                value,
                is_new: old_value.is_none(),
                old_value,
            };
        }
        if let Some(thunk) = displaced {
            thunk();
        }
        self.bus.publish(&notification);
    }
}

impl fmt::Debug for RunStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunStore")
            .field("keys", &self.slots.lock().keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
