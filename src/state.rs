//! Request-scoped state backends.
//!
//! The tag keeps its page variables in whatever per-request storage the host
//! provides. Hosts plug in through [`StateStorage`]; two backends ship with
//! the crate:
//!
//! - [`RequestStateStorage`] is created by the host when a request starts and
//!   dropped when it ends (attach it to the framework's request extensions).
//! - [`InMemoryStateStorage`] is a test double that outlives the tags built on
//!   it and counts writes, so tests can inspect what a tag stored.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;

/// Key under which the page variables live in the state backend
pub const STATE_KEY: &str = "__salecycle__";

/// Per-request slot storage keyed by string.
///
/// The trait is object-safe; use [`StateStorageExt`] for typed access.
pub trait StateStorage {
    /// Mutable access to the value stored under `key`
    fn get_slot(&mut self, key: &str) -> Option<&mut (dyn Any + Send + 'static)>;

    /// Store `value` under `key`, replacing whatever was there
    fn set_slot(&mut self, key: &str, value: Box<dyn Any + Send>);
}

/// Typed helpers over any [`StateStorage`].
pub trait StateStorageExt: StateStorage {
    /// Value under `key` if present and of type `T`
    fn get<T: Any + Send>(&mut self, key: &str) -> Option<&mut T> {
        self.get_slot(key)?.downcast_mut::<T>()
    }

    /// Store a typed value under `key`
    fn set<T: Any + Send>(&mut self, key: &str, value: T) {
        self.set_slot(key, Box::new(value));
    }
}

impl<S: StateStorage + ?Sized> StateStorageExt for S {}

impl<S: StateStorage + ?Sized> StateStorage for &mut S {
    fn get_slot(&mut self, key: &str) -> Option<&mut (dyn Any + Send + 'static)> {
        (**self).get_slot(key)
    }

    fn set_slot(&mut self, key: &str, value: Box<dyn Any + Send>) {
        (**self).set_slot(key, value);
    }
}

impl<S: StateStorage + ?Sized> StateStorage for Box<S> {
    fn get_slot(&mut self, key: &str) -> Option<&mut (dyn Any + Send + 'static)> {
        (**self).get_slot(key)
    }

    fn set_slot(&mut self, key: &str, value: Box<dyn Any + Send>) {
        (**self).set_slot(key, value);
    }
}

/// Production backend: slots owned by a single request.
#[derive(Default)]
pub struct RequestStateStorage {
    slots: HashMap<String, Box<dyn Any + Send>>,
}

impl RequestStateStorage {
    /// Empty storage for a new request
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if a slot exists under `key`
    pub fn contains(&self, key: &str) -> bool {
        self.slots.contains_key(key)
    }
}

impl StateStorage for RequestStateStorage {
    fn get_slot(&mut self, key: &str) -> Option<&mut (dyn Any + Send + 'static)> {
        self.slots.get_mut(key).map(|slot| &mut **slot)
    }

    fn set_slot(&mut self, key: &str, value: Box<dyn Any + Send>) {
        self.slots.insert(key.to_string(), value);
    }
}

impl fmt::Debug for RequestStateStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestStateStorage")
            .field("keys", &self.slots.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Test backend: in-memory slots plus a write counter.
///
/// Lend it to a tag with `&mut` and inspect it after the tag is dropped.
#[derive(Default)]
pub struct InMemoryStateStorage {
    slots: HashMap<String, Box<dyn Any + Send>>,
    writes: usize,
}

impl InMemoryStateStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `set_slot` calls so far
    pub fn write_count(&self) -> usize {
        self.writes
    }

    /// Returns true if a slot exists under `key`
    pub fn contains(&self, key: &str) -> bool {
        self.slots.contains_key(key)
    }

    /// Shared view of a typed slot
    pub fn peek<T: Any>(&self, key: &str) -> Option<&T> {
        self.slots.get(key)?.downcast_ref::<T>()
    }

    /// Drop every slot, as if a new request started
    pub fn clear(&mut self) {
        self.slots.clear();
        self.writes = 0;
    }
}

impl StateStorage for InMemoryStateStorage {
    fn get_slot(&mut self, key: &str) -> Option<&mut (dyn Any + Send + 'static)> {
        self.slots.get_mut(key).map(|slot| &mut **slot)
    }

    fn set_slot(&mut self, key: &str, value: Box<dyn Any + Send>) {
        self.writes += 1;
        self.slots.insert(key.to_string(), value);
    }
}

impl fmt::Debug for InMemoryStateStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryStateStorage")
            .field("keys", &self.slots.keys().collect::<Vec<_>>())
            .field("writes", &self.writes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_get_and_set() {
        let mut storage = RequestStateStorage::new();
        assert!(storage.get::<u32>("answer").is_none());

        storage.set("answer", 41u32);
        *storage.get::<u32>("answer").unwrap() += 1;
        assert_eq!(storage.get::<u32>("answer"), Some(&mut 42));
    }

    #[test]
    fn test_wrong_type_reads_as_absent() {
        let mut storage = RequestStateStorage::new();
        storage.set(STATE_KEY, "not page variables".to_string());
        assert!(storage.contains(STATE_KEY));
        assert!(storage.get::<u32>(STATE_KEY).is_none());
    }

    #[test]
    fn test_in_memory_counts_writes_through_borrow() {
        let mut storage = InMemoryStateStorage::new();
        {
            let lent = &mut storage;
            lent.set("a", 1u8);
            lent.set("a", 2u8);
        }
        assert_eq!(storage.write_count(), 2);
        assert_eq!(storage.peek::<u8>("a"), Some(&2));

        storage.clear();
        assert!(!storage.contains("a"));
        assert_eq!(storage.write_count(), 0);
    }

    #[test]
    fn test_boxed_backend() {
        let mut storage: Box<dyn StateStorage> = Box::new(RequestStateStorage::new());
        storage.set("k", 7i64);
        assert_eq!(storage.get::<i64>("k"), Some(&mut 7));
    }
}
