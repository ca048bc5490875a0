//! Page variables: the per-request key/value set that ends up in the tag.

use serde::{Deserialize, Serialize};

use crate::encoding::append_segment;
use crate::error::{Result, SaleCycleError};

/// Insertion-ordered mapping from variable key to value.
///
/// Rendering walks the entries in insertion order. Overwriting a key keeps
/// its original position. A request rarely holds more than a couple dozen
/// entries, so lookups are linear.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageVariables {
    entries: Vec<(String, String)>,
}

impl PageVariables {
    /// Create an empty variable set
    pub fn new() -> Self {
        Self::default()
    }

    /// Value stored under `key`, if any
    pub fn get(&self, key: &str) -> Option<&str> {
        self.position(key).map(|i| self.entries[i].1.as_str())
    }

    /// Returns true if `key` has a value
    pub fn contains_key(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// Returns the previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let key = key.into();
        let value = value.into();
        match self.position(&key) {
            Some(i) => Some(std::mem::replace(&mut self.entries[i].1, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Store `value` under `key` only if the key is absent.
    ///
    /// # Errors
    ///
    /// `DuplicateVariable` if the key already has a value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Result<()> {
        let key = key.into();
        if self.contains_key(&key) {
            return Err(SaleCycleError::DuplicateVariable(key));
        }
        self.entries.push((key, value.into()));
        Ok(())
    }

    /// Append a pipe-delimited segment to the accumulator stored under `key`.
    pub fn append(&mut self, key: &str, segment: &str) {
        match self.position(key) {
            Some(i) => {
                let joined = append_segment(Some(&self.entries[i].1), segment);
                self.entries[i].1 = joined;
            }
            None => self
                .entries
                .push((key.to_string(), append_segment(None, segment))),
        }
    }

    /// Remove `key`, returning its value
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.position(key).map(|i| self.entries.remove(i).1)
    }

    /// Iterate entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k == key)
    }
}

impl<K, V> FromIterator<(K, V)> for PageVariables
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut vars = Self::new();
        for (k, v) in iter {
            vars.set(k, v);
        }
        vars
    }
}
