// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{UserKey, UserValue};
use std::{borrow::Borrow, cmp::Ordering};

/// A key-value pair stored in a sorted map
///
/// Entries are ordered by comparing their keys byte-wise in lexicographic
/// order; the value does not take part in comparisons.
///
/// The value is optional, so a sorted map can also be used as a sorted set.
#[derive(Clone)]
pub struct Entry {
    key: UserKey,
    value: Option<UserValue>,
}

impl Entry {
    /// Creates a new entry.
    pub fn new<K: Into<UserKey>>(key: K, value: Option<UserValue>) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }

    /// Returns the key.
    #[must_use]
    pub fn key(&self) -> &UserKey {
        &self.key
    }

    /// Returns the value, if any.
    #[must_use]
    pub fn value(&self) -> Option<&UserValue> {
        self.value.as_ref()
    }

    /// Consumes the entry, returning its value.
    #[must_use]
    pub fn into_value(self) -> Option<UserValue> {
        self.value
    }

    /// Consumes the entry, returning key and value.
    #[must_use]
    pub fn into_parts(self) -> (UserKey, Option<UserValue>) {
        (self.key, self.value)
    }

    /// Approximate amount of bytes held by the entry.
    #[must_use]
    pub fn size(&self) -> u64 {
        let value_len = self.value.as_ref().map_or(0, |v| v.len());
        (self.key.len() + value_len) as u64
    }
}

impl Borrow<[u8]> for Entry {
    fn borrow(&self) -> &[u8] {
        &self.key
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.key.as_ref() == other.key.as_ref()
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.as_ref().cmp(other.key.as_ref())
    }
}

impl std::fmt::Debug for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.value {
            Some(value) => write!(f, "({:?},{:?})", &*self.key, &**value),
            None => write!(f, "({:?},None)", &*self.key),
        }
    }
}
