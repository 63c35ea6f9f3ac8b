// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

mod iter;

pub use iter::Iter;

use crate::{
    skiplist::{Direction, SkipList},
    Config, Entry, Error, OpKind, Operation, UserKey, UserValue,
};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, RwLock, RwLockReadGuard, RwLockWriteGuard,
};

#[allow(clippy::module_name_repetitions)]
pub struct SortedMapInner {
    /// The index; not thread-safe by itself
    list: RwLock<SkipList<Entry>>,

    /// Mirrors the length of the list, so it can be read without locking
    len: AtomicU64,

    /// Sum of key and value bytes
    approximate_size: AtomicU64,

    config: Config,
}

/// A map of byte keys to optional byte values, sorted by key
///
/// Keys are compared byte-wise in lexicographic order, so any serialization
/// that sorts correctly as bytes (big-endian integers, strings,
/// composite keys, ...) can be used.
///
/// All writes and point reads go through one read-write lock. Iterators only
/// hold the lock for each single step.
///
/// The handle is cheap to clone; clones refer to the same map.
#[derive(Clone)]
pub struct SortedMap(pub(crate) Arc<SortedMapInner>);

impl Default for SortedMap {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SortedMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SortedMap")
            .field("len", &self.len())
            .field("approximate_size", &self.approximate_size())
            .finish_non_exhaustive()
    }
}

fn check_key(key: &[u8]) -> crate::Result<()> {
    if key.is_empty() {
        Err(Error::InvalidKey)
    } else {
        Ok(())
    }
}

impl SortedMap {
    /// Creates an empty sorted map with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Creates an empty sorted map.
    #[must_use]
    pub fn with_config(config: Config) -> Self {
        let list = SkipList::new(config.level_probability, config.seed);

        Self(Arc::new(SortedMapInner {
            list: RwLock::new(list),
            len: AtomicU64::default(),
            approximate_size: AtomicU64::default(),
            config,
        }))
    }

    /// Returns the configuration of the map.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.0.config
    }

    pub(crate) fn read_lock(&self) -> RwLockReadGuard<'_, SkipList<Entry>> {
        self.0.list.read().expect("lock is poisoned")
    }

    fn write_lock(&self) -> RwLockWriteGuard<'_, SkipList<Entry>> {
        self.0.list.write().expect("lock is poisoned")
    }

    /// Returns the amount of entries.
    ///
    /// This is a relaxed read that does not take the lock, so it may lag
    /// behind concurrent writes.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.0.len.load(Ordering::Relaxed)
    }

    /// Returns `true` if the map contains no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the approximate amount of key and value bytes stored.
    #[must_use]
    pub fn approximate_size(&self) -> u64 {
        self.0.approximate_size.load(Ordering::Relaxed)
    }

    /// Returns the entry of the given key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`] if the key is empty.
    pub fn get_entry<K: AsRef<[u8]>>(&self, key: K) -> crate::Result<Option<Entry>> {
        let key = key.as_ref();
        check_key(key)?;

        let list = self.read_lock();

        // NOTE: Probe the nearest entry at or after the key, it only
        // counts as a hit if the keys are equal
        Ok(list
            .cursor_from(key, Direction::Forward, 0, 1)
            .next()
            .filter(|entry| entry.key().as_ref() == key)
            .cloned())
    }

    /// Returns the value of the given key.
    ///
    /// `None` is returned both if the key does not exist and if it exists
    /// without a value, see [`SortedMap::contains_key`] to distinguish.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`] if the key is empty.
    pub fn get<K: AsRef<[u8]>>(&self, key: K) -> crate::Result<Option<UserValue>> {
        Ok(self.get_entry(key)?.and_then(Entry::into_value))
    }

    /// Returns `true` if the map contains the given key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`] if the key is empty.
    pub fn contains_key<K: AsRef<[u8]>>(&self, key: K) -> crate::Result<bool> {
        Ok(self.get_entry(key)?.is_some())
    }

    fn put_locked(
        &self,
        list: &mut SkipList<Entry>,
        entry: Entry,
        replace_if_exists: bool,
    ) -> Option<UserValue> {
        let size = entry.size();

        match list.put(entry, replace_if_exists) {
            None => {
                self.0.len.fetch_add(1, Ordering::Relaxed);
                self.0.approximate_size.fetch_add(size, Ordering::Relaxed);
                None
            }
            Some(old) => {
                if replace_if_exists {
                    self.0.approximate_size.fetch_add(size, Ordering::Relaxed);
                    self.0.approximate_size.fetch_sub(old.size(), Ordering::Relaxed);
                }
                old.into_value()
            }
        }
    }

    fn remove_locked(&self, list: &mut SkipList<Entry>, key: &[u8]) -> Option<UserValue> {
        let old = list.remove(key)?;

        self.0.len.fetch_sub(1, Ordering::Relaxed);
        self.0.approximate_size.fetch_sub(old.size(), Ordering::Relaxed);

        old.into_value()
    }

    /// Inserts a key with an optional value.
    ///
    /// If the key exists, its previous value is returned, and replaced only
    /// if `replace_if_exists` is `true`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`] if the key is empty.
    pub fn insert<K: Into<UserKey>>(
        &self,
        key: K,
        value: Option<UserValue>,
        replace_if_exists: bool,
    ) -> crate::Result<Option<UserValue>> {
        let key = key.into();
        check_key(&key)?;

        let mut list = self.write_lock();
        Ok(self.put_locked(&mut list, Entry::new(key, value), replace_if_exists))
    }

    /// Inserts or replaces a key-value pair, returning the previous value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`] if the key is empty.
    pub fn put<K: Into<UserKey>, V: Into<UserValue>>(
        &self,
        key: K,
        value: V,
    ) -> crate::Result<Option<UserValue>> {
        self.insert(key, Some(value.into()), true)
    }

    /// Inserts a key-value pair only if the key does not exist yet.
    ///
    /// Returns the existing value if the key exists.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`] if the key is empty.
    pub fn put_if_absent<K: Into<UserKey>, V: Into<UserValue>>(
        &self,
        key: K,
        value: V,
    ) -> crate::Result<Option<UserValue>> {
        self.insert(key, Some(value.into()), false)
    }

    /// Removes a key, returning its value.
    ///
    /// Removing a key that does not exist is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`] if the key is empty.
    pub fn remove<K: AsRef<[u8]>>(&self, key: K) -> crate::Result<Option<UserValue>> {
        let key = key.as_ref();
        check_key(key)?;

        let mut list = self.write_lock();
        Ok(self.remove_locked(&mut list, key))
    }

    /// Returns an iterator over the map.
    ///
    /// Scanning forward from `from_key`, the first entry is the smallest one
    /// with a key greater or equal to `from_key`; scanning backward, it is the
    /// greatest one with a key less or equal to `from_key`. Without a start
    /// key (or with an empty one) the scan starts at the respective end of the
    /// map.
    ///
    /// `offset` entries are skipped, then at most `limit` entries are produced.
    ///
    /// The iterator does not hold the lock between steps: writes that happen
    /// while iterating may or may not be observed, but keys are never yielded
    /// twice and always in order.
    #[must_use]
    pub fn iter(
        &self,
        from_key: Option<&[u8]>,
        direction: Direction,
        offset: usize,
        limit: usize,
    ) -> Iter {
        let from_key = from_key.filter(|key| !key.is_empty());

        let list = self.read_lock();
        let position = list.seek(from_key, direction, offset);
        let anchor = position
            .and_then(|position| list.value_at(position))
            .map(|entry| entry.key().clone());
        drop(list);

        Iter::new(self.clone(), position, anchor, direction, limit)
    }

    /// Returns an iterator over all entries in ascending key order.
    #[must_use]
    pub fn iter_all(&self) -> Iter {
        self.iter(None, Direction::Forward, 0, usize::MAX)
    }

    /// Applies a batch of operations while holding the write lock.
    ///
    /// No other reader or writer can observe the map in between operations of
    /// the batch. The batch is **not** rolled back on error: if an operation
    /// is invalid, the operations before it stay applied and the error is
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyBatch`] if there are no operations,
    /// [`Error::UnknownOp`] for an unrecognized operation tag, and
    /// [`Error::InvalidKey`] for an empty key.
    pub fn apply_transaction(&self, ops: &[Operation]) -> crate::Result<()> {
        if ops.is_empty() {
            return Err(Error::EmptyBatch);
        }

        let mut list = self.write_lock();

        for (idx, op) in ops.iter().enumerate() {
            if let Err(e) = self.apply_locked(&mut list, op) {
                log::debug!(
                    "Transaction stopped at operation {idx}/{}: {e}",
                    ops.len(),
                );
                return Err(e);
            }
        }

        log::trace!("Applied transaction of {} operations", ops.len());

        Ok(())
    }

    fn apply_locked(&self, list: &mut SkipList<Entry>, op: &Operation) -> crate::Result<()> {
        let kind = op.kind()?;
        check_key(&op.key)?;

        match kind {
            OpKind::Put => {
                self.put_locked(list, Entry::new(op.key.clone(), op.value.clone()), true);
            }
            OpKind::PutIfAbsent => {
                self.put_locked(list, Entry::new(op.key.clone(), op.value.clone()), false);
            }
            OpKind::Remove => {
                self.remove_locked(list, &op.key);
            }
        }

        Ok(())
    }

    /// Consumes a stream of operations, applying them one by one.
    ///
    /// Every operation takes the lock on its own, so other readers and writers
    /// may interleave. The stream ends successfully when the source is
    /// exhausted; for a channel, that is when all senders are dropped.
    ///
    /// Returns the amount of applied operations.
    ///
    /// # Errors
    ///
    /// Stops at, and returns, the first invalid operation
    /// ([`Error::UnknownOp`] or [`Error::InvalidKey`]).
    pub fn ingest<I: IntoIterator<Item = Operation>>(&self, source: I) -> crate::Result<u64> {
        let start = std::time::Instant::now();
        let mut count = 0;

        for op in source {
            match op.kind()? {
                OpKind::Put => {
                    self.insert(op.key, op.value, true)?;
                }
                OpKind::PutIfAbsent => {
                    self.insert(op.key, op.value, false)?;
                }
                OpKind::Remove => {
                    self.remove(op.key)?;
                }
            }
            count += 1;
        }

        log::debug!("Ingested {count} operations in {:?}", start.elapsed());

        Ok(count)
    }

    /// Dumps the skiplist levels of the map, top level first.
    #[must_use]
    pub fn dump(&self) -> String {
        self.read_lock().dump()
    }
}
