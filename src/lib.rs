// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! An in-memory, ordered key-value store built on a ring skiplist.
//!
//! ##### About
//!
//! This crate exports a [`SortedMap`] that maps byte keys to optional byte
//! values, sorted byte-wise by key. It supports point reads and writes,
//! bidirectional range scans with offset and limit, batched transactions
//! and ingestion of operation streams.
//!
//! Maps can be used standalone, or be kept by name in a [`Registry`].
//!
//! The index is a [`SkipList`](skiplist::SkipList): a single-threaded,
//! generic skiplist whose levels are closed into rings by one sentinel node.
//! A sorted map wraps it in a read-write lock.
//!
//! Nothing is persisted; dropping a map frees its contents.
//!
//! ```
//! use lexmap::{Direction, SortedMap};
//!
//! let map = SortedMap::new();
//! map.put("b", "2")?;
//! map.put("a", "1")?;
//! map.put("c", "3")?;
//!
//! assert_eq!(Some("2".into()), map.get("b")?);
//!
//! let keys = map
//!     .iter(Some(b"b".as_slice()), Direction::Backward, 0, 10)
//!     .map(|(k, _)| k)
//!     .collect::<Vec<_>>();
//! assert_eq!(keys, vec!["b", "a"]);
//! # Ok::<(), lexmap::Error>(())
//! ```

#![deny(clippy::all, missing_docs, clippy::cargo)]
#![deny(clippy::unwrap_used)]
#![warn(clippy::pedantic, clippy::nursery)]
#![warn(clippy::expect_used)]
#![allow(clippy::missing_const_for_fn)]
#![warn(clippy::multiple_crate_versions)]
#![allow(clippy::option_if_let_else)]
#![warn(clippy::redundant_feature_names)]

#[doc(hidden)]
pub type HashMap<K, V> = std::collections::HashMap<K, V, rustc_hash::FxBuildHasher>;

/// Configuration
pub mod config;

mod entry;
mod error;
mod operation;
mod registry;

/// Skiplist used as the index of sorted maps
pub mod skiplist;

mod slice;
mod sorted_map;

/// User defined key (byte array)
pub type UserKey = Slice;

/// User defined data (byte array)
pub type UserValue = Slice;

/// KV-tuple (key + optional value)
pub type KvPair = (UserKey, Option<UserValue>);

pub use {
    config::Config,
    entry::Entry,
    error::{Error, Result},
    operation::{OpKind, Operation},
    registry::{MapKind, Registry},
    skiplist::{Cursor, Direction, SkipList},
    slice::Slice,
    sorted_map::{Iter, SortedMap},
};
