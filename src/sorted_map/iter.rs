// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use super::SortedMap;
use crate::{
    skiplist::{Direction, Position},
    KvPair, UserKey,
};
use std::iter::FusedIterator;

/// Iterator over a [`SortedMap`]
///
/// The read lock is only taken for each step. If the entry the iterator
/// stands on is removed in between, the iterator resumes right after its key.
pub struct Iter {
    map: SortedMap,

    /// Last produced node, or the node before the first one
    ///
    /// `None` once exhausted
    position: Option<Position>,

    /// Key at `position` (`None` for the sentinel)
    anchor: Option<UserKey>,

    direction: Direction,
    remaining: usize,
}

impl Iter {
    pub(super) fn new(
        map: SortedMap,
        position: Option<Position>,
        anchor: Option<UserKey>,
        direction: Direction,
        limit: usize,
    ) -> Self {
        Self {
            map,
            position,
            anchor,
            direction,
            remaining: limit,
        }
    }

    /// Returns the scan direction.
    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction
    }
}

impl Iterator for Iter {
    type Item = KvPair;

    fn next(&mut self) -> Option<Self::Item> {
        let position = self.position?;

        if self.remaining == 0 {
            self.position = None;
            return None;
        }

        let list = self.map.read_lock();

        let position = if list.is_valid(position) {
            position
        } else if let Some(anchor) = &self.anchor {
            log::trace!("Iterator node was removed, resuming after {anchor:?}");
            list.seek_past::<[u8]>(anchor, self.direction)
        } else {
            // The sentinel is never removed
            self.position = None;
            return None;
        };

        let Some((next, entry)) = list
            .step(position, self.direction)
            .and_then(|next| Some((next, list.value_at(next)?.clone())))
        else {
            self.position = None;
            return None;
        };
        drop(list);

        self.remaining -= 1;
        self.position = Some(next);
        self.anchor = Some(entry.key().clone());

        Some(entry.into_parts())
    }
}

impl FusedIterator for Iter {}
