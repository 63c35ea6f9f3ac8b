// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use super::{NodeId, SkipList};
use std::iter::FusedIterator;

/// Scan direction
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum Direction {
    /// Ascending order
    #[default]
    Forward,

    /// Descending order
    Backward,
}

impl Direction {
    /// Returns `true` if scanning in ascending order.
    #[must_use]
    pub fn is_forward(self) -> bool {
        self == Self::Forward
    }
}

/// A node slot plus the generation it was observed with
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Position {
    pub(super) id: NodeId,
    pub(super) generation: u32,
}

/// One-shot cursor over a [`SkipList`]
///
/// Every call to `next` moves exactly one step on level 0, then checks for
/// the sentinel and the limit.
pub struct Cursor<'a, T> {
    list: &'a SkipList<T>,

    /// `None` once exhausted
    position: Option<Position>,

    direction: Direction,
    remaining: usize,
}

impl<'a, T> Cursor<'a, T> {
    pub(super) fn new(
        list: &'a SkipList<T>,
        position: Option<Position>,
        direction: Direction,
        limit: usize,
    ) -> Self {
        Self {
            list,
            position,
            direction,
            remaining: limit,
        }
    }
}

impl<'a, T> Iterator for Cursor<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let position = self.position?;

        let Some(next) = self.list.step(position, self.direction) else {
            self.position = None;
            return None;
        };

        if self.remaining == 0 {
            self.position = None;
            return None;
        }
        self.remaining -= 1;
        self.position = Some(next);

        self.list.value_at(next)
    }
}

impl<T> FusedIterator for Cursor<'_, T> {}
