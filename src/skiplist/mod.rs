// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! A single-threaded skiplist used as the index of a sorted map.
//!
//! The list is laid out as a ring: one sentinel node acts as both the head
//! (-inf) and the tail (+inf) of every level, so scans never have to
//! special-case the boundaries.
//!
//! Nodes are stored in a slab and linked by slot index. Every node has
//! a fixed number of forward links (its level) and one backward link
//! that is only maintained on level 0, so backward iteration is only
//! possible over leaf nodes.
//!
//! The list does not synchronize anything. Mutation requires `&mut self`,
//! locking is left to the caller.

mod cursor;
mod level;

pub use cursor::{Cursor, Direction};

pub(crate) use cursor::Position;

use level::LevelGenerator;
use std::{borrow::Borrow, fmt::Write};


/// Slot index of a node
pub(crate) type NodeId = usize;

/// The sentinel always lives in the first slot
const SENTINEL: NodeId = 0;

struct Node<T> {
    /// `None` only for the sentinel
    value: Option<T>,

    /// Forward links, one per level this node participates in
    nexts: Box<[NodeId]>,

    /// Backward link on level 0
    prev: NodeId,
}

impl<T> Node<T> {
    fn level(&self) -> usize {
        self.nexts.len()
    }
}

struct Slot<T> {
    /// Bumped every time the slot is freed, so stale positions can be detected
    generation: u32,
    node: Option<Node<T>>,
}

/// A ring skiplist ordered by `T: Ord`
pub struct SkipList<T> {
    slots: Vec<Slot<T>>,
    free: Vec<NodeId>,
    len: usize,
    levels: LevelGenerator,
}

impl<T> SkipList<T> {
    /// Creates an empty list.
    ///
    /// `probability` is the chance of a node being lifted to the next level,
    /// `seed` seeds the level generator.
    ///
    /// # Panics
    ///
    /// Panics if `probability` is not in `(0.0, 1.0)`.
    #[must_use]
    pub fn new(probability: f64, seed: u32) -> Self {
        let sentinel = Node {
            value: None,
            nexts: vec![SENTINEL].into_boxed_slice(),
            prev: SENTINEL,
        };

        Self {
            slots: vec![Slot {
                generation: 0,
                node: Some(sentinel),
            }],
            free: Vec::new(),
            len: 0,
            levels: LevelGenerator::new(probability, seed),
        }
    }

    /// Returns the amount of stored values (the sentinel is not counted).
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the list holds no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the current amount of levels.
    #[must_use]
    pub fn height(&self) -> usize {
        self.node(SENTINEL).level()
    }

    fn node(&self, id: NodeId) -> &Node<T> {
        self.slots
            .get(id)
            .and_then(|slot| slot.node.as_ref())
            .unwrap_or_else(|| panic!("skiplist link points to free slot {id}"))
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node<T> {
        self.slots
            .get_mut(id)
            .and_then(|slot| slot.node.as_mut())
            .unwrap_or_else(|| panic!("skiplist link points to free slot {id}"))
    }

    fn next(&self, id: NodeId, level: usize) -> NodeId {
        self.node(id).nexts[level]
    }

    fn prev(&self, id: NodeId) -> NodeId {
        self.node(id).prev
    }

    /// Moves one step on level 0 in the given direction.
    fn advance(&self, id: NodeId, direction: Direction) -> NodeId {
        match direction {
            Direction::Forward => self.next(id, 0),
            Direction::Backward => self.prev(id),
        }
    }

    fn value(&self, id: NodeId) -> &T {
        match &self.node(id).value {
            Some(value) => value,
            None => panic!("sentinel has no value, node {id} was treated as a regular node"),
        }
    }

    fn value_mut(&mut self, id: NodeId) -> &mut T {
        match &mut self.node_mut(id).value {
            Some(value) => value,
            None => panic!("sentinel has no value, node {id} was treated as a regular node"),
        }
    }

    fn alloc(&mut self, value: T, level: usize) -> NodeId {
        let node = Node {
            value: Some(value),
            nexts: vec![SENTINEL; level].into_boxed_slice(),
            prev: SENTINEL,
        };

        if let Some(id) = self.free.pop() {
            if let Some(slot) = self.slots.get_mut(id) {
                slot.node = Some(node);
                return id;
            }
        }

        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        self.slots.len() - 1
    }

    fn release(&mut self, id: NodeId) -> Node<T> {
        let slot = self
            .slots
            .get_mut(id)
            .unwrap_or_else(|| panic!("released unknown slot {id}"));

        let node = slot
            .node
            .take()
            .unwrap_or_else(|| panic!("released free slot {id}"));

        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id);
        node
    }

    /// Sets the amount of levels of the sentinel.
    ///
    /// New levels are empty rings (the sentinel points to itself).
    fn set_height(&mut self, height: usize) {
        let sentinel = self.node_mut(SENTINEL);
        let mut nexts = std::mem::take(&mut sentinel.nexts).into_vec();
        nexts.resize(height, SENTINEL);
        sentinel.nexts = nexts.into_boxed_slice();
    }

    /// Drops empty top levels, but never the last one.
    fn trim_levels(&mut self) {
        let mut height = self.height();
        while height > 1 && self.next(SENTINEL, height - 1) == SENTINEL {
            height -= 1;
        }

        if height < self.height() {
            log::trace!("skiplist shrinks from {} to {height} levels", self.height());
            self.set_height(height);
        }
    }

    pub(crate) fn position(&self, id: NodeId) -> Position {
        let generation = self.slots.get(id).map_or(0, |slot| slot.generation);
        Position { id, generation }
    }

    /// Returns `true` if the node at the position still exists.
    pub(crate) fn is_valid(&self, position: Position) -> bool {
        self.slots.get(position.id).is_some_and(|slot| {
            slot.generation == position.generation && slot.node.is_some()
        })
    }

    /// Returns the value at the position, or `None` for the sentinel.
    pub(crate) fn value_at(&self, position: Position) -> Option<&T> {
        self.node(position.id).value.as_ref()
    }

    /// Moves one step away from a valid position.
    ///
    /// Returns `None` when the step reaches the sentinel.
    pub(crate) fn step(&self, position: Position, direction: Direction) -> Option<Position> {
        let id = self.advance(position.id, direction);
        (id != SENTINEL).then(|| self.position(id))
    }

    /// Returns an iterator over all values in ascending order.
    #[must_use]
    pub fn iter(&self) -> Cursor<'_, T> {
        self.cursor(Direction::Forward, 0, usize::MAX)
    }

    /// Returns a cursor starting at the sentinel.
    ///
    /// Scanning forward starts at the smallest value, scanning backward
    /// at the greatest value. `offset` values are skipped, at most `limit`
    /// values are produced.
    #[must_use]
    pub fn cursor(&self, direction: Direction, offset: usize, limit: usize) -> Cursor<'_, T> {
        let start = self.skip(SENTINEL, direction, offset);
        Cursor::new(self, start, direction, limit)
    }

    /// Skips `offset` nodes, returns `None` if the sentinel is reached on the way.
    fn skip(&self, mut id: NodeId, direction: Direction, offset: usize) -> Option<Position> {
        for _ in 0..offset {
            id = self.advance(id, direction);
            if id == SENTINEL {
                return None;
            }
        }
        Some(self.position(id))
    }

    /// Dumps the values of every level, top level first.
    #[must_use]
    pub fn dump(&self) -> String
    where
        T: std::fmt::Debug,
    {
        let mut out = String::new();

        for level in (0..self.height()).rev() {
            let mut count = 0;
            let _ = write!(out, "L{level}: ");

            let mut id = self.next(SENTINEL, level);
            while id != SENTINEL {
                count += 1;
                let _ = write!(out, "{:?}  ", self.value(id));
                id = self.next(id, level);
            }

            let _ = writeln!(out, ", total {count}");
        }

        out
    }
}

impl<T: Ord> SkipList<T> {
    fn key_of<Q>(&self, id: NodeId) -> &Q
    where
        T: Borrow<Q>,
        Q: ?Sized,
    {
        self.value(id).borrow()
    }

    /// Walks down from the top level towards `target`.
    ///
    /// Returns the greatest node that is strictly less than `target` on level 0
    /// (or the sentinel). If `path` is given, the strictly-less node of every
    /// level is recorded in it, which are exactly the nodes whose forward links
    /// need rewiring on insert and delete.
    fn descend<Q>(&self, target: &Q, mut path: Option<&mut [NodeId]>) -> NodeId
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut id = SENTINEL;

        for level in (0..self.height()).rev() {
            loop {
                let next = self.next(id, level);
                if next == SENTINEL || self.key_of::<Q>(next) >= target {
                    break;
                }
                id = next;
            }

            if let Some(path) = path.as_deref_mut() {
                path[level] = id;
            }
        }

        id
    }

    /// Returns the greatest node that is less or equal to `target` (or the sentinel).
    fn floor_node<Q>(&self, target: &Q) -> NodeId
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let id = self.descend(target, None);
        let next = self.next(id, 0);

        if next != SENTINEL && self.key_of::<Q>(next) == target {
            next
        } else {
            id
        }
    }

    /// Inserts a value.
    ///
    /// If no equal value exists, the value is inserted and `None` is returned.
    ///
    /// If an equal value exists, the stored value is returned and, only if
    /// `replace_if_exists` is `true`, replaced by the new one.
    pub fn put(&mut self, value: T, replace_if_exists: bool) -> Option<T>
    where
        T: Clone,
    {
        let mut path = vec![SENTINEL; self.height()];
        let pred = self.descend(&value, Some(&mut path));
        let succ = self.next(pred, 0);

        if succ != SENTINEL && *self.value(succ) == value {
            let stored = self.value_mut(succ);

            return Some(if replace_if_exists {
                std::mem::replace(stored, value)
            } else {
                stored.clone()
            });
        }

        let level = self.levels.next_level(self.height());

        if level > self.height() {
            log::trace!("skiplist grows to {level} levels");

            // The new top level starts out as an empty ring
            self.set_height(level);
            path.push(SENTINEL);
        }

        let id = self.alloc(value, level);

        self.node_mut(id).prev = pred;
        self.node_mut(succ).prev = id;

        for (lvl, &pred) in path.iter().enumerate().take(level) {
            let succ = self.next(pred, lvl);
            self.node_mut(id).nexts[lvl] = succ;
            self.node_mut(pred).nexts[lvl] = id;
        }

        self.len += 1;
        None
    }

    /// Removes the value equal to `key` and returns it.
    ///
    /// Returns `None` if no such value exists.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<T>
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut path = vec![SENTINEL; self.height()];
        let pred = self.descend(key, Some(&mut path));
        let id = self.next(pred, 0);

        if id == SENTINEL || self.key_of::<Q>(id) != key {
            return None;
        }

        let level = self.node(id).level();

        // NOTE: path[level] is the strictly-less node on that level, and
        // the node participates in every level below its own, so path[level]
        // points directly to it
        for (lvl, &pred) in path.iter().enumerate().take(level) {
            let succ = self.next(id, lvl);
            self.node_mut(pred).nexts[lvl] = succ;
        }

        let succ = self.next(id, 0);
        self.node_mut(succ).prev = pred;

        let node = self.release(id);
        self.trim_levels();
        self.len -= 1;

        node.value
    }

    /// Returns the value equal to `key`.
    #[must_use]
    pub fn get<Q>(&self, key: &Q) -> Option<&T>
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.cursor_from(key, Direction::Forward, 0, 1)
            .next()
            .filter(|value| Borrow::<Q>::borrow(*value) == key)
    }

    /// Returns a cursor positioned relative to `start`.
    ///
    /// Scanning forward, the first produced value is the smallest value
    /// greater or equal to `start`. Scanning backward, the first produced
    /// value is the greatest value less or equal to `start`.
    ///
    /// `offset` values are skipped, at most `limit` values are produced.
    ///
    /// The cursor borrows the list, so the list cannot change while iterating.
    #[must_use]
    pub fn cursor_from<Q>(
        &self,
        start: &Q,
        direction: Direction,
        offset: usize,
        limit: usize,
    ) -> Cursor<'_, T>
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let start = self.seek(Some(start), direction, offset);
        Cursor::new(self, start, direction, limit)
    }

    /// Finds the position one step before the first value to produce.
    ///
    /// Returns `None` if skipping `offset` values already exhausts the list.
    pub(crate) fn seek<Q>(
        &self,
        start: Option<&Q>,
        direction: Direction,
        offset: usize,
    ) -> Option<Position>
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let id = match start {
            None => SENTINEL,
            Some(start) => {
                let floor = self.floor_node(start);

                match direction {
                    Direction::Forward => {
                        if floor != SENTINEL && self.key_of::<Q>(floor) == start {
                            self.prev(floor)
                        } else {
                            floor
                        }
                    }
                    Direction::Backward => self.next(floor, 0),
                }
            }
        };

        self.skip(id, direction, offset)
    }

    /// Finds the position from which stepping yields values strictly
    /// past `anchor` in the given direction.
    ///
    /// Used to resume a cursor whose node has been removed in the meantime.
    pub(crate) fn seek_past<Q>(&self, anchor: &Q, direction: Direction) -> Position
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let id = match direction {
            Direction::Forward => self.floor_node(anchor),
            Direction::Backward => self.next(self.descend(anchor, None), 0),
        };
        self.position(id)
    }
}

impl<T: std::fmt::Debug> std::fmt::Display for SkipList<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.dump())
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for SkipList<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

#[cfg(test)]
impl<T: Ord + std::fmt::Debug> SkipList<T> {
    /// Checks every structural invariant of the ring.
    pub(crate) fn check_integrity(&self) {
        let height = self.height();
        assert!(height >= 1, "skiplist must have at least one level");

        if height > 1 {
            assert_ne!(
                self.next(SENTINEL, height - 1),
                SENTINEL,
                "top level should not be empty",
            );
        }

        let mut lower_level: Option<Vec<NodeId>> = None;

        for level in 0..height {
            let mut nodes = Vec::new();
            let mut id = self.next(SENTINEL, level);

            while id != SENTINEL {
                assert!(nodes.len() < self.slots.len(), "level {level} does not close its ring");
                assert!(self.node(id).level() > level, "node {id} linked above its level");

                if let Some(&last) = nodes.last() {
                    assert!(
                        self.value(last) < self.value(id),
                        "level {level} is not strictly ascending",
                    );
                }

                nodes.push(id);
                id = self.next(id, level);
            }

            if let Some(lower) = &lower_level {
                for id in &nodes {
                    assert!(lower.contains(id), "node {id} on level {level} missing below");
                }
            } else {
                assert_eq!(self.len, nodes.len(), "length does not match level 0");

                let mut prev = SENTINEL;
                for &id in &nodes {
                    assert_eq!(self.prev(id), prev, "broken backward link at node {id}");
                    prev = id;
                }
                assert_eq!(self.prev(SENTINEL), prev, "broken backward link at sentinel");
            }

            lower_level = Some(nodes);
        }
    }

    /// Counts the nodes on every level, bottom level first.
    pub(crate) fn level_counts(&self) -> Vec<usize> {
        (0..self.height())
            .map(|level| {
                let mut count = 0;
                let mut id = self.next(SENTINEL, level);
                while id != SENTINEL {
                    count += 1;
                    id = self.next(id, level);
                }
                count
            })
            .collect()
    }
}
