//! Incrementally-rehashed hash map.
//!
//! An [`IncrementalMap`] owns two [`FixedTable`]s. Steady state keeps all
//! elements in `current`; a resize swaps in a fresh table and leaves the data
//! behind in `old`, and every mutating call afterwards moves a small constant
//! number of elements across before doing its own work. No single call ever
//! pays for a full rehash.

use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::ops::Index;

use foldhash::fast::FixedState;
use tracing::debug;

use crate::table::FixedTable;
use crate::MapError;

/// Elements migrated from the retired table per mutating call.
pub const STEAL_BATCH: usize = 1;

/// Capacity of the initial table when none is requested.
pub const DEFAULT_CAPACITY: usize = 10;

/// Hash map with amortized O(1) resizing and adaptive buckets.
///
/// During a resize both tables hold live elements; a key is bound in exactly
/// one of them at any time. Reads consult both tables, mutations migrate a
/// bounded number of elements first, and the load-factor check at the end of
/// each mutating call decides whether a new resize begins.
pub struct IncrementalMap<K, V, S = FixedState> {
    current: FixedTable<K, V, S>,
    old: FixedTable<K, V, S>,
    rehashing: bool,
}

impl<K: Hash + Ord, V> IncrementalMap<K, V, FixedState> {
    pub fn new() -> Self {
        Self::with_hasher(FixedState::default())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, FixedState::default())
    }
}

impl<K: Hash + Ord, V, S: BuildHasher + Clone> IncrementalMap<K, V, S> {
    pub fn with_hasher(hasher: S) -> Self {
        Self::with_capacity_and_hasher(DEFAULT_CAPACITY, hasher)
    }

    pub fn with_capacity_and_hasher(capacity: usize, hasher: S) -> Self {
        Self {
            current: FixedTable::new(capacity, hasher.clone()),
            old: FixedTable::new(1, hasher),
            rehashing: false,
        }
    }

    /// Fallible constructor; surfaces [`MapError::Allocation`] when the
    /// requested backing array cannot be obtained.
    pub fn try_with_capacity_and_hasher(capacity: usize, hasher: S) -> Result<Self, MapError> {
        Ok(Self {
            current: FixedTable::try_new(capacity, hasher.clone())?,
            old: FixedTable::try_new(1, hasher)?,
            rehashing: false,
        })
    }

    /// Number of elements across both tables.
    pub fn len(&self) -> usize {
        self.current.len() + self.old.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bucket count of the live table.
    pub fn capacity(&self) -> usize {
        self.current.capacity()
    }

    /// Insert `(key, value)` unless the key is already bound.
    ///
    /// Returns `true` when the pair was newly inserted. A key still sitting
    /// in the retired table keeps its binding there untouched; overwriting or
    /// duplicating it would break the one-binding-per-key rule.
    pub fn insert(&mut self, key: K, value: V) -> bool {
        self.migrate_step();
        let inserted = if self.rehashing && self.old.contains(&key) {
            false
        } else {
            self.current.insert(key, value)
        };
        self.maybe_resize();
        inserted
    }

    /// Look up `key` without migrating anything.
    ///
    /// While rehashing, the fuller of the two tables is probed first.
    pub fn find(&self, key: &K) -> Option<&V> {
        if !self.rehashing {
            return self.current.get(key);
        }
        let (larger, smaller) = if self.current.len() > self.old.len() {
            (&self.current, &self.old)
        } else {
            (&self.old, &self.current)
        };
        larger.get(key).or_else(|| smaller.get(key))
    }

    /// Mutable counterpart of [`IncrementalMap::find`]; also migration-free.
    pub fn find_mut(&mut self, key: &K) -> Option<&mut V> {
        if !self.rehashing {
            return self.current.get_mut(key);
        }
        if self.current.len() > self.old.len() {
            if let Some(value) = self.current.get_mut(key) {
                return Some(value);
            }
            self.old.get_mut(key)
        } else {
            if let Some(value) = self.old.get_mut(key) {
                return Some(value);
            }
            self.current.get_mut(key)
        }
    }

    pub fn contains(&self, key: &K) -> bool {
        self.current.contains(key) || self.old.contains(key)
    }

    /// Reference to the value bound to `key`, or [`MapError::KeyMissing`].
    pub fn at(&self, key: &K) -> Result<&V, MapError> {
        if !self.rehashing {
            return self.current.at(key);
        }
        if let Some(value) = self.old.get(key) {
            return Ok(value);
        }
        self.current.at(key)
    }

    /// Mutable reference to the value bound to `key`, inserting a default
    /// value when the key is absent.
    ///
    /// This is a mutating call: it migrates a batch and runs the load-factor
    /// check like [`IncrementalMap::insert`].
    pub fn at_mut(&mut self, key: K) -> &mut V
    where
        K: Clone,
        V: Default,
    {
        self.migrate_step();
        let in_old = self.rehashing && self.old.contains(&key);
        if !in_old && !self.current.contains(&key) {
            self.current.insert(key.clone(), V::default());
        }
        self.maybe_resize();
        // A resize that just began moved the binding under the `old` name.
        if let Some(value) = self.old.get_mut(&key) {
            return value;
        }
        match self.current.get_mut(&key) {
            Some(value) => value,
            None => unreachable!("binding ensured above"),
        }
    }

    /// Remove the binding for `key`, returning its value.
    ///
    /// While rehashing both tables are tried; at most one can hit.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.migrate_step();
        let removed = if self.rehashing {
            let from_current = self.current.remove(key);
            let from_old = self.old.remove(key);
            from_current.or(from_old)
        } else {
            self.current.remove(key)
        };
        self.maybe_resize();
        removed
    }

    /// Keep only the pairs the predicate accepts.
    pub fn retain<F: FnMut(&K, &V) -> bool>(&mut self, mut pred: F) {
        self.migrate_step();
        self.current.retain(&mut pred);
        self.old.retain(&mut pred);
        self.maybe_resize();
    }

    /// Drop every element from both tables and leave the rehash state.
    pub fn clear(&mut self) {
        self.current.clear();
        self.old.clear();
        self.rehashing = false;
    }

    /// Every pair exactly once: all of `current`, then all of `old`.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            inner: self.current.iter().chain(self.old.iter()),
        }
    }

    /// Move up to [`STEAL_BATCH`] elements out of the retired table, and
    /// retire the rehash state once it runs dry.
    fn migrate_step(&mut self) {
        if !self.rehashing {
            return;
        }
        let batch = self.old.steal(STEAL_BATCH);
        if batch.is_empty() && self.old.is_empty() {
            self.rehashing = false;
            // Swap in a minimal table so the retired storage is released now.
            self.old = FixedTable::new(1, self.current.hasher().clone());
            debug!(
                capacity = self.current.capacity(),
                len = self.current.len(),
                "incremental rehash complete"
            );
            return;
        }
        for (key, value) in batch {
            self.current.insert(key, value);
        }
    }

    /// Load-factor policy, checked at the end of every mutating call.
    ///
    /// Suspended while a rehash is in flight; at most one resize runs at a
    /// time.
    fn maybe_resize(&mut self) {
        if self.rehashing {
            return;
        }
        let len = self.current.len();
        let capacity = self.current.capacity();
        if len * 4 >= capacity * 3 {
            self.begin_resize(capacity * 2);
        } else if capacity > len * 4 && capacity > 16 {
            // A shrink lands at 3x the element count, leaving the same
            // headroom a fresh grow would.
            self.begin_resize((len * 3).max(1));
        }
    }

    fn begin_resize(&mut self, new_capacity: usize) {
        debug_assert!(self.old.is_empty());
        debug!(
            from = self.current.capacity(),
            to = new_capacity,
            len = self.current.len(),
            "begin incremental rehash"
        );
        self.old = FixedTable::new(new_capacity, self.current.hasher().clone());
        std::mem::swap(&mut self.current, &mut self.old);
        self.rehashing = true;
    }
}

impl<K: Hash + Ord, V> Default for IncrementalMap<K, V, FixedState> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Hash + Ord, V, S: BuildHasher + Clone> Index<&K> for IncrementalMap<K, V, S> {
    type Output = V;

    fn index(&self, key: &K) -> &V {
        match self.at(key) {
            Ok(value) => value,
            Err(_) => panic!("key not present in the map"),
        }
    }
}

impl<K: Hash + Ord, V, S: BuildHasher + Clone> Extend<(K, V)> for IncrementalMap<K, V, S> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<K: Hash + Ord, V> FromIterator<(K, V)> for IncrementalMap<K, V, FixedState> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

impl<K, V, S> fmt::Debug for IncrementalMap<K, V, S>
where
    K: Hash + Ord + fmt::Debug,
    V: fmt::Debug,
    S: BuildHasher + Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Borrowing iterator over every pair in the map.
pub struct Iter<'a, K, V> {
    inner: std::iter::Chain<crate::table::Iter<'a, K, V>, crate::table::Iter<'a, K, V>>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<(&'a K, &'a V)> {
        self.inner.next()
    }
}

impl<'a, K: Hash + Ord, V, S: BuildHasher + Clone> IntoIterator for &'a IncrementalMap<K, V, S> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Iter<'a, K, V> {
        self.iter()
    }
}

#[cfg(test)]
impl<K: Hash + Ord, V, S: BuildHasher + Clone> IncrementalMap<K, V, S> {
    pub(crate) fn is_rehashing(&self) -> bool {
        self.rehashing
    }

    pub(crate) fn old_len(&self) -> usize {
        self.old.len()
    }

    pub(crate) fn check_invariants(&self) {
        self.current.check_invariants();
        self.old.check_invariants();
        if !self.rehashing {
            assert_eq!(self.old.len(), 0, "retired table must be empty outside a rehash");
        }
        for (key, _) in self.old.iter() {
            assert!(
                !self.current.contains(key),
                "key bound in both tables at once"
            );
        }
    }
}
