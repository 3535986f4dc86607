//! Flat, non-resizable hash table.
//!
//! A [`FixedTable`] owns a [`SlotArray`] of adaptive buckets and a count. It
//! never resizes in place; the incremental map models a resize by swapping
//! whole tables and draining the retired one through [`FixedTable::steal`].
//! The steal cursor lives here rather than in the map because it indexes this
//! table's buckets and dies with them.

use std::hash::{BuildHasher, Hash};

use foldhash::fast::FixedState;

use crate::bucket::AdaptiveBucket;
use crate::slots::SlotArray;
use crate::MapError;

/// Upper bound on bucket visits per [`FixedTable::steal`] call.
///
/// Keeps a single migration step cheap even when the retired table is large
/// and nearly empty, at the cost of draining sparse tails over several calls.
pub const MAX_STEAL_SCAN: usize = 300;

/// A key-value pair ordered and equated by key alone.
pub(crate) struct Pair<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
}

impl<K: Ord, V> PartialEq for Pair<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<K: Ord, V> Eq for Pair<K, V> {}

impl<K: Ord, V> PartialOrd for Pair<K, V> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<K: Ord, V> Ord for Pair<K, V> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key.cmp(&other.key)
    }
}

/// Fixed-capacity hash table with adaptive buckets and a migration cursor.
pub struct FixedTable<K, V, S = FixedState> {
    buckets: SlotArray<AdaptiveBucket<Pair<K, V>>>,
    len: usize,
    steal_cursor: usize,
    hasher: S,
}

impl<K, V, S> FixedTable<K, V, S> {
    /// Build a table with `capacity` empty buckets (at least one).
    pub fn new(capacity: usize, hasher: S) -> Self {
        let capacity = capacity.max(1);
        Self {
            buckets: SlotArray::new(capacity),
            len: 0,
            steal_cursor: capacity - 1,
            hasher,
        }
    }

    /// Fallible variant of [`FixedTable::new`]; surfaces
    /// [`MapError::Allocation`] when the slot array cannot be obtained.
    pub fn try_new(capacity: usize, hasher: S) -> Result<Self, MapError> {
        let capacity = capacity.max(1);
        Ok(Self {
            buckets: SlotArray::try_new(capacity)?,
            len: 0,
            steal_cursor: capacity - 1,
            hasher,
        })
    }

    /// Number of elements stored.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of buckets. Fixed for the lifetime of the table.
    pub fn capacity(&self) -> usize {
        self.buckets.len()
    }

    pub(crate) fn hasher(&self) -> &S {
        &self.hasher
    }

    #[cfg(test)]
    pub(crate) fn steal_cursor(&self) -> usize {
        self.steal_cursor
    }

    #[cfg(test)]
    pub(crate) fn bucket_treeified(&self, idx: usize) -> bool {
        self.buckets[idx].is_treeified()
    }

    /// Empty every bucket, keeping the bucket array itself.
    pub fn clear(&mut self) {
        for bucket in self.buckets.iter_mut() {
            bucket.clear();
        }
        self.len = 0;
        self.steal_cursor = self.buckets.len() - 1;
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            buckets: self.buckets.iter(),
            current: None,
        }
    }
}

impl<K: Hash + Ord, V, S: BuildHasher> FixedTable<K, V, S> {
    fn bucket_index(&self, key: &K) -> usize {
        (self.hasher.hash_one(key) % self.buckets.len() as u64) as usize
    }

    /// Insert `(key, value)` unless the key is already bound.
    ///
    /// Returns `true` when the pair was newly inserted; an existing binding
    /// keeps its value.
    pub fn insert(&mut self, key: K, value: V) -> bool {
        let idx = self.bucket_index(&key);
        let inserted = self.buckets[idx].insert(Pair { key, value });
        if inserted {
            self.len += 1;
        }
        inserted
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        let idx = self.bucket_index(key);
        self.buckets[idx]
            .get_by(|pair| key.cmp(&pair.key))
            .map(|pair| &pair.value)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let idx = self.bucket_index(key);
        self.buckets[idx]
            .get_mut_by(|pair| key.cmp(&pair.key))
            .map(|pair| &mut pair.value)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Reference to the value bound to `key`, or [`MapError::KeyMissing`].
    pub fn at(&self, key: &K) -> Result<&V, MapError> {
        self.get(key).ok_or(MapError::KeyMissing)
    }

    /// Mutable reference to the value bound to `key`, inserting a default
    /// value first when the key is absent.
    pub fn at_mut(&mut self, key: K) -> &mut V
    where
        K: Clone,
        V: Default,
    {
        let idx = self.bucket_index(&key);
        if self.buckets[idx].get_by(|pair| key.cmp(&pair.key)).is_none() {
            self.buckets[idx].insert(Pair {
                key: key.clone(),
                value: V::default(),
            });
            self.len += 1;
        }
        match self.buckets[idx].get_mut_by(|pair| key.cmp(&pair.key)) {
            Some(pair) => &mut pair.value,
            None => unreachable!("binding inserted above"),
        }
    }

    /// Remove the binding for `key`, returning its value.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let idx = self.bucket_index(key);
        let removed = self.buckets[idx].remove_by(|pair| key.cmp(&pair.key));
        if removed.is_some() {
            self.len -= 1;
        }
        removed.map(|pair| pair.value)
    }

    /// Keep only the pairs the predicate accepts.
    pub fn retain<F: FnMut(&K, &V) -> bool>(&mut self, mut pred: F) {
        let mut kept = 0;
        for bucket in self.buckets.iter_mut() {
            bucket.retain(|pair| pred(&pair.key, &pair.value));
            kept += bucket.len();
        }
        self.len = kept;
    }

    /// Remove and return up to `want` elements, draining buckets from the
    /// steal cursor downward.
    ///
    /// Elements come out of the cursor bucket one at a time; when it empties
    /// the cursor steps down. At most [`MAX_STEAL_SCAN`] buckets are visited
    /// per call, so a call over a sparse tail may return fewer elements than
    /// requested while the table is still non-empty. Once the cursor sits on
    /// bucket zero and that bucket is empty, the table is exhausted.
    pub fn steal(&mut self, want: usize) -> Vec<(K, V)> {
        let mut stolen = Vec::new();
        let start = self.steal_cursor;
        let mut remaining = want;
        while remaining > 0 {
            if start - self.steal_cursor > MAX_STEAL_SCAN {
                break;
            }
            while remaining > 0 {
                match self.buckets[self.steal_cursor].pop_front() {
                    Some(pair) => {
                        if stolen.is_empty() {
                            stolen.reserve(remaining);
                        }
                        stolen.push((pair.key, pair.value));
                        remaining -= 1;
                        self.len -= 1;
                    }
                    None => break,
                }
            }
            if self.steal_cursor == 0 {
                if self.buckets[0].is_empty() {
                    debug_assert_eq!(self.len, 0);
                }
                break;
            }
            if self.buckets[self.steal_cursor].is_empty() {
                self.steal_cursor -= 1;
            }
        }
        stolen
    }
}

/// Borrowing iterator over every pair, bucket by bucket.
pub struct Iter<'a, K, V> {
    buckets: std::slice::Iter<'a, AdaptiveBucket<Pair<K, V>>>,
    current: Option<crate::bucket::Iter<'a, Pair<K, V>>>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<(&'a K, &'a V)> {
        loop {
            if let Some(bucket_iter) = &mut self.current {
                if let Some(pair) = bucket_iter.next() {
                    return Some((&pair.key, &pair.value));
                }
            }
            self.current = Some(self.buckets.next()?.iter());
        }
    }
}

impl<'a, K, V, S> IntoIterator for &'a FixedTable<K, V, S> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Iter<'a, K, V> {
        self.iter()
    }
}

#[cfg(test)]
impl<K: Hash + Ord, V, S: BuildHasher> FixedTable<K, V, S> {
    pub(crate) fn check_invariants(&self) {
        let mut total = 0;
        for (idx, bucket) in self.buckets.iter().enumerate() {
            bucket.check_invariants();
            total += bucket.len();
            if idx > self.steal_cursor {
                assert!(bucket.is_empty(), "bucket above the steal cursor is non-empty");
            }
        }
        assert_eq!(total, self.len, "bucket sizes must sum to len");
    }
}
