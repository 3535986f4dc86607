use std::collections::HashMap;
use std::hash::{BuildHasher, Hasher};

use proptest::prelude::*;
use proptest_derive::Arbitrary;

use crate::IncrementalMap;

/// Model implementation backed by the standard library map.
///
/// `insert` mirrors the keep-existing-value contract of the map under test.
#[derive(Default)]
struct Model {
    map: HashMap<u64, u64>,
}

impl Model {
    fn insert(&mut self, key: u64, value: u64) -> bool {
        if self.map.contains_key(&key) {
            return false;
        }
        self.map.insert(key, value);
        true
    }

    fn get(&self, key: &u64) -> Option<&u64> {
        self.map.get(key)
    }

    fn remove(&mut self, key: &u64) -> Option<u64> {
        self.map.remove(key)
    }

    fn bump(&mut self, key: u64) -> u64 {
        let value = self.map.entry(key).or_default();
        *value += 1;
        *value
    }

    fn len(&self) -> usize {
        self.map.len()
    }
}

/// Actions to run against both the map under test and the model.
#[derive(Arbitrary, Debug, Clone)]
enum Action {
    #[proptest(weight = 4)]
    Insert(u64, u64),
    #[proptest(weight = 2)]
    Remove(u64),
    #[proptest(weight = 2)]
    Find(u64),
    #[proptest(weight = 1)]
    Bump(u64),
    #[proptest(weight = 1)]
    Contains(u64),
    #[proptest(weight = 1)]
    Retain(u64),
}

struct Harness<S: BuildHasher + Clone> {
    map: IncrementalMap<u64, u64, S>,
    model: Model,
    /// Caps the key domain so runs revisit keys and exercise collisions.
    key_mask: u64,
}

impl<S: BuildHasher + Clone> Harness<S> {
    fn execute(&mut self, action: Action) {
        match action {
            Action::Insert(key, value) => {
                let key = key & self.key_mask;
                let map_inserted = self.map.insert(key, value);
                let model_inserted = self.model.insert(key, value);
                assert_eq!(map_inserted, model_inserted, "insert mismatch for key {key}");
            }
            Action::Remove(key) => {
                let key = key & self.key_mask;
                assert_eq!(
                    self.map.remove(&key),
                    self.model.remove(&key),
                    "remove mismatch for key {key}"
                );
            }
            Action::Find(key) => {
                let key = key & self.key_mask;
                assert_eq!(
                    self.map.find(&key),
                    self.model.get(&key),
                    "find mismatch for key {key}"
                );
            }
            Action::Bump(key) => {
                let key = key & self.key_mask;
                let value = self.map.at_mut(key);
                *value += 1;
                assert_eq!(*value, self.model.bump(key), "bump mismatch for key {key}");
            }
            Action::Contains(key) => {
                let key = key & self.key_mask;
                assert_eq!(
                    self.map.contains(&key),
                    self.model.map.contains_key(&key),
                    "contains mismatch for key {key}"
                );
            }
            Action::Retain(modulus) => {
                let modulus = (modulus % 7) + 2;
                self.map.retain(|key, _| key % modulus != 0);
                self.model.map.retain(|key, _| key % modulus != 0);
            }
        }
        assert_eq!(self.map.len(), self.model.len(), "length diverged");
        self.map.check_invariants();
    }

    fn finish(&self) {
        for (key, value) in &self.model.map {
            assert_eq!(self.map.find(key), Some(value), "model key {key} missing");
        }
        assert_eq!(self.map.iter().count(), self.model.len());
    }
}

/// Degenerate hasher sending every key to the same bucket, forcing the tree
/// regime and adversarial steal paths.
#[derive(Clone, Default)]
struct OneBucket;

struct OneBucketHasher;

impl Hasher for OneBucketHasher {
    fn finish(&self) -> u64 {
        0
    }

    fn write(&mut self, _bytes: &[u8]) {}
}

impl BuildHasher for OneBucket {
    type Hasher = OneBucketHasher;

    fn build_hasher(&self) -> OneBucketHasher {
        OneBucketHasher
    }
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        failure_persistence: None,
        ..ProptestConfig::default()
    })]

    #[test]
    fn proptest_vs_hashmap(actions in prop::collection::vec(any::<Action>(), 1..200)) {
        let mut harness = Harness {
            map: IncrementalMap::with_capacity(2),
            model: Model::default(),
            key_mask: 0xff,
        };
        for action in actions {
            harness.execute(action);
        }
        harness.finish();
    }

    #[test]
    fn proptest_sparse_keys(actions in prop::collection::vec(any::<Action>(), 1..200)) {
        let mut harness = Harness {
            map: IncrementalMap::with_capacity(2),
            model: Model::default(),
            key_mask: u64::MAX,
        };
        for action in actions {
            harness.execute(action);
        }
        harness.finish();
    }

    #[test]
    fn proptest_single_bucket(actions in prop::collection::vec(any::<Action>(), 1..120)) {
        let mut harness = Harness {
            map: IncrementalMap::with_capacity_and_hasher(2, OneBucket),
            model: Model::default(),
            key_mask: 0x3f,
        };
        for action in actions {
            harness.execute(action);
        }
        harness.finish();
    }
}
