//! Basic usage of the incremental map.

use driftmap::IncrementalMap;

fn main() {
    example_basic();
    example_growth();
    example_default_values();
}

fn example_basic() {
    println!("=== Basic operations ===\n");

    let mut map: IncrementalMap<u64, String> = IncrementalMap::new();

    map.insert(1001, "alice".to_string());
    map.insert(1002, "bob".to_string());
    map.insert(1003, "carol".to_string());

    println!("1001 = {:?}", map.find(&1001));
    println!("9999 = {:?}", map.find(&9999));
    println!("contains 1002: {}", map.contains(&1002));

    map.remove(&1002);
    println!("after remove, contains 1002: {}", map.contains(&1002));
    println!("count: {}\n", map.len());
}

fn example_growth() {
    println!("=== Incremental growth ===\n");

    let mut map: IncrementalMap<u64, u64> = IncrementalMap::with_capacity(4);
    let mut last_capacity = map.capacity();
    println!("start: capacity {}", last_capacity);

    for i in 0..10_000 {
        map.insert(i, i * i);
        if map.capacity() != last_capacity {
            last_capacity = map.capacity();
            println!("after {} inserts: capacity {}", i + 1, last_capacity);
        }
    }
    println!("final: {} entries, capacity {}\n", map.len(), map.capacity());
}

fn example_default_values() {
    println!("=== Counting with default values ===\n");

    let mut counts: IncrementalMap<&str, u64> = IncrementalMap::new();
    for word in ["the", "quick", "brown", "fox", "the", "fox"] {
        *counts.at_mut(word) += 1;
    }

    let mut entries: Vec<(&str, u64)> = counts.iter().map(|(w, c)| (*w, *c)).collect();
    entries.sort_unstable();
    for (word, count) in entries {
        println!("{word}: {count}");
    }
}
