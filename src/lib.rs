//! # driftmap
//!
//! An in-memory hash map whose two defining properties are:
//!
//! - **Incremental rehashing**: resizing never does more than a constant
//!   amount of migration work per call. A resize swaps in a fresh table and
//!   every mutating operation afterwards drags a small batch of elements
//!   across, so latency stays flat while the map grows or shrinks.
//! - **Adaptive buckets**: each bucket is a singly linked list while small
//!   and a red-black tree once it crosses a threshold, keeping worst-case
//!   bucket lookups logarithmic even when many keys collide.
//!
//! ## Architecture
//!
//! Three layers, leaves first:
//!
//! 1. [`bucket::AdaptiveBucket`] — one hash slot's elements, list or tree.
//! 2. [`table::FixedTable`] — a flat, non-resizable array of buckets with a
//!    migration cursor for draining it.
//! 3. [`IncrementalMap`] — two fixed tables and the rehash state machine.
//!
//! ## Example
//!
//! ```rust
//! use driftmap::IncrementalMap;
//!
//! let mut map: IncrementalMap<u64, String> = IncrementalMap::new();
//! map.insert(1, "one".to_string());
//! map.insert(2, "two".to_string());
//!
//! assert_eq!(map.find(&1).map(String::as_str), Some("one"));
//! assert_eq!(map.len(), 2);
//! assert_eq!(map.remove(&2).as_deref(), Some("two"));
//! ```
//!
//! The map is single-threaded; wrap it in external synchronization to share
//! it across threads.

#![deny(unsafe_op_in_unsafe_fn)]

pub mod bucket;
pub mod map;
pub mod slots;
pub mod table;

pub use bucket::{AdaptiveBucket, DEMOTE_AT, PROMOTE_AT};
pub use map::{IncrementalMap, DEFAULT_CAPACITY, STEAL_BATCH};
pub use slots::SlotArray;
pub use table::{FixedTable, MAX_STEAL_SCAN};

use std::collections::TryReserveError;

use thiserror::Error;

/// Errors surfaced by map operations.
#[derive(Debug, Error)]
pub enum MapError {
    /// Shared access asked for a key that is not bound.
    #[error("key not present in the map")]
    KeyMissing,
    /// The backing slot array could not be allocated.
    #[error("failed to allocate backing slot array")]
    Allocation(#[from] TryReserveError),
}

#[cfg(test)]
mod proptests;
