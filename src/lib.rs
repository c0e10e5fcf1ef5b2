//! chain-table: a single-threaded, separately chained hash table with a
//! configurable growth policy and fail-fast traversal.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: a small hash table engine whose layout and growth are fully
//!   predictable, with set and map adapters layered on top.
//! - Layers:
//!   - ChainTable<T, S>: fixed-length bucket array; each bucket is the head
//!     of a singly linked chain. Chain nodes live in a `SlotMap` arena and
//!     link to their successor by key, so no node is shared or cyclic.
//!   - Traversal / Iter: bucket-ascending, head-to-tail walk. `Traversal`
//!     is detached and checks a generation fence on every step; `Iter`
//!     borrows the table and reuses the same cursor.
//!   - ChainSet<T, S> / ChainMap<K, V, S>: thin adapters. The map stores
//!     `KeyValue<K, V>` whose hash and equality are the key's alone.
//!
//! Constraints
//! - Single-threaded; no locking.
//! - Elements are unique under `Eq`; inserting a present element is a no-op.
//! - `len()` equals the sum of chain lengths.
//! - An element's bucket is `fold(hash) % capacity`, recomputed on resize.
//!
//! Indexing
//! - Each entry caches its 64-bit hash; `T: Hash` is never invoked after
//!   insertion. The hash is read as a signed value and folded with
//!   `unsigned_abs`, which is defined for `i64::MIN`.
//!
//! Growth
//! - Checked before each new entry is placed, never on duplicates.
//! - `GrowthPolicy` holds the initial capacity, threshold, ratio, and how
//!   the load is measured. The default truncates `len / capacity` before
//!   comparing with 2.5, so growth starts at `len >= 3 * capacity`;
//!   `ThresholdMode::Exact` compares the true ratio instead.
//! - Resize drains every entry in bucket order into a temporary vector,
//!   allocates `max(trunc(capacity * ratio), capacity + 1)` buckets, and
//!   refills through the regular insert path.
//!
//! Removal
//! - A miss on an empty bucket is `TableError::NotFound`. A miss on an
//!   occupied bucket is a silent `Ok(None)`.
//!
//! Generation fence
//! - Bumped by every insert that adds an entry, every successful remove,
//!   `clear`, and resize. A `Traversal` created earlier fails with
//!   `TableError::Invalidated` on its next call.
//!   Passing a different table fails with `TableError::WrongTable`.
//!
//! Notes and non-goals
//! - No thread-safety, persistence, key ordering, or `Display` output.
//! - Values in a `ChainMap` cannot be mutated in place; `replace` swaps them.

mod chain_map;
mod chain_set;
pub mod chain_table;
mod chain_table_proptest;
mod error;
mod policy;
pub mod traversal;

// Public surface
pub use chain_map::{ChainMap, KeyValue};
pub use chain_set::ChainSet;
pub use chain_table::ChainTable;
pub use error::TableError;
pub use policy::{GrowthPolicy, ThresholdMode};
pub use traversal::{Iter, Traversal};
