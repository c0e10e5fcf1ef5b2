//! ChainTable: separately chained hash table with a fail-fast generation fence.

use crate::error::TableError;
use crate::policy::GrowthPolicy;
use crate::traversal::{Iter, Traversal};
use core::borrow::Borrow;
use core::hash::{BuildHasher, Hash};
use core::sync::atomic::{AtomicU64, Ordering};
use hashbrown::hash_map::DefaultHashBuilder;
use slotmap::{DefaultKey, SlotMap};

/// Bucket index for `hash` under `capacity` buckets.
///
/// The hash is read as a two's-complement `i64` and folded with
/// `unsigned_abs`, which is total: `i64::MIN` maps to `2^63` instead of
/// overflowing back to a negative value.
#[inline]
pub(crate) fn bucket_index(hash: u64, capacity: usize) -> usize {
    debug_assert!(capacity > 0);
    ((hash as i64).unsigned_abs() % capacity as u64) as usize
}

// Source of per-table identities; a traversal remembers the id of its table.
static NEXT_TABLE_ID: AtomicU64 = AtomicU64::new(0);

#[derive(Debug)]
pub(crate) struct Entry<T> {
    pub(crate) value: T,
    hash: u64,
    pub(crate) next: Option<DefaultKey>,
}

pub struct ChainTable<T, S = DefaultHashBuilder> {
    hasher: S,
    policy: GrowthPolicy,
    // Chain heads; the array length is the capacity.
    buckets: Vec<Option<DefaultKey>>,
    entries: SlotMap<DefaultKey, Entry<T>>,
    generation: u64,
    id: u64,
}

impl<T> ChainTable<T>
where
    T: Eq + Hash,
{
    pub fn new() -> Self {
        Self::with_hasher(Default::default())
    }

    pub fn with_policy(policy: GrowthPolicy) -> Result<Self, TableError> {
        Self::with_policy_and_hasher(policy, Default::default())
    }
}

impl<T> Default for ChainTable<T>
where
    T: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, S> ChainTable<T, S>
where
    T: Eq + Hash,
    S: BuildHasher,
{
    pub fn with_hasher(hasher: S) -> Self {
        Self::from_parts(GrowthPolicy::default(), hasher)
    }

    pub fn with_policy_and_hasher(policy: GrowthPolicy, hasher: S) -> Result<Self, TableError> {
        policy.validate()?;
        Ok(Self::from_parts(policy, hasher))
    }

    // `policy` must already be valid.
    pub(crate) fn from_parts(policy: GrowthPolicy, hasher: S) -> Self {
        Self {
            hasher,
            buckets: vec![None; policy.initial_capacity],
            policy,
            entries: SlotMap::with_key(),
            generation: 0,
            id: NEXT_TABLE_ID.fetch_add(1, Ordering::Relaxed),
        }
    }

    fn make_hash<Q>(&self, q: &Q) -> u64
    where
        Q: ?Sized + Hash,
    {
        self.hasher.hash_one(q)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Current number of buckets.
    pub fn capacity(&self) -> usize {
        self.buckets.len()
    }

    /// Structural mutation counter. Bumped by every insert that adds an
    /// entry, every successful remove, `clear`, and each resize.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn policy(&self) -> &GrowthPolicy {
        &self.policy
    }

    pub fn hasher(&self) -> &S {
        &self.hasher
    }

    // First entry in the target chain of `hash` accepted by `is_match`.
    fn find_key<F>(&self, hash: u64, mut is_match: F) -> Option<DefaultKey>
    where
        F: FnMut(&T) -> bool,
    {
        let mut cursor = self.buckets[bucket_index(hash, self.capacity())];
        while let Some(k) = cursor {
            let entry = &self.entries[k];
            if entry.hash == hash && is_match(&entry.value) {
                return Some(k);
            }
            cursor = entry.next;
        }
        None
    }

    pub fn contains<Q>(&self, q: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.get(q).is_some()
    }

    /// The stored element equal to `q`, if any.
    pub fn get<Q>(&self, q: &Q) -> Option<&T>
    where
        T: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.get_by(q, |v| <T as Borrow<Q>>::borrow(v) == q)
    }

    /// Lookup hashed as `probe` but matched by `is_match`. `probe` must hash
    /// like every element `is_match` accepts.
    pub(crate) fn get_by<Q, F>(&self, probe: &Q, is_match: F) -> Option<&T>
    where
        Q: ?Sized + Hash,
        F: FnMut(&T) -> bool,
    {
        let k = self.find_key(self.make_hash(probe), is_match)?;
        self.entries.get(k).map(|e| &e.value)
    }

    /// Insert `value` unless an equal element is already stored.
    ///
    /// Returns `true` if a new entry was added. A duplicate leaves the table
    /// untouched: no resize, no generation bump.
    pub fn insert(&mut self, value: T) -> bool {
        let hash = self.make_hash(&value);
        if self.find_key(hash, |v| *v == value).is_some() {
            return false;
        }
        self.insert_hashed(hash, value);
        true
    }

    // Shared by `insert` and the resize refill: checks the growth trigger
    // against the current (possibly partially refilled) table, then appends.
    fn insert_hashed(&mut self, hash: u64, value: T) {
        if self.policy.should_grow(self.len(), self.capacity()) {
            self.resize();
        }
        let idx = bucket_index(hash, self.capacity());
        let key = self.entries.insert(Entry {
            value,
            hash,
            next: None,
        });
        match self.buckets[idx] {
            None => self.buckets[idx] = Some(key),
            Some(head) => {
                let mut tail = head;
                while let Some(next) = self.entries[tail].next {
                    tail = next;
                }
                self.entries[tail].next = Some(key);
            }
        }
        self.generation += 1;
    }

    fn resize(&mut self) {
        let old_capacity = self.capacity();
        let new_capacity = self.policy.next_capacity(old_capacity);
        tracing::debug!(
            old_capacity,
            new_capacity,
            len = self.len(),
            "resizing chain table"
        );

        // Drain in bucket-ascending, head-to-tail order.
        let heads = core::mem::replace(&mut self.buckets, vec![None; new_capacity]);
        let mut drained = Vec::with_capacity(self.len());
        for head in heads {
            let mut cursor = head;
            while let Some(k) = cursor {
                match self.entries.remove(k) {
                    Some(entry) => {
                        cursor = entry.next;
                        drained.push((entry.hash, entry.value));
                    }
                    None => break,
                }
            }
        }
        debug_assert!(self.entries.is_empty());
        self.generation += 1;

        for (hash, value) in drained {
            self.insert_hashed(hash, value);
        }
    }

    /// Remove the element equal to `q` from its target bucket.
    ///
    /// - `Err(NotFound)` when the target bucket is empty.
    /// - `Ok(None)` when the bucket holds entries but none match; the table
    ///   is left untouched.
    /// - `Ok(Some(value))` with the unlinked element otherwise.
    pub fn remove<Q>(&mut self, q: &Q) -> Result<Option<T>, TableError>
    where
        T: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.remove_by(q, |v| <T as Borrow<Q>>::borrow(v) == q)
    }

    /// `remove` hashed as `probe` but matched by `is_match`; same miss
    /// semantics.
    pub(crate) fn remove_by<Q, F>(&mut self, probe: &Q, mut is_match: F) -> Result<Option<T>, TableError>
    where
        Q: ?Sized + Hash,
        F: FnMut(&T) -> bool,
    {
        let hash = self.make_hash(probe);
        let idx = bucket_index(hash, self.capacity());
        let head = self.buckets[idx].ok_or(TableError::NotFound)?;

        let mut prev: Option<DefaultKey> = None;
        let mut cursor = Some(head);
        while let Some(k) = cursor {
            let entry = &self.entries[k];
            let next = entry.next;
            if entry.hash == hash && is_match(&entry.value) {
                match prev {
                    None => self.buckets[idx] = next,
                    Some(p) => self.entries[p].next = next,
                }
                self.generation += 1;
                return Ok(self.entries.remove(k).map(|e| e.value));
            }
            prev = Some(k);
            cursor = next;
        }
        Ok(None)
    }

    /// Drop every element and return to the initial bucket count.
    pub fn clear(&mut self) {
        tracing::trace!(len = self.len(), capacity = self.capacity(), "clearing chain table");
        self.buckets = vec![None; self.policy.initial_capacity];
        self.entries.clear();
        self.generation += 1;
    }

    /// A detached fail-fast cursor; see [`Traversal`].
    pub fn traversal(&self) -> Traversal {
        Traversal::new(self)
    }

    pub fn iter(&self) -> Iter<'_, T, S> {
        Iter::new(self)
    }
}

// Raw structural access for the traversal cursor; no hashing involved.
impl<T, S> ChainTable<T, S> {
    pub(crate) fn bucket_heads(&self) -> &[Option<DefaultKey>] {
        &self.buckets
    }

    pub(crate) fn entry(&self, k: DefaultKey) -> Option<&Entry<T>> {
        self.entries.get(k)
    }

    pub(crate) fn current_generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    /// Chain length of every bucket, in bucket order.
    #[cfg(test)]
    pub(crate) fn chain_lengths(&self) -> Vec<usize> {
        self.buckets
            .iter()
            .map(|head| {
                let mut n = 0;
                let mut cursor = *head;
                while let Some(k) = cursor {
                    n += 1;
                    cursor = self.entries[k].next;
                }
                n
            })
            .collect()
    }

    /// Entries whose cached hash points at a different bucket than the one
    /// holding them.
    #[cfg(test)]
    pub(crate) fn misplaced_entries(&self) -> usize {
        let capacity = self.buckets.len();
        let mut misplaced = 0;
        for (idx, head) in self.buckets.iter().enumerate() {
            let mut cursor = *head;
            while let Some(k) = cursor {
                let entry = &self.entries[k];
                if bucket_index(entry.hash, capacity) != idx {
                    misplaced += 1;
                }
                cursor = entry.next;
            }
        }
        misplaced
    }
}

impl<'a, T, S> IntoIterator for &'a ChainTable<T, S>
where
    T: Eq + Hash,
    S: BuildHasher,
{
    type Item = &'a T;
    type IntoIter = Iter<'a, T, S>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T, S> Extend<T> for ChainTable<T, S>
where
    T: Eq + Hash,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.insert(value);
        }
    }
}

impl<T> FromIterator<T> for ChainTable<T>
where
    T: Eq + Hash,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut table = Self::new();
        table.extend(iter);
        table
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::policy::ThresholdMode;
    use core::hash::{BuildHasherDefault, Hasher};
    use std::collections::BTreeSet;

    /// Hashes integers to themselves (sign-extended) so bucket placement is
    /// predictable: with 10 buckets, 3, 13 and -23 all land in bucket 3.
    #[derive(Default)]
    pub(crate) struct IdentityHasher(u64);

    impl Hasher for IdentityHasher {
        fn write(&mut self, bytes: &[u8]) {
            for &b in bytes {
                self.0 = self.0.rotate_left(8) ^ u64::from(b);
            }
        }
        fn write_i32(&mut self, n: i32) {
            self.0 = n as i64 as u64;
        }
        fn write_i64(&mut self, n: i64) {
            self.0 = n as u64;
        }
        fn write_u64(&mut self, n: u64) {
            self.0 = n;
        }
        fn finish(&self) -> u64 {
            self.0
        }
    }

    pub(crate) type Identity = BuildHasherDefault<IdentityHasher>;

    fn identity_table<T: Eq + Hash>() -> ChainTable<T, Identity> {
        ChainTable::with_hasher(Identity::default())
    }

    fn drain_order<T: Eq + Hash + Clone, S: BuildHasher>(t: &ChainTable<T, S>) -> Vec<T> {
        t.iter().cloned().collect()
    }

    #[test]
    fn bucket_index_folds_sign() {
        assert_eq!(bucket_index(7, 10), 7);
        assert_eq!(bucket_index((-7i64) as u64, 10), 7);
        assert_eq!(bucket_index(u64::MAX, 10), 1);
        assert_eq!(bucket_index(0, 1), 0);
    }

    /// `i64::MIN` has no positive counterpart; it folds to 2^63.
    #[test]
    fn bucket_index_minimum_hash_is_non_negative() {
        let min = i64::MIN as u64;
        assert_eq!(bucket_index(min, 10), ((1u64 << 63) % 10) as usize);
        assert_eq!(bucket_index(min, 10), 8);
        for cap in 1..64 {
            assert!(bucket_index(min, cap) < cap);
        }
    }

    #[test]
    fn minimum_hash_element_round_trips() {
        let mut t = identity_table::<i64>();
        assert!(t.insert(i64::MIN));
        assert!(t.contains(&i64::MIN));
        assert_eq!(t.chain_lengths()[8], 1);
        assert_eq!(t.remove(&i64::MIN), Ok(Some(i64::MIN)));
        assert!(t.is_empty());
    }

    #[test]
    fn chain_keeps_insertion_order_within_bucket() {
        let mut t = identity_table::<i32>();
        for v in [13, 3, -23, 25] {
            t.insert(v);
        }
        assert_eq!(t.chain_lengths()[3], 3);
        assert_eq!(drain_order(&t), vec![13, 3, -23, 25]);
    }

    #[test]
    fn remove_unlinks_head_middle_and_tail() {
        let mut t = identity_table::<i32>();
        for v in [3, 13, 23, 33, 43] {
            t.insert(v);
        }
        assert_eq!(t.remove(&3), Ok(Some(3)));
        assert_eq!(drain_order(&t), vec![13, 23, 33, 43]);
        assert_eq!(t.remove(&23), Ok(Some(23)));
        assert_eq!(drain_order(&t), vec![13, 33, 43]);
        assert_eq!(t.remove(&43), Ok(Some(43)));
        assert_eq!(drain_order(&t), vec![13, 33]);
        assert_eq!(t.len(), 2);
        assert_eq!(t.chain_lengths()[3], 2);
    }

    /// Empty bucket is an error; an occupied bucket without a match is a
    /// silent no-op that leaves the generation untouched.
    #[test]
    fn remove_miss_is_asymmetric() {
        let mut t = identity_table::<i32>();
        assert_eq!(t.remove(&4), Err(TableError::NotFound));
        t.insert(3);
        let g = t.generation();
        assert_eq!(t.remove(&13), Ok(None));
        assert_eq!(t.remove(&4), Err(TableError::NotFound));
        assert_eq!(t.generation(), g);
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn duplicate_insert_is_noop() {
        let mut t: ChainTable<i32> = ChainTable::new();
        assert!(t.insert(2));
        let g = t.generation();
        assert!(!t.insert(2));
        assert!(!t.insert(2));
        assert_eq!(t.len(), 1);
        assert_eq!(t.generation(), g);
    }

    #[test]
    fn get_returns_stored_element() {
        let mut t: ChainTable<String> = ChainTable::new();
        t.insert("alpha".to_string());
        assert_eq!(t.get("alpha").map(String::as_str), Some("alpha"));
        assert!(t.get("beta").is_none());
        assert!(t.contains("alpha"));
    }

    /// Resize drains bucket-ascending and refills, recomputing every index
    /// against the new capacity.
    #[test]
    fn resize_recomputes_every_bucket_index() {
        let policy = GrowthPolicy::default()
            .with_initial_capacity(2)
            .with_growth_threshold(1.0)
            .with_growth_ratio(2.0);
        let mut t: ChainTable<i32, Identity> =
            ChainTable::with_policy_and_hasher(policy, Identity::default()).unwrap();
        // Bucket 1 gets 3 then 1, bucket 0 gets 2 then 0.
        for v in [3, 2, 1, 0] {
            t.insert(v);
        }
        assert_eq!(t.capacity(), 2);
        assert_eq!(drain_order(&t), vec![2, 0, 3, 1]);

        // len 4 / cap 2 = 2 > 1.0: grows to 4 before placing 5.
        let g = t.generation();
        t.insert(5);
        assert_eq!(t.capacity(), 4);
        assert_eq!(drain_order(&t), vec![0, 1, 5, 2, 3]);
        assert!(t.generation() > g + 1);
        assert_eq!(t.misplaced_entries(), 0);
    }

    #[test]
    fn truncating_threshold_delays_growth() {
        let policy = GrowthPolicy::default().with_initial_capacity(4);
        let mut t: ChainTable<i32> = ChainTable::with_policy(policy).unwrap();
        for v in 0..12 {
            t.insert(v);
        }
        // 11 / 4 truncates to 2, so no resize yet even though the true ratio is 2.75.
        assert_eq!(t.capacity(), 4);
        t.insert(12);
        assert_eq!(t.capacity(), 6);
        assert_eq!(t.len(), 13);
    }

    #[test]
    fn exact_threshold_grows_past_true_ratio() {
        let policy = GrowthPolicy::default()
            .with_initial_capacity(4)
            .with_threshold_mode(ThresholdMode::Exact);
        let mut t: ChainTable<i32> = ChainTable::with_policy(policy).unwrap();
        for v in 0..11 {
            t.insert(v);
        }
        // 10 / 4 = 2.5 is not above 2.5.
        assert_eq!(t.capacity(), 4);
        t.insert(11);
        assert_eq!(t.capacity(), 6);
    }

    #[test]
    fn clear_restores_initial_capacity() {
        let mut t: ChainTable<i32> = ChainTable::new();
        for v in 0..100 {
            t.insert(v);
        }
        assert!(t.capacity() > 10);
        let g = t.generation();
        t.clear();
        assert_eq!(t.capacity(), 10);
        assert_eq!(t.len(), 0);
        assert!(t.is_empty());
        assert_eq!(t.generation(), g + 1);
        assert!(!t.contains(&5));
    }

    #[test]
    fn invalid_policy_is_rejected() {
        let r = ChainTable::<i32>::with_policy(GrowthPolicy::default().with_initial_capacity(0));
        assert!(matches!(r, Err(TableError::PreconditionViolation(_))));
    }

    #[test]
    fn from_iterator_deduplicates() {
        let t: ChainTable<i32> = [1, 2, 2, 3, 1].into_iter().collect();
        assert_eq!(t.len(), 3);
        let seen: BTreeSet<i32> = t.iter().copied().collect();
        assert_eq!(seen, BTreeSet::from([1, 2, 3]));
    }
}
