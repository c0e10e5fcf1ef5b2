//! ChainMap: a map adapter storing key/value composites in one ChainTable.
//!
//! Entries hash and compare by key only. Because the table suppresses
//! duplicates, `insert` on an existing key keeps the old value; use
//! `replace` to swap it (remove, then insert).

use crate::chain_table::ChainTable;
use crate::error::TableError;
use crate::policy::GrowthPolicy;
use crate::traversal::Iter;
use core::borrow::Borrow;
use core::hash::{BuildHasher, Hash, Hasher};
use hashbrown::hash_map::DefaultHashBuilder;

/// Key/value composite whose identity is the key alone.
#[derive(Clone, Debug)]
pub struct KeyValue<K, V> {
    pub key: K,
    pub value: V,
}

impl<K: PartialEq, V> PartialEq for KeyValue<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<K: Eq, V> Eq for KeyValue<K, V> {}

impl<K: Hash, V> Hash for KeyValue<K, V> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

// Lets a bare `ChainTable<KeyValue<K, V>>` be probed with `&K`; hashing
// matches `Hash` above.
impl<K, V> Borrow<K> for KeyValue<K, V> {
    fn borrow(&self) -> &K {
        &self.key
    }
}

pub struct ChainMap<K, V, S = DefaultHashBuilder> {
    table: ChainTable<KeyValue<K, V>, S>,
}

impl<K, V> ChainMap<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self {
            table: ChainTable::new(),
        }
    }

    pub fn with_policy(policy: GrowthPolicy) -> Result<Self, TableError> {
        Ok(Self {
            table: ChainTable::with_policy(policy)?,
        })
    }
}

impl<K, V> Default for ChainMap<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> ChainMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub fn with_hasher(hasher: S) -> Self {
        Self {
            table: ChainTable::with_hasher(hasher),
        }
    }

    pub fn with_policy_and_hasher(policy: GrowthPolicy, hasher: S) -> Result<Self, TableError> {
        Ok(Self {
            table: ChainTable::with_policy_and_hasher(policy, hasher)?,
        })
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Add `key -> value` if `key` is absent. Returns `false` and drops
    /// `value` when the key is already mapped.
    pub fn insert(&mut self, key: K, value: V) -> bool {
        self.table.insert(KeyValue { key, value })
    }

    /// Map `key` to `value`, returning the previous value if there was one.
    pub fn replace(&mut self, key: K, value: V) -> Option<V> {
        // An empty bucket (`NotFound`) simply means there is nothing to replace.
        let previous = self.remove(&key).ok().flatten();
        self.table.insert(KeyValue { key, value });
        previous
    }

    // Lookups below hash the borrowed key `q` directly: a `KeyValue` hashes
    // as its key, and `K: Borrow<Q>` makes the key hash as `q`.

    /// Same miss semantics as [`ChainTable::remove`].
    pub fn remove<Q>(&mut self, q: &Q) -> Result<Option<V>, TableError>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let removed = self
            .table
            .remove_by(q, |kv| <K as Borrow<Q>>::borrow(&kv.key) == q)?;
        Ok(removed.map(|kv| kv.value))
    }

    pub fn get<Q>(&self, q: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.table
            .get_by(q, |kv| <K as Borrow<Q>>::borrow(&kv.key) == q)
            .map(|kv| &kv.value)
    }

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.get(q).is_some()
    }

    /// Linear scan over every stored value.
    pub fn contains_value(&self, value: &V) -> bool
    where
        V: PartialEq,
    {
        self.values().any(|v| v == value)
    }

    pub fn clear(&mut self) {
        self.table.clear()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> + '_ {
        self.table.iter().map(|kv| (&kv.key, &kv.value))
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.table.iter().map(|kv| &kv.key)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.table.iter().map(|kv| &kv.value)
    }

    /// Entries in table order, as stored.
    pub fn entries(&self) -> Iter<'_, KeyValue<K, V>, S> {
        self.table.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_value_identity_ignores_value() {
        let a = KeyValue { key: "k", value: 1 };
        let b = KeyValue { key: "k", value: 2 };
        assert_eq!(a, b);
        let s = DefaultHashBuilder::default();
        assert_eq!(s.hash_one(&a), s.hash_one(&b));
        assert_eq!(s.hash_one(&a), s.hash_one("k"));
    }

    #[test]
    fn policy_constructors_pass_through() {
        let policy = GrowthPolicy::default().with_initial_capacity(3);
        let m: ChainMap<u8, u8> = ChainMap::with_policy(policy).unwrap();
        assert_eq!(m.table.capacity(), 3);
        assert_eq!(m.table.policy(), &policy);

        let bad = GrowthPolicy::default().with_growth_ratio(0.5);
        assert!(matches!(
            ChainMap::<u8, u8>::with_policy_and_hasher(bad, DefaultHashBuilder::default()),
            Err(TableError::PreconditionViolation(_))
        ));
    }

    #[test]
    fn replace_on_missing_key_inserts() {
        let mut m: ChainMap<&str, i32> = ChainMap::new();
        assert_eq!(m.replace("a", 1), None);
        assert_eq!(m.replace("a", 2), Some(1));
        assert_eq!(m.get(&"a"), Some(&2));
        assert_eq!(m.len(), 1);
    }
}
