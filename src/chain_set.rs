//! ChainSet: a set adapter storing raw elements in one ChainTable.

use crate::chain_table::ChainTable;
use crate::error::TableError;
use crate::policy::GrowthPolicy;
use crate::traversal::{Iter, Traversal};
use core::borrow::Borrow;
use core::hash::{BuildHasher, Hash};
use hashbrown::hash_map::DefaultHashBuilder;

pub struct ChainSet<T, S = DefaultHashBuilder> {
    table: ChainTable<T, S>,
}

impl<T> ChainSet<T>
where
    T: Eq + Hash,
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

impl<T> Default for ChainSet<T>
where
    T: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, S> ChainSet<T, S>
where
    T: Eq + Hash,
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

    pub fn insert(&mut self, value: T) -> bool {
        self.table.insert(value)
    }

    /// Same miss semantics as [`ChainTable::remove`].
    pub fn remove<Q>(&mut self, q: &Q) -> Result<Option<T>, TableError>
    where
        T: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.table.remove(q)
    }

    pub fn contains<Q>(&self, q: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.table.contains(q)
    }

    pub fn get<Q>(&self, q: &Q) -> Option<&T>
    where
        T: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.table.get(q)
    }

    pub fn clear(&mut self) {
        self.table.clear()
    }

    pub fn iter(&self) -> Iter<'_, T, S> {
        self.table.iter()
    }

    pub fn traversal(&self) -> Traversal {
        self.table.traversal()
    }

    /// The backing table, for traversal against a [`Traversal`] cursor.
    pub fn table(&self) -> &ChainTable<T, S> {
        &self.table
    }

    // Fresh set sharing this set's hasher and growth policy.
    fn empty_like(&self) -> Self
    where
        S: Clone,
    {
        Self {
            table: ChainTable::from_parts(*self.table.policy(), self.table.hasher().clone()),
        }
    }

    /// Elements in `self`, `other`, or both.
    pub fn union(&self, other: &Self) -> Self
    where
        T: Clone,
        S: Clone,
    {
        let mut out = self.empty_like();
        out.table.extend(self.iter().cloned());
        out.table.extend(other.iter().cloned());
        out
    }

    /// Elements in both `self` and `other`.
    pub fn intersection(&self, other: &Self) -> Self
    where
        T: Clone,
        S: Clone,
    {
        let mut out = self.empty_like();
        out.table
            .extend(self.iter().filter(|v| other.contains(*v)).cloned());
        out
    }

    /// Elements in `self` but not in `other`.
    pub fn difference(&self, other: &Self) -> Self
    where
        T: Clone,
        S: Clone,
    {
        let mut out = self.empty_like();
        out.table
            .extend(self.iter().filter(|v| !other.contains(*v)).cloned());
        out
    }

    /// Every element of `self` is in `other`.
    pub fn is_subset(&self, other: &Self) -> bool {
        self.len() <= other.len() && self.iter().all(|v| other.contains(v))
    }

    /// Every element of `other` is in `self`.
    pub fn is_superset(&self, other: &Self) -> bool {
        other.is_subset(self)
    }

    pub fn is_disjoint(&self, other: &Self) -> bool {
        other.iter().all(|v| !self.contains(v))
    }
}

impl<'a, T, S> IntoIterator for &'a ChainSet<T, S>
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

impl<T> FromIterator<T> for ChainSet<T>
where
    T: Eq + Hash,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            table: iter.into_iter().collect(),
        }
    }
}
