//! Fail-fast traversal over a [`ChainTable`].
//!
//! Order is bucket-ascending, head-to-tail within each chain. A
//! [`Traversal`] does not borrow the table; it records the table's
//! generation at creation and rejects every later step once the table has
//! been structurally modified. [`Iter`] wraps the same cursor behind a shared
//! borrow, so the borrow checker rules out mutation for its lifetime.

use crate::chain_table::ChainTable;
use crate::error::TableError;
use core::iter::FusedIterator;
use slotmap::DefaultKey;

/// Detached, single-pass cursor bound to the generation it was created at.
///
/// Every call takes the table it was created from; any other table is
/// rejected with `WrongTable`.
#[derive(Clone, Debug)]
pub struct Traversal {
    table_id: u64,
    generation: u64,
    bucket: usize,
    // `None` once exhausted.
    entry: Option<DefaultKey>,
}

impl Traversal {
    pub(crate) fn new<T, S>(table: &ChainTable<T, S>) -> Self {
        let mut t = Traversal {
            table_id: table.id(),
            generation: table.current_generation(),
            bucket: 0,
            entry: None,
        };
        t.seek_from(table, 0);
        t
    }

    // Park on the head of the first non-empty bucket at or after `start`.
    fn seek_from<T, S>(&mut self, table: &ChainTable<T, S>, start: usize) {
        let heads = table.bucket_heads();
        match heads
            .iter()
            .enumerate()
            .skip(start)
            .find_map(|(i, head)| head.map(|k| (i, k)))
        {
            Some((i, k)) => {
                self.bucket = i;
                self.entry = Some(k);
            }
            None => {
                self.bucket = heads.len();
                self.entry = None;
            }
        }
    }

    fn check<T, S>(&self, table: &ChainTable<T, S>) -> Result<(), TableError> {
        if self.table_id != table.id() {
            return Err(TableError::WrongTable);
        }
        if self.generation != table.current_generation() {
            return Err(TableError::Invalidated);
        }
        Ok(())
    }

    pub fn has_next<T, S>(&self, table: &ChainTable<T, S>) -> Result<bool, TableError> {
        self.check(table)?;
        Ok(self.entry.is_some())
    }

    /// Yield the current element and advance. `Ok(None)` once exhausted.
    pub fn next<'t, T, S>(
        &mut self,
        table: &'t ChainTable<T, S>,
    ) -> Result<Option<&'t T>, TableError> {
        self.check(table)?;
        let Some(k) = self.entry else {
            return Ok(None);
        };
        let entry = table.entry(k).ok_or(TableError::Invalidated)?;
        match entry.next {
            Some(next) => self.entry = Some(next),
            None => self.seek_from(table, self.bucket + 1),
        }
        Ok(Some(&entry.value))
    }
}

/// Borrowing iterator over a [`ChainTable`].
pub struct Iter<'a, T, S> {
    table: &'a ChainTable<T, S>,
    cursor: Traversal,
    remaining: usize,
}

impl<'a, T, S> Iter<'a, T, S>
where
    T: Eq + core::hash::Hash,
    S: core::hash::BuildHasher,
{
    pub(crate) fn new(table: &'a ChainTable<T, S>) -> Self {
        Self {
            table,
            cursor: Traversal::new(table),
            remaining: table.len(),
        }
    }
}

impl<'a, T, S> Iterator for Iter<'a, T, S> {
    type Item = &'a T;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        // The shared borrow keeps the generation fixed, so the cursor cannot fail.
        let item = self.cursor.next(self.table).ok().flatten()?;
        self.remaining -= 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, T, S> ExactSizeIterator for Iter<'a, T, S> {}

impl<'a, T, S> FusedIterator for Iter<'a, T, S> {}
