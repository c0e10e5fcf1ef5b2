#![cfg(test)]

// Property tests for ChainTable kept inside the crate so they can check
// bucket-level invariants through test-only accessors.

use crate::chain_table::ChainTable;
use crate::error::TableError;
use crate::policy::{GrowthPolicy, ThresholdMode};
use core::hash::{BuildHasher, Hasher};
use proptest::prelude::*;
use std::collections::{BTreeSet, HashSet};

// Pool-indexed operations: indices shrink to earlier values and op lists
// shrink in length.
#[derive(Clone, Debug)]
enum Op {
    Insert(usize),
    Remove(usize),
    Contains(usize),
    Get(usize),
    Clear,
    Iterate,
}

fn arb_scenario() -> impl Strategy<Value = (Vec<i64>, Vec<Op>)> {
    proptest::collection::vec(any::<i64>(), 1..=24).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let op = prop_oneof![
            6 => idx.clone().prop_map(Op::Insert),
            3 => idx.clone().prop_map(Op::Remove),
            2 => idx.clone().prop_map(Op::Contains),
            1 => idx.clone().prop_map(Op::Get),
            1 => Just(Op::Clear),
            1 => Just(Op::Iterate),
        ];
        proptest::collection::vec(op, 1..120).prop_map(move |ops| (pool.clone(), ops))
    })
}

fn arb_policy() -> impl Strategy<Value = GrowthPolicy> {
    (
        1usize..=8,
        prop_oneof![Just(0.5f64), Just(1.0), Just(2.5)],
        prop_oneof![Just(1.5f64), Just(2.0)],
        prop_oneof![
            Just(ThresholdMode::TruncatingDivision),
            Just(ThresholdMode::Exact)
        ],
    )
        .prop_map(|(cap, threshold, ratio, mode)| {
            GrowthPolicy::default()
                .with_initial_capacity(cap)
                .with_growth_threshold(threshold)
                .with_growth_ratio(ratio)
                .with_threshold_mode(mode)
        })
}

// Runs `ops` against `sut` and a HashSet model. `strict_miss` decides what an
// absent remove must return given whether the table is empty; `None` accepts
// either miss outcome.
fn run_state_machine<S: BuildHasher>(
    sut: &mut ChainTable<i64, S>,
    pool: &[i64],
    ops: Vec<Op>,
    strict_miss: Option<fn(bool) -> Result<Option<i64>, TableError>>,
) -> Result<(), TestCaseError> {
    let mut model: HashSet<i64> = HashSet::new();
    let initial_capacity = sut.policy().initial_capacity;

    for op in ops {
        let before_gen = sut.generation();
        match op {
            Op::Insert(i) => {
                let v = pool[i];
                let added = sut.insert(v);
                prop_assert_eq!(added, model.insert(v));
                if added {
                    prop_assert!(sut.generation() > before_gen);
                } else {
                    prop_assert_eq!(sut.generation(), before_gen);
                }
            }
            Op::Remove(i) => {
                let v = pool[i];
                let was_empty = sut.is_empty();
                let r = sut.remove(&v);
                if model.remove(&v) {
                    prop_assert_eq!(r, Ok(Some(v)));
                    prop_assert_eq!(sut.generation(), before_gen + 1);
                } else {
                    match strict_miss {
                        Some(expect) => prop_assert_eq!(r, expect(was_empty)),
                        None => prop_assert!(
                            matches!(r, Ok(None) | Err(TableError::NotFound)),
                            "unexpected miss result {:?}",
                            r
                        ),
                    }
                    if was_empty {
                        prop_assert_eq!(r, Err(TableError::NotFound));
                    }
                    prop_assert_eq!(sut.generation(), before_gen);
                }
            }
            Op::Contains(i) => {
                let v = pool[i];
                prop_assert_eq!(sut.contains(&v), model.contains(&v));
            }
            Op::Get(i) => {
                let v = pool[i];
                prop_assert_eq!(sut.get(&v).copied(), model.get(&v).copied());
            }
            Op::Clear => {
                sut.clear();
                model.clear();
                prop_assert_eq!(sut.capacity(), initial_capacity);
            }
            Op::Iterate => {
                let seen: Vec<i64> = sut.iter().copied().collect();
                prop_assert_eq!(seen.len(), model.len(), "each live element exactly once");
                let s: BTreeSet<i64> = seen.into_iter().collect();
                let m: BTreeSet<i64> = model.iter().copied().collect();
                prop_assert_eq!(s, m);
            }
        }

        // Post-conditions after each op
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
        prop_assert!(sut.capacity() >= 1);
        prop_assert_eq!(sut.chain_lengths().iter().sum::<usize>(), sut.len());
        prop_assert_eq!(sut.misplaced_entries(), 0);
        prop_assert!(sut.generation() >= before_gen);
    }
    Ok(())
}

// Property: State-machine equivalence against std::collections::HashSet under
// random growth policies. Invariants exercised across random sequences:
// - Duplicate inserts are no-ops and never bump the generation.
// - Removing a present element returns it; misses never mutate.
// - Count equals the sum of chain lengths; every entry sits in its bucket.
// - Iteration yields each live element exactly once.
// - `clear` restores the initial capacity.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine(policy in arb_policy(), (pool, ops) in arb_scenario()) {
        let mut sut: ChainTable<i64> = ChainTable::with_policy(policy).unwrap();
        run_state_machine(&mut sut, &pool, ops, None)?;
    }
}

// Collision variant using a constant hasher: every element shares bucket 0,
// so an absent remove is `NotFound` exactly when the table is empty.
#[derive(Clone, Default)]
struct ConstBuildHasher;
struct ConstHasher;
impl BuildHasher for ConstBuildHasher {
    type Hasher = ConstHasher;
    fn build_hasher(&self) -> Self::Hasher {
        ConstHasher
    }
}
impl Hasher for ConstHasher {
    fn write(&mut self, _bytes: &[u8]) {}
    fn finish(&self) -> u64 {
        0
    }
}

fn single_bucket_miss(was_empty: bool) -> Result<Option<i64>, TableError> {
    if was_empty {
        Err(TableError::NotFound)
    } else {
        Ok(None)
    }
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions(policy in arb_policy(), (pool, ops) in arb_scenario()) {
        let mut sut: ChainTable<i64, ConstBuildHasher> =
            ChainTable::with_policy_and_hasher(policy, ConstBuildHasher).unwrap();
        run_state_machine(&mut sut, &pool, ops, Some(single_bucket_miss as fn(bool) -> _))?;
        // Everything lives in one chain regardless of growth.
        let lengths = sut.chain_lengths();
        prop_assert_eq!(lengths[0], sut.len());
    }
}

// Property: a traversal created before any structural mutation fails on its
// next call; one created after completes and visits every element once.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_traversal_fail_fast(
        initial in proptest::collection::hash_set(any::<i64>(), 0..40),
        extra in any::<i64>(),
        steps in 0usize..40,
    ) {
        let mut t: ChainTable<i64> = initial.iter().copied().collect();
        let mut cur = t.traversal();
        for _ in 0..steps {
            if cur.next(&t)?.is_none() {
                break;
            }
        }
        if t.insert(extra) {
            prop_assert_eq!(cur.has_next(&t), Err(TableError::Invalidated));
            prop_assert_eq!(cur.next(&t), Err(TableError::Invalidated));
        } else {
            prop_assert!(cur.has_next(&t).is_ok());
        }

        let mut fresh = t.traversal();
        let mut seen = Vec::new();
        while fresh.has_next(&t)? {
            if let Some(v) = fresh.next(&t)? {
                seen.push(*v);
            }
        }
        let mut expected: Vec<i64> = initial.into_iter().chain(Some(extra)).collect();
        expected.sort_unstable();
        expected.dedup();
        seen.sort_unstable();
        prop_assert_eq!(seen, expected);
    }
}
