use super::*;

use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;
use std::ops::ControlFlow;

use crate::node::{Entry, L, R};
use crate::tree::AvlTree;

/// Walks the whole tree checking the structural invariants: stored heights
/// match the node-counting definition, every balance factor is within ±1,
/// in-order traversal is sorted under the comparator, and the reachable node
/// count agrees with both `len` and the pool's live-slot count.
fn validate_tree<E, C, I>(t: &AvlTree<E, C, I>)
where
    E: Entry,
    C: Compare<E::Key>,
    I: PoolIdx,
{
    fn check_subtree<E: Entry, C, I: PoolIdx>(t: &AvlTree<E, C, I>, x: I) -> (u8, usize) {
        if x.is_nil() {
            return (0, 0);
        }
        let node = t.pool.get(x);
        let (hl, nl) = check_subtree(t, node.kid[L]);
        let (hr, nr) = check_subtree(t, node.kid[R]);
        assert_eq!(
            node.height,
            1 + hl.max(hr),
            "stored node height must match children"
        );
        assert!(
            (hl as i32 - hr as i32).abs() <= 1,
            "balance factor out of range: left {hl}, right {hr}"
        );
        (node.height, nl + nr + 1)
    }

    let (_, count) = check_subtree(t, t.root);
    assert_eq!(count, t.len(), "reachable node count must match len");
    assert_eq!(t.pool.live(), t.len(), "live pool slots must match len");

    let mut prev: Option<&E> = None;
    for e in t.iter() {
        if let Some(p) = prev {
            assert!(
                !t.cmp.less(e.key(), p.key()),
                "in-order traversal must be sorted"
            );
        }
        prev = Some(e);
    }
}

#[derive(Clone, Debug)]
enum SetOp {
    Insert(i32),
    Remove(i32),
    Get(i32),
    Filter(i32),
    Clear,
}

fn set_ops_strategy() -> impl Strategy<Value = Vec<SetOp>> {
    // A small key domain forces plenty of duplicate hits and removals of
    // present elements.
    let key = 0i32..64;
    let op = prop_oneof![
        50 => key.clone().prop_map(SetOp::Insert),
        30 => key.clone().prop_map(SetOp::Remove),
        15 => key.clone().prop_map(SetOp::Get),
        4 => (2i32..5).prop_map(SetOp::Filter),
        1 => Just(SetOp::Clear),
    ];
    prop::collection::vec(op, 0..=2000)
}

#[derive(Clone, Debug)]
enum MapOp {
    Insert(i32, u64),
    Remove(i32),
    Get(i32),
    Bump(i32),
    AlterKey(i32, i32),
    LowerBound(i32),
    UpperBound(i32),
}

fn map_ops_strategy() -> impl Strategy<Value = Vec<MapOp>> {
    let key = 0i32..64;
    let op = prop_oneof![
        35 => (key.clone(), any::<u64>()).prop_map(|(k, v)| MapOp::Insert(k, v)),
        20 => key.clone().prop_map(MapOp::Remove),
        15 => key.clone().prop_map(MapOp::Get),
        10 => key.clone().prop_map(MapOp::Bump),
        10 => (key.clone(), key.clone()).prop_map(|(a, b)| MapOp::AlterKey(a, b)),
        5 => key.clone().prop_map(MapOp::LowerBound),
        5 => key.clone().prop_map(MapOp::UpperBound),
    ];
    prop::collection::vec(op, 0..=2000)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 50_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_set_equivalence(ops in set_ops_strategy()) {
        let mut s: AvlSet<i32> = AvlSet::new();
        let mut m: BTreeSet<i32> = BTreeSet::new();

        for op in ops {
            match op {
                SetOp::Insert(k) => {
                    prop_assert_eq!(s.insert(k).unwrap(), m.insert(k));
                }
                SetOp::Remove(k) => {
                    prop_assert_eq!(s.remove(&k), m.remove(&k));
                }
                SetOp::Get(k) => {
                    prop_assert_eq!(s.contains(&k), m.contains(&k));
                }
                SetOp::Filter(modulus) => {
                    s.filter(|&k| k % modulus == 0);
                    m.retain(|&k| k % modulus != 0);
                }
                SetOp::Clear => {
                    s.clear();
                    m.clear();
                }
            }
            prop_assert_eq!(s.len(), m.len());
        }

        validate_tree(&s.tree);
        let got: Vec<i32> = s.iter().copied().collect();
        let expected: Vec<i32> = m.iter().copied().collect();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn prop_map_equivalence(ops in map_ops_strategy()) {
        let mut t: AvlMap<i32, u64> = AvlMap::new();
        let mut m: BTreeMap<i32, u64> = BTreeMap::new();

        for op in ops {
            match op {
                MapOp::Insert(k, v) => {
                    let (_, was_new) = t.insert(k, v).unwrap();
                    prop_assert_eq!(was_new, m.insert(k, v).is_none());
                }
                MapOp::Remove(k) => {
                    prop_assert_eq!(t.remove(&k), m.remove(&k).is_some());
                }
                MapOp::Get(k) => {
                    prop_assert_eq!(t.get(&k), m.get(&k));
                }
                MapOp::Bump(k) => {
                    *t.get_or_insert_default(k).unwrap() += 1;
                    *m.entry(k).or_default() += 1;
                }
                MapOp::AlterKey(old, new) => {
                    let (changed, replaced) = t.alter_key(&old, new);
                    let (m_changed, m_replaced) = match m.remove(&old) {
                        Some(v) => (true, m.insert(new, v).is_some()),
                        None => (false, false),
                    };
                    prop_assert_eq!((changed, replaced), (m_changed, m_replaced));
                }
                MapOp::LowerBound(k) => {
                    prop_assert_eq!(t.lower_bound(&k), m.range(k..).next());
                }
                MapOp::UpperBound(k) => {
                    let next = m.range((Bound::Excluded(k), Bound::Unbounded)).next();
                    prop_assert_eq!(t.upper_bound(&k), next);
                }
            }
            prop_assert_eq!(t.len(), m.len());
        }

        validate_tree(&t.tree);
        let got: Vec<(i32, u64)> = t.iter().map(|(&k, &v)| (k, v)).collect();
        let expected: Vec<(i32, u64)> = m.iter().map(|(&k, &v)| (k, v)).collect();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn prop_multiset_counts(values in prop::collection::vec(0i32..16, 0..=500)) {
        let mut s: AvlMultiset<i32> = AvlMultiset::new();
        let mut counts: BTreeMap<i32, usize> = BTreeMap::new();

        for v in values {
            s.insert(v).unwrap();
            *counts.entry(v).or_default() += 1;
        }

        validate_tree(&s.tree);
        let got: Vec<i32> = s.iter().copied().collect();
        let expected: Vec<i32> = counts
            .iter()
            .flat_map(|(&k, &n)| std::iter::repeat(k).take(n))
            .collect();
        prop_assert_eq!(got, expected);

        // Removing one copy at a time drains every key group.
        let keys: Vec<i32> = counts.keys().copied().collect();
        for k in keys {
            while counts[&k] > 0 {
                prop_assert!(s.remove(&k));
                *counts.get_mut(&k).unwrap() -= 1;
                validate_tree(&s.tree);
            }
            prop_assert!(!s.remove(&k));
        }
        prop_assert!(s.is_empty());
    }
}

/// Bound-scan grid over a multiset with runs of duplicates: for every probe
/// value, both resumable traversals must visit exactly the reference slice,
/// and stopping early at a cutoff must visit exactly the reference range.
#[test]
fn bound_scan_grid_over_duplicates() {
    let values = [1, 2, 3, 3, 3, 5, 7, 9, 11, 11, 11, 13, 15];
    let mut s: AvlMultiset<i32> = AvlMultiset::new();
    for v in values {
        s.insert(v).unwrap();
    }
    validate_tree(&s.tree);

    for beg in 0..=17 {
        let mut got = Vec::new();
        s.for_each_since_lower_bound(&beg, |&v| {
            got.push(v);
            ControlFlow::Continue(())
        });
        let expected: Vec<i32> = values.iter().copied().filter(|&v| v >= beg).collect();
        assert_eq!(got, expected, "lower bound scan from {beg}");

        got.clear();
        s.for_each_since_upper_bound(&beg, |&v| {
            got.push(v);
            ControlFlow::Continue(())
        });
        let expected: Vec<i32> = values.iter().copied().filter(|&v| v > beg).collect();
        assert_eq!(got, expected, "upper bound scan from {beg}");

        for end in beg..=17 {
            got.clear();
            s.for_each_since_lower_bound(&beg, |&v| {
                if v > end {
                    return ControlFlow::Break(());
                }
                got.push(v);
                ControlFlow::Continue(())
            });
            let expected: Vec<i32> = values
                .iter()
                .copied()
                .filter(|&v| v >= beg && v <= end)
                .collect();
            assert_eq!(got, expected, "windowed scan [{beg}, {end}]");
        }
    }
}

#[test]
fn randomized_churn_preserves_invariants() {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut t: AvlMap<u32, u32> = AvlMap::new();
    let mut m: BTreeMap<u32, u32> = BTreeMap::new();

    for round in 0..20 {
        for _ in 0..500 {
            let k = rng.gen_range(0..256);
            if rng.gen_bool(0.6) {
                let v = rng.gen();
                let (_, was_new) = t.insert(k, v).unwrap();
                assert_eq!(was_new, m.insert(k, v).is_none());
            } else {
                assert_eq!(t.remove(&k), m.remove(&k).is_some());
            }
        }
        validate_tree(&t.tree);
        assert!(
            t.iter().map(|(&k, &v)| (k, v)).eq(m.iter().map(|(&k, &v)| (k, v))),
            "round {round} diverged from the reference map"
        );
    }
}
