//! Sorted maps: unique-key [`AvlMap`] and duplicate-friendly [`AvlMultimap`].

use std::fmt;
use std::ops::ControlFlow;

use crate::cmp::{Compare, NaturalOrder};
use crate::node::MapEntry;
use crate::pool::{PoolExhausted, PoolIdx};
use crate::tree::AvlTree;

/// Sorted map with unique keys, stored in an index-addressed node pool.
///
/// Keys are immutable once inserted; values are freely mutable in place, and
/// a key can be rewritten without moving its value via [`alter_key`].
///
/// ```
/// use avl_arena::AvlMap;
///
/// let mut map: AvlMap<String, u32> = AvlMap::new();
/// map.insert("a".to_string(), 1).unwrap();
/// *map.get_mut("a").unwrap() = 10;
/// assert_eq!(map.get("a"), Some(&10));
/// ```
///
/// [`alter_key`]: AvlMap::alter_key
#[derive(Clone)]
pub struct AvlMap<K, V, C = NaturalOrder, I: PoolIdx = u32> {
    pub(crate) tree: AvlTree<MapEntry<K, V>, C, I>,
}

impl<K, V, C: Default, I: PoolIdx> AvlMap<K, V, C, I> {
    pub fn new() -> Self {
        Self::with_comparator(C::default())
    }

    /// A map with `n` slots pre-grown (slot 0 is the nil sentinel).
    pub fn with_capacity(n: usize) -> Self {
        Self::with_capacity_and_comparator(n, C::default())
    }
}

impl<K, V, C: Default, I: PoolIdx> Default for AvlMap<K, V, C, I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, C, I: PoolIdx> AvlMap<K, V, C, I> {
    pub fn with_comparator(cmp: C) -> Self {
        AvlMap {
            tree: AvlTree::new(cmp),
        }
    }

    pub fn with_capacity_and_comparator(n: usize, cmp: C) -> Self {
        AvlMap {
            tree: AvlTree::with_capacity(n, cmp),
        }
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Current slot capacity of the backing pool.
    pub fn capacity(&self) -> usize {
        self.tree.capacity()
    }

    /// Capacity ceiling imposed by the index type `I`.
    pub fn max_capacity() -> usize {
        AvlTree::<MapEntry<K, V>, C, I>::max_capacity()
    }

    /// Pre-grows the pool to at least `n` slots.
    pub fn reserve_for(&mut self, n: usize) -> Result<(), PoolExhausted> {
        self.tree.reserve_for(n)
    }

    /// Removes every entry. Capacity is retained.
    pub fn clear(&mut self) {
        self.tree.clear();
    }

    /// In-order iterator over `(key, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.tree.iter().map(|e| (&e.key, &e.value))
    }

    /// Entry with the smallest key.
    pub fn first(&self) -> Option<(&K, &V)> {
        self.tree.first().map(|id| {
            let e = self.tree.entry(id);
            (&e.key, &e.value)
        })
    }

    /// Entry with the largest key.
    pub fn last(&self) -> Option<(&K, &V)> {
        self.tree.last().map(|id| {
            let e = self.tree.entry(id);
            (&e.key, &e.value)
        })
    }

    /// Calls `f` on every entry in key order until it breaks.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&K, &V) -> ControlFlow<()>,
    {
        self.tree.for_each(|e| f(&e.key, &e.value));
    }

    /// Like [`for_each`](Self::for_each) with mutable access to the values.
    pub fn for_each_mut<F>(&mut self, mut f: F)
    where
        F: FnMut(&K, &mut V) -> ControlFlow<()>,
    {
        self.tree.for_each_mut(|e| f(&e.key, &mut e.value));
    }
}

impl<K, V, C, I: PoolIdx> AvlMap<K, V, C, I>
where
    C: Compare<K>,
{
    /// Inserts `(key, value)`, replacing the value of an existing equal key.
    /// Returns the value slot and whether the key was new (false means an
    /// existing entry's value was replaced).
    pub fn insert(&mut self, key: K, value: V) -> Result<(&mut V, bool), PoolExhausted> {
        let id = self.tree.alloc_node(MapEntry { key, value })?;
        let was_new = self.tree.insert_or_replace(id);
        Ok((&mut self.tree.entry_mut(id).value, was_new))
    }

    /// The indexing operation: returns the value under `key`, inserting a
    /// default-constructed one first if the key is absent. The default value
    /// is only constructed on the insertion path.
    pub fn get_or_insert_default(&mut self, key: K) -> Result<&mut V, PoolExhausted>
    where
        V: Default,
    {
        let id = self.tree.emplace_if_not_exists(key, |key| MapEntry {
            key,
            value: V::default(),
        })?;
        Ok(&mut self.tree.entry_mut(id).value)
    }

    /// Rewrites the key of the entry at `old` to `new` without moving or
    /// cloning its value and without allocating: the node is pulled out of
    /// the tree, its key overwritten in place, and reinserted. If `new`
    /// collides with another live entry, that entry is discarded in favor of
    /// the altered one.
    ///
    /// Returns `(changed, replaced_existing)`; `(false, false)` when `old`
    /// is absent.
    pub fn alter_key<Q>(&mut self, old: &Q, new: K) -> (bool, bool)
    where
        Q: ?Sized,
        C: Compare<K, Q> + Compare<Q, K>,
    {
        let Some(id) = self.tree.pull_out(old) else {
            return (false, false);
        };
        self.tree.entry_mut(id).key = new;
        let was_new = self.tree.insert_or_replace(id);
        (true, !was_new)
    }

    /// Removes every entry for which `pred` returns true, preserving the
    /// order of survivors. O(n + k log n) for k removals.
    pub fn filter<P>(&mut self, mut pred: P)
    where
        P: FnMut(&K, &V) -> bool,
        K: Clone,
    {
        self.tree.filter(|e| pred(&e.key, &e.value));
    }
}

impl<K, V, C, I: PoolIdx> AvlMap<K, V, C, I> {
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        Q: ?Sized,
        C: Compare<K, Q> + Compare<Q, K>,
    {
        self.tree.find(key).map(|id| &self.tree.entry(id).value)
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        Q: ?Sized,
        C: Compare<K, Q> + Compare<Q, K>,
    {
        self.tree
            .find(key)
            .map(|id| &mut self.tree.entry_mut(id).value)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        Q: ?Sized,
        C: Compare<K, Q> + Compare<Q, K>,
    {
        self.tree.find(key).is_some()
    }

    /// Entry with the smallest key not less than `key`.
    pub fn lower_bound<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        Q: ?Sized,
        C: Compare<K, Q>,
    {
        self.tree.lower_bound(key).map(|id| {
            let e = self.tree.entry(id);
            (&e.key, &e.value)
        })
    }

    pub fn lower_bound_mut<Q>(&mut self, key: &Q) -> Option<(&K, &mut V)>
    where
        Q: ?Sized,
        C: Compare<K, Q>,
    {
        let id = self.tree.lower_bound(key)?;
        let e = self.tree.entry_mut(id);
        Some((&e.key, &mut e.value))
    }

    /// Entry with the smallest key strictly greater than `key`.
    pub fn upper_bound<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        Q: ?Sized,
        C: Compare<Q, K>,
    {
        self.tree.upper_bound(key).map(|id| {
            let e = self.tree.entry(id);
            (&e.key, &e.value)
        })
    }

    pub fn upper_bound_mut<Q>(&mut self, key: &Q) -> Option<(&K, &mut V)>
    where
        Q: ?Sized,
        C: Compare<Q, K>,
    {
        let id = self.tree.upper_bound(key)?;
        let e = self.tree.entry_mut(id);
        Some((&e.key, &mut e.value))
    }

    /// Removes the entry with key `key`; returns whether an erase occurred.
    pub fn remove<Q>(&mut self, key: &Q) -> bool
    where
        Q: ?Sized,
        C: Compare<K, Q> + Compare<Q, K>,
    {
        self.tree.erase(key)
    }

    /// Calls `f` on every entry with key `>= key`, in order, until it breaks.
    pub fn for_each_since_lower_bound<Q, F>(&self, key: &Q, mut f: F)
    where
        Q: ?Sized,
        F: FnMut(&K, &V) -> ControlFlow<()>,
        C: Compare<K, Q>,
    {
        self.tree
            .for_each_since_lower_bound(key, |e| f(&e.key, &e.value));
    }

    pub fn for_each_since_lower_bound_mut<Q, F>(&mut self, key: &Q, mut f: F)
    where
        Q: ?Sized,
        F: FnMut(&K, &mut V) -> ControlFlow<()>,
        C: Compare<K, Q>,
    {
        self.tree
            .for_each_since_lower_bound_mut(key, |e| f(&e.key, &mut e.value));
    }

    /// Calls `f` on every entry with key `> key`, in order, until it breaks.
    pub fn for_each_since_upper_bound<Q, F>(&self, key: &Q, mut f: F)
    where
        Q: ?Sized,
        F: FnMut(&K, &V) -> ControlFlow<()>,
        C: Compare<Q, K>,
    {
        self.tree
            .for_each_since_upper_bound(key, |e| f(&e.key, &e.value));
    }

    pub fn for_each_since_upper_bound_mut<Q, F>(&mut self, key: &Q, mut f: F)
    where
        Q: ?Sized,
        F: FnMut(&K, &mut V) -> ControlFlow<()>,
        C: Compare<Q, K>,
    {
        self.tree
            .for_each_since_upper_bound_mut(key, |e| f(&e.key, &mut e.value));
    }
}

impl<K: fmt::Debug, V: fmt::Debug, C, I: PoolIdx> fmt::Debug for AvlMap<K, V, C, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Sorted multimap: duplicate keys are permitted and traverse in insertion
/// order.
///
/// No `filter` (see [`AvlMultiset`](crate::AvlMultiset) for the rationale).
#[derive(Clone)]
pub struct AvlMultimap<K, V, C = NaturalOrder, I: PoolIdx = u32> {
    pub(crate) tree: AvlTree<MapEntry<K, V>, C, I>,
}

impl<K, V, C: Default, I: PoolIdx> AvlMultimap<K, V, C, I> {
    pub fn new() -> Self {
        Self::with_comparator(C::default())
    }

    pub fn with_capacity(n: usize) -> Self {
        Self::with_capacity_and_comparator(n, C::default())
    }
}

impl<K, V, C: Default, I: PoolIdx> Default for AvlMultimap<K, V, C, I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, C, I: PoolIdx> AvlMultimap<K, V, C, I> {
    pub fn with_comparator(cmp: C) -> Self {
        AvlMultimap {
            tree: AvlTree::new(cmp),
        }
    }

    pub fn with_capacity_and_comparator(n: usize, cmp: C) -> Self {
        AvlMultimap {
            tree: AvlTree::with_capacity(n, cmp),
        }
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.tree.capacity()
    }

    pub fn max_capacity() -> usize {
        AvlTree::<MapEntry<K, V>, C, I>::max_capacity()
    }

    pub fn reserve_for(&mut self, n: usize) -> Result<(), PoolExhausted> {
        self.tree.reserve_for(n)
    }

    pub fn clear(&mut self) {
        self.tree.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.tree.iter().map(|e| (&e.key, &e.value))
    }

    pub fn first(&self) -> Option<(&K, &V)> {
        self.tree.first().map(|id| {
            let e = self.tree.entry(id);
            (&e.key, &e.value)
        })
    }

    pub fn last(&self) -> Option<(&K, &V)> {
        self.tree.last().map(|id| {
            let e = self.tree.entry(id);
            (&e.key, &e.value)
        })
    }

    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&K, &V) -> ControlFlow<()>,
    {
        self.tree.for_each(|e| f(&e.key, &e.value));
    }

    pub fn for_each_mut<F>(&mut self, mut f: F)
    where
        F: FnMut(&K, &mut V) -> ControlFlow<()>,
    {
        self.tree.for_each_mut(|e| f(&e.key, &mut e.value));
    }

    /// Unconditional insert; entries with equal keys coexist. Returns the
    /// new entry's value slot.
    pub fn insert(&mut self, key: K, value: V) -> Result<&mut V, PoolExhausted>
    where
        C: Compare<K>,
    {
        let id = self.tree.alloc_node(MapEntry { key, value })?;
        self.tree.insert_node(id);
        Ok(&mut self.tree.entry_mut(id).value)
    }

    /// Rewrites the key of one entry at `old` to `new` without moving its
    /// value; entries already at `new` coexist with it. Returns whether the
    /// change took place.
    pub fn alter_key<Q>(&mut self, old: &Q, new: K) -> bool
    where
        Q: ?Sized,
        C: Compare<K> + Compare<K, Q> + Compare<Q, K>,
    {
        let Some(id) = self.tree.pull_out(old) else {
            return false;
        };
        self.tree.entry_mut(id).key = new;
        self.tree.insert_node(id);
        true
    }

    /// Some value stored under `key`, if any.
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        Q: ?Sized,
        C: Compare<K, Q> + Compare<Q, K>,
    {
        self.tree.find(key).map(|id| &self.tree.entry(id).value)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        Q: ?Sized,
        C: Compare<K, Q> + Compare<Q, K>,
    {
        self.tree.find(key).is_some()
    }

    pub fn lower_bound<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        Q: ?Sized,
        C: Compare<K, Q>,
    {
        self.tree.lower_bound(key).map(|id| {
            let e = self.tree.entry(id);
            (&e.key, &e.value)
        })
    }

    pub fn upper_bound<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        Q: ?Sized,
        C: Compare<Q, K>,
    {
        self.tree.upper_bound(key).map(|id| {
            let e = self.tree.entry(id);
            (&e.key, &e.value)
        })
    }

    /// Removes one entry with key `key`; returns whether an erase occurred.
    pub fn remove<Q>(&mut self, key: &Q) -> bool
    where
        Q: ?Sized,
        C: Compare<K, Q> + Compare<Q, K>,
    {
        self.tree.erase(key)
    }

    pub fn for_each_since_lower_bound<Q, F>(&self, key: &Q, mut f: F)
    where
        Q: ?Sized,
        F: FnMut(&K, &V) -> ControlFlow<()>,
        C: Compare<K, Q>,
    {
        self.tree
            .for_each_since_lower_bound(key, |e| f(&e.key, &e.value));
    }

    pub fn for_each_since_upper_bound<Q, F>(&self, key: &Q, mut f: F)
    where
        Q: ?Sized,
        F: FnMut(&K, &V) -> ControlFlow<()>,
        C: Compare<Q, K>,
    {
        self.tree
            .for_each_since_upper_bound(key, |e| f(&e.key, &e.value));
    }
}

impl<K: fmt::Debug, V: fmt::Debug, C, I: PoolIdx> fmt::Debug for AvlMultimap<K, V, C, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs<K: Clone, V: Clone, C, I: PoolIdx>(map: &AvlMap<K, V, C, I>) -> Vec<(K, V)> {
        map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }

    #[test]
    fn insert_and_replace() {
        let mut map: AvlMap<i32, &str> = AvlMap::new();
        let (_, was_new) = map.insert(1, "one").unwrap();
        assert!(was_new);
        let (v, was_new) = map.insert(1, "uno").unwrap();
        assert!(!was_new);
        assert_eq!(*v, "uno");
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&1), Some(&"uno"));
    }

    #[test]
    fn value_mutation_keeps_order() {
        let mut map: AvlMap<String, i32> = AvlMap::new();
        map.insert("a".to_string(), 1).unwrap();
        map.insert("b".to_string(), 2).unwrap();

        *map.get_mut("a").unwrap() = 10;
        assert_eq!(
            pairs(&map),
            vec![("a".to_string(), 10), ("b".to_string(), 2)]
        );

        let (changed, replaced) = map.alter_key("a", "c".to_string());
        assert!(changed);
        assert!(!replaced);
        assert_eq!(
            pairs(&map),
            vec![("b".to_string(), 2), ("c".to_string(), 10)]
        );
    }

    #[test]
    fn get_or_insert_default_behaves_like_indexing() {
        let mut map: AvlMap<String, i32> = AvlMap::new();
        *map.get_or_insert_default("hits".to_string()).unwrap() += 1;
        *map.get_or_insert_default("hits".to_string()).unwrap() += 1;
        assert_eq!(map.get("hits"), Some(&2));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn index_mutate_then_rekey_sequence() {
        let mut map: AvlMap<String, i32> = AvlMap::new();
        map.insert("a".to_string(), 1).unwrap();
        map.insert("b".to_string(), 2).unwrap();

        // Indexing an existing key hands back its live value slot.
        let slot = map.get_or_insert_default("a".to_string()).unwrap();
        assert_eq!(*slot, 1);
        *slot = 10;
        assert_eq!(
            pairs(&map),
            vec![("a".to_string(), 10), ("b".to_string(), 2)]
        );

        assert_eq!(map.alter_key("a", "c".to_string()), (true, false));
        assert_eq!(
            pairs(&map),
            vec![("b".to_string(), 2), ("c".to_string(), 10)]
        );
    }

    #[test]
    fn alter_key_absent_is_a_noop() {
        let mut map: AvlMap<i32, i32> = AvlMap::new();
        map.insert(1, 10).unwrap();
        assert_eq!(map.alter_key(&9, 5), (false, false));
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&1), Some(&10));
    }

    #[test]
    fn alter_key_collision_discards_other_entry() {
        let mut map: AvlMap<i32, &str> = AvlMap::new();
        for k in 0..10 {
            map.insert(k, "old").unwrap();
        }
        map.insert(3, "moved").unwrap();
        let before = map.len();

        // Key 3 moves onto key 7; the entry previously at 7 is discarded and
        // the surviving value is the one that lived at 3.
        assert_eq!(map.alter_key(&3, 7), (true, true));
        assert_eq!(map.len(), before - 1);
        assert_eq!(map.get(&7), Some(&"moved"));
        assert!(!map.contains_key(&3));
    }

    #[test]
    fn remove_and_bounds() {
        let mut map: AvlMap<i32, i32> = AvlMap::new();
        for k in [10, 20, 30] {
            map.insert(k, k * 10).unwrap();
        }
        assert!(!map.remove(&15));
        assert!(map.remove(&20));
        assert_eq!(map.len(), 2);

        assert_eq!(map.first(), Some((&10, &100)));
        assert_eq!(map.last(), Some((&30, &300)));
        assert_eq!(map.lower_bound(&10), Some((&10, &100)));
        assert_eq!(map.lower_bound(&11), Some((&30, &300)));
        assert_eq!(map.upper_bound(&10), Some((&30, &300)));
        assert_eq!(map.upper_bound(&30), None);
    }

    #[test]
    fn for_each_mut_updates_values() {
        let mut map: AvlMap<i32, i32> = AvlMap::new();
        for k in 0..5 {
            map.insert(k, k).unwrap();
        }
        map.for_each_mut(|_, v| {
            *v *= 2;
            ControlFlow::Continue(())
        });
        assert_eq!(
            pairs(&map),
            vec![(0, 0), (1, 2), (2, 4), (3, 6), (4, 8)]
        );
    }

    #[test]
    fn bound_scans() {
        let mut map: AvlMap<i32, i32> = AvlMap::new();
        for k in [1, 3, 5, 7, 9] {
            map.insert(k, -k).unwrap();
        }
        let mut keys = Vec::new();
        map.for_each_since_lower_bound(&4, |&k, _| {
            keys.push(k);
            ControlFlow::Continue(())
        });
        assert_eq!(keys, vec![5, 7, 9]);

        keys.clear();
        map.for_each_since_upper_bound(&5, |&k, _| {
            keys.push(k);
            ControlFlow::Continue(())
        });
        assert_eq!(keys, vec![7, 9]);

        map.for_each_since_lower_bound_mut(&8, |_, v| {
            *v = 0;
            ControlFlow::Continue(())
        });
        assert_eq!(map.get(&9), Some(&0));
        assert_eq!(map.get(&7), Some(&-7));
    }

    #[test]
    fn filter_on_map() {
        let mut map: AvlMap<i32, i32> = AvlMap::new();
        for k in 0..20 {
            map.insert(k, k).unwrap();
        }
        map.filter(|&k, _| k % 2 == 0);
        assert_eq!(map.len(), 10);
        assert!(map.iter().all(|(k, _)| k % 2 == 1));
    }

    #[test]
    fn clone_is_deep() {
        let mut map: AvlMap<i32, String> = AvlMap::new();
        map.insert(1, "one".to_string()).unwrap();
        map.insert(2, "two".to_string()).unwrap();

        let mut copy = map.clone();
        *copy.get_mut(&1).unwrap() = "uno".to_string();
        copy.remove(&2);

        assert_eq!(map.get(&1), Some(&"one".to_string()));
        assert!(map.contains_key(&2));
        assert_eq!(copy.get(&1), Some(&"uno".to_string()));
    }

    #[test]
    fn multimap_duplicate_keys_coexist() {
        let mut mm: AvlMultimap<i32, &str> = AvlMultimap::new();
        mm.insert(1, "a").unwrap();
        mm.insert(2, "b1").unwrap();
        mm.insert(2, "b2").unwrap();
        assert_eq!(mm.len(), 3);

        let values: Vec<&str> = mm.iter().map(|(_, &v)| v).collect();
        assert_eq!(values, vec!["a", "b1", "b2"]);

        assert!(mm.remove(&2));
        assert_eq!(mm.len(), 2);
        assert!(mm.contains_key(&2));
    }

    #[test]
    fn multimap_alter_key_allows_collisions() {
        let mut mm: AvlMultimap<i32, &str> = AvlMultimap::new();
        mm.insert(1, "was-one").unwrap();
        mm.insert(2, "two").unwrap();

        assert!(mm.alter_key(&1, 2));
        assert!(!mm.alter_key(&1, 3));
        assert_eq!(mm.len(), 2);

        let at_two: Vec<&str> = mm
            .iter()
            .filter(|&(&k, _)| k == 2)
            .map(|(_, &v)| v)
            .collect();
        assert_eq!(at_two.len(), 2);
        assert!(at_two.contains(&"two"));
        assert!(at_two.contains(&"was-one"));
    }

    #[test]
    fn debug_formats_as_map() {
        let mut map: AvlMap<i32, i32> = AvlMap::new();
        map.insert(2, 20).unwrap();
        map.insert(1, 10).unwrap();
        assert_eq!(format!("{map:?}"), "{1: 10, 2: 20}");
    }
}
