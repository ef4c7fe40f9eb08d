//! Sorted sets: unique-key [`AvlSet`] and duplicate-friendly [`AvlMultiset`].

use std::fmt;
use std::ops::ControlFlow;

use crate::cmp::{Compare, NaturalOrder};
use crate::node::SetEntry;
use crate::pool::{PoolExhausted, PoolIdx};
use crate::tree::AvlTree;

/// Sorted set of unique elements, stored in an index-addressed node pool.
///
/// Ordering comes from the comparator `C` (by default the element type's own
/// `PartialOrd`); `I` is the pool's index type and bounds the maximum
/// capacity.
///
/// ```
/// use avl_arena::AvlSet;
///
/// let mut set: AvlSet<i32> = AvlSet::new();
/// assert!(set.insert(3).unwrap());
/// assert!(set.insert(1).unwrap());
/// assert!(!set.insert(3).unwrap());
/// assert_eq!(set.iter().copied().collect::<Vec<_>>(), vec![1, 3]);
/// ```
#[derive(Clone)]
pub struct AvlSet<T, C = NaturalOrder, I: PoolIdx = u32> {
    pub(crate) tree: AvlTree<SetEntry<T>, C, I>,
}

impl<T, C: Default, I: PoolIdx> AvlSet<T, C, I> {
    pub fn new() -> Self {
        Self::with_comparator(C::default())
    }

    /// A set with `n` slots pre-grown (slot 0 is the nil sentinel).
    pub fn with_capacity(n: usize) -> Self {
        Self::with_capacity_and_comparator(n, C::default())
    }
}

impl<T, C: Default, I: PoolIdx> Default for AvlSet<T, C, I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, C, I: PoolIdx> AvlSet<T, C, I> {
    pub fn with_comparator(cmp: C) -> Self {
        AvlSet {
            tree: AvlTree::new(cmp),
        }
    }

    pub fn with_capacity_and_comparator(n: usize, cmp: C) -> Self {
        AvlSet {
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
        AvlTree::<SetEntry<T>, C, I>::max_capacity()
    }

    /// Pre-grows the pool to at least `n` slots; element handles and order
    /// are unaffected.
    pub fn reserve_for(&mut self, n: usize) -> Result<(), PoolExhausted> {
        self.tree.reserve_for(n)
    }

    /// Removes every element. Capacity is retained.
    pub fn clear(&mut self) {
        self.tree.clear();
    }

    /// In-order iterator over the elements.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.tree.iter().map(|e| &e.0)
    }

    /// Smallest element.
    pub fn first(&self) -> Option<&T> {
        self.tree.first().map(|id| &self.tree.entry(id).0)
    }

    /// Largest element.
    pub fn last(&self) -> Option<&T> {
        self.tree.last().map(|id| &self.tree.entry(id).0)
    }

    /// Calls `f` on every element in order until it breaks.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&T) -> ControlFlow<()>,
    {
        self.tree.for_each(|e| f(&e.0));
    }
}

impl<T, C, I: PoolIdx> AvlSet<T, C, I>
where
    C: Compare<T>,
{
    /// Inserts `value`; returns whether the insertion took place (false if an
    /// equal element was already present, in which case `value` is dropped).
    pub fn insert(&mut self, value: T) -> Result<bool, PoolExhausted> {
        let id = self.tree.alloc_node(SetEntry(value))?;
        let found = self.tree.insert_if_not_exists(id);
        if found != id {
            self.tree.dealloc_node(id);
            return Ok(false);
        }
        Ok(true)
    }

    /// Removes every element for which `pred` returns true, preserving the
    /// order of survivors. O(n + k log n) for k removals.
    pub fn filter<P>(&mut self, mut pred: P)
    where
        P: FnMut(&T) -> bool,
        T: Clone,
    {
        self.tree.filter(|e| pred(&e.0));
    }
}

impl<T, C, I: PoolIdx> AvlSet<T, C, I> {
    pub fn get<Q>(&self, key: &Q) -> Option<&T>
    where
        Q: ?Sized,
        C: Compare<T, Q> + Compare<Q, T>,
    {
        self.tree.find(key).map(|id| &self.tree.entry(id).0)
    }

    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        Q: ?Sized,
        C: Compare<T, Q> + Compare<Q, T>,
    {
        self.tree.find(key).is_some()
    }

    /// Smallest element not less than `key`.
    pub fn lower_bound<Q>(&self, key: &Q) -> Option<&T>
    where
        Q: ?Sized,
        C: Compare<T, Q>,
    {
        self.tree.lower_bound(key).map(|id| &self.tree.entry(id).0)
    }

    /// Smallest element strictly greater than `key`.
    pub fn upper_bound<Q>(&self, key: &Q) -> Option<&T>
    where
        Q: ?Sized,
        C: Compare<Q, T>,
    {
        self.tree.upper_bound(key).map(|id| &self.tree.entry(id).0)
    }

    /// Removes the element equal to `key`; returns whether an erase occurred.
    pub fn remove<Q>(&mut self, key: &Q) -> bool
    where
        Q: ?Sized,
        C: Compare<T, Q> + Compare<Q, T>,
    {
        self.tree.erase(key)
    }

    /// Calls `f` on every element `>= key`, in order, until it breaks.
    pub fn for_each_since_lower_bound<Q, F>(&self, key: &Q, mut f: F)
    where
        Q: ?Sized,
        F: FnMut(&T) -> ControlFlow<()>,
        C: Compare<T, Q>,
    {
        self.tree.for_each_since_lower_bound(key, |e| f(&e.0));
    }

    /// Calls `f` on every element `> key`, in order, until it breaks.
    pub fn for_each_since_upper_bound<Q, F>(&self, key: &Q, mut f: F)
    where
        Q: ?Sized,
        F: FnMut(&T) -> ControlFlow<()>,
        C: Compare<Q, T>,
    {
        self.tree.for_each_since_upper_bound(key, |e| f(&e.0));
    }
}

impl<T: fmt::Debug, C, I: PoolIdx> fmt::Debug for AvlSet<T, C, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Sorted multiset: like [`AvlSet`] but duplicate elements are permitted and
/// traverse in insertion order.
///
/// No `filter`: its erase-then-resume protocol skips elements comparing equal
/// to a removed key, which is ambiguous under duplicates.
#[derive(Clone)]
pub struct AvlMultiset<T, C = NaturalOrder, I: PoolIdx = u32> {
    pub(crate) tree: AvlTree<SetEntry<T>, C, I>,
}

impl<T, C: Default, I: PoolIdx> AvlMultiset<T, C, I> {
    pub fn new() -> Self {
        Self::with_comparator(C::default())
    }

    pub fn with_capacity(n: usize) -> Self {
        Self::with_capacity_and_comparator(n, C::default())
    }
}

impl<T, C: Default, I: PoolIdx> Default for AvlMultiset<T, C, I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, C, I: PoolIdx> AvlMultiset<T, C, I> {
    pub fn with_comparator(cmp: C) -> Self {
        AvlMultiset {
            tree: AvlTree::new(cmp),
        }
    }

    pub fn with_capacity_and_comparator(n: usize, cmp: C) -> Self {
        AvlMultiset {
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
        AvlTree::<SetEntry<T>, C, I>::max_capacity()
    }

    pub fn reserve_for(&mut self, n: usize) -> Result<(), PoolExhausted> {
        self.tree.reserve_for(n)
    }

    pub fn clear(&mut self) {
        self.tree.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.tree.iter().map(|e| &e.0)
    }

    pub fn first(&self) -> Option<&T> {
        self.tree.first().map(|id| &self.tree.entry(id).0)
    }

    pub fn last(&self) -> Option<&T> {
        self.tree.last().map(|id| &self.tree.entry(id).0)
    }

    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&T) -> ControlFlow<()>,
    {
        self.tree.for_each(|e| f(&e.0));
    }

    /// Unconditional insert; duplicates coexist.
    pub fn insert(&mut self, value: T) -> Result<(), PoolExhausted>
    where
        C: Compare<T>,
    {
        let id = self.tree.alloc_node(SetEntry(value))?;
        self.tree.insert_node(id);
        Ok(())
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&T>
    where
        Q: ?Sized,
        C: Compare<T, Q> + Compare<Q, T>,
    {
        self.tree.find(key).map(|id| &self.tree.entry(id).0)
    }

    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        Q: ?Sized,
        C: Compare<T, Q> + Compare<Q, T>,
    {
        self.tree.find(key).is_some()
    }

    pub fn lower_bound<Q>(&self, key: &Q) -> Option<&T>
    where
        Q: ?Sized,
        C: Compare<T, Q>,
    {
        self.tree.lower_bound(key).map(|id| &self.tree.entry(id).0)
    }

    pub fn upper_bound<Q>(&self, key: &Q) -> Option<&T>
    where
        Q: ?Sized,
        C: Compare<Q, T>,
    {
        self.tree.upper_bound(key).map(|id| &self.tree.entry(id).0)
    }

    /// Removes one element equal to `key`; returns whether an erase occurred.
    pub fn remove<Q>(&mut self, key: &Q) -> bool
    where
        Q: ?Sized,
        C: Compare<T, Q> + Compare<Q, T>,
    {
        self.tree.erase(key)
    }

    pub fn for_each_since_lower_bound<Q, F>(&self, key: &Q, mut f: F)
    where
        Q: ?Sized,
        F: FnMut(&T) -> ControlFlow<()>,
        C: Compare<T, Q>,
    {
        self.tree.for_each_since_lower_bound(key, |e| f(&e.0));
    }

    pub fn for_each_since_upper_bound<Q, F>(&self, key: &Q, mut f: F)
    where
        Q: ?Sized,
        F: FnMut(&T) -> ControlFlow<()>,
        C: Compare<Q, T>,
    {
        self.tree.for_each_since_upper_bound(key, |e| f(&e.0));
    }
}

impl<T: fmt::Debug, C, I: PoolIdx> fmt::Debug for AvlMultiset<T, C, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}
