//! The AVL dictionary engine.
//!
//! One generic ordered-map algorithm operating purely on pool handles,
//! parameterized by the entry kind and a comparator. The concrete containers
//! in `set` and `map` are thin adapters over this type; nothing above them
//! ever sees a handle.
//!
//! Insert, erase and traversal recurse along the search path; depth is
//! bounded by the tree height, which the AVL invariant keeps at roughly
//! `1.44 * log2(len + 1)`, so even a `usize`-indexed tree stays well inside
//! any realistic call stack.

use std::ops::ControlFlow;

use crate::cmp::Compare;
use crate::node::{Entry, Node, L, R};
use crate::pool::{Pool, PoolExhausted, PoolIdx};

pub(crate) struct AvlTree<E: Entry, C, I: PoolIdx> {
    pub(crate) pool: Pool<Node<E, I>, I>,
    pub(crate) root: I,
    pub(crate) len: usize,
    pub(crate) cmp: C,
}

impl<E: Entry + Clone, C: Clone, I: PoolIdx> Clone for AvlTree<E, C, I> {
    fn clone(&self) -> Self {
        AvlTree {
            pool: self.pool.clone(),
            root: self.root,
            len: self.len,
            cmp: self.cmp.clone(),
        }
    }
}

impl<E: Entry, C, I: PoolIdx> AvlTree<E, C, I> {
    pub(crate) fn new(cmp: C) -> Self {
        Self::with_capacity(1, cmp)
    }

    pub(crate) fn with_capacity(n: usize, cmp: C) -> Self {
        AvlTree {
            pool: Pool::with_capacity(n),
            root: I::nil(),
            len: 0,
            cmp,
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.pool.capacity()
    }

    #[inline]
    pub(crate) fn max_capacity() -> usize {
        Pool::<Node<E, I>, I>::max_capacity()
    }

    pub(crate) fn reserve_for(&mut self, n: usize) -> Result<(), PoolExhausted> {
        self.pool.reserve_for(n)
    }

    /// Drops every entry and rethreads the whole free list.
    pub(crate) fn clear(&mut self) {
        self.pool.free_all();
        self.root = I::nil();
        self.len = 0;
    }

    #[inline]
    pub(crate) fn entry(&self, x: I) -> &E {
        &self.pool.get(x).entry
    }

    #[inline]
    pub(crate) fn entry_mut(&mut self, x: I) -> &mut E {
        &mut self.pool.get_mut(x).entry
    }

    #[inline]
    fn node(&self, x: I) -> &Node<E, I> {
        self.pool.get(x)
    }

    #[inline]
    fn node_mut(&mut self, x: I) -> &mut Node<E, I> {
        self.pool.get_mut(x)
    }

    #[inline]
    pub(crate) fn height(&self, x: I) -> u8 {
        if x.is_nil() {
            0
        } else {
            self.node(x).height
        }
    }

    pub(crate) fn alloc_node(&mut self, entry: E) -> Result<I, PoolExhausted> {
        let id = self.pool.allocate(Node::leaf(entry))?;
        self.len += 1;
        Ok(id)
    }

    pub(crate) fn dealloc_node(&mut self, x: I) {
        self.pool.free(x);
        self.len -= 1;
    }

    // ------------------------------------------------------------------
    // Rebalancing
    // ------------------------------------------------------------------

    fn seth(&mut self, x: I) {
        let h = 1 + self
            .height(self.node(x).kid[L])
            .max(self.height(self.node(x).kid[R]));
        self.node_mut(x).height = h;
    }

    /// Rotates `x`'s subtree toward `dir`, returning the new subtree root.
    /// Rotating nil up is invalid.
    fn rotate(&mut self, x: I, dir: usize) -> I {
        let revdir = dir ^ 1;
        let res = self.node(x).kid[revdir];
        let transferred = self.node(res).kid[dir];
        self.node_mut(x).kid[revdir] = transferred;
        self.node_mut(res).kid[dir] = x;
        self.seth(x);
        res
    }

    fn rotate_and_seth(&mut self, x: I, dir: usize) -> I {
        let res = self.rotate(x, dir);
        self.seth(res);
        res
    }

    /// Recomputes `x`'s height and repairs a ±2 imbalance, returning the new
    /// subtree root. Tie-break: when the heavy child leans opposite to the
    /// imbalance, rotate that child's inner grandchild up first (the LR/RL
    /// double rotation); otherwise a single rotation suffices (LL/RR).
    fn rebalance_and_seth(&mut self, x: I) -> I {
        let hl = self.height(self.node(x).kid[L]) as i32;
        let hr = self.height(self.node(x).kid[R]) as i32;
        let b = (hl - hr) / 2; // nonzero only when the difference is exactly ±2
        if b != 0 {
            let dir = ((b + 1) >> 1) as usize;
            let revdir = dir ^ 1;
            let heavy = self.node(x).kid[revdir];
            let heavy_l = self.height(self.node(heavy).kid[L]) as i32;
            let heavy_r = self.height(self.node(heavy).kid[R]) as i32;
            if heavy_r - heavy_l == b {
                let inner = self.node(heavy).kid[dir];
                let inner_dir = self.node(inner).kid[dir];
                let inner_rev = self.node(inner).kid[revdir];
                self.node_mut(x).kid[revdir] = inner_dir;
                self.seth(x);
                self.node_mut(heavy).kid[dir] = inner_rev;
                self.seth(heavy);
                self.node_mut(inner).kid[dir] = x;
                self.node_mut(inner).kid[revdir] = heavy;
                self.seth(inner);
                return inner;
            }
            return self.rotate_and_seth(x, dir);
        }
        self.seth(x);
        x
    }

    // ------------------------------------------------------------------
    // Insert family
    // ------------------------------------------------------------------

    #[inline]
    fn node_less_node(&self, a: I, b: I) -> bool
    where
        C: Compare<E::Key>,
    {
        self.cmp.less(self.node(a).entry.key(), self.node(b).entry.key())
    }

    #[inline]
    fn node_less_key<Q: ?Sized>(&self, x: I, key: &Q) -> bool
    where
        C: Compare<E::Key, Q>,
    {
        self.cmp.less(self.node(x).entry.key(), key)
    }

    #[inline]
    fn key_less_node<Q: ?Sized>(&self, key: &Q, x: I) -> bool
    where
        C: Compare<Q, E::Key>,
    {
        self.cmp.less(key, self.node(x).entry.key())
    }

    /// Unconditional insert of a detached node; duplicate keys descend right
    /// so equal elements traverse in insertion order.
    pub(crate) fn insert_node(&mut self, inserted: I)
    where
        C: Compare<E::Key>,
    {
        self.root = self.insert_at(self.root, inserted);
    }

    fn insert_at(&mut self, x: I, inserted: I) -> I
    where
        C: Compare<E::Key>,
    {
        if x.is_nil() {
            return inserted;
        }
        let dir = if self.node_less_node(inserted, x) { L } else { R };
        let child = self.node(x).kid[dir];
        let new_child = self.insert_at(child, inserted);
        self.node_mut(x).kid[dir] = new_child;
        self.rebalance_and_seth(x)
    }

    /// Returns `inserted` if the insertion took place, the handle of the
    /// existing equal node otherwise (the caller must dispose the unused
    /// node in that case).
    pub(crate) fn insert_if_not_exists(&mut self, inserted: I) -> I
    where
        C: Compare<E::Key>,
    {
        let (new_root, res) = self.insert_if_not_exists_at(self.root, inserted);
        self.root = new_root;
        res
    }

    fn insert_if_not_exists_at(&mut self, x: I, inserted: I) -> (I, I)
    where
        C: Compare<E::Key>,
    {
        if x.is_nil() {
            return (inserted, inserted);
        }
        let dir = self.node_less_node(x, inserted) as usize;
        if dir == L && !self.node_less_node(inserted, x) {
            return (x, x);
        }
        let child = self.node(x).kid[dir];
        let (new_child, res) = self.insert_if_not_exists_at(child, inserted);
        self.node_mut(x).kid[dir] = new_child;
        (self.rebalance_and_seth(x), res)
    }

    /// Inserts a detached node, splicing it into the tree position of an
    /// existing equal node if there is one (which is then freed). Returns
    /// whether the key was new.
    pub(crate) fn insert_or_replace(&mut self, inserted: I) -> bool
    where
        C: Compare<E::Key>,
    {
        let (new_root, was_new) = self.insert_or_replace_at(self.root, inserted);
        self.root = new_root;
        was_new
    }

    fn insert_or_replace_at(&mut self, x: I, inserted: I) -> (I, bool)
    where
        C: Compare<E::Key>,
    {
        if x.is_nil() {
            return (inserted, true);
        }
        let dir = self.node_less_node(x, inserted) as usize;
        if dir == L && !self.node_less_node(inserted, x) {
            // Take over the replaced node's links and height wholesale.
            let kid = self.node(x).kid;
            let height = self.node(x).height;
            let n = self.node_mut(inserted);
            n.kid = kid;
            n.height = height;
            self.dealloc_node(x);
            return (inserted, false);
        }
        let child = self.node(x).kid[dir];
        let (new_child, was_new) = self.insert_or_replace_at(child, inserted);
        self.node_mut(x).kid[dir] = new_child;
        (self.rebalance_and_seth(x), was_new)
    }

    /// Finds the node with `key`, or constructs an entry with `make` and
    /// inserts it at the nil leaf the search ended at. Construction happens
    /// only on the no-duplicate path, so a wasted build never occurs.
    pub(crate) fn emplace_if_not_exists<F>(
        &mut self,
        key: E::Key,
        make: F,
    ) -> Result<I, PoolExhausted>
    where
        F: FnOnce(E::Key) -> E,
        C: Compare<E::Key>,
    {
        let (new_root, res) = self.emplace_at(self.root, key, make)?;
        self.root = new_root;
        Ok(res)
    }

    fn emplace_at<F>(&mut self, x: I, key: E::Key, make: F) -> Result<(I, I), PoolExhausted>
    where
        F: FnOnce(E::Key) -> E,
        C: Compare<E::Key>,
    {
        if x.is_nil() {
            let id = self.alloc_node(make(key))?;
            return Ok((id, id));
        }
        let dir = self.node_less_key(x, &key) as usize;
        if dir == L && !self.key_less_node(&key, x) {
            return Ok((x, x));
        }
        let child = self.node(x).kid[dir];
        let (new_child, res) = self.emplace_at(child, key, make)?;
        self.node_mut(x).kid[dir] = new_child;
        Ok((self.rebalance_and_seth(x), res))
    }

    // ------------------------------------------------------------------
    // Erase / pull-out
    // ------------------------------------------------------------------

    /// Detaches the rightmost node of `x`'s subtree. Returns the subtree's
    /// new root and the detached handle.
    fn pull_out_rightmost(&mut self, x: I) -> (I, I) {
        let right = self.node(x).kid[R];
        if right.is_nil() {
            return (self.node(x).kid[L], x);
        }
        let (new_right, pulled) = self.pull_out_rightmost(right);
        self.node_mut(x).kid[R] = new_right;
        (self.rebalance_and_seth(x), pulled)
    }

    /// Shared skeleton of `erase` and `pull_out`: locates `key`, unlinks the
    /// matched node by splicing its in-order predecessor into its position
    /// (no payload is moved), and applies `on_found` to the unlinked handle.
    /// Every ancestor on the search path is rebalanced on the way back up.
    fn erase_at<Q, Ret, F>(&mut self, x: I, key: &Q, on_found: F) -> (I, Option<Ret>)
    where
        Q: ?Sized,
        F: FnOnce(&mut Self, I) -> Ret,
        C: Compare<E::Key, Q> + Compare<Q, E::Key>,
    {
        if x.is_nil() {
            return (x, None);
        }
        let dir = self.node_less_key(x, key) as usize;
        if dir == L && !self.key_less_node(key, x) {
            let left = self.node(x).kid[L];
            if left.is_nil() {
                let right = self.node(x).kid[R];
                let res = on_found(self, x);
                let new_x = if right.is_nil() {
                    right
                } else {
                    self.rebalance_and_seth(right)
                };
                return (new_x, Some(res));
            }
            let (new_left, pulled) = self.pull_out_rightmost(left);
            self.node_mut(pulled).kid[L] = new_left;
            let x_right = self.node(x).kid[R];
            self.node_mut(pulled).kid[R] = x_right;
            let res = on_found(self, x);
            return (self.rebalance_and_seth(pulled), Some(res));
        }
        let child = self.node(x).kid[dir];
        let (new_child, res) = self.erase_at(child, key, on_found);
        self.node_mut(x).kid[dir] = new_child;
        (self.rebalance_and_seth(x), res)
    }

    /// Returns whether an erase took place.
    pub(crate) fn erase<Q>(&mut self, key: &Q) -> bool
    where
        Q: ?Sized,
        C: Compare<E::Key, Q> + Compare<Q, E::Key>,
    {
        let (new_root, res) = self.erase_at(self.root, key, |tree, id| {
            tree.dealloc_node(id);
        });
        self.root = new_root;
        res.is_some()
    }

    /// Erase variant that keeps the matched node alive: detaches it, resets
    /// it to a fresh leaf and returns its handle. Used to alter a map key
    /// in place without an allocation.
    pub(crate) fn pull_out<Q>(&mut self, key: &Q) -> Option<I>
    where
        Q: ?Sized,
        C: Compare<E::Key, Q> + Compare<Q, E::Key>,
    {
        let (new_root, res) = self.erase_at(self.root, key, |tree, id| {
            let n = tree.node_mut(id);
            n.kid = [I::nil(), I::nil()];
            n.height = 1;
            id
        });
        self.root = new_root;
        res
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub(crate) fn find<Q>(&self, key: &Q) -> Option<I>
    where
        Q: ?Sized,
        C: Compare<E::Key, Q> + Compare<Q, E::Key>,
    {
        let mut x = self.root;
        while !x.is_nil() {
            if self.node_less_key(x, key) {
                x = self.node(x).kid[R];
            } else if self.key_less_node(key, x) {
                x = self.node(x).kid[L];
            } else {
                return Some(x);
            }
        }
        None
    }

    /// First node not less than `key`.
    pub(crate) fn lower_bound<Q>(&self, key: &Q) -> Option<I>
    where
        Q: ?Sized,
        C: Compare<E::Key, Q>,
    {
        let mut res = None;
        let mut x = self.root;
        while !x.is_nil() {
            if self.node_less_key(x, key) {
                x = self.node(x).kid[R];
            } else {
                res = Some(x);
                x = self.node(x).kid[L];
            }
        }
        res
    }

    /// First node strictly greater than `key`.
    pub(crate) fn upper_bound<Q>(&self, key: &Q) -> Option<I>
    where
        Q: ?Sized,
        C: Compare<Q, E::Key>,
    {
        let mut res = None;
        let mut x = self.root;
        while !x.is_nil() {
            if self.key_less_node(key, x) {
                res = Some(x);
                x = self.node(x).kid[L];
            } else {
                x = self.node(x).kid[R];
            }
        }
        res
    }

    fn dirmost(&self, dir: usize) -> Option<I> {
        let mut x = self.root;
        if x.is_nil() {
            return None;
        }
        loop {
            let next = self.node(x).kid[dir];
            if next.is_nil() {
                return Some(x);
            }
            x = next;
        }
    }

    pub(crate) fn first(&self) -> Option<I> {
        self.dirmost(L)
    }

    pub(crate) fn last(&self) -> Option<I> {
        self.dirmost(R)
    }

    // ------------------------------------------------------------------
    // Traversal
    // ------------------------------------------------------------------
    //
    // In-order visitation with early stop via `ControlFlow`. Callbacks must
    // not mutate tree structure; traversal holds the tree's borrow for its
    // whole duration, so the borrow checker rules that out. Bulk conditional
    // removal goes through `filter` instead.

    pub(crate) fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&E) -> ControlFlow<()>,
    {
        let _ = self.for_each_at(self.root, &mut f);
    }

    fn for_each_at<F>(&self, x: I, f: &mut F) -> ControlFlow<()>
    where
        F: FnMut(&E) -> ControlFlow<()>,
    {
        if x.is_nil() {
            return ControlFlow::Continue(());
        }
        self.for_each_at(self.node(x).kid[L], f)?;
        f(self.entry(x))?;
        self.for_each_at(self.node(x).kid[R], f)
    }

    pub(crate) fn for_each_mut<F>(&mut self, mut f: F)
    where
        F: FnMut(&mut E) -> ControlFlow<()>,
    {
        let _ = self.for_each_at_mut(self.root, &mut f);
    }

    fn for_each_at_mut<F>(&mut self, x: I, f: &mut F) -> ControlFlow<()>
    where
        F: FnMut(&mut E) -> ControlFlow<()>,
    {
        if x.is_nil() {
            return ControlFlow::Continue(());
        }
        self.for_each_at_mut(self.node(x).kid[L], f)?;
        f(self.entry_mut(x))?;
        self.for_each_at_mut(self.node(x).kid[R], f)
    }

    /// In-order visitation starting at the first entry `>= key`.
    pub(crate) fn for_each_since_lower_bound<Q, F>(&self, key: &Q, mut f: F)
    where
        Q: ?Sized,
        F: FnMut(&E) -> ControlFlow<()>,
        C: Compare<E::Key, Q>,
    {
        let _ = self.since_lower_bound_at(self.root, key, &mut f);
    }

    fn since_lower_bound_at<Q, F>(&self, x: I, key: &Q, f: &mut F) -> ControlFlow<()>
    where
        Q: ?Sized,
        F: FnMut(&E) -> ControlFlow<()>,
        C: Compare<E::Key, Q>,
    {
        if x.is_nil() {
            return ControlFlow::Continue(());
        }
        if self.node_less_key(x, key) {
            self.since_lower_bound_at(self.node(x).kid[R], key, f)
        } else {
            self.since_lower_bound_at(self.node(x).kid[L], key, f)?;
            f(self.entry(x))?;
            self.for_each_at(self.node(x).kid[R], f)
        }
    }

    /// In-order visitation starting at the first entry `> key`.
    pub(crate) fn for_each_since_upper_bound<Q, F>(&self, key: &Q, mut f: F)
    where
        Q: ?Sized,
        F: FnMut(&E) -> ControlFlow<()>,
        C: Compare<Q, E::Key>,
    {
        let _ = self.since_upper_bound_at(self.root, key, &mut f);
    }

    fn since_upper_bound_at<Q, F>(&self, x: I, key: &Q, f: &mut F) -> ControlFlow<()>
    where
        Q: ?Sized,
        F: FnMut(&E) -> ControlFlow<()>,
        C: Compare<Q, E::Key>,
    {
        if x.is_nil() {
            return ControlFlow::Continue(());
        }
        if self.key_less_node(key, x) {
            self.since_upper_bound_at(self.node(x).kid[L], key, f)?;
            f(self.entry(x))?;
            self.for_each_at(self.node(x).kid[R], f)
        } else {
            self.since_upper_bound_at(self.node(x).kid[R], key, f)
        }
    }

    pub(crate) fn for_each_since_lower_bound_mut<Q, F>(&mut self, key: &Q, mut f: F)
    where
        Q: ?Sized,
        F: FnMut(&mut E) -> ControlFlow<()>,
        C: Compare<E::Key, Q>,
    {
        let _ = self.since_lower_bound_at_mut(self.root, key, &mut f);
    }

    fn since_lower_bound_at_mut<Q, F>(&mut self, x: I, key: &Q, f: &mut F) -> ControlFlow<()>
    where
        Q: ?Sized,
        F: FnMut(&mut E) -> ControlFlow<()>,
        C: Compare<E::Key, Q>,
    {
        if x.is_nil() {
            return ControlFlow::Continue(());
        }
        if self.node_less_key(x, key) {
            self.since_lower_bound_at_mut(self.node(x).kid[R], key, f)
        } else {
            self.since_lower_bound_at_mut(self.node(x).kid[L], key, f)?;
            f(self.entry_mut(x))?;
            self.for_each_at_mut(self.node(x).kid[R], f)
        }
    }

    pub(crate) fn for_each_since_upper_bound_mut<Q, F>(&mut self, key: &Q, mut f: F)
    where
        Q: ?Sized,
        F: FnMut(&mut E) -> ControlFlow<()>,
        C: Compare<Q, E::Key>,
    {
        let _ = self.since_upper_bound_at_mut(self.root, key, &mut f);
    }

    fn since_upper_bound_at_mut<Q, F>(&mut self, x: I, key: &Q, f: &mut F) -> ControlFlow<()>
    where
        Q: ?Sized,
        F: FnMut(&mut E) -> ControlFlow<()>,
        C: Compare<Q, E::Key>,
    {
        if x.is_nil() {
            return ControlFlow::Continue(());
        }
        if self.key_less_node(key, x) {
            self.since_upper_bound_at_mut(self.node(x).kid[L], key, f)?;
            f(self.entry_mut(x))?;
            self.for_each_at_mut(self.node(x).kid[R], f)
        } else {
            self.since_upper_bound_at_mut(self.node(x).kid[R], key, f)
        }
    }

    // ------------------------------------------------------------------
    // Filter
    // ------------------------------------------------------------------

    /// Removes every entry for which `pred` returns true.
    ///
    /// Mutating the tree from inside an in-flight traversal is forbidden, so
    /// removal is staged: scan in order until the first match, remember its
    /// key, stop the scan, erase that key, then resume scanning from the
    /// first entry strictly greater than it. O(n + k log n) for k removals.
    ///
    /// Not offered for the multi-containers: resuming past the removed key
    /// would skip entries that compare equal to it.
    pub(crate) fn filter<P>(&mut self, mut pred: P)
    where
        P: FnMut(&E) -> bool,
        E::Key: Clone,
        C: Compare<E::Key>,
    {
        let mut resume_after: Option<E::Key> = None;
        loop {
            let mut victim: Option<E::Key> = None;
            let scan = |e: &E| {
                if pred(e) {
                    victim = Some(e.key().clone());
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            };
            match &resume_after {
                None => self.for_each(scan),
                Some(key) => self.for_each_since_upper_bound(key, scan),
            }
            let Some(key) = victim else {
                return;
            };
            self.erase(&key);
            resume_after = Some(key);
        }
    }

    // ------------------------------------------------------------------
    // Iteration
    // ------------------------------------------------------------------

    /// Borrowing in-order iterator (explicit stack, no recursion).
    pub(crate) fn iter(&self) -> Iter<'_, E, C, I> {
        let mut iter = Iter {
            tree: self,
            stack: Vec::new(),
        };
        iter.push_left_spine(self.root);
        iter
    }
}

pub(crate) struct Iter<'a, E: Entry, C, I: PoolIdx> {
    tree: &'a AvlTree<E, C, I>,
    stack: Vec<I>,
}

impl<'a, E: Entry, C, I: PoolIdx> Iter<'a, E, C, I> {
    fn push_left_spine(&mut self, mut x: I) {
        while !x.is_nil() {
            self.stack.push(x);
            x = self.tree.node(x).kid[L];
        }
    }
}

impl<'a, E: Entry, C, I: PoolIdx> Iterator for Iter<'a, E, C, I> {
    type Item = &'a E;

    fn next(&mut self) -> Option<Self::Item> {
        let x = self.stack.pop()?;
        self.push_left_spine(self.tree.node(x).kid[R]);
        Some(self.tree.entry(x))
    }
}
