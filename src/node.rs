//! Node model: the per-slot record stored in the pool.
//!
//! A node is two child handles, a height byte and an entry. Heights count
//! nodes: nil is 0, a leaf is 1, and every live node's height is one more
//! than its taller child's. The entry is the per-container payload kind,
//! abstracted by [`Entry`] so one tree engine serves sets and maps alike.

use crate::pool::PoolIdx;

pub(crate) const L: usize = 0;
pub(crate) const R: usize = 1;

/// Payload of a tree node: anything with an orderable key accessor.
pub(crate) trait Entry {
    type Key;

    fn key(&self) -> &Self::Key;
}

#[derive(Clone, Debug)]
pub(crate) struct Node<E, I> {
    /// Child handles, `[left, right]`. Nil means no child.
    pub(crate) kid: [I; 2],
    pub(crate) height: u8,
    pub(crate) entry: E,
}

impl<E, I: PoolIdx> Node<E, I> {
    /// A fresh detached leaf.
    pub(crate) fn leaf(entry: E) -> Self {
        Node {
            kid: [I::nil(), I::nil()],
            height: 1,
            entry,
        }
    }
}

/// Set payload: the key is the whole element, read-only once inserted.
#[derive(Clone, Debug)]
pub(crate) struct SetEntry<T>(pub(crate) T);

impl<T> Entry for SetEntry<T> {
    type Key = T;

    #[inline]
    fn key(&self) -> &T {
        &self.0
    }
}

/// Map payload: immutable key plus freely mutable value.
///
/// The two fields replace the original design's aliased mutable/immutable
/// pair views; value mutation never touches the key, so it never requires
/// re-sorting. The key field itself is only written by the engine's pull-out
/// based key alteration, while the node is detached from the tree.
#[derive(Clone, Debug)]
pub(crate) struct MapEntry<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
}

impl<K, V> Entry for MapEntry<K, V> {
    type Key = K;

    #[inline]
    fn key(&self) -> &K {
        &self.key
    }
}
