//! Growable slot pool with an intrusive free list.
//!
//! Nodes live in a `Vec` of fixed-size slots addressed by integer handles
//! instead of pointers, so handles stay valid across backing reallocation.
//! Unoccupied slots are threaded into a singly linked free list for O(1)
//! reuse; the list is encoded the same way throughout: a vacant slot stores
//! the index of the next vacant slot, and `next == capacity` terminates the
//! list. Slot 0 is permanently reserved for the nil sentinel and is never
//! handed out.

use std::mem;

use thiserror::Error;

/// The pool's index type has no representable value left for a new slot.
///
/// The single fatal error of this crate: raised only when an allocation is
/// requested while the pool already holds `max_capacity()` slots. The
/// structure that triggered it remains valid and unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("node pool exhausted: index type cannot address more than {max} slots")]
pub struct PoolExhausted {
    /// Maximum slot count addressable by the pool's index type.
    pub max: usize,
}

/// Integer handle type for pool slots.
///
/// Implemented for `u8`, `u16`, `u32` and `usize`. The choice bounds the
/// pool's maximum capacity (`MAX` slots); `u32` is the containers' default.
/// Index 0 is always the nil sentinel.
pub trait PoolIdx: Copy + Eq + std::fmt::Debug {
    /// Maximum index value representable, which is also the maximum capacity.
    const MAX: usize;

    fn from_usize(i: usize) -> Self;
    fn to_usize(self) -> usize;

    /// The nil handle.
    #[inline]
    fn nil() -> Self {
        Self::from_usize(0)
    }

    #[inline]
    fn is_nil(self) -> bool {
        self.to_usize() == 0
    }
}

macro_rules! impl_pool_idx {
    ($($t:ty),*) => {$(
        impl PoolIdx for $t {
            const MAX: usize = <$t>::MAX as usize;

            #[inline]
            fn from_usize(i: usize) -> Self {
                // `Self::MAX` alone would resolve to the primitive's inherent
                // constant, which is not a usize.
                debug_assert!(i <= <Self as PoolIdx>::MAX);
                i as $t
            }

            #[inline]
            fn to_usize(self) -> usize {
                self as usize
            }
        }
    )*};
}

impl_pool_idx!(u8, u16, u32, usize);

#[derive(Clone, Debug)]
enum Slot<N, I> {
    /// Permanent sentinel at index 0. Never constructed elsewhere, never freed.
    Nil,
    /// Free slot holding the next free index.
    Vacant { next: I },
    /// Live node.
    Occupied(N),
}

/// Growable slot pool. `head == len` encodes an empty free list.
#[derive(Clone, Debug)]
pub(crate) struct Pool<N, I: PoolIdx> {
    slots: Vec<Slot<N, I>>,
    head: I,
}

impl<N, I: PoolIdx> Pool<N, I> {
    pub(crate) fn new() -> Self {
        Self::with_capacity(1)
    }

    /// A pool with `n` pre-grown slots (at least one, for the sentinel).
    ///
    /// Panics if `n` exceeds `max_capacity()`; construction-time sizing is a
    /// programmer decision, unlike runtime growth which reports
    /// [`PoolExhausted`].
    pub(crate) fn with_capacity(n: usize) -> Self {
        let n = n.max(1);
        assert!(n <= I::MAX, "pool capacity {n} exceeds index range {}", I::MAX);
        let mut slots = Vec::with_capacity(n);
        slots.push(Slot::Nil);
        for i in 1..n {
            slots.push(Slot::Vacant {
                next: I::from_usize(i + 1),
            });
        }
        Pool {
            slots,
            head: I::from_usize(1),
        }
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub(crate) fn max_capacity() -> usize {
        I::MAX
    }

    /// Occupied slots, sentinel excluded. O(capacity); test support.
    #[cfg(test)]
    pub(crate) fn live(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| matches!(s, Slot::Occupied(_)))
            .count()
    }

    /// Takes the free-list head, growing the pool if the list is empty.
    ///
    /// On growth failure nothing is disturbed; on success the returned handle
    /// stays valid until freed, regardless of later growth.
    pub(crate) fn allocate(&mut self, node: N) -> Result<I, PoolExhausted> {
        if self.head.to_usize() == self.slots.len() {
            self.grow()?;
        }
        let i = self.head;
        self.head = match self.slots[i.to_usize()] {
            Slot::Vacant { next } => next,
            _ => unreachable!("free-list head points at a non-vacant slot"),
        };
        self.slots[i.to_usize()] = Slot::Occupied(node);
        Ok(i)
    }

    /// Returns slot `i` to the free list, handing its node back to the
    /// caller. Dropping the returned node is the destruct-and-deallocate
    /// path; keeping it is the pull-out path. Never fails.
    pub(crate) fn free(&mut self, i: I) -> N {
        debug_assert!(!i.is_nil(), "the sentinel is never freed");
        let slot = mem::replace(
            &mut self.slots[i.to_usize()],
            Slot::Vacant { next: self.head },
        );
        self.head = i;
        match slot {
            Slot::Occupied(node) => node,
            _ => unreachable!("freed a slot that held no node"),
        }
    }

    #[inline]
    pub(crate) fn get(&self, i: I) -> &N {
        match &self.slots[i.to_usize()] {
            Slot::Occupied(node) => node,
            _ => panic!("handle {i:?} does not address a live node"),
        }
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, i: I) -> &mut N {
        match &mut self.slots[i.to_usize()] {
            Slot::Occupied(node) => node,
            _ => panic!("handle {i:?} does not address a live node"),
        }
    }

    /// Pre-grows capacity to at least `n` slots without allocating a node.
    ///
    /// Existing handles are unaffected. The old free list's tail stored
    /// `next == old capacity`, which after growth addresses the first new
    /// slot, so the old and new free regions form one list.
    pub(crate) fn reserve_for(&mut self, n: usize) -> Result<(), PoolExhausted> {
        if n <= self.slots.len() {
            return Ok(());
        }
        if n > I::MAX {
            return Err(PoolExhausted { max: I::MAX });
        }
        let target = n.max(self.doubled_capacity());
        self.extend_free(target);
        Ok(())
    }

    /// Drops every node and rethreads the whole free list. O(capacity).
    pub(crate) fn free_all(&mut self) {
        for i in 1..self.slots.len() {
            self.slots[i] = Slot::Vacant {
                next: I::from_usize(i + 1),
            };
        }
        self.head = I::from_usize(1);
    }

    fn grow(&mut self) -> Result<(), PoolExhausted> {
        if self.slots.len() >= I::MAX {
            return Err(PoolExhausted { max: I::MAX });
        }
        let target = self.doubled_capacity();
        self.extend_free(target);
        Ok(())
    }

    /// Double while below half of the index range, then jump to the maximum.
    fn doubled_capacity(&self) -> usize {
        let len = self.slots.len();
        if len < I::MAX / 2 {
            len * 2
        } else {
            I::MAX
        }
    }

    fn extend_free(&mut self, new_capacity: usize) {
        debug_assert!(new_capacity <= I::MAX);
        let len = self.slots.len();
        self.slots.reserve_exact(new_capacity - len);
        for i in len..new_capacity {
            self.slots.push(Slot::Vacant {
                next: I::from_usize(i + 1),
            });
        }
    }
}

impl<N, I: PoolIdx> Default for Pool<N, I> {
    fn default() -> Self {
        Self::new()
    }
}
