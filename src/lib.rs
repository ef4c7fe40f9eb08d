//! # avl-arena
//!
//! Arena-backed AVL sorted maps and sets with index-stable handles.
//!
//! All nodes of a container live in one growable slot pool and point at each
//! other with integer indices instead of heap pointers, so a container is a
//! handful of contiguous allocations no matter how many elements it holds,
//! and cloning one is a couple of `Vec` clones.
//!
//! ## Example
//!
//! ```rust
//! use avl_arena::{AvlMap, AvlSet};
//!
//! let mut set: AvlSet<u32> = AvlSet::new();
//! set.insert(3).unwrap();
//! set.insert(1).unwrap();
//! set.insert(2).unwrap();
//! assert_eq!(set.iter().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
//!
//! let mut map: AvlMap<String, u32> = AvlMap::new();
//! map.insert("b".to_string(), 2).unwrap();
//! map.insert("a".to_string(), 1).unwrap();
//! assert_eq!(map.first(), Some((&"a".to_string(), &1)));
//! ```
//!
//! ## Comparators
//!
//! Ordering is supplied by a [`Compare`] strategy rather than an `Ord` bound
//! on the element. [`NaturalOrder`] (the default) orders by `PartialOrd`;
//! its [`NaturalLess`] bridge additionally admits borrowed-form probes, e.g.
//! looking up a `String`-keyed map with `&str`. [`member_comparator!`]
//! derives a comparator that orders a struct by one field and accepts bare
//! field values as probes.

#![forbid(unsafe_code)]

pub mod cmp;
pub mod map;
pub mod set;

mod node;
mod pool;
mod tree;

pub use cmp::{Compare, NaturalLess, NaturalOrder};
pub use map::{AvlMap, AvlMultimap};
pub use pool::{PoolExhausted, PoolIdx};
pub use set::{AvlMultiset, AvlSet};

#[cfg(test)]
mod proptests;
