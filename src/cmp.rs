//! Comparator layer: a strict-weak-ordering "less" predicate.
//!
//! Comparators are heterogeneous: the stored key type and the probe type may
//! differ, so a map keyed by `String` can be probed with `&str`, and a set of
//! records keyed by one field (see [`member_comparator!`]) can be probed with
//! a bare field value.

/// Strict weak ordering between an `A` and a `B`.
///
/// `less(a, b)` must behave like `<` of a total preorder: irreflexive,
/// transitive, with transitive incomparability. Two keys are considered equal
/// when neither is less than the other.
pub trait Compare<A: ?Sized, B: ?Sized = A> {
    fn less(&self, a: &A, b: &B) -> bool;
}

/// Orders by the types' own `PartialOrd`.
///
/// The default comparator of every container in this crate. Heterogeneity
/// comes from [`NaturalLess`]: same-type comparisons are covered for every
/// `PartialOrd` type, and owned/borrowed pairs (`String` vs `str`, `Vec<T>`
/// vs `[T]`) are bridged explicitly so a `String`-keyed container can be
/// probed with `&str`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NaturalOrder;

/// The comparisons [`NaturalOrder`] can perform.
///
/// Std's cross-type `PartialOrd` impls do not cover owned/borrowed pairs
/// (`String` is not `PartialOrd<str>`), so this trait supplies the bridges
/// itself: one blanket impl for same-type `PartialOrd` comparisons, plus
/// concrete impls per owned/borrowed pair. The same-type impl and the
/// bridges never overlap because their type pairs cannot unify. Implement it
/// for your own key/probe pairs to probe a container without building a full
/// key.
pub trait NaturalLess<B: ?Sized> {
    fn less_than(&self, other: &B) -> bool;
}

impl<T: ?Sized + PartialOrd> NaturalLess<T> for T {
    #[inline]
    fn less_than(&self, other: &T) -> bool {
        self < other
    }
}

impl NaturalLess<str> for String {
    #[inline]
    fn less_than(&self, other: &str) -> bool {
        self.as_str() < other
    }
}

impl NaturalLess<String> for str {
    #[inline]
    fn less_than(&self, other: &String) -> bool {
        self < other.as_str()
    }
}

impl<T: PartialOrd> NaturalLess<[T]> for Vec<T> {
    #[inline]
    fn less_than(&self, other: &[T]) -> bool {
        self.as_slice() < other
    }
}

impl<T: PartialOrd> NaturalLess<Vec<T>> for [T] {
    #[inline]
    fn less_than(&self, other: &Vec<T>) -> bool {
        self < other.as_slice()
    }
}

impl<A, B> Compare<A, B> for NaturalOrder
where
    A: ?Sized + NaturalLess<B>,
    B: ?Sized,
{
    #[inline]
    fn less(&self, a: &A, b: &B) -> bool {
        a.less_than(b)
    }
}

/// Defines a comparator that orders whole records by one designated field.
///
/// Generates a unit struct implementing [`Compare`] for record/record,
/// record/field and field/record, so containers keyed by a struct member can
/// be probed with a bare field value (no record construction, no duplicated
/// storage).
///
/// ```
/// use avl_arena::{member_comparator, AvlSet};
///
/// struct Job {
///     id: u64,
///     priority: u32,
/// }
///
/// member_comparator!(ById: Job => id: u64);
///
/// let mut jobs: AvlSet<Job, ById> = AvlSet::new();
/// jobs.insert(Job { id: 7, priority: 1 }).unwrap();
/// assert!(jobs.get(&7u64).is_some());
/// ```
///
/// The three impls are generated for the concrete record/field type pair, so
/// the field type must differ from the record type.
#[macro_export]
macro_rules! member_comparator {
    ($(#[$meta:meta])* $vis:vis $name:ident : $owner:ty => $field:ident : $key:ty) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
        $vis struct $name;

        impl $crate::Compare<$owner, $owner> for $name {
            #[inline]
            fn less(&self, a: &$owner, b: &$owner) -> bool {
                a.$field < b.$field
            }
        }

        impl $crate::Compare<$owner, $key> for $name {
            #[inline]
            fn less(&self, a: &$owner, b: &$key) -> bool {
                &a.$field < b
            }
        }

        impl $crate::Compare<$key, $owner> for $name {
            #[inline]
            fn less(&self, a: &$key, b: &$owner) -> bool {
                a < &b.$field
            }
        }
    };
}
