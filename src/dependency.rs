//! Dependency snapshots and their shallow comparison.

use std::any::Any;
use std::fmt::{self, Debug, Formatter};
use std::ops::Deref;
use std::sync::Arc;

use crate::callback::Callback;

/// A single value in a dependency snapshot.
///
/// Two dependencies are equal if they have the same concrete type and that
/// type's shallow equality says so. Plain values like numbers and strings
/// compare by value. Shared handles ([`Arc`], [`ByAddress`], [`Callback`])
/// compare by identity, never by what they point to. Wrap any other
/// `PartialEq` type in [`ByValue`] to opt into its own equality, or implement
/// this trait for a custom comparison.
pub trait Dependency: Send + 'static {
    /// Whether `other` has the same type and compares equal to `self`.
    fn dyn_eq(&self, other: &dyn Dependency) -> bool;

    /// Upcast for downcasting in [`dyn_eq`](Self::dyn_eq).
    fn as_any(&self) -> &dyn Any;
}

/// Compare `this` with `other` if `other` is a `T` as well.
///
/// Values of different types cannot be compared and thus count as changed.
#[inline]
fn same<T: 'static>(
    this: &T,
    other: &dyn Dependency,
    eq: impl FnOnce(&T, &T) -> bool,
) -> bool {
    other.as_any().downcast_ref::<T>().is_some_and(|other| eq(this, other))
}

macro_rules! by_value {
    ($($ty:ty),* $(,)?) => {
        $(impl Dependency for $ty {
            #[inline]
            fn dyn_eq(&self, other: &dyn Dependency) -> bool {
                same(self, other, |a, b| a == b)
            }

            #[inline]
            fn as_any(&self) -> &dyn Any {
                self
            }
        })*
    };
}

by_value! {
    (), bool, char,
    u8, u16, u32, u64, u128, usize,
    i8, i16, i32, i64, i128, isize,
    f32, f64,
    &'static str, String,
}

impl<T: Dependency> Dependency for Option<T> {
    fn dyn_eq(&self, other: &dyn Dependency) -> bool {
        same(self, other, |a, b| match (a, b) {
            (Some(a), Some(b)) => a.dyn_eq(b),
            (None, None) => true,
            _ => false,
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<T> Dependency for Arc<T>
where
    T: Send + Sync + ?Sized + 'static,
{
    #[inline]
    fn dyn_eq(&self, other: &dyn Dependency) -> bool {
        same(self, other, Arc::ptr_eq)
    }

    #[inline]
    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<T> Dependency for ByAddress<T>
where
    T: Send + Sync + ?Sized + 'static,
{
    #[inline]
    fn dyn_eq(&self, other: &dyn Dependency) -> bool {
        same(self, other, |a, b| a == b)
    }

    #[inline]
    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<A: 'static, R: 'static> Dependency for Callback<A, R> {
    #[inline]
    fn dyn_eq(&self, other: &dyn Dependency) -> bool {
        same(self, other, Callback::ptr_eq)
    }

    #[inline]
    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<T> Dependency for ByValue<T>
where
    T: PartialEq + Send + 'static,
{
    #[inline]
    fn dyn_eq(&self, other: &dyn Dependency) -> bool {
        same(self, other, |a, b| a.0 == b.0)
    }

    #[inline]
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// An ordered dependency snapshot.
///
/// Usually built with the [`deps!`](crate::deps!) macro.
#[derive(Default)]
pub struct Deps(Vec<Box<dyn Dependency>>);

impl Deps {
    /// Create an empty snapshot.
    ///
    /// A memoized value with empty dependencies is computed exactly once.
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Create a snapshot from boxed values.
    pub fn from_vec(values: Vec<Box<dyn Dependency>>) -> Self {
        Self(values)
    }

    /// Append a value to the snapshot.
    pub fn push<T: Dependency>(&mut self, value: T) {
        self.0.push(Box::new(value));
    }

    /// Append a value to the snapshot, builder style.
    pub fn with<T: Dependency>(mut self, value: T) -> Self {
        self.push(value);
        self
    }

    /// The number of values in the snapshot.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the snapshot is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether two snapshots are shallowly equal.
    ///
    /// They must have the same length and be pairwise equal.
    pub fn shallow_eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len()
            && self.0.iter().zip(&other.0).all(|(a, b)| a.dyn_eq(b.as_ref()))
    }
}

impl Debug for Deps {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "Deps(len: {})", self.0.len())
    }
}

/// Converts into an optional dependency snapshot.
///
/// Implemented for [`Deps`] and `Option<Deps>`, so that `memoize` accepts both
/// `deps![..]` and a plain `None`.
pub trait IntoDeps {
    /// Perform the conversion.
    fn into_deps(self) -> Option<Deps>;
}

impl IntoDeps for Deps {
    #[inline]
    fn into_deps(self) -> Option<Deps> {
        Some(self)
    }
}

impl IntoDeps for Option<Deps> {
    #[inline]
    fn into_deps(self) -> Option<Deps> {
        self
    }
}

/// Whether a memoized value must be recomputed when going from the `prev` to
/// the `next` snapshot.
///
/// An absent `next` snapshot always counts as changed, as does an absent
/// `prev` one. Never fails: values which cannot be compared count as changed.
pub fn changed(prev: Option<&Deps>, next: Option<&Deps>) -> bool {
    match (prev, next) {
        (Some(prev), Some(next)) => !prev.shallow_eq(next),
        _ => true,
    }
}

/// Build a [`Deps`] snapshot from a list of values.
///
/// ```
/// use memoslot::deps;
///
/// let snapshot = deps![1, "two", 3.0];
/// assert_eq!(snapshot.len(), 3);
/// ```
#[macro_export]
macro_rules! deps {
    () => {
        $crate::Deps::new()
    };
    ($($value:expr),+ $(,)?) => {
        $crate::Deps::from_vec(::std::vec![
            $(::std::boxed::Box::new($value) as ::std::boxed::Box<dyn $crate::Dependency>),+
        ])
    };
}

/// Compares a shared value by address instead of by contents.
///
/// This is the identity comparison that downstream consumers of memoized
/// handles rely on: two `ByAddress` values are equal iff they point to the
/// same allocation.
pub struct ByAddress<T: ?Sized>(pub Arc<T>);

impl<T: ?Sized> ByAddress<T> {
    /// Wrap a shared value.
    pub fn new(value: Arc<T>) -> Self {
        Self(value)
    }
}

impl<T: ?Sized> PartialEq for ByAddress<T> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<T: ?Sized> Eq for ByAddress<T> {}

impl<T: ?Sized> Clone for ByAddress<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T: ?Sized> Deref for ByAddress<T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T: ?Sized> From<Arc<T>> for ByAddress<T> {
    fn from(value: Arc<T>) -> Self {
        Self(value)
    }
}

impl<T: Debug + ?Sized> Debug for ByAddress<T> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_tuple("ByAddress").field(&&*self.0).finish()
    }
}

/// Compares a value with its own `PartialEq`.
///
/// Use this for types without a [`Dependency`] implementation. The comparison
/// is only as shallow as the type's equality, so prefer sharing large values
/// behind an [`Arc`].
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ByValue<T>(pub T);

impl<T> Deref for ByValue<T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deps;

    #[test]
    fn test_values_compare_by_value() {
        assert!(deps![1, "two", String::from("three")]
            .shallow_eq(&deps![1, "two", String::from("three")]));
        assert!(!deps![1].shallow_eq(&deps![2]));
        assert!(!deps![1].shallow_eq(&deps![1u8]));
        assert!(deps![Some(1i32), None::<u8>].shallow_eq(&deps![Some(1i32), None::<u8>]));
        assert!(!deps![Some(1i32)].shallow_eq(&deps![None::<i32>]));
    }

    #[test]
    fn test_arcs_compare_by_identity() {
        let a = Arc::new(vec![0u8; 4]);
        let b = Arc::new(vec![0u8; 4]);
        assert!(deps![a.clone()].shallow_eq(&deps![a.clone()]));
        assert!(!deps![a.clone()].shallow_eq(&deps![b.clone()]));
        assert!(!deps![ByAddress(a.clone())].shallow_eq(&deps![ByAddress(b)]));
        assert!(deps![ByValue(vec![1, 2])].shallow_eq(&deps![ByValue(vec![1, 2])]));
    }

    #[test]
    fn test_callbacks_compare_by_identity() {
        let f = Callback::new(|x: i32| x);
        let g = Callback::new(|x: i32| x);
        assert!(deps![f.clone()].shallow_eq(&deps![f.clone()]));
        assert!(!deps![f].shallow_eq(&deps![g]));
    }
}
