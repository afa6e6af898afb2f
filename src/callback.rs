use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

/// A shared function handle with a stable identity.
///
/// Cloning a callback clones the handle, not the function, so clones compare
/// equal. Memoize a callback with
/// [`RenderContext::callback`](crate::RenderContext::callback) to hand out the
/// same handle across render passes, letting consumers skip work whenever
/// [`Callback::ptr_eq`] holds.
pub struct Callback<A, R = ()>(Arc<dyn Fn(A) -> R + Send + Sync>);

impl<A, R> Callback<A, R> {
    /// Wrap a function.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(A) -> R + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Invoke the function.
    #[inline]
    pub fn call(&self, arg: A) -> R {
        (self.0)(arg)
    }

    /// Whether both handles point to the same function.
    #[inline]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }
}

impl<A, R> Clone for Callback<A, R> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

/// Callbacks are equal if they are the same handle.
impl<A, R> PartialEq for Callback<A, R> {
    fn eq(&self, other: &Self) -> bool {
        Self::ptr_eq(self, other)
    }
}

impl<A, R> Eq for Callback<A, R> {}

impl<A, R> Debug for Callback<A, R> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "Callback({:p})", Arc::as_ptr(&self.0).cast::<()>())
    }
}
