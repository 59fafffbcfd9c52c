//! Factories that build fresh pool instances

use std::fmt;
use std::marker::PhantomData;

/// Produces new instances for a pool.
///
/// A creator knows nothing about the pool it feeds. Any
/// `Fn() -> T + Send + Sync` closure is a creator, which covers
/// non-default construction:
///
/// ```
/// use reuse_pool::ObjectCreator;
///
/// let creator = || Vec::<u8>::with_capacity(4096);
/// assert_eq!(creator.create().capacity(), 4096);
/// ```
///
/// A panic inside `create` is not caught by the pool; it unwinds to whoever
/// called `acquire` or built the pool.
pub trait ObjectCreator<T>: Send + Sync {
    /// Build one instance in its fresh state
    fn create(&self) -> T;
}

impl<T, F> ObjectCreator<T> for F
where
    F: Fn() -> T + Send + Sync,
{
    fn create(&self) -> T {
        self()
    }
}

/// Creator for types with a `Default` fresh state
pub struct DefaultCreator<T> {
    _phantom: PhantomData<fn() -> T>,
}

impl<T> DefaultCreator<T> {
    pub fn new() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }
}

impl<T> Default for DefaultCreator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for DefaultCreator<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for DefaultCreator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultCreator")
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T: Default> ObjectCreator<T> for DefaultCreator<T> {
    fn create(&self) -> T {
        T::default()
    }
}
