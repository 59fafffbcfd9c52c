//! Error types for the object pool

use std::fmt;

use thiserror::Error;

use crate::pool::Pooled;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("No creator supplied and no pool exists yet for this type")]
    MissingCreator,

    #[error("Cannot release an empty slot")]
    NullObject,

    #[error("Object {id} was not created by this pool")]
    ForeignObject { id: u64 },

    #[error("Object {id} failed validation on return")]
    ValidationFailed { id: u64 },

    #[error("Metrics export failed: {0}")]
    MetricsExport(String),
}

pub type PoolResult<T> = Result<T, PoolError>;

/// A release the pool refused. The handle is returned untouched.
pub struct Rejected<T> {
    object: Pooled<T>,
    error: PoolError,
}

impl<T> Rejected<T> {
    pub(crate) fn new(object: Pooled<T>, error: PoolError) -> Self {
        Self { object, error }
    }

    /// Why the pool refused the object
    pub fn error(&self) -> &PoolError {
        &self.error
    }

    /// Take the refused handle back
    pub fn into_inner(self) -> Pooled<T> {
        self.object
    }

    /// Split into the handle and the error
    pub fn into_parts(self) -> (Pooled<T>, PoolError) {
        (self.object, self.error)
    }
}

impl<T> fmt::Debug for Rejected<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rejected")
            .field("object_id", &self.object.id())
            .field("error", &self.error)
            .finish()
    }
}

impl<T> fmt::Display for Rejected<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

impl<T> std::error::Error for Rejected<T> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl<T> From<Rejected<T>> for PoolError {
    fn from(rejected: Rejected<T>) -> Self {
        rejected.error
    }
}
