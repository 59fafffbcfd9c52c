//! Process-wide pools, one per pooled type

use crate::config::PoolConfiguration;
use crate::creator::{DefaultCreator, ObjectCreator};
use crate::errors::{PoolError, PoolResult};
use crate::pool::{ObjectPool, Poolable};

use parking_lot::{Mutex, RwLock};
use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::{Arc, LazyLock, OnceLock};
use tracing::debug;

type AnyCell = Arc<dyn Any + Send + Sync>;

/// Registry slot for one pooled type. The registry lock only guards finding
/// or inserting the slot; building the pool is serialized by `init`.
struct PoolCell<T> {
    pool: OnceLock<Arc<ObjectPool<T>>>,
    init: Mutex<()>,
}

impl<T: Poolable + Send + 'static> PoolCell<T> {
    fn new() -> Self {
        Self {
            pool: OnceLock::new(),
            init: Mutex::new(()),
        }
    }

    fn get_or_try_init<E>(
        &self,
        build: impl FnOnce() -> Result<ObjectPool<T>, E>,
    ) -> Result<Arc<ObjectPool<T>>, E> {
        if let Some(pool) = self.pool.get() {
            return Ok(Arc::clone(pool));
        }

        let _init = self.init.lock();
        if let Some(pool) = self.pool.get() {
            return Ok(Arc::clone(pool));
        }

        let pool = Arc::new(build()?);
        // Only the holder of `init` ever sets the cell.
        let _ = self.pool.set(Arc::clone(&pool));
        debug!(pool = pool.name(), seeded = pool.created_count(), "registered global pool");
        Ok(pool)
    }
}

static POOLS: LazyLock<RwLock<HashMap<TypeId, AnyCell>>> = LazyLock::new(Default::default);

impl<T: Poolable + Send + 'static> ObjectPool<T> {
    /// Get the process-wide pool for `T`, building it on first use.
    ///
    /// The first successful call seeds the pool with `initial_size` objects
    /// from `creator`. Every later call returns that same pool and ignores
    /// both arguments.
    ///
    /// Fails with [`PoolError::MissingCreator`] when no pool exists yet and
    /// `creator` is `None`.
    ///
    /// Seeding holds a lock private to `T`, so a creator may use the global
    /// pools of other types but must not ask for the pool of `T` itself.
    /// A panicking creator leaves no pool registered.
    ///
    /// # Examples
    ///
    /// ```
    /// use reuse_pool::{DefaultCreator, ObjectPool, Poolable};
    ///
    /// #[derive(Default)]
    /// struct Scratch(Vec<u8>);
    ///
    /// impl Poolable for Scratch {
    ///     fn reset(&mut self) {
    ///         self.0.clear();
    ///     }
    /// }
    ///
    /// let pool = ObjectPool::<Scratch>::global(Some(DefaultCreator::new()), 2).unwrap();
    /// let same = ObjectPool::<Scratch>::global(Some(DefaultCreator::new()), 50).unwrap();
    ///
    /// assert!(std::sync::Arc::ptr_eq(&pool, &same));
    /// assert_eq!(same.created_count(), 2);
    /// ```
    pub fn global<C>(creator: Option<C>, initial_size: usize) -> PoolResult<Arc<Self>>
    where
        C: ObjectCreator<T> + 'static,
    {
        Self::cell().get_or_try_init(|| {
            let creator = creator.ok_or(PoolError::MissingCreator)?;
            Ok(Self::with_config(creator, Self::global_config(initial_size)))
        })
    }

    /// Get the process-wide pool for `T` if one was already built
    pub fn try_global() -> PoolResult<Arc<Self>> {
        Self::global(None::<fn() -> T>, 0)
    }

    fn global_config(initial_size: usize) -> PoolConfiguration<T> {
        PoolConfiguration::new()
            .with_initial_size(initial_size)
            .with_name(type_name::<T>())
    }

    fn cell() -> Arc<PoolCell<T>> {
        let key = TypeId::of::<T>();

        let existing = POOLS.read().get(&key).cloned();
        let cell = match existing {
            Some(cell) => cell,
            None => Arc::clone(
                POOLS
                    .write()
                    .entry(key)
                    .or_insert_with(|| Arc::new(PoolCell::<T>::new()) as AnyCell),
            ),
        };

        match cell.downcast::<PoolCell<T>>() {
            Ok(cell) => cell,
            Err(_) => unreachable!("registry slots are keyed by their own type"),
        }
    }
}

impl<T: Poolable + Default + Send + 'static> ObjectPool<T> {
    /// [`ObjectPool::global`] with `T::default()` as the creator.
    ///
    /// Cannot fail: a creator is always supplied.
    pub fn global_default(initial_size: usize) -> Arc<Self> {
        let Ok(pool) = Self::cell().get_or_try_init(|| {
            Ok::<_, Infallible>(Self::with_config(
                DefaultCreator::new(),
                Self::global_config(initial_size),
            ))
        });
        pool
    }
}
