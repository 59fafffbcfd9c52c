//! Core object pool implementation

use crate::config::PoolConfiguration;
use crate::creator::ObjectCreator;
use crate::errors::{PoolError, PoolResult, Rejected};
use crate::metrics::{MetricsTracker, PoolMetrics};

use crossbeam::queue::SegQueue;
use dashmap::DashSet;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::hash::BuildHasher;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace, warn};

/// Identities are unique across every pool in the process.
static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

/// A type whose instances can be returned to a fresh state for reuse.
///
/// `reset` is called on every successful release, so an acquired object
/// never carries state from its previous holder. Calling it twice must
/// leave the same state as calling it once.
pub trait Poolable {
    fn reset(&mut self);
}

impl<T> Poolable for Vec<T> {
    fn reset(&mut self) {
        self.clear();
    }
}

impl<T> Poolable for VecDeque<T> {
    fn reset(&mut self) {
        self.clear();
    }
}

impl Poolable for String {
    fn reset(&mut self) {
        self.clear();
    }
}

impl<K, V, S: BuildHasher> Poolable for HashMap<K, V, S> {
    fn reset(&mut self) {
        self.clear();
    }
}

/// An owned object together with its identity.
///
/// Pools recognise their own objects by identity, never by value: two
/// handles holding equal values are still different objects.
pub struct Pooled<T> {
    value: T,
    id: u64,
}

impl<T> Pooled<T> {
    /// Wrap a value under a brand new identity.
    ///
    /// No pool has seen this identity, so releasing the result into a pool
    /// is refused with [`PoolError::ForeignObject`].
    pub fn new(value: T) -> Self {
        Self {
            value,
            id: NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Identity of this object
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Keep the value and give up on returning it to the pool
    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T> Deref for Pooled<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}

impl<T> DerefMut for Pooled<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.value
    }
}

impl<T: fmt::Debug> fmt::Debug for Pooled<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pooled")
            .field("id", &self.id)
            .field("value", &self.value)
            .finish()
    }
}

/// Thread-safe object pool that grows on demand
///
/// # Examples
///
/// ```
/// use reuse_pool::ObjectPool;
///
/// let pool = ObjectPool::new(String::new, 2);
///
/// let mut greeting = pool.acquire();
/// greeting.push_str("hello");
/// pool.release(greeting).unwrap();
///
/// assert_eq!(pool.available_count(), 2);
/// assert!(pool.acquire().is_empty());
/// ```
pub struct ObjectPool<T> {
    available: SegQueue<Pooled<T>>,
    provenance: DashSet<u64>,
    creator: Box<dyn ObjectCreator<T>>,
    config: PoolConfiguration<T>,
    metrics: MetricsTracker,
}

impl<T: Poolable> ObjectPool<T> {
    /// Create a pool seeded with `initial_size` objects
    pub fn new<C>(creator: C, initial_size: usize) -> Self
    where
        C: ObjectCreator<T> + 'static,
    {
        Self::with_config(creator, PoolConfiguration::new().with_initial_size(initial_size))
    }

    /// Create a pool from a full configuration
    pub fn with_config<C>(creator: C, config: PoolConfiguration<T>) -> Self
    where
        C: ObjectCreator<T> + 'static,
    {
        let pool = Self {
            available: SegQueue::new(),
            provenance: DashSet::new(),
            creator: Box::new(creator),
            config,
            metrics: MetricsTracker::new(),
        };

        for _ in 0..pool.config.initial_size {
            let object = pool.create_object();
            pool.available.push(object);
        }

        debug!(
            pool = %pool.config.name,
            seeded = pool.config.initial_size,
            "object pool created"
        );

        pool
    }

    /// Take an object, creating one if none are available. Never blocks.
    pub fn acquire(&self) -> Pooled<T> {
        if let Some(object) = self.available.pop() {
            self.metrics.total_acquired.fetch_add(1, Ordering::Relaxed);
            trace!(pool = %self.config.name, object_id = object.id, "reused pooled object");
            return object;
        }

        let object = self.create_object();
        self.metrics.total_acquired.fetch_add(1, Ordering::Relaxed);
        self.metrics.created_on_demand.fetch_add(1, Ordering::Relaxed);
        debug!(
            pool = %self.config.name,
            object_id = object.id,
            created = self.provenance.len(),
            "pool empty, created new object"
        );
        object
    }

    /// Take an object that goes back to the pool when the guard is dropped.
    ///
    /// If the pool refuses the object on drop (a configured validation
    /// fails) the object is discarded and counted in
    /// [`PoolMetrics::discarded_objects`]; it no longer counts as outstanding.
    pub fn acquire_guard(&self) -> PoolGuard<'_, T> {
        PoolGuard {
            pool: self,
            object: Some(self.acquire()),
        }
    }

    /// Return an object to the pool.
    ///
    /// The object must have been created by this pool. On success it is
    /// reset and becomes available again; on failure nothing changes and
    /// the handle comes back inside [`Rejected`].
    pub fn release(&self, mut object: Pooled<T>) -> Result<(), Rejected<T>> {
        let id = object.id;

        if !self.provenance.contains(&id) {
            self.metrics.rejected_releases.fetch_add(1, Ordering::Relaxed);
            warn!(pool = %self.config.name, object_id = id, "refused object not created by this pool");
            return Err(Rejected::new(object, PoolError::ForeignObject { id }));
        }

        if !self.config.accepts(&object) {
            self.metrics.rejected_releases.fetch_add(1, Ordering::Relaxed);
            warn!(pool = %self.config.name, object_id = id, "refused object failing validation");
            return Err(Rejected::new(object, PoolError::ValidationFailed { id }));
        }

        object.reset();
        self.available.push(object);
        self.metrics.total_released.fetch_add(1, Ordering::Relaxed);
        trace!(pool = %self.config.name, object_id = id, "object returned to pool");
        Ok(())
    }

    /// Return the object held in `slot`, clearing the slot on success.
    ///
    /// An empty slot fails with [`PoolError::NullObject`]. A refused object
    /// is put back into the slot.
    pub fn release_slot(&self, slot: &mut Option<Pooled<T>>) -> PoolResult<()> {
        let object = slot.take().ok_or(PoolError::NullObject)?;

        self.release(object).map_err(|rejected| {
            let (object, error) = rejected.into_parts();
            *slot = Some(object);
            error
        })
    }

    /// Whether `object` was created by this pool
    pub fn owns(&self, object: &Pooled<T>) -> bool {
        self.provenance.contains(&object.id)
    }

    /// Objects waiting in the pool right now
    pub fn available_count(&self) -> usize {
        self.available.len()
    }

    /// Objects ever created by this pool
    pub fn created_count(&self) -> usize {
        self.provenance.len()
    }

    /// Objects handed out and neither returned nor discarded
    pub fn outstanding_count(&self) -> usize {
        self.created_count()
            .saturating_sub(self.available_count())
            .saturating_sub(self.metrics.discarded.load(Ordering::Relaxed))
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Get pool metrics
    pub fn get_metrics(&self) -> PoolMetrics {
        self.metrics
            .get_metrics(self.available_count(), self.created_count())
    }

    /// Export metrics
    pub fn export_metrics(&self) -> HashMap<String, String> {
        self.get_metrics().export()
    }

    /// Export metrics in Prometheus format
    #[cfg(feature = "prometheus")]
    pub fn export_metrics_prometheus(
        &self,
        pool_name: &str,
        tags: Option<&HashMap<String, String>>,
    ) -> PoolResult<String> {
        crate::metrics::MetricsExporter::export_prometheus(&self.get_metrics(), pool_name, tags)
    }

    fn create_object(&self) -> Pooled<T> {
        let object = Pooled::new(self.creator.create());
        self.provenance.insert(object.id);
        object
    }
}

impl<T> fmt::Debug for ObjectPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectPool")
            .field("name", &self.config.name)
            .field("available", &self.available.len())
            .field("created", &self.provenance.len())
            .finish_non_exhaustive()
    }
}

/// A pooled object that returns itself to the pool when dropped
pub struct PoolGuard<'a, T: Poolable> {
    pool: &'a ObjectPool<T>,
    object: Option<Pooled<T>>,
}

impl<T: Poolable> PoolGuard<'_, T> {
    /// Identity of the guarded object
    pub fn id(&self) -> u64 {
        self.pooled().id
    }

    /// Stop guarding and hand over the raw handle
    pub fn into_pooled(mut self) -> Pooled<T> {
        self.object.take().expect("Value already taken")
    }

    fn pooled(&self) -> &Pooled<T> {
        self.object.as_ref().expect("Value already taken")
    }
}

impl<T: Poolable> Deref for PoolGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        self.pooled()
    }
}

impl<T: Poolable> DerefMut for PoolGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.object.as_mut().expect("Value already taken")
    }
}

impl<T: Poolable> Drop for PoolGuard<'_, T> {
    fn drop(&mut self) {
        if let Some(object) = self.object.take() {
            if let Err(rejected) = self.pool.release(object) {
                self.pool.metrics.discarded.fetch_add(1, Ordering::Relaxed);
                debug!(
                    pool = %self.pool.config.name,
                    object_id = rejected.into_inner().id,
                    "guard discarded refused object"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::creator::DefaultCreator;
    use std::collections::HashSet;
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::Mutex;
    use std::thread;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Point {
        x: i32,
        y: i32,
    }

    impl Poolable for Point {
        fn reset(&mut self) {
            self.x = 0;
            self.y = 0;
        }
    }

    fn point_pool(initial: usize) -> ObjectPool<Point> {
        ObjectPool::new(DefaultCreator::<Point>::new(), initial)
    }

    #[test]
    fn test_seeded_then_on_demand() {
        let pool = point_pool(2);
        assert_eq!(pool.available_count(), 2);
        assert_eq!(pool.created_count(), 2);

        let mut o1 = pool.acquire();
        o1.x = 1;
        o1.y = 2;
        let mut o2 = pool.acquire();
        o2.x = 3;
        o2.y = 4;
        assert_eq!(pool.available_count(), 0);

        let mut o3 = pool.acquire();
        o3.x = 5;
        o3.y = 6;
        assert_eq!(pool.available_count(), 0);
        assert_eq!(pool.created_count(), 3);

        let o1_id = o1.id();
        let mut slot = Some(o1);
        pool.release_slot(&mut slot).unwrap();
        assert!(slot.is_none());
        assert_eq!(pool.available_count(), 1);

        let o4 = pool.acquire();
        assert_eq!(o4.id(), o1_id);
        assert_eq!(*o4, Point::default());
        assert_eq!(pool.available_count(), 0);
        assert_eq!(pool.outstanding_count(), 3);

        drop((o2, o3));
    }

    #[test]
    fn test_acquire_beyond_seed_creates_exactly_enough() {
        let pool = point_pool(3);
        let held: Vec<_> = (0..10).map(|_| pool.acquire()).collect();

        assert_eq!(pool.created_count(), 10);
        assert_eq!(pool.get_metrics().created_on_demand, 7);

        let ids: HashSet<u64> = held.iter().map(Pooled::id).collect();
        assert_eq!(ids.len(), 10);
    }

    #[test]
    fn test_release_resets_state() {
        let pool = point_pool(0);
        let mut p = pool.acquire();
        p.x = 42;
        let id = p.id();
        pool.release(p).unwrap();

        let again = pool.acquire();
        assert_eq!(again.id(), id);
        assert_eq!(again.x, 0);
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut once = Point { x: 7, y: -3 };
        once.reset();
        let mut twice = Point { x: 7, y: -3 };
        twice.reset();
        twice.reset();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_release_rejects_foreign_object() {
        let pool = point_pool(1);
        let stranger = Pooled::new(Point { x: 9, y: 9 });
        let stranger_id = stranger.id();

        let rejected = pool.release(stranger).unwrap_err();
        assert_eq!(*rejected.error(), PoolError::ForeignObject { id: stranger_id });
        assert_eq!(pool.available_count(), 1);
        assert_eq!(pool.get_metrics().rejected_releases, 1);

        // Handle comes back untouched, not reset.
        let back = rejected.into_inner();
        assert_eq!(back.x, 9);
    }

    #[test]
    fn test_release_rejects_object_from_other_pool() {
        let first = point_pool(1);
        let second = point_pool(1);
        let from_first = first.acquire();

        assert!(!second.owns(&from_first));
        let mut slot = Some(from_first);
        let err = second.release_slot(&mut slot).unwrap_err();
        assert!(matches!(err, PoolError::ForeignObject { .. }));
        assert!(slot.is_some());
        assert_eq!(second.available_count(), 1);
    }

    #[test]
    fn test_equal_values_are_distinct_identities() {
        let pool = point_pool(0);
        let ours = pool.acquire();
        let lookalike = Pooled::new(Point::default());

        assert_eq!(*ours, *lookalike);
        assert!(pool.owns(&ours));
        assert!(!pool.owns(&lookalike));
    }

    #[test]
    fn test_release_slot_rejects_empty() {
        let pool = point_pool(1);
        let mut slot: Option<Pooled<Point>> = None;

        assert_eq!(pool.release_slot(&mut slot), Err(PoolError::NullObject));
        assert_eq!(pool.available_count(), 1);
    }

    #[test]
    fn test_validation_keeps_bad_objects_out() {
        let config = PoolConfiguration::new()
            .with_name("bounded")
            .with_validation(|v: &Vec<u8>| v.capacity() <= 16);
        let pool = ObjectPool::with_config(Vec::<u8>::new, config);

        let mut big = pool.acquire();
        big.reserve(1024);
        let id = big.id();
        let rejected = pool.release(big).unwrap_err();
        assert_eq!(*rejected.error(), PoolError::ValidationFailed { id });
        assert_eq!(pool.available_count(), 0);

        let small = pool.acquire();
        pool.release(small).unwrap();
        assert_eq!(pool.available_count(), 1);
    }

    #[test]
    fn test_guard_returns_on_drop() {
        let pool = ObjectPool::new(String::new, 1);
        {
            let mut guard = pool.acquire_guard();
            guard.push_str("scratch");
            assert_eq!(pool.available_count(), 0);
        }
        assert_eq!(pool.available_count(), 1);
        assert!(pool.acquire().is_empty());
    }

    #[test]
    fn test_guard_discards_refused_object() {
        let config = PoolConfiguration::new().with_validation(|s: &String| s.len() < 8);
        let pool = ObjectPool::with_config(String::new, config.with_initial_size(1));
        {
            let mut guard = pool.acquire_guard();
            guard.push_str("far too long");
        }

        let metrics = pool.get_metrics();
        assert_eq!(metrics.discarded_objects, 1);
        assert_eq!(metrics.rejected_releases, 1);
        assert_eq!(pool.available_count(), 0);
        assert_eq!(pool.created_count(), 1);
        assert_eq!(pool.outstanding_count(), 0);
    }

    #[test]
    fn test_creator_panic_reaches_caller() {
        let pool = ObjectPool::new(|| -> Point { panic!("out of points") }, 0);

        let result = panic::catch_unwind(AssertUnwindSafe(|| pool.acquire()));
        assert!(result.is_err());

        assert_eq!(pool.available_count(), 0);
        assert_eq!(pool.created_count(), 0);
        let metrics = pool.get_metrics();
        assert_eq!(metrics.total_acquired, 0);
        assert_eq!(metrics.created_on_demand, 0);
    }

    #[test]
    fn test_guard_into_pooled_detaches() {
        let pool = ObjectPool::new(String::new, 1);
        let guard = pool.acquire_guard();
        let id = guard.id();
        let pooled = guard.into_pooled();

        assert_eq!(pooled.id(), id);
        assert_eq!(pool.available_count(), 0);
        pool.release(pooled).unwrap();
        assert_eq!(pool.available_count(), 1);
    }

    #[test]
    fn test_concurrent_acquire_never_aliases() {
        let pool = point_pool(4);
        let seen = Mutex::new(Vec::new());

        thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    let held: Vec<_> = (0..25).map(|_| pool.acquire()).collect();
                    seen.lock().unwrap().extend(held.iter().map(Pooled::id));
                    for object in held {
                        pool.release(object).unwrap();
                    }
                });
            }
        });

        let created = pool.created_count();
        assert_eq!(pool.available_count(), created);
        assert!(created >= 25);
        assert!(created <= 8 * 25 + 4);

        let metrics = pool.get_metrics();
        assert_eq!(metrics.total_acquired, 200);
        assert_eq!(metrics.total_released, 200);
        assert_eq!(metrics.outstanding_objects, 0);
        assert_eq!(seen.into_inner().unwrap().len(), 200);
    }

    #[test]
    fn test_concurrent_holders_get_distinct_objects() {
        let pool = point_pool(2);
        let ids = Mutex::new(HashSet::new());
        let holders = std::sync::Barrier::new(6);

        thread::scope(|s| {
            for _ in 0..6 {
                s.spawn(|| {
                    let object = pool.acquire();
                    assert!(ids.lock().unwrap().insert(object.id()));
                    // Everyone holds at once before anything is returned.
                    holders.wait();
                    pool.release(object).unwrap();
                });
            }
        });

        assert_eq!(pool.created_count(), 6);
        assert_eq!(pool.available_count(), 6);
    }

    #[test]
    fn test_poolable_collections_clear() {
        let mut v = vec![1, 2, 3];
        v.reset();
        assert!(v.is_empty());

        let mut map: HashMap<&str, i32> = HashMap::new();
        map.insert("a", 1);
        map.reset();
        assert!(map.is_empty());

        let mut queue: VecDeque<u8> = VecDeque::from(vec![1]);
        queue.reset();
        assert!(queue.is_empty());
    }

    #[test]
    fn test_metrics_export() {
        let pool = point_pool(1);
        let a = pool.acquire();
        let _b = pool.acquire();
        pool.release(a).unwrap();

        let exported = pool.export_metrics();
        assert_eq!(exported["total_acquired"], "2");
        assert_eq!(exported["total_released"], "1");
        assert_eq!(exported["available_objects"], "1");
        assert_eq!(exported["reuse_ratio"], "0.50");
    }
}
