//! Metrics collection and export for object pools

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Metrics data for a pool
///
/// # Examples
///
/// ```
/// use reuse_pool::ObjectPool;
///
/// let pool = ObjectPool::new(Vec::<u8>::new, 1);
///
/// let first = pool.acquire();
/// let second = pool.acquire();
/// let metrics = pool.get_metrics();
/// assert_eq!(metrics.total_acquired, 2);
/// assert_eq!(metrics.created_on_demand, 1);
/// assert_eq!(metrics.outstanding_objects, 2);
/// # drop((first, second));
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PoolMetrics {
    /// Objects currently waiting in the pool
    pub available_objects: usize,

    /// Objects ever created by the pool
    pub created_objects: usize,

    /// Objects handed out and not yet returned
    pub outstanding_objects: usize,

    /// Total successful acquisitions
    pub total_acquired: usize,

    /// Total successful releases
    pub total_released: usize,

    /// Acquisitions that found the pool empty and created a new object
    pub created_on_demand: usize,

    /// Releases refused because the object was foreign or invalid
    pub rejected_releases: usize,

    /// Refused objects dropped by a guard instead of being handed back
    pub discarded_objects: usize,

    /// Share of acquisitions served from recycled objects (0.0 to 1.0)
    pub reuse_ratio: f64,
}

impl PoolMetrics {
    /// Export metrics as a HashMap
    pub fn export(&self) -> HashMap<String, String> {
        let mut metrics = HashMap::new();
        metrics.insert("available_objects".to_string(), self.available_objects.to_string());
        metrics.insert("created_objects".to_string(), self.created_objects.to_string());
        metrics.insert("outstanding_objects".to_string(), self.outstanding_objects.to_string());
        metrics.insert("total_acquired".to_string(), self.total_acquired.to_string());
        metrics.insert("total_released".to_string(), self.total_released.to_string());
        metrics.insert("created_on_demand".to_string(), self.created_on_demand.to_string());
        metrics.insert("rejected_releases".to_string(), self.rejected_releases.to_string());
        metrics.insert("discarded_objects".to_string(), self.discarded_objects.to_string());
        metrics.insert("reuse_ratio".to_string(), format!("{:.2}", self.reuse_ratio));
        metrics
    }
}

/// Metrics exporter for the Prometheus text format
#[cfg(feature = "prometheus")]
pub struct MetricsExporter;

#[cfg(feature = "prometheus")]
impl MetricsExporter {
    /// Export metrics in Prometheus exposition format
    ///
    /// # Examples
    ///
    /// ```
    /// use reuse_pool::ObjectPool;
    /// use std::collections::HashMap;
    ///
    /// let pool = ObjectPool::new(String::new, 3);
    ///
    /// let mut tags = HashMap::new();
    /// tags.insert("service".to_string(), "api".to_string());
    ///
    /// let output = pool.export_metrics_prometheus("my_pool", Some(&tags)).unwrap();
    /// assert!(output.contains("objectpool_objects_available"));
    /// assert!(output.contains("service=\"api\""));
    /// ```
    pub fn export_prometheus(
        metrics: &PoolMetrics,
        pool_name: &str,
        tags: Option<&HashMap<String, String>>,
    ) -> crate::PoolResult<String> {
        use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};

        let mut labels = HashMap::new();
        labels.insert("pool".to_string(), pool_name.to_string());
        if let Some(tags) = tags {
            for (key, value) in tags {
                labels.insert(key.clone(), value.clone());
            }
        }

        let registry = Registry::new_custom(None, Some(labels)).map_err(export_error)?;

        let gauges = [
            ("objectpool_objects_available", "Current available objects", metrics.available_objects),
            ("objectpool_objects_created", "Objects created by the pool", metrics.created_objects),
            ("objectpool_objects_outstanding", "Objects currently checked out", metrics.outstanding_objects),
        ];
        for (name, help, value) in gauges {
            let gauge = IntGauge::new(name, help).map_err(export_error)?;
            gauge.set(value as i64);
            registry.register(Box::new(gauge)).map_err(export_error)?;
        }

        let counters = [
            ("objectpool_objects_acquired_total", "Total objects acquired", metrics.total_acquired),
            ("objectpool_objects_released_total", "Total objects released", metrics.total_released),
            ("objectpool_objects_created_on_demand_total", "Objects created because the pool was empty", metrics.created_on_demand),
            ("objectpool_releases_rejected_total", "Releases refused by the pool", metrics.rejected_releases),
            ("objectpool_objects_discarded_total", "Refused objects dropped by guards", metrics.discarded_objects),
        ];
        for (name, help, value) in counters {
            let counter = IntCounter::new(name, help).map_err(export_error)?;
            counter.inc_by(value as u64);
            registry.register(Box::new(counter)).map_err(export_error)?;
        }

        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&registry.gather(), &mut buffer)
            .map_err(export_error)?;
        String::from_utf8(buffer).map_err(|e| crate::PoolError::MetricsExport(e.to_string()))
    }
}

#[cfg(feature = "prometheus")]
fn export_error(err: prometheus::Error) -> crate::PoolError {
    crate::PoolError::MetricsExport(err.to_string())
}

/// Internal metrics tracker
pub(crate) struct MetricsTracker {
    pub total_acquired: AtomicUsize,
    pub total_released: AtomicUsize,
    pub created_on_demand: AtomicUsize,
    pub rejected_releases: AtomicUsize,
    pub discarded: AtomicUsize,
}

impl MetricsTracker {
    pub fn new() -> Self {
        Self {
            total_acquired: AtomicUsize::new(0),
            total_released: AtomicUsize::new(0),
            created_on_demand: AtomicUsize::new(0),
            rejected_releases: AtomicUsize::new(0),
            discarded: AtomicUsize::new(0),
        }
    }

    pub fn get_metrics(&self, available: usize, created: usize) -> PoolMetrics {
        let total_acquired = self.total_acquired.load(Ordering::Relaxed);
        let created_on_demand = self.created_on_demand.load(Ordering::Relaxed);
        let discarded = self.discarded.load(Ordering::Relaxed);

        let reuse_ratio = if total_acquired > 0 {
            total_acquired.saturating_sub(created_on_demand) as f64 / total_acquired as f64
        } else {
            0.0
        };

        PoolMetrics {
            available_objects: available,
            created_objects: created,
            outstanding_objects: created.saturating_sub(available).saturating_sub(discarded),
            total_acquired,
            total_released: self.total_released.load(Ordering::Relaxed),
            created_on_demand,
            rejected_releases: self.rejected_releases.load(Ordering::Relaxed),
            discarded_objects: discarded,
            reuse_ratio,
        }
    }
}

impl Default for MetricsTracker {
    fn default() -> Self {
        Self::new()
    }
}
