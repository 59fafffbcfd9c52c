//! # reuse_pool
//!
//! Thread-safe object pool that hands out reusable instances of an
//! expensive type and takes them back instead of destroying them.
//!
//! ## Features
//!
//! - Lock-free take/return on a concurrent queue
//! - Grows on demand: an empty pool creates a new object instead of failing
//! - Returned objects are reset before they are reused
//! - Returns are checked by identity, so objects from elsewhere are refused
//! - One process-wide pool per pooled type, or standalone pools you own
//! - Automatic return via RAII guards
//! - Metrics with Prometheus export
//!
//! ## Quick Start
//!
//! ```rust
//! use reuse_pool::{ObjectPool, Poolable};
//!
//! #[derive(Default)]
//! struct Point {
//!     x: i32,
//!     y: i32,
//! }
//!
//! impl Poolable for Point {
//!     fn reset(&mut self) {
//!         self.x = 0;
//!         self.y = 0;
//!     }
//! }
//!
//! let pool = ObjectPool::<Point>::global_default(2);
//!
//! let mut p = pool.acquire();
//! p.x = 4;
//! pool.release(p).unwrap();
//!
//! {
//!     let p = pool.acquire_guard();
//!     assert_eq!(p.x, 0);
//!     // Object automatically returned when `p` goes out of scope
//! }
//! assert_eq!(pool.available_count(), 2);
//! ```

mod pool;
mod config;
mod creator;
mod metrics;
mod registry;
mod errors;

pub use pool::{ObjectPool, PoolGuard, Poolable, Pooled};
pub use config::PoolConfiguration;
pub use creator::{DefaultCreator, ObjectCreator};
pub use metrics::PoolMetrics;
#[cfg(feature = "prometheus")]
pub use metrics::MetricsExporter;
pub use errors::{PoolError, PoolResult, Rejected};
