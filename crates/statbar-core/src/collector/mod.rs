//! System metrics collection.
//!
//! This module provides the [`StatsCollector`] abstraction consumed by the
//! polling controller, the aggregating [`SystemStatsCollector`] built from
//! per-metric sources, and Linux sources reading `/proc` and `/sys`, with
//! support for mocking for testing on macOS.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    SystemStatsCollector                     │
//! │   (one pass per collect, on a spawn_blocking worker)        │
//! │                                                             │
//! │  ┌───────────┐ ┌───────────┐ ┌────────────┐ ┌───────────┐   │
//! │  │    CPU    │ │  Memory   │ │  Network   │ │ Processes │   │
//! │  │/proc/stat │ │ /meminfo  │ │ /net/dev   │ │/proc/[pid]│   │
//! │  └─────┬─────┘ └─────┬─────┘ └─────┬──────┘ └─────┬─────┘   │
//! │        │  ┌──────────┴──┐  ┌───────┴─────┐        │         │
//! │        │  │  Battery    │  │    Disk     │        │         │
//! │        │  │/sys/.../BAT*│  │ sysinfo disk│        │         │
//! │        │  └──────┬──────┘  └─────────────┘        │         │
//! │        └─────────┼────────────────────────────────┘         │
//! │           ┌──────▼──────┐                                   │
//! │           │  FileSystem │ (trait)                           │
//! │           └──────┬──────┘                                   │
//! └──────────────────┼──────────────────────────────────────────┘
//!          ┌─────────┴─────────┐
//!   ┌──────▼──────┐     ┌──────▼──────┐
//!   │   RealFs    │     │   MockFs    │
//!   │  (Linux)    │     │  (Testing)  │
//!   └─────────────┘     └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```
//! use statbar_core::collector::{MockFs, StatsCollector, SystemStatsCollector};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let fs = MockFs::typical_system();
//! let collector = SystemStatsCollector::procfs(fs, "/proc", "/sys", "/");
//! let snapshot = collector.collect().await.unwrap();
//! assert!(!snapshot.metrics.is_empty());
//! # });
//! ```

use std::future::Future;

use crate::model::StatsSnapshot;

#[allow(clippy::module_inception)]
mod collector;
mod error;
mod fake;
pub mod mock;
pub mod procfs;
pub mod traits;

pub use collector::{CollectorTiming, SystemStatsCollector};
pub use error::CollectError;
pub use fake::FakeStatsCollector;
pub use mock::MockFs;
pub use traits::{
    BatterySource, CpuUsageSource, DiskUsageSource, FileSystem, MemoryUsageSource,
    NetworkCounterSource, ProcessCpuSource, RealFs,
};

/// Produces one snapshot per call.
///
/// Implementations may block internally but must not block the calling
/// task; the controller may drop the returned future when the polling
/// session it belongs to ends.
pub trait StatsCollector: Send + Sync + 'static {
    fn collect(&self) -> impl Future<Output = Result<StatsSnapshot, CollectError>> + Send;
}
