//! Aggregating collector that combines the per-metric sources.
//!
//! `SystemStatsCollector` runs every configured source once per pass on a
//! blocking worker thread and assembles the results into a `StatsSnapshot`.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::trace;

use crate::collector::StatsCollector;
use crate::collector::error::CollectError;
use crate::collector::procfs::{
    ProcCpuSource, ProcMemorySource, ProcNetworkSource, ProcProcessSource, VolumeDiskSource,
    SysBatterySource,
};
use crate::collector::traits::{
    BatterySource, CpuUsageSource, DiskUsageSource, FileSystem, MemoryUsageSource,
    NetworkCounterSource, ProcessCpuSource,
};
use crate::model::{MetricKind, StatsSnapshot};

/// Timing information for each source.
///
/// Used for debugging and performance monitoring.
#[derive(Debug, Clone, Default)]
pub struct CollectorTiming {
    /// Total pass time.
    pub total: Duration,
    pub cpu: Duration,
    pub memory: Duration,
    pub network: Duration,
    pub battery: Duration,
    pub disk: Duration,
    pub processes: Duration,
}

#[derive(Default)]
struct Sources {
    cpu: Option<Box<dyn CpuUsageSource>>,
    memory: Option<Box<dyn MemoryUsageSource>>,
    network: Option<Box<dyn NetworkCounterSource>>,
    battery: Option<Box<dyn BatterySource>>,
    disk: Option<Box<dyn DiskUsageSource>>,
    processes: Option<Box<dyn ProcessCpuSource>>,
    last_timing: Option<CollectorTiming>,
}

/// Runs `sample` against an optional source and records its duration.
fn timed<S: ?Sized, T>(
    source: &mut Option<Box<S>>,
    slot: &mut Duration,
    sample: impl FnOnce(&mut S) -> T,
) -> Option<T> {
    let source = source.as_deref_mut()?;
    let start = Instant::now();
    let value = sample(source);
    *slot = start.elapsed();
    Some(value)
}

impl Sources {
    fn collect_pass(&mut self) -> StatsSnapshot {
        let total_start = Instant::now();
        let mut timing = CollectorTiming::default();
        let mut metrics = BTreeMap::new();

        let readings = [
            (
                MetricKind::CpuUsage,
                timed(&mut self.cpu, &mut timing.cpu, |s| s.sample_cpu()),
            ),
            (
                MetricKind::MemoryUsage,
                timed(&mut self.memory, &mut timing.memory, |s| s.sample_memory()),
            ),
            (
                MetricKind::NetworkThroughput,
                timed(&mut self.network, &mut timing.network, |s| {
                    s.sample_network()
                }),
            ),
            (
                MetricKind::BatteryStatus,
                timed(&mut self.battery, &mut timing.battery, |s| {
                    s.sample_battery()
                }),
            ),
            (
                MetricKind::DiskUsage,
                timed(&mut self.disk, &mut timing.disk, |s| s.sample_disk()),
            ),
        ];
        for (kind, value) in readings {
            if let Some(value) = value.flatten() {
                metrics.insert(kind, value);
            }
        }

        let processes = timed(&mut self.processes, &mut timing.processes, |s| {
            s.sample_processes()
        })
        .unwrap_or_default();

        timing.total = total_start.elapsed();
        trace!(?timing, metrics = metrics.len(), "collection pass finished");
        self.last_timing = Some(timing);

        StatsSnapshot::new(Utc::now(), metrics).with_process_cpu_usages(processes)
    }
}

/// Aggregating collector over one source per metric kind.
///
/// Kinds whose source is missing or returns no signal are omitted from the
/// snapshot. A pass only fails when the worker thread itself fails.
#[derive(Clone, Default)]
pub struct SystemStatsCollector {
    sources: Arc<Mutex<Sources>>,
}

impl SystemStatsCollector {
    /// Creates a collector without any sources; every snapshot is empty.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the Linux source set.
    ///
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `proc_path` - Base path to proc filesystem (usually "/proc")
    /// * `sys_path` - Base path to sysfs (usually "/sys")
    /// * `volume` - Mount point reported as disk usage (usually "/")
    pub fn procfs<F>(
        fs: F,
        proc_path: impl Into<PathBuf>,
        sys_path: impl Into<PathBuf>,
        volume: impl Into<PathBuf>,
    ) -> Self
    where
        F: FileSystem + Clone + 'static,
    {
        let proc_path = proc_path.into();
        let sys_path = sys_path.into();
        Self::new()
            .with_cpu(ProcCpuSource::new(fs.clone(), &proc_path))
            .with_memory(ProcMemorySource::new(fs.clone(), &proc_path))
            .with_network(ProcNetworkSource::new(fs.clone(), &proc_path, &sys_path))
            .with_battery(SysBatterySource::new(fs.clone(), &sys_path))
            .with_disk(VolumeDiskSource::new(volume))
            .with_processes(ProcProcessSource::new(fs, &proc_path))
    }

    fn replace(self, update: impl FnOnce(&mut Sources)) -> Self {
        {
            let mut sources = self.sources.lock().unwrap_or_else(PoisonError::into_inner);
            update(&mut sources);
        }
        self
    }

    pub fn with_cpu(self, source: impl CpuUsageSource + 'static) -> Self {
        self.replace(|s| s.cpu = Some(Box::new(source)))
    }

    pub fn with_memory(self, source: impl MemoryUsageSource + 'static) -> Self {
        self.replace(|s| s.memory = Some(Box::new(source)))
    }

    pub fn with_network(self, source: impl NetworkCounterSource + 'static) -> Self {
        self.replace(|s| s.network = Some(Box::new(source)))
    }

    pub fn with_battery(self, source: impl BatterySource + 'static) -> Self {
        self.replace(|s| s.battery = Some(Box::new(source)))
    }

    pub fn with_disk(self, source: impl DiskUsageSource + 'static) -> Self {
        self.replace(|s| s.disk = Some(Box::new(source)))
    }

    pub fn with_processes(self, source: impl ProcessCpuSource + 'static) -> Self {
        self.replace(|s| s.processes = Some(Box::new(source)))
    }

    /// Returns timing information from the last pass.
    pub fn last_timing(&self) -> Option<CollectorTiming> {
        self.sources
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last_timing
            .clone()
    }
}

impl StatsCollector for SystemStatsCollector {
    async fn collect(&self) -> Result<StatsSnapshot, CollectError> {
        let sources = Arc::clone(&self.sources);
        tokio::task::spawn_blocking(move || {
            sources
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .collect_pass()
        })
        .await
        .map_err(|e| CollectError::Join(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::MockFs;
    use crate::model::{MetricValue, ProcessCpuUsage};

    struct Fixed<T>(T);

    impl CpuUsageSource for Fixed<Option<MetricValue>> {
        fn sample_cpu(&mut self) -> Option<MetricValue> {
            self.0
        }
    }

    impl MemoryUsageSource for Fixed<Option<MetricValue>> {
        fn sample_memory(&mut self) -> Option<MetricValue> {
            self.0
        }
    }

    impl NetworkCounterSource for Fixed<Option<MetricValue>> {
        fn sample_network(&mut self) -> Option<MetricValue> {
            self.0
        }
    }

    impl BatterySource for Fixed<Option<MetricValue>> {
        fn sample_battery(&mut self) -> Option<MetricValue> {
            self.0
        }
    }

    impl DiskUsageSource for Fixed<Option<MetricValue>> {
        fn sample_disk(&mut self) -> Option<MetricValue> {
            self.0
        }
    }

    impl ProcessCpuSource for Fixed<Vec<ProcessCpuUsage>> {
        fn sample_processes(&mut self) -> Vec<ProcessCpuUsage> {
            self.0.clone()
        }
    }

    struct Panicking;

    impl CpuUsageSource for Panicking {
        fn sample_cpu(&mut self) -> Option<MetricValue> {
            panic!("sensor exploded")
        }
    }

    fn stub_collector(cpu: Option<MetricValue>) -> SystemStatsCollector {
        SystemStatsCollector::new()
            .with_cpu(Fixed(cpu))
            .with_memory(Fixed(Some(MetricValue::gigabytes(8.0, 16.0))))
            .with_network(Fixed(Some(MetricValue::megabytes_per_second(1.5, 0.75))))
            .with_battery(Fixed(Some(MetricValue::percent(88.0))))
            .with_disk(Fixed(Some(MetricValue::gigabytes(512.0, 1024.0))))
    }

    #[tokio::test]
    async fn test_omits_unavailable_cpu_and_keeps_other_metrics() {
        let snapshot = stub_collector(None).collect().await.unwrap();

        assert!(snapshot.metric(MetricKind::CpuUsage).is_none());
        assert_eq!(
            snapshot.metric(MetricKind::MemoryUsage),
            Some(&MetricValue::gigabytes(8.0, 16.0))
        );
        assert_eq!(
            snapshot.metric(MetricKind::NetworkThroughput),
            Some(&MetricValue::megabytes_per_second(1.5, 0.75))
        );
        assert_eq!(
            snapshot.metric(MetricKind::BatteryStatus),
            Some(&MetricValue::percent(88.0))
        );
        assert_eq!(
            snapshot.metric(MetricKind::DiskUsage),
            Some(&MetricValue::gigabytes(512.0, 1024.0))
        );
    }

    #[tokio::test]
    async fn test_all_sources_unavailable_gives_empty_snapshot() {
        let collector = SystemStatsCollector::new()
            .with_cpu(Fixed(None))
            .with_memory(Fixed(None))
            .with_network(Fixed(None))
            .with_battery(Fixed(None))
            .with_disk(Fixed(None));

        let snapshot = collector.collect().await.unwrap();
        assert!(snapshot.metrics.is_empty());
        assert!(snapshot.process_cpu_usages.is_empty());
    }

    #[tokio::test]
    async fn test_includes_process_usages() {
        let usages = vec![
            ProcessCpuUsage::new("Xcode", 21.5),
            ProcessCpuUsage::new("Chrome Helper", 7.8),
        ];
        let collector = SystemStatsCollector::new().with_processes(Fixed(usages.clone()));

        let snapshot = collector.collect().await.unwrap();
        assert_eq!(snapshot.process_cpu_usages, usages);
    }

    #[tokio::test]
    async fn test_records_timing() {
        let collector = stub_collector(Some(MetricValue::percent(5.0)));
        assert!(collector.last_timing().is_none());

        collector.collect().await.unwrap();
        let timing = collector.last_timing().unwrap();
        assert!(timing.total >= timing.cpu);
    }

    #[tokio::test]
    async fn test_worker_panic_is_join_error() {
        let collector = SystemStatsCollector::new().with_cpu(Panicking);
        let err = collector.collect().await.unwrap_err();
        assert!(matches!(err, CollectError::Join(_)));

        // The poisoned lock is recovered on the next pass.
        let collector = collector.with_cpu(Fixed(Some(MetricValue::percent(1.0))));
        assert!(collector.collect().await.is_ok());
    }

    #[tokio::test]
    async fn test_procfs_source_set() {
        let fs = MockFs::typical_system();
        let collector =
            SystemStatsCollector::procfs(fs.clone(), "/proc", "/sys", "/nonexistent/volume");

        let first = collector.collect().await.unwrap();
        // CPU needs a baseline; disk volume is missing.
        assert!(first.metric(MetricKind::CpuUsage).is_none());
        assert!(first.metric(MetricKind::DiskUsage).is_none());
        assert!(first.metric(MetricKind::MemoryUsage).is_some());
        assert_eq!(
            first.metric(MetricKind::NetworkThroughput),
            Some(&MetricValue::megabytes_per_second(100.0, 40.0))
        );
        assert_eq!(
            first.metric(MetricKind::BatteryStatus),
            Some(&MetricValue::percent(87.0))
        );
        assert!(first.process_cpu_usages.is_empty());

        fs.set_cpu_times(10500, 80500);
        let second = collector.collect().await.unwrap();
        let cpu = second.metric(MetricKind::CpuUsage).unwrap();
        assert!((cpu.primary_value - 50.0).abs() < 1e-9);
    }
}
