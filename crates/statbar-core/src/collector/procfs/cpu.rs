//! Whole-system CPU utilization from the aggregate `/proc/stat` line.

use std::path::PathBuf;

use tracing::debug;

use crate::collector::procfs::parser::{CpuTimes, parse_cpu_stat};
use crate::collector::procfs::read_parsed;
use crate::collector::traits::{CpuUsageSource, FileSystem};
use crate::model::MetricValue;

/// Busy share of the jiffies elapsed since the previous sample.
pub struct ProcCpuSource<F: FileSystem> {
    fs: F,
    stat_path: PathBuf,
    prev: Option<CpuTimes>,
}

impl<F: FileSystem> ProcCpuSource<F> {
    pub fn new(fs: F, proc_path: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            stat_path: proc_path.into().join("stat"),
            prev: None,
        }
    }
}

impl<F: FileSystem> CpuUsageSource for ProcCpuSource<F> {
    fn sample_cpu(&mut self) -> Option<MetricValue> {
        let curr = read_parsed(&self.fs, &self.stat_path, parse_cpu_stat)?.aggregate;
        let prev = self.prev.replace(curr)?;

        if curr.total() < prev.total() || curr.busy() < prev.busy() {
            debug!("cpu counters went backwards, skipping sample");
            return None;
        }
        let total = curr.total() - prev.total();
        if total == 0 {
            return None;
        }
        let busy = curr.busy() - prev.busy();
        let percent = (busy as f64 / total as f64 * 100.0).clamp(0.0, 100.0);
        Some(MetricValue::percent(percent))
    }
}
