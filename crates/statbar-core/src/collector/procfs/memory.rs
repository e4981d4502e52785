//! Physical memory usage from `/proc/meminfo`.

use std::path::PathBuf;

use crate::collector::procfs::parser::parse_meminfo;
use crate::collector::procfs::{BYTES_PER_GIB, read_parsed};
use crate::collector::traits::{FileSystem, MemoryUsageSource};
use crate::model::MetricValue;

pub struct ProcMemorySource<F: FileSystem> {
    fs: F,
    meminfo_path: PathBuf,
}

impl<F: FileSystem> ProcMemorySource<F> {
    pub fn new(fs: F, proc_path: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            meminfo_path: proc_path.into().join("meminfo"),
        }
    }
}

impl<F: FileSystem> MemoryUsageSource for ProcMemorySource<F> {
    fn sample_memory(&mut self) -> Option<MetricValue> {
        let info = read_parsed(&self.fs, &self.meminfo_path, parse_meminfo)?;
        if info.mem_total == 0 {
            return None;
        }
        let to_gib = |kb: u64| (kb as f64 * 1024.0) / BYTES_PER_GIB;
        Some(MetricValue::gigabytes(
            to_gib(info.used_kb()),
            to_gib(info.mem_total),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::MockFs;
    use crate::model::Unit;

    #[test]
    fn test_used_is_total_minus_available() {
        let mut source = ProcMemorySource::new(MockFs::typical_system(), "/proc");
        let value = source.sample_memory().unwrap();

        assert_eq!(value.unit, Unit::Gigabytes);
        let gib = |kb: f64| kb * 1024.0 / BYTES_PER_GIB;
        assert!((value.primary_value - gib(4384000.0)).abs() < 1e-9);
        assert!((value.secondary_value.unwrap() - gib(16384000.0)).abs() < 1e-9);
    }

    #[test]
    fn test_available_larger_than_total_clamps_to_zero() {
        let fs = MockFs::new();
        fs.add_file("/proc/meminfo", "MemTotal: 1000 kB\nMemAvailable: 2000 kB\n");
        let mut source = ProcMemorySource::new(fs, "/proc");
        assert_eq!(source.sample_memory().unwrap().primary_value, 0.0);
    }

    #[test]
    fn test_zero_total_has_no_signal() {
        let fs = MockFs::new();
        fs.add_file("/proc/meminfo", "MemTotal: 0 kB\n");
        let mut source = ProcMemorySource::new(fs, "/proc");
        assert!(source.sample_memory().is_none());
    }

    #[test]
    fn test_missing_meminfo() {
        let mut source = ProcMemorySource::new(MockFs::new(), "/proc");
        assert!(source.sample_memory().is_none());
    }
}
