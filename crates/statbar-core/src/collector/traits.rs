//! Abstractions for filesystem access and per-metric sources.
//!
//! The `FileSystem` trait allows the sources to work with both the real
//! `/proc` and `/sys` trees on Linux and mock implementations for testing
//! on macOS or in CI.

use std::io;
use std::path::{Path, PathBuf};

use crate::model::{MetricValue, ProcessCpuUsage};

/// Read-only view of the files the sources parse.
pub trait FileSystem: Send + Sync {
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    fn exists(&self, path: &Path) -> bool;

    /// Full paths of the direct children of `path`, in no particular order.
    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>>;
}

/// [`FileSystem`] over `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFs;

impl RealFs {
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for RealFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        std::fs::read_dir(path)?
            .map(|entry| entry.map(|e| e.path()))
            .collect()
    }
}

// ============================================================
// Metric sources
// ============================================================
//
// One trait per metric kind. Each call is one sampling pass; `None` means
// the source had no signal this time (first sample of a delta-based source,
// missing hardware, unreadable files). Sources keep their own baselines,
// hence `&mut self`.

/// Whole-system CPU utilization in percent.
pub trait CpuUsageSource: Send {
    fn sample_cpu(&mut self) -> Option<MetricValue>;
}

/// Used and total physical memory in GiB.
pub trait MemoryUsageSource: Send {
    fn sample_memory(&mut self) -> Option<MetricValue>;
}

/// Cumulative received/transmitted counters in MiB.
///
/// These are raw counters, not rates. The rate deriver turns two
/// consecutive readings into MB/s.
pub trait NetworkCounterSource: Send {
    fn sample_network(&mut self) -> Option<MetricValue>;
}

/// Battery charge in percent.
pub trait BatterySource: Send {
    fn sample_battery(&mut self) -> Option<MetricValue>;
}

/// Used and total capacity of one volume in GiB.
pub trait DiskUsageSource: Send {
    fn sample_disk(&mut self) -> Option<MetricValue>;
}

/// Per-process CPU utilization since the previous pass.
pub trait ProcessCpuSource: Send {
    fn sample_processes(&mut self) -> Vec<ProcessCpuUsage>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest_dir() -> &'static Path {
        Path::new(env!("CARGO_MANIFEST_DIR"))
    }

    #[test]
    fn test_real_fs_reads_manifest() {
        let content = RealFs::new()
            .read_to_string(&manifest_dir().join("Cargo.toml"))
            .unwrap();
        assert!(content.contains("name = \"statbar-core\""));
    }

    #[test]
    fn test_real_fs_exists() {
        let fs = RealFs::new();
        assert!(fs.exists(&manifest_dir().join("build.rs")));
        assert!(!fs.exists(&manifest_dir().join("no-such-file.txt")));
    }

    #[test]
    fn test_real_fs_lists_sources() {
        let entries = RealFs::new().read_dir(&manifest_dir().join("src")).unwrap();
        assert!(entries.iter().any(|p| p.ends_with("model.rs")));
        assert!(entries.iter().any(|p| p.ends_with("collector")));
        assert!(RealFs::new().read_dir(&manifest_dir().join("missing")).is_err());
    }
}
