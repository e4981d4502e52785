//! Point-in-time metric values and snapshots.
//!
//! A [`StatsSnapshot`] is produced fresh on every collection and never merged
//! with a previous one. The metrics map is sparse: a missing key means the
//! source had no signal this cycle, which is distinct from a present zero.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metric kinds shown in the status bar and popover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MetricKind {
    CpuUsage,
    MemoryUsage,
    NetworkThroughput,
    BatteryStatus,
    DiskUsage,
}

impl MetricKind {
    /// All kinds in display order.
    pub const ALL: [MetricKind; 5] = [
        MetricKind::CpuUsage,
        MetricKind::MemoryUsage,
        MetricKind::NetworkThroughput,
        MetricKind::BatteryStatus,
        MetricKind::DiskUsage,
    ];

    /// Human-readable title used by cards and settings.
    pub fn label(self) -> &'static str {
        match self {
            MetricKind::CpuUsage => "CPU",
            MetricKind::MemoryUsage => "Memory",
            MetricKind::NetworkThroughput => "Network",
            MetricKind::BatteryStatus => "Battery",
            MetricKind::DiskUsage => "Disk",
        }
    }

    fn serde_name(self) -> &'static str {
        match self {
            MetricKind::CpuUsage => "cpuUsage",
            MetricKind::MemoryUsage => "memoryUsage",
            MetricKind::NetworkThroughput => "networkThroughput",
            MetricKind::BatteryStatus => "batteryStatus",
            MetricKind::DiskUsage => "diskUsage",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.serde_name())
    }
}

/// Error returned when a metric kind name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMetricKind(pub String);

impl fmt::Display for UnknownMetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown metric '{}' (expected one of: cpu, mem, net, bat, disk)",
            self.0
        )
    }
}

impl std::error::Error for UnknownMetricKind {}

impl FromStr for MetricKind {
    type Err = UnknownMetricKind;

    /// Accepts the serialized name (`cpuUsage`) or a short alias (`cpu`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        let kind = match name.to_ascii_lowercase().as_str() {
            "cpu" | "cpuusage" => MetricKind::CpuUsage,
            "mem" | "memory" | "memoryusage" => MetricKind::MemoryUsage,
            "net" | "network" | "networkthroughput" => MetricKind::NetworkThroughput,
            "bat" | "battery" | "batterystatus" => MetricKind::BatteryStatus,
            "dsk" | "disk" | "diskusage" => MetricKind::DiskUsage,
            _ => return Err(UnknownMetricKind(name.to_string())),
        };
        Ok(kind)
    }
}

/// Unit carried by a [`MetricValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Unit {
    Percent,
    Gigabytes,
    MegabytesPerSecond,
}

/// One reading for a single metric kind.
///
/// Network, memory and disk carry paired quantities: download/upload for
/// network, used/total for memory and disk.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricValue {
    pub primary_value: f64,
    pub secondary_value: Option<f64>,
    pub unit: Unit,
}

impl MetricValue {
    pub fn new(primary_value: f64, secondary_value: Option<f64>, unit: Unit) -> Self {
        Self {
            primary_value,
            secondary_value,
            unit,
        }
    }

    /// Single percentage reading (CPU, battery).
    pub fn percent(value: f64) -> Self {
        Self::new(value, None, Unit::Percent)
    }

    /// Used/total pair in GiB (memory, disk).
    pub fn gigabytes(used: f64, total: f64) -> Self {
        Self::new(used, Some(total), Unit::Gigabytes)
    }

    /// Download/upload pair in MiB or MiB/s (network).
    pub fn megabytes_per_second(download: f64, upload: f64) -> Self {
        Self::new(download, Some(upload), Unit::MegabytesPerSecond)
    }
}

/// CPU usage of one process as a share of all logical CPUs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessCpuUsage {
    pub process_name: String,
    pub cpu_usage_percent: f64,
}

impl ProcessCpuUsage {
    pub fn new(process_name: impl Into<String>, cpu_usage_percent: f64) -> Self {
        Self {
            process_name: process_name.into(),
            cpu_usage_percent,
        }
    }
}

/// Immutable, timestamped set of metric readings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub metrics: BTreeMap<MetricKind, MetricValue>,
    #[serde(default, rename = "processCPUUsages")]
    pub process_cpu_usages: Vec<ProcessCpuUsage>,
}

impl StatsSnapshot {
    pub fn new(timestamp: DateTime<Utc>, metrics: BTreeMap<MetricKind, MetricValue>) -> Self {
        Self {
            timestamp,
            metrics,
            process_cpu_usages: Vec::new(),
        }
    }

    pub fn with_process_cpu_usages(mut self, usages: Vec<ProcessCpuUsage>) -> Self {
        self.process_cpu_usages = usages;
        self
    }

    /// Returns the reading for `kind`, or `None` when there was no signal.
    pub fn metric(&self, kind: MetricKind) -> Option<&MetricValue> {
        self.metrics.get(&kind)
    }
}
