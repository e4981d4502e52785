//! Cumulative interface byte counters from `/proc/net/dev`.

use std::path::PathBuf;

use tracing::trace;

use crate::collector::procfs::parser::parse_net_dev;
use crate::collector::procfs::{BYTES_PER_MIB, read_parsed};
use crate::collector::traits::{FileSystem, NetworkCounterSource};
use crate::model::MetricValue;

/// Sums rx/tx bytes over every interface that is not loopback and not down.
pub struct ProcNetworkSource<F: FileSystem> {
    fs: F,
    net_dev_path: PathBuf,
    class_net_path: PathBuf,
}

impl<F: FileSystem> ProcNetworkSource<F> {
    pub fn new(fs: F, proc_path: impl Into<PathBuf>, sys_path: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            net_dev_path: proc_path.into().join("net/dev"),
            class_net_path: sys_path.into().join("class/net"),
        }
    }

    /// An interface without an `operstate` file counts as up.
    fn is_down(&self, interface: &str) -> bool {
        let path = self.class_net_path.join(interface).join("operstate");
        self.fs
            .read_to_string(&path)
            .is_ok_and(|state| state.trim() == "down")
    }
}

impl<F: FileSystem> NetworkCounterSource for ProcNetworkSource<F> {
    fn sample_network(&mut self) -> Option<MetricValue> {
        let devices = read_parsed(&self.fs, &self.net_dev_path, parse_net_dev)?;

        let mut rx_bytes: u64 = 0;
        let mut tx_bytes: u64 = 0;
        for dev in devices {
            if dev.interface == "lo" || self.is_down(&dev.interface) {
                trace!(interface = %dev.interface, "skipping interface");
                continue;
            }
            rx_bytes = rx_bytes.wrapping_add(dev.rx_bytes);
            tx_bytes = tx_bytes.wrapping_add(dev.tx_bytes);
        }

        Some(MetricValue::megabytes_per_second(
            rx_bytes as f64 / BYTES_PER_MIB,
            tx_bytes as f64 / BYTES_PER_MIB,
        ))
    }
}
