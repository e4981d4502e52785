//! Volume capacity from the mounted disk list.

use std::path::{Path, PathBuf};

use sysinfo::Disks;
use tracing::debug;

use crate::collector::procfs::BYTES_PER_GIB;
use crate::collector::traits::DiskUsageSource;
use crate::model::MetricValue;

/// Used/total GiB from raw byte capacities.
///
/// `available` is clamped into `0..=total` first; a non-positive total has
/// no signal.
pub fn disk_usage_from_capacity(total: i64, available: i64) -> Option<MetricValue> {
    if total <= 0 {
        return None;
    }
    let available = available.clamp(0, total);
    let used = total - available;
    Some(MetricValue::gigabytes(
        used as f64 / BYTES_PER_GIB,
        total as f64 / BYTES_PER_GIB,
    ))
}

/// Capacity of the volume mounted at (or containing) `volume`.
///
/// The disk list is refreshed on every sample so mounts that come and go are
/// picked up.
pub struct VolumeDiskSource {
    volume: PathBuf,
    disks: Disks,
}

impl VolumeDiskSource {
    pub fn new(volume: impl Into<PathBuf>) -> Self {
        Self {
            volume: volume.into(),
            disks: Disks::new_with_refreshed_list(),
        }
    }
}

/// Index of the mount point that is the longest prefix of `path`.
fn containing_mount<'a>(
    mounts: impl IntoIterator<Item = &'a Path>,
    path: &Path,
) -> Option<usize> {
    mounts
        .into_iter()
        .enumerate()
        .filter(|(_, mount)| path.starts_with(mount))
        .max_by_key(|(_, mount)| mount.components().count())
        .map(|(index, _)| index)
}

impl DiskUsageSource for VolumeDiskSource {
    fn sample_disk(&mut self) -> Option<MetricValue> {
        self.disks.refresh_list();
        let disks = self.disks.list();
        let Some(index) = containing_mount(disks.iter().map(|d| d.mount_point()), &self.volume)
        else {
            debug!(volume = %self.volume.display(), "no mounted disk holds the volume");
            return None;
        };
        let disk = &disks[index];
        disk_usage_from_capacity(
            i64::try_from(disk.total_space()).unwrap_or(i64::MAX),
            i64::try_from(disk.available_space()).unwrap_or(i64::MAX),
        )
    }
}
