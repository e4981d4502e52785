//! Battery charge from `/sys/class/power_supply`.

use std::path::{Path, PathBuf};

use crate::collector::traits::{BatterySource, FileSystem};
use crate::model::MetricValue;

/// Reports the first present battery, in name order.
pub struct SysBatterySource<F: FileSystem> {
    fs: F,
    power_supply_path: PathBuf,
}

impl<F: FileSystem> SysBatterySource<F> {
    pub fn new(fs: F, sys_path: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            power_supply_path: sys_path.into().join("class/power_supply"),
        }
    }

    fn read_trimmed(&self, dir: &Path, name: &str) -> Option<String> {
        self.fs
            .read_to_string(&dir.join(name))
            .ok()
            .map(|s| s.trim().to_string())
    }

    fn read_number(&self, dir: &Path, name: &str) -> Option<f64> {
        self.read_trimmed(dir, name)?
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
    }

    /// Charge ratio from a `<prefix>_now` / `<prefix>_full` pair.
    fn ratio(&self, dir: &Path, prefix: &str) -> Option<f64> {
        let now = self.read_number(dir, &format!("{prefix}_now"))?;
        let full = self.read_number(dir, &format!("{prefix}_full"))?;
        (full > 0.0).then(|| now / full * 100.0)
    }

    fn battery_percent(&self, dir: &Path) -> Option<f64> {
        if self.read_trimmed(dir, "type").as_deref() != Some("Battery") {
            return None;
        }
        // Absent `present` means the driver does not report it.
        if self.read_trimmed(dir, "present").as_deref() == Some("0") {
            return None;
        }
        self.read_number(dir, "capacity")
            .or_else(|| self.ratio(dir, "energy"))
            .or_else(|| self.ratio(dir, "charge"))
    }
}

impl<F: FileSystem> BatterySource for SysBatterySource<F> {
    fn sample_battery(&mut self) -> Option<MetricValue> {
        let mut supplies = self.fs.read_dir(&self.power_supply_path).ok()?;
        supplies.sort();

        supplies
            .iter()
            .find_map(|dir| self.battery_percent(dir))
            .map(|percent| MetricValue::percent(percent.clamp(0.0, 100.0)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::MockFs;

    const BAT1: &str = "/sys/class/power_supply/BAT1";

    #[test]
    fn test_reads_capacity() {
        let mut source = SysBatterySource::new(MockFs::typical_system(), "/sys");
        assert_eq!(source.sample_battery(), Some(MetricValue::percent(87.0)));
    }

    #[test]
    fn test_no_battery_on_desktop() {
        let mut source = SysBatterySource::new(MockFs::desktop_system(), "/sys");
        assert!(source.sample_battery().is_none());
    }

    #[test]
    fn test_missing_power_supply_class() {
        let mut source = SysBatterySource::new(MockFs::new(), "/sys");
        assert!(source.sample_battery().is_none());
    }

    #[test]
    fn test_energy_ratio_fallback() {
        let fs = MockFs::desktop_system();
        fs.add_file(format!("{BAT1}/type"), "Battery\n");
        fs.add_file(format!("{BAT1}/energy_now"), "30000000\n");
        fs.add_file(format!("{BAT1}/energy_full"), "40000000\n");
        let mut source = SysBatterySource::new(fs, "/sys");
        assert_eq!(source.sample_battery(), Some(MetricValue::percent(75.0)));
    }

    #[test]
    fn test_charge_ratio_is_clamped() {
        let fs = MockFs::desktop_system();
        fs.add_file(format!("{BAT1}/type"), "Battery\n");
        fs.add_file(format!("{BAT1}/charge_now"), "5200000\n");
        fs.add_file(format!("{BAT1}/charge_full"), "5000000\n");
        let mut source = SysBatterySource::new(fs, "/sys");
        assert_eq!(source.sample_battery(), Some(MetricValue::percent(100.0)));
    }

    #[test]
    fn test_skips_absent_battery() {
        let fs = MockFs::typical_system();
        fs.add_file("/sys/class/power_supply/BAT0/present", "0\n");
        fs.add_file(format!("{BAT1}/type"), "Battery\n");
        fs.add_file(format!("{BAT1}/present"), "1\n");
        fs.add_file(format!("{BAT1}/capacity"), "42\n");
        let mut source = SysBatterySource::new(fs, "/sys");
        assert_eq!(source.sample_battery(), Some(MetricValue::percent(42.0)));
    }

    #[test]
    fn test_zero_full_capacity_has_no_signal() {
        let fs = MockFs::desktop_system();
        fs.add_file(format!("{BAT1}/type"), "Battery\n");
        fs.add_file(format!("{BAT1}/energy_now"), "10\n");
        fs.add_file(format!("{BAT1}/energy_full"), "0\n");
        let mut source = SysBatterySource::new(fs, "/sys");
        assert!(source.sample_battery().is_none());
    }
}
