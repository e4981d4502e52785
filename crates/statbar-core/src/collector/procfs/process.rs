//! Per-process CPU usage from `/proc/[pid]/stat`.

use std::collections::HashMap;
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::collector::error::CollectError;
use crate::collector::procfs::parser::{ProcStat, parse_cpu_stat, parse_proc_stat};
use crate::collector::procfs::read_parsed;
use crate::collector::traits::{FileSystem, ProcessCpuSource};
use crate::model::ProcessCpuUsage;

/// Differences per-process jiffies against the machine-wide jiffies of the
/// same interval, so 100% means every logical CPU was busy with the process.
pub struct ProcProcessSource<F: FileSystem> {
    fs: F,
    proc_path: PathBuf,
    prev_total: Option<u64>,
    prev_ticks: HashMap<u32, u64>,
}

impl<F: FileSystem> ProcProcessSource<F> {
    pub fn new(fs: F, proc_path: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            proc_path: proc_path.into(),
            prev_total: None,
            prev_ticks: HashMap::new(),
        }
    }

    /// Reads one process. The display name prefers `/proc/[pid]/comm`.
    pub fn collect_process(&self, pid: u32) -> Result<ProcStat, CollectError> {
        let proc_dir = self.proc_path.join(pid.to_string());

        let stat_content = self
            .fs
            .read_to_string(&proc_dir.join("stat"))
            .map_err(|_| CollectError::ProcessGone(pid))?;
        let mut stat = parse_proc_stat(&stat_content)?;

        if let Ok(comm) = self.fs.read_to_string(&proc_dir.join("comm")) {
            let comm = comm.trim();
            if !comm.is_empty() {
                stat.comm = comm.to_string();
            }
        }

        Ok(stat)
    }

    /// Reads every numeric entry of the proc directory.
    ///
    /// Processes that disappear during collection are silently skipped.
    pub fn collect_all_processes(&self) -> Result<Vec<ProcStat>, CollectError> {
        let entries = self.fs.read_dir(&self.proc_path)?;

        let mut processes = Vec::new();
        for entry in entries {
            if let Some(name) = entry.file_name().and_then(|n| n.to_str())
                && let Ok(pid) = name.parse::<u32>()
            {
                match self.collect_process(pid) {
                    Ok(stat) => processes.push(stat),
                    Err(CollectError::ProcessGone(_)) => continue,
                    Err(e) => warn!(pid, error = %e, "failed to collect process"),
                }
            }
        }

        Ok(processes)
    }

    fn total_jiffies(&self) -> Option<u64> {
        read_parsed(&self.fs, &self.proc_path.join("stat"), parse_cpu_stat)
            .map(|stat| stat.aggregate.total())
    }
}

impl<F: FileSystem> ProcessCpuSource for ProcProcessSource<F> {
    fn sample_processes(&mut self) -> Vec<ProcessCpuUsage> {
        let Some(total) = self.total_jiffies() else {
            self.prev_total = None;
            self.prev_ticks.clear();
            return Vec::new();
        };
        let processes = match self.collect_all_processes() {
            Ok(processes) => processes,
            Err(e) => {
                debug!(error = %e, "process listing unavailable");
                self.prev_total = None;
                self.prev_ticks.clear();
                return Vec::new();
            }
        };

        let elapsed = self
            .prev_total
            .replace(total)
            .and_then(|prev| total.checked_sub(prev))
            .filter(|delta| *delta > 0);

        let mut usages = Vec::new();
        let mut ticks = HashMap::with_capacity(processes.len());
        for proc in processes {
            let curr = proc.total_ticks();
            ticks.insert(proc.pid, curr);

            let Some(elapsed) = elapsed else { continue };
            let Some(prev) = self.prev_ticks.get(&proc.pid) else {
                continue;
            };
            let delta = curr.saturating_sub(*prev);
            if delta == 0 {
                continue;
            }
            let percent = (delta as f64 / elapsed as f64 * 100.0).min(100.0);
            usages.push(ProcessCpuUsage::new(proc.comm, percent));
        }
        self.prev_ticks = ticks;

        usages.sort_by(|a, b| b.cpu_usage_percent.total_cmp(&a.cpu_usage_percent));
        usages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::MockFs;
    use crate::collector::mock::scenarios::proc_stat_line;

    #[test]
    fn test_collect_single_process() {
        let source = ProcProcessSource::new(MockFs::typical_system(), "/proc");
        let stat = source.collect_process(1001).unwrap();
        assert_eq!(stat.pid, 1001);
        assert_eq!(stat.comm, "Web Content");
        assert_eq!(stat.total_ticks(), 6000);
    }

    #[test]
    fn test_comm_file_overrides_stat_name() {
        let fs = MockFs::typical_system();
        fs.add_file("/proc/1000/comm", "zsh\n");
        let source = ProcProcessSource::new(fs, "/proc");
        assert_eq!(source.collect_process(1000).unwrap().comm, "zsh");
    }

    #[test]
    fn test_collect_all_processes() {
        let source = ProcProcessSource::new(MockFs::typical_system(), "/proc");
        let mut pids: Vec<u32> = source
            .collect_all_processes()
            .unwrap()
            .iter()
            .map(|p| p.pid)
            .collect();
        pids.sort_unstable();
        assert_eq!(pids, vec![1, 1000, 1001]);
    }

    #[test]
    fn test_vanished_process_is_gone() {
        let source = ProcProcessSource::new(MockFs::typical_system(), "/proc");
        assert!(matches!(
            source.collect_process(4242),
            Err(CollectError::ProcessGone(4242))
        ));
    }

    #[test]
    fn test_first_pass_is_empty() {
        let mut source = ProcProcessSource::new(MockFs::typical_system(), "/proc");
        assert!(source.sample_processes().is_empty());
    }

    #[test]
    fn test_share_of_machine_wide_delta() {
        let fs = MockFs::typical_system();
        let mut source = ProcProcessSource::new(fs.clone(), "/proc");
        source.sample_processes();

        // 1000 jiffies pass across all CPUs
        fs.set_cpu_times(10400, 80600);
        fs.add_process("/proc", 1, &proc_stat_line(1, "systemd", 105, 55));
        fs.add_process(
            "/proc",
            1001,
            &proc_stat_line(1001, "Web Content", 5200, 1100),
        );

        let usages = source.sample_processes();
        assert_eq!(usages.len(), 2);
        assert_eq!(usages[0].process_name, "Web Content");
        assert!((usages[0].cpu_usage_percent - 30.0).abs() < 1e-9);
        assert_eq!(usages[1].process_name, "systemd");
        assert!((usages[1].cpu_usage_percent - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_new_and_vanished_processes() {
        let fs = MockFs::typical_system();
        let mut source = ProcProcessSource::new(fs.clone(), "/proc");
        source.sample_processes();

        fs.set_cpu_times(10400, 80600);
        fs.remove("/proc/1001");
        fs.add_process("/proc", 2000, &proc_stat_line(2000, "stress", 900, 0));

        // The newcomer needs a baseline; the vanished one is dropped.
        assert!(source.sample_processes().is_empty());

        fs.set_cpu_times(10800, 81200);
        fs.add_process("/proc", 2000, &proc_stat_line(2000, "stress", 1400, 0));
        let usages = source.sample_processes();
        assert_eq!(usages.len(), 1);
        assert_eq!(usages[0].process_name, "stress");
        assert!((usages[0].cpu_usage_percent - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_stat_resets_baseline() {
        let fs = MockFs::typical_system();
        let mut source = ProcProcessSource::new(fs.clone(), "/proc");
        source.sample_processes();

        fs.remove("/proc/stat");
        assert!(source.sample_processes().is_empty());

        fs.set_cpu_times(20000, 90000);
        assert!(source.sample_processes().is_empty());
    }
}
