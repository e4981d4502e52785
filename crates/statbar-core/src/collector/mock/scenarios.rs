//! Pre-built mock filesystem scenarios for testing.
//!
//! These scenarios provide realistic `/proc` and `/sys` states
//! for testing the sources and the aggregating collector.

use super::filesystem::MockFs;

/// `/proc/net/dev` header lines.
pub const NET_DEV_HEADER: &str = "\
Inter-|   Receive                                                |  Transmit
 face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
";

/// Builds a `/proc/stat` process line with the given utime/stime.
pub fn proc_stat_line(pid: u32, comm: &str, utime: u64, stime: u64) -> String {
    format!(
        "{pid} ({comm}) S 1 {pid} {pid} 0 -1 4194304 100 0 0 0 {utime} {stime} 0 0 20 0 1 0 12345 12345678 100 18446744073709551615 0 0 0 0 0 0 0 0 0 0 0 0 17 0 0 0 0 0 0 0 0 0 0 0 0 0 0"
    )
}

/// Builds one `/proc/net/dev` interface line.
pub fn net_dev_line(interface: &str, rx_bytes: u64, tx_bytes: u64) -> String {
    format!(
        "{interface:>6}: {rx_bytes} 1000 0 0 0 0 0 0 {tx_bytes} 1000 0 0 0 0 0 0\n"
    )
}

impl MockFs {
    /// Creates a typical laptop with four CPUs, one wired and one idle
    /// wireless interface, a battery and a few processes.
    pub fn typical_system() -> Self {
        let fs = Self::new();

        fs.add_file(
            "/proc/meminfo",
            "\
MemTotal:       16384000 kB
MemFree:         8192000 kB
MemAvailable:   12000000 kB
Buffers:          512000 kB
Cached:          2048000 kB
SwapCached:            0 kB
SwapTotal:       4096000 kB
SwapFree:        4096000 kB
",
        );
        fs.set_cpu_times(10000, 80000);

        fs.set_net_dev(&[
            ("lo", 12345678, 12345678),
            ("eth0", 104857600, 41943040),
            ("wlan0", 5242880, 1048576),
        ]);
        fs.add_file("/sys/class/net/lo/operstate", "unknown\n");
        fs.add_file("/sys/class/net/eth0/operstate", "up\n");
        fs.add_file("/sys/class/net/wlan0/operstate", "down\n");

        fs.add_file("/sys/class/power_supply/BAT0/type", "Battery\n");
        fs.add_file("/sys/class/power_supply/BAT0/present", "1\n");
        fs.add_file("/sys/class/power_supply/BAT0/capacity", "87\n");
        fs.add_file("/sys/class/power_supply/AC/type", "Mains\n");
        fs.add_file("/sys/class/power_supply/AC/online", "1\n");

        fs.add_process("/proc", 1, &proc_stat_line(1, "systemd", 100, 50));
        fs.add_process("/proc", 1000, &proc_stat_line(1000, "bash", 10, 5));
        fs.add_process(
            "/proc",
            1001,
            &proc_stat_line(1001, "Web Content", 5000, 1000),
        );

        fs
    }

    /// A desktop: same as [`MockFs::typical_system`] without a battery.
    pub fn desktop_system() -> Self {
        let fs = Self::typical_system();
        fs.remove("/sys/class/power_supply/BAT0");
        fs
    }

    /// Rewrites `/proc/stat` with four identical CPUs.
    ///
    /// `busy` is split as user/system, `idle` goes to the idle column.
    pub fn set_cpu_times(&self, busy: u64, idle: u64) {
        let line = |label: &str, div: u64| {
            let user = busy / div * 3 / 4;
            let system = busy / div - user;
            format!("{label} {user} 0 {system} {} 0 0 0 0 0 0\n", idle / div)
        };
        let mut content = line("cpu ", 1);
        for cpu in 0..4 {
            content.push_str(&line(&format!("cpu{cpu}"), 4));
        }
        content.push_str("ctxt 500000\nbtime 1700000000\n");
        self.add_file("/proc/stat", content);
    }

    /// Rewrites `/proc/net/dev` with the given `(interface, rx, tx)` counters.
    pub fn set_net_dev(&self, interfaces: &[(&str, u64, u64)]) {
        let mut content = NET_DEV_HEADER.to_string();
        for (name, rx, tx) in interfaces {
            content.push_str(&net_dev_line(name, *rx, *tx));
        }
        self.add_file("/proc/net/dev", content);
    }
}
