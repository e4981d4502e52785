//! Pure parsers for the `/proc` files the sources read.
//!
//! Each parser takes the whole file content as `&str`, so the sources can be
//! tested against canned text from [`MockFs`](crate::collector::MockFs).
//! Counters that are missing or malformed read as zero; only structural
//! problems (no aggregate cpu line, no `MemTotal`, a mangled stat line) are
//! errors.

/// Error type for parsing failures.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ParseError {}

/// Column `idx` of a whitespace-split line as `u64`, zero when absent.
fn column(columns: &[&str], idx: usize) -> u64 {
    columns
        .get(idx)
        .and_then(|value| value.parse().ok())
        .unwrap_or(0)
}

// ---------------------------------------------------------------------------
// /proc/[pid]/stat
// ---------------------------------------------------------------------------

/// Fields of `/proc/[pid]/stat` used for per-process CPU accounting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcStat {
    pub pid: u32,
    pub comm: String,
    pub state: char,
    pub utime: u64,
    pub stime: u64,
}

impl ProcStat {
    /// User plus system jiffies consumed so far.
    pub fn total_ticks(&self) -> u64 {
        self.utime.saturating_add(self.stime)
    }
}

// Positions counted from the state field, which follows the closing paren.
const STAT_STATE: usize = 0;
const STAT_UTIME: usize = 11;
const STAT_STIME: usize = 12;

/// Parses one `/proc/[pid]/stat` line.
///
/// `comm` sits between the first `(` and the last `)` and may itself
/// contain both, so everything else is located relative to those two.
pub fn parse_proc_stat(content: &str) -> Result<ProcStat, ParseError> {
    let line = content.trim();
    let (head, rest) = line
        .split_once('(')
        .ok_or_else(|| ParseError::new("stat line has no command name"))?;
    let (comm, tail) = rest
        .rsplit_once(')')
        .ok_or_else(|| ParseError::new("stat line has an unterminated command name"))?;

    let pid = head
        .trim()
        .parse::<u32>()
        .map_err(|e| ParseError::new(format!("bad pid '{}': {}", head.trim(), e)))?;

    let fields: Vec<&str> = tail.split_whitespace().collect();
    if fields.len() <= STAT_STIME {
        return Err(ParseError::new(format!(
            "stat line for pid {} has {} fields after the command name",
            pid,
            fields.len()
        )));
    }
    let ticks = |idx: usize| {
        fields[idx]
            .parse::<u64>()
            .map_err(|_| ParseError::new(format!("bad tick count '{}' for pid {}", fields[idx], pid)))
    };

    Ok(ProcStat {
        pid,
        comm: comm.to_string(),
        state: fields[STAT_STATE].chars().next().unwrap_or('?'),
        utime: ticks(STAT_UTIME)?,
        stime: ticks(STAT_STIME)?,
    })
}

// ---------------------------------------------------------------------------
// /proc/meminfo
// ---------------------------------------------------------------------------

/// The `/proc/meminfo` entries memory usage is derived from, in kB.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemInfo {
    pub mem_total: u64,
    pub mem_free: u64,
    /// `None` on kernels older than 3.14, which lack `MemAvailable`.
    pub mem_available: Option<u64>,
    pub buffers: u64,
    pub cached: u64,
}

impl MemInfo {
    /// Used memory in kB: total minus available, clamped to total.
    pub fn used_kb(&self) -> u64 {
        let available = self.mem_available.unwrap_or_else(|| {
            self.mem_free
                .saturating_add(self.buffers)
                .saturating_add(self.cached)
        });
        self.mem_total.saturating_sub(available)
    }
}

pub fn parse_meminfo(content: &str) -> Result<MemInfo, ParseError> {
    let mut info = MemInfo::default();
    let mut mem_total = None;

    for (key, value) in content.lines().filter_map(|line| line.split_once(':')) {
        let kb = || column(&value.split_whitespace().collect::<Vec<_>>(), 0);
        match key.trim() {
            "MemTotal" => mem_total = Some(kb()),
            "MemFree" => info.mem_free = kb(),
            "MemAvailable" => info.mem_available = Some(kb()),
            "Buffers" => info.buffers = kb(),
            "Cached" => info.cached = kb(),
            _ => {}
        }
    }

    info.mem_total = mem_total.ok_or_else(|| ParseError::new("meminfo has no MemTotal entry"))?;
    Ok(info)
}

// ---------------------------------------------------------------------------
// /proc/stat
// ---------------------------------------------------------------------------

/// Jiffy counters for one `cpu` line of `/proc/stat`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CpuTimes {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
}

impl CpuTimes {
    fn from_columns(columns: &[&str]) -> Self {
        Self {
            user: column(columns, 0),
            nice: column(columns, 1),
            system: column(columns, 2),
            idle: column(columns, 3),
            iowait: column(columns, 4),
            irq: column(columns, 5),
            softirq: column(columns, 6),
            steal: column(columns, 7),
        }
    }

    /// Jiffies spent doing work.
    pub fn busy(&self) -> u64 {
        self.user + self.nice + self.system + self.irq + self.softirq + self.steal
    }

    /// All jiffies, busy plus idle.
    pub fn total(&self) -> u64 {
        self.busy() + self.idle + self.iowait
    }
}

/// CPU section of `/proc/stat`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CpuStat {
    /// The summed `cpu` line.
    pub aggregate: CpuTimes,
    /// Number of `cpuN` lines.
    pub logical_cpus: usize,
}

pub fn parse_cpu_stat(content: &str) -> Result<CpuStat, ParseError> {
    let mut aggregate = None;
    let mut logical_cpus = 0;

    for line in content.lines() {
        let mut columns = line.split_whitespace();
        match columns.next() {
            Some("cpu") => {
                let counters: Vec<&str> = columns.collect();
                aggregate = Some(CpuTimes::from_columns(&counters));
            }
            Some(label) if label.starts_with("cpu") => logical_cpus += 1,
            _ => {}
        }
    }

    let aggregate = aggregate.ok_or_else(|| ParseError::new("/proc/stat has no aggregate cpu line"))?;
    Ok(CpuStat {
        aggregate,
        logical_cpus,
    })
}

// ---------------------------------------------------------------------------
// /proc/net/dev
// ---------------------------------------------------------------------------

/// Byte counters of one interface.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NetDevStats {
    pub interface: String,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
}

// 8 receive columns, then 8 transmit columns.
const NET_DEV_COLUMNS: usize = 16;
const NET_DEV_RX_BYTES: usize = 0;
const NET_DEV_TX_BYTES: usize = 8;

/// Parses `/proc/net/dev`. The two header lines are recognized by their
/// `|` separators; data lines with fewer than 16 counters are ignored.
pub fn parse_net_dev(content: &str) -> Result<Vec<NetDevStats>, ParseError> {
    let devices = content
        .lines()
        .filter(|line| !line.contains('|'))
        .filter_map(|line| line.split_once(':'))
        .filter_map(|(name, counters)| {
            let columns: Vec<&str> = counters.split_whitespace().collect();
            (columns.len() >= NET_DEV_COLUMNS).then(|| NetDevStats {
                interface: name.trim().to_string(),
                rx_bytes: column(&columns, NET_DEV_RX_BYTES),
                tx_bytes: column(&columns, NET_DEV_TX_BYTES),
            })
        })
        .collect();
    Ok(devices)
}
