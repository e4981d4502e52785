//! Linux metric sources.
//!
//! This module provides parsers and sources reading system and process
//! information from the `/proc` and `/sys` virtual filesystems, plus the
//! mounted-disk capacity source.

use std::path::Path;

use tracing::debug;

use crate::collector::traits::FileSystem;

pub mod battery;
pub mod cpu;
pub mod disk;
pub mod memory;
pub mod network;
pub mod parser;
pub mod process;

pub use battery::SysBatterySource;
pub use cpu::ProcCpuSource;
pub use disk::{VolumeDiskSource, disk_usage_from_capacity};
pub use memory::ProcMemorySource;
pub use network::ProcNetworkSource;
pub use parser::ParseError;
pub use process::ProcProcessSource;

/// Binary gigabyte; memory and disk are reported in these units.
pub const BYTES_PER_GIB: f64 = 1_073_741_824.0;
/// Binary megabyte; network counters are reported in these units.
pub const BYTES_PER_MIB: f64 = 1_048_576.0;

/// Reads and parses one file, logging and swallowing any failure.
fn read_parsed<F, T, E>(fs: &F, path: &Path, parse: impl FnOnce(&str) -> Result<T, E>) -> Option<T>
where
    F: FileSystem,
    E: std::fmt::Display,
{
    let content = match fs.read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "read failed");
            return None;
        }
    };
    match parse(&content) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "parse failed");
            None
        }
    }
}
