//! statbar-core: shared library for the statbar status utility.
//!
//! Provides:
//! - `model`: metric kinds, values and snapshots
//! - `collector`: system metrics collection (procfs, sysfs, mounted disks, mocks)
//! - `rates`: cumulative network counters to per-second rates
//! - `history`: bounded per-metric trend history
//! - `controller`: polling session lifecycle and published state
//! - `fmt`: status bar and card text formatting
//! - `summary`: status bar selection, preferences and settings
//! - `view`: popover view model (cards, trends, top processes)

pub mod collector;
pub mod controller;
pub mod fmt;
pub mod history;
pub mod model;
pub mod rates;
pub mod summary;
pub mod view;

/// Crate version plus the git revision it was built from.
pub const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_SHA"), ")");
