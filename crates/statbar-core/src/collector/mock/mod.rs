//! Mock filesystem and fixtures for running sources without Linux.

mod filesystem;
pub mod scenarios;

pub use filesystem::MockFs;
