//! Common utilities used by cartan-based applications.
//!
//! Includes utils for loading and unloading toml config files, styles for
//! progress bars (to keep styling consistent), and common numeric range
//! helpers.

pub mod file;
pub mod float;
pub mod progress;
