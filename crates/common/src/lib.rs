//! Shared infrastructure for the pegrun workspace.
//!
//! - [`debug`] - per-module logging controlled via the `DEBUG` environment
//!   variable, with `logln!`-style macros that skip formatting when the
//!   logger is disabled

pub mod debug;

pub use debug::Logger;
