//! Shared utilities for timegate
//!
//! This crate provides:
//! - Token identifiers
//! - Wall-clock time and weekday codes
//! - The injectable `Clock` abstraction (system and fixed clocks)
//! - Default paths for config and data directories

mod clock;
mod ids;
mod paths;
mod time;

pub use clock::*;
pub use ids::*;
pub use paths::*;
pub use time::*;
