//! Data model for timegate
//!
//! This crate defines the types shared between the validator, the
//! evaluator, the store and callers:
//! - Time-limit rules and rule sets, with their persisted JSON shape
//! - The token record as the store sees it
//! - Access decisions and denial reasons

mod decision;
mod types;

pub use decision::*;
pub use types::*;
