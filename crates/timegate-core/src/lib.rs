//! Core time-window engine for timegate
//!
//! This crate provides:
//! - The `TimeLimited` trait: set/get/check of rule sets on token-like values
//! - The rule evaluator
//! - `AccessGuard`, which ties a token store and a clock together

mod engine;
mod evaluator;
mod time_limit;

pub use engine::*;
pub use evaluator::*;
pub use time_limit::*;

use thiserror::Error;
use timegate_store::StoreError;
use timegate_util::TokenId;

/// Core errors
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Token not found: {0}")]
    TokenNotFound(TokenId),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    TimeLimit(#[from] TimeLimitError),
}

pub type CoreResult<T> = Result<T, CoreError>;
