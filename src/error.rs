//! Engine error taxonomy.
//!
//! Only configuration problems are fatal; everything the evaluation loop can
//! hit at runtime degrades to a hold or a structured outcome instead.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors produced by the strategy engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration that can never produce valid decisions. Startup-fatal.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A bar whose timestamp does not advance past the window's newest bar.
    #[error("stale bar: timestamp {got} is not after {last}")]
    StaleBar {
        got: DateTime<Utc>,
        last: DateTime<Utc>,
    },

    /// A bar with non-positive prices or inconsistent high/low.
    #[error("invalid bar: {0}")]
    InvalidBar(String),
}
