//! Data models for bars, levels, positions, and signals.

mod bar;
mod level;
mod position;
mod signal;

pub use bar::{BarWindow, PriceBar};
pub use level::{LevelKind, PriceLevel};
pub use position::{trading_day, DailyRiskCounters, Position};
pub use signal::{Signal, SignalDirection, Vote};
