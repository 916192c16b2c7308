//! Technical analysis: indicator computation and support/resistance detection.

mod indicators;
mod levels;

pub use indicators::{IndicatorConfig, IndicatorEngine, IndicatorSnapshot};
pub use levels::{nearest_resistance, nearest_support, LevelConfig, LevelDetector};
