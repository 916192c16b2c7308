//! Trading logic: mode parameters, portfolio resolution, sizing, signals,
//! risk checks, and the orchestrating controller.

mod controller;
mod modes;
mod portfolio;
mod position_sizer;
mod risk;
mod signals;

pub use controller::{ControllerConfig, CycleInput, StrategyController};
pub use modes::{ModeParameters, ModeTable, TradingMode};
pub use portfolio::{OverrideSettings, PortfolioResolver};
pub use position_sizer::{PositionSizer, SizingOutcome};
pub use risk::{RiskManager, RiskVerdict};
pub use signals::{SignalConfig, SignalGenerator};
