//! Trading aggressiveness modes and their parameter table.
//!
//! Every component takes `ModeParameters` as a value; the mode enum itself
//! only exists to select a row from the table, so mode checks never leak
//! into the decision logic.

use clap::ValueEnum;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::EngineError;

/// Risk/aggressiveness profile selecting a parameter set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum TradingMode {
    UltraSafe,
    Conservative,
    Aggressive,
}

impl TradingMode {
    pub fn all() -> [TradingMode; 3] {
        [
            TradingMode::UltraSafe,
            TradingMode::Conservative,
            TradingMode::Aggressive,
        ]
    }
}

impl fmt::Display for TradingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TradingMode::UltraSafe => "ultra_safe",
            TradingMode::Conservative => "conservative",
            TradingMode::Aggressive => "aggressive",
        };
        f.write_str(name)
    }
}

/// Risk and sizing parameters for one mode. Immutable once loaded; only the
/// active mode selection changes at runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeParameters {
    /// Scales the base position fraction (1.0 = no scaling).
    pub position_size_multiplier: Decimal,

    /// Base fraction of capital committed to a single position.
    pub max_position_pct: Decimal,

    pub stop_loss_pct: Decimal,
    pub take_profit_pct: Decimal,

    pub max_daily_trades: u32,

    /// Daily realized-loss ceiling as a fraction of capital base.
    pub max_daily_loss_pct: Decimal,

    pub rsi_oversold: f64,
    pub rsi_overbought: f64,

    /// Minimum bar volume for the volume confirmation vote.
    pub min_volume: Decimal,

    /// Entries are suppressed when return volatility exceeds this.
    pub volatility_threshold: f64,

    /// Votes required before a signal fires.
    pub confirmations: usize,
}

impl ModeParameters {
    pub fn validate(&self) -> Result<(), EngineError> {
        let unit = |v: Decimal| v > Decimal::ZERO && v < Decimal::ONE;
        if !unit(self.stop_loss_pct) || !unit(self.take_profit_pct) {
            return Err(EngineError::InvalidConfig(
                "stop/take percentages must be in (0, 1)".to_string(),
            ));
        }
        if !unit(self.max_daily_loss_pct) {
            return Err(EngineError::InvalidConfig(
                "max_daily_loss_pct must be in (0, 1)".to_string(),
            ));
        }
        if self.position_size_multiplier <= Decimal::ZERO || !unit(self.max_position_pct) {
            return Err(EngineError::InvalidConfig(
                "position sizing parameters must be positive".to_string(),
            ));
        }
        if self.max_daily_trades == 0 {
            return Err(EngineError::InvalidConfig(
                "max_daily_trades must be positive".to_string(),
            ));
        }
        if self.rsi_oversold >= self.rsi_overbought {
            return Err(EngineError::InvalidConfig(
                "rsi_oversold must be below rsi_overbought".to_string(),
            ));
        }
        if self.confirmations == 0 || self.confirmations > 4 {
            return Err(EngineError::InvalidConfig(
                "confirmations must be between 1 and 4".to_string(),
            ));
        }
        Ok(())
    }

    /// Effective fraction of capital committed per position.
    pub fn position_fraction(&self) -> Decimal {
        self.position_size_multiplier * self.max_position_pct
    }
}

/// The mode → parameters lookup, validated once at load and overridable by a
/// configuration collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeTable {
    ultra_safe: ModeParameters,
    conservative: ModeParameters,
    aggressive: ModeParameters,
}

impl Default for ModeTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ModeTable {
    /// The built-in parameter table.
    pub fn builtin() -> Self {
        Self {
            ultra_safe: ModeParameters {
                position_size_multiplier: dec!(1.0),
                max_position_pct: dec!(0.25),
                stop_loss_pct: dec!(0.01),
                take_profit_pct: dec!(0.015),
                max_daily_trades: 5,
                max_daily_loss_pct: dec!(0.01),
                rsi_oversold: 30.0,
                rsi_overbought: 70.0,
                min_volume: dec!(10000),
                volatility_threshold: 0.010,
                confirmations: 3,
            },
            conservative: ModeParameters {
                position_size_multiplier: dec!(1.5),
                max_position_pct: dec!(0.25),
                stop_loss_pct: dec!(0.02),
                take_profit_pct: dec!(0.03),
                max_daily_trades: 10,
                max_daily_loss_pct: dec!(0.02),
                rsi_oversold: 30.0,
                rsi_overbought: 70.0,
                min_volume: dec!(5000),
                volatility_threshold: 0.020,
                confirmations: 2,
            },
            aggressive: ModeParameters {
                position_size_multiplier: dec!(2.0),
                max_position_pct: dec!(0.25),
                stop_loss_pct: dec!(0.03),
                take_profit_pct: dec!(0.05),
                max_daily_trades: 20,
                max_daily_loss_pct: dec!(0.05),
                rsi_oversold: 35.0,
                rsi_overbought: 65.0,
                min_volume: dec!(1000),
                volatility_threshold: 0.040,
                confirmations: 2,
            },
        }
    }

    /// Parameters for a mode, by value so callers hold a per-cycle snapshot.
    pub fn params(&self, mode: TradingMode) -> ModeParameters {
        match mode {
            TradingMode::UltraSafe => self.ultra_safe.clone(),
            TradingMode::Conservative => self.conservative.clone(),
            TradingMode::Aggressive => self.aggressive.clone(),
        }
    }

    /// Replace the parameters for one mode. Invalid parameters are rejected
    /// and the previous row stays in effect.
    pub fn set(&mut self, mode: TradingMode, params: ModeParameters) -> Result<(), EngineError> {
        params.validate()?;
        match mode {
            TradingMode::UltraSafe => self.ultra_safe = params,
            TradingMode::Conservative => self.conservative = params,
            TradingMode::Aggressive => self.aggressive = params,
        }
        Ok(())
    }

    /// Validate every row, for startup checks after deserialization.
    pub fn validate(&self) -> Result<(), EngineError> {
        for mode in TradingMode::all() {
            self.params(mode).validate()?;
        }
        Ok(())
    }
}
