//! Risk checks: daily caps on entries, stop-loss/take-profit on positions.
//!
//! A rejected proposal is a `Blocked` outcome, not an error: the controller
//! holds without alarming operators.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

use crate::models::{DailyRiskCounters, Position};

use super::ModeParameters;

/// Verdict on a proposed entry.
#[derive(Debug, Clone, PartialEq)]
pub enum RiskVerdict {
    Approved,
    Blocked { reason: String },
}

/// Which risk price a position breached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BreachKind {
    StopLoss,
    TakeProfit,
}

impl fmt::Display for BreachKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BreachKind::StopLoss => f.write_str("stop loss breached"),
            BreachKind::TakeProfit => f.write_str("take profit reached"),
        }
    }
}

/// Enforces daily caps and position risk prices. Stateless; the counters and
/// parameters arrive per cycle.
pub struct RiskManager;

impl RiskManager {
    pub fn new() -> Self {
        Self
    }

    /// Validate a proposed entry against the day's caps.
    pub fn validate_entry(
        &self,
        counters: &DailyRiskCounters,
        params: &ModeParameters,
        capital_base: Decimal,
    ) -> RiskVerdict {
        if counters.trade_count >= params.max_daily_trades {
            return RiskVerdict::Blocked {
                reason: format!(
                    "daily trade cap reached: {} of {}",
                    counters.trade_count, params.max_daily_trades
                ),
            };
        }

        let loss_ceiling = capital_base * params.max_daily_loss_pct;
        if counters.realized_loss >= loss_ceiling {
            warn!(
                realized_loss = %counters.realized_loss,
                ceiling = %loss_ceiling,
                "Daily loss ceiling reached"
            );
            return RiskVerdict::Blocked {
                reason: format!(
                    "daily loss ceiling reached: {} of {}",
                    counters.realized_loss, loss_ceiling
                ),
            };
        }

        RiskVerdict::Approved
    }

    /// Check an open position against its stored stop/take prices. A breach
    /// forces an exit regardless of what the signal votes say.
    pub fn check_position(&self, position: &Position, latest_close: Decimal) -> Option<BreachKind> {
        if latest_close <= position.stop_loss_price {
            return Some(BreachKind::StopLoss);
        }
        if latest_close >= position.take_profit_price {
            return Some(BreachKind::TakeProfit);
        }
        None
    }
}

impl Default for RiskManager {
    fn default() -> Self {
        Self::new()
    }
}
