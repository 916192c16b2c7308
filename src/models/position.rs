//! Open position state and the per-day risk counters.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An open long position with its risk prices fixed at entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub quantity: Decimal,
    pub entry_price: Decimal,
    pub entry_time: DateTime<Utc>,

    /// Forced-exit floor: entry_price × (1 − stop_loss_pct)
    pub stop_loss_price: Decimal,

    /// Forced-exit ceiling: entry_price × (1 + take_profit_pct)
    pub take_profit_price: Decimal,
}

impl Position {
    /// Open a position, deriving stop/take prices from the mode percentages.
    pub fn open(
        symbol: impl Into<String>,
        quantity: Decimal,
        entry_price: Decimal,
        entry_time: DateTime<Utc>,
        stop_loss_pct: Decimal,
        take_profit_pct: Decimal,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            quantity,
            entry_price,
            entry_time,
            stop_loss_price: entry_price * (Decimal::ONE - stop_loss_pct),
            take_profit_price: entry_price * (Decimal::ONE + take_profit_pct),
        }
    }

    pub fn unrealized_pnl(&self, current_price: Decimal) -> Decimal {
        (current_price - self.entry_price) * self.quantity
    }

    pub fn return_pct(&self, current_price: Decimal) -> Decimal {
        if self.entry_price.is_zero() {
            return Decimal::ZERO;
        }
        (current_price - self.entry_price) / self.entry_price
    }
}

/// Map a UTC timestamp onto the exchange-local calendar day.
///
/// `offset_hours` is the exchange offset from UTC, e.g. -5 for New York
/// (DST drift moves the counter reset by an hour, which is acceptable for
/// day-boundary accounting).
pub fn trading_day(timestamp: DateTime<Utc>, offset_hours: i32) -> NaiveDate {
    let offset = FixedOffset::east_opt(offset_hours * 3600)
        .unwrap_or_else(|| FixedOffset::east_opt(0).expect("zero offset is valid"));
    timestamp.with_timezone(&offset).date_naive()
}

/// Trade count and realized losses for one exchange-local day.
///
/// Both counters only grow within a day; they reset together when the day
/// rolls over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRiskCounters {
    pub day: NaiveDate,
    pub trade_count: u32,
    pub realized_loss: Decimal,
}

impl DailyRiskCounters {
    pub fn new(day: NaiveDate) -> Self {
        Self {
            day,
            trade_count: 0,
            realized_loss: Decimal::ZERO,
        }
    }

    /// Reset counters when the trading day advances.
    pub fn roll(&mut self, day: NaiveDate) {
        if day != self.day {
            *self = Self::new(day);
        }
    }

    pub fn record_trade(&mut self) {
        self.trade_count += 1;
    }

    /// Accumulate realized P&L; only losses grow the loss counter.
    pub fn record_pnl(&mut self, pnl: Decimal) {
        if pnl < Decimal::ZERO {
            self.realized_loss += -pnl;
        }
    }
}
