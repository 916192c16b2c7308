//! Price bar model and the bounded rolling window the indicators read from.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// A single OHLCV bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub timestamp: DateTime<Utc>,

    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,

    /// Traded volume over the bar interval
    pub volume: Decimal,
}

impl PriceBar {
    /// Validate basic OHLC consistency.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.open <= Decimal::ZERO || self.close <= Decimal::ZERO {
            return Err(EngineError::InvalidBar(format!(
                "non-positive price at {}",
                self.timestamp
            )));
        }
        if self.high < self.low {
            return Err(EngineError::InvalidBar(format!(
                "high {} below low {} at {}",
                self.high, self.low, self.timestamp
            )));
        }
        if self.volume < Decimal::ZERO {
            return Err(EngineError::InvalidBar(format!(
                "negative volume at {}",
                self.timestamp
            )));
        }
        Ok(())
    }
}

/// Append-only rolling window of price bars.
///
/// Oldest bars are evicted once capacity is reached. Timestamps must be
/// strictly increasing; a bar that does not advance the clock is rejected so
/// a repeated data-feed snapshot never produces a duplicate evaluation basis.
#[derive(Debug, Clone)]
pub struct BarWindow {
    bars: VecDeque<PriceBar>,
    capacity: usize,
}

impl BarWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            bars: VecDeque::with_capacity(capacity.max(1)),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, bar: PriceBar) -> Result<(), EngineError> {
        bar.validate()?;

        if let Some(last) = self.bars.back() {
            if bar.timestamp <= last.timestamp {
                return Err(EngineError::StaleBar {
                    got: bar.timestamp,
                    last: last.timestamp,
                });
            }
        }

        if self.bars.len() == self.capacity {
            self.bars.pop_front();
        }
        self.bars.push_back(bar);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn last(&self) -> Option<&PriceBar> {
        self.bars.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PriceBar> {
        self.bars.iter()
    }

    /// Closing prices as f64, oldest first, for indicator math.
    pub fn closes(&self) -> Vec<f64> {
        self.bars
            .iter()
            .map(|b| b.close.to_f64().unwrap_or(0.0))
            .collect()
    }

    /// Bar lows as f64, oldest first.
    pub fn lows(&self) -> Vec<f64> {
        self.bars
            .iter()
            .map(|b| b.low.to_f64().unwrap_or(0.0))
            .collect()
    }

    /// Bar highs as f64, oldest first.
    pub fn highs(&self) -> Vec<f64> {
        self.bars
            .iter()
            .map(|b| b.high.to_f64().unwrap_or(0.0))
            .collect()
    }
}
