//! Indicator computation over the rolling bar window.
//!
//! Everything here is recomputed from scratch each cycle; the engine carries
//! no incremental state, so identical windows always produce identical
//! snapshots.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::error::EngineError;
use crate::models::BarWindow;

/// Periods and multipliers for the indicator suite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorConfig {
    pub rsi_period: usize,
    pub bollinger_period: usize,
    pub bollinger_k: f64,
    pub sma_short_period: usize,
    pub sma_long_period: usize,
    pub volatility_period: usize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            bollinger_period: 20,
            bollinger_k: 2.0,
            sma_short_period: 10,
            sma_long_period: 20,
            volatility_period: 20,
        }
    }
}

impl IndicatorConfig {
    /// Reject configurations that can never produce valid indicators.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.rsi_period == 0
            || self.bollinger_period == 0
            || self.sma_short_period == 0
            || self.volatility_period == 0
        {
            return Err(EngineError::InvalidConfig(
                "indicator periods must be positive".to_string(),
            ));
        }
        if self.sma_long_period < self.sma_short_period {
            return Err(EngineError::InvalidConfig(format!(
                "long SMA period {} is shorter than short SMA period {}",
                self.sma_long_period, self.sma_short_period
            )));
        }
        if self.bollinger_k <= 0.0 {
            return Err(EngineError::InvalidConfig(
                "bollinger_k must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// One cycle's indicator values. `ready` is false until the window holds
/// enough bars for every period; downstream logic must treat a not-ready
/// snapshot as hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub rsi: f64,
    pub bollinger_upper: Decimal,
    pub bollinger_mid: Decimal,
    pub bollinger_lower: Decimal,
    pub sma_short: Decimal,
    pub sma_long: Decimal,

    /// Sample stddev of close-to-close fractional returns.
    pub volatility: f64,

    pub ready: bool,
}

impl IndicatorSnapshot {
    pub fn not_ready() -> Self {
        Self {
            rsi: 50.0,
            bollinger_upper: Decimal::ZERO,
            bollinger_mid: Decimal::ZERO,
            bollinger_lower: Decimal::ZERO,
            sma_short: Decimal::ZERO,
            sma_long: Decimal::ZERO,
            volatility: 0.0,
            ready: false,
        }
    }
}

/// Computes the indicator snapshot for a bar window.
pub struct IndicatorEngine {
    config: IndicatorConfig,
}

impl IndicatorEngine {
    pub fn new(config: IndicatorConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &IndicatorConfig {
        &self.config
    }

    /// Minimum number of bars before snapshots become ready.
    pub fn min_bars(&self) -> usize {
        let c = &self.config;
        (c.rsi_period + 1)
            .max(c.bollinger_period)
            .max(c.sma_long_period)
            // Returns need one extra close
            .max(c.volatility_period + 1)
    }

    pub fn compute(&self, window: &BarWindow) -> IndicatorSnapshot {
        if window.len() < self.min_bars() {
            return IndicatorSnapshot::not_ready();
        }

        let closes = window.closes();
        let c = &self.config;

        let rsi = wilder_rsi(&closes, c.rsi_period);
        let sma_short = sma(&closes, c.sma_short_period);
        let sma_long = sma(&closes, c.sma_long_period);

        let bb_tail = &closes[closes.len() - c.bollinger_period..];
        let bb_mid = bb_tail.to_vec().mean();
        let bb_std = bb_tail.to_vec().std_dev();
        let bb_upper = bb_mid + c.bollinger_k * bb_std;
        let bb_lower = bb_mid - c.bollinger_k * bb_std;

        let volatility = returns_volatility(&closes, c.volatility_period);

        IndicatorSnapshot {
            rsi,
            bollinger_upper: to_decimal(bb_upper),
            bollinger_mid: to_decimal(bb_mid),
            bollinger_lower: to_decimal(bb_lower),
            sma_short: to_decimal(sma_short),
            sma_long: to_decimal(sma_long),
            volatility,
            ready: true,
        }
    }
}

fn to_decimal(value: f64) -> Decimal {
    Decimal::try_from(value).unwrap_or(Decimal::ZERO)
}

/// Simple moving average over the last `period` values.
fn sma(values: &[f64], period: usize) -> f64 {
    let tail = &values[values.len() - period..];
    tail.to_vec().mean()
}

/// RSI with Wilder smoothing. Returns the neutral 50.0 when fewer than
/// `period + 1` closes are available.
fn wilder_rsi(closes: &[f64], period: usize) -> f64 {
    if closes.len() < period + 1 {
        return 50.0;
    }

    let deltas: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();

    let mut avg_gain: f64 = deltas[..period].iter().filter(|&&d| d > 0.0).sum::<f64>() / period as f64;
    let mut avg_loss: f64 =
        deltas[..period].iter().filter(|&&d| d < 0.0).map(|d| -d).sum::<f64>() / period as f64;

    for &delta in &deltas[period..] {
        let gain = delta.max(0.0);
        let loss = (-delta).max(0.0);
        avg_gain = (avg_gain * (period as f64 - 1.0) + gain) / period as f64;
        avg_loss = (avg_loss * (period as f64 - 1.0) + loss) / period as f64;
    }

    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}

/// Sample stddev of fractional close-to-close returns over the last `period`
/// returns.
fn returns_volatility(closes: &[f64], period: usize) -> f64 {
    let returns: Vec<f64> = closes
        .windows(2)
        .filter(|w| w[0] != 0.0)
        .map(|w| (w[1] - w[0]) / w[0])
        .collect();
    if returns.len() < 2 {
        return 0.0;
    }
    let tail = if returns.len() > period {
        &returns[returns.len() - period..]
    } else {
        &returns[..]
    };
    tail.to_vec().std_dev()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PriceBar;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn window_from_closes(closes: &[f64]) -> BarWindow {
        let mut window = BarWindow::new(100);
        for (i, &close) in closes.iter().enumerate() {
            let c = Decimal::try_from(close).unwrap();
            window
                .push(PriceBar {
                    timestamp: Utc
                        .with_ymd_and_hms(2024, 6, 3, 10, 0, 0)
                        .unwrap()
                        + chrono::Duration::minutes(i as i64),
                    open: c,
                    high: c + dec!(0.1),
                    low: c - dec!(0.1),
                    close: c,
                    volume: dec!(10000),
                })
                .unwrap();
        }
        window
    }

    #[test]
    fn test_short_window_not_ready() {
        let engine = IndicatorEngine::new(IndicatorConfig::default()).unwrap();
        let window = window_from_closes(&[100.0; 10]);

        let snapshot = engine.compute(&window);
        assert!(!snapshot.ready);
        assert_eq!(snapshot.rsi, 50.0);
    }

    #[test]
    fn test_flat_prices_give_flat_bands() {
        let engine = IndicatorEngine::new(IndicatorConfig::default()).unwrap();
        let window = window_from_closes(&[50.0; 30]);

        let snapshot = engine.compute(&window);
        assert!(snapshot.ready);
        assert_eq!(snapshot.bollinger_mid, dec!(50));
        assert_eq!(snapshot.bollinger_upper, dec!(50));
        assert_eq!(snapshot.bollinger_lower, dec!(50));
        assert_eq!(snapshot.sma_short, dec!(50));
        assert_eq!(snapshot.sma_long, dec!(50));
        assert_eq!(snapshot.volatility, 0.0);
    }

    #[test]
    fn test_rsi_extremes() {
        // Monotonic rise: no losses, RSI pegs at 100
        let rising: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        assert_eq!(wilder_rsi(&rising, 14), 100.0);

        // Monotonic fall: no gains, RSI approaches 0
        let falling: Vec<f64> = (0..30).map(|i| 130.0 - i as f64).collect();
        assert!(wilder_rsi(&falling, 14) < 1.0);
    }

    #[test]
    fn test_rsi_neutral_when_insufficient() {
        let closes = vec![100.0, 101.0, 102.0];
        assert_eq!(wilder_rsi(&closes, 14), 50.0);
    }

    #[test]
    fn test_config_rejects_inverted_sma_periods() {
        let config = IndicatorConfig {
            sma_short_period: 20,
            sma_long_period: 10,
            ..IndicatorConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(EngineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_volatile_series_has_higher_volatility() {
        let engine = IndicatorEngine::new(IndicatorConfig::default()).unwrap();

        let calm: Vec<f64> = (0..30).map(|i| 100.0 + 0.01 * (i % 2) as f64).collect();
        let wild: Vec<f64> = (0..30).map(|i| 100.0 + 5.0 * (i % 2) as f64).collect();

        let calm_vol = engine.compute(&window_from_closes(&calm)).volatility;
        let wild_vol = engine.compute(&window_from_closes(&wild)).volatility;
        assert!(wild_vol > calm_vol);
    }
}
