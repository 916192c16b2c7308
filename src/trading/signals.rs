//! Entry/exit signal generation from indicator and level agreement.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::analysis::{nearest_resistance, nearest_support, IndicatorSnapshot};
use crate::models::{PriceBar, PriceLevel, Signal, SignalDirection, Vote};

use super::ModeParameters;

/// Proximity thresholds for the level and band votes, as fractions of price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalConfig {
    pub support_proximity_pct: Decimal,
    pub resistance_proximity_pct: Decimal,
    pub band_proximity_pct: Decimal,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            support_proximity_pct: dec!(0.02),
            resistance_proximity_pct: dec!(0.015),
            band_proximity_pct: dec!(0.01),
        }
    }
}

/// Combines indicator outputs and level proximity into vote-based signals.
pub struct SignalGenerator {
    config: SignalConfig,
}

impl SignalGenerator {
    pub fn new(config: SignalConfig) -> Self {
        Self { config }
    }

    /// Evaluate entry conditions. Holds outright when indicators are not
    /// ready or volatility exceeds the mode threshold.
    pub fn entry_signal(
        &self,
        snapshot: &IndicatorSnapshot,
        levels: &[PriceLevel],
        bar: &PriceBar,
        params: &ModeParameters,
    ) -> Signal {
        if !snapshot.ready {
            return Signal::hold();
        }
        if snapshot.volatility > params.volatility_threshold {
            debug!(
                volatility = snapshot.volatility,
                threshold = params.volatility_threshold,
                "Volatility gate suppressing entries"
            );
            return Signal::hold();
        }

        let close = bar.close;
        let mut votes = Vec::new();

        if let Some(level) = nearest_support(levels, close) {
            if proximity(close, level.price) <= self.config.support_proximity_pct {
                votes.push(Vote::NearSupport);
            }
        }
        if snapshot.rsi <= params.rsi_oversold {
            votes.push(Vote::RsiOversold);
        }
        if snapshot.bollinger_lower > Decimal::ZERO
            && close <= snapshot.bollinger_lower * (Decimal::ONE + self.config.band_proximity_pct)
        {
            votes.push(Vote::LowerBandTouch);
        }
        if bar.volume >= params.min_volume {
            votes.push(Vote::VolumeAbove);
        }

        Signal::from_votes(SignalDirection::EnterLong, votes, params.confirmations)
    }

    /// Evaluate exit conditions. The volatility gate does not apply here:
    /// getting out stays possible in any regime.
    pub fn exit_signal(
        &self,
        snapshot: &IndicatorSnapshot,
        levels: &[PriceLevel],
        bar: &PriceBar,
        params: &ModeParameters,
    ) -> Signal {
        if !snapshot.ready {
            return Signal::hold();
        }

        let close = bar.close;
        let mut votes = Vec::new();

        if let Some(level) = nearest_resistance(levels, close) {
            if proximity(close, level.price) <= self.config.resistance_proximity_pct {
                votes.push(Vote::NearResistance);
            }
        }
        if snapshot.rsi >= params.rsi_overbought {
            votes.push(Vote::RsiOverbought);
        }
        if snapshot.bollinger_upper > Decimal::ZERO
            && close >= snapshot.bollinger_upper * (Decimal::ONE - self.config.band_proximity_pct)
        {
            votes.push(Vote::UpperBandTouch);
        }
        if bar.volume >= params.min_volume {
            votes.push(Vote::VolumeAbove);
        }

        Signal::from_votes(SignalDirection::ExitLong, votes, params.confirmations)
    }
}

/// Fractional distance between the current price and a level.
fn proximity(price: Decimal, level_price: Decimal) -> Decimal {
    if price.is_zero() {
        return Decimal::MAX;
    }
    (price - level_price).abs() / price
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LevelKind;
    use crate::trading::{ModeTable, TradingMode};
    use chrono::{TimeZone, Utc};

    fn ready_snapshot() -> IndicatorSnapshot {
        IndicatorSnapshot {
            rsi: 50.0,
            bollinger_upper: dec!(110),
            bollinger_mid: dec!(100),
            bollinger_lower: dec!(90),
            sma_short: dec!(100),
            sma_long: dec!(100),
            volatility: 0.002,
            ready: true,
        }
    }

    fn bar(close: Decimal, volume: Decimal) -> PriceBar {
        PriceBar {
            timestamp: Utc.with_ymd_and_hms(2024, 6, 3, 14, 30, 0).unwrap(),
            open: close,
            high: close,
            low: close,
            close,
            volume,
        }
    }

    fn support_at(price: Decimal) -> Vec<PriceLevel> {
        vec![PriceLevel {
            price,
            kind: LevelKind::Support,
            strength: 2,
        }]
    }

    #[test]
    fn test_not_ready_always_holds() {
        let generator = SignalGenerator::new(SignalConfig::default());
        let params = ModeTable::builtin().params(TradingMode::UltraSafe);
        let mut snapshot = ready_snapshot();
        snapshot.ready = false;
        snapshot.rsi = 5.0; // would otherwise scream buy

        let signal = generator.entry_signal(
            &snapshot,
            &support_at(dec!(99.9)),
            &bar(dec!(100), dec!(50000)),
            &params,
        );
        assert_eq!(signal.direction, SignalDirection::Hold);
        assert!(signal.votes.is_empty());
    }

    #[test]
    fn test_ultra_safe_entry_needs_all_three() {
        let generator = SignalGenerator::new(SignalConfig::default());
        let params = ModeTable::builtin().params(TradingMode::UltraSafe);

        let mut snapshot = ready_snapshot();
        snapshot.rsi = 28.0; // oversold
        snapshot.bollinger_lower = dec!(80); // far away, no band vote

        // Price 0.3% above support, volume above minimum: three votes
        let signal = generator.entry_signal(
            &snapshot,
            &support_at(dec!(99.70)),
            &bar(dec!(100), dec!(50000)),
            &params,
        );
        assert_eq!(signal.direction, SignalDirection::EnterLong);
        assert_eq!(
            signal.votes,
            vec![Vote::NearSupport, Vote::RsiOversold, Vote::VolumeAbove]
        );
    }

    #[test]
    fn test_two_votes_hold_in_ultra_safe_but_enter_in_conservative() {
        let generator = SignalGenerator::new(SignalConfig::default());
        let table = ModeTable::builtin();

        let mut snapshot = ready_snapshot();
        snapshot.rsi = 28.0;
        snapshot.bollinger_lower = dec!(80);

        // No support nearby: RSI + volume only
        let b = bar(dec!(100), dec!(50000));
        let ultra = generator.entry_signal(
            &snapshot,
            &[],
            &b,
            &table.params(TradingMode::UltraSafe),
        );
        assert_eq!(ultra.direction, SignalDirection::Hold);

        let cons = generator.entry_signal(
            &snapshot,
            &[],
            &b,
            &table.params(TradingMode::Conservative),
        );
        assert_eq!(cons.direction, SignalDirection::EnterLong);
    }

    #[test]
    fn test_volatility_gate_blocks_entries_not_exits() {
        let generator = SignalGenerator::new(SignalConfig::default());
        let params = ModeTable::builtin().params(TradingMode::Conservative);

        let mut snapshot = ready_snapshot();
        snapshot.volatility = 0.08; // above every mode threshold
        snapshot.rsi = 20.0;

        let b = bar(dec!(100), dec!(50000));
        let entry = generator.entry_signal(&snapshot, &support_at(dec!(99.9)), &b, &params);
        assert_eq!(entry.direction, SignalDirection::Hold);

        // Exit side still evaluates
        snapshot.rsi = 80.0;
        let levels = vec![PriceLevel {
            price: dec!(100.5),
            kind: LevelKind::Resistance,
            strength: 2,
        }];
        let exit = generator.exit_signal(&snapshot, &levels, &b, &params);
        assert_eq!(exit.direction, SignalDirection::ExitLong);
    }

    #[test]
    fn test_low_volume_withholds_confirmation() {
        let generator = SignalGenerator::new(SignalConfig::default());
        let params = ModeTable::builtin().params(TradingMode::UltraSafe);

        let mut snapshot = ready_snapshot();
        snapshot.rsi = 28.0;
        snapshot.bollinger_lower = dec!(80);

        // Volume below the ultra-safe minimum: only two votes
        let signal = generator.entry_signal(
            &snapshot,
            &support_at(dec!(99.70)),
            &bar(dec!(100), dec!(500)),
            &params,
        );
        assert_eq!(signal.direction, SignalDirection::Hold);
    }

    #[test]
    fn test_exit_votes_mirror_entry_conditions() {
        let generator = SignalGenerator::new(SignalConfig::default());
        let params = ModeTable::builtin().params(TradingMode::Conservative);

        let mut snapshot = ready_snapshot();
        snapshot.rsi = 75.0;
        snapshot.bollinger_upper = dec!(100.5);

        let signal = generator.exit_signal(&snapshot, &[], &bar(dec!(100), dec!(100)), &params);
        assert_eq!(signal.direction, SignalDirection::ExitLong);
        assert_eq!(
            signal.votes,
            vec![Vote::RsiOverbought, Vote::UpperBandTouch]
        );
    }
}
