//! Support/resistance detection from local extrema in the bar window.
//!
//! Levels are re-derived fresh every cycle from the current window. No
//! incremental state is kept, trading determinism for simplicity.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{BarWindow, LevelKind, PriceLevel};

/// Detection parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelConfig {
    /// Bars on each side a low/high must dominate to count as an extremum.
    pub fence: usize,

    /// Fractional distance within which extrema cluster into one level.
    pub tolerance_pct: f64,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            fence: 3,
            tolerance_pct: 0.005,
        }
    }
}

/// Finds support (local lows) and resistance (local highs) levels.
pub struct LevelDetector {
    config: LevelConfig,
}

impl LevelDetector {
    pub fn new(config: LevelConfig) -> Self {
        Self { config }
    }

    /// Detect levels in the window, sorted by price ascending.
    pub fn detect(&self, window: &BarWindow) -> Vec<PriceLevel> {
        let fence = self.config.fence.max(1);
        if window.len() < 2 * fence + 1 {
            return Vec::new();
        }

        let lows = window.lows();
        let highs = window.highs();
        let len = lows.len();

        let mut support_candidates = Vec::new();
        let mut resistance_candidates = Vec::new();

        for i in fence..len - fence {
            let lo = lows[i];
            if lows[i - fence..=i + fence].iter().all(|&v| lo <= v) {
                support_candidates.push(lo);
            }
            let hi = highs[i];
            if highs[i - fence..=i + fence].iter().all(|&v| hi >= v) {
                resistance_candidates.push(hi);
            }
        }

        let mut levels = cluster(&support_candidates, self.config.tolerance_pct, LevelKind::Support);
        levels.extend(cluster(
            &resistance_candidates,
            self.config.tolerance_pct,
            LevelKind::Resistance,
        ));
        levels.sort_by(|a, b| a.price.cmp(&b.price));
        levels
    }
}

/// Group candidate prices that sit within `tolerance_pct` of the running
/// cluster mean, then merge adjacent output levels still within tolerance of
/// each other (averaging their prices, summing their strengths).
fn cluster(candidates: &[f64], tolerance_pct: f64, kind: LevelKind) -> Vec<PriceLevel> {
    if candidates.is_empty() {
        return Vec::new();
    }

    let mut sorted = candidates.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mut levels: Vec<(f64, u32)> = Vec::new();
    let mut sum = sorted[0];
    let mut count: u32 = 1;

    for &price in &sorted[1..] {
        let mean = sum / count as f64;
        if (price - mean).abs() <= mean * tolerance_pct {
            sum += price;
            count += 1;
        } else {
            levels.push((sum / count as f64, count));
            sum = price;
            count = 1;
        }
    }
    levels.push((sum / count as f64, count));

    // Merge pass: adjacent clusters can still land within tolerance
    let mut merged: Vec<(f64, u32)> = Vec::with_capacity(levels.len());
    for (price, strength) in levels {
        match merged.last_mut() {
            Some((prev_price, prev_strength))
                if (price - *prev_price).abs() <= *prev_price * tolerance_pct =>
            {
                let total = *prev_strength + strength;
                *prev_price = (*prev_price * *prev_strength as f64 + price * strength as f64)
                    / total as f64;
                *prev_strength = total;
            }
            _ => merged.push((price, strength)),
        }
    }

    merged
        .into_iter()
        .map(|(price, strength)| PriceLevel {
            price: Decimal::try_from(price).unwrap_or(Decimal::ZERO),
            kind,
            strength,
        })
        .collect()
}

/// Closest support level below the given price.
pub fn nearest_support(levels: &[PriceLevel], price: Decimal) -> Option<&PriceLevel> {
    levels
        .iter()
        .filter(|l| l.is_support() && l.price < price)
        .max_by(|a, b| a.price.cmp(&b.price))
}

/// Closest resistance level above the given price.
pub fn nearest_resistance(levels: &[PriceLevel], price: Decimal) -> Option<&PriceLevel> {
    levels
        .iter()
        .filter(|l| l.is_resistance() && l.price > price)
        .min_by(|a, b| a.price.cmp(&b.price))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PriceBar;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    /// Build a window whose lows/highs trace the given midpoints with a
    /// fixed half-range.
    fn window_from_mids(mids: &[f64]) -> BarWindow {
        let mut window = BarWindow::new(100);
        for (i, &mid) in mids.iter().enumerate() {
            let m = Decimal::try_from(mid).unwrap();
            window
                .push(PriceBar {
                    timestamp: Utc
                        .with_ymd_and_hms(2024, 6, 3, 10, 0, 0)
                        .unwrap()
                        + chrono::Duration::minutes(i as i64),
                    open: m,
                    high: m + dec!(0.5),
                    low: m - dec!(0.5),
                    close: m,
                    volume: dec!(10000),
                })
                .unwrap();
        }
        window
    }

    #[test]
    fn test_detects_valley_as_support() {
        // V-shape: descends to 95, bounces back to 100
        let mids: Vec<f64> = vec![
            100.0, 99.0, 98.0, 97.0, 96.0, 95.0, 96.0, 97.0, 98.0, 99.0, 100.0,
        ];
        let detector = LevelDetector::new(LevelConfig::default());
        let levels = detector.detect(&window_from_mids(&mids));

        let supports: Vec<_> = levels.iter().filter(|l| l.is_support()).collect();
        assert_eq!(supports.len(), 1);
        // Low of the valley bar is 95 - 0.5
        assert_eq!(supports[0].price, dec!(94.5));
    }

    #[test]
    fn test_repeated_bounces_cluster_into_one_level() {
        // Two valleys at nearly the same price
        let mids: Vec<f64> = vec![
            100.0, 98.0, 96.0, 95.0, 96.0, 98.0, 100.0, 98.0, 96.0, 95.1, 96.0, 98.0, 100.0,
        ];
        let detector = LevelDetector::new(LevelConfig::default());
        let levels = detector.detect(&window_from_mids(&mids));

        let supports: Vec<_> = levels.iter().filter(|l| l.is_support()).collect();
        assert_eq!(supports.len(), 1);
        assert_eq!(supports[0].strength, 2);
    }

    #[test]
    fn test_distant_valleys_stay_separate() {
        let mids: Vec<f64> = vec![
            100.0, 97.0, 94.0, 92.0, 90.0, 92.0, 94.0, 97.0, 100.0, 85.0, 80.0, 85.0, 90.0, 95.0,
            100.0,
        ];
        let detector = LevelDetector::new(LevelConfig::default());
        let levels = detector.detect(&window_from_mids(&mids));

        let supports: Vec<_> = levels.iter().filter(|l| l.is_support()).collect();
        assert_eq!(supports.len(), 2);
    }

    #[test]
    fn test_nearest_level_selection() {
        let levels = vec![
            PriceLevel {
                price: dec!(90),
                kind: LevelKind::Support,
                strength: 2,
            },
            PriceLevel {
                price: dec!(95),
                kind: LevelKind::Support,
                strength: 1,
            },
            PriceLevel {
                price: dec!(105),
                kind: LevelKind::Resistance,
                strength: 3,
            },
        ];

        assert_eq!(nearest_support(&levels, dec!(100)).unwrap().price, dec!(95));
        assert_eq!(
            nearest_resistance(&levels, dec!(100)).unwrap().price,
            dec!(105)
        );
        // No support above price 80
        assert!(nearest_support(&levels, dec!(80)).is_none());
    }

    #[test]
    fn test_too_few_bars_yields_no_levels() {
        let detector = LevelDetector::new(LevelConfig::default());
        let levels = detector.detect(&window_from_mids(&[100.0, 99.0, 98.0]));
        assert!(levels.is_empty());
    }
}
