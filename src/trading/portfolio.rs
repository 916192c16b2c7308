//! Capital-base resolution: custom override, live equity, or last-known-good.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Capital base used when no live equity has ever been observed.
pub const DEFAULT_PORTFOLIO_VALUE: Decimal = dec!(10000);

/// Lower bound for the custom portfolio override.
pub const MIN_PORTFOLIO_VALUE: Decimal = dec!(100);

/// Upper bound for the custom portfolio override.
pub const MAX_PORTFOLIO_VALUE: Decimal = dec!(1000000);

/// Operator-controlled overrides, polled once per cycle from the
/// configuration collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrideSettings {
    /// When set, the custom value replaces live account equity entirely.
    pub custom_portfolio_enabled: bool,
    pub custom_portfolio_value: Decimal,

    /// When set, order notional is pinned to `fixed_trade_amount` instead of
    /// scaling with the capital base.
    pub fixed_trade_amount_enabled: bool,
    pub fixed_trade_amount: Decimal,
    pub fixed_trade_min: Decimal,
    pub fixed_trade_max: Decimal,
}

impl Default for OverrideSettings {
    fn default() -> Self {
        Self {
            custom_portfolio_enabled: false,
            custom_portfolio_value: DEFAULT_PORTFOLIO_VALUE,
            fixed_trade_amount_enabled: false,
            fixed_trade_amount: dec!(100),
            fixed_trade_min: dec!(25),
            fixed_trade_max: dec!(10000),
        }
    }
}

/// Where the cycle's capital base came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CapitalSource {
    Override,
    LiveEquity,
    LastValid,
}

/// Outcome of one resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub capital_base: Decimal,
    pub source: CapitalSource,

    /// Set when resolution had to fall back, for the cycle's warning events.
    pub warning: Option<String>,
}

/// Resolves the effective capital base each cycle.
///
/// Never fails a cycle: an out-of-range override or missing equity degrades
/// to the last valid value, which starts at [`DEFAULT_PORTFOLIO_VALUE`].
/// The returned value is always positive.
#[derive(Debug, Clone)]
pub struct PortfolioResolver {
    last_valid: Decimal,
}

impl Default for PortfolioResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl PortfolioResolver {
    pub fn new() -> Self {
        Self {
            last_valid: DEFAULT_PORTFOLIO_VALUE,
        }
    }

    pub fn last_valid(&self) -> Decimal {
        self.last_valid
    }

    /// Resolve the capital base for one cycle.
    ///
    /// Priority: enabled override (re-validated on every read) → live
    /// equity → last valid value.
    pub fn resolve(&mut self, equity: Option<Decimal>, overrides: &OverrideSettings) -> Resolution {
        if overrides.custom_portfolio_enabled {
            let value = overrides.custom_portfolio_value;
            if (MIN_PORTFOLIO_VALUE..=MAX_PORTFOLIO_VALUE).contains(&value) {
                self.last_valid = value;
                return Resolution {
                    capital_base: value,
                    source: CapitalSource::Override,
                    warning: None,
                };
            }
            let warning = format!(
                "custom portfolio value {} outside [{}, {}], using last valid {}",
                value, MIN_PORTFOLIO_VALUE, MAX_PORTFOLIO_VALUE, self.last_valid
            );
            warn!(value = %value, last_valid = %self.last_valid, "Rejected custom portfolio value");
            return Resolution {
                capital_base: self.last_valid,
                source: CapitalSource::LastValid,
                warning: Some(warning),
            };
        }

        match equity {
            Some(value) if value > Decimal::ZERO => {
                self.last_valid = value;
                Resolution {
                    capital_base: value,
                    source: CapitalSource::LiveEquity,
                    warning: None,
                }
            }
            _ => {
                debug!(last_valid = %self.last_valid, "Account equity unavailable, using last valid");
                Resolution {
                    capital_base: self.last_valid,
                    source: CapitalSource::LastValid,
                    warning: Some(format!(
                        "account equity unavailable, using last valid {}",
                        self.last_valid
                    )),
                }
            }
        }
    }
}
