//! Converts capital base and mode parameters into a concrete order size.

use rust_decimal::Decimal;
use tracing::debug;

use super::{ModeParameters, OverrideSettings};

/// Result of sizing one proposed order.
#[derive(Debug, Clone, PartialEq)]
pub enum SizingOutcome {
    Sized {
        /// Share quantity, truncated to the instrument precision.
        quantity: Decimal,
        /// Dollar value actually committed (quantity × price).
        notional: Decimal,
    },
    /// The notional rounds to zero shares at the current price.
    InsufficientCapital,
}

/// Position sizer. Stateless; all inputs arrive per cycle.
pub struct PositionSizer {
    /// Decimal places allowed in the share quantity (0 = whole shares).
    quantity_precision: u32,
}

impl PositionSizer {
    pub fn new(quantity_precision: u32) -> Self {
        Self { quantity_precision }
    }

    /// Size an entry order.
    ///
    /// With the fixed-amount override the notional is clamped into the
    /// override's own bounds and then capped at the capital base; otherwise
    /// it scales with capital × the mode's position fraction.
    pub fn size_order(
        &self,
        capital_base: Decimal,
        params: &ModeParameters,
        overrides: &OverrideSettings,
        price: Decimal,
    ) -> SizingOutcome {
        if price <= Decimal::ZERO || capital_base <= Decimal::ZERO {
            return SizingOutcome::InsufficientCapital;
        }

        let notional = if overrides.fixed_trade_amount_enabled {
            let clamped = overrides
                .fixed_trade_amount
                .max(overrides.fixed_trade_min)
                .min(overrides.fixed_trade_max);
            // Never commit more than the capital base, even when fixed
            clamped.min(capital_base)
        } else {
            capital_base * params.position_fraction()
        };

        let quantity = (notional / price).trunc_with_scale(self.quantity_precision);
        if quantity.is_zero() {
            debug!(
                notional = %notional,
                price = %price,
                "Notional rounds to zero shares"
            );
            return SizingOutcome::InsufficientCapital;
        }

        SizingOutcome::Sized {
            quantity,
            notional: quantity * price,
        }
    }
}
