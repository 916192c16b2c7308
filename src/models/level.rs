//! Support/resistance price levels derived from the rolling window.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Whether a level acted as a floor or a ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LevelKind {
    Support,
    Resistance,
}

/// A clustered price level. Recomputed fresh each cycle, never carried over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: Decimal,
    pub kind: LevelKind,

    /// Number of local extrema that clustered into this level.
    pub strength: u32,
}

impl PriceLevel {
    pub fn is_support(&self) -> bool {
        self.kind == LevelKind::Support
    }

    pub fn is_resistance(&self) -> bool {
        self.kind == LevelKind::Resistance
    }
}
