//! Per-cycle decision reporting.
//!
//! Every evaluation cycle produces exactly one `CycleReport`, whether or not
//! any order results. Reports are serializable so they can be logged as JSON
//! or shipped over a channel to an observer.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The action the controller decided on this cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Decision {
    /// Open a long position at the latest close.
    Enter {
        quantity: Decimal,
        notional: Decimal,
        price: Decimal,
    },
    /// Close the open position at the latest close.
    Exit { reason: String, price: Decimal },
    /// Do nothing this cycle.
    Hold { reason: String },
    /// An entry signal fired but a risk cap or sizing floor rejected it.
    Blocked { reason: String },
}

/// Controller state as of the end of the cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionState {
    Idle,
    InPosition,
}

/// One cycle's outcome, emitted after every evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleReport {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub decision: Decision,
    pub position_state: PositionState,
    pub capital_base: Decimal,
    /// Non-fatal anomalies, e.g. a portfolio override out of range.
    pub warnings: Vec<String>,
}

impl CycleReport {
    pub fn is_hold(&self) -> bool {
        matches!(self.decision, Decision::Hold { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_report_serializes_with_action_tag() {
        let report = CycleReport {
            symbol: "AAPL".to_string(),
            timestamp: "2024-06-03T14:30:00Z".parse().unwrap(),
            decision: Decision::Enter {
                quantity: dec!(25),
                notional: dec!(2500),
                price: dec!(100),
            },
            position_state: PositionState::InPosition,
            capital_base: dec!(10000),
            warnings: vec![],
        };

        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"action\":\"enter\""));
        assert!(json.contains("\"position_state\":\"in_position\""));

        let back: CycleReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report);
    }
}
