//! Vote-based trading signals.
//!
//! Each indicator condition contributes a named vote; a signal fires only
//! when enough independent votes agree. Keeping the votes as explicit tags
//! makes the tie-break rules auditable instead of burying them in boolean
//! accumulation.

use serde::{Deserialize, Serialize};

/// A single indicator condition that agreed with a direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Vote {
    NearSupport,
    RsiOversold,
    LowerBandTouch,
    NearResistance,
    RsiOverbought,
    UpperBandTouch,
    VolumeAbove,
}

impl Vote {
    pub fn describe(&self) -> &'static str {
        match self {
            Vote::NearSupport => "price near support level",
            Vote::RsiOversold => "RSI oversold",
            Vote::LowerBandTouch => "near lower Bollinger band",
            Vote::NearResistance => "price near resistance level",
            Vote::RsiOverbought => "RSI overbought",
            Vote::UpperBandTouch => "near upper Bollinger band",
            Vote::VolumeAbove => "volume above minimum",
        }
    }
}

/// Proposed action for the current cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalDirection {
    EnterLong,
    ExitLong,
    Hold,
}

/// The generator's verdict for one cycle. Ephemeral: produced and consumed
/// within the cycle that computed it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub direction: SignalDirection,
    pub votes: Vec<Vote>,

    /// Fraction of possible votes that agreed, in [0, 1].
    pub confidence: f64,
}

/// Number of distinct conditions that can vote for one side.
const MAX_VOTES_PER_SIDE: usize = 4;

impl Signal {
    pub fn hold() -> Self {
        Self {
            direction: SignalDirection::Hold,
            votes: Vec::new(),
            confidence: 0.0,
        }
    }

    /// Build a signal from collected votes against a confirmation threshold.
    pub fn from_votes(direction: SignalDirection, votes: Vec<Vote>, confirmations: usize) -> Self {
        let confidence = votes.len() as f64 / MAX_VOTES_PER_SIDE as f64;
        if votes.len() >= confirmations {
            Self {
                direction,
                votes,
                confidence,
            }
        } else {
            Self {
                direction: SignalDirection::Hold,
                votes,
                confidence,
            }
        }
    }

    /// Human-readable justification, e.g. for decision events.
    pub fn reason(&self) -> String {
        if self.votes.is_empty() {
            return "no indicator agreement".to_string();
        }
        self.votes
            .iter()
            .map(|v| v.describe())
            .collect::<Vec<_>>()
            .join("; ")
    }
}
