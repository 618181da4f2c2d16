//! Append-only log of the actions taken in the current betting round,
//! kept for in-round display and cleared when the street closes.

use super::Round;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Bet,
    Call,
    Raise,
    Check,
    Fold,
    AllIn,
}

impl ActionKind {
    pub fn label(&self) -> &'static str {
        match self {
            ActionKind::Bet => "bet",
            ActionKind::Call => "call",
            ActionKind::Raise => "raise",
            ActionKind::Check => "check",
            ActionKind::Fold => "fold",
            ActionKind::AllIn => "all-in",
        }
    }
}

/// A single accepted action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRecord {
    pub player_id: String,
    pub kind: ActionKind,
    /// Incremental amount moved into the pot by this action.
    pub amount: i64,
    /// The player's resulting total commitment this street.
    pub total_bet: i64,
    pub round: Round,
    pub timestamp: DateTime<Utc>,
}

impl ActionRecord {
    pub fn new(
        player_id: &str,
        kind: ActionKind,
        amount: i64,
        total_bet: i64,
        round: Round,
    ) -> Self {
        Self {
            player_id: player_id.to_string(),
            kind,
            amount,
            total_bet,
            round,
            timestamp: Utc::now(),
        }
    }
}
