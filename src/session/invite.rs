//! Invite and continuation-vote bookkeeping.
//!
//! An `InviteSession` is the ephemeral ballot that precedes a hand: who has
//! confirmed (and been provisionally debited), who declined, who has yet to
//! answer. The same machinery runs the continuation vote after a hand
//! settles, with nobody pre-confirmed.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};

use crate::game::{GameError, GameResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InviteResponse {
    Accept,
    Decline,
}

/// Why an invite session reached its end state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BallotOutcome {
    /// Everyone answered or timed out and enough players confirmed.
    Start(Vec<(String, String)>),
    /// Fewer than the minimum confirmed; their stakes must be refunded.
    Cancel(Vec<(String, String)>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InviteSession {
    pub host_id: String,
    /// Buy-in debited from each player on acceptance.
    pub stake: i64,
    /// (id, display name), in acceptance order. Acceptance order is seating
    /// order when the hand starts.
    pub confirmed: Vec<(String, String)>,
    pub declined: Vec<String>,
    pub pending: Vec<String>,
    pub opened_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl InviteSession {
    /// Opens a fresh invite. The host has already paid their stake and is
    /// confirmed from the outset.
    pub fn open(
        host_id: &str,
        host_name: &str,
        invitees: &[String],
        stake: i64,
        window_secs: u64,
    ) -> Self {
        let now = Utc::now();
        Self {
            host_id: host_id.to_string(),
            stake,
            confirmed: vec![(host_id.to_string(), host_name.to_string())],
            declined: Vec::new(),
            pending: invitees
                .iter()
                .filter(|id| id.as_str() != host_id)
                .cloned()
                .collect(),
            opened_at: now,
            expires_at: now + ChronoDuration::seconds(window_secs as i64),
        }
    }

    /// Opens a continuation vote after a settled hand. Every participant of
    /// the previous hand must opt in again; nobody is pre-confirmed.
    pub fn continuation(participants: &[String], stake: i64, window_secs: u64) -> Self {
        let now = Utc::now();
        Self {
            host_id: participants.first().cloned().unwrap_or_default(),
            stake,
            confirmed: Vec::new(),
            declined: Vec::new(),
            pending: participants.to_vec(),
            opened_at: now,
            expires_at: now + ChronoDuration::seconds(window_secs as i64),
        }
    }

    pub fn is_pending(&self, player_id: &str) -> bool {
        self.pending.iter().any(|id| id == player_id)
    }

    /// Records a response. The caller is responsible for the ledger side
    /// (debit on accept) before confirming. Rejects players who were never
    /// invited or have already answered.
    pub fn respond(
        &mut self,
        player_id: &str,
        display_name: &str,
        response: InviteResponse,
    ) -> GameResult<()> {
        if !self.is_pending(player_id) {
            return Err(GameError::InvalidAction {
                reason: format!("{} has no pending invite", player_id),
            });
        }
        self.pending.retain(|id| id != player_id);
        match response {
            InviteResponse::Accept => {
                self.confirmed
                    .push((player_id.to_string(), display_name.to_string()));
            }
            InviteResponse::Decline => {
                self.declined.push(player_id.to_string());
            }
        }
        Ok(())
    }

    /// Declines on a player's behalf (their response timer expired).
    pub fn force_decline(&mut self, player_id: &str) {
        if self.is_pending(player_id) {
            self.pending.retain(|id| id != player_id);
            self.declined.push(player_id.to_string());
        }
    }

    /// Treats every unanswered invite as a decline (window expiry).
    pub fn decline_remaining(&mut self) {
        self.declined.append(&mut self.pending);
    }

    pub fn resolved(&self) -> bool {
        self.pending.is_empty()
    }

    /// Consumes the resolved ballot into its outcome. Must only be called
    /// once `resolved()` holds.
    pub fn outcome(&self, minimum: usize) -> BallotOutcome {
        if self.confirmed.len() >= minimum {
            BallotOutcome::Start(self.confirmed.clone())
        } else {
            BallotOutcome::Cancel(self.confirmed.clone())
        }
    }
}
