//! Contracts toward the engine's surroundings.
//!
//! Notifications are fire-and-forget: the engine logs their failures and
//! never rolls back game state over them. Snapshots are opportunistic. The
//! ledger is the only collaborator whose answers steer the game, and even
//! there the engine tolerates the check-then-debit race by re-validating at
//! debit time.

use std::time::Duration;

use async_trait::async_trait;

use crate::game::{Game, HandRank, LegalAction, Round, Settlement};
use crate::session::GameKey;

/// Result of a debit attempt against the external ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebitOutcome {
    Applied,
    /// The balance moved since the caller's check; nothing was taken.
    Insufficient { available: i64 },
}

#[async_trait]
pub trait LedgerPort: Send + Sync {
    async fn balance(&self, player_id: &str) -> anyhow::Result<i64>;
    /// Must re-validate against the live balance; never assumes the
    /// caller's earlier read still holds.
    async fn debit(&self, player_id: &str, amount: i64) -> anyhow::Result<DebitOutcome>;
    async fn credit(&self, player_id: &str, amount: i64) -> anyhow::Result<()>;
}

#[async_trait]
pub trait NotificationPort: Send + Sync {
    /// Asks `player_id` to act, listing only the actions currently legal
    /// for them, with the deadline the turn timer was armed for.
    async fn prompt_turn(
        &self,
        key: &GameKey,
        game: &Game,
        player_id: &str,
        legal: &[LegalAction],
        deadline: Duration,
    ) -> anyhow::Result<()>;

    async fn announce_round_advance(&self, key: &GameKey, game: &Game, round: Round)
        -> anyhow::Result<()>;

    async fn announce_showdown(
        &self,
        key: &GameKey,
        game: &Game,
        ranking: &[(String, HandRank)],
    ) -> anyhow::Result<()>;

    async fn announce_hand_end(
        &self,
        key: &GameKey,
        game: &Game,
        settlement: &Settlement,
    ) -> anyhow::Result<()>;

    /// Invitation to join a table, one per invitee.
    async fn prompt_invite(
        &self,
        key: &GameKey,
        host_name: &str,
        invitee_id: &str,
        stake: i64,
        deadline: Duration,
    ) -> anyhow::Result<()>;

    /// Post-hand vote on whether to deal another.
    async fn prompt_continuation(
        &self,
        key: &GameKey,
        player_id: &str,
        stake: i64,
        deadline: Duration,
    ) -> anyhow::Result<()>;

    /// The table shut down without a hand being played out; refunds listed.
    async fn announce_cancelled(
        &self,
        key: &GameKey,
        reason: &str,
        refunds: &[(String, i64)],
    ) -> anyhow::Result<()>;
}

#[async_trait]
pub trait PersistencePort: Send + Sync {
    /// Called after every state-changing operation. Failures are logged by
    /// the engine, never fatal to in-memory play.
    async fn save_snapshot(&self, key: &GameKey, game: &Game) -> anyhow::Result<()>;
    async fn clear_snapshot(&self, key: &GameKey) -> anyhow::Result<()>;
}

/// Resolves a player id to a display name. Names are decoration; identity
/// is always the id.
#[async_trait]
pub trait NamingPort: Send + Sync {
    async fn display_name(&self, player_id: &str) -> anyhow::Result<String>;
}
