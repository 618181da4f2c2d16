//! Per-table session state: one record per table consolidating the hand in
//! progress, the pre-hand or post-hand ballot, and every armed timer, all
//! guarded by a single mutex in the engine's registry.

pub mod invite;
pub mod timer;

pub use invite::{BallotOutcome, InviteResponse, InviteSession};
pub use timer::TimerSlots;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::game::Game;

/// Strongly typed address of a table: a realm (guild, clan, workspace) and a
/// channel within it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GameKey {
    pub realm: String,
    pub channel: String,
}

impl GameKey {
    pub fn new(realm: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            realm: realm.into(),
            channel: channel.into(),
        }
    }
}

impl fmt::Display for GameKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.realm, self.channel)
    }
}

/// What the table is currently doing.
#[derive(Debug)]
pub enum SessionState {
    /// Gathering players before the first hand.
    Inviting(InviteSession),
    /// A hand is in progress.
    Playing,
    /// A hand settled; participants vote on another one.
    Voting(InviteSession),
    /// The table is done; the engine drops the session from its registry.
    Closed,
}

/// One table's complete mutable state. Exactly one action or timer callback
/// mutates a session at a time; the engine hands out `Arc<Mutex<GameSession>>`.
#[derive(Debug)]
pub struct GameSession {
    pub key: GameKey,
    /// Bumped on every accepted mutation. Timer callbacks armed under an
    /// older generation are stale and must no-op.
    pub generation: u64,
    pub state: SessionState,
    pub game: Option<Game>,
    pub timers: TimerSlots,
    /// Ids from the previous hand in button-preference order (one past the
    /// old button first). The next hand's button goes to the first entry
    /// still seated. Empty before the first hand: the host opens.
    pub button_queue: Vec<String>,
    pub bet_amount: i64,
}

impl GameSession {
    pub fn new(key: GameKey, invite: InviteSession, bet_amount: i64) -> Self {
        Self {
            key,
            generation: 0,
            state: SessionState::Inviting(invite),
            game: None,
            timers: TimerSlots::new(),
            button_queue: Vec::new(),
            bet_amount,
        }
    }

    /// Invalidates every outstanding generation-tagged timer callback.
    pub fn bump(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_display() {
        let key = GameKey::new("clan-7", "poker-night");
        assert_eq!(key.to_string(), "clan-7/poker-night");
    }

    #[test]
    fn test_generation_bump_invalidates_older() {
        let invite = InviteSession::open("h", "Host", &["a".to_string()], 100, 60);
        let mut session = GameSession::new(GameKey::new("r", "c"), invite, 100);
        let armed_under = session.generation;
        assert!(session.is_current(armed_under));
        session.bump();
        assert!(!session.is_current(armed_under));
    }
}
