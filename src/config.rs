//! Engine configuration, read from the environment with sane defaults.

use std::env;
use std::time::Duration;

use crate::game::constants::{
    DEFAULT_BET_AMOUNT, DEFAULT_CONTINUATION_TIMEOUT_SECS, DEFAULT_GRACE_TIMEOUT_SECS,
    DEFAULT_INVITE_TIMEOUT_SECS, DEFAULT_INVITE_WINDOW_SECS, DEFAULT_TURN_TIMEOUT_SECS,
};

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Table stake used when the host does not name one.
    pub default_bet_amount: i64,
    /// Per-invitee response window.
    pub invite_timeout: Duration,
    /// Aggregate window after which the start decision is forced.
    pub invite_window: Duration,
    /// Time the current player has to act before being auto-folded.
    pub turn_timeout: Duration,
    /// Extra window granted when a player's balance cannot cover a call.
    pub grace_timeout: Duration,
    /// Window for the post-hand continuation vote.
    pub continuation_timeout: Duration,
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Self {
            default_bet_amount: env_i64("HOLDEM_BET_AMOUNT", DEFAULT_BET_AMOUNT),
            invite_timeout: Duration::from_secs(env_u64(
                "HOLDEM_INVITE_TIMEOUT_SECS",
                DEFAULT_INVITE_TIMEOUT_SECS,
            )),
            invite_window: Duration::from_secs(env_u64(
                "HOLDEM_INVITE_WINDOW_SECS",
                DEFAULT_INVITE_WINDOW_SECS,
            )),
            turn_timeout: Duration::from_secs(env_u64(
                "HOLDEM_TURN_TIMEOUT_SECS",
                DEFAULT_TURN_TIMEOUT_SECS,
            )),
            grace_timeout: Duration::from_secs(env_u64(
                "HOLDEM_GRACE_TIMEOUT_SECS",
                DEFAULT_GRACE_TIMEOUT_SECS,
            )),
            continuation_timeout: Duration::from_secs(env_u64(
                "HOLDEM_CONTINUATION_TIMEOUT_SECS",
                DEFAULT_CONTINUATION_TIMEOUT_SECS,
            )),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_bet_amount: DEFAULT_BET_AMOUNT,
            invite_timeout: Duration::from_secs(DEFAULT_INVITE_TIMEOUT_SECS),
            invite_window: Duration::from_secs(DEFAULT_INVITE_WINDOW_SECS),
            turn_timeout: Duration::from_secs(DEFAULT_TURN_TIMEOUT_SECS),
            grace_timeout: Duration::from_secs(DEFAULT_GRACE_TIMEOUT_SECS),
            continuation_timeout: Duration::from_secs(DEFAULT_CONTINUATION_TIMEOUT_SECS),
        }
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_i64(name: &str, default: i64) -> i64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_constants() {
        let config = EngineConfig::default();
        assert_eq!(config.default_bet_amount, DEFAULT_BET_AMOUNT);
        assert_eq!(
            config.turn_timeout,
            Duration::from_secs(DEFAULT_TURN_TIMEOUT_SECS)
        );
    }
}
