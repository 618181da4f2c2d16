//! Game-related error types.
//!
//! Every validation failure is local and non-mutating: the caller gets a
//! typed result and the game state is untouched, so retries are always safe.

use std::fmt;

/// Errors that can occur during game operations.
#[derive(Debug, Clone, PartialEq)]
pub enum GameError {
    // Turn arbitration
    NotYourTurn,
    AlreadyFolded,

    // Amount validation
    InvalidAmount { amount: i64, minimum: i64 },
    BelowCurrentBet { current_bet: i64, attempted: i64 },
    CannotCheck { current_bet: i64 },
    InsufficientFunds { required: i64, available: i64 },

    // Lifecycle
    NoActiveGame,
    GameAlreadySettled,
    NotEnoughPlayers { confirmed: usize },

    // Action rejected for a reason outside the fixed taxonomy
    InvalidAction { reason: String },

    // Fatal: the hand cannot continue and contributions are refunded
    HandAborted { reason: String },
}

impl fmt::Display for GameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameError::NotYourTurn => write!(f, "Not your turn"),
            GameError::AlreadyFolded => write!(f, "You have already folded"),
            GameError::InvalidAmount { amount, minimum } => {
                write!(
                    f,
                    "Invalid amount {}. Table minimum is {}",
                    amount, minimum
                )
            }
            GameError::BelowCurrentBet {
                current_bet,
                attempted,
            } => {
                write!(
                    f,
                    "Raise to {} does not exceed the current bet of {}",
                    attempted, current_bet
                )
            }
            GameError::CannotCheck { current_bet } => {
                write!(f, "Cannot check, must call {} or raise", current_bet)
            }
            GameError::InsufficientFunds {
                required,
                available,
            } => {
                write!(
                    f,
                    "Not enough funds. Required: {}, Available: {}",
                    required, available
                )
            }
            GameError::NoActiveGame => write!(f, "No active game"),
            GameError::GameAlreadySettled => write!(f, "The hand has already been settled"),
            GameError::NotEnoughPlayers { confirmed } => {
                write!(f, "Not enough players to play: {} confirmed", confirmed)
            }
            GameError::InvalidAction { reason } => write!(f, "Invalid action: {}", reason),
            GameError::HandAborted { reason } => write!(f, "Hand aborted: {}", reason),
        }
    }
}

impl std::error::Error for GameError {}

/// Result type for game operations.
pub type GameResult<T> = Result<T, GameError>;
