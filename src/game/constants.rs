//! Game-related constants and default configuration values.

/// Minimum confirmed players required to start a hand.
pub const MIN_PLAYERS_TO_START: usize = 2;

/// Maximum seats at a table. Nine-handed is the largest deal a single deck
/// covers (18 hole cards + 3 burns + 5 board).
pub const MAX_PLAYERS: usize = 9;

/// Hole cards per player in Texas Hold'em.
pub const HOLE_CARDS: usize = 2;

/// Community cards per street.
pub const FLOP_CARDS: usize = 3;
pub const TURN_CARDS: usize = 1;
pub const RIVER_CARDS: usize = 1;

/// Full board size.
pub const BOARD_CARDS: usize = 5;

/// Default unit stake for a table when none is configured.
pub const DEFAULT_BET_AMOUNT: i64 = 100;

/// Default timer windows (seconds).
pub const DEFAULT_INVITE_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_INVITE_WINDOW_SECS: u64 = 120;
pub const DEFAULT_TURN_TIMEOUT_SECS: u64 = 45;
pub const DEFAULT_GRACE_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONTINUATION_TIMEOUT_SECS: u64 = 60;
