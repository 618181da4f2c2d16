//! Multi-player Texas Hold'em engine driven by discrete, asynchronous
//! player actions.
//!
//! The crate splits into a pure, synchronous game core (`game`) that owns
//! one hand's state and returns typed transitions, and an async
//! orchestrator (`engine`) that registers table sessions, talks to the
//! external ledger, sends notifications, and arms the timers that keep a
//! hand moving when a player stalls. The contracts toward the outside world
//! live in `ports`.

pub mod config;
pub mod engine;
pub mod game;
pub mod ports;
pub mod session;

pub use config::EngineConfig;
pub use engine::Engine;
pub use game::{
    Card, Deck, Game, GameError, GameResult, HandCategory, HandRank, LegalAction, Player,
    PlayerAction, Round, Settlement, Transition,
};
pub use ports::{DebitOutcome, LedgerPort, NamingPort, NotificationPort, PersistencePort};
pub use session::{GameKey, InviteResponse};
