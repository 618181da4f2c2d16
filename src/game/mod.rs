pub mod constants;
pub mod deck;
pub mod error;
pub mod hand;
pub mod history;
pub mod player;

mod actions;
mod phase;
mod showdown;

pub use actions::Transition;
pub use deck::{Card, Deck};
pub use error::{GameError, GameResult};
pub use hand::{determine_winners, evaluate_hand, HandCategory, HandRank};
pub use history::{ActionKind, ActionRecord};
pub use player::{LegalAction, Player, PlayerAction, PlayerState};
pub use showdown::Settlement;

use constants::{HOLE_CARDS, MAX_PLAYERS, MIN_PLAYERS_TO_START};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Round {
    Waiting,  // Hand not yet dealt
    PreFlop,  // Hole cards dealt, first betting round
    Flop,     // 3 community cards
    Turn,     // 4th community card
    River,    // 5th community card
    Showdown, // Terminal: reveal and settle
}

impl Round {
    /// Returns the set of rounds this round can transition to. The round
    /// only ever moves forward, except for the forced jump to Showdown
    /// (fold-out or all-in reveal).
    pub fn valid_transitions(&self) -> &[Round] {
        match self {
            Round::Waiting => &[Round::PreFlop],
            Round::PreFlop => &[Round::Flop, Round::Showdown],
            Round::Flop => &[Round::Turn, Round::Showdown],
            Round::Turn => &[Round::River, Round::Showdown],
            Round::River => &[Round::Showdown],
            Round::Showdown => &[],
        }
    }

    /// Attempt a transition. Returns an error if the target is not reachable.
    pub fn transition_to(&self, target: Round) -> GameResult<Round> {
        if self.valid_transitions().contains(&target) {
            Ok(target)
        } else {
            tracing::error!(
                "Invalid round transition: {:?} -> {:?} (valid: {:?})",
                self,
                target,
                self.valid_transitions()
            );
            Err(GameError::HandAborted {
                reason: format!("invalid round transition {:?} -> {:?}", self, target),
            })
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Round::Waiting => "waiting",
            Round::PreFlop => "preflop",
            Round::Flop => "flop",
            Round::Turn => "turn",
            Round::River => "river",
            Round::Showdown => "showdown",
        }
    }
}

/// One hand of Texas Hold'em. Owns its players, deck and board; mutated by
/// exactly one actor at a time (the session lock lives above this type).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    pub id: String,
    /// Seat order is turn order.
    pub players: Vec<Player>,
    deck: Deck,
    pub burned: Vec<Card>,
    pub board: Vec<Card>,
    pub pot: i64,
    /// Table-high street commitment.
    pub current_bet: i64,
    pub round: Round,
    pub dealer_seat: usize,
    pub current_player: usize,
    pub is_active: bool,
    pub has_raise_in_round: bool,
    /// Unit stake for this table: the buy-in and the minimum bet.
    pub bet_amount: i64,
    pub last_aggressor_seat: Option<usize>,
    /// Ordered ids of players still owing a decision this street.
    /// Invariant: always a subset of the non-folded player ids.
    pub to_act: Vec<String>,
    /// In-round action log, cleared when the street closes.
    pub actions: Vec<ActionRecord>,
}

impl Game {
    /// Starts a new hand for the given entrants (id, display name), seated
    /// in order. Each entrant's buy-in of `bet_amount` has already been
    /// provisionally debited by the caller and is routed straight into the
    /// pot.
    pub fn new(
        id: String,
        entrants: &[(String, String)],
        bet_amount: i64,
        dealer_seat: usize,
    ) -> GameResult<Self> {
        if entrants.len() < MIN_PLAYERS_TO_START {
            return Err(GameError::NotEnoughPlayers {
                confirmed: entrants.len(),
            });
        }
        if entrants.len() > MAX_PLAYERS {
            return Err(GameError::InvalidAction {
                reason: format!(
                    "table seats at most {} players, got {}",
                    MAX_PLAYERS,
                    entrants.len()
                ),
            });
        }
        if bet_amount <= 0 {
            return Err(GameError::InvalidAmount {
                amount: bet_amount,
                minimum: 1,
            });
        }

        let mut players: Vec<Player> = entrants
            .iter()
            .enumerate()
            .map(|(seat, (pid, name))| Player::new(pid.clone(), name.clone(), seat))
            .collect();

        // Buy-ins form the initial pot.
        for player in &mut players {
            player.total_contributed = bet_amount;
        }
        let pot = bet_amount * players.len() as i64;

        let dealer_seat = dealer_seat % players.len();
        let mut game = Self {
            id,
            players,
            deck: Deck::shuffled(),
            burned: Vec::new(),
            board: Vec::new(),
            pot,
            current_bet: 0,
            round: Round::Waiting,
            dealer_seat,
            current_player: 0,
            is_active: true,
            has_raise_in_round: false,
            bet_amount,
            last_aggressor_seat: None,
            to_act: Vec::new(),
            actions: Vec::new(),
        };

        game.deal_hole_cards()?;
        game.round = game.round.transition_to(Round::PreFlop)?;
        game.open_street();

        tracing::info!(
            game_id = %game.id,
            players = game.players.len(),
            stake = bet_amount,
            "New hand dealt"
        );

        Ok(game)
    }

    /// Deals one card at a time around the table, starting left of the
    /// dealer button, until everyone holds two.
    fn deal_hole_cards(&mut self) -> GameResult<()> {
        let n = self.players.len();
        for _ in 0..HOLE_CARDS {
            for offset in 1..=n {
                let seat = (self.dealer_seat + offset) % n;
                let card = self.take_card()?;
                self.players[seat].hole.push(card);
            }
        }
        Ok(())
    }

    /// Pops a card, treating exhaustion as fatal. Exhaustion cannot happen
    /// under the per-hand card budget; if it does, the hand is aborted and
    /// contributions refunded rather than risking a bad payout.
    pub(crate) fn take_card(&mut self) -> GameResult<Card> {
        self.deck.deal().ok_or_else(|| {
            tracing::error!(game_id = %self.id, "Deck exhausted mid-hand");
            GameError::HandAborted {
                reason: "deck exhausted".to_string(),
            }
        })
    }

    /// Repopulates per-street state on entry to a new betting round:
    /// everyone who can act owes an action, in seat order after the button.
    pub(crate) fn open_street(&mut self) {
        self.current_bet = 0;
        self.has_raise_in_round = false;
        self.last_aggressor_seat = None;
        self.actions.clear();
        for player in &mut self.players {
            player.reset_for_new_street();
        }

        self.to_act = self
            .seats_from(self.dealer_seat)
            .filter(|&seat| self.players[seat].can_act())
            .map(|seat| self.players[seat].id.clone())
            .collect();

        if let Some(first) = self.first_actor_after(self.dealer_seat) {
            self.current_player = first;
        }
    }

    /// Seats in turn order starting one past `seat`, wrapping once around.
    pub(crate) fn seats_from(&self, seat: usize) -> impl Iterator<Item = usize> + '_ {
        let n = self.players.len();
        (1..=n).map(move |offset| (seat + offset) % n)
    }

    /// First seat after `seat` whose player can still act.
    pub(crate) fn first_actor_after(&self, seat: usize) -> Option<usize> {
        self.seats_from(seat).find(|&s| self.players[s].can_act())
    }

    /// Next player owing an action, scanning forward from the current seat.
    /// Prefers members of `to_act`; falls back to any non-folded actor if
    /// the set is empty but betting has not closed (should not happen under
    /// the invariants).
    pub(crate) fn next_actor(&self) -> Option<usize> {
        let preferred = self.seats_from(self.current_player).find(|&s| {
            let p = &self.players[s];
            p.can_act() && self.to_act.iter().any(|id| *id == p.id)
        });

        if preferred.is_some() {
            return preferred;
        }

        tracing::warn!(
            game_id = %self.id,
            "to_act empty with betting open, falling back to next non-folded seat"
        );
        self.first_actor_after(self.current_player)
    }

    pub fn player_index(&self, player_id: &str) -> Option<usize> {
        self.players.iter().position(|p| p.id == player_id)
    }

    pub fn player(&self, player_id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == player_id)
    }

    pub fn current_player_id(&self) -> Option<&str> {
        self.players
            .get(self.current_player)
            .map(|p| p.id.as_str())
    }

    pub(crate) fn remove_from_to_act(&mut self, player_id: &str) {
        self.to_act.retain(|id| id != player_id);
    }

    pub(crate) fn contenders(&self) -> Vec<usize> {
        self.players
            .iter()
            .enumerate()
            .filter(|(_, p)| p.in_hand())
            .map(|(idx, _)| idx)
            .collect()
    }

    pub(crate) fn any_all_in(&self) -> bool {
        self.players.iter().any(|p| p.is_all_in())
    }

    /// Aborts the hand (fatal path). Returns each player's recorded
    /// contribution so the caller can refund the pot to its contributors.
    pub fn abort(&mut self, reason: &str) -> Vec<(String, i64)> {
        tracing::error!(game_id = %self.id, reason, "Aborting hand, refunding pot");
        self.is_active = false;
        self.players
            .iter()
            .filter(|p| p.total_contributed > 0)
            .map(|p| (p.id.clone(), p.total_contributed))
            .collect()
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::game_with_players;
    use super::*;

    #[test]
    fn test_round_transitions_forward_only() {
        assert!(Round::PreFlop.transition_to(Round::Flop).is_ok());
        assert!(Round::PreFlop.transition_to(Round::Showdown).is_ok());
        assert!(Round::Flop.transition_to(Round::PreFlop).is_err());
        assert!(Round::Showdown.transition_to(Round::PreFlop).is_err());
    }

    #[test]
    fn test_new_game_requires_two_players() {
        let entrants = vec![("p0".to_string(), "Solo".to_string())];
        let result = Game::new("g1".to_string(), &entrants, 100, 0);
        assert_eq!(
            result.err(),
            Some(GameError::NotEnoughPlayers { confirmed: 1 })
        );
    }

    #[test]
    fn test_new_game_deals_and_seeds_pot() {
        let game = game_with_players(3);
        assert_eq!(game.round, Round::PreFlop);
        assert_eq!(game.pot, 300, "buy-ins are routed into the pot");
        assert_eq!(game.current_bet, 0);
        for p in &game.players {
            assert_eq!(p.hole.len(), 2);
            assert_eq!(p.total_contributed, 100);
            assert_eq!(p.chips, 0);
        }
        // First to act sits left of the button.
        assert_eq!(game.current_player, 1);
        assert_eq!(game.to_act.len(), 3);
    }

    #[test]
    fn test_new_game_rejects_oversized_table() {
        let entrants: Vec<(String, String)> = (0..MAX_PLAYERS + 1)
            .map(|i| (format!("p{}", i), format!("Player {}", i)))
            .collect();
        let result = Game::new("g1".to_string(), &entrants, 100, 0);
        assert!(matches!(
            result,
            Err(GameError::InvalidAction { .. })
        ));
    }

    #[test]
    fn test_full_table_deals_without_exhausting_deck() {
        let game = game_with_players(MAX_PLAYERS);
        assert_eq!(game.round, Round::PreFlop);
        assert!(game.players.iter().all(|p| p.hole.len() == 2));
    }

    #[test]
    fn test_hole_cards_are_unique() {
        let game = game_with_players(9);
        let mut seen = std::collections::HashSet::new();
        for p in &game.players {
            for card in &p.hole {
                assert!(seen.insert(*card), "duplicate card dealt: {}", card);
            }
        }
    }

    #[test]
    fn test_to_act_ordered_after_button() {
        let game = game_with_players(4);
        assert_eq!(game.to_act, vec!["p1", "p2", "p3", "p0"]);
    }

    #[test]
    fn test_abort_refunds_contributions() {
        let mut game = game_with_players(3);
        let refunds = game.abort("test");
        assert!(!game.is_active);
        assert_eq!(refunds.len(), 3);
        assert!(refunds.iter().all(|(_, amount)| *amount == 100));
    }
}
