//! Street progression: burn-and-deal on entry to each community round, and
//! the all-in shortcut that reveals the rest of the board in one step.

use super::constants::{BOARD_CARDS, FLOP_CARDS, RIVER_CARDS, TURN_CARDS};
use super::{Game, GameError, GameResult, Round};

impl Game {
    /// Closes the current street and deals the next one. Burns one card
    /// before dealing, per standard procedure.
    pub(crate) fn advance_street(&mut self) -> GameResult<Round> {
        let (next, count) = match self.round {
            Round::PreFlop => (Round::Flop, FLOP_CARDS),
            Round::Flop => (Round::Turn, TURN_CARDS),
            Round::Turn => (Round::River, RIVER_CARDS),
            other => {
                return Err(GameError::HandAborted {
                    reason: format!("cannot advance street from {:?}", other),
                })
            }
        };

        self.round = self.round.transition_to(next)?;
        self.burn_and_deal(count)?;
        self.open_street();

        tracing::info!(
            game_id = %self.id,
            round = self.round.label(),
            board = self.board.len(),
            pot = self.pot,
            "Street dealt"
        );
        Ok(self.round)
    }

    /// All-in shortcut: betting is over, so reveal every remaining street at
    /// once and move straight to showdown.
    pub(crate) fn reveal_remaining_board(&mut self) -> GameResult<()> {
        while self.board.len() < BOARD_CARDS {
            let count = if self.board.is_empty() {
                FLOP_CARDS
            } else {
                1
            };
            self.burn_and_deal(count)?;
        }
        self.round = self.round.transition_to(Round::Showdown)?;
        tracing::info!(
            game_id = %self.id,
            "All-in reveal, board complete"
        );
        Ok(())
    }

    fn burn_and_deal(&mut self, count: usize) -> GameResult<()> {
        let burned = self.take_card()?;
        self.burned.push(burned);
        for _ in 0..count {
            let card = self.take_card()?;
            self.board.push(card);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::game_with_players;
    use super::*;

    #[test]
    fn test_streets_deal_expected_board_sizes() {
        let mut game = game_with_players(2);
        assert_eq!(game.advance_street().unwrap(), Round::Flop);
        assert_eq!(game.board.len(), 3);
        assert_eq!(game.burned.len(), 1);

        assert_eq!(game.advance_street().unwrap(), Round::Turn);
        assert_eq!(game.board.len(), 4);
        assert_eq!(game.burned.len(), 2);

        assert_eq!(game.advance_street().unwrap(), Round::River);
        assert_eq!(game.board.len(), 5);
        assert_eq!(game.burned.len(), 3);

        assert!(game.advance_street().is_err());
    }

    #[test]
    fn test_new_street_resets_betting_state() {
        let mut game = game_with_players(3);
        game.players[1].commit(100);
        game.current_bet = 100;
        game.has_raise_in_round = true;
        game.last_aggressor_seat = Some(1);

        game.advance_street().unwrap();
        assert_eq!(game.current_bet, 0);
        assert!(!game.has_raise_in_round);
        assert_eq!(game.last_aggressor_seat, None);
        assert!(game.players.iter().all(|p| p.current_bet == 0));
        assert!(game.actions.is_empty());
        // Action order resets to the fixed post-dealer order.
        assert_eq!(game.current_player, 1);
    }

    #[test]
    fn test_reveal_remaining_board_from_preflop() {
        let mut game = game_with_players(2);
        game.reveal_remaining_board().unwrap();
        assert_eq!(game.board.len(), 5);
        assert_eq!(game.burned.len(), 3);
        assert_eq!(game.round, Round::Showdown);
    }

    #[test]
    fn test_reveal_remaining_board_from_turn() {
        let mut game = game_with_players(2);
        game.advance_street().unwrap();
        game.advance_street().unwrap();
        game.reveal_remaining_board().unwrap();
        assert_eq!(game.board.len(), 5);
        assert_eq!(game.round, Round::Showdown);
    }
}
