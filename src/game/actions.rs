//! Betting actions and turn arbitration.
//!
//! Every entry point validates before it mutates: a rejected action leaves
//! the hand untouched, so callers can always retry.

use serde::{Deserialize, Serialize};

use super::history::{ActionKind, ActionRecord};
use super::player::{LegalAction, PlayerAction};
use super::showdown::Settlement;
use super::{Game, GameError, GameResult, Round};

/// What happened to the hand as a result of an accepted action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Transition {
    /// Betting continues on the same street.
    Continue { next_player_id: String },
    /// The street closed and the next one was dealt.
    StreetDealt { round: Round, next_player_id: String },
    /// The hand is over (fold-out or showdown) and has been settled.
    HandEnded(Settlement),
}

impl Game {
    /// Applies `action` for `player_id`. `available` is the player's
    /// spendable balance as reported by the external ledger; the hand never
    /// consults player chips directly.
    pub fn handle_action(
        &mut self,
        player_id: &str,
        action: &PlayerAction,
        available: i64,
    ) -> GameResult<Transition> {
        if !self.is_active {
            return Err(GameError::GameAlreadySettled);
        }
        let idx = self
            .player_index(player_id)
            .ok_or(GameError::NotYourTurn)?;
        if self.players[idx].has_folded() {
            return Err(GameError::AlreadyFolded);
        }
        if idx != self.current_player {
            return Err(GameError::NotYourTurn);
        }

        match action {
            PlayerAction::Check => self.apply_check(idx)?,
            PlayerAction::Call => self.apply_call(idx, available)?,
            PlayerAction::RaiseTo(total) => self.apply_raise_to(idx, *total, available)?,
            PlayerAction::AllIn => self.apply_all_in(idx, available)?,
            PlayerAction::Fold => self.apply_fold(idx),
        }

        tracing::debug!(
            game_id = %self.id,
            player_id,
            action = ?action,
            pot = self.pot,
            current_bet = self.current_bet,
            "Action accepted"
        );

        self.resolve_transition()
    }

    fn apply_check(&mut self, idx: usize) -> GameResult<()> {
        let player = &self.players[idx];
        if player.current_bet != self.current_bet {
            return Err(GameError::CannotCheck {
                current_bet: self.current_bet,
            });
        }
        self.record(idx, ActionKind::Check, 0);
        let id = self.players[idx].id.clone();
        self.remove_from_to_act(&id);
        Ok(())
    }

    fn apply_call(&mut self, idx: usize, available: i64) -> GameResult<()> {
        let owed = self.current_bet - self.players[idx].current_bet;
        if owed <= 0 {
            return Err(GameError::InvalidAction {
                reason: "nothing to call, check instead".to_string(),
            });
        }
        if owed > available {
            return Err(GameError::InsufficientFunds {
                required: owed,
                available,
            });
        }
        self.players[idx].commit(owed);
        self.pot += owed;
        self.record(idx, ActionKind::Call, owed);
        let id = self.players[idx].id.clone();
        self.remove_from_to_act(&id);
        Ok(())
    }

    fn apply_raise_to(&mut self, idx: usize, total: i64, available: i64) -> GameResult<()> {
        // Single-pot model: once anyone is all-in the bet can no longer be
        // out-raised, subsequent actors may only call or fold.
        if self.any_all_in() {
            return Err(GameError::InvalidAction {
                reason: "no raising once a player is all-in".to_string(),
            });
        }
        if total <= 0 || total < self.bet_amount {
            return Err(GameError::InvalidAmount {
                amount: total,
                minimum: self.bet_amount,
            });
        }
        if total <= self.current_bet {
            return Err(GameError::BelowCurrentBet {
                current_bet: self.current_bet,
                attempted: total,
            });
        }
        let delta = total - self.players[idx].current_bet;
        if delta > available {
            return Err(GameError::InsufficientFunds {
                required: delta,
                available,
            });
        }

        let kind = if self.current_bet == 0 {
            ActionKind::Bet
        } else {
            ActionKind::Raise
        };
        self.players[idx].commit(delta);
        self.pot += delta;
        self.current_bet = total;
        self.has_raise_in_round = true;
        self.last_aggressor_seat = Some(idx);
        if delta == available {
            self.players[idx].mark_all_in();
        }
        self.record(idx, kind, delta);
        self.reset_to_act_after(idx);
        Ok(())
    }

    fn apply_all_in(&mut self, idx: usize, available: i64) -> GameResult<()> {
        if available <= 0 {
            return Err(GameError::InsufficientFunds {
                required: 1,
                available,
            });
        }

        self.players[idx].commit(available);
        self.pot += available;
        self.players[idx].mark_all_in();
        let total = self.players[idx].current_bet;
        if total > self.current_bet {
            self.current_bet = total;
            self.has_raise_in_round = true;
            self.last_aggressor_seat = Some(idx);
        }
        self.record(idx, ActionKind::AllIn, available);
        // Everyone else must respond to the all-in, whether it raised the
        // table bet or came up short.
        self.reset_to_act_after(idx);
        Ok(())
    }

    fn apply_fold(&mut self, idx: usize) {
        self.players[idx].fold();
        self.record(idx, ActionKind::Fold, 0);
        let id = self.players[idx].id.clone();
        self.remove_from_to_act(&id);
    }

    /// Rebuilds the obligation set after an aggressive action: every player
    /// who can still act, in seat order after the actor, owes a decision.
    fn reset_to_act_after(&mut self, actor: usize) {
        self.to_act = self
            .seats_from(actor)
            .filter(|&seat| seat != actor && self.players[seat].can_act())
            .map(|seat| self.players[seat].id.clone())
            .collect();
    }

    fn record(&mut self, idx: usize, kind: ActionKind, amount: i64) {
        let player = &self.players[idx];
        self.actions.push(ActionRecord::new(
            &player.id,
            kind,
            amount,
            player.current_bet,
            self.round,
        ));
    }

    /// A street closes when nobody owes a decision and every player who can
    /// still act has matched the table bet. All-in players are exempt from
    /// matching; their commitment is capped by definition.
    pub fn round_closed(&self) -> bool {
        self.to_act.is_empty()
            && self
                .players
                .iter()
                .filter(|p| p.can_act())
                .all(|p| p.current_bet == self.current_bet)
    }

    /// Decides what follows an accepted action: continue the street, deal
    /// the next one, or end the hand.
    fn resolve_transition(&mut self) -> GameResult<Transition> {
        if self.contenders().len() == 1 {
            let settlement = self.settle_fold_win()?;
            return Ok(Transition::HandEnded(settlement));
        }

        if self.round_closed() {
            if self.players.iter().any(|p| p.is_all_in()) {
                // All-in shortcut: no further betting is possible, reveal
                // the rest of the board in one step and settle.
                self.reveal_remaining_board()?;
                let settlement = self.resolve_showdown()?;
                return Ok(Transition::HandEnded(settlement));
            }
            if self.round == Round::River {
                self.round = self.round.transition_to(Round::Showdown)?;
                let settlement = self.resolve_showdown()?;
                return Ok(Transition::HandEnded(settlement));
            }
            let round = self.advance_street()?;
            let next_player_id = self
                .current_player_id()
                .map(str::to_string)
                .ok_or_else(|| GameError::HandAborted {
                    reason: "no actor available on new street".to_string(),
                })?;
            return Ok(Transition::StreetDealt {
                round,
                next_player_id,
            });
        }

        let next = self.next_actor().ok_or_else(|| GameError::HandAborted {
            reason: "no next actor with betting open".to_string(),
        })?;
        self.current_player = next;
        Ok(Transition::Continue {
            next_player_id: self.players[next].id.clone(),
        })
    }

    /// The actions `player_id` may legally take right now, given their
    /// ledger balance. Narrows to all-in/fold when funds run short and drops
    /// raising once any all-in is on the table.
    pub fn legal_actions(&self, player_id: &str, available: i64) -> Vec<LegalAction> {
        let player = match self.player(player_id) {
            Some(p) if p.can_act() => p,
            _ => return Vec::new(),
        };
        let owed = self.current_bet - player.current_bet;
        let mut legal = Vec::new();
        if owed == 0 {
            legal.push(LegalAction::Check);
        } else if available >= owed {
            legal.push(LegalAction::Call { amount: owed });
        }
        if !self.any_all_in() {
            let minimum = (self.current_bet + 1).max(self.bet_amount);
            if available >= minimum - player.current_bet {
                legal.push(LegalAction::RaiseTo { minimum });
            }
        }
        if available > 0 {
            legal.push(LegalAction::AllIn { amount: available });
        }
        legal.push(LegalAction::Fold);
        legal
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::game_with_players;
    use super::*;

    const BANK: i64 = 10_000;

    #[test]
    fn test_rejects_out_of_turn_action() {
        let mut game = game_with_players(3);
        // p1 acts first; p2 jumping in is rejected without mutation.
        let pot_before = game.pot;
        let err = game.handle_action("p2", &PlayerAction::Check, BANK);
        assert_eq!(err.err(), Some(GameError::NotYourTurn));
        assert_eq!(game.pot, pot_before);
        assert_eq!(game.current_player_id(), Some("p1"));
    }

    #[test]
    fn test_rejects_unknown_player() {
        let mut game = game_with_players(2);
        let err = game.handle_action("ghost", &PlayerAction::Check, BANK);
        assert_eq!(err.err(), Some(GameError::NotYourTurn));
    }

    #[test]
    fn test_check_all_around_deals_flop() {
        let mut game = game_with_players(3);
        assert!(matches!(
            game.handle_action("p1", &PlayerAction::Check, BANK),
            Ok(Transition::Continue { .. })
        ));
        assert!(matches!(
            game.handle_action("p2", &PlayerAction::Check, BANK),
            Ok(Transition::Continue { .. })
        ));
        let t = game.handle_action("p0", &PlayerAction::Check, BANK).unwrap();
        match t {
            Transition::StreetDealt {
                round,
                next_player_id,
            } => {
                assert_eq!(round, Round::Flop);
                assert_eq!(next_player_id, "p1");
            }
            other => panic!("expected flop, got {:?}", other),
        }
        assert_eq!(game.board.len(), 3);
        assert_eq!(game.burned.len(), 1);
        assert_eq!(game.to_act.len(), 3);
    }

    #[test]
    fn test_cannot_check_facing_bet() {
        let mut game = game_with_players(3);
        game.handle_action("p1", &PlayerAction::RaiseTo(100), BANK)
            .unwrap();
        let err = game.handle_action("p2", &PlayerAction::Check, BANK);
        assert_eq!(
            err.err(),
            Some(GameError::CannotCheck { current_bet: 100 })
        );
    }

    #[test]
    fn test_call_requires_outstanding_bet() {
        let mut game = game_with_players(2);
        let err = game.handle_action("p1", &PlayerAction::Call, BANK);
        assert!(matches!(err, Err(GameError::InvalidAction { .. })));
    }

    #[test]
    fn test_raise_resets_obligations() {
        let mut game = game_with_players(3);
        game.handle_action("p1", &PlayerAction::RaiseTo(100), BANK)
            .unwrap();
        assert_eq!(game.to_act, vec!["p2", "p0"]);
        assert_eq!(game.current_bet, 100);
        assert_eq!(game.last_aggressor_seat, Some(1));
        assert!(game.has_raise_in_round);

        game.handle_action("p2", &PlayerAction::RaiseTo(250), BANK)
            .unwrap();
        // p1 already acted but owes a fresh decision against the re-raise.
        assert_eq!(game.to_act, vec!["p0", "p1"]);
        assert_eq!(game.last_aggressor_seat, Some(2));
    }

    #[test]
    fn test_raise_below_current_bet_rejected() {
        let mut game = game_with_players(2);
        game.handle_action("p1", &PlayerAction::RaiseTo(300), BANK)
            .unwrap();
        let err = game.handle_action("p0", &PlayerAction::RaiseTo(300), BANK);
        assert_eq!(
            err.err(),
            Some(GameError::BelowCurrentBet {
                current_bet: 300,
                attempted: 300,
            })
        );
    }

    #[test]
    fn test_raise_below_table_minimum_rejected() {
        let mut game = game_with_players(2);
        let err = game.handle_action("p1", &PlayerAction::RaiseTo(40), BANK);
        assert_eq!(
            err.err(),
            Some(GameError::InvalidAmount {
                amount: 40,
                minimum: 100,
            })
        );
    }

    #[test]
    fn test_call_with_insufficient_funds_rejected() {
        let mut game = game_with_players(2);
        game.handle_action("p1", &PlayerAction::RaiseTo(500), BANK)
            .unwrap();
        let err = game.handle_action("p0", &PlayerAction::Call, 200);
        assert_eq!(
            err.err(),
            Some(GameError::InsufficientFunds {
                required: 500,
                available: 200,
            })
        );
        // State untouched, the same player may retry.
        assert_eq!(game.current_player_id(), Some("p0"));
        assert_eq!(game.pot, 700);
    }

    #[test]
    fn test_bet_then_call_closes_street() {
        let mut game = game_with_players(2);
        game.handle_action("p1", &PlayerAction::RaiseTo(100), BANK)
            .unwrap();
        let t = game.handle_action("p0", &PlayerAction::Call, BANK).unwrap();
        assert!(matches!(
            t,
            Transition::StreetDealt {
                round: Round::Flop,
                ..
            }
        ));
        // 2 buy-ins plus 100 each.
        assert_eq!(game.pot, 400);
        // Street bets reset on the new round.
        assert!(game.players.iter().all(|p| p.current_bet == 0));
        assert_eq!(game.current_bet, 0);
    }

    #[test]
    fn test_fold_out_ends_hand_immediately() {
        let mut game = game_with_players(2);
        game.handle_action("p1", &PlayerAction::RaiseTo(200), BANK)
            .unwrap();
        let t = game.handle_action("p0", &PlayerAction::Fold, BANK).unwrap();
        match t {
            Transition::HandEnded(settlement) => {
                assert!(settlement.by_fold);
                assert_eq!(settlement.winners, vec!["p1"]);
                assert_eq!(settlement.payouts, vec![("p1".to_string(), 400)]);
                assert!(settlement.ranking.is_empty());
            }
            other => panic!("expected hand end, got {:?}", other),
        }
        assert!(!game.is_active);
        assert_eq!(game.round, Round::Showdown);
    }

    #[test]
    fn test_settled_hand_rejects_further_actions() {
        let mut game = game_with_players(2);
        game.handle_action("p1", &PlayerAction::Fold, BANK).unwrap();
        let err = game.handle_action("p0", &PlayerAction::Check, BANK);
        assert_eq!(err.err(), Some(GameError::GameAlreadySettled));
    }

    #[test]
    fn test_folded_player_cannot_act_again() {
        let mut game = game_with_players(3);
        game.handle_action("p1", &PlayerAction::Fold, BANK).unwrap();
        let err = game.handle_action("p1", &PlayerAction::Check, BANK);
        assert_eq!(err.err(), Some(GameError::AlreadyFolded));
    }

    #[test]
    fn test_all_in_blocks_further_raises() {
        let mut game = game_with_players(3);
        game.handle_action("p1", &PlayerAction::AllIn, 600).unwrap();
        assert_eq!(game.current_bet, 600);
        assert_eq!(game.to_act, vec!["p2", "p0"]);

        let err = game.handle_action("p2", &PlayerAction::RaiseTo(1200), BANK);
        assert!(matches!(err, Err(GameError::InvalidAction { .. })));

        let legal = game.legal_actions("p2", BANK);
        assert!(legal
            .iter()
            .all(|a| !matches!(a, LegalAction::RaiseTo { .. })));
        assert!(legal.contains(&LegalAction::Call { amount: 600 }));
        assert!(legal.contains(&LegalAction::Fold));
    }

    #[test]
    fn test_short_all_in_reopens_obligations() {
        let mut game = game_with_players(3);
        game.handle_action("p1", &PlayerAction::RaiseTo(500), BANK)
            .unwrap();
        // p2 goes all-in under the bet; everyone else owes a fresh decision.
        game.handle_action("p2", &PlayerAction::AllIn, 300).unwrap();
        assert_eq!(game.current_bet, 500, "short all-in does not raise");
        assert_eq!(game.to_act, vec!["p0", "p1"]);
        assert!(game.players[2].is_all_in());
    }

    #[test]
    fn test_all_in_call_reveals_board_and_settles() {
        let mut game = game_with_players(2);
        game.handle_action("p1", &PlayerAction::AllIn, 800).unwrap();
        let t = game.handle_action("p0", &PlayerAction::Call, BANK).unwrap();
        match t {
            Transition::HandEnded(settlement) => {
                assert!(!settlement.by_fold);
                assert_eq!(settlement.ranking.len(), 2);
                let paid: i64 = settlement.payouts.iter().map(|(_, v)| v).sum();
                assert_eq!(paid, game_pot_total());
            }
            other => panic!("expected showdown, got {:?}", other),
        }
        assert_eq!(game.board.len(), 5);
        assert_eq!(game.round, Round::Showdown);
    }

    fn game_pot_total() -> i64 {
        // 2 buy-ins of 100 plus 800 from each side.
        200 + 800 + 800
    }

    #[test]
    fn test_insufficient_funds_narrows_legal_actions() {
        let mut game = game_with_players(2);
        game.handle_action("p1", &PlayerAction::RaiseTo(500), BANK)
            .unwrap();
        let legal = game.legal_actions("p0", 200);
        assert!(!legal.iter().any(|a| matches!(a, LegalAction::Call { .. })));
        assert!(legal.contains(&LegalAction::AllIn { amount: 200 }));
        assert!(legal.contains(&LegalAction::Fold));
    }

    #[test]
    fn test_actions_recorded_with_amounts() {
        let mut game = game_with_players(2);
        game.handle_action("p1", &PlayerAction::RaiseTo(100), BANK)
            .unwrap();
        game.handle_action("p0", &PlayerAction::RaiseTo(300), BANK)
            .unwrap();
        assert_eq!(game.actions.len(), 2);
        assert_eq!(game.actions[0].kind, ActionKind::Bet);
        assert_eq!(game.actions[0].amount, 100);
        assert_eq!(game.actions[1].kind, ActionKind::Raise);
        assert_eq!(game.actions[1].amount, 300);
        assert_eq!(game.actions[1].total_bet, 300);
    }

    #[test]
    fn test_pot_conservation_through_betting() {
        let mut game = game_with_players(3);
        game.handle_action("p1", &PlayerAction::RaiseTo(150), BANK)
            .unwrap();
        game.handle_action("p2", &PlayerAction::Call, BANK).unwrap();
        game.handle_action("p0", &PlayerAction::Call, BANK).unwrap();
        let contributed: i64 = game.players.iter().map(|p| p.total_contributed).sum();
        assert_eq!(game.pot, contributed);
    }
}
