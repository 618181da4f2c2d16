//! Showdown resolution and pot settlement.
//!
//! Single-pot model: the whole pot goes to the best hand among non-folded
//! players, split evenly across exact ties with odd chips awarded in seat
//! order after the dealer button.

use serde::{Deserialize, Serialize};

use super::hand::{determine_winners, evaluate_hand, HandRank};
use super::{Game, GameError, GameResult, Round};

/// The terminal outcome of a hand.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settlement {
    /// Ids of the winning players (more than one on an exact tie).
    pub winners: Vec<String>,
    /// Amount credited to each winner; sums to the pot.
    pub payouts: Vec<(String, i64)>,
    /// Every contender's evaluated hand, best first. Empty on a fold-out:
    /// the remaining player never shows.
    pub ranking: Vec<(String, HandRank)>,
    pub by_fold: bool,
}

impl Game {
    /// Compares the non-folded players' best five-card hands and pays the
    /// pot out. Requires the board to be complete.
    pub(crate) fn resolve_showdown(&mut self) -> GameResult<Settlement> {
        let contenders = self.contenders();
        if contenders.is_empty() {
            return Err(GameError::HandAborted {
                reason: "showdown with no contenders".to_string(),
            });
        }

        let mut ranking: Vec<(String, HandRank)> = Vec::with_capacity(contenders.len());
        for &idx in &contenders {
            let mut cards = self.players[idx].hole.clone();
            cards.extend_from_slice(&self.board);
            ranking.push((self.players[idx].id.clone(), evaluate_hand(&cards)));
        }

        let winners = determine_winners(&ranking);
        let payouts = self.split_pot(&winners)?;
        for id in &winners {
            if let Some(idx) = self.player_index(id) {
                self.players[idx].is_winner = true;
            }
        }
        ranking.sort_by(|a, b| b.1.cmp(&a.1));
        self.is_active = false;

        tracing::info!(
            game_id = %self.id,
            winners = ?winners,
            pot = self.pot,
            "Hand settled at showdown"
        );

        Ok(Settlement {
            winners,
            payouts,
            ranking,
            by_fold: false,
        })
    }

    /// Awards the pot to the last non-folded player. No cards are shown and
    /// no hands are compared.
    pub(crate) fn settle_fold_win(&mut self) -> GameResult<Settlement> {
        let mut contenders = self.contenders();
        let idx = match (contenders.pop(), contenders.is_empty()) {
            (Some(idx), true) => idx,
            _ => {
                return Err(GameError::HandAborted {
                    reason: "fold-out settlement without a single contender".to_string(),
                })
            }
        };

        if self.round != Round::Showdown {
            self.round = self.round.transition_to(Round::Showdown)?;
        }
        self.players[idx].is_winner = true;
        self.is_active = false;
        let winner = self.players[idx].id.clone();

        tracing::info!(
            game_id = %self.id,
            winner = %winner,
            pot = self.pot,
            "Hand settled by fold-out"
        );

        Ok(Settlement {
            winners: vec![winner.clone()],
            payouts: vec![(winner, self.pot)],
            ranking: Vec::new(),
            by_fold: true,
        })
    }

    /// Splits the pot evenly across `winners`. Odd chips that cannot be
    /// split go one apiece to the winners seated closest after the button.
    fn split_pot(&self, winners: &[String]) -> GameResult<Vec<(String, i64)>> {
        if winners.is_empty() {
            return Err(GameError::HandAborted {
                reason: "settlement with no winners".to_string(),
            });
        }
        let n = winners.len() as i64;
        let share = self.pot / n;
        let mut remainder = self.pot % n;

        let mut ordered: Vec<(String, usize)> = winners
            .iter()
            .filter_map(|id| self.player(id).map(|p| (id.clone(), p.seat)))
            .collect();
        let seats = self.players.len();
        ordered.sort_by_key(|(_, seat)| (seat + seats - self.dealer_seat - 1) % seats);

        Ok(ordered
            .into_iter()
            .map(|(id, _)| {
                let extra = if remainder > 0 {
                    remainder -= 1;
                    1
                } else {
                    0
                };
                (id, share + extra)
            })
            .collect())
    }
}
