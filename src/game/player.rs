use crate::game::deck::Card;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PlayerState {
    Active, // Still owes decisions this hand
    Folded, // Out of the hand
    AllIn,  // Entire stake committed, cannot be forced to act again
}

/// One seat in a hand. Stakes live in the external ledger, so `chips` stays
/// at zero and buy-ins are routed directly into the pot; what the player has
/// committed this hand is tracked in `total_contributed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: String,
    pub name: String,
    pub seat: usize,
    pub chips: i64,
    pub hole: Vec<Card>,
    /// This street's contribution.
    pub current_bet: i64,
    /// Whole-hand contribution, used for refunds and conservation checks.
    pub total_contributed: i64,
    pub state: PlayerState,
    pub is_winner: bool,
}

impl Player {
    pub fn new(id: String, name: String, seat: usize) -> Self {
        Self {
            id,
            name,
            seat,
            chips: 0,
            hole: vec![],
            current_bet: 0,
            total_contributed: 0,
            state: PlayerState::Active,
            is_winner: false,
        }
    }

    /// Commits `amount` toward the pot this street.
    pub fn commit(&mut self, amount: i64) {
        self.current_bet += amount;
        self.total_contributed += amount;
    }

    pub fn fold(&mut self) {
        self.state = PlayerState::Folded;
    }

    pub fn mark_all_in(&mut self) {
        self.state = PlayerState::AllIn;
    }

    pub fn reset_for_new_street(&mut self) {
        self.current_bet = 0;
    }

    pub fn reset_for_new_hand(&mut self) {
        self.hole.clear();
        self.current_bet = 0;
        self.total_contributed = 0;
        self.state = PlayerState::Active;
        self.is_winner = false;
    }

    pub fn has_folded(&self) -> bool {
        self.state == PlayerState::Folded
    }

    pub fn is_all_in(&self) -> bool {
        self.state == PlayerState::AllIn
    }

    /// Can this player still be asked for a decision this street?
    pub fn can_act(&self) -> bool {
        self.state == PlayerState::Active
    }

    /// Still contending for the pot (not folded).
    pub fn in_hand(&self) -> bool {
        matches!(self.state, PlayerState::Active | PlayerState::AllIn)
    }
}

/// An external action request against the current hand.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action", content = "amount")]
pub enum PlayerAction {
    Fold,
    Check,
    Call,
    /// Raise the table bet to this total street commitment. A bet on an
    /// unopened street is a raise from zero.
    RaiseTo(i64),
    AllIn,
}

/// An action the current player is allowed to take, with the amounts a
/// prompt needs to render. Narrows to call/fold (or all-in/fold) when funds
/// run short or an all-in is on the table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum LegalAction {
    Check,
    Call { amount: i64 },
    RaiseTo { minimum: i64 },
    AllIn { amount: i64 },
    Fold,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_tracks_street_and_hand_totals() {
        let mut p = Player::new("p1".into(), "Alice".into(), 0);
        p.commit(50);
        p.commit(25);
        assert_eq!(p.current_bet, 75);
        assert_eq!(p.total_contributed, 75);

        p.reset_for_new_street();
        assert_eq!(p.current_bet, 0);
        assert_eq!(p.total_contributed, 75);
    }

    #[test]
    fn test_state_predicates() {
        let mut p = Player::new("p1".into(), "Alice".into(), 0);
        assert!(p.can_act() && p.in_hand());

        p.mark_all_in();
        assert!(!p.can_act());
        assert!(p.in_hand());

        p.fold();
        assert!(!p.can_act());
        assert!(!p.in_hand());
    }

    #[test]
    fn test_reset_for_new_hand() {
        let mut p = Player::new("p1".into(), "Alice".into(), 0);
        p.commit(100);
        p.fold();
        p.is_winner = true;

        p.reset_for_new_hand();
        assert_eq!(p.total_contributed, 0);
        assert_eq!(p.state, PlayerState::Active);
        assert!(!p.is_winner);
    }
}
