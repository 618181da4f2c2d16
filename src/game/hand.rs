//! Native hand evaluator.
//!
//! Ranks any 5-7 card set into a totally ordered strength value: a category
//! (High Card up to Royal Flush) plus an ordered kicker sequence used only
//! when two hands share the category.

use crate::game::deck::Card;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Hand categories, weakest to strongest. The discriminant is the
/// comparable strength value (1 = High Card ... 10 = Royal Flush).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HandCategory {
    HighCard = 1,
    OnePair = 2,
    TwoPair = 3,
    ThreeOfAKind = 4,
    Straight = 5,
    Flush = 6,
    FullHouse = 7,
    FourOfAKind = 8,
    StraightFlush = 9,
    RoyalFlush = 10,
}

impl HandCategory {
    pub fn label(&self) -> &'static str {
        match self {
            HandCategory::HighCard => "High Card",
            HandCategory::OnePair => "Pair",
            HandCategory::TwoPair => "Two Pair",
            HandCategory::ThreeOfAKind => "Three of a Kind",
            HandCategory::Straight => "Straight",
            HandCategory::Flush => "Flush",
            HandCategory::FullHouse => "Full House",
            HandCategory::FourOfAKind => "Four of a Kind",
            HandCategory::StraightFlush => "Straight Flush",
            HandCategory::RoyalFlush => "Royal Flush",
        }
    }
}

impl fmt::Display for HandCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A comparable hand strength: category first, then kickers element-wise.
/// Exact equality is a tie (split pot).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandRank {
    pub category: HandCategory,
    /// Tiebreak ranks, highest-significance first. Layout depends on the
    /// category: quads -> [quad, kicker]; full house -> [trips, pair];
    /// flush/high card -> all 5 descending; straights -> [high card];
    /// trips -> [trips, k1, k2]; two pair -> [high pair, low pair, kicker];
    /// one pair -> [pair, k1, k2, k3].
    pub kickers: Vec<u8>,
}

impl PartialOrd for HandRank {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HandRank {
    fn cmp(&self, other: &Self) -> Ordering {
        self.category
            .cmp(&other.category)
            .then_with(|| self.kickers.cmp(&other.kickers))
    }
}

impl fmt::Display for HandRank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.category.label())
    }
}

/// Evaluates the best 5-card hand from 5, 6 or 7 cards.
///
/// With more than 5 cards, every 5-card subset is evaluated and the maximum
/// kept (C(6,5)=6 or C(7,5)=21 subsets).
///
/// # Panics
/// Debug-asserts the input is 5-7 cards; callers deal exactly 2 hole cards
/// and 0-5 board cards so the bound holds by construction.
pub fn evaluate_hand(cards: &[Card]) -> HandRank {
    debug_assert!(
        (5..=7).contains(&cards.len()),
        "evaluator needs 5-7 cards, got {}",
        cards.len()
    );

    if cards.len() == 5 {
        return evaluate_five(cards);
    }

    combinations(cards, 5)
        .into_iter()
        .map(|five| evaluate_five(&five))
        .max()
        .unwrap_or(HandRank {
            category: HandCategory::HighCard,
            kickers: vec![],
        })
}

/// Evaluates exactly 5 cards.
fn evaluate_five(cards: &[Card]) -> HandRank {
    let mut rank_counts = [0u8; 15];
    for card in cards {
        rank_counts[card.rank as usize] += 1;
    }

    let is_flush = cards.iter().all(|c| c.suit == cards[0].suit);
    let straight_high = straight_high(&rank_counts);

    if let Some(high) = straight_high {
        if is_flush {
            if high == 14 {
                return HandRank {
                    category: HandCategory::RoyalFlush,
                    kickers: vec![14],
                };
            }
            return HandRank {
                category: HandCategory::StraightFlush,
                kickers: vec![high],
            };
        }
    }

    // Ranks grouped by multiplicity, highest rank first within each group.
    let mut quads = Vec::new();
    let mut trips = Vec::new();
    let mut pairs = Vec::new();
    let mut singles = Vec::new();
    for rank in (2..=14u8).rev() {
        match rank_counts[rank as usize] {
            4 => quads.push(rank),
            3 => trips.push(rank),
            2 => pairs.push(rank),
            1 => singles.push(rank),
            _ => {}
        }
    }

    if let Some(&quad) = quads.first() {
        let kicker = trips
            .first()
            .or_else(|| pairs.first())
            .or_else(|| singles.first())
            .copied()
            .unwrap_or(0);
        return HandRank {
            category: HandCategory::FourOfAKind,
            kickers: vec![quad, kicker],
        };
    }

    if let (Some(&t), Some(&p)) = (trips.first(), pairs.first()) {
        return HandRank {
            category: HandCategory::FullHouse,
            kickers: vec![t, p],
        };
    }

    if is_flush {
        let mut all: Vec<u8> = cards.iter().map(|c| c.rank).collect();
        all.sort_unstable_by(|a, b| b.cmp(a));
        return HandRank {
            category: HandCategory::Flush,
            kickers: all,
        };
    }

    if let Some(high) = straight_high {
        return HandRank {
            category: HandCategory::Straight,
            kickers: vec![high],
        };
    }

    if let Some(&t) = trips.first() {
        let mut kickers = vec![t];
        kickers.extend(singles.iter().take(2));
        return HandRank {
            category: HandCategory::ThreeOfAKind,
            kickers,
        };
    }

    if pairs.len() >= 2 {
        let mut kickers = vec![pairs[0], pairs[1]];
        kickers.extend(singles.first());
        return HandRank {
            category: HandCategory::TwoPair,
            kickers,
        };
    }

    if let Some(&p) = pairs.first() {
        let mut kickers = vec![p];
        kickers.extend(singles.iter().take(3));
        return HandRank {
            category: HandCategory::OnePair,
            kickers,
        };
    }

    HandRank {
        category: HandCategory::HighCard,
        kickers: singles,
    }
}

/// Detects a 5-card straight and returns its comparison high card.
///
/// The wheel (A-2-3-4-5) is a straight whose high card is 5, not 14.
fn straight_high(rank_counts: &[u8; 15]) -> Option<u8> {
    let present = |r: u8| rank_counts[r as usize] > 0;

    for high in (6..=14u8).rev() {
        if (high - 4..=high).all(present) {
            return Some(high);
        }
    }

    // Wheel: ace plays low
    if present(14) && (2..=5u8).all(present) {
        return Some(5);
    }

    None
}

/// Generates all k-combinations from a slice.
fn combinations<T: Clone>(items: &[T], k: usize) -> Vec<Vec<T>> {
    if k == 0 {
        return vec![vec![]];
    }
    if items.len() < k {
        return vec![];
    }

    let mut result = Vec::new();

    let first = &items[0];
    let rest = &items[1..];

    for mut combo in combinations(rest, k - 1) {
        combo.insert(0, first.clone());
        result.push(combo);
    }

    result.extend(combinations(rest, k));

    result
}

/// Determines the winner(s) among ranked hands. Returns every index that
/// shares the best rank -- equal top hands split the pot.
pub fn determine_winners<K: Clone + PartialEq>(hands: &[(K, HandRank)]) -> Vec<K> {
    let best = match hands.iter().map(|(_, rank)| rank).max() {
        Some(best) => best.clone(),
        None => return vec![],
    };

    hands
        .iter()
        .filter(|(_, rank)| *rank == best)
        .map(|(key, _)| key.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cards(specs: &[(u8, u8)]) -> Vec<Card> {
        specs.iter().map(|&(r, s)| Card::new(r, s)).collect()
    }

    #[test]
    fn test_royal_flush() {
        let hand = cards(&[(14, 3), (13, 3), (12, 3), (11, 3), (10, 3)]);
        let rank = evaluate_hand(&hand);
        assert_eq!(rank.category, HandCategory::RoyalFlush);
        assert_eq!(rank.category as i32, 10);
    }

    #[test]
    fn test_royal_flush_from_seven_cards() {
        let hand = cards(&[
            (14, 3),
            (13, 3),
            (12, 3),
            (11, 3),
            (10, 3),
            (2, 0),
            (7, 1),
        ]);
        assert_eq!(evaluate_hand(&hand).category, HandCategory::RoyalFlush);
    }

    #[test]
    fn test_straight_flush_is_not_royal() {
        let hand = cards(&[(13, 2), (12, 2), (11, 2), (10, 2), (9, 2)]);
        let rank = evaluate_hand(&hand);
        assert_eq!(rank.category, HandCategory::StraightFlush);
        assert_eq!(rank.kickers, vec![13]);
    }

    #[test]
    fn test_full_house_kickers() {
        // 777 22 -> kickers [7, 2]
        let hand = cards(&[(7, 0), (7, 1), (7, 2), (2, 3), (2, 0)]);
        let rank = evaluate_hand(&hand);
        assert_eq!(rank.category, HandCategory::FullHouse);
        assert_eq!(rank.kickers, vec![7, 2]);
    }

    #[test]
    fn test_wheel_straight_high_card_is_five() {
        let wheel = evaluate_hand(&cards(&[(14, 1), (2, 0), (3, 3), (4, 2), (5, 1)]));
        assert_eq!(wheel.category, HandCategory::Straight);
        assert_eq!(wheel.kickers, vec![5]);

        let six_high = evaluate_hand(&cards(&[(6, 1), (5, 0), (4, 3), (3, 2), (2, 1)]));
        assert_eq!(six_high.category, HandCategory::Straight);
        assert!(six_high > wheel, "6-high straight must beat the wheel");
    }

    #[test]
    fn test_steel_wheel_is_straight_flush() {
        let hand = cards(&[(14, 0), (2, 0), (3, 0), (4, 0), (5, 0)]);
        let rank = evaluate_hand(&hand);
        assert_eq!(rank.category, HandCategory::StraightFlush);
        assert_eq!(rank.kickers, vec![5]);
    }

    #[test]
    fn test_quads_kicker_layout() {
        let hand = cards(&[(10, 0), (10, 1), (10, 2), (10, 3), (3, 0)]);
        let rank = evaluate_hand(&hand);
        assert_eq!(rank.category, HandCategory::FourOfAKind);
        assert_eq!(rank.kickers, vec![10, 3]);
    }

    #[test]
    fn test_trips_kicker_layout() {
        let hand = cards(&[(9, 0), (9, 1), (9, 2), (13, 3), (4, 0)]);
        let rank = evaluate_hand(&hand);
        assert_eq!(rank.category, HandCategory::ThreeOfAKind);
        assert_eq!(rank.kickers, vec![9, 13, 4]);
    }

    #[test]
    fn test_two_pair_kicker_layout() {
        let hand = cards(&[(9, 0), (9, 1), (6, 2), (6, 3), (14, 0)]);
        let rank = evaluate_hand(&hand);
        assert_eq!(rank.category, HandCategory::TwoPair);
        assert_eq!(rank.kickers, vec![9, 6, 14]);
    }

    #[test]
    fn test_one_pair_kicker_layout() {
        let hand = cards(&[(8, 0), (8, 1), (14, 2), (10, 3), (4, 0)]);
        let rank = evaluate_hand(&hand);
        assert_eq!(rank.category, HandCategory::OnePair);
        assert_eq!(rank.kickers, vec![8, 14, 10, 4]);
    }

    #[test]
    fn test_flush_kickers_all_five_descending() {
        let hand = cards(&[(13, 1), (9, 1), (7, 1), (5, 1), (2, 1)]);
        let rank = evaluate_hand(&hand);
        assert_eq!(rank.category, HandCategory::Flush);
        assert_eq!(rank.kickers, vec![13, 9, 7, 5, 2]);
    }

    #[test]
    fn test_high_card_ordering() {
        let a = evaluate_hand(&cards(&[(14, 1), (13, 0), (11, 2), (9, 3), (5, 0)]));
        let b = evaluate_hand(&cards(&[(13, 1), (12, 0), (11, 3), (9, 2), (5, 1)]));
        assert_eq!(a.category, HandCategory::HighCard);
        assert!(a > b, "A-high must beat K-high");
    }

    #[test]
    fn test_two_pair_comparison_within_category() {
        // AAQQ8 beats AA668
        let community = cards(&[(14, 0), (3, 1), (14, 2), (8, 3), (6, 0)]);

        let mut qq = cards(&[(12, 1), (12, 3)]);
        qq.extend_from_slice(&community);
        let mut s76 = cards(&[(7, 1), (6, 2)]);
        s76.extend_from_slice(&community);

        let qq_rank = evaluate_hand(&qq);
        let s76_rank = evaluate_hand(&s76);
        assert_eq!(qq_rank.category, HandCategory::TwoPair);
        assert_eq!(s76_rank.category, HandCategory::TwoPair);
        assert!(qq_rank > s76_rank);
    }

    #[test]
    fn test_seven_card_picks_best_subset() {
        // 7 cards holding both a flush and a straight; flush must win out
        let hand = cards(&[
            (14, 2),
            (2, 2),
            (10, 2),
            (9, 2),
            (8, 2),
            (7, 0),
            (6, 1),
        ]);
        assert_eq!(evaluate_hand(&hand).category, HandCategory::Flush);
    }

    #[test]
    fn test_determine_winners_single() {
        let hands = vec![
            (
                0usize,
                HandRank {
                    category: HandCategory::ThreeOfAKind,
                    kickers: vec![9, 13, 4],
                },
            ),
            (
                1,
                HandRank {
                    category: HandCategory::OnePair,
                    kickers: vec![14, 10, 8, 4],
                },
            ),
        ];
        assert_eq!(determine_winners(&hands), vec![0]);
    }

    #[test]
    fn test_determine_winners_split_on_exact_tie() {
        let rank = HandRank {
            category: HandCategory::TwoPair,
            kickers: vec![14, 7, 13],
        };
        let hands = vec![(0usize, rank.clone()), (1, rank.clone()), (2, {
            HandRank {
                category: HandCategory::TwoPair,
                kickers: vec![14, 7, 12],
            }
        })];
        let winners = determine_winners(&hands);
        assert_eq!(winners, vec![0, 1]);
    }

    #[test]
    fn test_combinations() {
        let items = vec![1, 2, 3, 4];
        let combos = combinations(&items, 2);
        assert_eq!(combos.len(), 6); // C(4,2)
        assert!(combos.contains(&vec![1, 2]));
        assert!(combos.contains(&vec![3, 4]));
    }
}
