use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::cards::Card;
use crate::errors::EngineError;

/// Hand categories in ascending strength.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandCategory {
    HighCard = 0,
    Pair,
    TwoPair,
    ThreeOfAKind,
    Straight,
    Flush,
    FullHouse,
    FourOfAKind,
    StraightFlush,
    RoyalFlush,
}

/// Result of evaluating 5 to 7 cards.
///
/// `score` is a single monotone encoding of (category, primary rank,
/// secondary rank, kickers): the category occupies the top digit and every
/// rank below it is a digit in base 15, so no kicker can ever outweigh a
/// category or a primary rank. Equal-strength hands score exactly equal.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct HandValue {
    pub category: HandCategory,
    pub score: u32,
    /// The winning five cards, highest rank first.
    pub best_five: [Card; 5],
}

/// Compare two evaluations; total order, ties are exact.
pub fn compare_hands(a: &HandValue, b: &HandValue) -> Ordering {
    a.score.cmp(&b.score)
}

/// Evaluate the best five-card hand from 5 to 7 cards.
///
/// The result is the maximum over every five-card subset, which is the
/// canonical reading of the poker rules: in particular seven cards holding
/// two triples resolve to a full house of the higher triple over the top
/// two cards of the lower one.
pub fn evaluate(cards: &[Card]) -> Result<HandValue, EngineError> {
    if !(5..=7).contains(&cards.len()) {
        return Err(EngineError::WrongCardCount(cards.len()));
    }
    let n = cards.len();
    let mut best: Option<HandValue> = None;
    for a in 0..n - 4 {
        for b in a + 1..n - 3 {
            for c in b + 1..n - 2 {
                for d in c + 1..n - 1 {
                    for e in d + 1..n {
                        let five = [cards[a], cards[b], cards[c], cards[d], cards[e]];
                        let value = evaluate_five(five);
                        match &best {
                            Some(current) if current.score >= value.score => {}
                            _ => best = Some(value),
                        }
                    }
                }
            }
        }
    }
    // len >= 5 guarantees at least one subset
    Ok(best.expect("at least one five-card subset"))
}

// Ranks are digits in base 15 so a higher digit always dominates
// everything below it.
const DIGIT_BASE: u32 = 15;

fn pack(category: HandCategory, digits: [u8; 5]) -> u32 {
    let mut score = category as u32;
    for d in digits {
        score = score * DIGIT_BASE + d as u32;
    }
    score
}

fn evaluate_five(mut five: [Card; 5]) -> HandValue {
    five.sort_by(|a, b| b.rank.value().cmp(&a.rank.value()));
    let values = [
        five[0].rank.value(),
        five[1].rank.value(),
        five[2].rank.value(),
        five[3].rank.value(),
        five[4].rank.value(),
    ];

    let is_flush = five.iter().all(|c| c.suit == five[0].suit);
    let straight_high = straight_high(&values);

    // (count, rank value) groups, largest group first, then highest rank
    let mut groups: Vec<(u8, u8)> = Vec::with_capacity(5);
    for &v in &values {
        match groups.last_mut() {
            Some((count, rank)) if *rank == v => *count += 1,
            _ => groups.push((1, v)),
        }
    }
    groups.sort_by(|a, b| b.0.cmp(&a.0).then(b.1.cmp(&a.1)));

    let (category, digits) = match (is_flush, straight_high, groups.as_slice()) {
        (true, Some(14), _) => (HandCategory::RoyalFlush, [14, 0, 0, 0, 0]),
        (true, Some(high), _) => (HandCategory::StraightFlush, [high, 0, 0, 0, 0]),
        (_, _, [(4, quad), (1, kicker)]) => {
            (HandCategory::FourOfAKind, [*quad, *kicker, 0, 0, 0])
        }
        (_, _, [(3, trips), (2, pair)]) => (HandCategory::FullHouse, [*trips, *pair, 0, 0, 0]),
        (true, None, _) => (HandCategory::Flush, values),
        (false, Some(high), _) => (HandCategory::Straight, [high, 0, 0, 0, 0]),
        (_, _, [(3, trips), (1, k1), (1, k2)]) => {
            (HandCategory::ThreeOfAKind, [*trips, *k1, *k2, 0, 0])
        }
        (_, _, [(2, high), (2, low), (1, kicker)]) => {
            (HandCategory::TwoPair, [*high, *low, *kicker, 0, 0])
        }
        (_, _, [(2, pair), (1, k1), (1, k2), (1, k3)]) => {
            (HandCategory::Pair, [*pair, *k1, *k2, *k3, 0])
        }
        _ => (HandCategory::HighCard, values),
    };

    HandValue {
        category,
        score: pack(category, digits),
        best_five: five,
    }
}

/// High card of a five-card straight, if the values form one. The wheel
/// (A-2-3-4-5) counts with high card 5.
fn straight_high(values_desc: &[u8; 5]) -> Option<u8> {
    let distinct = values_desc.windows(2).all(|w| w[0] != w[1]);
    if !distinct {
        return None;
    }
    if values_desc.windows(2).all(|w| w[0] == w[1] + 1) {
        return Some(values_desc[0]);
    }
    if *values_desc == [14, 5, 4, 3, 2] {
        return Some(5);
    }
    None
}

/// Convenience for the pair dealt to each player plus the board.
pub fn evaluate_with_board(hole: &[Card], board: &[Card]) -> Result<HandValue, EngineError> {
    let mut cards = Vec::with_capacity(hole.len() + board.len());
    cards.extend_from_slice(hole);
    cards.extend_from_slice(board);
    evaluate(&cards)
}
