use crate::card::Card;
use itertools::Itertools;
use rust_poker::hand_evaluator::{evaluate, Hand, CARDS};
use std::time::Instant;
use tracing::info;

/// Scores complete hands on a dense scale
///
/// Values lie in `0..value_count()` and a higher value is a stronger hand.
pub trait Evaluator: Sync {
    /// number of distinct values the evaluator can return
    fn value_count(&self) -> usize;
    /// value of a 5 to 7 card hand
    fn value(&self, cards: &[Card]) -> u16;
    /// values for several hands, used to order contenders at showdown
    fn rank(&self, hands: &[&[Card]]) -> Vec<u16> {
        hands.iter().map(|hand| self.value(hand)).collect()
    }
}

/// Raw `rust_poker` score of a hand
///
/// higher score is better
pub fn score_hand(cards: &[Card]) -> u16 {
    let mut hand = Hand::default();
    cards.iter().for_each(|c| {
        hand += CARDS[usize::from(*c)];
    });
    evaluate(&hand)
}

/// Texas holdem evaluator with scores compressed to the distinct 5-card values
pub struct HandEvaluator {
    /// sorted distinct scores of every 5-card hand
    scores: Vec<u16>,
}

impl HandEvaluator {
    /// Enumerates all 5-card hands to find the distinct scores
    pub fn build() -> Self {
        let start_time = Instant::now();
        let mut seen = vec![false; 1 << 16];
        (0..52u8).combinations(5).for_each(|hand| {
            seen[usize::from(score_hand(&hand))] = true;
        });
        let scores: Vec<u16> = seen
            .iter()
            .enumerate()
            .filter(|(_, s)| **s)
            .map(|(score, _)| score as u16)
            .collect();
        info!(
            "built value table with {} values in {}ms",
            scores.len(),
            start_time.elapsed().as_millis()
        );
        HandEvaluator { scores }
    }
}

impl Evaluator for HandEvaluator {
    fn value_count(&self) -> usize {
        self.scores.len()
    }

    fn value(&self, cards: &[Card]) -> u16 {
        let score = score_hand(cards);
        // the best 5 of 6 or 7 cards always scores like some 5-card hand
        match self.scores.binary_search(&score) {
            Ok(i) => i as u16,
            Err(i) => i.saturating_sub(1) as u16,
        }
    }
}
