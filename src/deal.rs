//! Chance: which cards each seat holds
//!
//! The walker only sees a deal through the bucket row of each seat on each
//! round and the showdown strengths.
use crate::constants::*;
use crate::error::{Result, SolverError};
use crate::rules::Seat;
use information_abstraction::abstraction::Abstraction;
use information_abstraction::card::{Card, CARD_COUNT};
use information_abstraction::evaluator::{Evaluator, HandEvaluator};
use information_abstraction::round::BettingRound;
use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use rand::Rng;

pub trait Deal: Send + Sync {
    /// row of the seat's hand in the round's matrix
    fn bucket(&self, seat: Seat, round: usize) -> usize;
    /// showdown value of each seat, higher wins
    fn strengths(&self) -> &[u16];
}

pub trait Dealer: Sync {
    type Deal: Deal;

    /// Deals for one training iteration with their chance weight
    fn deals<R: Rng>(&self, rng: &mut R) -> Result<Vec<(Self::Deal, f64)>>;
    /// number of bucket rows on a round
    fn rows(&self, round: usize) -> usize;
    fn rounds(&self) -> usize;

    /// One deal drawn by chance weight, for play
    fn sample<R: Rng>(&self, rng: &mut R) -> Result<Self::Deal> {
        let mut deals = self.deals(rng)?;
        let distribution = WeightedIndex::new(deals.iter().map(|(_, weight)| *weight))
            .map_err(|e| SolverError::InvalidOptions(format!("dealer weights: {}", e)))?;
        let chosen = distribution.sample(rng);
        Ok(deals.swap_remove(chosen).0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KuhnDeal {
    /// 0 is the jack, 2 the king
    cards: [u16; SEATS],
}

impl KuhnDeal {
    pub fn new(cards: [u16; SEATS]) -> Self {
        KuhnDeal { cards }
    }

    pub fn cards(&self) -> [u16; SEATS] {
        self.cards
    }
}

impl Deal for KuhnDeal {
    fn bucket(&self, seat: Seat, _round: usize) -> usize {
        usize::from(self.cards[seat])
    }

    fn strengths(&self) -> &[u16] {
        &self.cards
    }
}

/// Enumerates every Kuhn deal, chance is exact
#[derive(Debug, Clone, Copy, Default)]
pub struct KuhnDealer;

impl Dealer for KuhnDealer {
    type Deal = KuhnDeal;

    fn deals<R: Rng>(&self, _rng: &mut R) -> Result<Vec<(KuhnDeal, f64)>> {
        let cards = u16::from(KUHN_CARDS);
        let count = cards * (cards - 1);
        let mut deals = Vec::with_capacity(usize::from(count));
        for first in 0..cards {
            for second in (0..cards).filter(|c| *c != first) {
                deals.push((KuhnDeal::new([first, second]), 1.0 / f64::from(count)));
            }
        }
        Ok(deals)
    }

    fn rows(&self, _round: usize) -> usize {
        usize::from(KUHN_CARDS)
    }

    fn rounds(&self) -> usize {
        1
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoldemDeal {
    /// joint bucket of each seat on each round
    buckets: [[usize; HOLDEM_ROUNDS]; SEATS],
    strengths: Vec<u16>,
}

impl Deal for HoldemDeal {
    fn bucket(&self, seat: Seat, round: usize) -> usize {
        self.buckets[seat][round]
    }

    fn strengths(&self) -> &[u16] {
        &self.strengths
    }
}

/// Joint bucket rows of holdem hands
pub trait HandAbstraction: Sync {
    /// row of a hand on `round`, from its buckets on every round so far
    fn sequence(&self, round: BettingRound, hole: &[Card], board: &[Card]) -> Result<usize>;
    /// number of rows on `round`
    fn sequence_count(&self, round: BettingRound) -> usize;
}

impl HandAbstraction for Abstraction {
    fn sequence(&self, round: BettingRound, hole: &[Card], board: &[Card]) -> Result<usize> {
        Ok(Abstraction::sequence(self, round, hole, board)?)
    }

    fn sequence_count(&self, round: BettingRound) -> usize {
        Abstraction::sequence_count(self, round)
    }
}

/// Samples one holdem deal per iteration
pub struct HoldemDealer<A = Abstraction> {
    abstraction: A,
    evaluator: HandEvaluator,
}

impl<A: HandAbstraction> HoldemDealer<A> {
    pub fn new(abstraction: A, evaluator: HandEvaluator) -> Self {
        HoldemDealer {
            abstraction,
            evaluator,
        }
    }

    pub fn abstraction(&self) -> &A {
        &self.abstraction
    }

    /// Buckets and strengths of a fixed deal
    ///
    /// # Arguments
    /// * `holes` two hole cards per seat
    /// * `board` five board cards
    pub fn deal(&self, holes: &[[Card; 2]; SEATS], board: &[Card]) -> Result<HoldemDeal> {
        let mut buckets = [[0usize; HOLDEM_ROUNDS]; SEATS];
        let mut hands = Vec::with_capacity(SEATS);
        for (seat, hole) in holes.iter().enumerate() {
            for round in BettingRound::ALL.iter() {
                buckets[seat][usize::from(*round)] =
                    self.abstraction.sequence(*round, hole, board)?;
            }
            let mut hand = hole.to_vec();
            hand.extend_from_slice(board);
            hands.push(hand);
        }
        let hands: Vec<&[Card]> = hands.iter().map(|h| h.as_slice()).collect();
        Ok(HoldemDeal {
            buckets,
            strengths: self.evaluator.rank(&hands),
        })
    }
}

impl<A: HandAbstraction> Dealer for HoldemDealer<A> {
    type Deal = HoldemDeal;

    fn deals<R: Rng>(&self, rng: &mut R) -> Result<Vec<(HoldemDeal, f64)>> {
        let mut deck: Vec<Card> = (0..CARD_COUNT as Card).collect();
        let (cards, _) = deck.partial_shuffle(rng, 2 * SEATS + 5);
        let holes = [[cards[0], cards[1]], [cards[2], cards[3]]];
        let deal = self.deal(&holes, &cards[2 * SEATS..])?;
        Ok(vec![(deal, 1.0)])
    }

    fn rows(&self, round: usize) -> usize {
        self.abstraction.sequence_count(BettingRound::ALL[round])
    }

    fn rounds(&self) -> usize {
        HOLDEM_ROUNDS
    }
}
