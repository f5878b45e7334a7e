use crate::canon::CanonIndex;
use crate::card::{card_mask, Card, CARD_COUNT};
use crate::error::Result;
use crate::evaluator::Evaluator;
use crate::histogram::{HistogramStore, StrengthHist};
use crate::round::BettingRound;
use itertools::Itertools;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::time::Instant;
use tracing::info;

/// How board completions are drawn for a histogram
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolloutOptions {
    /// random completions per canon when enumeration is too large
    pub samples: usize,
    /// enumerate every completion when there are at most this many
    pub exhaustive_limit: u64,
    /// base seed, mixed with the canon for each histogram
    pub seed: u64,
}

impl Default for RolloutOptions {
    fn default() -> Self {
        RolloutOptions {
            samples: 2000,
            exhaustive_limit: 50_000,
            seed: 0,
        }
    }
}

pub fn n_choose_k(n: u64, k: u64) -> u64 {
    if k > n {
        return 0;
    }
    (0..k).fold(1u64, |acc, i| acc * (n - i) / (i + 1))
}

/// Histogram of final values for a partial hand
///
/// `hand` holds the hole cards and any board dealt so far, the rest of the
/// 5-card board is completed from the remaining deck.
pub fn rollout<E, R>(evaluator: &E, hand: &[Card], options: &RolloutOptions, rng: &mut R) -> StrengthHist
where
    E: Evaluator + ?Sized,
    R: Rng,
{
    let mut hist = StrengthHist::new(evaluator.value_count());
    let dealt = hand.len();
    let missing = BettingRound::RIVER.cards_dealt() - dealt;
    let mut cards = hand.to_vec();
    if missing == 0 {
        hist.count(evaluator.value(&cards));
        return hist;
    }
    let mask = card_mask(hand);
    let remaining: Vec<Card> = (0..CARD_COUNT)
        .filter(|c| mask & (1u64 << c) == 0)
        .collect();
    cards.resize(dealt + missing, 0);
    if n_choose_k(remaining.len() as u64, missing as u64) <= options.exhaustive_limit {
        remaining
            .iter()
            .copied()
            .combinations(missing)
            .for_each(|board| {
                cards[dealt..].copy_from_slice(&board);
                hist.count(evaluator.value(&cards));
            });
    } else {
        for _ in 0..options.samples {
            for (slot, c) in remaining.choose_multiple(rng, missing).enumerate() {
                cards[dealt + slot] = *c;
            }
            hist.count(evaluator.value(&cards));
        }
    }
    hist
}

fn canon_seed(options: &RolloutOptions, round: BettingRound, canon: u64) -> u64 {
    options.seed
        ^ canon.wrapping_mul(0x9e37_79b9_7f4a_7c15)
        ^ (usize::from(round) as u64).rotate_left(56)
}

/// Histograms for a batch of canons, computed in parallel
///
/// Deterministic for a fixed seed regardless of thread count.
pub fn rollout_canons<E>(
    index: &CanonIndex,
    evaluator: &E,
    round: BettingRound,
    canons: &[u64],
    options: &RolloutOptions,
) -> Result<Vec<StrengthHist>>
where
    E: Evaluator + ?Sized,
{
    canons
        .par_iter()
        .map(|canon| {
            let hand = index.example(round, *canon)?;
            let mut rng = SmallRng::seed_from_u64(canon_seed(options, round, *canon));
            Ok(rollout(evaluator, &hand, options, &mut rng))
        })
        .collect()
}

/// Mean strength of every canon in `canons`
///
/// Works through the canons in batches so only one batch of histograms is
/// held at a time. Histograms are appended to `store` in canon order.
pub fn strengths<E>(
    index: &CanonIndex,
    evaluator: &E,
    round: BettingRound,
    canons: &[u64],
    options: &RolloutOptions,
    mut store: Option<&mut HistogramStore>,
) -> Result<Vec<f64>>
where
    E: Evaluator + ?Sized,
{
    let start_time = Instant::now();
    let batch_size = num_cpus::get() * 256;
    let mut means = Vec::with_capacity(canons.len());
    for (batch, chunk) in canons.chunks(batch_size).enumerate() {
        if batch.trailing_zeros() >= 6 && canons.len() > batch_size {
            print!(
                "{}: {:.3}% \r",
                round,
                (100 * batch * batch_size) as f32 / canons.len() as f32
            );
            io::stdout().flush()?;
        }
        let hists = rollout_canons(index, evaluator, round, chunk, options)?;
        for hist in &hists {
            if let Some(store) = store.as_mut() {
                store.append(hist)?;
            }
            means.push(hist.mean().unwrap_or(0.0));
        }
    }
    info!(
        "{} rollouts for {} canons took {}ms",
        round,
        canons.len(),
        start_time.elapsed().as_millis()
    );
    Ok(means)
}
