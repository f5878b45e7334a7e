//! Card abstraction build and lookup
//!
//! Raw cards -> canon -> histogram mean -> k-means bucket, for every round.
//! The result is a flushed `BucketTree` on disk plus the mixed-radix joint
//! bucket used to key regret tables.
use crate::bucket_tree::{Branch, BucketSequence, BucketTree};
use crate::bucketizer::{Bucketizer, IndexedStrengthList, KMeansBucketizer};
use crate::canon::CanonIndex;
use crate::card::Card;
use crate::error::{AbstractionError, Result};
use crate::evaluator::Evaluator;
use crate::histogram::HistogramStore;
use crate::rollout::{self, RolloutOptions};
use crate::round::BettingRound;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

/// Options for building a card abstraction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbstractionOptions {
    /// directory for bucket and histogram files
    pub dir: PathBuf,
    /// number of buckets per round
    pub bucket_counts: [u8; 4],
    #[serde(default)]
    pub rollout: RolloutOptions,
    #[serde(default)]
    pub kmeans: KMeansBucketizer,
    /// bucket each round separately under every parent bucket
    #[serde(default)]
    pub hierarchical: bool,
    /// keep the rollout histograms next to the buckets
    #[serde(default)]
    pub store_histograms: bool,
}

impl Default for AbstractionOptions {
    fn default() -> Self {
        AbstractionOptions {
            dir: PathBuf::from("abstraction"),
            bucket_counts: [8, 8, 8, 8],
            rollout: RolloutOptions::default(),
            kmeans: KMeansBucketizer::default(),
            hierarchical: false,
            store_histograms: false,
        }
    }
}

impl AbstractionOptions {
    pub fn from_file(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}

/// Buckets every canon of a bucket tree
pub struct AbstractionBuilder<'a, E: Evaluator + ?Sized> {
    options: &'a AbstractionOptions,
    index: &'a CanonIndex,
    evaluator: &'a E,
}

impl<'a, E: Evaluator + ?Sized> AbstractionBuilder<'a, E> {
    pub fn new(options: &'a AbstractionOptions, index: &'a CanonIndex, evaluator: &'a E) -> Self {
        AbstractionBuilder {
            options,
            index,
            evaluator,
        }
    }

    pub fn build(&self, tree: &mut BucketTree) -> Result<()> {
        let start_time = Instant::now();
        if self.options.hierarchical {
            self.build_hierarchical(tree)?;
        } else {
            self.build_flat(tree)?;
        }
        info!(
            "{} abstraction built in {}s",
            self.options.kmeans.id(),
            start_time.elapsed().as_secs()
        );
        Ok(())
    }

    /// Every round bucketized on its own, rounds in parallel
    pub fn build_flat(&self, tree: &mut BucketTree) -> Result<()> {
        fs::create_dir_all(&self.options.dir)?;
        tree.branches()
            .into_par_iter()
            .map(|mut branch| -> Result<()> {
                let mut store = if self.options.store_histograms {
                    let path = self
                        .options
                        .dir
                        .join(format!("hist-r{}.dat", usize::from(branch.round())));
                    Some(HistogramStore::create(&path)?)
                } else {
                    None
                };
                let counts = self.bucketize_branch(&mut branch, store.as_mut())?;
                if let Some(store) = store {
                    store.finish()?;
                }
                info!("{} bucket sizes {:?}", branch.round(), counts);
                Ok(())
            })
            .collect::<Result<Vec<()>>>()?;
        Ok(())
    }

    /// Each round bucketized separately within every parent bucket
    pub fn build_hierarchical(&self, tree: &mut BucketTree) -> Result<()> {
        {
            let mut holes = tree.branch(BettingRound::PREFLOP);
            let counts = self.bucketize_branch(&mut holes, None)?;
            info!("{} bucket sizes {:?}", BettingRound::PREFLOP, counts);
        }
        for round in BettingRound::ALL[1..].iter() {
            let parent = round.previous().ok_or_else(|| {
                AbstractionError::Inconsistent(format!("{} has no parent round", round))
            })?;
            let groups = tree.sub_branches(self.index, parent)?;
            for (bucket, canons) in groups.into_iter().enumerate() {
                if canons.is_empty() {
                    continue;
                }
                let mut branch = tree.branch_with(*round, canons, Some(bucket as u8));
                self.bucketize_branch(&mut branch, None)?;
            }
            info!("{} bucketized under {} parent buckets", round, tree.bucket_count(parent));
        }
        Ok(())
    }

    fn bucketize_branch(
        &self,
        branch: &mut Branch<'_>,
        store: Option<&mut HistogramStore>,
    ) -> Result<Vec<usize>> {
        let round = branch.round();
        let strengths = rollout::strengths(
            self.index,
            self.evaluator,
            round,
            branch.canons(),
            &self.options.rollout,
            store,
        )?;
        let strengths = IndexedStrengthList::new(branch.canons().to_vec(), strengths)?;
        let requested = self.options.bucket_counts[usize::from(round)];
        // a branch with fewer distinct strengths than buckets gets fewer buckets
        let k = std::cmp::min(usize::from(requested), strengths.distinct()).max(1) as u8;
        if k < requested {
            warn!(
                "{} branch {:?} has {} distinct strengths, using {} buckets",
                round,
                branch.parent_bucket(),
                strengths.distinct(),
                k
            );
        }
        self.options.kmeans.bucketize(branch, &strengths, k)
    }
}

/// Loaded card abstraction
pub struct Abstraction {
    index: CanonIndex,
    tree: BucketTree,
    sequence: BucketSequence,
}

fn round_sizes(index: &CanonIndex) -> [u64; 4] {
    let mut sizes = [0u64; 4];
    for round in BettingRound::ALL.iter() {
        sizes[usize::from(*round)] = index.round_size(*round);
    }
    sizes
}

impl Abstraction {
    /// Opens a previously built abstraction
    pub fn open(options: &AbstractionOptions) -> Result<Self> {
        let index = CanonIndex::build()?;
        let tree = BucketTree::open(&options.dir, options.bucket_counts, round_sizes(&index))?;
        if !tree.is_flushed() {
            return Err(AbstractionError::Inconsistent(format!(
                "no complete bucket tree in {}",
                options.dir.display()
            )));
        }
        Ok(Abstraction::from_parts(index, tree))
    }

    /// Opens the abstraction, building and flushing any missing rounds first
    pub fn build_or_load<E: Evaluator + ?Sized>(
        options: &AbstractionOptions,
        evaluator: &E,
    ) -> Result<Self> {
        let index = CanonIndex::build()?;
        let mut tree = BucketTree::open(&options.dir, options.bucket_counts, round_sizes(&index))?;
        if tree.is_flushed() {
            info!("loaded bucket tree from {}", options.dir.display());
        } else {
            AbstractionBuilder::new(options, &index, evaluator).build(&mut tree)?;
            tree.flush()?;
        }
        Ok(Abstraction::from_parts(index, tree))
    }

    pub fn from_parts(index: CanonIndex, tree: BucketTree) -> Self {
        let sequence = BucketSequence::new(&tree.bucket_counts());
        Abstraction {
            index,
            tree,
            sequence,
        }
    }

    pub fn canon_index(&self) -> &CanonIndex {
        &self.index
    }

    pub fn tree(&self) -> &BucketTree {
        &self.tree
    }

    /// Bucket of a hand (hole cards then board)
    pub fn bucket(&self, round: BettingRound, cards: &[Card]) -> Result<u8> {
        let canon = self.index.canonicalize(cards, round)?;
        self.tree.try_get(round, canon)
    }

    /// Buckets of a hand for every round up to `round`
    pub fn buckets(&self, round: BettingRound, hole: &[Card], board: &[Card]) -> Result<Vec<u8>> {
        let mut cards = hole.to_vec();
        let mut buckets = Vec::with_capacity(usize::from(round) + 1);
        for r in BettingRound::ALL[..=usize::from(round)].iter() {
            let needed = r.board_cards();
            if board.len() < needed {
                return Err(AbstractionError::CardCount {
                    round: *r,
                    expected: needed,
                    actual: board.len(),
                });
            }
            cards.truncate(hole.len());
            cards.extend_from_slice(&board[..needed]);
            buckets.push(self.bucket(*r, &cards)?);
        }
        Ok(buckets)
    }

    /// Joint bucket of a hand up to `round`
    pub fn sequence(&self, round: BettingRound, hole: &[Card], board: &[Card]) -> Result<usize> {
        Ok(self.sequence.encode(&self.buckets(round, hole, board)?))
    }

    /// number of joint buckets up to `round`
    pub fn sequence_count(&self, round: BettingRound) -> usize {
        self.sequence.size(usize::from(round))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_from_json() {
        let path = std::env::temp_dir().join("test_abstraction_options.json");
        std::fs::write(
            &path,
            r#"{ "dir": "abs", "bucket_counts": [4, 6, 6, 8], "hierarchical": true }"#,
        )
        .unwrap();
        let options = AbstractionOptions::from_file(&path).unwrap();
        assert_eq!(options.bucket_counts, [4, 6, 6, 8]);
        assert!(options.hierarchical);
        assert!(!options.store_histograms);
        assert_eq!(options.kmeans.delta_cutoff, 0.01);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_open_requires_built_tree() {
        let options = AbstractionOptions {
            dir: std::env::temp_dir().join("test_open_requires_built_tree"),
            ..AbstractionOptions::default()
        };
        let _ = std::fs::remove_dir_all(&options.dir);
        assert!(matches!(
            Abstraction::open(&options),
            Err(AbstractionError::Inconsistent(_))
        ));
    }
}
