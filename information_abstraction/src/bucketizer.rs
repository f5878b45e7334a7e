use crate::bucket_tree::Branch;
use crate::error::{AbstractionError, Result};
use crate::kmeans::{Kmeans, KmeansError};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

/// Canons of a branch with their scalar strength, weakest first
#[derive(Debug, Clone, Default)]
pub struct IndexedStrengthList {
    canons: Vec<u64>,
    strengths: Vec<f64>,
}

impl IndexedStrengthList {
    pub fn new(canons: Vec<u64>, strengths: Vec<f64>) -> Result<Self> {
        if canons.len() != strengths.len() {
            return Err(AbstractionError::Inconsistent(format!(
                "{} canons but {} strengths",
                canons.len(),
                strengths.len()
            )));
        }
        let mut pairs: Vec<(u64, f64)> = canons.into_iter().zip(strengths).collect();
        pairs.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        let (canons, strengths) = pairs.into_iter().unzip();
        Ok(IndexedStrengthList { canons, strengths })
    }

    pub fn len(&self) -> usize {
        self.canons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.canons.is_empty()
    }

    /// canon of the i-th weakest entry
    pub fn index(&self, i: usize) -> u64 {
        self.canons[i]
    }

    pub fn strength(&self, i: usize) -> f64 {
        self.strengths[i]
    }

    pub fn strengths(&self) -> &[f64] {
        &self.strengths
    }

    /// number of distinct strength values
    pub fn distinct(&self) -> usize {
        let mut distinct = 0;
        for (i, s) in self.strengths.iter().enumerate() {
            if i == 0 || *s != self.strengths[i - 1] {
                distinct += 1;
            }
        }
        distinct
    }
}

/// Assigns every canon of a branch to a bucket
pub trait Bucketizer: Sync {
    /// Writes a bucket in `0..num_buckets` for every canon into the branch
    /// Returns the number of canons per bucket
    fn bucketize(
        &self,
        branch: &mut Branch<'_>,
        strengths: &IndexedStrengthList,
        num_buckets: u8,
    ) -> Result<Vec<usize>>;

    fn id(&self) -> &'static str;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KMeansBucketizer {
    pub seed: u64,
    /// stop once no mean moves further than this
    pub delta_cutoff: f64,
    pub max_iterations: usize,
    /// independent seedings, the one with the lowest inertia is kept
    pub restarts: usize,
}

impl Default for KMeansBucketizer {
    fn default() -> Self {
        KMeansBucketizer {
            seed: 0,
            delta_cutoff: 0.01,
            max_iterations: 1000,
            restarts: 1,
        }
    }
}

impl KMeansBucketizer {
    /// Best clustering of the strengths over all restarts
    pub fn cluster(&self, strengths: &[f64], k: usize) -> std::result::Result<Kmeans, KmeansError> {
        let mut best: Option<(Kmeans, f64)> = None;
        for restart in 0..self.restarts.max(1) {
            let seed = self.seed
                ^ (strengths.len() * k) as u64
                ^ (restart as u64).wrapping_mul(0x2545_f491_4f6c_dd1d);
            let mut rng = SmallRng::seed_from_u64(seed);
            let mut classifier = Kmeans::init_pp(k, strengths, &mut rng)?;
            classifier.run(strengths, self.delta_cutoff, self.max_iterations)?;
            // final assignment so buckets agree with the converged means
            classifier.assignment_step(strengths);
            let inertia = classifier.inertia(strengths);
            if best.as_ref().map_or(true, |(_, i)| inertia < *i) {
                best = Some((classifier, inertia));
            }
        }
        match best {
            Some((classifier, _)) => Ok(classifier),
            None => Err(KmeansError::TooFewPoints {
                k,
                points: strengths.len(),
            }),
        }
    }
}

impl Bucketizer for KMeansBucketizer {
    fn bucketize(
        &self,
        branch: &mut Branch<'_>,
        strengths: &IndexedStrengthList,
        num_buckets: u8,
    ) -> Result<Vec<usize>> {
        let start_time = Instant::now();
        let k = usize::from(num_buckets);
        if k == 0 || k > branch.max_buckets() {
            return Err(AbstractionError::BucketOutOfRange {
                bucket: k,
                max: branch.max_buckets(),
            });
        }
        if strengths.len() != branch.len() {
            return Err(AbstractionError::Inconsistent(format!(
                "branch of {} canons given {} strengths",
                branch.len(),
                strengths.len()
            )));
        }
        let mut counts = vec![0usize; k];
        if strengths.is_empty() {
            return Ok(counts);
        }
        let classifier = self
            .cluster(strengths.strengths(), k)
            .map_err(|_| AbstractionError::DegenerateCluster {
                round: branch.round(),
                k,
                points: strengths.len(),
            })?;

        // number buckets from weakest to strongest mean
        let mut order: Vec<usize> = (0..k).collect();
        order.sort_by(|a, b| classifier.means()[*a].total_cmp(&classifier.means()[*b]));
        let mut relabel = vec![0u8; k];
        for (bucket, cluster) in order.iter().enumerate() {
            relabel[*cluster] = bucket as u8;
        }

        for (i, cluster) in classifier.assignments().iter().enumerate() {
            let bucket = relabel[*cluster];
            branch.set(strengths.index(i), bucket);
            counts[usize::from(bucket)] += 1;
        }

        debug!(
            "bucketized {} into {}\t(p {:?}\tc {})\t{:?}\ttook {}ms",
            branch.round(),
            num_buckets,
            branch.parent_bucket(),
            strengths.len(),
            counts,
            start_time.elapsed().as_millis()
        );
        Ok(counts)
    }

    fn id(&self) -> &'static str {
        "kmeans"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bucket_tree::BucketTree;
    use crate::round::BettingRound;

    #[test]
    fn test_strength_list_sorted() {
        let list = IndexedStrengthList::new(vec![4, 2, 9], vec![0.5, 0.5, 0.1]).unwrap();
        assert_eq!(list.index(0), 9);
        assert_eq!(list.index(1), 2);
        assert_eq!(list.index(2), 4);
        assert_eq!(list.distinct(), 2);
        assert!(IndexedStrengthList::new(vec![1], vec![]).is_err());
    }

    #[test]
    fn test_buckets_ordered_by_strength() {
        let dir = std::env::temp_dir().join("test_buckets_ordered_by_strength");
        let mut tree = BucketTree::open(&dir, [2, 2, 2, 2], [6, 1, 1, 1]).unwrap();
        let strengths = IndexedStrengthList::new(
            (0..6).collect(),
            vec![9.0, 1.0, 9.2, 1.1, 8.9, 0.9],
        )
        .unwrap();
        let mut branch = tree.branch(BettingRound::PREFLOP);
        let counts = KMeansBucketizer::default()
            .bucketize(&mut branch, &strengths, 2)
            .unwrap();
        assert_eq!(counts, vec![3, 3]);
        for canon in [1u64, 3, 5].iter() {
            assert_eq!(tree.get(BettingRound::PREFLOP, *canon), 0);
        }
        for canon in [0u64, 2, 4].iter() {
            assert_eq!(tree.get(BettingRound::PREFLOP, *canon), 1);
        }
    }

    #[test]
    fn test_degenerate_branch() {
        let dir = std::env::temp_dir().join("test_degenerate_branch");
        let mut tree = BucketTree::open(&dir, [3, 2, 2, 2], [2, 1, 1, 1]).unwrap();
        let strengths = IndexedStrengthList::new(vec![0, 1], vec![1.0, 1.0]).unwrap();
        let mut branch = tree.branch(BettingRound::PREFLOP);
        assert!(matches!(
            KMeansBucketizer::default().bucketize(&mut branch, &strengths, 3),
            Err(AbstractionError::DegenerateCluster { .. })
        ));
        assert!(matches!(
            KMeansBucketizer::default().bucketize(&mut branch, &strengths, 17),
            Err(AbstractionError::BucketOutOfRange { .. })
        ));
    }
}
