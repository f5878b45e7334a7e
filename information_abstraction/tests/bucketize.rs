use approx::assert_abs_diff_eq;
use information_abstraction::bucket_tree::BucketTree;
use information_abstraction::bucketizer::{Bucketizer, IndexedStrengthList, KMeansBucketizer};
use information_abstraction::kmeans::Kmeans;
use information_abstraction::round::BettingRound;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

const CENTERS: [f64; 3] = [0.2, 0.5, 0.8];
const PER_MODE: usize = 200;

/// strengths drawn around three well separated centers, with their true mode
fn trimodal(seed: u64) -> (Vec<f64>, Vec<u8>) {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut strengths = Vec::new();
    let mut modes = Vec::new();
    for _ in 0..PER_MODE {
        for (mode, center) in CENTERS.iter().enumerate() {
            strengths.push(center + rng.gen_range(-0.05..0.05));
            modes.push(mode as u8);
        }
    }
    (strengths, modes)
}

#[test]
fn test_trimodal_recovery() {
    for seed in 0..5u64 {
        let (strengths, modes) = trimodal(seed);
        let n = strengths.len() as u64;
        let dir = std::env::temp_dir().join(format!("test_trimodal_recovery_{}", seed));
        let mut tree = BucketTree::open(&dir, [3, 2, 2, 2], [n, 1, 1, 1]).unwrap();
        let list = IndexedStrengthList::new((0..n).collect(), strengths).unwrap();
        let bucketizer = KMeansBucketizer {
            seed,
            restarts: 3,
            ..KMeansBucketizer::default()
        };
        let counts = {
            let mut branch = tree.branch(BettingRound::PREFLOP);
            bucketizer.bucketize(&mut branch, &list, 3).unwrap()
        };
        assert_eq!(counts.iter().sum::<usize>(), n as usize);

        let recovered = modes
            .iter()
            .enumerate()
            .filter(|(canon, mode)| tree.get(BettingRound::PREFLOP, *canon as u64) == **mode)
            .count();
        assert!(
            recovered as f64 >= 0.95 * n as f64,
            "seed {} recovered {} of {}",
            seed,
            recovered,
            n
        );
    }
}

#[test]
fn test_trimodal_centers() {
    let (strengths, _) = trimodal(11);
    let classifier = KMeansBucketizer::default().cluster(&strengths, 3).unwrap();
    let mut means = classifier.means().to_vec();
    means.sort_by(|a, b| a.total_cmp(b));
    for (mean, center) in means.iter().zip(CENTERS.iter()) {
        assert_abs_diff_eq!(*mean, *center, epsilon = 0.02);
    }
}

#[test]
fn test_restarts_never_worse() {
    let (strengths, _) = trimodal(3);
    let single = KMeansBucketizer::default().cluster(&strengths, 3).unwrap();
    let several = KMeansBucketizer {
        restarts: 4,
        ..KMeansBucketizer::default()
    }
    .cluster(&strengths, 3)
    .unwrap();
    assert!(several.inertia(&strengths) <= single.inertia(&strengths) + 1e-12);
}

#[test]
fn test_fixed_means_converge() {
    let (strengths, _) = trimodal(7);
    let mut classifier = Kmeans::with_means(vec![0.1, 0.5, 0.9], strengths.len());
    let iterations = classifier.run(&strengths, 1e-9, 100).unwrap();
    assert!(iterations < 100);
    assert_eq!(classifier.counts(), &[PER_MODE, PER_MODE, PER_MODE][..]);
}
