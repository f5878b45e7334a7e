use crate::round::BettingRound;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while building or reading a card abstraction
///
/// Apart from `Io` and `Exists`, every variant means a lookup table is
/// corrupt or does not match the rules it was built for. Callers abort and
/// rebuild rather than retry.
#[derive(Debug, Error)]
pub enum AbstractionError {
    #[error("canon {canon} out of bounds for {round} (size {size})")]
    CanonOutOfBounds {
        round: BettingRound,
        canon: u64,
        size: u64,
    },
    #[error("canon collision on {round}: canon {canon} maps to {classes} isomorphism classes")]
    Collision {
        round: BettingRound,
        canon: u64,
        classes: usize,
    },
    #[error("expected {expected} cards for {round}, got {actual}")]
    CardCount {
        round: BettingRound,
        expected: usize,
        actual: usize,
    },
    #[error("duplicate or invalid card in hand")]
    DuplicateCard,
    #[error("bucket {bucket} out of range (max {max})")]
    BucketOutOfRange { bucket: usize, max: usize },
    #[error("degenerate cluster on {round}: {k} buckets over {points} points")]
    DegenerateCluster {
        round: BettingRound,
        k: usize,
        points: usize,
    },
    #[error("inconsistent abstraction: {0}")]
    Inconsistent(String),
    #[error("refusing to overwrite {0}")]
    Exists(PathBuf),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AbstractionError>;
