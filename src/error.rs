use crate::rules::RuleBreach;
use crate::tree_builder::TreeBuilderError;
use information_abstraction::AbstractionError;
use std::io;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum SolverError {
    #[error(transparent)]
    Abstraction(#[from] AbstractionError),
    #[error("rule breach: {0}")]
    Rule(#[from] RuleBreach),
    #[error(transparent)]
    Tree(#[from] TreeBuilderError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("invalid config: {0}")]
    Config(#[from] serde_json::Error),
    #[error("grid {name} is {rows}x{cols}, expected {expected_rows}x{expected_cols}")]
    GridShape {
        name: String,
        rows: usize,
        cols: usize,
        expected_rows: usize,
        expected_cols: usize,
    },
    #[error("invalid options: {0}")]
    InvalidOptions(String),
    #[error("bucket {bucket} out of range on round {round} ({rows} rows)")]
    BucketOutOfRange {
        round: usize,
        bucket: usize,
        rows: usize,
    },
    #[error("no decision for seat {seat} on round {round} after \"{history}\"")]
    UnknownHistory {
        seat: usize,
        round: usize,
        history: String,
    },
}

pub type Result<T> = std::result::Result<T, SolverError>;
