//! Card abstraction for texas holdem
//!
//! Maps every hand of every round to a small number of buckets: hands are
//! reduced to suit-isomorphic canons, rolled out against random boards into
//! strength histograms, then clustered by k-means over the histogram means.

pub mod abstraction;
pub mod bucket_list;
pub mod bucket_tree;
pub mod bucketizer;
pub mod canon;
pub mod card;
pub mod error;
pub mod evaluator;
pub mod histogram;
pub mod kmeans;
pub mod offsets;
pub mod rollout;
pub mod round;

pub use abstraction::{Abstraction, AbstractionOptions};
pub use error::AbstractionError;
