/// Builds the bucket tree used by the solver
///
/// Every canon of every round is rolled out into a strength histogram and
/// clustered into buckets. Bucket files are written to the output directory
/// and reused by later runs.
use clap::Parser;
use colored::*;
use information_abstraction::abstraction::{Abstraction, AbstractionOptions};
use information_abstraction::canon::{ExampleStore, Lineage};
use information_abstraction::card::cards_to_str;
use information_abstraction::evaluator::HandEvaluator;
use information_abstraction::round::BettingRound;
use std::error::Error;
use std::path::PathBuf;
use std::result::Result;

#[derive(Parser)]
#[command(version = "1.0", about = "Generate a card abstraction")]
struct Opts {
    /// json file with abstraction options, flags override it
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(long)]
    dir: Option<PathBuf>,
    /// buckets for preflop, flop, turn and river
    #[arg(long, num_args = 4, value_delimiter = ',')]
    buckets: Option<Vec<u8>>,
    /// bucket each round within the buckets of the previous one
    #[arg(long)]
    hierarchical: bool,
    #[arg(long)]
    samples: Option<usize>,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    histograms: bool,
    /// also write the example hand of every canon
    #[arg(long)]
    examples: bool,
    /// check parent/child offsets of every round before building
    #[arg(long)]
    verify: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();
    let opts: Opts = Opts::parse();

    let mut options = match &opts.config {
        Some(path) => AbstractionOptions::from_file(path)?,
        None => AbstractionOptions::default(),
    };
    if let Some(dir) = opts.dir {
        options.dir = dir;
    }
    if let Some(buckets) = opts.buckets {
        if buckets.len() != 4 {
            return Err(format!("expected 4 bucket counts, got {}", buckets.len()).into());
        }
        options.bucket_counts.copy_from_slice(&buckets);
    }
    if let Some(samples) = opts.samples {
        options.rollout.samples = samples;
    }
    if let Some(seed) = opts.seed {
        options.rollout.seed = seed;
        options.kmeans.seed = seed;
    }
    options.hierarchical |= opts.hierarchical;
    options.store_histograms |= opts.histograms;

    let evaluator = HandEvaluator::build();
    let abstraction = Abstraction::build_or_load(&options, &evaluator)?;
    let index = abstraction.canon_index();

    if opts.verify {
        for round in BettingRound::ALL[..3].iter() {
            let lineage = Lineage::build(index, *round)?;
            println!(
                "{} lineage ok: {} children",
                round.to_string().green(),
                lineage.total()
            );
        }
    }

    if opts.examples {
        for round in BettingRound::ALL.iter() {
            let path = options
                .dir
                .join(format!("examples-r{}.dat", usize::from(*round)));
            if path.exists() {
                continue;
            }
            ExampleStore::write(&path, index, *round)?;
        }
    }

    for round in BettingRound::ALL.iter() {
        println!(
            "{}: {} canons, {} buckets, {} sequences",
            round.to_string().bold(),
            index.round_size(*round),
            abstraction.tree().bucket_count(*round),
            abstraction.sequence_count(*round)
        );
        let hand = index.example(*round, 0)?;
        println!(
            "  canon 0 {} -> bucket {}",
            cards_to_str(&hand).yellow(),
            abstraction.bucket(*round, &hand)?
        );
    }
    Ok(())
}
