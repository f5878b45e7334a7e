/// Trains a strategy profile with checkpoints
///
/// Options are read from a json file and overridden by flags. Running it
/// again with the same checkpoint dir picks up where the last run stopped.
use clap::Parser;
use colored::*;
use holdem_cfr::constants::*;
use holdem_cfr::deal::Dealer;
use holdem_cfr::rules::Rules;
use holdem_cfr::solver::{GameOptions, Solver, SolverOptions};
use information_abstraction::AbstractionOptions;
use std::error::Error;
use std::path::PathBuf;
use std::result::Result;

#[derive(Parser)]
#[command(version = "1.0", about = "Train a limit holdem or kuhn strategy")]
struct Opts {
    /// json file with solver options, flags override it
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// solve kuhn poker instead of limit holdem
    #[arg(long)]
    kuhn: bool,
    #[arg(short, long)]
    iterations: Option<u64>,
    #[arg(long)]
    checkpoint_interval: Option<u64>,
    #[arg(long)]
    checkpoint_dir: Option<PathBuf>,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    parallel: bool,
    /// where the bucket tree is built or loaded
    #[arg(long)]
    abstraction_dir: Option<PathBuf>,
}

fn options(opts: &Opts) -> Result<SolverOptions, Box<dyn Error>> {
    let mut options = match &opts.config {
        Some(path) => SolverOptions::from_file(path)?,
        None => SolverOptions {
            game: GameOptions::Limit {
                stacks: [DEFAULT_STACK; SEATS],
                blinds: DEFAULT_BLINDS,
                abstraction: AbstractionOptions::default(),
            },
            iterations: 100_000,
            checkpoint_interval: 10_000,
            checkpoint_dir: PathBuf::from("checkpoints"),
            seed: 0,
            parallel: false,
        },
    };
    if opts.kuhn {
        options.game = GameOptions::Kuhn;
    }
    if let Some(iterations) = opts.iterations {
        options.iterations = iterations;
    }
    if let Some(interval) = opts.checkpoint_interval {
        options.checkpoint_interval = interval;
    }
    if let Some(dir) = &opts.checkpoint_dir {
        options.checkpoint_dir = dir.clone();
    }
    if let Some(seed) = opts.seed {
        options.seed = seed;
    }
    options.parallel |= opts.parallel;
    if let (Some(dir), GameOptions::Limit { abstraction, .. }) =
        (&opts.abstraction_dir, &mut options.game)
    {
        abstraction.dir = dir.clone();
    }
    Ok(options)
}

fn train<R: Rules, D: Dealer>(mut solver: Solver<R, D>) -> Result<(), Box<dyn Error>> {
    let done = solver.train()?;
    println!(
        "{} {} iterations, profile in {}",
        "trained".green().bold(),
        done,
        solver.options().checkpoint_dir.display()
    );
    for seat in 0..solver.profile().seats() {
        for round in 0..solver.profile().rounds() {
            let matrix = solver.profile().matrix(seat, round);
            println!(
                "seat {} round {}: {} x {}",
                seat,
                round,
                matrix.rows(),
                matrix.cols()
            );
        }
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();
    let opts: Opts = Opts::parse();
    let options = options(&opts)?;
    if matches!(options.game, GameOptions::Kuhn) {
        train(Solver::kuhn(options)?)
    } else {
        train(Solver::limit(options)?)
    }
}
