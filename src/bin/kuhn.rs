use clap::Parser;
use colored::*;
use holdem_cfr::action::{history_to_string, BET_RAISE_IDX, CHECK_CALL_IDX, FOLD_IDX};
use holdem_cfr::agents::{play_match, Agent, CfrAgent, RandomAgent};
use holdem_cfr::rules::KuhnRules;
use holdem_cfr::solver::{GameOptions, Solver, SolverOptions};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::error::Error;
use std::path::PathBuf;
use std::result::Result;

const CARD_NAMES: [&str; 3] = ["J", "Q", "K"];

#[derive(Parser)]
#[command(version = "1.0", about = "Solve kuhn poker and print the strategy")]
struct Opts {
    #[arg(short, long, default_value_t = 10_000)]
    iterations: u64,
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// hands to play against a random agent
    #[arg(long, default_value_t = 10_000)]
    hands: usize,
    #[arg(long)]
    parallel: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();
    let opts: Opts = Opts::parse();
    let options = SolverOptions {
        game: GameOptions::Kuhn,
        iterations: opts.iterations,
        checkpoint_interval: 0,
        checkpoint_dir: PathBuf::from("kuhn"),
        seed: opts.seed,
        parallel: opts.parallel,
    };
    let mut solver = Solver::kuhn(options)?;
    let values = if opts.parallel {
        solver.run_parallel(opts.iterations)?
    } else {
        solver.run(opts.iterations)?
    };
    println!("mean value per seat {:?}", values);

    println!(
        "{:>6} {:>8} {:>4} {:>6} {:>6} {:>6}",
        "seat", "history", "card", "fold", "call", "raise"
    );
    for tree in solver.trees() {
        for (node, n) in tree.tree().iter() {
            let (seat, round) = match n.data.decision() {
                Some((seat, round, _, _)) if seat == tree.proponent() => (seat, round),
                _ => continue,
            };
            let history = tree.history(node);
            for (card, name) in CARD_NAMES.iter().enumerate() {
                let strategy = solver.average_strategy(seat, round, card, &history)?;
                println!(
                    "{:>6} {:>8} {:>4} {:>6.3} {:>6.3} {:>6.3}",
                    seat,
                    format!("'{}'", history_to_string(&history)),
                    name.bold(),
                    strategy[FOLD_IDX],
                    strategy[CHECK_CALL_IDX],
                    strategy[BET_RAISE_IDX]
                );
            }
        }
    }

    let rules = KuhnRules::default();
    let mut rng = SmallRng::seed_from_u64(opts.seed);
    for cfr_seat in 0..2 {
        let mut cfr = CfrAgent::new(solver.tree(cfr_seat), solver.profile(), opts.seed);
        let mut random = RandomAgent::new(opts.seed);
        let mut agents: [&mut dyn Agent<KuhnRules>; 2] = if cfr_seat == 0 {
            [&mut cfr, &mut random]
        } else {
            [&mut random, &mut cfr]
        };
        let totals = play_match(&rules, solver.dealer(), &mut agents, opts.hands, &mut rng)?;
        let won = totals[cfr_seat] as f64 / opts.hands.max(1) as f64;
        let line = format!("cfr agent in seat {} wins {:.3} per hand", cfr_seat, won);
        if won > 0.0 {
            println!("{}", line.green());
        } else {
            println!("{}", line.red());
        }
    }
    Ok(())
}
