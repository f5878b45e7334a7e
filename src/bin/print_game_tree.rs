use clap::{Parser, ValueEnum};
use colored::*;
use holdem_cfr::constants::*;
use holdem_cfr::game_node::GameNode;
use holdem_cfr::rules::{KuhnRules, LimitRules, Rules};
use holdem_cfr::tree_builder::{GameTree, TreeBuilder};
use std::error::Error;
use std::result::Result;

#[derive(Clone, Copy, ValueEnum)]
enum Game {
    Kuhn,
    Limit,
}

#[derive(Parser)]
#[command(version = "1.0", about = "Print the abstract game tree")]
struct Opts {
    #[arg(long, value_enum, default_value = "kuhn")]
    game: Game,
    /// seat whose decisions are marked as the proponent's
    #[arg(long, default_value_t = 0)]
    proponent: usize,
    /// stop printing below this depth
    #[arg(long)]
    max_depth: Option<usize>,
    /// chips of each seat in the limit game
    #[arg(long, default_value_t = DEFAULT_STACK)]
    stack: u32,
}

/// Recursively prints a node on the game tree
fn print_node(tree: &GameTree, node: usize, depth: usize, max_depth: usize) {
    let spaces = "  ".repeat(depth);
    match tree.node(node) {
        GameNode::Terminal { .. } => {
            println!("{}{}", spaces, tree.node(node).to_string().dimmed());
        }
        GameNode::Proponent { actions, .. } | GameNode::Opponent { actions, .. } => {
            if depth >= max_depth {
                println!("{}...", spaces);
                return;
            }
            let is_proponent = matches!(tree.node(node), GameNode::Proponent { .. });
            let (seat, round, intents, _) = match tree.node(node).decision() {
                Some(decision) => decision,
                None => return,
            };
            for (action, child) in actions.iter().zip(tree.children(node)) {
                let col = intents.get(action.index()).unwrap_or_default();
                let label = format!("seat {} round {} {} [{}]", seat, round, action, col);
                if is_proponent {
                    println!("{}{}", spaces, label.green());
                } else {
                    println!("{}{}", spaces, label);
                }
                print_node(tree, *child, depth + 1, max_depth);
            }
        }
    }
}

fn print_tree<R: Rules>(rules: &R, opts: &Opts) -> Result<(), Box<dyn Error>> {
    let tree = TreeBuilder::build(rules, opts.proponent)?;
    print_node(&tree, tree.root(), 0, opts.max_depth.unwrap_or(usize::MAX));
    println!(
        "{} nodes, {} decisions",
        tree.tree().len().to_string().bold(),
        tree.decision_count().to_string().bold()
    );
    for round in 0..tree.layout().rounds() {
        let cols: Vec<usize> = (0..tree.layout().seats())
            .map(|seat| tree.layout().cols(seat, round))
            .collect();
        println!("round {} intent columns per seat {:?}", round, cols);
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();
    let opts: Opts = Opts::parse();
    match opts.game {
        Game::Kuhn => print_tree(&KuhnRules::default(), &opts),
        Game::Limit => print_tree(&LimitRules::new([opts.stack; SEATS], DEFAULT_BLINDS), &opts),
    }
}
