use approx::assert_abs_diff_eq;
use holdem_cfr::action::{AbstractAction, BET_RAISE_IDX, CHECK_CALL_IDX, FOLD_IDX};
use holdem_cfr::deal::KuhnDealer;
use holdem_cfr::rules::KuhnRules;
use holdem_cfr::solver::{GameOptions, Solver, SolverOptions};
use std::error::Error;
use std::result::Result;

const JACK: usize = 0;
const QUEEN: usize = 1;
const KING: usize = 2;
const EPSILON: f64 = 0.03;

fn solve(iterations: u64) -> Result<Solver<KuhnRules, KuhnDealer>, Box<dyn Error>> {
    let mut solver = Solver::kuhn(SolverOptions {
        game: GameOptions::Kuhn,
        iterations,
        checkpoint_interval: 0,
        checkpoint_dir: std::env::temp_dir().join("test_solve_kuhn"),
        seed: 0,
        parallel: false,
    })?;
    solver.run(iterations)?;
    Ok(solver)
}

fn history(s: &str) -> Vec<AbstractAction> {
    AbstractAction::parse_history(s).unwrap()
}

#[test]
fn test_solve_kuhn() -> Result<(), Box<dyn Error>> {
    let solver = solve(10_000)?;

    // second seat facing a bet: fold the jack, call a third with the queen
    let bet = history("r");
    let jack = solver.average_strategy(1, 0, JACK, &bet)?;
    let queen = solver.average_strategy(1, 0, QUEEN, &bet)?;
    let king = solver.average_strategy(1, 0, KING, &bet)?;
    assert_abs_diff_eq!(jack[FOLD_IDX], 1.0, epsilon = EPSILON);
    assert_abs_diff_eq!(queen[CHECK_CALL_IDX], 1.0 / 3.0, epsilon = EPSILON);
    assert_abs_diff_eq!(king[CHECK_CALL_IDX], 1.0, epsilon = EPSILON);
    assert_eq!(king[BET_RAISE_IDX], 0.0);

    // second seat after a check: bluff a third with the jack, always bet the king
    let check = history("c");
    let jack = solver.average_strategy(1, 0, JACK, &check)?;
    let queen = solver.average_strategy(1, 0, QUEEN, &check)?;
    let king = solver.average_strategy(1, 0, KING, &check)?;
    assert_abs_diff_eq!(jack[BET_RAISE_IDX], 1.0 / 3.0, epsilon = EPSILON);
    assert_abs_diff_eq!(queen[BET_RAISE_IDX], 0.0, epsilon = EPSILON);
    assert_abs_diff_eq!(king[BET_RAISE_IDX], 1.0, epsilon = EPSILON);

    // first seat never opens with the queen
    let queen = solver.average_strategy(0, 0, QUEEN, &[])?;
    assert_abs_diff_eq!(queen[BET_RAISE_IDX], 0.0, epsilon = EPSILON);
    assert_eq!(queen[FOLD_IDX], 0.0);
    Ok(())
}

#[test]
fn test_first_seat_bluffs_consistently() -> Result<(), Box<dyn Error>> {
    let solver = solve(10_000)?;
    // the king bets three times as often as the jack bluffs
    let jack = solver.average_strategy(0, 0, JACK, &[])?[BET_RAISE_IDX];
    let king = solver.average_strategy(0, 0, KING, &[])?[BET_RAISE_IDX];
    assert!(jack <= 1.0 / 3.0 + EPSILON);
    assert_abs_diff_eq!(king, 3.0 * jack, epsilon = 0.1);
    // after check and bet the queen calls a third more than the jack bluffed
    let queen = solver.average_strategy(0, 0, QUEEN, &history("cr"))?;
    assert_abs_diff_eq!(queen[CHECK_CALL_IDX], jack + 1.0 / 3.0, epsilon = 0.1);
    Ok(())
}

#[test]
fn test_strategies_sum_to_one() -> Result<(), Box<dyn Error>> {
    let solver = solve(200)?;
    for tree in solver.trees() {
        for (node, n) in tree.tree().iter() {
            if let Some((seat, round, _, _)) = n.data.decision() {
                if seat != tree.proponent() {
                    continue;
                }
                for bucket in [JACK, QUEEN, KING] {
                    let strategy = solver.average_strategy(seat, round, bucket, &tree.history(node))?;
                    assert_abs_diff_eq!(strategy.iter().sum::<f64>(), 1.0, epsilon = 1e-9);
                }
            }
        }
    }
    Ok(())
}
