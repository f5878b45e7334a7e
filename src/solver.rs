use crate::action::{history_to_string, AbstractAction, INTENT_COUNT};
use crate::constants::*;
use crate::deal::{Dealer, HoldemDealer, KuhnDealer};
use crate::error::{Result, SolverError};
use crate::grid::ArrayGrid;
use crate::info_matrix::InfoTree;
use crate::rules::{KuhnRules, LimitRules, Rules, Seat};
use crate::tree_builder::{GameTree, TreeBuilder};
use crate::walker::Walker;
use information_abstraction::evaluator::HandEvaluator;
use information_abstraction::{Abstraction, AbstractionOptions};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

const PROGRESS_FILE: &str = "progress.json";

fn default_stacks() -> [u32; SEATS] {
    [DEFAULT_STACK; SEATS]
}

fn default_blinds() -> [u32; SEATS] {
    DEFAULT_BLINDS
}

/// Which game to solve
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GameOptions {
    Kuhn,
    Limit {
        /// chips of each seat before the blinds
        #[serde(default = "default_stacks")]
        stacks: [u32; SEATS],
        /// [small blind, big blind]
        #[serde(default = "default_blinds")]
        blinds: [u32; SEATS],
        #[serde(default)]
        abstraction: AbstractionOptions,
    },
}

/// options for a training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverOptions {
    pub game: GameOptions,
    /// total iterations `train` runs to
    pub iterations: u64,
    /// iterations between checkpoints, 0 saves only at the end
    #[serde(default)]
    pub checkpoint_interval: u64,
    /// where the profile and progress are saved
    pub checkpoint_dir: PathBuf,
    #[serde(default)]
    pub seed: u64,
    /// run iterations on the rayon pool
    #[serde(default)]
    pub parallel: bool,
}

impl SolverOptions {
    pub fn from_file(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    fn validate(&self) -> Result<()> {
        if self.iterations == 0 {
            return Err(SolverError::InvalidOptions(
                "iterations must be greater than zero".to_string(),
            ));
        }
        if self.checkpoint_dir.as_os_str().is_empty() {
            return Err(SolverError::InvalidOptions(
                "checkpoint dir is empty".to_string(),
            ));
        }
        if let GameOptions::Limit { stacks, blinds, .. } = &self.game {
            if blinds[0] > blinds[1] || blinds[1] == 0 {
                return Err(SolverError::InvalidOptions(format!(
                    "blinds {:?} must be [small, big] with a nonzero big blind",
                    blinds
                )));
            }
            if stacks.iter().any(|stack| *stack <= blinds[1]) {
                return Err(SolverError::InvalidOptions(format!(
                    "stacks {:?} must exceed the big blind",
                    stacks
                )));
            }
        }
        Ok(())
    }
}

/// Training progress saved beside the profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct Progress {
    iterations: u64,
}

/// Counterfactual regret minimization over an abstract game
///
/// Holds one tree per proponent seat and the shared strategy profile.
pub struct Solver<R: Rules, D: Dealer> {
    options: SolverOptions,
    rules: R,
    dealer: D,
    trees: Vec<GameTree>,
    profile: InfoTree<ArrayGrid>,
    /// iterations completed, including those of a resumed checkpoint
    iterations: u64,
}

impl<R: Rules, D: Dealer> Solver<R, D> {
    pub fn init(options: SolverOptions, rules: R, dealer: D) -> Result<Self> {
        options.validate()?;
        if dealer.rounds() != rules.rounds() {
            return Err(SolverError::InvalidOptions(format!(
                "dealer has {} rounds, rules have {}",
                dealer.rounds(),
                rules.rounds()
            )));
        }
        let start_time = Instant::now();
        let trees = TreeBuilder::build_all(&rules)?;
        let rows: Vec<usize> = (0..dealer.rounds()).map(|r| dealer.rows(r)).collect();
        let shapes = trees[0].layout().shapes(&rows);
        let profile = InfoTree::new(&shapes);
        info!(
            "built {} trees with {} decisions each in {}ms",
            trees.len(),
            trees[0].decision_count(),
            start_time.elapsed().as_millis()
        );
        for (seat, seat_shapes) in shapes.iter().enumerate() {
            debug!("seat {} matrices {:?}", seat, seat_shapes);
        }
        Ok(Solver {
            options,
            rules,
            dealer,
            trees,
            profile,
            iterations: 0,
        })
    }

    pub fn options(&self) -> &SolverOptions {
        &self.options
    }

    pub fn rules(&self) -> &R {
        &self.rules
    }

    pub fn dealer(&self) -> &D {
        &self.dealer
    }

    pub fn trees(&self) -> &[GameTree] {
        &self.trees
    }

    pub fn tree(&self, seat: Seat) -> &GameTree {
        &self.trees[seat]
    }

    pub fn profile(&self) -> &InfoTree<ArrayGrid> {
        &self.profile
    }

    /// iterations completed so far
    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    fn iteration_seed(&self, iteration: u64) -> u64 {
        self.options
            .seed
            .wrapping_add(iteration.wrapping_mul(0x9E37_79B9_7F4A_7C15))
    }

    /// One iteration: a pass of every proponent's tree under every deal
    ///
    /// Returns the chance weighted value of each seat.
    pub fn iterate<Rn: Rng>(&self, rng: &mut Rn) -> Result<Vec<f64>> {
        let deals = self.dealer.deals(rng)?;
        let mut values = vec![0f64; self.trees.len()];
        for (deal, chance) in &deals {
            for tree in &self.trees {
                let value = Walker::new(tree, &self.profile, deal, *chance).run()?;
                values[tree.proponent()] += chance * value;
            }
        }
        Ok(values)
    }

    /// Runs `iterations` in order from one seeded generator
    ///
    /// Returns the mean value of each seat.
    pub fn run(&mut self, iterations: u64) -> Result<Vec<f64>> {
        let mut rng = SmallRng::seed_from_u64(self.iteration_seed(self.iterations));
        let mut totals = vec![0f64; self.trees.len()];
        for _ in 0..iterations {
            let values = self.iterate(&mut rng)?;
            totals.iter_mut().zip(values).for_each(|(t, v)| *t += v);
            self.iterations += 1;
        }
        Ok(mean(totals, iterations))
    }

    /// Runs `iterations` on the rayon pool, each with its own seed
    ///
    /// Iterations read and update the shared profile concurrently.
    pub fn run_parallel(&mut self, iterations: u64) -> Result<Vec<f64>> {
        let first = self.iterations;
        let seats = self.trees.len();
        let solver = &*self;
        let totals = (first..first + iterations)
            .into_par_iter()
            .map(|iteration| {
                let mut rng = SmallRng::seed_from_u64(solver.iteration_seed(iteration));
                solver.iterate(&mut rng)
            })
            .try_reduce(
                || vec![0f64; seats],
                |mut a, b| {
                    a.iter_mut().zip(b).for_each(|(x, y)| *x += y);
                    Ok(a)
                },
            )?;
        self.iterations += iterations;
        Ok(mean(totals, iterations))
    }

    fn run_batch(&mut self, iterations: u64) -> Result<Vec<f64>> {
        if self.options.parallel {
            self.run_parallel(iterations)
        } else {
            self.run(iterations)
        }
    }

    /// Restores the profile and progress saved in the checkpoint dir
    ///
    /// Returns false and leaves the solver untouched when there is no checkpoint.
    pub fn resume(&mut self) -> Result<bool> {
        let path = self.options.checkpoint_dir.join(PROGRESS_FILE);
        if !path.exists() {
            return Ok(false);
        }
        let progress: Progress = serde_json::from_reader(BufReader::new(File::open(&path)?))?;
        let rows: Vec<usize> = (0..self.dealer.rounds())
            .map(|r| self.dealer.rows(r))
            .collect();
        let shapes = self.trees[0].layout().shapes(&rows);
        self.profile = InfoTree::load(&self.options.checkpoint_dir, &shapes)?;
        self.iterations = progress.iterations;
        info!(
            "resumed from {} at iteration {}",
            self.options.checkpoint_dir.display(),
            self.iterations
        );
        Ok(true)
    }

    /// Saves the profile, then the progress that refers to it
    pub fn save_checkpoint(&self) -> Result<()> {
        let dir = &self.options.checkpoint_dir;
        self.profile.save(dir)?;
        let path = dir.join(PROGRESS_FILE);
        let tmp = path.with_extension("json.tmp");
        let progress = Progress {
            iterations: self.iterations,
        };
        serde_json::to_writer(File::create(&tmp)?, &progress)?;
        fs::rename(&tmp, &path)?;
        info!("checkpoint at iteration {} in {}", self.iterations, dir.display());
        Ok(())
    }

    /// Trains up to the configured iteration count
    ///
    /// Resumes from a checkpoint if one exists and saves one every
    /// `checkpoint_interval` iterations and at the end. Running it again after
    /// it finished does no further work.
    pub fn train(&mut self) -> Result<u64> {
        self.resume()?;
        let target = self.options.iterations;
        let interval = match self.options.checkpoint_interval {
            0 => target,
            n => n,
        };
        let start_time = Instant::now();
        while self.iterations < target {
            let batch = interval.min(target - self.iterations);
            let values = self.run_batch(batch)?;
            debug!("iteration {} values {:?}", self.iterations, values);
            self.save_checkpoint()?;
        }
        info!(
            "trained {} iterations in {}ms",
            self.iterations,
            start_time.elapsed().as_millis()
        );
        Ok(self.iterations)
    }

    /// Average strategy of `seat` holding `bucket` after `history`
    pub fn average_strategy(
        &self,
        seat: Seat,
        round: usize,
        bucket: usize,
        history: &[AbstractAction],
    ) -> Result<[f64; INTENT_COUNT]> {
        let unknown = || SolverError::UnknownHistory {
            seat,
            round,
            history: history_to_string(history),
        };
        let tree = self.trees.get(seat).ok_or_else(unknown)?;
        let node = tree.follow(history).ok_or_else(unknown)?;
        match tree.node(node).decision() {
            Some((s, r, intents, _)) if s == seat && r == round => {
                let matrix = self.profile.matrix(seat, round);
                if bucket >= matrix.rows() {
                    return Err(SolverError::BucketOutOfRange {
                        round,
                        bucket,
                        rows: matrix.rows(),
                    });
                }
                Ok(matrix.info_set(bucket, *intents).average_strategy()?)
            }
            _ => Err(unknown()),
        }
    }
}

fn mean(mut totals: Vec<f64>, iterations: u64) -> Vec<f64> {
    if iterations > 0 {
        totals.iter_mut().for_each(|t| *t /= iterations as f64);
    }
    totals
}

impl Solver<KuhnRules, KuhnDealer> {
    pub fn kuhn(options: SolverOptions) -> Result<Self> {
        if !matches!(options.game, GameOptions::Kuhn) {
            return Err(SolverError::InvalidOptions(
                "expected a kuhn game".to_string(),
            ));
        }
        Solver::init(options, KuhnRules::default(), KuhnDealer)
    }
}

impl Solver<LimitRules, HoldemDealer> {
    /// Builds or loads the card abstraction, then the solver
    pub fn limit(options: SolverOptions) -> Result<Self> {
        options.validate()?;
        let (stacks, blinds, abstraction) = match &options.game {
            GameOptions::Limit {
                stacks,
                blinds,
                abstraction,
            } => (*stacks, *blinds, abstraction.clone()),
            _ => {
                return Err(SolverError::InvalidOptions(
                    "expected a limit game".to_string(),
                ))
            }
        };
        let evaluator = HandEvaluator::build();
        let abstraction = Abstraction::build_or_load(&abstraction, &evaluator)?;
        let dealer = HoldemDealer::new(abstraction, evaluator);
        Solver::init(options, LimitRules::new(stacks, blinds), dealer)
    }
}
