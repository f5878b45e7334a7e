//! Regret and strategy accumulators
//!
//! An `InfoMatrix` holds one seat's accumulators for one round. Rows are
//! joint card buckets, columns are the intents the tree builder handed out to
//! decision nodes, so a `(row, intents)` pair is one information set.
use crate::action::{AbstractAction, BET_RAISE_IDX, CHECK_CALL_IDX, FOLD_IDX, INTENT_COUNT};
use crate::error::{Result, SolverError};
use crate::grid::{ArrayGrid, FileGrid, Grid};
use rand::Rng;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Columns of a decision node's intents, `None` for an illegal intent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Intents {
    pub fold: Option<u16>,
    pub check_call: Option<u16>,
    pub bet_raise: Option<u16>,
}

impl Intents {
    pub fn get(&self, intent: usize) -> Option<u16> {
        match intent {
            FOLD_IDX => self.fold,
            CHECK_CALL_IDX => self.check_call,
            BET_RAISE_IDX => self.bet_raise,
            _ => None,
        }
    }

    pub fn set(&mut self, action: AbstractAction, col: u16) {
        match action {
            AbstractAction::Fold => self.fold = Some(col),
            AbstractAction::CheckCall => self.check_call = Some(col),
            AbstractAction::BetRaise => self.bet_raise = Some(col),
        }
    }

    pub fn is_legal(&self, intent: usize) -> bool {
        self.get(intent).is_some()
    }

    /// number of legal intents
    pub fn count(&self) -> usize {
        (0..INTENT_COUNT).filter(|i| self.is_legal(*i)).count()
    }

    /// Uniform over the legal intents
    pub fn default_strategy(&self) -> [f64; INTENT_COUNT] {
        let mut strategy = [0f64; INTENT_COUNT];
        let count = self.count();
        if count == 0 {
            return strategy;
        }
        for (i, s) in strategy.iter_mut().enumerate() {
            if self.is_legal(i) {
                *s = 1.0 / count as f64;
            }
        }
        strategy
    }
}

/// Normalizes the positive part of `values` over the legal intents
///
/// Falls back to the uniform default when there is no positive mass.
fn normalize_positive(values: &[f64; INTENT_COUNT], intents: &Intents) -> [f64; INTENT_COUNT] {
    let mut strategy = [0f64; INTENT_COUNT];
    let mut norm_sum = 0.0;
    for i in 0..INTENT_COUNT {
        if intents.is_legal(i) {
            strategy[i] = values[i].max(0.0);
            norm_sum += strategy[i];
        }
    }
    if norm_sum > 0.0 {
        for s in &mut strategy {
            *s /= norm_sum;
        }
        strategy
    } else {
        intents.default_strategy()
    }
}

/// Samples an intent by walking fold, then call, else raise
///
/// Illegal intents must have zero probability.
pub fn next_probable_action<R: Rng>(probs: &[f64; INTENT_COUNT], rng: &mut R) -> AbstractAction {
    let z: f64 = rng.gen();
    let mut sum = 0.0;
    let mut last = AbstractAction::CheckCall;
    for action in AbstractAction::ALL.iter() {
        let p = probs[action.index()];
        if p <= 0.0 {
            continue;
        }
        sum += p;
        last = *action;
        if z < sum {
            return *action;
        }
    }
    // rounding left `z` past the total
    last
}

/// Regret and cumulative strategy grids of identical shape
#[derive(Debug)]
pub struct InfoMatrix<G: Grid> {
    regret: G,
    strategy: G,
}

impl<G: Grid> InfoMatrix<G> {
    pub fn new(regret: G, strategy: G) -> Result<Self> {
        if regret.shape() != strategy.shape() {
            return Err(SolverError::GridShape {
                name: "strategy".to_string(),
                rows: strategy.rows(),
                cols: strategy.cols(),
                expected_rows: regret.rows(),
                expected_cols: regret.cols(),
            });
        }
        Ok(InfoMatrix { regret, strategy })
    }

    pub fn rows(&self) -> usize {
        self.regret.rows()
    }

    pub fn cols(&self) -> usize {
        self.regret.cols()
    }

    pub fn regret(&self) -> &G {
        &self.regret
    }

    pub fn strategy(&self) -> &G {
        &self.strategy
    }

    /// # Panics
    ///
    /// if `bucket` is not a row of the matrix
    pub fn info_set(&self, bucket: usize, intents: Intents) -> InfoSet<'_, G> {
        assert!(bucket < self.rows(), "bucket {} out of {}", bucket, self.rows());
        InfoSet {
            matrix: self,
            row: bucket,
            intents,
        }
    }
}

impl InfoMatrix<ArrayGrid> {
    pub fn zeroed(rows: usize, cols: usize) -> Self {
        InfoMatrix {
            regret: ArrayGrid::new(rows, cols),
            strategy: ArrayGrid::new(rows, cols),
        }
    }
}

/// View of one information set
pub struct InfoSet<'a, G: Grid> {
    matrix: &'a InfoMatrix<G>,
    row: usize,
    intents: Intents,
}

impl<'a, G: Grid> InfoSet<'a, G> {
    pub fn intents(&self) -> &Intents {
        &self.intents
    }

    fn read(&self, grid: &G) -> io::Result<[f64; INTENT_COUNT]> {
        let mut values = [0f64; INTENT_COUNT];
        for (i, value) in values.iter_mut().enumerate() {
            if let Some(col) = self.intents.get(i) {
                *value = grid.get(self.row, usize::from(col))?;
            }
        }
        Ok(values)
    }

    /// Current strategy by regret matching
    pub fn strategy(&self) -> io::Result<[f64; INTENT_COUNT]> {
        Ok(normalize_positive(&self.read(&self.matrix.regret)?, &self.intents))
    }

    /// Normalized cumulative strategy, the equilibrium estimate
    pub fn average_strategy(&self) -> io::Result<[f64; INTENT_COUNT]> {
        Ok(normalize_positive(&self.read(&self.matrix.strategy)?, &self.intents))
    }

    pub fn add_regret(&self, regrets: &[f64; INTENT_COUNT]) -> io::Result<()> {
        for (i, regret) in regrets.iter().enumerate() {
            if let Some(col) = self.intents.get(i) {
                self.matrix.regret.add(self.row, usize::from(col), *regret)?;
            }
        }
        Ok(())
    }

    pub fn add_strategy(&self, strategy: &[f64; INTENT_COUNT], reach: f64) -> io::Result<()> {
        for (i, s) in strategy.iter().enumerate() {
            if let Some(col) = self.intents.get(i) {
                self.matrix.strategy.add(self.row, usize::from(col), reach * s)?;
            }
        }
        Ok(())
    }
}

/// Matrix shape of every (seat, round), `shapes[seat][round] = (rows, cols)`
pub type Shapes = Vec<Vec<(usize, usize)>>;

/// Accumulators of a whole strategy profile, one matrix per (seat, round)
#[derive(Debug)]
pub struct InfoTree<G: Grid> {
    rounds: usize,
    matrices: Vec<InfoMatrix<G>>,
}

fn grid_path(dir: &Path, seat: usize, round: usize, kind: &str) -> PathBuf {
    dir.join(format!("seat{}-round{}.{}", seat, round, kind))
}

fn check_shape(path: &Path, shape: (usize, usize), expected: (usize, usize)) -> Result<()> {
    if shape != expected {
        return Err(SolverError::GridShape {
            name: path.display().to_string(),
            rows: shape.0,
            cols: shape.1,
            expected_rows: expected.0,
            expected_cols: expected.1,
        });
    }
    Ok(())
}

impl<G: Grid> InfoTree<G> {
    pub fn seats(&self) -> usize {
        self.matrices.len() / self.rounds.max(1)
    }

    pub fn rounds(&self) -> usize {
        self.rounds
    }

    pub fn matrix(&self, seat: usize, round: usize) -> &InfoMatrix<G> {
        &self.matrices[seat * self.rounds + round]
    }

    /// Writes both grids of every matrix to `dir`
    ///
    /// Each file is written beside its destination and renamed over it, so a
    /// crash never leaves a partially written grid.
    pub fn save(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;
        for seat in 0..self.seats() {
            for round in 0..self.rounds {
                let matrix = self.matrix(seat, round);
                for (kind, grid) in [("regret", &matrix.regret), ("strategy", &matrix.strategy)] {
                    let path = grid_path(dir, seat, round, kind);
                    let tmp = path.with_extension(format!("{}.tmp", kind));
                    {
                        let mut writer = BufWriter::new(File::create(&tmp)?);
                        grid.write_to(&mut writer)?;
                        writer.flush()?;
                    }
                    fs::rename(&tmp, &path)?;
                }
            }
        }
        debug!("saved {} matrices to {}", self.matrices.len(), dir.display());
        Ok(())
    }
}

impl InfoTree<ArrayGrid> {
    /// Zeroed accumulators
    pub fn new(shapes: &Shapes) -> Self {
        let rounds = shapes.first().map_or(0, |s| s.len());
        let matrices = shapes
            .iter()
            .flat_map(|seat| seat.iter())
            .map(|(rows, cols)| InfoMatrix::zeroed(*rows, *cols))
            .collect();
        InfoTree { rounds, matrices }
    }

    /// Loads every grid from `dir` into memory, checking it has the expected shape
    pub fn load(dir: &Path, shapes: &Shapes) -> Result<Self> {
        let rounds = shapes.first().map_or(0, |s| s.len());
        let mut matrices = Vec::new();
        for (seat, seat_shapes) in shapes.iter().enumerate() {
            for (round, shape) in seat_shapes.iter().enumerate() {
                let regret_path = grid_path(dir, seat, round, "regret");
                let strategy_path = grid_path(dir, seat, round, "strategy");
                let regret = ArrayGrid::load(&regret_path)?;
                check_shape(&regret_path, regret.shape(), *shape)?;
                let strategy = ArrayGrid::load(&strategy_path)?;
                check_shape(&strategy_path, strategy.shape(), *shape)?;
                matrices.push(InfoMatrix::new(regret, strategy)?);
            }
        }
        info!("loaded {} matrices from {}", matrices.len(), dir.display());
        Ok(InfoTree { rounds, matrices })
    }

    /// Loads the grids in `dir` if every file is there, otherwise starts from zero
    pub fn retrieve_or_create(dir: &Path, shapes: &Shapes) -> Result<Self> {
        let complete = shapes.iter().enumerate().all(|(seat, seat_shapes)| {
            (0..seat_shapes.len()).all(|round| {
                grid_path(dir, seat, round, "regret").exists()
                    && grid_path(dir, seat, round, "strategy").exists()
            })
        });
        if complete {
            InfoTree::load(dir, shapes)
        } else {
            info!("no saved profile in {}, starting from zero", dir.display());
            Ok(InfoTree::new(shapes))
        }
    }
}

impl InfoTree<FileGrid> {
    /// Opens the saved grids in place without reading them into memory
    pub fn open(dir: &Path, shapes: &Shapes) -> Result<Self> {
        let rounds = shapes.first().map_or(0, |s| s.len());
        let mut matrices = Vec::new();
        for (seat, seat_shapes) in shapes.iter().enumerate() {
            for (round, shape) in seat_shapes.iter().enumerate() {
                let regret_path = grid_path(dir, seat, round, "regret");
                let strategy_path = grid_path(dir, seat, round, "strategy");
                let regret = FileGrid::open(&regret_path)?;
                check_shape(&regret_path, regret.shape(), *shape)?;
                let strategy = FileGrid::open(&strategy_path)?;
                check_shape(&strategy_path, strategy.shape(), *shape)?;
                matrices.push(InfoMatrix::new(regret, strategy)?);
            }
        }
        Ok(InfoTree { rounds, matrices })
    }
}
