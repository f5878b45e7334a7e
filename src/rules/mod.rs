//! Betting rules the game tree is built from
//!
//! A rule set is an immutable state: applying an action returns the next
//! state. Only abstract actions are exposed, bet sizes are fixed by the rules.
use crate::action::AbstractAction;
use thiserror::Error as ThisError;

pub mod kuhn;
pub mod limit;

pub use kuhn::KuhnRules;
pub use limit::LimitRules;

/// index of a player at the table
pub type Seat = usize;

/// An attempted action that the rules do not allow
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum RuleBreach {
    #[error("the hand is over")]
    HandOver,
    #[error("seat {actual} acted but seat {expected} is to act")]
    WrongSeat { expected: Seat, actual: Seat },
    #[error("betting is capped")]
    CappedRaise,
    #[error("cannot fold with nothing to call")]
    NothingToCall,
    #[error("seat {0} has no chips to raise")]
    NoChips(Seat),
}

/// How a hand ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// `folder` gave up, the others split what is in the pot
    Fold {
        folder: Seat,
        commitments: Vec<u32>,
    },
    /// the best hands among `contenders` win
    Showdown {
        commitments: Vec<u32>,
        contenders: Vec<Seat>,
    },
}

impl Outcome {
    pub fn commitments(&self) -> &[u32] {
        match self {
            Outcome::Fold { commitments, .. } => commitments,
            Outcome::Showdown { commitments, .. } => commitments,
        }
    }

    /// Net chips won by each seat
    ///
    /// # Arguments
    /// * `strengths` hand value of each seat, higher wins, unused on a fold
    pub fn payoffs(&self, strengths: &[u16]) -> Vec<i64> {
        match self {
            Outcome::Fold {
                folder,
                commitments,
            } => {
                let contenders: Vec<Seat> =
                    (0..commitments.len()).filter(|s| s != folder).collect();
                settle(commitments, &contenders, &vec![0; commitments.len()])
            }
            Outcome::Showdown {
                commitments,
                contenders,
            } => settle(commitments, contenders, strengths),
        }
    }
}

/// Splits the pot layer by layer
///
/// Each layer of commitment is contested by the contenders who put in at
/// least that much. Ties split a layer evenly, the remainder goes to the
/// first winner in seat order. A layer no contender matched is returned to
/// the seats that put it in.
fn settle(commitments: &[u32], contenders: &[Seat], strengths: &[u16]) -> Vec<i64> {
    let mut payoffs: Vec<i64> = commitments.iter().map(|c| -i64::from(*c)).collect();
    let mut levels: Vec<u32> = commitments.iter().copied().filter(|c| *c > 0).collect();
    levels.sort_unstable();
    levels.dedup();

    let mut floor = 0u32;
    for level in levels {
        let layer: u32 = commitments
            .iter()
            .map(|c| (*c).min(level) - (*c).min(floor))
            .sum();
        let mut eligible: Vec<Seat> = contenders
            .iter()
            .copied()
            .filter(|s| commitments[*s] >= level)
            .collect();
        if eligible.is_empty() {
            eligible = (0..commitments.len())
                .filter(|s| commitments[*s] >= level)
                .collect();
        }
        eligible.sort_unstable();
        let best = eligible.iter().map(|s| strengths[*s]).max().unwrap_or(0);
        let winners: Vec<Seat> = eligible
            .into_iter()
            .filter(|s| strengths[*s] == best)
            .collect();
        let share = i64::from(layer) / winners.len() as i64;
        let remainder = i64::from(layer) % winners.len() as i64;
        for w in &winners {
            payoffs[*w] += share;
        }
        payoffs[winners[0]] += remainder;
        floor = level;
    }
    payoffs
}

/// State of a hand under some betting rules
pub trait Rules: Clone + Send + Sync {
    /// number of seats dealt in
    fn seats(&self) -> usize;
    /// number of betting rounds in a hand
    fn rounds(&self) -> usize;
    /// seat whose decision it is
    fn to_act(&self) -> Seat;
    /// current betting round
    fn round(&self) -> usize;
    /// legal actions for the seat to act, empty once the hand is over
    fn actions(&self) -> Vec<AbstractAction>;
    fn apply(&self, action: AbstractAction) -> Result<Self, RuleBreach>;
    /// how the hand ended, `None` while it is being played
    fn outcome(&self) -> Option<Outcome>;

    /// Applies an action on behalf of `seat`
    fn apply_as(&self, seat: Seat, action: AbstractAction) -> Result<Self, RuleBreach> {
        if self.outcome().is_some() {
            return Err(RuleBreach::HandOver);
        }
        if seat != self.to_act() {
            return Err(RuleBreach::WrongSeat {
                expected: self.to_act(),
                actual: seat,
            });
        }
        self.apply(action)
    }

    /// Every legal action paired with the state it leads to
    fn transitions(&self) -> Vec<(AbstractAction, Self)> {
        self.actions()
            .into_iter()
            .filter_map(|action| self.apply(action).ok().map(|next| (action, next)))
            .collect()
    }

    fn is_over(&self) -> bool {
        self.outcome().is_some()
    }
}
