use crate::action::AbstractAction;
use crate::info_matrix::Intents;
use crate::rules::{Outcome, Seat};
use std::fmt;

/// Node of the abstract game tree
///
/// Decision nodes do not own accumulators, they name the matrix of their
/// `(seat, round)` and the columns of their intents.
#[derive(Debug, Clone, PartialEq)]
pub enum GameNode {
    /// a decision of the seat whose regret is being updated
    Proponent {
        seat: Seat,
        round: usize,
        intents: Intents,
        /// one per child, in child order
        actions: Vec<AbstractAction>,
    },
    /// a decision of any other seat, its strategy is held fixed
    Opponent {
        seat: Seat,
        round: usize,
        intents: Intents,
        actions: Vec<AbstractAction>,
    },
    /// the hand is over
    Terminal { outcome: Outcome },
}

impl GameNode {
    /// `(seat, round, intents, actions)` of a decision node
    pub fn decision(&self) -> Option<(Seat, usize, &Intents, &[AbstractAction])> {
        match self {
            GameNode::Proponent {
                seat,
                round,
                intents,
                actions,
            }
            | GameNode::Opponent {
                seat,
                round,
                intents,
                actions,
            } => Some((*seat, *round, intents, actions.as_slice())),
            GameNode::Terminal { .. } => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, GameNode::Terminal { .. })
    }
}

/// For printing nodes to terminal
impl fmt::Display for GameNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameNode::Proponent {
                seat,
                round,
                actions,
                ..
            } => write!(f, "Proponent seat {} round {} {:?}", seat, round, actions),
            GameNode::Opponent {
                seat,
                round,
                actions,
                ..
            } => write!(f, "Opponent seat {} round {} {:?}", seat, round, actions),
            GameNode::Terminal {
                outcome: Outcome::Fold { folder, commitments },
            } => write!(f, "Fold by seat {} {:?}", folder, commitments),
            GameNode::Terminal {
                outcome: Outcome::Showdown { commitments, .. },
            } => write!(f, "Showdown {:?}", commitments),
        }
    }
}
