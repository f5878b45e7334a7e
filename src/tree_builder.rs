use crate::action::{history_to_string, AbstractAction};
use crate::game_node::GameNode;
use crate::info_matrix::{Intents, Shapes};
use crate::rules::{RuleBreach, Rules, Seat};
use crate::tree::{NodeIndex, Tree};
use std::result::Result;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum TreeBuilderError {
    #[error("seat {seat} is not at a {seats} seat table")]
    InvalidProponent { seat: Seat, seats: usize },
    #[error("too many intents for seat {seat} on round {round}")]
    TooManyIntents { seat: Seat, round: usize },
    #[error("rules offered an illegal action: {0}")]
    Rule(#[from] RuleBreach),
}

/// Number of intent columns handed out per (seat, round)
///
/// Columns are numbered in the order the builder meets decision nodes, which
/// depends on the rules alone, so every proponent's tree shares them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentLayout {
    cols: Vec<Vec<usize>>,
}

impl IntentLayout {
    pub fn new(seats: usize, rounds: usize) -> Self {
        IntentLayout {
            cols: vec![vec![0; rounds]; seats],
        }
    }

    pub fn seats(&self) -> usize {
        self.cols.len()
    }

    pub fn rounds(&self) -> usize {
        self.cols.first().map_or(0, |r| r.len())
    }

    pub fn cols(&self, seat: Seat, round: usize) -> usize {
        self.cols[seat][round]
    }

    fn allocate(&mut self, seat: Seat, round: usize) -> Result<u16, TreeBuilderError> {
        let col = self.cols[seat][round];
        if col > usize::from(u16::MAX) {
            return Err(TreeBuilderError::TooManyIntents { seat, round });
        }
        self.cols[seat][round] += 1;
        Ok(col as u16)
    }

    /// Matrix shapes given the number of bucket rows of each round
    pub fn shapes(&self, rows: &[usize]) -> Shapes {
        self.cols
            .iter()
            .map(|seat| {
                seat.iter()
                    .zip(rows.iter())
                    .map(|(cols, rows)| (*rows, *cols))
                    .collect()
            })
            .collect()
    }
}

/// Abstract game tree for one proponent seat
#[derive(Debug)]
pub struct GameTree {
    proponent: Seat,
    tree: Tree<GameNode>,
    layout: IntentLayout,
}

impl GameTree {
    pub fn proponent(&self) -> Seat {
        self.proponent
    }

    pub fn tree(&self) -> &Tree<GameNode> {
        &self.tree
    }

    pub fn layout(&self) -> &IntentLayout {
        &self.layout
    }

    pub fn root(&self) -> NodeIndex {
        Tree::<GameNode>::ROOT
    }

    pub fn node(&self, node: NodeIndex) -> &GameNode {
        &self.tree.get_node(node).data
    }

    pub fn children(&self, node: NodeIndex) -> &[NodeIndex] {
        &self.tree.get_node(node).children
    }

    /// Walks an action history down from the root
    ///
    /// Returns `None` if an action is not offered along the way.
    pub fn follow(&self, history: &[AbstractAction]) -> Option<NodeIndex> {
        let mut node = self.root();
        for action in history {
            let (_, _, _, actions) = self.node(node).decision()?;
            let position = actions.iter().position(|a| a == action)?;
            node = self.children(node)[position];
        }
        Some(node)
    }

    /// Actions leading from the root to `node`
    pub fn history(&self, mut node: NodeIndex) -> Vec<AbstractAction> {
        let mut history = Vec::new();
        while let Some(parent) = self.tree.get_node(node).parent {
            let position = self
                .children(parent)
                .iter()
                .position(|child| *child == node);
            if let (Some((_, _, _, actions)), Some(position)) =
                (self.node(parent).decision(), position)
            {
                history.push(actions[position]);
            }
            node = parent;
        }
        history.reverse();
        history
    }

    pub fn decision_count(&self) -> usize {
        self.tree
            .iter()
            .filter(|(_, node)| !node.data.is_terminal())
            .count()
    }
}

/// A helper class to build the abstract game tree from a rule set
pub struct TreeBuilder {
    proponent: Seat,
    tree: Tree<GameNode>,
    layout: IntentLayout,
}

impl TreeBuilder {
    /// Build the tree for `proponent` starting from `rules`
    pub fn build<R: Rules>(rules: &R, proponent: Seat) -> Result<GameTree, TreeBuilderError> {
        if proponent >= rules.seats() {
            return Err(TreeBuilderError::InvalidProponent {
                seat: proponent,
                seats: rules.seats(),
            });
        }
        let mut builder = TreeBuilder {
            proponent,
            tree: Tree::default(),
            layout: IntentLayout::new(rules.seats(), rules.rounds()),
        };
        builder.build_node(None, rules, &mut Vec::new())?;
        debug!(
            "built tree for seat {} with {} nodes",
            proponent,
            builder.tree.len()
        );
        Ok(GameTree {
            proponent: builder.proponent,
            tree: builder.tree,
            layout: builder.layout,
        })
    }

    /// One tree per seat
    pub fn build_all<R: Rules>(rules: &R) -> Result<Vec<GameTree>, TreeBuilderError> {
        (0..rules.seats())
            .map(|seat| TreeBuilder::build(rules, seat))
            .collect()
    }

    /// Build a node and its subtree, return the node index
    fn build_node<R: Rules>(
        &mut self,
        parent: Option<NodeIndex>,
        rules: &R,
        history: &mut Vec<AbstractAction>,
    ) -> Result<NodeIndex, TreeBuilderError> {
        if let Some(outcome) = rules.outcome() {
            return Ok(self.tree.add_node(parent, GameNode::Terminal { outcome }));
        }
        let seat = rules.to_act();
        let round = rules.round();
        let actions = rules.actions();
        let mut intents = Intents::default();
        for action in &actions {
            intents.set(*action, self.layout.allocate(seat, round)?);
        }
        let data = if seat == self.proponent {
            GameNode::Proponent {
                seat,
                round,
                intents,
                actions: actions.clone(),
            }
        } else {
            GameNode::Opponent {
                seat,
                round,
                intents,
                actions: actions.clone(),
            }
        };
        let node = self.tree.add_node(parent, data);
        for action in actions {
            let next = rules.apply(action).map_err(|e| {
                debug!("{} breaks the rules after {}", action, history_to_string(history));
                e
            })?;
            history.push(action);
            self.build_node(Some(node), &next, history)?;
            history.pop();
        }
        Ok(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{KuhnRules, Outcome};
    use AbstractAction::*;

    #[test]
    fn test_build_kuhn() {
        let tree = TreeBuilder::build(&KuhnRules::default(), 0).unwrap();
        assert_eq!(tree.tree().len(), 9);
        assert_eq!(tree.decision_count(), 4);
        assert_eq!(tree.layout().cols(0, 0), 4);
        assert_eq!(tree.layout().cols(1, 0), 4);
        assert_eq!(tree.layout().shapes(&[3]), vec![vec![(3, 4)], vec![(3, 4)]]);

        match tree.node(tree.root()) {
            GameNode::Proponent {
                seat: 0,
                intents,
                actions,
                ..
            } => {
                assert_eq!(actions, &vec![CheckCall, BetRaise]);
                assert_eq!(intents.fold, None);
                assert_eq!(intents.check_call, Some(0));
                assert_eq!(intents.bet_raise, Some(1));
            }
            node => panic!("unexpected root {}", node),
        }
    }

    #[test]
    fn test_follow() {
        let tree = TreeBuilder::build(&KuhnRules::default(), 1).unwrap();
        let node = tree.follow(&[CheckCall, BetRaise]).unwrap();
        match tree.node(node) {
            GameNode::Opponent { seat, actions, .. } => {
                assert_eq!(*seat, 0);
                assert_eq!(actions, &vec![Fold, CheckCall]);
            }
            node => panic!("unexpected node {}", node),
        }
        let node = tree.follow(&[BetRaise, Fold]).unwrap();
        assert!(matches!(
            tree.node(node),
            GameNode::Terminal {
                outcome: Outcome::Fold { folder: 1, .. }
            }
        ));
        assert_eq!(tree.history(node), vec![BetRaise, Fold]);
        assert!(tree.history(tree.root()).is_empty());
        assert_eq!(tree.follow(&[Fold]), None);
        assert_eq!(tree.follow(&[BetRaise, Fold, CheckCall]), None);
    }

    #[test]
    fn test_proponents_share_columns() {
        let trees = TreeBuilder::build_all(&KuhnRules::default()).unwrap();
        assert_eq!(trees[0].layout(), trees[1].layout());
        for ((_, a), (_, b)) in trees[0].tree().iter().zip(trees[1].tree().iter()) {
            match (a.data.decision(), b.data.decision()) {
                (Some(a), Some(b)) => assert_eq!(a, b),
                (None, None) => {}
                _ => panic!("trees differ in shape"),
            }
        }
    }

    #[test]
    fn test_invalid_proponent() {
        assert!(matches!(
            TreeBuilder::build(&KuhnRules::default(), 2),
            Err(TreeBuilderError::InvalidProponent { seat: 2, seats: 2 })
        ));
    }
}
