//! Vanilla counterfactual regret minimization over the abstract tree
use crate::action::INTENT_COUNT;
use crate::deal::Deal;
use crate::error::Result;
use crate::game_node::GameNode;
use crate::grid::Grid;
use crate::info_matrix::InfoTree;
use crate::tree::NodeIndex;
use crate::tree_builder::GameTree;

/// One regret update pass of a proponent's tree under a fixed deal
pub struct Walker<'a, G: Grid, D: Deal> {
    tree: &'a GameTree,
    profile: &'a InfoTree<G>,
    deal: &'a D,
    /// probability of the deal
    chance: f64,
}

impl<'a, G: Grid, D: Deal> Walker<'a, G, D> {
    pub fn new(tree: &'a GameTree, profile: &'a InfoTree<G>, deal: &'a D, chance: f64) -> Self {
        Walker {
            tree,
            profile,
            deal,
            chance,
        }
    }

    /// Proponent's expected payoff from the root
    pub fn run(&self) -> Result<f64> {
        self.walk(self.tree.root(), 1.0, 1.0)
    }

    /// Counterfactual value of `node` for the proponent
    ///
    /// Regret is added at proponent nodes, weighted by the chance of the
    /// deal and the opponent's reach. The average strategy is weighted by
    /// the chance of the deal and the proponent's own reach.
    pub fn walk(&self, node: NodeIndex, proponent_reach: f64, opponent_reach: f64) -> Result<f64> {
        let children = self.tree.children(node);
        match self.tree.node(node) {
            GameNode::Terminal { outcome } => {
                let payoffs = outcome.payoffs(self.deal.strengths());
                Ok(payoffs[self.tree.proponent()] as f64)
            }
            GameNode::Proponent {
                seat,
                round,
                intents,
                actions,
            } => {
                let matrix = self.profile.matrix(*seat, *round);
                let info_set = matrix.info_set(self.deal.bucket(*seat, *round), *intents);
                let strategy = info_set.strategy()?;
                let mut values = [0f64; INTENT_COUNT];
                let mut ev = 0.0;
                for (action, child) in actions.iter().zip(children.iter()) {
                    let a = action.index();
                    values[a] = self.walk(*child, proponent_reach * strategy[a], opponent_reach)?;
                    ev += strategy[a] * values[a];
                }
                let mut regrets = [0f64; INTENT_COUNT];
                for action in actions {
                    let a = action.index();
                    regrets[a] = opponent_reach * self.chance * (values[a] - ev);
                }
                info_set.add_regret(&regrets)?;
                info_set.add_strategy(&strategy, proponent_reach * self.chance)?;
                Ok(ev)
            }
            GameNode::Opponent {
                seat,
                round,
                intents,
                actions,
            } => {
                let matrix = self.profile.matrix(*seat, *round);
                let info_set = matrix.info_set(self.deal.bucket(*seat, *round), *intents);
                let strategy = info_set.strategy()?;
                let mut ev = 0.0;
                for (action, child) in actions.iter().zip(children.iter()) {
                    let p = strategy[action.index()];
                    ev += p * self.walk(*child, proponent_reach, opponent_reach * p)?;
                }
                Ok(ev)
            }
        }
    }
}
