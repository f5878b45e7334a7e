use crate::action::{AbstractAction, INTENT_COUNT};
use crate::deal::{Deal, Dealer};
use crate::error::Result;
use crate::grid::Grid;
use crate::info_matrix::{next_probable_action, InfoTree, Intents};
use crate::rules::Rules;
use crate::tree_builder::GameTree;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::debug;

/// Entity that employs a strategy to play poker
///
/// An agent is shown the table, the actions taken so far this hand and the
/// bucket row of its cards, and chooses one of the legal actions.
pub trait Agent<R: Rules> {
    /// Selects a legal action for the seat to act
    fn act(&mut self, rules: &R, history: &[AbstractAction], bucket: usize) -> AbstractAction;
}

/// Uniform over the legal actions of `rules`
fn uniform<R: Rules>(rules: &R) -> [f64; INTENT_COUNT] {
    let mut intents = Intents::default();
    for action in rules.actions() {
        intents.set(action, 0);
    }
    intents.default_strategy()
}

/// RandomAgent selects from the legal actions at random
#[derive(Debug)]
pub struct RandomAgent {
    rng: SmallRng,
}

impl RandomAgent {
    pub fn new(seed: u64) -> Self {
        RandomAgent {
            rng: SmallRng::seed_from_u64(seed),
        }
    }
}

impl<R: Rules> Agent<R> for RandomAgent {
    fn act(&mut self, rules: &R, _history: &[AbstractAction], _bucket: usize) -> AbstractAction {
        rules
            .actions()
            .choose(&mut self.rng)
            .copied()
            .unwrap_or(AbstractAction::CheckCall)
    }
}

/// Plays the average strategy of a trained profile
///
/// Falls back to uniform play wherever the profile has nothing to say, so a
/// hand never fails because of it.
pub struct CfrAgent<'a, G: Grid> {
    tree: &'a GameTree,
    profile: &'a InfoTree<G>,
    rng: SmallRng,
}

impl<'a, G: Grid> CfrAgent<'a, G> {
    pub fn new(tree: &'a GameTree, profile: &'a InfoTree<G>, seed: u64) -> Self {
        CfrAgent {
            tree,
            profile,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Probability of each intent after `history` holding `bucket`
    pub fn strategy<R: Rules>(
        &self,
        rules: &R,
        history: &[AbstractAction],
        bucket: usize,
    ) -> [f64; INTENT_COUNT] {
        let decision = self
            .tree
            .follow(history)
            .and_then(|node| self.tree.node(node).decision());
        let (seat, round, intents) = match decision {
            Some((seat, round, intents, _)) if seat == rules.to_act() => (seat, round, intents),
            _ => {
                debug!("no decision after {:?}, playing uniform", history);
                return uniform(rules);
            }
        };
        let matrix = self.profile.matrix(seat, round);
        if bucket >= matrix.rows() {
            return uniform(rules);
        }
        match matrix.info_set(bucket, *intents).average_strategy() {
            Ok(strategy) => strategy,
            Err(e) => {
                debug!("reading strategy failed: {}", e);
                uniform(rules)
            }
        }
    }
}

impl<'a, R: Rules, G: Grid> Agent<R> for CfrAgent<'a, G> {
    fn act(&mut self, rules: &R, history: &[AbstractAction], bucket: usize) -> AbstractAction {
        let legal = rules.actions();
        let mut probs = self.strategy(rules, history, bucket);
        for (i, p) in probs.iter_mut().enumerate() {
            if !legal.iter().any(|a| a.index() == i) {
                *p = 0.0;
            }
        }
        if probs.iter().sum::<f64>() <= 0.0 {
            probs = uniform(rules);
        }
        next_probable_action(&probs, &mut self.rng)
    }
}

/// Plays one hand of `deal` from `rules`, `agents[seat]` acting for each seat
///
/// Returns the chips won by each seat.
pub fn play_hand<R: Rules, D: Deal>(
    rules: &R,
    deal: &D,
    agents: &mut [&mut dyn Agent<R>],
) -> Result<Vec<i64>> {
    let mut state = rules.clone();
    let mut history = Vec::new();
    loop {
        if let Some(outcome) = state.outcome() {
            return Ok(outcome.payoffs(deal.strengths()));
        }
        let seat = state.to_act();
        let action = agents[seat].act(&state, &history, deal.bucket(seat, state.round()));
        state = state.apply_as(seat, action)?;
        history.push(action);
    }
}

/// Plays `hands` hands of sampled deals and totals each seat's winnings
pub fn play_match<R: Rules, D: Dealer, Rn: Rng>(
    rules: &R,
    dealer: &D,
    agents: &mut [&mut dyn Agent<R>],
    hands: usize,
    rng: &mut Rn,
) -> Result<Vec<i64>> {
    let mut totals = vec![0i64; rules.seats()];
    for _ in 0..hands {
        let deal = dealer.sample(rng)?;
        let payoffs = play_hand(rules, &deal, agents)?;
        totals.iter_mut().zip(payoffs).for_each(|(t, p)| *t += p);
    }
    Ok(totals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deal::{KuhnDeal, KuhnDealer};
    use crate::grid::ArrayGrid;
    use crate::rules::{KuhnRules, LimitRules};
    use crate::tree_builder::TreeBuilder;

    #[test]
    fn test_random_agent_legal() {
        let mut agent = RandomAgent::new(0);
        let rules = LimitRules::default();
        for _ in 0..100 {
            let action = agent.act(&rules, &[], 0);
            assert!(rules.actions().contains(&action));
        }
        // nothing to call, no fold
        let rules = KuhnRules::default();
        for _ in 0..100 {
            assert_ne!(agent.act(&rules, &[], 0), AbstractAction::Fold);
        }
    }

    #[test]
    fn test_cfr_agent_follows_profile() {
        let trees = TreeBuilder::build_all(&KuhnRules::default()).unwrap();
        let profile = InfoTree::<ArrayGrid>::new(&trees[0].layout().shapes(&[3]));
        // seat 0 holding the king learns to bet
        let root = trees[0].node(trees[0].root()).decision().map(|d| *d.2).unwrap();
        profile
            .matrix(0, 0)
            .info_set(2, root)
            .add_strategy(&[0.0, 0.0, 1.0], 1.0)
            .unwrap();
        let mut agent = CfrAgent::new(&trees[0], &profile, 0);
        let rules = KuhnRules::default();
        for _ in 0..20 {
            assert_eq!(agent.act(&rules, &[], 2), AbstractAction::BetRaise);
        }
        // unseen rows play uniform
        assert_eq!(agent.strategy(&rules, &[], 0), [0.0, 0.5, 0.5]);
        // a history off the tree plays uniform too
        let after = rules.apply(AbstractAction::BetRaise).unwrap();
        let history = [AbstractAction::CheckCall, AbstractAction::CheckCall];
        assert_eq!(agent.strategy(&after, &history, 0), [0.5, 0.5, 0.0]);
    }

    #[test]
    fn test_play_hand() {
        let rules = KuhnRules::default();
        let deal = KuhnDeal::new([2, 0]);
        let mut first = RandomAgent::new(1);
        let mut second = RandomAgent::new(2);
        let mut agents: [&mut dyn Agent<KuhnRules>; 2] = [&mut first, &mut second];
        for _ in 0..50 {
            let payoffs = play_hand(&rules, &deal, &mut agents).unwrap();
            assert_eq!(payoffs.iter().sum::<i64>(), 0);
            assert!(matches!(payoffs[0].abs(), 1 | 2));
        }
    }

    #[test]
    fn test_play_match_zero_sum() {
        let mut rng = SmallRng::seed_from_u64(7);
        let mut first = RandomAgent::new(1);
        let mut second = RandomAgent::new(2);
        let mut agents: [&mut dyn Agent<KuhnRules>; 2] = [&mut first, &mut second];
        let totals = play_match(
            &KuhnRules::default(),
            &KuhnDealer,
            &mut agents,
            500,
            &mut rng,
        )
        .unwrap();
        assert_eq!(totals[0] + totals[1], 0);
    }
}
