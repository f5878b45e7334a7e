use holdem_cfr::action::AbstractAction;
use holdem_cfr::game_node::GameNode;
use holdem_cfr::rules::{LimitRules, Rules};
use holdem_cfr::tree_builder::{GameTree, TreeBuilder};
use std::error::Error;
use std::result::Result;

fn follow(tree: &GameTree, history: &str) -> Option<usize> {
    tree.follow(&AbstractAction::parse_history(history).unwrap())
}

#[test]
fn test_proponent_trees_agree() -> Result<(), Box<dyn Error>> {
    let trees = TreeBuilder::build_all(&LimitRules::default())?;
    assert_eq!(trees[0].layout(), trees[1].layout());
    assert_eq!(trees[0].tree().len(), trees[1].tree().len());
    for ((_, a), (_, b)) in trees[0].tree().iter().zip(trees[1].tree().iter()) {
        assert_eq!(a.data.decision(), b.data.decision());
    }
    for tree in &trees {
        for (_, node) in tree.tree().iter() {
            match &node.data {
                GameNode::Proponent { seat, .. } => assert_eq!(*seat, tree.proponent()),
                GameNode::Opponent { seat, .. } => assert_ne!(*seat, tree.proponent()),
                GameNode::Terminal { .. } => assert!(node.is_leaf()),
            }
        }
    }
    Ok(())
}

#[test]
fn test_betting_sequences() -> Result<(), Box<dyn Error>> {
    let tree = TreeBuilder::build(&LimitRules::default(), 0)?;

    // the big blind keeps its option after a limp
    let limp = follow(&tree, "c").unwrap();
    assert!(matches!(tree.node(limp).decision(), Some((1, 0, _, _))));

    // the big blind opens the flop
    let flop = follow(&tree, "cc").unwrap();
    assert!(matches!(tree.node(flop).decision(), Some((1, 1, _, _))));
    let capped = follow(&tree, "rrrc").unwrap();
    assert!(matches!(tree.node(capped).decision(), Some((1, 1, _, _))));

    // four bets cap the preflop
    let facing_cap = follow(&tree, "rrr").unwrap();
    match tree.node(facing_cap).decision() {
        Some((1, 0, intents, actions)) => {
            assert_eq!(actions, &[AbstractAction::Fold, AbstractAction::CheckCall]);
            assert_eq!(intents.bet_raise, None);
        }
        node => panic!("unexpected node {:?}", node),
    }
    assert_eq!(follow(&tree, "rrrr"), None);

    // nothing to call on the flop, no fold
    assert_eq!(follow(&tree, "ccf"), None);
    // check through every street
    let showdown = follow(&tree, "cccccccc").unwrap();
    assert!(matches!(
        tree.node(showdown),
        GameNode::Terminal { outcome } if outcome.commitments() == [2, 2]
    ));
    Ok(())
}

#[test]
fn test_terminal_payoffs_sum_to_zero() -> Result<(), Box<dyn Error>> {
    for stacks in [[200, 200], [5, 20], [20, 3]] {
        let tree = TreeBuilder::build(&LimitRules::new(stacks, [1, 2]), 1)?;
        let mut terminals = 0;
        for (_, node) in tree.tree().iter() {
            if let GameNode::Terminal { outcome } = &node.data {
                terminals += 1;
                for strengths in [[3, 1], [1, 3], [2, 2]] {
                    assert_eq!(outcome.payoffs(&strengths).iter().sum::<i64>(), 0);
                }
                for (seat, committed) in outcome.commitments().iter().enumerate() {
                    assert!(*committed <= stacks[seat]);
                }
            }
        }
        assert!(terminals > 0);
    }
    Ok(())
}

#[test]
fn test_short_stack_runs_out() -> Result<(), Box<dyn Error>> {
    // the small blind can raise once before it is all in
    let rules = LimitRules::new([5, 20], [1, 2]);
    let tree = TreeBuilder::build(&rules, 0)?;
    let all_in = rules
        .apply(AbstractAction::BetRaise)?
        .apply(AbstractAction::BetRaise)?
        .apply(AbstractAction::CheckCall)?;
    assert!(all_in.is_all_in(0));
    assert!(all_in.is_over());
    let node = follow(&tree, "rrc").unwrap();
    match tree.node(node) {
        GameNode::Terminal { outcome } => {
            assert_eq!(outcome.commitments(), [5, 6]);
            // the uncalled chip goes back to the big blind
            assert_eq!(outcome.payoffs(&[3, 1]), vec![5, -5]);
        }
        node => panic!("unexpected node {}", node),
    }
    Ok(())
}
