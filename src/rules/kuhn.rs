use super::{Outcome, RuleBreach, Rules, Seat};
use crate::action::AbstractAction;
use crate::constants::SEATS;

/// Kuhn poker
///
/// Three cards, one dealt to each seat. Both seats ante one chip and a
/// single bet of one chip is allowed in the only betting round.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct KuhnRules {
    committed: [u32; SEATS],
    /// seat that made the bet, if any
    bettor: Option<Seat>,
    checks: u8,
    folder: Option<Seat>,
    showdown: bool,
    to_act: Seat,
}

impl Default for KuhnRules {
    fn default() -> Self {
        KuhnRules {
            committed: [1; SEATS],
            bettor: None,
            checks: 0,
            folder: None,
            showdown: false,
            to_act: 0,
        }
    }
}

impl KuhnRules {
    pub fn committed(&self) -> [u32; SEATS] {
        self.committed
    }
}

impl Rules for KuhnRules {
    fn seats(&self) -> usize {
        SEATS
    }

    fn rounds(&self) -> usize {
        1
    }

    fn to_act(&self) -> Seat {
        self.to_act
    }

    fn round(&self) -> usize {
        0
    }

    fn actions(&self) -> Vec<AbstractAction> {
        if self.is_over() {
            Vec::new()
        } else if self.bettor.is_some() {
            vec![AbstractAction::Fold, AbstractAction::CheckCall]
        } else {
            vec![AbstractAction::CheckCall, AbstractAction::BetRaise]
        }
    }

    fn apply(&self, action: AbstractAction) -> Result<Self, RuleBreach> {
        if self.is_over() {
            return Err(RuleBreach::HandOver);
        }
        let seat = self.to_act;
        let mut next = *self;
        match (action, self.bettor) {
            (AbstractAction::Fold, None) => return Err(RuleBreach::NothingToCall),
            (AbstractAction::Fold, Some(_)) => next.folder = Some(seat),
            (AbstractAction::CheckCall, None) => {
                next.checks += 1;
                next.showdown = next.checks as usize == SEATS;
            }
            (AbstractAction::CheckCall, Some(_)) => {
                next.committed[seat] += 1;
                next.showdown = true;
            }
            (AbstractAction::BetRaise, None) => {
                next.committed[seat] += 1;
                next.bettor = Some(seat);
            }
            (AbstractAction::BetRaise, Some(_)) => return Err(RuleBreach::CappedRaise),
        }
        next.to_act = (seat + 1) % SEATS;
        Ok(next)
    }

    fn outcome(&self) -> Option<Outcome> {
        let commitments = self.committed.to_vec();
        if let Some(folder) = self.folder {
            Some(Outcome::Fold {
                folder,
                commitments,
            })
        } else if self.showdown {
            Some(Outcome::Showdown {
                commitments,
                contenders: (0..SEATS).collect(),
            })
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use AbstractAction::*;

    #[test]
    fn test_check_check() {
        let state = KuhnRules::default()
            .apply(CheckCall)
            .and_then(|s| s.apply(CheckCall))
            .unwrap();
        let outcome = state.outcome().unwrap();
        assert_eq!(outcome.payoffs(&[2, 0]), vec![1, -1]);
    }

    #[test]
    fn test_bet_call() {
        let state = KuhnRules::default()
            .apply(BetRaise)
            .and_then(|s| s.apply(CheckCall))
            .unwrap();
        assert_eq!(state.committed(), [2, 2]);
        assert_eq!(state.outcome().unwrap().payoffs(&[0, 1]), vec![-2, 2]);
    }

    #[test]
    fn test_check_bet_fold() {
        let state = KuhnRules::default()
            .apply(CheckCall)
            .and_then(|s| s.apply(BetRaise))
            .unwrap();
        assert_eq!(state.to_act(), 0);
        assert_eq!(state.actions(), vec![Fold, CheckCall]);
        assert_eq!(state.apply(BetRaise), Err(RuleBreach::CappedRaise));
        let state = state.apply(Fold).unwrap();
        assert_eq!(state.outcome().unwrap().payoffs(&[2, 0]), vec![-1, 1]);
    }

    #[test]
    fn test_fold_needs_a_bet() {
        assert_eq!(
            KuhnRules::default().apply(Fold),
            Err(RuleBreach::NothingToCall)
        );
    }
}
