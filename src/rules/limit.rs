use super::{Outcome, RuleBreach, Rules, Seat};
use crate::action::AbstractAction;
use crate::constants::*;
use std::fmt;

/// Heads-up fixed limit texas holdem
///
/// Seat 0 posts the small blind and acts first preflop, seat 1 posts the big
/// blind and acts first on later rounds. Bets are one big blind on preflop
/// and flop, two on turn and river.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LimitRules {
    /// chips behind
    stacks: [u32; SEATS],
    /// chips put in the pot this hand
    committed: [u32; SEATS],
    /// commitment every active seat has to match
    stake: u32,
    big_blind: u32,
    round: usize,
    /// bets made this round
    bets: u8,
    /// whether each seat made a voluntary action this round
    acted: [bool; SEATS],
    folded: [bool; SEATS],
    showdown: bool,
    to_act: Seat,
}

impl Default for LimitRules {
    fn default() -> Self {
        LimitRules::new([DEFAULT_STACK; SEATS], DEFAULT_BLINDS)
    }
}

impl LimitRules {
    /// Starts a hand with the blinds posted
    ///
    /// A blind that takes a whole stack puts that seat all in, so the first
    /// decision goes to the other seat. When no seat is left with a decision
    /// the hand starts at showdown.
    ///
    /// # Arguments
    /// * `stacks` chips of each seat before the blinds
    /// * `blinds` [small blind, big blind]
    pub fn new(stacks: [u32; SEATS], blinds: [u32; SEATS]) -> Self {
        let mut state = LimitRules {
            stacks,
            committed: [0; SEATS],
            stake: 0,
            big_blind: blinds[1],
            round: 0,
            bets: 1,
            acted: [false; SEATS],
            folded: [false; SEATS],
            showdown: false,
            to_act: 0,
        };
        state.pay(0, blinds[0]);
        state.pay(1, blinds[1]);
        state.stake = state.committed[0].max(state.committed[1]);
        let deciding = (0..SEATS).filter(|s| state.can_act(*s)).count();
        let owing = (0..SEATS).any(|s| state.can_act(s) && state.to_call(s) > 0);
        if deciding < 2 && !owing {
            state.round = HOLDEM_ROUNDS - 1;
            state.showdown = true;
        } else if !state.can_act(0) {
            state.to_act = state.next_seat(0);
        }
        state
    }

    pub fn stacks(&self) -> [u32; SEATS] {
        self.stacks
    }

    pub fn committed(&self) -> [u32; SEATS] {
        self.committed
    }

    pub fn pot(&self) -> u32 {
        self.committed.iter().sum()
    }

    /// bets made so far this round
    pub fn bets(&self) -> u8 {
        self.bets
    }

    /// chips a bet or raise adds on the current round
    pub fn bet_size(&self) -> u32 {
        if self.round < 2 {
            self.big_blind
        } else {
            2 * self.big_blind
        }
    }

    pub fn is_all_in(&self, seat: Seat) -> bool {
        self.stacks[seat] == 0
    }

    fn to_call(&self, seat: Seat) -> u32 {
        self.stake.saturating_sub(self.committed[seat])
    }

    /// moves up to `amount` from the seat's stack into the pot
    fn pay(&mut self, seat: Seat, amount: u32) {
        let paid = amount.min(self.stacks[seat]);
        self.stacks[seat] -= paid;
        self.committed[seat] += paid;
    }

    /// seats that can still make decisions
    fn can_act(&self, seat: Seat) -> bool {
        !self.folded[seat] && !self.is_all_in(seat)
    }

    fn can_raise(&self, seat: Seat) -> Result<(), RuleBreach> {
        if self.bets >= BET_CAP {
            return Err(RuleBreach::CappedRaise);
        }
        if self.stacks[seat] <= self.to_call(seat) {
            return Err(RuleBreach::NoChips(seat));
        }
        // nobody is left to call a raise
        if (0..SEATS).any(|s| s != seat && !self.folded[s] && self.is_all_in(s)) {
            return Err(RuleBreach::NoChips(1 - seat));
        }
        Ok(())
    }

    fn round_complete(&self) -> bool {
        (0..SEATS)
            .filter(|s| self.can_act(*s))
            .all(|s| self.acted[s] && self.committed[s] == self.stake)
    }

    /// moves to the next seat, the next round, or the end of the hand
    fn advance(&mut self) {
        if self.folded.iter().any(|f| *f) {
            return;
        }
        if !self.round_complete() {
            self.to_act = self.next_seat(self.to_act);
            return;
        }
        let active = (0..SEATS).filter(|s| self.can_act(*s)).count();
        if self.round + 1 >= HOLDEM_ROUNDS || active < 2 {
            // remaining cards are run out
            self.round = HOLDEM_ROUNDS - 1;
            self.showdown = true;
            return;
        }
        self.round += 1;
        self.bets = 0;
        self.acted = [false; SEATS];
        self.to_act = self.next_seat(0);
    }

    fn next_seat(&self, seat: Seat) -> Seat {
        let mut next = (seat + 1) % SEATS;
        for _ in 0..SEATS {
            if self.can_act(next) {
                break;
            }
            next = (next + 1) % SEATS;
        }
        next
    }
}

impl Rules for LimitRules {
    fn seats(&self) -> usize {
        SEATS
    }

    fn rounds(&self) -> usize {
        HOLDEM_ROUNDS
    }

    fn to_act(&self) -> Seat {
        self.to_act
    }

    fn round(&self) -> usize {
        self.round
    }

    fn actions(&self) -> Vec<AbstractAction> {
        if self.is_over() {
            return Vec::new();
        }
        let seat = self.to_act;
        let mut actions = Vec::with_capacity(3);
        if self.to_call(seat) > 0 {
            actions.push(AbstractAction::Fold);
        }
        actions.push(AbstractAction::CheckCall);
        if self.can_raise(seat).is_ok() {
            actions.push(AbstractAction::BetRaise);
        }
        actions
    }

    fn apply(&self, action: AbstractAction) -> Result<Self, RuleBreach> {
        if self.is_over() {
            return Err(RuleBreach::HandOver);
        }
        let seat = self.to_act;
        let mut next = *self;
        match action {
            AbstractAction::Fold => {
                if self.to_call(seat) == 0 {
                    return Err(RuleBreach::NothingToCall);
                }
                next.folded[seat] = true;
            }
            AbstractAction::CheckCall => {
                next.pay(seat, self.to_call(seat));
            }
            AbstractAction::BetRaise => {
                self.can_raise(seat)?;
                next.pay(seat, self.to_call(seat) + self.bet_size());
                next.stake = next.committed[seat];
                next.bets += 1;
            }
        }
        next.acted[seat] = true;
        next.advance();
        Ok(next)
    }

    fn outcome(&self) -> Option<Outcome> {
        let commitments = self.committed.to_vec();
        if let Some(folder) = (0..SEATS).find(|s| self.folded[*s]) {
            return Some(Outcome::Fold {
                folder,
                commitments,
            });
        }
        if self.showdown {
            return Some(Outcome::Showdown {
                commitments,
                contenders: (0..SEATS).collect(),
            });
        }
        None
    }
}

impl fmt::Display for LimitRules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "round {} pot {} committed {:?} stacks {:?} bets {}",
            self.round,
            self.pot(),
            self.committed,
            self.stacks,
            self.bets
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use AbstractAction::*;

    fn play(state: LimitRules, actions: &[AbstractAction]) -> LimitRules {
        actions
            .iter()
            .fold(state, |state, action| state.apply(*action).unwrap())
    }

    #[test]
    fn test_blinds() {
        let state = LimitRules::default();
        assert_eq!(state.committed(), [1, 2]);
        assert_eq!(state.to_act(), 0);
        assert_eq!(state.actions(), vec![Fold, CheckCall, BetRaise]);
    }

    #[test]
    fn test_big_blind_option() {
        let state = play(LimitRules::default(), &[CheckCall]);
        assert_eq!(state.round(), 0);
        assert_eq!(state.to_act(), 1);
        // fold is not offered when checking is free
        assert_eq!(state.actions(), vec![CheckCall, BetRaise]);
        assert_eq!(state.apply(Fold), Err(RuleBreach::NothingToCall));
        let flop = state.apply(CheckCall).unwrap();
        assert_eq!(flop.round(), 1);
        assert_eq!(flop.to_act(), 1);
    }

    #[test]
    fn test_postflop_needs_both_checks() {
        let flop = play(LimitRules::default(), &[CheckCall, CheckCall]);
        let after_one = flop.apply(CheckCall).unwrap();
        assert_eq!(after_one.round(), 1);
        assert_eq!(after_one.to_act(), 0);
        let turn = after_one.apply(CheckCall).unwrap();
        assert_eq!(turn.round(), 2);
        assert_eq!(turn.bet_size(), 4);
    }

    #[test]
    fn test_cap() {
        // blinds count as the first bet, three raises reach the cap
        let state = play(LimitRules::default(), &[BetRaise, BetRaise, BetRaise]);
        assert_eq!(state.bets(), BET_CAP);
        assert_eq!(state.actions(), vec![Fold, CheckCall]);
        assert_eq!(state.apply(BetRaise), Err(RuleBreach::CappedRaise));
        let flop = state.apply(CheckCall).unwrap();
        assert_eq!(flop.committed(), [8, 8]);
        assert_eq!(flop.round(), 1);
    }

    #[test]
    fn test_fold_outcome() {
        let state = play(LimitRules::default(), &[BetRaise, Fold]);
        assert_eq!(
            state.outcome(),
            Some(Outcome::Fold {
                folder: 1,
                commitments: vec![4, 2]
            })
        );
        assert_eq!(state.apply(CheckCall), Err(RuleBreach::HandOver));
        assert!(state.actions().is_empty());
        assert_eq!(state.outcome().unwrap().payoffs(&[0, 0]), vec![2, -2]);
    }

    #[test]
    fn test_showdown_after_river() {
        let mut state = play(LimitRules::default(), &[CheckCall, CheckCall]);
        for _ in 1..HOLDEM_ROUNDS {
            state = play(state, &[CheckCall, CheckCall]);
        }
        assert_eq!(
            state.outcome(),
            Some(Outcome::Showdown {
                commitments: vec![2, 2],
                contenders: vec![0, 1]
            })
        );
    }

    #[test]
    fn test_all_in_runs_out() {
        let state = LimitRules::new([5, 20], DEFAULT_BLINDS);
        // small blind raises to 4, big blind re-raises, small blind calls all-in for 5
        let state = play(state, &[BetRaise, BetRaise]);
        assert_eq!(state.actions(), vec![Fold, CheckCall]);
        assert_eq!(state.apply(BetRaise), Err(RuleBreach::NoChips(0)));
        let state = state.apply(CheckCall).unwrap();
        assert!(state.is_all_in(0));
        assert_eq!(state.round(), HOLDEM_ROUNDS - 1);
        let outcome = state.outcome().unwrap();
        assert_eq!(outcome.commitments(), &[5, 6][..]);
        assert_eq!(outcome.payoffs(&[9, 1]), vec![5, -5]);
    }

    #[test]
    fn test_all_in_blinds() {
        // the small blind is all in, the big blind has nothing to call
        let state = LimitRules::new([1, 20], DEFAULT_BLINDS);
        assert!(state.is_all_in(0));
        assert!(state.is_over());
        assert!(state.actions().is_empty());
        assert_eq!(state.round(), HOLDEM_ROUNDS - 1);
        let outcome = state.outcome().unwrap();
        assert_eq!(outcome.commitments(), &[1, 2][..]);
        assert_eq!(outcome.payoffs(&[1, 9]), vec![-1, 1]);

        // the big blind covers less than the small blind
        let state = LimitRules::new([20, 1], DEFAULT_BLINDS);
        assert!(state.is_over());
        assert_eq!(state.outcome().unwrap().commitments(), &[1, 1][..]);

        // an all in small blind leaves the decision to the big blind
        let state = LimitRules::new([2, 20], [3, 1]);
        assert!(state.is_all_in(0));
        assert_eq!(state.to_act(), 1);
        assert_eq!(state.actions(), vec![Fold, CheckCall]);
        let called = state.apply(CheckCall).unwrap();
        assert_eq!(called.outcome().unwrap().commitments(), &[2, 2][..]);
    }

    #[test]
    fn test_wrong_seat() {
        let state = LimitRules::default();
        assert_eq!(
            state.apply_as(1, CheckCall),
            Err(RuleBreach::WrongSeat {
                expected: 0,
                actual: 1
            })
        );
        assert_eq!(state.transitions().len(), 3);
    }
}
