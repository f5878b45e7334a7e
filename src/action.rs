use serde::{Deserialize, Serialize};
use std::fmt;

/// column of the fold intent
pub const FOLD_IDX: usize = 0;
/// column of the check or call intent
pub const CHECK_CALL_IDX: usize = 1;
/// column of the bet or raise intent
pub const BET_RAISE_IDX: usize = 2;
/// number of intents at a decision point
pub const INTENT_COUNT: usize = 3;

/// Represents a player action without sizing
///
/// Bet sizes are fixed by the rules, so a decision is one of three intents.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, Eq, PartialEq, Hash)]
pub enum AbstractAction {
    Fold,
    /// Check when nothing is owed, call otherwise
    CheckCall,
    /// Bet when nothing is owed, raise otherwise
    BetRaise,
}

impl AbstractAction {
    /// In the order intents are walked when sampling
    pub const ALL: [AbstractAction; INTENT_COUNT] = [
        AbstractAction::Fold,
        AbstractAction::CheckCall,
        AbstractAction::BetRaise,
    ];

    pub fn index(self) -> usize {
        match self {
            AbstractAction::Fold => FOLD_IDX,
            AbstractAction::CheckCall => CHECK_CALL_IDX,
            AbstractAction::BetRaise => BET_RAISE_IDX,
        }
    }

    pub fn from_index(index: usize) -> Option<AbstractAction> {
        AbstractAction::ALL.get(index).copied()
    }

    /// Single character used for compact histories
    pub fn symbol(self) -> char {
        match self {
            AbstractAction::Fold => 'f',
            AbstractAction::CheckCall => 'c',
            AbstractAction::BetRaise => 'r',
        }
    }

    /// Parses a compact history such as `"crc"`
    pub fn parse_history(history: &str) -> Option<Vec<AbstractAction>> {
        history
            .chars()
            .map(|c| match c {
                'f' => Some(AbstractAction::Fold),
                'c' => Some(AbstractAction::CheckCall),
                'r' => Some(AbstractAction::BetRaise),
                _ => None,
            })
            .collect()
    }
}

/// For printing actions to terminal
impl fmt::Display for AbstractAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbstractAction::Fold => write!(f, "Fold"),
            AbstractAction::CheckCall => write!(f, "Check/Call"),
            AbstractAction::BetRaise => write!(f, "Bet/Raise"),
        }
    }
}

/// Formats an action history in its compact form
pub fn history_to_string(history: &[AbstractAction]) -> String {
    history.iter().map(|a| a.symbol()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_order() {
        for (i, action) in AbstractAction::ALL.iter().enumerate() {
            assert_eq!(action.index(), i);
            assert_eq!(AbstractAction::from_index(i), Some(*action));
        }
        assert_eq!(AbstractAction::from_index(INTENT_COUNT), None);
    }

    #[test]
    fn test_parse_history() {
        let history = AbstractAction::parse_history("crf").unwrap();
        assert_eq!(
            history,
            vec![
                AbstractAction::CheckCall,
                AbstractAction::BetRaise,
                AbstractAction::Fold
            ]
        );
        assert_eq!(history_to_string(&history), "crf");
        assert!(AbstractAction::parse_history("cx").is_none());
    }
}
