use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
use std::fmt;

/// The Current Betting Round a Texas Holdem game is in
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum BettingRound {
    PREFLOP,
    FLOP,
    TURN,
    RIVER,
}

impl BettingRound {
    pub const ALL: [BettingRound; 4] = [
        BettingRound::PREFLOP,
        BettingRound::FLOP,
        BettingRound::TURN,
        BettingRound::RIVER,
    ];

    /// Cards visible to one seat by the end of this round (hole + board)
    pub const fn cards_dealt(self) -> usize {
        match self {
            BettingRound::PREFLOP => 2,
            BettingRound::FLOP => 5,
            BettingRound::TURN => 6,
            BettingRound::RIVER => 7,
        }
    }

    /// Public cards on the table during this round
    pub const fn board_cards(self) -> usize {
        self.cards_dealt() - 2
    }

    pub fn next(self) -> Option<BettingRound> {
        BettingRound::try_from(usize::from(self) + 1).ok()
    }

    pub fn previous(self) -> Option<BettingRound> {
        usize::from(self)
            .checked_sub(1)
            .and_then(|r| BettingRound::try_from(r).ok())
    }
}

impl fmt::Display for BettingRound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let round_str = match self {
            BettingRound::PREFLOP => "Preflop",
            BettingRound::FLOP => "Flop",
            BettingRound::TURN => "Turn",
            BettingRound::RIVER => "River",
        };
        write!(f, "{}", round_str)
    }
}

impl From<BettingRound> for usize {
    fn from(round: BettingRound) -> Self {
        match round {
            BettingRound::PREFLOP => 0,
            BettingRound::FLOP => 1,
            BettingRound::TURN => 2,
            BettingRound::RIVER => 3,
        }
    }
}

impl TryFrom<usize> for BettingRound {
    type Error = usize;
    fn try_from(round: usize) -> Result<Self, usize> {
        match round {
            0 => Ok(BettingRound::PREFLOP),
            1 => Ok(BettingRound::FLOP),
            2 => Ok(BettingRound::TURN),
            3 => Ok(BettingRound::RIVER),
            _ => Err(round),
        }
    }
}
