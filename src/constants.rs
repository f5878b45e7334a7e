/// seats at a heads-up table
pub const SEATS: usize = 2;
/// default [small blind, big blind]
pub const DEFAULT_BLINDS: [u32; 2] = [1, 2];
/// default chips behind for each seat
pub const DEFAULT_STACK: u32 = 200;
/// bets allowed per round, the blinds count as the first preflop bet
pub const BET_CAP: u8 = 4;
/// rounds of betting in texas holdem
pub const HOLDEM_ROUNDS: usize = 4;
/// cards in a kuhn deck
pub const KUHN_CARDS: u8 = 3;
