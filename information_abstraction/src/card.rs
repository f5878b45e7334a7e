use rust_poker::constants::{RANK_TO_CHAR, SUIT_TO_CHAR};

/// use 8 bit integer to represent a playing card
/// valid cards n: 0->51
/// where n is 4 * rank + suit
pub type Card = u8;

/// Number of cards in deck
pub const CARD_COUNT: u8 = 52;

/// Turns an array of cards into a human-readable string
///
/// # Example
///
/// ```
/// use information_abstraction::card::cards_to_str;
/// assert_eq!(cards_to_str(&[51, 50]).len(), 4);
/// ```
pub fn cards_to_str(cards: &[Card]) -> String {
    cards
        .iter()
        .filter(|c| **c < CARD_COUNT)
        .flat_map(|c| {
            vec![
                RANK_TO_CHAR[usize::from(*c >> 2)],
                SUIT_TO_CHAR[usize::from(*c & 3)],
            ]
        })
        .collect()
}

/// 64 bit mask with one bit set per card
pub fn card_mask(cards: &[Card]) -> u64 {
    cards.iter().fold(0u64, |mask, c| mask | (1u64 << c))
}

/// True when every card is valid and appears once
pub fn all_distinct(cards: &[Card]) -> bool {
    cards.iter().all(|c| *c < CARD_COUNT) && card_mask(cards).count_ones() as usize == cards.len()
}

pub const fn rank_of(card: Card) -> u8 {
    card >> 2
}

pub const fn suit_of(card: Card) -> u8 {
    card & 3
}

pub const fn make_card(rank: u8, suit: u8) -> Card {
    4 * rank + suit
}
