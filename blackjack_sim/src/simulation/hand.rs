use crate::{Error, Result};

use super::Card;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandResult {
    Undetermined,
    Win,
    Push,
    Loss,
}

/// Represents one group of cards held by a player or the dealer.
///
/// The hard value, soft value, ace flag and blackjack flag are recomputed every time the cards
/// change, so they can never be stale.
#[derive(Debug, Clone)]
pub struct Hand {
    cards: Vec<Card>,
    is_dealer: bool,
    bet: u32,
    doubled: bool,
    result: HandResult,

    hard_value: u8,
    soft_value: Option<u8>,
    contains_ace: bool,
    is_blackjack: bool,
}

impl Hand {
    pub fn new_player(bet: u32) -> Hand {
        Hand {
            cards: Vec::with_capacity(4),
            is_dealer: false,
            bet,
            doubled: false,
            result: HandResult::Undetermined,
            hard_value: 0,
            soft_value: None,
            contains_ace: false,
            is_blackjack: false,
        }
    }

    pub fn new_dealer() -> Hand {
        Hand {
            is_dealer: true,
            ..Hand::new_player(0)
        }
    }

    /// Appends a card. Drawing to a hand that is already 21 or bust is never legal.
    pub fn add_card(&mut self, card: Card) -> Result<()> {
        if self.hard_value >= 21 {
            return Err(Error::Gameplay(format!(
                "Cannot add {} to hand {} with hard value {}",
                card, self, self.hard_value
            )));
        }
        self.cards.push(card);
        self.calculate_value();
        Ok(())
    }

    /// Takes the second card out of a two-card pair and returns it as a new hand with the same
    /// bet.
    pub fn split_hand(&mut self) -> Result<Hand> {
        if self.is_dealer {
            return Err(Error::Gameplay(String::from("Cannot split the dealer hand")));
        }
        if self.cards.len() != 2 {
            return Err(Error::Gameplay(format!(
                "Cannot split hand {} with {} cards",
                self,
                self.cards.len()
            )));
        }
        if self.cards[0].rank != self.cards[1].rank {
            return Err(Error::Gameplay(format!(
                "Cannot split hand {} of different ranks",
                self
            )));
        }

        let card = self
            .cards
            .pop()
            .ok_or_else(|| Error::Gameplay(String::from("Cannot split an empty hand")))?;
        self.calculate_value();

        let mut new_hand = Hand::new_player(self.bet);
        new_hand.add_card(card)?;
        Ok(new_hand)
    }

    /// Doubles the bet. Only a two-card player hand can be doubled.
    pub fn double_down(&mut self) -> Result<()> {
        if self.is_dealer || self.cards.len() != 2 {
            return Err(Error::Gameplay(format!("Cannot double down on hand {}", self)));
        }
        self.bet = self
            .bet
            .checked_mul(2)
            .ok_or_else(|| Error::Gameplay(format!("Cannot double a bet of {}", self.bet)))?;
        self.doubled = true;
        Ok(())
    }

    /// The value used to compare against the dealer: the soft value if there is one.
    pub fn ultimate_value(&self) -> u8 {
        match self.soft_value {
            Some(soft_value) => soft_value.max(self.hard_value),
            None => self.hard_value,
        }
    }

    /// Ranks sorted A, K, Q, J, T, 9, ..., 2 and concatenated, e.g. "A7" for both 7-A and A-7.
    pub fn hand_signature(&self) -> String {
        let mut ranks: Vec<_> = self.cards.iter().map(|card| card.rank).collect();
        ranks.sort_by_key(|rank| rank.canonical_order());
        ranks.into_iter().map(|rank| rank.to_char()).collect()
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn is_dealer(&self) -> bool {
        self.is_dealer
    }

    pub fn bet(&self) -> u32 {
        self.bet
    }

    pub fn is_doubled(&self) -> bool {
        self.doubled
    }

    pub fn result(&self) -> HandResult {
        self.result
    }

    pub fn hard_value(&self) -> u8 {
        self.hard_value
    }

    pub fn soft_value(&self) -> Option<u8> {
        self.soft_value
    }

    pub fn contains_ace(&self) -> bool {
        self.contains_ace
    }

    pub fn is_blackjack(&self) -> bool {
        self.is_blackjack
    }

    pub fn is_bust(&self) -> bool {
        self.hard_value > 21
    }

    pub(crate) fn set_result(&mut self, result: HandResult) {
        self.result = result;
    }

    fn calculate_value(&mut self) {
        self.hard_value = self.cards.iter().map(|card| card.value()).sum();
        self.contains_ace = self.cards.iter().any(|card| card.value() == 1);

        // Only one ace can count as 11, and only if that does not bust the hand.
        self.soft_value = if self.contains_ace && self.hard_value <= 11 {
            Some(self.hard_value + 10)
        } else {
            None
        };
        self.is_blackjack = self.cards.len() == 2 && self.soft_value == Some(21);
    }
}

impl std::fmt::Display for Hand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for card in &self.cards {
            write!(f, "{}", card)?;
        }
        match self.soft_value {
            Some(soft_value) => write!(f, " H={}, S={}", self.hard_value, soft_value),
            None => write!(f, " H={}", self.hard_value),
        }
    }
}

/// Builds a player hand from rank characters, e.g. "A7". Suits cycle C, D, H, S unless
/// `suited`, in which case every card is a club.
#[cfg(test)]
pub(crate) fn hand_from_ranks(ranks: &str, suited: bool) -> Hand {
    use super::{Rank, Suit};
    use strum::IntoEnumIterator;

    let mut hand = Hand::new_player(15);
    let mut suits = Suit::iter().cycle();
    for rank in ranks.chars() {
        let suit = if suited {
            Suit::Club
        } else {
            suits.next().unwrap()
        };
        hand.add_card(Card::new(Rank::try_from(rank).unwrap(), suit))
            .unwrap();
    }
    hand
}
