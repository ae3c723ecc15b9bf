use crate::{Error, Result};

use super::{Card, Rank, SimulatorEventHandler, Suit};

use log::{debug, trace};
use strum::IntoEnumIterator;

use rand::seq::SliceRandom;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

/// Builds the ordered cards of a multi-deck shoe once, and hands out shuffled copies of it.
#[derive(Debug, Clone)]
pub struct ShoeFactory {
    number_of_decks: u8,
    master: Vec<Card>,
}

impl ShoeFactory {
    pub fn new(number_of_decks: u8) -> ShoeFactory {
        let mut master = Vec::with_capacity(number_of_decks as usize * 52);
        for _ in 0..number_of_decks {
            for suit in Suit::iter() {
                for rank in Rank::iter() {
                    master.push(Card { rank, suit });
                }
            }
        }
        ShoeFactory {
            number_of_decks,
            master,
        }
    }

    /// Returns an independently shuffled copy of the master cards.
    pub fn get_shoe<R: Rng + ?Sized>(&self, rng: &mut R) -> Shoe {
        let mut cards = self.master.clone();
        cards.shuffle(rng);
        Shoe::from_cards(cards)
    }

    /// Returns a shoe whose first cards are exactly `firsts`, followed by the rest of the master
    /// cards shuffled. Fails if the master does not hold enough copies of a requested card.
    pub fn get_shoe_with_firsts<R: Rng + ?Sized>(&self, firsts: &[Card], rng: &mut R) -> Result<Shoe> {
        let mut rest = self.master.clone();
        for card in firsts {
            let position = rest.iter().position(|c| c == card).ok_or_else(|| {
                Error::Gameplay(format!(
                    "Not enough {} in a shoe of {} decks",
                    card, self.number_of_decks
                ))
            })?;
            rest.swap_remove(position);
        }
        rest.shuffle(rng);

        let mut cards = Vec::with_capacity(self.master.len());
        cards.extend_from_slice(firsts);
        cards.extend(rest);
        Ok(Shoe::from_cards(cards))
    }

    pub fn number_of_decks(&self) -> u8 {
        self.number_of_decks
    }

    pub fn master(&self) -> &[Card] {
        &self.master
    }
}

/// The shoe in play together with what is needed to replace it: the factory and the seeded RNG
/// every shuffle draws from.
#[derive(Debug, Clone)]
pub struct ShoeSupply {
    factory: ShoeFactory,
    rng: ChaCha8Rng,
    shoe: Shoe,
}

impl ShoeSupply {
    /// Starts with an empty shoe, so the first round brings in a new one.
    pub fn new(factory: ShoeFactory, rng: ChaCha8Rng) -> ShoeSupply {
        ShoeSupply {
            factory,
            rng,
            shoe: Shoe::default(),
        }
    }

    pub fn shoe(&self) -> &Shoe {
        &self.shoe
    }

    pub fn load_shoe(&mut self, shoe: Shoe) {
        self.shoe = shoe;
    }

    /// Brings in a freshly shuffled shoe and burns its first card.
    pub fn reshuffle<U: SimulatorEventHandler>(&mut self, handler: &mut U) -> Result<()> {
        self.shoe = self.factory.get_shoe(&mut self.rng);
        debug!(
            "New shoe of {} decks, {} cards",
            self.factory.number_of_decks(),
            self.shoe.len()
        );
        handler.on_new_shoe(&self.shoe);
        let burned = self.deal_from_current()?;
        trace!("Burned {}", burned);
        Ok(())
    }

    /// Deals the next card. A shoe that runs dry in the middle of a round is replaced on the spot.
    pub fn draw<U: SimulatorEventHandler>(&mut self, handler: &mut U) -> Result<Card> {
        if self.shoe.remaining() == 0 {
            debug!("Shoe ran out in the middle of a round");
            self.reshuffle(handler)?;
        }
        self.deal_from_current()
    }

    fn deal_from_current(&mut self) -> Result<Card> {
        self.shoe.deal_card().ok_or_else(|| {
            Error::Gameplay(format!(
                "A shoe of {} decks has no card to deal",
                self.factory.number_of_decks()
            ))
        })
    }
}

/// Represents a shoe in the real world. Cards are dealt from the front.
#[derive(Debug, Clone, Default)]
pub struct Shoe {
    cards: Vec<Card>,
    current_index: usize,
}

impl Shoe {
    pub fn from_cards(cards: Vec<Card>) -> Shoe {
        Shoe {
            cards,
            current_index: 0,
        }
    }

    /// Deals a card if the shoe is not empty. Returns None if empty.
    pub fn deal_card(&mut self) -> Option<Card> {
        let card = self.cards.get(self.current_index).copied();
        if card.is_some() {
            self.current_index += 1;
        }
        card
    }

    /// Number of cards not dealt yet.
    pub fn remaining(&self) -> usize {
        self.cards.len() - self.current_index
    }

    /// Number of cards the shoe started with.
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn preview_next_few_cards(&self, number: usize) -> &[Card] {
        let end = (self.current_index + number).min(self.cards.len());
        &self.cards[self.current_index..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::HashMap;

    fn number_of_cards_is_correct(cards: &[Card], number_of_decks: u8) -> bool {
        let mut counts: HashMap<Card, u8> = HashMap::new();
        for card in cards {
            *counts.entry(*card).or_insert(0) += 1;
        }
        counts.len() == 52 && counts.values().all(|count| *count == number_of_decks)
    }

    #[test]
    fn master_is_ordered_and_complete() {
        let number_of_decks = 3;
        let factory = ShoeFactory::new(number_of_decks);
        let master = factory.master();
        assert_eq!(master.len(), number_of_decks as usize * 52);
        assert!(number_of_cards_is_correct(master, number_of_decks));
        assert_eq!(master[0], "2C".parse().unwrap());
        assert_eq!(master[12], "AC".parse().unwrap());
        assert_eq!(master[51], "AS".parse().unwrap());
        assert_eq!(master[52], master[0]);
    }

    #[test]
    fn shuffled_copies_leave_master_untouched() {
        let factory = ShoeFactory::new(2);
        let before = factory.master().to_vec();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut shoe = factory.get_shoe(&mut rng);

        assert_eq!(factory.master(), before.as_slice());
        assert_eq!(shoe.len(), 104);
        let mut dealt = Vec::new();
        while let Some(card) = shoe.deal_card() {
            dealt.push(card);
        }
        assert!(number_of_cards_is_correct(&dealt, 2));
        assert_ne!(dealt, before);
    }

    #[test]
    fn same_seed_gives_same_order() {
        let factory = ShoeFactory::new(1);
        let a = factory.get_shoe(&mut ChaCha8Rng::seed_from_u64(11));
        let b = factory.get_shoe(&mut ChaCha8Rng::seed_from_u64(11));
        assert_eq!(a.preview_next_few_cards(52), b.preview_next_few_cards(52));
    }

    #[test]
    fn test_shoe_with_firsts() {
        let factory = ShoeFactory::new(1);
        let firsts: Vec<Card> = ["AS", "KD", "8C", "8H"]
            .iter()
            .map(|code| code.parse().unwrap())
            .collect();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut shoe = factory.get_shoe_with_firsts(&firsts, &mut rng).unwrap();
        assert_eq!(shoe.preview_next_few_cards(4), firsts.as_slice());
        assert!(number_of_cards_is_correct(
            shoe.preview_next_few_cards(52),
            1
        ));

        for card in &firsts {
            assert_eq!(shoe.deal_card(), Some(*card));
        }
        assert_eq!(shoe.remaining(), 48);
    }

    #[test]
    fn invalid_firsts_are_rejected() {
        let factory = ShoeFactory::new(1);
        let firsts: Vec<Card> = ["8C", "8C"].iter().map(|code| code.parse().unwrap()).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        assert!(matches!(
            factory.get_shoe_with_firsts(&firsts, &mut rng),
            Err(Error::Gameplay(_))
        ));
    }

    #[test]
    fn dealing_runs_out() {
        let mut shoe = Shoe::from_cards(vec!["2C".parse().unwrap()]);
        assert_eq!(shoe.remaining(), 1);
        assert!(shoe.deal_card().is_some());
        assert_eq!(shoe.remaining(), 0);
        assert_eq!(shoe.deal_card(), None);
        assert_eq!(shoe.remaining(), 0);

        let empty = ShoeFactory::new(0).get_shoe(&mut ChaCha8Rng::seed_from_u64(0));
        assert!(empty.is_empty());
    }

    #[derive(Default)]
    struct ShoeCounter {
        new_shoes: usize,
    }

    impl SimulatorEventHandler for ShoeCounter {
        fn on_new_shoe(&mut self, _shoe: &Shoe) {
            self.new_shoes += 1;
        }
    }

    #[test]
    fn empty_shoe_is_replaced_while_drawing() {
        let mut supply = ShoeSupply::new(ShoeFactory::new(1), ChaCha8Rng::seed_from_u64(9));
        supply.load_shoe(Shoe::from_cards(vec!["7H".parse().unwrap()]));
        let mut handler = ShoeCounter::default();

        assert_eq!(supply.draw(&mut handler).unwrap(), "7H".parse::<Card>().unwrap());
        assert_eq!(handler.new_shoes, 0);

        assert!(supply.draw(&mut handler).is_ok());
        assert_eq!(handler.new_shoes, 1);
        assert_eq!(supply.shoe().len(), 52);
        // One burned, one dealt.
        assert_eq!(supply.shoe().remaining(), 50);
    }

    #[test]
    fn reshuffle_burns_one_card() {
        let mut supply = ShoeSupply::new(ShoeFactory::new(2), ChaCha8Rng::seed_from_u64(9));
        let mut handler = ShoeCounter::default();
        assert_eq!(supply.shoe().remaining(), 0);
        supply.reshuffle(&mut handler).unwrap();
        assert_eq!(handler.new_shoes, 1);
        assert_eq!(supply.shoe().remaining(), 103);
    }

    #[test]
    fn zero_deck_supply_reports_an_error() {
        let mut supply = ShoeSupply::new(ShoeFactory::new(0), ChaCha8Rng::seed_from_u64(9));
        assert!(matches!(
            supply.draw(&mut ShoeCounter::default()),
            Err(Error::Gameplay(_))
        ));
    }
}
