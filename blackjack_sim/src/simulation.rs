pub mod hand;
pub mod player;
pub mod session;
pub mod shoe;

use std::str::FromStr;

use crate::{
    bonus::{BonusKind, BonusOutcome, BonusPlan, BustBonus, TwentyOnePlusThree},
    strategy::Strategy,
    Action, Error, Result, SimulationConfig, MAX_BET,
};
use blackjack_sim_macros::allowed_phase;
use log::{debug, trace};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use strum_macros::EnumIter;

use self::{
    hand::{Hand, HandResult},
    player::Player,
    shoe::{Shoe, ShoeFactory, ShoeSupply},
};

/// A new shoe is brought in when fewer cards than this are left.
pub const SHOE_CUTOFF: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum Suit {
    Club,
    Diamond,
    Heart,
    Spade,
}

impl Suit {
    pub fn to_char(self) -> char {
        match self {
            Suit::Club => 'C',
            Suit::Diamond => 'D',
            Suit::Heart => 'H',
            Suit::Spade => 'S',
        }
    }
}

impl TryFrom<char> for Suit {
    type Error = Error;

    fn try_from(value: char) -> Result<Self> {
        match value {
            'C' => Ok(Suit::Club),
            'D' => Ok(Suit::Diamond),
            'H' => Ok(Suit::Heart),
            'S' => Ok(Suit::Spade),
            _ => Err(Error::Configuration(format!("Invalid suit: {}", value))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum Rank {
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
    Ace,
}

impl Rank {
    /// Blackjack value of the rank. An ace counts 1 here; counting it as 11 is up to the hand.
    pub fn value(self) -> u8 {
        match self {
            Rank::Ace => 1,
            Rank::Ten | Rank::Jack | Rank::Queen | Rank::King => 10,
            _ => self.ace_low() + 1,
        }
    }

    /// Column of the rank in a strategy row: 2..9 map to 0..7, tens to 8, the ace to 9.
    pub fn strategy_index(self) -> usize {
        match self {
            Rank::Ace => 9,
            Rank::Ten | Rank::Jack | Rank::Queen | Rank::King => 8,
            _ => (self.value() - 2) as usize,
        }
    }

    /// Position in the order A, K, Q, J, T, 9, ..., 2 that hand signatures are sorted by.
    /// Strategy keys such as "A7" rely on this order.
    pub fn canonical_order(self) -> u8 {
        match self {
            Rank::Ace => 0,
            _ => 13 - self.ace_low(),
        }
    }

    /// Straight order with the ace below the two.
    pub fn ace_low(self) -> u8 {
        match self {
            Rank::Ace => 0,
            Rank::Two => 1,
            Rank::Three => 2,
            Rank::Four => 3,
            Rank::Five => 4,
            Rank::Six => 5,
            Rank::Seven => 6,
            Rank::Eight => 7,
            Rank::Nine => 8,
            Rank::Ten => 9,
            Rank::Jack => 10,
            Rank::Queen => 11,
            Rank::King => 12,
        }
    }

    /// Straight order with the ace above the king.
    pub fn ace_high(self) -> u8 {
        match self {
            Rank::Ace => 13,
            _ => self.ace_low(),
        }
    }

    pub fn to_char(self) -> char {
        match self {
            Rank::Two => '2',
            Rank::Three => '3',
            Rank::Four => '4',
            Rank::Five => '5',
            Rank::Six => '6',
            Rank::Seven => '7',
            Rank::Eight => '8',
            Rank::Nine => '9',
            Rank::Ten => 'T',
            Rank::Jack => 'J',
            Rank::Queen => 'Q',
            Rank::King => 'K',
            Rank::Ace => 'A',
        }
    }
}

impl TryFrom<char> for Rank {
    type Error = Error;

    fn try_from(value: char) -> Result<Self> {
        let rank = match value {
            '2' => Rank::Two,
            '3' => Rank::Three,
            '4' => Rank::Four,
            '5' => Rank::Five,
            '6' => Rank::Six,
            '7' => Rank::Seven,
            '8' => Rank::Eight,
            '9' => Rank::Nine,
            'T' => Rank::Ten,
            'J' => Rank::Jack,
            'Q' => Rank::Queen,
            'K' => Rank::King,
            'A' => Rank::Ace,
            _ => return Err(Error::Configuration(format!("Invalid rank: {}", value))),
        };
        Ok(rank)
    }
}

/// Represents a card in the real world with a suit and a rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Card {
    pub rank: Rank,
    pub suit: Suit,
}

impl Card {
    pub fn new(rank: Rank, suit: Suit) -> Self {
        Card { rank, suit }
    }

    pub fn value(&self) -> u8 {
        self.rank.value()
    }

    pub fn dealer_up_card_index(&self) -> usize {
        self.rank.strategy_index()
    }
}

impl std::fmt::Display for Card {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.rank.to_char(), self.suit.to_char())
    }
}

/// Parses the two-character form printed by `Display`, e.g. "8C" or "TH".
impl FromStr for Card {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut chars = s.chars();
        match (chars.next(), chars.next(), chars.next()) {
            (Some(rank), Some(suit), None) => Ok(Card {
                rank: Rank::try_from(rank)?,
                suit: Suit::try_from(suit)?,
            }),
            _ => Err(Error::Configuration(format!("Invalid card: {}", s))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    WaitForRound,
    DealInitialCards,
    PayHandBonuses,
    DealerPeek,
    PlayHands,
    DealerPlay,
    EvaluateHands,
    PayDealerBonuses,
    Summary,
}

/// Simulates a blackjack table where every seat is played by the same strategy.
pub struct Simulator {
    config: SimulationConfig,
    shoe_supply: ShoeSupply,

    // Round state
    current_round_phase: RoundPhase,
    dealer_hand: Hand,
    players: Vec<Player>,
    rounds_played: u64,
}

impl Simulator {
    /// Creates a table with `num_players` freshly bought-in players. The shoe starts empty, so the
    /// first round brings in a new one.
    pub fn new(config: &SimulationConfig) -> Result<Self> {
        if config.num_decks == 0 {
            return Err(Error::Configuration(format!(
                "{}: num_decks must be at least 1",
                config.name
            )));
        }
        if config.num_players == 0 {
            return Err(Error::Configuration(format!(
                "{}: num_players must be at least 1",
                config.name
            )));
        }
        if config.split_limit == 0 {
            return Err(Error::Configuration(format!(
                "{}: split_limit must be at least 1",
                config.name
            )));
        }
        if !(1..=MAX_BET).contains(&config.min_bet) {
            return Err(Error::Configuration(format!(
                "{}: min_bet must be in 1..={}",
                config.name, MAX_BET
            )));
        }
        let bonus_bets = &config.bonus_bets;
        for bet in [bonus_bets.twenty_one_plus_three, bonus_bets.bust_bonus]
            .into_iter()
            .flatten()
        {
            if bet > MAX_BET {
                return Err(Error::Configuration(format!(
                    "{}: side bet of {} is above {}",
                    config.name, bet, MAX_BET
                )));
            }
        }

        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        let mut simulator = Self {
            config: config.clone(),
            shoe_supply: ShoeSupply::new(ShoeFactory::new(config.num_decks), rng),
            current_round_phase: RoundPhase::WaitForRound,
            dealer_hand: Hand::new_dealer(),
            players: Vec::new(),
            rounds_played: 0,
        };
        simulator.seat_players()?;
        Ok(simulator)
    }

    /// Replaces every player with a freshly bought-in one. Can be called at WaitForRound phase.
    #[allowed_phase(WaitForRound)]
    pub fn seat_players(&mut self) -> Result<()> {
        let buyin = self.config.buyin();
        let bonus_plans = BonusPlan::from_bonus_bets(&self.config.bonus_bets);
        self.players = (0..self.config.num_players as usize)
            .map(|index| Player::new(index, buyin, bonus_plans.clone()))
            .collect();
        Ok(())
    }

    /// Replaces the current shoe, e.g. with a stacked one. Can be called at WaitForRound phase.
    #[allowed_phase(WaitForRound)]
    pub fn load_shoe(&mut self, shoe: Shoe) -> Result<()> {
        self.shoe_supply.load_shoe(shoe);
        Ok(())
    }

    /// Plays one full round. Returns false, without touching the shoe, if no player can cover the
    /// minimum bet.
    pub fn play_round<T: Strategy, U: SimulatorEventHandler>(
        &mut self,
        strategy: &T,
        handler: &mut U,
    ) -> Result<bool> {
        if !self.start_round(handler)? {
            return Ok(false);
        }
        self.deal_initial_cards(handler)?;
        self.pay_hand_bonuses(handler)?;

        // A dealer natural ends the round before anyone plays, and the bust bonus is not paid.
        if !self.dealer_peek(handler)? {
            self.play_player_hands(strategy, handler)?;
            self.dealer_plays(handler)?;
            self.evaluate_hands(handler)?;
            self.pay_dealer_bonuses(handler)?;
        }

        self.finish_round(handler)?;
        Ok(true)
    }

    /// Can be called at WaitForRound phase.
    /// Brings in a new shoe if the cutoff is reached, and gives every player who can still cover
    /// the minimum bet a fresh hand.
    #[allowed_phase(WaitForRound)]
    pub fn start_round<U: SimulatorEventHandler>(&mut self, handler: &mut U) -> Result<bool> {
        let min_bet = self.config.min_bet;
        let mut anyone_playing = false;
        for player in self.players.iter_mut() {
            anyone_playing |= player.reset_for_round(min_bet);
        }
        if !anyone_playing {
            return Ok(false);
        }

        if self.shoe_supply.shoe().remaining() < SHOE_CUTOFF {
            debug!(
                "{}: reshuffling before round {}",
                self.config.name,
                self.rounds_played + 1
            );
            self.shoe_supply.reshuffle(handler)?;
        }

        self.dealer_hand = Hand::new_dealer();
        self.current_round_phase = RoundPhase::DealInitialCards;
        Ok(true)
    }

    /// Can be called at DealInitialCards phase.
    /// Deals one card to every player hand and then one to the dealer, twice.
    #[allowed_phase(DealInitialCards)]
    pub fn deal_initial_cards<U: SimulatorEventHandler>(&mut self, handler: &mut U) -> Result<()> {
        for _ in 0..2 {
            for player in self.players.iter_mut() {
                if let Some(hand) = player.starting_hand_mut() {
                    hand.add_card(self.shoe_supply.draw(handler)?)?;
                }
            }
            self.dealer_hand.add_card(self.shoe_supply.draw(handler)?)?;
        }

        handler.on_deal_cards(self.dealer_up_card()?, &self.players);
        self.current_round_phase = RoundPhase::PayHandBonuses;
        Ok(())
    }

    /// Can be called at PayHandBonuses phase.
    /// Settles the 21+3 side bet of every starting hand. The hands themselves are not touched.
    #[allowed_phase(PayHandBonuses)]
    pub fn pay_hand_bonuses<U: SimulatorEventHandler>(&mut self, handler: &mut U) -> Result<()> {
        let dealer_up_card = self.dealer_up_card()?;
        for player in self.players.iter_mut() {
            let plan = match player.bonus_plan(BonusKind::TwentyOnePlusThree) {
                Some(plan) => plan,
                None => continue,
            };
            let payout = match player.hands().first() {
                Some(hand) => TwentyOnePlusThree::payout(dealer_up_card, hand, plan.bet)?,
                None => continue,
            };
            let outcome = BonusOutcome {
                kind: plan.kind,
                bet: plan.bet,
                payout,
            };
            player.settle_bonus(&outcome);
            handler.on_bonus_settled(player.index(), &outcome);
        }

        self.current_round_phase = RoundPhase::DealerPeek;
        Ok(())
    }

    /// Can be called at DealerPeek phase.
    /// Returns true if the dealer has blackjack, in which case every hand is already settled:
    /// player blackjacks push and everything else loses.
    #[allowed_phase(DealerPeek)]
    pub fn dealer_peek<U: SimulatorEventHandler>(&mut self, handler: &mut U) -> Result<bool> {
        if !self.dealer_hand.is_blackjack() {
            self.current_round_phase = RoundPhase::PlayHands;
            return Ok(false);
        }

        debug!("Dealer has blackjack: {}", self.dealer_hand);
        for player in self.players.iter_mut() {
            for hand_index in 0..player.hands().len() {
                let result = if player.hands()[hand_index].is_blackjack() {
                    HandResult::Push
                } else {
                    HandResult::Loss
                };
                let chip_delta = player.settle_hand(hand_index, result);
                handler.on_hand_settled(player.index(), &player.hands()[hand_index], chip_delta);
            }
        }

        self.current_round_phase = RoundPhase::Summary;
        Ok(true)
    }

    /// Can be called at PlayHands phase.
    /// Plays every player's hands, including the ones created by splitting, in seat order.
    #[allowed_phase(PlayHands)]
    pub fn play_player_hands<T: Strategy, U: SimulatorEventHandler>(
        &mut self,
        strategy: &T,
        handler: &mut U,
    ) -> Result<()> {
        let dealer_up_card = self.dealer_up_card()?;
        for player_index in 0..self.players.len() {
            if self.players[player_index].is_active() {
                self.play_player(player_index, dealer_up_card, strategy, handler)?;
            }
        }

        self.current_round_phase = RoundPhase::DealerPlay;
        Ok(())
    }

    /// Can be called at DealerPlay phase.
    /// The dealer hits until reaching a hard 17 or a soft 18, so a soft 17 is hit.
    #[allowed_phase(DealerPlay)]
    pub fn dealer_plays<U: SimulatorEventHandler>(&mut self, handler: &mut U) -> Result<()> {
        while dealer_must_hit(&self.dealer_hand) {
            let card = self.shoe_supply.draw(handler)?;
            self.dealer_hand.add_card(card)?;
        }
        trace!("Dealer ends with {}", self.dealer_hand);

        self.current_round_phase = RoundPhase::EvaluateHands;
        Ok(())
    }

    /// Can be called at EvaluateHands phase.
    /// Settles every hand still undetermined against the final dealer hand.
    #[allowed_phase(EvaluateHands)]
    pub fn evaluate_hands<U: SimulatorEventHandler>(&mut self, handler: &mut U) -> Result<()> {
        let dealer_bust = self.dealer_hand.is_bust();
        let dealer_value = self.dealer_hand.ultimate_value();

        for player in self.players.iter_mut() {
            for hand_index in 0..player.hands().len() {
                let hand = &player.hands()[hand_index];
                if hand.result() != HandResult::Undetermined {
                    continue;
                }
                let result = if dealer_bust || hand.is_blackjack() {
                    HandResult::Win
                } else {
                    match hand.ultimate_value().cmp(&dealer_value) {
                        std::cmp::Ordering::Greater => HandResult::Win,
                        std::cmp::Ordering::Equal => HandResult::Push,
                        std::cmp::Ordering::Less => HandResult::Loss,
                    }
                };
                let chip_delta = player.settle_hand(hand_index, result);
                handler.on_hand_settled(player.index(), &player.hands()[hand_index], chip_delta);
            }
        }

        self.current_round_phase = RoundPhase::PayDealerBonuses;
        Ok(())
    }

    /// Can be called at PayDealerBonuses phase.
    /// Settles the bust bonus of every player who played this round.
    #[allowed_phase(PayDealerBonuses)]
    pub fn pay_dealer_bonuses<U: SimulatorEventHandler>(&mut self, handler: &mut U) -> Result<()> {
        let dealer_up_card = self.dealer_up_card()?;
        for player in self.players.iter_mut() {
            if !player.is_active() {
                continue;
            }
            let plan = match player.bonus_plan(BonusKind::BustBonus) {
                Some(plan) => plan,
                None => continue,
            };
            let outcome = BonusOutcome {
                kind: plan.kind,
                bet: plan.bet,
                payout: BustBonus::payout(dealer_up_card, &self.dealer_hand, plan.bet)?,
            };
            player.settle_bonus(&outcome);
            handler.on_bonus_settled(player.index(), &outcome);
        }

        self.current_round_phase = RoundPhase::Summary;
        Ok(())
    }

    /// Can be called at Summary phase.
    #[allowed_phase(Summary)]
    pub fn finish_round<U: SimulatorEventHandler>(&mut self, handler: &mut U) -> Result<()> {
        for player in self.players.iter_mut() {
            player.record_splits();
        }
        self.rounds_played += 1;
        debug!(
            "Round {} finished, dealer: {}",
            self.rounds_played, self.dealer_hand
        );
        handler.on_summary_round(&self.dealer_hand, &self.players);

        self.current_round_phase = RoundPhase::WaitForRound;
        Ok(())
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn current_round_phase(&self) -> RoundPhase {
        self.current_round_phase
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn dealer_hand(&self) -> &Hand {
        &self.dealer_hand
    }

    pub fn shoe(&self) -> &Shoe {
        self.shoe_supply.shoe()
    }

    pub fn rounds_played(&self) -> u64 {
        self.rounds_played
    }

    fn dealer_up_card(&self) -> Result<Card> {
        self.dealer_hand
            .cards()
            .first()
            .copied()
            .ok_or_else(|| Error::Gameplay(String::from("Dealer has no up card")))
    }

    /// Resolves the hands of one player. Hands created by a split wait on a stack while the hand
    /// they came from is finished, which is the order a depth-first recursion would play them in.
    fn play_player<T: Strategy, U: SimulatorEventHandler>(
        &mut self,
        player_index: usize,
        dealer_up_card: Card,
        strategy: &T,
        handler: &mut U,
    ) -> Result<()> {
        let split_limit = self.config.split_limit;
        let player = &mut self.players[player_index];
        let shoe_supply = &mut self.shoe_supply;

        let mut pending_hands: Vec<usize> = vec![0];
        while let Some(hand_index) = pending_hands.pop() {
            loop {
                let hand = &player.hands()[hand_index];
                let action =
                    strategy.determine_action(dealer_up_card, hand, player.allowed_to_split())?;
                trace!(
                    "Player {} hand {}: {} vs {} -> {:?}",
                    player_index,
                    hand_index,
                    hand,
                    dealer_up_card,
                    action
                );
                handler.on_make_action(player_index, hand, action);

                match action {
                    Action::Stand => break,
                    Action::Hit => {
                        let card = shoe_supply.draw(handler)?;
                        player.hand_mut(hand_index).add_card(card)?;
                        if player.hands()[hand_index].is_bust() {
                            settle_bust(player, hand_index, handler);
                            break;
                        }
                    }
                    Action::Double => {
                        let card = shoe_supply.draw(handler)?;
                        let hand = player.hand_mut(hand_index);
                        hand.double_down()?;
                        hand.add_card(card)?;
                        if hand.is_bust() {
                            settle_bust(player, hand_index, handler);
                        }
                        break;
                    }
                    Action::Split => {
                        if !player.allowed_to_split() {
                            return Err(Error::Gameplay(format!(
                                "Player {} cannot split {} past the split limit of {}",
                                player_index,
                                player.hands()[hand_index],
                                split_limit
                            )));
                        }
                        let sibling = player.hand_mut(hand_index).split_hand()?;
                        let sibling_index = player.add_hand(sibling, split_limit);
                        pending_hands.push(sibling_index);
                    }
                }
            }
        }
        Ok(())
    }
}

fn dealer_must_hit(dealer_hand: &Hand) -> bool {
    let soft_above_17 = matches!(dealer_hand.soft_value(), Some(soft) if soft > 17);
    dealer_hand.hard_value() < 17 && !soft_above_17
}

fn settle_bust<U: SimulatorEventHandler>(player: &mut Player, hand_index: usize, handler: &mut U) {
    let chip_delta = player.settle_hand(hand_index, HandResult::Loss);
    let hand = &player.hands()[hand_index];
    handler.on_player_bust(player.index(), hand);
    handler.on_hand_settled(player.index(), hand, chip_delta);
}

/// Receives everything that happens at the table. All methods do nothing by default.
pub trait SimulatorEventHandler {
    fn on_new_shoe(&mut self, _shoe: &Shoe) {}
    fn on_session_begin(&mut self, _session: u32, _players: &[Player]) {}
    fn on_deal_cards(&mut self, _dealer_up_card: Card, _players: &[Player]) {}
    fn on_make_action(&mut self, _player_index: usize, _hand: &Hand, _action: Action) {}
    fn on_player_bust(&mut self, _player_index: usize, _hand: &Hand) {}
    fn on_bonus_settled(&mut self, _player_index: usize, _outcome: &BonusOutcome) {}
    fn on_hand_settled(&mut self, _player_index: usize, _hand: &Hand, _chip_delta: f64) {}
    fn on_summary_round(&mut self, _dealer_hand: &Hand, _players: &[Player]) {}
    fn on_session_end(&mut self, _session: u32, _players: &[Player]) {}
}

/// Handler that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHandler;

impl SimulatorEventHandler for NoopHandler {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{strategy::StrategyTable, BonusBets};

    fn get_typical_config() -> SimulationConfig {
        SimulationConfig {
            name: String::from("Unit Tests Simulation"),
            num_decks: 2,
            num_players: 1,
            num_sessions: 1,
            max_session_hands: 100,
            min_bet: 15,
            buyin_num_bets: 20,
            split_limit: 4,
            bonus_bets: BonusBets::default(),
            seed: Some(7),
        }
    }

    fn get_strategy() -> StrategyTable {
        StrategyTable::new(&crate::strategy::test_strategy_config()).unwrap()
    }

    fn cards(codes: &[&str]) -> Vec<Card> {
        codes.iter().map(|code| code.parse().unwrap()).collect()
    }

    /// Loads a two-deck shoe whose first cards are `firsts`, so no reshuffle happens.
    fn stack_shoe(simulator: &mut Simulator, firsts: &[&str]) {
        let factory = ShoeFactory::new(2);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let shoe = factory
            .get_shoe_with_firsts(&cards(firsts), &mut rng)
            .unwrap();
        simulator.load_shoe(shoe).unwrap();
    }

    #[derive(Default)]
    struct RecordingHandler {
        actions: Vec<(usize, Action)>,
        busts: usize,
        settled: Vec<(usize, HandResult, f64)>,
        bonuses: Vec<BonusOutcome>,
        new_shoes: usize,
        rounds: usize,
    }

    impl SimulatorEventHandler for RecordingHandler {
        fn on_new_shoe(&mut self, _shoe: &Shoe) {
            self.new_shoes += 1;
        }

        fn on_make_action(&mut self, player_index: usize, _hand: &Hand, action: Action) {
            self.actions.push((player_index, action));
        }

        fn on_player_bust(&mut self, _player_index: usize, _hand: &Hand) {
            self.busts += 1;
        }

        fn on_bonus_settled(&mut self, _player_index: usize, outcome: &BonusOutcome) {
            self.bonuses.push(*outcome);
        }

        fn on_hand_settled(&mut self, player_index: usize, hand: &Hand, chip_delta: f64) {
            self.settled.push((player_index, hand.result(), chip_delta));
        }

        fn on_summary_round(&mut self, _dealer_hand: &Hand, _players: &[Player]) {
            self.rounds += 1;
        }
    }

    #[test]
    fn card_values_and_up_card_indices() {
        let card: Card = "AS".parse().unwrap();
        assert_eq!(card.value(), 1);
        assert_eq!(card.dealer_up_card_index(), 9);
        for code in ["TC", "JD", "QH", "KS"] {
            let card: Card = code.parse().unwrap();
            assert_eq!(card.value(), 10);
            assert_eq!(card.dealer_up_card_index(), 8);
        }
        let card: Card = "2H".parse().unwrap();
        assert_eq!(card.value(), 2);
        assert_eq!(card.dealer_up_card_index(), 0);
        let card: Card = "9D".parse().unwrap();
        assert_eq!(card.value(), 9);
        assert_eq!(card.dealer_up_card_index(), 7);
        assert_eq!(card.to_string(), "9D");
        assert!("1C".parse::<Card>().is_err());
        assert!("9X".parse::<Card>().is_err());
        assert!("9CC".parse::<Card>().is_err());
    }

    #[test]
    fn canonical_order_puts_ace_first_and_two_last() {
        use strum::IntoEnumIterator;

        let mut ranks: Vec<Rank> = Rank::iter().collect();
        ranks.sort_by_key(|rank| rank.canonical_order());
        let order: String = ranks.iter().map(|rank| rank.to_char()).collect();
        assert_eq!(order, "AKQJT98765432");
    }

    #[test]
    fn test_allowed_phase() {
        let mut simulator = Simulator::new(&get_typical_config()).unwrap();
        let mut handler = NoopHandler;
        assert_eq!(simulator.current_round_phase(), RoundPhase::WaitForRound);
        assert!(matches!(
            simulator.deal_initial_cards(&mut handler),
            Err(Error::Gameplay(_))
        ));
        assert!(simulator.dealer_plays(&mut handler).is_err());
        assert!(simulator.start_round(&mut handler).unwrap());
        assert_eq!(simulator.current_round_phase(), RoundPhase::DealInitialCards);
        assert!(simulator.seat_players().is_err());
        assert!(simulator.start_round(&mut handler).is_err());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = get_typical_config();
        config.num_decks = 0;
        assert!(matches!(
            Simulator::new(&config),
            Err(Error::Configuration(_))
        ));

        let mut config = get_typical_config();
        config.split_limit = 0;
        assert!(Simulator::new(&config).is_err());
    }

    #[test]
    fn bets_above_the_table_maximum_are_rejected() {
        let mut config = get_typical_config();
        config.min_bet = 200_000_000;
        assert!(matches!(
            Simulator::new(&config),
            Err(Error::Configuration(_))
        ));

        let mut config = get_typical_config();
        config.bonus_bets.bust_bonus = Some(MAX_BET + 1);
        assert!(matches!(
            Simulator::new(&config),
            Err(Error::Configuration(_))
        ));

        let mut config = get_typical_config();
        config.min_bet = MAX_BET;
        config.bonus_bets.twenty_one_plus_three = Some(MAX_BET);
        assert!(Simulator::new(&config).is_ok());
    }

    #[test]
    fn first_round_brings_in_a_new_shoe_and_burns_a_card() {
        let mut simulator = Simulator::new(&get_typical_config()).unwrap();
        let mut handler = RecordingHandler::default();
        assert!(simulator.play_round(&get_strategy(), &mut handler).unwrap());
        assert_eq!(handler.new_shoes, 1);
        assert_eq!(handler.rounds, 1);
        assert_eq!(simulator.shoe().len(), 104);

        let used = simulator.players()[0]
            .hands()
            .iter()
            .map(|hand| hand.cards().len())
            .sum::<usize>()
            + simulator.dealer_hand().cards().len();
        assert_eq!(simulator.shoe().remaining(), 104 - 1 - used);
    }

    #[test]
    fn dealer_blackjack_ends_round_without_draws() {
        let mut config = get_typical_config();
        config.num_players = 2;
        config.bonus_bets.bust_bonus = Some(5);
        let mut simulator = Simulator::new(&config).unwrap();
        // Player 0 gets TH AD, player 1 gets 9C 7D, the dealer gets AS KS.
        stack_shoe(&mut simulator, &["TH", "9C", "AS", "AD", "7D", "KS"]);
        let remaining_before = simulator.shoe().remaining();

        let mut handler = RecordingHandler::default();
        simulator.play_round(&get_strategy(), &mut handler).unwrap();

        assert_eq!(simulator.shoe().remaining(), remaining_before - 6);
        assert!(handler.actions.is_empty());
        assert!(handler.bonuses.is_empty());
        assert_eq!(
            handler.settled,
            vec![(0, HandResult::Push, 0.0), (1, HandResult::Loss, -15.0)]
        );
        assert_eq!(simulator.players()[0].chips(), 300.0);
        assert_eq!(simulator.players()[1].chips(), 285.0);
        assert_eq!(simulator.current_round_phase(), RoundPhase::WaitForRound);
    }

    #[test]
    fn player_busts_after_hitting() {
        let mut simulator = Simulator::new(&get_typical_config()).unwrap();
        // Player TC 6C (hard 16) against dealer 7D, hits a KH. Dealer stands on 7D TD.
        stack_shoe(&mut simulator, &["TC", "7D", "6C", "TD", "KH"]);

        let mut handler = RecordingHandler::default();
        simulator.play_round(&get_strategy(), &mut handler).unwrap();

        assert_eq!(handler.actions, vec![(0, Action::Hit)]);
        assert_eq!(handler.busts, 1);
        assert_eq!(handler.settled, vec![(0, HandResult::Loss, -15.0)]);
        assert_eq!(simulator.dealer_hand().hard_value(), 17);
        let stats = simulator.players()[0].stats();
        assert_eq!(stats.losses, 1);
        assert_eq!(stats.busts, 1);
    }

    #[test]
    fn split_eights_then_double_and_dealer_busts() {
        let mut simulator = Simulator::new(&get_typical_config()).unwrap();
        // Player 8C 8D against dealer 6C (TC in the hole).
        // First hand: 8C + 3D = 11, doubles and gets TD.
        // Second hand: 8D + 9C = 17, stands.
        // Dealer 16 draws 8H and busts.
        stack_shoe(
            &mut simulator,
            &["8C", "6C", "8D", "TC", "3D", "TD", "9C", "8H"],
        );

        let mut handler = RecordingHandler::default();
        simulator.play_round(&get_strategy(), &mut handler).unwrap();

        assert_eq!(
            handler.actions,
            vec![
                (0, Action::Split),
                (0, Action::Hit),
                (0, Action::Double),
                (0, Action::Hit),
                (0, Action::Stand),
            ]
        );
        let player = &simulator.players()[0];
        assert_eq!(player.hands().len(), 2);
        assert_eq!(player.hands()[0].hand_signature(), "T83");
        assert!(player.hands()[0].is_doubled());
        assert_eq!(player.hands()[0].bet(), 30);
        assert_eq!(player.hands()[1].hand_signature(), "98");
        assert!(simulator.dealer_hand().is_bust());
        assert_eq!(
            handler.settled,
            vec![(0, HandResult::Win, 30.0), (0, HandResult::Win, 15.0)]
        );
        assert_eq!(player.chips(), 345.0);
        assert_eq!(player.split_counts().get(&1), Some(&1));
    }

    #[test]
    fn eights_are_resplit_up_to_the_split_limit() {
        let mut config = get_typical_config();
        config.split_limit = 3;
        let mut simulator = Simulator::new(&config).unwrap();
        // Player 8C 8D against dealer 6C (TC in the hole).
        // Hand 0 draws 8H and splits again, which reaches the limit, then draws 8S and stands.
        // Hand 2 (8H) draws 3D, doubles and gets TD.
        // Hand 1 (8D) draws the other 8D, cannot split any more and stands on 16.
        // Dealer 16 draws 9H and busts.
        stack_shoe(
            &mut simulator,
            &["8C", "6C", "8D", "TC", "8H", "8S", "3D", "TD", "8D", "9H"],
        );

        let mut handler = RecordingHandler::default();
        simulator.play_round(&get_strategy(), &mut handler).unwrap();

        let actions: Vec<Action> = handler.actions.iter().map(|(_, action)| *action).collect();
        assert_eq!(
            actions,
            vec![
                Action::Split,
                Action::Hit,
                Action::Split,
                Action::Hit,
                Action::Stand,
                Action::Hit,
                Action::Double,
                Action::Hit,
                Action::Stand,
            ]
        );

        let player = &simulator.players()[0];
        assert_eq!(player.hands().len(), 3);
        assert!(!player.allowed_to_split());
        assert_eq!(player.hands()[0].cards(), cards(&["8C", "8S"]).as_slice());
        assert_eq!(player.hands()[1].cards(), cards(&["8D", "8D"]).as_slice());
        assert_eq!(player.hands()[2].cards(), cards(&["8H", "3D", "TD"]).as_slice());
        assert!(player.hands()[2].is_doubled());
        assert_eq!(player.hands()[2].bet(), 30);

        assert!(simulator.dealer_hand().is_bust());
        assert_eq!(
            handler.settled,
            vec![
                (0, HandResult::Win, 15.0),
                (0, HandResult::Win, 15.0),
                (0, HandResult::Win, 30.0),
            ]
        );
        assert_eq!(player.chips(), 360.0);
        assert_eq!(player.split_counts().get(&2), Some(&1));
    }

    #[test]
    fn dealer_hits_soft_17_and_stands_on_hard_17() {
        use super::hand::hand_from_ranks;

        for (ranks, hits) in [
            ("A5", true),
            ("A6", true),
            ("AA5", true),
            ("T6", true),
            ("A7", false),
            ("T7", false),
            ("A6T", false),
            ("T8", false),
        ] {
            let hand = hand_from_ranks(ranks, false);
            assert_eq!(dealer_must_hit(&hand), hits, "{}", ranks);
        }
    }

    #[test]
    fn full_table_on_a_single_deck_never_runs_dry() {
        let mut config = get_typical_config();
        config.num_decks = 1;
        config.num_players = 7;
        config.buyin_num_bets = 100_000;
        config.bonus_bets = BonusBets {
            twenty_one_plus_three: Some(5),
            bust_bonus: Some(5),
        };
        let strategy = get_strategy();

        for seed in 0..5 {
            config.seed = Some(seed);
            let mut simulator = Simulator::new(&config).unwrap();
            let mut handler = RecordingHandler::default();
            for _ in 0..2000 {
                assert!(simulator.play_round(&strategy, &mut handler).unwrap());
            }
            assert_eq!(handler.rounds, 2000);
            assert!(handler.new_shoes > 2000 / 5);
        }
    }

    #[test]
    fn blackjack_win_pays_three_to_two() {
        let mut simulator = Simulator::new(&get_typical_config()).unwrap();
        stack_shoe(&mut simulator, &["AC", "9D", "KC", "8D"]);

        let mut handler = RecordingHandler::default();
        simulator.play_round(&get_strategy(), &mut handler).unwrap();

        assert_eq!(handler.actions, vec![(0, Action::Stand)]);
        assert_eq!(handler.settled, vec![(0, HandResult::Win, 22.5)]);
        assert_eq!(simulator.players()[0].chips(), 322.5);
        assert_eq!(simulator.players()[0].stats().blackjacks, 1);
    }

    #[test]
    fn side_bets_are_settled() {
        let mut config = get_typical_config();
        config.bonus_bets = BonusBets {
            twenty_one_plus_three: Some(5),
            bust_bonus: Some(5),
        };
        let mut simulator = Simulator::new(&config).unwrap();
        // Player 5C 3C with dealer 4C up: straight flush for the 21+3.
        // Player 8 against 4 hits and draws TH, 18 stands.
        // Dealer 4C 8D draws 5H, 17 stands, so the bust bonus loses.
        stack_shoe(&mut simulator, &["5C", "4C", "3C", "8D", "TH", "5H"]);

        let mut handler = RecordingHandler::default();
        simulator.play_round(&get_strategy(), &mut handler).unwrap();

        assert_eq!(handler.bonuses.len(), 2);
        assert_eq!(handler.bonuses[0].kind, BonusKind::TwentyOnePlusThree);
        assert_eq!(handler.bonuses[0].payout, 150);
        assert_eq!(handler.bonuses[1].kind, BonusKind::BustBonus);
        assert_eq!(handler.bonuses[1].payout, 0);
        assert_eq!(handler.settled, vec![(0, HandResult::Win, 15.0)]);
        // +150 on the 21+3, -5 on the bust bonus, +15 on the hand.
        assert_eq!(simulator.players()[0].chips(), 460.0);
    }

    #[test]
    fn broke_players_sit_out() {
        let mut config = get_typical_config();
        config.buyin_num_bets = 1;
        let mut simulator = Simulator::new(&config).unwrap();
        stack_shoe(&mut simulator, &["TC", "7D", "6C", "TD", "KH"]);
        let mut handler = NoopHandler;
        assert!(simulator.play_round(&get_strategy(), &mut handler).unwrap());
        assert_eq!(simulator.players()[0].chips(), 0.0);
        assert!(!simulator.play_round(&get_strategy(), &mut handler).unwrap());
        assert_eq!(simulator.current_round_phase(), RoundPhase::WaitForRound);
    }

    #[test]
    fn same_seed_gives_same_results() {
        let mut config = get_typical_config();
        config.num_decks = 6;
        config.num_players = 2;
        config.buyin_num_bets = 1000;
        let strategy = get_strategy();

        let mut chips = Vec::new();
        for _ in 0..2 {
            let mut simulator = Simulator::new(&config).unwrap();
            for _ in 0..200 {
                simulator.play_round(&strategy, &mut NoopHandler).unwrap();
            }
            let stacks: Vec<f64> = simulator.players().iter().map(|p| p.chips()).collect();
            chips.push(stacks);
        }
        assert_eq!(chips[0], chips[1]);
    }
}
