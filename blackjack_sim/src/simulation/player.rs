use std::collections::BTreeMap;

use crate::bonus::{BonusKind, BonusOutcome, BonusPlan};

use super::hand::{Hand, HandResult};

/// Running totals of one side bet.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BonusStats {
    pub bets: u64,
    pub hits: u64,
    pub total_wagered: f64,
    pub net: f64,
}

impl BonusStats {
    pub fn merge(&mut self, other: &BonusStats) {
        self.bets += other.bets;
        self.hits += other.hits;
        self.total_wagered += other.total_wagered;
        self.net += other.net;
    }
}

/// Running totals of one player. Every settled hand is counted exactly once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerStats {
    pub hands_played: u64,
    pub wins: u64,
    pub pushes: u64,
    pub losses: u64,
    pub blackjacks: u64,
    pub busts: u64,
    pub doubles: u64,
    pub total_wagered: f64,
    pub net: f64,
    pub twenty_one_plus_three: BonusStats,
    pub bust_bonus: BonusStats,
}

impl PlayerStats {
    pub fn bonus(&self, kind: BonusKind) -> &BonusStats {
        match kind {
            BonusKind::TwentyOnePlusThree => &self.twenty_one_plus_three,
            BonusKind::BustBonus => &self.bust_bonus,
        }
    }

    fn bonus_mut(&mut self, kind: BonusKind) -> &mut BonusStats {
        match kind {
            BonusKind::TwentyOnePlusThree => &mut self.twenty_one_plus_three,
            BonusKind::BustBonus => &mut self.bust_bonus,
        }
    }

    pub fn merge(&mut self, other: &PlayerStats) {
        self.hands_played += other.hands_played;
        self.wins += other.wins;
        self.pushes += other.pushes;
        self.losses += other.losses;
        self.blackjacks += other.blackjacks;
        self.busts += other.busts;
        self.doubles += other.doubles;
        self.total_wagered += other.total_wagered;
        self.net += other.net;
        self.twenty_one_plus_three
            .merge(&other.twenty_one_plus_three);
        self.bust_bonus.merge(&other.bust_bonus);
    }
}

/// A seat at the table. Owns the hands of the current round (more than one after splitting) and
/// the chips and statistics of the current session.
#[derive(Debug, Clone)]
pub struct Player {
    index: usize,
    hands: Vec<Hand>,
    chips: f64,
    allowed_to_split: bool,
    /// Number of splits in a round -> number of rounds.
    split_counts: BTreeMap<usize, u64>,
    stats: PlayerStats,
    bonus_plans: Vec<BonusPlan>,
}

impl Player {
    pub fn new(index: usize, buyin: f64, bonus_plans: Vec<BonusPlan>) -> Player {
        Player {
            index,
            hands: Vec::with_capacity(4),
            chips: buyin,
            allowed_to_split: true,
            split_counts: BTreeMap::new(),
            stats: PlayerStats::default(),
            bonus_plans,
        }
    }

    /// Registers a hand. Once the player holds `split_limit` hands no further split is allowed.
    /// Returns the index of the new hand.
    pub fn add_hand(&mut self, hand: Hand, split_limit: usize) -> usize {
        self.hands.push(hand);
        if self.hands.len() >= split_limit {
            self.allowed_to_split = false;
        }
        self.hands.len() - 1
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn hands(&self) -> &[Hand] {
        &self.hands
    }

    pub fn chips(&self) -> f64 {
        self.chips
    }

    pub fn allowed_to_split(&self) -> bool {
        self.allowed_to_split
    }

    pub fn split_counts(&self) -> &BTreeMap<usize, u64> {
        &self.split_counts
    }

    pub fn stats(&self) -> &PlayerStats {
        &self.stats
    }

    pub fn bonus_plan(&self, kind: BonusKind) -> Option<BonusPlan> {
        self.bonus_plans.iter().find(|plan| plan.kind == kind).copied()
    }

    /// Whether the player has a hand in the current round.
    pub fn is_active(&self) -> bool {
        !self.hands.is_empty()
    }

    pub(crate) fn hand_mut(&mut self, hand_index: usize) -> &mut Hand {
        &mut self.hands[hand_index]
    }

    pub(crate) fn starting_hand_mut(&mut self) -> Option<&mut Hand> {
        self.hands.first_mut()
    }

    /// Clears last round's hands and, if the chips cover `min_bet`, starts a new hand.
    /// Returns whether the player plays this round.
    pub(crate) fn reset_for_round(&mut self, min_bet: u32) -> bool {
        self.hands.clear();
        self.allowed_to_split = true;
        if self.chips < min_bet as f64 {
            return false;
        }
        self.hands.push(Hand::new_player(min_bet));
        true
    }

    /// Fixes the result of a hand and moves chips accordingly. A blackjack win pays 3:2.
    /// Returns the chip delta.
    pub(crate) fn settle_hand(&mut self, hand_index: usize, result: HandResult) -> f64 {
        let hand = &mut self.hands[hand_index];
        hand.set_result(result);

        let bet = hand.bet() as f64;
        let chip_delta = match result {
            HandResult::Win if hand.is_blackjack() => bet * 1.5,
            HandResult::Win => bet,
            HandResult::Loss => -bet,
            HandResult::Push | HandResult::Undetermined => 0.0,
        };

        let stats = &mut self.stats;
        stats.hands_played += 1;
        stats.total_wagered += bet;
        stats.net += chip_delta;
        match result {
            HandResult::Win => stats.wins += 1,
            HandResult::Push => stats.pushes += 1,
            HandResult::Loss => stats.losses += 1,
            HandResult::Undetermined => {}
        }
        if result == HandResult::Win && hand.is_blackjack() {
            stats.blackjacks += 1;
        }
        if hand.is_bust() {
            stats.busts += 1;
        }
        if hand.is_doubled() {
            stats.doubles += 1;
        }

        self.chips += chip_delta;
        chip_delta
    }

    pub(crate) fn settle_bonus(&mut self, outcome: &BonusOutcome) {
        let chip_delta = outcome.chip_delta();
        let stats = self.stats.bonus_mut(outcome.kind);
        stats.bets += 1;
        stats.total_wagered += outcome.bet as f64;
        stats.net += chip_delta;
        if outcome.won() {
            stats.hits += 1;
        }
        self.chips += chip_delta;
    }

    pub(crate) fn record_splits(&mut self) {
        if self.is_active() {
            *self.split_counts.entry(self.hands.len() - 1).or_insert(0) += 1;
        }
    }
}
