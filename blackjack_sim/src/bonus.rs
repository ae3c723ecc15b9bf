use crate::{
    simulation::{hand::Hand, Card, Rank},
    BonusBets, Error, Result,
};

use strum_macros::EnumIter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum BonusKind {
    /// Pays on the dealer up-card and the first two player cards forming a poker hand.
    TwentyOnePlusThree,
    /// Pays when the dealer busts.
    BustBonus,
}

impl std::fmt::Display for BonusKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BonusKind::TwentyOnePlusThree => write!(f, "21+3"),
            BonusKind::BustBonus => write!(f, "Bust bonus"),
        }
    }
}

/// A side bet a player places every round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BonusPlan {
    pub kind: BonusKind,
    pub bet: u32,
}

impl BonusPlan {
    pub fn from_bonus_bets(bonus_bets: &BonusBets) -> Vec<BonusPlan> {
        let mut plans = Vec::with_capacity(2);
        if let Some(bet) = bonus_bets.twenty_one_plus_three {
            plans.push(BonusPlan {
                kind: BonusKind::TwentyOnePlusThree,
                bet,
            });
        }
        if let Some(bet) = bonus_bets.bust_bonus {
            plans.push(BonusPlan {
                kind: BonusKind::BustBonus,
                bet,
            });
        }
        plans
    }
}

/// Result of one settled side bet. A payout of 0 means the bet is lost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BonusOutcome {
    pub kind: BonusKind,
    pub bet: u32,
    pub payout: u32,
}

impl BonusOutcome {
    pub fn won(&self) -> bool {
        self.payout > 0
    }

    pub fn chip_delta(&self) -> f64 {
        if self.won() {
            self.payout as f64
        } else {
            -(self.bet as f64)
        }
    }
}

/// 21+3: the dealer up-card and the player's two cards scored as a three-card poker hand.
pub struct TwentyOnePlusThree;

impl TwentyOnePlusThree {
    pub const STRAIGHT_FLUSH: u32 = 30;
    pub const TRIPS: u32 = 20;
    pub const STRAIGHT: u32 = 10;
    pub const FLUSH: u32 = 5;

    pub fn multiplier(dealer_up_card: Card, player_hand: &Hand) -> Result<u32> {
        let cards = match player_hand.cards() {
            [first, second] => [dealer_up_card, *first, *second],
            cards => {
                return Err(Error::Gameplay(format!(
                    "21+3 needs a two-card player hand, got {} cards",
                    cards.len()
                )))
            }
        };

        // An ace counts low first, and high only if that does not make a straight.
        let contains_ace = cards.iter().any(|card| card.rank == Rank::Ace);
        let is_straight = is_straight(&cards, Rank::ace_low)
            || (contains_ace && is_straight(&cards, Rank::ace_high));
        let is_flush = cards.iter().all(|card| card.suit == cards[0].suit);
        let is_trips = cards.iter().all(|card| card.rank == cards[0].rank);

        let multiplier = if is_straight && is_flush {
            Self::STRAIGHT_FLUSH
        } else if is_trips {
            Self::TRIPS
        } else if is_straight {
            Self::STRAIGHT
        } else if is_flush {
            Self::FLUSH
        } else {
            0
        };
        Ok(multiplier)
    }

    pub fn payout(dealer_up_card: Card, player_hand: &Hand, bet: u32) -> Result<u32> {
        scale(Self::multiplier(dealer_up_card, player_hand)?, bet)
    }
}

fn scale(multiplier: u32, bet: u32) -> Result<u32> {
    multiplier.checked_mul(bet).ok_or_else(|| {
        Error::Gameplay(format!("Payout of {} x {} overflows", multiplier, bet))
    })
}

fn is_straight(cards: &[Card; 3], order: fn(Rank) -> u8) -> bool {
    let mut ranks = cards.map(|card| order(card.rank));
    ranks.sort_unstable();
    ranks[0] + 1 == ranks[1] && ranks[1] + 1 == ranks[2]
}

/// Bust bonus: pays when the dealer busts, more for a strong up-card and more again if the
/// dealer's cards are all of one suit.
pub struct BustBonus;

impl BustBonus {
    /// Indexed by the value of the dealer up-card minus one (ace first).
    pub const UNSUITED: [u32; 10] = [8, 1, 1, 1, 1, 1, 2, 2, 2, 2];
    pub const SUITED: [u32; 10] = [50, 8, 8, 8, 8, 8, 15, 15, 15, 15];
    pub const THREE_EIGHTS: u32 = 25;
    pub const THREE_EIGHTS_SUITED: u32 = 75;

    pub fn multiplier(dealer_up_card: Card, dealer_hand: &Hand) -> u32 {
        if !dealer_hand.is_bust() {
            return 0;
        }

        let cards = dealer_hand.cards();
        let suited = cards.iter().all(|card| card.suit == cards[0].suit);
        let three_eights = cards.len() == 3 && cards.iter().all(|card| card.rank == Rank::Eight);
        match (three_eights, suited) {
            (true, true) => Self::THREE_EIGHTS_SUITED,
            (true, false) => Self::THREE_EIGHTS,
            (false, true) => Self::SUITED[dealer_up_card.value() as usize - 1],
            (false, false) => Self::UNSUITED[dealer_up_card.value() as usize - 1],
        }
    }

    pub fn payout(dealer_up_card: Card, dealer_hand: &Hand, bet: u32) -> Result<u32> {
        scale(Self::multiplier(dealer_up_card, dealer_hand), bet)
    }
}
