use std::collections::{BTreeMap, HashMap};

use crate::{
    simulation::{hand::Hand, Card, Rank},
    Action, Error, Result,
};

/// Number of dealer up-card columns in a strategy row: 2, 3, ..., 9, T, A.
pub const STRATEGY_ROW_LEN: usize = 10;

/// A soft total at least this high always stands once the hand has more than two cards.
pub const MULTI_CARD_SOFT_STAND: u8 = 19;

pub trait Strategy {
    fn determine_action(
        &self,
        dealer_up_card: Card,
        hand: &Hand,
        allowed_to_split: bool,
    ) -> Result<Action>;
}

/// The three action tables as read from configuration, before validation.
#[derive(Debug, Clone, Default)]
pub struct StrategyConfig {
    pub hard_totals: Option<BTreeMap<u8, Vec<Action>>>,
    pub soft_hands: Option<BTreeMap<String, Vec<Action>>>,
    pub pairs: Option<BTreeMap<String, Vec<Action>>>,
}

type StrategyRow = [Action; STRATEGY_ROW_LEN];

/// A basic-strategy chart. Soft and pair rows are keyed by hand signature, hard rows by hard
/// value. Immutable once built.
#[derive(Debug, Clone)]
pub struct StrategyTable {
    hard_totals: HashMap<u8, StrategyRow>,
    soft_hands: HashMap<String, StrategyRow>,
    pairs: HashMap<String, StrategyRow>,
}

impl StrategyTable {
    pub fn new(config: &StrategyConfig) -> Result<StrategyTable> {
        let hard_config = non_empty(&config.hard_totals, "hard_totals")?;
        let mut hard_totals = HashMap::with_capacity(hard_config.len());
        for (total, actions) in hard_config {
            if !(2..=20).contains(total) {
                return Err(Error::Configuration(format!(
                    "hard_totals: total {} is outside 2..=20",
                    total
                )));
            }
            let row = to_row(actions, "hard_totals", &total.to_string(), false)?;
            hard_totals.insert(*total, row);
        }

        let soft_hands = signature_rows(
            non_empty(&config.soft_hands, "soft_hands")?,
            "soft_hands",
            |ranks| ranks.contains(&Rank::Ace),
            "must contain an ace",
            false,
        )?;
        let pairs = signature_rows(
            non_empty(&config.pairs, "pairs")?,
            "pairs",
            |ranks| ranks[0] == ranks[1],
            "must be two cards of the same rank",
            true,
        )?;

        Ok(StrategyTable {
            hard_totals,
            soft_hands,
            pairs,
        })
    }

    pub fn hard_total_action(&self, hard_value: u8, dealer_up_card: Card) -> Option<Action> {
        self.hard_totals
            .get(&hard_value)
            .map(|row| row[dealer_up_card.dealer_up_card_index()])
    }

    pub fn soft_hand_action(&self, signature: &str, dealer_up_card: Card) -> Option<Action> {
        self.soft_hands
            .get(signature)
            .map(|row| row[dealer_up_card.dealer_up_card_index()])
    }

    pub fn pair_action(&self, signature: &str, dealer_up_card: Card) -> Option<Action> {
        self.pairs
            .get(signature)
            .map(|row| row[dealer_up_card.dealer_up_card_index()])
    }
}

impl Strategy for StrategyTable {
    fn determine_action(
        &self,
        dealer_up_card: Card,
        hand: &Hand,
        allowed_to_split: bool,
    ) -> Result<Action> {
        if hand.hard_value() >= 21 {
            return Ok(Action::Stand);
        }
        if hand.len() == 1 {
            return Ok(Action::Hit);
        }

        let signature = hand.hand_signature();
        let action = if hand.len() == 2 {
            if hand.is_blackjack() {
                Some(Action::Stand)
            } else {
                let pair = if allowed_to_split {
                    self.pair_action(&signature, dealer_up_card)
                } else {
                    None
                };
                pair.or_else(|| self.soft_hand_action(&signature, dealer_up_card))
                    .or_else(|| self.hard_total_action(hand.hard_value(), dealer_up_card))
            }
        } else if matches!(hand.soft_value(), Some(soft) if soft >= MULTI_CARD_SOFT_STAND) {
            Some(Action::Stand)
        } else {
            // Doubling is only possible on the first two cards.
            self.hard_total_action(hand.hard_value(), dealer_up_card)
                .map(|action| match action {
                    Action::Double => Action::Hit,
                    action => action,
                })
        };

        action.ok_or_else(|| Error::DetermineAction {
            signature,
            dealer_up_card: dealer_up_card.to_string(),
            hard_value: hand.hard_value(),
        })
    }
}

fn non_empty<'a, K, V>(
    table: &'a Option<BTreeMap<K, V>>,
    name: &str,
) -> Result<&'a BTreeMap<K, V>> {
    match table {
        Some(table) if !table.is_empty() => Ok(table),
        _ => Err(Error::Configuration(format!(
            "Missing {} in strategy config",
            name
        ))),
    }
}

/// Only pair rows may split.
fn to_row(actions: &[Action], table: &str, key: &str, allow_split: bool) -> Result<StrategyRow> {
    if !allow_split && actions.contains(&Action::Split) {
        return Err(Error::Configuration(format!(
            "{}: {} cannot split, SP is only valid in pairs",
            table, key
        )));
    }
    actions.try_into().map_err(|_| {
        Error::Configuration(format!(
            "Invalid # of actions in {} for {}: expected {}, got {}",
            table,
            key,
            STRATEGY_ROW_LEN,
            actions.len()
        ))
    })
}

/// Validates two-card signature keys and stores them in canonical order, so "7A" and "A7" name
/// the same row.
fn signature_rows(
    config: &BTreeMap<String, Vec<Action>>,
    table: &str,
    is_valid: fn(&[Rank; 2]) -> bool,
    requirement: &str,
    allow_split: bool,
) -> Result<HashMap<String, StrategyRow>> {
    let mut rows = HashMap::with_capacity(config.len());
    for (key, actions) in config {
        let ranks = key
            .chars()
            .map(Rank::try_from)
            .collect::<Result<Vec<_>>>()
            .map_err(|err| Error::Configuration(format!("{}: key {}: {}", table, key, err)))?;
        let mut ranks: [Rank; 2] = ranks.try_into().map_err(|_| {
            Error::Configuration(format!("{}: key {} is not a two-card hand", table, key))
        })?;
        if !is_valid(&ranks) {
            return Err(Error::Configuration(format!(
                "{}: key {} {}",
                table, key, requirement
            )));
        }

        ranks.sort_by_key(|rank| rank.canonical_order());
        let signature: String = ranks.iter().map(|rank| rank.to_char()).collect();
        let row = to_row(actions, table, key, allow_split)?;
        if rows.insert(signature.clone(), row).is_some() {
            return Err(Error::Configuration(format!(
                "{}: {} is listed more than once",
                table, signature
            )));
        }
    }
    Ok(rows)
}

/// A complete chart for a multi-deck game, dealer hits soft 17.
#[cfg(test)]
pub(crate) fn test_strategy_config() -> StrategyConfig {
    fn row(actions: &str) -> Vec<Action> {
        actions
            .split_whitespace()
            .map(|code| code.parse().unwrap())
            .collect()
    }

    let mut hard_totals = BTreeMap::new();
    for total in 3..=8 {
        hard_totals.insert(total, row("H H H H H H H H H H"));
    }
    hard_totals.insert(9, row("H D D D D H H H H H"));
    hard_totals.insert(10, row("D D D D D D D D H H"));
    hard_totals.insert(11, row("D D D D D D D D D D"));
    hard_totals.insert(12, row("H H S S S H H H H H"));
    for total in 13..=16 {
        hard_totals.insert(total, row("S S S S S H H H H H"));
    }
    for total in 17..=20 {
        hard_totals.insert(total, row("S S S S S S S S S S"));
    }

    let mut soft_hands = BTreeMap::new();
    for (key, actions) in [
        ("AA", "H H H D D H H H H H"),
        ("A2", "H H H D D H H H H H"),
        ("A3", "H H H D D H H H H H"),
        ("A4", "H H D D D H H H H H"),
        ("A5", "H H D D D H H H H H"),
        ("A6", "H D D D D H H H H H"),
        ("A7", "D D D D D S S H H H"),
        ("A8", "S S S S D S S S S S"),
        ("A9", "S S S S S S S S S S"),
    ] {
        soft_hands.insert(key.to_string(), row(actions));
    }

    let mut pairs = BTreeMap::new();
    for (key, actions) in [
        ("22", "SP SP SP SP SP SP H H H H"),
        ("33", "SP SP SP SP SP SP H H H H"),
        ("44", "D D D SP SP H H H H H"),
        ("55", "D D D D D D D D H H"),
        ("66", "SP SP SP SP SP H H H H H"),
        ("77", "SP SP SP SP SP SP H H H H"),
        ("88", "SP SP SP SP SP SP SP SP SP SP"),
        ("99", "SP SP SP SP SP S SP SP S S"),
        ("TT", "S S S S S S S S S S"),
        ("JJ", "S S S S S S S S S S"),
        ("QQ", "S S S S S S S S S S"),
        ("KK", "S S S S S S S S S S"),
        ("AA", "SP SP SP SP SP SP SP SP SP SP"),
    ] {
        pairs.insert(key.to_string(), row(actions));
    }

    StrategyConfig {
        hard_totals: Some(hard_totals),
        soft_hands: Some(soft_hands),
        pairs: Some(pairs),
    }
}
