pub mod bonus;
mod error;
pub mod simulation;
pub mod strategy;

pub use error::{Error, Result};
use serde_enum_str::{Deserialize_enum_str, Serialize_enum_str};

/// Split limit used when the configuration does not give one.
pub const DEFAULT_SPLIT_LIMIT: usize = 4;

/// Largest main or side bet a table accepts. Keeps doubled bets and bonus payouts within `u32`.
pub const MAX_BET: u32 = 1_000_000;

/// Table settings of one simulation. Loaded and validated by the caller.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub name: String,
    pub num_decks: u8,
    pub num_players: u8,
    pub num_sessions: u32,
    pub max_session_hands: u32,
    pub min_bet: u32,
    pub buyin_num_bets: u32,
    /// Maximum number of hands a player may hold after splitting.
    pub split_limit: usize,
    pub bonus_bets: BonusBets,
    /// Seed of the shuffling RNG. `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl SimulationConfig {
    /// Chips every player sits down with at the start of a session.
    pub fn buyin(&self) -> f64 {
        self.min_bet as f64 * self.buyin_num_bets as f64
    }
}

/// Side bet amounts placed by every player. `None` means the side bet is not played.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BonusBets {
    pub twenty_one_plus_three: Option<u32>,
    pub bust_bonus: Option<u32>,
}

/// What a player or dealer does with a hand. The string forms are the codes used by strategy
/// configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_enum_str, Deserialize_enum_str)]
pub enum Action {
    #[serde(rename = "S")]
    Stand,
    #[serde(rename = "H")]
    Hit,
    #[serde(rename = "D")]
    Double,
    #[serde(rename = "SP")]
    Split,
}
