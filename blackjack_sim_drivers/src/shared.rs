use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use blackjack_sim::{
    strategy::{StrategyConfig, StrategyTable},
    Action, BonusBets, SimulationConfig, DEFAULT_SPLIT_LIMIT, MAX_BET,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Most seats a blackjack table has.
pub const MAX_PLAYERS: u8 = 7;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Cannot parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Invalid value: {0}")]
    InvalidValue(String),
    #[error("Invalid action: {0}")]
    InvalidAction(#[from] serde::de::value::Error),
    #[error(transparent)]
    Strategy(#[from] blackjack_sim::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub simulations: Vec<ConfigSimulation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSimulation {
    pub name: String,
    pub num_decks: u8,
    pub num_players: u8,
    pub num_sessions: u32,
    pub max_session_hands: u32,
    pub min_bet: u32,
    pub buyin_num_bets: u32,
    #[serde(default)]
    pub split_limit: Option<usize>,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub bonus_bets: ConfigBonusBets,
    /// Relative paths are resolved against the directory of the main config file.
    pub strategy_config_file: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigBonusBets {
    #[serde(default)]
    pub twenty_one_plus_three: Option<u32>,
    #[serde(default)]
    pub bust_bonus: Option<u32>,
}

impl TryInto<SimulationConfig> for ConfigSimulation {
    type Error = ConfigError;

    fn try_into(self) -> Result<SimulationConfig, Self::Error> {
        let invalid = |message: &str| {
            Err(ConfigError::InvalidValue(format!(
                "{}: {}",
                self.name, message
            )))
        };
        if self.num_decks == 0 {
            return invalid("num_decks must be at least 1");
        }
        if self.num_players == 0 || self.num_players > MAX_PLAYERS {
            return invalid("num_players must be between 1 and 7");
        }
        if self.min_bet == 0 {
            return invalid("min_bet must be at least 1");
        }
        if self.buyin_num_bets == 0 {
            return invalid("buyin_num_bets must be at least 1");
        }
        if self.split_limit == Some(0) {
            return invalid("split_limit must be at least 1");
        }
        if self.bonus_bets.twenty_one_plus_three == Some(0) || self.bonus_bets.bust_bonus == Some(0)
        {
            return invalid("bonus bets must be at least 1, leave them out to disable them");
        }
        let largest_bet = [
            Some(self.min_bet),
            self.bonus_bets.twenty_one_plus_three,
            self.bonus_bets.bust_bonus,
        ]
        .into_iter()
        .flatten()
        .max()
        .unwrap_or(0);
        if largest_bet > MAX_BET {
            return invalid(&format!("bets must not exceed {}", MAX_BET));
        }

        Ok(SimulationConfig {
            num_decks: self.num_decks,
            num_players: self.num_players,
            num_sessions: self.num_sessions,
            max_session_hands: self.max_session_hands,
            min_bet: self.min_bet,
            buyin_num_bets: self.buyin_num_bets,
            split_limit: self.split_limit.unwrap_or(DEFAULT_SPLIT_LIMIT),
            bonus_bets: BonusBets {
                twenty_one_plus_three: self.bonus_bets.twenty_one_plus_three,
                bust_bonus: self.bonus_bets.bust_bonus,
            },
            seed: self.seed,
            name: self.name,
        })
    }
}

/// Strategy file content. Actions are the codes `H`, `S`, `D` and `SP`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigStrategy {
    pub hard_totals: Option<BTreeMap<u8, Vec<String>>>,
    pub soft_hands: Option<BTreeMap<String, Vec<String>>>,
    pub pairs: Option<BTreeMap<String, Vec<String>>>,
}

impl TryInto<StrategyConfig> for ConfigStrategy {
    type Error = ConfigError;

    fn try_into(self) -> Result<StrategyConfig, Self::Error> {
        Ok(StrategyConfig {
            hard_totals: self.hard_totals.map(parse_actions).transpose()?,
            soft_hands: self.soft_hands.map(parse_actions).transpose()?,
            pairs: self.pairs.map(parse_actions).transpose()?,
        })
    }
}

fn parse_actions<K: Ord>(
    table: BTreeMap<K, Vec<String>>,
) -> Result<BTreeMap<K, Vec<Action>>, ConfigError> {
    table
        .into_iter()
        .map(|(key, codes)| {
            let actions = codes
                .iter()
                .map(|code| code.parse())
                .collect::<Result<Vec<Action>, _>>()?;
            Ok::<_, ConfigError>((key, actions))
        })
        .collect()
}

fn read_file(filename: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(filename).map_err(|source| ConfigError::Io {
        path: filename.to_path_buf(),
        source,
    })
}

/// Reads the content of a given config file and parses it to a Config.
pub fn parse_config_from_file(filename: &Path) -> Result<Config, ConfigError> {
    Ok(serde_yaml::from_str(&read_file(filename)?)?)
}

pub fn parse_strategy_from_file(filename: &Path) -> Result<ConfigStrategy, ConfigError> {
    Ok(serde_yaml::from_str(&read_file(filename)?)?)
}

/// Path of the strategy file of `simulation`, relative to the directory holding the main config
/// file unless it is absolute.
pub fn strategy_file_path(config_path: &Path, simulation: &ConfigSimulation) -> PathBuf {
    let strategy_path = Path::new(&simulation.strategy_config_file);
    match config_path.parent() {
        Some(dir) if strategy_path.is_relative() => dir.join(strategy_path),
        _ => strategy_path.to_path_buf(),
    }
}

/// Reads, converts and validates the strategy table of `simulation`.
pub fn load_strategy(
    config_path: &Path,
    simulation: &ConfigSimulation,
) -> Result<StrategyTable, ConfigError> {
    let config_strategy = parse_strategy_from_file(&strategy_file_path(config_path, simulation))?;
    let strategy_config: StrategyConfig = config_strategy.try_into()?;
    Ok(StrategyTable::new(&strategy_config)?)
}
