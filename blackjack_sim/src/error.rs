use thiserror::Error;

/// Every failure the simulator can report. None of them is retried: a simulation stops at the
/// first error it meets.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The strategy table or simulation settings are malformed or incomplete.
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// A rule of the game was about to be broken, e.g. drawing to a hand that is already 21 or
    /// splitting a non-pair. This always points at a bug in the round engine.
    #[error("Gameplay error: {0}")]
    Gameplay(String),
    /// The strategy table has no entry for a hand the engine produced.
    #[error(
        "Unable to determine action for hand {signature} (hard {hard_value}) against dealer up card {dealer_up_card}"
    )]
    DetermineAction {
        signature: String,
        dealer_up_card: String,
        hard_value: u8,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
