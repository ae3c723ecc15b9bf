use log::debug;

use crate::{strategy::Strategy, Result, SimulationConfig};

use super::{SimulatorEventHandler, Simulator};

/// Plays every session of a simulation. Each session seats freshly bought-in players and plays up
/// to `max_session_hands` rounds, stopping early once nobody can cover the minimum bet. The shoe
/// carries over from one session to the next.
///
/// Returns the total number of rounds played.
pub fn run_simulation<T: Strategy, U: SimulatorEventHandler>(
    config: &SimulationConfig,
    strategy: &T,
    handler: &mut U,
) -> Result<u64> {
    let mut simulator = Simulator::new(config)?;

    for session in 0..config.num_sessions {
        if session > 0 {
            simulator.seat_players()?;
        }
        handler.on_session_begin(session, simulator.players());

        for hand_number in 0..config.max_session_hands {
            if !simulator.play_round(strategy, handler)? {
                debug!(
                    "{}: session {} ends after {} rounds, every player is broke",
                    config.name, session, hand_number
                );
                break;
            }
        }

        handler.on_session_end(session, simulator.players());
    }

    Ok(simulator.rounds_played())
}
