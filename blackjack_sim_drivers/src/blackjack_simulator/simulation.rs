use std::collections::BTreeMap;
use std::path::Path;

use self::private::Statistics;
use blackjack_sim::bonus::{BonusKind, BonusOutcome};
use blackjack_sim::simulation::{
    hand::Hand, player::Player, session::run_simulation, shoe::Shoe, SimulatorEventHandler,
};
use blackjack_sim::{Action, SimulationConfig};
use blackjack_sim_drivers::{load_strategy, ConfigSimulation};
use log::debug;
use strum::IntoEnumIterator;

type BoxErr = Box<dyn std::error::Error>;

mod private {
    use std::collections::BTreeMap;

    use blackjack_sim::simulation::player::{Player, PlayerStats};

    /// Totals over every session of a simulation.
    #[derive(Debug, Clone, Default)]
    pub struct Statistics {
        sessions: u32,
        sessions_ended_early: u32,
        rounds: u64,
        new_shoes: u64,
        totals: PlayerStats,
        split_counts: BTreeMap<usize, u64>,

        min_final_chips: Option<f64>,
        max_final_chips: Option<f64>,
        sum_final_chips: f64,
        players_seen: u64,
    }

    impl Statistics {
        pub fn count_round(&mut self) {
            self.rounds += 1;
        }

        pub fn count_new_shoe(&mut self) {
            self.new_shoes += 1;
        }

        pub fn add_session(&mut self, players: &[Player], ended_early: bool) {
            self.sessions += 1;
            if ended_early {
                self.sessions_ended_early += 1;
            }
            for player in players {
                self.totals.merge(player.stats());
                for (splits, rounds) in player.split_counts() {
                    *self.split_counts.entry(*splits).or_insert(0) += rounds;
                }

                let chips = player.chips();
                self.min_final_chips = Some(self.min_final_chips.map_or(chips, |c| c.min(chips)));
                self.max_final_chips = Some(self.max_final_chips.map_or(chips, |c| c.max(chips)));
                self.sum_final_chips += chips;
                self.players_seen += 1;
            }
        }

        pub fn get_sessions(&self) -> u32 {
            self.sessions
        }

        pub fn get_sessions_ended_early(&self) -> u32 {
            self.sessions_ended_early
        }

        pub fn get_rounds(&self) -> u64 {
            self.rounds
        }

        pub fn get_new_shoes(&self) -> u64 {
            self.new_shoes
        }

        pub fn get_totals(&self) -> &PlayerStats {
            &self.totals
        }

        pub fn get_split_counts(&self) -> &BTreeMap<usize, u64> {
            &self.split_counts
        }

        /// (min, average, max) of the chips players left the table with.
        pub fn get_final_chips(&self) -> Option<(f64, f64, f64)> {
            match (self.min_final_chips, self.max_final_chips) {
                (Some(min), Some(max)) => {
                    Some((min, self.sum_final_chips / self.players_seen as f64, max))
                }
                _ => None,
            }
        }

        /// Player net result per unit wagered on the main hands, in percent.
        pub fn get_player_edge(&self) -> f64 {
            percentage(self.totals.net, self.totals.total_wagered)
        }
    }

    pub fn percentage(part: f64, whole: f64) -> f64 {
        if whole == 0.0 {
            0.0
        } else {
            part / whole * 100.0
        }
    }
}

#[derive(Debug, Clone, Default)]
struct Handler {
    max_session_hands: u32,
    rounds_in_session: u32,
    actions: BTreeMap<String, u64>,
    stats: Statistics,
}

impl Handler {
    fn new(max_session_hands: u32) -> Handler {
        Handler {
            max_session_hands,
            ..Default::default()
        }
    }
}

impl SimulatorEventHandler for Handler {
    fn on_new_shoe(&mut self, _shoe: &Shoe) {
        self.stats.count_new_shoe();
    }

    fn on_session_begin(&mut self, session: u32, players: &[Player]) {
        self.rounds_in_session = 0;
        debug!("Session {} begins with {} players", session, players.len());
    }

    fn on_make_action(&mut self, _player_index: usize, _hand: &Hand, action: Action) {
        *self.actions.entry(format!("{:?}", action)).or_insert(0) += 1;
    }

    fn on_bonus_settled(&mut self, player_index: usize, outcome: &BonusOutcome) {
        if outcome.won() {
            debug!(
                "Player {} wins {} on the {}",
                player_index, outcome.payout, outcome.kind
            );
        }
    }

    fn on_summary_round(&mut self, _dealer_hand: &Hand, _players: &[Player]) {
        self.rounds_in_session += 1;
        self.stats.count_round();
    }

    fn on_session_end(&mut self, session: u32, players: &[Player]) {
        let ended_early = self.rounds_in_session < self.max_session_hands;
        debug!(
            "Session {} ends after {} rounds",
            session, self.rounds_in_session
        );
        self.stats.add_session(players, ended_early);
    }
}

/// Loads the strategy of `config_simulation`, runs every session and prints the report.
/// Returns the number of rounds played.
pub fn run_configured_simulation(
    config_path: &Path,
    config_simulation: &ConfigSimulation,
    seed: Option<u64>,
) -> Result<u64, BoxErr> {
    let strategy = load_strategy(config_path, config_simulation)?;
    let mut config: SimulationConfig = config_simulation.clone().try_into()?;
    if seed.is_some() {
        config.seed = seed;
    }

    let mut handler = Handler::new(config.max_session_hands);
    let rounds = run_simulation(&config, &strategy, &mut handler)?;
    print_report(&config, &handler);
    Ok(rounds)
}

fn print_report(config: &SimulationConfig, handler: &Handler) {
    let stats = &handler.stats;
    let totals = stats.get_totals();
    let hands = totals.hands_played as f64;

    println!("================ {} ================", config.name);
    println!(
        "Decks: {}. Players: {}. Min bet: {}. Buy-in: {}. Split limit: {}.",
        config.num_decks,
        config.num_players,
        config.min_bet,
        config.buyin(),
        config.split_limit
    );
    println!(
        "Sessions: {} ({} ended early). Rounds: {}. Shoes: {}.",
        stats.get_sessions(),
        stats.get_sessions_ended_early(),
        stats.get_rounds(),
        stats.get_new_shoes()
    );
    println!(
        "Hands: {}. Win: {:.2}%. Push: {:.2}%. Loss: {:.2}%.",
        totals.hands_played,
        private::percentage(totals.wins as f64, hands),
        private::percentage(totals.pushes as f64, hands),
        private::percentage(totals.losses as f64, hands)
    );
    println!(
        "Blackjacks: {}. Busts: {}. Doubles: {}.",
        totals.blackjacks, totals.busts, totals.doubles
    );

    print!("Splits per round:");
    for (splits, rounds) in stats.get_split_counts() {
        print!(" {}x{}", splits, rounds);
    }
    println!();

    print!("Actions:");
    for (action, count) in &handler.actions {
        print!(" {}={}", action, count);
    }
    println!();

    println!(
        "Total bet: {}. Net: {:.2}. Player edge: {:.3}%. House edge: {:.3}%.",
        totals.total_wagered,
        totals.net,
        stats.get_player_edge(),
        -stats.get_player_edge()
    );
    if let Some((min, average, max)) = stats.get_final_chips() {
        println!(
            "Final chips: min {:.2}, avg {:.2}, max {:.2}.",
            min, average, max
        );
    }

    for kind in BonusKind::iter() {
        let bonus = totals.bonus(kind);
        if bonus.bets == 0 {
            continue;
        }
        println!(
            "{}: bets {}. Hits: {} ({:.2}%). Net: {:.2}. House edge: {:.3}%.",
            kind,
            bonus.bets,
            bonus.hits,
            private::percentage(bonus.hits as f64, bonus.bets as f64),
            bonus.net,
            -private::percentage(bonus.net, bonus.total_wagered)
        );
    }
    println!("----------------------------------------------------");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statistics_collect_every_session() {
        let mut handler = Handler::new(5);
        let players = vec![Player::new(0, 100.0, Vec::new()), Player::new(1, 50.0, Vec::new())];

        handler.on_session_begin(0, &players);
        for _ in 0..5 {
            handler.on_summary_round(&Hand::new_dealer(), &players);
        }
        handler.on_session_end(0, &players);

        handler.on_session_begin(1, &players);
        handler.on_summary_round(&Hand::new_dealer(), &players);
        handler.on_session_end(1, &players);

        let stats = &handler.stats;
        assert_eq!(stats.get_sessions(), 2);
        assert_eq!(stats.get_sessions_ended_early(), 1);
        assert_eq!(stats.get_rounds(), 6);
        assert_eq!(stats.get_final_chips(), Some((50.0, 75.0, 100.0)));
        assert_eq!(stats.get_player_edge(), 0.0);
    }

    #[test]
    fn percentage_of_nothing_is_zero() {
        assert_eq!(private::percentage(5.0, 0.0), 0.0);
        assert_eq!(private::percentage(-1.0, 200.0), -0.5);
    }
}
