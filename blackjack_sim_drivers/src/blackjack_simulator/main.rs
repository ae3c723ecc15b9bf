mod simulation;

use std::path::PathBuf;
use std::process::ExitCode;

use blackjack_sim_drivers::{parse_config_from_file, ConfigError};
use clap::Parser;
use log::{error, info, LevelFilter};

const DEFAULT_CONFIG_PATH: &str = "~/.blackjack_sim.yml";
const DEFAULT_CONFIG_FILE_NAME: &str = ".blackjack_sim.yml";

#[derive(Debug, Parser)]
#[command(author, about, long_about = None)]
struct CommandLineArgs {
    /// The path of the config file
    #[arg(short, long, default_value_t = String::from(DEFAULT_CONFIG_PATH))]
    config: String,

    /// Seed for every simulation, overriding the seeds in the config file
    #[arg(long)]
    seed: Option<u64>,

    /// Only run the simulation with this name
    #[arg(long)]
    only: Option<String>,

    /// More logging: -v for debug, -vv for trace. RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn resolve_config_path(config: &str) -> Result<PathBuf, ConfigError> {
    if config != DEFAULT_CONFIG_PATH {
        return Ok(PathBuf::from(config));
    }
    let home_dir = home::home_dir()
        .ok_or_else(|| ConfigError::InvalidValue(String::from("Cannot find home directory")))?;
    let config_file_path = home_dir.join(DEFAULT_CONFIG_FILE_NAME);
    if config_file_path.is_dir() {
        return Err(ConfigError::InvalidValue(format!(
            "{} should be a file rather than a directory",
            config_file_path.display()
        )));
    }
    Ok(config_file_path)
}

fn main() -> ExitCode {
    let args = CommandLineArgs::parse();

    let level = match args.verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let config_path = match resolve_config_path(&args.config) {
        Ok(path) => path,
        Err(err) => {
            error!("{}", err);
            return ExitCode::FAILURE;
        }
    };
    let config = match parse_config_from_file(&config_path) {
        Ok(config) => config,
        Err(err) => {
            error!("{}", err);
            return ExitCode::FAILURE;
        }
    };

    let mut ran = 0;
    let mut failed = 0;
    for config_simulation in &config.simulations {
        if let Some(only) = &args.only {
            if only != &config_simulation.name {
                continue;
            }
        }
        ran += 1;

        info!("Running {}", config_simulation.name);
        match simulation::run_configured_simulation(&config_path, config_simulation, args.seed) {
            Ok(rounds) => info!("Finished {} after {} rounds", config_simulation.name, rounds),
            Err(err) => {
                error!("{} failed: {}", config_simulation.name, err);
                failed += 1;
            }
        }
    }

    if ran == 0 {
        error!("No simulation to run in {}", config_path.display());
        return ExitCode::FAILURE;
    }
    if failed > 0 {
        error!("{} of {} simulations failed", failed, ran);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
