mod blackjack;
mod config;
mod error;
mod solver;

use clap::Parser;
use simplelog::{ColorChoice, ConfigBuilder, LevelFilter, TermLogger, TerminalMode};

use config::*;
use error::Result;

/// Trains a blackjack policy with first-visit Monte Carlo control.
#[derive(Parser, Debug)]
#[command(name = "blackjack_mc")]
struct Cli {
    /// Number of training episodes.
    #[arg(long, default_value_t = DEFAULT_EPISODES)]
    episodes: u64,

    /// Discount factor, in (0, 1].
    #[arg(long, default_value_t = DEFAULT_GAMMA)]
    gamma: f64,

    /// Exploration rate at the first episode.
    #[arg(long, default_value_t = DEFAULT_INITIAL_EPSILON)]
    initial_epsilon: f64,

    /// Multiplicative epsilon decay applied after every episode.
    #[arg(long, default_value_t = DEFAULT_DECAY_RATE)]
    decay_rate: f64,

    /// Lower bound for epsilon.
    #[arg(long, default_value_t = DEFAULT_MIN_EPSILON)]
    min_epsilon: f64,

    /// Number of greedy episodes used to score the learned policy.
    #[arg(long, default_value_t = DEFAULT_EVAL_EPISODES)]
    eval_episodes: u64,

    /// Seed for the random source; drawn from the OS when omitted.
    #[arg(long)]
    seed: Option<u64>,

    /// Log per-window training rewards.
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn training_config(&self) -> TrainingConfig {
        TrainingConfig {
            num_episodes: self.episodes,
            gamma: self.gamma,
            initial_epsilon: self.initial_epsilon,
            decay_rate: self.decay_rate,
            min_epsilon: self.min_epsilon,
        }
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let config = ConfigBuilder::new()
        .set_location_level(LevelFilter::Off)
        .set_target_level(LevelFilter::Off)
        .set_thread_level(LevelFilter::Off)
        .build();
    if let Err(err) = TermLogger::init(level, config, TerminalMode::Mixed, ColorChoice::Auto) {
        eprintln!("Failed to initialize logger: {}", err);
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    blackjack::run(&cli.training_config(), cli.eval_episodes, cli.seed)
}
