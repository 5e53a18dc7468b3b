//! Gochi CLI - look after a virtual pet from the terminal.

mod session;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use gochi_core::{Action, Config, DecayPolicy, PetEngine, PetStats};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Gochi - a virtual pet whose stats decay while you work.
///
/// Hunger, energy and affection drop a little every minute, even while
/// the program is closed. Feed the pet, give it treats and let it sleep to
/// keep it happy.
#[derive(Parser, Debug)]
#[command(name = "gochi")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the pet state file.
    #[arg(
        short = 's',
        long = "state",
        default_value = "pet_state.json",
        env = "GOCHI_STATE_FILE",
        global = true
    )]
    pub state: PathBuf,

    /// Seconds between background decay ticks in `run` mode.
    #[arg(
        short = 't',
        long = "tick-secs",
        default_value = "30",
        env = "GOCHI_TICK_SECS",
        global = true
    )]
    pub tick_secs: u64,

    /// How partial decay is handled between reads.
    ///
    /// `carry-fraction` keeps sub-point decay in memory so frequent reads
    /// still decay the pet; `advance-always` discards it.
    #[arg(long = "decay-policy", default_value = "carry-fraction", global = true)]
    pub decay_policy: DecayPolicy,

    /// Print results as JSON.
    #[arg(long = "json", global = true)]
    pub json: bool,

    /// Enable debug logging.
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    /// What to do. Defaults to `status`.
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Subcommands.
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Show the pet's current stats and mood.
    Status,
    /// Feed the pet.
    Feed,
    /// Give the pet a treat.
    Treat,
    /// Put the pet to sleep.
    Sleep,
    /// Print only the pet's mood.
    Mood,
    /// Keep the pet running with a background ticker and an interactive prompt.
    Run,
}

impl Cli {
    /// Convert CLI arguments to a Config.
    pub fn to_config(&self) -> Config {
        Config::new()
            .state_path(&self.state)
            .tick_secs(self.tick_secs)
            .decay_policy(self.decay_policy)
    }
}

/// Render a snapshot for the terminal.
pub fn render(stats: &PetStats, json: bool) -> String {
    if json {
        serde_json::json!({
            "hunger": stats.hunger,
            "energy": stats.energy,
            "affection": stats.affection,
            "lastUpdated": stats.last_updated,
            "mood": stats.mood(),
        })
        .to_string()
    } else {
        format!(
            "hunger {:>3}  energy {:>3}  affection {:>3}  mood {}",
            stats.hunger,
            stats.energy,
            stats.affection,
            stats.mood()
        )
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = cli.to_config();
    let command = cli.command.unwrap_or(Command::Status);

    if command == Command::Run {
        let (tx, rx) = gochi_core::event::channel_with_size(config.event_buffer);
        let engine = PetEngine::open(&config)
            .context("failed to start pet engine")?
            .with_events(tx.clone());
        let shutdown = CancellationToken::new();
        let interrupt = tokio::spawn(session::cancel_on_ctrl_c(shutdown.clone()));
        let lines = session::stdin_lines()?;
        let result =
            session::run(Arc::new(engine), &config, lines, shutdown, (tx, rx), cli.json).await;
        interrupt.abort();
        return result;
    }

    let engine = PetEngine::open(&config).context("failed to start pet engine")?;
    let stats = match command {
        Command::Feed => engine.apply(Action::Feed),
        Command::Treat => engine.apply(Action::Treat),
        Command::Sleep => engine.apply(Action::Sleep),
        Command::Mood => {
            println!("{}", engine.mood());
            return Ok(());
        }
        Command::Status | Command::Run => engine.get_state(),
    };
    println!("{}", render(&stats, cli.json));
    Ok(())
}
