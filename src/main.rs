//! Gridbots headless runner.
//!
//! Loads a scenario, runs it until victory, a fatal error, the turn limit or
//! until no actor can act, and prints every turn's events.
//!
//! # Running
//!
//! ```sh
//! cargo run --release -- levels/first.json --max-turns 200
//! RUST_LOG=script=debug cargo run -- levels/first.json
//! ```

use clap::Parser;
use gridbots::resources::runstate::RunState;
use gridbots::resources::simconfig::SimConfig;
use gridbots::{Scenario, SimError, Simulation};
use log::{info, warn};
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Gridbots: scripted robots on a grid.
#[derive(Parser)]
#[command(version, about = "Runs a gridbots scenario headless and reports the outcome.")]
struct Cli {
    /// Scenario file (JSON).
    scenario: PathBuf,

    /// Configuration file (default: ./gridbots.ini).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Stop after this many turns (overrides the configuration).
    #[arg(long, value_name = "N")]
    max_turns: Option<u32>,

    /// Pace turns in wall-clock time instead of running them back to back.
    #[arg(long)]
    realtime: bool,
}

fn run(cli: &Cli) -> Result<RunState, SimError> {
    let mut config = match &cli.config {
        Some(path) => SimConfig::with_path(path),
        None => SimConfig::new(),
    };
    if let Err(e) = config.load_from_file() {
        warn!("{}; using defaults", e);
    }
    if let Some(max_turns) = cli.max_turns {
        config.max_turns = max_turns;
    }

    let scenario = Scenario::from_path(&cli.scenario)?;
    let mut sim = Simulation::new(&scenario, &config)?;
    sim.start()?;

    let mut last = Instant::now();
    while sim.state().is_running() && sim.turn() < u64::from(config.max_turns) {
        if !sim.can_progress() {
            info!("no actor or spawner can act any more");
            break;
        }
        let reports = if cli.realtime {
            std::thread::sleep(Duration::from_millis(16));
            let now = Instant::now();
            let delta = now.duration_since(last).as_secs_f32();
            last = now;
            sim.update(delta)?
        } else {
            vec![sim.advance_turn()?]
        };
        for report in reports {
            for event in &report.events {
                println!("[turn {:>4}] {}", report.turn, event);
            }
        }
    }

    let fulfilled = sim.goals().iter().filter(|g| g.fulfilled).count();
    println!("{}/{} goals fulfilled after {} turns", fulfilled, sim.goals().len(), sim.turn());
    Ok(sim.state().clone())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(RunState::Victory) => println!("Victory!"),
        Ok(state) => {
            println!("Finished without victory ({})", state);
            std::process::exit(2);
        }
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
