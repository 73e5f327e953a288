//! Simulation configuration.
//!
//! Settings loaded from an INI file. Every value has a safe default, so a
//! missing file or a missing key never prevents a run.
//!
//! # Configuration File Format
//!
//! ```ini
//! [simulation]
//! seconds_per_turn = 0.5
//! speed = 1.0
//! auto_yield_instructions = 10000
//! max_turns = 500
//! ```

use configparser::ini::Ini;
use log::info;
use std::path::PathBuf;

/// Default safe values for startup
const DEFAULT_SECONDS_PER_TURN: f32 = 0.5;
const DEFAULT_SPEED: f32 = 1.0;
const DEFAULT_AUTO_YIELD_INSTRUCTIONS: u32 = 10_000;
const DEFAULT_MAX_TURNS: u32 = 500;
const DEFAULT_CONFIG_PATH: &str = "./gridbots.ini";

#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Wall-clock duration of one turn at speed 1.0.
    pub seconds_per_turn: f32,
    /// Playback speed multiplier applied by the turn clock.
    pub speed: f32,
    /// VM instructions a script may run in one resume before it is forced to
    /// yield without acting.
    pub auto_yield_instructions: u32,
    /// Turn limit for headless runs.
    pub max_turns: u32,
    /// Path to the configuration file.
    pub config_path: PathBuf,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl SimConfig {
    pub fn new() -> Self {
        Self {
            seconds_per_turn: DEFAULT_SECONDS_PER_TURN,
            speed: DEFAULT_SPEED,
            auto_yield_instructions: DEFAULT_AUTO_YIELD_INSTRUCTIONS,
            max_turns: DEFAULT_MAX_TURNS,
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
        }
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
            ..Self::new()
        }
    }

    /// Load configuration from the INI file.
    ///
    /// Missing values retain their current (default) values. Out-of-range
    /// values are ignored.
    pub fn load_from_file(&mut self) -> Result<(), String> {
        let mut config = Ini::new();
        config
            .load(&self.config_path)
            .map_err(|e| format!("Failed to load config file: {}", e))?;

        if let Some(seconds) = config
            .getfloat("simulation", "seconds_per_turn")
            .ok()
            .flatten()
            .filter(|s| *s > 0.0)
        {
            self.seconds_per_turn = seconds as f32;
        }
        if let Some(speed) = config
            .getfloat("simulation", "speed")
            .ok()
            .flatten()
            .filter(|s| *s > 0.0)
        {
            self.speed = speed as f32;
        }
        if let Some(budget) = config
            .getuint("simulation", "auto_yield_instructions")
            .ok()
            .flatten()
            .filter(|b| *b > 0)
        {
            self.auto_yield_instructions = budget.min(u32::MAX as u64) as u32;
        }
        if let Some(turns) = config.getuint("simulation", "max_turns").ok().flatten() {
            self.max_turns = turns.min(u32::MAX as u64) as u32;
        }

        info!(
            "Loaded config: {}s/turn, speed={}, auto_yield={}, max_turns={}",
            self.seconds_per_turn, self.speed, self.auto_yield_instructions, self.max_turns
        );

        Ok(())
    }

    /// Save configuration to the INI file.
    pub fn save_to_file(&self) -> Result<(), String> {
        let mut config = Ini::new();

        config.set(
            "simulation",
            "seconds_per_turn",
            Some(self.seconds_per_turn.to_string()),
        );
        config.set("simulation", "speed", Some(self.speed.to_string()));
        config.set(
            "simulation",
            "auto_yield_instructions",
            Some(self.auto_yield_instructions.to_string()),
        );
        config.set("simulation", "max_turns", Some(self.max_turns.to_string()));

        config
            .write(&self.config_path)
            .map_err(|e| format!("Failed to save config file: {}", e))?;

        info!("Saved config to {:?}", self.config_path);

        Ok(())
    }
}
