use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::warn;

pub const DEFAULT_CONFIG_PATH: &str = "config/hopperline.toml";

/// What the transfer hopper feeds in the demo layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    /// A chest beside the hopper.
    #[default]
    Chest,
    /// A furnace below the hopper, with a fuel hopper at its side and a
    /// collector hopper and chest underneath.
    Furnace,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SimConfig {
    /// Ticks to simulate.
    pub ticks: u64,
    /// Items placed in the source chest above the hopper.
    pub source_items: u32,
    /// Coal loaded into the fuel hopper (furnace layout only).
    pub fuel_items: u32,
    pub destination: Destination,
    /// Directory for the block-entity save; nothing is saved when unset.
    pub save_dir: Option<PathBuf>,
    pub save_name: String,
    /// JSONL event log of every tick with a transfer.
    pub events_path: Option<PathBuf>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            ticks: 200,
            source_items: 16,
            fuel_items: 2,
            destination: Destination::Chest,
            save_dir: None,
            save_name: "layout".to_string(),
            events_path: None,
        }
    }
}

impl SimConfig {
    /// Load configuration from the default path.
    pub fn load() -> Self {
        Self::load_from_path(Path::new(DEFAULT_CONFIG_PATH))
    }

    /// Load configuration from an explicit path, falling back to defaults on errors.
    pub fn load_from_path(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<SimConfig>(&contents) {
                Ok(cfg) => cfg,
                Err(err) => {
                    warn!("Failed to parse {}: {err}. Using defaults", path.display());
                    SimConfig::default()
                }
            },
            Err(err) => {
                if path != Path::new(DEFAULT_CONFIG_PATH)
                    || err.kind() != std::io::ErrorKind::NotFound
                {
                    warn!("Failed to read {}: {err}. Using defaults", path.display());
                }
                SimConfig::default()
            }
        }
    }

    /// Save configuration to an explicit path.
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        let toml = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)?;
        Ok(())
    }
}
