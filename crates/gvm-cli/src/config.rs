//! Runtime tuning knobs for `gvm-cli`, loaded from an optional TOML file.
//!
//! Grounded on `faxt::config::Config`'s `#[serde(default = "...")]` shape,
//! minus the `dirs`-based home/system search: `gvm-cli` only ever looks
//! at a path the caller names, via `--config` or the default file name in
//! the current directory.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{CliError, Result};

pub const CONFIG_FILE_NAME: &str = "gvm.toml";

/// Application configuration for the `gvm-cli` binary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Upper bound on ticks a `run` invocation executes, absent an
    /// explicit `--steps` override.
    #[serde(default = "default_max_ticks_per_run")]
    pub max_ticks_per_run: usize,

    /// Hint for the initial `Slab` capacity a fresh `Graph` is built
    /// with. Spec.md §5 leaves slab growth policy host-driven; this
    /// field exists for that policy's sake even though today's `Slab`
    /// always grows one element at a time and ignores it.
    #[serde(default = "default_slab_block_size")]
    pub slab_block_size: usize,

    /// Call `Graph::clean()` every N ticks during a `run`. `None` means
    /// never collect automatically.
    #[serde(default)]
    pub gc_every_n_ticks: Option<usize>,
}

fn default_max_ticks_per_run() -> usize {
    100_000
}

fn default_slab_block_size() -> usize {
    64
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_ticks_per_run: default_max_ticks_per_run(),
            slab_block_size: default_slab_block_size(),
            gc_every_n_ticks: None,
        }
    }
}

impl Config {
    /// Load from `path`, or fall back to defaults if `path` is `None`
    /// and no `gvm.toml` exists in the current directory.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => {
                let default_path = Path::new(CONFIG_FILE_NAME);
                if default_path.exists() {
                    Self::load_from_path(default_path)
                } else {
                    Ok(Config::default())
                }
            }
        }
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CliError::Config(format!("configuration file not found: {}", path.display())));
        }
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}
