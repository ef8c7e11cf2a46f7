// Configuration structs

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::constants::{
    CONFIG_DIR_NAME, DEFAULT_MODULES_DIR, DEFAULT_PROMPT_NAME, DEFAULT_PUBLISH_TIMEOUT_MS,
    DEFAULT_QUEUE_CAPACITY, HISTORY_FILE_NAME,
};

/// Sizing of the message bus and render queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusConfig {
    /// Capacity of each bounded queue
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// How long a publish may wait on a full queue (milliseconds)
    #[serde(default = "default_publish_timeout_ms")]
    pub publish_timeout_ms: u64,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_QUEUE_CAPACITY,
            publish_timeout_ms: DEFAULT_PUBLISH_TIMEOUT_MS,
        }
    }
}

fn default_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

fn default_publish_timeout_ms() -> u64 {
    DEFAULT_PUBLISH_TIMEOUT_MS
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Line history file (the only file the console writes)
    #[serde(default = "default_history_file")]
    pub history_file: PathBuf,

    /// Directory holding `<name>.json` module definitions
    #[serde(default = "default_modules_dir")]
    pub modules_dir: PathBuf,

    /// JSON array of agents to check in at startup
    #[serde(default)]
    pub agents_file: Option<PathBuf>,

    /// Render Debug-level messages
    #[serde(default)]
    pub debug: bool,

    /// Verbose output
    #[serde(default)]
    pub verbose: bool,

    /// Name shown at the start of every prompt
    #[serde(default = "default_prompt_name")]
    pub prompt_name: String,

    /// Queue sizing
    #[serde(default)]
    pub bus: BusConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            history_file: default_history_file(),
            modules_dir: default_modules_dir(),
            agents_file: None,
            debug: false,
            verbose: false,
            prompt_name: default_prompt_name(),
            bus: BusConfig::default(),
        }
    }
}

fn default_history_file() -> PathBuf {
    match dirs::home_dir() {
        Some(home) => home.join(CONFIG_DIR_NAME).join(HISTORY_FILE_NAME),
        None => std::env::temp_dir().join("cairn_history"),
    }
}

fn default_modules_dir() -> PathBuf {
    PathBuf::from(DEFAULT_MODULES_DIR)
}

fn default_prompt_name() -> String {
    DEFAULT_PROMPT_NAME.to_string()
}

impl Config {
    /// Validate configuration and return helpful errors
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.bus.capacity == 0 {
            anyhow::bail!("bus.capacity must be greater than 0");
        }

        if self.bus.publish_timeout_ms == 0 {
            anyhow::bail!("bus.publish_timeout_ms must be greater than 0");
        }

        if self.bus.publish_timeout_ms > 10_000 {
            anyhow::bail!(
                "bus.publish_timeout_ms ({}) is too high; a publish must never stall the console",
                self.bus.publish_timeout_ms
            );
        }

        if self.prompt_name.trim().is_empty() {
            anyhow::bail!("prompt_name must not be empty");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert!(!config.debug);
        assert_eq!(config.bus.capacity, DEFAULT_QUEUE_CAPACITY);
        assert!(config.history_file.ends_with(HISTORY_FILE_NAME));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let mut config = Config::default();
        config.bus.capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str("debug = true\n[bus]\ncapacity = 8\n").unwrap();
        assert!(config.debug);
        assert_eq!(config.bus.capacity, 8);
        assert_eq!(config.bus.publish_timeout_ms, DEFAULT_PUBLISH_TIMEOUT_MS);
        assert_eq!(config.prompt_name, DEFAULT_PROMPT_NAME);
    }
}
