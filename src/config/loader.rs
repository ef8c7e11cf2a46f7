// Configuration loader
// Loads settings from ~/.cairn/config.toml (or an explicit path)

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::constants::{CONFIG_DIR_NAME, CONFIG_FILE_NAME};
use super::settings::Config;

/// Load configuration from `path`, or from the default location when
/// `path` is `None`. A missing default file yields the defaults; a
/// missing explicit file is an error.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => read_config_file(path)?,
        None => match default_config_path() {
            Some(path) if path.exists() => read_config_file(&path)?,
            _ => {
                tracing::debug!("No config file found, using defaults");
                Config::default()
            }
        },
    };

    config
        .validate()
        .context("Configuration validation failed")?;

    Ok(config)
}

/// `~/.cairn/config.toml`, if a home directory is known
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

fn read_config_file(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;

    let config: Config = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;

    tracing::info!("Loaded configuration from {:?}", path);
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "prompt_name = \"ops\"\nverbose = true").unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.prompt_name, "ops");
        assert!(config.verbose);
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_config(Some(&dir.path().join("absent.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[bus]\npublish_timeout_ms = 0").unwrap();

        let err = load_config(Some(file.path())).unwrap_err();
        assert!(format!("{:#}", err).contains("publish_timeout_ms"));
    }
}
