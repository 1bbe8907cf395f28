//! Walk script loading.
//!
//! Scripts are read from YAML. The parallelism and heartbeat interval can be
//! overridden from the environment, optionally populated from a `.env` file
//! next to the script.

use crate::error::{ConfigError, ProgressError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::spec::WalkScript;

/// Overrides `parallelism`.
pub const ENV_PARALLELISM: &str = "TOFU_PROGRESS_PARALLELISM";

/// Overrides `heartbeat_interval_secs`.
pub const ENV_HEARTBEAT_SECS: &str = "TOFU_PROGRESS_HEARTBEAT_SECS";

/// Loader for walk scripts.
#[derive(Debug, Default)]
pub struct ScriptParser {
    /// Directory searched for `.env`.
    base_path: Option<PathBuf>,
}

impl ScriptParser {
    /// Creates a new parser.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the directory searched for `.env`.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads a walk script from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<WalkScript> {
        let path = path.as_ref();
        info!("Loading walk script from: {}", path.display());

        if !path.exists() {
            return Err(ProgressError::Config(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            ProgressError::Config(ConfigError::ParseError {
                message: format!("Failed to read file: {e}"),
                location: Some(path.display().to_string()),
            })
        })?;

        self.parse_yaml(&content, Some(path))
    }

    /// Parses a walk script from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn parse_yaml(&self, content: &str, source: Option<&Path>) -> Result<WalkScript> {
        debug!("Parsing walk script");

        let script: WalkScript = serde_yaml::from_str(content).map_err(|e| {
            let location = source.map(|p| p.display().to_string());
            ProgressError::Config(ConfigError::ParseError {
                message: format!("YAML parse error: {e}"),
                location,
            })
        })?;

        debug!(
            "Parsed walk script {} with {} resources",
            script.name,
            script.resources.len()
        );
        Ok(script)
    }

    /// Loads `.env`, then the script, then applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if a file cannot be loaded or an override is not a
    /// number.
    pub fn load_with_env(&self, path: impl AsRef<Path>) -> Result<WalkScript> {
        self.load_dotenv()?;
        let mut script = self.load_file(path)?;
        Self::apply_env_overrides(&mut script, |name| std::env::var(name).ok())?;
        Ok(script)
    }

    /// Applies overrides read through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns an error if an override is set but is not a number.
    pub fn apply_env_overrides(
        script: &mut WalkScript,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<()> {
        if let Some(value) = lookup(ENV_PARALLELISM) {
            debug!("Overriding parallelism from environment");
            script.parallelism = parse_number(ENV_PARALLELISM, &value)?;
        }

        if let Some(value) = lookup(ENV_HEARTBEAT_SECS) {
            debug!("Overriding heartbeat_interval_secs from environment");
            script.heartbeat_interval_secs = parse_number(ENV_HEARTBEAT_SECS, &value)?;
        }

        Ok(())
    }

    /// Loads the .env file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| {
                ProgressError::Config(ConfigError::ParseError {
                    message: format!("Failed to load .env file: {e}"),
                    location: Some(env_path.display().to_string()),
                })
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        ProgressError::Config(ConfigError::validation(
            format!("{name} must be a non-negative integer, got {value:?}"),
            name,
        ))
    })
}

/// Default walk script file names to search for.
pub const DEFAULT_SCRIPT_FILES: &[&str] = &["walk.yaml", "walk.yml", "tofu-walk.yaml"];

/// Finds the walk script in the given directory or its parents.
///
/// # Errors
///
/// Returns an error if no script is found.
pub fn find_script_file(start_dir: impl AsRef<Path>) -> Result<PathBuf> {
    let start = start_dir.as_ref();
    let mut current = start.to_path_buf();

    loop {
        for filename in DEFAULT_SCRIPT_FILES {
            let script_path = current.join(filename);
            if script_path.exists() {
                info!("Found walk script: {}", script_path.display());
                return Ok(script_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    Err(ProgressError::Config(ConfigError::FileNotFound {
        path: start.join(DEFAULT_SCRIPT_FILES[0]),
    }))
}
