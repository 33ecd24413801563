//! Environment-driven runtime configuration.
//!
//! # Responsibility
//! - Resolve file locations and logging options from the environment.
//!
//! # Invariants
//! - `PROJECTS_PATH` is required; everything else has a default.
//! - Resolution never touches the file system.

use crate::logging::{default_log_level, normalize_level};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const PROJECTS_PATH_VAR: &str = "PROJECTS_PATH";
pub const DATA_DIR_VAR: &str = "PLAINTASK_DATA_DIR";
pub const LOG_LEVEL_VAR: &str = "PLAINTASK_LOG_LEVEL";
pub const LOG_DIR_VAR: &str = "PLAINTASK_LOG_DIR";
pub const DEFAULT_DATA_DIR: &str = "./data";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    MissingVar(&'static str),
    EmptyVar(&'static str),
    InvalidLogLevel(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingVar(name) => write!(f, "environment variable {name} is not set"),
            Self::EmptyVar(name) => write!(f, "environment variable {name} is empty"),
            Self::InvalidLogLevel(message) => write!(f, "{message}"),
        }
    }
}

impl Error for ConfigError {}

/// Resolved runtime settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    /// Flat projects file.
    pub projects_path: PathBuf,
    /// Directory holding the structured JSON containers.
    pub data_dir: PathBuf,
    pub log_level: &'static str,
    /// File logging directory; `None` means log to stderr.
    pub log_dir: Option<PathBuf>,
}

impl CoreConfig {
    /// Builds a config with defaults for everything but the projects file.
    pub fn new(projects_path: impl Into<PathBuf>) -> Self {
        Self {
            projects_path: projects_path.into(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            log_level: default_log_level(),
            log_dir: None,
        }
    }

    /// Reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolves settings through `lookup`, which maps a variable name to its
    /// value.
    ///
    /// # Errors
    /// - `MissingVar` / `EmptyVar` for `PROJECTS_PATH`.
    /// - `InvalidLogLevel` for an unsupported level name.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let projects_path = match lookup(PROJECTS_PATH_VAR) {
            None => return Err(ConfigError::MissingVar(PROJECTS_PATH_VAR)),
            Some(value) if value.trim().is_empty() => {
                return Err(ConfigError::EmptyVar(PROJECTS_PATH_VAR))
            }
            Some(value) => PathBuf::from(value.trim()),
        };

        let mut config = Self::new(projects_path);
        if let Some(dir) = non_blank(lookup(DATA_DIR_VAR)) {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(level) = non_blank(lookup(LOG_LEVEL_VAR)) {
            config.log_level = normalize_level(&level).map_err(ConfigError::InvalidLogLevel)?;
        }
        config.log_dir = non_blank(lookup(LOG_DIR_VAR)).map(PathBuf::from);
        Ok(config)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
