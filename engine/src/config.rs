//! Configuration for the control plane.

use std::env;
use std::time::Duration;

/// Default delay before a connectivity start/stop event fires.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(2000);

/// Control plane configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Delay between a discovery/sync transition and its event
    pub debounce: Duration,
    /// Name given to the local project at startup
    pub local_project_name: String,
    /// Data type name of the observation record store
    pub observation_type: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            local_project_name: "outpost".to_string(),
            observation_type: "observation".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let debounce = match env::var("OUTPOST_DEBOUNCE_MS") {
            Ok(raw) => raw
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| ConfigError::InvalidDebounce(raw))?,
            Err(_) => defaults.debounce,
        };

        let local_project_name =
            env::var("OUTPOST_PROJECT_NAME").unwrap_or(defaults.local_project_name);
        if local_project_name.trim().is_empty() {
            return Err(ConfigError::EmptyProjectName);
        }

        let observation_type =
            env::var("OUTPOST_OBSERVATION_TYPE").unwrap_or(defaults.observation_type);

        Ok(Self {
            debounce,
            local_project_name,
            observation_type,
        })
    }

    /// Override the debounce delay.
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Override the local project name.
    pub fn with_project_name(mut self, name: impl Into<String>) -> Self {
        self.local_project_name = name.into();
        self
    }
}

/// Configuration errors.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid OUTPOST_DEBOUNCE_MS value: {0}")]
    InvalidDebounce(String),

    #[error("OUTPOST_PROJECT_NAME must not be empty")]
    EmptyProjectName,
}
