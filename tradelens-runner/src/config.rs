//! Analysis configuration — TOML file with portfolio search and Monte Carlo sections.
//!
//! ```toml
//! [portfolio]
//! min_strategies = 2
//! max_strategies = 4
//! ranking_function = "sharpe_ratio"
//! search_method = "genetic"
//! population_size = 60
//! generations = 40
//! max_stored_portfolios = 25
//! total_capital = 100000.0
//! seed = 42
//!
//! [monte_carlo]
//! iterations = 2000
//! confidence_level = 95.0
//! method = "shuffle"
//! ```
//!
//! Every field has a default, so an empty file is a valid configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::monte_carlo::MonteCarloConfig;
use crate::search::SearchConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid config: {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub portfolio: SearchConfig,
    pub monte_carlo: MonteCarloConfig,
}

impl AnalysisConfig {
    /// Load and validate a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reject values no search or simulation can run with.
    ///
    /// Bounds that merely leave no viable portfolio (for example
    /// `min_strategies > max_strategies`) are accepted: the search returns an
    /// empty result for them.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.portfolio;
        if !p.total_capital.is_finite() || p.total_capital < 0.0 {
            return Err(ConfigError::invalid(
                "portfolio.total_capital",
                format!("must be a non-negative number, got {}", p.total_capital),
            ));
        }
        if p.max_stored_portfolios == 0 {
            return Err(ConfigError::invalid(
                "portfolio.max_stored_portfolios",
                "must be at least 1",
            ));
        }
        if p.elite_count > p.population_size {
            return Err(ConfigError::invalid(
                "portfolio.elite_count",
                format!(
                    "{} exceeds population_size {}",
                    p.elite_count, p.population_size
                ),
            ));
        }

        let mc = &self.monte_carlo;
        if !(50.0..=100.0).contains(&mc.confidence_level) {
            return Err(ConfigError::invalid(
                "monte_carlo.confidence_level",
                format!("must be within [50, 100], got {}", mc.confidence_level),
            ));
        }
        if !mc.initial_capital.is_finite() || mc.initial_capital < 0.0 {
            return Err(ConfigError::invalid(
                "monte_carlo.initial_capital",
                format!("must be a non-negative number, got {}", mc.initial_capital),
            ));
        }
        Ok(())
    }
}
