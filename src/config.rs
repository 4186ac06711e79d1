//! Engine configuration, read from lineup.toml when present
//!
//! Difficulty-to-depth mapping and evaluation weights are plain values passed
//! into each search; nothing here is global.

use std::fs;
use std::path::Path;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default location of the configuration file
pub const CONFIG_PATH: &str = "lineup.toml";

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    pub search: SearchConfig,
    pub weights: EvalWeights,
}

/// Difficulty tiers offered to players
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn name(self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }
}

/// Search parameters
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SearchConfig {
    pub easy_depth: u32,
    pub medium_depth: u32,
    pub hard_depth: u32,
    /// Free-placement games only search empty cells this close to a piece
    pub candidate_radius: u16,
    /// Moves tried at each node below the root, best-ordered first
    pub max_candidates: usize,
    /// Search first-ply candidates on separate threads
    pub parallel: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            easy_depth: 2,
            medium_depth: 4,
            hard_depth: 6,
            candidate_radius: 2,
            max_candidates: 12,
            parallel: true,
        }
    }
}

impl SearchConfig {
    pub fn depth_for(&self, difficulty: Difficulty) -> u32 {
        match difficulty {
            Difficulty::Easy => self.easy_depth,
            Difficulty::Medium => self.medium_depth,
            Difficulty::Hard => self.hard_depth,
        }
    }
}

/// Evaluation weights, from the terminal tier down to tempo
///
/// Only the ordering between tiers is fixed: each tier's unit must be at
/// least ten times the next one's.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct EvalWeights {
    /// Won or lost position
    pub win: i32,
    /// A threat the opponent cannot answer with one move
    pub unanswerable: i32,
    /// Per distinct cell that wins immediately
    pub immediate_threat: i32,
    /// Per closed four (five-in-a-row games)
    pub closed_four: i32,
    /// Per open three
    pub open_three: i32,
    /// Per unit of centre proximity of an open three
    pub center: i32,
    /// Per winnable line through a placed piece
    pub connectivity: i32,
}

impl Default for EvalWeights {
    fn default() -> Self {
        Self {
            win: 100_000_000,
            unanswerable: 1_000_000,
            immediate_threat: 100_000,
            closed_four: 10_000,
            open_three: 1_000,
            center: 10,
            connectivity: 10,
        }
    }
}

impl EvalWeights {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.win <= 0 {
            return Err(ConfigError::Validation(format!(
                "win ({}) must be positive",
                self.win
            )));
        }
        let tiers = [
            ("win", self.win),
            ("unanswerable", self.unanswerable),
            ("immediate_threat", self.immediate_threat),
            ("closed_four", self.closed_four.max(self.open_three)),
            ("connectivity", self.connectivity),
        ];
        for pair in tiers.windows(2) {
            let ((high_name, high), (low_name, low)) = (pair[0], pair[1]);
            if low <= 0 || high < low.saturating_mul(10) {
                return Err(ConfigError::Validation(format!(
                    "{} ({}) must be at least 10x {} ({})",
                    high_name, high, low_name, low
                )));
            }
        }
        if self.open_three <= 0 || self.open_three < self.connectivity.saturating_mul(10) {
            return Err(ConfigError::Validation(format!(
                "open_three ({}) must be at least 10x connectivity ({})",
                self.open_three, self.connectivity
            )));
        }
        if self.center < 0 {
            return Err(ConfigError::Validation("center must not be negative".to_string()));
        }
        Ok(())
    }
}

impl EngineConfig {
    /// Loads configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&contents)?;
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for difficulty in Difficulty::ALL.iter() {
            if self.search.depth_for(*difficulty) == 0 {
                return Err(ConfigError::Validation(format!(
                    "{} depth must be >= 1",
                    difficulty.name().to_lowercase()
                )));
            }
        }
        if self.search.candidate_radius == 0 {
            return Err(ConfigError::Validation(
                "candidate_radius must be >= 1".to_string(),
            ));
        }
        if self.search.max_candidates == 0 {
            return Err(ConfigError::Validation(
                "max_candidates must be >= 1".to_string(),
            ));
        }
        self.weights.validate()
    }

    /// Loads `lineup.toml`, falling back to defaults when it is missing or invalid
    pub fn load_or_default() -> Self {
        Self::from_file(CONFIG_PATH).unwrap_or_else(|e| {
            warn!("Could not load {} ({}), using defaults", CONFIG_PATH, e);
            Self::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.search.depth_for(Difficulty::Medium), 4);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml(
            r#"
            [search]
            hard_depth = 8
            parallel = false
            "#,
        )
        .unwrap();
        assert_eq!(config.search.hard_depth, 8);
        assert!(!config.search.parallel);
        assert_eq!(config.search.easy_depth, 2);
        assert_eq!(config.weights, EvalWeights::default());
    }

    #[test]
    fn test_zero_depth_rejected() {
        let result = EngineConfig::from_toml("[search]\neasy_depth = 0\n");
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_weight_ordering_enforced() {
        let result = EngineConfig::from_toml("[weights]\nimmediate_threat = 900000\n");
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_zero_radius_and_branching_rejected() {
        let radius = EngineConfig::from_toml("[search]\ncandidate_radius = 0\nparallel = false\n");
        assert!(matches!(radius, Err(ConfigError::Validation(_))));
        let branching = EngineConfig::from_toml("[search]\nmax_candidates = 0\n");
        assert!(matches!(branching, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_non_positive_weights_rejected() {
        let zero = EvalWeights {
            win: 0,
            unanswerable: 0,
            immediate_threat: 0,
            closed_four: 0,
            open_three: 0,
            center: 0,
            connectivity: 0,
        };
        assert!(matches!(zero.validate(), Err(ConfigError::Validation(_))));

        let no_tempo = EvalWeights {
            connectivity: 0,
            ..EvalWeights::default()
        };
        assert!(no_tempo.validate().is_err());
        assert!(EngineConfig::from_toml("[weights]\nwin = -5\n").is_err());
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        assert!(matches!(
            EngineConfig::from_toml("search = ["),
            Err(ConfigError::TomlParse(_))
        ));
        assert!(EngineConfig::from_file("nonexistent.toml").is_err());
    }
}
