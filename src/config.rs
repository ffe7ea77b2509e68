//! Engine configuration, usually read from YAML
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crosscat_cc::config::{InitMode, StateUpdateConfig};
use crosscat_cc::error::UpdateConfigError;
use crosscat_consts::{DEFAULT_N_GRID, DEFAULT_N_STATES};
use serde::{Deserialize, Serialize};
use thiserror::Error;

fn default_n_states() -> usize {
    DEFAULT_N_STATES
}

fn default_n_grid() -> usize {
    DEFAULT_N_GRID
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid update config: {0}")]
    Update(#[from] UpdateConfigError),
}

/// Configuration for building and running an `Engine`
///
/// # Example
///
/// ```rust
/// # use crosscat::EngineConfig;
/// use crosscat::cc::config::InitMode;
///
/// let config = EngineConfig::from_yaml_str(
///     "n_states: 4\nseed: 1337\ncolumn_init: apart\n",
/// )
/// .unwrap();
///
/// assert_eq!(config.n_states, 4);
/// assert_eq!(config.seed, Some(1337));
/// assert_eq!(config.column_init, InitMode::Apart);
/// assert_eq!(config.row_init, InitMode::Random);
/// ```
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// The number of independent states
    #[serde(default = "default_n_states")]
    pub n_states: usize,
    /// Seed for the master RNG. Seeded from entropy if absent.
    #[serde(default)]
    pub seed: Option<u64>,
    /// The number of points in every hyperparameter and CRP alpha grid
    #[serde(default = "default_n_grid")]
    pub n_grid: usize,
    /// How each state draws its column partition
    #[serde(default)]
    pub column_init: InitMode,
    /// How each view draws its row partition
    #[serde(default)]
    pub row_init: InitMode,
    /// What `Engine::update` runs
    #[serde(default)]
    pub update: StateUpdateConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            n_states: DEFAULT_N_STATES,
            seed: None,
            n_grid: DEFAULT_N_GRID,
            column_init: InitMode::default(),
            row_init: InitMode::default(),
            update: StateUpdateConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let config: Self = serde_yaml::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the settings that deserialization alone cannot
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.update.validate().map_err(ConfigError::from)
    }

    pub fn to_yaml_string(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self).map_err(ConfigError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crosscat_cc::alg::ColAssignAlg;
    use crosscat_cc::transition::StateTransition;
    use indoc::indoc;

    #[test]
    fn empty_yaml_gives_defaults() {
        let config = EngineConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn full_yaml() {
        let yaml = indoc!(
            "
            n_states: 2
            seed: 7
            n_grid: 11
            column_init: together
            row_init: from_the_prior
            update:
              n_iters: 50
              transitions:
                - !column_assignment mh
                - state_alpha
                - row_assignment
              mh_singleton_prob: 0.25
            "
        );
        let config = EngineConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.n_states, 2);
        assert_eq!(config.n_grid, 11);
        assert_eq!(config.column_init, InitMode::Together);
        assert_eq!(config.row_init, InitMode::Random);
        assert_eq!(config.update.n_iters, 50);
        assert_eq!(
            config.update.transitions,
            vec![
                StateTransition::ColumnAssignment(ColAssignAlg::Mh),
                StateTransition::StateAlpha,
                StateTransition::RowAssignment,
            ]
        );
        assert_eq!(config.update.mh_singleton_prob, 0.25);
    }

    #[test]
    fn unknown_field_is_an_error() {
        let res = EngineConfig::from_yaml_str("n_chains: 3\n");
        assert!(matches!(res, Err(ConfigError::Yaml(_))));
    }

    #[test]
    fn singleton_prob_of_one_is_rejected() {
        let yaml = indoc!(
            "
            update:
              n_iters: 5
              transitions: [!column_assignment mh]
              mh_singleton_prob: 1.0
            "
        );
        let res = EngineConfig::from_yaml_str(yaml);
        assert!(matches!(
            res,
            Err(ConfigError::Update(UpdateConfigError::InvalidSingletonProb(p)))
                if p == 1.0
        ));
    }

    #[test]
    fn yaml_round_trip() {
        let config = EngineConfig {
            n_states: 3,
            seed: Some(12),
            ..Default::default()
        };
        let yaml = config.to_yaml_string().unwrap();
        assert_eq!(EngineConfig::from_yaml_str(&yaml).unwrap(), config);
    }

    #[test]
    fn from_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let res = EngineConfig::from_yaml_file(dir.path().join("nope.yaml"));
        assert!(matches!(res, Err(ConfigError::Io(_))));
    }

    #[test]
    fn from_file() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "n_states: 5").unwrap();
        let config = EngineConfig::from_yaml_file(file.path()).unwrap();
        assert_eq!(config.n_states, 5);
    }
}
