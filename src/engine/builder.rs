use crosscat_cc::config::{InitMode, StateUpdateConfig};
use crosscat_stats::FType;
use crosscat_utils::Matrix;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;

use super::error::NewEngineError;
use super::Engine;
use crate::config::EngineConfig;

/// Builds `Engine`s
pub struct Builder {
    data: Matrix<f64>,
    ftypes: Vec<FType>,
    config: EngineConfig,
}

impl Builder {
    #[must_use]
    pub fn new(data: Matrix<f64>, ftypes: Vec<FType>) -> Self {
        Self {
            data,
            ftypes,
            config: EngineConfig::default(),
        }
    }

    /// Take every setting from `config`
    #[must_use]
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// With a certain number of states
    #[must_use]
    pub fn with_nstates(mut self, n_states: usize) -> Self {
        self.config.n_states = n_states;
        self
    }

    /// With a given grid size
    #[must_use]
    pub fn n_grid(mut self, n_grid: usize) -> Self {
        self.config.n_grid = n_grid;
        self
    }

    #[must_use]
    pub fn column_init(mut self, init_mode: InitMode) -> Self {
        self.config.column_init = init_mode;
        self
    }

    #[must_use]
    pub fn row_init(mut self, init_mode: InitMode) -> Self {
        self.config.row_init = init_mode;
        self
    }

    /// What `Engine::update` runs
    #[must_use]
    pub fn update_config(mut self, update: StateUpdateConfig) -> Self {
        self.config.update = update;
        self
    }

    /// With a given random number generator
    #[must_use]
    pub fn seed_from_u64(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    /// Build the `Engine`; consume the `Builder`.
    pub fn build(self) -> Result<Engine, NewEngineError> {
        let rng = match self.config.seed {
            Some(seed) => Xoshiro256Plus::seed_from_u64(seed),
            None => Xoshiro256Plus::from_entropy(),
        };
        Engine::new(self.data, self.ftypes, &self.config, rng)
    }
}
