use crate::error::UpdateConfigError;
use crate::transition::{StateTransition, DEFAULT_STATE_TRANSITIONS};
use crate::ParseError;
use crosscat_consts::{DEFAULT_N_ITERS, MH_SINGLETON_PROB};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

fn default_mh_singleton_prob() -> f64 {
    MH_SINGLETON_PROB
}

/// Configuration for `State.update`
///
/// Sets the number of iterations, the transitions run in each sweep, and the
/// singleton proposal probability of the Metropolis-Hastings column kernel.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct StateUpdateConfig {
    /// Number of sweeps to run.
    pub n_iters: usize,
    /// Which transitions to run. Their order is shuffled every sweep.
    pub transitions: Vec<StateTransition>,
    /// Probability that the Metropolis-Hastings column kernel proposes a
    /// brand new view. Must be in (0, 1).
    #[serde(default = "default_mh_singleton_prob")]
    pub mh_singleton_prob: f64,
}

impl StateUpdateConfig {
    pub fn new() -> Self {
        StateUpdateConfig {
            n_iters: DEFAULT_N_ITERS,
            transitions: DEFAULT_STATE_TRANSITIONS.into(),
            mh_singleton_prob: MH_SINGLETON_PROB,
        }
    }

    #[must_use]
    pub fn with_iters(mut self, n_iters: usize) -> Self {
        self.n_iters = n_iters;
        self
    }

    #[must_use]
    pub fn with_transitions(mut self, transitions: Vec<StateTransition>) -> Self {
        self.transitions = transitions;
        self
    }

    #[must_use]
    pub fn with_singleton_prob(mut self, mh_singleton_prob: f64) -> Self {
        self.mh_singleton_prob = mh_singleton_prob;
        self
    }

    /// Check that the Metropolis-Hastings proposal can reach every move and
    /// its reverse
    pub fn validate(&self) -> Result<(), UpdateConfigError> {
        let p = self.mh_singleton_prob;
        if p > 0.0 && p < 1.0 {
            Ok(())
        } else {
            Err(UpdateConfigError::InvalidSingletonProb(p))
        }
    }
}

impl Default for StateUpdateConfig {
    fn default() -> Self {
        StateUpdateConfig::new()
    }
}

/// How to draw a starting partition
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Eq, PartialEq, Default)]
#[serde(rename_all = "snake_case")]
pub enum InitMode {
    /// Sequential draw from the CRP prior
    #[default]
    #[serde(alias = "from_the_prior")]
    Random,
    /// Everything in one group
    Together,
    /// Every item in its own group
    Apart,
}

impl FromStr for InitMode {
    type Err = ParseError<String>;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "random" | "from_the_prior" => Ok(InitMode::Random),
            "together" => Ok(InitMode::Together),
            "apart" => Ok(InitMode::Apart),
            _ => Err(ParseError(s.to_owned())),
        }
    }
}

impl InitMode {
    /// Draw a partition of `n` items in canonical order
    pub fn draw_partition<R: rand::Rng>(
        self,
        n: usize,
        alpha: f64,
        rng: &mut R,
    ) -> Vec<usize> {
        match self {
            InitMode::Random => {
                crosscat_stats::crp::draw_crp_partition(n, alpha, rng)
            }
            InitMode::Together => vec![0; n],
            InitMode::Apart => (0..n).collect(),
        }
    }
}
