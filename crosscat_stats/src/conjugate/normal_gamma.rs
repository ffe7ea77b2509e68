use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{HyperKey, HyperParams, SuffStat};
use crate::rv::data::{DataOrSuffStat, GaussianSuffStat};
use crate::rv::dist::{Gaussian, NormalGamma};
use crate::rv::traits::{ConjugatePrior, Rv, SuffStat as _};

/// Normal-Gamma prior on the mean and precision of a Gaussian.
///
/// The precision is Gamma(`nu`/2, rate `s`/2) and the mean given precision
/// `tau` is Gaussian(`mu`, 1/(`r` `tau`)).
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct NgHypers {
    pub r: f64,
    pub nu: f64,
    pub s: f64,
    pub mu: f64,
}

impl HyperParams for NgHypers {
    const KEYS: &'static [HyperKey] =
        &[HyperKey::R, HyperKey::Nu, HyperKey::S, HyperKey::Mu];

    fn get(&self, key: HyperKey) -> f64 {
        match key {
            HyperKey::R => self.r,
            HyperKey::Nu => self.nu,
            HyperKey::S => self.s,
            HyperKey::Mu => self.mu,
            _ => panic!("'{key}' is not a Normal-Gamma hyperparameter"),
        }
    }

    fn set(&mut self, key: HyperKey, value: f64) {
        match key {
            HyperKey::R => self.r = value,
            HyperKey::Nu => self.nu = value,
            HyperKey::S => self.s = value,
            HyperKey::Mu => self.mu = value,
            _ => panic!("'{key}' is not a Normal-Gamma hyperparameter"),
        }
    }
}

impl NgHypers {
    /// The prior as an `rv` distribution
    #[inline]
    pub fn prior(&self) -> NormalGamma {
        NormalGamma::new_unchecked(self.mu, self.r, self.s, self.nu)
    }
}

impl From<&NormalGamma> for NgHypers {
    fn from(ng: &NormalGamma) -> Self {
        let (mu, r, s, nu) = ng.params();
        NgHypers { r, nu, s, mu }
    }
}

/// Gaussian sufficient statistic. Observations are held as a running mean
/// and sum of squared deviations.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct NgStats(GaussianSuffStat);

impl NgStats {
    #[inline]
    pub fn sum_x(&self) -> f64 {
        self.0.sum_x()
    }

    #[inline]
    pub fn sum_x_sq(&self) -> f64 {
        self.0.sum_x_sq()
    }

    /// The posterior hyperparameters after observing the data
    pub fn posterior(&self, hypers: &NgHypers) -> NgHypers {
        if self.0.n() == 0 {
            return *hypers;
        }
        NgHypers::from(&self.posterior_prior(hypers))
    }

    fn posterior_prior(&self, hypers: &NgHypers) -> NormalGamma {
        <NormalGamma as ConjugatePrior<f64, Gaussian>>::posterior(
            &hypers.prior(),
            &DataOrSuffStat::SuffStat(&self.0),
        )
    }
}

impl SuffStat for NgStats {
    type Hypers = NgHypers;

    fn empty(_hypers: &NgHypers) -> Self {
        Self::default()
    }

    #[inline]
    fn n(&self) -> usize {
        self.0.n()
    }

    fn observe(&mut self, x: f64) {
        self.0.observe(&x);
    }

    fn forget(&mut self, x: f64) {
        assert!(self.0.n() > 0, "Cannot forget from empty Normal-Gamma stats");
        self.0.forget(&x);
    }

    fn ln_m(&self, hypers: &NgHypers) -> f64 {
        if self.0.n() == 0 {
            return 0.0;
        }
        <NormalGamma as ConjugatePrior<f64, Gaussian>>::ln_m(
            &hypers.prior(),
            &DataOrSuffStat::SuffStat(&self.0),
        )
    }

    fn ln_pp(&self, x: f64, hypers: &NgHypers) -> f64 {
        <NormalGamma as ConjugatePrior<f64, Gaussian>>::ln_pp(
            &hypers.prior(),
            &x,
            &DataOrSuffStat::SuffStat(&self.0),
        )
    }

    fn draw<R: Rng>(&self, hypers: &NgHypers, rng: &mut R) -> f64 {
        let component: Gaussian = self.posterior_prior(hypers).draw(rng);
        component.draw(rng)
    }
}
