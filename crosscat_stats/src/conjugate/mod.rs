//! Conjugate component families
//!
//! Each family pairs a sufficient statistic, updated in O(1) per element,
//! with a hyperparameter record and a closed-form marginal likelihood.
mod dirichlet;
mod normal_gamma;
mod von_mises;

pub use dirichlet::{CatHypers, CatStats};
pub use normal_gamma::{NgHypers, NgStats};
pub use von_mises::{VmHypers, VmStats};

use rand::Rng;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::FType;

/// The name of a resampled hyperparameter
#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "snake_case")]
pub enum HyperKey {
    /// Normal-Gamma prior pseudo-count on the mean
    R,
    /// Normal-Gamma prior degrees of freedom
    Nu,
    /// Normal-Gamma prior scale
    S,
    /// Normal-Gamma prior mean
    Mu,
    /// Concentration of the von Mises prior on the mean direction
    A,
    /// Location of the von Mises prior on the mean direction
    B,
    /// Known concentration of the von Mises likelihood
    Kappa,
    /// Symmetric Dirichlet concentration
    Alpha,
}

impl HyperKey {
    /// Location parameters may take any finite value. Every other
    /// hyperparameter must be strictly positive.
    #[inline]
    pub fn is_location(self) -> bool {
        matches!(self, Self::Mu | Self::B)
    }
}

impl std::fmt::Display for HyperKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::R => "r",
            Self::Nu => "nu",
            Self::S => "s",
            Self::Mu => "mu",
            Self::A => "a",
            Self::B => "b",
            Self::Kappa => "kappa",
            Self::Alpha => "alpha",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum HypersError {
    #[error("hyperparameter '{key}' cannot be {value}")]
    InvalidValue { key: HyperKey, value: f64 },
}

/// A record of named scalar hyperparameters
pub trait HyperParams:
    Copy + PartialEq + std::fmt::Debug + Serialize + DeserializeOwned
{
    /// The keys of the resampled scalars, in resampling order
    const KEYS: &'static [HyperKey];

    /// # Panics
    /// Panics if `key` does not belong to this family
    fn get(&self, key: HyperKey) -> f64;

    /// # Panics
    /// Panics if `key` does not belong to this family
    fn set(&mut self, key: HyperKey, value: f64);

    fn with(&self, key: HyperKey, value: f64) -> Self {
        let mut hypers = *self;
        hypers.set(key, value);
        hypers
    }

    /// Check that every value is finite, and positive unless it is a
    /// location
    fn validate(&self) -> Result<(), HypersError> {
        Self::KEYS.iter().try_for_each(|&key| {
            let value = self.get(key);
            if value.is_finite() && (key.is_location() || value > 0.0) {
                Ok(())
            } else {
                Err(HypersError::InvalidValue { key, value })
            }
        })
    }
}

/// Sufficient statistic of a conjugate family
pub trait SuffStat:
    Clone + PartialEq + std::fmt::Debug + Serialize + DeserializeOwned
{
    type Hypers: HyperParams;

    /// The statistic of no observations
    fn empty(hypers: &Self::Hypers) -> Self;

    /// The number of observations
    fn n(&self) -> usize;

    fn observe(&mut self, x: f64);

    /// # Panics
    /// Panics if there is nothing to forget
    fn forget(&mut self, x: f64);

    /// Log marginal likelihood of the observed data
    fn ln_m(&self, hypers: &Self::Hypers) -> f64;

    /// Log posterior predictive probability of `x`
    fn ln_pp(&self, x: f64, hypers: &Self::Hypers) -> f64 {
        let mut stat = self.clone();
        stat.observe(x);
        stat.ln_m(hypers) - self.ln_m(hypers)
    }

    /// Draw from the posterior predictive
    fn draw<R: Rng>(&self, hypers: &Self::Hypers, rng: &mut R) -> f64;
}

/// The log marginal likelihood of `stat` with the hyperparameter `key` set to
/// each value in `grid`
pub fn ln_m_grid<S: SuffStat>(
    stat: &S,
    hypers: &S::Hypers,
    key: HyperKey,
    grid: &[f64],
) -> Vec<f64> {
    grid.iter()
        .map(|&value| stat.ln_m(&hypers.with(key, value)))
        .collect()
}

/// Hyperparameters of any supported component family
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Hypers {
    Continuous(NgHypers),
    Cyclic(VmHypers),
    Multinomial(CatHypers),
}

impl Hypers {
    pub fn keys(&self) -> &'static [HyperKey] {
        match self {
            Self::Continuous(_) => NgHypers::KEYS,
            Self::Cyclic(_) => VmHypers::KEYS,
            Self::Multinomial(_) => CatHypers::KEYS,
        }
    }

    pub fn get(&self, key: HyperKey) -> f64 {
        match self {
            Self::Continuous(h) => h.get(key),
            Self::Cyclic(h) => h.get(key),
            Self::Multinomial(h) => h.get(key),
        }
    }

    pub fn set(&mut self, key: HyperKey, value: f64) {
        match self {
            Self::Continuous(h) => h.set(key, value),
            Self::Cyclic(h) => h.set(key, value),
            Self::Multinomial(h) => h.set(key, value),
        }
    }

    pub fn with(&self, key: HyperKey, value: f64) -> Self {
        let mut hypers = *self;
        hypers.set(key, value);
        hypers
    }

    pub fn validate(&self) -> Result<(), HypersError> {
        match self {
            Self::Continuous(h) => h.validate(),
            Self::Cyclic(h) => h.validate(),
            Self::Multinomial(h) => h.validate(),
        }
    }

    pub fn ftype(&self) -> FType {
        match self {
            Self::Continuous(_) => FType::Continuous,
            Self::Cyclic(_) => FType::Cyclic,
            Self::Multinomial(h) => FType::Multinomial { k: h.k },
        }
    }
}

macro_rules! impl_hypers_variant {
    ($variant:ident, $hypers:ty) => {
        impl From<$hypers> for Hypers {
            fn from(hypers: $hypers) -> Self {
                Self::$variant(hypers)
            }
        }

        impl TryFrom<Hypers> for $hypers {
            type Error = Hypers;

            fn try_from(hypers: Hypers) -> Result<Self, Self::Error> {
                match hypers {
                    Hypers::$variant(inner) => Ok(inner),
                    other => Err(other),
                }
            }
        }
    };
}

impl_hypers_variant!(Continuous, NgHypers);
impl_hypers_variant!(Cyclic, VmHypers);
impl_hypers_variant!(Multinomial, CatHypers);

#[cfg(test)]
mod tests {
    use super::*;
    use approx::*;

    const TOL: f64 = 1E-9;

    fn ng() -> NgHypers {
        NgHypers {
            r: 1.2,
            nu: 2.5,
            s: 1.7,
            mu: 0.3,
        }
    }

    fn vm() -> VmHypers {
        VmHypers {
            a: 0.8,
            b: 1.1,
            kappa: 2.0,
        }
    }

    fn cat() -> CatHypers {
        CatHypers { alpha: 0.7, k: 4 }
    }

    macro_rules! family_tests {
        ($mod_name:ident, $stat:ty, $hypers:expr, $xs:expr) => {
            mod $mod_name {
                use super::*;

                #[test]
                fn empty_marginal_is_zero() {
                    let hypers = $hypers;
                    let stat = <$stat>::empty(&hypers);
                    assert_relative_eq!(stat.ln_m(&hypers), 0.0, epsilon = TOL);
                }

                #[test]
                fn sequential_predictives_sum_to_marginal() {
                    let hypers = $hypers;
                    let mut stat = <$stat>::empty(&hypers);
                    let mut total = 0.0;
                    for &x in $xs.iter() {
                        total += stat.ln_pp(x, &hypers);
                        stat.observe(x);
                    }
                    assert_relative_eq!(total, stat.ln_m(&hypers), epsilon = TOL);
                }

                #[test]
                fn forget_undoes_observe() {
                    let hypers = $hypers;
                    let mut stat = <$stat>::empty(&hypers);
                    $xs.iter().take(3).for_each(|&x| stat.observe(x));
                    let before = stat.ln_m(&hypers);
                    let x = $xs[3];
                    stat.observe(x);
                    stat.forget(x);
                    assert_eq!(stat.n(), 3);
                    assert_relative_eq!(stat.ln_m(&hypers), before, epsilon = TOL);
                }

                #[test]
                fn grid_matches_pointwise_marginals() {
                    let hypers = $hypers;
                    let mut stat = <$stat>::empty(&hypers);
                    $xs.iter().for_each(|&x| stat.observe(x));
                    let key = hypers_keys(&hypers)[0];
                    let grid = [0.5, 1.0, 3.0];
                    let lms = ln_m_grid(&stat, &hypers, key, &grid);
                    for (lm, &v) in lms.iter().zip(grid.iter()) {
                        let h = hypers.with(key, v);
                        assert_relative_eq!(*lm, stat.ln_m(&h), epsilon = TOL);
                    }
                }
            }
        };
    }

    fn hypers_keys<H: HyperParams>(_hypers: &H) -> &'static [HyperKey] {
        H::KEYS
    }

    family_tests!(
        normal_gamma,
        NgStats,
        ng(),
        [0.1, -1.2, 2.5, 0.9, 0.0, 3.3]
    );
    family_tests!(von_mises, VmStats, vm(), [0.1, 6.0, 2.5, 0.9, 3.1, 4.4]);
    family_tests!(dirichlet, CatStats, cat(), [0.0, 3.0, 1.0, 1.0, 2.0, 0.0]);

    #[test]
    fn hypers_enum_get_set_roundtrip() {
        let mut hypers = Hypers::from(ng());
        hypers.set(HyperKey::S, 9.0);
        assert_eq!(hypers.get(HyperKey::S), 9.0);
        assert_eq!(hypers.keys(), &[HyperKey::R, HyperKey::Nu, HyperKey::S, HyperKey::Mu]);
        assert_eq!(hypers.ftype(), FType::Continuous);
    }

    #[test]
    fn try_from_wrong_variant_returns_input() {
        let hypers = Hypers::from(vm());
        assert_eq!(NgHypers::try_from(hypers), Err(hypers));
        assert_eq!(VmHypers::try_from(hypers), Ok(vm()));
    }

    #[test]
    fn valid_hypers_pass_validation() {
        assert!(Hypers::from(ng()).validate().is_ok());
        assert!(Hypers::from(vm()).validate().is_ok());
        assert!(Hypers::from(cat()).validate().is_ok());
        // locations may be negative
        assert!(ng().with(HyperKey::Mu, -4.0).validate().is_ok());
        assert!(vm().with(HyperKey::B, -1.0).validate().is_ok());
    }

    #[test]
    fn non_positive_scales_fail_validation() {
        assert_eq!(
            Hypers::from(ng().with(HyperKey::S, -1.0)).validate(),
            Err(HypersError::InvalidValue {
                key: HyperKey::S,
                value: -1.0
            })
        );
        assert_eq!(
            vm().with(HyperKey::Kappa, 0.0).validate(),
            Err(HypersError::InvalidValue {
                key: HyperKey::Kappa,
                value: 0.0
            })
        );
        assert!(cat().with(HyperKey::Alpha, 0.0).validate().is_err());
        assert!(ng().with(HyperKey::Nu, f64::NAN).validate().is_err());
    }

    #[test]
    fn non_finite_location_fails_validation() {
        assert!(ng().with(HyperKey::Mu, f64::INFINITY).validate().is_err());
        assert!(vm().with(HyperKey::B, f64::NAN).validate().is_err());
    }

    #[test]
    #[should_panic]
    fn hypers_enum_rejects_foreign_key() {
        let hypers = Hypers::from(cat());
        hypers.get(HyperKey::Kappa);
    }
}
