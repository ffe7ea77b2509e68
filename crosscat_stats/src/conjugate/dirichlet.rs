use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{HyperKey, HyperParams, SuffStat};
use crate::rv::data::{CategoricalSuffStat, DataOrSuffStat};
use crate::rv::dist::{Categorical, Dirichlet, SymmetricDirichlet};
use crate::rv::traits::{ConjugatePrior, Rv, SuffStat as _};

/// Symmetric Dirichlet prior over `k` category weights
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct CatHypers {
    pub alpha: f64,
    /// The number of categories. Fixed for the life of the column.
    pub k: usize,
}

impl HyperParams for CatHypers {
    const KEYS: &'static [HyperKey] = &[HyperKey::Alpha];

    fn get(&self, key: HyperKey) -> f64 {
        match key {
            HyperKey::Alpha => self.alpha,
            _ => panic!("'{key}' is not a Dirichlet hyperparameter"),
        }
    }

    fn set(&mut self, key: HyperKey, value: f64) {
        match key {
            HyperKey::Alpha => self.alpha = value,
            _ => panic!("'{key}' is not a Dirichlet hyperparameter"),
        }
    }
}

impl CatHypers {
    /// The prior as an `rv` distribution
    #[inline]
    pub fn prior(&self) -> SymmetricDirichlet {
        SymmetricDirichlet::new_unchecked(self.alpha, self.k)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CatStats(CategoricalSuffStat);

impl CatStats {
    pub fn new(k: usize) -> Self {
        CatStats(CategoricalSuffStat::new(k))
    }

    #[inline]
    pub fn counts(&self) -> &[f64] {
        self.0.counts()
    }

    #[inline]
    fn category(&self, x: f64) -> usize {
        let k = self.0.counts().len();
        let ix = x as usize;
        assert!(
            x >= 0.0 && x.fract() == 0.0 && ix < k,
            "{x} is not a category in 0..{k}"
        );
        ix
    }

    fn posterior(&self, hypers: &CatHypers) -> Dirichlet {
        <SymmetricDirichlet as ConjugatePrior<usize, Categorical>>::posterior(
            &hypers.prior(),
            &DataOrSuffStat::SuffStat(&self.0),
        )
    }
}

impl SuffStat for CatStats {
    type Hypers = CatHypers;

    fn empty(hypers: &CatHypers) -> Self {
        Self::new(hypers.k)
    }

    #[inline]
    fn n(&self) -> usize {
        self.0.n()
    }

    fn observe(&mut self, x: f64) {
        let ix = self.category(x);
        self.0.observe(&ix);
    }

    fn forget(&mut self, x: f64) {
        let ix = self.category(x);
        assert!(
            self.0.counts()[ix] > 0.0,
            "Cannot forget category {ix} with zero count"
        );
        self.0.forget(&ix);
    }

    fn ln_m(&self, hypers: &CatHypers) -> f64 {
        if self.0.n() == 0 {
            return 0.0;
        }
        <SymmetricDirichlet as ConjugatePrior<usize, Categorical>>::ln_m(
            &hypers.prior(),
            &DataOrSuffStat::SuffStat(&self.0),
        )
    }

    fn ln_pp(&self, x: f64, hypers: &CatHypers) -> f64 {
        let ix = self.category(x);
        <SymmetricDirichlet as ConjugatePrior<usize, Categorical>>::ln_pp(
            &hypers.prior(),
            &ix,
            &DataOrSuffStat::SuffStat(&self.0),
        )
    }

    fn draw<R: Rng>(&self, hypers: &CatHypers, rng: &mut R) -> f64 {
        let component: Categorical = self.posterior(hypers).draw(rng);
        let x: usize = component.draw(rng);
        x as f64
    }
}
