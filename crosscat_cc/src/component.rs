//! Per-column, per-cluster conjugate component models
use crosscat_stats::conjugate::{
    ln_m_grid, CatStats, HyperKey, Hypers, NgStats, SuffStat, VmStats,
};
use enum_dispatch::enum_dispatch;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// A conjugate component: sufficient statistics, hyperparameters and a cached
/// marginal log likelihood ("score") that always equals the closed-form
/// marginal of exactly the inserted elements.
///
/// Missing values (`NaN`) are ignored by every method.
#[enum_dispatch(ComponentModel)]
pub trait ConjugateModel {
    /// The number of observed elements
    fn n(&self) -> usize;
    /// Insert `x` and return the change in score
    fn insert(&mut self, x: f64) -> f64;
    /// Remove `x` and return the change in score
    fn remove(&mut self, x: f64) -> f64;
    /// The cached marginal log likelihood
    fn marginal_logp(&self) -> f64;
    /// The marginal log likelihood computed from the statistics
    fn recompute_score(&self) -> f64;
    /// Log posterior predictive probability of `x`
    fn predictive_logp(&self, x: f64) -> f64;
    /// Draw from the posterior predictive
    fn draw(&self, rng: &mut impl Rng) -> f64;
    /// The marginal log likelihood with hyperparameter `key` set to each
    /// value in `grid`
    fn hyper_conditionals(&self, key: HyperKey, grid: &[f64]) -> Vec<f64>;
    /// Replace the hyperparameters and return the change in score
    fn set_hypers(&mut self, hypers: &Hypers) -> f64;
    fn hypers(&self) -> Hypers;
}

/// A conjugate component of one family
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(bound = "")]
pub struct Component<S: SuffStat> {
    stat: S,
    hypers: S::Hypers,
    score: f64,
}

impl<S: SuffStat> Component<S> {
    pub fn new(hypers: S::Hypers) -> Self {
        Component {
            stat: S::empty(&hypers),
            hypers,
            score: 0.0,
        }
    }

    #[inline]
    pub fn stat(&self) -> &S {
        &self.stat
    }
}

impl<S> ConjugateModel for Component<S>
where
    S: SuffStat,
    S::Hypers: TryFrom<Hypers> + Into<Hypers>,
{
    #[inline]
    fn n(&self) -> usize {
        self.stat.n()
    }

    fn insert(&mut self, x: f64) -> f64 {
        if x.is_nan() {
            return 0.0;
        }
        self.stat.observe(x);
        let score = self.stat.ln_m(&self.hypers);
        let delta = score - self.score;
        self.score = score;
        delta
    }

    fn remove(&mut self, x: f64) -> f64 {
        if x.is_nan() {
            return 0.0;
        }
        self.stat.forget(x);
        let score = self.stat.ln_m(&self.hypers);
        let delta = score - self.score;
        self.score = score;
        delta
    }

    #[inline]
    fn marginal_logp(&self) -> f64 {
        self.score
    }

    fn recompute_score(&self) -> f64 {
        self.stat.ln_m(&self.hypers)
    }

    fn predictive_logp(&self, x: f64) -> f64 {
        if x.is_nan() {
            0.0
        } else {
            self.stat.ln_pp(x, &self.hypers)
        }
    }

    fn draw(&self, rng: &mut impl Rng) -> f64 {
        self.stat.draw(&self.hypers, rng)
    }

    fn hyper_conditionals(&self, key: HyperKey, grid: &[f64]) -> Vec<f64> {
        ln_m_grid(&self.stat, &self.hypers, key, grid)
    }

    fn set_hypers(&mut self, hypers: &Hypers) -> f64 {
        self.hypers = match <S::Hypers as TryFrom<Hypers>>::try_from(*hypers) {
            Ok(inner) => inner,
            Err(_) => panic!(
                "Cannot set {:?} on a {:?} component",
                hypers, self.hypers
            ),
        };
        let score = self.stat.ln_m(&self.hypers);
        let delta = score - self.score;
        self.score = score;
        delta
    }

    fn hypers(&self) -> Hypers {
        self.hypers.into()
    }
}

/// A component model of any supported column type
#[enum_dispatch]
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum ComponentModel {
    Continuous(Component<NgStats>),
    Cyclic(Component<VmStats>),
    Multinomial(Component<CatStats>),
}

impl ComponentModel {
    /// An empty component of the type given by `hypers`
    pub fn new(hypers: &Hypers) -> Self {
        match hypers {
            Hypers::Continuous(h) => Self::Continuous(Component::new(*h)),
            Hypers::Cyclic(h) => Self::Cyclic(Component::new(*h)),
            Hypers::Multinomial(h) => Self::Multinomial(Component::new(*h)),
        }
    }

    /// A component with every value in `xs` inserted
    pub fn from_values<'a>(
        hypers: &Hypers,
        xs: impl Iterator<Item = &'a f64>,
    ) -> Self {
        let mut cpnt = Self::new(hypers);
        xs.for_each(|&x| {
            cpnt.insert(x);
        });
        cpnt
    }
}
