use std::f64::consts::{PI, TAU};

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{HyperKey, HyperParams, SuffStat};
use crate::rv::dist::VonMises;
use crate::rv::traits::Rv;
use crate::special::ln_i0;

/// Below this posterior concentration the mean direction is drawn uniformly
const MIN_CONCENTRATION: f64 = 1E-10;

/// von Mises likelihood with known concentration `kappa` and a von Mises
/// prior VM(`b`, `a`) on the mean direction
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct VmHypers {
    pub a: f64,
    pub b: f64,
    pub kappa: f64,
}

impl HyperParams for VmHypers {
    const KEYS: &'static [HyperKey] = &[HyperKey::A, HyperKey::B, HyperKey::Kappa];

    fn get(&self, key: HyperKey) -> f64 {
        match key {
            HyperKey::A => self.a,
            HyperKey::B => self.b,
            HyperKey::Kappa => self.kappa,
            _ => panic!("'{key}' is not a von Mises hyperparameter"),
        }
    }

    fn set(&mut self, key: HyperKey, value: f64) {
        match key {
            HyperKey::A => self.a = value,
            HyperKey::B => self.b = value,
            HyperKey::Kappa => self.kappa = value,
            _ => panic!("'{key}' is not a von Mises hyperparameter"),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct VmStats {
    n: usize,
    sum_sin: f64,
    sum_cos: f64,
}

/// Wrap an angle into [0, 2π)
#[inline]
fn wrap_angle(x: f64) -> f64 {
    let y = x.rem_euclid(TAU);
    if y >= TAU {
        0.0
    } else {
        y
    }
}

impl VmStats {
    #[inline]
    pub fn sum_sin(&self) -> f64 {
        self.sum_sin
    }

    #[inline]
    pub fn sum_cos(&self) -> f64 {
        self.sum_cos
    }

    /// Posterior concentration `a'` and location `b'` of the mean direction
    pub fn posterior(&self, hypers: &VmHypers) -> (f64, f64) {
        let c = hypers.a.mul_add(hypers.b.cos(), hypers.kappa * self.sum_cos);
        let s = hypers.a.mul_add(hypers.b.sin(), hypers.kappa * self.sum_sin);
        (c.hypot(s), wrap_angle(s.atan2(c)))
    }
}

impl SuffStat for VmStats {
    type Hypers = VmHypers;

    fn empty(_hypers: &VmHypers) -> Self {
        Self::default()
    }

    #[inline]
    fn n(&self) -> usize {
        self.n
    }

    fn observe(&mut self, x: f64) {
        self.n += 1;
        self.sum_sin += x.sin();
        self.sum_cos += x.cos();
    }

    fn forget(&mut self, x: f64) {
        assert!(self.n > 0, "Cannot forget from empty von Mises stats");
        self.n -= 1;
        if self.n == 0 {
            self.sum_sin = 0.0;
            self.sum_cos = 0.0;
        } else {
            self.sum_sin -= x.sin();
            self.sum_cos -= x.cos();
        }
    }

    fn ln_m(&self, hypers: &VmHypers) -> f64 {
        if self.n == 0 {
            return 0.0;
        }
        debug_assert!(hypers.a > 0.0 && hypers.kappa > 0.0);
        let (a_post, _) = self.posterior(hypers);
        -(self.n as f64) * ((2.0 * PI).ln() + ln_i0(hypers.kappa))
            + ln_i0(a_post)
            - ln_i0(hypers.a)
    }

    fn draw<R: Rng>(&self, hypers: &VmHypers, rng: &mut R) -> f64 {
        let (a_post, b_post) = self.posterior(hypers);
        let mu = if a_post < MIN_CONCENTRATION {
            rng.gen::<f64>() * TAU
        } else {
            let prior_mu: f64 = VonMises::new(b_post, a_post)
                .expect("posterior von Mises parameters are valid")
                .draw(rng);
            wrap_angle(prior_mu)
        };
        let x: f64 = VonMises::new(mu, hypers.kappa)
            .expect("kappa is positive")
            .draw(rng);
        wrap_angle(x)
    }
}
