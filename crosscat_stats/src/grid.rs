//! Discretized hyperparameter grids
use std::f64::consts::TAU;

use crosscat_consts::S_GRID_LOWER_RATIO;
use crosscat_utils::MinMax;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::conjugate::{
    CatHypers, HyperKey, HyperParams, Hypers, NgHypers, VmHypers,
};
use crate::FType;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GridError {
    #[error("grid size must be at least 1")]
    ZeroGridSize,
    #[error("the {name} grid is empty")]
    EmptyGrid { name: String },
    #[error("the {name} grid contains the invalid value {value}")]
    InvalidValue { name: String, value: f64 },
    #[error("column has no observed values")]
    NoObservedValues,
    #[error("continuous column has zero variance")]
    ZeroVariance,
    #[error("cyclic column is constant")]
    ConstantColumn,
    #[error("{grids} grids cannot be used with a {ftype} column")]
    FTypeMismatch { grids: FType, ftype: FType },
}

/// `n` evenly spaced values from `a` to `b`, inclusive
///
/// # Example
///
/// ```rust
/// # use crosscat_stats::grid::linspace;
/// assert_eq!(linspace(0.0, 1.0, 5), vec![0.0, 0.25, 0.5, 0.75, 1.0]);
/// assert_eq!(linspace(3.0, 9.0, 1), vec![3.0]);
/// ```
pub fn linspace(a: f64, b: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![a],
        _ => {
            let step = (b - a) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { b } else { (i as f64).mul_add(step, a) })
                .collect()
        }
    }
}

/// `n` values from `a` to `b`, inclusive, evenly spaced in log space
pub fn log_linspace(a: f64, b: f64, n: usize) -> Vec<f64> {
    linspace(a.ln(), b.ln(), n)
        .iter()
        .map(|x| x.exp())
        .collect()
}

/// The grid of CRP concentrations for a process over `n` items
pub fn create_crp_alpha_grid(n: usize, n_grid: usize) -> Vec<f64> {
    log_linspace(1.0, n.max(1) as f64, n_grid)
}

/// Check that `grid` is non-empty with finite (and, with `positive`, strictly
/// positive) values
pub fn validate_grid(
    name: &str,
    grid: &[f64],
    positive: bool,
) -> Result<(), GridError> {
    if grid.is_empty() {
        return Err(GridError::EmptyGrid {
            name: name.to_owned(),
        });
    }
    match grid
        .iter()
        .find(|&&x| !x.is_finite() || (positive && x <= 0.0))
    {
        Some(&value) => Err(GridError::InvalidValue {
            name: name.to_owned(),
            value,
        }),
        None => Ok(()),
    }
}

/// Hyperparameter grids for one column
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum HyperGrids {
    Continuous {
        r: Vec<f64>,
        nu: Vec<f64>,
        s: Vec<f64>,
        mu: Vec<f64>,
    },
    Cyclic {
        a: Vec<f64>,
        b: Vec<f64>,
        kappa: Vec<f64>,
    },
    Multinomial {
        alpha: Vec<f64>,
        k: usize,
    },
}

impl HyperGrids {
    /// The grid for `key`
    ///
    /// # Panics
    /// Panics if `key` does not belong to this column type
    pub fn grid(&self, key: HyperKey) -> &[f64] {
        match (self, key) {
            (Self::Continuous { r, .. }, HyperKey::R) => r,
            (Self::Continuous { nu, .. }, HyperKey::Nu) => nu,
            (Self::Continuous { s, .. }, HyperKey::S) => s,
            (Self::Continuous { mu, .. }, HyperKey::Mu) => mu,
            (Self::Cyclic { a, .. }, HyperKey::A) => a,
            (Self::Cyclic { b, .. }, HyperKey::B) => b,
            (Self::Cyclic { kappa, .. }, HyperKey::Kappa) => kappa,
            (Self::Multinomial { alpha, .. }, HyperKey::Alpha) => alpha,
            _ => panic!("No '{key}' grid for {} column", self.ftype()),
        }
    }

    pub fn keys(&self) -> &'static [HyperKey] {
        match self {
            Self::Continuous { .. } => NgHypers::KEYS,
            Self::Cyclic { .. } => VmHypers::KEYS,
            Self::Multinomial { .. } => CatHypers::KEYS,
        }
    }

    pub fn ftype(&self) -> FType {
        match self {
            Self::Continuous { .. } => FType::Continuous,
            Self::Cyclic { .. } => FType::Cyclic,
            Self::Multinomial { k, .. } => FType::Multinomial { k: *k },
        }
    }

    /// Check every grid. Location grids (`mu`, `b`) must be finite, every
    /// other grid strictly positive.
    pub fn validate(&self) -> Result<(), GridError> {
        self.keys().iter().try_for_each(|&key| {
            validate_grid(&key.to_string(), self.grid(key), !key.is_location())
        })
    }

    /// Draw each hyperparameter uniformly from its grid
    pub fn draw_hypers<R: Rng>(&self, rng: &mut R) -> Hypers {
        match self {
            Self::Continuous { r, nu, s, mu } => Hypers::Continuous(NgHypers {
                r: pick(r, rng),
                nu: pick(nu, rng),
                s: pick(s, rng),
                mu: pick(mu, rng),
            }),
            Self::Cyclic { a, b, kappa } => Hypers::Cyclic(VmHypers {
                a: pick(a, rng),
                b: pick(b, rng),
                kappa: pick(kappa, rng),
            }),
            Self::Multinomial { alpha, k } => {
                Hypers::Multinomial(CatHypers {
                    alpha: pick(alpha, rng),
                    k: *k,
                })
            }
        }
    }
}

/// A uniformly chosen grid entry
#[inline]
pub fn pick<R: Rng>(grid: &[f64], rng: &mut R) -> f64 {
    grid[rng.gen_range(0..grid.len())]
}

/// Derive hyperparameter grids of size `n_grid` from a column's data.
///
/// `NaN` entries are missing and ignored, but the total length of `column`
/// sets the upper end of count-like grids.
pub fn construct_hyper_grids(
    ftype: FType,
    column: &[f64],
    n_grid: usize,
) -> Result<HyperGrids, GridError> {
    if n_grid == 0 {
        return Err(GridError::ZeroGridSize);
    }

    let observed: Vec<f64> =
        column.iter().copied().filter(|x| !x.is_nan()).collect();
    if observed.is_empty() {
        return Err(GridError::NoObservedValues);
    }

    let n_rows = column.len() as f64;

    let grids = match ftype {
        FType::Continuous => {
            let n = observed.len() as f64;
            let mean = observed.iter().sum::<f64>() / n;
            let ssd: f64 = observed.iter().map(|x| (x - mean).powi(2)).sum();
            if ssd <= 0.0 {
                return Err(GridError::ZeroVariance);
            }
            let (min, max) = observed
                .iter()
                .copied()
                .minmax()
                .ok_or(GridError::NoObservedValues)?;
            HyperGrids::Continuous {
                r: log_linspace(1.0, n_rows, n_grid),
                nu: log_linspace(1.0, n_rows, n_grid),
                s: log_linspace(ssd * S_GRID_LOWER_RATIO, ssd, n_grid),
                mu: linspace(min, max, n_grid),
            }
        }
        FType::Cyclic => {
            let first = observed[0];
            if observed.iter().all(|&x| x == first) {
                return Err(GridError::ConstantColumn);
            }
            let mut b = linspace(0.0, TAU, n_grid + 1);
            b.pop();
            HyperGrids::Cyclic {
                a: log_linspace(TAU.recip(), n_rows, n_grid),
                b,
                kappa: log_linspace(TAU.recip(), n_rows, n_grid),
            }
        }
        FType::Multinomial { k } => HyperGrids::Multinomial {
            alpha: log_linspace(1.0, n_rows, n_grid),
            k,
        },
    };

    grids.validate()?;
    Ok(grids)
}
