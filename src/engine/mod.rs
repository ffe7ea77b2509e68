mod builder;
mod error;

pub use builder::Builder;
pub use error::NewEngineError;

use crosscat_cc::config::StateUpdateConfig;
use crosscat_cc::error::DataError;
use crosscat_cc::state::{self, State};
use crosscat_stats::grid::create_crp_alpha_grid;
use crosscat_stats::FType;
use crosscat_utils::Matrix;
use log::info;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;
use rayon::prelude::*;

use crate::config::EngineConfig;

/// An ensemble of independent CrossCat states over one dataset
#[derive(Clone, Debug)]
pub struct Engine {
    data: Matrix<f64>,
    ftypes: Vec<FType>,
    /// Vector of states
    pub states: Vec<State>,
    pub state_ids: Vec<usize>,
    n_grid: usize,
    update_config: StateUpdateConfig,
    rng: Xoshiro256Plus,
}

impl Engine {
    /// Create a new engine with `config.n_states` states built from `data`
    ///
    /// # Arguments
    /// - data: rows by columns; `NaN` marks a missing value
    /// - ftypes: the type of each column
    /// - config: state count, grids, initialization and update settings.
    ///   `config.seed` is ignored in favor of `rng`.
    /// - rng: the master RNG from which each state's RNG is derived
    pub fn new(
        data: Matrix<f64>,
        ftypes: Vec<FType>,
        config: &EngineConfig,
        mut rng: Xoshiro256Plus,
    ) -> Result<Self, NewEngineError> {
        if config.n_states == 0 {
            return Err(NewEngineError::ZeroStatesRequested);
        }
        config.update.validate()?;

        let seeds: Vec<u64> = (0..config.n_states).map(|_| rng.gen()).collect();

        let states = seeds
            .into_par_iter()
            .enumerate()
            .map(|(state_id, seed)| {
                state::Builder::new(ftypes.clone())
                    .n_grid(config.n_grid)
                    .column_init(config.column_init)
                    .row_init(config.row_init)
                    .seed_from_u64(seed)
                    .build(&data)
                    .map_err(|source| NewEngineError::BuildState {
                        state_id,
                        source,
                    })
            })
            .collect::<Result<Vec<State>, NewEngineError>>()?;

        info!(
            "built engine with {} states over {} rows and {} columns",
            states.len(),
            data.n_rows(),
            data.n_cols()
        );

        Ok(Engine {
            state_ids: (0..states.len()).collect(),
            states,
            data,
            ftypes,
            n_grid: config.n_grid,
            update_config: config.update.clone(),
            rng,
        })
    }

    #[inline]
    pub fn states(&self) -> &[State] {
        &self.states
    }

    #[inline]
    pub fn n_states(&self) -> usize {
        self.states.len()
    }

    #[inline]
    pub fn n_rows(&self) -> usize {
        self.data.n_rows()
    }

    #[inline]
    pub fn n_cols(&self) -> usize {
        self.data.n_cols()
    }

    #[inline]
    pub fn data(&self) -> &Matrix<f64> {
        &self.data
    }

    #[inline]
    pub fn ftypes(&self) -> &[FType] {
        &self.ftypes
    }

    /// Run `n_iters` sweeps of the configured transitions on every state in
    /// parallel. Each state gets its own RNG derived from the engine's.
    pub fn update(&mut self, n_iters: usize) {
        let mut trngs: Vec<Xoshiro256Plus> = (0..self.n_states())
            .map(|_| Xoshiro256Plus::from_rng(&mut self.rng).unwrap())
            .collect();

        let config = self.update_config.clone().with_iters(n_iters);
        let data = &self.data;

        self.states
            .par_iter_mut()
            .zip(trngs.par_iter_mut())
            .zip(self.state_ids.par_iter())
            .for_each(|((state, trng), &state_id)| {
                info!("state {state_id}: running {n_iters} iterations");
                state.update(data, &config, trng);
                info!(
                    "state {state_id}: finished with {} views, score {:.4}",
                    state.n_views(),
                    state.marginal_logp()
                );
            });
    }

    /// Append a row to the data and to every state. Cells may be `NaN`.
    ///
    /// The row CRP alpha grids span `[1, n_rows]`, so they are rebuilt for
    /// the new row count.
    pub fn append_row(&mut self, row: Vec<f64>) -> Result<(), DataError> {
        if row.len() != self.n_cols() {
            return Err(DataError::RowLength {
                len: row.len(),
                n_cols: self.n_cols(),
            });
        }
        if let Some((col_ix, (&value, &ftype))) = row
            .iter()
            .zip(self.ftypes.iter())
            .enumerate()
            .find(|(_, (x, ftype))| !ftype.accepts(**x))
        {
            return Err(DataError::InvalidValue {
                row_ix: self.n_rows(),
                col_ix,
                value,
                ftype,
            });
        }

        let mut trngs: Vec<Xoshiro256Plus> = (0..self.n_states())
            .map(|_| Xoshiro256Plus::from_rng(&mut self.rng).unwrap())
            .collect();

        let row_alpha_grid = create_crp_alpha_grid(self.n_rows() + 1, self.n_grid);

        self.states
            .par_iter_mut()
            .zip(trngs.par_iter_mut())
            .for_each(|(state, trng)| {
                state.insert_row(&row, None, trng);
                state.set_row_crp_alpha_grid(row_alpha_grid.clone());
            });

        self.data.push_row(row);
        Ok(())
    }

    /// The column partition of each state, views labeled in canonical order
    pub fn column_partitions(&self) -> Vec<Vec<usize>> {
        self.states
            .iter()
            .map(|state| state.get_column_partition())
            .collect()
    }

    /// The joint log probability of each state
    pub fn marginal_logps(&self) -> Vec<f64> {
        self.states.iter().map(|state| state.marginal_logp()).collect()
    }

    /// The fraction of states in which columns `col_a` and `col_b` share a
    /// view
    ///
    /// # Panics
    /// Panics if either column is out of bounds
    pub fn dependence_probability(&self, col_a: usize, col_b: usize) -> f64 {
        assert!(
            col_a < self.n_cols() && col_b < self.n_cols(),
            "Column index out of bounds"
        );
        let n_same = self
            .states
            .iter()
            .filter(|state| state.view_of(col_a) == state.view_of(col_b))
            .count();
        n_same as f64 / self.n_states() as f64
    }
}
