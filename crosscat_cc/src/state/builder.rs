use crosscat_consts::DEFAULT_N_GRID;
use crosscat_stats::conjugate::Hypers;
use crosscat_stats::grid::{
    construct_hyper_grids, create_crp_alpha_grid, pick, validate_grid,
    GridError, HyperGrids,
};
use crosscat_stats::FType;
use crosscat_utils::Matrix;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;
use serde::{Deserialize, Serialize};

use super::State;
use crate::config::InitMode;
use crate::error::{BuildStateError, DataError, PartitionError};
use crate::feature::ViewColumn;
use crate::view::{self, validate_partition};

/// An explicit starting point for a `State`
///
/// Views are labeled `0..k` in the column partition, and `row_partitions[v]`
/// is the row partition of view `v`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct StatePartition {
    /// The view label of each column
    pub column_partition: Vec<usize>,
    /// The cluster label of each row, one vector per view
    pub row_partitions: Vec<Vec<usize>>,
    /// Hyperparameters for each column. Drawn from the grids if absent.
    #[serde(default)]
    pub hypers: Option<Vec<Hypers>>,
    /// The row CRP alpha of each view. Drawn from the grid if absent.
    #[serde(default)]
    pub view_alphas: Option<Vec<f64>>,
    /// Drawn from the grid if absent.
    #[serde(default)]
    pub column_crp_alpha: Option<f64>,
}

impl StatePartition {
    fn validate(
        &self,
        n_rows: usize,
        ftypes: &[FType],
    ) -> Result<usize, PartitionError> {
        let n_views =
            validate_partition(&self.column_partition, ftypes.len())?;

        if self.row_partitions.len() != n_views {
            return Err(PartitionError::ViewCountMismatch {
                n_views,
                n_row_partitions: self.row_partitions.len(),
            });
        }

        self.row_partitions
            .iter()
            .enumerate()
            .try_for_each(|(view_ix, z)| {
                validate_partition(z, n_rows).map(|_| ()).map_err(|err| {
                    PartitionError::RowPartition {
                        view_ix,
                        source: Box::new(err),
                    }
                })
            })?;

        if let Some(ref hypers) = self.hypers {
            if hypers.len() != ftypes.len() {
                return Err(PartitionError::HypersLength {
                    n_given: hypers.len(),
                    n_cols: ftypes.len(),
                });
            }
            if let Some((col_ix, h)) = hypers
                .iter()
                .enumerate()
                .find(|(col_ix, h)| h.ftype() != ftypes[*col_ix])
            {
                return Err(PartitionError::HypersFType {
                    col_ix,
                    given: h.ftype(),
                    ftype: ftypes[col_ix],
                });
            }
            hypers.iter().enumerate().try_for_each(|(col_ix, h)| {
                h.validate()
                    .map_err(|source| PartitionError::InvalidHypers { col_ix, source })
            })?;
        }

        if let Some(ref alphas) = self.view_alphas {
            if alphas.len() != n_views {
                return Err(PartitionError::ViewAlphasLength {
                    n_given: alphas.len(),
                    n_views,
                });
            }
        }

        if let Some(alpha) = self.column_crp_alpha {
            if !(alpha.is_finite() && alpha > 0.0) {
                return Err(PartitionError::InvalidAlpha(alpha));
            }
        }

        Ok(n_views)
    }
}

/// Builds a `State` from data
#[derive(Clone, Debug)]
pub struct Builder {
    ftypes: Vec<FType>,
    n_grid: usize,
    column_init: InitMode,
    row_init: InitMode,
    partition: Option<StatePartition>,
    hyper_grids: Option<Vec<HyperGrids>>,
    column_alpha_grid: Option<Vec<f64>>,
    row_alpha_grid: Option<Vec<f64>>,
    seed: Option<u64>,
}

impl Builder {
    /// Start building a state over columns of types `ftypes`
    pub fn new(ftypes: Vec<FType>) -> Self {
        Builder {
            ftypes,
            n_grid: DEFAULT_N_GRID,
            column_init: InitMode::default(),
            row_init: InitMode::default(),
            partition: None,
            hyper_grids: None,
            column_alpha_grid: None,
            row_alpha_grid: None,
            seed: None,
        }
    }

    /// The number of points in every derived grid
    #[must_use]
    pub fn n_grid(mut self, n_grid: usize) -> Self {
        self.n_grid = n_grid;
        self
    }

    /// How to draw the column partition
    #[must_use]
    pub fn column_init(mut self, init_mode: InitMode) -> Self {
        self.column_init = init_mode;
        self
    }

    /// How to draw the row partition of each view
    #[must_use]
    pub fn row_init(mut self, init_mode: InitMode) -> Self {
        self.row_init = init_mode;
        self
    }

    /// Start from an explicit partition. Overrides the init modes.
    #[must_use]
    pub fn partition(mut self, partition: StatePartition) -> Self {
        self.partition = Some(partition);
        self
    }

    /// Use these hyperparameter grids instead of deriving them from the data
    #[must_use]
    pub fn hyper_grids(mut self, grids: Vec<HyperGrids>) -> Self {
        self.hyper_grids = Some(grids);
        self
    }

    /// Use a custom column CRP alpha grid
    #[must_use]
    pub fn column_alpha_grid(mut self, grid: Vec<f64>) -> Self {
        self.column_alpha_grid = Some(grid);
        self
    }

    /// Use a custom row CRP alpha grid for every view
    #[must_use]
    pub fn row_alpha_grid(mut self, grid: Vec<f64>) -> Self {
        self.row_alpha_grid = Some(grid);
        self
    }

    /// Set the RNG seed
    #[must_use]
    pub fn seed_from_u64(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the RNG seed from another RNG
    #[must_use]
    pub fn seed_from_rng<R: Rng>(mut self, rng: &mut R) -> Self {
        self.seed = Some(rng.next_u64());
        self
    }

    /// Build the `State`
    pub fn build(self, data: &Matrix<f64>) -> Result<State, BuildStateError> {
        let (n_rows, n_cols) = data.shape();
        validate_data(data, &self.ftypes)?;

        let mut rng = match self.seed {
            Some(seed) => Xoshiro256Plus::seed_from_u64(seed),
            None => Xoshiro256Plus::from_entropy(),
        };

        let grids = self.resolve_hyper_grids(data)?;
        let column_alpha_grid = resolve_alpha_grid(
            self.column_alpha_grid,
            "column crp alpha",
            n_cols,
            self.n_grid,
        )?;
        let row_alpha_grid = resolve_alpha_grid(
            self.row_alpha_grid,
            "row crp alpha",
            n_rows,
            self.n_grid,
        )?;

        let (column_crp_alpha, column_partition, row_partitions, view_alphas) =
            match self.partition {
                Some(ref partition) => {
                    let n_views = partition.validate(n_rows, &self.ftypes)?;
                    let alpha = partition
                        .column_crp_alpha
                        .unwrap_or_else(|| pick(&column_alpha_grid, &mut rng));
                    let view_alphas: Vec<Option<f64>> =
                        match partition.view_alphas {
                            Some(ref alphas) => {
                                alphas.iter().copied().map(Some).collect()
                            }
                            None => vec![None; n_views],
                        };
                    (
                        alpha,
                        partition.column_partition.clone(),
                        partition
                            .row_partitions
                            .iter()
                            .cloned()
                            .map(Some)
                            .collect::<Vec<_>>(),
                        view_alphas,
                    )
                }
                None => {
                    let alpha = pick(&column_alpha_grid, &mut rng);
                    let z = self.column_init.draw_partition(
                        n_cols,
                        alpha,
                        &mut rng,
                    );
                    let n_views = z.iter().max().map_or(0, |&zmax| zmax + 1);
                    (alpha, z, vec![None; n_views], vec![None; n_views])
                }
            };

        let hypers: Vec<Hypers> = match self
            .partition
            .as_ref()
            .and_then(|partition| partition.hypers.clone())
        {
            Some(hypers) => hypers,
            None => grids.iter().map(|g| g.draw_hypers(&mut rng)).collect(),
        };

        let mut view_columns: Vec<Vec<(ViewColumn, Vec<f64>)>> =
            (0..row_partitions.len()).map(|_| Vec::new()).collect();
        grids
            .into_iter()
            .zip(hypers)
            .enumerate()
            .for_each(|(col_ix, (grids, hypers))| {
                view_columns[column_partition[col_ix]].push((
                    ViewColumn::new(col_ix, hypers, grids),
                    data.column(col_ix),
                ));
            });

        let views = view_columns
            .into_iter()
            .zip(row_partitions)
            .zip(view_alphas)
            .enumerate()
            .map(|(view_ix, ((columns, row_partition), alpha))| {
                let builder = match row_partition {
                    Some(z) => view::Builder::from_partition(z),
                    None => view::Builder::new(n_rows).init_mode(self.row_init),
                };
                let builder = match alpha {
                    Some(alpha) => builder.crp_alpha(alpha),
                    None => builder,
                };
                builder
                    .alpha_grid(row_alpha_grid.clone())
                    .columns(columns)
                    .seed_from_rng(&mut rng)
                    .build()
                    .map_err(|err| PartitionError::RowPartition {
                        view_ix,
                        source: Box::new(err),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(State::from_views(
            views,
            n_rows,
            column_crp_alpha,
            column_alpha_grid,
            row_alpha_grid,
        ))
    }

    fn resolve_hyper_grids(
        &self,
        data: &Matrix<f64>,
    ) -> Result<Vec<HyperGrids>, BuildStateError> {
        match self.hyper_grids {
            Some(ref grids) => {
                if grids.len() != self.ftypes.len() {
                    return Err(BuildStateError::GridCount {
                        n_given: grids.len(),
                        n_cols: self.ftypes.len(),
                    });
                }
                grids
                    .iter()
                    .zip(self.ftypes.iter())
                    .enumerate()
                    .try_for_each(|(col_ix, (grids, &ftype))| {
                        let res = if grids.ftype() == ftype {
                            grids.validate()
                        } else {
                            Err(GridError::FTypeMismatch {
                                grids: grids.ftype(),
                                ftype,
                            })
                        };
                        res.map_err(|source| BuildStateError::Grid {
                            col_ix,
                            source,
                        })
                    })?;
                Ok(grids.clone())
            }
            None => self
                .ftypes
                .iter()
                .enumerate()
                .map(|(col_ix, &ftype)| {
                    construct_hyper_grids(
                        ftype,
                        &data.column(col_ix),
                        self.n_grid,
                    )
                    .map_err(|source| BuildStateError::Grid { col_ix, source })
                })
                .collect(),
        }
    }
}

fn resolve_alpha_grid(
    grid: Option<Vec<f64>>,
    name: &str,
    n: usize,
    n_grid: usize,
) -> Result<Vec<f64>, BuildStateError> {
    let grid = grid.unwrap_or_else(|| create_crp_alpha_grid(n, n_grid));
    validate_grid(name, &grid, true).map_err(BuildStateError::AlphaGrid)?;
    Ok(grid)
}

fn validate_data(data: &Matrix<f64>, ftypes: &[FType]) -> Result<(), DataError> {
    let (n_rows, n_cols) = data.shape();
    if n_rows == 0 {
        return Err(DataError::NoRows);
    }
    if n_cols == 0 {
        return Err(DataError::NoColumns);
    }
    if ftypes.len() != n_cols {
        return Err(DataError::FTypeCountMismatch {
            n_cols,
            n_ftypes: ftypes.len(),
        });
    }

    for (row_ix, row) in data.rows().enumerate() {
        for (col_ix, (&value, &ftype)) in row.iter().zip(ftypes).enumerate() {
            if !ftype.accepts(value) {
                return Err(DataError::InvalidValue {
                    row_ix,
                    col_ix,
                    value,
                    ftype,
                });
            }
        }
    }
    Ok(())
}
