use std::collections::BTreeMap;

use crosscat_consts::DEFAULT_N_GRID;
use crosscat_stats::grid::{create_crp_alpha_grid, pick, validate_grid};
use crosscat_utils::Arena;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;

use super::{ClusterId, View};
use crate::cluster::Cluster;
use crate::config::InitMode;
use crate::error::PartitionError;
use crate::feature::ViewColumn;

/// Check that `z` assigns `n` items to labels `0..k` with every label used.
/// Returns `k`.
pub fn validate_partition(
    z: &[usize],
    n: usize,
) -> Result<usize, PartitionError> {
    if z.len() != n {
        return Err(PartitionError::WrongLength { len: z.len(), n });
    }
    let k = z.iter().max().map_or(0, |&zmax| zmax + 1);
    let mut used = vec![false; k];
    z.iter().for_each(|&zi| used[zi] = true);
    match used.iter().position(|&u| !u) {
        Some(missing) => Err(PartitionError::LabelGap { missing }),
        None => Ok(k),
    }
}

/// Builds a `View`
pub struct Builder {
    n_rows: usize,
    partition: Option<Vec<usize>>,
    init_mode: InitMode,
    crp_alpha: Option<f64>,
    alpha_grid: Option<Vec<f64>>,
    n_grid: usize,
    columns: Vec<(ViewColumn, Vec<f64>)>,
    seed: Option<u64>,
}

impl Builder {
    /// Start building a view with a given number of rows
    pub fn new(n_rows: usize) -> Self {
        Builder {
            n_rows,
            partition: None,
            init_mode: InitMode::default(),
            crp_alpha: None,
            alpha_grid: None,
            n_grid: DEFAULT_N_GRID,
            columns: Vec::new(),
            seed: None,
        }
    }

    /// Start building a view with a given row partition.
    ///
    /// Note that the number of rows will be the partition length.
    pub fn from_partition(partition: Vec<usize>) -> Self {
        let mut builder = Builder::new(partition.len());
        builder.partition = Some(partition);
        builder
    }

    /// How to draw the row partition if none was given
    #[must_use]
    pub fn init_mode(mut self, init_mode: InitMode) -> Self {
        self.init_mode = init_mode;
        self
    }

    /// Fix the starting CRP alpha instead of drawing it from the grid
    #[must_use]
    pub fn crp_alpha(mut self, alpha: f64) -> Self {
        self.crp_alpha = Some(alpha);
        self
    }

    /// Use a custom CRP alpha grid
    #[must_use]
    pub fn alpha_grid(mut self, grid: Vec<f64>) -> Self {
        self.alpha_grid = Some(grid);
        self
    }

    /// The size of the default CRP alpha grid
    #[must_use]
    pub fn n_grid(mut self, n_grid: usize) -> Self {
        self.n_grid = n_grid;
        self
    }

    /// Add columns along with their full data to the `View`
    #[must_use]
    pub fn columns(mut self, columns: Vec<(ViewColumn, Vec<f64>)>) -> Self {
        self.columns = columns;
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

    /// Build the `View` and consume the builder
    pub fn build(self) -> Result<View, PartitionError> {
        let mut rng = match self.seed {
            Some(seed) => Xoshiro256Plus::seed_from_u64(seed),
            None => Xoshiro256Plus::from_entropy(),
        };

        let crp_alpha_grid = self
            .alpha_grid
            .unwrap_or_else(|| create_crp_alpha_grid(self.n_rows, self.n_grid));
        validate_grid("view alpha", &crp_alpha_grid, true)
            .map_err(PartitionError::AlphaGrid)?;

        let crp_alpha = self
            .crp_alpha
            .unwrap_or_else(|| pick(&crp_alpha_grid, &mut rng));
        if !(crp_alpha.is_finite() && crp_alpha > 0.0) {
            return Err(PartitionError::InvalidAlpha(crp_alpha));
        }

        let partition = match self.partition {
            Some(z) => z,
            None => {
                self.init_mode
                    .draw_partition(self.n_rows, crp_alpha, &mut rng)
            }
        };
        let n_clusters = validate_partition(&partition, self.n_rows)?;

        let mut clusters: Arena<ClusterId, Cluster> = Arena::new();
        let ids: Vec<ClusterId> = (0..n_clusters)
            .map(|_| clusters.insert(Cluster::new(std::iter::empty())))
            .collect();

        let mut row_to_cluster = BTreeMap::new();
        partition.iter().enumerate().for_each(|(row_ix, &z)| {
            clusters[ids[z]].insert_row(&[], row_ix);
            row_to_cluster.insert(row_ix, ids[z]);
        });

        let mut view = View {
            columns: Vec::new(),
            global_to_local: BTreeMap::new(),
            clusters,
            row_to_cluster,
            crp_alpha,
            crp_alpha_grid,
            crp_score: 0.0,
            data_score: 0.0,
        };
        view.refresh_crp_score();

        for (column, data) in self.columns {
            view.insert_col(column, &data);
        }

        Ok(view)
    }
}
