use std::collections::BTreeMap;

use crosscat_stats::conjugate::Hypers;
use crosscat_stats::crp::{
    calc_cluster_crp_logp, calc_crp_alpha_conditional,
    calc_crp_alpha_conditionals,
};
use crosscat_stats::ln_pflip;
use crosscat_utils::{arena_key, canonical_partition, logsumexp, Arena, Matrix};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::cluster::Cluster;
use crate::feature::ViewColumn;
use crate::transition::ViewTransition;

mod builder;
mod gibbs;

pub use builder::{validate_partition, Builder};

arena_key!(
    /// A stable handle to a `Cluster` within its `View`
    ClusterId
);

/// A cross-categorization view of columns/features
///
/// A view owns a subset of the columns and one CRP-distributed partition of
/// every row into clusters. Each (column, cluster) pair carries its own
/// conjugate component.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct View {
    /// The columns in local order
    columns: Vec<ViewColumn>,
    /// Maps a dataset column index to its local index
    global_to_local: BTreeMap<usize, usize>,
    clusters: Arena<ClusterId, Cluster>,
    row_to_cluster: BTreeMap<usize, ClusterId>,
    crp_alpha: f64,
    crp_alpha_grid: Vec<f64>,
    /// Absolute log CRP probability of the row partition under `crp_alpha`
    crp_score: f64,
    /// Sum of the cluster scores
    data_score: f64,
}

impl View {
    /// The number of rows in the `View`
    #[inline]
    pub fn n_rows(&self) -> usize {
        self.row_to_cluster.len()
    }

    /// The number of columns in the `View`
    #[inline]
    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    /// returns true if there are no columns
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// The number of clusters
    #[inline]
    pub fn n_clusters(&self) -> usize {
        self.clusters.len()
    }

    /// The dataset indices of the columns in local order
    pub fn col_ixs(&self) -> Vec<usize> {
        self.columns.iter().map(|col| col.col_ix).collect()
    }

    #[inline]
    pub fn columns(&self) -> &[ViewColumn] {
        &self.columns
    }

    #[inline]
    pub fn contains_col(&self, col_ix: usize) -> bool {
        self.global_to_local.contains_key(&col_ix)
    }

    /// The hyperparameters of the column `col_ix`
    ///
    /// # Panics
    /// Panics if the column is not in this view
    pub fn hypers(&self, col_ix: usize) -> &Hypers {
        &self.columns[self.local_ix(col_ix)].hypers
    }

    #[inline]
    pub fn crp_alpha(&self) -> f64 {
        self.crp_alpha
    }

    #[inline]
    pub fn crp_alpha_grid(&self) -> &[f64] {
        &self.crp_alpha_grid
    }

    /// Replace the CRP alpha grid. The current alpha is kept until the next
    /// alpha transition draws from the new grid.
    ///
    /// # Panics
    /// Panics if `grid` is empty
    pub fn set_crp_alpha_grid(&mut self, grid: Vec<f64>) {
        assert!(!grid.is_empty(), "Empty CRP alpha grid");
        self.crp_alpha_grid = grid;
    }

    #[inline]
    pub fn crp_score(&self) -> f64 {
        self.crp_score
    }

    #[inline]
    pub fn data_score(&self) -> f64 {
        self.data_score
    }

    /// Row partition plus data log likelihood
    #[inline]
    pub fn score(&self) -> f64 {
        self.crp_score + self.data_score
    }

    /// The cluster holding `row_ix`
    ///
    /// # Panics
    /// Panics if the row is not in the view
    pub fn cluster_of(&self, row_ix: usize) -> ClusterId {
        *self
            .row_to_cluster
            .get(&row_ix)
            .unwrap_or_else(|| panic!("Row {row_ix} not in view"))
    }

    #[inline]
    pub fn cluster(&self, id: ClusterId) -> &Cluster {
        &self.clusters[id]
    }

    /// Handles of the live clusters in slot order
    pub fn cluster_ids(&self) -> Vec<ClusterId> {
        self.clusters.keys()
    }

    /// The number of rows in each cluster, in slot order
    pub fn get_cluster_counts(&self) -> Vec<usize> {
        self.clusters.values().map(|cluster| cluster.count()).collect()
    }

    /// The row partition with labels in order of first appearance (X_D)
    pub fn canonical_clustering(&self) -> Vec<usize> {
        let zs: Vec<usize> =
            self.row_to_cluster.values().map(|id| id.0).collect();
        canonical_partition(&zs)
    }

    /// Recompute the CRP and data scores from scratch
    pub fn recompute_scores(&self) -> (f64, f64) {
        let crp = self.absolute_crp_score();
        let data = self
            .clusters
            .values()
            .map(|cluster| cluster.score_recomputed())
            .sum();
        (crp, data)
    }

    /// Pick this view's columns out of a full data row
    pub fn local_values(&self, row: &[f64]) -> Vec<f64> {
        self.columns.iter().map(|col| row[col.col_ix]).collect()
    }

    /// Log posterior predictive of a new row (full data row) with the cluster
    /// marginalized out
    pub fn calc_row_predictive_logp(&self, row: &[f64]) -> f64 {
        let local = self.local_values(row);
        logsumexp(&self.row_logps(&local))
    }

    /// Draw new values for the columns of `row_ix` from the posterior
    /// predictive of its cluster. Returns (column index, value) pairs.
    pub fn draw_row<R: Rng>(
        &self,
        row_ix: usize,
        rng: &mut R,
    ) -> Vec<(usize, f64)> {
        let id = self.cluster_of(row_ix);
        self.col_ixs()
            .into_iter()
            .zip(self.clusters[id].draw_row(rng))
            .collect()
    }

    /// Draw values for the columns of a brand new row: first its cluster from
    /// the CRP, then the values
    pub fn draw_new_row<R: Rng>(&self, rng: &mut R) -> Vec<(usize, f64)> {
        let total = (self.n_rows() + 1) as f64;
        let mut logps: Vec<f64> = self
            .clusters
            .values()
            .map(|cluster| {
                calc_cluster_crp_logp(
                    cluster.count() as f64,
                    total,
                    self.crp_alpha,
                )
            })
            .collect();
        logps.push(calc_cluster_crp_logp(0.0, total, self.crp_alpha));

        let ix = ln_pflip(&logps, rng);
        let values = match self.clusters.values().nth(ix) {
            Some(cluster) => cluster.draw_row(rng),
            None => self.empty_cluster().draw_row(rng),
        };
        self.col_ixs().into_iter().zip(values).collect()
    }

    /// Perform MCMC transitions on the view
    pub fn step<R: Rng>(
        &mut self,
        transitions: &[ViewTransition],
        data: &Matrix<f64>,
        rng: &mut R,
    ) {
        for transition in transitions {
            match transition {
                ViewTransition::RowAssignment => {
                    self.transition_zs(data, rng);
                }
                ViewTransition::Alpha => {
                    self.transition_crp_alpha(rng);
                }
                ViewTransition::FeaturePriors => {
                    self.transition_hypers(rng);
                }
            }
        }
    }

    /// The default MCMC transitions
    pub fn default_transitions() -> Vec<ViewTransition> {
        vec![
            ViewTransition::RowAssignment,
            ViewTransition::Alpha,
            ViewTransition::FeaturePriors,
        ]
    }

    /// Update the state of the `View` by running the `View` MCMC transitions
    /// `n_iter` times.
    #[inline]
    pub fn update<R: Rng>(
        &mut self,
        n_iters: usize,
        transitions: &[ViewTransition],
        data: &Matrix<f64>,
        rng: &mut R,
    ) {
        (0..n_iters).for_each(|_| self.step(transitions, data, rng))
    }

    /// Grid Gibbs on the row CRP alpha. Returns the change in `crp_score`.
    ///
    /// The alpha conditional only needs to be comparable across the grid, so
    /// the relative form is used for the draw; the stored score is absolute.
    pub fn transition_crp_alpha<R: Rng>(&mut self, rng: &mut R) -> f64 {
        let counts = self.get_cluster_counts();
        let logps = calc_crp_alpha_conditionals(
            &self.crp_alpha_grid,
            &counts,
            self.n_rows(),
            false,
        );
        let ix = ln_pflip(&logps, rng);
        self.crp_alpha = self.crp_alpha_grid[ix];

        let before = self.crp_score;
        self.refresh_crp_score();
        self.crp_score - before
    }

    /// Grid Gibbs on each hyperparameter of column `col_ix`, one at a time.
    /// Returns the change in `data_score`.
    pub fn transition_hypers_i<R: Rng>(
        &mut self,
        col_ix: usize,
        rng: &mut R,
    ) -> f64 {
        let local = self.local_ix(col_ix);
        let mut delta = 0.0;

        for &key in self.columns[local].grids.keys() {
            let grid = self.columns[local].grids.grid(key);
            let logps = self.clusters.values().fold(
                vec![0.0; grid.len()],
                |mut acc, cluster| {
                    cluster
                        .hyper_conditionals(local, key, grid)
                        .iter()
                        .zip(acc.iter_mut())
                        .for_each(|(lp, a)| *a += lp);
                    acc
                },
            );
            let value = grid[ln_pflip(&logps, rng)];

            self.columns[local].hypers.set(key, value);
            let hypers = self.columns[local].hypers;
            delta += self
                .clusters
                .values_mut()
                .map(|cluster| cluster.set_hypers(local, &hypers))
                .sum::<f64>();
        }

        self.data_score += delta;
        delta
    }

    /// Resample the hyperparameters of every column
    pub fn transition_hypers<R: Rng>(&mut self, rng: &mut R) -> f64 {
        self.col_ixs()
            .into_iter()
            .map(|col_ix| self.transition_hypers_i(col_ix, rng))
            .sum()
    }

    /// Insert a column given its full data. Returns the change in data score.
    ///
    /// # Panics
    /// Panics if the column is already in the view
    pub fn insert_col(&mut self, column: ViewColumn, data: &[f64]) -> f64 {
        let col_ix = column.col_ix;
        assert!(
            !self.global_to_local.contains_key(&col_ix),
            "Feature {} already in view",
            col_ix
        );
        let hypers = column.hypers;
        let delta: f64 = self
            .clusters
            .values_mut()
            .map(|cluster| cluster.insert_col(data, &hypers))
            .sum();

        self.columns.push(column);
        self.global_to_local.insert(col_ix, self.columns.len() - 1);
        self.data_score += delta;
        delta
    }

    /// Remove the column `col_ix` and return its data score, which has been
    /// subtracted from `data_score`, along with the column record
    ///
    /// # Panics
    /// Panics if the column is not in the view
    pub fn remove_col(&mut self, col_ix: usize) -> (f64, ViewColumn) {
        let local = self
            .global_to_local
            .remove(&col_ix)
            .unwrap_or_else(|| panic!("Feature {col_ix} not in view"));

        let removed: f64 = self
            .clusters
            .values_mut()
            .map(|cluster| cluster.remove_col(local))
            .sum();

        let column = self.columns.remove(local);
        self.global_to_local.values_mut().for_each(|ix| {
            if *ix > local {
                *ix -= 1;
            }
        });
        self.data_score -= removed;
        (removed, column)
    }

    /// The data score a column would have under this view's row partition
    pub fn score_col(&self, data: &[f64], hypers: &Hypers) -> f64 {
        self.clusters
            .values()
            .map(|cluster| cluster.calc_column_predictive_logp(data, hypers))
            .sum()
    }
}

// private view functions
impl View {
    fn local_ix(&self, col_ix: usize) -> usize {
        *self
            .global_to_local
            .get(&col_ix)
            .unwrap_or_else(|| panic!("Feature {col_ix} not in view"))
    }

    /// A cluster with no rows and one empty component per column
    fn empty_cluster(&self) -> Cluster {
        Cluster::new(self.columns.iter().map(|col| &col.hypers))
    }

    fn absolute_crp_score(&self) -> f64 {
        let n = self.n_rows();
        if n == 0 {
            0.0
        } else {
            calc_crp_alpha_conditional(
                &self.get_cluster_counts(),
                self.crp_alpha,
                n,
                true,
            )
        }
    }

    fn refresh_crp_score(&mut self) {
        self.crp_score = self.absolute_crp_score();
    }

    /// CRP weight plus predictive log likelihood of `local` values for each
    /// cluster in slot order, then for a new cluster
    fn row_logps(&self, local: &[f64]) -> Vec<f64> {
        let total = (self.n_rows() + 1) as f64;
        let mut logps: Vec<f64> = self
            .clusters
            .values()
            .map(|cluster| {
                calc_cluster_crp_logp(
                    cluster.count() as f64,
                    total,
                    self.crp_alpha,
                ) + cluster.calc_row_predictive_logp(local)
            })
            .collect();

        logps.push(
            calc_cluster_crp_logp(0.0, total, self.crp_alpha)
                + self.empty_cluster().calc_row_predictive_logp(local),
        );
        logps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::*;
    use crosscat_stats::conjugate::NgHypers;
    use crosscat_stats::grid::construct_hyper_grids;
    use crosscat_stats::FType;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256Plus;

    const TOL: f64 = 1E-8;

    fn ng_column(col_ix: usize, data: &[f64]) -> ViewColumn {
        let grids = construct_hyper_grids(FType::Continuous, data, 5).unwrap();
        let hypers = Hypers::Continuous(NgHypers {
            r: 1.0,
            nu: 1.0,
            s: 1.0,
            mu: 0.0,
        });
        ViewColumn::new(col_ix, hypers, grids)
    }

    fn two_col_view(partition: Vec<usize>) -> (View, Matrix<f64>) {
        let data = Matrix::from_vecs(vec![
            vec![1.0, 10.0],
            vec![1.1, 11.0],
            vec![5.0, -3.0],
            vec![5.2, -2.5],
        ]);
        let cols: Vec<(ViewColumn, Vec<f64>)> = (0..2)
            .map(|j| {
                let col = data.column(j);
                (ng_column(j, &col), col)
            })
            .collect();
        let view = Builder::from_partition(partition)
            .crp_alpha(1.0)
            .columns(cols)
            .seed_from_u64(1337)
            .build()
            .unwrap();
        (view, data)
    }

    fn assert_scores_consistent(view: &View) {
        let (crp, data) = view.recompute_scores();
        assert_relative_eq!(view.crp_score(), crp, epsilon = TOL);
        assert_relative_eq!(view.data_score(), data, epsilon = TOL);
    }

    #[test]
    fn built_view_has_consistent_scores() {
        let (view, _) = two_col_view(vec![0, 0, 1, 1]);
        assert_eq!(view.n_rows(), 4);
        assert_eq!(view.n_cols(), 2);
        assert_eq!(view.n_clusters(), 2);
        assert_eq!(view.canonical_clustering(), vec![0, 0, 1, 1]);
        assert_scores_consistent(&view);
    }

    #[test]
    fn remove_then_insert_col_round_trips() {
        let (mut view, data) = two_col_view(vec![0, 1, 0, 1]);
        let before = view.data_score();
        let (removed, col) = view.remove_col(0);
        assert_eq!(view.col_ixs(), vec![1]);
        assert_scores_consistent(&view);
        let inserted = view.insert_col(col, &data.column(0));
        assert_relative_eq!(removed, inserted, epsilon = TOL);
        assert_relative_eq!(view.data_score(), before, epsilon = TOL);
        assert_eq!(view.col_ixs(), vec![1, 0]);
        assert_scores_consistent(&view);
    }

    #[test]
    fn score_col_predicts_insert_col() {
        let (mut view, data) = two_col_view(vec![0, 0, 1, 1]);
        let (_, col) = view.remove_col(1);
        let column = data.column(1);
        let predicted = view.score_col(&column, &col.hypers);
        assert_relative_eq!(
            predicted,
            view.insert_col(col, &column),
            epsilon = TOL
        );
    }

    #[test]
    #[should_panic]
    fn inserting_a_present_column_panics() {
        let (mut view, data) = two_col_view(vec![0, 0, 1, 1]);
        let col = ng_column(0, &data.column(0));
        view.insert_col(col, &data.column(0));
    }

    #[test]
    fn transition_crp_alpha_keeps_score_absolute() {
        let (mut view, _) = two_col_view(vec![0, 0, 1, 2]);
        let mut rng = Xoshiro256Plus::seed_from_u64(8);
        for _ in 0..10 {
            view.transition_crp_alpha(&mut rng);
            assert!(view.crp_alpha_grid().contains(&view.crp_alpha()));
            assert_scores_consistent(&view);
        }
    }

    #[test]
    fn transition_hypers_draws_from_grids() {
        let (mut view, _) = two_col_view(vec![0, 0, 1, 1]);
        let mut rng = Xoshiro256Plus::seed_from_u64(9);
        view.transition_hypers(&mut rng);
        for col in view.columns() {
            for &key in col.grids.keys() {
                assert!(col.grids.grid(key).contains(&col.hypers.get(key)));
            }
        }
        assert_scores_consistent(&view);
    }

    #[test]
    fn row_predictive_matches_gibbs_normalizer() {
        let (view, _) = two_col_view(vec![0, 0, 1, 1]);
        let row = vec![1.05, 10.5];
        let lp = view.calc_row_predictive_logp(&row);
        let local = view.local_values(&row);
        assert_relative_eq!(lp, logsumexp(&view.row_logps(&local)), epsilon = TOL);
        assert!(lp.is_finite());
    }

    #[test]
    fn draw_new_row_covers_every_column() {
        let (view, _) = two_col_view(vec![0, 0, 1, 1]);
        let mut rng = Xoshiro256Plus::seed_from_u64(10);
        let row = view.draw_new_row(&mut rng);
        assert_eq!(row.iter().map(|(ix, _)| *ix).collect::<Vec<_>>(), vec![0, 1]);
        assert!(row.iter().all(|(_, x)| x.is_finite()));
    }

    #[test]
    fn update_preserves_partition_and_scores() {
        let (mut view, data) = two_col_view(vec![0, 1, 2, 3]);
        let mut rng = Xoshiro256Plus::seed_from_u64(11);
        view.update(5, &View::default_transitions(), &data, &mut rng);
        assert_eq!(view.n_rows(), 4);
        assert_eq!(view.get_cluster_counts().iter().sum::<usize>(), 4);
        assert_scores_consistent(&view);
    }
}
