mod builder;
mod gibbs;
mod mh;

pub use builder::{Builder, StatePartition};

use std::collections::BTreeMap;

use crosscat_stats::conjugate::Hypers;
use crosscat_stats::crp::{
    calc_crp_alpha_conditional, calc_crp_alpha_conditionals,
};
use crosscat_stats::ln_pflip;
use crosscat_utils::{arena_key, Arena, Matrix};
use itertools::Itertools;
use log::debug;
use rand::seq::SliceRandom as _;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::alg::ColAssignAlg;
use crate::config::StateUpdateConfig;
use crate::error::ValidationError;
use crate::feature::ViewColumn;
use crate::transition::StateTransition;
use crate::view::{self, View};

arena_key!(
    /// A stable handle to a `View` within its `State`
    ViewId
);

/// Relative tolerance for running scores against recomputed scores
const SCORE_TOL: f64 = 1E-6;

/// Stores some diagnostic info in the `State` at every iteration
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug, Default)]
#[serde(default)]
pub struct StateDiagnostics {
    /// Data log likelihood
    pub loglike: Vec<f64>,
    /// Column and row partition log probability
    pub logprior: Vec<f64>,
    /// The number of views
    pub n_views: Vec<usize>,
    /// The column CRP alpha
    pub column_crp_alpha: Vec<f64>,
}

/// A cross-categorization state
///
/// The columns are partitioned into views by a CRP with concentration
/// `column_crp_alpha`. Each view partitions the rows on its own.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct State {
    views: Arena<ViewId, View>,
    col_to_view: BTreeMap<usize, ViewId>,
    n_rows: usize,
    column_crp_alpha: f64,
    column_crp_alpha_grid: Vec<f64>,
    /// CRP alpha grid handed to every new view
    row_crp_alpha_grid: Vec<f64>,
    column_crp_score: f64,
    pub diagnostics: StateDiagnostics,
}

impl State {
    /// Assemble a state from views already holding their columns
    pub(crate) fn from_views(
        views: Vec<View>,
        n_rows: usize,
        column_crp_alpha: f64,
        column_crp_alpha_grid: Vec<f64>,
        row_crp_alpha_grid: Vec<f64>,
    ) -> Self {
        let mut arena = Arena::new();
        let mut col_to_view = BTreeMap::new();
        for view in views {
            let col_ixs = view.col_ixs();
            let id = arena.insert(view);
            col_ixs.into_iter().for_each(|col_ix| {
                col_to_view.insert(col_ix, id);
            });
        }

        let mut state = State {
            views: arena,
            col_to_view,
            n_rows,
            column_crp_alpha,
            column_crp_alpha_grid,
            row_crp_alpha_grid,
            column_crp_score: 0.0,
            diagnostics: StateDiagnostics::default(),
        };
        state.column_crp_score = state.calc_column_crp_score(None);
        state
    }

    #[inline]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// The number of columns currently assigned to a view
    #[inline]
    pub fn n_cols(&self) -> usize {
        self.col_to_view.len()
    }

    #[inline]
    pub fn n_views(&self) -> usize {
        self.views.len()
    }

    #[inline]
    pub fn view(&self, id: ViewId) -> &View {
        &self.views[id]
    }

    /// The view holding column `col_ix`
    ///
    /// # Panics
    /// Panics if the column is not assigned
    pub fn view_of(&self, col_ix: usize) -> ViewId {
        *self
            .col_to_view
            .get(&col_ix)
            .unwrap_or_else(|| panic!("Feature {col_ix} not in state"))
    }

    /// View handles ordered by the smallest column index in each view
    pub fn canonical_view_ids(&self) -> Vec<ViewId> {
        self.views
            .iter()
            .map(|(id, view)| {
                let min_col = view.col_ixs().into_iter().min();
                (min_col, id)
            })
            .sorted()
            .map(|(_, id)| id)
            .collect()
    }

    #[inline]
    pub fn column_crp_alpha(&self) -> f64 {
        self.column_crp_alpha
    }

    /// The grid each view draws its row CRP alpha from
    #[inline]
    pub fn row_crp_alpha_grid(&self) -> &[f64] {
        &self.row_crp_alpha_grid
    }

    /// Replace the row CRP alpha grid of the state and of every view
    pub fn set_row_crp_alpha_grid(&mut self, grid: Vec<f64>) {
        self.views
            .values_mut()
            .for_each(|view| view.set_crp_alpha_grid(grid.clone()));
        self.row_crp_alpha_grid = grid;
    }

    #[inline]
    pub fn column_crp_score(&self) -> f64 {
        self.column_crp_score
    }

    /// Sum of the data scores of every view
    pub fn data_score(&self) -> f64 {
        self.views.values().map(|view| view.data_score()).sum()
    }

    /// Sum of the row partition scores of every view
    pub fn view_crp_score(&self) -> f64 {
        self.views.values().map(|view| view.crp_score()).sum()
    }

    /// Joint log probability of the partitions and the data
    pub fn marginal_logp(&self) -> f64 {
        self.column_crp_score + self.view_crp_score() + self.data_score()
    }

    /// The view label of every column, views labeled in canonical order
    pub fn get_column_partition(&self) -> Vec<usize> {
        let labels: BTreeMap<ViewId, usize> = self
            .canonical_view_ids()
            .into_iter()
            .enumerate()
            .map(|(label, id)| (id, label))
            .collect();
        self.col_to_view.values().map(|id| labels[id]).collect()
    }

    /// Canonical row partition of each view, views in canonical order (X_D)
    pub fn get_x_d(&self) -> Vec<Vec<usize>> {
        self.canonical_view_ids()
            .into_iter()
            .map(|id| self.views[id].canonical_clustering())
            .collect()
    }

    /// The complete latent structure, in a form `Builder::partition` accepts
    pub fn get_x_l(&self) -> StatePartition {
        StatePartition {
            column_partition: self.get_column_partition(),
            row_partitions: self.get_x_d(),
            hypers: Some(self.column_hypers()),
            view_alphas: Some(self.view_alphas()),
            column_crp_alpha: Some(self.column_crp_alpha),
        }
    }

    /// The sorted column indices of each view, views in canonical order
    pub fn get_column_groups(&self) -> Vec<Vec<usize>> {
        self.canonical_view_ids()
            .into_iter()
            .map(|id| self.views[id].col_ixs().into_iter().sorted().collect())
            .collect()
    }

    /// The hyperparameters of every column in column order
    pub fn column_hypers(&self) -> Vec<Hypers> {
        self.col_to_view
            .iter()
            .map(|(&col_ix, &id)| *self.views[id].hypers(col_ix))
            .collect()
    }

    /// The row CRP alpha of each view, views in canonical order
    pub fn view_alphas(&self) -> Vec<f64> {
        self.canonical_view_ids()
            .into_iter()
            .map(|id| self.views[id].crp_alpha())
            .collect()
    }

    /// Log posterior predictive of a new (full) row
    pub fn calc_row_predictive_logp(&self, row: &[f64]) -> f64 {
        self.views
            .values()
            .map(|view| view.calc_row_predictive_logp(row))
            .sum()
    }

    /// Redraw every value of an existing row from its clusters' posterior
    /// predictives
    pub fn draw_row<R: Rng>(&self, row_ix: usize, rng: &mut R) -> Vec<f64> {
        assert!(row_ix < self.n_rows, "Row {row_ix} out of bounds");
        let mut row = vec![f64::NAN; self.n_cols()];
        self.views.values().for_each(|view| {
            view.draw_row(row_ix, rng)
                .into_iter()
                .for_each(|(col_ix, x)| row[col_ix] = x);
        });
        row
    }

    /// Draw a brand new row from the posterior predictive
    pub fn get_draw<R: Rng>(&self, rng: &mut R) -> Vec<f64> {
        let mut row = vec![f64::NAN; self.n_cols()];
        self.views.values().for_each(|view| {
            view.draw_new_row(rng)
                .into_iter()
                .for_each(|(col_ix, x)| row[col_ix] = x);
        });
        row
    }

    /// Append a row (all columns, in column order) to every view. With
    /// `matching_row` the new row joins that row's cluster in every view.
    /// Returns the change in data score.
    ///
    /// The caller is responsible for appending the row to its data matrix.
    pub fn insert_row<R: Rng>(
        &mut self,
        row: &[f64],
        matching_row: Option<usize>,
        rng: &mut R,
    ) -> f64 {
        assert_eq!(row.len(), self.n_cols(), "Row length mismatch");
        let row_ix = self.n_rows;
        let delta = self
            .views
            .values_mut()
            .map(|view| view.insert_row(row, matching_row, row_ix, rng))
            .sum();
        self.n_rows += 1;
        delta
    }

    /// Put a column into view `id`. Returns the change in column CRP score
    /// plus the column's data score in that view.
    pub fn insert_feature(
        &mut self,
        column: ViewColumn,
        data: &[f64],
        id: ViewId,
    ) -> f64 {
        let col_ix = column.col_ix;
        assert!(
            !self.col_to_view.contains_key(&col_ix),
            "Feature {col_ix} already in state"
        );
        let before = self.column_crp_score;
        let delta_data = self.views[id].insert_col(column, data);
        self.col_to_view.insert(col_ix, id);
        self.column_crp_score = self.calc_column_crp_score(None);
        self.column_crp_score - before + delta_data
    }

    /// Take a column out of its view. Returns the change in column CRP plus
    /// data score, the column record, and a view with no columns to use as
    /// the singleton candidate: the origin view if it was left empty,
    /// otherwise a new view with a CRP-drawn row partition.
    pub fn remove_feature<R: Rng>(
        &mut self,
        col_ix: usize,
        rng: &mut R,
    ) -> (f64, ViewColumn, ViewId) {
        let id = self
            .col_to_view
            .remove(&col_ix)
            .unwrap_or_else(|| panic!("Feature {col_ix} not in state"));

        let before = self.column_crp_score;
        let (removed, column) = self.views[id].remove_col(col_ix);
        self.column_crp_score = self.calc_column_crp_score(None);
        let delta = self.column_crp_score - before - removed;

        let spare = if self.views[id].is_empty() {
            id
        } else {
            self.new_singleton_view(rng)
        };
        (delta, column, spare)
    }

    /// Reassign every column in random order
    pub fn transition_features<R: Rng>(
        &mut self,
        data: &Matrix<f64>,
        alg: ColAssignAlg,
        singleton_prob: f64,
        rng: &mut R,
    ) -> f64 {
        let mut col_ixs: Vec<usize> = self.col_to_view.keys().copied().collect();
        col_ixs.shuffle(rng);

        col_ixs
            .into_iter()
            .map(|col_ix| match alg {
                ColAssignAlg::Gibbs => {
                    self.transition_feature_gibbs(col_ix, data, rng)
                }
                ColAssignAlg::Mh => self.transition_feature_mh(
                    col_ix,
                    data,
                    singleton_prob,
                    rng,
                ),
            })
            .sum()
    }

    /// Grid Gibbs on the column CRP alpha. Returns the change in
    /// `column_crp_score`.
    pub fn transition_column_crp_alpha<R: Rng>(&mut self, rng: &mut R) -> f64 {
        let counts = self.column_counts(None);
        let logps = calc_crp_alpha_conditionals(
            &self.column_crp_alpha_grid,
            &counts,
            self.n_cols(),
            false,
        );
        self.column_crp_alpha = self.column_crp_alpha_grid[ln_pflip(&logps, rng)];

        let before = self.column_crp_score;
        self.column_crp_score = self.calc_column_crp_score(None);
        self.column_crp_score - before
    }

    /// Gibbs sweep over the rows of every view
    pub fn transition_views_row_partitions<R: Rng>(
        &mut self,
        data: &Matrix<f64>,
        rng: &mut R,
    ) -> f64 {
        self.views
            .values_mut()
            .map(|view| view.transition_zs(data, rng))
            .sum()
    }

    pub fn transition_view_alphas<R: Rng>(&mut self, rng: &mut R) -> f64 {
        self.views
            .values_mut()
            .map(|view| view.transition_crp_alpha(rng))
            .sum()
    }

    pub fn transition_column_hypers<R: Rng>(&mut self, rng: &mut R) -> f64 {
        self.views
            .values_mut()
            .map(|view| view.transition_hypers(rng))
            .sum()
    }

    /// Run each of `transitions` once, in the order given
    pub fn step<R: Rng>(
        &mut self,
        transitions: &[StateTransition],
        data: &Matrix<f64>,
        singleton_prob: f64,
        rng: &mut R,
    ) {
        for transition in transitions {
            match transition {
                StateTransition::ColumnAssignment(alg) => {
                    self.transition_features(data, *alg, singleton_prob, rng);
                }
                StateTransition::RowAssignment => {
                    self.transition_views_row_partitions(data, rng);
                }
                StateTransition::StateAlpha => {
                    self.transition_column_crp_alpha(rng);
                }
                StateTransition::ViewAlphas => {
                    self.transition_view_alphas(rng);
                }
                StateTransition::FeaturePriors => {
                    self.transition_column_hypers(rng);
                }
            }
        }
    }

    /// One sweep of the configured transitions in a random order
    pub fn transition<R: Rng>(
        &mut self,
        data: &Matrix<f64>,
        config: &StateUpdateConfig,
        rng: &mut R,
    ) {
        let mut transitions = config.transitions.clone();
        transitions.shuffle(rng);
        self.step(&transitions, data, config.mh_singleton_prob, rng);
    }

    /// Run `config.n_iters` sweeps, recording diagnostics after each
    pub fn update<R: Rng>(
        &mut self,
        data: &Matrix<f64>,
        config: &StateUpdateConfig,
        rng: &mut R,
    ) {
        for iter in 0..config.n_iters {
            self.transition(data, config, rng);
            self.push_diagnostics();
            debug!(
                "iter {}: {} views, score {:.4}",
                iter,
                self.n_views(),
                self.marginal_logp()
            );
        }
    }

    pub fn push_diagnostics(&mut self) {
        self.diagnostics.loglike.push(self.data_score());
        self.diagnostics
            .logprior
            .push(self.column_crp_score + self.view_crp_score());
        self.diagnostics.n_views.push(self.n_views());
        self.diagnostics
            .column_crp_alpha
            .push(self.column_crp_alpha);
    }

    /// Check the partition invariants and that every running score matches
    /// its value recomputed from the sufficient statistics
    pub fn validate(&self) -> Result<(), ValidationError> {
        let n_cols = self.n_cols();
        for col_ix in 0..n_cols {
            let n_views = self
                .views
                .values()
                .filter(|view| view.contains_col(col_ix))
                .count();
            if n_views != 1 {
                return Err(ValidationError::ColumnAssignment {
                    col_ix,
                    n_views,
                });
            }
        }

        for (view_ix, id) in self.canonical_view_ids().into_iter().enumerate() {
            let view = &self.views[id];
            if view.is_empty() {
                return Err(ValidationError::EmptyView { view_ix });
            }
            let mut seen = vec![0_usize; self.n_rows];
            for cid in view.cluster_ids() {
                let cluster = view.cluster(cid);
                if cluster.is_empty() {
                    return Err(ValidationError::EmptyCluster { view_ix });
                }
                cluster.rows().for_each(|row_ix| {
                    if let Some(ct) = seen.get_mut(row_ix) {
                        *ct += 1;
                    }
                });
            }
            if let Some((row_ix, &n_clusters)) =
                seen.iter().find_position(|&&ct| ct != 1)
            {
                return Err(ValidationError::RowAssignment {
                    view_ix,
                    row_ix,
                    n_clusters,
                });
            }

            let (crp, data) = view.recompute_scores();
            check_drift(&format!("view {view_ix} crp"), view.crp_score(), crp)?;
            check_drift(
                &format!("view {view_ix} data"),
                view.data_score(),
                data,
            )?;
        }

        check_drift(
            "column crp",
            self.column_crp_score,
            self.calc_column_crp_score(None),
        )
    }
}

fn check_drift(
    what: &str,
    running: f64,
    recomputed: f64,
) -> Result<(), ValidationError> {
    let tol = SCORE_TOL * recomputed.abs().max(1.0);
    if (running - recomputed).abs() <= tol {
        Ok(())
    } else {
        Err(ValidationError::ScoreDrift {
            what: what.to_owned(),
            running,
            recomputed,
        })
    }
}

// private state functions
impl State {
    /// Column counts of the non-empty views, with one extra column in view
    /// `extra` if given
    fn column_counts(&self, extra: Option<ViewId>) -> Vec<usize> {
        self.views
            .iter()
            .filter_map(|(id, view)| {
                let n = view.n_cols() + usize::from(Some(id) == extra);
                (n > 0).then_some(n)
            })
            .collect()
    }

    /// Absolute log CRP probability of the column partition
    fn calc_column_crp_score(&self, extra: Option<ViewId>) -> f64 {
        let counts = self.column_counts(extra);
        let n: usize = counts.iter().sum();
        if n == 0 {
            0.0
        } else {
            calc_crp_alpha_conditional(&counts, self.column_crp_alpha, n, true)
        }
    }

    /// A view with no columns, a CRP-drawn row partition and a grid-drawn
    /// alpha
    fn new_singleton_view<R: Rng>(&mut self, rng: &mut R) -> ViewId {
        let view = view::Builder::new(self.n_rows)
            .alpha_grid(self.row_crp_alpha_grid.clone())
            .seed_from_rng(rng)
            .build()
            .expect("grid-drawn alpha and a drawn partition are valid");
        self.views.insert(view)
    }

    fn destroy_if_empty(&mut self, id: ViewId) {
        if self.views.get(id).map_or(false, |view| view.is_empty()) {
            self.views.remove(id);
        }
    }
}
