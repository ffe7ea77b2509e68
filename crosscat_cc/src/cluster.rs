//! A group of rows within a view
use std::collections::BTreeSet;

use crosscat_stats::conjugate::{HyperKey, Hypers};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::component::{ComponentModel, ConjugateModel};

/// A set of rows sharing one component model per column of the parent view.
///
/// Row membership and component contents move in lock-step: every row in the
/// cluster has been inserted into every component. Values passed to the row
/// methods are in the view's local column order.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Cluster {
    rows: BTreeSet<usize>,
    components: Vec<ComponentModel>,
    score: f64,
}

impl Cluster {
    /// An empty cluster with one empty component per entry of `hypers`
    pub fn new<'a>(hypers: impl Iterator<Item = &'a Hypers>) -> Self {
        Cluster {
            rows: BTreeSet::new(),
            components: hypers.map(ComponentModel::new).collect(),
            score: 0.0,
        }
    }

    /// The number of rows
    #[inline]
    pub fn count(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The row indices in ascending order
    #[inline]
    pub fn rows(&self) -> impl Iterator<Item = usize> + '_ {
        self.rows.iter().copied()
    }

    #[inline]
    pub fn contains(&self, row_ix: usize) -> bool {
        self.rows.contains(&row_ix)
    }

    /// The number of columns
    #[inline]
    pub fn n_cols(&self) -> usize {
        self.components.len()
    }

    #[inline]
    pub fn component(&self, local_ix: usize) -> &ComponentModel {
        &self.components[local_ix]
    }

    /// The cached sum of the component scores
    #[inline]
    pub fn marginal_logp(&self) -> f64 {
        self.score
    }

    /// The sum of the component scores, recomputed from statistics
    pub fn score_recomputed(&self) -> f64 {
        self.components
            .iter()
            .map(|cpnt| cpnt.recompute_score())
            .sum()
    }

    /// Add a row and return the change in score
    ///
    /// # Panics
    /// Panics if the row is already in the cluster or if `values` does not
    /// have one entry per column
    pub fn insert_row(&mut self, values: &[f64], row_ix: usize) -> f64 {
        self.check_row_len(values);
        assert!(
            self.rows.insert(row_ix),
            "Row {row_ix} already in cluster"
        );
        let delta: f64 = self
            .components
            .iter_mut()
            .zip(values.iter())
            .map(|(cpnt, &x)| cpnt.insert(x))
            .sum();
        self.score += delta;
        delta
    }

    /// Remove a row and return the change in score
    ///
    /// # Panics
    /// Panics if the row is not in the cluster or if `values` does not have
    /// one entry per column
    pub fn remove_row(&mut self, values: &[f64], row_ix: usize) -> f64 {
        self.check_row_len(values);
        assert!(self.rows.remove(&row_ix), "Row {row_ix} not in cluster");
        let delta: f64 = self
            .components
            .iter_mut()
            .zip(values.iter())
            .map(|(cpnt, &x)| cpnt.remove(x))
            .sum();
        self.score += delta;
        delta
    }

    #[inline]
    fn check_row_len(&self, values: &[f64]) {
        assert_eq!(
            values.len(),
            self.components.len(),
            "Row has {} values but the cluster has {} columns",
            values.len(),
            self.components.len()
        );
    }

    /// Append a component for `column` (the full column, indexed by row) and
    /// replay this cluster's rows through it. Returns the new component's
    /// score.
    pub fn insert_col(&mut self, column: &[f64], hypers: &Hypers) -> f64 {
        let cpnt = ComponentModel::from_values(
            hypers,
            self.rows.iter().map(|&row_ix| &column[row_ix]),
        );
        let delta = cpnt.marginal_logp();
        self.components.push(cpnt);
        self.score += delta;
        delta
    }

    /// Drop the component at `local_ix` and return its score, which the
    /// caller subtracts
    pub fn remove_col(&mut self, local_ix: usize) -> f64 {
        let cpnt = self.components.remove(local_ix);
        let removed = cpnt.marginal_logp();
        self.score -= removed;
        removed
    }

    /// Log posterior predictive of a hypothetical row. Does not mutate.
    ///
    /// # Panics
    /// Panics if `values` does not have one entry per column
    pub fn calc_row_predictive_logp(&self, values: &[f64]) -> f64 {
        self.check_row_len(values);
        self.components
            .iter()
            .zip(values.iter())
            .map(|(cpnt, &x)| cpnt.predictive_logp(x))
            .sum()
    }

    /// The score a component for `column` would have in this cluster. Does
    /// not mutate.
    pub fn calc_column_predictive_logp(
        &self,
        column: &[f64],
        hypers: &Hypers,
    ) -> f64 {
        ComponentModel::from_values(
            hypers,
            self.rows.iter().map(|&row_ix| &column[row_ix]),
        )
        .marginal_logp()
    }

    /// Set the hyperparameters of the component at `local_ix` and return the
    /// change in score
    pub fn set_hypers(&mut self, local_ix: usize, hypers: &Hypers) -> f64 {
        let delta = self.components[local_ix].set_hypers(hypers);
        self.score += delta;
        delta
    }

    pub fn hyper_conditionals(
        &self,
        local_ix: usize,
        key: HyperKey,
        grid: &[f64],
    ) -> Vec<f64> {
        self.components[local_ix].hyper_conditionals(key, grid)
    }

    /// Draw one value per column from the posterior predictive
    pub fn draw_row<R: Rng>(&self, rng: &mut R) -> Vec<f64> {
        self.components.iter().map(|cpnt| cpnt.draw(rng)).collect()
    }
}
