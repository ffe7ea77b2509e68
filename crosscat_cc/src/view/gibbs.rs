use crosscat_stats::ln_pflip;
use crosscat_utils::Matrix;
use rand::seq::SliceRandom;
use rand::Rng;

use super::{ClusterId, View};

impl View {
    /// Create an empty cluster with one empty component per column
    pub fn get_new_cluster(&mut self) -> ClusterId {
        let cluster = self.empty_cluster();
        self.clusters.insert(cluster)
    }

    /// Destroy the cluster if it has no rows. Returns whether it was
    /// destroyed.
    pub fn remove_if_empty(&mut self, id: ClusterId) -> bool {
        if self.clusters.get(id).map_or(false, |cluster| cluster.is_empty()) {
            self.clusters.remove(id);
            true
        } else {
            false
        }
    }

    /// Put `row_ix` (with `row` the full data row) into cluster `id`. Returns
    /// the change in data score.
    ///
    /// # Panics
    /// Panics if the row is already in the view
    pub fn insert_row_into(
        &mut self,
        row: &[f64],
        row_ix: usize,
        id: ClusterId,
    ) -> f64 {
        assert!(
            !self.row_to_cluster.contains_key(&row_ix),
            "Row {row_ix} already in view"
        );
        let local = self.local_values(row);
        let delta = self.clusters[id].insert_row(&local, row_ix);
        self.row_to_cluster.insert(row_ix, id);
        self.data_score += delta;
        self.refresh_crp_score();
        delta
    }

    /// Insert a row. With `matching_row` the row joins that row's cluster,
    /// otherwise its cluster is drawn from the Gibbs conditional over the
    /// existing clusters and one new cluster. Returns the change in data
    /// score.
    pub fn insert_row<R: Rng>(
        &mut self,
        row: &[f64],
        matching_row: Option<usize>,
        row_ix: usize,
        rng: &mut R,
    ) -> f64 {
        let id = match matching_row {
            Some(other) => self.cluster_of(other),
            None => {
                let logps = self.row_logps(&self.local_values(row));
                let ix = ln_pflip(&logps, rng);
                // logps are in slot order with the new cluster last
                match self.clusters.keys().get(ix) {
                    Some(&id) => id,
                    None => self.get_new_cluster(),
                }
            }
        };
        self.insert_row_into(row, row_ix, id)
    }

    /// Take `row_ix` out of its cluster, destroying the cluster if that
    /// leaves it empty. Returns the change in data score.
    ///
    /// # Panics
    /// Panics if the row is not in the view
    pub fn remove_row(&mut self, row: &[f64], row_ix: usize) -> f64 {
        let id = self
            .row_to_cluster
            .remove(&row_ix)
            .unwrap_or_else(|| panic!("Row {row_ix} not in view"));
        let local = self.local_values(row);
        let delta = self.clusters[id].remove_row(&local, row_ix);
        self.data_score += delta;
        self.remove_if_empty(id);
        self.refresh_crp_score();
        delta
    }

    /// Gibbs step on the cluster assignment of one row. Returns the change in
    /// data score.
    pub fn transition_z<R: Rng>(
        &mut self,
        row: &[f64],
        row_ix: usize,
        rng: &mut R,
    ) -> f64 {
        self.remove_row(row, row_ix) + self.insert_row(row, None, row_ix, rng)
    }

    /// Gibbs sweep over every row in random order
    pub fn transition_zs<R: Rng>(
        &mut self,
        data: &Matrix<f64>,
        rng: &mut R,
    ) -> f64 {
        let mut row_ixs: Vec<usize> =
            self.row_to_cluster.keys().copied().collect();
        row_ixs.shuffle(rng);

        row_ixs
            .into_iter()
            .map(|row_ix| self.transition_z(data.row(row_ix), row_ix, rng))
            .sum()
    }
}
