use crosscat_stats::crp::calc_cluster_crp_logp;
use crosscat_stats::ln_pflip;
use crosscat_utils::Matrix;
use rand::Rng;

use super::{State, ViewId};

impl State {
    /// Gibbs step on the view assignment of column `col_ix`, over the
    /// existing views and one singleton view. Returns the change in column
    /// CRP plus data score.
    pub fn transition_feature_gibbs<R: Rng>(
        &mut self,
        col_ix: usize,
        data: &Matrix<f64>,
        rng: &mut R,
    ) -> f64 {
        let values = data.column(col_ix);
        let (delta_rm, column, spare) = self.remove_feature(col_ix, rng);

        // the column being placed counts toward the total
        let total = (self.n_cols() + 1) as f64;
        let ids: Vec<ViewId> = self.views.keys();
        let logps: Vec<f64> = ids
            .iter()
            .map(|&id| {
                let view = &self.views[id];
                // the spare has no columns so it gets the alpha term
                calc_cluster_crp_logp(
                    view.n_cols() as f64,
                    total,
                    self.column_crp_alpha,
                ) + view.score_col(&values, &column.hypers)
            })
            .collect();

        let dest = ids[ln_pflip(&logps, rng)];
        let delta_ins = self.insert_feature(column, &values, dest);
        self.destroy_if_empty(spare);

        delta_rm + delta_ins
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InitMode;
    use crate::state::{Builder, StatePartition};
    use crosscat_stats::FType;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256Plus;

    fn data() -> Matrix<f64> {
        Matrix::from_vecs(
            (0..10)
                .map(|i| {
                    let x = i as f64;
                    vec![x, 2.0 * x + 0.1, ((i * 7) % 5) as f64 - 2.0]
                })
                .collect(),
        )
    }

    #[test]
    fn gibbs_conserves_partitions() {
        let data = data();
        let mut state = Builder::new(vec![FType::Continuous; 3])
            .column_init(InitMode::Apart)
            .seed_from_u64(11)
            .build(&data)
            .unwrap();
        let mut rng = Xoshiro256Plus::seed_from_u64(11);

        for _ in 0..10 {
            for col_ix in 0..3 {
                state.transition_feature_gibbs(col_ix, &data, &mut rng);
                assert_eq!(state.n_cols(), 3);
                assert!(state.validate().is_ok());
            }
        }
    }

    #[test]
    fn single_column_stays_in_one_view() {
        let data = Matrix::from_vecs(vec![vec![1.0], vec![2.0], vec![4.0]]);
        let mut state = Builder::new(vec![FType::Continuous])
            .seed_from_u64(12)
            .build(&data)
            .unwrap();
        let mut rng = Xoshiro256Plus::seed_from_u64(12);
        state.transition_feature_gibbs(0, &data, &mut rng);
        assert_eq!(state.n_views(), 1);
        assert!(state.validate().is_ok());
    }

    #[test]
    fn correlated_column_prefers_its_partner_view() {
        // columns 0 and 2 move together, column 1 does not
        let rows: Vec<Vec<f64>> = (0..20)
            .map(|i| {
                let group = if i < 10 { 0.0 } else { 10.0 };
                let noise = ((i * 37) % 11) as f64 / 11.0;
                let other = ((i * 13) % 20) as f64;
                vec![group + noise, other, group + 1.0 - noise]
            })
            .collect();
        let data = Matrix::from_vecs(rows);

        let row_a: Vec<usize> = (0..20).map(|i| usize::from(i >= 10)).collect();
        let row_b: Vec<usize> = (0..20).map(|i| i % 2).collect();
        let partition = StatePartition {
            column_partition: vec![0, 1, 0],
            row_partitions: vec![row_a, row_b],
            hypers: None,
            view_alphas: None,
            column_crp_alpha: Some(1.0),
        };

        let mut n_a = 0;
        let mut n_b = 0;
        for seed in 0..40 {
            let mut state = Builder::new(vec![FType::Continuous; 3])
                .partition(partition.clone())
                .seed_from_u64(seed)
                .build(&data)
                .unwrap();
            let view_a = state.view_of(0);
            let view_b = state.view_of(1);
            let mut rng = Xoshiro256Plus::seed_from_u64(seed + 100);
            state.transition_feature_gibbs(2, &data, &mut rng);
            let dest = state.view_of(2);
            if dest == view_a {
                n_a += 1;
            } else if dest == view_b {
                n_b += 1;
            }
        }
        assert!(n_a > n_b);
    }
}
