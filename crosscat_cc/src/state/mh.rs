use crosscat_utils::Matrix;
use rand::Rng;

use super::State;

impl State {
    /// Metropolis-Hastings step on the view assignment of column `col_ix`.
    ///
    /// With probability `singleton_prob` the column is proposed into a new
    /// singleton view, otherwise into a uniformly chosen existing view.
    /// Proposing the current view, or a singleton for a column that is
    /// already alone, is the identity move. Returns the change in column CRP
    /// plus data score.
    ///
    /// # Panics
    /// Panics unless `0 < singleton_prob < 1`
    pub fn transition_feature_mh<R: Rng>(
        &mut self,
        col_ix: usize,
        data: &Matrix<f64>,
        singleton_prob: f64,
        rng: &mut R,
    ) -> f64 {
        assert!(
            singleton_prob > 0.0 && singleton_prob < 1.0,
            "MH singleton proposal probability must be in (0, 1), got \
            {singleton_prob}"
        );
        let origin = self.view_of(col_ix);
        let n_views = self.n_views();
        let origin_is_singleton = self.views[origin].n_cols() == 1;

        let to_singleton = rng.gen::<f64>() < singleton_prob;
        let target = if to_singleton {
            None
        } else {
            Some(self.views.keys()[rng.gen_range(0..n_views)])
        };

        if target == Some(origin) || (to_singleton && origin_is_singleton) {
            return 0.0;
        }

        let values = data.column(col_ix);
        let (delta_rm, column, spare) = self.remove_feature(col_ix, rng);
        let dest = target.unwrap_or(spare);

        let delta_ins = self.calc_column_crp_score(Some(dest))
            - self.column_crp_score
            + self.views[dest].score_col(&values, &column.hypers);

        let ln_q_fwd = if to_singleton {
            singleton_prob.ln()
        } else {
            ((1.0 - singleton_prob) / n_views as f64).ln()
        };
        let ln_q_rev = if origin_is_singleton {
            singleton_prob.ln()
        } else {
            let n_views_after = if to_singleton { n_views + 1 } else { n_views };
            ((1.0 - singleton_prob) / n_views_after as f64).ln()
        };

        let ln_ratio = delta_rm + delta_ins + ln_q_rev - ln_q_fwd;
        let accept = rng.gen::<f64>().ln() < ln_ratio;

        let home = if accept { dest } else { origin };
        let delta = delta_rm + self.insert_feature(column, &values, home);
        self.destroy_if_empty(spare);
        delta
    }
}
