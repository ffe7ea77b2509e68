use approx::*;
use crosscat_cc::feature::ViewColumn;
use crosscat_cc::view::{Builder, View};
use crosscat_stats::conjugate::{Hypers, NgHypers};
use crosscat_stats::grid::construct_hyper_grids;
use crosscat_stats::FType;
use crosscat_utils::Matrix;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;

fn four_row_view(seed: u64) -> (View, Matrix<f64>) {
    let data = Matrix::from_vecs(vec![
        vec![1.0],
        vec![1.1],
        vec![5.0],
        vec![5.2],
    ]);
    let col = data.column(0);
    let grids = construct_hyper_grids(FType::Continuous, &col, 7).unwrap();
    let hypers = Hypers::Continuous(NgHypers {
        r: 0.01,
        nu: 2.0,
        s: 0.05,
        mu: 3.0,
    });
    let view = Builder::new(4)
        .crp_alpha(1.0)
        .alpha_grid(vec![1.0])
        .columns(vec![(ViewColumn::new(0, hypers, grids), col)])
        .seed_from_u64(seed)
        .build()
        .unwrap();
    (view, data)
}

#[test]
fn nearby_rows_cluster_together() {
    let n_trials = 20;
    let mut n_hits = 0;
    for seed in 0..n_trials {
        let (mut view, data) = four_row_view(seed);
        let mut rng = Xoshiro256Plus::seed_from_u64(seed + 1000);
        for _ in 0..30 {
            view.transition_zs(&data, &mut rng);
        }
        if view.canonical_clustering() == vec![0, 0, 1, 1] {
            n_hits += 1;
        }
    }
    assert!(n_hits as f64 / n_trials as f64 > 0.6);
}

#[test]
fn empty_cluster_cleanup() {
    let (mut view, data) = four_row_view(3);
    let mut rng = Xoshiro256Plus::seed_from_u64(3);

    // move row 3 into a cluster of its own
    view.remove_row(data.row(3), 3);
    let id = view.get_new_cluster();
    view.insert_row_into(data.row(3), 3, id);
    let n_clusters = view.n_clusters();

    view.remove_row(data.row(3), 3);
    view.remove_if_empty(id);
    assert_eq!(view.n_clusters(), n_clusters - 1);
    assert!(!view.cluster_ids().contains(&id));
    assert_eq!(view.get_cluster_counts().iter().sum::<usize>(), 3);

    view.insert_row(data.row(3), None, 3, &mut rng);
    assert_eq!(view.n_rows(), 4);
}

#[test]
fn row_partition_is_conserved_by_transition_z() {
    let (mut view, data) = four_row_view(7);
    let mut rng = Xoshiro256Plus::seed_from_u64(7);
    for _ in 0..25 {
        for row_ix in 0..4 {
            view.transition_z(data.row(row_ix), row_ix, &mut rng);
            let mut rows: Vec<usize> = view
                .cluster_ids()
                .into_iter()
                .flat_map(|id| view.cluster(id).rows().collect::<Vec<_>>())
                .collect();
            rows.sort_unstable();
            assert_eq!(rows, vec![0, 1, 2, 3]);
        }
    }
    let (crp, data_score) = view.recompute_scores();
    assert_relative_eq!(view.crp_score(), crp, epsilon = 1E-8);
    assert_relative_eq!(view.data_score(), data_score, epsilon = 1E-8);
}
