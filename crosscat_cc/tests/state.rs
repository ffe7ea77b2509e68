use crosscat_cc::alg::ColAssignAlg;
use crosscat_cc::config::{InitMode, StateUpdateConfig};
use crosscat_cc::state::{Builder, State, StatePartition};
use crosscat_cc::transition::StateTransition;
use crosscat_stats::rv::dist::Gaussian;
use crosscat_stats::rv::traits::Rv;
use crosscat_stats::conjugate::{Hypers, NgHypers, NgStats, SuffStat};
use crosscat_stats::crp::calc_crp_alpha_conditional;
use crosscat_stats::FType;
use crosscat_utils::{canonical_partition, logsumexp, Matrix};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;

fn gen_gauss_data<R: Rng>(n_rows: usize, n_cols: usize, rng: &mut R) -> Matrix<f64> {
    let gauss = Gaussian::new(0.0, 1.0).unwrap();
    let rows = (0..n_rows)
        .map(|_| (0..n_cols).map(|_| gauss.draw(rng)).collect())
        .collect();
    Matrix::from_vecs(rows)
}

fn gen_all_gauss_state<R: Rng>(
    n_rows: usize,
    n_cols: usize,
    rng: &mut R,
) -> (State, Matrix<f64>) {
    let data = gen_gauss_data(n_rows, n_cols, rng);
    let state = Builder::new(vec![FType::Continuous; n_cols])
        .seed_from_rng(rng)
        .build(&data)
        .unwrap();
    (state, data)
}

#[test]
fn smoke() {
    let mut rng = Xoshiro256Plus::seed_from_u64(1337);
    let (mut state, data) = gen_all_gauss_state(10, 2, &mut rng);

    assert_eq!(state.n_rows(), 10);
    assert_eq!(state.n_cols(), 2);

    let config = StateUpdateConfig::new().with_iters(100);
    state.update(&data, &config, &mut rng);
    assert!(state.validate().is_ok());
}

fn run_with_alg(alg: ColAssignAlg, seed: u64) {
    let mut rng = Xoshiro256Plus::seed_from_u64(seed);
    let (mut state, data) = gen_all_gauss_state(30, 8, &mut rng);

    let config = StateUpdateConfig::new()
        .with_iters(20)
        .with_transitions(vec![
            StateTransition::ColumnAssignment(alg),
            StateTransition::StateAlpha,
            StateTransition::RowAssignment,
            StateTransition::ViewAlphas,
            StateTransition::FeaturePriors,
        ]);

    for _ in 0..config.n_iters {
        state.transition(&data, &config, &mut rng);
        assert_eq!(state.n_cols(), 8);
        for row_partition in state.get_x_d() {
            assert_eq!(row_partition.len(), 30);
        }
        assert!(state.validate().is_ok());
    }
}

#[test]
fn gibbs_sweeps_keep_state_valid() {
    run_with_alg(ColAssignAlg::Gibbs, 1);
}

#[test]
fn mh_sweeps_keep_state_valid() {
    run_with_alg(ColAssignAlg::Mh, 2);
}

#[test]
fn identical_seeds_give_identical_chains() {
    let run = || {
        let mut rng = Xoshiro256Plus::seed_from_u64(77);
        let (mut state, data) = gen_all_gauss_state(20, 4, &mut rng);
        state.update(&data, &StateUpdateConfig::new().with_iters(10), &mut rng);
        (state.get_x_l(), state.marginal_logp())
    };
    let (xl_a, logp_a) = run();
    let (xl_b, logp_b) = run();
    assert_eq!(xl_a, xl_b);
    assert_eq!(logp_a, logp_b);
}

#[test]
fn mixed_types_run() {
    let mut rng = Xoshiro256Plus::seed_from_u64(5);
    let gauss = Gaussian::new(0.0, 1.0).unwrap();
    let rows: Vec<Vec<f64>> = (0..25)
        .map(|i| {
            let x: f64 = gauss.draw(&mut rng);
            let cat = (i % 3) as f64;
            let angle = if i == 4 { f64::NAN } else { (x + 3.0) % 6.0 };
            vec![x, cat, angle]
        })
        .collect();
    let data = Matrix::from_vecs(rows);
    let mut state = Builder::new(vec![
        FType::Continuous,
        FType::Multinomial { k: 3 },
        FType::Cyclic,
    ])
    .column_init(InitMode::Together)
    .row_init(InitMode::Apart)
    .n_grid(11)
    .seed_from_u64(5)
    .build(&data)
    .unwrap();

    state.update(&data, &StateUpdateConfig::new().with_iters(15), &mut rng);
    assert!(state.validate().is_ok());
    assert!(state.marginal_logp().is_finite());
    assert_eq!(state.diagnostics.loglike.len(), 15);
}

#[test]
fn dependent_columns_share_a_view() {
    // columns 0 and 1 are noisy copies, column 2 is independent
    let mut rng = Xoshiro256Plus::seed_from_u64(2024);
    let gauss = Gaussian::new(0.0, 0.1).unwrap();
    let rows: Vec<Vec<f64>> = (0..60)
        .map(|i| {
            let center = if i % 2 == 0 { -3.0 } else { 3.0 };
            let noise: f64 = gauss.draw(&mut rng);
            let other = if i < 30 { -3.0 } else { 3.0 };
            vec![
                center + Rv::<f64>::draw(&gauss, &mut rng),
                center + noise,
                other + Rv::<f64>::draw(&gauss, &mut rng),
            ]
        })
        .collect();
    let data = Matrix::from_vecs(rows);

    let mut together = 0;
    for seed in 0..5 {
        let mut state = Builder::new(vec![FType::Continuous; 3])
            .column_init(InitMode::Apart)
            .seed_from_u64(seed)
            .build(&data)
            .unwrap();
        state.update(&data, &StateUpdateConfig::new().with_iters(50), &mut rng);
        if state.view_of(0) == state.view_of(1) {
            together += 1;
        }
    }
    assert!(together >= 4);
}

// Exact posterior over column partitions for a tiny table, with every
// hyperparameter and CRP alpha held fixed so only the partitions move.
mod stationary {
    use super::*;

    const ALPHA: f64 = 1.0;
    const N_SWEEPS: usize = 40_000;
    const N_BURN: usize = 500;
    const TOL: f64 = 0.025;

    fn hypers() -> NgHypers {
        NgHypers {
            r: 1.0,
            nu: 2.0,
            s: 1.0,
            mu: 0.0,
        }
    }

    fn data() -> Matrix<f64> {
        Matrix::from_vecs(vec![
            vec![-1.0, -0.9, 0.5],
            vec![-0.8, -1.1, -0.3],
            vec![1.1, 1.0, -0.6],
            vec![0.9, 1.2, 0.4],
        ])
    }

    /// Every partition of `n` items with labels in order of first occurrence
    fn set_partitions(n: usize) -> Vec<Vec<usize>> {
        (0..n).fold(vec![vec![]], |zs, _| {
            zs.into_iter()
                .flat_map(|z: Vec<usize>| {
                    let k = z.iter().max().map_or(0, |&zmax| zmax + 1);
                    (0..=k).map(move |label| {
                        let mut next = z.clone();
                        next.push(label);
                        next
                    })
                })
                .collect()
        })
    }

    fn counts(z: &[usize]) -> Vec<usize> {
        let k = z.iter().max().map_or(0, |&zmax| zmax + 1);
        let mut cts = vec![0; k];
        z.iter().for_each(|&zi| cts[zi] += 1);
        cts
    }

    fn ln_crp(z: &[usize]) -> f64 {
        calc_crp_alpha_conditional(&counts(z), ALPHA, z.len(), true)
    }

    /// Log marginal of a view holding `col_ixs`, summed over row partitions
    fn ln_view_marginal(data: &Matrix<f64>, col_ixs: &[usize]) -> f64 {
        let h = hypers();
        let n_rows = data.n_rows();
        let terms: Vec<f64> = set_partitions(n_rows)
            .iter()
            .map(|z| {
                let k = counts(z).len();
                let ln_data: f64 = col_ixs
                    .iter()
                    .map(|&col_ix| {
                        (0..k)
                            .map(|cluster| {
                                let mut stat = NgStats::empty(&h);
                                (0..n_rows)
                                    .filter(|&row_ix| z[row_ix] == cluster)
                                    .for_each(|row_ix| {
                                        stat.observe(data[(row_ix, col_ix)])
                                    });
                                stat.ln_m(&h)
                            })
                            .sum::<f64>()
                    })
                    .sum();
                ln_crp(z) + ln_data
            })
            .collect();
        logsumexp(&terms)
    }

    fn exact_posterior(
        data: &Matrix<f64>,
        partitions: &[Vec<usize>],
    ) -> Vec<f64> {
        let logps: Vec<f64> = partitions
            .iter()
            .map(|c| {
                let n_views = counts(c).len();
                let ln_views: f64 = (0..n_views)
                    .map(|v| {
                        let col_ixs: Vec<usize> = (0..c.len())
                            .filter(|&col_ix| c[col_ix] == v)
                            .collect();
                        ln_view_marginal(data, &col_ixs)
                    })
                    .sum();
                ln_crp(c) + ln_views
            })
            .collect();
        let norm = logsumexp(&logps);
        logps.iter().map(|lp| (lp - norm).exp()).collect()
    }

    fn visit_frequencies(
        alg: ColAssignAlg,
        data: &Matrix<f64>,
        partitions: &[Vec<usize>],
        seed: u64,
    ) -> Vec<f64> {
        let n_cols = data.n_cols();
        let start = StatePartition {
            column_partition: (0..n_cols).collect(),
            row_partitions: vec![vec![0; data.n_rows()]; n_cols],
            hypers: Some(vec![Hypers::Continuous(hypers()); n_cols]),
            view_alphas: Some(vec![ALPHA; n_cols]),
            column_crp_alpha: Some(ALPHA),
        };
        let mut state = Builder::new(vec![FType::Continuous; n_cols])
            .partition(start)
            .column_alpha_grid(vec![ALPHA])
            .row_alpha_grid(vec![ALPHA])
            .seed_from_u64(seed)
            .build(data)
            .unwrap();
        let mut rng = Xoshiro256Plus::seed_from_u64(seed);
        let transitions = [
            StateTransition::ColumnAssignment(alg),
            StateTransition::RowAssignment,
        ];

        let mut visits = vec![0_usize; partitions.len()];
        for sweep in 0..(N_BURN + N_SWEEPS) {
            state.step(&transitions, data, 0.5, &mut rng);
            if sweep >= N_BURN {
                let c = canonical_partition(&state.get_column_partition());
                let ix = partitions.iter().position(|p| *p == c).unwrap();
                visits[ix] += 1;
            }
        }
        assert!(state.validate().is_ok());
        visits
            .iter()
            .map(|&ct| ct as f64 / N_SWEEPS as f64)
            .collect()
    }

    fn check_kernel(alg: ColAssignAlg, seed: u64) {
        let data = data();
        let partitions = set_partitions(data.n_cols());
        assert_eq!(partitions.len(), 5);

        let exact = exact_posterior(&data, &partitions);
        let freqs = visit_frequencies(alg, &data, &partitions, seed);
        for ((c, p), f) in partitions.iter().zip(exact.iter()).zip(freqs.iter()) {
            assert!(
                (p - f).abs() < TOL,
                "{alg:?}: partition {c:?} exact {p:.4}, visited {f:.4}"
            );
        }
    }

    #[test]
    fn set_partitions_of_three() {
        assert_eq!(
            set_partitions(3),
            vec![
                vec![0, 0, 0],
                vec![0, 0, 1],
                vec![0, 1, 0],
                vec![0, 1, 1],
                vec![0, 1, 2],
            ]
        );
        assert_eq!(set_partitions(4).len(), 15);
    }

    #[test]
    fn gibbs_column_kernel_targets_exact_posterior() {
        check_kernel(ColAssignAlg::Gibbs, 1001);
    }

    #[test]
    fn mh_column_kernel_targets_exact_posterior() {
        check_kernel(ColAssignAlg::Mh, 1002);
    }
}
