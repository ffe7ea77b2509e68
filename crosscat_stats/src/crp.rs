//! Chinese Restaurant Process probabilities and draws
use rand::Rng;

use crate::special::ln_gamma;

/// Log probability of seating an item at a table with `cluster_weight`
/// occupants when `total_weight` items (the newcomer included) are seated.
///
/// A `cluster_weight` of zero denotes the new-table term, whose weight is
/// `alpha`.
///
/// # Example
///
/// ```rust
/// # use crosscat_stats::crp::calc_cluster_crp_logp;
/// // Three items already seated at tables of sizes 2 and 1; seat a fourth
/// let total = 4.0;
/// let alpha = 1.0;
/// let ps: f64 = [2.0, 1.0, 0.0]
///     .iter()
///     .map(|&w| calc_cluster_crp_logp(w, total, alpha).exp())
///     .sum();
/// assert!((ps - 1.0).abs() < 1E-12);
/// ```
#[inline]
pub fn calc_cluster_crp_logp(
    cluster_weight: f64,
    total_weight: f64,
    alpha: f64,
) -> f64 {
    let numer = if cluster_weight == 0.0 {
        alpha
    } else {
        cluster_weight
    };
    numer.ln() - (total_weight - 1.0 + alpha).ln()
}

/// Log probability of the partition with table sizes `counts` under
/// CRP(`alpha`), where `n` is the total number of items.
///
/// With `absolute` false, the `Σ lnΓ(n_k)` term, which does not depend on
/// `alpha`, is dropped. The relative form is only comparable against other
/// relative values over the same partition, e.g. across an alpha grid.
pub fn calc_crp_alpha_conditional(
    counts: &[usize],
    alpha: f64,
    n: usize,
    absolute: bool,
) -> f64 {
    let k = counts.len() as f64;
    let logp = ln_gamma(alpha) + k * alpha.ln() - ln_gamma(alpha + n as f64);
    if absolute {
        logp + counts
            .iter()
            .map(|&ct| ln_gamma(ct as f64))
            .sum::<f64>()
    } else {
        logp
    }
}

/// Evaluate [`calc_crp_alpha_conditional`] at every value in `grid`
pub fn calc_crp_alpha_conditionals(
    grid: &[f64],
    counts: &[usize],
    n: usize,
    absolute: bool,
) -> Vec<f64> {
    grid.iter()
        .map(|&alpha| calc_crp_alpha_conditional(counts, alpha, n, absolute))
        .collect()
}

/// Draw a partition of `n` items by seating them one at a time under
/// CRP(`alpha`). Labels are in order of first occurrence.
pub fn draw_crp_partition<R: Rng>(
    n: usize,
    alpha: f64,
    rng: &mut R,
) -> Vec<usize> {
    let mut counts: Vec<usize> = Vec::new();
    let mut zs: Vec<usize> = Vec::with_capacity(n);

    for i in 0..n {
        let mut r = rng.gen::<f64>() * (i as f64 + alpha);
        let k = counts
            .iter()
            .position(|&ct| {
                r -= ct as f64;
                r < 0.0
            })
            .unwrap_or(counts.len());

        if k == counts.len() {
            counts.push(0);
        }
        counts[k] += 1;
        zs.push(k);
    }
    zs
}
