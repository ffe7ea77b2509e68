use rand::Rng;

/// Draw an index from a vector of unnormalized log probabilities using the
/// uniform draw `u` in [0, 1).
///
/// The draw is deterministic given `logps` and `u`.
///
/// # Example
///
/// ```rust
/// # use crosscat_stats::draw_sample_unnormalized;
/// let logps = vec![0.0_f64.ln(), 1.0_f64.ln(), 3.0_f64.ln()];
/// assert_eq!(draw_sample_unnormalized(&logps, 0.1), 1);
/// assert_eq!(draw_sample_unnormalized(&logps, 0.5), 2);
/// ```
///
/// # Panics
/// Panics if `logps` is empty or contains no finite entry
pub fn draw_sample_unnormalized(logps: &[f64], u: f64) -> usize {
    assert!(!logps.is_empty(), "Empty container");
    let maxval = logps.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    assert!(
        maxval.is_finite(),
        "No finite log probabilities in {:?}",
        logps
    );

    let ps: Vec<f64> = logps.iter().map(|&lp| (lp - maxval).exp()).collect();
    let total: f64 = ps.iter().sum();
    inverse_cdf(&ps, u * total)
}

/// Draw an index from a vector of normalized probabilities using the uniform
/// draw `u` in [0, 1).
///
/// # Panics
/// Panics if `ps` is empty
pub fn draw_sample_with_partition(ps: &[f64], u: f64) -> usize {
    assert!(!ps.is_empty(), "Empty container");
    inverse_cdf(ps, u * ps.iter().sum::<f64>())
}

/// Draw an index from unnormalized log probabilities with one uniform draw
/// from `rng`
#[inline]
pub fn ln_pflip<R: Rng>(logps: &[f64], rng: &mut R) -> usize {
    draw_sample_unnormalized(logps, rng.gen::<f64>())
}

fn inverse_cdf(ps: &[f64], r: f64) -> usize {
    let mut acc = 0.0;
    for (ix, &p) in ps.iter().enumerate() {
        acc += p;
        if r < acc {
            return ix;
        }
    }
    // Round-off can leave `r` a hair above the final cumulative sum
    ps.iter().rposition(|&p| p > 0.0).unwrap_or(ps.len() - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256Plus;

    #[test]
    fn unnormalized_draw_is_shift_invariant() {
        let logps = vec![-1.0, -2.0, -0.5];
        let shifted: Vec<f64> = logps.iter().map(|x| x - 1000.0).collect();
        for &u in &[0.0, 0.2, 0.4, 0.6, 0.8, 0.999] {
            assert_eq!(
                draw_sample_unnormalized(&logps, u),
                draw_sample_unnormalized(&shifted, u)
            );
        }
    }

    #[test]
    fn zero_probability_entries_are_never_drawn() {
        let logps = vec![f64::NEG_INFINITY, 0.0, f64::NEG_INFINITY];
        for &u in &[0.0, 0.5, 0.999_999] {
            assert_eq!(draw_sample_unnormalized(&logps, u), 1);
        }
    }

    #[test]
    fn u_near_one_picks_last_positive_entry() {
        let ps = vec![0.5, 0.5, 0.0];
        assert_eq!(draw_sample_with_partition(&ps, 1.0 - 1E-16), 1);
    }

    #[test]
    fn partition_draw_boundaries() {
        let ps = vec![0.25, 0.25, 0.5];
        assert_eq!(draw_sample_with_partition(&ps, 0.0), 0);
        assert_eq!(draw_sample_with_partition(&ps, 0.26), 1);
        assert_eq!(draw_sample_with_partition(&ps, 0.75), 2);
    }

    #[test]
    fn ln_pflip_frequencies_track_weights() {
        let mut rng = Xoshiro256Plus::seed_from_u64(1337);
        let logps = vec![1.0_f64.ln(), 3.0_f64.ln()];
        let n = 10_000;
        let n_ones = (0..n).filter(|_| ln_pflip(&logps, &mut rng) == 1).count();
        let freq = n_ones as f64 / n as f64;
        assert!((freq - 0.75).abs() < 0.02, "freq: {}", freq);
    }

    #[test]
    #[should_panic]
    fn all_neg_infinity_panics() {
        draw_sample_unnormalized(&[f64::NEG_INFINITY, f64::NEG_INFINITY], 0.5);
    }
}
