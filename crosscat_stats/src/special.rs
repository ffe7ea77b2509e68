use ::special::Gamma;

/// Natural log of the gamma function
#[inline]
pub fn ln_gamma(x: f64) -> f64 {
    x.ln_gamma().0
}

/// Natural log of the modified Bessel function of the first kind, order 0.
///
/// Uses the polynomial approximations of Abramowitz & Stegun (9.8.1 and
/// 9.8.2). The large-argument branch is computed directly in log space so the
/// result stays finite for concentrations far beyond where `I0` overflows.
pub fn ln_i0(x: f64) -> f64 {
    let ax = x.abs();
    if ax < 3.75 {
        let t = (ax / 3.75).powi(2);
        let poly = 1.0
            + t * (3.515_622_9
                + t * (3.089_942_4
                    + t * (1.206_749_2
                        + t * (0.265_973_2
                            + t * (0.036_076_8 + t * 0.004_581_3)))));
        poly.ln()
    } else {
        let t = 3.75 / ax;
        let poly = 0.398_942_28
            + t * (0.013_285_92
                + t * (0.002_253_19
                    + t * (-0.001_575_65
                        + t * (0.009_162_81
                            + t * (-0.020_577_06
                                + t * (0.026_355_37
                                    + t * (-0.016_476_33
                                        + t * 0.003_923_77)))))));
        ax - 0.5 * ax.ln() + poly.ln()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::*;

    #[test]
    fn ln_gamma_of_integers_is_ln_factorial() {
        assert_relative_eq!(ln_gamma(1.0), 0.0, epsilon = 1E-12);
        assert_relative_eq!(ln_gamma(5.0), 24.0_f64.ln(), epsilon = 1E-12);
    }

    #[test]
    fn ln_i0_at_zero() {
        assert_relative_eq!(ln_i0(0.0), 0.0, epsilon = 1E-12);
    }

    #[test]
    fn ln_i0_small_argument() {
        // I0(1) = 1.2660658777520082
        assert_relative_eq!(
            ln_i0(1.0),
            1.266_065_877_752_008_2_f64.ln(),
            epsilon = 1E-6
        );
    }

    #[test]
    fn ln_i0_large_argument() {
        // I0(5) = 27.239871823604442
        assert_relative_eq!(
            ln_i0(5.0),
            27.239_871_823_604_442_f64.ln(),
            epsilon = 1E-6
        );
    }

    #[test]
    fn ln_i0_is_continuous_across_branches() {
        assert_relative_eq!(ln_i0(3.75 - 1E-9), ln_i0(3.75), epsilon = 1E-6);
    }

    #[test]
    fn ln_i0_is_even() {
        assert_relative_eq!(ln_i0(-2.5), ln_i0(2.5), epsilon = 1E-14);
    }

    #[test]
    fn ln_i0_huge_argument_is_finite() {
        assert!(ln_i0(1E4).is_finite());
    }
}
