/// Three-parameter-logistic (3PL) item response theory kernel.
///
/// This is the numerical core everything else (ability store, item selector,
/// circuit breaker) builds on. Every function here is pure and total: finite
/// for any input in the stated domain, never NaN.
use statrs::distribution::{ContinuousCDF, Normal};

use crate::domain::IrtParams;

/// Probability of a correct response under the 3PL model.
///
/// `x = -a * (theta - b)`; guards the logistic exponent against overflow by
/// saturating at the asymptotes once `|x| > 20`.
pub fn probability(theta: f64, params: &IrtParams) -> f64 {
    let x = -params.a * (theta - params.b);
    let p = if x > 20.0 {
        params.c
    } else if x < -20.0 {
        1.0
    } else {
        params.c + (1.0 - params.c) / (1.0 + x.exp())
    };
    p.clamp(0.0, 1.0)
}

/// Fisher information at `theta` for an item: the item-selection objective.
///
/// Returns `0.0` when `P` is too close to 0 or 1 (`P ∉ (0.01, 0.99)`) since the
/// item carries negligible measurement value there and the naive formula
/// becomes numerically unstable (division by a near-zero `P*Q`).
pub fn fisher_info(theta: f64, params: &IrtParams) -> f64 {
    let p = probability(theta, params);
    if !(0.01..=0.99).contains(&p) {
        return 0.0;
    }
    let q = 1.0 - p;
    let x = -params.a * (theta - params.b);
    let exp_x = x.exp();
    let p_prime = params.a * (1.0 - params.c) * exp_x / (1.0 + exp_x).powi(2);

    (params.a * params.a * p_prime * p_prime) / (p * q)
}

fn standard_normal() -> Normal {
    Normal::new(0.0, 1.0).expect("standard normal distribution parameters are always valid")
}

/// Maps a theta value to a percentile (0-100) via the standard normal CDF.
pub fn theta_to_percentile(theta: f64) -> f64 {
    standard_normal().cdf(theta) * 100.0
}

/// Inverse of [`theta_to_percentile`]: maps a percentile (0-100) back to theta.
pub fn percentile_to_theta(percentile: f64) -> f64 {
    let p = (percentile / 100.0).clamp(1e-9, 1.0 - 1e-9);
    standard_normal().inverse_cdf(p)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn valid_params() -> IrtParams {
        IrtParams::new(1.0, 1.5, 0.25).unwrap()
    }

    #[test]
    fn probability_mid_band_matches_worked_example() {
        // probability(theta=0.5, b=1.0, a=1.5, c=0.25) ~= 0.25 + 0.75 * sigma(-0.75) ~= 0.5290
        let params = IrtParams::new(1.0, 1.5, 0.25).unwrap();
        let p = probability(0.5, &params);
        assert!((p - 0.5290).abs() < 1e-3, "got {p}");
    }

    #[test]
    fn probability_saturates_at_extremes_without_nan() {
        let params = valid_params();
        let p_low = probability(-1000.0, &params);
        let p_high = probability(1000.0, &params);
        assert_eq!(p_low, params.c);
        assert_eq!(p_high, 1.0);
        assert!(p_low.is_finite() && p_high.is_finite());
    }

    #[test]
    fn fisher_info_nonnegative_and_finite_for_extreme_theta() {
        let params = valid_params();
        for theta in [-1000.0, -3.0, 0.0, 3.0, 1000.0] {
            let info = fisher_info(theta, &params);
            assert!(info.is_finite());
            assert!(info >= 0.0);
        }
    }

    #[test]
    fn fisher_info_peaks_near_b() {
        let params = valid_params();
        let at_b = fisher_info(params.b, &params);
        let far_from_b = fisher_info(params.b + 3.0, &params);
        assert!(at_b > far_from_b);
    }

    #[test]
    fn percentile_round_trip() {
        for theta in [-3.0, -1.5, 0.0, 0.73, 2.99] {
            let p = theta_to_percentile(theta);
            let back = percentile_to_theta(p);
            assert!((back - theta).abs() < 1e-6, "theta={theta} back={back}");
        }
    }

    proptest! {
        #[test]
        fn probability_in_bounds(theta in -10.0..10.0f64, b in -3.0..3.0f64, a in 0.01..5.0f64, c in 0.0..0.5f64) {
            let params = IrtParams::new(b, a, c).unwrap();
            let p = probability(theta, &params);
            prop_assert!(p >= params.c - 1e-9 && p <= 1.0 + 1e-9);
            prop_assert!(p.is_finite());
        }

        #[test]
        fn probability_monotone_increasing_in_theta(b in -3.0..3.0f64, a in 0.1..5.0f64, c in 0.0..0.5f64) {
            let params = IrtParams::new(b, a, c).unwrap();
            let p1 = probability(-2.0, &params);
            let p2 = probability(0.0, &params);
            let p3 = probability(2.0, &params);
            prop_assert!(p1 <= p2 + 1e-9);
            prop_assert!(p2 <= p3 + 1e-9);
        }

        #[test]
        fn fisher_info_always_nonneg(theta in -10.0..10.0f64, b in -3.0..3.0f64, a in 0.01..5.0f64, c in 0.0..0.5f64) {
            let params = IrtParams::new(b, a, c).unwrap();
            prop_assert!(fisher_info(theta, &params) >= 0.0);
        }
    }
}
