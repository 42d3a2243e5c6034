//! Goodness-of-fit indicators for paired predicted/observed series.
//!
//! All sums use compensated (Kahan) accumulation so that long series of
//! similar magnitude do not drift with input order. Degenerate denominators
//! never fail: NSE and RSR become `+inf` when the observations have no spread
//! (which always happens for a single point).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Indicators {
    pub count: u32,
    pub rmse: f64,
    pub nse: f64,
    pub rsr: f64,
}

impl Indicators {
    pub const fn empty() -> Self {
        Self {
            count: 0,
            rmse: f64::NAN,
            nse: f64::NAN,
            rsr: f64::NAN,
        }
    }
}

/// Compute count, RMSE, NSE and RSR. Returns `None` when the two series have
/// different lengths.
pub fn compute_indicators(predicted: &[f64], observed: &[f64]) -> Option<Indicators> {
    if predicted.len() != observed.len() {
        return None;
    }
    if observed.is_empty() {
        return Some(Indicators::empty());
    }

    let count = observed.len();
    let squared_errors = predicted
        .iter()
        .zip(observed)
        .map(|(predicted, observed)| {
            let residual = observed - predicted;
            residual * residual
        })
        .collect::<Vec<_>>();
    let sum_squared_error = stable_sum(&squared_errors);
    let rmse = (sum_squared_error / count as f64).sqrt();

    let spread = sum_squared_deviation(observed);
    let nse = if spread == 0.0 {
        f64::INFINITY
    } else {
        1.0 - sum_squared_error / spread
    };

    let deviation = sample_standard_deviation_from_spread(spread, count);
    let rsr = if deviation == 0.0 || deviation.is_nan() {
        f64::INFINITY
    } else {
        rmse / deviation
    };

    Some(Indicators {
        count: u32::try_from(count).unwrap_or(u32::MAX),
        rmse,
        nse,
        rsr,
    })
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(stable_sum(values) / values.len() as f64)
}

/// Sample (n - 1) standard deviation. Zero for fewer than two values.
pub fn sample_standard_deviation(values: &[f64]) -> f64 {
    sample_standard_deviation_from_spread(sum_squared_deviation(values), values.len())
}

pub fn stable_sum(values: &[f64]) -> f64 {
    let mut sum = 0.0;
    let mut correction = 0.0;

    for &value in values {
        kahan_add(&mut sum, &mut correction, value);
    }

    sum
}

fn sum_squared_deviation(values: &[f64]) -> f64 {
    let Some(mean) = mean(values) else {
        return 0.0;
    };
    let mut sum = 0.0;
    let mut correction = 0.0;
    for &value in values {
        let deviation = value - mean;
        kahan_add(&mut sum, &mut correction, deviation * deviation);
    }
    sum
}

fn sample_standard_deviation_from_spread(spread: f64, count: usize) -> f64 {
    if count < 2 {
        return 0.0;
    }
    (spread / (count - 1) as f64).sqrt()
}

fn kahan_add(sum: &mut f64, correction: &mut f64, value: f64) {
    let corrected = value - *correction;
    let next = *sum + corrected;
    *correction = (next - *sum) - corrected;
    *sum = next;
}

#[cfg(test)]
mod tests {
    use super::{compute_indicators, mean, sample_standard_deviation, stable_sum};

    #[test]
    fn stable_sum_reduces_order_loss_for_large_and_small_values() {
        let input = [1.0e16, 1.0, -1.0e16];
        assert_eq!(stable_sum(&input), 0.0);
    }

    #[test]
    fn indicators_match_reference_values() {
        let predicted = [11.0, 52.0, 11.5];
        let observed = [15.2, 1.7, 10.6];

        let indicators = compute_indicators(&predicted, &observed).expect("equal lengths");

        assert_eq!(indicators.count, 3);
        assert!((indicators.nse - -26.0526).abs() < 1.0e-4);
        assert!((indicators.rmse - 29.1464).abs() < 1.0e-4);
        assert!((indicators.rsr - 4.2467).abs() < 1.0e-4);
    }

    #[test]
    fn indicators_use_sample_standard_deviation_for_rsr() {
        let indicators =
            compute_indicators(&[10.0, 20.0], &[11.0, 21.0]).expect("equal lengths");

        assert_eq!(indicators.count, 2);
        assert!((indicators.rmse - 1.0).abs() < 1.0e-12);
        assert!((indicators.nse - 0.96).abs() < 1.0e-12);
        assert!((indicators.rsr - 0.1414213562373095).abs() < 1.0e-12);
    }

    #[test]
    fn single_point_yields_infinite_nse_and_rsr() {
        let indicators = compute_indicators(&[3.0], &[5.0]).expect("equal lengths");

        assert_eq!(indicators.count, 1);
        assert!((indicators.rmse - 2.0).abs() < 1.0e-12);
        assert_eq!(indicators.nse, f64::INFINITY);
        assert_eq!(indicators.rsr, f64::INFINITY);
    }

    #[test]
    fn empty_series_yields_zero_count_and_nan_indicators() {
        let indicators = compute_indicators(&[], &[]).expect("equal lengths");

        assert_eq!(indicators.count, 0);
        assert!(indicators.rmse.is_nan());
        assert!(indicators.nse.is_nan());
        assert!(indicators.rsr.is_nan());
    }

    #[test]
    fn mismatched_series_are_rejected() {
        assert_eq!(compute_indicators(&[1.0, 2.0], &[1.0]), None);
    }

    #[test]
    fn mean_and_deviation_helpers() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[2.0, 4.0]), Some(3.0));
        assert_eq!(sample_standard_deviation(&[5.0]), 0.0);
        assert!((sample_standard_deviation(&[11.0, 21.0]) - 50.0_f64.sqrt()).abs() < 1.0e-12);
    }
}
