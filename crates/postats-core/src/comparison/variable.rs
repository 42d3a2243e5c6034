use super::reconcile::{Pairing, PresenceStatus};
use crate::model::{Named, Statistic};
use serde::Serialize;
use std::fmt::{Display, Formatter};

/// Percent differences at or below this value are regressions.
pub const REGRESSION_TOLERANCE_PERCENT: f64 = -1.0;

const COMPARISON_DECIMALS: i32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonStatus {
    /// Within tolerance of the accepted value.
    Same,
    /// Not the same, but an improvement on the accepted value.
    Better,
    /// Worse than the accepted value by at least the tolerance.
    Different,
    /// Only present in the current run.
    New,
    /// Only present in the accepted run.
    Missing,
}

impl ComparisonStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Same => "Same",
            Self::Better => "Better",
            Self::Different => "Different",
            Self::New => "New",
            Self::Missing => "Missing",
        }
    }

    const fn is_better_or_same(self) -> bool {
        matches!(self, Self::Better | Self::Same)
    }
}

impl Display for ComparisonStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Indicator {
    Count,
    Rmse,
    Nse,
    Rsr,
}

impl Indicator {
    pub const ALL: [Indicator; 4] = [Self::Count, Self::Rmse, Self::Nse, Self::Rsr];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Count => "N",
            Self::Rmse => "RMSE",
            Self::Nse => "NSE",
            Self::Rsr => "RSR",
        }
    }

    /// RMSE and RSR are errors, so a decrease is an improvement.
    pub const fn higher_is_better(self) -> bool {
        matches!(self, Self::Count | Self::Nse)
    }

    pub fn value_of(self, statistic: &Statistic) -> f64 {
        match self {
            Self::Count => f64::from(statistic.count()),
            Self::Rmse => statistic.rmse(),
            Self::Nse => statistic.nse(),
            Self::Rsr => statistic.rsr(),
        }
    }

    const fn index(self) -> usize {
        match self {
            Self::Count => 0,
            Self::Rmse => 1,
            Self::Nse => 2,
            Self::Rsr => 3,
        }
    }
}

impl Display for Indicator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

/// Comparison of one statistic against its accepted counterpart.
#[derive(Debug, Clone)]
pub struct VariableComparison<'a> {
    current: Option<&'a Statistic>,
    accepted: Option<&'a Statistic>,
    percent_differences: [f64; 4],
}

impl<'a> VariableComparison<'a> {
    /// # Panics
    ///
    /// Panics when both statistics are absent.
    pub fn new(current: Option<&'a Statistic>, accepted: Option<&'a Statistic>) -> Self {
        Self::from_pairing(Pairing::new(current, accepted))
    }

    pub fn from_pairing(pairing: Pairing<'a, Statistic>) -> Self {
        let mut percent_differences = [f64::NAN; 4];
        if let (Some(current), Some(accepted)) = (pairing.current(), pairing.accepted()) {
            for indicator in Indicator::ALL {
                percent_differences[indicator.index()] = percent_difference(
                    indicator.value_of(accepted),
                    indicator.value_of(current),
                    indicator.higher_is_better(),
                );
            }
        }

        Self {
            current: pairing.current(),
            accepted: pairing.accepted(),
            percent_differences,
        }
    }

    pub fn name(&self) -> &'a str {
        match (self.current, self.accepted) {
            (Some(current), _) => current.name(),
            (None, Some(accepted)) => accepted.name(),
            (None, None) => unreachable!("checked when the pairing was built"),
        }
    }

    pub fn current(&self) -> Option<&'a Statistic> {
        self.current
    }

    pub fn accepted(&self) -> Option<&'a Statistic> {
        self.accepted
    }

    pub fn presence(&self) -> PresenceStatus {
        match (self.current, self.accepted) {
            (None, _) => PresenceStatus::Missing,
            (Some(_), None) => PresenceStatus::New,
            (Some(_), Some(_)) => PresenceStatus::NoChange,
        }
    }

    pub fn current_value(&self, indicator: Indicator) -> Option<f64> {
        self.current.map(|statistic| indicator.value_of(statistic))
    }

    pub fn accepted_value(&self, indicator: Indicator) -> Option<f64> {
        self.accepted.map(|statistic| indicator.value_of(statistic))
    }

    /// Signed percent change where positive always means improvement. NaN
    /// when either side is absent.
    pub fn percent_difference(&self, indicator: Indicator) -> f64 {
        self.percent_differences[indicator.index()]
    }

    pub fn status(&self, indicator: Indicator) -> ComparisonStatus {
        match self.presence() {
            PresenceStatus::Missing => ComparisonStatus::Missing,
            PresenceStatus::New => ComparisonStatus::New,
            PresenceStatus::NoChange => classify(self.percent_difference(indicator)),
        }
    }

    pub fn n_status(&self) -> ComparisonStatus {
        self.status(Indicator::Count)
    }

    pub fn rmse_status(&self) -> ComparisonStatus {
        self.status(Indicator::Rmse)
    }

    pub fn nse_status(&self) -> ComparisonStatus {
        self.status(Indicator::Nse)
    }

    pub fn rsr_status(&self) -> ComparisonStatus {
        self.status(Indicator::Rsr)
    }

    pub fn is_same(&self) -> bool {
        Indicator::ALL
            .iter()
            .all(|indicator| self.status(*indicator) == ComparisonStatus::Same)
    }

    pub fn is_better_or_same(&self) -> bool {
        Indicator::ALL
            .iter()
            .all(|indicator| self.status(*indicator).is_better_or_same())
    }

    /// True only when all four indicators regressed. The run verdict does not
    /// use this; it folds `is_same` and `is_better_or_same` instead.
    pub fn is_different(&self) -> bool {
        Indicator::ALL
            .iter()
            .all(|indicator| self.status(*indicator) == ComparisonStatus::Different)
    }
}

/// Percent change from `accepted` to `current`, sign-corrected so that a
/// positive result is an improvement.
pub fn percent_difference(accepted: f64, current: f64, higher_is_better: bool) -> f64 {
    if accepted == current {
        return 0.0;
    }

    let accepted = round_to_decimals(accepted, COMPARISON_DECIMALS);
    let current = round_to_decimals(current, COMPARISON_DECIMALS);
    let difference = safe_divide(current - accepted, accepted.abs(), 0.0) * 100.0;

    if higher_is_better { difference } else { -difference }
}

pub fn classify(percent_difference: f64) -> ComparisonStatus {
    if percent_difference.is_nan() || percent_difference <= REGRESSION_TOLERANCE_PERCENT {
        ComparisonStatus::Different
    } else if percent_difference <= 0.0 {
        ComparisonStatus::Same
    } else {
        ComparisonStatus::Better
    }
}

/// `numerator / denominator`, or `fallback` when the denominator is zero.
pub fn safe_divide(numerator: f64, denominator: f64, fallback: f64) -> f64 {
    if denominator == 0.0 {
        fallback
    } else {
        numerator / denominator
    }
}

/// Round half-to-even at `decimals` places. Values too large to carry that
/// many fractional digits are returned unchanged.
pub fn round_to_decimals(value: f64, decimals: i32) -> f64 {
    if !value.is_finite() || value.abs() > 1.0e15 {
        return value;
    }
    let scale = 10_f64.powi(decimals);
    (value * scale).round_ties_even() / scale
}

#[cfg(test)]
mod tests {
    use super::{
        ComparisonStatus, Indicator, VariableComparison, classify, percent_difference,
        round_to_decimals, safe_divide,
    };
    use crate::model::Statistic;
    use crate::stats::Indicators;

    fn statistic(name: &str, count: u32, nse: f64, rmse: f64, rsr: f64) -> Statistic {
        Statistic::with_indicators(
            name,
            Indicators {
                count,
                rmse,
                nse,
                rsr,
            },
        )
    }

    fn statuses(comparison: &VariableComparison<'_>) -> [ComparisonStatus; 4] {
        [
            comparison.n_status(),
            comparison.nse_status(),
            comparison.rmse_status(),
            comparison.rsr_status(),
        ]
    }

    #[test]
    fn one_percent_regression_is_different() {
        let difference = percent_difference(1000.0, 1010.0, false);
        assert_eq!(difference, -1.0);
        assert_eq!(classify(difference), ComparisonStatus::Different);
    }

    #[test]
    fn sub_tolerance_regression_is_same() {
        let difference = percent_difference(1000.0, 1009.0, false);
        assert!((difference - -0.9).abs() < 1.0e-9);
        assert_eq!(classify(difference), ComparisonStatus::Same);
    }

    #[test]
    fn classification_boundaries() {
        assert_eq!(classify(f64::NAN), ComparisonStatus::Different);
        assert_eq!(classify(-1.0), ComparisonStatus::Different);
        assert_eq!(classify(-0.999), ComparisonStatus::Same);
        assert_eq!(classify(0.0), ComparisonStatus::Same);
        assert_eq!(classify(1.0e-9), ComparisonStatus::Better);
    }

    #[test]
    fn zero_accepted_value_uses_safe_divide() {
        assert_eq!(safe_divide(5.0, 0.0, 0.0), 0.0);
        assert_eq!(percent_difference(0.0, 5.0, true), 0.0);
        assert_eq!(classify(percent_difference(0.0, 5.0, true)), ComparisonStatus::Same);
    }

    #[test]
    fn values_are_rounded_to_six_decimals_before_comparison() {
        assert_eq!(round_to_decimals(0.12345649, 6), 0.123456);
        assert_eq!(round_to_decimals(f64::INFINITY, 6), f64::INFINITY);
        assert_eq!(percent_difference(0.5, 0.5000000001, true), 0.0);
    }

    #[test]
    fn statistics_within_tolerance_are_same_or_better() {
        let current = statistic("v", 50, 0.8, 1000.0, 0.5);
        let accepted = statistic("v", 50, 0.807, 1010.0, 0.503);

        let comparison = VariableComparison::new(Some(&current), Some(&accepted));

        assert_eq!(
            statuses(&comparison),
            [
                ComparisonStatus::Same,
                ComparisonStatus::Same,
                ComparisonStatus::Better,
                ComparisonStatus::Better,
            ]
        );
        assert!(comparison.is_better_or_same());
        assert!(!comparison.is_same());
    }

    #[test]
    fn improved_statistics_are_better() {
        let accepted = statistic("v", 50, 0.8, 1000.0, 0.5);
        let current = statistic("v", 50, 0.9, 900.0, 0.2);

        let comparison = VariableComparison::new(Some(&current), Some(&accepted));

        assert_eq!(
            statuses(&comparison),
            [
                ComparisonStatus::Same,
                ComparisonStatus::Better,
                ComparisonStatus::Better,
                ComparisonStatus::Better,
            ]
        );
    }

    #[test]
    fn regressed_statistics_are_different() {
        let accepted = statistic("v", 50, 0.9, 900.0, 0.2);
        let current = statistic("v", 50, 0.8, 1000.0, 0.5);

        let comparison = VariableComparison::new(Some(&current), Some(&accepted));

        assert_eq!(
            statuses(&comparison),
            [
                ComparisonStatus::Same,
                ComparisonStatus::Different,
                ComparisonStatus::Different,
                ComparisonStatus::Different,
            ]
        );
        assert!(!comparison.is_better_or_same());
        assert!(!comparison.is_different(), "count did not regress");
    }

    #[test]
    fn is_different_requires_every_indicator_to_regress() {
        let accepted = statistic("v", 50, 0.9, 900.0, 0.2);
        let current = statistic("v", 40, 0.8, 1000.0, 0.5);

        let comparison = VariableComparison::new(Some(&current), Some(&accepted));
        assert!(comparison.is_different());
    }

    #[test]
    fn infinite_indicators_compare_as_same() {
        let current = statistic("v", 1, f64::INFINITY, f64::INFINITY, f64::INFINITY);
        let accepted = statistic("v", 1, f64::INFINITY, f64::INFINITY, f64::INFINITY);

        let comparison = VariableComparison::new(Some(&current), Some(&accepted));

        assert_eq!(statuses(&comparison), [ComparisonStatus::Same; 4]);
        assert!(comparison.is_same());
    }

    #[test]
    fn identical_statistics_are_same() {
        let current = statistic("v", 20, 0.7, 800.0, 0.4);
        let accepted = current.clone();
        let comparison = VariableComparison::new(Some(&current), Some(&accepted));
        assert_eq!(statuses(&comparison), [ComparisonStatus::Same; 4]);
        for indicator in Indicator::ALL {
            assert_eq!(comparison.percent_difference(indicator), 0.0);
        }
    }

    #[test]
    fn one_sided_statistics_are_new_or_missing() {
        let only = statistic("v", 25, 0.7, 500.0, 0.2);

        let new = VariableComparison::new(Some(&only), None);
        assert_eq!(statuses(&new), [ComparisonStatus::New; 4]);
        assert_eq!(new.accepted_value(Indicator::Rmse), None);
        assert!(new.percent_difference(Indicator::Rmse).is_nan());
        assert!(!new.is_same());
        assert!(!new.is_better_or_same());

        let missing = VariableComparison::new(None, Some(&only));
        assert_eq!(statuses(&missing), [ComparisonStatus::Missing; 4]);
        assert_eq!(missing.accepted_value(Indicator::Count), Some(25.0));
        assert_eq!(missing.name(), "v");
    }

    #[test]
    #[should_panic]
    fn comparing_two_absent_statistics_panics() {
        let _ = VariableComparison::new(None, None);
    }
}
