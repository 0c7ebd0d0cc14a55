//! Reduction of a time series to a single scalar.
//!
//! Every reducer except `count` operates on the non-null values of the series,
//! taken in their original order. A result that cannot be defined is reported
//! through [`Reduction::valid`], never through a sentinel value.

use crate::series::Series;
use anyhow::{Error, Result, bail};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Kind of reduction applied to a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReducerKind {
    Sum,
    Min,
    Max,
    Count,
    CountNonNull,
    Last,
    Avg,
    Median,
    Diff,
    PercentDiff,
    Change,
    PercentChange,
}

impl ReducerKind {
    /// All reducer kinds.
    pub const ALL: [ReducerKind; 12] = [
        ReducerKind::Sum,
        ReducerKind::Min,
        ReducerKind::Max,
        ReducerKind::Count,
        ReducerKind::CountNonNull,
        ReducerKind::Last,
        ReducerKind::Avg,
        ReducerKind::Median,
        ReducerKind::Diff,
        ReducerKind::PercentDiff,
        ReducerKind::Change,
        ReducerKind::PercentChange,
    ];

    /// Canonical name of the reducer kind.
    pub fn name(self) -> &'static str {
        match self {
            ReducerKind::Sum => "sum",
            ReducerKind::Min => "min",
            ReducerKind::Max => "max",
            ReducerKind::Count => "count",
            ReducerKind::CountNonNull => "count_non_null",
            ReducerKind::Last => "last",
            ReducerKind::Avg => "avg",
            ReducerKind::Median => "median",
            ReducerKind::Diff => "diff",
            ReducerKind::PercentDiff => "percent_diff",
            ReducerKind::Change => "change",
            ReducerKind::PercentChange => "percent_change",
        }
    }
}

impl fmt::Display for ReducerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ReducerKind {
    type Err = Error;

    fn from_str(mode: &str) -> Result<Self> {
        match ReducerKind::ALL.into_iter().find(|kind| kind.name() == mode) {
            Some(kind) => Ok(kind),
            None => bail!("unknown reducer mode {mode:?}"),
        }
    }
}

/// Result of a reduction.
///
/// If `valid` is false the reduction has no defined value and `value` must not be used.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reduction {
    pub value: f64,
    pub valid: bool,
}

impl Reduction {
    /// Create a valid reduction holding a given value.
    pub fn of(value: f64) -> Self {
        Self { value, valid: true }
    }

    /// Create a reduction with no defined value.
    pub fn undefined() -> Self {
        Self {
            value: 0.0,
            valid: false,
        }
    }

    /// Get the value if the reduction is valid.
    pub fn as_option(&self) -> Option<f64> {
        self.valid.then_some(self.value)
    }
}

impl From<Option<f64>> for Reduction {
    fn from(value: Option<f64>) -> Self {
        value.map_or_else(Reduction::undefined, Reduction::of)
    }
}

/// Stateless reducer of a given kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reducer {
    kind: ReducerKind,
}

impl Reducer {
    pub fn new(kind: ReducerKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> ReducerKind {
        self.kind
    }

    /// Reduce a series to a single scalar.
    ///
    /// The percent reducers divide by the first non-null value. If that value is zero
    /// and the series holds more than one non-null value, the quotient is not a number
    /// and the reduction is undefined.
    pub fn reduce(&self, series: &Series) -> Reduction {
        let vals: Vec<f64> = series.non_null_values().collect();
        match self.kind {
            ReducerKind::Sum => Reduction::of(vals.iter().sum()),
            ReducerKind::Min => vals.iter().copied().reduce(f64::min).into(),
            ReducerKind::Max => vals.iter().copied().reduce(f64::max).into(),
            ReducerKind::Count => Reduction::of(series.len() as f64),
            ReducerKind::CountNonNull => non_empty(&vals).map(|vals| vals.len() as f64).into(),
            ReducerKind::Last => vals.last().copied().into(),
            ReducerKind::Avg => non_empty(&vals)
                .map(|vals| vals.iter().sum::<f64>() / vals.len() as f64)
                .into(),
            ReducerKind::Median => compute_median(&vals).into(),
            ReducerKind::Diff => compute_delta(&vals, |first, last| Some((last - first).abs())),
            ReducerKind::PercentDiff => {
                compute_delta(&vals, |first, last| percent((last - first).abs(), first))
            }
            ReducerKind::Change => compute_delta(&vals, |first, last| Some(last - first)),
            ReducerKind::PercentChange => {
                compute_delta(&vals, |first, last| percent(last - first, first))
            }
        }
    }
}

/// Reduce a series with the reducer named by `mode`.
///
/// An unknown mode yields an undefined reduction.
pub fn reduce(mode: &str, series: &Series) -> Reduction {
    match mode.parse::<ReducerKind>() {
        Ok(kind) => Reducer::new(kind).reduce(series),
        Err(error) => {
            log::debug!("{error}");
            Reduction::undefined()
        }
    }
}

fn non_empty(vals: &[f64]) -> Option<&[f64]> {
    (!vals.is_empty()).then_some(vals)
}

fn compute_median(vals: &[f64]) -> Option<f64> {
    let len = vals.len();
    if len == 0 {
        return None;
    }

    // Sort a copy, the series order must stay untouched.
    let mut sorted = vals.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mid = len / 2;
    if len % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Apply `delta` to the first and last values, a single value has zero delta.
fn compute_delta<F>(vals: &[f64], delta: F) -> Reduction
where
    F: Fn(f64, f64) -> Option<f64>,
{
    match vals {
        [] => Reduction::undefined(),
        [_] => Reduction::of(0.0),
        [first, .., last] => delta(*first, *last).into(),
    }
}

fn percent(delta: f64, first: f64) -> Option<f64> {
    if first == 0.0 {
        return None;
    }
    Some(delta / first * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::Sample;
    use rand::seq::SliceRandom;

    const TOL: f64 = 1e-9;

    fn reduce_vals(mode: &str, vals: &[f64]) -> Reduction {
        let series = Series::from_values("test", vals.iter().copied().map(Some));
        reduce(mode, &series)
    }

    fn reduce_value(mode: &str, vals: &[f64]) -> f64 {
        let result = reduce_vals(mode, vals);
        assert!(result.valid, "{mode} of {vals:?} should be valid");
        result.value
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < TOL,
            "expected {expected}, but got {actual}"
        );
    }

    #[test]
    fn mode_names_round_trip() {
        for kind in ReducerKind::ALL {
            assert_eq!(kind.to_string().parse::<ReducerKind>().ok(), Some(kind));
        }
        assert!("Avg".parse::<ReducerKind>().is_err());
        assert!("mean".parse::<ReducerKind>().is_err());
    }

    #[test]
    fn serde_uses_mode_names() {
        let json = serde_json::to_string(&ReducerKind::PercentChange).expect("failed to serialize");
        assert_eq!(json, "\"percent_change\"");

        let kind: ReducerKind = serde_json::from_str("\"count_non_null\"").expect("failed to parse");
        assert_eq!(kind, ReducerKind::CountNonNull);
    }

    #[test]
    fn unknown_mode_is_undefined() {
        assert!(!reduce_vals("p95", &[1.0, 2.0]).valid);
        assert!(!reduce_vals("", &[1.0]).valid);
    }

    #[test]
    fn simple_reducers() {
        assert_eq!(reduce_value("sum", &[1.0, 2.0, 3.0]), 6.0);
        assert_eq!(reduce_value("min", &[3.0, 2.0, 1.0]), 1.0);
        assert_eq!(reduce_value("max", &[1.0, 2.0, 3.0]), 3.0);
        assert_eq!(reduce_value("count", &[1.0, 2.0, 3000.0]), 3.0);
        assert_eq!(reduce_value("last", &[1.0, 2.0, 3000.0]), 3000.0);
        assert_eq!(reduce_value("avg", &[1.0, 2.0, 3.0]), 2.0);
    }

    #[test]
    fn median() {
        assert_eq!(reduce_value("median", &[1.0, 2.0, 3000.0]), 2.0);
        assert_eq!(reduce_value("median", &[1.0, 2.0, 4.0, 3000.0]), 3.0);
        assert_eq!(reduce_value("median", &[1.0]), 1.0);
    }

    #[test]
    fn median_ignores_nulls() {
        let series = Series::from_values(
            "test",
            [None, None, None, Some(1.0), Some(2.0), Some(3.0)],
        );
        assert_eq!(reduce("median", &series), Reduction::of(2.0));
    }

    #[test]
    fn median_is_order_independent() {
        let mut vals: Vec<f64> = (0..21).map(|i| (i * 7 % 11) as f64 - 3.5).collect();
        let expected = reduce_value("median", &vals);

        let mut rng = rand::rng();
        for _ in 0..16 {
            vals.shuffle(&mut rng);
            assert_eq!(reduce_value("median", &vals), expected);
        }
    }

    #[test]
    fn median_does_not_reorder_series() {
        let series = Series::from_values("test", [Some(3.0), None, Some(1.0), Some(2.0)]);
        let before = series.clone();

        reduce("median", &series);

        assert_eq!(series, before);
    }

    #[test]
    fn avg_ignores_nulls() {
        let series = Series::from_values("test", [Some(3.0), None, None, Some(3.0)]);
        assert_eq!(reduce("avg", &series), Reduction::of(3.0));
    }

    #[test]
    fn min_max_ignore_nulls() {
        let series = Series::from_values("test", [None, Some(-2.0), None, Some(5.0), None]);
        assert_eq!(reduce("min", &series), Reduction::of(-2.0));
        assert_eq!(reduce("max", &series), Reduction::of(5.0));
    }

    #[test]
    fn count_non_null() {
        let series = Series::from_values("test", [None, None, Some(3.0), Some(3.0)]);
        assert_eq!(reduce("count_non_null", &series), Reduction::of(2.0));
        assert_eq!(reduce("count", &series), Reduction::of(4.0));

        let series = Series::from_values("test", [None, None]);
        assert!(!reduce("count_non_null", &series).valid);
    }

    #[test]
    fn last_is_last_non_null_value() {
        let series = Series::from_values("test", [Some(1.0), Some(7.0), None]);
        assert_eq!(reduce("last", &series), Reduction::of(7.0));
    }

    #[test]
    fn diff() {
        assert_eq!(reduce_value("diff", &[30.0]), 0.0);
        assert_eq!(reduce_value("diff", &[30.0, 40.0]), 10.0);
        assert_eq!(reduce_value("diff", &[30.0, 40.0, 40.0]), 10.0);
        assert_eq!(reduce_value("diff", &[11.0, 30.0]), 19.0);
        assert_eq!(reduce_value("diff", &[30.0, 11.0]), 19.0);
    }

    #[test]
    fn percent_diff() {
        assert_eq!(reduce_value("percent_diff", &[40.0]), 0.0);
        assert_close(reduce_value("percent_diff", &[30.0, 40.0]), 33.3333333333);
        assert_close(reduce_value("percent_diff", &[30.0, 40.0, 40.0]), 33.3333333333);
        assert_close(reduce_value("percent_diff", &[20.0, 40.0]), 100.0);
        assert_close(reduce_value("percent_diff", &[40.0, 20.0]), 50.0);
    }

    #[test]
    fn change() {
        assert_eq!(reduce_value("change", &[30.0]), 0.0);
        assert_eq!(reduce_value("change", &[30.0, 50.0]), 20.0);
        assert_eq!(reduce_value("change", &[30.0, 50.0, 45.0]), 15.0);
        assert_eq!(reduce_value("change", &[30.0, 60.0]), 30.0);
        assert_eq!(reduce_value("change", &[40.0, 10.0]), -30.0);
    }

    #[test]
    fn percent_change() {
        assert_eq!(reduce_value("percent_change", &[40.0]), 0.0);
        assert_close(reduce_value("percent_change", &[40.0, 46.0]), 15.0);
        assert_close(reduce_value("percent_change", &[40.0, 35.0, 52.0]), 30.0);
        assert_close(reduce_value("percent_change", &[40.0, 54.0]), 35.0);
        assert_close(reduce_value("percent_change", &[40.0, 28.0]), -30.0);
    }

    #[test]
    fn percent_divides_by_signed_first_value() {
        assert_close(reduce_value("percent_change", &[-10.0, -5.0]), -50.0);
        assert_close(reduce_value("percent_change", &[-10.0, -15.0]), 50.0);
        assert_close(reduce_value("percent_diff", &[-10.0, -15.0]), -50.0);
        assert_close(reduce_value("percent_diff", &[-10.0, -5.0]), -50.0);
    }

    #[test]
    fn percent_of_zero_first_is_undefined() {
        assert!(!reduce_vals("percent_diff", &[0.0, 5.0]).valid);
        assert!(!reduce_vals("percent_change", &[0.0, 0.0]).valid);
        assert_eq!(reduce_vals("percent_change", &[0.0]), Reduction::of(0.0));
    }

    #[test]
    fn delta_family_uses_first_and_last_non_null() {
        let series = Series::from_values(
            "test",
            [None, Some(20.0), Some(1000.0), None, Some(25.0), None],
        );
        assert_eq!(reduce("diff", &series), Reduction::of(5.0));
        assert_eq!(reduce("change", &series), Reduction::of(5.0));
        assert_eq!(reduce("percent_change", &series), Reduction::of(25.0));

        let series = Series::from_values("test", [None, Some(30.0), None]);
        assert_eq!(reduce("change", &series), Reduction::of(0.0));
    }

    #[test]
    fn two_point_identities() {
        for (a, b) in [(30.0, 40.0), (40.0, 20.0), (-8.0, 2.0), (5.0, 5.0)] {
            assert_close(reduce_value("diff", &[a, b]), (b - a).abs());
            assert_close(reduce_value("change", &[a, b]), b - a);
            assert_close(reduce_value("percent_diff", &[a, b]), 100.0 * (b - a).abs() / a);
            assert_close(reduce_value("percent_change", &[a, b]), 100.0 * (b - a) / a);
        }
    }

    #[test]
    fn sum_is_avg_times_count_non_null() {
        let vals = [2.5, -1.0, 7.25, 3.0, 0.5];
        let sum = reduce_value("sum", &vals);
        let avg = reduce_value("avg", &vals);
        let n = reduce_value("count_non_null", &vals);
        assert_close(sum, avg * n);
    }

    #[test]
    fn count_bounds_count_non_null() {
        let with_nulls = Series::from_values("test", [Some(1.0), None, Some(2.0)]);
        let without_nulls = Series::from_values("test", [Some(1.0), Some(2.0)]);

        for (series, equal) in [(with_nulls, false), (without_nulls, true)] {
            let count = reduce("count", &series).value;
            let count_non_null = reduce("count_non_null", &series).value;
            assert!(count >= count_non_null);
            assert_eq!(count == count_non_null, equal);
        }
    }

    #[test]
    fn only_nulls() {
        let mut series = Series::new("test");
        series.push(Sample::null(1));
        series.push(Sample::null(2));

        for kind in ReducerKind::ALL {
            let result = Reducer::new(kind).reduce(&series);
            match kind {
                ReducerKind::Sum => assert_eq!(result, Reduction::of(0.0)),
                ReducerKind::Count => assert_eq!(result, Reduction::of(2.0)),
                _ => assert!(!result.valid, "{kind} of only nulls should be undefined"),
            }
        }
    }

    #[test]
    fn empty_series() {
        let series = Series::new("test");

        for kind in ReducerKind::ALL {
            let result = Reducer::new(kind).reduce(&series);
            match kind {
                ReducerKind::Sum | ReducerKind::Count => assert_eq!(result, Reduction::of(0.0)),
                _ => assert!(!result.valid, "{kind} of an empty series should be undefined"),
            }
        }
    }

    #[test]
    fn as_option() {
        assert_eq!(Reduction::of(1.5).as_option(), Some(1.5));
        assert_eq!(Reduction::undefined().as_option(), None);
    }
}
