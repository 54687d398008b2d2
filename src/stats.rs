//! Ensemble statistics
//!
//! Collapses one or more ensemble dimensions (`model`, `scenario`,
//! `realization`) into summary statistics, returning a long frame with a
//! `statistic` label column. Every remaining coordinate column passes
//! through as a group key, so per-location and per-year structure is kept.
//!
//! Nulls are skipped within each reduction cell; a cell with zero valid
//! members is an error rather than a silent NaN.

use nalgebra::{DMatrix, DVector};
use polars::prelude::*;
use rustc_hash::FxHashMap;
use statrs::distribution::{ContinuousCDF, Normal};
use tracing::debug;

use crate::dataset::{DIM_REALIZATION, DIM_TIME};
use crate::errors::{CoreError, CoreResult};
use crate::utils::{grouped_agg, passthrough_columns, row_coordinate};

/// Statistic label column in the output frame.
pub const STATISTIC_COLUMN: &str = "statistic";

/// Default confidence level (percent) for estimated uncertainty bands.
pub const DEFAULT_CONF_LEVEL: f64 = 90.0;

// Internal ordering column so output rows keep the requested statistic
// order instead of sorting by label.
const ORDER_COLUMN: &str = "statistic_order";

// Degree of the time trend fitted when estimating internal variability.
const TREND_DEGREE: usize = 4;

/// One requested summary statistic.
///
/// `Std` and `Var` are population statistics (ddof 0), matching the
/// variance-decomposition engine so that `std^2 == var` exactly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Statistic {
    Mean,
    Std,
    Var,
    Min,
    Max,
    Median,
    /// Percentile in the closed interval `[0, 100]`, linear interpolation.
    Percentile(f64),
}

impl Statistic {
    /// Label written into the `statistic` column.
    pub fn label(&self) -> String {
        match self {
            Statistic::Mean => "mean".to_string(),
            Statistic::Std => "std".to_string(),
            Statistic::Var => "var".to_string(),
            Statistic::Min => "min".to_string(),
            Statistic::Max => "max".to_string(),
            Statistic::Median => "median".to_string(),
            Statistic::Percentile(p) => {
                if p.fract() == 0.0 {
                    format!("p{:.0}", p)
                } else {
                    format!("p{}", p)
                }
            }
        }
    }

    /// # Errors
    /// `BadPercentile` if a percentile lies outside `[0, 100]` or is NaN.
    pub fn validate(&self) -> CoreResult<()> {
        if let Statistic::Percentile(p) = self {
            if !(*p >= 0.0 && *p <= 100.0) {
                return Err(CoreError::BadPercentile { value: *p });
            }
        }
        Ok(())
    }

    fn expr(&self, variable: &str) -> Expr {
        let value = col(variable);
        match self {
            Statistic::Mean => value.mean(),
            Statistic::Std => value.std(0),
            Statistic::Var => value.var(0),
            Statistic::Min => value.min(),
            Statistic::Max => value.max(),
            Statistic::Median => value.median(),
            Statistic::Percentile(p) => {
                value.quantile(lit(*p / 100.0), QuantileMethod::Linear)
            }
        }
    }
}

/// The default statistic set: mean, std, var, min, p5, median, p95, max.
pub fn default_statistics() -> Vec<Statistic> {
    vec![
        Statistic::Mean,
        Statistic::Std,
        Statistic::Var,
        Statistic::Min,
        Statistic::Percentile(5.0),
        Statistic::Median,
        Statistic::Percentile(95.0),
        Statistic::Max,
    ]
}

/// Collapse `ensemble_dims` of `variable` into `stats`.
///
/// The output keeps every other coordinate column, adds a `statistic`
/// column holding [`Statistic::label`], and carries one value row per
/// (remaining coordinate, statistic). Rows are sorted by the remaining
/// coordinates; within a coordinate the statistics appear in the order
/// they were requested.
///
/// # Errors
/// - `NoStatistics` if `stats` is empty.
/// - `BadPercentile` for an out-of-range percentile.
/// - `MissingVariable` / `MissingDimension` if `variable` or any of
///   `ensemble_dims` is absent from the frame.
/// - `NoValidMembers` if any reduction cell holds only nulls.
pub fn ensemble_stats(
    frame: &DataFrame,
    variable: &str,
    ensemble_dims: &[&str],
    stats: &[Statistic],
) -> CoreResult<DataFrame> {
    if stats.is_empty() {
        return Err(CoreError::NoStatistics);
    }
    for stat in stats {
        stat.validate()?;
    }
    if frame.column(variable).is_err() {
        return Err(CoreError::MissingVariable {
            variable: variable.to_string(),
        });
    }
    for dim in ensemble_dims {
        if frame.column(dim).is_err() {
            return Err(CoreError::MissingDimension {
                dimension: dim.to_string(),
            });
        }
    }

    let keys = passthrough_columns(frame, ensemble_dims);
    debug!(variable, ?ensemble_dims, keys = ?keys, n_stats = stats.len(), "ensemble statistics");

    // Uniform Float64 so per-statistic frames share a schema when stacked.
    let lf = frame
        .clone()
        .lazy()
        .with_columns([col(variable).cast(DataType::Float64)]);

    // Reject cells with zero valid members before computing anything.
    let counts = grouped_agg(
        lf.clone(),
        &keys,
        vec![col(variable).count().cast(DataType::Int64).alias("n_valid")],
    )
    .collect()?;
    let n_valid = counts.column("n_valid")?.i64()?;
    for row in 0..counts.height() {
        if n_valid.get(row) == Some(0) {
            return Err(CoreError::NoValidMembers {
                variable: variable.to_string(),
                coordinate: row_coordinate(&counts, row, &keys)?,
            });
        }
    }

    let mut per_stat: Vec<LazyFrame> = Vec::with_capacity(stats.len());
    for (order, stat) in stats.iter().enumerate() {
        per_stat.push(
            grouped_agg(lf.clone(), &keys, vec![stat.expr(variable)])
                .with_column(lit(stat.label()).alias(STATISTIC_COLUMN))
                .with_column(lit(order as u32).alias(ORDER_COLUMN)),
        );
    }

    // Sort on the request index so the statistic axis keeps caller order.
    let mut sort_keys = keys.clone();
    sort_keys.push(ORDER_COLUMN.to_string());
    let mut select_cols: Vec<Expr> = keys.iter().map(|k| col(k.as_str())).collect();
    select_cols.push(col(STATISTIC_COLUMN));
    select_cols.push(col(variable));

    let out = concat(per_stat, UnionArgs::default())?
        .sort(sort_keys, SortMultipleOptions::default())
        .select(select_cols)
        .collect()?;
    Ok(out)
}

/// Ensemble mean of `variable` over `ensemble_dims`, without the
/// `statistic` label column.
///
/// # Errors
/// As [`ensemble_stats`].
pub fn ensemble_mean(
    frame: &DataFrame,
    variable: &str,
    ensemble_dims: &[&str],
) -> CoreResult<DataFrame> {
    let mut out = ensemble_stats(frame, variable, ensemble_dims, &[Statistic::Mean])?;
    let _ = out.drop_in_place(STATISTIC_COLUMN)?;
    Ok(out)
}

/// Standard-normal quantile for a symmetric band at `conf_level` percent.
fn confidence_z(conf_level: f64) -> CoreResult<f64> {
    if !(conf_level > 0.0 && conf_level < 100.0) {
        return Err(CoreError::BadPercentile { value: conf_level });
    }
    let standard_normal = Normal::new(0.0, 1.0).expect("unit normal");
    Ok(standard_normal.inverse_cdf(0.5 + conf_level / 200.0))
}

/// Estimate ensemble statistics from a single ensemble member.
///
/// When only one realization exists per series, the sample spread across
/// realizations is zero and would silently understate internal
/// variability. Instead, each time series (one per remaining coordinate)
/// gets a degree-4 polynomial trend fitted by least squares: the fitted
/// value is the `mean` estimate, the residual variance (assumed constant
/// in time) becomes `var`/`std`, and `lower`/`upper` are the symmetric
/// normal band at `conf_level` percent around the trend.
///
/// The output keeps the `time` column and every other coordinate, drops
/// the (singleton) `realization` column, and carries a `statistic` column
/// with values `mean`, `var`, `std`, `lower`, `upper`. Null observations
/// are excluded from the fit but still receive a trend estimate.
///
/// # Errors
/// - `MissingVariable` / `MissingDimension` if `variable` or `time` is
///   absent.
/// - `MultipleRealizations` if more than one realization is present.
/// - `BadPercentile` if `conf_level` is outside `(0, 100)`.
/// - `NoValidMembers` if a series holds only nulls.
/// - `TrendFitFailed` if the least-squares solve fails for a series.
pub fn estimate_ensemble_stats(
    frame: &DataFrame,
    variable: &str,
    conf_level: f64,
) -> CoreResult<DataFrame> {
    let z = confidence_z(conf_level)?;
    if frame.column(variable).is_err() {
        return Err(CoreError::MissingVariable {
            variable: variable.to_string(),
        });
    }
    if frame.column(DIM_TIME).is_err() {
        return Err(CoreError::MissingDimension {
            dimension: DIM_TIME.to_string(),
        });
    }
    if let Ok(realizations) = frame.column(DIM_REALIZATION) {
        let count = realizations.n_unique()?;
        if count > 1 {
            return Err(CoreError::MultipleRealizations { count });
        }
    }

    let keys = passthrough_columns(frame, &[DIM_TIME, DIM_REALIZATION]);
    debug!(variable, keys = ?keys, conf_level, "estimating ensemble statistics from trend fit");

    // Physical date representation (days since epoch) for the regressor.
    let days_col = frame.column(DIM_TIME)?.cast(&DataType::Int32)?;
    let days = days_col.i32()?;
    let values_col = frame.column(variable)?.cast(&DataType::Float64)?;
    let values = values_col.f64()?;

    // One series per combination of the non-time coordinates.
    let mut series_rows: FxHashMap<String, Vec<usize>> = FxHashMap::default();
    let mut series_order: Vec<String> = Vec::new();
    for row in 0..frame.height() {
        let key = row_coordinate(frame, row, &keys)?;
        series_rows
            .entry(key.clone())
            .or_insert_with(|| {
                series_order.push(key);
                Vec::new()
            })
            .push(row);
    }

    let n_rows = frame.height();
    let mut mean_out: Vec<Option<f64>> = vec![None; n_rows];
    let mut var_out: Vec<Option<f64>> = vec![None; n_rows];
    let mut std_out: Vec<Option<f64>> = vec![None; n_rows];
    let mut lower_out: Vec<Option<f64>> = vec![None; n_rows];
    let mut upper_out: Vec<Option<f64>> = vec![None; n_rows];

    for key in &series_order {
        let rows = &series_rows[key];
        let observed: Vec<(f64, f64)> = rows
            .iter()
            .filter_map(|&r| match (days.get(r), values.get(r)) {
                (Some(t), Some(v)) => Some((t as f64, v)),
                _ => None,
            })
            .collect();
        if observed.is_empty() {
            return Err(CoreError::NoValidMembers {
                variable: variable.to_string(),
                coordinate: key.clone(),
            });
        }

        // Center and scale the regressor to keep the Vandermonde matrix
        // well conditioned.
        let (t_min, t_max) = observed.iter().fold((f64::MAX, f64::MIN), |(lo, hi), (t, _)| {
            (lo.min(*t), hi.max(*t))
        });
        let mid = 0.5 * (t_min + t_max);
        let half = (0.5 * (t_max - t_min)).max(1.0);
        let scale = |t: f64| (t - mid) / half;

        let degree = TREND_DEGREE.min(observed.len() - 1);
        let design = DMatrix::from_fn(observed.len(), degree + 1, |r, c| {
            scale(observed[r].0).powi(c as i32)
        });
        let response = DVector::from_iterator(observed.len(), observed.iter().map(|(_, v)| *v));
        let coefficients = design
            .svd(true, true)
            .solve(&response, 1e-12)
            .map_err(|reason| CoreError::TrendFitFailed {
                variable: variable.to_string(),
                coordinate: key.clone(),
                reason: reason.to_string(),
            })?;
        let trend = |t: f64| {
            let ts = scale(t);
            coefficients
                .iter()
                .enumerate()
                .map(|(power, c)| c * ts.powi(power as i32))
                .sum::<f64>()
        };

        // Residual variance of the fit, constant in time (population).
        let rss: f64 = observed
            .iter()
            .map(|(t, v)| (v - trend(*t)).powi(2))
            .sum();
        let variance = rss / observed.len() as f64;
        let std = variance.sqrt();

        for &r in rows {
            if let Some(t) = days.get(r) {
                let mean = trend(t as f64);
                mean_out[r] = Some(mean);
                var_out[r] = Some(variance);
                std_out[r] = Some(std);
                lower_out[r] = Some(mean - z * std);
                upper_out[r] = Some(mean + z * std);
            }
        }
    }

    let mut base_cols: Vec<String> = keys.clone();
    base_cols.push(DIM_TIME.to_string());
    let base = frame.select(base_cols)?;

    let estimates: [(&str, &Vec<Option<f64>>); 5] = [
        ("mean", &mean_out),
        ("var", &var_out),
        ("std", &std_out),
        ("lower", &lower_out),
        ("upper", &upper_out),
    ];
    let mut parts: Vec<LazyFrame> = Vec::with_capacity(estimates.len());
    for (order, (label, estimate)) in estimates.iter().enumerate() {
        let mut part = base.clone();
        part.with_column(Series::new(variable.into(), (*estimate).clone()))?;
        parts.push(
            part.lazy()
                .with_column(lit(*label).alias(STATISTIC_COLUMN))
                .with_column(lit(order as u32).alias(ORDER_COLUMN)),
        );
    }

    let mut sort_keys = keys.clone();
    sort_keys.push(DIM_TIME.to_string());
    sort_keys.push(ORDER_COLUMN.to_string());
    let mut select_cols: Vec<Expr> = keys.iter().map(|k| col(k.as_str())).collect();
    select_cols.push(col(DIM_TIME));
    select_cols.push(col(STATISTIC_COLUMN));
    select_cols.push(col(variable));

    let out = concat(parts, UnionArgs::default())?
        .sort(sort_keys, SortMultipleOptions::default())
        .select(select_cols)
        .collect()?;
    Ok(out)
}

/// Ensemble statistics, estimating internal variability when only a
/// single realization is available.
///
/// With two or more realizations this is exactly [`ensemble_stats`].
/// When `ensemble_dims` asks for the `realization` dimension but the frame
/// carries at most one realization, the sample spread is degenerate and
/// [`estimate_ensemble_stats`] is used instead (its `stats` selection is
/// fixed to the estimated set).
///
/// # Errors
/// As [`ensemble_stats`] and [`estimate_ensemble_stats`].
pub fn ensemble_stats_or_estimate(
    frame: &DataFrame,
    variable: &str,
    ensemble_dims: &[&str],
    stats: &[Statistic],
    conf_level: f64,
) -> CoreResult<DataFrame> {
    let single_member = match frame.column(DIM_REALIZATION) {
        Ok(column) => column.n_unique()? <= 1,
        Err(_) => true,
    };
    if ensemble_dims.contains(&DIM_REALIZATION) && single_member {
        estimate_ensemble_stats(frame, variable, conf_level)
    } else {
        ensemble_stats(frame, variable, ensemble_dims, stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample_frame() -> DataFrame {
        df!(
            "location" => &["a", "a", "a", "b", "b", "b"],
            "realization" => &[0i64, 1, 2, 0, 1, 2],
            "suitability" => &[1.0, 2.0, 3.0, 10.0, 20.0, 30.0],
        )
        .unwrap()
    }

    fn stat_value(out: &DataFrame, location: &str, label: &str) -> f64 {
        let locs = out.column("location").unwrap().str().unwrap();
        let labels = out.column(STATISTIC_COLUMN).unwrap().str().unwrap();
        let values = out.column("suitability").unwrap().f64().unwrap();
        for row in 0..out.height() {
            if locs.get(row) == Some(location) && labels.get(row) == Some(label) {
                return values.get(row).unwrap();
            }
        }
        panic!("no row for location={} statistic={}", location, label);
    }

    #[test]
    fn test_mean_min_max_per_group() {
        let out = ensemble_stats(
            &sample_frame(),
            "suitability",
            &["realization"],
            &[Statistic::Mean, Statistic::Min, Statistic::Max],
        )
        .unwrap();
        assert_eq!(out.height(), 6);
        assert_relative_eq!(stat_value(&out, "a", "mean"), 2.0, epsilon = 1e-12);
        assert_relative_eq!(stat_value(&out, "a", "min"), 1.0, epsilon = 1e-12);
        assert_relative_eq!(stat_value(&out, "b", "max"), 30.0, epsilon = 1e-12);
    }

    #[test]
    fn test_population_std_squares_to_var() {
        let out = ensemble_stats(
            &sample_frame(),
            "suitability",
            &["realization"],
            &[Statistic::Std, Statistic::Var],
        )
        .unwrap();
        let std = stat_value(&out, "a", "std");
        let var = stat_value(&out, "a", "var");
        assert_relative_eq!(std * std, var, epsilon = 1e-12);
        // Population variance of {1, 2, 3} is 2/3.
        assert_relative_eq!(var, 2.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_percentile_labels() {
        assert_eq!(Statistic::Percentile(95.0).label(), "p95");
        assert_eq!(Statistic::Percentile(2.5).label(), "p2.5");
        assert_eq!(Statistic::Median.label(), "median");
    }

    #[test]
    fn test_out_of_range_percentile_rejected() {
        let err = ensemble_stats(
            &sample_frame(),
            "suitability",
            &["realization"],
            &[Statistic::Percentile(120.0)],
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::BadPercentile { .. }));
    }

    #[test]
    fn test_empty_statistic_list_rejected() {
        let err = ensemble_stats(&sample_frame(), "suitability", &["realization"], &[])
            .unwrap_err();
        assert!(matches!(err, CoreError::NoStatistics));
    }

    #[test]
    fn test_missing_dimension_rejected() {
        let err = ensemble_stats(
            &sample_frame(),
            "suitability",
            &["model"],
            &[Statistic::Mean],
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::MissingDimension { .. }));
    }

    #[test]
    fn test_all_null_cell_is_missing_data() {
        let mut df = df!(
            "location" => &["a", "a", "b", "b"],
            "realization" => &[0i64, 1, 0, 1],
        )
        .unwrap();
        df.with_column(Series::new(
            "suitability".into(),
            vec![Some(1.0), Some(2.0), None, None],
        ))
        .unwrap();
        let err = ensemble_stats(&df, "suitability", &["realization"], &[Statistic::Mean])
            .unwrap_err();
        match err {
            CoreError::NoValidMembers { coordinate, .. } => {
                assert!(coordinate.contains("location="));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_nulls_skipped_when_valid_members_remain() {
        let mut df = df!(
            "location" => &["a", "a", "a"],
            "realization" => &[0i64, 1, 2],
        )
        .unwrap();
        df.with_column(Series::new(
            "suitability".into(),
            vec![Some(1.0), None, Some(3.0)],
        ))
        .unwrap();
        let out = ensemble_stats(&df, "suitability", &["realization"], &[Statistic::Mean])
            .unwrap();
        assert_relative_eq!(stat_value(&out, "a", "mean"), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_ensemble_mean_has_no_statistic_column() {
        let out = ensemble_mean(&sample_frame(), "suitability", &["realization"]).unwrap();
        assert!(out.column(STATISTIC_COLUMN).is_err());
        assert_eq!(out.height(), 2);
    }

    #[test]
    fn test_statistic_rows_keep_requested_order() {
        let out = ensemble_stats(
            &sample_frame(),
            "suitability",
            &["realization"],
            &[Statistic::Max, Statistic::Mean, Statistic::Min],
        )
        .unwrap();
        let labels = out.column(STATISTIC_COLUMN).unwrap().str().unwrap();
        // Two locations, three statistics each, in request order.
        let expected = ["max", "mean", "min", "max", "mean", "min"];
        for (row, want) in expected.iter().enumerate() {
            assert_eq!(labels.get(row), Some(*want));
        }
    }

    fn single_member_frame(values: Vec<Option<f64>>) -> DataFrame {
        use chrono::NaiveDate;
        let n = values.len();
        let times: Vec<NaiveDate> = (0..n)
            .map(|i| {
                NaiveDate::from_ymd_opt(2030, 1, 1).unwrap() + chrono::Duration::days(i as i64)
            })
            .collect();
        let mut df = df!("location" => vec!["a"; n]).unwrap();
        df.with_column(Series::new("time".into(), times)).unwrap();
        df.with_column(Series::new("suitability".into(), values))
            .unwrap();
        df
    }

    fn estimated_value(out: &DataFrame, row_time: usize, label: &str) -> f64 {
        // Five statistic rows per timestep, in fixed order.
        let labels = out.column(STATISTIC_COLUMN).unwrap().str().unwrap();
        let values = out.column("suitability").unwrap().f64().unwrap();
        for offset in 0..5 {
            let row = row_time * 5 + offset;
            if labels.get(row) == Some(label) {
                return values.get(row).unwrap();
            }
        }
        panic!("no row for timestep {} statistic {}", row_time, label);
    }

    #[test]
    fn test_estimate_recovers_polynomial_trend_exactly() {
        // A linear series is captured exactly by the trend fit, so the
        // residual variance vanishes and the mean reproduces the data.
        let values: Vec<Option<f64>> = (0..10).map(|i| Some(2.0 + 0.5 * i as f64)).collect();
        let out = estimate_ensemble_stats(&single_member_frame(values.clone()), "suitability", 90.0)
            .unwrap();
        assert_eq!(out.height(), 50);
        for (i, v) in values.iter().enumerate() {
            assert_relative_eq!(
                estimated_value(&out, i, "mean"),
                v.unwrap(),
                epsilon = 1e-8
            );
            assert_relative_eq!(estimated_value(&out, i, "var"), 0.0, epsilon = 1e-8);
        }
    }

    #[test]
    fn test_estimated_band_is_symmetric_normal_interval() {
        // Noisy series: the exact residual variance depends on the fit, but
        // std^2 == var and the band is mean -/+ z * std by construction.
        let values: Vec<Option<f64>> = (0..20)
            .map(|i| Some(10.0 + if i % 2 == 0 { 1.5 } else { -1.5 }))
            .collect();
        let out =
            estimate_ensemble_stats(&single_member_frame(values), "suitability", 90.0).unwrap();
        let z = confidence_z(90.0).unwrap();
        assert_relative_eq!(z, 1.6448536269514722, epsilon = 1e-9);
        for i in 0..20 {
            let mean = estimated_value(&out, i, "mean");
            let var = estimated_value(&out, i, "var");
            let std = estimated_value(&out, i, "std");
            assert!(var > 0.0);
            assert_relative_eq!(std * std, var, epsilon = 1e-10);
            assert_relative_eq!(estimated_value(&out, i, "lower"), mean - z * std, epsilon = 1e-10);
            assert_relative_eq!(estimated_value(&out, i, "upper"), mean + z * std, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_estimated_statistic_labels_in_order() {
        let values: Vec<Option<f64>> = (0..6).map(|i| Some(i as f64)).collect();
        let out =
            estimate_ensemble_stats(&single_member_frame(values), "suitability", 90.0).unwrap();
        let labels = out.column(STATISTIC_COLUMN).unwrap().str().unwrap();
        let expected = ["mean", "var", "std", "lower", "upper"];
        for (offset, want) in expected.iter().enumerate() {
            assert_eq!(labels.get(offset), Some(*want));
        }
    }

    #[test]
    fn test_estimate_rejects_multiple_realizations() {
        let mut df = single_member_frame(vec![Some(1.0), Some(2.0)]);
        df.with_column(Series::new("realization".into(), vec![0i64, 1]))
            .unwrap();
        let err = estimate_ensemble_stats(&df, "suitability", 90.0).unwrap_err();
        assert!(matches!(
            err,
            CoreError::MultipleRealizations { count: 2 }
        ));
    }

    #[test]
    fn test_estimate_rejects_bad_conf_level() {
        let df = single_member_frame(vec![Some(1.0), Some(2.0)]);
        let err = estimate_ensemble_stats(&df, "suitability", 100.0).unwrap_err();
        assert!(matches!(err, CoreError::BadPercentile { .. }));
    }

    #[test]
    fn test_or_estimate_routes_on_realization_count() {
        // Single member: falls back to the trend-based estimate, whose
        // statistic set includes the confidence band.
        let single = single_member_frame((0..8).map(|i| Some(i as f64)).collect());
        let out = ensemble_stats_or_estimate(
            &single,
            "suitability",
            &["realization"],
            &[Statistic::Mean],
            90.0,
        )
        .unwrap();
        let labels = out.column(STATISTIC_COLUMN).unwrap().str().unwrap();
        let has_band = (0..out.height()).any(|r| labels.get(r) == Some("lower"));
        assert!(has_band);

        // Several members: the direct reduction runs and honors `stats`.
        let out = ensemble_stats_or_estimate(
            &sample_frame(),
            "suitability",
            &["realization"],
            &[Statistic::Mean],
            90.0,
        )
        .unwrap();
        let labels = out.column(STATISTIC_COLUMN).unwrap().str().unwrap();
        for row in 0..out.height() {
            assert_eq!(labels.get(row), Some("mean"));
        }
    }

    #[test]
    fn test_ensemble_mean_idempotent_over_collapsed_dim() {
        let once = ensemble_mean(&sample_frame(), "suitability", &["realization"]).unwrap();
        // The realization dimension is gone; collapsing it again is a no-op
        // group-by over the remaining coordinates.
        let twice = ensemble_mean(&once, "suitability", &[]).unwrap();
        let a = once.sort(["location"], SortMultipleOptions::default()).unwrap();
        let b = twice.sort(["location"], SortMultipleOptions::default()).unwrap();
        let va = a.column("suitability").unwrap().f64().unwrap();
        let vb = b.column("suitability").unwrap().f64().unwrap();
        for row in 0..a.height() {
            assert_relative_eq!(va.get(row).unwrap(), vb.get(row).unwrap(), epsilon = 1e-12);
        }
    }
}
