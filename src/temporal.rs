//! Temporal aggregation
//!
//! Reductions along the `time` dimension of a long-format dataset: calendar
//! yearly and monthly means, and the count of suitable months per year.
//! Calendar columns (`year`, `month`) are derived from the `time` column;
//! all other dimension columns pass through as group keys, so per-location
//! (and per-member) structure is preserved. Months without any observation
//! simply contribute no rows and are excluded rather than counted as zero.
//!
//! Outputs stay in the [`ClimateEnsemble`] container: variable metadata is
//! carried over and period bounds (`time_lower`, `time_upper`) are
//! re-established at the new calendar frequency.

use chrono::NaiveDate;
use polars::prelude::*;
use tracing::debug;

use crate::dataset::{
    ClimateEnsemble, SuitabilityDataset, VariableMeta, CAL_MONTH, CAL_YEAR, DIM_TIME, TIME_LOWER,
    TIME_UPPER, VAR_SUITABILITY,
};
use crate::errors::CoreResult;
use crate::utils::grouped_agg;

fn year_expr() -> Expr {
    col(DIM_TIME)
        .dt()
        .year()
        .cast(DataType::Int32)
        .alias(CAL_YEAR)
}

fn month_expr() -> Expr {
    col(DIM_TIME)
        .dt()
        .month()
        .cast(DataType::Int32)
        .alias(CAL_MONTH)
}

// Period bounds covering each calendar year.
fn attach_year_bounds(mut frame: DataFrame) -> CoreResult<DataFrame> {
    let years = frame.column(CAL_YEAR)?.i32()?;
    let lower: Vec<Option<NaiveDate>> = years
        .into_iter()
        .map(|y| y.and_then(|y| NaiveDate::from_ymd_opt(y, 1, 1)))
        .collect();
    let upper: Vec<Option<NaiveDate>> = years
        .into_iter()
        .map(|y| y.and_then(|y| NaiveDate::from_ymd_opt(y, 12, 31)))
        .collect();
    frame.with_column(Series::new(TIME_LOWER.into(), lower))?;
    frame.with_column(Series::new(TIME_UPPER.into(), upper))?;
    Ok(frame)
}

// Period bounds covering each calendar month.
fn attach_month_bounds(mut frame: DataFrame) -> CoreResult<DataFrame> {
    let years = frame.column(CAL_YEAR)?.i32()?;
    let months = frame.column(CAL_MONTH)?.i32()?;
    let first_day = |y: i32, m: i32| NaiveDate::from_ymd_opt(y, m as u32, 1);
    let mut lower: Vec<Option<NaiveDate>> = Vec::with_capacity(frame.height());
    let mut upper: Vec<Option<NaiveDate>> = Vec::with_capacity(frame.height());
    for row in 0..frame.height() {
        match (years.get(row), months.get(row)) {
            (Some(y), Some(m)) => {
                lower.push(first_day(y, m));
                let next = if m == 12 {
                    first_day(y + 1, 1)
                } else {
                    first_day(y, m + 1)
                };
                upper.push(next.and_then(|d| d.pred_opt()));
            }
            _ => {
                lower.push(None);
                upper.push(None);
            }
        }
    }
    frame.with_column(Series::new(TIME_LOWER.into(), lower))?;
    frame.with_column(Series::new(TIME_UPPER.into(), upper))?;
    Ok(frame)
}

/// Mean of `variable` per calendar year, grouped by every non-time
/// dimension. Nulls are skipped by the mean; a group with no valid values
/// yields a null mean.
///
/// The output replaces `time` with a `year` column, carries the variable's
/// metadata over, and re-establishes period bounds spanning each year.
///
/// # Errors
/// `MissingDimension` if the dataset has no `time` dimension,
/// `MissingVariable` if `variable` is not registered.
pub fn yearly_average(dataset: &ClimateEnsemble, variable: &str) -> CoreResult<ClimateEnsemble> {
    dataset.require_dim(DIM_TIME)?;
    let meta = dataset.require_variable(variable)?.clone();

    let mut keys = dataset.non_time_dims();
    keys.push(CAL_YEAR.to_string());
    debug!(variable, keys = ?keys, "yearly average");

    let lf = dataset.lazy().with_columns([year_expr()]);
    let out = grouped_agg(lf, &keys, vec![col(variable).mean()])
        .sort(keys.clone(), SortMultipleOptions::default())
        .collect()?;
    ClimateEnsemble::new(attach_year_bounds(out)?, vec![(variable, meta)])
}

/// Mean of `variable` per calendar month of each year, grouped by every
/// non-time dimension. The output carries `year` and `month` (1-12)
/// columns in place of `time`, the variable's metadata, and period bounds
/// spanning each month.
///
/// # Errors
/// As [`yearly_average`].
pub fn monthly_average(dataset: &ClimateEnsemble, variable: &str) -> CoreResult<ClimateEnsemble> {
    dataset.require_dim(DIM_TIME)?;
    let meta = dataset.require_variable(variable)?.clone();

    let mut keys = dataset.non_time_dims();
    keys.push(CAL_YEAR.to_string());
    keys.push(CAL_MONTH.to_string());
    debug!(variable, keys = ?keys, "monthly average");

    let lf = dataset.lazy().with_columns([year_expr(), month_expr()]);
    let out = grouped_agg(lf, &keys, vec![col(variable).mean()])
        .sort(keys.clone(), SortMultipleOptions::default())
        .collect()?;
    ClimateEnsemble::new(attach_month_bounds(out)?, vec![(variable, meta)])
}

/// Number of months per calendar year containing at least one timestep with
/// suitability strictly above `threshold`.
///
/// Works in two grouped passes: per-month count of suitable timesteps, then
/// per-year count of months with a non-zero count. The output carries a
/// `months_suitable` variable (0-12) per year and non-time coordinate,
/// with yearly period bounds. Null suitability values never count as
/// suitable.
///
/// # Errors
/// `MissingDimension` if the dataset has no `time` dimension,
/// `MissingVariable` if it carries no `suitability` variable.
pub fn months_suitable(
    suitability: &SuitabilityDataset,
    threshold: f64,
) -> CoreResult<ClimateEnsemble> {
    suitability.require_dim(DIM_TIME)?;
    suitability.require_variable(VAR_SUITABILITY)?;

    let mut monthly_keys = suitability.non_time_dims();
    monthly_keys.push(CAL_YEAR.to_string());
    monthly_keys.push(CAL_MONTH.to_string());

    let lf = suitability.lazy().with_columns([year_expr(), month_expr()]);
    let monthly = grouped_agg(
        lf,
        &monthly_keys,
        vec![col(VAR_SUITABILITY)
            .gt(lit(threshold))
            .sum()
            .alias("n_suitable")],
    );

    let mut yearly_keys = suitability.non_time_dims();
    yearly_keys.push(CAL_YEAR.to_string());
    debug!(threshold, keys = ?yearly_keys, "months suitable");

    let out = grouped_agg(
        monthly,
        &yearly_keys,
        vec![col("n_suitable")
            .gt(lit(0))
            .sum()
            .cast(DataType::Float64)
            .alias("months_suitable")],
    )
    .sort(yearly_keys.clone(), SortMultipleOptions::default())
    .collect()?;

    ClimateEnsemble::new(
        attach_year_bounds(out)?,
        vec![(
            "months_suitable",
            VariableMeta::new("months", "Months suitable per year"),
        )],
    )
}
