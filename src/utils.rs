//! Shared frame helpers
//!
//! Small utilities used by the temporal, statistics and decomposition
//! engines: grouped aggregation that degrades gracefully to a global
//! aggregation when no group keys remain, and coordinate formatting for
//! error messages that must name the implicated cell.

use polars::prelude::*;

use crate::dataset::COORDINATE_COLUMNS;
use crate::errors::CoreResult;

/// Aggregate `aggs` over groups defined by `keys`, or over the whole frame
/// when `keys` is empty (a zero-dimensional reduction).
pub(crate) fn grouped_agg(lf: LazyFrame, keys: &[String], aggs: Vec<Expr>) -> LazyFrame {
    if keys.is_empty() {
        lf.select(aggs)
    } else {
        let key_exprs: Vec<Expr> = keys.iter().map(|k| col(k.as_str())).collect();
        lf.group_by(key_exprs).agg(aggs)
    }
}

/// Coordinate columns present in `frame`, excluding those listed in `skip`.
///
/// Coordinate columns are the documented dimension set plus the calendar
/// columns produced by the temporal aggregator; data-variable columns are
/// never treated as group keys.
pub(crate) fn passthrough_columns(frame: &DataFrame, skip: &[&str]) -> Vec<String> {
    COORDINATE_COLUMNS
        .iter()
        .filter(|c| frame.get_column_names().iter().any(|n| n.as_str() == **c))
        .filter(|c| !skip.contains(c))
        .map(|c| c.to_string())
        .collect()
}

/// Format the coordinate of row `row` as `key=value, key=value` for error
/// messages. Falls back to `(scalar)` when there are no key columns.
pub(crate) fn row_coordinate(frame: &DataFrame, row: usize, keys: &[String]) -> CoreResult<String> {
    if keys.is_empty() {
        return Ok("(scalar)".to_string());
    }
    let mut parts = Vec::with_capacity(keys.len());
    for key in keys {
        let value = frame.column(key)?.get(row)?;
        parts.push(format!("{}={}", key, value));
    }
    Ok(parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passthrough_excludes_skipped_and_value_columns() {
        let df = df!(
            "location" => &["a", "b"],
            "realization" => &[1i64, 2],
            "temperature" => &[10.0, 12.0],
        )
        .unwrap();

        let keys = passthrough_columns(&df, &["realization"]);
        assert_eq!(keys, vec!["location".to_string()]);
    }

    #[test]
    fn test_grouped_agg_with_empty_keys_is_global() {
        let df = df!("x" => &[1.0, 2.0, 3.0]).unwrap();
        let out = grouped_agg(df.lazy(), &[], vec![col("x").mean()])
            .collect()
            .unwrap();
        assert_eq!(out.height(), 1);
        let mean = out.column("x").unwrap().f64().unwrap().get(0).unwrap();
        assert!((mean - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_row_coordinate_names_keys() {
        let df = df!(
            "model" => &["cesm2"],
            "scenario" => &["ssp245"],
        )
        .unwrap();
        let keys = vec!["model".to_string(), "scenario".to_string()];
        let coord = row_coordinate(&df, 0, &keys).unwrap();
        assert!(coord.contains("model=") && coord.contains("scenario="));
    }
}
