//! Variance decomposition
//!
//! Splits the ensemble variance of a variable into additive components
//! attributed to an ordered list of ensemble dimensions, plus an `internal`
//! residual for variation within the finest ensemble cell. For dimensions
//! `d1..dk` in decomposition order, the component for `di` is
//!
//! ```text
//! comp_i = E_{d1..d(i-1)}[ Var_{di}( E_{d(i+1)..dk}[x] ) ]
//! ```
//!
//! with population variance (ddof 0) throughout. On a balanced design the
//! components plus the internal residual sum exactly to the total variance
//! by the law of total variance; unbalanced designs remain well defined but
//! the sum is approximate.
//!
//! All remaining coordinate columns (year, location, ...) pass through as
//! group keys, so the decomposition is computed per coordinate cell.

use polars::prelude::*;
use tracing::debug;

use crate::errors::{CoreError, CoreResult};
use crate::stats::{estimate_ensemble_stats, STATISTIC_COLUMN};
use crate::utils::{grouped_agg, passthrough_columns, row_coordinate};

/// Variance source label column in the output frame.
pub const SOURCE_COLUMN: &str = "source";

/// Label of the within-cell residual component.
pub const SOURCE_INTERNAL: &str = "internal";

/// Result of a variance decomposition.
///
/// The frame holds one row per (passthrough coordinate, source); sources
/// appear in decomposition order with `internal` last.
#[derive(Debug, Clone)]
pub struct VarianceDecomposition {
    frame: DataFrame,
    variable: String,
    sources: Vec<String>,
}

impl VarianceDecomposition {
    /// Long-format component frame.
    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    /// Decomposed variable name.
    pub fn variable(&self) -> &str {
        &self.variable
    }

    /// Source labels in decomposition order (`internal` last).
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    /// Rows of a single variance source.
    ///
    /// # Errors
    /// `UnknownSource` if `name` is not one of [`Self::sources`].
    pub fn component(&self, name: &str) -> CoreResult<DataFrame> {
        if !self.sources.iter().any(|s| s == name) {
            return Err(CoreError::UnknownSource {
                name: name.to_string(),
            });
        }
        let out = self
            .frame
            .clone()
            .lazy()
            .filter(col(SOURCE_COLUMN).eq(lit(name)))
            .collect()?;
        Ok(out)
    }
}

/// Decompose the variance of `variable` over `dims`, in that order.
///
/// With `fraction` set, each component is divided by the total variance at
/// its coordinate. An empty `dims` list attributes everything to
/// `internal`.
///
/// # Errors
/// - `MissingVariable` / `MissingDimension` if `variable` or a requested
///   dimension is absent from the frame.
/// - `NoValidMembers` if a passthrough coordinate holds only nulls.
/// - `ZeroTotalVariance` in fraction mode when the total variance at some
///   coordinate is zero.
pub fn decompose(
    frame: &DataFrame,
    variable: &str,
    dims: &[&str],
    fraction: bool,
) -> CoreResult<VarianceDecomposition> {
    if frame.column(variable).is_err() {
        return Err(CoreError::MissingVariable {
            variable: variable.to_string(),
        });
    }
    for dim in dims {
        if frame.column(dim).is_err() {
            return Err(CoreError::MissingDimension {
                dimension: dim.to_string(),
            });
        }
    }

    let keys = passthrough_columns(frame, dims);
    debug!(variable, ?dims, keys = ?keys, fraction, "variance decomposition");

    let lf = frame
        .clone()
        .lazy()
        .with_columns([col(variable).cast(DataType::Float64)]);

    // Every passthrough coordinate must hold at least one valid value.
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

    let mut components: Vec<LazyFrame> = Vec::with_capacity(dims.len() + 1);
    for (i, dim) in dims.iter().enumerate() {
        // Inner mean over the dimensions after `dim`.
        let mut inner_keys = keys.clone();
        inner_keys.extend(dims[..=i].iter().map(|d| d.to_string()));
        let inner = grouped_agg(lf.clone(), &inner_keys, vec![col(variable).mean()]);

        // Variance over `dim` of the inner means.
        let mut var_keys = keys.clone();
        var_keys.extend(dims[..i].iter().map(|d| d.to_string()));
        let varred = grouped_agg(inner, &var_keys, vec![col(variable).var(0)]);

        // Expectation over the dimensions before `dim`.
        components.push(
            grouped_agg(varred, &keys, vec![col(variable).mean()])
                .with_column(lit(*dim).alias(SOURCE_COLUMN)),
        );
    }

    // Residual: mean within-cell variance at the finest ensemble cell.
    let mut cell_keys = keys.clone();
    cell_keys.extend(dims.iter().map(|d| d.to_string()));
    let cells = grouped_agg(lf.clone(), &cell_keys, vec![col(variable).var(0)]);
    components.push(
        grouped_agg(cells, &keys, vec![col(variable).mean()])
            .with_column(lit(SOURCE_INTERNAL).alias(SOURCE_COLUMN)),
    );

    let mut select_cols: Vec<Expr> = keys.iter().map(|k| col(k.as_str())).collect();
    select_cols.push(col(SOURCE_COLUMN));
    select_cols.push(col(variable));

    let mut stacked = concat(components, UnionArgs::default())?.select(select_cols.clone());
    if !keys.is_empty() {
        // Stable sort keeps sources in decomposition order within a cell.
        stacked = stacked.sort(
            keys.clone(),
            SortMultipleOptions::default().with_maintain_order(true),
        );
    }

    let out = if fraction {
        let total = grouped_agg(
            lf,
            &keys,
            vec![col(variable).var(0).alias("variance_total")],
        )
        .collect()?;
        {
            let totals = total.column("variance_total")?.f64()?;
            for row in 0..total.height() {
                if totals.get(row) == Some(0.0) {
                    return Err(CoreError::ZeroTotalVariance {
                        variable: variable.to_string(),
                        coordinate: row_coordinate(&total, row, &keys)?,
                    });
                }
            }
        }

        if keys.is_empty() {
            // Single global total; no join needed.
            let grand_total = total
                .column("variance_total")?
                .f64()?
                .get(0)
                .unwrap_or(f64::NAN);
            stacked
                .with_column((col(variable) / lit(grand_total)).alias(variable))
                .select(select_cols)
                .collect()?
        } else {
            let left_on: Vec<Expr> = keys.iter().map(|k| col(k.as_str())).collect();
            stacked
                .join(
                    total.lazy(),
                    left_on.clone(),
                    left_on,
                    JoinArgs::new(JoinType::Left),
                )
                .with_column((col(variable) / col("variance_total")).alias(variable))
                .select(select_cols)
                .collect()?
        }
    } else {
        stacked.collect()?
    };

    let mut sources: Vec<String> = dims.iter().map(|d| d.to_string()).collect();
    sources.push(SOURCE_INTERNAL.to_string());

    Ok(VarianceDecomposition {
        frame: out,
        variable: variable.to_string(),
        sources,
    })
}

/// Variance decomposition for single-realization ensembles.
///
/// With only one realization per series the sample spread across members
/// is degenerate, so internal variability is estimated first via
/// [`estimate_ensemble_stats`]: the `dims` components are decomposed from
/// the fitted trend (`mean` estimate), and the `internal` source is the
/// mean over `dims` of the residual variance. `realization` must not
/// appear in `dims`; its variability is what the residual estimates.
///
/// With `fraction` set, components are divided by their per-coordinate
/// sum (the estimated total), which must be non-zero.
///
/// # Errors
/// As [`decompose`] and [`estimate_ensemble_stats`].
pub fn decompose_estimated(
    frame: &DataFrame,
    variable: &str,
    dims: &[&str],
    fraction: bool,
    conf_level: f64,
) -> CoreResult<VarianceDecomposition> {
    debug!(variable, ?dims, fraction, conf_level, "variance decomposition from estimated stats");
    let estimated = estimate_ensemble_stats(frame, variable, conf_level)?;

    let mut mean_rows = estimated
        .clone()
        .lazy()
        .filter(col(STATISTIC_COLUMN).eq(lit("mean")))
        .collect()?;
    let _ = mean_rows.drop_in_place(STATISTIC_COLUMN)?;
    let base = decompose(&mean_rows, variable, dims, false)?;

    // Internal source: residual variance averaged over the ensemble dims.
    let var_rows = estimated
        .lazy()
        .filter(col(STATISTIC_COLUMN).eq(lit("var")))
        .collect()?;
    let keys = passthrough_columns(&var_rows, dims);
    let internal = grouped_agg(var_rows.lazy(), &keys, vec![col(variable).mean()])
        .with_column(lit(SOURCE_INTERNAL).alias(SOURCE_COLUMN));

    let mut select_cols: Vec<Expr> = keys.iter().map(|k| col(k.as_str())).collect();
    select_cols.push(col(SOURCE_COLUMN));
    select_cols.push(col(variable));

    let components = base
        .frame()
        .clone()
        .lazy()
        .filter(col(SOURCE_COLUMN).neq(lit(SOURCE_INTERNAL)))
        .select(select_cols.clone());
    let mut stacked = concat(
        [components, internal.select(select_cols.clone())],
        UnionArgs::default(),
    )?;
    if !keys.is_empty() {
        stacked = stacked.sort(
            keys.clone(),
            SortMultipleOptions::default().with_maintain_order(true),
        );
    }
    let stacked = stacked.collect()?;

    let out = if fraction {
        let totals = grouped_agg(
            stacked.clone().lazy(),
            &keys,
            vec![col(variable).sum().alias("variance_total")],
        )
        .collect()?;
        {
            let sums = totals.column("variance_total")?.f64()?;
            for row in 0..totals.height() {
                if sums.get(row) == Some(0.0) {
                    return Err(CoreError::ZeroTotalVariance {
                        variable: variable.to_string(),
                        coordinate: row_coordinate(&totals, row, &keys)?,
                    });
                }
            }
        }

        if keys.is_empty() {
            let grand_total = totals
                .column("variance_total")?
                .f64()?
                .get(0)
                .unwrap_or(f64::NAN);
            stacked
                .lazy()
                .with_column((col(variable) / lit(grand_total)).alias(variable))
                .select(select_cols)
                .collect()?
        } else {
            let left_on: Vec<Expr> = keys.iter().map(|k| col(k.as_str())).collect();
            stacked
                .lazy()
                .join(
                    totals.lazy(),
                    left_on.clone(),
                    left_on,
                    JoinArgs::new(JoinType::Left),
                )
                .with_column((col(variable) / col("variance_total")).alias(variable))
                .select(select_cols)
                .collect()?
        }
    } else {
        stacked
    };

    let mut sources: Vec<String> = dims.iter().map(|d| d.to_string()).collect();
    sources.push(SOURCE_INTERNAL.to_string());

    Ok(VarianceDecomposition {
        frame: out,
        variable: variable.to_string(),
        sources,
    })
}
