//! Climate-ensemble data container
//!
//! A `ClimateEnsemble` holds a long-format (tidy) Polars frame: one column
//! per dimension coordinate, one `f64` column per climate variable, one row
//! per coordinate combination. Missing observations are nulls. Variable
//! metadata (units, long name) travels with the frame so downstream engines
//! can enforce exact unit matches without out-of-band knowledge.
//!
//! The container is read-only after construction: every engine derives new
//! frames and never mutates its input.

use polars::prelude::*;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::errors::{CoreError, CoreResult};

/// Time dimension column (Polars `Date`).
pub const DIM_TIME: &str = "time";
/// Spatial dimension column.
pub const DIM_LOCATION: &str = "location";
/// Stochastic-realization dimension column.
pub const DIM_REALIZATION: &str = "realization";
/// Climate-model dimension column.
pub const DIM_MODEL: &str = "model";
/// Emissions-scenario dimension column.
pub const DIM_SCENARIO: &str = "scenario";

/// The recognized dimension columns of a raw ensemble dataset.
pub const DIMENSION_COLUMNS: [&str; 5] = [
    DIM_TIME,
    DIM_LOCATION,
    DIM_REALIZATION,
    DIM_MODEL,
    DIM_SCENARIO,
];

/// Optional per-timestep period bound columns (Polars `Date`).
pub const TIME_LOWER: &str = "time_lower";
pub const TIME_UPPER: &str = "time_upper";
pub const TIME_BOUND_COLUMNS: [&str; 2] = [TIME_LOWER, TIME_UPPER];

/// Calendar columns produced by the temporal aggregator.
pub const CAL_YEAR: &str = "year";
/// Calendar month column (1-12).
pub const CAL_MONTH: &str = "month";

/// Every column ever treated as a coordinate by the reduction engines.
pub const COORDINATE_COLUMNS: [&str; 7] = [
    DIM_TIME,
    CAL_YEAR,
    CAL_MONTH,
    DIM_LOCATION,
    DIM_REALIZATION,
    DIM_MODEL,
    DIM_SCENARIO,
];

/// The three ensemble dimensions capturing structural/stochastic uncertainty.
pub const ENSEMBLE_DIMENSIONS: [&str; 3] = [DIM_MODEL, DIM_SCENARIO, DIM_REALIZATION];

/// Name of the derived suitability variable.
pub const VAR_SUITABILITY: &str = "suitability";

/// Per-variable metadata carried alongside the frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableMeta {
    /// Units string; compared exactly against model expectations.
    pub units: String,
    /// Human-readable name for reporting layers.
    pub long_name: String,
}

impl VariableMeta {
    pub fn new(units: &str, long_name: &str) -> Self {
        Self {
            units: units.to_string(),
            long_name: long_name.to_string(),
        }
    }
}

/// Labeled multi-dimensional climate (or suitability) dataset.
///
/// Dimension names and coordinates are consistent across all variables by
/// construction: a single frame holds every variable column.
#[derive(Debug, Clone)]
pub struct ClimateEnsemble {
    frame: DataFrame,
    dims: SmallVec<[String; 5]>,
    variables: FxHashMap<String, VariableMeta>,
}

/// A suitability dataset is a climate ensemble carrying the derived
/// `suitability` variable; it shares the container type.
pub type SuitabilityDataset = ClimateEnsemble;

impl ClimateEnsemble {
    /// Wrap a long-format frame, validating its layout.
    ///
    /// `variables` registers each data-variable column with its metadata.
    /// Dimension columns are inferred from the recognized dimension set.
    ///
    /// # Errors
    /// - `MissingVariable` if a registered variable column is absent.
    /// - `BadColumnDtype` if a variable column is not `Float64`, or the
    ///   `time` column is not `Date`.
    pub fn new(
        frame: DataFrame,
        variables: Vec<(&str, VariableMeta)>,
    ) -> CoreResult<Self> {
        let dims: SmallVec<[String; 5]> = DIMENSION_COLUMNS
            .iter()
            .filter(|d| frame.get_column_names().iter().any(|n| n.as_str() == **d))
            .map(|d| d.to_string())
            .collect();

        if dims.iter().any(|d| d == DIM_TIME) {
            let dtype = frame.column(DIM_TIME)?.dtype().clone();
            if dtype != DataType::Date {
                return Err(CoreError::BadColumnDtype {
                    column: DIM_TIME.to_string(),
                    expected: "Date".to_string(),
                    actual: format!("{}", dtype),
                });
            }
        }
        for bound in TIME_BOUND_COLUMNS {
            if let Ok(column) = frame.column(bound) {
                if column.dtype() != &DataType::Date {
                    return Err(CoreError::BadColumnDtype {
                        column: bound.to_string(),
                        expected: "Date".to_string(),
                        actual: format!("{}", column.dtype()),
                    });
                }
            }
        }

        let mut registered = FxHashMap::default();
        for (name, meta) in variables {
            let column = frame
                .column(name)
                .map_err(|_| CoreError::MissingVariable {
                    variable: name.to_string(),
                })?;
            if column.dtype() != &DataType::Float64 {
                return Err(CoreError::BadColumnDtype {
                    column: name.to_string(),
                    expected: "Float64".to_string(),
                    actual: format!("{}", column.dtype()),
                });
            }
            registered.insert(name.to_string(), meta);
        }

        Ok(Self {
            frame,
            dims,
            variables: registered,
        })
    }

    /// Underlying long-format frame.
    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    /// Lazy view over the underlying frame.
    pub fn lazy(&self) -> LazyFrame {
        self.frame.clone().lazy()
    }

    /// Dimension columns present, in canonical order.
    pub fn dims(&self) -> &[String] {
        &self.dims
    }

    pub fn has_dim(&self, dim: &str) -> bool {
        self.dims.iter().any(|d| d == dim)
    }

    /// Dimension columns other than `time`.
    pub fn non_time_dims(&self) -> Vec<String> {
        self.dims
            .iter()
            .filter(|d| d.as_str() != DIM_TIME)
            .cloned()
            .collect()
    }

    /// Period bound columns present in the frame.
    pub fn time_bound_columns(&self) -> Vec<String> {
        TIME_BOUND_COLUMNS
            .iter()
            .filter(|b| self.frame.column(b).is_ok())
            .map(|b| b.to_string())
            .collect()
    }

    /// Registered variable names (unordered).
    pub fn variable_names(&self) -> Vec<&str> {
        self.variables.keys().map(|k| k.as_str()).collect()
    }

    /// Metadata for a registered variable, or a `MissingVariable` error.
    pub fn require_variable(&self, name: &str) -> CoreResult<&VariableMeta> {
        self.variables
            .get(name)
            .ok_or_else(|| CoreError::MissingVariable {
                variable: name.to_string(),
            })
    }

    /// Units of a registered variable, if any.
    pub fn units(&self, name: &str) -> Option<&str> {
        self.variables.get(name).map(|m| m.units.as_str())
    }

    /// Number of rows (coordinate combinations) in the frame.
    pub fn len(&self) -> usize {
        self.frame.height()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }

    /// Require a dimension column, or a `MissingDimension` error.
    pub fn require_dim(&self, dim: &str) -> CoreResult<()> {
        if self.has_dim(dim) {
            Ok(())
        } else {
            Err(CoreError::MissingDimension {
                dimension: dim.to_string(),
            })
        }
    }
}
