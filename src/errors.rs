//! Error taxonomy for the suitability engine
//!
//! Four error families cover the whole crate: configuration (model/input
//! binding mismatches), domain (unit or declared-range mismatches), missing
//! data (a reduction cell with zero valid ensemble members), and numerical
//! (undefined results such as a zero total variance in fraction mode).
//!
//! Every message names the violated invariant and the variable, dimension or
//! coordinate implicated. Errors propagate immediately; no partial results.

use thiserror::Error;

/// Crate-wide result alias.
pub type CoreResult<T> = Result<T, CoreError>;

/// Coarse error family, matching the documented taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Model/input binding mismatch.
    Configuration,
    /// Unit or declared-range mismatch.
    Domain,
    /// No valid ensemble members for a reduction cell.
    MissingData,
    /// Undefined numerical result.
    Numerical,
    /// Underlying data-frame failure.
    Internal,
}

/// Unified error type for all core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    // ---- Configuration: model/input binding ----
    /// A required input variable is absent from the dataset.
    #[error("required input variable '{variable}' is absent from the dataset")]
    MissingVariable { variable: String },

    /// A required dimension column is absent from the dataset.
    #[error("required dimension '{dimension}' is absent from the dataset")]
    MissingDimension { dimension: String },

    /// A dataset column has an unusable dtype.
    #[error("column '{column}' must have dtype {expected}, found {actual}")]
    BadColumnDtype {
        column: String,
        expected: String,
        actual: String,
    },

    /// A model definition violates its own construction invariants.
    #[error("invalid model definition: {reason}")]
    InvalidModel { reason: String },

    /// A requested statistic is malformed.
    #[error("percentile {value} is outside the closed interval [0, 100]")]
    BadPercentile { value: f64 },

    /// No statistics were requested for an ensemble reduction.
    #[error("at least one statistic must be requested for an ensemble reduction")]
    NoStatistics,

    /// A model name is not present in the registry.
    #[error("no suitability model named '{name}' is registered")]
    UnknownModel { name: String },

    /// A requested variance source is not part of a decomposition.
    #[error("no variance source named '{name}' in this decomposition")]
    UnknownSource { name: String },

    /// Trend-based estimation requires a single ensemble member.
    #[error(
        "internal variability can only be estimated from a single realization; \
         found {count} (compute ensemble statistics directly instead)"
    )]
    MultipleRealizations { count: usize },

    // ---- Domain: units / declared ranges ----
    /// Dataset units differ from the model's expected units (exact match
    /// required; no implicit conversion).
    #[error(
        "units mismatch for input variable '{variable}': model expects '{expected}', \
         dataset declares '{actual}'"
    )]
    UnitsMismatch {
        variable: String,
        expected: String,
        actual: String,
    },

    // ---- Missing data ----
    /// A reduction cell has zero valid (non-null) ensemble members.
    #[error(
        "no valid ensemble members for variable '{variable}' at {coordinate}; \
         cannot compute a reduction for this cell"
    )]
    NoValidMembers { variable: String, coordinate: String },

    // ---- Numerical ----
    /// The least-squares time-trend fit did not converge.
    #[error("time-trend fit failed for '{variable}' at {coordinate}: {reason}")]
    TrendFitFailed {
        variable: String,
        coordinate: String,
        reason: String,
    },

    /// Fraction-mode decomposition is undefined when total variance is zero.
    #[error(
        "total variance of '{variable}' is zero at {coordinate}; \
         fractional decomposition is undefined"
    )]
    ZeroTotalVariance { variable: String, coordinate: String },

    // ---- Internal ----
    /// Wrapper for Polars failures surfaced by frame operations.
    #[error(transparent)]
    Polars(#[from] polars::error::PolarsError),
}

impl CoreError {
    /// Family of this error within the documented taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::MissingVariable { .. }
            | CoreError::MissingDimension { .. }
            | CoreError::BadColumnDtype { .. }
            | CoreError::InvalidModel { .. }
            | CoreError::BadPercentile { .. }
            | CoreError::NoStatistics
            | CoreError::UnknownModel { .. }
            | CoreError::UnknownSource { .. }
            | CoreError::MultipleRealizations { .. } => ErrorKind::Configuration,
            CoreError::UnitsMismatch { .. } => ErrorKind::Domain,
            CoreError::NoValidMembers { .. } => ErrorKind::MissingData,
            CoreError::TrendFitFailed { .. } | CoreError::ZeroTotalVariance { .. } => {
                ErrorKind::Numerical
            }
            CoreError::Polars(_) => ErrorKind::Internal,
        }
    }
}
