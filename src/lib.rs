//! Climate-ensemble suitability engine
//!
//! Computes climate suitability over climate-projection ensembles and
//! characterizes the resulting uncertainty:
//! - `model`: formula and lookup-table suitability models
//! - `engine`: parallel elementwise model evaluation
//! - `temporal`: yearly/monthly means and suitable-month counts
//! - `stats`: ensemble summary statistics with a `statistic` axis
//! - `decomposition`: nested variance decomposition across ensemble
//!   dimensions
//!
//! Datasets are long-format Polars frames wrapped in [`ClimateEnsemble`];
//! every operation derives a new frame and leaves its input untouched.

pub mod dataset;
pub mod decomposition;
pub mod engine;
pub mod errors;
pub mod model;
pub mod registry;
pub mod stats;
pub mod temporal;
pub mod testing;

mod utils;

// Re-export commonly used types
pub use dataset::{ClimateEnsemble, SuitabilityDataset, VariableMeta, ENSEMBLE_DIMENSIONS, VAR_SUITABILITY};
pub use decomposition::{decompose, decompose_estimated, VarianceDecomposition};
pub use errors::{CoreError, CoreResult, ErrorKind};
pub use model::{FormulaModel, LookupTableModel, SuitabilityModel};
pub use registry::ModelRegistry;
pub use stats::{
    default_statistics, ensemble_mean, ensemble_stats, ensemble_stats_or_estimate,
    estimate_ensemble_stats, Statistic, DEFAULT_CONF_LEVEL,
};
