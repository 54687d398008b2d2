//! Suitability models
//!
//! A suitability model is a pure, immutable response function mapping one or
//! more climate variables to a suitability value. Two variants exist:
//!
//! - [`FormulaModel`]: an explicit mathematical expression over named input
//!   variables with a declared valid domain per input. Values outside the
//!   domain yield zero suitability (domain truncation, not an error).
//! - [`LookupTableModel`]: multilinear interpolation over an N-dimensional
//!   niche grid. Points outside the grid extent clamp to the nearest
//!   in-grid value and are never extrapolated.
//!
//! Models are `Send + Sync` and safe to share across parallel evaluations.

pub mod formula;
pub mod lookup;

pub use formula::FormulaModel;
pub use lookup::{GridAxis, LookupTableModel, TableSpec};

use crate::dataset::ClimateEnsemble;
use crate::errors::{CoreError, CoreResult};

/// Kind of values a model produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    /// 0/1 suitability.
    Boolean,
    /// Continuous suitability in `[0, max_suitability]`.
    Continuous,
}

/// Named input variable with its expected units.
#[derive(Debug, Clone, PartialEq)]
pub struct InputSpec {
    pub variable: String,
    pub units: String,
}

impl InputSpec {
    pub fn new(variable: &str, units: &str) -> Self {
        Self {
            variable: variable.to_string(),
            units: units.to_string(),
        }
    }
}

/// Tagged suitability-model variant.
#[derive(Debug, Clone)]
pub enum SuitabilityModel {
    Formula(FormulaModel),
    Table(LookupTableModel),
}

impl SuitabilityModel {
    /// Required input variables, in evaluation order.
    pub fn inputs(&self) -> &[InputSpec] {
        match self {
            SuitabilityModel::Formula(m) => m.inputs(),
            SuitabilityModel::Table(m) => m.inputs(),
        }
    }

    /// Elementwise evaluation. `values` must follow [`Self::inputs`] order.
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        match self {
            SuitabilityModel::Formula(m) => m.evaluate(values),
            SuitabilityModel::Table(m) => m.evaluate(values),
        }
    }

    /// Global maximum achievable output, used for normalization.
    pub fn max_suitability(&self) -> f64 {
        match self {
            SuitabilityModel::Formula(m) => m.max_suitability(),
            SuitabilityModel::Table(m) => m.max_suitability(),
        }
    }

    pub fn output_kind(&self) -> OutputKind {
        match self {
            SuitabilityModel::Formula(m) => m.output_kind(),
            SuitabilityModel::Table(m) => m.output_kind(),
        }
    }

    /// Check that the dataset supplies every required input variable with
    /// exactly matching units.
    ///
    /// # Errors
    /// - `MissingVariable` if an input is absent from the dataset.
    /// - `UnitsMismatch` if the dataset's declared units differ from the
    ///   model's expected units (exact match; no implicit conversion).
    pub fn check_inputs(&self, dataset: &ClimateEnsemble) -> CoreResult<()> {
        for input in self.inputs() {
            let meta = dataset.require_variable(&input.variable)?;
            if meta.units != input.units {
                return Err(CoreError::UnitsMismatch {
                    variable: input.variable.clone(),
                    expected: input.units.clone(),
                    actual: meta.units.clone(),
                });
            }
        }
        Ok(())
    }
}
