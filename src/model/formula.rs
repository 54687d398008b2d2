//! Formula-based suitability models
//!
//! A `FormulaModel` wraps an explicit mathematical expression over named
//! input variables, each with a declared valid domain `[lo, hi]`. Inputs
//! outside their domain (including non-finite values) truncate the output to
//! zero suitability; the expression is only consulted inside the domain, so
//! it is never asked to extrapolate.

use std::fmt;
use std::sync::Arc;

use crate::errors::{CoreError, CoreResult};
use crate::model::{InputSpec, OutputKind};

/// Response expression over the model's inputs, in declaration order.
pub type ResponseFn = dyn Fn(&[f64]) -> f64 + Send + Sync;

/// One formula input: variable binding, expected units, valid domain.
#[derive(Debug, Clone, PartialEq)]
pub struct FormulaInput {
    pub spec: InputSpec,
    /// Closed valid domain `[lo, hi]`.
    pub domain: [f64; 2],
}

impl FormulaInput {
    pub fn new(variable: &str, units: &str, domain: [f64; 2]) -> Self {
        Self {
            spec: InputSpec::new(variable, units),
            domain,
        }
    }
}

/// Immutable formula-based response function.
#[derive(Clone)]
pub struct FormulaModel {
    inputs: Vec<FormulaInput>,
    specs: Vec<InputSpec>,
    response: Arc<ResponseFn>,
    output: OutputKind,
    max_suitability: f64,
}

impl fmt::Debug for FormulaModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormulaModel")
            .field("inputs", &self.inputs)
            .field("output", &self.output)
            .field("max_suitability", &self.max_suitability)
            .finish_non_exhaustive()
    }
}

impl FormulaModel {
    /// Build a formula model from inputs and a response expression.
    ///
    /// `max_suitability` declares the global maximum achievable output
    /// (consumers use it for normalization); the expression is trusted to
    /// stay within `[0, max_suitability]` inside the declared domain.
    ///
    /// # Errors
    /// `InvalidModel` if no inputs are declared, input names repeat, a
    /// domain is empty or non-finite, or `max_suitability` is not positive.
    pub fn new(
        inputs: Vec<FormulaInput>,
        response: impl Fn(&[f64]) -> f64 + Send + Sync + 'static,
        output: OutputKind,
        max_suitability: f64,
    ) -> CoreResult<Self> {
        if inputs.is_empty() {
            return Err(CoreError::InvalidModel {
                reason: "a formula model requires at least one input variable".to_string(),
            });
        }
        for (i, a) in inputs.iter().enumerate() {
            let [lo, hi] = a.domain;
            if !lo.is_finite() || !hi.is_finite() || lo > hi {
                return Err(CoreError::InvalidModel {
                    reason: format!(
                        "input '{}' has an invalid domain [{}, {}]",
                        a.spec.variable, lo, hi
                    ),
                });
            }
            if inputs[..i].iter().any(|b| b.spec.variable == a.spec.variable) {
                return Err(CoreError::InvalidModel {
                    reason: format!("input variable '{}' is declared twice", a.spec.variable),
                });
            }
        }
        if !max_suitability.is_finite() || max_suitability <= 0.0 {
            return Err(CoreError::InvalidModel {
                reason: format!("max_suitability must be positive, got {}", max_suitability),
            });
        }
        let specs = inputs.iter().map(|i| i.spec.clone()).collect();
        Ok(Self {
            inputs,
            specs,
            response: Arc::new(response),
            output,
            max_suitability,
        })
    }

    /// Temperature-window model: suitability 1 for temperatures within
    /// `[t_min, t_max]` (degC, bounds inclusive), 0 otherwise.
    pub fn from_temperature_range(t_min: f64, t_max: f64) -> CoreResult<Self> {
        Self::new(
            vec![FormulaInput::new("temperature", "degC", [t_min, t_max])],
            |_| 1.0,
            OutputKind::Boolean,
            1.0,
        )
    }

    pub fn inputs(&self) -> &[InputSpec] {
        &self.specs
    }

    /// Declared domain of each input, in input order.
    pub fn domains(&self) -> Vec<[f64; 2]> {
        self.inputs.iter().map(|i| i.domain).collect()
    }

    /// Elementwise evaluation with domain truncation.
    ///
    /// Any input outside its declared domain (NaN and infinities included)
    /// yields 0.0 without consulting the expression.
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        debug_assert_eq!(values.len(), self.inputs.len());
        for (value, input) in values.iter().zip(&self.inputs) {
            let [lo, hi] = input.domain;
            if !(*value >= lo && *value <= hi) {
                return 0.0;
            }
        }
        (self.response)(values)
    }

    pub fn max_suitability(&self) -> f64 {
        self.max_suitability
    }

    pub fn output_kind(&self) -> OutputKind {
        self.output
    }
}
