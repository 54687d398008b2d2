//! Lookup-table (niche) suitability models
//!
//! A `LookupTableModel` holds suitability values on an N-dimensional grid
//! over climate-variable space and evaluates query points by multilinear
//! interpolation. Queries outside the grid extent are clamped to the nearest
//! in-grid value per axis ("nearest-edge"); the table is never extrapolated.
//!
//! Table specs round-trip through JSON via serde so niche models can be
//! shipped as data.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::errors::{CoreError, CoreResult};
use crate::model::{InputSpec, OutputKind};

/// One grid axis: the climate variable it spans and its coordinate values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridAxis {
    pub variable: String,
    pub units: String,
    /// Strictly increasing coordinate values (at least two).
    pub values: Vec<f64>,
}

/// Serializable table definition: axes plus row-major suitability values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSpec {
    pub axes: Vec<GridAxis>,
    /// Row-major over the axes in declaration order; length must equal the
    /// product of the axis lengths.
    pub values: Vec<f64>,
}

/// Immutable N-dimensional niche model.
#[derive(Debug, Clone)]
pub struct LookupTableModel {
    axes: Vec<GridAxis>,
    specs: Vec<InputSpec>,
    values: Vec<f64>,
    strides: Vec<usize>,
    max_suitability: f64,
    output: OutputKind,
}

impl LookupTableModel {
    /// Build a table model, validating the grid.
    ///
    /// # Errors
    /// `InvalidModel` if there are no axes, an axis has fewer than two
    /// values or is not strictly increasing/finite, the value count does not
    /// match the grid shape, or any value is negative or non-finite.
    pub fn new(axes: Vec<GridAxis>, values: Vec<f64>) -> CoreResult<Self> {
        if axes.is_empty() {
            return Err(CoreError::InvalidModel {
                reason: "a lookup table requires at least one axis".to_string(),
            });
        }
        for axis in &axes {
            if axis.values.len() < 2 {
                return Err(CoreError::InvalidModel {
                    reason: format!(
                        "axis '{}' needs at least two grid values",
                        axis.variable
                    ),
                });
            }
            if axis
                .values
                .windows(2)
                .any(|w| !w[0].is_finite() || !w[1].is_finite() || w[0] >= w[1])
            {
                return Err(CoreError::InvalidModel {
                    reason: format!(
                        "axis '{}' must be strictly increasing and finite",
                        axis.variable
                    ),
                });
            }
        }
        let expected: usize = axes.iter().map(|a| a.values.len()).product();
        if values.len() != expected {
            return Err(CoreError::InvalidModel {
                reason: format!(
                    "table holds {} values but the grid shape requires {}",
                    values.len(),
                    expected
                ),
            });
        }
        if values.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(CoreError::InvalidModel {
                reason: "table values must be finite and non-negative".to_string(),
            });
        }

        // Row-major strides over the axes in declaration order.
        let mut strides = vec![1usize; axes.len()];
        for i in (0..axes.len().saturating_sub(1)).rev() {
            strides[i] = strides[i + 1] * axes[i + 1].values.len();
        }

        let max_suitability = values.iter().cloned().fold(0.0_f64, f64::max);
        let output = if values.iter().all(|v| *v == 0.0 || *v == 1.0) {
            OutputKind::Boolean
        } else {
            OutputKind::Continuous
        };
        let specs = axes
            .iter()
            .map(|a| InputSpec::new(&a.variable, &a.units))
            .collect();

        Ok(Self {
            axes,
            specs,
            values,
            strides,
            max_suitability,
            output,
        })
    }

    /// Build from a serializable spec.
    pub fn from_spec(spec: TableSpec) -> CoreResult<Self> {
        Self::new(spec.axes, spec.values)
    }

    /// Parse a JSON table spec and build the model.
    pub fn from_json(json: &str) -> CoreResult<Self> {
        let spec: TableSpec = serde_json::from_str(json).map_err(|e| CoreError::InvalidModel {
            reason: format!("failed to parse table spec JSON: {}", e),
        })?;
        Self::from_spec(spec)
    }

    pub fn inputs(&self) -> &[InputSpec] {
        &self.specs
    }

    pub fn axes(&self) -> &[GridAxis] {
        &self.axes
    }

    /// Multilinear interpolation with nearest-edge clamping.
    ///
    /// `values` must follow the axis declaration order. Non-finite inputs
    /// yield zero suitability (a query that cannot be placed on the grid).
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        debug_assert_eq!(values.len(), self.axes.len());
        // Bracketing cell index and intra-cell fraction per axis.
        let mut base: SmallVec<[usize; 4]> = SmallVec::with_capacity(self.axes.len());
        let mut frac: SmallVec<[f64; 4]> = SmallVec::with_capacity(self.axes.len());
        for (value, axis) in values.iter().zip(&self.axes) {
            if !value.is_finite() {
                return 0.0;
            }
            let grid = &axis.values;
            let x = value.clamp(grid[0], grid[grid.len() - 1]);
            // Upper bracket index in 1..=len-1.
            let hi = grid.partition_point(|g| *g < x).clamp(1, grid.len() - 1);
            let lo = hi - 1;
            let width = grid[hi] - grid[lo];
            base.push(lo);
            frac.push((x - grid[lo]) / width);
        }

        // Accumulate over the 2^N cell corners.
        let n = self.axes.len();
        let mut total = 0.0;
        for corner in 0..(1usize << n) {
            let mut weight = 1.0;
            let mut index = 0usize;
            for axis in 0..n {
                let upper = (corner >> axis) & 1 == 1;
                weight *= if upper { frac[axis] } else { 1.0 - frac[axis] };
                index += (base[axis] + usize::from(upper)) * self.strides[axis];
            }
            if weight != 0.0 {
                total += weight * self.values[index];
            }
        }
        total
    }

    pub fn max_suitability(&self) -> f64 {
        self.max_suitability
    }

    pub fn output_kind(&self) -> OutputKind {
        self.output
    }
}
