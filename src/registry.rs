//! Named model registry
//!
//! Maps stable names to shared, immutable suitability models so pipelines
//! can be configured by name. Ships a few example models: a temperature
//! window for *Aedes aegypti* transmission, a normalized Briere thermal
//! response, and a small temperature/precipitation niche table.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::errors::{CoreError, CoreResult};
use crate::model::{
    FormulaModel, LookupTableModel, OutputKind, SuitabilityModel,
    formula::FormulaInput,
};

/// Example temperature/precipitation niche grid, stored as a table spec.
const NICHE_TABLE_JSON: &str = r#"{
  "axes": [
    {
      "variable": "temperature",
      "units": "degC",
      "values": [10.0, 15.0, 20.0, 25.0, 30.0, 35.0]
    },
    {
      "variable": "precipitation",
      "units": "mm/day",
      "values": [0.0, 5.0, 10.0, 15.0]
    }
  ],
  "values": [
    0.0, 0.0,  0.0,  0.0,
    0.0, 0.1,  0.2,  0.1,
    0.1, 0.5,  0.7,  0.4,
    0.2, 0.8,  1.0,  0.6,
    0.1, 0.5,  0.6,  0.3,
    0.0, 0.1,  0.1,  0.0
  ]
}"#;

/// Registry of named suitability models.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    models: FxHashMap<String, Arc<SuitabilityModel>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the example models.
    ///
    /// # Errors
    /// `InvalidModel` if an example definition fails validation.
    pub fn with_examples() -> CoreResult<Self> {
        let mut registry = Self::new();
        registry.register(
            "temperature_range",
            SuitabilityModel::Formula(FormulaModel::from_temperature_range(17.8, 34.5)?),
        );
        registry.register(
            "briere_normalized",
            SuitabilityModel::Formula(briere_normalized(13.35, 40.08)?),
        );
        registry.register(
            "temperature_precipitation_table",
            SuitabilityModel::Table(LookupTableModel::from_json(NICHE_TABLE_JSON)?),
        );
        Ok(registry)
    }

    /// Register (or replace) a model under `name`.
    pub fn register(&mut self, name: &str, model: SuitabilityModel) {
        self.models.insert(name.to_string(), Arc::new(model));
    }

    /// Shared handle to a registered model.
    ///
    /// # Errors
    /// `UnknownModel` if `name` is not registered.
    pub fn get(&self, name: &str) -> CoreResult<Arc<SuitabilityModel>> {
        self.models
            .get(name)
            .cloned()
            .ok_or_else(|| CoreError::UnknownModel {
                name: name.to_string(),
            })
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.models.keys().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

/// Briere thermal response `t (t - t0) sqrt(tm - t)` on `[t0, tm]`,
/// normalized to peak at 1 (maximum located by a dense scan of the domain).
fn briere_normalized(t0: f64, tm: f64) -> CoreResult<FormulaModel> {
    let briere = move |t: f64| t * (t - t0) * (tm - t).sqrt();

    let samples = 20_000;
    let step = (tm - t0) / samples as f64;
    let mut peak = 0.0_f64;
    for i in 0..=samples {
        peak = peak.max(briere(t0 + step * i as f64));
    }

    FormulaModel::new(
        vec![FormulaInput::new("temperature", "degC", [t0, tm])],
        move |v| briere(v[0]) / peak,
        OutputKind::Continuous,
        1.0,
    )
}
