//! Synthetic ensemble fixtures
//!
//! A builder for deterministic synthetic climate ensembles used in tests,
//! benchmarks and the demo binary. Values are a base level plus per-model
//! and per-scenario offsets plus seeded Gaussian noise, so expected
//! statistics and variance components can be computed analytically.

use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use rustc_hash::FxHashMap;

use crate::dataset::{ClimateEnsemble, VariableMeta};
use crate::errors::{CoreError, CoreResult};

/// Sampling frequency of the synthetic time axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    Daily,
    /// One sample per month, on the 15th.
    Monthly,
    /// One sample per year, on July 1st.
    Yearly,
}

/// Builder for synthetic [`ClimateEnsemble`] fixtures.
///
/// Dimension columns appear only when their coordinate list is non-empty
/// (or, for realizations, when the count is non-zero), so fixtures can
/// exercise datasets with any subset of the ensemble dimensions.
#[derive(Debug, Clone)]
pub struct EnsembleBuilder {
    variable: String,
    units: String,
    frequency: Frequency,
    start_year: i32,
    years: u32,
    locations: Vec<String>,
    models: Vec<String>,
    scenarios: Vec<String>,
    realizations: u32,
    base_value: f64,
    noise_std: f64,
    model_offsets: FxHashMap<String, f64>,
    scenario_offsets: FxHashMap<String, f64>,
    null_every: Option<usize>,
    seed: u64,
}

impl Default for EnsembleBuilder {
    fn default() -> Self {
        Self {
            variable: "temperature".to_string(),
            units: "degC".to_string(),
            frequency: Frequency::Monthly,
            start_year: 2030,
            years: 2,
            locations: vec!["london".to_string()],
            models: Vec::new(),
            scenarios: Vec::new(),
            realizations: 0,
            base_value: 20.0,
            noise_std: 0.0,
            model_offsets: FxHashMap::default(),
            scenario_offsets: FxHashMap::default(),
            null_every: None,
            seed: 42,
        }
    }
}

impl EnsembleBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn variable(mut self, name: &str, units: &str) -> Self {
        self.variable = name.to_string();
        self.units = units.to_string();
        self
    }

    pub fn frequency(mut self, frequency: Frequency) -> Self {
        self.frequency = frequency;
        self
    }

    pub fn years(mut self, start_year: i32, years: u32) -> Self {
        self.start_year = start_year;
        self.years = years;
        self
    }

    pub fn locations(mut self, locations: &[&str]) -> Self {
        self.locations = locations.iter().map(|l| l.to_string()).collect();
        self
    }

    /// Model coordinates with an additive offset per model.
    pub fn models(mut self, models: &[(&str, f64)]) -> Self {
        self.models = models.iter().map(|(m, _)| m.to_string()).collect();
        self.model_offsets = models
            .iter()
            .map(|(m, o)| (m.to_string(), *o))
            .collect();
        self
    }

    /// Scenario coordinates with an additive offset per scenario.
    pub fn scenarios(mut self, scenarios: &[(&str, f64)]) -> Self {
        self.scenarios = scenarios.iter().map(|(s, _)| s.to_string()).collect();
        self.scenario_offsets = scenarios
            .iter()
            .map(|(s, o)| (s.to_string(), *o))
            .collect();
        self
    }

    pub fn realizations(mut self, realizations: u32) -> Self {
        self.realizations = realizations;
        self
    }

    pub fn base_value(mut self, base_value: f64) -> Self {
        self.base_value = base_value;
        self
    }

    /// Standard deviation of the seeded Gaussian noise (0 for exact values).
    pub fn noise_std(mut self, noise_std: f64) -> Self {
        self.noise_std = noise_std;
        self
    }

    /// Replace every n-th value with a null observation.
    pub fn null_every(mut self, n: usize) -> Self {
        self.null_every = Some(n);
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn times(&self) -> Vec<NaiveDate> {
        let mut times = Vec::new();
        for year in self.start_year..self.start_year + self.years as i32 {
            match self.frequency {
                Frequency::Daily => {
                    let mut day = NaiveDate::from_ymd_opt(year, 1, 1);
                    while let Some(d) = day {
                        if d.year() != year {
                            break;
                        }
                        times.push(d);
                        day = d.succ_opt();
                    }
                }
                Frequency::Monthly => {
                    for month in 1..=12 {
                        if let Some(d) = NaiveDate::from_ymd_opt(year, month, 15) {
                            times.push(d);
                        }
                    }
                }
                Frequency::Yearly => {
                    if let Some(d) = NaiveDate::from_ymd_opt(year, 7, 1) {
                        times.push(d);
                    }
                }
            }
        }
        times
    }

    /// Materialize the synthetic ensemble.
    ///
    /// # Errors
    /// `InvalidModel` if the noise standard deviation is negative or
    /// non-finite.
    pub fn build(&self) -> CoreResult<ClimateEnsemble> {
        let noise = Normal::new(0.0, self.noise_std).map_err(|e| CoreError::InvalidModel {
            reason: format!("invalid noise distribution: {}", e),
        })?;
        let mut rng = StdRng::seed_from_u64(self.seed);

        // Absent dimensions collapse to a single anonymous slot.
        let scenarios: Vec<Option<&str>> = if self.scenarios.is_empty() {
            vec![None]
        } else {
            self.scenarios.iter().map(|s| Some(s.as_str())).collect()
        };
        let models: Vec<Option<&str>> = if self.models.is_empty() {
            vec![None]
        } else {
            self.models.iter().map(|m| Some(m.as_str())).collect()
        };
        let realizations: Vec<Option<i64>> = if self.realizations == 0 {
            vec![None]
        } else {
            (0..self.realizations as i64).map(Some).collect()
        };
        let locations: Vec<Option<&str>> = if self.locations.is_empty() {
            vec![None]
        } else {
            self.locations.iter().map(|l| Some(l.as_str())).collect()
        };
        let times = self.times();

        let n = scenarios.len() * models.len() * realizations.len() * locations.len() * times.len();
        let mut time_col = Vec::with_capacity(n);
        let mut location_col = Vec::with_capacity(n);
        let mut model_col = Vec::with_capacity(n);
        let mut scenario_col = Vec::with_capacity(n);
        let mut realization_col = Vec::with_capacity(n);
        let mut value_col: Vec<Option<f64>> = Vec::with_capacity(n);

        let mut row = 0usize;
        for scenario in &scenarios {
            let scenario_offset = scenario
                .and_then(|s| self.scenario_offsets.get(s))
                .copied()
                .unwrap_or(0.0);
            for model in &models {
                let model_offset = model
                    .and_then(|m| self.model_offsets.get(m))
                    .copied()
                    .unwrap_or(0.0);
                for realization in &realizations {
                    for location in &locations {
                        for time in &times {
                            time_col.push(*time);
                            location_col.push(*location);
                            model_col.push(*model);
                            scenario_col.push(*scenario);
                            realization_col.push(*realization);

                            let is_null = self
                                .null_every
                                .map(|every| row % every == 0)
                                .unwrap_or(false);
                            if is_null {
                                value_col.push(None);
                            } else {
                                let value = self.base_value
                                    + scenario_offset
                                    + model_offset
                                    + noise.sample(&mut rng);
                                value_col.push(Some(value));
                            }
                            row += 1;
                        }
                    }
                }
            }
        }

        let mut df = DataFrame::empty();
        df.with_column(Series::new("time".into(), time_col))?;
        if !self.locations.is_empty() {
            df.with_column(Series::new("location".into(), location_col))?;
        }
        if !self.models.is_empty() {
            df.with_column(Series::new("model".into(), model_col))?;
        }
        if !self.scenarios.is_empty() {
            df.with_column(Series::new("scenario".into(), scenario_col))?;
        }
        if self.realizations > 0 {
            df.with_column(Series::new("realization".into(), realization_col))?;
        }
        df.with_column(Series::new(self.variable.as_str().into(), value_col))?;

        let long_name = self.variable.clone();
        ClimateEnsemble::new(
            df,
            vec![(
                self.variable.as_str(),
                VariableMeta::new(&self.units, &long_name),
            )],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_monthly_fixture_shape() {
        let ds = EnsembleBuilder::new()
            .years(2030, 2)
            .locations(&["a", "b"])
            .realizations(3)
            .build()
            .unwrap();
        // 24 months x 2 locations x 3 realizations.
        assert_eq!(ds.len(), 24 * 2 * 3);
        assert!(ds.has_dim("time"));
        assert!(ds.has_dim("location"));
        assert!(ds.has_dim("realization"));
        assert!(!ds.has_dim("model"));
    }

    #[test]
    fn test_offsets_applied_without_noise() {
        let ds = EnsembleBuilder::new()
            .frequency(Frequency::Yearly)
            .years(2030, 1)
            .models(&[("warm", 5.0), ("cool", -5.0)])
            .base_value(10.0)
            .build()
            .unwrap();
        let values = ds.frame().column("temperature").unwrap().f64().unwrap();
        let models = ds.frame().column("model").unwrap().str().unwrap();
        for row in 0..ds.len() {
            let expected = match models.get(row) {
                Some("warm") => 15.0,
                Some("cool") => 5.0,
                other => panic!("unexpected model {other:?}"),
            };
            assert_relative_eq!(values.get(row).unwrap(), expected, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_seed_makes_noise_reproducible() {
        let build = || {
            EnsembleBuilder::new()
                .noise_std(1.0)
                .seed(7)
                .build()
                .unwrap()
        };
        let a = build();
        let b = build();
        let va = a.frame().column("temperature").unwrap().f64().unwrap();
        let vb = b.frame().column("temperature").unwrap().f64().unwrap();
        for row in 0..a.len() {
            assert_eq!(va.get(row), vb.get(row));
        }
    }

    #[test]
    fn test_null_injection() {
        let ds = EnsembleBuilder::new().null_every(4).build().unwrap();
        let values = ds.frame().column("temperature").unwrap().f64().unwrap();
        assert_eq!(values.get(0), None);
        assert!(values.get(1).is_some());
        assert_eq!(values.null_count(), ds.len().div_ceil(4));
    }

    #[test]
    fn test_negative_noise_rejected() {
        let err = EnsembleBuilder::new().noise_std(-1.0).build().unwrap_err();
        assert!(matches!(err, CoreError::InvalidModel { .. }));
    }
}
