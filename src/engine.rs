//! Suitability execution engine
//!
//! Applies a [`SuitabilityModel`] elementwise over every row of a climate
//! ensemble, producing a new dataset carrying the derived `suitability`
//! variable on the same coordinates. Rows are independent, so evaluation is
//! parallelized across a rayon worker pool; the input dataset is never
//! mutated.

use polars::prelude::*;
use rayon::prelude::*;
use smallvec::SmallVec;
use tracing::debug;

use crate::dataset::{ClimateEnsemble, SuitabilityDataset, VariableMeta, VAR_SUITABILITY};
use crate::errors::CoreResult;
use crate::model::SuitabilityModel;
use crate::temporal;

/// Evaluate `model` over every row of `dataset`.
///
/// The output frame keeps the dimension columns of the input and carries a
/// single `suitability` variable (units "1"); the model's input variable
/// columns are dropped. A null in any input variable for a row yields a
/// null suitability for that row.
///
/// # Errors
/// - `MissingVariable` / `UnitsMismatch` if the dataset does not supply
///   the model's inputs (checked before any evaluation).
/// - `Polars` if frame manipulation fails.
pub fn run(dataset: &ClimateEnsemble, model: &SuitabilityModel) -> CoreResult<SuitabilityDataset> {
    model.check_inputs(dataset)?;

    let inputs = model.inputs();
    let frame = dataset.frame();
    let mut columns: Vec<&Float64Chunked> = Vec::with_capacity(inputs.len());
    for input in inputs {
        columns.push(frame.column(&input.variable)?.f64()?);
    }

    let n_rows = frame.height();
    debug!(
        rows = n_rows,
        inputs = inputs.len(),
        "evaluating suitability model"
    );

    let suitability: Vec<Option<f64>> = (0..n_rows)
        .into_par_iter()
        .map(|row| {
            let mut values: SmallVec<[f64; 4]> = SmallVec::with_capacity(columns.len());
            for column in &columns {
                match column.get(row) {
                    Some(v) => values.push(v),
                    None => return None,
                }
            }
            Some(model.evaluate(&values))
        })
        .collect();

    let mut keep: Vec<String> = dataset.dims().to_vec();
    keep.extend(dataset.time_bound_columns());
    let mut out = frame.select(keep)?;
    out.with_column(Series::new(VAR_SUITABILITY.into(), suitability))?;

    ClimateEnsemble::new(
        out,
        vec![(VAR_SUITABILITY, VariableMeta::new("1", "Suitability"))],
    )
}

/// Convenience pipeline: evaluate `model`, then count suitable months per
/// year. Suitability strictly above `threshold` marks a timestep suitable.
///
/// # Errors
/// Propagates [`run`] and [`temporal::months_suitable`] errors.
pub fn run_months_suitable(
    dataset: &ClimateEnsemble,
    model: &SuitabilityModel,
    threshold: f64,
) -> CoreResult<ClimateEnsemble> {
    let suitability = run(dataset, model)?;
    temporal::months_suitable(&suitability, threshold)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FormulaModel;
    use chrono::NaiveDate;

    fn dataset_with_temps(temps: Vec<Option<f64>>) -> ClimateEnsemble {
        let n = temps.len();
        let times: Vec<NaiveDate> = (0..n)
            .map(|i| NaiveDate::from_ymd_opt(2030, 1, 1 + i as u32).unwrap())
            .collect();
        let locations = vec!["paris"; n];
        let mut df = df!("location" => locations).unwrap();
        df.with_column(Series::new("time".into(), times)).unwrap();
        df.with_column(Series::new("temperature".into(), temps))
            .unwrap();
        ClimateEnsemble::new(
            df,
            vec![("temperature", VariableMeta::new("degC", "Temperature"))],
        )
        .unwrap()
    }

    #[test]
    fn test_run_evaluates_per_row() {
        let ds = dataset_with_temps(vec![Some(15.0), Some(5.0), Some(25.0)]);
        let model =
            SuitabilityModel::Formula(FormulaModel::from_temperature_range(10.0, 30.0).unwrap());
        let out = run(&ds, &model).unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(out.units(VAR_SUITABILITY), Some("1"));

        let s = out.frame().column(VAR_SUITABILITY).unwrap().f64().unwrap();
        assert_eq!(s.get(0), Some(1.0));
        assert_eq!(s.get(1), Some(0.0));
        assert_eq!(s.get(2), Some(1.0));
    }

    #[test]
    fn test_null_inputs_propagate_as_null() {
        let ds = dataset_with_temps(vec![Some(15.0), None]);
        let model =
            SuitabilityModel::Formula(FormulaModel::from_temperature_range(10.0, 30.0).unwrap());
        let out = run(&ds, &model).unwrap();
        let s = out.frame().column(VAR_SUITABILITY).unwrap().f64().unwrap();
        assert_eq!(s.get(0), Some(1.0));
        assert_eq!(s.get(1), None);
    }

    #[test]
    fn test_period_bounds_pass_through() {
        let mut ds = dataset_with_temps(vec![Some(15.0), Some(25.0)]);
        let bounds_lo = vec![
            NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2030, 1, 2).unwrap(),
        ];
        let frame = ds.frame().clone();
        let frame = {
            let mut f = frame;
            f.with_column(Series::new("time_lower".into(), bounds_lo))
                .unwrap();
            f
        };
        ds = ClimateEnsemble::new(
            frame,
            vec![("temperature", VariableMeta::new("degC", "Temperature"))],
        )
        .unwrap();

        let model =
            SuitabilityModel::Formula(FormulaModel::from_temperature_range(10.0, 30.0).unwrap());
        let out = run(&ds, &model).unwrap();
        assert!(out.frame().column("time_lower").is_ok());
    }

    #[test]
    fn test_input_variable_columns_are_dropped() {
        let ds = dataset_with_temps(vec![Some(15.0)]);
        let model =
            SuitabilityModel::Formula(FormulaModel::from_temperature_range(10.0, 30.0).unwrap());
        let out = run(&ds, &model).unwrap();
        assert!(out.frame().column("temperature").is_err());
        assert!(out.frame().column("time").is_ok());
        assert!(out.frame().column("location").is_ok());
    }
}
