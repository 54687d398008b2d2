//! End-to-end pipeline demo on a synthetic ensemble
//!
//! Builds a seeded synthetic climate ensemble, evaluates a registered
//! suitability model, counts suitable months per year, summarizes the
//! ensemble spread and decomposes its variance.
//!
//! Run with: cargo run --release --bin suitability_demo

use std::time::Instant;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use ensemble_suitability::dataset::VAR_SUITABILITY;
use ensemble_suitability::stats::{default_statistics, ensemble_stats};
use ensemble_suitability::testing::{EnsembleBuilder, Frequency};
use ensemble_suitability::{decompose, engine, temporal, ModelRegistry};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("Building synthetic climate ensemble...");
    let dataset = EnsembleBuilder::new()
        .frequency(Frequency::Monthly)
        .years(2030, 3)
        .locations(&["london", "istanbul"])
        .models(&[("warm_model", 2.0), ("cool_model", -2.0)])
        .scenarios(&[("ssp126", -1.0), ("ssp585", 1.5)])
        .realizations(4)
        .base_value(21.0)
        .noise_std(3.0)
        .seed(42)
        .build()
        .context("failed to build synthetic ensemble")?;
    println!("  {} rows, dims: {:?}\n", dataset.len(), dataset.dims());

    let registry = ModelRegistry::with_examples().context("failed to build model registry")?;
    println!("Registered models: {:?}", registry.names());
    let model = registry.get("temperature_range")?;

    let start = Instant::now();
    let suitability =
        engine::run(&dataset, model.as_ref()).context("suitability evaluation failed")?;
    println!(
        "Evaluated '{}' over {} rows in {:.1?}\n",
        "temperature_range",
        suitability.len(),
        start.elapsed()
    );

    let months = temporal::months_suitable(&suitability, 0.0)
        .context("months-suitable aggregation failed")?;
    println!(
        "Months suitable per year (head):\n{}\n",
        months.frame().head(Some(8))
    );

    let summary = ensemble_stats(
        months.frame(),
        "months_suitable",
        &["model", "scenario", "realization"],
        &default_statistics(),
    )
    .context("ensemble statistics failed")?;
    println!("Ensemble summary (head):\n{}\n", summary.head(Some(16)));

    let decomp = decompose(
        suitability.frame(),
        VAR_SUITABILITY,
        &["scenario", "model", "realization"],
        true,
    )
    .context("variance decomposition failed")?;
    println!(
        "Variance fractions by source (head):\n{}",
        decomp.frame().head(Some(12))
    );

    Ok(())
}
