use anyhow::{Context, Result};
use log::{info, warn};
use serde::Serialize;
use std::path::{Path, PathBuf};

use vaspio::vasprun::{EnergyKind, ParserOptions, Strategy, Vasprun, VasprunError};

/// Headline numbers of a vasprun.xml
#[derive(Debug, Serialize)]
struct Summary {
    file: String,
    strategy: Strategy,
    truncated: bool,
    version: Option<String>,
    system: Option<String>,
    ionic_steps: usize,
    atoms: Option<usize>,
    kpoints: Option<usize>,
    bands: Option<usize>,
    spin_polarized: Option<bool>,
    fermi_level: Option<f64>,
    energy_free: Option<f64>,
    energy_extrapolated: Option<f64>,
    /// Quantities present in the document that could not be converted
    errors: Vec<String>,
}

/// Record a per-quantity failure and carry on
fn tolerate<T>(errors: &mut Vec<String>, name: &str, result: Result<Option<T>, VasprunError>) -> Option<T> {
    match result {
        Ok(value) => value,
        Err(e) => {
            warn!("Could not extract {}: {}", name, e);
            errors.push(format!("{}: {}", name, e));
            None
        }
    }
}

fn summarize(file: &Path, run: &Vasprun) -> Summary {
    let mut errors = Vec::new();

    let parameters = tolerate(&mut errors, "parameters", run.parameters()).cloned();
    let kpoints = tolerate(&mut errors, "kpoints", run.kpoints()).map(|k| k.nrows());
    let spin_polarized =
        tolerate(&mut errors, "eigenvalues", run.eigenvalues()).map(|e| e.is_spin_polarized());
    let fermi_level = tolerate(&mut errors, "fermi level", run.fermi_level());
    let energy_free = tolerate(&mut errors, "free energy", run.final_energy(EnergyKind::Free));
    let energy_extrapolated = tolerate(
        &mut errors,
        "extrapolated energy",
        run.final_energy(EnergyKind::Extrapolated),
    );

    Summary {
        file: file.display().to_string(),
        strategy: run.strategy(),
        truncated: run.truncated(),
        version: run.version(),
        system: parameters.as_ref().and_then(|p| p.system.clone()),
        ionic_steps: run.ionic_steps(),
        atoms: run.species().map(|s| s.len()),
        kpoints,
        bands: parameters.as_ref().and_then(|p| p.nbands),
        spin_polarized,
        fermi_level,
        energy_free,
        energy_extrapolated,
        errors,
    }
}

fn show<T: std::fmt::Display>(value: &Option<T>) -> String {
    value
        .as_ref()
        .map(|v| v.to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Summarize a vasprun.xml file
pub fn run(file: PathBuf, options: ParserOptions, json: bool) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {}", file.display());
    }

    info!("Reading {}", file.display());
    let run = Vasprun::open_with_options(&file, options)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let summary = summarize(&file, &run);

    if json {
        let text = serde_json::to_string_pretty(&summary).context("Failed to serialize summary")?;
        println!("{}", text);
        return Ok(());
    }

    println!("vasprun.xml Summary");
    println!("===================");
    println!("File: {}", summary.file);
    println!("Strategy: {}", summary.strategy);
    if summary.truncated {
        println!("Truncated: yes (recovered)");
    }
    println!();
    println!("  VASP version: {}", show(&summary.version));
    println!("  System: {}", show(&summary.system));
    println!("  Ionic steps: {}", summary.ionic_steps);
    println!("  Atoms: {}", show(&summary.atoms));
    println!("  K-points: {}", show(&summary.kpoints));
    println!("  Bands: {}", show(&summary.bands));
    println!("  Spin polarized: {}", show(&summary.spin_polarized));
    println!("  Fermi level: {}", show(&summary.fermi_level));
    println!("  Final energy (free): {}", show(&summary.energy_free));
    println!("  Final energy (extrapolated): {}", show(&summary.energy_extrapolated));

    if !summary.errors.is_empty() {
        println!();
        println!("Unreadable quantities:");
        for error in &summary.errors {
            println!("  {}", error);
        }
    }

    Ok(())
}
