use anyhow::{Context, Result};
use std::path::PathBuf;

use vaspio::eigenval::Eigenval;
use vaspio::incar::Incar;
use vaspio::kpoints::Kpoints;
use vaspio::outcar::Outcar;
use vaspio::poscar::Poscar;

/// Print an INCAR normalized
pub fn incar(file: PathBuf) -> Result<()> {
    let incar = Incar::from_path(&file).with_context(|| format!("Failed to read {}", file.display()))?;
    print!("{}", incar);
    Ok(())
}

/// Print a KPOINTS file normalized
pub fn kpoints(file: PathBuf) -> Result<()> {
    let kpoints =
        Kpoints::from_path(&file).with_context(|| format!("Failed to read {}", file.display()))?;
    print!("{}", kpoints);
    Ok(())
}

/// Print a POSCAR in direct coordinates
pub fn poscar(file: PathBuf) -> Result<()> {
    let poscar =
        Poscar::from_path(&file).with_context(|| format!("Failed to read {}", file.display()))?;
    match poscar.atomic_numbers() {
        Ok(numbers) => log::info!("{} atoms, atomic numbers {:?}", poscar.num_atoms(), numbers),
        Err(e) => log::warn!("{}", e),
    }
    print!("{}", poscar);
    Ok(())
}

pub fn eigenval(file: PathBuf) -> Result<()> {
    let eigenval =
        Eigenval::from_path(&file).with_context(|| format!("Failed to read {}", file.display()))?;
    log::info!(
        "{} k-points, {} bands",
        eigenval.metadata.num_kpoints,
        eigenval.metadata.num_bands
    );
    println!("{}", serde_json::to_string_pretty(&eigenval)?);
    Ok(())
}

pub fn outcar(file: PathBuf) -> Result<()> {
    let outcar =
        Outcar::from_path(&file).with_context(|| format!("Failed to read {}", file.display()))?;
    println!("{}", serde_json::to_string_pretty(&outcar)?);
    Ok(())
}
