use anyhow::{Context, Result};
use log::info;
use std::path::PathBuf;

use vaspio::stream::{StreamConfig, StreamScanner};

use super::report;

/// Scan a captured standard stream
pub fn run(file: PathBuf, config: &StreamConfig) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {}", file.display());
    }

    let scanner = StreamScanner::with_config(config).context("Failed to configure stream triggers")?;
    info!(
        "Scanning {} with {} triggers",
        file.display(),
        scanner.triggers().len()
    );
    let scan = scanner
        .scan_path(&file)
        .with_context(|| format!("Failed to scan {}", file.display()))?;

    let name = file.display().to_string();
    println!("{}", report::format_colored(&name, &scan));

    // Exit with error code if the run cannot be recovered
    if scan.is_fatal() {
        std::process::exit(1);
    }

    Ok(())
}
