//! # vaspio
//!
//! Command-line tool for inspecting the files of a VASP calculation.
//!
//! ## Usage
//!
//! ```bash
//! # Summarize a vasprun.xml
//! vaspio inspect vasprun.xml
//!
//! # Same, as JSON, streaming regardless of size
//! vaspio inspect vasprun.xml --streaming --json
//!
//! # Look for known errors in the standard output of a run
//! vaspio scan stdout
//!
//! # Normalize an input file
//! vaspio incar INCAR
//! ```

use anyhow::Result;
use clap::Parser;

mod cli;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli::init_logging(cli.verbosity());
    cli::dispatch(cli)
}
