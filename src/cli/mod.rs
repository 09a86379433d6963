use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

mod config;
mod inspect;
mod render;
mod report;
mod scan;

pub use config::Config;

/// vaspio - Readers for VASP input and output files
#[derive(Parser)]
#[command(name = "vaspio")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbosity level (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Load settings from a TOML config file
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize a vasprun.xml file
    Inspect {
        /// Input vasprun.xml path
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Use the streaming strategy regardless of size
        #[arg(long)]
        streaming: bool,

        /// Size in megabytes above which the document is streamed
        #[arg(long, value_name = "MB")]
        cutoff_mb: Option<f64>,

        /// Index band arrays k-point first
        #[arg(long)]
        k_before_band: bool,

        /// Keep only the first and the last ionic step
        #[arg(long)]
        initial_final_only: bool,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Scan the standard output of a run for known errors and warnings
    Scan {
        /// Captured stdout or stderr
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Report every occurrence instead of the first per trigger
        #[arg(long)]
        history: bool,
    },

    /// Parse an INCAR and print it normalized
    Incar {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Parse a KPOINTS file and print it normalized
    Kpoints {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Parse a POSCAR and print it in direct coordinates
    Poscar {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Print the band energies of an EIGENVAL file as JSON
    Eigenval {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Print symmetry, elastic moduli and magnetization of an OUTCAR as JSON
    Outcar {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

impl Cli {
    pub fn verbosity(&self) -> u8 {
        self.verbose
    }
}

pub fn init_logging(verbosity: u8) {
    let log_level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(path),
        None => Ok(Config::default()),
    }
}

pub fn dispatch(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Inspect {
            file,
            streaming,
            cutoff_mb,
            k_before_band,
            initial_final_only,
            json,
        } => {
            let mut options = config.vasprun;
            options.force_streaming |= streaming;
            options.k_before_band |= k_before_band;
            if let Some(cutoff_mb) = cutoff_mb {
                options.size_cutoff_mb = cutoff_mb;
            }
            if initial_final_only {
                options.extract_all = false;
            }
            inspect::run(file, options, json)
        }
        Commands::Scan { file, history } => {
            let mut stream = config.stream;
            stream.history |= history;
            scan::run(file, &stream)
        }
        Commands::Incar { file } => render::incar(file),
        Commands::Kpoints { file } => render::kpoints(file),
        Commands::Poscar { file } => render::poscar(file),
        Commands::Eigenval { file } => render::eigenval(file),
        Commands::Outcar { file } => render::outcar(file),
    }
}
