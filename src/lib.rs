//! # vaspio - Readers for VASP Input and Output Files
//!
//! `vaspio` reads the files of a VASP calculation into typed Rust values. Its
//! core is a vasprun.xml extractor that handles documents from a few kilobytes
//! to many gigabytes, including runs that were killed while writing.
//!
//! ## Key Features
//!
//! - **Two Extraction Strategies**: Small or truncated documents are loaded into
//!   a tolerant tree and queried per quantity. Large documents are read in a
//!   single streaming pass with memory bounded by the largest section.
//!
//! - **Per-Quantity Outcomes**: Each extracted quantity succeeds or fails on its
//!   own. A corrupt DOS block does not hide the forces.
//!
//! - **Typed Arrays**: Eigenvalues, projections, DOS and response functions are
//!   returned as `ndarray` arrays with documented axis order.
//!
//! - **Input Files**: INCAR, KPOINTS and POSCAR are parsed and written back in
//!   a normalized form.
//!
//! - **Text Outputs**: EIGENVAL band energies and the OUTCAR symmetry,
//!   elastic moduli and magnetization that vasprun.xml does not carry.
//!
//! - **Run Diagnostics**: The standard output of a run is scanned for known
//!   errors and warnings.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use vaspio::vasprun::{EnergyKind, ParserOptions, Status, Vasprun};
//!
//! // Force the streaming strategy, keeping only the first and last ionic step
//! let options = ParserOptions::default()
//!     .with_force_streaming(true)
//!     .with_extract_all(false);
//! let run = Vasprun::open_with_options("vasprun.xml", options)?;
//!
//! println!("Strategy: {}", run.strategy());
//! println!("Ionic steps: {}", run.ionic_steps());
//! if let Some(forces) = run.forces(Status::Final)?.and_then(|f| f.single()) {
//!     println!("Forces: {:?}", forces.shape());
//! }
//! println!("Final energy: {:?}", run.final_energy(EnergyKind::Free)?);
//! # Ok::<(), vaspio::vasprun::VasprunError>(())
//! ```
//!
//! ## Architecture
//!
//! - [`vasprun`]: vasprun.xml extraction (strategy selection, tree and
//!   streaming engines, typed results)
//! - [`incar`]: INCAR reader and writer
//! - [`kpoints`]: KPOINTS reader and writer
//! - [`poscar`]: POSCAR reader and writer
//! - [`eigenval`]: EIGENVAL reader
//! - [`outcar`]: OUTCAR reader
//! - [`stream`]: standard stream scanner
//! - [`elements`]: element symbols and atomic numbers

pub mod eigenval;
pub mod elements;
pub mod incar;
pub mod kpoints;
pub mod outcar;
pub mod poscar;
pub mod stream;
pub mod vasprun;

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::eigenval::{Eigenval, EigenvalError};
    pub use crate::incar::{Incar, IncarError, IncarValue};
    pub use crate::kpoints::{Kpoints, KpointsError, KpointsMode};
    pub use crate::outcar::{Outcar, OutcarError};
    pub use crate::poscar::{Poscar, PoscarError};
    pub use crate::stream::{StreamConfig, StreamError, StreamReport, StreamScanner};
    pub use crate::vasprun::{
        EnergyKind, ParserOptions, Polarization, Status, StepValue, Strategy, Vasprun,
        VasprunError,
    };
}
