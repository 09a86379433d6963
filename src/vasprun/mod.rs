//! vasprun.xml extraction.
//!
//! Two strategies produce the same typed result. Small or damaged documents
//! are loaded into a tree and queried per quantity; large ones are read in a
//! single streaming pass with bounded memory.
//!
//! # Example
//!
//! ```no_run
//! use vaspio::vasprun::{Status, Vasprun};
//!
//! let run = Vasprun::open("vasprun.xml")?;
//! if let Some(positions) = run.positions(Status::Final)?.and_then(|p| p.single()) {
//!     println!("{} atoms", positions.nrows());
//! }
//! println!("Fermi level: {:?}", run.fermi_level()?);
//! # Ok::<(), vaspio::vasprun::VasprunError>(())
//! ```
//!
//! Each quantity is extracted independently. An accessor returns `Ok(None)`
//! when the document has no such data and an error when the data was there
//! but could not be converted; other quantities are unaffected.

mod assemble;
mod convert;
mod data;
mod error;
mod helpers;
mod models;
mod options;
mod preflight;
pub mod stream;
pub mod tree;

#[cfg(test)]
mod tests;

use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::Path;

use log::{debug, info};
use ndarray::{Array1, Array2, Array3, Array4};

pub use convert::{normalize_version, OVERFLOW_SENTINEL};
pub use error::{ErrorKind, ExtractError, Prerequisite, VasprunError};
pub use models::{
    BandData, DielectricFunction, Dos, DosChannel, DynamicalMatrix, EnergyKind, EnergyReport,
    EnergySeries, Polarization, RunParameters, Status, StatusSelector, StepEnergies, StepMap,
    StepValue,
};
pub use options::{ParserOptions, Strategy, DEFAULT_SIZE_CUTOFF_MB};
pub use stream::StreamExtractor;

use data::{final_step, initial_step, Extraction, Slot};
use preflight::Preflight;

/// Default buffer size for reading input (64 KB)
pub const DEFAULT_INPUT_BUFFER_SIZE: usize = 64 * 1024;

const DEFAULT_ENERGY_KINDS: &[EnergyKind] = &[EnergyKind::Extrapolated];

/// Extracted content of a vasprun.xml document
#[derive(Debug)]
pub struct Vasprun {
    data: Extraction,
    strategy: Strategy,
    truncated: bool,
}

fn slot<T>(slot: &Slot<T>) -> Result<Option<&T>, VasprunError> {
    Ok(slot.get()?)
}

impl Vasprun {
    /// Open and extract a vasprun.xml file with default options
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, VasprunError> {
        Self::open_with_options(path, ParserOptions::default())
    }

    /// Open and extract a vasprun.xml file
    pub fn open_with_options<P: AsRef<Path>>(path: P, options: ParserOptions) -> Result<Self, VasprunError> {
        let path = path.as_ref();
        info!("Reading {}", path.display());
        let file = File::open(path)?;
        Self::read(file, &path.display().to_string(), &options)
    }

    /// Extract from an open, seekable source
    ///
    /// The source is only read. Pass `&mut file` to keep ownership of a
    /// handle opened by the caller.
    pub fn from_reader<R: Read + Seek>(reader: R, options: ParserOptions) -> Result<Self, VasprunError> {
        Self::read(reader, "reader", &options)
    }

    /// Extract from an in-memory document
    pub fn from_str(xml: &str, options: ParserOptions) -> Result<Self, VasprunError> {
        Self::from_reader(Cursor::new(xml.as_bytes()), options)
    }

    fn read<R: Read + Seek>(mut source: R, label: &str, options: &ParserOptions) -> Result<Self, VasprunError> {
        let preflight = Preflight::inspect(&mut source, label)?;
        let strategy = preflight.strategy(options);
        let reader = BufReader::with_capacity(DEFAULT_INPUT_BUFFER_SIZE, source);

        let mut data = match strategy {
            Strategy::WholeDocument => {
                let root = tree::parse(reader, preflight.truncated)?;
                tree::extract(&root, options)?
            }
            Strategy::Streaming => StreamExtractor::new(reader, options.clone()).run()?,
        };
        data.finalize(options.extract_all);
        debug!("Extracted {} ionic steps from {}", data.steps, label);

        Ok(Self::from_extraction(data, strategy, preflight.truncated))
    }

    pub(crate) fn from_extraction(data: Extraction, strategy: Strategy, truncated: bool) -> Self {
        Self {
            data,
            strategy,
            truncated,
        }
    }

    /// Strategy the document was read with
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Whether the document did not end with its closing root tag
    pub fn truncated(&self) -> bool {
        self.truncated
    }

    /// Number of ionic steps (calculation sections) in the document
    pub fn ionic_steps(&self) -> usize {
        self.data.steps
    }

    /// Program version as `MAJOR.MINOR.PATCH`
    pub fn version(&self) -> Option<String> {
        self.data.version.as_deref().and_then(normalize_version)
    }

    pub fn parameters(&self) -> Result<Option<&RunParameters>, VasprunError> {
        slot(&self.data.parameters)
    }

    /// Atomic numbers in document order
    pub fn species(&self) -> Option<&Array1<u32>> {
        self.data.species.as_ref()
    }

    fn per_step<'a, T>(
        &self,
        slot: &'a Slot<StepMap<T>>,
        status: impl StatusSelector,
    ) -> Result<Option<StepValue<'a, T>>, VasprunError> {
        let status = status.into_status()?;
        let Some(map) = slot.get()? else {
            return Ok(None);
        };
        Ok(match status {
            Status::Initial => initial_step(map).map(StepValue::Single),
            Status::Final => final_step(map, self.data.steps).map(StepValue::Single),
            Status::All => Some(StepValue::All(map)),
        })
    }

    /// Lattice vectors as rows, `[3, 3]`
    pub fn unitcell(&self, status: impl StatusSelector) -> Result<Option<StepValue<'_, Array2<f64>>>, VasprunError> {
        self.per_step(&self.data.unitcell, status)
    }

    /// Fractional positions, `[atoms, 3]`
    pub fn positions(&self, status: impl StatusSelector) -> Result<Option<StepValue<'_, Array2<f64>>>, VasprunError> {
        self.per_step(&self.data.positions, status)
    }

    /// Forces, `[atoms, 3]`
    pub fn forces(&self, status: impl StatusSelector) -> Result<Option<StepValue<'_, Array2<f64>>>, VasprunError> {
        self.per_step(&self.data.forces, status)
    }

    /// Stress tensor, `[3, 3]`
    pub fn stress(&self, status: impl StatusSelector) -> Result<Option<StepValue<'_, Array2<f64>>>, VasprunError> {
        self.per_step(&self.data.stress, status)
    }

    /// Regular k-points, `[kpoints, 3]`
    pub fn kpoints(&self) -> Result<Option<&Array2<f64>>, VasprunError> {
        slot(&self.data.kpoints)
    }

    pub fn kpoint_weights(&self) -> Result<Option<&Array1<f64>>, VasprunError> {
        slot(&self.data.kpoint_weights)
    }

    /// Divisions of an automatically generated grid
    pub fn kpoint_divisions(&self) -> Result<Option<&[i64]>, VasprunError> {
        Ok(slot(&self.data.kpoint_divisions)?.map(Vec::as_slice))
    }

    /// K-points of the interpolated (or band velocity) grid
    pub fn kpoints_specific(&self) -> Result<Option<&Array2<f64>>, VasprunError> {
        slot(&self.data.kpoints_specific)
    }

    pub fn kpoint_weights_specific(&self) -> Result<Option<&Array1<f64>>, VasprunError> {
        slot(&self.data.kpoint_weights_specific)
    }

    /// Eigenvalues, `[bands, kpoints]` or `[kpoints, bands]` with `k_before_band`
    pub fn eigenvalues(&self) -> Result<Option<&Polarization<Array2<f64>>>, VasprunError> {
        Ok(slot(&self.data.bands)?.map(|b| &b.eigenvalues))
    }

    /// Occupancies in the same layout as the eigenvalues
    pub fn occupancies(&self) -> Result<Option<&Polarization<Array2<f64>>>, VasprunError> {
        Ok(slot(&self.data.bands)?.and_then(|b| b.occupancies.as_ref()))
    }

    /// Eigenvalues on the interpolated grid
    pub fn eigenvalues_specific(&self) -> Result<Option<&Polarization<Array2<f64>>>, VasprunError> {
        Ok(slot(&self.data.bands_specific)?.map(|b| &b.eigenvalues))
    }

    /// Eigenvalues and band velocities, `[bands, kpoints, 4]`
    pub fn eigenvelocities(&self) -> Result<Option<&Polarization<Array3<f64>>>, VasprunError> {
        slot(&self.data.eigenvelocities)
    }

    pub fn dos(&self) -> Result<Option<&Dos>, VasprunError> {
        slot(&self.data.dos)
    }

    /// Density of states on the interpolated grid
    pub fn dos_specific(&self) -> Result<Option<&Dos>, VasprunError> {
        slot(&self.data.dos_specific)
    }

    /// Fermi level of the regular density of states, as printed
    pub fn fermi_level(&self) -> Result<Option<f64>, VasprunError> {
        Ok(slot(&self.data.dos)?.and_then(|d| d.fermi_level))
    }

    /// Density-density dielectric function
    pub fn dielectrics(&self) -> Result<Option<&DielectricFunction>, VasprunError> {
        slot(&self.data.dielectrics)
    }

    pub fn dielectrics_current_current(&self) -> Result<Option<&DielectricFunction>, VasprunError> {
        slot(&self.data.dielectrics_current)
    }

    /// Static dielectric tensor, `[3, 3]`
    pub fn epsilon(&self) -> Result<Option<&Array2<f64>>, VasprunError> {
        slot(&self.data.epsilon)
    }

    /// Ionic contribution to the static dielectric tensor, `[3, 3]`
    pub fn epsilon_ion(&self) -> Result<Option<&Array2<f64>>, VasprunError> {
        slot(&self.data.epsilon_ion)
    }

    /// Orbital projections, `[atoms, bands, kpoints, 9]`
    ///
    /// With `k_before_band` the layout is `[atoms, kpoints, bands, 9]`.
    pub fn projectors(&self) -> Result<Option<&Polarization<Array4<f64>>>, VasprunError> {
        slot(&self.data.projectors)
    }

    /// Born effective charges, `[atoms, 3, 3]`
    pub fn born(&self) -> Result<Option<&Array3<f64>>, VasprunError> {
        slot(&self.data.born)
    }

    pub fn hessian(&self) -> Result<Option<&Array2<f64>>, VasprunError> {
        slot(&self.data.hessian)
    }

    pub fn dynmat(&self) -> Result<Option<&DynamicalMatrix>, VasprunError> {
        slot(&self.data.dynmat)
    }

    /// Total energies of the selected ionic steps
    ///
    /// `kinds` defaults to [`EnergyKind::Extrapolated`] when empty. Without
    /// `include_electronic` only the last electronic value of each ionic step
    /// is reported. Returns `Ok(None)` when the document holds no energies.
    pub fn energies(
        &self,
        status: impl StatusSelector,
        kinds: &[EnergyKind],
        include_electronic: bool,
    ) -> Result<Option<EnergyReport>, VasprunError> {
        let status = status.into_status()?;
        let Some(map) = slot(&self.data.energies)? else {
            return Ok(None);
        };
        let steps: Vec<&StepEnergies> = match status {
            Status::Initial => initial_step(map).into_iter().collect(),
            Status::Final => final_step(map, self.data.steps).into_iter().collect(),
            Status::All => map.values().collect(),
        };
        let kinds = if kinds.is_empty() { DEFAULT_ENERGY_KINDS } else { kinds };

        let series = kinds
            .iter()
            .map(|&kind| {
                let mut series = EnergySeries {
                    kind,
                    electronic: Vec::new(),
                    electronic_steps: Vec::new(),
                    finalized: Vec::new(),
                };
                for step in &steps {
                    let values = step.electronic(kind);
                    let values = if include_electronic {
                        values
                    } else {
                        &values[values.len().saturating_sub(1)..]
                    };
                    series.electronic.extend_from_slice(values);
                    series.electronic_steps.push(values.len());
                    series.finalized.push(step.finalized(kind));
                }
                series
            })
            .collect();
        Ok(Some(EnergyReport { series }))
    }

    /// Energy of one kind after the last ionic step
    pub fn final_energy(&self, kind: EnergyKind) -> Result<Option<f64>, VasprunError> {
        let Some(map) = slot(&self.data.energies)? else {
            return Ok(None);
        };
        Ok(final_step(map, self.data.steps).and_then(|step| step.finalized(kind)))
    }
}
