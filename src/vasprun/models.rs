//! Typed results of a vasprun.xml extraction

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use ndarray::{Array1, Array2, Array3};
use serde::Serialize;

use super::error::VasprunError;

/// Per ionic step values keyed by the 1-based step index
pub type StepMap<T> = BTreeMap<usize, T>;

/// Scalar run parameters from the `parameters` section
///
/// Every field is looked up independently and is `None` when absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunParameters {
    /// Symmetry precision (SYMPREC)
    pub symprec: Option<f64>,
    /// Smearing width (SIGMA)
    pub sigma: Option<f64>,
    /// Smearing method (ISMEAR)
    pub ismear: Option<i64>,
    /// Number of spin channels (ISPIN)
    pub ispin: Option<i64>,
    /// Number of bands (NBANDS)
    pub nbands: Option<usize>,
    /// Number of electrons (NELECT)
    pub nelect: Option<f64>,
    /// System label (SYSTEM)
    pub system: Option<String>,
    /// Maximum number of electronic steps (NELM)
    pub nelm: Option<i64>,
    /// Maximum number of ionic steps (NSW)
    pub nsw: Option<i64>,
}

/// A quantity that is either unpolarized or split by spin channel
///
/// An unpolarized result never carries an empty `down` placeholder.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarization<T> {
    Total(T),
    Spin { up: T, down: T },
}

impl<T> Polarization<T> {
    pub(crate) fn from_channels(first: T, second: Option<T>) -> Self {
        match second {
            Some(down) => Polarization::Spin { up: first, down },
            None => Polarization::Total(first),
        }
    }

    /// Unpolarized value, if not spin polarized
    pub fn total(&self) -> Option<&T> {
        match self {
            Polarization::Total(t) => Some(t),
            Polarization::Spin { .. } => None,
        }
    }

    /// Spin up channel, if spin polarized
    pub fn up(&self) -> Option<&T> {
        match self {
            Polarization::Spin { up, .. } => Some(up),
            Polarization::Total(_) => None,
        }
    }

    /// Spin down channel, if spin polarized
    pub fn down(&self) -> Option<&T> {
        match self {
            Polarization::Spin { down, .. } => Some(down),
            Polarization::Total(_) => None,
        }
    }

    pub fn is_spin_polarized(&self) -> bool {
        matches!(self, Polarization::Spin { .. })
    }

    /// Channels in document order (`total`, or `up` then `down`)
    pub fn channels(&self) -> Vec<&T> {
        match self {
            Polarization::Total(t) => vec![t],
            Polarization::Spin { up, down } => vec![up, down],
        }
    }

    pub fn map<U, F: FnMut(T) -> U>(self, mut f: F) -> Polarization<U> {
        match self {
            Polarization::Total(t) => Polarization::Total(f(t)),
            Polarization::Spin { up, down } => Polarization::Spin {
                up: f(up),
                down: f(down),
            },
        }
    }
}

/// Eigenvalues and occupancies, `[bands, kpoints]` unless k-point major was requested
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BandData {
    pub eigenvalues: Polarization<Array2<f64>>,
    /// Absent when the rows only carry eigenvalues
    pub occupancies: Option<Polarization<Array2<f64>>>,
}

/// One spin channel of a density of states
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DosChannel {
    pub total: Array1<f64>,
    pub integrated: Array1<f64>,
    /// Per atom and orbital channel, `[atoms, energies, 9]`
    pub partial: Option<Array3<f64>>,
}

/// Density of states on a shared energy grid
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dos {
    pub energy: Array1<f64>,
    pub fermi_level: Option<f64>,
    pub channels: Polarization<DosChannel>,
}

/// Frequency dependent dielectric function
///
/// Tensor components are ordered xx, yy, zz, xy, yz, zx.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DielectricFunction {
    pub energy: Array1<f64>,
    /// `[energies, 6]`
    pub imag: Option<Array2<f64>>,
    /// `[energies, 6]`
    pub real: Option<Array2<f64>>,
}

/// Eigen decomposition of the dynamical matrix
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DynamicalMatrix {
    pub eigenvalues: Array1<f64>,
    pub eigenvectors: Array2<f64>,
}

/// Named total energy as printed in the `energy` blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnergyKind {
    /// `e_0_energy`, extrapolated to zero smearing
    Extrapolated,
    /// `e_fr_energy`, the free energy
    Free,
    /// `e_wo_entrp`, energy without the entropy term
    NoEntropy,
}

impl EnergyKind {
    pub const ALL: [EnergyKind; 3] = [EnergyKind::Extrapolated, EnergyKind::Free, EnergyKind::NoEntropy];

    /// Public name (`energy_extrapolated`, `energy_free`, `energy_no_entropy`)
    pub fn name(self) -> &'static str {
        match self {
            EnergyKind::Extrapolated => "energy_extrapolated",
            EnergyKind::Free => "energy_free",
            EnergyKind::NoEntropy => "energy_no_entropy",
        }
    }

    /// Value of the `name` attribute in the document
    pub fn xml_name(self) -> &'static str {
        match self {
            EnergyKind::Extrapolated => "e_0_energy",
            EnergyKind::Free => "e_fr_energy",
            EnergyKind::NoEntropy => "e_wo_entrp",
        }
    }

    pub(crate) fn from_xml_name(name: &str) -> Option<Self> {
        EnergyKind::ALL.into_iter().find(|kind| kind.xml_name() == name)
    }
}

impl FromStr for EnergyKind {
    type Err = VasprunError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EnergyKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| VasprunError::InvalidEnergyKind(s.to_string()))
    }
}

impl fmt::Display for EnergyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Energies of one ionic step
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StepEnergies {
    /// Values across the electronic self-consistency steps
    pub electronic: BTreeMap<EnergyKind, Vec<f64>>,
    /// Value recorded after the electronic loop closed
    pub finalized: BTreeMap<EnergyKind, f64>,
}

impl StepEnergies {
    pub fn electronic(&self, kind: EnergyKind) -> &[f64] {
        self.electronic.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn finalized(&self, kind: EnergyKind) -> Option<f64> {
        self.finalized.get(&kind).copied()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.electronic.values().all(Vec::is_empty) && self.finalized.is_empty()
    }
}

/// Energies of one kind over the selected ionic steps
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnergySeries {
    pub kind: EnergyKind,
    /// Electronic step values, flattened over ionic steps
    pub electronic: Vec<f64>,
    /// Values each ionic step contributed to `electronic`
    pub electronic_steps: Vec<usize>,
    /// Finalized value per ionic step
    pub finalized: Vec<Option<f64>>,
}

/// Result of an energy query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnergyReport {
    pub series: Vec<EnergySeries>,
}

impl EnergyReport {
    pub fn get(&self, kind: EnergyKind) -> Option<&EnergySeries> {
        self.series.iter().find(|s| s.kind == kind)
    }
}

/// Which ionic steps a per-step accessor returns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Initial,
    Final,
    All,
}

impl FromStr for Status {
    type Err = VasprunError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "initial" => Ok(Status::Initial),
            "final" => Ok(Status::Final),
            "all" => Ok(Status::All),
            other => Err(VasprunError::InvalidStatusSelector(other.to_string())),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Status::Initial => "initial",
            Status::Final => "final",
            Status::All => "all",
        })
    }
}

/// Anything accepted as a status selector by the per-step accessors
pub trait StatusSelector {
    fn into_status(self) -> Result<Status, VasprunError>;
}

impl StatusSelector for Status {
    fn into_status(self) -> Result<Status, VasprunError> {
        Ok(self)
    }
}

impl StatusSelector for &str {
    fn into_status(self) -> Result<Status, VasprunError> {
        self.parse()
    }
}

/// A single step's value or the whole step map
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepValue<'a, T> {
    Single(&'a T),
    All(&'a StepMap<T>),
}

impl<'a, T> StepValue<'a, T> {
    pub fn single(self) -> Option<&'a T> {
        match self {
            StepValue::Single(value) => Some(value),
            StepValue::All(_) => None,
        }
    }

    pub fn all(self) -> Option<&'a StepMap<T>> {
        match self {
            StepValue::All(map) => Some(map),
            StepValue::Single(_) => None,
        }
    }
}
